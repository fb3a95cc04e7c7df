use std::fmt::Debug;

use enumflags2::BitFlags;

use crate::repository::{Flag, Uid};

pub struct Message {
    uid: Uid,
    flags: BitFlags<Flag>,
    // todo: consider streaming large bodies instead of buffering them
    content: Vec<u8>,
}

impl Message {
    pub fn new(uid: Uid, flags: BitFlags<Flag>, content: Vec<u8>) -> Self {
        Self {
            uid,
            flags,
            content,
        }
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn flags(&self) -> BitFlags<Flag> {
        self.flags
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

impl Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("uid", &self.uid)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
