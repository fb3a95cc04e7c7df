use std::collections::BTreeMap;

use anyhow::{Context as _, Result};
use enumflags2::BitFlags;

use crate::{
    repository::{Flag, Message, Uid, UidValidity},
    sync::repository::{DestinationFolder, SourceStore},
};

fn uid(num: u32) -> Uid {
    Uid::try_from(num).expect("test uids should be nonzero")
}

pub struct FakeSource {
    uid_validity: UidValidity,
    messages: BTreeMap<Uid, (BitFlags<Flag>, Vec<u8>)>,
}

impl FakeSource {
    pub fn new(uid_validity: UidValidity) -> Self {
        Self {
            uid_validity,
            messages: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, num: u32, flags: BitFlags<Flag>, content: &[u8]) {
        self.messages.insert(uid(num), (flags, content.to_vec()));
    }

    pub fn remove(&mut self, num: u32) {
        self.messages.remove(&uid(num));
    }

    pub fn set_flags(&mut self, num: u32, flags: BitFlags<Flag>) {
        self.messages
            .get_mut(&uid(num))
            .expect("flag change should target a stored message")
            .0 = flags;
    }
}

impl SourceStore for FakeSource {
    fn uid_validity(&self) -> Result<UidValidity> {
        Ok(self.uid_validity)
    }

    fn uids(&self) -> Result<Vec<Uid>> {
        Ok(self.messages.keys().copied().collect())
    }

    fn get(&self, uid: Uid) -> Result<Message> {
        let (flags, content) = self
            .messages
            .get(&uid)
            .with_context(|| format!("message {uid} is not in the store"))?;

        Ok(Message::new(uid, *flags, content.clone()))
    }
}

pub struct FakeFolder {
    pub exists: bool,
    uid_validity: UidValidity,
    next_uid: u32,
    messages: BTreeMap<Uid, (BitFlags<Flag>, Vec<u8>)>,
    pub created: usize,
    pub cleared: usize,
    pub deleted_batches: Vec<Vec<Uid>>,
    pub fetch_sizes: Vec<usize>,
    pub flag_updates: Vec<(Vec<Uid>, BitFlags<Flag>)>,
    pub appends: Vec<(BitFlags<Flag>, Vec<u8>)>,
}

impl FakeFolder {
    pub fn new(uid_validity: UidValidity) -> Self {
        Self {
            exists: false,
            uid_validity,
            // separated from the fake source's numbering so a mixed-up uid
            // space shows up in tests
            next_uid: 101,
            messages: BTreeMap::new(),
            created: 0,
            cleared: 0,
            deleted_batches: Vec::new(),
            fetch_sizes: Vec::new(),
            flag_updates: Vec::new(),
            appends: Vec::new(),
        }
    }

    pub fn change_uid_validity(&mut self, uid_validity: UidValidity) {
        self.uid_validity = uid_validity;
    }

    pub fn insert(&mut self, num: u32, flags: BitFlags<Flag>, content: &[u8]) {
        self.messages.insert(uid(num), (flags, content.to_vec()));
        self.next_uid = self.next_uid.max(num + 1);
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn flags_of(&self, num: u32) -> BitFlags<Flag> {
        self.messages
            .get(&uid(num))
            .expect("flag lookup should target a stored message")
            .0
    }

    pub fn content_of(&self, num: u32) -> Vec<u8> {
        self.messages
            .get(&uid(num))
            .expect("content lookup should target a stored message")
            .1
            .clone()
    }

    pub fn reset_counters(&mut self) {
        self.created = 0;
        self.cleared = 0;
        self.deleted_batches.clear();
        self.fetch_sizes.clear();
        self.flag_updates.clear();
        self.appends.clear();
    }
}

impl DestinationFolder for FakeFolder {
    async fn exists(&mut self) -> Result<bool> {
        Ok(self.exists)
    }

    async fn create(&mut self) -> Result<()> {
        self.exists = true;
        self.created += 1;

        Ok(())
    }

    async fn uid_validity(&mut self) -> Result<UidValidity> {
        Ok(self.uid_validity)
    }

    async fn uids(&mut self) -> Result<Vec<Uid>> {
        Ok(self.messages.keys().copied().collect())
    }

    async fn fetch_flags(&mut self, uids: &[Uid]) -> Result<Vec<(Uid, BitFlags<Flag>)>> {
        self.fetch_sizes.push(uids.len());

        Ok(uids
            .iter()
            .filter_map(|uid| self.messages.get(uid).map(|(flags, _)| (*uid, *flags)))
            .collect())
    }

    async fn set_flags(&mut self, uids: &[Uid], flags: BitFlags<Flag>) -> Result<()> {
        self.flag_updates.push((uids.to_vec(), flags));
        for uid in uids {
            self.messages
                .get_mut(uid)
                .expect("flag update should target a stored message")
                .0 = flags;
        }

        Ok(())
    }

    async fn append(&mut self, flags: BitFlags<Flag>, content: &[u8]) -> Result<Uid> {
        self.appends.push((flags, content.to_vec()));
        let assigned = uid(self.next_uid);
        self.next_uid += 1;
        self.messages.insert(assigned, (flags, content.to_vec()));

        Ok(assigned)
    }

    async fn delete_multi(&mut self, uids: &[Uid]) -> Result<()> {
        self.deleted_batches.push(uids.to_vec());
        for uid in uids {
            self.messages.remove(uid);
        }

        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        self.cleared += 1;
        self.messages.clear();

        Ok(())
    }
}
