use anyhow::Result;
use enumflags2::BitFlags;

use crate::repository::{Flag, Message, Uid, UidValidity};

/// Local message archive the mirror reads from. Never mutated by a mirror run.
pub trait SourceStore {
    fn uid_validity(&self) -> Result<UidValidity>;

    /// All stored uids, ascending, stable across calls absent mutation.
    fn uids(&self) -> Result<Vec<Uid>>;

    /// Fails on a uid not present in the store.
    fn get(&self, uid: Uid) -> Result<Message>;
}

/// Remote mailbox the mirror writes to. Uids are the destination's own
/// numbering, unrelated to the source store's.
#[allow(async_fn_in_trait)]
pub trait DestinationFolder {
    async fn exists(&mut self) -> Result<bool>;

    async fn create(&mut self) -> Result<()>;

    async fn uid_validity(&mut self) -> Result<UidValidity>;

    async fn uids(&mut self) -> Result<Vec<Uid>>;

    /// Batched flag read. Callers never pass an empty set.
    async fn fetch_flags(&mut self, uids: &[Uid]) -> Result<Vec<(Uid, BitFlags<Flag>)>>;

    /// Batched flag write, replacing the flag set of every given uid.
    async fn set_flags(&mut self, uids: &[Uid], flags: BitFlags<Flag>) -> Result<()>;

    /// Returns the uid the destination assigned to the appended message.
    async fn append(&mut self, flags: BitFlags<Flag>, content: &[u8]) -> Result<Uid>;

    /// Batched permanent removal. Callers never pass an empty set.
    async fn delete_multi(&mut self, uids: &[Uid]) -> Result<()>;

    async fn clear(&mut self) -> Result<()>;
}
