mod flag;
mod message;
mod sequence_set;
mod uid;
mod uid_validity;

pub use flag::Flag;
pub use message::Message;
pub use sequence_set::SequenceSet;
pub use uid::Uid;
pub use uid_validity::UidValidity;
