#[allow(clippy::module_inception)]
mod archive;

pub use archive::Archive;
pub use archive::ArchiveOpenError;
