use std::{
    fs::create_dir_all,
    io,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result};
use enumflags2::{BitFlag as _, BitFlags};
use log::debug;
use rusqlite::{Connection, OpenFlags, OptionalExtension as _};
use thiserror::Error;

use crate::{
    repository::{Flag, Message, Uid, UidValidity},
    sync::SourceStore,
};

/// Local message archive of one folder, the mirror's read-only source.
#[derive(Debug)]
pub struct Archive {
    db: Connection,
    path: PathBuf,
}

#[derive(Debug, Error)]
pub enum ArchiveOpenError {
    #[error("no archive found for folder '{folder}'")]
    Missing { folder: String },
    #[error("archive {} is not usable: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("IO issue when preparing archive: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
#[error("message {uid} is not in the archive")]
pub struct UnknownUidError {
    uid: Uid,
}

impl Archive {
    pub fn open(archive_dir: &Path, folder: &str) -> Result<Self, ArchiveOpenError> {
        let path = Self::archive_file(archive_dir, folder);
        if !path.try_exists()? {
            return Err(ArchiveOpenError::Missing {
                folder: folder.to_string(),
            });
        }
        debug!("opening archive {}", path.to_string_lossy());
        let corrupt = |source| ArchiveOpenError::Corrupt {
            path: path.clone(),
            source,
        };
        let db = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        )
        .map_err(corrupt)?;
        let archive = Self { db, path: path.clone() };
        archive.stored_uid_validity().map_err(corrupt)?;

        Ok(archive)
    }

    pub fn create(
        archive_dir: &Path,
        folder: &str,
        uid_validity: UidValidity,
    ) -> Result<Self, ArchiveOpenError> {
        create_dir_all(archive_dir)?;
        let path = Self::archive_file(archive_dir, folder);
        debug!("creating archive {}", path.to_string_lossy());
        let db = Connection::open(&path).map_err(|source| ArchiveOpenError::Corrupt {
            path: path.clone(),
            source,
        })?;
        db.execute_batch(
            "pragma journal_mode=wal;
            pragma synchronous=1;
            create table messages (
                uid integer primary key,
                flags integer not null,
                content blob not null
            ) strict;
            create table archive_info (
                uid_validity integer primary key
            ) strict;
            pragma optimize;",
        )
        .expect("creation of tables should succeed");
        db.execute(
            "insert into archive_info (uid_validity) values (?1)",
            [u32::from(uid_validity)],
        )
        .expect("uid_validity should be settable");

        Ok(Self { db, path })
    }

    fn archive_file(archive_dir: &Path, folder: &str) -> PathBuf {
        archive_dir.join(format!("{folder}.db"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn stored_uid_validity(&self) -> rusqlite::Result<UidValidity> {
        self.db
            .query_one("select uid_validity from archive_info", (), |row| {
                let validity: u32 = row.get(0)?;
                Ok(validity
                    .try_into()
                    .expect("stored uid validity should be spec compliant"))
            })
    }

    pub fn store(&self, message: &Message) -> Result<()> {
        let mut stmt = self
            .db
            .prepare_cached("insert into messages (uid, flags, content) values (?1, ?2, ?3)")?;
        stmt.execute((
            u32::from(message.uid()),
            message.flags().bits(),
            message.content(),
        ))?;

        Ok(())
    }
}

impl SourceStore for Archive {
    fn uid_validity(&self) -> Result<UidValidity> {
        Ok(self
            .stored_uid_validity()
            .context("archive should have a uid validity recorded")?)
    }

    fn uids(&self) -> Result<Vec<Uid>> {
        let mut stmt = self
            .db
            .prepare_cached("select uid from messages order by uid")?;
        let rows = stmt.query_map([], |row| row.get::<_, u32>(0))?;
        let mut uids = Vec::new();
        for row in rows {
            uids.push(Uid::try_from(row?).expect("stored uids should be nonzero"));
        }

        Ok(uids)
    }

    fn get(&self, uid: Uid) -> Result<Message> {
        let mut stmt = self
            .db
            .prepare_cached("select flags, content from messages where uid = ?1")?;
        let message = stmt
            .query_one([u32::from(uid)], |row| {
                let flags: BitFlags<Flag> = Flag::from_bits_truncate(row.get(0)?);
                let content: Vec<u8> = row.get(1)?;
                Ok(Message::new(uid, flags, content))
            })
            .optional()?
            .ok_or(UnknownUidError { uid })?;

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use assertables::*;
    use rstest::*;
    use tempfile::{TempDir, tempdir};

    use super::*;

    fn uid(num: u32) -> Uid {
        assert_ok!(Uid::try_from(num))
    }

    #[fixture]
    fn archive_dir() -> TempDir {
        assert_ok!(tempdir())
    }

    #[fixture]
    fn uid_validity() -> UidValidity {
        assert_ok!(UidValidity::try_from(8))
    }

    #[rstest]
    fn test_create_initializes_db_file(archive_dir: TempDir, uid_validity: UidValidity) {
        assert_ok!(Archive::create(archive_dir.path(), "INBOX", uid_validity));
        assert!(assert_ok!(fs::exists(archive_dir.path().join("INBOX.db"))));
    }

    #[rstest]
    fn test_open_of_absent_archive_reports_missing(archive_dir: TempDir) {
        let result = assert_err!(Archive::open(archive_dir.path(), "INBOX"));
        assert_matches!(result, ArchiveOpenError::Missing { .. });
    }

    #[rstest]
    fn test_open_of_unusable_file_reports_corrupt(archive_dir: TempDir) {
        assert_ok!(fs::write(archive_dir.path().join("INBOX.db"), "not sqlite"));
        let result = assert_err!(Archive::open(archive_dir.path(), "INBOX"));
        assert_matches!(result, ArchiveOpenError::Corrupt { .. });
    }

    #[rstest]
    fn test_reopened_archive_keeps_uid_validity(archive_dir: TempDir, uid_validity: UidValidity) {
        assert_ok!(Archive::create(archive_dir.path(), "INBOX", uid_validity));
        let archive = assert_ok!(Archive::open(archive_dir.path(), "INBOX"));
        assert_eq!(uid_validity, assert_ok!(archive.uid_validity()));
    }

    #[rstest]
    fn test_stored_messages_roundtrip_in_uid_order(
        archive_dir: TempDir,
        uid_validity: UidValidity,
    ) {
        let archive = assert_ok!(Archive::create(archive_dir.path(), "INBOX", uid_validity));
        assert_ok!(archive.store(&Message::new(uid(9), Flag::Seen.into(), b"nine".to_vec())));
        assert_ok!(archive.store(&Message::new(uid(2), Flag::Seen | Flag::Draft, b"two".to_vec())));

        assert_eq!(vec![uid(2), uid(9)], assert_ok!(archive.uids()));
        let message = assert_ok!(archive.get(uid(2)));
        assert_eq!(Flag::Seen | Flag::Draft, message.flags());
        assert_eq!(b"two", message.content());
    }

    #[rstest]
    fn test_get_of_unknown_uid_fails(archive_dir: TempDir, uid_validity: UidValidity) {
        let archive = assert_ok!(Archive::create(archive_dir.path(), "INBOX", uid_validity));
        assert_err!(archive.get(uid(4)));
    }
}
