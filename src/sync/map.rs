use std::{
    collections::BTreeMap,
    fs::{self, OpenOptions},
    io::{self, Write as _},
    os::unix::fs::OpenOptionsExt as _,
    path::{Path, PathBuf},
};

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::repository::{Uid, UidValidity};

/// The persisted association between source and destination uids, valid only
/// under one (source, destination) uid validity pair at a time.
#[derive(Debug, Default)]
pub struct UidMap {
    source_uid_validity: Option<UidValidity>,
    destination_uid_validity: Option<UidValidity>,
    by_source: BTreeMap<Uid, Uid>,
    by_destination: BTreeMap<Uid, Uid>,
}

#[derive(Debug, Error)]
pub enum MapReadError {
    #[error("cannot read uid map {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("uid map {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("uid map {} maps a uid twice", .path.display())]
    Conflicting { path: PathBuf },
}

#[derive(Debug, Error)]
#[error("cannot write uid map {}: {source}", .path.display())]
pub struct MapWriteError {
    path: PathBuf,
    #[source]
    source: io::Error,
}

#[derive(Debug, Error)]
#[error("uids {source_uid} and {destination_uid} are already mapped")]
pub struct DuplicateEntryError {
    source_uid: Uid,
    destination_uid: Uid,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct MapFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    source_uid_validity: Option<UidValidity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    destination_uid_validity: Option<UidValidity>,
    #[serde(default)]
    entries: Vec<MapEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
struct MapEntry {
    source: Uid,
    destination: Uid,
}

impl UidMap {
    pub fn load(path: &Path) -> Result<Self, MapReadError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!("no uid map at {}, starting empty", path.to_string_lossy());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(MapReadError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let file: MapFile = toml::from_str(&contents).map_err(|source| MapReadError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;

        let mut map = Self {
            source_uid_validity: file.source_uid_validity,
            destination_uid_validity: file.destination_uid_validity,
            by_source: BTreeMap::new(),
            by_destination: BTreeMap::new(),
        };
        for entry in file.entries {
            map.map_uids(entry.source, entry.destination)
                .map_err(|_| MapReadError::Conflicting {
                    path: path.to_path_buf(),
                })?;
        }

        Ok(map)
    }

    pub fn save(&self, path: &Path) -> Result<(), MapWriteError> {
        let fail = |source| MapWriteError {
            path: path.to_path_buf(),
            source,
        };
        let serialized =
            toml::to_string(&self.to_file()).expect("uid map should be serializable as toml");
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&tmp)
            .map_err(fail)?;
        file.write_all(serialized.as_bytes()).map_err(fail)?;
        file.sync_all().map_err(fail)?;
        fs::rename(&tmp, path).map_err(fail)?;

        Ok(())
    }

    fn to_file(&self) -> MapFile {
        MapFile {
            source_uid_validity: self.source_uid_validity,
            destination_uid_validity: self.destination_uid_validity,
            entries: self
                .by_source
                .iter()
                .map(|(source, destination)| MapEntry {
                    source: *source,
                    destination: *destination,
                })
                .collect(),
        }
    }

    pub fn check_uid_validities(
        &mut self,
        source: UidValidity,
        destination: UidValidity,
    ) -> bool {
        if self.source_uid_validity.is_none() && self.destination_uid_validity.is_none() {
            self.source_uid_validity = Some(source);
            self.destination_uid_validity = Some(destination);
            return true;
        }

        self.source_uid_validity == Some(source)
            && self.destination_uid_validity == Some(destination)
    }

    pub fn reset(&mut self, source: UidValidity, destination: UidValidity) {
        self.by_source.clear();
        self.by_destination.clear();
        self.source_uid_validity = Some(source);
        self.destination_uid_validity = Some(destination);
    }

    pub fn source_uid(&self, destination: Uid) -> Option<Uid> {
        self.by_destination.get(&destination).copied()
    }

    pub fn destination_uid(&self, source: Uid) -> Option<Uid> {
        self.by_source.get(&source).copied()
    }

    pub fn map_uids(&mut self, source: Uid, destination: Uid) -> Result<(), DuplicateEntryError> {
        if self.by_source.contains_key(&source) || self.by_destination.contains_key(&destination) {
            return Err(DuplicateEntryError {
                source_uid: source,
                destination_uid: destination,
            });
        }
        self.by_source.insert(source, destination);
        self.by_destination.insert(destination, source);

        Ok(())
    }

    pub fn forget_destination(&mut self, destination: Uid) {
        if let Some(source) = self.by_destination.remove(&destination) {
            self.by_source.remove(&source);
        }
    }

    pub fn len(&self) -> usize {
        self.by_source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, os::unix::fs::PermissionsExt as _};

    use assertables::*;
    use rstest::*;
    use tempfile::{TempDir, tempdir};

    use super::*;

    fn uid(num: u32) -> Uid {
        assert_ok!(Uid::try_from(num))
    }

    fn validity(num: u32) -> UidValidity {
        assert_ok!(UidValidity::try_from(num))
    }

    #[fixture]
    fn map_dir() -> TempDir {
        assert_ok!(tempdir())
    }

    fn map_path(dir: &TempDir) -> PathBuf {
        dir.path().join("INBOX.db.other.mirror")
    }

    #[rstest]
    fn test_load_of_absent_file_yields_empty_map(map_dir: TempDir) {
        let map = assert_ok!(UidMap::load(&map_path(&map_dir)));
        assert!(map.is_empty());
        let mut map = map;
        assert!(map.check_uid_validities(validity(1), validity(2)));
    }

    #[rstest]
    fn test_load_of_corrupt_file_fails(map_dir: TempDir) {
        let path = map_path(&map_dir);
        assert_ok!(fs::write(&path, "not a uid map {{{"));
        let result = assert_err!(UidMap::load(&path));
        assert_matches!(result, MapReadError::Corrupt { .. });
    }

    #[rstest]
    fn test_load_rejects_conflicting_entries(map_dir: TempDir) {
        let path = map_path(&map_dir);
        assert_ok!(fs::write(
            &path,
            "source_uid_validity = 1\n\
             destination_uid_validity = 2\n\n\
             [[entries]]\nsource = 1\ndestination = 4\n\n\
             [[entries]]\nsource = 1\ndestination = 5\n",
        ));
        let result = assert_err!(UidMap::load(&path));
        assert_matches!(result, MapReadError::Conflicting { .. });
    }

    #[rstest]
    fn test_save_and_load_roundtrip(map_dir: TempDir) {
        let path = map_path(&map_dir);
        let mut map = UidMap::default();
        assert!(map.check_uid_validities(validity(11), validity(21)));
        assert_ok!(map.map_uids(uid(1), uid(101)));
        assert_ok!(map.map_uids(uid(3), uid(102)));
        assert_ok!(map.save(&path));

        let mut reloaded = assert_ok!(UidMap::load(&path));
        assert_eq!(2, reloaded.len());
        assert_eq!(Some(uid(101)), reloaded.destination_uid(uid(1)));
        assert_eq!(Some(uid(3)), reloaded.source_uid(uid(102)));
        assert!(reloaded.check_uid_validities(validity(11), validity(21)));
        assert!(!reloaded.check_uid_validities(validity(11), validity(22)));
    }

    #[rstest]
    fn test_save_replaces_file_atomically_with_private_permissions(map_dir: TempDir) {
        let path = map_path(&map_dir);
        let map = UidMap::default();
        assert_ok!(map.save(&path));

        assert!(assert_ok!(fs::exists(&path)));
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        assert!(!assert_ok!(fs::exists(PathBuf::from(tmp))));
        let mode = assert_ok!(fs::metadata(&path)).permissions().mode();
        assert_eq!(0o600, mode & 0o777);
    }

    #[rstest]
    fn test_check_uid_validities_adopts_pair_on_first_use() {
        let mut map = UidMap::default();
        assert!(map.check_uid_validities(validity(5), validity(6)));
        assert!(map.check_uid_validities(validity(5), validity(6)));
        assert!(!map.check_uid_validities(validity(5), validity(7)));
        assert!(!map.check_uid_validities(validity(4), validity(6)));
    }

    #[rstest]
    fn test_reset_discards_entries_and_stores_new_pair() {
        let mut map = UidMap::default();
        assert!(map.check_uid_validities(validity(5), validity(6)));
        assert_ok!(map.map_uids(uid(1), uid(101)));

        map.reset(validity(5), validity(7));

        assert!(map.is_empty());
        assert_none!(map.destination_uid(uid(1)));
        assert!(map.check_uid_validities(validity(5), validity(7)));
    }

    #[rstest]
    fn test_lookups_are_bijective() {
        let mut map = UidMap::default();
        assert_ok!(map.map_uids(uid(1), uid(101)));
        assert_ok!(map.map_uids(uid(2), uid(102)));

        for (source, destination) in [(1, 101), (2, 102)] {
            let destination_uid = assert_some!(map.destination_uid(uid(source)));
            assert_eq!(uid(destination), destination_uid);
            assert_eq!(Some(uid(source)), map.source_uid(destination_uid));
        }
        assert_none!(map.destination_uid(uid(3)));
        assert_none!(map.source_uid(uid(1)));
    }

    #[rstest]
    #[case(1, 104)]
    #[case(4, 101)]
    #[case(1, 101)]
    fn test_map_uids_rejects_duplicates_on_either_side(
        #[case] source: u32,
        #[case] destination: u32,
    ) {
        let mut map = UidMap::default();
        assert_ok!(map.map_uids(uid(1), uid(101)));
        assert_err!(map.map_uids(uid(source), uid(destination)));
        assert_eq!(1, map.len());
    }

    #[rstest]
    fn test_forget_destination_removes_both_directions() {
        let mut map = UidMap::default();
        assert_ok!(map.map_uids(uid(1), uid(101)));
        map.forget_destination(uid(101));

        assert!(map.is_empty());
        assert_none!(map.destination_uid(uid(1)));
        assert_ok!(map.map_uids(uid(1), uid(105)));
    }
}
