use std::{collections::HashSet, path::PathBuf};

use anyhow::Result;

use crate::{
    repository::{Flag, Uid},
    sync::{
        map::UidMap,
        progress::{MirrorPhase, Progress},
        repository::{DestinationFolder, SourceStore},
    },
};

const CHUNK_SIZE: usize = 100;

/// Makes the destination folder converge toward an image of the source store,
/// with the uid map as the only cross-reference between the two uid spaces.
/// Every phase is idempotent against the state a failed run leaves behind, so
/// recovery is simply running again.
pub struct Mirror<'a, S: SourceStore, D: DestinationFolder, P: Progress> {
    source: &'a S,
    destination: &'a mut D,
    map_path: PathBuf,
    progress: &'a mut P,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MirrorOutcome {
    pub orphans_deleted: usize,
    pub flags_updated: usize,
    pub appended: usize,
}

impl<'a, S: SourceStore, D: DestinationFolder, P: Progress> Mirror<'a, S, D, P> {
    pub fn new(
        source: &'a S,
        destination: &'a mut D,
        map_path: PathBuf,
        progress: &'a mut P,
    ) -> Self {
        Self {
            source,
            destination,
            map_path,
            progress,
        }
    }

    pub async fn run(mut self) -> Result<MirrorOutcome> {
        self.ensure_destination_folder().await?;
        let mut map = self.prepare_map().await?;
        let orphans_deleted = self.delete_destination_only(&mut map).await?;
        let flags_updated = self.update_flags(&map).await?;
        let appended = self.append_missing(&mut map).await?;
        map.save(&self.map_path)?;

        Ok(MirrorOutcome {
            orphans_deleted,
            flags_updated,
            appended,
        })
    }

    async fn ensure_destination_folder(&mut self) -> Result<()> {
        if !self.destination.exists().await? {
            self.destination.create().await?;
        }

        Ok(())
    }

    async fn prepare_map(&mut self) -> Result<UidMap> {
        self.progress.on_phase(MirrorPhase::CheckUidValidities);
        let mut map = UidMap::load(&self.map_path)?;
        self.progress.on_map_loaded(map.len());

        let source_validity = self.source.uid_validity()?;
        let destination_validity = self.destination.uid_validity().await?;
        if !map.check_uid_validities(source_validity, destination_validity) {
            // clear before reset: a crash in between leaves an empty folder
            // and a stale map, which the next run repairs by re-appending
            self.destination.clear().await?;
            map.reset(source_validity, destination_validity);
            self.progress
                .on_epoch_reset(source_validity, destination_validity);
        }

        Ok(map)
    }

    async fn delete_destination_only(&mut self, map: &mut UidMap) -> Result<usize> {
        self.progress.on_phase(MirrorPhase::DeleteOrphans);
        let source_uids: HashSet<Uid> = self.source.uids()?.into_iter().collect();
        let orphans: Vec<Uid> = self
            .destination
            .uids()
            .await?
            .into_iter()
            .filter(|destination_uid| {
                map.source_uid(*destination_uid)
                    .is_none_or(|source_uid| !source_uids.contains(&source_uid))
            })
            .collect();
        if orphans.is_empty() {
            return Ok(0);
        }

        self.destination.delete_multi(&orphans).await?;
        for destination_uid in &orphans {
            map.forget_destination(*destination_uid);
        }
        self.progress.on_orphans_deleted(orphans.len());

        Ok(orphans.len())
    }

    async fn update_flags(&mut self, map: &UidMap) -> Result<usize> {
        self.progress.on_phase(MirrorPhase::UpdateFlags);
        let destination_uids = self.destination.uids().await?;
        let mut updated = 0;
        for chunk in destination_uids.chunks(CHUNK_SIZE) {
            for (destination_uid, flags) in self.destination.fetch_flags(chunk).await? {
                let Some(source_uid) = map.source_uid(destination_uid) else {
                    continue;
                };
                let wanted = self.source.get(source_uid)?.flags() & !Flag::Recent;
                if wanted != flags {
                    self.destination.set_flags(&[destination_uid], wanted).await?;
                    self.progress.on_flags_updated(destination_uid);
                    updated += 1;
                }
            }
        }

        Ok(updated)
    }

    async fn append_missing(&mut self, map: &mut UidMap) -> Result<usize> {
        self.progress.on_phase(MirrorPhase::AppendMissing);
        let mut appended = 0;
        for source_uid in self.source.uids()? {
            if map.destination_uid(source_uid).is_some() {
                continue;
            }
            let message = self.source.get(source_uid)?;
            // the server owns \Recent, a client may not transmit it
            let flags = message.flags() & !Flag::Recent;
            let destination_uid = self.destination.append(flags, message.content()).await?;
            map.map_uids(source_uid, destination_uid)?;
            self.progress.on_appended(source_uid, destination_uid);
            appended += 1;
        }

        Ok(appended)
    }
}
