use std::fmt::Display;

use log::{debug, info};

use crate::repository::{Uid, UidValidity};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MirrorPhase {
    CheckUidValidities,
    DeleteOrphans,
    UpdateFlags,
    AppendMissing,
}

impl Display for MirrorPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MirrorPhase::CheckUidValidities => write!(f, "checking uid validities"),
            MirrorPhase::DeleteOrphans => write!(f, "deleting destination-only messages"),
            MirrorPhase::UpdateFlags => write!(f, "updating flags"),
            MirrorPhase::AppendMissing => write!(f, "appending new messages"),
        }
    }
}

/// Mirror run events, injected so the synchronizer stays free of global
/// logging state.
pub trait Progress {
    fn on_phase(&mut self, _phase: MirrorPhase) {}

    fn on_map_loaded(&mut self, _entries: usize) {}

    fn on_epoch_reset(&mut self, _source: UidValidity, _destination: UidValidity) {}

    fn on_orphans_deleted(&mut self, _count: usize) {}

    fn on_flags_updated(&mut self, _destination_uid: Uid) {}

    fn on_appended(&mut self, _source_uid: Uid, _destination_uid: Uid) {}
}

pub struct LogProgress;

impl Progress for LogProgress {
    fn on_phase(&mut self, phase: MirrorPhase) {
        debug!("{phase}");
    }

    fn on_map_loaded(&mut self, entries: usize) {
        debug!("loaded uid map with {entries} entries");
    }

    fn on_epoch_reset(&mut self, source: UidValidity, destination: UidValidity) {
        info!("uid validity changed, rebuilding destination under pair {source}/{destination}");
    }

    fn on_orphans_deleted(&mut self, count: usize) {
        info!("deleted {count} destination-only messages");
    }

    fn on_flags_updated(&mut self, destination_uid: Uid) {
        debug!("updated flags of destination uid {destination_uid}");
    }

    fn on_appended(&mut self, source_uid: Uid, destination_uid: Uid) {
        debug!("appended source uid {source_uid} as destination uid {destination_uid}");
    }
}
