use std::collections::HashSet;

use anyhow::Result;
use serde::Serialize;

use crate::{
    archive::{Archive, ArchiveOpenError},
    cli::login,
    config::Config,
    repository::Uid,
    sync::{DestinationFolder as _, SourceStore as _},
};

#[derive(Serialize)]
struct FolderStat {
    folder: String,
    remote: usize,
    both: usize,
    local: usize,
}

pub async fn stats(config: &Config, account_name: &str, json: bool) -> Result<()> {
    let account = config.account(account_name)?;
    let archive_dir = config.archive_dir(account_name);
    let mut session = login(account).await?;
    let mut stats = Vec::new();
    for folder_name in account.folders() {
        let mut folder = session.folder(folder_name);
        if !folder.exists().await? {
            continue;
        }
        let remote_uids: HashSet<Uid> = folder.uids().await?.into_iter().collect();
        let local_uids: HashSet<Uid> = match Archive::open(&archive_dir, folder_name) {
            Ok(archive) => archive.uids()?.into_iter().collect(),
            Err(ArchiveOpenError::Missing { .. }) => HashSet::new(),
            Err(error) => return Err(error.into()),
        };
        stats.push(FolderStat {
            folder: folder_name.clone(),
            remote: remote_uids.difference(&local_uids).count(),
            both: remote_uids.intersection(&local_uids).count(),
            local: local_uids.difference(&remote_uids).count(),
        });
    }
    session.logout().await?;

    if json {
        println!("{}", serde_json::to_string(&stats)?);
    } else {
        print_table(&stats);
    }

    Ok(())
}

fn print_table(stats: &[FolderStat]) {
    println!("{:<20}|{:>8}|{:>8}|{:>8}", "folder", "remote", "both", "local");
    println!("{}|{}|{}|{}", "-".repeat(20), "-".repeat(8), "-".repeat(8), "-".repeat(8));
    for stat in stats {
        println!(
            "{:<20}|{:>8}|{:>8}|{:>8}",
            stat.folder, stat.remote, stat.both, stat.local
        );
    }
}
