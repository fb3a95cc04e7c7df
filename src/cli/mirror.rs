use std::path::PathBuf;

use anyhow::{Result, ensure};
use log::info;

use crate::{
    archive::Archive,
    cli::login,
    config::Config,
    sync::{LogProgress, Mirror},
};

pub async fn mirror(
    config: &Config,
    source: &str,
    destination: &str,
    only_folder: Option<&str>,
) -> Result<()> {
    let source_account = config.account(source)?;
    let destination_account = config.account(destination)?;
    let folders: Vec<&String> = match only_folder {
        Some(name) => {
            let folder = source_account.folders().iter().find(|folder| *folder == name);
            ensure!(
                folder.is_some(),
                "folder '{name}' is not configured for account '{source}'"
            );
            folder.into_iter().collect()
        }
        None => source_account.folders().iter().collect(),
    };

    let archive_dir = config.archive_dir(source);
    let mut session = login(destination_account).await?;
    for folder_name in folders {
        let archive = Archive::open(&archive_dir, folder_name)?;
        let map_path = map_path(&archive, destination);
        let mut folder = session.folder(folder_name);
        info!("mirroring {folder_name} of {source} to {destination}");
        let mut progress = LogProgress;
        let outcome = Mirror::new(&archive, &mut folder, map_path, &mut progress)
            .run()
            .await?;
        info!(
            "{folder_name}: {} deleted, {} flag updates, {} appended",
            outcome.orphans_deleted, outcome.flags_updated, outcome.appended
        );
    }
    session.logout().await?;

    Ok(())
}

// one map file per (archive path, destination account) pair
fn map_path(archive: &Archive, destination: &str) -> PathBuf {
    let mut path = archive.path().as_os_str().to_owned();
    path.push(".");
    path.push(destination);
    path.push(".mirror");

    PathBuf::from(path)
}
