use std::collections::HashSet;

use anyhow::{Result, ensure};
use enumflags2::BitFlags;
use log::info;

use crate::{
    archive::{Archive, ArchiveOpenError},
    cli::login,
    config::Config,
    repository::{Message, Uid},
    sync::{DestinationFolder as _, SourceStore as _},
};

const FAKE_EMAIL: &str = "fake@email.com";

/// Records a placeholder for every remote message missing locally, so history
/// is treated as already backed up.
pub async fn ignore_history(config: &Config, account_name: &str) -> Result<()> {
    let account = config.account(account_name)?;
    let archive_dir = config.archive_dir(account_name);
    let mut session = login(account).await?;
    for folder_name in account.folders() {
        let mut folder = session.folder(folder_name);
        if !folder.exists().await? {
            continue;
        }
        let uid_validity = folder.uid_validity().await?;
        let archive = match Archive::open(&archive_dir, folder_name) {
            Ok(archive) => {
                ensure!(
                    archive.uid_validity()? == uid_validity,
                    "archive of folder '{folder_name}' was created under a different uid validity"
                );
                archive
            }
            Err(ArchiveOpenError::Missing { .. }) => {
                Archive::create(&archive_dir, folder_name, uid_validity)?
            }
            Err(error) => return Err(error.into()),
        };

        let local_uids: HashSet<Uid> = archive.uids()?.into_iter().collect();
        let missing: Vec<Uid> = folder
            .uids()
            .await?
            .into_iter()
            .filter(|uid| !local_uids.contains(uid))
            .collect();
        info!("folder '{folder_name}' - {} messages", missing.len());

        for uid in missing {
            let content = format!(
                "From: {FAKE_EMAIL}\r\nSubject: Message {uid} not backed up\r\n\r\nSkipped {uid}\r\n"
            );
            archive.store(&Message::new(uid, BitFlags::empty(), content.into_bytes()))?;
        }
    }
    session.logout().await?;

    Ok(())
}
