use anyhow::Result;

use crate::{config::Config, imap::check_connection};

pub async fn check(config: &Config, account: &str) -> Result<()> {
    let account = config.account(account)?;
    let outcome = check_connection(account).await;
    println!("{outcome}");

    Ok(())
}
