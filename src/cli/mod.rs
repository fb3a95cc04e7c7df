mod check;
mod mirror;
mod stats;
mod utils;

pub use check::check;
pub use mirror::mirror;
pub use stats::stats;
pub use utils::ignore_history;

use anyhow::Result;
use log::trace;

use crate::{
    config::{AccountConfig, AuthConfig},
    imap::{Client, Connection, Session},
};

pub(crate) async fn login(account: &AccountConfig) -> Result<Session<Connection>> {
    let AuthConfig::Plain(plain) = account.auth();
    let password = plain.password()?;
    let (connection, greeting) = Connection::connect_to(account.host(), account.port()).await?;
    trace!("greeting = {:?}", greeting.parsed());
    let session = Client::new(connection).login(plain.user(), &password).await?;

    Ok(session)
}
