use std::fmt::Display;

use log::debug;

use super::{Client, Connection, client::LoginError};
use crate::config::{AccountConfig, AuthConfig};

/// Result of one login attempt. No retries, no state.
pub enum CheckOutcome {
    Success,
    NoResponse,
    Unexpected(String),
}

impl Display for CheckOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckOutcome::Success => write!(f, "Connection successful"),
            CheckOutcome::NoResponse => write!(f, "No response"),
            CheckOutcome::Unexpected(description) => write!(f, "Unexpected error: {description}"),
        }
    }
}

pub async fn check_connection(account: &AccountConfig) -> CheckOutcome {
    let AuthConfig::Plain(plain) = account.auth();
    let password = match plain.password() {
        Ok(password) => password,
        Err(error) => return CheckOutcome::Unexpected(error.to_string()),
    };
    let connection = match Connection::connect_to(account.host(), account.port()).await {
        Ok((connection, _)) => connection,
        Err(error) => return CheckOutcome::Unexpected(error.to_string()),
    };
    match Client::new(connection).login(plain.user(), &password).await {
        Ok(session) => {
            if let Err(error) = session.logout().await {
                debug!("logout after probe failed: {error}");
            }
            CheckOutcome::Success
        }
        Err(LoginError::Rejected) => CheckOutcome::NoResponse,
        Err(error) => CheckOutcome::Unexpected(error.to_string()),
    }
}
