use std::io;

use futures::TryStreamExt as _;
use imap_proto::{Response, Status};
use log::debug;
use thiserror::Error;

use super::{quoted, send_command::SendCommand, session::Session};

pub struct Client<T: SendCommand> {
    connection: T,
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("username or password rejected")]
    Rejected,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl<T: SendCommand> Client<T> {
    pub fn new(connection: T) -> Self {
        Self { connection }
    }

    pub async fn login(mut self, username: &str, password: &str) -> Result<Session<T>, LoginError> {
        debug!("LOGIN <user> <password>");
        let command = format!("LOGIN {} {}", quoted(username), quoted(password));
        let accepted = {
            let mut responses = self.connection.send(&command);
            loop {
                let Some(response) = responses.try_next().await? else {
                    return Err(LoginError::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed during login",
                    )));
                };
                if let Response::Done { status, .. } = response.parsed() {
                    break matches!(status, Status::Ok);
                }
            }
        };

        if accepted {
            Ok(Session::new(self.connection))
        } else {
            Err(LoginError::Rejected)
        }
    }
}
