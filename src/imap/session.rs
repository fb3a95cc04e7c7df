use std::{borrow::Cow, io};

use futures::{Stream, TryStreamExt as _};
use imap_proto::{Response, Status};
use log::debug;
use thiserror::Error;

use super::{codec::ResponseData, folder::RemoteFolder, send_command::SendCommand};

/// An authenticated connection. Folder handles borrow it one at a time, so
/// all commands of one run stay serialized on the single connection.
#[derive(Debug)]
pub struct Session<T: SendCommand> {
    connection: T,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("server rejected command: {0}")]
    Rejected(String),
    #[error("server sent unusable response: {0}")]
    Protocol(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl<T: SendCommand> Session<T> {
    pub(crate) fn new(connection: T) -> Self {
        Self { connection }
    }

    pub fn folder<'s>(&'s mut self, mailbox: &'s str) -> RemoteFolder<'s, T> {
        RemoteFolder::new(self, mailbox)
    }

    pub(crate) fn send<'a>(&'a mut self, command: &'a str) -> T::Responses<'a> {
        self.connection.send(command)
    }

    pub(crate) fn send_with_literal<'a>(
        &'a mut self,
        command: &'a str,
        literal: &'a [u8],
    ) -> T::Responses<'a> {
        self.connection.send_with_literal(command, literal)
    }

    pub async fn logout(mut self) -> Result<(), CommandError> {
        debug!("LOGOUT");
        let mut responses = self.connection.send("LOGOUT");
        run_to_done(&mut responses).await
    }
}

#[cfg(test)]
impl Session<super::mock_connection::MockConnection> {
    pub fn connection_log(&self) -> Vec<String> {
        self.connection.commands.clone()
    }

    pub fn literal_log(&self) -> Vec<Vec<u8>> {
        self.connection.literals.clone()
    }
}

/// Drains a response stream, discarding untagged data, and reports the tagged
/// completion result.
pub(crate) async fn run_to_done<S>(responses: &mut S) -> Result<(), CommandError>
where
    S: Stream<Item = io::Result<ResponseData>> + Unpin,
{
    while let Some(response) = responses.try_next().await? {
        if let Response::Done {
            status,
            information,
            ..
        } = response.parsed()
        {
            return match status {
                Status::Ok => Ok(()),
                _ => Err(CommandError::Rejected(info_string(information))),
            };
        }
    }

    Err(CommandError::Io(closed_early()))
}

pub(crate) fn info_string(information: &Option<Cow<'_, str>>) -> String {
    information
        .as_ref()
        .map_or_else(String::new, ToString::to_string)
}

pub(crate) fn closed_early() -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "connection closed before command completion",
    )
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;
    use crate::imap::mock_connection::MockConnection;

    #[rstest]
    #[tokio::test]
    async fn test_logout_runs_to_tagged_completion() {
        let connection = MockConnection::new(&[&[
            b"* BYE IMAP4rev1 Server logging out\r\n",
            b"0000 OK LOGOUT completed\r\n",
        ]]);
        let session = Session::new(connection);

        assert_ok!(session.logout().await);
    }

    #[rstest]
    #[tokio::test]
    async fn test_rejected_commands_carry_the_server_information() {
        let connection = MockConnection::new(&[&[b"0000 NO not now\r\n"]]);
        let session = Session::new(connection);

        let error = assert_err!(session.logout().await);
        assert_matches!(error, CommandError::Rejected(_));
        assert_eq!("server rejected command: not now", error.to_string());
    }

    #[rstest]
    #[tokio::test]
    async fn test_truncated_streams_surface_as_io_errors() {
        let connection = MockConnection::new(&[&[b"* BYE whoops\r\n"]]);
        let session = Session::new(connection);

        let error = assert_err!(session.logout().await);
        assert_matches!(error, CommandError::Io(_));
    }
}
