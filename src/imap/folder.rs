use anyhow::{Context as _, Result};
use derive_builder::Builder;
use derive_getters::Getters;
use enumflags2::BitFlags;
use futures::TryStreamExt as _;
use imap_proto::{AttributeValue, MailboxDatum, Response, ResponseCode, Status, UidSetMember};
use log::debug;

use super::{
    quoted,
    send_command::SendCommand,
    session::{CommandError, Session, closed_early, info_string, run_to_done},
};
use crate::{
    repository::{Flag, SequenceSet, Uid, UidValidity},
    sync::DestinationFolder,
};

/// Handle on one remote mailbox, speaking through the owning session.
pub struct RemoteFolder<'s, T: SendCommand> {
    session: &'s mut Session<T>,
    mailbox: &'s str,
    status: Option<FolderStatus>,
}

#[derive(Builder, Clone, Copy, Debug, Getters)]
pub struct FolderStatus {
    exists: u32,
    uid_validity: UidValidity,
}

impl<'s, T: SendCommand> RemoteFolder<'s, T> {
    pub(crate) fn new(session: &'s mut Session<T>, mailbox: &'s str) -> Self {
        Self {
            session,
            mailbox,
            status: None,
        }
    }

    async fn select(&mut self) -> Result<FolderStatus, CommandError> {
        let command = format!("SELECT {}", quoted(self.mailbox));
        debug!("{command}");
        let mut responses = self.session.send(&command);
        let mut builder = FolderStatusBuilder::default();
        loop {
            let Some(response) = responses.try_next().await? else {
                return Err(CommandError::Io(closed_early()));
            };
            match response.parsed() {
                Response::MailboxData(MailboxDatum::Exists(exists)) => {
                    builder.exists(*exists);
                }
                Response::Data {
                    status: Status::Ok,
                    code: Some(ResponseCode::UidValidity(validity)),
                    ..
                } => {
                    builder.uid_validity(
                        UidValidity::try_from(*validity)
                            .map_err(|error| CommandError::Protocol(error.to_string()))?,
                    );
                }
                Response::Done {
                    status: Status::Ok, ..
                } => break,
                Response::Done { information, .. } => {
                    return Err(CommandError::Rejected(info_string(information)));
                }
                _ => {}
            }
        }

        builder
            .build()
            .map_err(|error| CommandError::Protocol(error.to_string()))
    }

    async fn ensure_selected(&mut self) -> Result<FolderStatus, CommandError> {
        if let Some(status) = self.status {
            return Ok(status);
        }
        let status = self.select().await?;
        self.status = Some(status);

        Ok(status)
    }

    async fn run(&mut self, command: &str) -> Result<(), CommandError> {
        debug!("{command}");
        let mut responses = self.session.send(command);
        run_to_done(&mut responses).await
    }
}

impl<T: SendCommand> DestinationFolder for RemoteFolder<'_, T> {
    async fn exists(&mut self) -> Result<bool> {
        let command = format!("LIST \"\" {}", quoted(self.mailbox));
        debug!("{command}");
        let mut responses = self.session.send(&command);
        let mut found = false;
        loop {
            let Some(response) = responses.try_next().await? else {
                return Err(CommandError::Io(closed_early()).into());
            };
            match response.parsed() {
                Response::MailboxData(MailboxDatum::List { .. }) => found = true,
                Response::Done {
                    status: Status::Ok, ..
                } => break,
                Response::Done { information, .. } => {
                    return Err(CommandError::Rejected(info_string(information)).into());
                }
                _ => {}
            }
        }

        Ok(found)
    }

    async fn create(&mut self) -> Result<()> {
        let command = format!("CREATE {}", quoted(self.mailbox));
        self.run(&command)
            .await
            .with_context(|| format!("cannot create mailbox {}", self.mailbox))?;

        Ok(())
    }

    async fn uid_validity(&mut self) -> Result<UidValidity> {
        Ok(*self.ensure_selected().await?.uid_validity())
    }

    async fn uids(&mut self) -> Result<Vec<Uid>> {
        let status = self.ensure_selected().await?;
        // fetching over an empty mailbox is rejected by some servers
        if status.exists() == 0 {
            return Ok(Vec::new());
        }
        let command = "UID FETCH 1:* (UID)";
        debug!("{command}");
        let mut responses = self.session.send(command);
        let mut uids = Vec::new();
        loop {
            let Some(response) = responses.try_next().await? else {
                return Err(CommandError::Io(closed_early()).into());
            };
            match response.parsed() {
                Response::Fetch(_, attributes) => {
                    for attribute in attributes {
                        if let AttributeValue::Uid(value) = attribute {
                            uids.push(
                                Uid::try_from(*value)
                                    .map_err(|error| CommandError::Protocol(error.to_string()))?,
                            );
                        }
                    }
                }
                Response::Done {
                    status: Status::Ok, ..
                } => break,
                Response::Done { information, .. } => {
                    return Err(CommandError::Rejected(info_string(information)).into());
                }
                _ => {}
            }
        }
        uids.sort_unstable();

        Ok(uids)
    }

    async fn fetch_flags(&mut self, uids: &[Uid]) -> Result<Vec<(Uid, BitFlags<Flag>)>> {
        let set = SequenceSet::try_from(uids).expect("flag fetches should never target no uids");
        let command = format!("UID FETCH {set} (FLAGS)");
        debug!("{command}");
        let mut responses = self.session.send(&command);
        let mut uids_and_flags = Vec::new();
        loop {
            let Some(response) = responses.try_next().await? else {
                return Err(CommandError::Io(closed_early()).into());
            };
            match response.parsed() {
                Response::Fetch(_, attributes) => {
                    let mut uid = None;
                    let mut flags = BitFlags::empty();
                    for attribute in attributes {
                        match attribute {
                            AttributeValue::Uid(value) => uid = Uid::try_from(*value).ok(),
                            AttributeValue::Flags(values) => {
                                flags = Flag::into_bitflags(values);
                            }
                            _ => {}
                        }
                    }
                    let uid = uid.ok_or_else(|| {
                        CommandError::Protocol("fetch response without a uid".to_string())
                    })?;
                    uids_and_flags.push((uid, flags));
                }
                Response::Done {
                    status: Status::Ok, ..
                } => break,
                Response::Done { information, .. } => {
                    return Err(CommandError::Rejected(info_string(information)).into());
                }
                _ => {}
            }
        }

        Ok(uids_and_flags)
    }

    async fn set_flags(&mut self, uids: &[Uid], flags: BitFlags<Flag>) -> Result<()> {
        let set = SequenceSet::try_from(uids).expect("flag updates should never target no uids");
        let command = format!(
            "UID STORE {set} FLAGS.SILENT ({})",
            Flag::format(flags).unwrap_or_default()
        );
        self.run(&command).await?;

        Ok(())
    }

    async fn append(&mut self, flags: BitFlags<Flag>, content: &[u8]) -> Result<Uid> {
        let command = format!(
            "APPEND {} ({}) {{{}}}",
            quoted(self.mailbox),
            Flag::format(flags).unwrap_or_default(),
            content.len()
        );
        debug!("{command}");
        let mut responses = self.session.send_with_literal(&command, content);
        let mut appended_uid = None;
        loop {
            let Some(response) = responses.try_next().await? else {
                return Err(CommandError::Io(closed_early()).into());
            };
            if let Response::Done {
                status,
                code,
                information,
                ..
            } = response.parsed()
            {
                if !matches!(status, Status::Ok) {
                    return Err(CommandError::Rejected(info_string(information)).into());
                }
                if let Some(ResponseCode::AppendUid(_, members)) = code
                    && let [UidSetMember::Uid(value)] = members.as_slice()
                {
                    appended_uid = Some(
                        Uid::try_from(*value)
                            .map_err(|error| CommandError::Protocol(error.to_string()))?,
                    );
                }
                break;
            }
        }
        self.status = None;

        appended_uid.context("server did not report the appended uid, is UIDPLUS supported?")
    }

    async fn delete_multi(&mut self, uids: &[Uid]) -> Result<()> {
        let set = SequenceSet::try_from(uids).expect("deletions should never target no uids");
        self.run(&format!(r"UID STORE {set} +FLAGS.SILENT (\Deleted)"))
            .await?;
        self.run(&format!("UID EXPUNGE {set}")).await?;
        self.status = None;

        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        let status = self.ensure_selected().await?;
        if status.exists() > 0 {
            let all = SequenceSet::all();
            self.run(&format!(r"UID STORE {all} +FLAGS.SILENT (\Deleted)"))
                .await?;
            self.run("EXPUNGE").await?;
            self.status = None;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;
    use crate::imap::mock_connection::MockConnection;

    const SELECT: &[&[u8]] = &[
        b"* 3 EXISTS\r\n",
        b"* OK [UIDVALIDITY 85] UIDs valid\r\n",
        b"* OK [UIDNEXT 131] Predicted next UID\r\n",
        b"0000 OK [READ-WRITE] Select completed\r\n",
    ];

    fn uid(num: u32) -> Uid {
        assert_ok!(Uid::try_from(num))
    }

    fn session(scripts: &[&[&[u8]]]) -> Session<MockConnection> {
        Session::new(MockConnection::new(scripts))
    }

    #[rstest]
    #[tokio::test]
    async fn test_select_reports_uid_validity_and_is_cached() {
        let mut session = session(&[SELECT]);
        let mut folder = session.folder("INBOX");

        let validity = assert_ok!(folder.uid_validity().await);
        assert_eq!(assert_ok!(UidValidity::try_from(85)), validity);
        // second call answers from the cached selection
        assert_ok!(folder.uid_validity().await);
        assert_eq!(vec![r#"SELECT "INBOX""#], folder.session.connection_log());
    }

    #[rstest]
    #[tokio::test]
    async fn test_uids_lists_the_folder_with_a_uid_fetch() {
        let mut session = session(&[
            SELECT,
            &[
                b"* 1 FETCH (UID 120)\r\n",
                b"* 2 FETCH (UID 101)\r\n",
                b"* 3 FETCH (UID 130)\r\n",
                b"0001 OK Fetch completed\r\n",
            ],
        ]);
        let mut folder = session.folder("INBOX");

        let uids = assert_ok!(folder.uids().await);
        assert_eq!(vec![uid(101), uid(120), uid(130)], uids);
    }

    #[rstest]
    #[tokio::test]
    async fn test_uids_of_an_empty_folder_skip_the_fetch() {
        let mut session = session(&[&[
            b"* 0 EXISTS\r\n",
            b"* OK [UIDVALIDITY 85] UIDs valid\r\n",
            b"0000 OK [READ-WRITE] Select completed\r\n",
        ]]);
        let mut folder = session.folder("INBOX");

        let uids = assert_ok!(folder.uids().await);
        assert!(uids.is_empty());
        assert_eq!(vec![r#"SELECT "INBOX""#], folder.session.connection_log());
    }

    #[rstest]
    #[tokio::test]
    async fn test_fetch_flags_drops_recent_and_unknown_flags() {
        let mut session = session(&[&[
            b"* 5 FETCH (FLAGS (\\Seen \\Recent) UID 120)\r\n",
            b"0000 OK Fetch completed\r\n",
        ]]);
        let mut folder = session.folder("INBOX");

        let flags = assert_ok!(folder.fetch_flags(&[uid(120)]).await);
        assert_eq!(vec![(uid(120), BitFlags::from(Flag::Seen))], flags);
    }

    #[rstest]
    #[tokio::test]
    async fn test_append_transmits_the_literal_and_reports_the_new_uid() {
        let mut session = session(&[&[b"0000 OK [APPENDUID 85 131] Append completed\r\n"]]);
        let mut folder = session.folder("INBOX");

        let appended = assert_ok!(folder.append(Flag::Seen.into(), b"From: a\r\n\r\nbody").await);

        assert_eq!(uid(131), appended);
        assert_eq!(
            vec![r#"APPEND "INBOX" (\Seen) {15}"#],
            folder.session.connection_log()
        );
        assert_eq!(
            vec![b"From: a\r\n\r\nbody".to_vec()],
            folder.session.literal_log()
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_append_without_appenduid_fails() {
        let mut session = session(&[&[b"0000 OK Append completed\r\n"]]);
        let mut folder = session.folder("INBOX");

        assert_err!(folder.append(BitFlags::empty(), b"body").await);
    }

    #[rstest]
    #[tokio::test]
    async fn test_exists_checks_the_list_response() {
        let mut session = session(&[
            &[
                b"* LIST (\\HasNoChildren) \".\" \"INBOX\"\r\n",
                b"0000 OK List completed\r\n",
            ],
            &[b"0001 OK List completed\r\n"],
        ]);
        let mut folder = session.folder("INBOX");
        assert!(assert_ok!(folder.exists().await));

        let mut folder = session.folder("Archive");
        assert!(!assert_ok!(folder.exists().await));
    }

    #[rstest]
    #[tokio::test]
    async fn test_delete_multi_marks_deleted_then_expunges_the_same_set() {
        let mut session = session(&[
            &[b"0000 OK Store completed\r\n"],
            &[b"* 1 EXPUNGE\r\n", b"0001 OK Expunge completed\r\n"],
        ]);
        let mut folder = session.folder("INBOX");

        assert_ok!(folder.delete_multi(&[uid(101), uid(102), uid(130)]).await);

        assert_eq!(
            vec![
                r"UID STORE 101:102,130 +FLAGS.SILENT (\Deleted)".to_string(),
                "UID EXPUNGE 101:102,130".to_string(),
            ],
            folder.session.connection_log()
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_clear_of_an_empty_folder_sends_nothing() {
        let mut session = session(&[&[
            b"* 0 EXISTS\r\n",
            b"* OK [UIDVALIDITY 85] UIDs valid\r\n",
            b"0000 OK [READ-WRITE] Select completed\r\n",
        ]]);
        let mut folder = session.folder("INBOX");

        assert_ok!(folder.clear().await);
        assert_eq!(vec![r#"SELECT "INBOX""#], folder.session.connection_log());
    }
}
