use std::{collections::VecDeque, io, vec};

use bytes::BytesMut;
use futures::stream;
use tokio_util::codec::Decoder as _;

use super::{
    codec::{ImapCodec, ResponseData},
    send_command::SendCommand,
};

/// Connection scripted from raw server response bytes, one response group per
/// expected command.
#[derive(Debug)]
pub struct MockConnection {
    scripted: VecDeque<Vec<ResponseData>>,
    pub commands: Vec<String>,
    pub literals: Vec<Vec<u8>>,
}

impl MockConnection {
    pub fn new(scripts: &[&[&[u8]]]) -> Self {
        let scripted = scripts
            .iter()
            .map(|responses| responses.iter().map(|raw| parse(raw)).collect())
            .collect();

        Self {
            scripted,
            commands: Vec::new(),
            literals: Vec::new(),
        }
    }
}

fn parse(raw: &[u8]) -> ResponseData {
    let mut buf = BytesMut::from(raw);
    ImapCodec::default()
        .decode(&mut buf)
        .expect("scripted response should be parsable")
        .expect("scripted response should be complete")
}

impl SendCommand for MockConnection {
    type Responses<'a>
        = stream::Iter<vec::IntoIter<io::Result<ResponseData>>>
    where
        Self: 'a;

    fn send<'a>(&'a mut self, command: &'a str) -> Self::Responses<'a> {
        self.commands.push(command.to_string());
        let responses: Vec<io::Result<ResponseData>> = self
            .scripted
            .pop_front()
            .unwrap_or_default()
            .into_iter()
            .map(Ok)
            .collect();

        stream::iter(responses)
    }

    fn send_with_literal<'a>(
        &'a mut self,
        command: &'a str,
        literal: &'a [u8],
    ) -> Self::Responses<'a> {
        self.literals.push(literal.to_vec());
        self.send(command)
    }
}
