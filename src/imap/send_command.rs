use std::io;

use futures::Stream;

use super::codec::ResponseData;

/// Seam between the command layer and the wire, one response stream per
/// command. Streams end after the tagged completion response.
pub trait SendCommand {
    type Responses<'a>: Stream<Item = io::Result<ResponseData>> + Unpin
    where
        Self: 'a;

    fn send<'a>(&'a mut self, command: &'a str) -> Self::Responses<'a>;

    /// Like [`Self::send`] for commands carrying an IMAP literal; the literal
    /// is transmitted in answer to the server's continuation request.
    fn send_with_literal<'a>(&'a mut self, command: &'a str, literal: &'a [u8])
    -> Self::Responses<'a>;
}
