use std::{
    borrow::Cow,
    io,
    pin::Pin,
    task::{Context, Poll, ready},
};

use futures::{SinkExt as _, Stream, TryStreamExt as _};
use imap_proto::{Request, Response};

use super::{codec::ResponseData, connection::ImapStream, tag_generator::TagGenerator};

enum ResponseStreamState {
    Start,
    Sending,
    Receiving,
    LiteralStart,
    LiteralSending,
    Done,
}

pub struct ResponseStream<'a> {
    imap_stream: &'a mut ImapStream,
    state: ResponseStreamState,
    tag: String,
    command: &'a str,
    literal: Option<&'a [u8]>,
}

impl<'a> ResponseStream<'a> {
    pub fn new(
        imap_stream: &'a mut ImapStream,
        tag_generator: &mut TagGenerator,
        command: &'a str,
        literal: Option<&'a [u8]>,
    ) -> Self {
        Self {
            imap_stream,
            state: ResponseStreamState::Start,
            tag: tag_generator.next(),
            command,
            literal,
        }
    }
}

impl Stream for ResponseStream<'_> {
    type Item = io::Result<ResponseData>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match this.state {
                ResponseStreamState::Start => {
                    if let Err(error) = ready!(this.imap_stream.poll_ready_unpin(cx)) {
                        this.state = ResponseStreamState::Done;
                        return Poll::Ready(Some(Err(error)));
                    }
                    let request = Request(
                        Cow::Borrowed(this.tag.as_bytes()),
                        Cow::Borrowed(this.command.as_bytes()),
                    );
                    if let Err(error) = this.imap_stream.start_send_unpin(&request) {
                        this.state = ResponseStreamState::Done;
                        return Poll::Ready(Some(Err(error)));
                    }
                    this.state = ResponseStreamState::Sending;
                }
                ResponseStreamState::Sending => {
                    if let Err(error) = ready!(this.imap_stream.poll_flush_unpin(cx)) {
                        this.state = ResponseStreamState::Done;
                        return Poll::Ready(Some(Err(error)));
                    }
                    this.state = ResponseStreamState::Receiving;
                }
                ResponseStreamState::Receiving => {
                    match ready!(this.imap_stream.try_poll_next_unpin(cx)) {
                        None => {
                            this.state = ResponseStreamState::Done;
                            return Poll::Ready(None);
                        }
                        Some(Ok(data)) => {
                            if matches!(data.parsed(), Response::Continue { .. })
                                && this.literal.is_some()
                            {
                                this.state = ResponseStreamState::LiteralStart;
                                continue;
                            }
                            if let Some(tag) = data.request_id() {
                                assert_eq!(
                                    tag.0,
                                    this.tag,
                                    "Response tag did not match request tag. This should never happen and indicates that something is seriously wrong.",
                                );
                                this.state = ResponseStreamState::Done;
                            }
                            return Poll::Ready(Some(Ok(data)));
                        }
                        Some(Err(error)) => {
                            this.state = ResponseStreamState::Done;
                            return Poll::Ready(Some(Err(error)));
                        }
                    }
                }
                ResponseStreamState::LiteralStart => {
                    if let Err(error) = ready!(this.imap_stream.poll_ready_unpin(cx)) {
                        this.state = ResponseStreamState::Done;
                        return Poll::Ready(Some(Err(error)));
                    }
                    let data = this
                        .literal
                        .take()
                        .expect("a literal should be pending in this state");
                    let request = Request(Cow::Borrowed(&[]), Cow::Borrowed(data));
                    if let Err(error) = this.imap_stream.start_send_unpin(&request) {
                        this.state = ResponseStreamState::Done;
                        return Poll::Ready(Some(Err(error)));
                    }
                    this.state = ResponseStreamState::LiteralSending;
                }
                ResponseStreamState::LiteralSending => {
                    if let Err(error) = ready!(this.imap_stream.poll_flush_unpin(cx)) {
                        this.state = ResponseStreamState::Done;
                        return Poll::Ready(Some(Err(error)));
                    }
                    this.state = ResponseStreamState::Receiving;
                }
                ResponseStreamState::Done => return Poll::Ready(None),
            }
        }
    }
}
