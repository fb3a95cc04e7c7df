use std::{io, mem};

use bytes::{BufMut as _, Bytes, BytesMut};
use imap_proto::{Request, RequestId, Response};
use nom::Needed;
use tokio_util::codec::{Decoder, Encoder};

#[derive(Debug, Default)]
pub struct ImapCodec {
    decode_need_message_bytes: usize,
}

/// One server response, owning the bytes it was parsed from.
#[derive(Debug)]
pub struct ResponseData {
    // `response` borrows from `raw`; the field keeps the allocation alive
    #[expect(dead_code)]
    raw: Bytes,
    response: Response<'static>,
}

impl ResponseData {
    pub fn request_id(&self) -> Option<&RequestId> {
        match self.response {
            Response::Done { ref tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn parsed(&self) -> &Response<'_> {
        &self.response
    }
}

impl Decoder for ImapCodec {
    type Item = ResponseData;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, io::Error> {
        if self.decode_need_message_bytes > buf.len() {
            return Ok(None);
        }
        let (response, consumed) = match imap_proto::parser::parse_response(buf) {
            Ok((remaining, response)) => {
                // Safety: the parsed response points into the BytesMut
                // allocation, which `split_to().freeze()` below hands over to
                // `raw` without moving it.
                let response =
                    unsafe { mem::transmute::<Response<'_>, Response<'static>>(response) };
                (response, buf.len() - remaining.len())
            }
            Err(nom::Err::Incomplete(Needed::Size(min))) => {
                self.decode_need_message_bytes = buf.len() + min.get();
                return Ok(None);
            }
            Err(nom::Err::Incomplete(Needed::Unknown)) => {
                return Ok(None);
            }
            Err(nom::Err::Error(_) | nom::Err::Failure(_)) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unparsable response: {buf:?}"),
                ));
            }
        };
        let raw = buf.split_to(consumed).freeze();
        self.decode_need_message_bytes = 0;

        Ok(Some(ResponseData { raw, response }))
    }
}

impl<'a> Encoder<&'a Request<'a>> for ImapCodec {
    type Error = io::Error;

    // an empty tag marks continuation data, sent without tag and separator
    fn encode(&mut self, request: &'a Request<'a>, dst: &mut BytesMut) -> Result<(), io::Error> {
        let Request(tag, data) = request;
        dst.reserve(tag.len() + data.len() + 3);
        if !tag.is_empty() {
            dst.put_slice(tag);
            dst.put_u8(b' ');
        }
        dst.put_slice(data);
        dst.put_slice(b"\r\n");

        Ok(())
    }
}
