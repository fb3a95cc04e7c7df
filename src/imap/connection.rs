use std::io;

use futures::StreamExt as _;
use log::{debug, trace};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_native_tls::{TlsConnector, TlsStream, native_tls};
use tokio_util::codec::Framed;

use super::{
    codec::{ImapCodec, ResponseData},
    response_stream::ResponseStream,
    send_command::SendCommand,
    tag_generator::TagGenerator,
};

pub(crate) type ImapStream = Framed<TlsStream<TcpStream>, ImapCodec>;

pub struct Connection {
    stream: ImapStream,
    tag_generator: TagGenerator,
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("TLS setup failed: {0}")]
    Tls(#[from] native_tls::Error),
    #[error("cannot reach server: {0}")]
    Io(#[from] io::Error),
    #[error("server closed the connection before greeting")]
    ClosedBeforeGreeting,
}

impl Connection {
    pub async fn connect_to(host: &str, port: u16) -> Result<(Self, ResponseData), ConnectError> {
        debug!("connecting to {host}:{port}");
        let tls = native_tls::TlsConnector::new()?;
        let tls = TlsConnector::from(tls);
        let stream = TcpStream::connect((host, port)).await?;
        let stream = tls.connect(host, stream).await?;

        let mut stream = Framed::new(stream, ImapCodec::default());

        let greeting = stream
            .next()
            .await
            .ok_or(ConnectError::ClosedBeforeGreeting)??;
        trace!("greeting = {:?}", greeting.parsed());

        Ok((
            Connection {
                stream,
                tag_generator: TagGenerator::default(),
            },
            greeting,
        ))
    }
}

impl SendCommand for Connection {
    type Responses<'a>
        = ResponseStream<'a>
    where
        Self: 'a;

    fn send<'a>(&'a mut self, command: &'a str) -> Self::Responses<'a> {
        ResponseStream::new(&mut self.stream, &mut self.tag_generator, command, None)
    }

    fn send_with_literal<'a>(
        &'a mut self,
        command: &'a str,
        literal: &'a [u8],
    ) -> Self::Responses<'a> {
        ResponseStream::new(
            &mut self.stream,
            &mut self.tag_generator,
            command,
            Some(literal),
        )
    }
}
