use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::transport::Transport;

/// Request/response primitive the instrument catalog is built on.
///
/// `query` sends one command line and returns the single reply line.
/// Callers hold `&mut self`, so at most one exchange is in flight per
/// connection.
#[async_trait]
pub trait Connection: Send {
    async fn query(&mut self, command: &str) -> Result<String>;
}

#[async_trait]
impl<C: Connection + ?Sized> Connection for Box<C> {
    async fn query(&mut self, command: &str) -> Result<String> {
        (**self).query(command).await
    }
}

#[async_trait]
impl<C: Connection + ?Sized> Connection for &mut C {
    async fn query(&mut self, command: &str) -> Result<String> {
        (**self).query(command).await
    }
}

/// SCPI framing over a line transport.
pub struct ScpiProtocol<T> {
    transport: T,
}

impl<T: Transport> ScpiProtocol<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}

#[async_trait]
impl<T: Transport> Connection for ScpiProtocol<T> {
    async fn query(&mut self, command: &str) -> Result<String> {
        debug!("SCPI query  -> {}", command);
        self.transport.send_line(command).await?;
        let reply = self.transport.recv_line().await?;
        debug!("SCPI result <- {}", reply);
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::transport::StreamTransport;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, duplex};

    #[tokio::test]
    async fn query_writes_command_and_returns_reply() {
        let (client, server) = duplex(256);
        let mut protocol = ScpiProtocol::new(StreamTransport::new(client));

        let device = tokio::spawn(async move {
            let mut server = BufReader::new(server);
            let mut line = String::new();
            server.read_line(&mut line).await.unwrap();
            server.get_mut().write_all(b"+5.000000E+00\n").await.unwrap();
            line
        });

        let reply = protocol.query("VOLT:LIM? (@3)").await.unwrap();
        assert_eq!(reply, "+5.000000E+00");
        assert_eq!(device.await.unwrap(), "VOLT:LIM? (@3)\n");
    }

    #[tokio::test]
    async fn query_propagates_missing_reply() {
        let (client, server) = duplex(256);
        let mut protocol = ScpiProtocol::new(StreamTransport::new(client));
        drop(server);

        let err = protocol.query("OUTP? (@1)").await.unwrap_err();
        assert!(
            matches!(err, Error::Transport(_) | Error::Protocol(_)),
            "unexpected error: {err:?}"
        );
    }
}
