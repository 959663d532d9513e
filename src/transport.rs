//! Line-oriented byte transports carrying SCPI traffic.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{Error, Result};

/// Raw-socket SCPI port used by LXI instruments.
pub const DEFAULT_PORT: u16 = 5025;

const TERMINATOR: u8 = b'\n';

#[async_trait]
pub trait Transport: Send {
    /// Write `line` followed by the line terminator.
    async fn send_line(&mut self, line: &str) -> Result<()>;

    /// Read one line, without its terminator.
    async fn recv_line(&mut self) -> Result<String>;
}

/// A [`Transport`] over any tokio byte stream.
pub struct StreamTransport<S> {
    inner: BufReader<S>,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            inner: BufReader::new(stream),
        }
    }

    pub fn into_inner(self) -> S {
        self.inner.into_inner()
    }
}

#[async_trait]
impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send_line(&mut self, line: &str) -> Result<()> {
        let mut frame = Vec::with_capacity(line.len() + 1);
        frame.extend_from_slice(line.as_bytes());
        frame.push(TERMINATOR);

        let stream = self.inner.get_mut();
        stream.write_all(&frame).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn recv_line(&mut self) -> Result<String> {
        let mut buf = Vec::new();
        self.inner.read_until(TERMINATOR, &mut buf).await?;

        if buf.pop() != Some(TERMINATOR) {
            return Err(Error::Protocol(
                "connection closed before a complete reply line was received".to_string(),
            ));
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }

        String::from_utf8(buf)
            .map_err(|e| Error::Protocol(format!("reply is not valid UTF-8: {e}")))
    }
}

/// TCP transport that opens its socket on first use.
///
/// Construction performs no I/O, so an unreachable host is only reported by
/// the first `send_line`/`recv_line` call.
pub struct TcpTransport {
    host: String,
    port: u16,
    stream: Option<StreamTransport<TcpStream>>,
}

impl TcpTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            stream: None,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn stream(&mut self) -> Result<&mut StreamTransport<TcpStream>> {
        let stream = match self.stream.take() {
            Some(stream) => stream,
            None => {
                debug!("connecting to {}:{}", self.host, self.port);
                let socket = TcpStream::connect((self.host.as_str(), self.port)).await?;
                socket.set_nodelay(true)?;
                StreamTransport::new(socket)
            }
        };
        Ok(self.stream.insert(stream))
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        self.stream().await?.send_line(line).await
    }

    async fn recv_line(&mut self) -> Result<String> {
        self.stream().await?.recv_line().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, duplex};

    #[tokio::test]
    async fn send_line_appends_terminator() {
        let (client, mut server) = duplex(64);
        let mut transport = StreamTransport::new(client);

        transport.send_line("MEAS:VOLT? (@1)").await.unwrap();

        let mut buf = [0u8; 16];
        let n = server.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"MEAS:VOLT? (@1)\n");
    }

    #[tokio::test]
    async fn recv_line_strips_crlf() {
        let (client, mut server) = duplex(64);
        let mut transport = StreamTransport::new(client);

        server.write_all(b"+1.250000E+01\r\n2\n").await.unwrap();

        assert_eq!(transport.recv_line().await.unwrap(), "+1.250000E+01");
        assert_eq!(transport.recv_line().await.unwrap(), "2");
    }

    #[tokio::test]
    async fn recv_line_reports_closed_stream() {
        let (client, mut server) = duplex(64);
        let mut transport = StreamTransport::new(client);

        server.write_all(b"1.5").await.unwrap();
        drop(server);

        let err = transport.recv_line().await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn recv_line_rejects_invalid_utf8() {
        let (client, mut server) = duplex(64);
        let mut transport = StreamTransport::new(client);

        server.write_all(&[0xff, 0xfe, b'\n']).await.unwrap();

        let err = transport.recv_line().await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)), "unexpected error: {err:?}");
    }

    #[test]
    fn tcp_transport_is_lazy() {
        let transport = TcpTransport::new("10.0.0.5", DEFAULT_PORT);
        assert_eq!(transport.host(), "10.0.0.5");
        assert_eq!(transport.port(), 5025);
        assert!(!transport.is_connected());
    }
}
