use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::protocol::PacketHeader;

/// Any bidirectional byte stream a session can run over: a TCP connection,
/// its TLS upgrade, or an in-memory duplex in tests.
pub trait Socket: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Socket for T {}

/// A framed view over a socket.
///
/// Reads are buffered so a timed-out packet read never loses bytes: data
/// already pulled into the buffer stays there for the next attempt.
pub struct BufferedSocket {
    stream: Box<dyn Socket>,
    rbuf: BytesMut,
}

impl BufferedSocket {
    pub fn new(stream: Box<dyn Socket>) -> Self {
        Self {
            stream,
            rbuf: BytesMut::with_capacity(4096),
        }
    }

    /// Read the next framed packet. `Ok(None)` means the client closed the
    /// connection cleanly at a frame boundary; EOF mid-frame is an error.
    ///
    /// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_basic_packets.html
    pub async fn read_packet(&mut self) -> Result<Option<(PacketHeader, Bytes)>> {
        while self.rbuf.len() < 4 {
            if self.fill().await? == 0 {
                if self.rbuf.is_empty() {
                    return Ok(None);
                }

                return Err(unexpected_eof());
            }
        }

        let length = u32::from(self.rbuf[0])
            | (u32::from(self.rbuf[1]) << 8)
            | (u32::from(self.rbuf[2]) << 16);
        let seq_id = self.rbuf[3];

        let total = 4 + length as usize;
        while self.rbuf.len() < total {
            if self.fill().await? == 0 {
                return Err(unexpected_eof());
            }
        }

        let mut frame = self.rbuf.split_to(total).freeze();
        frame.advance(4);

        Ok(Some((PacketHeader { length, seq_id }, frame)))
    }

    /// [`read_packet`](Self::read_packet) under a deadline. Elapsing is a
    /// distinct, benign error the command loop can absorb.
    pub async fn read_packet_timeout(
        &mut self,
        limit: Duration,
    ) -> Result<Option<(PacketHeader, Bytes)>> {
        match tokio::time::timeout(limit, self.read_packet()).await {
            Ok(result) => result,
            Err(_) => Err(Error::ReadTimeout),
        }
    }

    /// Buffer up to `n` bytes without consuming them. May return fewer if
    /// the peer closes first.
    pub async fn peek(&mut self, n: usize) -> Result<&[u8]> {
        while self.rbuf.len() < n {
            if self.fill().await? == 0 {
                break;
            }
        }

        Ok(&self.rbuf[..self.rbuf.len().min(n)])
    }

    pub async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.stream.write_all(buf).await?;
        self.stream.flush().await?;

        Ok(())
    }

    /// Surrender the socket plus whatever was read ahead, for a TLS upgrade.
    pub fn into_parts(self) -> (Box<dyn Socket>, Bytes) {
        (self.stream, self.rbuf.freeze())
    }

    async fn fill(&mut self) -> Result<usize> {
        Ok(self.stream.read_buf(&mut self.rbuf).await?)
    }
}

fn unexpected_eof() -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        "connection closed mid-frame",
    ))
}
