//! Stream (TCP) carrier: every packet is wrapped in the 8-byte stream
//! envelope (magic, magic, payload length) and inbound bytes must be
//! accumulated across multiple read events to recover whole frames.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::codec::header::{parse_stream_envelope, wrap_stream_envelope};
use crate::error::{Result, ZkError};

pub struct StreamCarrier {
    stream: TcpStream,
    /// Bytes read off the socket but not yet assembled into a whole frame.
    pending: Vec<u8>,
}

impl StreamCarrier {
    pub async fn connect(addr: &str, connect_timeout: Duration) -> Result<StreamCarrier> {
        let stream = timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ZkError::Timeout)??;
        Ok(StreamCarrier {
            stream,
            pending: Vec::new(),
        })
    }

    pub async fn send_and_receive(&mut self, packet: &[u8], deadline: Duration) -> Result<Vec<u8>> {
        self.send_only(packet).await?;
        match self.read_frame(deadline).await? {
            Some(frame) => Ok(frame),
            None => Err(ZkError::Timeout),
        }
    }

    pub async fn send_only(&mut self, packet: &[u8]) -> Result<()> {
        let framed = wrap_stream_envelope(packet);
        timeout(Duration::from_secs(5), self.stream.write_all(&framed))
            .await
            .map_err(|_| ZkError::Timeout)??;
        Ok(())
    }

    pub async fn raw_receive(&mut self, deadline: Duration) -> Result<Option<Vec<u8>>> {
        self.read_frame(deadline).await
    }

    pub async fn close(&mut self) {
        let _ = self.stream.shutdown().await;
    }

    /// Pull one complete frame (envelope stripped) out of `pending`, reading
    /// more off the socket as needed, until `deadline` elapses.
    async fn read_frame(&mut self, deadline: Duration) -> Result<Option<Vec<u8>>> {
        let mut tmp = vec![0u8; 65536];
        loop {
            if let Some(frame) = self.try_extract_frame()? {
                return Ok(Some(frame));
            }

            let read = timeout(deadline, self.stream.read(&mut tmp)).await;
            let n = match read {
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(ZkError::from(e)),
                Err(_) => return Ok(None), // deadline elapsed, no full frame yet
            };
            if n == 0 {
                return Err(ZkError::Transport(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed by device",
                )));
            }
            self.pending.extend_from_slice(&tmp[..n]);
        }
    }

    fn try_extract_frame(&mut self) -> Result<Option<Vec<u8>>> {
        if self.pending.len() < 8 {
            return Ok(None);
        }
        let len = parse_stream_envelope(&self.pending[..8])? as usize;
        if self.pending.len() < 8 + len {
            return Ok(None);
        }
        let frame = self.pending[8..8 + len].to_vec();
        self.pending.drain(..8 + len);
        Ok(Some(frame))
    }
}
