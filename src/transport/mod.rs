//! I/O carriers: a length-prefixed TCP carrier and a UDP datagram carrier,
//! both exposing the same request/reply primitive plus a raw-receive
//! primitive for the asynchronous flows (live capture, enrollment).

pub mod datagram;
pub mod stream;

use std::time::Duration;

use crate::codec::{DATAGRAM_MAX_CHUNK, STREAM_MAX_CHUNK};
use crate::error::Result;
use datagram::DatagramCarrier;
use stream::StreamCarrier;

/// Either of the two interchangeable wire carriers.
///
/// The transport is strictly serial — callers must not invoke more than one
/// of these methods concurrently on the same `Transport`.
pub enum Transport {
    Stream(StreamCarrier),
    Datagram(DatagramCarrier),
}

impl Transport {
    pub async fn connect_stream(addr: &str, connect_timeout: Duration) -> Result<Transport> {
        Ok(Transport::Stream(
            StreamCarrier::connect(addr, connect_timeout).await?,
        ))
    }

    pub async fn connect_datagram(addr: &str, connect_timeout: Duration) -> Result<Transport> {
        Ok(Transport::Datagram(
            DatagramCarrier::connect(addr, connect_timeout).await?,
        ))
    }

    /// Write `packet` (an 8-byte header + payload) and wait for the matching
    /// reply, failing with [`crate::error::ZkError::Timeout`] if none arrives
    /// within `deadline`.
    pub async fn send_and_receive(&mut self, packet: &[u8], deadline: Duration) -> Result<Vec<u8>> {
        match self {
            Transport::Stream(c) => c.send_and_receive(packet, deadline).await,
            Transport::Datagram(c) => c.send_and_receive(packet, deadline).await,
        }
    }

    /// Send a packet without waiting for any reply (used for the fire-and-forget
    /// ACK-OK the live-capture loop sends after every event frame).
    pub async fn send_only(&mut self, packet: &[u8]) -> Result<()> {
        match self {
            Transport::Stream(c) => c.send_only(packet).await,
            Transport::Datagram(c) => c.send_only(packet).await,
        }
    }

    /// Wait up to `deadline` for the next frame without sending a request.
    /// Returns `Ok(None)` on timeout (a liveness tick, not an error).
    pub async fn raw_receive(&mut self, deadline: Duration) -> Result<Option<Vec<u8>>> {
        match self {
            Transport::Stream(c) => c.raw_receive(deadline).await,
            Transport::Datagram(c) => c.raw_receive(deadline).await,
        }
    }

    /// Maximum `_CMD_READ_BUFFER` chunk size for this carrier.
    pub fn max_chunk(&self) -> usize {
        match self {
            Transport::Stream(_) => STREAM_MAX_CHUNK,
            Transport::Datagram(_) => DATAGRAM_MAX_CHUNK,
        }
    }

    pub async fn close(&mut self) {
        match self {
            Transport::Stream(c) => c.close().await,
            Transport::Datagram(c) => c.close().await,
        }
    }
}
