//! Datagram (UDP) carrier: no envelope, one datagram per packet, the next
//! datagram received from the device is treated as the reply. Must be used
//! strictly serially (no correlation beyond temporal ordering).

use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::error::{Result, ZkError};

pub struct DatagramCarrier {
    socket: UdpSocket,
}

impl DatagramCarrier {
    pub async fn connect(addr: &str, connect_timeout: Duration) -> Result<DatagramCarrier> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let connect = socket.connect(addr);
        timeout(connect_timeout, connect)
            .await
            .map_err(|_| ZkError::Timeout)??;
        Ok(DatagramCarrier { socket })
    }

    pub async fn send_and_receive(&mut self, packet: &[u8], deadline: Duration) -> Result<Vec<u8>> {
        self.send_only(packet).await?;
        match self.raw_receive(deadline).await? {
            Some(frame) => Ok(frame),
            None => Err(ZkError::Timeout),
        }
    }

    pub async fn send_only(&mut self, packet: &[u8]) -> Result<()> {
        self.socket.send(packet).await?;
        Ok(())
    }

    pub async fn raw_receive(&mut self, deadline: Duration) -> Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; 65536];
        match timeout(deadline, self.socket.recv(&mut buf)).await {
            Ok(Ok(n)) => Ok(Some(buf[..n].to_vec())),
            Ok(Err(e)) => Err(ZkError::from(e)),
            Err(_) => Ok(None),
        }
    }

    pub async fn close(&mut self) {
        // UDP sockets need no explicit teardown beyond drop.
    }
}
