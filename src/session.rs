//! Connection lifecycle, rolling session/reply identifiers, and the
//! connect/authenticate handshake.

use std::time::Duration;

use log::{debug, info, warn};

use crate::codec::header::Header;
use crate::codec::{auth, cmd};
use crate::config::{DeviceConfig, TransportKind};
use crate::error::{Result, ZkError};
use crate::model::{Capacity, RecordLayout};
use crate::transport::Transport;

/// A fully parsed reply: header plus whatever payload followed it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub header: Header,
    pub payload: Vec<u8>,
}

/// How a reply's command code should be treated by the operations layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// `CMD_ACK_OK`.
    Ok,
    /// `CMD_DATA`: an inline data payload.
    Data,
    /// `CMD_PREPARE_DATA`: a bulk transfer is about to begin.
    PrepareData,
    /// `CMD_ACK_UNAUTH`.
    Unauthorized,
    /// Anything else — a protocol-level failure for the calling operation.
    Error,
}

pub fn classify(command: u16) -> ReplyKind {
    match command {
        cmd::CMD_ACK_OK => ReplyKind::Ok,
        cmd::CMD_DATA => ReplyKind::Data,
        cmd::CMD_PREPARE_DATA => ReplyKind::PrepareData,
        cmd::CMD_ACK_UNAUTH => ReplyKind::Unauthorized,
        _ => ReplyKind::Error,
    }
}

/// Reply id used for the fire-and-forget ACK the live-capture loop sends
/// after consuming an unsolicited event frame (§4.4).
pub const LIVE_CAPTURE_ACK_REPLY: u16 = 65534;

/// Owns one device connection: the transport, the rolling (session, reply)
/// pair, and the cached device state operations rely on.
pub struct Session {
    transport: Transport,
    config: DeviceConfig,
    session_id: u16,
    reply_id: u16,
    connected: bool,
    enabled: bool,
    pub layout: Option<RecordLayout>,
    pub capacity: Capacity,
    pub next_uid: u16,
    pub next_user_id: u32,
}

impl Session {
    /// Open the transport, send `CMD_CONNECT`, and authenticate if the
    /// device demands it.
    pub async fn connect(config: DeviceConfig) -> Result<Session> {
        config.validate()?;
        let addr = config.addr();

        let transport = match config.transport {
            TransportKind::Stream => {
                Transport::connect_stream(&addr, config.connect_timeout()).await?
            }
            TransportKind::Datagram => {
                Transport::connect_datagram(&addr, config.connect_timeout()).await?
            }
        };

        let mut session = Session {
            transport,
            config,
            session_id: 0,
            reply_id: 0,
            connected: false,
            enabled: true,
            layout: None,
            capacity: Capacity::default(),
            next_uid: 1,
            next_user_id: 1,
        };

        info!("connecting to {}", session.config.addr());
        let reply = session.request(cmd::CMD_CONNECT, &[]).await?;
        session.session_id = reply.header.session;
        session.connected = true;

        match classify(reply.header.command) {
            ReplyKind::Ok | ReplyKind::Data | ReplyKind::PrepareData => {
                info!("session {} established", session.session_id);
            }
            ReplyKind::Unauthorized => {
                debug!("device demands authentication, deriving auth key");
                let password = session.config.comm_key.unwrap_or(0);
                let key = auth::derive_auth_key(password, session.session_id, 50);
                let reply = session.request(cmd::CMD_AUTH, &key).await?;
                if classify(reply.header.command) != ReplyKind::Ok {
                    warn!("authentication rejected by device");
                    session.transport.close().await;
                    return Err(ZkError::Auth);
                }
                info!("authenticated");
            }
            ReplyKind::Error => {
                session.transport.close().await;
                return Err(ZkError::Protocol(format!(
                    "unexpected reply to CMD_CONNECT: {}",
                    reply.header.command
                )));
            }
        }

        Ok(session)
    }

    /// Send `CMD_EXIT` and close the transport regardless of the reply.
    pub async fn exit(&mut self) {
        if self.connected {
            let _ = self.request(cmd::CMD_EXIT, &[]).await;
            self.connected = false;
        }
        self.transport.close().await;
    }

    /// Compose a header + payload, send it, and parse the reply. Updates the
    /// cached `(session, reply)` pair from the reply header.
    pub async fn request(&mut self, command: u16, payload: &[u8]) -> Result<Frame> {
        let packet = Header::compose(command, self.session_id, self.reply_id, payload);
        let deadline = self.config.timeout();
        let raw = self.transport.send_and_receive(&packet, deadline).await?;
        self.parse_and_adopt(&raw)
    }

    /// Send a packet and return the reply without composing/touching the
    /// rolling reply id — used by the chunk-request helpers in the bulk
    /// transfer protocol, which manage their own header framing.
    pub async fn request_raw(&mut self, packet: &[u8]) -> Result<Frame> {
        let deadline = self.config.timeout();
        let raw = self.transport.send_and_receive(packet, deadline).await?;
        self.parse_and_adopt(&raw)
    }

    fn parse_and_adopt(&mut self, raw: &[u8]) -> Result<Frame> {
        let header = Header::parse(raw)?;
        self.session_id = header.session;
        self.reply_id = header.reply;
        Ok(Frame {
            header,
            payload: raw[8..].to_vec(),
        })
    }

    /// Consume the next unsolicited frame, if one arrives within `deadline`.
    pub async fn raw_receive(&mut self, deadline: Duration) -> Result<Option<Frame>> {
        match self.transport.raw_receive(deadline).await? {
            Some(raw) => Ok(Some(self.parse_and_adopt(&raw)?)),
            None => Ok(None),
        }
    }

    /// Send the fixed ACK-OK the live-capture loop emits after every event
    /// frame, using the fixed reply id `65534` rather than the rolling one.
    pub async fn send_live_capture_ack(&mut self) -> Result<()> {
        let packet = Header::compose(
            crate::codec::cmd::CMD_ACK_OK,
            self.session_id,
            LIVE_CAPTURE_ACK_REPLY.wrapping_sub(1),
            &[],
        );
        self.transport.send_only(&packet).await
    }

    /// Next reply id the session will stamp on an outbound packet.
    pub fn reply_id(&self) -> u16 {
        self.reply_id
    }

    pub fn session_id(&self) -> u16 {
        self.session_id
    }

    pub fn max_chunk(&self) -> usize {
        self.transport.max_chunk()
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}
