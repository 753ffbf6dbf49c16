//! Live-capture producer/consumer event stream.
//!
//! Starting capture enumerates the user table (so callers can resolve a
//! punch's UID against a name), cancels any stray verify/enroll state,
//! re-enables the device if it was disabled, and registers for every event
//! class. The poll loop then drives the transport's raw-receive primitive:
//! each frame — event or not — gets ACKed with the fixed reply id
//! [`crate::session::LIVE_CAPTURE_ACK_REPLY`], and only `CMD_REG_EVENT`
//! frames are decoded into punch events. A stopped capture deregisters and
//! restores whatever enabled/disabled state the device was in before.

use std::time::Duration;

use crate::codec::cmd;
use crate::codec::records::decode_compact_time;
use crate::codec::time::DecodedTime;
use crate::codec::{EF_ALL, EF_ATTLOG};
use crate::error::Result;
use crate::model::User;
use crate::ops::{control, require_ok, users};
use crate::session::Session;

/// One decoded punch event from the live-capture stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PunchEvent {
    pub user_id: String,
    pub status: u8,
    pub punch: u8,
    pub timestamp: DecodedTime,
}

/// Which event classes to register for — all of them, or attendance only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureScope {
    All,
    AttendanceOnly,
}

impl CaptureScope {
    fn flag(self) -> u32 {
        match self {
            CaptureScope::All => EF_ALL,
            CaptureScope::AttendanceOnly => EF_ATTLOG,
        }
    }
}

/// A started live-capture session. Drop this without calling [`LiveCapture::stop`]
/// and the device is left registered for events and possibly force-enabled —
/// always call `stop` on every exit path.
pub struct LiveCapture {
    was_enabled: bool,
}

impl LiveCapture {
    /// Enumerate users, clear stray verify/enroll state, and register for
    /// `scope`. Returns the capture handle plus the user table snapshot a
    /// caller can use to resolve UIDs to names.
    pub async fn start(session: &mut Session, scope: CaptureScope) -> Result<(LiveCapture, Vec<User>)> {
        let table = users::enumerate_users(session).await?;

        require_ok(session, cmd::CMD_CANCELCAPTURE, &[]).await?;
        require_ok(session, cmd::CMD_STARTVERIFY, &[]).await?;

        let was_enabled = session.is_enabled();
        if !was_enabled {
            control::enable_device(session).await?;
        }

        require_ok(session, cmd::CMD_REG_EVENT, &scope.flag().to_le_bytes()).await?;

        Ok((LiveCapture { was_enabled }, table))
    }

    /// Wait up to `timeout` for the next frame. An empty vec means either a
    /// timeout (liveness tick) or a non-event frame arrived and was ACKed
    /// and discarded; callers loop on this indefinitely.
    pub async fn poll(&mut self, session: &mut Session, timeout: Duration) -> Result<Vec<PunchEvent>> {
        let frame = match session.raw_receive(timeout).await? {
            Some(frame) => frame,
            None => return Ok(Vec::new()),
        };
        session.send_live_capture_ack().await?;
        if frame.header.command != cmd::CMD_REG_EVENT {
            return Ok(Vec::new());
        }
        Ok(decode_events(&frame.payload))
    }

    /// Deregister events, cancel capture, and restore the pre-start enabled
    /// state.
    pub async fn stop(self, session: &mut Session) -> Result<()> {
        require_ok(session, cmd::CMD_REG_EVENT, &0u32.to_le_bytes()).await?;
        require_ok(session, cmd::CMD_CANCELCAPTURE, &[]).await?;
        if !self.was_enabled {
            control::disable_device(session).await?;
        }
        Ok(())
    }
}

/// Decode zero or more concatenated punch records out of one event payload.
/// Width is read off the remaining length at each step: exactly 10 bytes is
/// a `u16` UID, exactly 12 is a `u32` UID, 32 or more is the 24-byte
/// user-ID-string layout (the only widths `decode_event_string_uid` can read
/// without running past the buffer). Anything else is a malformed or
/// truncated frame and the remainder is dropped rather than risking an
/// out-of-bounds slice on untrusted network input.
fn decode_events(payload: &[u8]) -> Vec<PunchEvent> {
    let mut events = Vec::new();
    let mut rest = payload;
    loop {
        let (event, consumed) = match rest.len() {
            10 => (decode_event_u16_uid(rest), 10),
            12 => (decode_event_u32_uid(rest), 12),
            len if len >= 32 => (decode_event_string_uid(rest), 32),
            _ => break,
        };
        events.push(event);
        if consumed == 0 || consumed > rest.len() {
            break;
        }
        rest = &rest[consumed..];
    }
    events
}

fn compact_time(buf: &[u8]) -> DecodedTime {
    let mut arr = [0u8; 6];
    let n = buf.len().min(6);
    arr[..n].copy_from_slice(&buf[..n]);
    decode_compact_time(&arr)
}

fn decode_event_u16_uid(buf: &[u8]) -> PunchEvent {
    let uid = u16::from_le_bytes([buf[0], buf[1]]);
    PunchEvent {
        user_id: uid.to_string(),
        status: buf[2],
        punch: buf[3],
        timestamp: compact_time(&buf[4..10]),
    }
}

fn decode_event_u32_uid(buf: &[u8]) -> PunchEvent {
    let uid = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    PunchEvent {
        user_id: uid.to_string(),
        status: buf[4],
        punch: buf[5],
        timestamp: compact_time(&buf[6..12]),
    }
}

fn decode_event_string_uid(buf: &[u8]) -> PunchEvent {
    let end = buf[..24].iter().position(|&b| b == 0).unwrap_or(24);
    let user_id = String::from_utf8_lossy(&buf[..end]).into_owned();
    PunchEvent {
        user_id,
        status: buf[24],
        punch: buf[25],
        timestamp: compact_time(&buf[26..32]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_single_10_byte_event() {
        let mut buf = [0u8; 10];
        buf[0..2].copy_from_slice(&9u16.to_le_bytes());
        buf[2] = 1;
        buf[3] = 0;
        let events = decode_events(&buf);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user_id, "9");
        assert_eq!(events[0].status, 1);
    }

    #[test]
    fn decodes_a_single_12_byte_event() {
        let mut buf = [0u8; 12];
        buf[0..4].copy_from_slice(&4242u32.to_le_bytes());
        let events = decode_events(&buf);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user_id, "4242");
    }

    #[test]
    fn decodes_a_32_byte_string_uid_event() {
        let mut buf = [0u8; 32];
        buf[..6].copy_from_slice(b"EMP-7");
        let events = decode_events(&buf);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user_id, "EMP-7");
    }

    #[test]
    fn empty_payload_yields_no_events() {
        assert!(decode_events(&[]).is_empty());
    }

    #[test]
    fn a_short_malformed_frame_is_dropped_without_panicking() {
        // Neither 10, 12, nor >=32 bytes: not a width this protocol defines.
        for len in [13, 20, 24, 31] {
            assert!(decode_events(&vec![0u8; len]).is_empty());
        }
    }
}
