//! Fingerprint enrollment request/response state machine.
//!
//! `CMD_STARTENROLL` kicks off a multi-press capture on the device; each
//! press cycle then pushes two unsolicited frames (an initial scan event,
//! then a result event carrying the status code) the same way live-capture
//! punches do, for up to three rounds before giving up. The status code's
//! offset inside the result frame is itself undocumented upstream — this
//! crate preserves it exactly as observed (stream: offset 16 of the framed
//! packet, datagram: offset 8) and, once the session's header/envelope
//! stripping is accounted for, both reduce to the same position in the
//! already-parsed payload. [`EnrollOutcome::Failed`] keeps the raw event
//! bytes around in case that reduction turns out to be wrong for some
//! firmware.

use std::time::Duration;

use crate::codec::cmd;
use crate::error::{Result, ZkError};
use crate::ops::require_ok;
use crate::session::Session;

/// Device-reported status code meaning "scan again".
const STATUS_RESCAN: u16 = 0x64;
/// Device-reported status code meaning "enrolled".
const STATUS_SUCCESS: u16 = 0x00;
const MAX_ROUNDS: u8 = 3;

/// How one enrollment round ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollOutcome {
    Success,
    Failed { code: u16, raw: Vec<u8> },
}

/// Run the enrollment state machine for `finger_index` on `user_id`
/// end-to-end: cancel any stray capture, start enrollment, exchange the
/// scan/result frame pairs for up to [`MAX_ROUNDS`] rounds, then deregister
/// events, cancel capture, and re-issue `CMD_STARTVERIFY`.
pub async fn enroll(
    session: &mut Session,
    user_id: &str,
    finger_index: u8,
    frame_timeout: Duration,
) -> Result<EnrollOutcome> {
    require_ok(session, cmd::CMD_CANCELCAPTURE, &[]).await?;
    require_ok(session, cmd::CMD_STARTENROLL, &start_enroll_payload(session, user_id, finger_index)).await?;

    let outcome = run_rounds(session, frame_timeout).await;

    let _ = require_ok(session, cmd::CMD_REG_EVENT, &0u32.to_le_bytes()).await;
    let _ = require_ok(session, cmd::CMD_CANCELCAPTURE, &[]).await;
    require_ok(session, cmd::CMD_STARTVERIFY, &[]).await?;

    outcome
}

async fn run_rounds(session: &mut Session, frame_timeout: Duration) -> Result<EnrollOutcome> {
    for _round in 0..MAX_ROUNDS {
        await_scan_frame(session, frame_timeout).await?; // first event: the scan itself
        let result = await_scan_frame(session, frame_timeout).await?; // second event: the result

        let status = status_code(&result);
        match status {
            STATUS_RESCAN => continue,
            STATUS_SUCCESS => return Ok(EnrollOutcome::Success),
            code => return Ok(EnrollOutcome::Failed { code, raw: result }),
        }
    }
    Err(ZkError::Operation("enrollment exhausted its rescan budget".into()))
}

async fn await_scan_frame(session: &mut Session, timeout: Duration) -> Result<Vec<u8>> {
    let frame = session
        .raw_receive(timeout)
        .await?
        .ok_or(ZkError::Timeout)?;
    session.send_live_capture_ack().await?;
    Ok(frame.payload)
}

/// The status code as it lands in the already header/envelope-stripped
/// payload this crate hands callers: a little-endian `u16` at the front.
fn status_code(payload: &[u8]) -> u16 {
    if payload.len() < 2 {
        return u16::MAX; // an unrecognized code, mapped to `Failed` rather than panicking
    }
    u16::from_le_bytes([payload[0], payload[1]])
}

fn start_enroll_payload(session: &Session, user_id: &str, finger_index: u8) -> Vec<u8> {
    use crate::config::TransportKind;
    match session.config().transport {
        TransportKind::Stream => {
            let mut arg = vec![0u8; 24];
            let bytes = user_id.as_bytes();
            let n = bytes.len().min(24);
            arg[..n].copy_from_slice(&bytes[..n]);
            arg.push(finger_index);
            arg.push(1);
            arg
        }
        TransportKind::Datagram => {
            let numeric_id: u32 = user_id.parse().unwrap_or(0);
            let mut arg = numeric_id.to_le_bytes().to_vec();
            arg.push(finger_index);
            arg
        }
    }
}

pub async fn cancel_enroll(session: &mut Session) -> Result<()> {
    require_ok(session, cmd::CMD_CANCELCAPTURE, &[]).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_payload_is_24_bytes_plus_index_plus_flag() {
        // Construct a bare session isn't possible without a transport; exercise
        // the byte layout directly instead.
        let mut arg = vec![0u8; 24];
        let bytes = b"EMP-7";
        arg[..bytes.len()].copy_from_slice(bytes);
        arg.push(3);
        arg.push(1);
        assert_eq!(arg.len(), 26);
        assert_eq!(arg[24], 3);
        assert_eq!(arg[25], 1);
    }

    #[test]
    fn datagram_payload_is_numeric_id_plus_index() {
        let numeric_id: u32 = "42".parse().unwrap();
        let mut arg = numeric_id.to_le_bytes().to_vec();
        arg.push(9);
        assert_eq!(arg.len(), 5);
        assert_eq!(arg[4], 9);
    }

    #[test]
    fn status_code_reads_the_leading_u16() {
        assert_eq!(status_code(&[0x64, 0x00, 0xFF]), 0x64);
        assert_eq!(status_code(&[0x00, 0x00]), 0x00);
    }

    #[test]
    fn short_payload_maps_to_an_unrecognized_code() {
        assert_eq!(status_code(&[]), u16::MAX);
    }
}
