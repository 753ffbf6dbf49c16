//! Thin device-control commands: power state, clock, door/LCD, capacity, and
//! the `~`-prefixed option key/value store.

use crate::codec::cmd;
use crate::codec::time::{decode_time, encode_time, DecodedTime};
use crate::error::{Result, ZkError};
use crate::model::Capacity;
use crate::ops::require_ok;
use crate::session::Session;

pub async fn enable_device(session: &mut Session) -> Result<()> {
    require_ok(session, cmd::CMD_ENABLEDEVICE, &[]).await?;
    session.set_enabled(true);
    Ok(())
}

pub async fn disable_device(session: &mut Session) -> Result<()> {
    require_ok(session, cmd::CMD_DISABLEDEVICE, &[]).await?;
    session.set_enabled(false);
    Ok(())
}

/// Reboot the device. The device tears down the connection as part of
/// restarting, so a transport error after sending is expected, not a failure.
pub async fn restart(session: &mut Session) -> Result<()> {
    let _ = session.request(cmd::CMD_RESTART, &[]).await;
    Ok(())
}

pub async fn poweroff(session: &mut Session) -> Result<()> {
    let _ = session.request(cmd::CMD_POWEROFF, &[]).await;
    Ok(())
}

pub async fn test_voice(session: &mut Session, index: u8) -> Result<()> {
    require_ok(session, cmd::CMD_TEST_VOICE, &[index]).await?;
    Ok(())
}

pub async fn get_time(session: &mut Session) -> Result<DecodedTime> {
    let frame = require_ok(session, cmd::CMD_GET_TIME, &[]).await?;
    if frame.payload.len() < 4 {
        return Err(ZkError::Frame("CMD_GET_TIME reply shorter than 4 bytes".into()));
    }
    let raw = u32::from_le_bytes([
        frame.payload[0],
        frame.payload[1],
        frame.payload[2],
        frame.payload[3],
    ]);
    Ok(decode_time(raw))
}

pub async fn set_time(session: &mut Session, time: chrono::NaiveDateTime) -> Result<()> {
    let raw = encode_time(time);
    require_ok(session, cmd::CMD_SET_TIME, &raw.to_le_bytes()).await?;
    Ok(())
}

pub async fn unlock(session: &mut Session, seconds: u32) -> Result<()> {
    require_ok(session, cmd::CMD_UNLOCK, &seconds.to_le_bytes()).await?;
    Ok(())
}

pub async fn door_state(session: &mut Session) -> Result<u8> {
    let frame = require_ok(session, cmd::CMD_DOORSTATE_RRQ, &[]).await?;
    frame
        .payload
        .first()
        .copied()
        .ok_or_else(|| ZkError::Frame("CMD_DOORSTATE_RRQ reply carried no payload".into()))
}

pub async fn write_lcd(session: &mut Session, line: u8, text: &str) -> Result<()> {
    let mut arg = Vec::with_capacity(2 + text.len());
    arg.push(line);
    arg.push(0);
    arg.extend_from_slice(text.as_bytes());
    require_ok(session, cmd::CMD_WRITE_LCD, &arg).await?;
    Ok(())
}

pub async fn clear_lcd(session: &mut Session) -> Result<()> {
    require_ok(session, cmd::CMD_CLEAR_LCD, &[]).await?;
    Ok(())
}

pub async fn clear_attendance(session: &mut Session) -> Result<()> {
    require_ok(session, cmd::CMD_CLEAR_ATTLOG, &[]).await?;
    Ok(())
}

pub async fn clear_data(session: &mut Session) -> Result<()> {
    require_ok(session, cmd::CMD_CLEAR_DATA, &[]).await?;
    Ok(())
}

pub async fn get_version(session: &mut Session) -> Result<String> {
    let frame = require_ok(session, cmd::CMD_GET_VERSION, &[]).await?;
    Ok(ascii_payload(&frame.payload))
}

pub async fn get_pin_width(session: &mut Session) -> Result<u8> {
    let frame = require_ok(session, cmd::CMD_GET_PINWIDTH, &[]).await?;
    frame
        .payload
        .first()
        .copied()
        .ok_or_else(|| ZkError::Frame("CMD_GET_PINWIDTH reply carried no payload".into()))
}

/// Capacity counters, also cached on the session for callers that want the
/// last-known values without a round trip.
///
/// The first 80 bytes of the reply are 20 signed `i32`s; the fields of
/// interest sit at i32-indices 4, 6, 8, 10 (reserved), 12, 14, 15, 16, 17,
/// 18, 19 — not a contiguous struct, there are gaps the device leaves for
/// fields this crate doesn't surface.
pub async fn get_free_sizes(session: &mut Session) -> Result<Capacity> {
    let frame = require_ok(session, cmd::CMD_GET_FREE_SIZES, &[]).await?;
    let buf = &frame.payload;
    if buf.len() < 80 {
        return Err(ZkError::Frame(
            "CMD_GET_FREE_SIZES reply shorter than its 80-byte fixed region".into(),
        ));
    }
    let read_i32 = |index: usize| {
        let offset = index * 4;
        i32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
    };

    let mut capacity = Capacity {
        users: read_i32(4),
        fingers: read_i32(6),
        records: read_i32(8),
        cards: read_i32(12),
        fingers_capacity: read_i32(14),
        users_capacity: read_i32(15),
        records_capacity: read_i32(16),
        fingers_available: read_i32(17),
        users_available: read_i32(18),
        records_available: read_i32(19),
        faces: None,
        faces_capacity: None,
    };

    // Firmware that also tracks face templates pads the reply to 92 bytes
    // and tacks on two more fields past the reserved block, at absolute
    // byte offsets rather than more i32-indices.
    if buf.len() >= 92 {
        let read_i32_at = |offset: usize| {
            i32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
        };
        capacity.faces = Some(read_i32_at(80));
        capacity.faces_capacity = Some(read_i32_at(88));
    }

    session.capacity = capacity;
    Ok(capacity)
}

/// Read one `~`-prefixed option (e.g. `~SerialNumber`, `IPAddress`).
pub async fn options_read(session: &mut Session, option: &str) -> Result<String> {
    let mut arg = option.as_bytes().to_vec();
    arg.push(0);
    let frame = require_ok(session, cmd::CMD_OPTIONS_RRQ, &arg).await?;
    Ok(parse_option_reply(&frame.payload))
}

/// Write one option as a `key=value` pair (e.g. `SDKBuild=1`).
pub async fn options_write(session: &mut Session, option: &str, value: &str) -> Result<()> {
    let mut arg = format!("{option}={value}").into_bytes();
    arg.push(0);
    require_ok(session, cmd::CMD_OPTIONS_WRQ, &arg).await?;
    Ok(())
}

fn ascii_payload(payload: &[u8]) -> String {
    let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
    String::from_utf8_lossy(&payload[..end]).into_owned()
}

fn parse_option_reply(payload: &[u8]) -> String {
    let text = ascii_payload(payload);
    match text.split_once('=') {
        Some((_, value)) => value.to_string(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_reply_splits_key_value() {
        assert_eq!(parse_option_reply(b"~SerialNumber=ABC123\0"), "ABC123");
        assert_eq!(parse_option_reply(b"nokeyvalue\0"), "nokeyvalue");
    }

    #[test]
    fn ascii_payload_trims_at_first_nul() {
        assert_eq!(ascii_payload(b"Ver 6.60\0\0\0"), "Ver 6.60");
    }

    #[test]
    fn free_sizes_offsets_match_the_i32_index_table() {
        let mut buf = vec![0u8; 92];
        let put = |buf: &mut Vec<u8>, index: usize, value: i32| {
            buf[index * 4..index * 4 + 4].copy_from_slice(&value.to_le_bytes());
        };
        put(&mut buf, 4, 10); // users
        put(&mut buf, 6, 2); // fingers
        put(&mut buf, 8, 500); // records
        put(&mut buf, 12, 0); // cards
        put(&mut buf, 14, 3000); // fingers_cap
        put(&mut buf, 15, 3000); // users_cap
        put(&mut buf, 16, 100000); // rec_cap
        put(&mut buf, 17, 2990); // fingers_av
        put(&mut buf, 18, 2990); // users_av
        put(&mut buf, 19, 99500); // rec_av
        buf[80..84].copy_from_slice(&7i32.to_le_bytes());
        buf[88..92].copy_from_slice(&1000i32.to_le_bytes());

        let read_i32 = |index: usize| {
            let offset = index * 4;
            i32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
        };
        assert_eq!(read_i32(4), 10);
        assert_eq!(read_i32(19), 99500);
        assert_eq!(
            i32::from_le_bytes([buf[80], buf[81], buf[82], buf[83]]),
            7
        );
    }
}
