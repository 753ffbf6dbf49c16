//! Attendance log enumeration and clearing.
//!
//! Like the user table, the attendance log's reply carries only a total
//! byte count up front; the per-record width is recovered by dividing that
//! count by the record count cached from `CMD_GET_FREE_SIZES`, and the
//! width in turn selects which of the three decoders to use.

use log::debug;

use crate::codec::cmd;
use crate::codec::records::{decode_attendance_16, decode_attendance_8, decode_attendance_var};
use crate::error::{Result, ZkError};
use crate::model::AttendanceRecord;
use crate::ops::bulk::bulk_read;
use crate::session::Session;

const WIDTH_NARROW: usize = 8;
const WIDTH_MEDIUM: usize = 16;
const WIDTH_WIDE: usize = 32;

/// Pull the full attendance log. The 4-byte prefix is the total record-area
/// byte count; everything after it is `body_len / cached_record_count`-wide
/// fixed-width rows.
pub async fn enumerate_attendance(session: &mut Session) -> Result<Vec<AttendanceRecord>> {
    let data = bulk_read(session, cmd::CMD_ATTLOG_RRQ, crate::codec::FCT_ATTLOG, 0).await?;
    if data.len() < 4 {
        return Err(ZkError::Frame(
            "attendance log reply shorter than its 4-byte prefix".into(),
        ));
    }
    let body = &data[4..];
    let record_width = infer_record_width(session.capacity.records, body.len())?;
    debug!("attendance log uses a {record_width}-byte record width");

    let decode: fn(&[u8]) -> AttendanceRecord = match record_width {
        WIDTH_NARROW => decode_attendance_8,
        WIDTH_MEDIUM => decode_attendance_16,
        WIDTH_WIDE => decode_attendance_var,
        other => {
            return Err(ZkError::Protocol(format!(
                "unrecognized attendance record width {other}"
            )))
        }
    };

    let mut records = Vec::with_capacity(body.len() / record_width.max(1));
    for chunk in body.chunks(record_width) {
        if chunk.len() < record_width {
            break;
        }
        records.push(decode(chunk));
    }
    Ok(records)
}

/// Divide the record area by the cached record count (from
/// `CMD_GET_FREE_SIZES`) to recover the per-row width. Falls back to
/// whichever of the three known widths evenly divides the body when no
/// usable count is cached yet.
fn infer_record_width(cached_record_count: i32, body_len: usize) -> Result<usize> {
    if cached_record_count > 0 {
        return Ok(body_len / cached_record_count as usize);
    }
    for width in [WIDTH_NARROW, WIDTH_MEDIUM, WIDTH_WIDE] {
        if body_len % width == 0 && body_len > 0 {
            return Ok(width);
        }
    }
    Err(ZkError::Protocol(format!(
        "could not infer an attendance record width from cached_count={cached_record_count}, body_len={body_len}"
    )))
}

pub async fn clear_attendance(session: &mut Session) -> Result<()> {
    crate::ops::control::clear_attendance(session).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_on_the_observed_record_width() {
        let mut buf = [0u8; 8];
        buf[0..2].copy_from_slice(&5u16.to_le_bytes());
        let record = decode_attendance_8(&buf);
        assert_eq!(record.user_id, "5");
    }

    #[test]
    fn scenario_5_two_records_16_bytes_infers_8_byte_width() {
        // 2 cached records, 16 bytes after the prefix -> two 8-byte rows.
        assert_eq!(infer_record_width(2, 16).unwrap(), WIDTH_NARROW);
    }

    #[test]
    fn scenario_5_two_records_32_bytes_infers_16_byte_width() {
        // 2 cached records, 32 bytes after the prefix -> two 16-byte rows.
        assert_eq!(infer_record_width(2, 32).unwrap(), WIDTH_MEDIUM);
    }

    #[test]
    fn falls_back_to_divisibility_without_a_cached_count() {
        assert_eq!(infer_record_width(0, 64).unwrap(), WIDTH_NARROW);
    }
}
