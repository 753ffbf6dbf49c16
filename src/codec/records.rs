//! Fixed-offset packers/unpackers for user records, attendance rows, and the
//! small structures the bulk template-write protocol concatenates.

use crate::codec::time::{decode_time, DecodedTime};
use crate::model::{AttendanceRecord, Privilege, RecordLayout, User};

/// Write `s` into `field[..]`, NUL-padding or right-truncating to fit exactly.
fn write_str(field: &mut [u8], s: &str) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(field.len());
    field[..n].copy_from_slice(&bytes[..n]);
    for b in &mut field[n..] {
        *b = 0;
    }
}

/// Read a NUL-terminated (or full-width) UTF-8 string out of `field`.
fn read_str(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Pack a [`User`] into the 28-byte narrow layout.
pub fn pack_user_narrow(user: &User) -> [u8; 28] {
    let mut buf = [0u8; 28];
    buf[0..2].copy_from_slice(&user.uid.to_le_bytes());
    buf[2] = user.privilege.0;
    write_str(&mut buf[3..8], &user.password);
    write_str(&mut buf[8..16], &user.name);
    buf[16..20].copy_from_slice(&user.card.to_le_bytes());
    // byte 20 reserved.
    // Open question (a): byte 21 is the authoritative group-id byte; 22-23 stay zero.
    buf[21] = user.group_id.parse::<u8>().unwrap_or(0);
    let uid_number: u32 = user.user_id.parse().unwrap_or(0);
    buf[24..28].copy_from_slice(&uid_number.to_le_bytes());
    buf
}

/// Unpack a 28-byte narrow user record.
pub fn unpack_user_narrow(buf: &[u8]) -> User {
    let uid = u16::from_le_bytes([buf[0], buf[1]]);
    let privilege = Privilege(buf[2]);
    let password = read_str(&buf[3..8]);
    let name = read_str(&buf[8..16]);
    let card = u32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]);
    let group_id = buf[21].to_string();
    let user_id = u32::from_le_bytes([buf[24], buf[25], buf[26], buf[27]]).to_string();
    User {
        uid,
        user_id,
        name,
        privilege,
        password,
        group_id,
        card,
    }
}

/// Pack a [`User`] into the 72-byte wide layout.
pub fn pack_user_wide(user: &User) -> [u8; 72] {
    let mut buf = [0u8; 72];
    buf[0..2].copy_from_slice(&user.uid.to_le_bytes());
    buf[2] = user.privilege.0;
    write_str(&mut buf[3..11], &user.password);
    write_str(&mut buf[11..35], &user.name);
    buf[35..39].copy_from_slice(&user.card.to_le_bytes());
    write_str(&mut buf[40..47], &user.group_id);
    write_str(&mut buf[48..72], &user.user_id);
    buf
}

/// Unpack a 72-byte wide user record.
pub fn unpack_user_wide(buf: &[u8]) -> User {
    let uid = u16::from_le_bytes([buf[0], buf[1]]);
    let privilege = Privilege(buf[2]);
    let password = read_str(&buf[3..11]);
    let name = read_str(&buf[11..35]);
    let card = u32::from_le_bytes([buf[35], buf[36], buf[37], buf[38]]);
    let group_id = read_str(&buf[40..47]);
    let user_id = read_str(&buf[48..72]);
    User {
        uid,
        user_id,
        name,
        privilege,
        password,
        group_id,
        card,
    }
}

/// Unpack a fixed-width user record, dispatching on the cached [`RecordLayout`].
pub fn unpack_user(buf: &[u8], layout: RecordLayout) -> User {
    match layout {
        RecordLayout::Narrow => unpack_user_narrow(buf),
        RecordLayout::Wide => unpack_user_wide(buf),
    }
}

/// Pack a user record for the `_CMD_SAVE_USERTEMPS` bulk-write region: a
/// constant `0x02` tag byte followed by the same layout shifted by one byte
/// (29 or 73 bytes total).
pub fn pack_user_for_save(user: &User, layout: RecordLayout) -> Vec<u8> {
    let body = match layout {
        RecordLayout::Narrow => pack_user_narrow(user).to_vec(),
        RecordLayout::Wide => pack_user_wide(user).to_vec(),
    };
    let mut out = Vec::with_capacity(body.len() + 1);
    out.push(0x02);
    out.extend_from_slice(&body);
    out
}

/// Decode an 8-byte attendance row: `[uid:u16, status:u8, time:u32, punch:u8]`.
pub fn decode_attendance_8(buf: &[u8]) -> AttendanceRecord {
    let uid = u16::from_le_bytes([buf[0], buf[1]]);
    let status = buf[2];
    let time = u32::from_le_bytes([buf[3], buf[4], buf[5], buf[6]]);
    let punch = buf[7];
    AttendanceRecord {
        user_id: uid.to_string(),
        status,
        punch,
        timestamp: decode_time(time),
    }
}

/// Decode a 16-byte attendance row: `[userIdNum:u32, time:u32, status:u8, punch:u8]`.
pub fn decode_attendance_16(buf: &[u8]) -> AttendanceRecord {
    let user_id = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let time = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    let status = buf[8];
    let punch = buf[9];
    AttendanceRecord {
        user_id: user_id.to_string(),
        status,
        punch,
        timestamp: decode_time(time),
    }
}

/// Decode a variable-width attendance row:
/// `[uid:u16, userId:24-byte-string, status:u8, time:u32, punch:u8]`.
pub fn decode_attendance_var(buf: &[u8]) -> AttendanceRecord {
    let uid = u16::from_le_bytes([buf[0], buf[1]]);
    let user_id_str = read_str(&buf[2..26]);
    let status = buf[26];
    let time = u32::from_le_bytes([buf[27], buf[28], buf[29], buf[30]]);
    let punch = buf[31];
    let user_id = if user_id_str.is_empty() {
        uid.to_string()
    } else {
        user_id_str
    };
    AttendanceRecord {
        user_id,
        status,
        punch,
        timestamp: decode_time(time),
    }
}

/// Encode the live-capture / enrollment compact 6-byte timestamp:
/// `[Y-2000, M, D, h, m, s]`.
pub fn encode_compact_time(time: &DecodedTime) -> [u8; 6] {
    [
        (time.year - 2000).max(0) as u8,
        time.month as u8,
        time.day as u8,
        time.hour as u8,
        time.minute as u8,
        time.second as u8,
    ]
}

/// Decode the live-capture / enrollment compact 6-byte timestamp.
pub fn decode_compact_time(buf: &[u8; 6]) -> DecodedTime {
    DecodedTime {
        year: buf[0] as i32 + 2000,
        month: buf[1] as u32,
        day: buf[2] as u32,
        hour: buf[3] as u32,
        minute: buf[4] as u32,
        second: buf[5] as u32,
    }
}

/// Build one 8-byte fingerprint-index-table entry:
/// `[0x02, uid:u16, 16+fid:u8, offset:u32]`.
pub fn pack_fingerprint_index_entry(uid: u16, finger_index: u8, offset: u32) -> [u8; 8] {
    let mut entry = [0u8; 8];
    entry[0] = 0x02;
    entry[1..3].copy_from_slice(&uid.to_le_bytes());
    entry[3] = 16 + finger_index;
    entry[4..8].copy_from_slice(&offset.to_le_bytes());
    entry
}

/// Prefix a template blob with its own u16 length, as the bulk-write region expects.
pub fn pack_length_prefixed_template(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + data.len());
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(data);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecordLayout;

    fn sample_user() -> User {
        let mut u = User::new(1, "1", "Alice");
        u.card = 12345;
        u.group_id = "3".to_string();
        u
    }

    #[test]
    fn narrow_user_round_trips() {
        let user = sample_user();
        let packed = pack_user_narrow(&user);
        let back = unpack_user_narrow(&packed);
        assert_eq!(back.uid, 1);
        assert_eq!(back.name, "Alice");
        assert_eq!(back.user_id, "1");
        assert_eq!(back.card, 12345);
        assert_eq!(back.group_id, "3");
    }

    #[test]
    fn wide_user_round_trips() {
        let mut user = sample_user();
        user.user_id = "EMP-0042".to_string();
        user.group_id = "staff".to_string();
        let packed = pack_user_wide(&user);
        let back = unpack_user_wide(&packed);
        assert_eq!(back.user_id, "EMP-0042");
        assert_eq!(back.group_id, "staff");
        assert_eq!(back.name, "Alice");
    }

    #[test]
    fn for_save_layout_prepends_tag_and_shifts() {
        let user = sample_user();
        let packed = pack_user_narrow(&user);
        let for_save = pack_user_for_save(&user, RecordLayout::Narrow);
        assert_eq!(for_save.len(), 29);
        assert_eq!(for_save[0], 0x02);
        assert_eq!(&for_save[1..], &packed[..]);
    }

    #[test]
    fn narrow_prefix_28_byte_record_scenario() {
        // 4-byte count prefix `28 00 00 00` then one narrow record, uid=1, name="Alice".
        let mut buf = vec![28u8, 0, 0, 0];
        let user = User::new(1, "7", "Alice");
        buf.extend_from_slice(&pack_user_narrow(&user));
        let record = &buf[4..4 + 28];
        let decoded = unpack_user_narrow(record);
        assert_eq!(decoded.uid, 1);
        assert_eq!(decoded.name, "Alice");
    }

    #[test]
    fn attendance_width_8_fields() {
        let mut buf = [0u8; 8];
        buf[0..2].copy_from_slice(&9u16.to_le_bytes());
        buf[2] = 1;
        buf[3..7].copy_from_slice(&100u32.to_le_bytes());
        buf[7] = 2;
        let r = decode_attendance_8(&buf);
        assert_eq!(r.user_id, "9");
        assert_eq!(r.status, 1);
        assert_eq!(r.punch, 2);
    }

    #[test]
    fn attendance_width_16_fields() {
        let mut buf = [0u8; 16];
        buf[0..4].copy_from_slice(&42u32.to_le_bytes());
        buf[4..8].copy_from_slice(&100u32.to_le_bytes());
        buf[8] = 3;
        buf[9] = 4;
        let r = decode_attendance_16(&buf);
        assert_eq!(r.user_id, "42");
        assert_eq!(r.status, 3);
        assert_eq!(r.punch, 4);
    }

    #[test]
    fn attendance_two_8_byte_rows_from_16_bytes() {
        let total = vec![0u8; 16];
        let rows: Vec<_> = total.chunks(8).map(decode_attendance_8).collect();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn attendance_two_16_byte_rows_from_32_bytes() {
        let total = vec![0u8; 32];
        let rows: Vec<_> = total.chunks(16).map(decode_attendance_16).collect();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn compact_time_round_trips() {
        let t = decode_time(0);
        let compact = encode_compact_time(&t);
        let back = decode_compact_time(&compact);
        assert_eq!(back, t);
    }

    #[test]
    fn fingerprint_index_entry_layout() {
        let entry = pack_fingerprint_index_entry(7, 2, 128);
        assert_eq!(entry[0], 0x02);
        assert_eq!(u16::from_le_bytes([entry[1], entry[2]]), 7);
        assert_eq!(entry[3], 18);
        assert_eq!(u32::from_le_bytes([entry[4], entry[5], entry[6], entry[7]]), 128);
    }

    #[test]
    fn length_prefixed_template_carries_its_own_length() {
        let data = vec![1, 2, 3, 4, 5];
        let blob = pack_length_prefixed_template(&data);
        assert_eq!(u16::from_le_bytes([blob[0], blob[1]]) as usize, data.len());
        assert_eq!(&blob[2..], &data[..]);
    }
}
