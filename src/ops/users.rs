//! User enumeration and single-user write/delete.
//!
//! The device reports users in one of two fixed-width wire layouts (narrow
//! or wide); the layout isn't announced up front. The bulk-read reply only
//! carries the *total* byte count — recovering the per-record width needs
//! dividing that by the user count cached from `CMD_GET_FREE_SIZES`, so
//! [`crate::ops::control::get_free_sizes`] should be called before the
//! first enumeration (a fresh session defaults its cached count to `0`, in
//! which case this falls back to guessing from the two known widths).

use log::debug;

use crate::codec::cmd;
use crate::codec::records::{pack_user_narrow, pack_user_wide, unpack_user};
use crate::error::{Result, ZkError};
use crate::model::{RecordLayout, User};
use crate::ops::bulk::bulk_read;
use crate::ops::require_ok;
use crate::session::Session;

/// Pull the full user table.
pub async fn enumerate_users(session: &mut Session) -> Result<Vec<User>> {
    let data = bulk_read(session, cmd::CMD_USERTEMP_RRQ, crate::codec::FCT_USER, 0).await?;
    if data.len() < 4 {
        return Err(ZkError::Frame("user table reply shorter than its 4-byte prefix".into()));
    }
    let total_len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let body = &data[4..];
    let record_width = infer_record_width(total_len, session.capacity.users, body.len())?;
    session.layout = Some(record_width);
    debug!(
        "user table: {total_len} bytes / cached count -> {}-byte ({record_width:?}) records",
        record_width.width()
    );

    let width = record_width.width();
    let mut users = Vec::with_capacity(body.len() / width);
    for chunk in body.chunks(width) {
        if chunk.len() < width {
            break;
        }
        let user = unpack_user(chunk, record_width);
        session.next_uid = session.next_uid.max(user.uid.wrapping_add(1));
        if let Ok(numeric_id) = user.user_id.parse::<u32>() {
            session.next_user_id = session.next_user_id.max(numeric_id + 1);
        }
        users.push(user);
    }
    Ok(users)
}

fn infer_record_width(total_len: usize, cached_user_count: i32, body_len: usize) -> Result<RecordLayout> {
    if cached_user_count > 0 {
        let width = total_len / cached_user_count as usize;
        if let Some(layout) = RecordLayout::from_width(width) {
            return Ok(layout);
        }
    }
    // No (usable) cached count yet: fall back to whichever of the two known
    // widths evenly divides the payload.
    if body_len % RecordLayout::Wide.width() == 0 && body_len > 0 {
        return Ok(RecordLayout::Wide);
    }
    if body_len % RecordLayout::Narrow.width() == 0 && body_len > 0 {
        return Ok(RecordLayout::Narrow);
    }
    Err(ZkError::Protocol(format!(
        "could not infer a user record width from total_len={total_len}, cached_count={cached_user_count}, body_len={body_len}"
    )))
}

/// Write one user record. Allocates a fresh UID from [`Session::next_uid`]
/// if `user.uid == 0`. Requires a cached layout (call [`enumerate_users`]
/// first, or supply one via [`set_layout`]).
pub async fn write_user(session: &mut Session, user: &User) -> Result<()> {
    let layout = session
        .layout
        .ok_or_else(|| ZkError::Operation("user record layout is unknown; enumerate users first".into()))?;

    let mut user = user.clone();
    if user.uid == 0 {
        user.uid = session.next_uid;
    }
    let previous_next_uid = session.next_uid;

    let payload = match layout {
        RecordLayout::Narrow => pack_user_narrow(&user).to_vec(),
        RecordLayout::Wide => pack_user_wide(&user).to_vec(),
    };
    require_ok(session, cmd::CMD_USER_WRQ, &payload).await?;
    require_ok(session, cmd::CMD_REFRESHDATA, &[]).await?;

    if user.uid == previous_next_uid {
        session.next_uid = session.next_uid.wrapping_add(1);
    }
    Ok(())
}

/// Assign the record layout without a round trip, for devices whose layout
/// is already known out of band.
pub fn set_layout(session: &mut Session, layout: RecordLayout) {
    session.layout = Some(layout);
}

/// Delete a user by UID.
pub async fn delete_user(session: &mut Session, uid: u16) -> Result<()> {
    require_ok(session, cmd::CMD_DELETE_USER, &uid.to_le_bytes()).await?;
    require_ok(session, cmd::CMD_REFRESHDATA, &[]).await?;
    Ok(())
}

/// Delete a user known only by its user-ID string: enumerate the user table
/// to resolve the matching UID, then delete by UID as usual.
pub async fn delete_user_by_user_id(session: &mut Session, user_id: &str) -> Result<()> {
    let table = enumerate_users(session).await?;
    let uid = table
        .iter()
        .find(|u| u.user_id == user_id)
        .map(|u| u.uid)
        .ok_or_else(|| ZkError::Operation(format!("no user with user-ID {user_id:?}")))?;
    delete_user(session, uid).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_is_inferred_from_total_len_over_cached_count() {
        let layout = infer_record_width(56, 2, 56).unwrap();
        assert_eq!(layout, RecordLayout::Narrow);

        let layout = infer_record_width(144, 2, 144).unwrap();
        assert_eq!(layout, RecordLayout::Wide);
    }

    #[test]
    fn falls_back_to_divisibility_without_a_cached_count() {
        let layout = infer_record_width(0, 0, 72).unwrap();
        assert_eq!(layout, RecordLayout::Wide);
    }

    #[test]
    fn parses_a_narrow_user_table_payload() {
        let mut data = Vec::new();
        data.extend_from_slice(&56u32.to_le_bytes()); // 2 records * 28 bytes
        data.extend_from_slice(&pack_user_narrow(&User::new(1, "7", "Alice")));
        data.extend_from_slice(&pack_user_narrow(&User::new(2, "8", "Bob")));

        let total_len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        let body = &data[4..];
        let layout = infer_record_width(total_len, 2, body.len()).unwrap();
        assert_eq!(layout, RecordLayout::Narrow);
        let users: Vec<_> = body.chunks(layout.width()).map(|c| unpack_user(c, layout)).collect();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].name, "Alice");
        assert_eq!(users[1].name, "Bob");
    }
}
