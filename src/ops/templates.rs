//! Fingerprint template read/save/delete.
//!
//! Saving rides the bulk *write* protocol: a three-region payload (user
//! records, a fingerprint-index table, and the length-prefixed template
//! blobs themselves) assembled client-side, then streamed through
//! [`crate::ops::bulk::write_buffer`] and finalized with
//! `_CMD_SAVE_USERTEMPS` / `CMD_REFRESHDATA`.
//!
//! Reading back a single user's templates (`_CMD_GET_USERTEMP`, or the
//! `CMD_USERTEMP_RRQ`/`FCT_FINGERTMP` bulk-read it falls back to) has no
//! documented reply layout — unlike the save path, which spells out its
//! three-region shape byte for byte. Rather than guess at a per-template
//! framing with no reference to check it against, this returns the raw reply
//! bytes and leaves decoding to a caller who knows their firmware's format.

use crate::codec::{cmd, FCT_FINGERTMP};
use crate::codec::records::{pack_fingerprint_index_entry, pack_length_prefixed_template, pack_user_for_save};
use crate::error::{Result, ZkError};
use crate::model::{FingerprintTemplate, RecordLayout, User};
use crate::ops::bulk::{bulk_read, write_buffer};
use crate::ops::require_ok;
use crate::session::Session;

/// Fetch the raw, undecoded template reply for `uid`. See the module
/// documentation for why this isn't split into [`FingerprintTemplate`]s.
pub async fn get_user_templates(session: &mut Session, uid: u16) -> Result<Vec<u8>> {
    let frame = require_ok(session, cmd::CMD_GET_USERTEMP, &uid.to_le_bytes()).await?;
    if frame.header.command == cmd::CMD_DATA || !frame.payload.is_empty() {
        return Ok(frame.payload);
    }
    bulk_read(session, cmd::CMD_USERTEMP_RRQ, FCT_FINGERTMP, uid as i32).await
}

/// Save one or more templates in a single bulk-write transaction: each
/// `(user, templates)` pair contributes a user record, one fingerprint-index
/// entry per template, and the template blob itself.
pub async fn save_user_templates(
    session: &mut Session,
    layout: RecordLayout,
    entries: &[(User, Vec<FingerprintTemplate>)],
) -> Result<()> {
    if entries.is_empty() {
        return Err(ZkError::Operation("save_user_templates called with no entries".into()));
    }

    let mut users_region = Vec::new();
    let mut index_region = Vec::new();
    let mut template_region = Vec::new();

    let mut running_offset: u32 = 0;
    for (user, templates) in entries {
        users_region.extend_from_slice(&pack_user_for_save(user, layout));
        for template in templates {
            index_region.extend_from_slice(&pack_fingerprint_index_entry(
                user.uid,
                template.finger_index,
                running_offset,
            ));
            let blob = pack_length_prefixed_template(&template.data);
            running_offset += blob.len() as u32;
            template_region.extend_from_slice(&blob);
        }
    }

    // A 12-byte header precedes the three regions: each region's own byte length.
    let mut payload = Vec::with_capacity(12 + users_region.len() + index_region.len() + template_region.len());
    payload.extend_from_slice(&(users_region.len() as u32).to_le_bytes());
    payload.extend_from_slice(&(index_region.len() as u32).to_le_bytes());
    payload.extend_from_slice(&(template_region.len() as u32).to_le_bytes());
    payload.extend_from_slice(&users_region);
    payload.extend_from_slice(&index_region);
    payload.extend_from_slice(&template_region);

    write_buffer(session, &payload).await?;

    let mut final_args = Vec::with_capacity(8);
    final_args.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    final_args.extend_from_slice(&0u16.to_le_bytes());
    final_args.extend_from_slice(&8u16.to_le_bytes());
    require_ok(session, cmd::CMD_SAVE_USERTEMPS, &final_args).await?;
    require_ok(session, cmd::CMD_REFRESHDATA, &[]).await?;
    Ok(())
}

pub async fn delete_user_template(session: &mut Session, uid: u16, finger_index: u8) -> Result<()> {
    let mut arg = Vec::with_capacity(3);
    arg.extend_from_slice(&uid.to_le_bytes());
    arg.push(finger_index);
    require_ok(session, cmd::CMD_DELETE_USERTEMP, &arg).await?;
    Ok(())
}

/// Delete every template for `uid` in one request (`_CMD_DEL_USER_TEMP`,
/// distinct from the single-finger `CMD_DELETE_USERTEMP` above).
pub async fn delete_all_user_templates(session: &mut Session, uid: u16) -> Result<()> {
    require_ok(session, cmd::CMD_DEL_USER_TEMP, &uid.to_le_bytes()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_layout_places_users_then_index_then_templates() {
        let user = User::new(3, "3", "Carl");
        let template = FingerprintTemplate {
            uid: 3,
            finger_index: 0,
            valid: true,
            data: vec![1, 2, 3, 4],
        };
        let users_region = pack_user_for_save(&user, RecordLayout::Narrow);
        let index_entry = pack_fingerprint_index_entry(3, 0, 0);
        let template_blob = pack_length_prefixed_template(&template.data);

        let mut payload = Vec::new();
        payload.extend_from_slice(&users_region);
        payload.extend_from_slice(&index_entry);
        payload.extend_from_slice(&template_blob);

        assert_eq!(&payload[..users_region.len()], &users_region[..]);
        assert_eq!(payload[users_region.len()], 0x02); // index entry tag byte
    }
}
