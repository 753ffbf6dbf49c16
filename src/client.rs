//! [`Device`]: the public façade most callers use instead of reaching into
//! [`crate::session::Session`] and `crate::ops::*` directly.

use std::time::Duration;

use chrono::NaiveDateTime;

use crate::config::DeviceConfig;
use crate::error::Result;
use crate::model::{AttendanceRecord, Capacity, FingerprintTemplate, RecordLayout, User};
use crate::ops::capture::{CaptureScope, LiveCapture, PunchEvent};
use crate::ops::enroll::EnrollOutcome;
use crate::ops::{attendance, control, enroll, templates, users};
use crate::session::Session;

/// A connected device. Owns the [`Session`] and exposes one method per
/// protocol operation; construct with [`Device::connect`].
pub struct Device {
    session: Session,
}

impl Device {
    /// Open the transport and complete the connect/auth handshake.
    pub async fn connect(config: DeviceConfig) -> Result<Device> {
        let session = Session::connect(config).await?;
        Ok(Device { session })
    }

    /// Send `CMD_EXIT` and close the transport. Prefer this over letting a
    /// `Device` simply drop, since the exit handshake is a network round
    /// trip and `Drop` can't await one.
    pub async fn disconnect(mut self) {
        self.session.exit().await;
    }

    // -- device control -----------------------------------------------

    pub async fn enable_device(&mut self) -> Result<()> {
        control::enable_device(&mut self.session).await
    }

    pub async fn disable_device(&mut self) -> Result<()> {
        control::disable_device(&mut self.session).await
    }

    pub async fn restart(&mut self) -> Result<()> {
        control::restart(&mut self.session).await
    }

    pub async fn poweroff(&mut self) -> Result<()> {
        control::poweroff(&mut self.session).await
    }

    pub async fn test_voice(&mut self, index: u8) -> Result<()> {
        control::test_voice(&mut self.session, index).await
    }

    pub async fn get_time(&mut self) -> Result<NaiveDateTime> {
        Ok(control::get_time(&mut self.session)
            .await?
            .to_naive_datetime_clamped())
    }

    pub async fn set_time(&mut self, time: NaiveDateTime) -> Result<()> {
        control::set_time(&mut self.session, time).await
    }

    pub async fn unlock(&mut self, seconds: u32) -> Result<()> {
        control::unlock(&mut self.session, seconds).await
    }

    pub async fn door_state(&mut self) -> Result<u8> {
        control::door_state(&mut self.session).await
    }

    pub async fn write_lcd(&mut self, line: u8, text: &str) -> Result<()> {
        control::write_lcd(&mut self.session, line, text).await
    }

    pub async fn clear_lcd(&mut self) -> Result<()> {
        control::clear_lcd(&mut self.session).await
    }

    pub async fn get_version(&mut self) -> Result<String> {
        control::get_version(&mut self.session).await
    }

    pub async fn get_pin_width(&mut self) -> Result<u8> {
        control::get_pin_width(&mut self.session).await
    }

    pub async fn get_free_sizes(&mut self) -> Result<Capacity> {
        control::get_free_sizes(&mut self.session).await
    }

    pub async fn get_option(&mut self, option: &str) -> Result<String> {
        control::options_read(&mut self.session, option).await
    }

    pub async fn set_option(&mut self, option: &str, value: &str) -> Result<()> {
        control::options_write(&mut self.session, option, value).await
    }

    // -- users ----------------------------------------------------------

    pub async fn get_users(&mut self) -> Result<Vec<User>> {
        users::enumerate_users(&mut self.session).await
    }

    pub async fn set_user(&mut self, user: &User) -> Result<()> {
        users::write_user(&mut self.session, user).await
    }

    pub async fn delete_user(&mut self, uid: u16) -> Result<()> {
        users::delete_user(&mut self.session, uid).await
    }

    /// Delete a user known only by its user-ID string: resolves the UID by
    /// enumerating the user table first.
    pub async fn delete_user_by_user_id(&mut self, user_id: &str) -> Result<()> {
        users::delete_user_by_user_id(&mut self.session, user_id).await
    }

    /// Current record layout, if it has been observed yet (via
    /// [`Device::get_users`] or set explicitly).
    pub fn user_layout(&self) -> Option<RecordLayout> {
        self.session.layout
    }

    pub fn set_user_layout(&mut self, layout: RecordLayout) {
        users::set_layout(&mut self.session, layout);
    }

    /// Next UID [`Device::set_user`] will assign if called with `uid == 0`,
    /// advanced past the highest UID seen by the last [`Device::get_users`].
    pub fn next_uid(&self) -> u16 {
        self.session.next_uid
    }

    /// Next free numeric user-ID string hint, advanced past the highest
    /// numeric `user_id` seen by the last [`Device::get_users`] (§3 "next
    /// free user-ID string hint").
    pub fn next_user_id(&self) -> u32 {
        self.session.next_user_id
    }

    // -- templates --------------------------------------------------------

    /// Raw, undecoded template reply for `uid` — see
    /// [`crate::ops::templates`] for why this isn't split into
    /// [`FingerprintTemplate`]s.
    pub async fn get_user_templates(&mut self, uid: u16) -> Result<Vec<u8>> {
        templates::get_user_templates(&mut self.session, uid).await
    }

    pub async fn save_user_templates(
        &mut self,
        layout: RecordLayout,
        entries: &[(User, Vec<FingerprintTemplate>)],
    ) -> Result<()> {
        templates::save_user_templates(&mut self.session, layout, entries).await
    }

    pub async fn delete_user_template(&mut self, uid: u16, finger_index: u8) -> Result<()> {
        templates::delete_user_template(&mut self.session, uid, finger_index).await
    }

    pub async fn delete_all_user_templates(&mut self, uid: u16) -> Result<()> {
        templates::delete_all_user_templates(&mut self.session, uid).await
    }

    // -- attendance -------------------------------------------------------

    pub async fn get_attendance_log(&mut self) -> Result<Vec<AttendanceRecord>> {
        attendance::enumerate_attendance(&mut self.session).await
    }

    pub async fn clear_attendance_log(&mut self) -> Result<()> {
        attendance::clear_attendance(&mut self.session).await
    }

    pub async fn clear_all_data(&mut self) -> Result<()> {
        control::clear_data(&mut self.session).await
    }

    /// Dump the device's raw, undecoded database (`CMD_DB_RRQ`).
    pub async fn read_raw_database(&mut self) -> Result<Vec<u8>> {
        crate::ops::bulk::read_raw_database(&mut self.session).await
    }

    // -- live capture -----------------------------------------------------

    /// Start the live-capture producer/consumer loop: enumerates users,
    /// clears stray verify/enroll state, and registers for `scope`. Returns
    /// the handle to poll and a snapshot of the user table.
    pub async fn start_live_capture(&mut self, scope: CaptureScope) -> Result<(LiveCapture, Vec<User>)> {
        LiveCapture::start(&mut self.session, scope).await
    }

    /// Drive one poll iteration of an already-started capture.
    pub async fn poll_live_capture(&mut self, capture: &mut LiveCapture, timeout: Duration) -> Result<Vec<PunchEvent>> {
        capture.poll(&mut self.session, timeout).await
    }

    /// Deregister events and restore the device's prior enabled state.
    pub async fn stop_live_capture(&mut self, capture: LiveCapture) -> Result<()> {
        capture.stop(&mut self.session).await
    }

    // -- enrollment ---------------------------------------------------

    /// Run fingerprint enrollment for `finger_index` on `user_id` to
    /// completion: up to three scan rounds, then deregister/cancel/verify.
    pub async fn enroll(&mut self, user_id: &str, finger_index: u8, frame_timeout: Duration) -> Result<EnrollOutcome> {
        enroll::enroll(&mut self.session, user_id, finger_index, frame_timeout).await
    }

    pub async fn cancel_enroll(&mut self) -> Result<()> {
        enroll::cancel_enroll(&mut self.session).await
    }
}
