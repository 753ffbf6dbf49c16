//! Command handlers layered on top of [`crate::session::Session`].
//!
//! Most operations are thin: compose one command, parse one reply. The bulk
//! transfer, live-capture, and enrollment flows are protocol sub-state-machines
//! and get their own modules.

pub mod attendance;
pub mod bulk;
pub mod capture;
pub mod control;
pub mod enroll;
pub mod templates;
pub mod users;

use crate::error::{Result, ZkError};
use crate::session::{classify, Frame, ReplyKind, Session};

/// Send `command`/`payload` and require an ok-classified reply, mapping
/// anything else to [`ZkError::Protocol`].
pub(crate) async fn require_ok(session: &mut Session, command: u16, payload: &[u8]) -> Result<Frame> {
    let frame = session.request(command, payload).await?;
    match classify(frame.header.command) {
        ReplyKind::Ok | ReplyKind::Data | ReplyKind::PrepareData => Ok(frame),
        ReplyKind::Unauthorized => Err(ZkError::Auth),
        ReplyKind::Error => Err(ZkError::Protocol(format!(
            "command {} got non-ok reply {}",
            command, frame.header.command
        ))),
    }
}
