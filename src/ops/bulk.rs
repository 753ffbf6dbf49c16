//! Prepare-buffer/read-buffer bulk *read* protocol, and the
//! free-data/prepare-data/data-chunks bulk *write* protocol that templates
//! ride on top of.

use log::{debug, warn};

use crate::codec::cmd;
use crate::codec::WRITE_CHUNK;
use crate::error::{Result, ZkError};
use crate::ops::require_ok;
use crate::session::{classify, ReplyKind, Session};

/// Run a bulk read of `request_cmd`/`fct`/`ext` (e.g. `CMD_USERTEMP_RRQ` /
/// `FCT_USER`), reassembling the chunked response. `CMD_FREE_DATA` is sent
/// on every exit path, success or failure.
pub async fn bulk_read(session: &mut Session, request_cmd: u16, fct: i32, ext: i32) -> Result<Vec<u8>> {
    let result = bulk_read_inner(session, request_cmd, fct, ext).await;
    if let Err(e) = free_data(session).await {
        warn!("CMD_FREE_DATA failed while releasing a bulk read buffer: {e}");
    }
    result
}

async fn bulk_read_inner(session: &mut Session, request_cmd: u16, fct: i32, ext: i32) -> Result<Vec<u8>> {
    let mut arg = [0u8; 11];
    arg[0] = 0x01;
    arg[1..3].copy_from_slice(&request_cmd.to_le_bytes());
    arg[3..7].copy_from_slice(&fct.to_le_bytes());
    arg[7..11].copy_from_slice(&ext.to_le_bytes());

    let frame = require_ok(session, cmd::CMD_PREPARE_BUFFER, &arg).await?;

    match classify(frame.header.command) {
        ReplyKind::Data => Ok(frame.payload),
        ReplyKind::Ok => {
            if frame.payload.len() < 5 {
                return Err(ZkError::Frame(
                    "prepare-buffer ack shorter than 5 bytes".into(),
                ));
            }
            let total_len = u32::from_le_bytes([
                frame.payload[1],
                frame.payload[2],
                frame.payload[3],
                frame.payload[4],
            ]) as usize;
            debug!("bulk read: {total_len} bytes across chunks of at most {}", session.max_chunk());
            read_chunks(session, total_len).await
        }
        ReplyKind::PrepareData => {
            // Some firmwares reply with CMD_PREPARE_DATA directly; treat the
            // same as the CMD_ACK_OK branch.
            if frame.payload.len() < 5 {
                return Err(ZkError::Frame(
                    "prepare-data reply shorter than 5 bytes".into(),
                ));
            }
            let total_len = u32::from_le_bytes([
                frame.payload[1],
                frame.payload[2],
                frame.payload[3],
                frame.payload[4],
            ]) as usize;
            read_chunks(session, total_len).await
        }
        _ => unreachable!("require_ok already rejects non-ok replies"),
    }
}

async fn read_chunks(session: &mut Session, total_len: usize) -> Result<Vec<u8>> {
    let max_chunk = session.max_chunk();
    let retries = session.config().chunk_retries;
    let mut data = Vec::with_capacity(total_len);
    let mut start = 0usize;
    while start < total_len {
        let size = (total_len - start).min(max_chunk);
        let chunk = read_chunk_with_retry(session, start as u32, size as u32, retries).await?;
        data.extend_from_slice(&chunk);
        start += size;
    }
    Ok(data)
}

async fn read_chunk_with_retry(
    session: &mut Session,
    start: u32,
    size: u32,
    retries: u8,
) -> Result<Vec<u8>> {
    let mut last_err = None;
    for attempt in 0..=retries {
        match read_chunk(session, start, size).await {
            Ok(data) => return Ok(data),
            Err(e) => {
                warn!("chunk read at offset {start} (attempt {attempt}) failed: {e}");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.expect("loop runs at least once"))
}

async fn read_chunk(session: &mut Session, start: u32, size: u32) -> Result<Vec<u8>> {
    let mut arg = [0u8; 8];
    arg[0..4].copy_from_slice(&start.to_le_bytes());
    arg[4..8].copy_from_slice(&size.to_le_bytes());

    let frame = require_ok(session, cmd::CMD_READ_BUFFER, &arg).await?;
    if frame.header.command != cmd::CMD_DATA {
        return Err(ZkError::Protocol(format!(
            "expected CMD_DATA for a buffer chunk, got {}",
            frame.header.command
        )));
    }
    if frame.payload.len() != size as usize {
        return Err(ZkError::Frame(format!(
            "chunk length mismatch: requested {size}, got {}",
            frame.payload.len()
        )));
    }
    Ok(frame.payload)
}

/// Release the device-side prepare-buffer allocation.
pub async fn free_data(session: &mut Session) -> Result<()> {
    session.request(cmd::CMD_FREE_DATA, &[]).await?;
    Ok(())
}

/// Dump the device's raw, undecoded database via `CMD_DB_RRQ`. Unlike the
/// user/template/attendance bulk reads, the device imposes no record layout
/// on this payload — it's handed back as-is for callers that know what to
/// do with a particular firmware's table dump.
pub async fn read_raw_database(session: &mut Session) -> Result<Vec<u8>> {
    bulk_read(session, cmd::CMD_DB_RRQ, 0, 0).await
}

/// Run the first three steps of the bulk *write* protocol: free any stale
/// buffer, announce `total_len` via `CMD_PREPARE_DATA`, then stream `payload`
/// in chunks of at most [`WRITE_CHUNK`] bytes. The caller issues the
/// operation-specific final command and `CMD_REFRESHDATA` afterward.
pub async fn write_buffer(session: &mut Session, payload: &[u8]) -> Result<()> {
    let _ = session.request(cmd::CMD_FREE_DATA, &[]).await;

    let total_len = payload.len() as u32;
    require_ok(session, cmd::CMD_PREPARE_DATA, &total_len.to_le_bytes()).await?;

    for chunk in payload.chunks(WRITE_CHUNK) {
        require_ok(session, cmd::CMD_DATA, chunk).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_plan_matches_scenario_6() {
        // size=0x12345, stream chunk-max=0xFFC0 -> 1 full chunk + a 0x2385 remainder.
        let total_len: usize = 0x12345;
        let max_chunk: usize = 0xFFC0;
        let mut sizes = Vec::new();
        let mut start = 0usize;
        while start < total_len {
            let size = (total_len - start).min(max_chunk);
            sizes.push(size);
            start += size;
        }
        assert_eq!(sizes, vec![0xFFC0, 0x2385]);
        assert_eq!(sizes.iter().sum::<usize>(), total_len);
    }
}
