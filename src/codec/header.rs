//! 8-byte command header and the 8-byte stream envelope that wraps it on TCP.

use super::checksum::checksum;
use super::next_reply_id;
use crate::error::{Result, ZkError};

/// Magic word pair that opens every stream-transport frame.
pub const STREAM_MAGIC_1: u16 = 0x5050;
pub const STREAM_MAGIC_2: u16 = 0x8217;

/// Decoded 8-byte command header (present on every packet, both directions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub command: u16,
    pub checksum: u16,
    pub session: u16,
    pub reply: u16,
}

impl Header {
    /// Compose an 8-byte header + payload packet.
    ///
    /// The wire reply id is `reply + 1 mod 65535`; the checksum covers the
    /// whole packet with the checksum field held at zero.
    pub fn compose(command: u16, session: u16, reply: u16, payload: &[u8]) -> Vec<u8> {
        let wire_reply = next_reply_id(reply);
        let mut packet = Vec::with_capacity(8 + payload.len());
        packet.extend_from_slice(&command.to_le_bytes());
        packet.extend_from_slice(&[0, 0]);
        packet.extend_from_slice(&session.to_le_bytes());
        packet.extend_from_slice(&wire_reply.to_le_bytes());
        packet.extend_from_slice(payload);

        let sum = checksum(&packet);
        packet[2..4].copy_from_slice(&sum.to_le_bytes());
        packet
    }

    /// Parse the leading 8 bytes of `buf` as a header.
    pub fn parse(buf: &[u8]) -> Result<Header> {
        if buf.len() < 8 {
            return Err(ZkError::Frame(format!(
                "packet too short for header: {} bytes",
                buf.len()
            )));
        }
        Ok(Header {
            command: u16::from_le_bytes([buf[0], buf[1]]),
            checksum: u16::from_le_bytes([buf[2], buf[3]]),
            session: u16::from_le_bytes([buf[4], buf[5]]),
            reply: u16::from_le_bytes([buf[6], buf[7]]),
        })
    }
}

/// Prepend the 8-byte stream envelope (magic, magic, payload length) to `packet`.
pub fn wrap_stream_envelope(packet: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(8 + packet.len());
    framed.extend_from_slice(&STREAM_MAGIC_1.to_le_bytes());
    framed.extend_from_slice(&STREAM_MAGIC_2.to_le_bytes());
    framed.extend_from_slice(&(packet.len() as u32).to_le_bytes());
    framed.extend_from_slice(packet);
    framed
}

/// Parse the 8-byte stream envelope, returning the payload length it announces.
pub fn parse_stream_envelope(buf: &[u8]) -> Result<u32> {
    if buf.len() < 8 {
        return Err(ZkError::Frame("envelope shorter than 8 bytes".into()));
    }
    let magic1 = u16::from_le_bytes([buf[0], buf[1]]);
    let magic2 = u16::from_le_bytes([buf[2], buf[3]]);
    if magic1 != STREAM_MAGIC_1 || magic2 != STREAM_MAGIC_2 {
        return Err(ZkError::Frame(format!(
            "bad stream envelope magic: {:#06x} {:#06x}",
            magic1, magic2
        )));
    }
    Ok(u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_then_parse_round_trips() {
        let payload = [1u8, 2, 3, 4, 5];
        let packet = Header::compose(1000, 42, 7, &payload);
        let header = Header::parse(&packet).unwrap();
        assert_eq!(header.command, 1000);
        assert_eq!(header.session, 42);
        assert_eq!(header.reply, 8); // reply + 1
        assert_eq!(&packet[8..], &payload);
    }

    #[test]
    fn checksum_validates_against_the_same_function() {
        let packet = Header::compose(2000, 0, 0, &[]);
        let mut zeroed = packet.clone();
        zeroed[2..4].copy_from_slice(&[0, 0]);
        let header = Header::parse(&packet).unwrap();
        assert_eq!(header.checksum, checksum(&zeroed));
    }

    #[test]
    fn reply_wraps_before_reaching_ushrt_max() {
        let packet = Header::compose(1000, 0, 65533, &[]);
        let header = Header::parse(&packet).unwrap();
        assert_eq!(header.reply, 65534);

        let packet = Header::compose(1000, 0, 65534, &[]);
        let header = Header::parse(&packet).unwrap();
        assert_eq!(header.reply, 0);
    }

    #[test]
    fn envelope_round_trips() {
        let packet = Header::compose(1000, 1, 1, &[9, 9]);
        let framed = wrap_stream_envelope(&packet);
        let len = parse_stream_envelope(&framed).unwrap();
        assert_eq!(len as usize, packet.len());
        assert_eq!(&framed[8..], &packet[..]);
    }

    #[test]
    fn envelope_rejects_bad_magic() {
        let mut framed = wrap_stream_envelope(&Header::compose(1000, 0, 0, &[]));
        framed[0] = 0xAA;
        assert!(parse_stream_envelope(&framed).is_err());
    }
}
