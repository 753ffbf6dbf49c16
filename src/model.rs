//! Record types shared by the codec and the operations layer.

use crate::codec::time::DecodedTime;
use serde::{Deserialize, Serialize};

/// Which of the two user-record wire layouts a connection is currently using.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordLayout {
    /// 28-byte records, used by older firmware (both transports).
    Narrow,
    /// 72-byte records, used by newer firmware over the stream transport.
    Wide,
}

impl RecordLayout {
    pub fn width(self) -> usize {
        match self {
            RecordLayout::Narrow => 28,
            RecordLayout::Wide => 72,
        }
    }

    /// Select a layout from an observed per-record byte width, if it matches
    /// one of the two known widths.
    pub fn from_width(width: usize) -> Option<RecordLayout> {
        match width {
            28 => Some(RecordLayout::Narrow),
            72 => Some(RecordLayout::Wide),
            _ => None,
        }
    }
}

/// Privilege bitfield: bit 0 disables the user, bits 1-3 carry the user type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Privilege(pub u8);

impl Privilege {
    pub const DEFAULT_USER: u8 = 0;
    pub const ADMIN: u8 = 14;

    pub fn new(disabled: bool, user_type: u8) -> Privilege {
        let mut bits = (user_type & 0x07) << 1;
        if disabled {
            bits |= 1;
        }
        Privilege(bits)
    }

    pub fn is_disabled(self) -> bool {
        self.0 & 1 != 0
    }

    pub fn user_type(self) -> u8 {
        (self.0 >> 1) & 0x07
    }

    pub fn is_admin(self) -> bool {
        self.user_type() == Self::ADMIN
    }
}

/// A device user record (narrow or wide layout, decoded to a common shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: u16,
    pub user_id: String,
    pub name: String,
    pub privilege: Privilege,
    pub password: String,
    pub group_id: String,
    pub card: u32,
}

impl User {
    pub fn new(uid: u16, user_id: impl Into<String>, name: impl Into<String>) -> User {
        User {
            uid,
            user_id: user_id.into(),
            name: name.into(),
            privilege: Privilege::new(false, Privilege::DEFAULT_USER),
            password: String::new(),
            group_id: String::new(),
            card: 0,
        }
    }
}

/// An opaque fingerprint template keyed by (uid, finger index).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintTemplate {
    pub uid: u16,
    pub finger_index: u8,
    pub valid: bool,
    pub data: Vec<u8>,
}

/// One row of the attendance log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Either the numeric UID or the user-ID string, depending on the wire
    /// width the row was decoded from.
    pub user_id: String,
    pub status: u8,
    pub punch: u8,
    pub timestamp: DecodedTime,
}

impl Serialize for DecodedTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("DecodedTime", 6)?;
        s.serialize_field("year", &self.year)?;
        s.serialize_field("month", &self.month)?;
        s.serialize_field("day", &self.day)?;
        s.serialize_field("hour", &self.hour)?;
        s.serialize_field("minute", &self.minute)?;
        s.serialize_field("second", &self.second)?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for DecodedTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            year: i32,
            month: u32,
            day: u32,
            hour: u32,
            minute: u32,
            second: u32,
        }
        let raw = Raw::deserialize(deserializer)?;
        Ok(DecodedTime {
            year: raw.year,
            month: raw.month,
            day: raw.day,
            hour: raw.hour,
            minute: raw.minute,
            second: raw.second,
        })
    }
}

/// Capacity counters reported by `CMD_GET_FREE_SIZES`, cached on the session.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Capacity {
    pub users: i32,
    pub fingers: i32,
    pub records: i32,
    pub cards: i32,
    pub fingers_capacity: i32,
    pub users_capacity: i32,
    pub records_capacity: i32,
    pub fingers_available: i32,
    pub users_available: i32,
    pub records_available: i32,
    pub faces: Option<i32>,
    pub faces_capacity: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privilege_round_trips_disabled_and_type() {
        let p = Privilege::new(true, Privilege::ADMIN);
        assert!(p.is_disabled());
        assert!(p.is_admin());

        let p = Privilege::new(false, Privilege::DEFAULT_USER);
        assert!(!p.is_disabled());
        assert!(!p.is_admin());
    }

    #[test]
    fn layout_width_round_trips() {
        assert_eq!(RecordLayout::from_width(28), Some(RecordLayout::Narrow));
        assert_eq!(RecordLayout::from_width(72), Some(RecordLayout::Wide));
        assert_eq!(RecordLayout::from_width(40), None);
    }
}
