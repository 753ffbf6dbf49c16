//! The device's non-proleptic timestamp encoding: months are always 31 days
//! wide in the wire format, so this must not be normalized against a real
//! calendar when decoding.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// A decoded device timestamp, kept in its raw (possibly calendar-illegal)
/// component form. Use [`DecodedTime::to_naive_datetime`] to get a real
/// `chrono` value, which is `None` for components like day 31 in a 30-day
/// month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl DecodedTime {
    /// Convert to a real calendar date, if the components happen to name one.
    pub fn to_naive_datetime(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .and_then(|d| d.and_hms_opt(self.hour, self.minute, self.second))
    }

    /// Convert to a real calendar date, clamping an out-of-range day down to
    /// the last valid day of the month rather than returning `None`.
    pub fn to_naive_datetime_clamped(&self) -> NaiveDateTime {
        if let Some(dt) = self.to_naive_datetime() {
            return dt;
        }
        let next_month = NaiveDate::from_ymd_opt(
            if self.month < 12 { self.year } else { self.year + 1 },
            if self.month < 12 { self.month + 1 } else { 1 },
            1,
        )
        .expect("computed month/year is always in range");
        let last_day = next_month.pred_opt().expect("non-overflowing").day();
        let day = self.day.min(last_day);
        NaiveDate::from_ymd_opt(self.year, self.month, day)
            .and_then(|d| {
                d.and_hms_opt(
                    self.hour.min(23),
                    self.minute.min(59),
                    self.second.min(59),
                )
            })
            .unwrap_or_else(|| {
                NaiveDate::from_ymd_opt(2000, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            })
    }
}

/// Decode a device 32-bit timestamp. Divisors are applied in the order
/// 60, 60, 24, 31, 12 per the wire encoding; `day`/`month` are 1-based.
pub fn decode_time(mut value: u32) -> DecodedTime {
    let second = value % 60;
    value /= 60;
    let minute = value % 60;
    value /= 60;
    let hour = value % 24;
    value /= 24;
    let day = (value % 31) + 1;
    value /= 31;
    let month = (value % 12) + 1;
    value /= 12;
    let year = value as i32 + 2000;

    DecodedTime {
        year,
        month,
        day,
        hour,
        minute,
        second,
    }
}

/// Encode a real calendar date/time into the device's 32-bit timestamp.
///
/// `dt.year()` must be `>= 2000`; day/month are taken as-is (the device
/// format tolerates any day in 1..=31 regardless of the month's real length,
/// but a `chrono` date never produces an out-of-range one).
pub fn encode_time(dt: NaiveDateTime) -> u32 {
    let year = (dt.year() - 2000) as u32;
    let month = dt.month() - 1;
    let day = dt.day() - 1;
    let hour = dt.hour();
    let minute = dt.minute();
    let second = dt.second();

    ((((year * 12 + month) * 31 + day) * 24 + hour) * 60 + minute) * 60 + second
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_zero_is_epoch() {
        let d = decode_time(0);
        assert_eq!(d.year, 2000);
        assert_eq!(d.month, 1);
        assert_eq!(d.day, 1);
        assert_eq!(d.hour, 0);
        assert_eq!(d.minute, 0);
        assert_eq!(d.second, 0);
    }

    #[test]
    fn round_trips_through_a_real_date() {
        let dt = NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(10, 30, 45)
            .unwrap();
        let encoded = encode_time(dt);
        let decoded = decode_time(encoded);
        assert_eq!(decoded.to_naive_datetime(), Some(dt));
    }

    #[test]
    fn round_trips_exhaustively_over_a_field_grid() {
        for year in [2000, 2001, 2030] {
            for month in 1..=12u32 {
                for day in [1u32, 15, 31] {
                    for (h, m, s) in [(0, 0, 0), (23, 59, 59), (10, 30, 45)] {
                        let value = ((((year - 2000) * 12 + (month - 1)) * 31 + (day - 1)) * 24
                            + h)
                            * 60
                            * 60
                            + m * 60
                            + s;
                        let decoded = decode_time(value);
                        let re_value = (((((decoded.year - 2000) as u32 * 12
                            + (decoded.month - 1))
                            * 31
                            + (decoded.day - 1))
                            * 24
                            + decoded.hour)
                            * 60
                            + decoded.minute)
                            * 60
                            + decoded.second;
                        assert_eq!(value, re_value);
                    }
                }
            }
        }
    }

    #[test]
    fn illegal_calendar_day_does_not_normalize() {
        // Day 31 of February: the device format allows it, a real calendar doesn't.
        let value = (((((2024 - 2000) * 12 + 1) * 31 + 30) * 24) * 60) * 60;
        let decoded = decode_time(value);
        assert_eq!(decoded.month, 2);
        assert_eq!(decoded.day, 31);
        assert_eq!(decoded.to_naive_datetime(), None);
        let clamped = decoded.to_naive_datetime_clamped();
        assert_eq!(clamped.day(), 29); // 2024 is a leap year
    }
}
