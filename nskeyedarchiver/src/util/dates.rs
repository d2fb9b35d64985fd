/*!
 Contains date conversions for the timestamps stored in keyed archives.

 `NSDate` stores its value as seconds since `2001-01-01T00:00:00Z`.
*/

use std::time::SystemTime;

use chrono::{DateTime, Utc};

/// Seconds between the Unix epoch and `2001-01-01T00:00:00Z`
pub const APPLE_REFERENCE_EPOCH: i64 = 978_307_200;

const NANOS_PER_SECOND: f64 = 1_000_000_000.;

/// Convert seconds since the reference date to a [`DateTime`], if it is representable
pub fn reference_to_datetime(offset: f64) -> Option<DateTime<Utc>> {
    if !offset.is_finite() {
        return None;
    }
    let seconds = offset.floor();
    let nanos = ((offset - seconds) * NANOS_PER_SECOND).round() as u32;
    let (seconds, nanos) = if nanos >= 1_000_000_000 {
        (seconds as i64 + 1, 0)
    } else {
        (seconds as i64, nanos)
    };
    DateTime::from_timestamp(seconds.checked_add(APPLE_REFERENCE_EPOCH)?, nanos)
}

/// Convert a [`DateTime`] to seconds since the reference date
pub fn datetime_to_reference(timestamp: &DateTime<Utc>) -> f64 {
    (timestamp.timestamp() - APPLE_REFERENCE_EPOCH) as f64
        + f64::from(timestamp.timestamp_subsec_nanos()) / NANOS_PER_SECOND
}

/// Convert a [`SystemTime`], such as a `<date>` in a property list, to seconds since the reference date
pub fn system_time_to_reference(time: SystemTime) -> f64 {
    datetime_to_reference(&DateTime::<Utc>::from(time))
}
