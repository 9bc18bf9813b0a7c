/// US Mountain Time backed by the IANA `America/Denver` zone
///
/// The zone data ships inside the binary so the rules do not depend on the
/// host's zoneinfo.
use crate::error::{OxbowError, OxbowResult};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Utc};
use jiff::{civil, tz::TimeZone, Timestamp, Zoned};
use lazy_static::lazy_static;

const ZONE_NAME: &str = "America/Denver";
const MST_OFFSET_SECS: i32 = -7 * 3600;

lazy_static! {
    static ref MOUNTAIN: TimeZone = TimeZone::get(ZONE_NAME).unwrap_or_else(|e| {
        tracing::error!(zone = ZONE_NAME, error = %e, "Time zone lookup failed, pinning to MST");
        TimeZone::fixed(jiff::tz::offset(-7))
    });
}

/// Offset in effect at `at`
pub fn utc_offset(at: DateTime<Utc>) -> FixedOffset {
    let secs = Timestamp::from_second(at.timestamp())
        .map(|ts| MOUNTAIN.to_offset(ts).seconds())
        .unwrap_or(MST_OFFSET_SECS);
    FixedOffset::east_opt(secs).unwrap_or_else(|| Utc.fix())
}

/// Whether daylight saving time is in effect at `at`
pub fn is_dst(at: DateTime<Utc>) -> bool {
    utc_offset(at).local_minus_utc() != MST_OFFSET_SECS
}

/// `at` expressed in Mountain Time
pub fn to_mountain(at: DateTime<Utc>) -> DateTime<FixedOffset> {
    at.with_timezone(&utc_offset(at))
}

fn start_of_day(date: civil::Date) -> Result<DateTime<Utc>, jiff::Error> {
    let zoned: Zoned = date.to_zoned(MOUNTAIN.clone())?.start_of_day()?;
    let ts = zoned.timestamp();
    Ok(DateTime::from_timestamp(ts.as_second(), 0).unwrap_or(DateTime::<Utc>::MIN_UTC))
}

/// UTC bounds `[start, end)` of a Mountain-Time calendar day
pub fn day_bounds_utc(date: NaiveDate) -> OxbowResult<(DateTime<Utc>, DateTime<Utc>)> {
    let bounds = || -> Result<_, jiff::Error> {
        let day = civil::Date::new(date.year() as i16, date.month() as i8, date.day() as i8)?;
        Ok((start_of_day(day)?, start_of_day(day.tomorrow()?)?))
    };
    bounds().map_err(|e| OxbowError::Internal(format!("Mountain Time bounds for {}: {}", date, e)))
}
