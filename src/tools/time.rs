//! Timezone lookup and conversion for the booking persona.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Error, Result};

/// Input format accepted by [`convert_time`]
pub const TIME_INPUT_FORMAT: &str = "%Y-%m-%d %H:%M";

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M %Z";

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim().parse::<Tz>().map_err(|_| Error::InvalidTimezone {
        zone: name.to_string(),
    })
}

/// Current wall-clock time in `zone`
pub fn current_time(zone: &str) -> Result<String> {
    current_time_at(zone, Utc::now())
}

pub fn current_time_at(zone: &str, now: DateTime<Utc>) -> Result<String> {
    let tz = parse_timezone(zone)?;
    Ok(now.with_timezone(&tz).format(DISPLAY_FORMAT).to_string())
}

/// Convert a local `YYYY-MM-DD HH:MM` time from one zone to another
pub fn convert_time(time: &str, from_zone: &str, to_zone: &str) -> Result<String> {
    let from = parse_timezone(from_zone)?;
    let to = parse_timezone(to_zone)?;

    let naive = NaiveDateTime::parse_from_str(time.trim(), TIME_INPUT_FORMAT).map_err(|e| {
        Error::InvalidTime {
            value: time.to_string(),
            message: format!("expected {}: {}", TIME_INPUT_FORMAT, e),
        }
    })?;

    let local = from
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| Error::InvalidTime {
            value: time.to_string(),
            message: format!("ambiguous or skipped local time in {}", from.name()),
        })?;

    Ok(local.with_timezone(&to).format(DISPLAY_FORMAT).to_string())
}
