//! Clock helpers shared by the modules.

use chrono::{DateTime, Datelike, Utc};

/// Current time truncated to the microsecond precision the store keeps, so a
/// freshly built record compares equal to the one read back later.
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now)
}

/// Current calendar year (UTC).
pub fn current_year() -> i32 {
    Utc::now().year()
}
