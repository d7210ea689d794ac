//! Wall-clock helpers for hosts. The engine itself only ever sees the
//! `now_ms` values it is handed.

use chrono::Utc;

/// Current time as epoch milliseconds
pub fn epoch_millis() -> i64 {
    Utc::now().timestamp_millis()
}
