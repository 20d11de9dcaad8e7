//! Wall clock in the unit every persisted timestamp uses.

use chrono::{Duration, Utc};
use shroud_domain::Millis;

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> Millis {
    Utc::now().timestamp_millis()
}

/// `from` plus whole days, in milliseconds. Saturates instead of overflowing.
#[must_use]
pub fn add_days(from: Millis, days: i64) -> Millis {
    Duration::try_days(days).map_or(Millis::MAX, |d| from.saturating_add(d.num_milliseconds()))
}
