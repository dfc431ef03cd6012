use chrono::{DateTime, FixedOffset, Utc};

/// Common date/time formats used throughout the application
pub mod formats {
    /// Human-readable format for log entries: "2024-01-20 15:30:00"
    pub const DISPLAY_FULL: &str = "%Y-%m-%d %H:%M:%S";
}

/// Offset of the civil time used for run timestamps (UTC+8, Beijing time)
const RUN_OFFSET_SECS: i32 = 8 * 3600;

/// The fixed UTC+8 offset all run timestamps are expressed in
pub fn run_offset() -> FixedOffset {
    FixedOffset::east_opt(RUN_OFFSET_SECS).expect("UTC+8 should always be a valid offset")
}

/// Source of the current time for a run.
///
/// The orchestrator never reads the wall clock directly so that runs can be
/// replayed with a pinned timestamp in tests.
pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock converted to UTC+8
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&run_offset())
    }
}

/// Clock that always reports the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl FixedClock {
    /// Pin the clock to a Unix timestamp, expressed in UTC+8
    pub fn at_unix(timestamp: i64) -> Self {
        Self(from_unix_timestamp(timestamp).with_timezone(&run_offset()))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// Format a datetime for human-readable display
pub fn format_for_display(datetime: &DateTime<FixedOffset>) -> String {
    datetime.format(formats::DISPLAY_FULL).to_string()
}

/// Convert Unix timestamp to DateTime
pub fn from_unix_timestamp(timestamp: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp, 0).unwrap_or_else(|| {
        // If the provided timestamp is invalid, return Unix epoch
        DateTime::from_timestamp(0, 0).expect("Unix epoch timestamp should always be valid")
    })
}
