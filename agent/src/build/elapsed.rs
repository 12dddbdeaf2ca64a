//! Human-readable build durations.

use std::fmt;
use std::time::Duration;

/// Wall-clock build time split into whole hours, minutes, and seconds.
///
/// Sub-second precision is dropped; hours are not wrapped at a day.
///
/// # Examples
///
/// ```
/// use relbuild_agent::build::BuildDuration;
/// use std::time::Duration;
///
/// let elapsed = BuildDuration::from(Duration::from_secs(3_725));
/// assert_eq!(elapsed.to_string(), "1H:2M:5S");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildDuration {
    /// Whole hours.
    pub hours: u64,
    /// Minutes past the hour.
    pub minutes: u64,
    /// Seconds past the minute.
    pub seconds: u64,
}

impl From<Duration> for BuildDuration {
    fn from(duration: Duration) -> Self {
        let total = duration.as_secs();
        Self {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }
}

impl fmt::Display for BuildDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}H:{}M:{}S", self.hours, self.minutes, self.seconds)
    }
}
