//! Report stream helpers

mod throttle;

pub use throttle::{Throttle, ThrottleExt};

use std::time::Duration;

/// Delivery rate for report streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportRate {
    /// Every published report
    #[default]
    EveryUpdate,

    /// At most this many reports per second, newest wins.
    /// `Max(0)` is treated as [`ReportRate::EveryUpdate`].
    Max(u32),
}

impl ReportRate {
    pub fn from_hz(hz: Option<u32>) -> Self {
        match hz {
            Some(hz) if hz > 0 => ReportRate::Max(hz),
            _ => ReportRate::EveryUpdate,
        }
    }

    /// Throttle period, if any.
    pub fn period(self) -> Option<Duration> {
        match self {
            ReportRate::EveryUpdate | ReportRate::Max(0) => None,
            ReportRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / hz as f64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_from_rate() {
        assert_eq!(ReportRate::EveryUpdate.period(), None);
        assert_eq!(ReportRate::Max(0).period(), None);
        assert_eq!(ReportRate::Max(4).period(), Some(Duration::from_millis(250)));
        assert_eq!(ReportRate::from_hz(Some(0)), ReportRate::EveryUpdate);
        assert_eq!(ReportRate::from_hz(Some(2)), ReportRate::Max(2));
    }
}
