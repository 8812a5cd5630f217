use std::fmt;

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("time range end {end} must be after start {start}")]
pub struct InvalidTimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Half-open wall-clock interval `[start, end)` within a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, InvalidTimeRange> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    /// Ranges arriving through serde skip `new`, so callers re-check here.
    pub fn validate(&self) -> Result<(), InvalidTimeRange> {
        if self.end <= self.start {
            return Err(InvalidTimeRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &TimeRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn rejects_empty_and_inverted_ranges() {
        assert!(TimeRange::new(t(9, 0), t(9, 0)).is_err());
        assert!(TimeRange::new(t(10, 0), t(9, 0)).is_err());
        assert!(TimeRange::new(t(9, 0), t(9, 30)).is_ok());
    }

    #[test]
    fn adjacent_ranges_do_not_overlap() {
        let morning = TimeRange::new(t(9, 0), t(12, 0)).unwrap();
        let noon = TimeRange::new(t(12, 0), t(13, 0)).unwrap();
        let late_morning = TimeRange::new(t(11, 30), t(12, 30)).unwrap();
        assert!(!morning.overlaps(&noon));
        assert!(morning.overlaps(&late_morning));
        assert!(morning.contains(&TimeRange::new(t(9, 0), t(9, 30)).unwrap()));
    }

    #[test]
    fn formats_as_hour_minute_pair() {
        let range = TimeRange::new(t(9, 5), t(9, 35)).unwrap();
        assert_eq!(range.to_string(), "09:05-09:35");
        assert_eq!(range.duration_minutes(), 30);
    }
}
