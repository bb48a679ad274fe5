//! Utility functions and types.
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::TempotronError;

/// A time-value pair to represent the value of a function at a given time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeValuePair<T: PartialOrd> {
    pub time: f64,
    pub value: T,
}

impl<T: PartialOrd> PartialEq for TimeValuePair<T> {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.value == other.value
    }
}

impl<T: PartialOrd> PartialOrd for TimeValuePair<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.value.partial_cmp(&other.value) {
            Some(Ordering::Equal) => self.time.partial_cmp(&other.time),
            other => other,
        }
    }
}

/// A closed time interval [start, end], possibly reduced to a single point.
#[derive(PartialEq, Debug, Clone, Copy, Serialize)]
pub struct TimeInterval {
    start: f64,
    end: f64,
}

impl<'de> Deserialize<'de> for TimeInterval {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct TimeIntervalData {
            start: f64,
            end: f64,
        }

        let data = TimeIntervalData::deserialize(deserializer)?;
        TimeInterval::build(data.start, data.end).map_err(serde::de::Error::custom)
    }
}

impl TimeInterval {
    /// Create a time interval with the specified bounds.
    /// The function returns an error for non-finite bounds or if start > end.
    pub fn build(start: f64, end: f64) -> Result<Self, TempotronError> {
        if !(start.is_finite() && end.is_finite()) {
            return Err(TempotronError::ConfigurationError(
                "Time interval bounds must be finite".to_string(),
            ));
        }
        if start > end {
            return Err(TempotronError::ConfigurationError(format!(
                "Time interval start {} is after its end {}",
                start, end
            )));
        }
        Ok(TimeInterval { start, end })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}
