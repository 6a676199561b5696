use std::time::{SystemTime, UNIX_EPOCH};

use crate::{MetricKey, Sample, Time};

/// A metric name with one or more samples, kept in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub metric: MetricKey,
    pub samples: Vec<Sample>,
}
impl Point {
    pub fn one(metric: impl Into<MetricKey>, value: f64, time: Time) -> Self {
        Self {
            metric: metric.into(),
            samples: vec![Sample { time, value }],
        }
    }
    /// One sample stamped with the current Unix time in seconds.
    pub fn now(metric: impl Into<MetricKey>, value: f64) -> Self {
        let time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::one(metric, value, time)
    }

    pub fn add(mut self, value: f64, time: Time) -> Self {
        self.samples.push(Sample { time, value });
        self
    }
    /// Moves the samples of `other` to the end of `self`. The metric name of
    /// `other` is not checked.
    pub fn append(&mut self, mut other: Point) {
        self.samples.append(&mut other.samples);
    }
}
