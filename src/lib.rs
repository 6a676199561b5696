pub mod codec;
pub mod config;
pub mod error;
pub mod exporter;
pub mod glue;
pub mod point;
pub mod task;
pub mod throttle;

pub use point::Point;

pub type MetricKey = String;
pub type Time = u64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: Time,
    pub value: f64,
}
