pub mod classification;
pub mod config;
pub mod frame;

use std::time::Duration;

/// Period of the sampling timer. Also bounds how fast songs can change.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(2);
