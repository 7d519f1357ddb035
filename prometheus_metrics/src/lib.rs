pub use crate::metrics::{Metrics, METRICS};

mod metrics;
