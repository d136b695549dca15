pub mod anomaly;
pub mod trend;
pub mod whale;

pub use anomaly::{detect, detect_with_signal};
