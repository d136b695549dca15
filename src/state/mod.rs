pub mod monitoring_log;

pub use monitoring_log::{apply_cycle, SharedLog};
