pub mod risk;

pub use risk::{assess, is_high_priority};
