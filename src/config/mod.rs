// src/config/mod.rs
pub mod collector;

pub use collector::{BarInterval, CollectorConfig};
