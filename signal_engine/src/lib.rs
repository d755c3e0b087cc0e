//! SPDX-License-Identifier: GPL-3.0-or-later
//!
//! Per-frame joint-angle safety signal engine: zone classification, exercise phase
//! detection, correction guidance and de-duplicated signal emission.

pub mod config;
pub mod frame;
pub mod logic;
pub mod thresholds;
pub mod wire;


pub use config::{ConfigError, EngineConfig, ThresholdSource};
pub use frame::FrameInput;
pub use logic::engine::SignalEngine;
pub use logic::signal::SignalRecord;
