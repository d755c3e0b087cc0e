//! Per-frame input handed to the engine by the pose pipeline
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};
use indexmap::IndexMap;

/// One frame of joint-angle measurements.
///
/// `angles` maps `{side}_{joint}_{movement}` names to degrees. Iteration keeps the
/// order the caller inserted (or the JSON object listed) the angles in, which also
/// decides which violation is the primary one.
/// `timestamp` is in seconds, supplied by the caller and non-decreasing within a
/// session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameInput {
    pub frame: u64,
    pub timestamp: f64,
    pub confidence: f64,
    #[serde(default)]
    pub angles: IndexMap<String, f64>,
}

impl FrameInput {
    pub fn new(frame: u64, timestamp: f64, confidence: f64) -> Self {
        Self {
            frame,
            timestamp,
            confidence,
            angles: IndexMap::new(),
        }
    }

    /// Builder-style helper for adding one measurement.
    pub fn with_angle(mut self, name: &str, degrees: f64) -> Self {
        self.angles.insert(name.to_string(), degrees);
        self
    }
}
