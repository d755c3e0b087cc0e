//! Mutable per-session state owned by one engine instance
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::logic::gate::GateState;
use crate::logic::phase::PhaseDetector;
use crate::logic::zones::Zone;
use serde::{Deserialize, Serialize};

/// Running counters. Only ever increase until the engine is reset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalStatistics {
    pub total_frames: u64,
    /// Emitted records per zone.
    pub safe: u64,
    pub warning: u64,
    pub danger: u64,
    pub unknown: u64,
    pub suppressed: u64,
    pub phase_changes: u64,
    #[serde(skip)]
    pub last_emit_timestamp: Option<f64>,
}

impl SignalStatistics {
    pub(crate) fn record_frame(&mut self) {
        self.total_frames += 1;
    }

    pub(crate) fn record_emitted(&mut self, zone: Zone, timestamp: f64) {
        match zone {
            Zone::Safe => self.safe += 1,
            Zone::Warning => self.warning += 1,
            Zone::Danger => self.danger += 1,
            Zone::Unknown => self.unknown += 1,
        }
        self.last_emit_timestamp = Some(timestamp);
    }

    pub(crate) fn record_suppressed(&mut self) {
        self.suppressed += 1;
    }

    pub(crate) fn record_phase_change(&mut self) {
        self.phase_changes += 1;
    }

    pub fn emitted(&self, zone: Zone) -> u64 {
        match zone {
            Zone::Safe => self.safe,
            Zone::Warning => self.warning,
            Zone::Danger => self.danger,
            Zone::Unknown => self.unknown,
        }
    }

    pub fn total_emitted(&self) -> u64 {
        Zone::ALL.iter().map(|z| self.emitted(*z)).sum()
    }
}

/// Everything that changes from frame to frame
pub struct EngineState {
    /// Current phase, phase start and the movement latch
    pub(crate) phase: PhaseDetector,
    /// Last emitted code, last emit time and per-zone cooldown expiries
    pub(crate) gate: GateState,
    pub(crate) stats: SignalStatistics,
    /// Timestamp of the previous frame, used to flag regressions
    pub(crate) last_timestamp: Option<f64>,
}

impl EngineState {
    /// Initial state of a fresh session.
    pub(crate) fn new() -> Self {
        Self {
            phase: PhaseDetector::new(),
            gate: GateState::default(),
            stats: SignalStatistics::default(),
            last_timestamp: None,
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }
}
