//! De-duplication and per-zone cooldown gating of emitted signals
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::logic::classifier::Violation;
use crate::logic::phase::ExercisePhase;
use crate::logic::zones::Zone;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.8 {
            ConfidenceBand::High
        } else if confidence >= 0.6 {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceBand::High => "high_conf",
            ConfidenceBand::Medium => "med_conf",
            ConfidenceBand::Low => "low_conf",
        }
    }
}

/// Deterministic summary of a frame's classification, e.g.
/// `warning_left_shoulder_flexion_high_conf_active` or `safe_clean_med_conf_rest`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupCode(String);

impl DedupCode {
    pub fn compute(
        zone: Zone,
        primary: Option<&Violation>,
        confidence: f64,
        phase: ExercisePhase,
    ) -> Self {
        let subject = match primary {
            Some(v) => format!("{}_{}", v.joint_label(), v.movement),
            None => "clean".to_string(),
        };
        DedupCode(format!(
            "{}_{}_{}_{}",
            zone.as_str(),
            subject,
            ConfidenceBand::from_confidence(confidence).as_str(),
            phase.as_str()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DedupCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Minimum time in seconds between two emitted signals of the same zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CooldownWindows {
    pub safe: f64,
    pub warning: f64,
    pub danger: f64,
    pub unknown: f64,
}

impl Default for CooldownWindows {
    fn default() -> Self {
        Self {
            safe: 1.0,
            warning: 0.5,
            danger: 0.0,
            unknown: 2.0,
        }
    }
}

impl CooldownWindows {
    pub fn get(&self, zone: Zone) -> f64 {
        match zone {
            Zone::Safe => self.safe,
            Zone::Warning => self.warning,
            Zone::Danger => self.danger,
            Zone::Unknown => self.unknown,
        }
    }

    pub fn set(&mut self, zone: Zone, seconds: f64) {
        match zone {
            Zone::Safe => self.safe = seconds,
            Zone::Warning => self.warning = seconds,
            Zone::Danger => self.danger = seconds,
            Zone::Unknown => self.unknown = seconds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitReason {
    /// DANGER bypasses both de-duplication and cooldown.
    Danger,
    Passed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    Duplicate,
    Cooldown,
}

impl SuppressReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuppressReason::Duplicate => "duplicate_signal",
            SuppressReason::Cooldown => "cooldown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Emit(EmitReason),
    Suppress(SuppressReason),
}

impl GateDecision {
    pub fn is_emit(&self) -> bool {
        matches!(self, GateDecision::Emit(_))
    }
}

/// Mutable gate memory. Lives in the engine state, reset with it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GateState {
    pub(crate) last_code: Option<DedupCode>,
    pub(crate) last_emit: Option<f64>,
    /// Indexed by `Zone::index`; `None` until the zone has emitted once.
    pub(crate) cooldown_until: [Option<f64>; 4],
}

impl GateState {
    pub fn last_code(&self) -> Option<&DedupCode> {
        self.last_code.as_ref()
    }

    pub fn last_emit(&self) -> Option<f64> {
        self.last_emit
    }

    pub fn cooldown_until(&self, zone: Zone) -> Option<f64> {
        self.cooldown_until[zone.index()]
    }
}

/// Emission policy for one engine instance.
#[derive(Debug, Clone)]
pub struct EmissionGate {
    deduplication_enabled: bool,
    cooldown_enabled: bool,
    windows: CooldownWindows,
}

impl EmissionGate {
    pub fn new(deduplication_enabled: bool, cooldown_enabled: bool, windows: CooldownWindows) -> Self {
        Self {
            deduplication_enabled,
            cooldown_enabled,
            windows,
        }
    }

    /// Decide whether a frame's signal goes out. Emission records the code and
    /// timestamp in `state`; suppression leaves them untouched.
    pub fn evaluate(
        &self,
        state: &mut GateState,
        zone: Zone,
        code: &DedupCode,
        timestamp: f64,
    ) -> GateDecision {
        let decision = self.decide(state, zone, code, timestamp);
        if decision.is_emit() {
            state.last_code = Some(code.clone());
            state.last_emit = Some(timestamp);
        }
        decision
    }

    fn decide(&self, state: &mut GateState, zone: Zone, code: &DedupCode, timestamp: f64) -> GateDecision {
        if zone == Zone::Danger {
            return GateDecision::Emit(EmitReason::Danger);
        }

        if self.deduplication_enabled && state.last_code.as_ref() == Some(code) {
            return GateDecision::Suppress(SuppressReason::Duplicate);
        }

        if self.cooldown_enabled {
            let slot = &mut state.cooldown_until[zone.index()];
            if let Some(until) = *slot {
                if timestamp < until {
                    return GateDecision::Suppress(SuppressReason::Cooldown);
                }
            }
            *slot = Some(timestamp + self.windows.get(zone));
        }

        GateDecision::Emit(EmitReason::Passed)
    }
}
