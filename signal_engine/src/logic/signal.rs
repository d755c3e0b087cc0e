//! The engine's output record
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::logic::advisor::{self, CorrectionGuidance};
use crate::logic::classifier::SafetyAssessment;
use crate::logic::gate::{DedupCode, GateDecision};
use crate::logic::phase::ExercisePhase;
use crate::logic::zones::Zone;
use crate::wire::{round_3, round_4};
use serde::{Deserialize, Serialize};

/// One record per processed frame, emitted or suppressed. Never changed once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub frame: u64,
    #[serde(serialize_with = "round_4")]
    pub timestamp: f64,
    pub safety_flag: Zone,
    #[serde(serialize_with = "round_3")]
    pub confidence: f64,
    /// 0-3, derived from `safety_flag`.
    pub severity: u8,
    pub phase: ExercisePhase,
    pub correction: Option<CorrectionGuidance>,
    /// False when the gate suppressed this frame.
    pub is_new: bool,
    pub signal_code: String,
    /// Violations this frame, counted whether or not the frame was suppressed.
    pub active_violations: usize,
    pub primary_violation: Option<String>,
}

impl SignalRecord {
    /// Build the record for a frame. Correction and primary violation only survive on
    /// emitted, non-safe frames.
    pub(crate) fn assemble(
        assessment: &SafetyAssessment,
        phase: ExercisePhase,
        code: DedupCode,
        decision: GateDecision,
    ) -> Self {
        let is_new = decision.is_emit();
        let (correction, primary_violation) = if is_new && !assessment.is_safe() {
            (
                advisor::advise(&assessment.violations),
                assessment.primary().map(|v| v.label()),
            )
        } else {
            (None, None)
        };

        SignalRecord {
            frame: assessment.frame,
            timestamp: assessment.timestamp,
            safety_flag: assessment.zone,
            confidence: assessment.confidence,
            severity: assessment.zone.severity(),
            phase,
            correction,
            is_new,
            signal_code: code.into_string(),
            active_violations: assessment.violations.len(),
            primary_violation,
        }
    }

    pub fn has_correction(&self) -> bool {
        self.correction.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::classifier::Violation;
    use crate::logic::gate::{EmitReason, SuppressReason};
    use crate::thresholds::{Joint, Movement, Side};

    fn warning_assessment() -> SafetyAssessment {
        SafetyAssessment {
            zone: Zone::Warning,
            violations: vec![Violation {
                side: Some(Side::Right),
                joint: Joint::Shoulder,
                movement: Movement::Abduction,
                current_angle: 125.0,
                limit: 120.0,
                zone: Zone::Warning,
            }],
            confidence: 0.7,
            timestamp: 2.5,
            frame: 12,
            unknown_angles: 0,
        }
    }

    #[test]
    fn emitted_record_carries_guidance() {
        let a = warning_assessment();
        let code = DedupCode::compute(a.zone, a.primary(), a.confidence, ExercisePhase::Active);
        let record = SignalRecord::assemble(
            &a,
            ExercisePhase::Active,
            code,
            GateDecision::Emit(EmitReason::Passed),
        );
        assert!(record.is_new);
        assert_eq!(record.severity, 2);
        assert_eq!(record.signal_code, "warning_right_shoulder_abduction_med_conf_active");
        assert_eq!(record.primary_violation.as_deref(), Some("right_shoulder abduction"));
        assert_eq!(record.correction.unwrap().target_angle, 120.0);
    }

    #[test]
    fn suppressed_record_drops_guidance_but_counts_violations() {
        let a = warning_assessment();
        let code = DedupCode::compute(a.zone, a.primary(), a.confidence, ExercisePhase::Active);
        let record = SignalRecord::assemble(
            &a,
            ExercisePhase::Active,
            code,
            GateDecision::Suppress(SuppressReason::Cooldown),
        );
        assert!(!record.is_new);
        assert!(!record.has_correction());
        assert_eq!(record.primary_violation, None);
        assert_eq!(record.active_violations, 1);
    }
}
