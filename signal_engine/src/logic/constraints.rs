//! Phase-aware medical constraint validation (safe / caution / stop)
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::EngineConfig;
use crate::logic::phase::ExercisePhase;
use crate::thresholds::{AngleKey, AngleName, Joint, Movement, PhaseThreshold, PhaseThresholdTable};
use serde::{Deserialize, Serialize};
use indexmap::IndexMap;

const FALLBACK_RECOMMENDATION: &str = "Consult with physiotherapist.";
const MAX_SEVERITY_SCORE: u8 = 10;

#[derive(Hash, Eq, PartialEq, Clone, Debug, Copy, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MedicalZone {
    Safe,
    Caution,
    Stop,
}

impl MedicalZone {
    fn of(angle: f64, threshold: &PhaseThreshold) -> Self {
        if angle >= threshold.stop_max {
            MedicalZone::Stop
        } else if angle >= threshold.caution_max {
            MedicalZone::Caution
        } else {
            MedicalZone::Safe
        }
    }
}

/// One angle in the STOP zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalViolation {
    /// Side-qualified joint, e.g. `left_elbow`.
    pub joint: String,
    pub movement: Movement,
    pub phase: ExercisePhase,
    pub current_angle: f64,
    pub threshold: PhaseThreshold,
    /// 0-10.
    pub severity_score: u8,
    pub recommendation: String,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalValidation {
    /// False as soon as one angle is in the STOP zone.
    pub is_valid: bool,
    pub overall_zone: MedicalZone,
    pub violations: Vec<MedicalViolation>,
    /// One line per CAUTION angle.
    pub warnings: Vec<String>,
    pub timestamp: f64,
    pub frame: u64,
}

/// Scaled so that `caution_max` scores 5 and `stop_max` and beyond score 10.
/// Degenerate thresholds (`stop_max == caution_max`) score the maximum.
pub fn severity_score(angle: f64, threshold: &PhaseThreshold) -> u8 {
    let span = threshold.stop_max - threshold.caution_max;
    if span <= 0.0 || !angle.is_finite() {
        return MAX_SEVERITY_SCORE;
    }
    let raw = ((angle - threshold.caution_max) / span * 5.0 + 5.0).trunc();
    raw.clamp(0.0, MAX_SEVERITY_SCORE as f64) as u8
}

/// Recommendation text for a joint/movement in the given zone.
pub fn recommendation(joint: Joint, movement: Movement, zone: MedicalZone) -> &'static str {
    let pair = match (joint, movement) {
        (Joint::Shoulder, Movement::Flexion) => (
            "Stop immediately. Return arm to neutral position.",
            "Reduce shoulder flexion. Stay below 90 during active phase.",
        ),
        (Joint::Shoulder, Movement::Abduction) => (
            "Stop immediately. Lower arm to side.",
            "Limit abduction to below 120.",
        ),
        (Joint::Elbow, Movement::Flexion) => (
            "Stop immediately. Straighten elbow.",
            "Avoid full flexion beyond 120.",
        ),
        (Joint::Elbow, Movement::Extension) => (
            "Stop immediately. Allow slight bend in elbow.",
            "Avoid hyperextension beyond 5.",
        ),
        (Joint::Wrist, Movement::Flexion) => (
            "Stop immediately. Return wrist to neutral.",
            "Limit flexion to below 65.",
        ),
        (Joint::Wrist, Movement::Extension) => (
            "Stop immediately. Return wrist to neutral.",
            "Limit extension to below 60.",
        ),
        _ => return FALLBACK_RECOMMENDATION,
    };
    match zone {
        MedicalZone::Stop => pair.0,
        MedicalZone::Caution => pair.1,
        MedicalZone::Safe => FALLBACK_RECOMMENDATION,
    }
}

/// Validates frames against the phase-aware threshold table.
#[derive(Debug, Clone)]
pub struct MedicalConstraints {
    table: PhaseThresholdTable,
}

impl Default for MedicalConstraints {
    fn default() -> Self {
        Self::new(EngineConfig::default().phase_thresholds)
    }
}

impl MedicalConstraints {
    pub fn new(table: PhaseThresholdTable) -> Self {
        Self { table }
    }

    /// Threshold for the phase, falling back to the ACTIVE row.
    pub fn get_threshold(
        &self,
        joint: Joint,
        movement: Movement,
        phase: ExercisePhase,
    ) -> Option<&PhaseThreshold> {
        self.table.get(joint, movement, phase)
    }

    pub fn joints(&self) -> Vec<Joint> {
        Joint::ALL
            .into_iter()
            .filter(|j| !self.movements(*j).is_empty())
            .collect()
    }

    pub fn movements(&self, joint: Joint) -> Vec<Movement> {
        Movement::ALL
            .into_iter()
            .filter(|m| self.table.supports(joint, *m))
            .collect()
    }

    pub fn validate(
        &self,
        angles: &IndexMap<String, f64>,
        phase: ExercisePhase,
        timestamp: f64,
        frame: u64,
    ) -> MedicalValidation {
        let mut overall_zone = MedicalZone::Safe;
        let mut violations = Vec::new();
        let mut warnings = Vec::new();

        for (name, &angle) in angles {
            let AngleName::Key(key) = AngleKey::parse(name) else {
                continue;
            };
            if !angle.is_finite() {
                continue;
            }
            let Some(threshold) = self.get_threshold(key.joint, key.movement, phase) else {
                continue;
            };

            let joint = format!("{}_{}", key.side.as_str(), key.joint);
            match MedicalZone::of(angle, threshold) {
                MedicalZone::Stop => {
                    overall_zone = MedicalZone::Stop;
                    violations.push(MedicalViolation {
                        joint,
                        movement: key.movement,
                        phase,
                        current_angle: angle,
                        threshold: *threshold,
                        severity_score: severity_score(angle, threshold),
                        recommendation: recommendation(key.joint, key.movement, MedicalZone::Stop)
                            .to_string(),
                        timestamp,
                    });
                }
                MedicalZone::Caution => {
                    overall_zone = overall_zone.max(MedicalZone::Caution);
                    warnings.push(format!(
                        "{} {} at {:.1}° - caution zone",
                        joint, key.movement, angle
                    ));
                }
                MedicalZone::Safe => {}
            }
        }

        MedicalValidation {
            is_valid: overall_zone != MedicalZone::Stop,
            overall_zone,
            violations,
            warnings,
            timestamp,
            frame,
        }
    }
}
