//! Zone classification of single angles and whole frames
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::ThresholdSource;
use crate::frame::FrameInput;
use crate::logic::phase::ExercisePhase;
use crate::logic::zones::Zone;
use crate::thresholds::{
    AngleKey, AngleName, Joint, Movement, PhaseThresholdTable, Side, Threshold, ThresholdTable,
};
use log::debug;
use serde::{Deserialize, Serialize};

/// One angle past its warning or danger boundary. Built by the classifier and never
/// changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub side: Option<Side>,
    pub joint: Joint,
    pub movement: Movement,
    pub current_angle: f64,
    /// warning_max for WARNING, danger_max for DANGER.
    pub limit: f64,
    pub zone: Zone,
}

impl Violation {
    /// `left_shoulder`, or just `shoulder` when no side is known.
    pub fn joint_label(&self) -> String {
        match self.side {
            Some(side) => format!("{}_{}", side.as_str(), self.joint),
            None => self.joint.as_str().to_string(),
        }
    }

    /// Human label, e.g. `left_shoulder flexion`.
    pub fn label(&self) -> String {
        format!("{} {}", self.joint_label(), self.movement)
    }
}

/// Result of classifying every angle of one frame. Created once per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SafetyAssessment {
    /// Most severe zone among the classified angles.
    pub zone: Zone,
    /// First-encountered first; the head is the primary violation.
    pub violations: Vec<Violation>,
    pub confidence: f64,
    pub timestamp: f64,
    pub frame: u64,
    /// Angles that parsed but had no configured threshold.
    pub unknown_angles: usize,
}

impl SafetyAssessment {
    pub fn primary(&self) -> Option<&Violation> {
        self.violations.first()
    }

    pub fn is_safe(&self) -> bool {
        self.zone == Zone::Safe
    }

    /// Action hints for consumers that do not track the signal stream.
    pub fn control_signals(&self, min_confidence: f64) -> ControlSignals {
        let (action, urgency, mut message_codes) = match self.zone {
            Zone::Danger => (
                ActionType::StopImmediately,
                3,
                vec!["DANGER_STOP", "EMERGENCY_HALT"],
            ),
            Zone::Warning => (
                ActionType::CorrectPosition,
                2,
                vec!["WARNING_CORRECT", "POSITION_ADJUST"],
            ),
            Zone::Safe => (ActionType::Continue, 0, vec!["SAFE_CONTINUE"]),
            Zone::Unknown => (ActionType::Reassess, 1, vec!["TRACKING_UNKNOWN"]),
        };

        let low_confidence = self.confidence < min_confidence;
        if low_confidence {
            message_codes.push("UNCERTAIN_ASSESSMENT");
        }

        ControlSignals {
            action,
            urgency,
            message_codes,
            low_confidence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    StopImmediately,
    CorrectPosition,
    Continue,
    Reassess,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlSignals {
    pub action: ActionType,
    pub urgency: u8,
    pub message_codes: Vec<&'static str>,
    pub low_confidence: bool,
}

/// Classification of a single named angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AngleZone {
    /// Name did not have three tokens; ignored entirely.
    Skipped,
    Unknown,
    Classified {
        key: AngleKey,
        zone: Zone,
        threshold: Threshold,
    },
}

/// Maps angles to zones using either the flat table or the phase-aware table.
#[derive(Debug, Clone)]
pub struct ZoneClassifier {
    source: ThresholdSource,
    flat: ThresholdTable,
    phased: PhaseThresholdTable,
}

impl ZoneClassifier {
    pub fn new(source: ThresholdSource, flat: ThresholdTable, phased: PhaseThresholdTable) -> Self {
        Self {
            source,
            flat,
            phased,
        }
    }

    fn threshold_for(&self, key: &AngleKey, phase: ExercisePhase) -> Option<Threshold> {
        match self.source {
            ThresholdSource::Flat => self.flat.get(key.joint, key.movement).copied(),
            ThresholdSource::Phased => self
                .phased
                .get(key.joint, key.movement, phase)
                .map(|t| t.as_threshold()),
        }
    }

    /// Zone of one angle. `phase` only matters for the phase-aware table.
    pub fn classify_angle(&self, name: &str, degrees: f64, phase: ExercisePhase) -> AngleZone {
        let key = match AngleKey::parse(name) {
            AngleName::Malformed => return AngleZone::Skipped,
            AngleName::Unsupported => return AngleZone::Unknown,
            AngleName::Key(key) => key,
        };
        if !degrees.is_finite() {
            return AngleZone::Unknown;
        }
        match self.threshold_for(&key, phase) {
            Some(threshold) => AngleZone::Classified {
                key,
                zone: threshold.zone(degrees),
                threshold,
            },
            None => AngleZone::Unknown,
        }
    }

    /// Classify every angle of a frame and fold them into one assessment.
    pub fn assess(&self, frame: &FrameInput, phase: ExercisePhase) -> SafetyAssessment {
        if !frame.confidence.is_finite() {
            debug!("frame {}: non-finite confidence, zone unknown", frame.frame);
            return SafetyAssessment {
                zone: Zone::Unknown,
                violations: Vec::new(),
                confidence: 0.0,
                timestamp: frame.timestamp,
                frame: frame.frame,
                unknown_angles: frame.angles.len(),
            };
        }

        let mut zone = Zone::Safe;
        let mut violations = Vec::new();
        let mut unknown_angles = 0;

        for (name, &degrees) in &frame.angles {
            match self.classify_angle(name, degrees, phase) {
                AngleZone::Skipped => {
                    debug!("frame {}: skipping malformed angle name {:?}", frame.frame, name);
                }
                AngleZone::Unknown => {
                    debug!("frame {}: no threshold for {:?}", frame.frame, name);
                    unknown_angles += 1;
                }
                AngleZone::Classified {
                    key,
                    zone: angle_zone,
                    threshold,
                } => {
                    if angle_zone.outranks(zone) {
                        zone = angle_zone;
                    }
                    if let Some(limit) = threshold.limit_for(angle_zone) {
                        violations.push(Violation {
                            side: Some(key.side),
                            joint: key.joint,
                            movement: key.movement,
                            current_angle: degrees,
                            limit,
                            zone: angle_zone,
                        });
                    }
                }
            }
        }

        SafetyAssessment {
            zone,
            violations,
            confidence: frame.confidence,
            timestamp: frame.timestamp,
            frame: frame.frame,
            unknown_angles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::thresholds::Threshold;

    fn flat_classifier(warning: f64, danger: f64) -> ZoneClassifier {
        let mut flat = ThresholdTable::empty();
        flat.insert(
            Joint::Shoulder,
            Movement::Flexion,
            Threshold::new("shoulder_flexion", warning - 10.0, warning, danger).unwrap(),
        );
        ZoneClassifier::new(ThresholdSource::Flat, flat, PhaseThresholdTable::empty())
    }

    #[test]
    fn scenario_angles_against_100_110() {
        let classifier = flat_classifier(100.0, 110.0);
        let frame = FrameInput::new(1, 0.0, 0.95).with_angle("left_shoulder_flexion", 90.0);
        assert_eq!(classifier.assess(&frame, ExercisePhase::Rest).zone, Zone::Safe);

        let frame = FrameInput::new(2, 0.1, 0.95).with_angle("left_shoulder_flexion", 105.0);
        let assessment = classifier.assess(&frame, ExercisePhase::Rest);
        assert_eq!(assessment.zone, Zone::Warning);
        assert_eq!(assessment.violations.len(), 1);
        assert_eq!(assessment.violations[0].limit, 100.0);
        assert_eq!(assessment.violations[0].label(), "left_shoulder flexion");
    }

    #[test]
    fn danger_records_danger_limit_and_wins() {
        let classifier = flat_classifier(100.0, 130.0);
        let frame = FrameInput::new(1, 0.0, 0.9)
            .with_angle("right_shoulder_flexion", 105.0)
            .with_angle("left_shoulder_flexion", 131.0);
        let assessment = classifier.assess(&frame, ExercisePhase::Active);
        assert_eq!(assessment.zone, Zone::Danger);
        // Insertion order, not name order: right was supplied first.
        let primary = assessment.primary().unwrap();
        assert_eq!(primary.zone, Zone::Warning);
        assert_eq!(primary.side, Some(Side::Right));
        assert_eq!(assessment.violations[1].limit, 130.0);
        assert_eq!(assessment.violations[1].side, Some(Side::Left));
    }

    #[test]
    fn unknown_and_malformed_angles_never_elevate() {
        let classifier = flat_classifier(100.0, 110.0);
        let frame = FrameInput::new(1, 0.0, 0.9)
            .with_angle("left_elbow_flexion", 500.0)
            .with_angle("left_knee_flexion", 500.0)
            .with_angle("flexion", 500.0)
            .with_angle("left_shoulder_flexion", f64::NAN);
        let assessment = classifier.assess(&frame, ExercisePhase::Active);
        assert_eq!(assessment.zone, Zone::Safe);
        assert!(assessment.violations.is_empty());
        assert_eq!(assessment.unknown_angles, 3);
    }

    #[test]
    fn non_finite_confidence_degrades_to_unknown() {
        let classifier = flat_classifier(100.0, 110.0);
        let frame = FrameInput::new(7, 1.0, f64::NAN).with_angle("left_shoulder_flexion", 200.0);
        let assessment = classifier.assess(&frame, ExercisePhase::Active);
        assert_eq!(assessment.zone, Zone::Unknown);
        assert!(assessment.violations.is_empty());
        assert_eq!(assessment.confidence, 0.0);
    }

    #[test]
    fn phased_source_uses_phase_rows() {
        let config = EngineConfig::default();
        let classifier = ZoneClassifier::new(
            ThresholdSource::Phased,
            config.thresholds.clone(),
            config.phase_thresholds.clone(),
        );
        // shoulder flexion: rest caution 60, active caution 110.
        assert_eq!(
            classifier.classify_angle("left_shoulder_flexion", 70.0, ExercisePhase::Rest),
            AngleZone::Classified {
                key: match AngleKey::parse("left_shoulder_flexion") {
                    AngleName::Key(k) => k,
                    _ => unreachable!(),
                },
                zone: Zone::Warning,
                threshold: Threshold {
                    safe_max: 30.0,
                    warning_max: 60.0,
                    danger_max: 120.0,
                },
            }
        );
        assert!(matches!(
            classifier.classify_angle("left_shoulder_flexion", 70.0, ExercisePhase::Active),
            AngleZone::Classified { zone: Zone::Safe, .. }
        ));
        assert!(matches!(
            classifier.classify_angle("left_shoulder_flexion", 70.0, ExercisePhase::Unknown),
            AngleZone::Classified { zone: Zone::Safe, .. }
        ));
    }

    #[test]
    fn control_signals_follow_zone_and_confidence() {
        let classifier = flat_classifier(100.0, 110.0);
        let frame = FrameInput::new(1, 0.0, 0.4).with_angle("left_shoulder_flexion", 120.0);
        let signals = classifier
            .assess(&frame, ExercisePhase::Active)
            .control_signals(0.6);
        assert_eq!(signals.action, ActionType::StopImmediately);
        assert_eq!(signals.urgency, 3);
        assert!(signals.low_confidence);
        assert_eq!(
            signals.message_codes,
            vec!["DANGER_STOP", "EMERGENCY_HALT", "UNCERTAIN_ASSESSMENT"]
        );
    }
}
