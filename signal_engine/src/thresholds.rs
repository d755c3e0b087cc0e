//! Joint/movement tags, angle-name parsing and the dense threshold tables
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::ConfigError;
use crate::logic::phase::ExercisePhase;
use crate::logic::zones::Zone;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Hash, Eq, PartialEq, Clone, Debug, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "left" => Some(Side::Left),
            "right" => Some(Side::Right),
            _ => None,
        }
    }
}

#[derive(Hash, Eq, PartialEq, Clone, Debug, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Joint {
    Shoulder,
    Elbow,
    Wrist,
}

impl Joint {
    pub const ALL: [Joint; 3] = [Joint::Shoulder, Joint::Elbow, Joint::Wrist];

    pub fn as_str(&self) -> &'static str {
        match self {
            Joint::Shoulder => "shoulder",
            Joint::Elbow => "elbow",
            Joint::Wrist => "wrist",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Joint::ALL.into_iter().find(|j| j.as_str() == token)
    }

    fn index(&self) -> usize {
        match self {
            Joint::Shoulder => 0,
            Joint::Elbow => 1,
            Joint::Wrist => 2,
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Hash, Eq, PartialEq, Clone, Debug, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Movement {
    Flexion,
    Extension,
    Hyperextension,
    Abduction,
    Adduction,
    Rotation,
    RadialDeviation,
    UlnarDeviation,
}

impl Movement {
    pub const ALL: [Movement; 8] = [
        Movement::Flexion,
        Movement::Extension,
        Movement::Hyperextension,
        Movement::Abduction,
        Movement::Adduction,
        Movement::Rotation,
        Movement::RadialDeviation,
        Movement::UlnarDeviation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Movement::Flexion => "flexion",
            Movement::Extension => "extension",
            Movement::Hyperextension => "hyperextension",
            Movement::Abduction => "abduction",
            Movement::Adduction => "adduction",
            Movement::Rotation => "rotation",
            Movement::RadialDeviation => "radial_deviation",
            Movement::UlnarDeviation => "ulnar_deviation",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Movement::ALL.into_iter().find(|m| m.as_str() == token)
    }

    fn index(&self) -> usize {
        match self {
            Movement::Flexion => 0,
            Movement::Extension => 1,
            Movement::Hyperextension => 2,
            Movement::Abduction => 3,
            Movement::Adduction => 4,
            Movement::Rotation => 5,
            Movement::RadialDeviation => 6,
            Movement::UlnarDeviation => 7,
        }
    }
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of splitting an angle name of the form `{side}_{joint}_{movement}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleName {
    /// Fewer than three `_`-separated tokens; skipped without a zone.
    Malformed,
    /// Well-formed but names a side, joint or movement we have no tag for.
    Unsupported,
    Key(AngleKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AngleKey {
    pub side: Side,
    pub joint: Joint,
    pub movement: Movement,
}

impl AngleKey {
    /// The movement is everything after the joint token, so two-word movements
    /// such as `radial_deviation` parse.
    pub fn parse(name: &str) -> AngleName {
        let mut parts = name.splitn(3, '_');
        let (side, joint, movement) = match (parts.next(), parts.next(), parts.next()) {
            (Some(s), Some(j), Some(m)) if !s.is_empty() && !j.is_empty() && !m.is_empty() => {
                (s, j, m)
            }
            _ => return AngleName::Malformed,
        };

        match (
            Side::from_token(side),
            Joint::from_token(joint),
            Movement::from_token(movement),
        ) {
            (Some(side), Some(joint), Some(movement)) => AngleName::Key(AngleKey {
                side,
                joint,
                movement,
            }),
            _ => AngleName::Unsupported,
        }
    }
}

/// Boundaries for the flat (phase independent) table.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub safe_max: f64,
    pub warning_max: f64,
    pub danger_max: f64,
}

impl Threshold {
    /// Rejects entries that break `safe_max <= warning_max <= danger_max`.
    pub fn new(
        key: &str,
        safe_max: f64,
        warning_max: f64,
        danger_max: f64,
    ) -> Result<Self, ConfigError> {
        let finite = safe_max.is_finite() && warning_max.is_finite() && danger_max.is_finite();
        if !finite || safe_max > warning_max || warning_max > danger_max {
            return Err(ConfigError::InvalidThreshold {
                key: key.to_string(),
                safe_max,
                warning_max,
                danger_max,
            });
        }
        Ok(Self {
            safe_max,
            warning_max,
            danger_max,
        })
    }

    pub fn zone(&self, angle: f64) -> Zone {
        if angle >= self.danger_max {
            Zone::Danger
        } else if angle >= self.warning_max {
            Zone::Warning
        } else {
            Zone::Safe
        }
    }

    /// The boundary a violation in `zone` has crossed.
    pub fn limit_for(&self, zone: Zone) -> Option<f64> {
        match zone {
            Zone::Warning => Some(self.warning_max),
            Zone::Danger => Some(self.danger_max),
            _ => None,
        }
    }
}

/// Boundaries for one row of the phase-aware table.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseThreshold {
    pub safe_max: f64,
    pub caution_max: f64,
    pub stop_max: f64,
}

impl PhaseThreshold {
    /// Rejects entries that break `safe_max < caution_max < stop_max`.
    pub fn new(
        key: &str,
        safe_max: f64,
        caution_max: f64,
        stop_max: f64,
    ) -> Result<Self, ConfigError> {
        let finite = safe_max.is_finite() && caution_max.is_finite() && stop_max.is_finite();
        if !finite || safe_max >= caution_max || caution_max >= stop_max {
            return Err(ConfigError::InvalidPhaseThreshold {
                key: key.to_string(),
                safe_max,
                caution_max,
                stop_max,
            });
        }
        Ok(Self {
            safe_max,
            caution_max,
            stop_max,
        })
    }

    /// View as a flat threshold: caution acts as warning, stop as danger.
    pub fn as_threshold(&self) -> Threshold {
        Threshold {
            safe_max: self.safe_max,
            warning_max: self.caution_max,
            danger_max: self.stop_max,
        }
    }
}

const JOINT_MOVEMENT_SLOTS: usize = Joint::ALL.len() * Movement::ALL.len();
const PHASED_SLOTS: usize = JOINT_MOVEMENT_SLOTS * ExercisePhase::CONCRETE.len();

fn slot(joint: Joint, movement: Movement) -> usize {
    joint.index() * Movement::ALL.len() + movement.index()
}

/// Flat thresholds indexed by (joint, movement); applies to both sides.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdTable {
    entries: [Option<Threshold>; JOINT_MOVEMENT_SLOTS],
}

impl ThresholdTable {
    pub fn empty() -> Self {
        Self {
            entries: [None; JOINT_MOVEMENT_SLOTS],
        }
    }

    pub fn insert(&mut self, joint: Joint, movement: Movement, threshold: Threshold) {
        self.entries[slot(joint, movement)] = Some(threshold);
    }

    pub fn get(&self, joint: Joint, movement: Movement) -> Option<&Threshold> {
        self.entries[slot(joint, movement)].as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Phase-aware thresholds indexed by (joint, movement, phase).
#[derive(Clone, Debug, PartialEq)]
pub struct PhaseThresholdTable {
    entries: [Option<PhaseThreshold>; PHASED_SLOTS],
}

impl PhaseThresholdTable {
    pub fn empty() -> Self {
        Self {
            entries: [None; PHASED_SLOTS],
        }
    }

    fn phased_slot(joint: Joint, movement: Movement, phase_idx: usize) -> usize {
        slot(joint, movement) * ExercisePhase::CONCRETE.len() + phase_idx
    }

    /// UNKNOWN has no row of its own and is ignored.
    pub fn insert(
        &mut self,
        joint: Joint,
        movement: Movement,
        phase: ExercisePhase,
        threshold: PhaseThreshold,
    ) {
        if let Some(idx) = phase.index() {
            self.entries[Self::phased_slot(joint, movement, idx)] = Some(threshold);
        }
    }

    /// Row for `phase`, falling back to the ACTIVE row. `None` means the
    /// combination is unsupported for constraint purposes.
    pub fn get(
        &self,
        joint: Joint,
        movement: Movement,
        phase: ExercisePhase,
    ) -> Option<&PhaseThreshold> {
        let exact = phase
            .index()
            .and_then(|idx| self.entries[Self::phased_slot(joint, movement, idx)].as_ref());
        exact.or_else(|| {
            let active = ExercisePhase::Active.index().unwrap_or(2);
            self.entries[Self::phased_slot(joint, movement, active)].as_ref()
        })
    }

    /// Whether any phase row exists for the combination.
    /// Exact lookup: true only when `phase` has a row of its own.
    pub fn contains(&self, joint: Joint, movement: Movement, phase: ExercisePhase) -> bool {
        phase
            .index()
            .map_or(false, |idx| self.entries[Self::phased_slot(joint, movement, idx)].is_some())
    }

    pub fn supports(&self, joint: Joint, movement: Movement) -> bool {
        ExercisePhase::CONCRETE
            .iter()
            .filter_map(|p| p.index())
            .any(|idx| self.entries[Self::phased_slot(joint, movement, idx)].is_some())
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_token_names() {
        assert_eq!(
            AngleKey::parse("left_shoulder_flexion"),
            AngleName::Key(AngleKey {
                side: Side::Left,
                joint: Joint::Shoulder,
                movement: Movement::Flexion,
            })
        );
        assert_eq!(
            AngleKey::parse("right_wrist_radial_deviation"),
            AngleName::Key(AngleKey {
                side: Side::Right,
                joint: Joint::Wrist,
                movement: Movement::RadialDeviation,
            })
        );
    }

    #[test]
    fn short_names_are_malformed() {
        assert_eq!(AngleKey::parse("shoulder_flexion"), AngleName::Malformed);
        assert_eq!(AngleKey::parse("flexion"), AngleName::Malformed);
        assert_eq!(AngleKey::parse("left__flexion"), AngleName::Malformed);
    }

    #[test]
    fn unknown_tags_are_unsupported() {
        assert_eq!(AngleKey::parse("left_knee_flexion"), AngleName::Unsupported);
        assert_eq!(AngleKey::parse("center_shoulder_flexion"), AngleName::Unsupported);
        assert_eq!(AngleKey::parse("left_shoulder_twist"), AngleName::Unsupported);
    }

    #[test]
    fn threshold_boundaries() {
        let t = Threshold::new("shoulder_flexion", 90.0, 100.0, 110.0).unwrap();
        assert_eq!(t.zone(99.999), Zone::Safe);
        assert_eq!(t.zone(100.0), Zone::Warning);
        assert_eq!(t.zone(109.9), Zone::Warning);
        assert_eq!(t.zone(110.0), Zone::Danger);
        assert_eq!(t.limit_for(Zone::Warning), Some(100.0));
        assert_eq!(t.limit_for(Zone::Danger), Some(110.0));
        assert_eq!(t.limit_for(Zone::Safe), None);
    }

    #[test]
    fn misordered_thresholds_are_rejected() {
        assert!(matches!(
            Threshold::new("shoulder_flexion", 120.0, 100.0, 130.0),
            Err(ConfigError::InvalidThreshold { .. })
        ));
        assert!(Threshold::new("x", 10.0, 10.0, 10.0).is_ok());
        assert!(Threshold::new("x", f64::NAN, 10.0, 10.0).is_err());

        assert!(PhaseThreshold::new("x", 10.0, 20.0, 20.0).is_err());
        assert!(PhaseThreshold::new("x", 10.0, 20.0, 30.0).is_ok());
    }

    #[test]
    fn phase_table_falls_back_to_active() {
        let mut table = PhaseThresholdTable::empty();
        let active = PhaseThreshold::new("k", 90.0, 110.0, 130.0).unwrap();
        let rest = PhaseThreshold::new("k", 30.0, 60.0, 120.0).unwrap();
        table.insert(Joint::Shoulder, Movement::Flexion, ExercisePhase::Active, active);
        table.insert(Joint::Shoulder, Movement::Flexion, ExercisePhase::Rest, rest);

        assert_eq!(
            table.get(Joint::Shoulder, Movement::Flexion, ExercisePhase::Rest),
            Some(&rest)
        );
        assert_eq!(
            table.get(Joint::Shoulder, Movement::Flexion, ExercisePhase::Completion),
            Some(&active)
        );
        assert_eq!(
            table.get(Joint::Shoulder, Movement::Flexion, ExercisePhase::Unknown),
            Some(&active)
        );
        assert_eq!(
            table.get(Joint::Elbow, Movement::Flexion, ExercisePhase::Active),
            None
        );
        assert!(table.supports(Joint::Shoulder, Movement::Flexion));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn phase_table_without_active_row_is_unsupported_for_other_phases() {
        let mut table = PhaseThresholdTable::empty();
        let rest = PhaseThreshold::new("k", 30.0, 60.0, 120.0).unwrap();
        table.insert(Joint::Elbow, Movement::Flexion, ExercisePhase::Rest, rest);
        assert_eq!(
            table.get(Joint::Elbow, Movement::Flexion, ExercisePhase::Transition),
            None
        );
    }
}
