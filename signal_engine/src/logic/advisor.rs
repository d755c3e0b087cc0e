//! Corrective guidance for the primary violation of a frame
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::logic::classifier::Violation;
use crate::thresholds::{Joint, Movement};
use crate::wire::round_1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which way the patient should move the joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Raise,
    Lower,
    Straighten,
    Bend,
    /// No phrase configured for the joint/movement pair.
    Adjust,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Raise => "raise",
            Direction::Lower => "lower",
            Direction::Straighten => "straighten",
            Direction::Bend => "bend",
            Direction::Adjust => "adjust",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured instruction for moving a joint back into range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionGuidance {
    /// Side-qualified joint, e.g. `left_shoulder`.
    pub joint: String,
    pub movement: Movement,
    pub direction: Direction,
    #[serde(serialize_with = "round_1")]
    pub target_angle: f64,
    pub instruction: String,
}

/// Phrase pair for a joint/movement: (when over the limit, when under it).
fn phrases(joint: Joint, movement: Movement) -> Option<[(Direction, &'static str); 2]> {
    use Direction::*;
    let pair = match (joint, movement) {
        (Joint::Shoulder, Movement::Flexion) => [
            (Lower, "Reduce shoulder flexion angle"),
            (Raise, "Increase shoulder flexion angle"),
        ],
        (Joint::Shoulder, Movement::Abduction) => [
            (Lower, "Reduce shoulder abduction"),
            (Raise, "Increase shoulder abduction"),
        ],
        (Joint::Elbow, Movement::Flexion) => [
            (Straighten, "Straighten elbow slightly"),
            (Bend, "Bend elbow more"),
        ],
        (Joint::Elbow, Movement::Extension) => [
            (Lower, "Allow slight bend in elbow"),
            (Straighten, "Straighten elbow"),
        ],
        (Joint::Wrist, Movement::Flexion) => [
            (Lower, "Reduce wrist flexion"),
            (Raise, "Increase wrist flexion"),
        ],
        (Joint::Wrist, Movement::Extension) => [
            (Lower, "Reduce wrist extension"),
            (Raise, "Increase wrist extension"),
        ],
        _ => return None,
    };
    Some(pair)
}

/// Guidance for one violation. The target is the boundary that was crossed.
pub fn guidance_for(violation: &Violation) -> CorrectionGuidance {
    let current = violation.current_angle;
    let target = violation.limit;
    let over_limit = current > target;

    let (direction, text) = match phrases(violation.joint, violation.movement) {
        Some([over, under]) => {
            let (direction, text) = if over_limit { over } else { under };
            (direction, text.to_string())
        }
        None => (
            Direction::Adjust,
            format!("Adjust {} {}", violation.joint, violation.movement),
        ),
    };

    let mut instruction = format!("{}. Current: {:.1}°. Target: {:.1}°.", text, current, target);
    if let Some(side) = violation.side {
        instruction = format!("{} {}", side.as_str().to_uppercase(), instruction);
    }

    CorrectionGuidance {
        joint: violation.joint_label(),
        movement: violation.movement,
        direction,
        target_angle: target,
        instruction,
    }
}

/// Guidance for the primary (first) violation, if there is one.
pub fn advise(violations: &[Violation]) -> Option<CorrectionGuidance> {
    violations.first().map(guidance_for)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::zones::Zone;
    use crate::thresholds::Side;

    fn violation(joint: Joint, movement: Movement, current: f64, limit: f64) -> Violation {
        Violation {
            side: Some(Side::Left),
            joint,
            movement,
            current_angle: current,
            limit,
            zone: Zone::Warning,
        }
    }

    #[test]
    fn over_limit_shoulder_flexion_reduces() {
        let g = guidance_for(&violation(Joint::Shoulder, Movement::Flexion, 105.0, 100.0));
        assert_eq!(g.direction, Direction::Lower);
        assert_eq!(g.joint, "left_shoulder");
        assert_eq!(g.target_angle, 100.0);
        assert_eq!(
            g.instruction,
            "LEFT Reduce shoulder flexion angle. Current: 105.0°. Target: 100.0°."
        );
    }

    #[test]
    fn elbow_flexion_straightens() {
        let mut v = violation(Joint::Elbow, Movement::Flexion, 151.26, 150.0);
        v.side = Some(Side::Right);
        let g = guidance_for(&v);
        assert_eq!(g.direction, Direction::Straighten);
        assert_eq!(
            g.instruction,
            "RIGHT Straighten elbow slightly. Current: 151.3°. Target: 150.0°."
        );
    }

    #[test]
    fn exactly_at_limit_uses_the_under_phrase() {
        let g = guidance_for(&violation(Joint::Wrist, Movement::Flexion, 65.0, 65.0));
        assert_eq!(g.direction, Direction::Raise);
    }

    #[test]
    fn missing_phrase_falls_back_to_adjust() {
        let mut v = violation(Joint::Wrist, Movement::RadialDeviation, 30.0, 20.0);
        v.side = None;
        let g = guidance_for(&v);
        assert_eq!(g.direction, Direction::Adjust);
        assert_eq!(g.joint, "wrist");
        assert_eq!(
            g.instruction,
            "Adjust wrist radial_deviation. Current: 30.0°. Target: 20.0°."
        );
    }

    #[test]
    fn no_violations_no_guidance() {
        assert_eq!(advise(&[]), None);
        let vs = vec![
            violation(Joint::Shoulder, Movement::Abduction, 125.0, 120.0),
            violation(Joint::Elbow, Movement::Flexion, 125.0, 120.0),
        ];
        assert_eq!(advise(&vs).unwrap().movement, Movement::Abduction);
    }
}
