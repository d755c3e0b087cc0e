//! Exercise phase detection with a one-way "movement observed" latch
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::logic::classifier::SafetyAssessment;
use crate::logic::zones::Zone;
use log::debug;
use serde::{Deserialize, Serialize};
use indexmap::IndexMap;
use std::fmt;

/// Any flexion/abduction angle above this counts as movement (degrees).
const MOVEMENT_THRESHOLD_DEG: f64 = 5.0;
/// SAFE frames above this confidence after movement are treated as the return to rest.
const COMPLETION_CONFIDENCE: f64 = 0.9;
/// Mean shoulder flexion below this is the start of a repetition.
const INITIATION_MAX_DEG: f64 = 30.0;
/// Mean shoulder flexion below this (and at least INITIATION_MAX_DEG) is the working range.
const ACTIVE_MAX_DEG: f64 = 90.0;

#[derive(Hash, Eq, PartialEq, Clone, Debug, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Stage of the exercise a frame belongs to.
pub enum ExercisePhase {
    Rest,
    Initiation,
    Active,
    Transition,
    Completion,
    Unknown,
}

impl fmt::Display for ExercisePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ExercisePhase {
    /// Phases that can carry their own threshold rows.
    pub const CONCRETE: [ExercisePhase; 5] = [
        ExercisePhase::Rest,
        ExercisePhase::Initiation,
        ExercisePhase::Active,
        ExercisePhase::Transition,
        ExercisePhase::Completion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExercisePhase::Rest => "rest",
            ExercisePhase::Initiation => "initiation",
            ExercisePhase::Active => "active",
            ExercisePhase::Transition => "transition",
            ExercisePhase::Completion => "completion",
            ExercisePhase::Unknown => "unknown",
        }
    }

    /// Position in `CONCRETE`, `None` for UNKNOWN.
    pub(crate) fn index(&self) -> Option<usize> {
        match self {
            ExercisePhase::Rest => Some(0),
            ExercisePhase::Initiation => Some(1),
            ExercisePhase::Active => Some(2),
            ExercisePhase::Transition => Some(3),
            ExercisePhase::Completion => Some(4),
            ExercisePhase::Unknown => None,
        }
    }
}

/// Outcome of one detector step.
/// Stay keeps the current phase, Transition switches to `to`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum TransitionDecision {
    Stay,
    Transition {
        from: ExercisePhase,
        to: ExercisePhase,
        reason: &'static str,
    },
}

/// Stateful phase classifier owned by one engine instance.
#[derive(Debug, Clone)]
pub struct PhaseDetector {
    current: ExercisePhase,
    phase_start: f64,
    /// Set the first time movement is seen; never cleared except by `reset`.
    movement_observed: bool,
}

impl PhaseDetector {
    pub fn new() -> Self {
        Self {
            current: ExercisePhase::Unknown,
            phase_start: 0.0,
            movement_observed: false,
        }
    }

    pub fn current(&self) -> ExercisePhase {
        self.current
    }

    /// Timestamp of the frame that entered the current phase.
    pub fn phase_start(&self) -> f64 {
        self.phase_start
    }

    pub fn movement_observed(&self) -> bool {
        self.movement_observed
    }

    /// Run one detection step for a classified frame and apply any phase change.
    pub(crate) fn update(
        &mut self,
        assessment: &SafetyAssessment,
        angles: &IndexMap<String, f64>,
    ) -> TransitionDecision {
        let (next, reason) = self.detect(assessment.zone, assessment.confidence, angles);
        if next == self.current {
            return TransitionDecision::Stay;
        }

        let from = self.current;
        self.current = next;
        self.phase_start = assessment.timestamp;
        debug!(
            "phase {} -> {} at frame {} ({})",
            from, next, assessment.frame, reason
        );
        TransitionDecision::Transition {
            from,
            to: next,
            reason,
        }
    }

    fn detect(
        &mut self,
        zone: Zone,
        confidence: f64,
        angles: &IndexMap<String, f64>,
    ) -> (ExercisePhase, &'static str) {
        if zone == Zone::Safe {
            if !self.movement_observed {
                return (ExercisePhase::Rest, "safe before any movement");
            }
            if confidence > COMPLETION_CONFIDENCE {
                return (ExercisePhase::Completion, "safe again after movement");
            }
        }

        let moving = angles
            .iter()
            .filter(|(name, _)| name.contains("flexion") || name.contains("abduction"))
            .any(|(_, value)| *value > MOVEMENT_THRESHOLD_DEG);

        if moving {
            self.movement_observed = true;

            // A NaN reading poisons the mean and lands in TRANSITION.
            let (sum, count) = angles
                .iter()
                .filter(|(name, _)| name.contains("shoulder_flexion"))
                .fold((0.0, 0usize), |(sum, count), (_, value)| (sum + value, count + 1));
            let mean_flexion = sum / count.max(1) as f64;

            return if mean_flexion < INITIATION_MAX_DEG {
                (ExercisePhase::Initiation, "shoulder flexion below initiation range")
            } else if mean_flexion < ACTIVE_MAX_DEG {
                (ExercisePhase::Active, "shoulder flexion in working range")
            } else {
                (ExercisePhase::Transition, "shoulder flexion above working range")
            };
        }

        if self.movement_observed {
            (ExercisePhase::Active, "no movement this frame")
        } else {
            (ExercisePhase::Rest, "no movement yet")
        }
    }
}

impl Default for PhaseDetector {
    fn default() -> Self {
        Self::new()
    }
}
