//! SPDX-License-Identifier: GPL-3.0-or-later
//!
//! Per-session signal engine. Owns all mutable state; one instance per patient session.

use crate::config::{ConfigError, EngineConfig};
use crate::frame::FrameInput;
use crate::logic::classifier::{SafetyAssessment, ZoneClassifier};
use crate::logic::context::{EngineState, SignalStatistics};
use crate::logic::gate::{DedupCode, EmissionGate, GateDecision};
use crate::logic::phase::{ExercisePhase, TransitionDecision};
use crate::logic::signal::SignalRecord;
use crate::logic::zones::Zone;
use log::{debug, info, warn};
use indexmap::IndexMap;

pub struct SignalEngine {
    config: EngineConfig,
    classifier: ZoneClassifier,
    gate: EmissionGate,
    state: EngineState,
}

impl SignalEngine {
    /// Builds an engine from a validated configuration.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EngineConfig) -> Self {
        let classifier = ZoneClassifier::new(
            config.threshold_source,
            config.thresholds.clone(),
            config.phase_thresholds.clone(),
        );
        let gate = EmissionGate::new(
            config.deduplication_enabled,
            config.cooldown_enabled,
            config.cooldown_windows,
        );
        Self {
            config,
            classifier,
            gate,
            state: EngineState::new(),
        }
    }

    /// Classify a frame without touching any state. Phase-aware thresholds use the
    /// phase currently in force.
    pub fn assess(&self, frame: &FrameInput) -> SafetyAssessment {
        self.classifier.assess(frame, self.state.phase.current())
    }

    /// Process one frame. Never fails; bad input degrades to UNKNOWN.
    pub fn process_frame(&mut self, frame: &FrameInput) -> SignalRecord {
        let assessment = self.assess(frame);
        self.process_assessment(assessment, &frame.angles)
    }

    /// Process a frame whose assessment was produced elsewhere, e.g. an UNKNOWN frame
    /// after tracking was lost upstream.
    pub fn process_assessment(
        &mut self,
        assessment: SafetyAssessment,
        angles: &IndexMap<String, f64>,
    ) -> SignalRecord {
        if let Some(previous) = self.state.last_timestamp {
            if assessment.timestamp < previous {
                warn!(
                    "frame {}: timestamp went backwards ({} < {})",
                    assessment.frame, assessment.timestamp, previous
                );
            }
        }
        self.state.last_timestamp = Some(assessment.timestamp);
        self.state.stats.record_frame();

        if let TransitionDecision::Transition { .. } = self.state.phase.update(&assessment, angles) {
            self.state.stats.record_phase_change();
        }
        let phase = self.state.phase.current();

        let code = DedupCode::compute(
            assessment.zone,
            assessment.primary(),
            assessment.confidence,
            phase,
        );
        let decision = self
            .gate
            .evaluate(&mut self.state.gate, assessment.zone, &code, assessment.timestamp);

        match decision {
            GateDecision::Emit(_) => {
                self.state
                    .stats
                    .record_emitted(assessment.zone, assessment.timestamp);
                if assessment.zone == Zone::Danger {
                    info!(
                        "frame {}: DANGER {} ({} violations)",
                        assessment.frame,
                        code,
                        assessment.violations.len()
                    );
                }
            }
            GateDecision::Suppress(reason) => {
                self.state.stats.record_suppressed();
                debug!(
                    "frame {}: suppressed {} ({})",
                    assessment.frame,
                    code,
                    reason.as_str()
                );
            }
        }

        SignalRecord::assemble(&assessment, phase, code, decision)
    }

    /// Back to the state of a freshly built engine. Configuration is kept.
    pub fn reset(&mut self) {
        info!(
            "Resetting signal engine after {} frames",
            self.state.stats.total_frames
        );
        self.state.reset();
    }

    pub fn statistics(&self) -> &SignalStatistics {
        &self.state.stats
    }

    pub fn phase(&self) -> ExercisePhase {
        self.state.phase.current()
    }

    pub fn phase_start(&self) -> f64 {
        self.state.phase.phase_start()
    }

    pub fn movement_observed(&self) -> bool {
        self.state.phase.movement_observed()
    }

    pub fn last_signal_code(&self) -> Option<&str> {
        self.state.gate.last_code().map(|c| c.as_str())
    }

    pub fn last_emit_timestamp(&self) -> Option<f64> {
        self.state.gate.last_emit()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Default for SignalEngine {
    fn default() -> Self {
        Self::build(EngineConfig::default())
    }
}
