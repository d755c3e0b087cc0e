//! Engine configuration: threshold tables, gate switches and cooldown windows
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::logic::gate::CooldownWindows;
use crate::logic::phase::ExercisePhase;
use crate::logic::zones::Zone;
use crate::thresholds::{
    Joint, Movement, PhaseThreshold, PhaseThresholdTable, Threshold, ThresholdTable,
};
use log::info;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default limits, compiled into the binary.
static DEFAULT_THRESHOLDS_TOML: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/default_thresholds.toml"));

/// Parsed once on first use.
static DEFAULT_TABLES: Lazy<(ThresholdTable, PhaseThresholdTable)> = Lazy::new(|| {
    let file: ConfigFile =
        toml::from_str(DEFAULT_THRESHOLDS_TOML).expect("default_thresholds.toml must parse");
    let flat = build_flat_table(file.thresholds.as_deref().unwrap_or_default())
        .expect("default flat thresholds must be ordered");
    let phased = build_phase_table(file.phase_thresholds.as_deref().unwrap_or_default())
        .expect("default phase thresholds must be ordered");
    (flat, phased)
});

pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.6;

/// Errors raised while building a configuration. None of these can happen mid-session.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(
        "threshold {key}: expected safe_max <= warning_max <= danger_max, got {safe_max} / {warning_max} / {danger_max}"
    )]
    InvalidThreshold {
        key: String,
        safe_max: f64,
        warning_max: f64,
        danger_max: f64,
    },

    #[error(
        "phase threshold {key}: expected safe_max < caution_max < stop_max, got {safe_max} / {caution_max} / {stop_max}"
    )]
    InvalidPhaseThreshold {
        key: String,
        safe_max: f64,
        caution_max: f64,
        stop_max: f64,
    },

    #[error("threshold {0} is configured more than once")]
    DuplicateThreshold(String),

    #[error("phase threshold {0}: rows can only be configured for concrete phases")]
    UnknownPhaseRow(String),

    #[error("min_confidence must be within [0, 1], got {0}")]
    MinConfidence(f64),

    #[error("cooldown window for {zone} must be finite and non-negative, got {seconds}")]
    CooldownWindow { zone: Zone, seconds: f64 },
}

/// Which table drives zone classification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdSource {
    /// warning_max / danger_max from the flat table, whatever the phase.
    #[default]
    Flat,
    /// caution_max / stop_max from the phase table for the phase in force.
    Phased,
}

#[derive(Debug, Deserialize)]
struct ThresholdEntry {
    joint: Joint,
    movement: Movement,
    safe_max: f64,
    warning_max: f64,
    danger_max: f64,
}

#[derive(Debug, Deserialize)]
struct PhaseThresholdEntry {
    joint: Joint,
    movement: Movement,
    phase: ExercisePhase,
    safe_max: f64,
    caution_max: f64,
    stop_max: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CooldownOverrides {
    safe: Option<f64>,
    warning: Option<f64>,
    danger: Option<f64>,
    unknown: Option<f64>,
}

/// On-disk layout. Everything is optional; missing tables use the defaults.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct ConfigFile {
    min_confidence: f64,
    cooldown_enabled: bool,
    deduplication_enabled: bool,
    threshold_source: ThresholdSource,
    cooldown_windows: CooldownOverrides,
    thresholds: Option<Vec<ThresholdEntry>>,
    phase_thresholds: Option<Vec<PhaseThresholdEntry>>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            cooldown_enabled: true,
            deduplication_enabled: true,
            threshold_source: ThresholdSource::Flat,
            cooldown_windows: CooldownOverrides::default(),
            thresholds: None,
            phase_thresholds: None,
        }
    }
}

fn build_flat_table(entries: &[ThresholdEntry]) -> Result<ThresholdTable, ConfigError> {
    let mut table = ThresholdTable::empty();
    for e in entries {
        let key = format!("{}_{}", e.joint, e.movement);
        if table.get(e.joint, e.movement).is_some() {
            return Err(ConfigError::DuplicateThreshold(key));
        }
        let threshold = Threshold::new(&key, e.safe_max, e.warning_max, e.danger_max)?;
        table.insert(e.joint, e.movement, threshold);
    }
    Ok(table)
}

fn build_phase_table(entries: &[PhaseThresholdEntry]) -> Result<PhaseThresholdTable, ConfigError> {
    let mut table = PhaseThresholdTable::empty();
    for e in entries {
        let key = format!("{}_{}/{}", e.joint, e.movement, e.phase);
        if e.phase == ExercisePhase::Unknown {
            return Err(ConfigError::UnknownPhaseRow(key));
        }
        if table.contains(e.joint, e.movement, e.phase) {
            return Err(ConfigError::DuplicateThreshold(key));
        }
        let threshold = PhaseThreshold::new(&key, e.safe_max, e.caution_max, e.stop_max)?;
        table.insert(e.joint, e.movement, e.phase, threshold);
    }
    Ok(table)
}

/// Complete, validated engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub min_confidence: f64,
    pub cooldown_enabled: bool,
    pub deduplication_enabled: bool,
    pub cooldown_windows: CooldownWindows,
    pub threshold_source: ThresholdSource,
    pub thresholds: ThresholdTable,
    pub phase_thresholds: PhaseThresholdTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let (flat, phased) = (*DEFAULT_TABLES).clone();
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            cooldown_enabled: true,
            deduplication_enabled: true,
            cooldown_windows: CooldownWindows::default(),
            threshold_source: ThresholdSource::Flat,
            thresholds: flat,
            phase_thresholds: phased,
        }
    }
}

impl EngineConfig {
    /// Reads and validates a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&raw)?;
        info!(
            "Loaded engine config from {} ({} flat / {} phased thresholds, source {:?})",
            path.as_ref().display(),
            config.thresholds.len(),
            config.phase_thresholds.len(),
            config.threshold_source
        );
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(raw)?;
        let defaults = Self::default();

        let thresholds = match &file.thresholds {
            Some(entries) => build_flat_table(entries)?,
            None => defaults.thresholds,
        };
        let phase_thresholds = match &file.phase_thresholds {
            Some(entries) => build_phase_table(entries)?,
            None => defaults.phase_thresholds,
        };

        let mut cooldown_windows = CooldownWindows::default();
        let overrides = [
            (Zone::Safe, file.cooldown_windows.safe),
            (Zone::Warning, file.cooldown_windows.warning),
            (Zone::Danger, file.cooldown_windows.danger),
            (Zone::Unknown, file.cooldown_windows.unknown),
        ];
        for (zone, seconds) in overrides {
            if let Some(seconds) = seconds {
                cooldown_windows.set(zone, seconds);
            }
        }

        let config = Self {
            min_confidence: file.min_confidence,
            cooldown_enabled: file.cooldown_enabled,
            deduplication_enabled: file.deduplication_enabled,
            cooldown_windows,
            threshold_source: file.threshold_source,
            thresholds,
            phase_thresholds,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the scalar settings. Table entries are validated as they are built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::MinConfidence(self.min_confidence));
        }
        for zone in Zone::ALL {
            let seconds = self.cooldown_windows.get(zone);
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(ConfigError::CooldownWindow { zone, seconds });
            }
        }
        Ok(())
    }

    pub fn with_cooldown(mut self, enabled: bool) -> Self {
        self.cooldown_enabled = enabled;
        self
    }

    pub fn with_deduplication(mut self, enabled: bool) -> Self {
        self.deduplication_enabled = enabled;
        self
    }

    pub fn with_cooldown_window(mut self, zone: Zone, seconds: f64) -> Self {
        self.cooldown_windows.set(zone, seconds);
        self
    }

    pub fn with_thresholds(mut self, thresholds: ThresholdTable) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_threshold_source(mut self, source: ThresholdSource) -> Self {
        self.threshold_source = source;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.thresholds.len(), 7);
        assert_eq!(config.phase_thresholds.len(), 35);
        let shoulder = config
            .thresholds
            .get(Joint::Shoulder, Movement::Flexion)
            .unwrap();
        assert_eq!(shoulder.warning_max, 110.0);
        assert_eq!(shoulder.danger_max, 130.0);
    }

    #[test]
    fn empty_file_means_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert!(config.cooldown_enabled);
        assert!(config.deduplication_enabled);
        assert_eq!(config.min_confidence, DEFAULT_MIN_CONFIDENCE);
        assert_eq!(config.threshold_source, ThresholdSource::Flat);
        assert_eq!(config.thresholds, EngineConfig::default().thresholds);
    }

    #[test]
    fn overrides_are_applied() {
        let raw = r#"
            min_confidence = 0.7
            deduplication_enabled = false
            threshold_source = "phased"

            [cooldown_windows]
            warning = 0.25

            [[thresholds]]
            joint = "shoulder"
            movement = "flexion"
            safe_max = 90.0
            warning_max = 100.0
            danger_max = 110.0
        "#;
        let config = EngineConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.min_confidence, 0.7);
        assert!(!config.deduplication_enabled);
        assert_eq!(config.threshold_source, ThresholdSource::Phased);
        assert_eq!(config.cooldown_windows.get(Zone::Warning), 0.25);
        assert_eq!(config.cooldown_windows.get(Zone::Safe), 1.0);
        assert_eq!(config.thresholds.len(), 1);
        assert!(config.thresholds.get(Joint::Elbow, Movement::Flexion).is_none());
    }

    #[test]
    fn misordered_entry_fails_to_load() {
        let raw = r#"
            [[thresholds]]
            joint = "shoulder"
            movement = "flexion"
            safe_max = 120.0
            warning_max = 100.0
            danger_max = 130.0
        "#;
        assert!(matches!(
            EngineConfig::from_toml_str(raw),
            Err(ConfigError::InvalidThreshold { .. })
        ));
    }

    #[test]
    fn equal_caution_and_stop_is_rejected() {
        let raw = r#"
            [[phase_thresholds]]
            joint = "elbow"
            movement = "extension"
            phase = "rest"
            safe_max = 5.0
            caution_max = 10.0
            stop_max = 10.0
        "#;
        assert!(matches!(
            EngineConfig::from_toml_str(raw),
            Err(ConfigError::InvalidPhaseThreshold { .. })
        ));
    }

    #[test]
    fn unknown_tags_and_bad_scalars_fail() {
        let raw = r#"
            [[thresholds]]
            joint = "knee"
            movement = "flexion"
            safe_max = 1.0
            warning_max = 2.0
            danger_max = 3.0
        "#;
        assert!(matches!(
            EngineConfig::from_toml_str(raw),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("min_confidence = 1.5"),
            Err(ConfigError::MinConfidence(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[cooldown_windows]\nsafe = -1.0"),
            Err(ConfigError::CooldownWindow { .. })
        ));
        let raw = r#"
            [[phase_thresholds]]
            joint = "elbow"
            movement = "flexion"
            phase = "unknown"
            safe_max = 1.0
            caution_max = 2.0
            stop_max = 3.0
        "#;
        assert!(matches!(
            EngineConfig::from_toml_str(raw),
            Err(ConfigError::UnknownPhaseRow(_))
        ));
    }

    #[test]
    fn repeated_rows_are_rejected() {
        let raw = r#"
            [[thresholds]]
            joint = "shoulder"
            movement = "flexion"
            safe_max = 90.0
            warning_max = 110.0
            danger_max = 130.0

            [[thresholds]]
            joint = "shoulder"
            movement = "flexion"
            safe_max = 80.0
            warning_max = 100.0
            danger_max = 120.0
        "#;
        match EngineConfig::from_toml_str(raw) {
            Err(ConfigError::DuplicateThreshold(key)) => assert_eq!(key, "shoulder_flexion"),
            other => panic!("expected a duplicate row error, got {:?}", other),
        }

        let raw = r#"
            [[phase_thresholds]]
            joint = "elbow"
            movement = "flexion"
            phase = "rest"
            safe_max = 10.0
            caution_max = 20.0
            stop_max = 30.0

            [[phase_thresholds]]
            joint = "elbow"
            movement = "flexion"
            phase = "active"
            safe_max = 90.0
            caution_max = 120.0
            stop_max = 140.0

            [[phase_thresholds]]
            joint = "elbow"
            movement = "flexion"
            phase = "rest"
            safe_max = 15.0
            caution_max = 25.0
            stop_max = 35.0
        "#;
        assert!(matches!(
            EngineConfig::from_toml_str(raw),
            Err(ConfigError::DuplicateThreshold(key)) if key == "elbow_flexion/rest"
        ));
    }
}
