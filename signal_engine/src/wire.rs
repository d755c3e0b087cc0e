//! External encodings of `SignalRecord`: JSON for general consumers and a fixed
//! 11-byte frame for low-level actuators.
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::logic::phase::ExercisePhase;
use crate::logic::signal::SignalRecord;
use crate::logic::zones::Zone;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::Serializer;
use thiserror::Error;

/// category(1) urgency(1) safety_flag(1) severity(1) confidence(1) processing_time(4) phase(1) correction(1)
pub const BYTE_FRAME_LEN: usize = 11;

/// Only safety signals are produced by this engine.
pub const CATEGORY_SAFETY: u8 = 0;

const URGENCY_MEDIUM: u8 = 1;
const URGENCY_HIGH: u8 = 2;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("byte frame too short: expected {BYTE_FRAME_LEN} bytes, got {0}")]
    Truncated(usize),

    #[error("unknown {field} tag {value}")]
    UnknownTag { field: &'static str, value: u8 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn round_to<S: Serializer>(value: f64, scale: f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((value * scale).round() / scale)
}

pub fn round_1<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
    round_to(*value, 10.0, s)
}

pub fn round_3<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
    round_to(*value, 1_000.0, s)
}

pub fn round_4<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
    round_to(*value, 10_000.0, s)
}

pub fn to_json(record: &SignalRecord) -> Result<String, WireError> {
    Ok(serde_json::to_string(record)?)
}

pub fn from_json(raw: &str) -> Result<SignalRecord, WireError> {
    Ok(serde_json::from_str(raw)?)
}

/// 0 safe, 1 caution, 2 stop. UNKNOWN has no wire value of its own and goes out as 0.
fn safety_flag_byte(zone: Zone) -> u8 {
    match zone {
        Zone::Safe | Zone::Unknown => 0,
        Zone::Warning => 1,
        Zone::Danger => 2,
    }
}

/// 0 rest .. 4 completion. UNKNOWN goes out as 0.
fn phase_byte(phase: ExercisePhase) -> u8 {
    phase.index().unwrap_or(0) as u8
}

/// Decoded fixed-width frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ByteFrame {
    pub category: u8,
    pub urgency: u8,
    pub safety_flag: u8,
    pub severity: u8,
    /// Confidence scaled to 0-255.
    pub confidence: u8,
    pub processing_time_ms: f32,
    pub phase: u8,
    pub has_correction: bool,
}

impl ByteFrame {
    pub fn from_record(record: &SignalRecord, processing_time_ms: f32) -> Self {
        let severity = record.severity;
        ByteFrame {
            category: CATEGORY_SAFETY,
            urgency: if severity >= 2 {
                URGENCY_HIGH
            } else {
                URGENCY_MEDIUM
            },
            safety_flag: safety_flag_byte(record.safety_flag),
            severity,
            // `as` saturates, so out-of-range confidence lands on 0 or 255.
            confidence: (record.confidence * 255.0) as u8,
            processing_time_ms,
            phase: phase_byte(record.phase),
            has_correction: record.correction.is_some(),
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(BYTE_FRAME_LEN);
        buf.put_u8(self.category);
        buf.put_u8(self.urgency);
        buf.put_u8(self.safety_flag);
        buf.put_u8(self.severity);
        buf.put_u8(self.confidence);
        buf.put_f32(self.processing_time_ms); // big-endian
        buf.put_u8(self.phase);
        buf.put_u8(self.has_correction as u8);
        buf.freeze()
    }

    pub fn decode(mut raw: &[u8]) -> Result<Self, WireError> {
        if raw.len() < BYTE_FRAME_LEN {
            return Err(WireError::Truncated(raw.len()));
        }

        let category = raw.get_u8();
        let urgency = raw.get_u8();
        let safety_flag = raw.get_u8();
        if safety_flag > 2 {
            return Err(WireError::UnknownTag {
                field: "safety_flag",
                value: safety_flag,
            });
        }
        let severity = raw.get_u8();
        let confidence = raw.get_u8();
        let processing_time_ms = raw.get_f32();
        let phase = raw.get_u8();
        if phase as usize >= ExercisePhase::CONCRETE.len() {
            return Err(WireError::UnknownTag {
                field: "phase",
                value: phase,
            });
        }
        let has_correction = match raw.get_u8() {
            0 => false,
            1 => true,
            value => {
                return Err(WireError::UnknownTag {
                    field: "correction_flag",
                    value,
                })
            }
        };

        Ok(ByteFrame {
            category,
            urgency,
            safety_flag,
            severity,
            confidence,
            processing_time_ms,
            phase,
            has_correction,
        })
    }

    /// Phase named by the `phase` byte.
    pub fn phase(&self) -> ExercisePhase {
        ExercisePhase::CONCRETE
            .get(self.phase as usize)
            .copied()
            .unwrap_or(ExercisePhase::Unknown)
    }
}

/// Encode a record for low-level consumers. `processing_time_ms` is measured by the caller.
pub fn encode_bytes(record: &SignalRecord, processing_time_ms: f32) -> Bytes {
    ByteFrame::from_record(record, processing_time_ms).encode()
}

pub fn decode_bytes(raw: &[u8]) -> Result<ByteFrame, WireError> {
    ByteFrame::decode(raw)
}
