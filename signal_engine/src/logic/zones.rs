//! Safety zones and the severity derived from them
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a single angle or of a whole frame.
#[derive(Hash, Eq, PartialEq, Clone, Debug, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Safe,
    Warning,
    Danger,
    Unknown,
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Zone {
    pub const ALL: [Zone; 4] = [Zone::Safe, Zone::Warning, Zone::Danger, Zone::Unknown];

    /// Static string form (no allocation), also the external `safety_flag` label
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Safe => "safe",
            Zone::Warning => "warning",
            Zone::Danger => "danger",
            Zone::Unknown => "unknown",
        }
    }

    /// Downstream urgency, 0-3.
    pub fn severity(&self) -> u8 {
        match self {
            Zone::Safe => 0,
            Zone::Unknown => 1,
            Zone::Warning => 2,
            Zone::Danger => 3,
        }
    }

    /// Ordering used when aggregating a frame: SAFE < WARNING < DANGER.
    /// UNKNOWN never takes part in the aggregation.
    pub(crate) fn rank(&self) -> Option<u8> {
        match self {
            Zone::Safe => Some(0),
            Zone::Warning => Some(1),
            Zone::Danger => Some(2),
            Zone::Unknown => None,
        }
    }

    /// True when `self` should replace `current` as the frame's overall zone.
    pub(crate) fn outranks(&self, current: Zone) -> bool {
        match (self.rank(), current.rank()) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Zone::Safe => 0,
            Zone::Warning => 1,
            Zone::Danger => 2,
            Zone::Unknown => 3,
        }
    }

    /// Only WARNING and DANGER angles become violations.
    pub fn is_violation(&self) -> bool {
        matches!(self, Zone::Warning | Zone::Danger)
    }
}
