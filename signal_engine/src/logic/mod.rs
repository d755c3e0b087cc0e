//! SPDX-License-Identifier: GPL-3.0-or-later

pub mod advisor;
pub mod classifier;
pub mod constraints;
pub mod context;
pub mod engine;
pub mod gate;
pub mod phase;
pub mod replay;
pub mod signal;
pub mod zones;
