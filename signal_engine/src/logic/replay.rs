//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::frame::FrameInput;
use crate::logic::engine::SignalEngine;
use crate::logic::signal::SignalRecord;
use serde::{Deserialize, Serialize};

/// Recorded item with the frame timestamp it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayEntry<T> {
    pub timestamp: f64,
    pub item: T,
}

/// Timeline of input frames and the signal records they produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecorder {
    pub frames: Vec<ReplayEntry<FrameInput>>,
    pub signals: Vec<ReplayEntry<SignalRecord>>,
}

impl ReplayRecorder {
    /// Records an input frame under its own timestamp.
    pub fn record_frame(&mut self, frame: &FrameInput) {
        self.frames.push(ReplayEntry {
            timestamp: frame.timestamp,
            item: frame.clone(),
        });
    }

    /// Records an engine output.
    pub fn record_signal(&mut self, record: &SignalRecord) {
        self.signals.push(ReplayEntry {
            timestamp: record.timestamp,
            item: record.clone(),
        });
    }

    /// Feeds a frame through `engine`, recording both sides.
    pub fn process(&mut self, engine: &mut SignalEngine, frame: &FrameInput) -> SignalRecord {
        self.record_frame(frame);
        let record = engine.process_frame(frame);
        self.record_signal(&record);
        record
    }

    /// Input frames in recording order.
    pub fn inputs(&self) -> Vec<FrameInput> {
        self.frames.iter().map(|e| e.item.clone()).collect()
    }

    /// Runs the recorded inputs through a fresh state of `engine`.
    pub fn rerun(&self, engine: &mut SignalEngine) -> Vec<SignalRecord> {
        engine.reset();
        replay(engine, &self.inputs())
    }

    /// Saves the recorded replay data to a JSON file at the specified path.
    pub fn save_to<P: AsRef<std::path::Path>>(&self, path: P) -> std::io::Result<()> {
        let f = std::fs::File::create(path)?;
        serde_json::to_writer(f, &self)?;
        Ok(())
    }

    /// Loads replay data from a JSON file into a ReplayRecorder.
    pub fn load_from<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<Self> {
        let f = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(f)?)
    }
}

/// Runs `frames` through `engine` in order and collects every record.
pub fn replay(engine: &mut SignalEngine, frames: &[FrameInput]) -> Vec<SignalRecord> {
    frames.iter().map(|f| engine.process_frame(f)).collect()
}
