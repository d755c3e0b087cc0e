//! PhysioSafe signal engine driver: replays a JSON-lines file of angle frames and
//! prints the resulting signal stream.
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

#[macro_use]
extern crate log;

use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use docopt::Docopt;
use physiosafe_signal::{wire, EngineConfig, FrameInput, SignalEngine};
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::time::Instant;

const USAGE: &str = "
PhysioSafe signal engine: classifies joint-angle frames and emits a de-duplicated safety signal stream.

Usage:
  physiosafe-signal <frames> [--config=<path>] [--bytes] [--stats]
  physiosafe-signal (--version | -v)
  physiosafe-signal (--help | -h)

Options:
    --config=<path>     TOML engine configuration (defaults are built in)
    --bytes             Print base64 11-byte frames instead of JSON records
    --stats             Print statistics after the last frame
    --version, -v       Show version
    --help, -h          Show help
";

#[derive(Debug, Clone, Deserialize)]
struct Args {
    arg_frames: String,
    flag_config: Option<String>,
    flag_bytes: bool,
    flag_stats: bool,
}

fn main() -> Result<()> {
    let version = env!("CARGO_PKG_NAME").to_string() + ", version: " + env!("CARGO_PKG_VERSION");
    env_logger::init();

    let args: Args = Docopt::new(USAGE)
        .map(|d| d.help(true))
        .map(|d| d.version(Some(version)))
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    let config = match &args.flag_config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load engine config {}", path))?,
        None => EngineConfig::default(),
    };
    let mut engine = SignalEngine::new(config).context("invalid engine configuration")?;

    let input = File::open(&args.arg_frames)
        .with_context(|| format!("failed to open frames file {}", args.arg_frames))?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for (line_no, line) in BufReader::new(input).lines().enumerate() {
        let line = line.context("failed to read frames file")?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: FrameInput = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("line {}: skipping unparsable frame: {}", line_no + 1, e);
                continue;
            }
        };

        let started = Instant::now();
        let record = engine.process_frame(&frame);
        let processing_time_ms = started.elapsed().as_secs_f32() * 1000.0;

        if args.flag_bytes {
            let raw = wire::encode_bytes(&record, processing_time_ms);
            writeln!(out, "{}", general_purpose::STANDARD.encode(&raw))?;
        } else {
            writeln!(out, "{}", wire::to_json(&record)?)?;
        }
    }

    if args.flag_stats {
        writeln!(out, "{}", serde_json::to_string(engine.statistics())?)?;
    }

    info!(
        "Processed {} frames, {} suppressed",
        engine.statistics().total_frames,
        engine.statistics().suppressed
    );
    Ok(())
}
