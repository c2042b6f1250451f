#![forbid(unsafe_code)]

//! Recorded gaze sample traces.
//!
//! A sample trace is JSONL, one object per line:
//!
//! ```text
//! {"t_ms":0,"x":412.0,"y":233.5,"blink":false,"calibrated":true,"prolonged_blink":false}
//! ```
//!
//! `t_ms` is milliseconds since the start of the recording. The three flags
//! are optional and default to an open-eye, calibrated frame. Blank lines
//! are skipped.
//!
//! # Invariants
//!
//! 1. Records are kept in file order; `t_ms` must never decrease.
//! 2. Replaying advances virtual time only; the engine never sees a
//!    wall-clock read.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use gaze_core::sample::GazeSample;
use gaze_runtime::root::InteractionRoot;
use gaze_runtime::scene::ElementTree;

use crate::determinism::VirtualClock;

/// One line of a sample trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub t_ms: u64,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub blink: bool,
    #[serde(default = "default_calibrated")]
    pub calibrated: bool,
    #[serde(default)]
    pub prolonged_blink: bool,
}

fn default_calibrated() -> bool {
    true
}

impl SampleRecord {
    /// A calibrated, open-eye record.
    #[must_use]
    pub fn at(t_ms: u64, x: f32, y: f32) -> Self {
        Self {
            t_ms,
            x,
            y,
            blink: false,
            calibrated: true,
            prolonged_blink: false,
        }
    }

    /// The record as a sample on `clock`'s timeline.
    pub fn to_sample(&self, clock: &VirtualClock) -> GazeSample {
        GazeSample::at(self.x, self.y, clock.at(self.t_ms))
            .with_blink(self.blink)
            .with_calibrated(self.calibrated)
            .with_prolonged_blink(self.prolonged_blink)
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors from reading or writing a sample trace.
#[derive(Debug)]
pub enum ReplayError {
    /// I/O error on the trace file.
    Io(io::Error),
    /// A line is not a valid record. `line` is 1-based.
    Parse { line: usize, source: serde_json::Error },
    /// `t_ms` went backwards.
    OutOfOrder { line: usize, t_ms: u64, previous: u64 },
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Parse { line, source } => write!(f, "line {line}: {source}"),
            Self::OutOfOrder {
                line,
                t_ms,
                previous,
            } => write!(f, "line {line}: t_ms {t_ms} is before the previous {previous}"),
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse { source, .. } => Some(source),
            Self::OutOfOrder { .. } => None,
        }
    }
}

impl From<io::Error> for ReplayError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// SampleTrace
// ---------------------------------------------------------------------------

/// An ordered list of [`SampleRecord`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleTrace {
    records: Vec<SampleRecord>,
}

impl SampleTrace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from records, checking their order.
    pub fn from_records(records: Vec<SampleRecord>) -> Result<Self, ReplayError> {
        let mut previous = 0;
        for (i, r) in records.iter().enumerate() {
            if r.t_ms < previous {
                return Err(ReplayError::OutOfOrder {
                    line: i + 1,
                    t_ms: r.t_ms,
                    previous,
                });
            }
            previous = r.t_ms;
        }
        Ok(Self { records })
    }

    /// Parse JSONL text.
    pub fn parse(text: &str) -> Result<Self, ReplayError> {
        Self::read(text.as_bytes())
    }

    /// Parse JSONL from any buffered reader.
    pub fn read(reader: impl BufRead) -> Result<Self, ReplayError> {
        let mut records = Vec::new();
        let mut previous = 0;
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: SampleRecord = serde_json::from_str(&line)
                .map_err(|source| ReplayError::Parse { line: i + 1, source })?;
            if record.t_ms < previous {
                return Err(ReplayError::OutOfOrder {
                    line: i + 1,
                    t_ms: record.t_ms,
                    previous,
                });
            }
            previous = record.t_ms;
            records.push(record);
        }
        Ok(Self { records })
    }

    /// Load a trace file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let file = File::open(path)?;
        Self::read(BufReader::new(file))
    }

    /// Write as JSONL.
    pub fn write(&self, mut out: impl Write) -> Result<(), ReplayError> {
        for record in &self.records {
            serde_json::to_writer(&mut out, record)
                .map_err(|e| ReplayError::Io(io::Error::other(e)))?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }

    /// Write to a file, replacing it.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ReplayError> {
        let file = File::create(path)?;
        self.write(BufWriter::new(file))
    }

    /// Append a record. Returns `false` (and drops it) if it is out of order.
    pub fn push(&mut self, record: SampleRecord) -> bool {
        if self.records.last().is_some_and(|last| record.t_ms < last.t_ms) {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Timestamp of the last record.
    pub fn duration_ms(&self) -> u64 {
        self.records.last().map_or(0, |r| r.t_ms)
    }
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// Feed `records` into `root` on `clock`'s timeline.
///
/// Between samples the root is ticked every `tick_ms`, so dwell completion
/// and hover exit delays fire exactly when they would live. After the last
/// record the root keeps ticking for `tail_ms`.
pub fn replay<T: ElementTree>(
    root: &mut InteractionRoot<T>,
    records: &[SampleRecord],
    clock: &mut VirtualClock,
    tick_ms: u64,
    tail_ms: u64,
) {
    let tick_ms = tick_ms.max(1);
    for record in records {
        tick_until(root, clock, record.t_ms, tick_ms);
        let now = clock.advance_to(record.t_ms);
        root.ingest(&record.to_sample(clock), now);
        root.tick(now);
    }
    let end = clock.elapsed_ms().saturating_add(tail_ms);
    tick_until(root, clock, end, tick_ms);
    let now = clock.advance_to(end);
    root.tick(now);
}

fn tick_until<T: ElementTree>(
    root: &mut InteractionRoot<T>,
    clock: &mut VirtualClock,
    until_ms: u64,
    tick_ms: u64,
) {
    while clock.elapsed_ms() + tick_ms < until_ms {
        let now = clock.advance(tick_ms);
        root.tick(now);
    }
}
