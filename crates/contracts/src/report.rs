//! Per-session reports
//!
//! Produced by the pipeline, consumed by logging, metrics and the CLI summary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CommandCode, ReconcileStats};

/// Samples routed into each bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketerStats {
    /// Images written, indexed by command code
    pub written: Vec<u64>,

    /// Samples whose label was not in the vocabulary (routed to no-op)
    pub unknown_labels: u64,
}

impl BucketerStats {
    pub fn with_codes(count: usize) -> Self {
        Self {
            written: vec![0; count],
            unknown_labels: 0,
        }
    }

    pub fn record(&mut self, code: CommandCode) {
        let idx = code.index();
        if idx >= self.written.len() {
            self.written.resize(idx + 1, 0);
        }
        self.written[idx] += 1;
    }

    pub fn total(&self) -> u64 {
        self.written.iter().sum()
    }

    /// Element-wise sum, growing to the longer vocabulary
    pub fn merge(&mut self, other: &BucketerStats) {
        if other.written.len() > self.written.len() {
            self.written.resize(other.written.len(), 0);
        }
        for (acc, n) in self.written.iter_mut().zip(&other.written) {
            *acc += n;
        }
        self.unknown_labels += other.unknown_labels;
    }
}

/// Outcome of one processed session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    /// `tag/index`
    pub session: String,

    pub reconcile: ReconcileStats,

    pub buckets: BucketerStats,

    /// Frames the sync log announces but the video never delivered
    pub missing_frames: u64,
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} frames, {} matched ({:.1}%), {} stale + {} trailing commands dropped",
            self.session,
            self.reconcile.frames,
            self.reconcile.matched,
            self.reconcile.match_rate() * 100.0,
            self.reconcile.dropped_commands,
            self.reconcile.trailing_commands,
        )
    }
}
