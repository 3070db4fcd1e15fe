//! Pipeline statistics and metrics.

use std::time::Duration;

use observability::RunAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Sessions found under the input directory
    pub sessions_found: usize,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Per-session reports, summed
    pub runs: RunAggregator,
}

impl PipelineStats {
    /// Frames per second throughput
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.runs.total_frames as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!();
        print!("{}", self.runs.summary());
        println!("Sessions found: {}", self.sessions_found);
        println!("Duration: {:.2}s ({:.1} frames/s)", self.duration.as_secs_f64(), self.fps());
        println!();
    }
}
