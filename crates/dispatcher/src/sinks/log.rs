//! LogSink - logs sample summaries via tracing instead of writing files

use contracts::{BucketerStats, CommandSet, ContractError, JoinedSample, SampleSink};
use image::GrayImage;
use tracing::{debug, info, instrument};

/// Sink for dry runs: resolves each sample like the bucketer would and logs it
pub struct LogSink {
    name: String,
    commands: CommandSet,
    stats: BucketerStats,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>, commands: &CommandSet) -> Self {
        Self {
            name: name.into(),
            stats: BucketerStats::with_codes(commands.len()),
            commands: commands.clone(),
        }
    }

    /// What would have been written
    pub fn stats(&self) -> &BucketerStats {
        &self.stats
    }

    pub fn into_stats(self) -> BucketerStats {
        self.stats
    }

    fn log_sample_summary(&mut self, sample: &JoinedSample<GrayImage>) {
        let label = sample.command.as_deref();
        let code = self.commands.resolve(label);
        if label.is_some_and(|l| self.commands.lookup(l).is_none()) {
            self.stats.unknown_labels += 1;
        }
        self.stats.record(code);

        debug!(
            sink = %self.name,
            tick = sample.tick,
            command = label.unwrap_or("-"),
            code = %code,
            left_speed = sample.telemetry.left_speed,
            right_speed = sample.telemetry.right_speed,
            width = sample.frame.width(),
            height = sample.frame.height(),
            "JoinedSample received"
        );
    }
}

impl SampleSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        level = "trace",
        skip(self, sample),
        fields(sink = %self.name, tick = sample.tick)
    )]
    fn write(&mut self, sample: &JoinedSample<GrayImage>) -> Result<(), ContractError> {
        self.log_sample_summary(sample);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ContractError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, samples = self.stats.total(), "LogSink closed");
        Ok(())
    }
}
