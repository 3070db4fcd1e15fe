//! LabelBucketer - routes joined samples into per-command buckets

use std::path::{Path, PathBuf};

use contracts::{
    BucketerStats, CommandCode, CommandSet, ContractError, JoinedSample, OutputConfig, SampleSink,
};
use image::GrayImage;
use tracing::{debug, info, instrument, warn};

use crate::bucket::LabelBucket;

/// One [`LabelBucket`] per code of the vocabulary
///
/// Buckets are independent: a sample is written to exactly one of them.
/// Every bucket releases its handle when the bucketer is finished or dropped.
#[derive(Debug)]
pub struct LabelBucketer {
    name: String,
    root: PathBuf,
    commands: CommandSet,
    buckets: Vec<LabelBucket>,
    stats: BucketerStats,
}

impl LabelBucketer {
    /// Open (and create) the bucket directory of every command code under `root`
    #[instrument(name = "bucketer_open", skip_all, fields(root = %root.display()))]
    pub fn open(root: &Path, commands: &CommandSet, output: &OutputConfig) -> Result<Self, ContractError> {
        let buckets = commands
            .codes()
            .map(|code| LabelBucket::open(root, code, output))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            buckets = buckets.len(),
            resumed = buckets.iter().filter(|b| b.next_index() > 0).count(),
            "Buckets ready"
        );

        Ok(Self {
            name: format!("buckets:{}", root.display()),
            root: root.to_path_buf(),
            commands: commands.clone(),
            stats: BucketerStats::with_codes(buckets.len()),
            buckets,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Counters since the bucketer was opened
    pub fn stats(&self) -> &BucketerStats {
        &self.stats
    }

    pub fn bucket(&self, code: CommandCode) -> Option<&LabelBucket> {
        self.buckets.get(code.index())
    }

    /// Resolve the sample's command and store it in that bucket
    ///
    /// `None` and labels outside the vocabulary go to the no-op bucket.
    pub fn route(&mut self, sample: &JoinedSample<GrayImage>) -> Result<CommandCode, ContractError> {
        let label = sample.command.as_deref();
        let code = self.commands.resolve(label);

        if let Some(label) = label {
            if self.commands.lookup(label).is_none() {
                debug!(label, tick = sample.tick, "Unknown command label, routing to no-op");
                self.stats.unknown_labels += 1;
            }
        }

        let bucket = self.buckets.get_mut(code.index()).ok_or_else(|| {
            ContractError::sink_write(&self.name, format!("no bucket for code {code}"))
        })?;
        bucket.write(&sample.frame, sample.telemetry)?;
        self.stats.record(code);
        Ok(code)
    }

    /// Close every bucket and return the counters
    ///
    /// All buckets are closed even if one fails; the first error is returned.
    pub fn finish(mut self) -> Result<BucketerStats, ContractError> {
        self.close_all()?;
        info!(
            root = %self.root.display(),
            written = self.stats.total(),
            unknown_labels = self.stats.unknown_labels,
            "Buckets closed"
        );
        Ok(std::mem::take(&mut self.stats))
    }

    fn close_all(&mut self) -> Result<(), ContractError> {
        let mut first_err = None;
        for bucket in &mut self.buckets {
            if let Err(e) = bucket.close() {
                warn!(code = %bucket.code(), error = %e, "Failed to close bucket");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl SampleSink for LabelBucketer {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "bucketer_write",
        level = "trace",
        skip(self, sample),
        fields(tick = sample.tick)
    )]
    fn write(&mut self, sample: &JoinedSample<GrayImage>) -> Result<(), ContractError> {
        self.route(sample).map(|_| ())
    }

    fn flush(&mut self) -> Result<(), ContractError> {
        for bucket in &mut self.buckets {
            bucket.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), ContractError> {
        self.close_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Telemetry;
    use image::Luma;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::tempdir;

    fn sample(label: Option<&str>, left: f64, right: f64) -> JoinedSample<GrayImage> {
        JoinedSample {
            frame: GrayImage::from_pixel(4, 4, Luma([9])),
            tick: 0,
            command: label.map(str::to_string),
            telemetry: Telemetry::new(left, right),
        }
    }

    #[test]
    fn test_routes_by_label() {
        let root = tempdir().unwrap();
        let mut bucketer =
            LabelBucketer::open(root.path(), &CommandSet::default(), &OutputConfig::default())
                .unwrap();

        assert_eq!(bucketer.route(&sample(Some("forward"), 1.0, 1.0)).unwrap(), CommandCode(1));
        assert_eq!(bucketer.route(&sample(Some("left"), 0.0, 2.0)).unwrap(), CommandCode(3));
        assert_eq!(bucketer.route(&sample(None, 0.0, 0.0)).unwrap(), CommandCode::NOOP);
        assert_eq!(bucketer.route(&sample(Some("hover"), 0.0, 0.0)).unwrap(), CommandCode::NOOP);

        let stats = bucketer.finish().unwrap();
        assert_eq!(stats.written, vec![2, 1, 0, 1, 0, 0, 0]);
        assert_eq!(stats.unknown_labels, 1);

        for code in 0..7 {
            assert!(root.path().join(code.to_string()).is_dir());
        }
        assert!(root.path().join("1").join("0.jpeg").is_file());
        assert!(root.path().join("0").join("1.jpeg").is_file());
        assert!(!root.path().join("2").join("speeds.txt").exists());
    }

    #[test]
    fn test_every_speeds_line_names_one_image() {
        let root = tempdir().unwrap();
        let labels = [Some("forward"), None, Some("right"), Some("forward"), Some("backward")];

        // Two runs over the same output directory
        for run in 0..2 {
            let mut bucketer =
                LabelBucketer::open(root.path(), &CommandSet::default(), &OutputConfig::default())
                    .unwrap();
            for (i, label) in labels.iter().enumerate() {
                bucketer
                    .write(&sample(*label, i as f64, run as f64))
                    .unwrap();
            }
            bucketer.close().unwrap();
        }

        for code in CommandSet::default().codes() {
            let dir = root.path().join(code.to_string());
            let images: HashSet<String> = fs::read_dir(&dir)
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .filter(|n| n.ends_with(".jpeg"))
                .collect();

            let log = fs::read_to_string(dir.join("speeds.txt")).unwrap_or_default();
            let named: Vec<String> = log
                .lines()
                .map(|l| l.split(',').next().unwrap().to_string())
                .collect();

            let unique: HashSet<String> = named.iter().cloned().collect();
            assert_eq!(unique.len(), named.len(), "duplicate filename in {code}");
            assert_eq!(unique, images, "bucket {code}");
        }

        // forward bucket: 2 per run, numbered continuously
        let log = fs::read_to_string(root.path().join("1").join("speeds.txt")).unwrap();
        assert_eq!(
            log,
            "0.jpeg,0,0\n1.jpeg,3,0\n2.jpeg,0,1\n3.jpeg,3,1\n"
        );
    }

    #[test]
    fn test_drop_releases_handles() {
        let root = tempdir().unwrap();
        {
            let mut bucketer =
                LabelBucketer::open(root.path(), &CommandSet::default(), &OutputConfig::default())
                    .unwrap();
            bucketer.route(&sample(Some("right"), 5.0, -5.0)).unwrap();
            // dropped without finish()
        }
        let log = fs::read_to_string(root.path().join("4").join("speeds.txt")).unwrap();
        assert_eq!(log, "0.jpeg,5,-5\n");
    }

    #[test]
    fn test_custom_vocabulary() {
        let root = tempdir().unwrap();
        let commands = CommandSet::new(vec![
            contracts::CommandSpec::new(0, "idle", "idle"),
            contracts::CommandSpec::new(1, "go", "go"),
        ])
        .unwrap();
        let mut bucketer = LabelBucketer::open(root.path(), &commands, &OutputConfig::default()).unwrap();
        assert_eq!(bucketer.route(&sample(Some("go"), 0.0, 0.0)).unwrap(), CommandCode(1));
        assert_eq!(bucketer.route(&sample(Some("forward"), 0.0, 0.0)).unwrap(), CommandCode(0));
        drop(bucketer);

        assert!(!root.path().join("2").exists());
    }
}
