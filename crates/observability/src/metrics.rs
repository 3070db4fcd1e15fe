//! 数据集构建指标收集模块
//!
//! 基于 SessionReport 收集每个会话的指标，并汇总整批运行的统计。

use contracts::SessionReport;
use metrics::{counter, gauge, histogram};

/// 从 SessionReport 记录指标
///
/// 每个会话处理完成后调用。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_session_metrics;
///
/// let report = process_session(&session)?;
/// record_session_metrics(&report);
/// ```
pub fn record_session_metrics(report: &SessionReport) {
    // 会话计数器
    counter!("teleop_dataset_sessions_total", "status" => "success").increment(1);

    let stats = &report.reconcile;
    counter!("teleop_dataset_frames_total").increment(stats.frames);
    counter!("teleop_dataset_frames_matched_total").increment(stats.matched);
    counter!("teleop_dataset_frames_unlabeled_total").increment(stats.unlabeled + stats.tail_frames);

    // 丢弃的指令
    if stats.dropped_commands > 0 {
        counter!("teleop_dataset_commands_dropped_total", "reason" => "stale")
            .increment(stats.dropped_commands);
    }
    if stats.trailing_commands > 0 {
        counter!("teleop_dataset_commands_dropped_total", "reason" => "trailing")
            .increment(stats.trailing_commands);
    }

    // 视频帧少于 sync 记录
    if report.missing_frames > 0 {
        counter!("teleop_dataset_frames_missing_total").increment(report.missing_frames);
    }

    // 匹配率
    histogram!("teleop_dataset_match_rate").record(stats.match_rate());
    gauge!("teleop_dataset_last_session_frames").set(stats.frames as f64);

    // 各指令桶
    for (code, written) in report.buckets.written.iter().enumerate() {
        if *written > 0 {
            counter!("teleop_dataset_samples_routed_total", "code" => code.to_string())
                .increment(*written);
        }
    }
    if report.buckets.unknown_labels > 0 {
        counter!("teleop_dataset_unknown_labels_total").increment(report.buckets.unknown_labels);
    }
}

/// 记录会话失败
pub fn record_session_failed(reason: &str) {
    counter!(
        "teleop_dataset_sessions_total",
        "status" => "failure",
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// 单个失败会话
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFailure {
    pub session: String,
    pub error: String,
}

/// 整批运行聚合器
///
/// 在内存中汇总各会话报告，便于输出运行摘要。
#[derive(Debug, Clone, Default)]
pub struct RunAggregator {
    /// 成功会话数
    pub sessions_ok: u64,

    /// 失败会话
    pub failures: Vec<SessionFailure>,

    /// 帧数合计
    pub total_frames: u64,

    /// 带指令的帧
    pub total_matched: u64,

    /// 无指令的帧（含指令耗尽后的尾帧）
    pub total_unlabeled: u64,

    /// 丢弃的指令（过期 + 尾部）
    pub total_dropped_commands: u64,

    /// 未知标签
    pub total_unknown_labels: u64,

    /// 各指令桶写入数，按代码索引
    pub bucket_totals: Vec<u64>,

    /// 每会话帧数统计
    pub frames_per_session: RunningStats,

    /// 每会话匹配率统计
    pub match_rate_stats: RunningStats,
}

impl RunAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 累加一个成功会话
    pub fn record_success(&mut self, report: &SessionReport) {
        let stats = &report.reconcile;
        self.sessions_ok += 1;
        self.total_frames += stats.frames;
        self.total_matched += stats.matched;
        self.total_unlabeled += stats.unlabeled + stats.tail_frames;
        self.total_dropped_commands += stats.dropped_commands + stats.trailing_commands;
        self.total_unknown_labels += report.buckets.unknown_labels;

        if report.buckets.written.len() > self.bucket_totals.len() {
            self.bucket_totals.resize(report.buckets.written.len(), 0);
        }
        for (acc, n) in self.bucket_totals.iter_mut().zip(&report.buckets.written) {
            *acc += n;
        }

        self.frames_per_session.push(stats.frames as f64);
        if stats.frames > 0 {
            self.match_rate_stats.push(stats.match_rate() * 100.0);
        }
    }

    /// 记录一个失败会话
    pub fn record_failure(&mut self, session: &str, error: &str) {
        self.failures.push(SessionFailure {
            session: session.to_string(),
            error: error.to_string(),
        });
    }

    /// 生成摘要报告
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            sessions_ok: self.sessions_ok,
            sessions_failed: self.failures.len() as u64,
            total_frames: self.total_frames,
            total_matched: self.total_matched,
            total_unlabeled: self.total_unlabeled,
            total_dropped_commands: self.total_dropped_commands,
            total_unknown_labels: self.total_unknown_labels,
            match_rate: if self.total_frames > 0 {
                self.total_matched as f64 / self.total_frames as f64 * 100.0
            } else {
                0.0
            },
            frames_per_session: StatsSummary::from(&self.frames_per_session),
            match_rate_per_session: StatsSummary::from(&self.match_rate_stats),
            bucket_totals: self.bucket_totals.clone(),
            failures: self.failures.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 运行摘要
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub sessions_ok: u64,
    pub sessions_failed: u64,
    pub total_frames: u64,
    pub total_matched: u64,
    pub total_unlabeled: u64,
    pub total_dropped_commands: u64,
    pub total_unknown_labels: u64,
    pub match_rate: f64,
    pub frames_per_session: StatsSummary,
    pub match_rate_per_session: StatsSummary,
    pub bucket_totals: Vec<u64>,
    pub failures: Vec<SessionFailure>,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dataset Run Summary ===")?;
        writeln!(
            f,
            "Sessions: {} ok, {} failed",
            self.sessions_ok, self.sessions_failed
        )?;
        writeln!(f, "Total frames: {}", self.total_frames)?;
        writeln!(
            f,
            "Matched frames: {} ({:.2}%)",
            self.total_matched, self.match_rate
        )?;
        writeln!(f, "Unlabeled frames: {}", self.total_unlabeled)?;
        writeln!(f, "Dropped commands: {}", self.total_dropped_commands)?;
        writeln!(f, "Unknown labels: {}", self.total_unknown_labels)?;
        writeln!(f, "Frames per session: {}", self.frames_per_session)?;
        writeln!(f, "Match rate per session (%): {}", self.match_rate_per_session)?;

        if !self.bucket_totals.is_empty() {
            writeln!(f, "Samples per bucket:")?;
            for (code, count) in self.bucket_totals.iter().enumerate() {
                writeln!(f, "  {}: {}", code, count)?;
            }
        }

        if !self.failures.is_empty() {
            writeln!(f, "Failed sessions:")?;
            for failure in &self.failures {
                writeln!(f, "  {}: {}", failure.session, failure.error)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
