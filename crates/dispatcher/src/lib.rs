//! # Dispatcher
//!
//! 样本分发模块。
//!
//! 负责：
//! - 消费 `JoinedSample`
//! - 按指令代码路由到各自的 `LabelBucket`
//! - 续写已有目录（编号从现有最大值 + 1 开始）
//! - 所有退出路径上释放日志句柄

pub mod bucket;
pub mod bucketer;
pub mod sinks;

pub use bucket::{next_free_index, LabelBucket};
pub use bucketer::LabelBucketer;
pub use contracts::{BucketerStats, JoinedSample, SampleSink};
pub use sinks::LogSink;
