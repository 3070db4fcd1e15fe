//! # Sync Engine
//!
//! 帧流与指令流的对齐引擎。
//!
//! 负责：
//! - 按 tick 归并帧流与指令流（merge-join）
//! - 丢弃落后于当前帧的过期指令
//! - 为没有指令的帧补上最近一次遥测
//! - 指令耗尽后按 `TailPolicy` 处理剩余帧
//! - 统计 `ReconcileStats`
//!
//! ## 使用示例
//!
//! ```ignore
//! use sync_engine::{reconcile, TailPolicy};
//!
//! let mut reconciler = reconcile(frame_events, commands, TailPolicy::CarryForward);
//! for sample in reconciler.by_ref() {
//!     let sample = sample?;
//!     // route sample.frame by sample.command
//! }
//! let stats = reconciler.stats();
//! ```

mod reconciler;

pub use reconciler::{reconcile, reconcile_all, Reconciler};

// Re-export contracts types
pub use contracts::{CommandEvent, FrameEvent, JoinedSample, ReconcileStats, TailPolicy};
