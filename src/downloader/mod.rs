// src/downloader/mod.rs

mod assembler;
mod coordinator;
mod segment;
mod state;

pub use assembler::Assembler;
pub use coordinator::{DownloadCoordinator, RunRequest};
pub use segment::SegmentProcessor;
pub use state::{CancellationFlag, RunState, TempDirSlot};

use crate::models::{Progress, RunOutcome, RunPhase};

/// 任务事件的订阅者。回调可能在工作线程中被调用，
/// 需要切换到界面线程的实现自行处理。
pub trait RunObserver: Send + Sync {
    fn on_phase(&self, _phase: RunPhase) {}

    /// 每完成一个分片调用一次
    fn on_progress(&self, progress: Progress);

    /// 每次任务只调用一次
    fn on_finished(&self, outcome: &RunOutcome);
}

/// 不关心任何事件时使用。
pub struct NoopObserver;

impl RunObserver for NoopObserver {
    fn on_progress(&self, _progress: Progress) {}
    fn on_finished(&self, _outcome: &RunOutcome) {}
}
