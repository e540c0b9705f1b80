// src/downloader/state.rs

use super::RunObserver;
use crate::models::{ChunkOutcome, Progress};
use log::info;
use std::{
    io,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

/// 协作式取消标志。只会从未取消变为已取消一次。
#[derive(Clone, Default, Debug)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回 true 表示本次调用真正触发了取消。
    pub fn cancel(&self) -> bool {
        let first = !self.0.swap(true, Ordering::SeqCst);
        if first {
            info!("收到取消请求，停止派发新的分片任务");
        }
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 记录当前任务的临时目录。进程被强制退出时 `TempDir` 不会析构，
/// 由持有者通过 `purge` 自行删除。
#[derive(Clone, Default, Debug)]
pub struct TempDirSlot(Arc<Mutex<Option<PathBuf>>>);

impl TempDirSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, path: &Path) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(path.to_path_buf());
    }

    pub fn clear(&self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    pub fn get(&self) -> Option<PathBuf> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// 立即删除记录的目录，返回被删除的路径。目录已不存在视为成功；
    /// 删除失败时保留记录，调用方可据此提示残留位置。
    pub fn purge(&self) -> io::Result<Option<PathBuf>> {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(path) = slot.as_ref() else {
            return Ok(None);
        };
        match std::fs::remove_dir_all(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        Ok(slot.take())
    }
}

/// 单次任务的运行状态，由协调器持有，工作任务只写自己序号的槽位。
pub struct RunState {
    total: usize,
    completed: AtomicUsize,
    cancel: CancellationFlag,
    results: Mutex<Vec<ChunkOutcome>>,
    observer: Arc<dyn RunObserver>,
}

impl RunState {
    pub fn new(total: usize, cancel: CancellationFlag, observer: Arc<dyn RunObserver>) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
            cancel,
            results: Mutex::new(vec![ChunkOutcome::Abandoned; total]),
            observer,
        }
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// 记录一个分片的结果并上报进度。取消之后到达的结果被丢弃。
    /// 进度在锁内上报，保证回调收到的比例单调递增。
    pub fn complete(&self, index: usize, outcome: ChunkOutcome) {
        let mut results = self.results.lock().unwrap_or_else(PoisonError::into_inner);
        if outcome == ChunkOutcome::Abandoned || self.cancel.is_cancelled() {
            return;
        }
        let Some(slot) = results.get_mut(index) else {
            return;
        };
        *slot = outcome;
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        self.observer.on_progress(Progress {
            completed,
            total: self.total,
        });
    }

    /// 所有任务结束后取出结果，下标即分片序号。
    pub fn take_results(&self) -> Vec<ChunkOutcome> {
        std::mem::take(&mut *self.results.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
