// src/downloader/coordinator.rs

use super::{
    RunObserver,
    assembler::Assembler,
    segment::SegmentProcessor,
    state::{CancellationFlag, RunState, TempDirSlot},
};
use crate::{
    client::RobustClient,
    config::{AppConfig, GapPolicy},
    constants,
    crypto::KeyResolver,
    error::*,
    models::{ChunkOutcome, RunOutcome, RunPhase, RunPlan},
    playlist::{self, HttpPlaylistSource, PlaylistSource},
};
use futures::{StreamExt, stream};
use log::{debug, error, info, warn};
use std::{
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
};
use tempfile::TempDir;
use url::Url;

/// 一次下载任务的输入。
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub playlists: Vec<String>,
    pub output: PathBuf,
    pub workers: usize,
}

impl RunRequest {
    /// 在发出任何网络请求之前校验输入。
    pub fn validate(&self) -> AppResult<Vec<Url>> {
        let playlists: Vec<&str> = self
            .playlists
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if playlists.is_empty() {
            return Err(AppError::Validation("至少需要输入一个M3U8链接".into()));
        }
        if self.output.as_os_str().is_empty() {
            return Err(AppError::Validation("请指定输出文件路径".into()));
        }
        if !(constants::MIN_WORKERS..=constants::MAX_WORKERS).contains(&self.workers) {
            return Err(AppError::Validation(format!(
                "并发数必须为 {}-{} 的整数，当前为 {}",
                constants::MIN_WORKERS,
                constants::MAX_WORKERS,
                self.workers
            )));
        }
        playlists
            .into_iter()
            .map(|s| {
                Url::parse(s).map_err(|e| AppError::Validation(format!("无效的链接 '{}': {}", s, e)))
            })
            .collect()
    }
}

/// 下载协调器：准备任务、调度并发分片、汇总结果并合并输出。
pub struct DownloadCoordinator {
    config: Arc<AppConfig>,
    client: Arc<RobustClient>,
    source: Arc<dyn PlaylistSource>,
    observer: Arc<dyn RunObserver>,
    cancel: CancellationFlag,
    temp_slot: TempDirSlot,
    phase: Mutex<RunPhase>,
}

impl DownloadCoordinator {
    pub fn new(config: Arc<AppConfig>, observer: Arc<dyn RunObserver>) -> AppResult<Self> {
        let client = Arc::new(RobustClient::new(config.clone())?);
        let source = Arc::new(HttpPlaylistSource::new(client.clone()));
        Ok(Self {
            config,
            client,
            source,
            observer,
            cancel: CancellationFlag::new(),
            temp_slot: TempDirSlot::new(),
            phase: Mutex::new(RunPhase::Idle),
        })
    }

    /// 替换播放列表来源。
    pub fn with_playlist_source(mut self, source: Arc<dyn PlaylistSource>) -> Self {
        self.source = source;
        self
    }

    /// 使用外部创建的取消标志，例如由 Ctrl+C 处理器持有的那个。
    pub fn with_cancellation_flag(mut self, flag: CancellationFlag) -> Self {
        self.cancel = flag;
        self
    }

    /// 运行期间在此登记临时目录，强制退出时由外部清理。
    pub fn with_temp_dir_slot(mut self, slot: TempDirSlot) -> Self {
        self.temp_slot = slot;
        self
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn phase(&self) -> RunPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, phase: RunPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
        debug!("任务状态切换为 {:?}", phase);
        self.observer.on_phase(phase);
    }

    /// 执行一次完整任务，并通过观察者发出唯一一次终止通知。
    pub async fn run(&self, request: RunRequest) -> RunOutcome {
        self.set_phase(RunPhase::Idle);
        let outcome = match self.execute(&request).await {
            Ok((written, failed)) => RunOutcome::Completed {
                output: request.output.clone(),
                written,
                failed,
            },
            Err(e) if e.is_cancellation() => RunOutcome::Cancelled,
            Err(e) => RunOutcome::Failed(e),
        };

        match &outcome {
            RunOutcome::Completed { output, written, failed } => info!(
                "任务完成: {} 个分片已合并，{} 个失败，输出 {}",
                written,
                failed,
                output.display()
            ),
            RunOutcome::Cancelled => info!("任务已取消"),
            RunOutcome::Failed(e) => error!("任务失败: {}", e),
        }
        self.set_phase(outcome.phase());
        self.observer.on_finished(&outcome);
        outcome
    }

    async fn execute(&self, request: &RunRequest) -> AppResult<(usize, usize)> {
        let uris = request.validate()?;

        self.set_phase(RunPhase::Preparing);
        let temp_dir = self.create_temp_dir()?;
        debug!("分片临时目录: {}", temp_dir.path().display());
        self.temp_slot.set(temp_dir.path());

        let result = self.prepare_and_download(&uris, request, &temp_dir).await;

        // 无论成功、失败还是取消，临时目录都要删除
        let temp_path = temp_dir.path().to_path_buf();
        if let Err(e) = temp_dir.close() {
            warn!("清理临时目录 {:?} 失败: {}", temp_path, e);
        }
        self.temp_slot.clear();
        result
    }

    fn create_temp_dir(&self) -> AppResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(constants::TEMP_DIR_PREFIX);
        let dir = match &self.config.temp_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    async fn prepare_and_download(
        &self,
        uris: &[Url],
        request: &RunRequest,
        temp_dir: &TempDir,
    ) -> AppResult<(usize, usize)> {
        if self.cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        let plan = playlist::load_plan(self.source.as_ref(), uris, self.config.key_policy).await?;
        let keys = KeyResolver::new(&self.client).resolve_all(&plan.keys).await?;
        if self.cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        if plan.total() == 0 {
            return Err(AppError::NoChunks);
        }

        info!(
            "共 {} 个分片，{} 个密钥，并发数 {}",
            plan.total(),
            keys.len(),
            request.workers
        );
        let processor = Arc::new(SegmentProcessor::new(self.client.clone(), keys, temp_dir.path()));
        let results = self.download_all(plan, processor, request.workers).await;
        if self.cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let mut stored = Vec::with_capacity(results.len());
        let mut failed = 0;
        for outcome in results {
            match outcome {
                ChunkOutcome::Stored(path) => stored.push(path),
                ChunkOutcome::Failed | ChunkOutcome::Abandoned => failed += 1,
            }
        }
        if failed > 0 {
            warn!("{} 个分片最终下载失败", failed);
            if self.config.gap_policy == GapPolicy::Abort {
                return Err(AppError::MissingChunks(failed));
            }
        }
        if stored.is_empty() {
            return Err(AppError::NoChunks);
        }

        let written = stored.len();
        let output = request.output.clone();
        tokio::task::spawn_blocking(move || Assembler::merge(&stored, &output))
            .await
            .map_err(|e| AppError::Merge(format!("合并任务异常退出: {}", e)))??;
        Ok((written, failed))
    }

    /// 以固定并发数处理所有分片，返回按序号排列的结果。
    async fn download_all(
        &self,
        plan: RunPlan,
        processor: Arc<SegmentProcessor>,
        workers: usize,
    ) -> Vec<ChunkOutcome> {
        self.set_phase(RunPhase::Running);
        let state = Arc::new(RunState::new(
            plan.total(),
            self.cancel.clone(),
            self.observer.clone(),
        ));

        stream::iter(plan.chunks)
            .map(|chunk| {
                let processor = processor.clone();
                let state = state.clone();
                let index = chunk.index;
                let handle = tokio::spawn(async move {
                    if state.is_cancelled() {
                        return;
                    }
                    let outcome = processor.process(&chunk, state.cancellation()).await;
                    state.complete(chunk.index, outcome);
                });
                async move { (index, handle.await) }
            })
            .buffer_unordered(workers)
            .for_each(|(index, joined)| {
                if let Err(e) = joined {
                    error!("分片 #{} 的任务异常退出: {}", index, e);
                    state.complete(index, ChunkOutcome::Failed);
                }
                futures::future::ready(())
            })
            .await;

        state.take_results()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{downloader::NoopObserver, models::PlaylistContent};
    use async_trait::async_trait;

    fn request(playlists: &[&str], output: &str, workers: usize) -> RunRequest {
        RunRequest {
            playlists: playlists.iter().map(|s| s.to_string()).collect(),
            output: PathBuf::from(output),
            workers,
        }
    }

    #[test]
    fn test_validate_worker_bounds() {
        let url = "http://example.com/a.m3u8";
        assert!(matches!(
            request(&[url], "out.ts", 0).validate(),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            request(&[url], "out.ts", 51).validate(),
            Err(AppError::Validation(_))
        ));
        assert_eq!(request(&[url], "out.ts", 1).validate().unwrap().len(), 1);
        assert_eq!(request(&[url], "out.ts", 50).validate().unwrap().len(), 1);
    }

    #[test]
    fn test_validate_inputs() {
        assert!(request(&[], "out.ts", 4).validate().is_err());
        assert!(request(&["  ", ""], "out.ts", 4).validate().is_err());
        assert!(request(&["http://example.com/a.m3u8"], "", 4).validate().is_err());
        assert!(request(&["not a url"], "out.ts", 4).validate().is_err());

        let uris = request(&[" http://a/1.m3u8 ", "", "http://b/2.m3u8"], "out.ts", 4)
            .validate()
            .unwrap();
        assert_eq!(uris.len(), 2);
    }

    struct BrokenSource;

    #[async_trait]
    impl PlaylistSource for BrokenSource {
        async fn load(&self, uri: &Url) -> AppResult<PlaylistContent> {
            Err(AppError::Parse {
                uri: uri.to_string(),
                reason: "broken".into(),
            })
        }
    }

    /// 加载播放列表时记下登记的临时目录，然后报告解析失败。
    struct SlotWatchingSource {
        slot: TempDirSlot,
        seen: Mutex<Option<PathBuf>>,
    }

    #[async_trait]
    impl PlaylistSource for SlotWatchingSource {
        async fn load(&self, uri: &Url) -> AppResult<PlaylistContent> {
            *self.seen.lock().unwrap() = self.slot.get();
            Err(AppError::Parse {
                uri: uri.to_string(),
                reason: "broken".into(),
            })
        }
    }

    #[tokio::test]
    async fn test_temp_dir_is_registered_while_running() {
        let temp_root = tempfile::tempdir().unwrap();
        let config = AppConfig {
            temp_root: Some(temp_root.path().to_path_buf()),
            ..AppConfig::default()
        };
        let slot = TempDirSlot::new();
        let source = Arc::new(SlotWatchingSource {
            slot: slot.clone(),
            seen: Mutex::new(None),
        });
        let coordinator = DownloadCoordinator::new(Arc::new(config), Arc::new(NoopObserver))
            .unwrap()
            .with_playlist_source(source.clone())
            .with_temp_dir_slot(slot.clone());

        coordinator
            .run(RunRequest {
                playlists: vec!["http://example.com/a.m3u8".into()],
                output: temp_root.path().join("out.ts"),
                workers: 1,
            })
            .await;

        let seen = source.seen.lock().unwrap().clone().expect("temp dir not registered");
        assert!(seen.starts_with(temp_root.path()));
        assert!(
            seen.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with(constants::TEMP_DIR_PREFIX)
        );
        assert!(!seen.exists());
        assert_eq!(slot.get(), None);
    }

    #[tokio::test]
    async fn test_parse_failure_is_fatal_and_cleans_up() {
        let temp_root = tempfile::tempdir().unwrap();
        let config = AppConfig {
            temp_root: Some(temp_root.path().to_path_buf()),
            ..AppConfig::default()
        };
        let coordinator = DownloadCoordinator::new(Arc::new(config), Arc::new(NoopObserver))
            .unwrap()
            .with_playlist_source(Arc::new(BrokenSource));
        let output = temp_root.path().join("out.ts");

        let outcome = coordinator
            .run(RunRequest {
                playlists: vec!["http://example.com/a.m3u8".into()],
                output: output.clone(),
                workers: 2,
            })
            .await;

        assert!(matches!(outcome, RunOutcome::Failed(AppError::Parse { .. })));
        assert_eq!(coordinator.phase(), RunPhase::Failed);
        assert!(!output.exists());
        assert_eq!(std::fs::read_dir(temp_root.path()).unwrap().count(), 0);
    }
}
