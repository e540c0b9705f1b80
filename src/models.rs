// src/models.rs

use crate::{config::KeyPolicy, error::AppError};
use std::path::PathBuf;
use url::Url;

/// 播放列表中 `#EXT-X-KEY` 的引用：密钥地址与可选的 IV。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDescriptor {
    pub uri: Url,
    pub iv: Option<[u8; 16]>,
}

/// 单个播放列表解析后的内容，分片地址均已解析为绝对地址。
#[derive(Debug, Clone)]
pub struct PlaylistContent {
    pub uri: Url,
    pub segments: Vec<Url>,
    pub key: Option<KeyDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDescriptor {
    /// 全局序号，从 0 开始连续编号
    pub index: usize,
    pub source: Url,
    pub origin: Url,
    /// 指向 `RunPlan::keys` 的下标
    pub key_slot: Option<usize>,
}

/// 一次任务的全部分片与密钥，在准备阶段生成后不再修改。
#[derive(Debug, Clone, Default)]
pub struct RunPlan {
    pub chunks: Vec<ChunkDescriptor>,
    pub keys: Vec<KeyDescriptor>,
}

impl RunPlan {
    /// 按输入顺序拼接所有播放列表的分片并统一编号。
    pub fn build(playlists: Vec<PlaylistContent>, policy: KeyPolicy) -> Self {
        let mut plan = RunPlan::default();

        if policy == KeyPolicy::FirstWins
            && let Some(key) = playlists.iter().find_map(|p| p.key.clone())
        {
            plan.keys.push(key);
        }

        for playlist in playlists {
            let key_slot = match policy {
                KeyPolicy::FirstWins => (!plan.keys.is_empty()).then_some(0),
                KeyPolicy::PerPlaylist => playlist.key.map(|key| {
                    plan.keys.push(key);
                    plan.keys.len() - 1
                }),
            };
            for source in playlist.segments {
                plan.chunks.push(ChunkDescriptor {
                    index: plan.chunks.len(),
                    source,
                    origin: playlist.uri.clone(),
                    key_slot,
                });
            }
        }
        plan
    }

    pub fn total(&self) -> usize {
        self.chunks.len()
    }
}

/// 单个分片的处理结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// 已下载（并解密）并写入临时文件
    Stored(PathBuf),
    /// 重试耗尽或解密失败
    Failed,
    /// 任务已取消，分片未处理或结果被丢弃
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed as f64 / self.total as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Preparing,
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// 一次任务的最终结果，三者必居其一。
#[derive(Debug)]
pub enum RunOutcome {
    Completed {
        output: PathBuf,
        written: usize,
        failed: usize,
    },
    Cancelled,
    Failed(AppError),
}

impl RunOutcome {
    pub fn phase(&self) -> RunPhase {
        match self {
            RunOutcome::Completed { .. } => RunPhase::Completed,
            RunOutcome::Cancelled => RunPhase::Cancelled,
            RunOutcome::Failed(_) => RunPhase::Failed,
        }
    }
}
