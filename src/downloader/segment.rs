// src/downloader/segment.rs

use super::state::CancellationFlag;
use crate::{
    client::RobustClient,
    constants,
    crypto::KeyMaterial,
    error::*,
    models::{ChunkDescriptor, ChunkOutcome},
};
use log::{debug, error};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

/// 处理单个分片：下载、按需解密、写入临时目录。
pub struct SegmentProcessor {
    client: Arc<RobustClient>,
    keys: Arc<Vec<KeyMaterial>>,
    temp_dir: PathBuf,
}

impl SegmentProcessor {
    pub fn new(client: Arc<RobustClient>, keys: Vec<KeyMaterial>, temp_dir: &Path) -> Self {
        Self {
            client,
            keys: Arc::new(keys),
            temp_dir: temp_dir.to_path_buf(),
        }
    }

    /// 分片的临时文件名只由序号决定。
    pub fn segment_path(temp_dir: &Path, index: usize) -> PathBuf {
        temp_dir.join(format!("{:05}.{}", index, constants::SEGMENT_EXTENSION))
    }

    fn key_for(&self, chunk: &ChunkDescriptor) -> Option<&KeyMaterial> {
        chunk.key_slot.and_then(|slot| self.keys.get(slot))
    }

    /// 下载分片并在有密钥时解密，返回明文。
    pub async fn fetch_chunk(&self, chunk: &ChunkDescriptor) -> AppResult<Vec<u8>> {
        let data = self.client.fetch_bytes(chunk.source.clone()).await?;
        match self.key_for(chunk) {
            Some(key) => key.decrypt(&data),
            None => Ok(data),
        }
    }

    /// 失败只影响本分片，不向上传播。
    pub async fn process(&self, chunk: &ChunkDescriptor, cancel: &CancellationFlag) -> ChunkOutcome {
        let data = match self.fetch_chunk(chunk).await {
            Ok(data) => data,
            Err(e) => {
                error!("分片 #{} ({}) 处理失败: {}", chunk.index, chunk.source, e);
                return ChunkOutcome::Failed;
            }
        };
        if cancel.is_cancelled() {
            return ChunkOutcome::Abandoned;
        }

        let path = Self::segment_path(&self.temp_dir, chunk.index);
        match tokio::fs::write(&path, &data).await {
            Ok(()) => {
                debug!("分片 #{} 已保存 ({} 字节)", chunk.index, data.len());
                ChunkOutcome::Stored(path)
            }
            Err(e) => {
                error!("写入分片文件 {:?} 失败: {}", path, e);
                ChunkOutcome::Failed
            }
        }
    }
}
