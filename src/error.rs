// src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("请求 '{uri}' 失败 (共尝试 {attempts} 次): {reason}")]
    Fetch {
        uri: String,
        attempts: u32,
        reason: String,
    },
    #[error("无法解析播放列表 '{uri}': {reason}")]
    Parse { uri: String, reason: String },
    #[error("获取密钥 '{uri}' 失败: {reason}")]
    KeyFetch { uri: String, reason: String },
    #[error("网络请求失败: {0}")]
    Network(#[from] reqwest::Error),
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("临时文件持久化失败: {0}")]
    TempFilePersist(#[from] tempfile::PersistError),
    #[error("JSON 解析错误: {0}")]
    Json(#[from] serde_json::Error),
    #[error("分片解密失败: {0}")]
    Decrypt(String),
    #[error("视频分片合并失败: {0}")]
    Merge(String),
    #[error("参数无效: {0}")]
    Validation(String),
    #[error("未能获取任何分片")]
    NoChunks,
    #[error("{0} 个分片最终下载失败")]
    MissingChunks(usize),
    #[error("下载已取消")]
    Cancelled,
    #[error("未知错误: {0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// 取消不算失败，调用方据此决定退出码与提示颜色。
    pub fn is_cancellation(&self) -> bool {
        matches!(self, AppError::Cancelled)
    }
}

pub type AppResult<T> = Result<T, AppError>;
