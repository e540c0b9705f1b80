// src/client.rs

use crate::{config::AppConfig, error::*};
use log::{debug, warn};
use reqwest::{Client, IntoUrl};
use std::sync::Arc;

/// 带超时与固定次数重试的 HTTP 客户端，播放列表、密钥与分片共用。
#[derive(Clone)]
pub struct RobustClient {
    pub client: Client,
    config: Arc<AppConfig>,
}

impl RobustClient {
    pub fn new(config: Arc<AppConfig>) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.max_workers)
            .build()?;

        Ok(Self { client, config })
    }

    /// 下载整个资源到内存。传输错误或非 2xx 状态都会立即重试，
    /// 最多额外尝试 `max_retries` 次，没有退避。
    pub async fn fetch_bytes<T: IntoUrl>(&self, url: T) -> AppResult<Vec<u8>> {
        let url = url.into_url()?;
        let attempts = self.config.max_retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.try_fetch(url.clone()).await {
                Ok(body) => {
                    if attempt > 1 {
                        debug!("'{}' 在第 {} 次尝试时成功", url, attempt);
                    }
                    return Ok(body);
                }
                Err(e) => {
                    warn!("请求 '{}' 失败 (第 {}/{} 次): {}", url, attempt, attempts, e);
                    last_error = e.to_string();
                }
            }
        }

        Err(AppError::Fetch {
            uri: url.to_string(),
            attempts,
            reason: last_error,
        })
    }

    async fn try_fetch(&self, url: reqwest::Url) -> Result<Vec<u8>, reqwest::Error> {
        let res = self.client.get(url).send().await?.error_for_status()?;
        Ok(res.bytes().await?.to_vec())
    }
}
