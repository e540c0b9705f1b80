// src/config.rs

pub mod file;

use self::file::load_or_create_external_config;
use crate::{cli::Cli, constants, error::AppResult};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// 批量模式下多个播放列表的密钥规则。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum KeyPolicy {
    /// 按输入顺序，第一个带密钥的播放列表决定整个任务的密钥，
    /// 所有分片（包括其他播放列表的分片）都用它解密。
    #[default]
    FirstWins,
    /// 每个播放列表的分片只使用该列表自己的密钥，无密钥的列表原样输出。
    PerPlaylist,
}

/// 分片最终下载失败时的合并策略。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum GapPolicy {
    /// 跳过失败的分片，合并其余分片
    #[default]
    Skip,
    /// 任一分片失败即中止，不生成输出文件
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkConfig {
    pub connect_timeout_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DownloadConfig {
    pub workers: Option<usize>,
    pub key_policy: Option<KeyPolicy>,
    pub gap_policy: Option<GapPolicy>,
    pub temp_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExternalConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

impl ExternalConfig {
    pub(crate) fn default_app_config() -> Self {
        Self {
            network: NetworkConfig {
                connect_timeout_secs: Some(constants::DEFAULT_CONNECT_TIMEOUT_SECS),
                timeout_secs: Some(constants::DEFAULT_TIMEOUT_SECS),
                max_retries: Some(constants::DEFAULT_MAX_RETRIES),
                user_agent: None,
            },
            download: DownloadConfig {
                workers: Some(constants::DEFAULT_WORKERS),
                key_policy: Some(KeyPolicy::FirstWins),
                gap_policy: Some(GapPolicy::Skip),
                temp_root: None,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub max_workers: usize,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub max_retries: u32,
    pub key_policy: KeyPolicy,
    pub gap_policy: GapPolicy,
    /// 为 None 时使用系统临时目录
    pub temp_root: Option<PathBuf>,
}

impl AppConfig {
    pub fn new(args: &Cli) -> AppResult<Self> {
        let external_config = if args.no_config {
            ExternalConfig::default()
        } else {
            load_or_create_external_config()?
        };
        Ok(Self::merge(args, external_config))
    }

    /// 命令行参数优先于配置文件，配置文件优先于内置默认值。
    pub(crate) fn merge(args: &Cli, external: ExternalConfig) -> Self {
        let ExternalConfig { network, download } = external;
        Self {
            max_workers: args
                .workers
                .or(download.workers)
                .unwrap_or(constants::DEFAULT_WORKERS),
            user_agent: network
                .user_agent
                .unwrap_or_else(|| constants::USER_AGENT.into()),
            connect_timeout: Duration::from_secs(
                network
                    .connect_timeout_secs
                    .unwrap_or(constants::DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
            timeout: Duration::from_secs(
                args.timeout
                    .or(network.timeout_secs)
                    .unwrap_or(constants::DEFAULT_TIMEOUT_SECS),
            ),
            max_retries: args
                .retries
                .or(network.max_retries)
                .unwrap_or(constants::DEFAULT_MAX_RETRIES),
            key_policy: args
                .key_policy
                .map(KeyPolicy::from)
                .or(download.key_policy)
                .unwrap_or_default(),
            gap_policy: args
                .gap_policy()
                .or(download.gap_policy)
                .unwrap_or_default(),
            temp_root: args.temp_dir.clone().or(download.temp_root),
        }
    }
}

#[cfg(any(test, feature = "testing"))]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            user_agent: "test-agent/1.0".to_string(),
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(5),
            max_retries: constants::DEFAULT_MAX_RETRIES,
            key_policy: KeyPolicy::FirstWins,
            gap_policy: GapPolicy::Skip,
            temp_root: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_overrides_file_and_defaults() {
        let args = Cli::parse_from([
            "m3u8-dl", "-u", "http://a/x.m3u8", "-w", "8", "--retries", "5", "--strict",
        ]);
        let mut external = ExternalConfig::default_app_config();
        external.network.timeout_secs = Some(30);
        external.download.workers = Some(2);
        external.download.key_policy = Some(KeyPolicy::PerPlaylist);

        let config = AppConfig::merge(&args, external);
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.key_policy, KeyPolicy::PerPlaylist);
        assert_eq!(config.gap_policy, GapPolicy::Abort);
        assert_eq!(config.user_agent, constants::USER_AGENT);
    }

    #[test]
    fn test_empty_external_config_uses_builtin_defaults() {
        let args = Cli::parse_from(["m3u8-dl", "-u", "http://a/x.m3u8"]);
        let config = AppConfig::merge(&args, ExternalConfig::default());
        assert_eq!(config.max_workers, constants::DEFAULT_WORKERS);
        assert_eq!(config.timeout, Duration::from_secs(constants::DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.max_retries, constants::DEFAULT_MAX_RETRIES);
        assert_eq!(config.key_policy, KeyPolicy::FirstWins);
        assert_eq!(config.gap_policy, GapPolicy::Skip);
        assert!(config.temp_root.is_none());
    }

    #[test]
    fn test_policies_deserialize_from_kebab_case() {
        let external: ExternalConfig = serde_json::from_str(
            r#"{ "download": { "key_policy": "per-playlist", "gap_policy": "abort" } }"#,
        )
        .unwrap();
        assert_eq!(external.download.key_policy, Some(KeyPolicy::PerPlaylist));
        assert_eq!(external.download.gap_policy, Some(GapPolicy::Abort));
        assert!(external.network.timeout_secs.is_none());
    }
}
