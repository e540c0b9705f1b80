// src/constants.rs

pub const UI_WIDTH: usize = 88;
pub const URL_TRUNCATE_LENGTH: usize = 72;
pub const CONFIG_DIR_NAME: &str = concat!(".", clap::crate_name!());
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const LOG_FILE_NAME: &str = concat!(clap::crate_name!(), ".log");
pub const LOG_FALLBACK_FILE_NAME: &str = "fallback.log";
pub const TEMP_DIR_PREFIX: &str = "m3u8_dl_";
pub const SEGMENT_EXTENSION: &str = "ts";
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const DEFAULT_WORKERS: usize = 20;
pub const MIN_WORKERS: usize = 1;
pub const MAX_WORKERS: usize = 50;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// AES-128 的密钥与 IV 长度
pub const AES_BLOCK_LEN: usize = 16;
