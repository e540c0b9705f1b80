// src/cli.rs

use crate::config::{GapPolicy, KeyPolicy};
use clap::{Parser, ValueEnum, command, crate_version};
use std::path::PathBuf;

/// 定义日志输出级别
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// 多个播放列表各自携带密钥时的处理方式
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeyPolicyArg {
    /// 第一个出现的密钥用于整个任务的所有分片
    FirstWins,
    /// 每个播放列表的分片使用各自的密钥
    PerPlaylist,
}

impl From<KeyPolicyArg> for KeyPolicy {
    fn from(arg: KeyPolicyArg) -> Self {
        match arg {
            KeyPolicyArg::FirstWins => KeyPolicy::FirstWins,
            KeyPolicyArg::PerPlaylist => KeyPolicy::PerPlaylist,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    version = crate_version!(),
    about,
    long_about = None,
    arg_required_else_help = true,
    disable_help_flag = true,
    disable_version_flag = true,
)]
#[command(group(
    clap::ArgGroup::new("source")
        .required(true)
        .multiple(true)
        .args(&["urls", "batch_file"]),
))]
pub struct Cli {
    // --- 输入 (Input) ---
    /// M3U8 播放列表链接，可重复指定多次
    #[arg(short, long = "url", value_name = "URL", help_heading = "Input")]
    pub urls: Vec<String>,
    /// 从文本文件读取多个播放列表链接 (每行一个)
    #[arg(short, long, value_name = "FILE", help_heading = "Input")]
    pub batch_file: Option<PathBuf>,
    /// 合并后的输出文件路径
    #[arg(short, long, value_name = "FILE", help_heading = "Input")]
    pub output: Option<PathBuf>,

    // --- 下载选项 (Options) ---
    /// 设置并发下载数 (1-50)
    #[arg(short, long, value_parser = clap::value_parser!(usize), help_heading = "Options")]
    pub workers: Option<usize>,
    /// 单次请求超时 (秒)
    #[arg(long, value_name = "SECS", help_heading = "Options")]
    pub timeout: Option<u64>,
    /// 单个请求失败后的最大重试次数
    #[arg(long, value_name = "N", help_heading = "Options")]
    pub retries: Option<u32>,
    /// 多个播放列表的密钥策略
    #[arg(long, value_enum, help_heading = "Options")]
    pub key_policy: Option<KeyPolicyArg>,
    /// 任一分片最终下载失败时中止任务，而不是跳过该分片
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Options")]
    pub strict: bool,
    /// 分片临时目录的存放位置 (默认为系统临时目录)
    #[arg(long, value_name = "DIR", help_heading = "Options")]
    pub temp_dir: Option<PathBuf>,
    /// 不读取也不创建外部配置文件
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Options")]
    pub no_config: bool,

    // --- 通用选项 (General) ---
    /// 显示此帮助信息并退出
    #[arg(short = 'h', long, action = clap::ArgAction::Help, global = true, help_heading = "General")]
    _help: Option<bool>,
    /// 显示版本信息并退出
    #[arg(short = 'V', long, action = clap::ArgAction::Version, global = true, help_heading = "General")]
    _version: Option<bool>,
    /// (隐藏参数) 设置日志文件的输出级别，用于调试
    #[arg(long, value_enum, default_value_t = LogLevel::Off, global = true, hide = true)]
    pub log_level: LogLevel,
}

impl Cli {
    pub fn gap_policy(&self) -> Option<GapPolicy> {
        self.strict.then_some(GapPolicy::Abort)
    }
}
