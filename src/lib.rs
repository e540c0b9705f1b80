// src/lib.rs

pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod downloader;
pub mod error;
pub mod logging;
pub mod models;
pub mod playlist;
pub mod symbols;
pub mod ui;
pub mod utils;

use crate::{
    cli::Cli,
    config::AppConfig,
    downloader::{CancellationFlag, DownloadCoordinator, RunRequest, TempDirSlot},
    error::{AppError, AppResult},
    models::RunOutcome,
    ui::ConsoleObserver,
};
use log::{debug, info};
use std::sync::Arc;

/// 库的公共入口点，由 `main.rs` 调用。`temp_slot` 在运行期间记录临时目录，
/// 供强制退出时清理。
pub async fn run_from_cli(
    args: Arc<Cli>,
    cancellation: CancellationFlag,
    temp_slot: TempDirSlot,
) -> AppResult<RunOutcome> {
    debug!("CLI 参数: {:?}", args);

    let config = Arc::new(AppConfig::new(&args)?);
    debug!("加载的应用配置: {:?}", config);

    let playlists = collect_playlists(&args)?;
    ui::print_header(&format!(
        "开始下载 {} 个播放列表 (按 {} 可取消)",
        playlists.len(),
        *symbols::CTRL_C
    ));
    for (i, uri) in playlists.iter().enumerate() {
        println!(
            "  [{}] {}",
            i + 1,
            utils::truncate_text(uri, constants::URL_TRUNCATE_LENGTH)
        );
    }

    let request = RunRequest {
        playlists,
        output: args.output.clone().unwrap_or_default(),
        workers: config.max_workers,
    };
    info!(
        "输出文件: {:?}, 并发数: {}",
        request.output, request.workers
    );

    let coordinator = DownloadCoordinator::new(config, Arc::new(ConsoleObserver::new()))?
        .with_cancellation_flag(cancellation)
        .with_temp_dir_slot(temp_slot);
    Ok(coordinator.run(request).await)
}

/// 合并 `--url` 与批量文件中的链接，保持输入顺序。
pub fn collect_playlists(args: &Cli) -> AppResult<Vec<String>> {
    let mut playlists: Vec<String> = args
        .urls
        .iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();

    if let Some(batch_file) = &args.batch_file {
        let content = std::fs::read_to_string(batch_file).map_err(|e| {
            log::error!("读取批量文件 '{}' 失败: {}", batch_file.display(), e);
            AppError::from(e)
        })?;
        let from_file = utils::parse_playlist_list(&content);
        if from_file.is_empty() {
            log::warn!("批量文件 '{}' 为空或不含有效行。", batch_file.display());
        }
        playlists.extend(from_file);
    }
    Ok(playlists)
}
