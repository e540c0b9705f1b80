// src/main.rs

use clap::{CommandFactory, FromArgMatches};
use colored::*;
use m3u8_dl::{
    cli::Cli,
    downloader::{CancellationFlag, TempDirSlot},
    logging,
    models::RunOutcome,
    run_from_cli,
};
use std::{env, process, sync::Arc};

#[tokio::main]
async fn main() {
    // 为 Windows 终端启用 ANSI 颜色支持。
    #[cfg(windows)]
    {
        colored::control::set_virtual_terminal(true).ok();
    }

    let bin_name = env::var("CARGO_BIN_NAME").unwrap_or_else(|_| "m3u8-dl".to_string());
    let after_help = format!(
        "示例:\n  # 下载单个播放列表\n  {bin} -u \"https://.../index.m3u8\" -o video.ts\n\n  # 批量下载并合并为一个文件\n  {bin} -b links.txt -o merged.ts -w 32",
        bin = bin_name
    );
    let cmd = Cli::command().after_help(after_help);
    let args = match Cli::from_arg_matches(&cmd.get_matches()) {
        Ok(args) => Arc::new(args),
        Err(e) => e.exit(),
    };

    logging::init_logger(args.log_level);

    // 第一次 Ctrl+C 请求协作式取消，第二次删除临时目录后直接退出
    let cancellation = CancellationFlag::new();
    let temp_slot = TempDirSlot::new();
    let signal_flag = cancellation.clone();
    let signal_slot = temp_slot.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if signal_flag.cancel() {
                println!("\n{} 正在取消，等待进行中的分片结束...", "[!]".yellow());
            } else {
                println!("\n{} 用户强制中断程序。", "[!]".yellow());
                force_cleanup(&signal_slot);
                process::exit(130);
            }
        }
    });

    match run_from_cli(args, cancellation, temp_slot).await {
        Ok(RunOutcome::Completed { .. }) => {}
        Ok(RunOutcome::Cancelled) => process::exit(130),
        Ok(RunOutcome::Failed(_)) => process::exit(1),
        Err(e) => {
            eprintln!("\n{} {}", "[X]".red(), format!("程序执行出错: {}", e).red());
            process::exit(1);
        }
    }
}

/// `process::exit` 不会运行析构，临时目录需要在退出前手动删除。
fn force_cleanup(slot: &TempDirSlot) {
    match slot.purge() {
        Ok(Some(dir)) => log::info!("强制退出前已删除临时目录 {}", dir.display()),
        Ok(None) => {}
        Err(e) => {
            let dir = slot.get().unwrap_or_default();
            log::warn!("强制退出时未能删除临时目录 {}: {}", dir.display(), e);
            eprintln!(
                "{} 临时目录未能删除，请手动清理: {}",
                "[!]".yellow(),
                dir.display()
            );
        }
    }
}
