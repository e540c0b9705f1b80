// src/ui.rs

use crate::{
    constants,
    downloader::RunObserver,
    models::{Progress, RunOutcome, RunPhase},
    symbols,
};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const PROGRESS_TEMPLATE: &str =
    "{prefix:7.bold.cyan} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}/{len:3} ({percent:>3}%) [ETA: {eta}]";

pub fn print_header(title: &str) {
    println!("\n{}", "═".repeat(constants::UI_WIDTH));
    println!(" {}", title.cyan().bold());
    println!("{}", "═".repeat(constants::UI_WIDTH));
}

pub fn print_sub_header(title: &str) {
    println!("\n--- {} ---", title.bold());
}

pub fn info(message: &str) {
    println!("{} {}", *symbols::INFO, message);
}

pub fn warn(message: &str) {
    println!("{} {}", *symbols::WARN, message.yellow());
}

pub fn error(message: &str) {
    eprintln!("{} {}", *symbols::ERROR, message.red());
}

pub fn new_tasks_progress_bar(total: u64, prefix: &'static str) -> ProgressBar {
    let pbar = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::with_template(PROGRESS_TEMPLATE) {
        pbar.set_style(style.progress_chars("#>-"));
    }
    pbar.set_prefix(prefix);
    pbar
}

/// 终端进度条，按分片数显示进度。
pub struct ConsoleObserver {
    pbar: ProgressBar,
}

impl Default for ConsoleObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleObserver {
    pub fn new() -> Self {
        let pbar = new_tasks_progress_bar(0, "下载");
        pbar.set_draw_target(indicatif::ProgressDrawTarget::hidden());
        Self { pbar }
    }
}

impl RunObserver for ConsoleObserver {
    fn on_phase(&self, phase: RunPhase) {
        match phase {
            RunPhase::Preparing => info("正在解析播放列表..."),
            RunPhase::Running => {
                self.pbar
                    .set_draw_target(indicatif::ProgressDrawTarget::stderr());
                self.pbar.enable_steady_tick(Duration::from_millis(100));
            }
            _ => {}
        }
    }

    fn on_progress(&self, progress: Progress) {
        self.pbar.set_length(progress.total as u64);
        self.pbar.set_position(progress.completed as u64);
    }

    fn on_finished(&self, outcome: &RunOutcome) {
        self.pbar.finish_and_clear();
        print_sub_header("任务总结");
        match outcome {
            RunOutcome::Completed { output, written, failed } => {
                let shown = dunce::canonicalize(output).unwrap_or_else(|_| output.clone());
                println!(
                    "{} 文件已保存到 \"{}\"",
                    *symbols::OK,
                    shown.display()
                );
                let summary = format!(
                    "{} | {}",
                    format!("成功分片: {}", written).green(),
                    format!("失败分片: {}", failed).red()
                );
                println!("{}", summary);
                if *failed > 0 {
                    warn("部分分片下载失败，输出文件中缺少对应内容。");
                }
            }
            RunOutcome::Cancelled => println!("{} 下载已取消，临时文件已清理。", *symbols::STOP),
            RunOutcome::Failed(e) => error(&format!("下载失败: {}", e)),
        }
    }
}
