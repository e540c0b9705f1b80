// src/logging.rs

use crate::{cli::LogLevel, config::file::get_config_dir, constants};
use log::warn;
use std::{env, path::PathBuf};

fn level_filter(level: LogLevel) -> log::LevelFilter {
    match level {
        LogLevel::Off => log::LevelFilter::Off,
        LogLevel::Error => log::LevelFilter::Error,
        LogLevel::Warn => log::LevelFilter::Warn,
        LogLevel::Info => log::LevelFilter::Info,
        LogLevel::Debug => log::LevelFilter::Debug,
        LogLevel::Trace => log::LevelFilter::Trace,
    }
}

fn log_file_path() -> PathBuf {
    match get_config_dir() {
        Ok(dir) => dir.join(constants::LOG_FILE_NAME),
        Err(_) => {
            eprintln!("警告: 无法获取用户主目录，日志将写入临时目录。");
            env::temp_dir()
                .join(clap::crate_name!())
                .join(constants::LOG_FILE_NAME)
        }
    }
}

/// 日志只写入文件，终端输出由 `ui` 负责。级别为 Off 时不做任何事。
pub fn init_logger(level: LogLevel) {
    if level == LogLevel::Off {
        return;
    }

    let log_file_path = log_file_path();
    if let Some(dir) = log_file_path.parent()
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("警告: 无法创建日志目录 {:?}: {}", dir, e);
    }

    let file_appender = match fern::log_file(&log_file_path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!(
                "警告: 无法打开主日志文件 {:?} : {}。将尝试使用备用日志文件。",
                log_file_path, e
            );
            let fallback_path = env::temp_dir().join(format!(
                "{}-{}",
                clap::crate_name!(),
                constants::LOG_FALLBACK_FILE_NAME
            ));
            match fern::log_file(&fallback_path) {
                Ok(fb_file) => {
                    warn!("日志将写入备用文件: {:?}", fallback_path);
                    fb_file
                }
                Err(e_fb) => {
                    eprintln!(
                        "错误: 无法创建备用日志文件 {:?}: {}。日志将不会被记录到文件。",
                        fallback_path, e_fb
                    );
                    return;
                }
            }
        }
    };

    let result = fern::Dispatch::new()
        .level(level_filter(level))
        // 依赖库的连接细节对排查分片问题没有帮助
        .level_for("hyper_util", log::LevelFilter::Warn)
        .level_for("reqwest", log::LevelFilter::Warn)
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] [{:<5}] [{}:{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.line().unwrap_or(0),
                message
            ))
        })
        .chain(file_appender)
        .apply();

    if let Err(e) = result {
        eprintln!("警告: 日志系统初始化失败: {}", e);
    }
}
