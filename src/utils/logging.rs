//! 日志工具模块
//!
//! 初始化 tracing 订阅者（终端 + 日志文件），并提供日志格式化的辅助函数

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::models::RunSummary;

/// 初始化日志
///
/// `RUST_LOG` 优先；否则 `info`，`verbose` 时本 crate 输出 `debug`。
/// 日志同时追加写入 `log_file_path`（不带颜色）。
pub fn init(verbose: bool, log_file_path: &str) -> Result<()> {
    init_log_file(log_file_path)?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("info,hoop_scrape=debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("无法打开日志文件: {}", log_file_path))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .try_init()
        .context("初始化日志失败")?;
    Ok(())
}

/// 在日志文件末尾写入本次运行的标题
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    if let Some(parent) = Path::new(log_file_path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let log_header = format!(
        "\n{}\n比赛数据抓取日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;
    file.write_all(log_header.as_bytes())?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config, listing_url: &str, output_file: &Path) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 篮球比赛数据抓取");
    info!("🔗 联赛地址: {}", listing_url);
    info!("💾 输出文件: {}", output_file.display());
    info!(
        "📋 模式: {}",
        if config.update { "更新（只抓新比赛）" } else { "完整抓取" }
    );
    if let Some(limit) = config.limit {
        info!("🔢 最多处理 {} 场", limit);
    }
    info!(
        "📦 每批 {} 场，全局重启上限 {} 次",
        config.matches_per_batch, config.max_global_restarts
    );
    info!("{}", "=".repeat(60));
}

/// 记录过滤结果
///
/// # 参数
/// - `discovered`: 列表页发现的比赛数
/// - `already_present`: 结果文件中已有的数量
/// - `queued`: 待处理数量
pub fn log_items_filtered(discovered: usize, already_present: usize, queued: usize) {
    info!("✓ 发现 {} 场比赛", discovered);
    if already_present > 0 {
        info!("⏭️ 已存在 {} 场，跳过", already_present);
    }
    info!("📋 本次待处理 {} 场\n", queued);
}

/// 记录单场进度
pub fn log_progress(position: usize, total: usize, id: &str, eta: Option<Duration>) {
    match eta {
        Some(eta) => info!(
            "⏳ 进度 {}/{} 比赛 {} | 预计剩余 {}",
            position,
            total,
            id,
            format_duration(eta)
        ),
        None => info!("⏳ 进度 {}/{} 比赛 {}", position, total, id),
    }
}

/// 记录批次暂停
pub fn log_batch_pause(processed: usize, remaining: usize) {
    info!("\n{}", "─".repeat(60));
    info!("⏸️ 批次暂停: 已处理 {} 场，剩余 {} 场", processed, remaining);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(summary: &RunSummary, output_file: &Path, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 运行统计 ({})", summary.state);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("🔍 发现: {}  已存在: {}  待处理: {}", summary.discovered, summary.already_present, summary.queued);
    info!("✅ 成功: {}/{}", summary.succeeded, summary.queued);
    info!("❌ 失败: {}", summary.failed);
    if summary.unpersisted > 0 {
        info!("⚠️ 未能落盘: {}", summary.unpersisted);
    }
    if summary.stopped_by_user > 0 {
        info!("🛑 用户停止，未处理: {}", summary.stopped_by_user);
    }
    info!("🔄 全局重启: {}", summary.global_restarts);
    if !summary.failed_ids.is_empty() {
        info!(
            "失败的比赛: {}",
            truncate_text(&summary.failed_ids.join(", "), 200)
        );
    }
    info!("{}", "=".repeat(60));
    info!("\n结果已保存至: {}", output_file.display());
    info!("日志已保存至: {}", log_file_path);
}

/// `125s` → `02分05秒`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}分{:02}秒", secs / 60, secs % 60)
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_by_chars_not_bytes() {
        assert_eq!(truncate_text("比赛数据", 2), "比赛...");
        assert_eq!(truncate_text("abc", 5), "abc");
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_duration(Duration::from_secs(125)), "02分05秒");
        assert_eq!(format_duration(Duration::from_secs(5)), "00分05秒");
    }

    #[test]
    fn log_header_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("log.txt");
        let path = path.to_str().unwrap();
        init_log_file(path).unwrap();
        init_log_file(path).unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content.matches("比赛数据抓取日志").count(), 2);
    }
}
