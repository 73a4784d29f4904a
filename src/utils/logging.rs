//! 日志工具模块
//!
//! 提供日志初始化、格式化和输出的辅助函数
use crate::models::{BatchItemOutcome, PreviewOutcome};
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// 初始化 tracing 日志：同时输出到控制台和日志文件（重复调用无副作用）
///
/// # 参数
/// - `log_file_path`: 日志文件路径，启动时重写文件头
pub fn init(log_file_path: &str) -> Result<()> {
    let file = init_log_file(log_file_path)?;
    let _ = build_subscriber(file).try_init();
    Ok(())
}

fn build_subscriber(file: File) -> impl tracing::Subscriber + Send + Sync {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
}

/// 初始化日志文件，写入文件头后以追加方式打开
fn init_log_file(log_file_path: &str) -> Result<File> {
    let log_header = format!(
        "{}\nFOFA 导出日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法创建日志文件: {}", log_file_path))?;

    let file = OpenOptions::new()
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("无法打开日志文件: {}", log_file_path))?;
    Ok(file)
}

/// 记录程序启动信息
pub fn log_startup(mode: &str, fields: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - {}", mode);
    info!("📋 查询字段: {}", fields);
    info!("{}", "=".repeat(60));
}

/// 打印批量预览结果
pub fn print_preview_table(outcomes: &[PreviewOutcome]) {
    info!("\n{}", "─".repeat(60));
    info!("🔍 批量预览结果");
    for (i, outcome) in outcomes.iter().enumerate() {
        let mark = if outcome.valid { "✅" } else { "❌" };
        match &outcome.error {
            Some(err) => info!(
                "{} {}. {} - 错误: {}",
                mark,
                i + 1,
                truncate_text(&outcome.query, 60),
                err
            ),
            None => info!(
                "{} {}. {} - {} 条",
                mark,
                i + 1,
                truncate_text(&outcome.query, 60),
                outcome.total
            ),
        }
    }
    info!("{}", "─".repeat(60));
}

/// 打印批量导出的最终统计信息
///
/// # 参数
/// - `outcomes`: 每条查询的导出结果
/// - `log_file_path`: 日志文件路径
pub fn print_batch_summary(outcomes: &[BatchItemOutcome], log_file_path: &str) {
    let success = outcomes.iter().filter(|o| o.is_success()).count();
    let records: usize = outcomes.iter().map(|o| o.record_count).sum();

    info!("\n{}", "=".repeat(60));
    info!("📊 批量导出完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, outcomes.len());
    info!("❌ 失败: {}", outcomes.len() - success);
    info!("📄 总记录数: {}", records);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
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
