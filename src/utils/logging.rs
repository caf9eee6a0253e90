/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::fs;
use std::path::Path;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::RunSummary;

/// 初始化 tracing
///
/// `RUST_LOG` 优先；未设置时按 `verbose` 选择 debug 或 info。重复调用无副作用。
pub fn init(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gemremover={level}")));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> AppResult<()> {
    let log_header = format!(
        "{}\n图片还原日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .map_err(|e| AppError::file_write_failed(log_file_path, e))?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量去水印模式");
    info!("📊 每批并发数: {}", config.max_concurrent_images);
    match config.engine_timeout() {
        Some(limit) => info!("⏱️ 单张超时: {} 秒", limit.as_secs()),
        None => info!("⏱️ 单张超时: 不限"),
    }
    info!("{}", "=".repeat(60));
}

/// 记录文件加载信息
///
/// # 参数
/// - `total`: 文件总数
/// - `max_concurrent`: 每批并发数
pub fn log_files_loaded(total: usize, max_concurrent: usize) {
    info!("✓ 共 {} 个待处理的文件", total);
    info!("📋 将以每批 {} 个的方式处理", max_concurrent);
    info!("💡 每批完成后再开始下一批\n");
}

/// 记录批次开始信息
///
/// # 参数
/// - `chunk_num`: 批次编号
/// - `total_chunks`: 批次总数
/// - `start`: 起始图片编号
/// - `end`: 结束图片编号
/// - `total`: 图片总数
pub fn log_chunk_start(
    chunk_num: usize,
    total_chunks: usize,
    start: usize,
    end: usize,
    total: usize,
) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", chunk_num, total_chunks);
    info!("📄 本批图片: {}-{} / 共 {} 张", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_chunk_complete(chunk_num: usize, success: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: 成功 {}/{}", chunk_num, success, total);
    info!("{}", "─".repeat(60));
}

/// 记录单次运行的汇总
pub fn print_run_summary(summary: &RunSummary) {
    info!(
        "📊 本次运行: 提交 {}, 还原 {}, 跳过/失败 {}",
        summary.total_submitted, summary.completed, summary.skipped_or_failed
    );
}

/// 打印最终统计信息
///
/// # 参数
/// - `summary`: 运行汇总
/// - `saved`: 保存的下载文件（没有结果时为空）
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(summary: &RunSummary, saved: Option<&Path>, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", summary.completed, summary.total_submitted);
    info!("❌ 跳过/失败: {}", summary.skipped_or_failed);
    match saved {
        Some(path) => info!("💾 下载文件: {}", path.display()),
        None => info!("💾 没有可下载的结果"),
    }
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
