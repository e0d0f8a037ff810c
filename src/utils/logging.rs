/// 日志工具模块
///
/// 初始化 tracing，并提供运行开始、进度和最终统计的输出函数
use crate::models::{Job, RunStatus, Summary, WorkerState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// 初始化全局日志（`RUST_LOG` 未设置时默认 info）；重复调用无副作用
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `worker_count`: 默认 worker 数量
/// - `catalog_size`: 课程表条目数
pub fn log_startup(worker_count: usize, catalog_size: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 Europa Scraper 启动 - 多 worker 抓取模式");
    info!("📊 默认 worker 数: {}", worker_count);
    info!("📚 课程表条目: {}", catalog_size);
    info!("{}", "=".repeat(60));
}

/// 记录一次运行的开始
///
/// # 参数
/// - `job`: 已校验的任务
/// - `item_count`: 范围内条目数
/// - `worker_count`: 实际启动的 worker 数
pub fn log_run_start(job: &Job, item_count: usize, worker_count: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始抓取: {} → {}", job.from_code, job.to_code);
    info!(
        "🔍 搜索引擎: {} | 最少词数: {} | 输出模式: {:?}",
        job.search_engine, job.min_words, job.output_mode
    );
    info!("📄 条目: {} 个 / worker: {} 个", item_count, worker_count);
    info!("{}", "=".repeat(60));
}

/// 记录 worker 完成信息
pub fn log_worker_complete(state: &WorkerState) {
    info!("\n{}", "─".repeat(60));
    info!(
        "[worker {}] 🏁 {}: 处理 {}/{} | 结果 {} | 省略 {}",
        state.worker_id,
        state.status,
        state.processed_count,
        state.total_items,
        state.results_count,
        state.omitted_count
    );
    if let Some(err) = &state.last_error {
        warn!("[worker {}] 最后错误: {}", state.worker_id, err);
    }
    info!("{}", "─".repeat(60));
}

/// 记录聚合进度
pub fn log_progress(status: &RunStatus) {
    let running = status
        .per_worker
        .iter()
        .filter(|w| !w.status.is_terminal())
        .count();
    info!(
        "⏳ 总进度 {:.1}% | 运行中 worker {} 个 | 结果 {} | 省略 {}",
        status.overall_percent, running, status.total_results, status.total_omitted
    );
}

/// 打印最终统计信息
///
/// # 参数
/// - `status`: 最终运行状态
/// - `summary`: 结果管理器的汇总
pub fn print_final_stats(status: &RunStatus, summary: &Summary) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    for worker in &status.per_worker {
        info!(
            "  worker {} [{} → {}]: {} ({}/{})",
            worker.worker_id,
            worker.from_code,
            worker.to_code,
            worker.status,
            worker.processed_count,
            worker.total_items
        );
    }
    info!("✅ 结果: {}", summary.total_results);
    info!("⏭️ 省略: {}", summary.total_omitted);
    let failed = status.failed_workers();
    if !failed.is_empty() {
        warn!("❌ 失败的 worker: {:?}（对应范围未处理）", failed);
    }
    info!("{}", "=".repeat(60));
    for path in &summary.file_paths {
        info!("📁 {}", path.display());
    }
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
