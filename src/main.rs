use anyhow::{Context, Result};
use europa_scraper::models::load_job_file;
use europa_scraper::utils::logging;
use europa_scraper::{CourseCatalog, ScraperConfig, ScraperController};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = ScraperConfig::from_env();
    let courses_file = PathBuf::from(std::env::var("COURSES_FILE").unwrap_or_else(|_| "courses.csv".to_string()));
    let job_file = PathBuf::from(std::env::var("JOB_FILE").unwrap_or_else(|_| "job.toml".to_string()));

    let catalog = CourseCatalog::load(&courses_file)
        .await
        .with_context(|| format!("加载课程表失败: {}", courses_file.display()))?;
    let job = load_job_file(&job_file)
        .await
        .with_context(|| format!("加载任务失败: {}", job_file.display()))?;

    logging::log_startup(config.worker_count, catalog.len());

    // 启动运行
    let controller = ScraperController::new(config, catalog);
    let handle = controller.start(job).context("启动抓取失败")?;

    // 定期输出进度，Ctrl-C 触发协作停止
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let status = controller.status(&handle)?;
                logging::log_progress(&status);
                if status.is_complete {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("⚠️ 收到 Ctrl-C，等待当前条目完成后停止...");
                controller.stop(&handle);
                break;
            }
        }
    }

    let status = controller.wait(&handle).await?;
    let summary = controller.finalize(&handle)?;
    logging::print_final_stats(&status, &summary);

    Ok(())
}
