use crate::error::{Result, ScrapeError};
use crate::models::job::Job;
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载任务参数并校验为 `Job`
pub async fn load_job_file(job_file_path: &Path) -> Result<Job> {
    let content = fs::read_to_string(job_file_path).await.map_err(|e| {
        ScrapeError::config(format!("无法读取任务文件 {}: {}", job_file_path.display(), e))
    })?;

    let job = Job::from_toml_str(&content)?;
    tracing::info!(
        "已加载任务: {} → {} ({})",
        job.from_code,
        job.to_code,
        job.search_engine
    );

    Ok(job)
}
