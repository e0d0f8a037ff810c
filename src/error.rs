//! 错误类型定义
//!
//! ## 分类
//!
//! - **任务级错误**：`InvalidJob` / `AlreadyRunning` / `UnknownRun`，在任何 worker 启动前返回给调用方
//! - **worker 级错误**：`BrowserUnavailable`，只让对应的 worker 进入 failed 状态
//! - **契约错误**：`SessionNotInitialized`，正确使用时不应出现
//! - **条目级错误**：搜索、抓取、网络、解析错误，在 worker 内部被记录为 OmittedRecord

use thiserror::Error;
use uuid::Uuid;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// 任务参数非法
    #[error("任务参数无效: {0}")]
    InvalidJob(String),

    /// 已经有一个未结束的运行
    #[error("已有任务正在运行 (run_id: {run_id})，请先查询状态")]
    AlreadyRunning { run_id: Uuid },

    /// 句柄不属于当前控制器的运行
    #[error("未知的运行句柄: {run_id}")]
    UnknownRun { run_id: Uuid },

    /// 所有候选浏览器都启动失败
    #[error("没有可用的浏览器，已尝试 {} 个候选: {}", attempts.len(), attempts.join(" | "))]
    BrowserUnavailable { attempts: Vec<String> },

    /// 在 initialize() 之前使用了浏览器会话
    #[error("浏览器会话尚未初始化")]
    SessionNotInitialized,

    /// 搜索引擎返回错误
    #[error("搜索失败 ({engine}): {message}")]
    Search { engine: String, message: String },

    /// 页面内容提取失败
    #[error("内容提取失败 ({url}): {message}")]
    Extraction { url: String, message: String },

    /// 操作超时
    #[error("操作超时 ({operation}, {secs}s)")]
    Timeout { operation: String, secs: u64 },

    /// 配置或输入文件错误
    #[error("配置错误: {0}")]
    Config(String),

    #[error("浏览器协议错误: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),

    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV 读写失败: {0}")]
    Csv(#[from] csv::Error),

    #[error("文件操作失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML 解析失败: {0}")]
    Toml(#[from] toml::de::Error),
}

/// 统一的 Result 类型
pub type Result<T> = std::result::Result<T, ScrapeError>;

// ========== 便捷构造函数 ==========

impl ScrapeError {
    pub fn invalid_job(msg: impl Into<String>) -> Self {
        ScrapeError::InvalidJob(msg.into())
    }

    pub fn search_failed(engine: impl Into<String>, message: impl Into<String>) -> Self {
        ScrapeError::Search {
            engine: engine.into(),
            message: message.into(),
        }
    }

    pub fn extraction_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        ScrapeError::Extraction {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, secs: u64) -> Self {
        ScrapeError::Timeout {
            operation: operation.into(),
            secs,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        ScrapeError::Config(msg.into())
    }

    /// 是否在任何 worker 启动前就被拒绝
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ScrapeError::InvalidJob(_) | ScrapeError::AlreadyRunning { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_unavailable_lists_attempts() {
        let err = ScrapeError::BrowserUnavailable {
            attempts: vec!["/usr/bin/chromium: not found".into(), "auto: failed".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 个候选"));
        assert!(msg.contains("/usr/bin/chromium"));
    }

    #[test]
    fn test_rejection_classification() {
        assert!(ScrapeError::invalid_job("x").is_rejection());
        assert!(ScrapeError::AlreadyRunning {
            run_id: Uuid::new_v4()
        }
        .is_rejection());
        assert!(!ScrapeError::SessionNotInitialized.is_rejection());
    }
}
