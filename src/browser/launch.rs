//! 浏览器启动候选
//!
//! 按顺序尝试候选配置，第一个成功的就用；全部失败返回 `BrowserUnavailable`。
//! 无论调用方怎么要求，一律无头启动。

use crate::browser::connection::{connect_to_browser, spawn_handler};
use crate::config::ScraperConfig;
use crate::error::{Result, ScrapeError};
use chromiumoxide::{Browser, BrowserConfig};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 兼容受限/虚拟化环境的启动参数
pub const COMPAT_ARGS: [&str; 8] = [
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-software-rasterizer",
    "--no-first-run",
    "--no-zygote",
    "--disable-blink-features=AutomationControlled",
];

/// 常见的系统浏览器位置
const WELL_KNOWN_PATHS: [&str; 8] = [
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/snap/bin/chromium",
    "/opt/microsoft/msedge/msedge",
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

/// 一个启动候选
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchCandidate {
    /// 指定可执行文件
    Executable(PathBuf),
    /// 连接已经运行的浏览器；每个会话在其中使用自己的 browser context
    Remote(String),
    /// 交给 chromiumoxide 自动查找
    AutoDetect,
}

impl fmt::Display for LaunchCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchCandidate::Executable(path) => write!(f, "{}", path.display()),
            LaunchCandidate::Remote(url) => write!(f, "remote {}", url),
            LaunchCandidate::AutoDetect => write!(f, "auto-detect"),
        }
    }
}

/// 启动成功后的浏览器和它的事件循环
pub struct LaunchedBrowser {
    pub browser: Browser,
    pub handler: JoinHandle<()>,
    pub candidate: LaunchCandidate,
    /// 远程浏览器不归我们所有，关闭时只断开
    pub owned: bool,
}

/// 根据配置生成有序的候选列表
///
/// 顺序：配置里的可执行文件 → 远程调试地址 → 自动查找 → 常见系统路径
pub fn default_candidates(config: &ScraperConfig) -> Vec<LaunchCandidate> {
    let mut candidates: Vec<LaunchCandidate> = config
        .browser_executables
        .iter()
        .cloned()
        .map(LaunchCandidate::Executable)
        .collect();

    if let Some(url) = &config.browser_debug_url {
        candidates.push(LaunchCandidate::Remote(url.clone()));
    }

    candidates.push(LaunchCandidate::AutoDetect);

    for path in WELL_KNOWN_PATHS.iter().map(Path::new) {
        let candidate = LaunchCandidate::Executable(path.to_path_buf());
        if path.exists() && !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }

    candidates
}

/// 依次尝试候选，返回第一个成功启动的浏览器
///
/// # 参数
/// - `candidates`: 有序候选列表
/// - `user_data_dir`: 本 worker 独占的用户数据目录
/// - `timeout`: 单个候选的启动超时
pub async fn launch_first_available(
    candidates: &[LaunchCandidate],
    user_data_dir: &Path,
    timeout: Duration,
) -> Result<LaunchedBrowser> {
    let mut attempts = Vec::with_capacity(candidates.len());

    for (idx, candidate) in candidates.iter().enumerate() {
        debug!("尝试启动候选 {}/{}: {}", idx + 1, candidates.len(), candidate);
        match tokio::time::timeout(timeout, launch_candidate(candidate, user_data_dir, timeout))
            .await
        {
            Ok(Ok(launched)) => {
                info!("✅ 浏览器已启动: {}", candidate);
                return Ok(launched);
            }
            Ok(Err(e)) => {
                warn!("⚠️ 候选 {} 启动失败: {}", candidate, e);
                attempts.push(format!("{}: {}", candidate, e));
            }
            Err(_) => {
                warn!("⚠️ 候选 {} 启动超时 ({}s)", candidate, timeout.as_secs());
                attempts.push(format!("{}: 启动超时", candidate));
            }
        }
    }

    Err(ScrapeError::BrowserUnavailable { attempts })
}

async fn launch_candidate(
    candidate: &LaunchCandidate,
    user_data_dir: &Path,
    timeout: Duration,
) -> Result<LaunchedBrowser> {
    if let LaunchCandidate::Remote(url) = candidate {
        let (browser, handler) = connect_to_browser(url).await?;
        return Ok(LaunchedBrowser {
            browser,
            handler,
            candidate: candidate.clone(),
            owned: false,
        });
    }

    let mut builder = BrowserConfig::builder()
        .new_headless_mode()
        .no_sandbox()
        .args(COMPAT_ARGS)
        .user_data_dir(user_data_dir)
        .launch_timeout(timeout)
        .request_timeout(timeout);

    if let LaunchCandidate::Executable(path) = candidate {
        if !path.exists() {
            return Err(ScrapeError::config(format!("可执行文件不存在: {}", path.display())));
        }
        builder = builder.chrome_executable(path);
    }

    let browser_config = builder
        .build()
        .map_err(|e| ScrapeError::config(format!("配置无头浏览器失败: {}", e)))?;

    let (browser, handler) = Browser::launch(browser_config).await?;

    Ok(LaunchedBrowser {
        browser,
        handler: spawn_handler(handler),
        candidate: candidate.clone(),
        owned: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_order() {
        let config = ScraperConfig {
            browser_executables: vec![PathBuf::from("/opt/custom/chrome")],
            browser_debug_url: Some("http://localhost:9222".into()),
            ..Default::default()
        };
        let candidates = default_candidates(&config);
        assert_eq!(
            candidates[0],
            LaunchCandidate::Executable(PathBuf::from("/opt/custom/chrome"))
        );
        assert_eq!(
            candidates[1],
            LaunchCandidate::Remote("http://localhost:9222".into())
        );
        assert_eq!(candidates[2], LaunchCandidate::AutoDetect);
    }

    #[test]
    fn test_compat_args_disable_sandbox_and_gpu() {
        assert!(COMPAT_ARGS.contains(&"--no-sandbox"));
        assert!(COMPAT_ARGS.contains(&"--disable-gpu"));
    }

    #[tokio::test]
    async fn test_all_candidates_fail() {
        let dir = tempfile::tempdir().unwrap();
        let candidates = vec![
            LaunchCandidate::Executable(PathBuf::from("/nonexistent/chrome-a")),
            LaunchCandidate::Executable(PathBuf::from("/nonexistent/chrome-b")),
        ];
        let result =
            launch_first_available(&candidates, dir.path(), Duration::from_secs(5)).await;
        match result {
            Err(ScrapeError::BrowserUnavailable { attempts }) => assert_eq!(attempts.len(), 2),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("launch should fail"),
        }
    }
}
