use std::path::PathBuf;
use std::time::Duration;

/// 程序配置
///
/// 显式传入 `ScraperController`，worker 和浏览器会话内部不再读取环境变量
#[derive(Clone, Debug)]
pub struct ScraperConfig {
    /// 默认 worker 数量（任务未指定 num_workers 时使用）
    pub worker_count: usize,
    /// 输出根目录，`results/` 和 `omitidos/` 建在它下面
    pub output_dir: PathBuf,
    /// 优先尝试的浏览器可执行文件
    pub browser_executables: Vec<PathBuf>,
    /// 已经在运行的浏览器调试地址，例如 `http://localhost:9222`
    pub browser_debug_url: Option<String>,
    /// 每个会话最多缓存的空闲页面数
    pub page_pool_size: usize,
    /// 每个条目最多翻几页搜索结果
    pub max_result_pages: usize,
    pub navigation_timeout_secs: u64,
    pub launch_timeout_secs: u64,
    pub http_timeout_secs: u64,
    /// 两个条目之间的间隔
    pub item_delay_ms: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            worker_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            output_dir: PathBuf::from("."),
            browser_executables: Vec::new(),
            browser_debug_url: None,
            page_pool_size: 3,
            max_result_pages: 5,
            navigation_timeout_secs: 30,
            launch_timeout_secs: 30,
            http_timeout_secs: 20,
            item_delay_ms: 500,
            verbose_logging: false,
        }
    }
}

impl ScraperConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            worker_count: std::env::var("SCRAPER_WORKERS").ok().and_then(|v| v.parse().ok()).filter(|n| *n > 0).unwrap_or(default.worker_count),
            output_dir: std::env::var("OUTPUT_DIR").map(PathBuf::from).unwrap_or(default.output_dir),
            browser_executables: std::env::var_os("BROWSER_EXECUTABLES").map(|v| std::env::split_paths(&v).collect()).unwrap_or(default.browser_executables),
            browser_debug_url: std::env::var("BROWSER_DEBUG_URL").ok().filter(|v| !v.is_empty()).or(default.browser_debug_url),
            page_pool_size: std::env::var("PAGE_POOL_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.page_pool_size),
            max_result_pages: std::env::var("MAX_RESULT_PAGES").ok().and_then(|v| v.parse().ok()).filter(|n| *n > 0).unwrap_or(default.max_result_pages),
            navigation_timeout_secs: std::env::var("NAVIGATION_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.navigation_timeout_secs),
            launch_timeout_secs: std::env::var("LAUNCH_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.launch_timeout_secs),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.http_timeout_secs),
            item_delay_ms: std::env::var("ITEM_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.item_delay_ms),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }

    pub fn results_dir(&self) -> PathBuf {
        self.output_dir.join("results")
    }

    pub fn omitted_dir(&self) -> PathBuf {
        self.output_dir.join("omitidos")
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn launch_timeout(&self) -> Duration {
        Duration::from_secs(self.launch_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = ScraperConfig {
            output_dir: PathBuf::from("/tmp/run"),
            ..Default::default()
        };
        assert!(config.worker_count >= 1);
        assert_eq!(config.page_pool_size, 3);
        assert_eq!(config.results_dir(), PathBuf::from("/tmp/run/results"));
        assert_eq!(config.omitted_dir(), PathBuf::from("/tmp/run/omitidos"));
    }
}
