//! 浏览器会话 - 基础设施层
//!
//! ## 职责
//!
//! 每个 worker 独占一个 `BrowserSession`：一个浏览器进程 + 一个有界的空闲页面池。
//!
//! ## 设计特点
//!
//! - **独占所有权**：会话不实现 `Clone`，由 worker 在自己的任务里创建，不跨 worker 传递
//! - **独立配置目录**：每个会话有自己的 user-data-dir，多个浏览器进程互不干扰
//! - **远程浏览器隔离**：连接到已运行的浏览器时，会话创建自己的 browser context，
//!   所有页面都开在里面，cookie 和存储不与其他 worker 共享；关闭时销毁
//! - **页面复用**：放回池里的页面在下次取出时重置为空白页、清空存储、重设请求头
//! - **关闭顺序**：先关页面，再关浏览器，最后停止事件循环

use crate::browser::launch::{launch_first_available, LaunchCandidate, LaunchedBrowser};
use crate::browser::pool::PagePool;
use crate::error::{Result, ScrapeError};
use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::Page;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

const BLANK_PAGE: &str = "about:blank";

const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
];

const CLEAR_STORAGE_JS: &str =
    "(() => { try { localStorage.clear(); sessionStorage.clear(); } catch (e) {} return true; })()";

/// 会话参数
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub candidates: Vec<LaunchCandidate>,
    pub max_idle_pages: usize,
    pub launch_timeout: Duration,
    pub navigation_timeout: Duration,
}

/// 单个 worker 的浏览器会话
pub struct BrowserSession {
    worker_id: usize,
    options: SessionOptions,
    profile_dir: PathBuf,
    browser: Option<LaunchedBrowser>,
    /// 只在远程浏览器上创建
    context: Option<BrowserContextId>,
    pool: PagePool<Page>,
    ua_cursor: usize,
}

impl BrowserSession {
    pub fn new(worker_id: usize, options: SessionOptions) -> Self {
        let profile_dir = std::env::temp_dir().join(format!(
            "europa_scraper_w{}_{}",
            worker_id,
            uuid::Uuid::new_v4().simple()
        ));
        let pool = PagePool::new(options.max_idle_pages);
        Self {
            worker_id,
            options,
            profile_dir,
            browser: None,
            context: None,
            pool,
            ua_cursor: worker_id,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.browser.is_some()
    }

    pub fn idle_pages(&self) -> usize {
        self.pool.len()
    }

    /// 本会话独占的 browser context（仅远程浏览器）
    pub fn browser_context(&self) -> Option<&BrowserContextId> {
        self.context.as_ref()
    }

    /// 按候选顺序启动浏览器；已初始化时直接返回
    pub async fn initialize(&mut self) -> Result<()> {
        if self.browser.is_some() {
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.profile_dir).await?;
        info!(
            "[worker {}] 🚀 启动浏览器会话 (候选 {} 个)",
            self.worker_id,
            self.options.candidates.len()
        );

        let launched = launch_first_available(
            &self.options.candidates,
            &self.profile_dir,
            self.options.launch_timeout,
        )
        .await?;

        if !launched.owned {
            match launched
                .browser
                .execute(CreateBrowserContextParams::default())
                .await
            {
                Ok(response) => {
                    debug!(
                        "[worker {}] 已创建独立 browser context: {:?}",
                        self.worker_id, response.result.browser_context_id
                    );
                    self.context = Some(response.result.browser_context_id);
                }
                Err(e) => {
                    launched.handler.abort();
                    return Err(e.into());
                }
            }
        }

        info!(
            "[worker {}] ✓ 浏览器就绪: {}",
            self.worker_id, launched.candidate
        );
        self.browser = Some(launched);
        Ok(())
    }

    /// 取一个干净的页面：优先复用池中页面，否则新建
    pub async fn new_page(&mut self) -> Result<Page> {
        if self.browser.is_none() {
            return Err(ScrapeError::SessionNotInitialized);
        }

        while let Some(page) = self.pool.take() {
            match self.reset_page(&page).await {
                Ok(()) => {
                    debug!("[worker {}] 复用空闲页面", self.worker_id);
                    return Ok(page);
                }
                Err(e) => {
                    debug!("[worker {}] 空闲页面重置失败，丢弃: {}", self.worker_id, e);
                    let _ = page.close().await;
                }
            }
        }

        let launched = self
            .browser
            .as_ref()
            .ok_or(ScrapeError::SessionNotInitialized)?;
        let page = launched
            .browser
            .new_page(page_target(self.context.as_ref()))
            .await?;
        self.apply_headers(&page).await?;
        debug!("[worker {}] 新建页面", self.worker_id);
        Ok(page)
    }

    /// 归还页面：池未满则放回，否则关闭。页面已关闭时静默忽略
    pub async fn release_page(&mut self, page: Page) {
        if self.browser.is_none() {
            let _ = page.close().await;
            return;
        }
        if let Some(overflow) = self.pool.put(page) {
            if let Err(e) = overflow.close().await {
                debug!("[worker {}] 关闭多余页面失败（忽略）: {}", self.worker_id, e);
            }
        }
    }

    /// 带超时的导航
    pub async fn goto(&self, page: &Page, url: &str) -> Result<()> {
        let timeout = self.options.navigation_timeout;
        match tokio::time::timeout(timeout, page.goto(url)).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(ScrapeError::timeout(format!("打开 {}", url), timeout.as_secs())),
        }
    }

    pub fn navigation_timeout(&self) -> Duration {
        self.options.navigation_timeout
    }

    /// 关闭池中页面、浏览器、事件循环；可重复调用
    pub async fn close(&mut self) {
        for page in self.pool.drain() {
            let _ = page.close().await;
        }

        if let Some(mut launched) = self.browser.take() {
            if let Some(context) = self.context.take() {
                if let Err(e) = launched
                    .browser
                    .execute(DisposeBrowserContextParams::new(context))
                    .await
                {
                    debug!("[worker {}] 销毁 browser context 失败（忽略）: {}", self.worker_id, e);
                }
            }
            if launched.owned {
                if let Err(e) = launched.browser.close().await {
                    warn!("[worker {}] 关闭浏览器失败: {}", self.worker_id, e);
                }
                let _ = launched.browser.wait().await;
            }
            launched.handler.abort();
            info!("[worker {}] 🔒 浏览器会话已关闭", self.worker_id);
        }

        if self.profile_dir.exists() {
            if let Err(e) = tokio::fs::remove_dir_all(&self.profile_dir).await {
                debug!("[worker {}] 清理配置目录失败（忽略）: {}", self.worker_id, e);
            }
        }
    }

    async fn reset_page(&mut self, page: &Page) -> Result<()> {
        self.goto(page, BLANK_PAGE).await?;
        page.evaluate(CLEAR_STORAGE_JS).await?;
        self.apply_headers(page).await
    }

    async fn apply_headers(&mut self, page: &Page) -> Result<()> {
        let user_agent = USER_AGENTS[self.ua_cursor % USER_AGENTS.len()];
        self.ua_cursor = self.ua_cursor.wrapping_add(1);
        let headers = Headers::new(json!({
            "User-Agent": user_agent,
            "Accept-Language": "es-ES,es;q=0.9,en;q=0.8",
        }));
        page.execute(SetExtraHttpHeadersParams::new(headers)).await?;
        Ok(())
    }
}

/// 新页面的创建参数；有独立 context 时页面开在里面
fn page_target(context: Option<&BrowserContextId>) -> CreateTargetParams {
    let mut params = CreateTargetParams::new(BLANK_PAGE);
    params.browser_context_id = context.cloned();
    params
}
