//! 搜索后端抽象
//!
//! worker 只认识 `SearchBackend`；真正的浏览器会话在 `BackendFactory::open`
//! 里、在 worker 自己的任务中创建，不会从控制器传过去。

use crate::browser::{default_candidates, BrowserSession, SessionOptions};
use crate::config::ScraperConfig;
use crate::error::Result;
use crate::models::{Job, SearchEngineKind, SearchResult, WorkItem};
use crate::services::content_extractor::ContentExtractor;
use crate::services::cordis_api::CordisApiBackend;
use crate::services::search_engine::BrowserSearchEngine;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// 单个 worker 独占的搜索后端
#[async_trait]
pub trait SearchBackend: Send {
    fn engine(&self) -> SearchEngineKind;

    /// 搜索一个条目，返回它的全部候选结果
    async fn search(&mut self, item: &WorkItem) -> Result<Vec<SearchResult>>;

    /// 释放浏览器等资源；可重复调用
    async fn shutdown(&mut self);
}

/// 为每个 worker 创建后端
#[async_trait]
pub trait BackendFactory: Send + Sync {
    async fn open(&self, worker_id: usize, job: &Job) -> Result<Box<dyn SearchBackend>>;
}

/// 默认工厂：浏览器引擎或 Cordis SPARQL 接口
pub struct DefaultBackendFactory {
    config: Arc<ScraperConfig>,
}

impl DefaultBackendFactory {
    pub fn new(config: Arc<ScraperConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BackendFactory for DefaultBackendFactory {
    async fn open(&self, worker_id: usize, job: &Job) -> Result<Box<dyn SearchBackend>> {
        let extractor = ContentExtractor::new(self.config.http_timeout())?;

        if !job.search_engine.needs_browser() {
            return Ok(Box::new(CordisApiBackend::new(
                worker_id,
                extractor,
                self.config.http_timeout(),
            )?));
        }

        if !job.is_headless {
            warn!("[worker {}] 忽略有界面模式请求，浏览器一律无头运行", worker_id);
        }

        let mut session = BrowserSession::new(
            worker_id,
            SessionOptions {
                candidates: default_candidates(&self.config),
                max_idle_pages: self.config.page_pool_size,
                launch_timeout: self.config.launch_timeout(),
                navigation_timeout: self.config.navigation_timeout(),
            },
        );
        if let Err(e) = session.initialize().await {
            // 清理临时用户目录
            session.close().await;
            return Err(e);
        }

        Ok(Box::new(BrowserSearchEngine::new(
            worker_id,
            job.search_engine,
            session,
            extractor,
            self.config.max_result_pages,
        )))
    }
}
