//! # Europa Scraper
//!
//! 多 worker 的搜索与正文抓取编排器：把课程代码范围切分给一组 worker，
//! 每个 worker 用自己的无头浏览器搜索、提取、过滤，并把结果追加写入 CSV。
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `browser/` - 启动候选、页面池、`BrowserSession`（每个 worker 独占一个）
//! - `infrastructure/` - `JsExecutor`，持有借出的页面，只暴露 eval() 能力
//!
//! ### ② 业务能力层（Services）
//! - `BrowserSearchEngine` / `CordisApiBackend` - 搜索后端
//! - `ContentExtractor` - HTTP 优先、浏览器兜底的正文提取
//! - `ResultFilter` - 词数过滤，关键词只做提示
//! - `ResultManager` - 固定列 CSV 的并发安全追加
//!
//! ### ③ 流程层（Workflow）
//! - `ItemCtx` - 上下文封装（worker + 条目序号 + 代码）
//! - `ItemFlow` - 流程编排（search → 去重 → 过滤 → 写入）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/controller` - start / status / stop / wait / finalize
//! - `orchestrator/worker` - 单个范围的顺序处理
//! - `orchestrator/partition` - 确定性的范围切分

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::ScraperConfig;
pub use error::{Result, ScrapeError};
pub use models::{CourseCatalog, Job, JobRequest, OutputMode, RunHandle, RunStatus, SearchEngineKind, Summary};
pub use orchestrator::ScraperController;
pub use services::{BackendFactory, SearchBackend};
