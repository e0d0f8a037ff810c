//! 编排层（Orchestration Layer）
//!
//! ## 层次关系
//!
//! ```text
//! controller (一次运行：切分 + 调度 + 汇总)
//!     ↓
//! worker (一个范围：顺序处理 Vec<WorkItem>)
//!     ↓
//! workflow::ItemFlow (单个 WorkItem)
//!     ↓
//! services (搜索 / 正文提取 / 过滤 / 写入)
//!     ↓
//! browser + infrastructure (BrowserSession / JsExecutor)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：浏览器会话只在 worker 的任务里创建和使用
//! 2. **只读汇总**：控制器通过 watch 通道读取 worker 状态，从不修改
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure

pub mod controller;
pub mod partition;
pub mod worker;

pub use controller::ScraperController;
pub use partition::partition;
pub use worker::Worker;
