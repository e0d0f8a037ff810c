//! 单个 worker - 编排层
//!
//! ## 职责
//!
//! 按顺序处理分到的一段条目，是范围级别的编排器。
//!
//! ## 核心功能
//!
//! 1. **创建后端**：在自己的任务里打开浏览器会话和搜索引擎（失败即 failed，不处理任何条目）
//! 2. **顺序处理**：逐个条目交给 `ItemFlow`，没有内部并发
//! 3. **状态上报**：每个条目结束后通过 watch 通道发布 `WorkerState`
//! 4. **协作停止**：只在两个条目之间检查 stop 信号
//! 5. **资源释放**：先关闭后端，再标记终态

use crate::models::{Job, WorkItem, WorkerState, WorkerStatus};
use crate::services::{BackendFactory, ResultSink};
use crate::utils::logging::log_worker_complete;
use crate::workflow::{ItemCtx, ItemFlow};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// 单个 worker
pub struct Worker {
    pub id: usize,
    pub items: Vec<WorkItem>,
    pub job: Arc<Job>,
    pub factory: Arc<dyn BackendFactory>,
    pub sink: Arc<ResultSink>,
    pub state: watch::Sender<WorkerState>,
    pub cancel: CancellationToken,
    pub item_delay: Duration,
    pub verbose_logging: bool,
}

impl Worker {
    /// 处理整个范围，结束时状态一定是终态
    pub async fn run(self) {
        let total = self.items.len();
        self.state.send_modify(|s| s.status = WorkerStatus::Running);
        info!("[worker {}] ▶️ 开始处理 {} 个条目", self.id, total);

        // 浏览器会话在这里创建，只属于本 worker
        let mut backend = match self.factory.open(self.id, &self.job).await {
            Ok(backend) => backend,
            Err(e) => {
                error!("[worker {}] ❌ 初始化失败，本范围不处理: {}", self.id, e);
                self.state.send_modify(|s| {
                    s.status = WorkerStatus::Failed;
                    s.last_error = Some(e.to_string());
                });
                log_worker_complete(&self.state.borrow());
                return;
            }
        };

        let mut flow = ItemFlow::new(self.job.min_words, self.verbose_logging);
        let mut stopped = false;

        for (index, item) in self.items.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!("[worker {}] ⏹️ 收到停止信号，已处理 {}/{}", self.id, index, total);
                stopped = true;
                break;
            }

            self.state
                .send_modify(|s| s.current_item = Some(item.code.clone()));
            let ctx = ItemCtx::new(self.id, index + 1, total, item.code.clone());

            let outcome = flow.run(backend.as_mut(), item, &ctx, &self.sink).await;

            self.state.send_modify(|s| {
                s.record_progress(index + 1);
                s.results_count += outcome.accepted;
                s.omitted_count += outcome.omitted;
                if outcome.write_errors > 0 {
                    s.last_error = Some(format!("{} 写入失败 {} 次", item.code, outcome.write_errors));
                }
            });

            if index + 1 < total && !self.item_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.item_delay) => {}
                    _ = self.cancel.cancelled() => {}
                }
            }
        }

        backend.shutdown().await;

        self.state.send_modify(|s| {
            s.current_item = None;
            s.status = if stopped {
                WorkerStatus::Stopped
            } else {
                WorkerStatus::Completed
            };
        });
        log_worker_complete(&self.state.borrow());
    }
}
