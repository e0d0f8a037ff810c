//! 抓取控制器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个系统的入口，负责一次运行的切分、调度和状态汇总。
//!
//! ## 核心功能
//!
//! 1. **任务校验**：范围代码必须在课程表里且 from 不在 to 之后
//! 2. **范围切分**：按 worker 数切成连续区间（见 `partition`）
//! 3. **并发调度**：每个非空区间一个 `tokio::spawn` 的 worker
//! 4. **状态汇总**：只读各 worker 的 watch 通道，不阻塞
//! 5. **协作停止**：`CancellationToken`，worker 在条目之间响应
//!
//! ## 设计特点
//!
//! - **同一时间最多一个运行**：上一个运行未结束时 `start` 返回 `AlreadyRunning`
//! - **不持有浏览器**：会话由各 worker 自己创建
//! - **向下委托**：单个范围交给 `Worker`

use crate::config::ScraperConfig;
use crate::error::{Result, ScrapeError};
use crate::models::{
    CourseCatalog, Job, RunHandle, RunStatus, Summary, WorkerState, WorkerStatus,
};
use crate::orchestrator::partition::partition;
use crate::orchestrator::worker::Worker;
use crate::services::{BackendFactory, DefaultBackendFactory, ResultManager};
use crate::utils::logging::log_run_start;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

/// 当前运行
struct ActiveRun {
    handle: RunHandle,
    workers: Vec<watch::Receiver<WorkerState>>,
    cancel: CancellationToken,
    results: Arc<ResultManager>,
    tasks: Vec<JoinHandle<()>>,
}

impl ActiveRun {
    fn snapshot(&self) -> RunStatus {
        let per_worker = self.workers.iter().map(read_worker_state).collect();
        RunStatus::aggregate(self.handle.run_id, per_worker)
    }
}

/// 读取 worker 状态；发送端已经丢弃却不是终态，说明任务异常退出
fn read_worker_state(rx: &watch::Receiver<WorkerState>) -> WorkerState {
    let mut state = rx.borrow().clone();
    if !state.status.is_terminal() && rx.has_changed().is_err() {
        state.status = WorkerStatus::Failed;
        state
            .last_error
            .get_or_insert_with(|| "worker 任务异常退出".to_string());
    }
    state
}

/// 抓取控制器
pub struct ScraperController {
    config: Arc<ScraperConfig>,
    catalog: Arc<CourseCatalog>,
    factory: Arc<dyn BackendFactory>,
    active: Mutex<Option<ActiveRun>>,
}

impl ScraperController {
    /// 使用默认后端（浏览器 / Cordis API）
    pub fn new(config: ScraperConfig, catalog: CourseCatalog) -> Self {
        let config = Arc::new(config);
        let factory = Arc::new(DefaultBackendFactory::new(config.clone()));
        Self::with_factory(config, catalog, factory)
    }

    pub fn with_factory(
        config: Arc<ScraperConfig>,
        catalog: CourseCatalog,
        factory: Arc<dyn BackendFactory>,
    ) -> Self {
        Self {
            config,
            catalog: Arc::new(catalog),
            factory,
            active: Mutex::new(None),
        }
    }

    pub fn catalog(&self) -> &CourseCatalog {
        &self.catalog
    }

    /// 当前（或最近一次）运行的句柄
    pub fn current_run(&self) -> Option<RunHandle> {
        self.lock_active().as_ref().map(|run| run.handle)
    }

    /// 校验任务、切分范围并启动 worker
    ///
    /// # 返回
    /// 运行句柄；参数非法返回 `InvalidJob`，上一个运行未结束返回 `AlreadyRunning`
    pub fn start(&self, job: Job) -> Result<RunHandle> {
        let mut active = self.lock_active();
        if let Some(run) = active.as_ref() {
            if !run.snapshot().is_complete {
                return Err(ScrapeError::AlreadyRunning {
                    run_id: run.handle.run_id,
                });
            }
        }

        let items = self.catalog.select_range(&job.from_code, &job.to_code)?;
        let worker_count = job.worker_count.unwrap_or(self.config.worker_count).max(1);
        let ranges = partition(items.len(), worker_count);

        let handle = RunHandle {
            run_id: Uuid::new_v4(),
        };
        let results = Arc::new(ResultManager::new(
            handle.run_id,
            self.config.results_dir(),
            self.config.omitted_dir(),
            &job,
        )?);

        log_run_start(&job, items.len(), ranges.len());

        let job = Arc::new(job);
        let cancel = CancellationToken::new();
        let mut workers = Vec::with_capacity(ranges.len());
        let mut tasks = Vec::with_capacity(ranges.len());

        for range in &ranges {
            let slice = &items[range.start..range.end];
            let (from_code, to_code) = match (slice.first(), slice.last()) {
                (Some(first), Some(last)) => (first.code.as_str(), last.code.as_str()),
                _ => continue,
            };

            let (state_tx, state_rx) = watch::channel(WorkerState::idle(
                range.worker_id,
                slice.len(),
                from_code,
                to_code,
            ));
            let worker = Worker {
                id: range.worker_id,
                items: slice.to_vec(),
                job: job.clone(),
                factory: self.factory.clone(),
                sink: results.sink_for(range.worker_id, from_code, to_code),
                state: state_tx,
                cancel: cancel.clone(),
                item_delay: self.config.item_delay(),
                verbose_logging: self.config.verbose_logging,
            };

            info!(
                "[worker {}] 📋 分配范围 {} → {} ({} 个条目)",
                range.worker_id,
                from_code,
                to_code,
                slice.len()
            );
            workers.push(state_rx);
            tasks.push(tokio::spawn(worker.run()));
        }

        *active = Some(ActiveRun {
            handle,
            workers,
            cancel,
            results,
            tasks,
        });

        Ok(handle)
    }

    /// 非阻塞地汇总所有 worker 的状态
    pub fn status(&self, handle: &RunHandle) -> Result<RunStatus> {
        let active = self.lock_active();
        let run = Self::matching_run(&active, handle)?;
        Ok(run.snapshot())
    }

    /// 通知所有 worker 在当前条目结束后停止；没有活动运行时只记日志
    pub fn stop(&self, handle: &RunHandle) {
        let active = self.lock_active();
        match active.as_ref() {
            Some(run) if run.handle == *handle => {
                if run.snapshot().is_complete {
                    info!("{} 已经结束，无需停止", handle);
                } else if run.cancel.is_cancelled() {
                    info!("{} 已在停止中", handle);
                } else {
                    info!("⏹️ 正在停止 {}（当前条目完成后退出）", handle);
                    run.cancel.cancel();
                }
            }
            _ => info!("没有活动的运行 ({})，忽略停止请求", handle),
        }
    }

    /// 等待所有 worker 进入终态，返回最终状态
    pub async fn wait(&self, handle: &RunHandle) -> Result<RunStatus> {
        let (tasks, mut receivers) = {
            let mut active = self.lock_active();
            let run = match active.as_mut() {
                Some(run) if run.handle == *handle => run,
                _ => {
                    return Err(ScrapeError::UnknownRun {
                        run_id: handle.run_id,
                    })
                }
            };
            (std::mem::take(&mut run.tasks), run.workers.clone())
        };

        for task in tasks {
            if let Err(e) = task.await {
                error!("worker 任务异常: {}", e);
            }
        }
        for rx in receivers.iter_mut() {
            // 发送端丢弃也视为结束
            let _ = rx.wait_for(|s| s.status.is_terminal()).await;
        }

        self.status(handle)
    }

    /// 汇总结果文件和写入数量
    pub fn finalize(&self, handle: &RunHandle) -> Result<Summary> {
        let results = {
            let active = self.lock_active();
            Self::matching_run(&active, handle)?.results.clone()
        };
        results.finalize(handle.run_id)
    }

    fn matching_run<'a>(active: &'a Option<ActiveRun>, handle: &RunHandle) -> Result<&'a ActiveRun> {
        match active {
            Some(run) if run.handle == *handle => Ok(run),
            _ => Err(ScrapeError::UnknownRun {
                run_id: handle.run_id,
            }),
        }
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveRun>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
