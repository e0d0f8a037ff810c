//! 运行状态：worker 状态、运行句柄、汇总

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Worker 生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Idle,
    Running,
    Completed,
    Failed,
    /// 收到 stop 信号后在条目边界退出
    Stopped,
}

impl WorkerStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkerStatus::Completed | WorkerStatus::Failed | WorkerStatus::Stopped
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerStatus::Idle => "idle",
            WorkerStatus::Running => "running",
            WorkerStatus::Completed => "completed",
            WorkerStatus::Failed => "failed",
            WorkerStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个 worker 的状态快照
///
/// 只有 worker 自己写；控制器只读
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerState {
    pub worker_id: usize,
    pub status: WorkerStatus,
    pub progress_percent: f64,
    pub processed_count: usize,
    pub total_items: usize,
    pub results_count: usize,
    pub omitted_count: usize,
    pub from_code: String,
    pub to_code: String,
    pub current_item: Option<String>,
    pub last_error: Option<String>,
}

impl WorkerState {
    pub fn idle(worker_id: usize, total_items: usize, from_code: &str, to_code: &str) -> Self {
        Self {
            worker_id,
            status: WorkerStatus::Idle,
            progress_percent: 0.0,
            processed_count: 0,
            total_items,
            results_count: 0,
            omitted_count: 0,
            from_code: from_code.to_string(),
            to_code: to_code.to_string(),
            current_item: None,
            last_error: None,
        }
    }

    /// 根据已处理数量重新计算进度
    pub fn record_progress(&mut self, processed: usize) {
        self.processed_count = processed;
        self.progress_percent = if self.total_items == 0 {
            100.0
        } else {
            processed as f64 * 100.0 / self.total_items as f64
        };
    }
}

/// `start()` 返回的运行句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RunHandle {
    pub run_id: Uuid,
}

impl fmt::Display for RunHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run {}", self.run_id)
    }
}

/// 所有 worker 状态的聚合
#[derive(Debug, Clone, Serialize)]
pub struct RunStatus {
    pub run_id: Uuid,
    pub overall_percent: f64,
    pub per_worker: Vec<WorkerState>,
    pub is_complete: bool,
    pub total_results: usize,
    pub total_omitted: usize,
}

impl RunStatus {
    pub fn aggregate(run_id: Uuid, per_worker: Vec<WorkerState>) -> Self {
        let overall_percent = if per_worker.is_empty() {
            100.0
        } else {
            per_worker.iter().map(|w| w.progress_percent).sum::<f64>() / per_worker.len() as f64
        };
        Self {
            run_id,
            overall_percent,
            is_complete: per_worker.iter().all(|w| w.status.is_terminal()),
            total_results: per_worker.iter().map(|w| w.results_count).sum(),
            total_omitted: per_worker.iter().map(|w| w.omitted_count).sum(),
            per_worker,
        }
    }

    pub fn failed_workers(&self) -> Vec<usize> {
        self.per_worker
            .iter()
            .filter(|w| w.status == WorkerStatus::Failed)
            .map(|w| w.worker_id)
            .collect()
    }
}

/// 一次运行的输出汇总
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub run_id: Uuid,
    pub total_results: usize,
    pub total_omitted: usize,
    pub file_paths: Vec<PathBuf>,
}
