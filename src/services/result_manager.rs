//! 结果写入服务 - 业务能力层
//!
//! ## 职责
//!
//! - `ResultSink`：一对 CSV（`results/` + `omitidos/`），只追加
//! - `ResultManager`：一次运行的所有 sink，按输出模式分配，最后汇总
//!
//! ## 写入协议
//!
//! 每条记录先投影到固定列、序列化成完整的行，再在文件锁内用 `O_APPEND`
//! 一次写入；文件为空时先写表头。多余字段直接丢弃。

use crate::error::{Result, ScrapeError};
use crate::models::{
    Job, OmittedRecord, OutputMode, Summary, OMITTED_COLUMNS, RESULT_COLUMNS,
};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};
use uuid::Uuid;

/// 只追加的 CSV 文件
#[derive(Debug)]
struct CsvAppender {
    path: PathBuf,
    columns: &'static [&'static str],
    lock: Mutex<()>,
    rows: AtomicUsize,
}

impl CsvAppender {
    fn new(path: PathBuf, columns: &'static [&'static str]) -> Self {
        Self {
            path,
            columns,
            lock: Mutex::new(()),
            rows: AtomicUsize::new(0),
        }
    }

    fn append<R: Serialize>(&self, record: &R) -> Result<()> {
        let value = serde_json::to_value(record)?;
        if !value.is_object() {
            return Err(ScrapeError::config(format!(
                "记录必须序列化为对象，实际是: {}",
                value
            )));
        }
        let row = project_row(&value, self.columns);

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = csv::Writer::from_writer(Vec::new());
        if needs_header {
            writer.write_record(self.columns)?;
        }
        writer.write_record(&row)?;
        let bytes = writer.into_inner().map_err(|e| e.into_error())?;

        file.write_all(&bytes)?;
        self.rows.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rows(&self) -> usize {
        self.rows.load(Ordering::SeqCst)
    }
}

/// 把任意记录投影到固定列，缺失的列写空字符串
pub fn project_row(value: &JsonValue, columns: &[&str]) -> Vec<String> {
    columns
        .iter()
        .map(|column| match value.get(*column) {
            None | Some(JsonValue::Null) => String::new(),
            Some(JsonValue::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        })
        .collect()
}

/// 一对结果/省略文件
#[derive(Debug)]
pub struct ResultSink {
    results: CsvAppender,
    omitted: CsvAppender,
}

impl ResultSink {
    pub fn new(results_path: PathBuf, omitted_path: PathBuf) -> Self {
        Self {
            results: CsvAppender::new(results_path, &RESULT_COLUMNS),
            omitted: CsvAppender::new(omitted_path, &OMITTED_COLUMNS),
        }
    }

    /// 追加一条结果；任何可序列化为对象的记录都可以，只保留七个固定列
    pub fn append_result<R: Serialize>(&self, record: &R) -> Result<()> {
        self.results.append(record)
    }

    pub fn append_omitted(&self, record: &OmittedRecord) -> Result<()> {
        self.omitted.append(record)
    }

    pub fn results_written(&self) -> usize {
        self.results.rows()
    }

    pub fn omitted_written(&self) -> usize {
        self.omitted.rows()
    }

    pub fn results_path(&self) -> &Path {
        &self.results.path
    }

    pub fn omitted_path(&self) -> &Path {
        &self.omitted.path
    }
}

/// 一次运行的结果管理
#[derive(Debug)]
pub struct ResultManager {
    run_id: Uuid,
    mode: OutputMode,
    results_dir: PathBuf,
    omitted_dir: PathBuf,
    engine_tag: &'static str,
    timestamp: String,
    shared: Option<Arc<ResultSink>>,
    sinks: Mutex<Vec<Arc<ResultSink>>>,
}

impl ResultManager {
    /// 创建输出目录；Conglomerado 模式下预先创建共享 sink
    pub fn new(run_id: Uuid, results_dir: PathBuf, omitted_dir: PathBuf, job: &Job) -> Result<Self> {
        std::fs::create_dir_all(&results_dir)?;
        std::fs::create_dir_all(&omitted_dir)?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let engine_tag = job.search_engine.file_tag();

        let mut sinks = Vec::new();
        let shared = match job.output_mode {
            OutputMode::Conglomerado => {
                let stem = format!(
                    "{}_to_{}_{}_{}",
                    sanitize(&job.from_code),
                    sanitize(&job.to_code),
                    engine_tag,
                    timestamp
                );
                let sink = Arc::new(sink_for_stem(&results_dir, &omitted_dir, &stem));
                sinks.push(sink.clone());
                Some(sink)
            }
            OutputMode::PorCurso => None,
        };

        info!(
            "📁 结果目录: {} | 省略目录: {}",
            results_dir.display(),
            omitted_dir.display()
        );

        Ok(Self {
            run_id,
            mode: job.output_mode,
            results_dir,
            omitted_dir,
            engine_tag,
            timestamp,
            shared,
            sinks: Mutex::new(sinks),
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// 为一个 worker 分配 sink：Por curso 各自独立，Conglomerado 共享
    pub fn sink_for(&self, worker_id: usize, from_code: &str, to_code: &str) -> Arc<ResultSink> {
        if let Some(shared) = &self.shared {
            return shared.clone();
        }

        let stem = format!(
            "{}_to_{}_{}_worker_{}_{}",
            sanitize(from_code),
            sanitize(to_code),
            self.engine_tag,
            worker_id,
            self.timestamp
        );
        let sink = Arc::new(sink_for_stem(&self.results_dir, &self.omitted_dir, &stem));
        debug!("[worker {}] 输出文件: {}", worker_id, sink.results_path().display());
        self.sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sink.clone());
        sink
    }

    /// 汇总本次运行的写入数量和已生成的文件；可重复调用
    pub fn finalize(&self, run_id: Uuid) -> Result<Summary> {
        if run_id != self.run_id {
            return Err(ScrapeError::UnknownRun { run_id });
        }

        let sinks = self.sinks.lock().unwrap_or_else(PoisonError::into_inner);
        let mut summary = Summary {
            run_id,
            total_results: 0,
            total_omitted: 0,
            file_paths: Vec::new(),
        };
        for sink in sinks.iter() {
            summary.total_results += sink.results_written();
            summary.total_omitted += sink.omitted_written();
            for path in [sink.results_path(), sink.omitted_path()] {
                if path.exists() {
                    summary.file_paths.push(path.to_path_buf());
                }
            }
        }
        Ok(summary)
    }
}

fn sink_for_stem(results_dir: &Path, omitted_dir: &Path, stem: &str) -> ResultSink {
    ResultSink::new(
        results_dir.join(format!("results_{}.csv", stem)),
        omitted_dir.join(format!("omitidos_{}.csv", stem)),
    )
}

/// 文件名里只保留字母数字、点和连字符
fn sanitize(code: &str) -> String {
    code.chars()
        .map(|c| if c.is_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}
