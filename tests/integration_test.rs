use async_trait::async_trait;
use europa_scraper::models::{OutputMode, SearchResult, WorkItem, WorkerStatus};
use europa_scraper::utils::logging;
use europa_scraper::{
    BackendFactory, CourseCatalog, Job, ScrapeError, ScraperConfig, ScraperController,
    SearchBackend, SearchEngineKind,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

// ========== 测试用后端 ==========

struct FakeBackend {
    total_words: usize,
    gate: Option<Arc<Semaphore>>,
    entered: Option<Arc<Notify>>,
}

#[async_trait]
impl SearchBackend for FakeBackend {
    fn engine(&self) -> SearchEngineKind {
        SearchEngineKind::CordisEuropa
    }

    async fn search(&mut self, item: &WorkItem) -> europa_scraper::Result<Vec<SearchResult>> {
        if let Some(entered) = &self.entered {
            entered.notify_one();
        }
        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.map_err(|e| ScrapeError::search_failed("fake", e.to_string()))?;
            permit.forget();
        }
        Ok(vec![SearchResult {
            title: format!("Resultado {}", item.code),
            description: item.name.clone(),
            url: format!("https://cordis.europa.eu/project/{}", item.code),
            total_words: self.total_words,
            lang: "es".into(),
        }])
    }

    async fn shutdown(&mut self) {}
}

#[derive(Default)]
struct FakeFactory {
    total_words: usize,
    failing_worker: Option<usize>,
    gate: Option<Arc<Semaphore>>,
    entered: Option<Arc<Notify>>,
    opened: AtomicUsize,
}

#[async_trait]
impl BackendFactory for FakeFactory {
    async fn open(&self, worker_id: usize, _job: &Job) -> europa_scraper::Result<Box<dyn SearchBackend>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if self.failing_worker == Some(worker_id) {
            return Err(ScrapeError::BrowserUnavailable {
                attempts: vec![
                    "/usr/bin/chromium: 可执行文件不存在".into(),
                    "auto-detect: 未找到浏览器".into(),
                ],
            });
        }
        Ok(Box::new(FakeBackend {
            total_words: self.total_words,
            gate: self.gate.clone(),
            entered: self.entered.clone(),
        }))
    }
}

// ========== 辅助函数 ==========

fn catalog() -> CourseCatalog {
    CourseCatalog::new(vec![
        WorkItem::new("011901.1", "Cultivo de cereales"),
        WorkItem::new("011902.0", "Cultivo de legumbres"),
        WorkItem::new("011903.0", "Cultivo de semillas oleaginosas"),
        WorkItem::new("011904.0", "Cultivo de frutos secos"),
        WorkItem::new("011905.0", "Cultivo de hortalizas"),
    ])
}

fn config(dir: &Path) -> Arc<ScraperConfig> {
    Arc::new(ScraperConfig {
        worker_count: 4,
        output_dir: dir.to_path_buf(),
        item_delay_ms: 0,
        ..Default::default()
    })
}

fn job(mode: OutputMode, min_words: usize) -> Job {
    Job {
        from_code: "011901.1".into(),
        to_code: "011905.0".into(),
        search_engine: SearchEngineKind::CordisEuropa,
        is_headless: true,
        min_words,
        output_mode: mode,
        worker_count: Some(2),
    }
}

fn controller(dir: &Path, factory: Arc<FakeFactory>) -> ScraperController {
    ScraperController::with_factory(config(dir), catalog(), factory)
}

async fn wait_done(controller: &ScraperController, handle: &europa_scraper::RunHandle) -> europa_scraper::RunStatus {
    tokio::time::timeout(Duration::from_secs(10), controller.wait(handle))
        .await
        .expect("运行超时")
        .expect("等待失败")
}

// ========== 场景测试 ==========

#[tokio::test]
async fn test_five_items_two_workers_all_accepted() {
    let _ = tracing_subscriber::fmt::try_init();
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(FakeFactory {
        total_words: 50,
        ..Default::default()
    });
    let controller = controller(dir.path(), factory.clone());

    let handle = controller.start(job(OutputMode::PorCurso, 3)).unwrap();
    let status = wait_done(&controller, &handle).await;

    assert!(status.is_complete);
    assert_eq!(status.per_worker.len(), 2);
    assert_eq!(status.per_worker[0].total_items, 3);
    assert_eq!(status.per_worker[1].total_items, 2);
    assert_eq!(status.per_worker[0].from_code, "011901.1");
    assert_eq!(status.per_worker[1].to_code, "011905.0");
    assert!(status.per_worker.iter().all(|w| w.status == WorkerStatus::Completed));
    assert!((status.overall_percent - 100.0).abs() < f64::EPSILON);
    assert_eq!(factory.opened.load(Ordering::SeqCst), 2);

    let summary = controller.finalize(&handle).unwrap();
    assert_eq!(summary.total_results, 5);
    assert_eq!(summary.total_omitted, 0);
    // 每个 worker 一个结果文件
    assert_eq!(summary.file_paths.len(), 2);
    assert!(summary.file_paths.iter().all(|p| p.starts_with(dir.path().join("results"))));
    assert!(dir.path().join("omitidos").is_dir());
}

#[tokio::test]
async fn test_low_word_count_results_are_omitted() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(FakeFactory {
        total_words: 2,
        ..Default::default()
    });
    let controller = controller(dir.path(), factory);

    let handle = controller.start(job(OutputMode::Conglomerado, 3)).unwrap();
    let status = wait_done(&controller, &handle).await;
    assert_eq!(status.total_results, 0);
    assert_eq!(status.total_omitted, 5);

    let summary = controller.finalize(&handle).unwrap();
    assert_eq!(summary.total_results, 0);
    assert_eq!(summary.total_omitted, 5);
    assert_eq!(summary.file_paths.len(), 1);

    let content = std::fs::read_to_string(&summary.file_paths[0]).unwrap();
    assert_eq!(content.matches("low_word_count: 2").count(), 5);
}

#[tokio::test]
async fn test_conglomerado_shares_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(FakeFactory {
        total_words: 10,
        ..Default::default()
    });
    let controller = controller(dir.path(), factory);

    let handle = controller.start(job(OutputMode::Conglomerado, 1)).unwrap();
    wait_done(&controller, &handle).await;

    let summary = controller.finalize(&handle).unwrap();
    assert_eq!(summary.file_paths.len(), 1);
    let mut reader = csv::Reader::from_path(&summary.file_paths[0]).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(
        headers,
        vec!["sic_code", "course_name", "title", "description", "url", "total_words", "lang"]
    );
    assert_eq!(reader.records().count(), 5);
}

#[tokio::test]
async fn test_browser_unavailable_fails_only_that_worker() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(FakeFactory {
        total_words: 50,
        failing_worker: Some(0),
        ..Default::default()
    });
    let controller = controller(dir.path(), factory);

    let handle = controller.start(job(OutputMode::PorCurso, 3)).unwrap();
    let status = wait_done(&controller, &handle).await;

    assert!(status.is_complete);
    assert_eq!(status.per_worker[0].status, WorkerStatus::Failed);
    assert_eq!(status.per_worker[0].processed_count, 0);
    assert!(status.per_worker[0]
        .last_error
        .as_deref()
        .unwrap_or_default()
        .contains("没有可用的浏览器"));
    assert_eq!(status.per_worker[1].status, WorkerStatus::Completed);
    assert_eq!(status.failed_workers(), vec![0]);

    let summary = controller.finalize(&handle).unwrap();
    assert_eq!(summary.total_results, 2);
}

#[tokio::test]
async fn test_start_while_running_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let gate = Arc::new(Semaphore::new(0));
    let factory = Arc::new(FakeFactory {
        total_words: 50,
        gate: Some(gate.clone()),
        ..Default::default()
    });
    let controller = controller(dir.path(), factory.clone());

    let handle = controller.start(job(OutputMode::PorCurso, 3)).unwrap();
    let status = controller.status(&handle).unwrap();
    assert!(!status.is_complete);

    let second = controller.start(job(OutputMode::PorCurso, 3));
    match second {
        Err(ScrapeError::AlreadyRunning { run_id }) => assert_eq!(run_id, handle.run_id),
        other => panic!("expected AlreadyRunning, got {:?}", other.map(|h| h.run_id)),
    }
    assert_eq!(controller.status(&handle).unwrap().per_worker.len(), 2);

    // 放行全部条目后运行结束，可以开始新的运行
    gate.add_permits(5);
    wait_done(&controller, &handle).await;
    gate.add_permits(5);
    let next = controller.start(job(OutputMode::PorCurso, 3)).unwrap();
    assert_ne!(next.run_id, handle.run_id);
    wait_done(&controller, &next).await;
    assert!(matches!(
        controller.status(&handle),
        Err(ScrapeError::UnknownRun { .. })
    ));
}

#[tokio::test]
async fn test_stop_finishes_current_item() {
    let dir = tempfile::tempdir().unwrap();
    let gate = Arc::new(Semaphore::new(0));
    let entered = Arc::new(Notify::new());
    let factory = Arc::new(FakeFactory {
        total_words: 50,
        gate: Some(gate.clone()),
        entered: Some(entered.clone()),
        ..Default::default()
    });
    let controller = controller(dir.path(), factory);

    let mut single = job(OutputMode::PorCurso, 3);
    single.worker_count = Some(1);
    let handle = controller.start(single).unwrap();

    // worker 已经进入第一个条目的搜索
    tokio::time::timeout(Duration::from_secs(10), entered.notified())
        .await
        .expect("worker 没有开始处理条目");
    controller.stop(&handle);
    assert!(!controller.status(&handle).unwrap().is_complete);

    gate.add_permits(1);
    let status = wait_done(&controller, &handle).await;

    assert_eq!(status.per_worker.len(), 1);
    assert_eq!(status.per_worker[0].status, WorkerStatus::Stopped);
    assert_eq!(status.per_worker[0].processed_count, 1);
    assert_eq!(status.per_worker[0].total_items, 5);

    let summary = controller.finalize(&handle).unwrap();
    assert_eq!(summary.total_results, 1);
    assert_eq!(summary.total_omitted, 0);
}

#[tokio::test]
async fn test_stop_without_active_run_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let controller = controller(dir.path(), Arc::new(FakeFactory::default()));
    let handle = europa_scraper::RunHandle {
        run_id: uuid::Uuid::new_v4(),
    };
    controller.stop(&handle);
    controller.stop(&handle);
    assert!(controller.current_run().is_none());
}

#[tokio::test]
async fn test_invalid_range_rejected_before_spawn() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(FakeFactory::default());
    let controller = controller(dir.path(), factory.clone());

    let mut reversed = job(OutputMode::PorCurso, 3);
    reversed.from_code = "011905.0".into();
    reversed.to_code = "011901.1".into();
    assert!(matches!(controller.start(reversed), Err(ScrapeError::InvalidJob(_))));

    let mut unknown = job(OutputMode::PorCurso, 3);
    unknown.to_code = "999999.9".into();
    assert!(matches!(controller.start(unknown), Err(ScrapeError::InvalidJob(_))));

    tokio::task::yield_now().await;
    assert_eq!(factory.opened.load(Ordering::SeqCst), 0);
    assert!(controller.current_run().is_none());
}

// ========== 需要真实浏览器的测试 ==========

#[tokio::test]
#[ignore] // 默认忽略，需要本机浏览器和网络：cargo test -- --ignored
async fn test_real_duckduckgo_run() {
    logging::init();

    let dir = tempfile::tempdir().unwrap();
    let config = ScraperConfig {
        output_dir: dir.path().to_path_buf(),
        max_result_pages: 1,
        ..ScraperConfig::from_env()
    };
    let controller = ScraperController::new(config, catalog());

    let mut job = job(OutputMode::PorCurso, 10);
    job.search_engine = SearchEngineKind::DuckDuckGo;
    job.to_code = "011901.1".into();
    job.worker_count = Some(1);

    let handle = controller.start(job).expect("启动失败");
    let status = controller.wait(&handle).await.expect("等待失败");
    assert_eq!(status.per_worker[0].status, WorkerStatus::Completed);

    let summary = controller.finalize(&handle).expect("汇总失败");
    assert!(summary.total_results + summary.total_omitted > 0);
}
