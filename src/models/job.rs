//! 任务参数
//!
//! `JobRequest` 是边界上的原始输入（字段名与 `POST /start_scraping` 一致，
//! 拒绝未知字段），`Job` 是校验后的不可变任务。

use crate::error::{Result, ScrapeError};
use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 支持的搜索后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchEngineKind {
    CordisEuropa,
    CordisEuropaApi,
    DuckDuckGo,
    Google,
}

/// 名称（小写）到搜索后端的映射
static ENGINE_NAMES: phf::Map<&'static str, SearchEngineKind> = phf_map! {
    "cordis europa" => SearchEngineKind::CordisEuropa,
    "cordis" => SearchEngineKind::CordisEuropa,
    "cordis europa api" => SearchEngineKind::CordisEuropaApi,
    "cordis api" => SearchEngineKind::CordisEuropaApi,
    "duckduckgo" => SearchEngineKind::DuckDuckGo,
    "google" => SearchEngineKind::Google,
};

impl SearchEngineKind {
    /// 按名称查找（忽略大小写和首尾空白）
    pub fn from_name(name: &str) -> Option<Self> {
        ENGINE_NAMES.get(name.trim().to_lowercase().as_str()).copied()
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SearchEngineKind::CordisEuropa => "Cordis Europa",
            SearchEngineKind::CordisEuropaApi => "Cordis Europa API",
            SearchEngineKind::DuckDuckGo => "DuckDuckGo",
            SearchEngineKind::Google => "Google",
        }
    }

    /// 用于文件名的短标签
    pub fn file_tag(&self) -> &'static str {
        match self {
            SearchEngineKind::CordisEuropa => "cordis",
            SearchEngineKind::CordisEuropaApi => "cordis_api",
            SearchEngineKind::DuckDuckGo => "duckduckgo",
            SearchEngineKind::Google => "google",
        }
    }

    /// 是否需要浏览器会话
    pub fn needs_browser(&self) -> bool {
        !matches!(self, SearchEngineKind::CordisEuropaApi)
    }
}

impl fmt::Display for SearchEngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// 结果输出模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputMode {
    /// 每个 worker 范围一个文件
    #[default]
    #[serde(rename = "Por curso")]
    PorCurso,
    /// 所有 worker 共享一个文件
    #[serde(rename = "Conglomerado")]
    Conglomerado,
}

fn default_headless() -> bool {
    true
}

/// 边界输入：原样反序列化，不做校验
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct JobRequest {
    pub from_sic: String,
    pub to_sic: String,
    pub search_engine: String,
    #[serde(default = "default_headless")]
    pub is_headless: bool,
    #[serde(default)]
    pub min_words: i64,
    #[serde(default)]
    pub results_output_mode: OutputMode,
    #[serde(default)]
    pub num_workers: Option<usize>,
}

/// 校验后的任务，接受后不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub from_code: String,
    pub to_code: String,
    pub search_engine: SearchEngineKind,
    pub is_headless: bool,
    pub min_words: usize,
    pub output_mode: OutputMode,
    pub worker_count: Option<usize>,
}

impl Job {
    /// 从 TOML 文本解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let request: JobRequest = toml::from_str(content)?;
        Job::try_from(request)
    }
}

impl TryFrom<JobRequest> for Job {
    type Error = ScrapeError;

    fn try_from(request: JobRequest) -> Result<Self> {
        let from_code = request.from_sic.trim().to_string();
        let to_code = request.to_sic.trim().to_string();
        if from_code.is_empty() || to_code.is_empty() {
            return Err(ScrapeError::invalid_job("from_sic 和 to_sic 不能为空"));
        }

        let search_engine = SearchEngineKind::from_name(&request.search_engine).ok_or_else(|| {
            ScrapeError::invalid_job(format!("不支持的搜索引擎: {}", request.search_engine))
        })?;

        let min_words = usize::try_from(request.min_words).map_err(|_| {
            ScrapeError::invalid_job(format!("min_words 必须 >= 0，实际为 {}", request.min_words))
        })?;

        if request.num_workers == Some(0) {
            return Err(ScrapeError::invalid_job("num_workers 必须 >= 1"));
        }

        Ok(Job {
            from_code,
            to_code,
            search_engine,
            is_headless: request.is_headless,
            min_words,
            output_mode: request.results_output_mode,
            worker_count: request.num_workers,
        })
    }
}
