//! 浏览器搜索引擎 - 业务能力层
//!
//! ## 职责
//!
//! 用 worker 自己的 `BrowserSession` 打开搜索结果页，按引擎的选择器提取候选结果，
//! 再逐个抓取正文并统计词数。
//!
//! ## 翻页规则
//!
//! - 达到 `max_pages` 停止
//! - 连续 3 页没有结果停止
//! - 某一页没有新的 URL 停止
//! - DuckDuckGo 的 HTML 端点只有一页

use crate::browser::BrowserSession;
use crate::error::{Result, ScrapeError};
use crate::infrastructure::JsExecutor;
use crate::models::{SearchEngineKind, SearchResult, WorkItem};
use crate::services::backend::SearchBackend;
use crate::services::content_extractor::{primary_lang, ContentExtractor, PageContent};
use crate::services::text_processor::{count_all_words, description_with_fallback, filter_stop_words};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

const MAX_EMPTY_PAGES: usize = 3;
const SELECTOR_WAIT: Duration = Duration::from_secs(10);
const CORDIS_COOKIE_BUTTON: &str = "button.wt-ecl-cookie-consent-banner__accept-button";

const DUCKDUCKGO_JS: &str = r#"
Array.from(document.querySelectorAll('.result__body')).map(r => {
    const a = r.querySelector('h2.result__title a, a.result__a');
    const s = r.querySelector('.result__snippet');
    return a ? { title: a.innerText.trim(), url: a.href, description: s ? s.innerText.trim() : '' } : null;
}).filter(Boolean)
"#;

const GOOGLE_JS: &str = r#"
Array.from(document.querySelectorAll('#search a h3')).map(h3 => {
    const a = h3.closest('a');
    const block = h3.closest('div[data-hveid], div.g');
    const s = block ? block.querySelector('.VwiC3b, [data-sncf]') : null;
    return a && a.href ? { title: h3.innerText.trim(), url: a.href, description: s ? s.innerText.trim() : '' } : null;
}).filter(Boolean)
"#;

const CORDIS_JS: &str = r#"
Array.from(document.querySelectorAll('app-card-search')).map(card => {
    const a = card.querySelector('a.c-card-search__title');
    const d = card.querySelector('div.c-card-search__block');
    return a && a.href ? { title: a.innerText.trim(), url: a.href, description: d ? d.innerText.trim() : '' } : null;
}).filter(Boolean)
"#;

/// 结果页上提取到的原始条目
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RawHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
}

/// 引擎相关的页面规则
struct EngineProfile {
    result_selector: &'static str,
    extract_js: &'static str,
    paginated: bool,
    cookie_button: Option<&'static str>,
}

fn profile(kind: SearchEngineKind) -> EngineProfile {
    match kind {
        SearchEngineKind::DuckDuckGo => EngineProfile {
            result_selector: ".result__body",
            extract_js: DUCKDUCKGO_JS,
            paginated: false,
            cookie_button: None,
        },
        SearchEngineKind::Google => EngineProfile {
            result_selector: "#search",
            extract_js: GOOGLE_JS,
            paginated: true,
            cookie_button: None,
        },
        SearchEngineKind::CordisEuropa | SearchEngineKind::CordisEuropaApi => EngineProfile {
            result_selector: "app-card-search",
            extract_js: CORDIS_JS,
            paginated: true,
            cookie_button: Some(CORDIS_COOKIE_BUTTON),
        },
    }
}

/// 第 `page` 页（从 0 开始）的结果页地址
pub fn results_url(kind: SearchEngineKind, query: &str, page: usize) -> Result<String> {
    let google_start = (page * 10).to_string();
    let cordis_page = (page + 1).to_string();
    let url = match kind {
        SearchEngineKind::DuckDuckGo => {
            Url::parse_with_params("https://html.duckduckgo.com/html/", &[("q", query)])
        }
        SearchEngineKind::Google => Url::parse_with_params(
            "https://www.google.com/search",
            &[("q", query), ("start", google_start.as_str())],
        ),
        SearchEngineKind::CordisEuropa | SearchEngineKind::CordisEuropaApi => {
            Url::parse_with_params(
                "https://cordis.europa.eu/search",
                &[
                    ("q", query),
                    ("p", cordis_page.as_str()),
                    ("num", "10"),
                    ("srt", "Relevance:decreasing"),
                    ("archived", "true"),
                ],
            )
        }
    }
    .map_err(|e| ScrapeError::search_failed(kind.display_name(), format!("无效的查询地址: {}", e)))?;
    Ok(url.to_string())
}

/// 去掉搜索引擎的跳转包装（DuckDuckGo `uddg=`，Google `/url?q=`）
pub fn unwrap_redirect(raw: &str) -> String {
    let normalized = if raw.starts_with("//") {
        format!("https:{}", raw)
    } else {
        raw.to_string()
    };
    let Ok(url) = Url::parse(&normalized) else {
        return raw.to_string();
    };

    let key = match (url.host_str(), url.path()) {
        (Some(host), "/l/") if host.ends_with("duckduckgo.com") => "uddg",
        (Some(host), "/url") if host.contains("google.") => "q",
        _ => return normalized,
    };
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .unwrap_or(normalized)
}

/// 基于浏览器的搜索后端
pub struct BrowserSearchEngine {
    worker_id: usize,
    kind: SearchEngineKind,
    session: BrowserSession,
    extractor: ContentExtractor,
    max_pages: usize,
}

impl BrowserSearchEngine {
    /// `session` 必须已经初始化
    pub fn new(
        worker_id: usize,
        kind: SearchEngineKind,
        session: BrowserSession,
        extractor: ContentExtractor,
        max_pages: usize,
    ) -> Self {
        Self {
            worker_id,
            kind,
            session,
            extractor,
            max_pages: max_pages.max(1),
        }
    }

    /// 借出一个页面收集结果，无论成功失败都归还
    async fn collect_hits(&mut self, query: &str) -> Result<Vec<RawHit>> {
        let executor = JsExecutor::new(self.session.new_page().await?);
        let outcome = self.scrape_result_pages(&executor, query).await;
        self.session.release_page(executor.into_page()).await;
        outcome
    }

    async fn scrape_result_pages(&self, executor: &JsExecutor, query: &str) -> Result<Vec<RawHit>> {
        paginate(self.worker_id, self.kind, self.max_pages, |page_idx| {
            self.read_result_page(executor, query, page_idx)
        })
        .await
    }

    /// 打开第 `page_idx` 页并提取候选条目
    async fn read_result_page(
        &self,
        executor: &JsExecutor,
        query: &str,
        page_idx: usize,
    ) -> Result<Vec<RawHit>> {
        let profile = profile(self.kind);
        let url = results_url(self.kind, query, page_idx)?;
        debug!("[worker {}] 打开结果页 {}: {}", self.worker_id, page_idx + 1, url);
        self.session.goto(executor.page(), &url).await?;

        if page_idx == 0 {
            if let Some(button) = profile.cookie_button {
                if executor.click_if_present(button).await.unwrap_or(false) {
                    debug!("[worker {}] 已关闭 cookie 提示", self.worker_id);
                }
            }
        }

        let wait = SELECTOR_WAIT.min(self.session.navigation_timeout());
        if executor.wait_for_selector(profile.result_selector, wait).await? {
            executor.eval_as(profile.extract_js).await
        } else {
            Ok(Vec::new())
        }
    }
}

/// 按翻页规则逐页读取，合并去重后的候选条目
///
/// 第一页读取失败算搜索失败；之后的页失败只停止翻页，已收集的条目保留
async fn paginate<F, Fut>(
    worker_id: usize,
    kind: SearchEngineKind,
    max_pages: usize,
    mut read_page: F,
) -> Result<Vec<RawHit>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Vec<RawHit>>>,
{
    let paginated = profile(kind).paginated;
    let mut seen = HashSet::new();
    let mut hits = Vec::new();
    let mut empty_pages = 0;

    for page_idx in 0..max_pages {
        let page_hits = match read_page(page_idx).await {
            Ok(page_hits) => page_hits,
            Err(e) if page_idx == 0 => {
                return Err(ScrapeError::search_failed(kind.display_name(), e.to_string()));
            }
            Err(e) => {
                warn!("[worker {}] 第 {} 页读取失败，停止翻页: {}", worker_id, page_idx + 1, e);
                break;
            }
        };

        if page_hits.is_empty() {
            empty_pages += 1;
            if !paginated || empty_pages >= MAX_EMPTY_PAGES {
                break;
            }
            continue;
        }
        empty_pages = 0;

        let before = hits.len();
        for mut hit in page_hits {
            hit.url = unwrap_redirect(&hit.url);
            if hit.url.starts_with("http") && seen.insert(hit.url.clone()) {
                hits.push(hit);
            }
        }
        if hits.len() == before {
            debug!("[worker {}] 第 {} 页没有新结果，停止翻页", worker_id, page_idx + 1);
            break;
        }
        if !paginated {
            break;
        }
    }

    Ok(hits)
}

#[async_trait]
impl SearchBackend for BrowserSearchEngine {
    fn engine(&self) -> SearchEngineKind {
        self.kind
    }

    async fn search(&mut self, item: &WorkItem) -> Result<Vec<SearchResult>> {
        let query = filter_stop_words(item.descriptive_text());
        info!("[worker {}] 🔍 {} 搜索: {}", self.worker_id, self.kind, query);

        let hits = self.collect_hits(&query).await?;
        debug!("[worker {}] 找到 {} 个候选结果", self.worker_id, hits.len());

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let content = match self.extractor.extract(Some(&mut self.session), &hit.url).await {
                Ok(content) => content,
                Err(e) => {
                    warn!("[worker {}] 正文提取失败，使用摘要: {} ({})", self.worker_id, hit.url, e);
                    PageContent {
                        text: format!("{} {}", hit.title, hit.description),
                        lang: None,
                    }
                }
            };
            results.push(build_result(hit, &content));
        }

        Ok(results)
    }

    async fn shutdown(&mut self) {
        self.session.close().await;
    }
}

/// 由候选条目和正文构建搜索结果
pub fn build_result(hit: RawHit, content: &PageContent) -> SearchResult {
    SearchResult {
        description: description_with_fallback(&hit.description, &content.text),
        total_words: count_all_words(&content.text),
        lang: primary_lang(content.lang.as_deref()),
        title: hit.title,
        url: hit.url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cordis_url_pages_from_one() {
        let url = results_url(SearchEngineKind::CordisEuropa, "cultivo cereales", 0).unwrap();
        assert!(url.starts_with("https://cordis.europa.eu/search?q=cultivo+cereales&p=1"));
        assert!(url.contains("archived=true"));
    }

    #[test]
    fn test_google_url_offsets() {
        let url = results_url(SearchEngineKind::Google, "rice", 2).unwrap();
        assert!(url.ends_with("start=20"));
    }

    #[test]
    fn test_unwrap_redirect() {
        assert_eq!(
            unwrap_redirect("//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.org%2Fa&rut=x"),
            "https://example.org/a"
        );
        assert_eq!(
            unwrap_redirect("https://www.google.com/url?q=https://example.org/b&sa=U"),
            "https://example.org/b"
        );
        assert_eq!(unwrap_redirect("https://example.org/c"), "https://example.org/c");
    }

    #[test]
    fn test_build_result_counts_content_words() {
        let hit = RawHit {
            title: "Rice".into(),
            url: "https://example.org".into(),
            description: "short".into(),
        };
        let content = PageContent {
            text: "one two three".into(),
            lang: Some("es-ES".into()),
        };
        let result = build_result(hit, &content);
        assert_eq!(result.total_words, 3);
        assert_eq!(result.lang, "es");
        // 摘要太短，用正文开头代替
        assert_eq!(result.description, "one two three");
    }

    fn hit(url: &str) -> RawHit {
        RawHit {
            title: url.into(),
            url: url.into(),
            description: String::new(),
        }
    }

    fn scripted(
        pages: Vec<Result<Vec<RawHit>>>,
    ) -> (
        std::sync::Arc<std::sync::Mutex<usize>>,
        impl FnMut(usize) -> futures::future::Ready<Result<Vec<RawHit>>>,
    ) {
        let calls = std::sync::Arc::new(std::sync::Mutex::new(0));
        let counter = calls.clone();
        let mut pages = pages.into_iter();
        let read = move |_page_idx: usize| {
            *counter.lock().unwrap() += 1;
            futures::future::ready(pages.next().unwrap_or_else(|| Ok(Vec::new())))
        };
        (calls, read)
    }

    #[tokio::test]
    async fn test_later_page_failure_keeps_collected_hits() {
        let (calls, read) = scripted(vec![
            Ok(vec![hit("https://example.org/1"), hit("https://example.org/2")]),
            Ok(vec![hit("https://example.org/3")]),
            Err(ScrapeError::timeout("等待结果", 10)),
            Ok(vec![hit("https://example.org/4")]),
        ]);
        let hits = paginate(0, SearchEngineKind::Google, 5, read).await.unwrap();
        let urls: Vec<&str> = hits.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://example.org/1", "https://example.org/2", "https://example.org/3"]
        );
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_first_page_failure_is_search_error() {
        let (_, read) = scripted(vec![Err(ScrapeError::timeout("打开结果页", 30))]);
        let result = paginate(0, SearchEngineKind::CordisEuropa, 5, read).await;
        assert!(matches!(result, Err(ScrapeError::Search { .. })));
    }

    #[tokio::test]
    async fn test_pagination_stop_rules() {
        // 连续 3 个空页
        let (calls, read) = scripted(vec![
            Ok(vec![hit("https://example.org/1")]),
            Ok(Vec::new()),
            Ok(Vec::new()),
            Ok(Vec::new()),
            Ok(vec![hit("https://example.org/2")]),
        ]);
        let hits = paginate(0, SearchEngineKind::CordisEuropa, 10, read).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(*calls.lock().unwrap(), 4);

        // 没有新 URL
        let (calls, read) = scripted(vec![
            Ok(vec![hit("https://example.org/1")]),
            Ok(vec![hit("https://example.org/1")]),
            Ok(vec![hit("https://example.org/2")]),
        ]);
        let hits = paginate(0, SearchEngineKind::Google, 10, read).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(*calls.lock().unwrap(), 2);

        // DuckDuckGo 只读一页
        let (calls, read) = scripted(vec![
            Ok(vec![hit("//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.org%2Fa")]),
            Ok(vec![hit("https://example.org/b")]),
        ]);
        let hits = paginate(0, SearchEngineKind::DuckDuckGo, 10, read).await.unwrap();
        assert_eq!(hits[0].url, "https://example.org/a");
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
