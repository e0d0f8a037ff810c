//! 正文提取服务 - 业务能力层
//!
//! 先用 HTTP 直接抓取并解析 HTML；失败或没有正文时再用浏览器打开。

use crate::browser::BrowserSession;
use crate::error::{Result, ScrapeError};
use crate::infrastructure::JsExecutor;
use crate::services::text_processor::count_all_words;
use scraper::{Html, Node};
use std::time::Duration;
use tracing::debug;

const SKIPPED_TAGS: [&str; 6] = ["script", "style", "noscript", "template", "head", "svg"];

const HTTP_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// 页面正文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub text: String,
    pub lang: Option<String>,
}

impl PageContent {
    pub fn word_count(&self) -> usize {
        count_all_words(&self.text)
    }
}

/// 正文提取服务
pub struct ContentExtractor {
    client: reqwest::Client,
}

impl ContentExtractor {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(HTTP_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// 提取正文：HTTP 优先，浏览器兜底
    ///
    /// # 参数
    /// - `session`: 没有浏览器会话时传 `None`，只走 HTTP
    /// - `url`: 目标地址
    pub async fn extract(
        &self,
        session: Option<&mut BrowserSession>,
        url: &str,
    ) -> Result<PageContent> {
        match self.fetch_http(url).await {
            Ok(content) => return Ok(content),
            Err(e) => debug!("HTTP 提取失败，改用浏览器: {} ({})", url, e),
        }

        match session {
            Some(session) => self.fetch_with_browser(session, url).await,
            None => Err(ScrapeError::extraction_failed(url, "HTTP 提取失败且没有浏览器会话")),
        }
    }

    /// 直接 HTTP 抓取并解析 HTML
    pub async fn fetch_http(&self, url: &str) -> Result<PageContent> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::extraction_failed(url, format!("HTTP {}", status)));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        if !content_type.is_empty() && !content_type.contains("html") && !content_type.contains("text")
        {
            return Err(ScrapeError::extraction_failed(
                url,
                format!("不支持的内容类型: {}", content_type),
            ));
        }

        let body = response.text().await?;
        let content = html_to_text(&body);
        if content.word_count() == 0 {
            return Err(ScrapeError::extraction_failed(url, "页面没有正文"));
        }
        Ok(content)
    }

    /// 用浏览器打开并读取 `innerText`，页面在任何情况下都会归还
    pub async fn fetch_with_browser(
        &self,
        session: &mut BrowserSession,
        url: &str,
    ) -> Result<PageContent> {
        let executor = JsExecutor::new(session.new_page().await?);

        let outcome = async {
            session.goto(executor.page(), url).await?;
            let (text, lang) = executor.visible_text().await?;
            Ok::<_, ScrapeError>(PageContent { text, lang })
        }
        .await;

        session.release_page(executor.into_page()).await;
        outcome
    }
}

/// 把 HTML 转成纯文本，跳过脚本和样式
pub fn html_to_text(html: &str) -> PageContent {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let lang = root
        .value()
        .attr("lang")
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());

    let mut parts: Vec<&str> = Vec::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let skipped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| SKIPPED_TAGS.contains(&el.name()))
        });
        if skipped {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }

    PageContent {
        text: parts.join(" "),
        lang,
    }
}

/// 取语言代码的主标签，如 `es-ES` → `es`
pub fn primary_lang(lang: Option<&str>) -> String {
    lang.and_then(|l| l.split(['-', '_']).next())
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| "en".to_string())
}
