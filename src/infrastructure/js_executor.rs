//! JS 执行器 - 基础设施层
//!
//! 持有一个从会话借出的页面，只暴露"执行 JS"的能力；用完后通过 `into_page()` 交还

use crate::error::{Result, ScrapeError};
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio::time::{sleep, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// JS 执行器
///
/// 职责：
/// - 持有借出的 Page
/// - 暴露 eval() 能力
/// - 不认识搜索引擎和结果记录
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 交还页面
    pub fn into_page(self) -> Page {
        self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 轮询直到选择器匹配到元素
    ///
    /// # 返回
    /// 超时前出现返回 `true`，否则 `false`
    pub async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let js = format!(
            "document.querySelectorAll({}).length",
            serde_json::to_string(selector)?
        );
        let deadline = Instant::now() + timeout;
        loop {
            let count: usize = self.eval_as(js.as_str()).await.unwrap_or(0);
            if count > 0 {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// 存在则点击（用于关闭 cookie 提示）
    pub async fn click_if_present(&self, selector: &str) -> Result<bool> {
        let js = format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; el.click(); return true; }})()",
            serde_json::to_string(selector)?
        );
        self.eval_as(js).await
    }

    /// 当前页面的可见文本和语言
    pub async fn visible_text(&self) -> Result<(String, Option<String>)> {
        #[derive(serde::Deserialize)]
        struct PageText {
            text: Option<String>,
            lang: Option<String>,
        }
        let page_text: PageText = self
            .eval_as(
                "({ text: document.body ? document.body.innerText : '', lang: document.documentElement.lang || null })",
            )
            .await?;
        let text = page_text
            .text
            .ok_or_else(|| ScrapeError::extraction_failed("<page>", "页面没有 body"))?;
        Ok((text, page_text.lang.filter(|l| !l.is_empty())))
    }
}
