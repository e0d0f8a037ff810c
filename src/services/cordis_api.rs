//! Cordis Europa SPARQL 后端
//!
//! 不需要浏览器：直接查询出版物标题，候选结果的正文仍然走 HTTP 抓取

use crate::error::{Result, ScrapeError};
use crate::models::{SearchEngineKind, SearchResult, WorkItem};
use crate::services::backend::SearchBackend;
use crate::services::content_extractor::{ContentExtractor, PageContent};
use crate::services::search_engine::{build_result, RawHit};
use crate::services::text_processor::filter_stop_words;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const SPARQL_ENDPOINT: &str = "https://cordis.europa.eu/datalab/sparql";
const MAX_RESULTS: usize = 20;

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    #[serde(default)]
    bindings: Vec<SparqlBinding>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SparqlBinding {
    pub_title: Option<SparqlValue>,
    pub_url: Option<SparqlValue>,
    project_title: Option<SparqlValue>,
    project_desc: Option<SparqlValue>,
}

#[derive(Debug, Deserialize)]
struct SparqlValue {
    value: String,
}

/// Cordis SPARQL 搜索后端
pub struct CordisApiBackend {
    worker_id: usize,
    client: reqwest::Client,
    extractor: ContentExtractor,
}

impl CordisApiBackend {
    pub fn new(worker_id: usize, extractor: ContentExtractor, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            worker_id,
            client,
            extractor,
        })
    }

    async fn query(&self, term: &str) -> Result<Vec<RawHit>> {
        let response = self
            .client
            .post(SPARQL_ENDPOINT)
            .header(
                reqwest::header::ACCEPT,
                "application/sparql-results+json, application/json",
            )
            .form(&[("query", build_query(term, MAX_RESULTS))])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::search_failed(
                SearchEngineKind::CordisEuropaApi.display_name(),
                format!("HTTP {}", status),
            ));
        }

        let body: SparqlResponse = response.json().await?;
        Ok(parse_bindings(body))
    }
}

#[async_trait]
impl SearchBackend for CordisApiBackend {
    fn engine(&self) -> SearchEngineKind {
        SearchEngineKind::CordisEuropaApi
    }

    async fn search(&mut self, item: &WorkItem) -> Result<Vec<SearchResult>> {
        let term = filter_stop_words(item.descriptive_text());
        info!("[worker {}] 🔍 Cordis API 查询: {}", self.worker_id, term);

        let hits = self.query(&term).await?;
        debug!("[worker {}] Cordis API 返回 {} 条", self.worker_id, hits.len());

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let content = if hit.url.starts_with("http") {
                self.extractor.extract(None, &hit.url).await.ok()
            } else {
                None
            };
            let content = content.unwrap_or_else(|| {
                warn!("[worker {}] 没有可抓取的正文，使用摘要: {}", self.worker_id, hit.title);
                PageContent {
                    text: format!("{} {}", hit.title, hit.description),
                    lang: None,
                }
            });
            results.push(build_result(hit, &content));
        }
        Ok(results)
    }

    async fn shutdown(&mut self) {}
}

/// 按出版物标题包含查询词检索
fn build_query(term: &str, limit: usize) -> String {
    let escaped = term.to_lowercase().replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        r#"PREFIX eurio: <http://data.europa.eu/s66#>
SELECT ?pubTitle ?pubUrl ?projectTitle ?projectDesc WHERE {{
  ?pub a eurio:ProjectPublication .
  ?pub eurio:title ?pubTitle .
  OPTIONAL {{ ?pub eurio:hasDownloadURL ?pubUrl }}
  OPTIONAL {{
    ?pub eurio:hasProject ?proj .
    ?proj eurio:title ?projectTitle .
    OPTIONAL {{ ?proj eurio:description ?projectDesc }}
  }}
  FILTER(CONTAINS(LCASE(STR(?pubTitle)), "{}"))
}}
LIMIT {}"#,
        escaped, limit
    )
}

fn parse_bindings(response: SparqlResponse) -> Vec<RawHit> {
    response
        .results
        .bindings
        .into_iter()
        .filter_map(|binding| {
            let title = binding.pub_title.map(|v| v.value)?;
            let project_title = binding.project_title.map(|v| v.value).unwrap_or_default();
            let project_desc: String = binding
                .project_desc
                .map(|v| v.value.chars().take(200).collect())
                .unwrap_or_default();
            let url = binding
                .pub_url
                .map(|v| v.value)
                .unwrap_or_else(|| format!("cordis://{}", title));
            Some(RawHit {
                description: format!("Project: {}. {}", project_title, project_desc)
                    .trim()
                    .to_string(),
                title,
                url,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_escapes_term() {
        let query = build_query("Say \"Rice\"", 5);
        assert!(query.contains(r#"CONTAINS(LCASE(STR(?pubTitle)), "say \"rice\"")"#));
        assert!(query.ends_with("LIMIT 5"));
    }

    #[test]
    fn test_parse_bindings() {
        let json = serde_json::json!({
            "head": { "vars": ["pubTitle", "pubUrl"] },
            "results": { "bindings": [
                {
                    "pubTitle": { "type": "literal", "value": "Rice genomics" },
                    "pubUrl": { "type": "uri", "value": "https://example.org/rice.pdf" },
                    "projectTitle": { "type": "literal", "value": "RICE" }
                },
                { "pubTitle": { "type": "literal", "value": "No link" } },
                { "projectTitle": { "type": "literal", "value": "orphan" } }
            ]}
        });
        let response: SparqlResponse = serde_json::from_value(json).unwrap();
        let hits = parse_bindings(response);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://example.org/rice.pdf");
        assert_eq!(hits[0].description, "Project: RICE.");
        assert_eq!(hits[1].url, "cordis://No link");
    }
}
