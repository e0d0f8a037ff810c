//! 条目处理流程 - 流程层
//!
//! 核心职责：定义"一个条目"的完整处理流程
//!
//! 流程顺序：
//! 1. 搜索（后端错误 → 条目级省略 `search_error`）
//! 2. 没有结果 → 条目级省略 `no_results`
//! 3. 逐个结果：去重 → 词数过滤 → 写入 results / omitidos

use std::collections::HashSet;

use tracing::{debug, error, info, warn};

use crate::models::{OmittedRecord, WorkItem};
use crate::services::{FilterDecision, ResultFilter, ResultSink, SearchBackend};
use crate::utils::logging::truncate_text;
use crate::workflow::item_ctx::ItemCtx;

/// 单个条目的处理统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ItemOutcome {
    pub accepted: usize,
    pub omitted: usize,
    pub write_errors: usize,
}

/// 条目处理流程
///
/// - 编排搜索、过滤、写入
/// - 不持有浏览器，只通过 `SearchBackend` 使用它
/// - 记住本 worker 已写过的 (代码, 名称, URL)，重复的记为省略
pub struct ItemFlow {
    filter: ResultFilter,
    seen: HashSet<(String, String, String)>,
    verbose_logging: bool,
}

impl ItemFlow {
    pub fn new(min_words: usize, verbose_logging: bool) -> Self {
        Self {
            filter: ResultFilter::new(min_words),
            seen: HashSet::new(),
            verbose_logging,
        }
    }

    pub async fn run(
        &mut self,
        backend: &mut dyn SearchBackend,
        item: &WorkItem,
        ctx: &ItemCtx,
        sink: &ResultSink,
    ) -> ItemOutcome {
        let mut outcome = ItemOutcome::default();
        info!("{} 🔎 {}", ctx, truncate_text(&item.name, 60));

        // ========== 搜索 ==========
        let results = match backend.search(item).await {
            Ok(results) => results,
            Err(e) => {
                warn!("{} ⚠️ 搜索失败，记为省略: {}", ctx, e);
                let record = OmittedRecord::for_item(item, format!("search_error: {}", e));
                self.write_omitted(&record, ctx, sink, &mut outcome);
                return outcome;
            }
        };

        if results.is_empty() {
            info!("{} 没有搜索结果", ctx);
            self.write_omitted(&OmittedRecord::for_item(item, "no_results"), ctx, sink, &mut outcome);
            return outcome;
        }

        // ========== 逐个结果过滤 ==========
        for result in &results {
            let key = (item.code.clone(), item.name.clone(), result.url.clone());
            if !self.seen.insert(key) {
                debug!("{} 重复结果: {}", ctx, result.url);
                let record = OmittedRecord::for_result(item, result, "duplicate");
                self.write_omitted(&record, ctx, sink, &mut outcome);
                continue;
            }

            match self.filter.classify(item, result) {
                FilterDecision::Accept(record) => {
                    if self.verbose_logging {
                        debug!(
                            "{} ✓ {} ({} 词)",
                            ctx,
                            truncate_text(&record.title, 50),
                            record.total_words
                        );
                    }
                    match sink.append_result(&record) {
                        Ok(()) => outcome.accepted += 1,
                        Err(e) => {
                            error!("{} ❌ 写入结果失败: {}", ctx, e);
                            outcome.write_errors += 1;
                        }
                    }
                }
                FilterDecision::Omit(record) => {
                    self.write_omitted(&record, ctx, sink, &mut outcome);
                }
            }
        }

        info!(
            "{} ✓ 完成: 接受 {} | 省略 {} (共 {} 个结果)",
            ctx,
            outcome.accepted,
            outcome.omitted,
            results.len()
        );
        outcome
    }

    fn write_omitted(
        &self,
        record: &OmittedRecord,
        ctx: &ItemCtx,
        sink: &ResultSink,
        outcome: &mut ItemOutcome,
    ) {
        match sink.append_omitted(record) {
            Ok(()) => outcome.omitted += 1,
            Err(e) => {
                error!("{} ❌ 写入省略记录失败: {}", ctx, e);
                outcome.write_errors += 1;
            }
        }
    }
}
