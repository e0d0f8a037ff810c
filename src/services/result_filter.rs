//! 结果过滤
//!
//! 只按词数排除；关键词匹配只记录日志，不影响去留

use crate::models::{OmittedRecord, ResultRecord, SearchResult, WorkItem};
use crate::services::text_processor::{format_word_counts, keyword_occurrences};
use tracing::debug;

/// 过滤结论
#[derive(Debug, Clone, PartialEq)]
pub enum FilterDecision {
    Accept(ResultRecord),
    Omit(OmittedRecord),
}

/// 词数过滤器
#[derive(Debug, Clone)]
pub struct ResultFilter {
    min_words: usize,
}

impl ResultFilter {
    pub fn new(min_words: usize) -> Self {
        Self { min_words }
    }

    pub fn min_words(&self) -> usize {
        self.min_words
    }

    /// 判断一个搜索结果是接受还是省略
    pub fn classify(&self, item: &WorkItem, result: &SearchResult) -> FilterDecision {
        let keywords = keyword_occurrences(
            &format!("{} {}", result.title, result.description),
            item.descriptive_text(),
        );
        debug!(
            "[{}] {} → {}",
            item.code,
            result.url,
            format_word_counts(result.total_words, &keywords)
        );

        if result.total_words >= self.min_words {
            FilterDecision::Accept(ResultRecord::from_search(item, result))
        } else {
            FilterDecision::Omit(OmittedRecord::for_result(
                item,
                result,
                format!("low_word_count: {}", result.total_words),
            ))
        }
    }
}
