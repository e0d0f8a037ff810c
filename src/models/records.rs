//! 数据记录：工作条目、范围、搜索结果和落盘记录

use serde::{Deserialize, Serialize};
use std::fmt;

/// 结果 CSV 的固定列，顺序不可变
pub const RESULT_COLUMNS: [&str; 7] = [
    "sic_code",
    "course_name",
    "title",
    "description",
    "url",
    "total_words",
    "lang",
];

/// 省略记录 CSV 的固定列
pub const OMITTED_COLUMNS: [&str; 6] = [
    "sic_code",
    "course_name",
    "title",
    "url",
    "description",
    "omission_reason",
];

/// 一个待处理的 (代码, 名称) 条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub code: String,
    pub name: String,
}

impl WorkItem {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }

    /// 生成查询所用的描述文本（名称为空时退回代码）
    pub fn descriptive_text(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.code
        } else {
            &self.name
        }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.code, self.name)
    }
}

/// 分配给一个 worker 的连续区间 `[start, end)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkRange {
    pub worker_id: usize,
    pub start: usize,
    pub end: usize,
}

impl WorkRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// 从一个搜索结果页提取出的候选结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub description: String,
    pub url: String,
    pub total_words: usize,
    pub lang: String,
}

/// 通过过滤、写入 `results/` 的记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub sic_code: String,
    pub course_name: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub total_words: usize,
    pub lang: String,
}

impl ResultRecord {
    pub fn from_search(item: &WorkItem, result: &SearchResult) -> Self {
        Self {
            sic_code: item.code.clone(),
            course_name: item.name.clone(),
            title: result.title.clone(),
            description: result.description.clone(),
            url: result.url.clone(),
            total_words: result.total_words,
            lang: result.lang.clone(),
        }
    }
}

/// 没有产生可接受结果的记录，附带原因
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OmittedRecord {
    pub sic_code: String,
    pub course_name: String,
    pub title: String,
    pub url: String,
    pub description: String,
    pub omission_reason: String,
}

impl OmittedRecord {
    /// 条目级省略（没有具体的搜索结果）
    pub fn for_item(item: &WorkItem, reason: impl Into<String>) -> Self {
        Self {
            sic_code: item.code.clone(),
            course_name: item.name.clone(),
            title: String::new(),
            url: String::new(),
            description: String::new(),
            omission_reason: reason.into(),
        }
    }

    /// 某个具体搜索结果被省略
    pub fn for_result(item: &WorkItem, result: &SearchResult, reason: impl Into<String>) -> Self {
        Self {
            sic_code: item.code.clone(),
            course_name: item.name.clone(),
            title: result.title.clone(),
            url: result.url.clone(),
            description: result.description.clone(),
            omission_reason: reason.into(),
        }
    }
}
