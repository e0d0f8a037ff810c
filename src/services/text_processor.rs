//! 文本处理 - 业务能力层
//!
//! 查询词过滤、词数统计、关键词出现次数、描述清理。纯函数，不涉及浏览器和文件。

use phf::phf_set;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// 西班牙语和英语的介词、连词
static STOP_WORDS: phf::Set<&'static str> = phf_set! {
    "a", "ante", "bajo", "con", "contra", "de", "desde", "durante", "en", "entre",
    "hacia", "hasta", "mediante", "para", "por", "según", "sin", "sobre", "tras",
    "y", "e", "ni", "que", "o", "u", "pero", "mas", "aunque", "sino", "porque",
    "pues", "ya", "si", "el", "la", "los", "las", "del", "al",
    "the", "of", "and", "to", "in", "for", "with", "on", "at",
    "from", "by", "about", "as", "into", "like", "through", "after", "over", "between",
    "out", "against", "during", "without", "before", "under", "around", "among",
    "or", "but", "yet", "so", "nor", "if", "while", "because", "though", "although",
    "since", "unless", "than", "whether",
};

static WORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").unwrap());
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());
static WWW_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"www\.\S+").unwrap());
static URL_REF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s+(?:visita|visitar|ver en|ver|click|enlace|link|url|más en|más información en|leer más en)[:\s]+\S*$",
    )
    .unwrap()
});
static DOMAIN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\w+\.[a-zA-Z]{2,}(?:\.\w+)*(?:/\S*)?").unwrap());
static MULTI_SPACE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// 是否是停用词（大小写不敏感）
pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word.to_lowercase().as_str())
}

/// 去掉查询中的停用词；全部被去掉时返回原文
pub fn filter_stop_words(query: &str) -> String {
    let filtered: Vec<&str> = query
        .split_whitespace()
        .filter(|word| !is_stop_word(word))
        .collect();

    if filtered.is_empty() {
        query.trim().to_string()
    } else {
        filtered.join(" ")
    }
}

/// 按空白切分统计总词数
pub fn count_all_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// 小写后的有效词（排除停用词）
pub fn significant_words(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    WORD_PATTERN
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|word| !STOP_WORDS.contains(word))
        .map(str::to_string)
        .collect()
}

/// 统计查询中每个有效词（长度 > 2）在内容中的出现次数
///
/// 返回的键首字母大写，只包含出现过的词
pub fn keyword_occurrences(content: &str, search_term: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    if content.is_empty() || search_term.is_empty() {
        return counts;
    }

    let content_lower = content.to_lowercase();
    let mut words = significant_words(search_term);
    words.sort();
    words.dedup();

    for word in words.iter().filter(|w| w.chars().count() > 2) {
        let pattern = format!(r"\b{}\b", regex::escape(word));
        let Ok(re) = Regex::new(&pattern) else {
            tracing::warn!("关键词正则构建失败: {}", word);
            continue;
        };
        let count = re.find_iter(&content_lower).count();
        if count > 0 {
            counts.insert(capitalize(word), count);
        }
    }

    counts
}

/// 格式化为 `Total words: N | Kw: n | ...`
pub fn format_word_counts(total: usize, counts: &BTreeMap<String, usize>) -> String {
    let mut parts = vec![format!("Total words: {}", total)];
    parts.extend(counts.iter().map(|(word, n)| format!("{}: {}", word, n)));
    parts.join(" | ")
}

/// 去掉描述中的链接和多余空白
pub fn clean_description(text: &str) -> String {
    let cleaned = URL_PATTERN.replace_all(text, "");
    let cleaned = WWW_PATTERN.replace_all(&cleaned, "");
    let cleaned = URL_REF_PATTERN.replace_all(&cleaned, "");
    let cleaned = DOMAIN_PATTERN.replace_all(&cleaned, "");
    MULTI_SPACE_PATTERN
        .replace_all(&cleaned, " ")
        .trim()
        .to_string()
}

/// 描述过短时，用正文开头补充
pub fn description_with_fallback(description: &str, content: &str) -> String {
    let cleaned = clean_description(description);
    if cleaned.chars().count() >= 100 {
        return cleaned;
    }

    let preview: String = content.chars().take(1000).collect();
    let preview = clean_description(&preview);
    if preview.chars().count() > cleaned.chars().count() * 2 {
        preview
    } else {
        cleaned
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
