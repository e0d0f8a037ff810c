//! 课程参照表
//!
//! 从 CSV 加载 (代码, 名称) 列表。范围选择按表中的位置进行，而不是按字符串比较代码。

use crate::error::{Result, ScrapeError};
use crate::models::records::WorkItem;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

const CODE_HEADERS: [&str; 4] = ["sic_code", "codigo", "código", "code"];
const NAME_HEADERS: [&str; 5] = ["course_name", "curso", "course", "nombre", "name"];
const SEPARATORS: [u8; 3] = [b',', b';', b'|'];

/// 课程参照表
#[derive(Debug, Clone, Default)]
pub struct CourseCatalog {
    items: Vec<WorkItem>,
}

impl CourseCatalog {
    pub fn new(items: Vec<WorkItem>) -> Self {
        Self { items }
    }

    /// 从 CSV 文件加载
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            ScrapeError::config(format!("无法读取课程文件 {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_csv_str(&content)?;
        info!("📚 已加载 {} 个课程: {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// 解析 CSV 文本，自动识别分隔符和列名
    pub fn from_csv_str(content: &str) -> Result<Self> {
        let content = content.trim_start_matches('\u{feff}');
        let header_line = content.lines().next().unwrap_or_default();
        let delimiter = detect_separator(header_line);
        debug!("课程文件分隔符: '{}'", delimiter as char);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.to_lowercase())
            .collect();
        let code_idx = find_column(&headers, &CODE_HEADERS)
            .ok_or_else(|| ScrapeError::config(format!("课程文件缺少代码列: {:?}", headers)))?;
        let name_idx = find_column(&headers, &NAME_HEADERS)
            .ok_or_else(|| ScrapeError::config(format!("课程文件缺少名称列: {:?}", headers)))?;

        let mut items = Vec::new();
        for row in reader.records() {
            let row = row?;
            let code = row.get(code_idx).unwrap_or_default();
            if code.is_empty() {
                continue;
            }
            let name = row.get(name_idx).unwrap_or_default();
            items.push(WorkItem::new(code, name));
        }

        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn position(&self, code: &str) -> Option<usize> {
        self.items.iter().position(|item| item.code == code)
    }

    /// 选出 `[from_code, to_code]`（含两端）之间的条目
    ///
    /// 代码不存在，或 from 排在 to 之后，返回 `InvalidJob`
    pub fn select_range(&self, from_code: &str, to_code: &str) -> Result<&[WorkItem]> {
        let start = self
            .position(from_code)
            .ok_or_else(|| ScrapeError::invalid_job(format!("未知的起始代码: {}", from_code)))?;
        let end = self
            .position(to_code)
            .ok_or_else(|| ScrapeError::invalid_job(format!("未知的结束代码: {}", to_code)))?;
        if start > end {
            return Err(ScrapeError::invalid_job(format!(
                "起始代码 {} 排在结束代码 {} 之后",
                from_code, to_code
            )));
        }
        Ok(&self.items[start..=end])
    }
}

fn detect_separator(header_line: &str) -> u8 {
    SEPARATORS
        .iter()
        .copied()
        .max_by_key(|sep| header_line.bytes().filter(|b| b == sep).count())
        .filter(|sep| header_line.as_bytes().contains(sep))
        .unwrap_or(b',')
}

fn find_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| headers.iter().position(|h| h == alias))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEMICOLON_CSV: &str = "codigo;curso\n011901.1;Cultivo de cereales\n011902.0;Cultivo de legumbres\n011903.0;Cultivo de semillas oleaginosas\n";

    #[test]
    fn test_semicolon_with_spanish_headers() {
        let catalog = CourseCatalog::from_csv_str(SEMICOLON_CSV).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.items()[1].name, "Cultivo de legumbres");
    }

    #[test]
    fn test_comma_with_bom_and_english_headers() {
        let content = "\u{feff}sic_code,course_name\n011901.1,\"Growing of cereals, rice\"\n,skipped\n";
        let catalog = CourseCatalog::from_csv_str(content).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.items()[0].name, "Growing of cereals, rice");
    }

    #[test]
    fn test_select_range_is_positional_and_inclusive() {
        let catalog = CourseCatalog::from_csv_str(SEMICOLON_CSV).unwrap();
        let range = catalog.select_range("011902.0", "011903.0").unwrap();
        assert_eq!(range.len(), 2);
        assert_eq!(range[0].code, "011902.0");

        assert!(matches!(
            catalog.select_range("011903.0", "011901.1"),
            Err(ScrapeError::InvalidJob(_))
        ));
        assert!(matches!(
            catalog.select_range("999999.9", "011901.1"),
            Err(ScrapeError::InvalidJob(_))
        ));
    }

    #[test]
    fn test_load_pipe_separated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courses.csv");
        std::fs::write(&path, "sic_code|course\n011901.1|Cereales\n011902.0|Legumbres\n").unwrap();

        let catalog = tokio_test::block_on(CourseCatalog::load(&path)).unwrap();
        assert_eq!(catalog.position("011902.0"), Some(1));

        let missing = tokio_test::block_on(CourseCatalog::load(&dir.path().join("nope.csv")));
        assert!(matches!(missing, Err(ScrapeError::Config(_))));
    }

    #[test]
    fn test_missing_columns() {
        let result = CourseCatalog::from_csv_str("a,b\n1,2\n");
        assert!(matches!(result, Err(ScrapeError::Config(_))));
    }
}
