//! 条目处理上下文
//!
//! 封装"哪个 worker 正在处理第几个条目"这一信息

use std::fmt::Display;

/// 条目处理上下文
#[derive(Debug, Clone)]
pub struct ItemCtx {
    pub worker_id: usize,

    /// 条目在本 worker 范围内的序号（从1开始）
    pub item_index: usize,

    /// 本 worker 的条目总数
    pub total_items: usize,

    /// 条目代码
    pub code: String,
}

impl ItemCtx {
    pub fn new(worker_id: usize, item_index: usize, total_items: usize, code: String) -> Self {
        Self {
            worker_id,
            item_index,
            total_items,
            code,
        }
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[worker {} 条目 {}/{} 代码#{}]",
            self.worker_id, self.item_index, self.total_items, self.code
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let ctx = ItemCtx::new(1, 3, 10, "011901.1".into());
        assert_eq!(ctx.to_string(), "[worker 1 条目 3/10 代码#011901.1]");
    }
}
