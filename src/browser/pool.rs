//! 空闲页面池
//!
//! 只负责"存/取"，不认识浏览器；重置和关闭由 `BrowserSession` 负责。

use std::collections::VecDeque;

/// 有界的空闲页面池
#[derive(Debug)]
pub struct PagePool<P> {
    idle: VecDeque<P>,
    max_idle: usize,
}

impl<P> PagePool<P> {
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: VecDeque::with_capacity(max_idle),
            max_idle,
        }
    }

    /// 取出最早放回的空闲页面
    pub fn take(&mut self) -> Option<P> {
        self.idle.pop_front()
    }

    /// 放回页面；池已满时原样返回，由调用方关闭
    pub fn put(&mut self, page: P) -> Option<P> {
        if self.idle.len() < self.max_idle {
            self.idle.push_back(page);
            None
        } else {
            Some(page)
        }
    }

    /// 取出全部空闲页面（用于关闭会话）
    pub fn drain(&mut self) -> Vec<P> {
        self.idle.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.idle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idle.is_empty()
    }

    pub fn max_idle(&self) -> usize {
        self.max_idle
    }
}
