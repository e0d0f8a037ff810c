//! 范围切分
//!
//! 总数按 worker 数向下取整，余数依次分给前面的 worker，每个多一个。
//! 结果连续、不重叠、保持原顺序，相同输入总是得到相同输出。

use crate::models::WorkRange;

/// 把 `total` 个条目切成最多 `worker_count` 段，空段不返回
pub fn partition(total: usize, worker_count: usize) -> Vec<WorkRange> {
    let workers = worker_count.max(1);
    let base = total / workers;
    let remainder = total % workers;

    let mut ranges = Vec::with_capacity(workers.min(total));
    let mut start = 0;
    for worker_id in 0..workers {
        let len = base + usize::from(worker_id < remainder);
        if len == 0 {
            break;
        }
        ranges.push(WorkRange {
            worker_id,
            start,
            end: start + len,
        });
        start += len;
    }
    ranges
}
