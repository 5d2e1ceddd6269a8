//! Pagination envelope for listing endpoints.
//!
//! ```text
//! { data: [...],
//!   pages: { current, prev, hasPrev, next, hasNext, total },
//!   items: { limit, begin, end, total } }
//! ```
//! Pages are 1-based. `prev`/`next` are `null` when there is no such page.
//! `begin`/`end` are 1-based item positions, both 0 on an empty page.

use serde::Serialize;

pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pages: Pages,
    pub items: Items,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pages {
    pub current: u64,
    pub prev: Option<u64>,
    pub has_prev: bool,
    pub next: Option<u64>,
    pub has_next: bool,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Items {
    pub limit: u64,
    pub begin: u64,
    pub end: u64,
    pub total: u64,
}

impl<T> Paginated<T> {
    /// Slice one page out of an already filtered and sorted collection.
    pub fn paginate(all: Vec<T>, page: Option<u64>, limit: Option<u64>) -> Self {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let current = page.unwrap_or(1).max(1);
        let total_items = all.len() as u64;
        let total_pages = total_items.div_ceil(limit).max(1);

        let offset = (current - 1).saturating_mul(limit);
        let data: Vec<T> = all
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit as usize)
            .collect();

        let (begin, end) = if data.is_empty() {
            (0, 0)
        } else {
            (offset + 1, offset + data.len() as u64)
        };

        let has_prev = current > 1;
        let has_next = current < total_pages;

        Self {
            data,
            pages: Pages {
                current,
                prev: has_prev.then(|| current - 1),
                has_prev,
                next: has_next.then(|| current + 1),
                has_next,
                total: total_pages,
            },
            items: Items {
                limit,
                begin,
                end,
                total: total_items,
            },
        }
    }
}
