use std::fmt;

use serde::Serialize;

/// Windows at or below this many pages list every page.
const FULL_WINDOW_MAX: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "page")]
pub enum PageLabel {
    Page(u32),
    Ellipsis,
}

impl fmt::Display for PageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageLabel::Page(n) => write!(f, "{n}"),
            PageLabel::Ellipsis => f.write_str("..."),
        }
    }
}

/// Compact page-link sequence for a 1-based `current_page` out of
/// `total_pages`.
///
/// `total_pages == 0` gives an empty window and `current_page` is clamped
/// into `[1, total_pages]` first.
pub fn compute_window(current_page: u32, total_pages: u32) -> Vec<PageLabel> {
    use PageLabel::{Ellipsis, Page};

    if total_pages <= FULL_WINDOW_MAX {
        return (1..=total_pages).map(Page).collect();
    }

    let current = current_page.clamp(1, total_pages);
    let total = total_pages;

    if current <= 3 {
        vec![Page(1), Page(2), Page(3), Page(4), Ellipsis, Page(total)]
    } else if current >= total - 2 {
        vec![
            Page(1),
            Ellipsis,
            Page(total - 3),
            Page(total - 2),
            Page(total - 1),
            Page(total),
        ]
    } else {
        vec![
            Page(1),
            Ellipsis,
            Page(current - 1),
            Page(current),
            Page(current + 1),
            Ellipsis,
            Page(total),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageNav {
    pub target: u32,
    pub disabled: bool,
}

/// Current position in a server-paged list plus the previous/next
/// affordances. Navigation targets always land inside `[1, total_pages]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    current: u32,
    total: u32,
}

impl Pager {
    pub fn new(current_page: u32, total_pages: u32) -> Self {
        Self {
            current: current_page.clamp(1, total_pages.max(1)),
            total: total_pages,
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn window(&self) -> Vec<PageLabel> {
        compute_window(self.current, self.total)
    }

    pub fn is_current(&self, page: u32) -> bool {
        page == self.current
    }

    pub fn previous(&self) -> PageNav {
        PageNav {
            target: self.clamp(self.current.saturating_sub(1)),
            disabled: self.current <= 1,
        }
    }

    pub fn next(&self) -> PageNav {
        PageNav {
            target: self.clamp(self.current.saturating_add(1)),
            disabled: self.current >= self.total,
        }
    }

    fn clamp(&self, page: u32) -> u32 {
        page.clamp(1, self.total.max(1))
    }
}

/// Number of pages needed to show `total_items` at `page_size` per page.
pub fn page_count(total_items: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = total_items.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Offset/limit pair for fetching one 1-based page from a remote list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub offset: u64,
    pub limit: u32,
}

impl PageRequest {
    pub fn for_page(page: u32, limit: u32) -> Self {
        let page = page.max(1);
        Self {
            offset: u64::from(page - 1) * u64::from(limit),
            limit,
        }
    }
}

/// Reads a `?page=` value. Anything missing, unparsable or zero is page 1.
pub fn parse_page_param(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|page| *page >= 1)
        .unwrap_or(1)
}

pub fn page_href(base_url: &str, page: u32) -> String {
    format!("{base_url}?page={page}")
}
