//! Pagination helper types for list endpoints

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

/// Page request parameters, sent as `?page=&limit=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageParams {
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub limit: u32,
}

impl PageParams {
    /// Zero values fall back to the defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_billing::PageParams;
    ///
    /// let params = PageParams::new(0, 25);
    /// assert_eq!(params.page, 1);
    /// assert_eq!(params.limit, 25);
    /// ```
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: if page == 0 { DEFAULT_PAGE } else { page },
            limit: if limit == 0 { DEFAULT_LIMIT } else { limit },
        }
    }

    /// Parses raw query values such as `?page=abc&limit=20`; anything that is
    /// not a positive number uses the default.
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |value: Option<&str>| {
            value
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(0)
        };
        Self::new(parse(page), parse(limit))
    }

    pub fn with_page(self, page: u32) -> Self {
        Self::new(page, self.limit)
    }

    /// Changing the page size starts over from the first page.
    pub fn with_limit(self, limit: u32) -> Self {
        Self::new(DEFAULT_PAGE, limit)
    }

    pub fn next(self) -> Self {
        self.with_page(self.page.saturating_add(1))
    }

    pub fn previous(self) -> Self {
        self.with_page(self.page.saturating_sub(1).max(DEFAULT_PAGE))
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ]
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// Total number of items across all pages
    pub total: u64,
    pub page: u32,
    pub last_page: u32,
    pub per_page: u32,
}

/// Paginated response containing items and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Paginated<T> {
    pub fn has_next(&self) -> bool {
        self.meta.page < self.meta.last_page
    }

    pub fn has_previous(&self) -> bool {
        self.meta.page > DEFAULT_PAGE
    }

    /// Map the items to a different type
    pub fn map<U, F>(self, f: F) -> Paginated<U>
    where
        F: FnMut(T) -> U,
    {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PageParams::default();
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 10);
        assert_eq!(PageParams::new(0, 0), params);
    }

    #[test]
    fn test_from_query_falls_back_on_garbage() {
        assert_eq!(PageParams::from_query(Some("3"), Some("20")), PageParams::new(3, 20));
        assert_eq!(PageParams::from_query(Some("abc"), None), PageParams::default());
        assert_eq!(PageParams::from_query(Some("-2"), Some("0")), PageParams::default());
    }

    #[test]
    fn test_changing_limit_resets_page() {
        let params = PageParams::new(4, 10).with_limit(50);
        assert_eq!(params, PageParams::new(1, 50));
    }

    #[test]
    fn test_navigation() {
        let params = PageParams::new(1, 10);
        assert_eq!(params.previous().page, 1);
        assert_eq!(params.next().page, 2);
        assert_eq!(params.next().next().previous().page, 2);
    }

    #[test]
    fn test_query_pairs() {
        assert_eq!(
            PageParams::new(2, 5).to_query(),
            vec![
                ("page".to_string(), "2".to_string()),
                ("limit".to_string(), "5".to_string())
            ]
        );
    }

    #[test]
    fn test_paginated_wire_format() {
        let page: Paginated<u32> = serde_json::from_value(serde_json::json!({
            "items": [1, 2, 3],
            "meta": { "total": 23, "page": 2, "lastPage": 3, "perPage": 10 }
        }))
        .unwrap();

        assert!(page.has_next());
        assert!(page.has_previous());
        assert_eq!(page.meta.last_page, 3);

        let doubled = page.map(|x| x * 2);
        assert_eq!(doubled.items, vec![2, 4, 6]);
        assert_eq!(doubled.meta.total, 23);
    }

    #[test]
    fn test_single_page() {
        let page = Paginated {
            items: vec!["a"],
            meta: PageMeta {
                total: 1,
                page: 1,
                last_page: 1,
                per_page: 10,
            },
        };
        assert!(!page.has_next());
        assert!(!page.has_previous());
    }
}
