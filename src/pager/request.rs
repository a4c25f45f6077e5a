use serde::{Deserialize, Serialize};
use crate::constants::*;
use crate::error::{CatalogError, Result};
use crate::external_sort::{Product, SortKey};

/// A page query as it arrives from the shell. Numbers are signed so that out
/// of range values can be reported instead of failing to deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageRequest {
    pub page_number: i64,
    pub page_size: i64,
    #[serde(alias = "sortBy")]
    pub sort_key: String,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_number: DEFAULT_PAGE_NUMBER,
            page_size: DEFAULT_PAGE_SIZE,
            sort_key: DEFAULT_SORT_KEY.to_string(),
        }
    }
}

impl PageRequest {
    pub fn new(sort_key: impl Into<String>, page_number: i64, page_size: i64) -> Self {
        Self { page_number, page_size, sort_key: sort_key.into() }
    }

    /// Rejects non-positive page numbers and sizes, clamps the size to
    /// `MAX_PAGE_SIZE` and resolves the key (unknown keys become `id`).
    pub fn validate(&self) -> Result<PageWindow> {
        if self.page_number < 1 {
            return Err(CatalogError::invalid_argument(format!(
                "pageNumber must be at least 1, got {}",
                self.page_number
            )));
        }
        if self.page_size < 1 {
            return Err(CatalogError::invalid_argument(format!(
                "pageSize must be at least 1, got {}",
                self.page_size
            )));
        }

        let page_size = usize::try_from(self.page_size)
            .unwrap_or(usize::MAX)
            .min(MAX_PAGE_SIZE);
        let page_number = self.page_number;
        let skip = usize::try_from(page_number - 1)
            .unwrap_or(usize::MAX)
            .saturating_mul(page_size);

        Ok(PageWindow {
            key: SortKey::resolve(&self.sort_key),
            page_number,
            page_size,
            skip,
        })
    }
}

/// A validated request: which file, and which positions to collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub key: SortKey,
    pub page_number: i64,
    pub page_size: usize,
    pub skip: usize,
}

impl PageWindow {
    pub fn contains(&self, position: usize) -> bool {
        position >= self.skip && position - self.skip < self.page_size
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total_count: usize,
    pub page_number: i64,
    pub page_size: usize,
    pub total_pages: usize,
}

impl PageMeta {
    pub fn new(total_count: usize, page_number: i64, page_size: usize) -> Self {
        Self {
            total_count,
            page_number,
            page_size,
            total_pages: total_count.div_ceil(page_size.max(1)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub records: Vec<Product>,
    #[serde(flatten)]
    pub meta: PageMeta,
}
