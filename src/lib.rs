// Sorter: raw catalog -> three sorted derivative files
pub mod external_sort;

// Paginated reads over the derivative files
pub mod pager;

pub mod config;
pub mod constants;
pub mod error;
pub mod service;
pub mod utils;

// Re-export main types for convenience
pub use config::Config;
pub use error::{CatalogError, Result};
pub use external_sort::{sort_catalog, CatalogSorter, Price, Product, SortKey, SortReport, SorterConfig};
pub use pager::{Page, PageMeta, PageRequest, PaginatedReader};
