pub mod reader;
pub mod request;

#[cfg(test)]
mod tests;

pub use reader::PaginatedReader;
pub use request::{Page, PageMeta, PageRequest, PageWindow};
