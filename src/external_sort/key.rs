use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use crate::constants::*;
use crate::external_sort::record::Product;

/// The three orderings the catalog is materialized under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Id,
    Name,
    Price,
}

impl SortKey {
    pub const ALL: [SortKey; 3] = [SortKey::Id, SortKey::Name, SortKey::Price];

    /// Maps a requested key onto an ordering. Anything unrecognized falls back
    /// to `Id`; this is never an error.
    pub fn resolve(requested: &str) -> Self {
        match requested.trim().to_ascii_lowercase().as_str() {
            "name" => SortKey::Name,
            "price" => SortKey::Price,
            _ => SortKey::Id,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Id => "id",
            SortKey::Name => "name",
            SortKey::Price => "price",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            SortKey::Id => PRODUCTS_BY_ID_FILE,
            SortKey::Name => PRODUCTS_BY_NAME_FILE,
            SortKey::Price => PRODUCTS_BY_PRICE_FILE,
        }
    }

    /// Total order for this key.
    ///
    /// The leading fields are the documented ordering (id; name then id; price
    /// then id). Prices compare by value, so `2.5` and `2.50` tie and fall
    /// through to the id. The trailing fields only separate records that
    /// share those, ending with the price scale, so equal results mean
    /// byte-identical encodings.
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let ordering = match self {
            SortKey::Id => a
                .id
                .cmp(&b.id)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.price.numeric_cmp(&b.price)),
            SortKey::Name => a
                .name
                .cmp(&b.name)
                .then_with(|| a.id.cmp(&b.id))
                .then_with(|| a.price.numeric_cmp(&b.price)),
            SortKey::Price => a
                .price
                .numeric_cmp(&b.price)
                .then_with(|| a.id.cmp(&b.id))
                .then_with(|| a.name.cmp(&b.name)),
        };
        ordering.then_with(|| a.price.scale().cmp(&b.price.scale()))
    }
}

impl Default for SortKey {
    fn default() -> Self {
        SortKey::Id
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
