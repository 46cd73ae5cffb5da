//! Listing contract shared by every collection endpoint: page/page_size
//! pagination plus optional column sort.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 200;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ListParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: None,
            sort_order: None,
        }
    }
}

impl ListParams {
    /// Clamp the page size and convert to an offset/limit pair.
    pub fn to_offset_limit(&self) -> (u64, u64) {
        let page = self.page.max(1);
        let page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        ((page - 1) * page_size, page_size)
    }
}

/// One page of a listing plus the unpaged total.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, params: &ListParams) -> Self {
        let (_, page_size) = params.to_offset_limit();
        Self {
            items,
            total,
            page: params.page.max(1),
            page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_limit() {
        let params = ListParams {
            page: 3,
            page_size: 25,
            sort_by: None,
            sort_order: None,
        };
        assert_eq!(params.to_offset_limit(), (50, 25));
    }

    #[test]
    fn test_page_size_is_clamped() {
        let params = ListParams {
            page: 1,
            page_size: 100_000,
            sort_by: None,
            sort_order: None,
        };
        assert_eq!(params.to_offset_limit(), (0, MAX_PAGE_SIZE));
    }

    #[test]
    fn test_zero_page_treated_as_first() {
        let params = ListParams {
            page: 0,
            page_size: 10,
            sort_by: None,
            sort_order: None,
        };
        assert_eq!(params.to_offset_limit(), (0, 10));
    }
}
