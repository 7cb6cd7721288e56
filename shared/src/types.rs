//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Pharmacy branch. The indoor dispensary and the retail pharmacy run
/// against the same store; every row and every API path is scoped by branch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    Indoor,
    #[default]
    Pharmacy,
}

impl Branch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Branch::Indoor => "indoor",
            Branch::Pharmacy => "pharmacy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "indoor" => Some(Branch::Indoor),
            "pharmacy" => Some(Branch::Pharmacy),
            _ => None,
        }
    }
}

/// Pagination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub fn offset(&self) -> i64 {
        (self.page.max(1) as i64 - 1) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page.clamp(1, 100) as i64
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl PaginationMeta {
    pub fn new(pagination: &Pagination, total_items: u64) -> Self {
        let per_page = pagination.limit() as u32;
        Self {
            page: pagination.page.max(1),
            per_page,
            total_items,
            total_pages: ((total_items + per_page as u64 - 1) / per_page as u64) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_round_trip() {
        assert_eq!(Branch::parse("indoor"), Some(Branch::Indoor));
        assert_eq!(Branch::parse("pharmacy"), Some(Branch::Pharmacy));
        assert_eq!(Branch::parse("warehouse"), None);
        assert_eq!(Branch::Indoor.as_str(), "indoor");
    }

    #[test]
    fn test_pagination_offset() {
        let p = Pagination {
            page: 3,
            per_page: 20,
        };
        assert_eq!(p.offset(), 40);
        assert_eq!(p.limit(), 20);
    }

    #[test]
    fn test_pagination_limit_clamped() {
        let p = Pagination {
            page: 0,
            per_page: 500,
        };
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 100);
    }

    #[test]
    fn test_pagination_meta() {
        let p = Pagination {
            page: 1,
            per_page: 20,
        };
        let meta = PaginationMeta::new(&p, 45);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(meta.total_items, 45);
    }
}
