//! Page arithmetic for listing routes.

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default page size of the public product listing.
pub const DEFAULT_PRODUCT_PAGE_SIZE: u32 = 12;

/// Default page size of the admin order listing.
pub const DEFAULT_ORDER_PAGE_SIZE: u32 = 20;

use crate::ValidationError;

/// Rejects an explicit `page` of 0 and a `limit` outside `1..=MAX_PAGE_SIZE`.
pub fn validate_page(page: Option<u32>, limit: Option<u32>) -> Result<(), ValidationError> {
    if page == Some(0) {
        return Err(ValidationError::invalid("page", "must be at least 1"));
    }
    if limit.is_some_and(|limit| !(1..=MAX_PAGE_SIZE).contains(&limit)) {
        return Err(ValidationError::invalid(
            "limit",
            format!("must be between 1 and {MAX_PAGE_SIZE}"),
        ));
    }
    Ok(())
}

/// A resolved, 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Page number, starting at 1.
    pub page: u32,
    /// Page size.
    pub limit: u32,
}

impl Page {
    /// Resolves optional query values, clamping page to at least 1 and limit
    /// to `1..=MAX_PAGE_SIZE`.
    pub fn resolve(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Number of records to skip.
    pub fn offset(&self) -> u32 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// `ceil(total / limit)`.
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.limit))
    }
}
