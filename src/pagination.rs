use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

/// `?page=&page_size=` as sent by the client.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

fn default_page() -> i64 {
    1
}
fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE as i64
}

impl PageQuery {
    pub fn validate(self) -> Result<Pagination, AppError> {
        if self.page < 1 {
            return Err(AppError::bad_request("page must be at least 1"));
        }
        if !(1..=MAX_PAGE_SIZE as i64).contains(&self.page_size) {
            return Err(AppError::bad_request(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        // The offset of the last row on the page must fit.
        let in_range = (self.page - 1)
            .checked_mul(self.page_size)
            .and_then(|offset| offset.checked_add(self.page_size))
            .and_then(|end| usize::try_from(end).ok())
            .is_some();
        if !in_range {
            return Err(AppError::bad_request("page out of range"));
        }
        Ok(Pagination {
            page: self.page as usize,
            page_size: self.page_size as usize,
        })
    }
}

/// Validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
}

impl Pagination {
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> usize {
        self.page_size
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_items: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_items: usize, window: Pagination) -> Self {
        Self {
            items,
            total_items,
            page: window.page,
            page_size: window.page_size,
            total_pages: total_items.div_ceil(window.page_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_offsets() {
        let p = PageQuery::default().validate().unwrap();
        assert_eq!((p.page, p.page_size, p.offset()), (1, 10, 0));

        let p = PageQuery { page: 3, page_size: 25 }.validate().unwrap();
        assert_eq!(p.offset(), 50);
        assert_eq!(p.limit(), 25);
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(PageQuery { page: 0, page_size: 10 }.validate().is_err());
        assert!(PageQuery { page: 1, page_size: 0 }.validate().is_err());
        assert!(PageQuery { page: 1, page_size: 101 }.validate().is_err());
        assert!(PageQuery { page: 1, page_size: 100 }.validate().is_ok());
    }

    #[test]
    fn huge_page_is_rejected_not_overflowed() {
        let err = PageQuery { page: i64::MAX, page_size: 100 }.validate().unwrap_err();
        assert_eq!(err.message, "page out of range");

        let last = i64::MAX / 100;
        let p = PageQuery { page: last, page_size: 100 }.validate().unwrap();
        assert_eq!(p.offset(), (last as usize - 1) * 100);

        let raw = Pagination { page: usize::MAX, page_size: 100 };
        assert_eq!(raw.offset(), usize::MAX);
    }

    #[test]
    fn total_pages_rounds_up() {
        let window = Pagination { page: 1, page_size: 10 };
        assert_eq!(Page::<u8>::new(vec![], 0, window).total_pages, 0);
        assert_eq!(Page::<u8>::new(vec![], 10, window).total_pages, 1);
        assert_eq!(Page::<u8>::new(vec![], 11, window).total_pages, 2);
    }
}
