//! Paging and ordering of listings.
//!
//! Sort tokens come straight from the query string, so they are only ever
//! turned into SQL after a membership check against a fixed safe list.

use greenlight_types::{validator::permitted, Validator};

use crate::Order;

pub const MAX_PAGE: i64 = 10_000_000;
pub const MAX_PAGE_SIZE: i64 = 20;
pub const DEFAULT_PAGE_SIZE: i64 = 20;
const FALLBACK_SORT_COLUMN: &str = "id";

#[derive(Debug, Clone)]
pub struct Filters {
    pub page: i64,
    pub page_size: i64,
    pub sort: String,
    /// Permitted sort values, descending variants must be listed with `-` prefix
    pub sort_safe_list: &'static [&'static str],
}

impl Filters {
    pub fn new(sort_safe_list: &'static [&'static str]) -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: FALLBACK_SORT_COLUMN.to_string(),
            sort_safe_list,
        }
    }

    pub fn validate(&self, v: &mut Validator) {
        v.check(self.page > 0, "page", "must be greater than zero");
        v.check(self.page <= MAX_PAGE, "page", "must be a maximum of 10 million");

        v.check(self.page_size > 0, "page_size", "must be greater than zero");
        v.check(
            self.page_size <= MAX_PAGE_SIZE,
            "page_size",
            "must be a maximum of 20",
        );

        v.check(
            permitted(self.sort.as_str(), self.sort_safe_list),
            "sort",
            "invalid sort value",
        );
    }

    fn is_descending(&self) -> bool {
        self.sort.starts_with('-')
    }

    /// Column to sort by, `id` if the requested sort is not permitted
    pub fn sort_column(&self) -> &str {
        if permitted(self.sort.as_str(), self.sort_safe_list) {
            self.sort.strip_prefix('-').unwrap_or(&self.sort)
        } else {
            FALLBACK_SORT_COLUMN
        }
    }

    pub fn sort_direction(&self) -> &'static str {
        if self.is_descending() { "DESC" } else { "ASC" }
    }

    pub fn order(&self) -> Order {
        let column = self.sort_column().to_string();
        if self.is_descending() {
            Order::Desc(column)
        } else {
            Order::Asc(column)
        }
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAFE_LIST: &[&str] = &["id", "title", "year", "-id", "-title", "-year"];

    fn filters(page: i64, page_size: i64, sort: &str) -> Filters {
        Filters {
            page,
            page_size,
            sort: sort.to_string(),
            sort_safe_list: SAFE_LIST,
        }
    }

    #[test]
    fn test_descending_sort() {
        let f = filters(1, 20, "-year");
        assert_eq!(f.sort_column(), "year");
        assert_eq!(f.sort_direction(), "DESC");
        assert_eq!(f.order(), Order::Desc("year".into()));
        assert_eq!(f.order().to_string(), "year DESC");
    }

    #[test]
    fn test_ascending_sort() {
        let f = filters(1, 20, "title");
        assert_eq!(f.sort_column(), "title");
        assert_eq!(f.sort_direction(), "ASC");
        assert_eq!(f.order().to_string(), "title ASC");
    }

    #[test]
    fn test_unknown_sort_falls_back_to_id() {
        let f = filters(1, 20, "unknown");
        let mut v = Validator::new();
        f.validate(&mut v);
        assert_eq!(v.errors()["sort"], "invalid sort value");
        assert_eq!(f.sort_column(), "id");
    }

    #[test]
    fn test_injection_is_not_passed_through() {
        let f = filters(1, 20, "-title; DROP TABLE movies");
        assert_eq!(f.sort_column(), "id");
        assert_eq!(f.order(), Order::Desc("id".into()));
    }

    #[test]
    fn test_descending_needs_prefixed_entry() {
        let f = Filters {
            page: 1,
            page_size: 10,
            sort: "-runtime".to_string(),
            sort_safe_list: &["runtime"],
        };
        let mut v = Validator::new();
        f.validate(&mut v);
        assert!(!v.valid());
        assert_eq!(f.sort_column(), "id");
    }

    #[test]
    fn test_paging_window() {
        let f = filters(1, 20, "id");
        assert_eq!((f.offset(), f.limit()), (0, 20));

        let f = filters(3, 10, "id");
        assert_eq!((f.offset(), f.limit()), (20, 10));
    }

    #[test]
    fn test_page_ranges() {
        let mut v = Validator::new();
        filters(0, 0, "id").validate(&mut v);
        assert_eq!(v.errors()["page"], "must be greater than zero");
        assert_eq!(v.errors()["page_size"], "must be greater than zero");

        let mut v = Validator::new();
        filters(MAX_PAGE + 1, 21, "id").validate(&mut v);
        assert_eq!(v.errors()["page"], "must be a maximum of 10 million");
        assert_eq!(v.errors()["page_size"], "must be a maximum of 20");

        let mut v = Validator::new();
        filters(MAX_PAGE, 20, "-id").validate(&mut v);
        assert!(v.valid());
    }

    #[test]
    fn test_defaults() {
        let f = Filters::new(SAFE_LIST);
        let mut v = Validator::new();
        f.validate(&mut v);
        assert!(v.valid());
        assert_eq!(f.order(), Order::Asc("id".into()));
    }
}
