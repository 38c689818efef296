use garde::Validate;
use greenlight_dal::{filters::DEFAULT_PAGE_SIZE, Batch, Filters};
use greenlight_types::Validator;
use serde::{Deserialize, Serialize};

/// Raw listing parameters, only length checked here.
///
/// Values are parsed in [`ListQuery::into_listing`] so that malformed numbers
/// end up in the same error report as the other filter checks.
#[derive(Debug, Clone, Default, Validate, Deserialize)]
pub struct ListQuery {
    #[garde(length(max = 500))]
    pub title: Option<String>,
    #[garde(length(max = 500))]
    pub genres: Option<String>,
    #[garde(length(max = 20))]
    pub page: Option<String>,
    #[garde(length(max = 20))]
    pub page_size: Option<String>,
    #[garde(length(max = 100))]
    pub sort: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Listing {
    pub title: String,
    pub genres: Vec<String>,
    pub filters: Filters,
}

impl ListQuery {
    pub fn into_listing(
        self,
        sort_safe_list: &'static [&'static str],
        v: &mut Validator,
    ) -> Listing {
        let mut filters = Filters::new(sort_safe_list);
        filters.page = read_int(self.page, "page", 1, v);
        filters.page_size = read_int(self.page_size, "page_size", DEFAULT_PAGE_SIZE, v);
        if let Some(sort) = self.sort.filter(|s| !s.is_empty()) {
            filters.sort = sort;
        }

        Listing {
            title: self.title.unwrap_or_default(),
            genres: read_csv(self.genres),
            filters,
        }
    }
}

fn read_int(value: Option<String>, key: &str, default: i64, v: &mut Validator) -> i64 {
    match value.as_deref() {
        None | Some("") => default,
        Some(s) => s.parse().unwrap_or_else(|_| {
            v.add_error(key, "must be a valid integer value");
            default
        }),
    }
}

fn read_csv(value: Option<String>) -> Vec<String> {
    value
        .map(|csv| {
            csv.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub total_count: u64,
}

impl Metadata {
    pub fn from_batch<T>(batch: &Batch<T>) -> Self {
        if batch.limit < 1 {
            return Metadata {
                total_count: batch.total,
                ..Default::default()
            };
        }
        let total = i64::try_from(batch.total).unwrap_or(i64::MAX - batch.limit);
        Metadata {
            page: batch.offset / batch.limit + 1,
            page_size: batch.limit,
            total_pages: (total + batch.limit - 1) / batch.limit,
            total_count: batch.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use greenlight_dal::movie::MOVIE_SORT_SAFE_LIST;

    use super::*;

    fn query(page: Option<&str>, page_size: Option<&str>, sort: Option<&str>) -> ListQuery {
        ListQuery {
            page: page.map(String::from),
            page_size: page_size.map(String::from),
            sort: sort.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let mut v = Validator::new();
        let listing = ListQuery::default().into_listing(MOVIE_SORT_SAFE_LIST, &mut v);
        assert!(v.valid());
        assert_eq!(listing.title, "");
        assert!(listing.genres.is_empty());
        assert_eq!(listing.filters.page, 1);
        assert_eq!(listing.filters.page_size, 20);
        assert_eq!(listing.filters.sort, "id");
    }

    #[test]
    fn test_non_integer_values() {
        let mut v = Validator::new();
        let listing = query(Some("two"), Some("1.5"), Some("-year"))
            .into_listing(MOVIE_SORT_SAFE_LIST, &mut v);
        assert_eq!(v.errors()["page"], "must be a valid integer value");
        assert_eq!(v.errors()["page_size"], "must be a valid integer value");
        assert_eq!(listing.filters.page, 1);
        assert_eq!(listing.filters.page_size, 20);
        assert_eq!(listing.filters.sort, "-year");
    }

    #[test]
    fn test_range_checks_follow_parsing() {
        let mut v = Validator::new();
        let listing = query(Some("0"), Some("x"), Some(""))
            .into_listing(MOVIE_SORT_SAFE_LIST, &mut v);
        listing.filters.validate(&mut v);
        assert_eq!(v.errors()["page"], "must be greater than zero");
        assert_eq!(v.errors()["page_size"], "must be a valid integer value");
        assert!(!v.errors().contains_key("sort"));
    }

    #[test]
    fn test_genres_csv() {
        assert_eq!(read_csv(None), Vec::<String>::new());
        assert_eq!(read_csv(Some(String::new())), Vec::<String>::new());
        assert_eq!(
            read_csv(Some("crime, drama,,".to_string())),
            vec!["crime".to_string(), "drama".to_string()]
        );
    }

    #[test]
    fn test_garde_limits() {
        let long = ListQuery {
            title: Some("x".repeat(501)),
            ..Default::default()
        };
        assert!(long.validate().is_err());
        assert!(ListQuery::default().validate().is_ok());
    }

    #[test]
    fn test_metadata() {
        let batch = Batch {
            offset: 4,
            limit: 2,
            total: 5,
            rows: vec![5],
        };
        assert_eq!(
            Metadata::from_batch(&batch),
            Metadata {
                page: 3,
                page_size: 2,
                total_pages: 3,
                total_count: 5
            }
        );

        let empty: Batch<i32> = Batch {
            offset: 0,
            limit: 20,
            total: 0,
            rows: vec![],
        };
        let metadata = Metadata::from_batch(&empty);
        assert_eq!(metadata.total_pages, 0);
        assert_eq!(metadata.page, 1);
    }
}
