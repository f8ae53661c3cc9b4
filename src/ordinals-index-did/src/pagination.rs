use candid::CandidType;
use serde::{Deserialize, Serialize};

/// Generic paginated response schema for every query which may return many results.
///
/// `total` is the number of all matching items, not only the returned page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, CandidType)]
pub struct PaginatedResp<T> {
    pub limit: u64,
    pub offset: u64,
    pub total: u64,
    pub results: Vec<T>,
}

impl<T> PaginatedResp<T> {
    /// Cuts the `[offset, offset + limit)` page out of an ordered sequence of `total` items.
    pub fn page<I>(items: I, total: u64, limit: u64, offset: u64) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let results = items
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect();

        Self {
            limit,
            offset,
            total,
            results,
        }
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_should_cut_page() {
        let page = PaginatedResp::page(0..42u64, 42, 10, 20);

        assert_eq!(page.total, 42);
        assert_eq!(page.results, (20..30).collect::<Vec<_>>());
    }

    #[test]
    fn test_should_return_empty_page_beyond_total() {
        let page = PaginatedResp::page(0..42u64, 42, 10, 100);

        assert_eq!(page.total, 42);
        assert!(page.results.is_empty());
    }

    #[test]
    fn test_should_not_wrap_huge_offset() {
        let page = PaginatedResp::page(0..42u64, 42, u64::MAX, u64::MAX);

        assert_eq!(page.offset, u64::MAX);
        assert_eq!(page.total, 42);
        assert!(page.results.is_empty());

        let page = PaginatedResp::page(0..42u64, 42, u64::MAX, 40);
        assert_eq!(page.results, vec![40, 41]);
    }

    #[test]
    fn test_should_serialize_wire_shape() {
        let page = PaginatedResp::page(vec!["a", "b"], 5, 2, 0);

        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "limit": 2, "offset": 0, "total": 5, "results": ["a", "b"] })
        );
    }
}
