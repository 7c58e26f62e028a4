//! Paginated results

use serde::ser::{Serialize, SerializeStruct, Serializer};

/// One page of a larger result set
///
/// `total` counts every matching row, ignoring pagination; everything else
/// (`total_pages`, `has_next`, …) is derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedResult<T> {
    items: Vec<T>,
    total: usize,
    page: u32,
    limit: u32,
}

impl<T> PaginatedResult<T> {
    pub fn new(items: Vec<T>, total: usize, page: u32, limit: u32) -> Self {
        Self {
            items,
            total,
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    pub fn empty(page: u32, limit: u32) -> Self {
        Self::new(Vec::new(), 0, page, limit)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.limit as usize)
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.limit as usize
    }

    pub fn has_next(&self) -> bool {
        (self.page as usize) < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn is_first_page(&self) -> bool {
        self.page == 1
    }

    pub fn is_last_page(&self) -> bool {
        (self.page as usize) >= self.total_pages()
    }

    /// Number of items on this page
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Project the items, keeping the paging figures
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}

impl<T> IntoIterator for PaginatedResult<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a PaginatedResult<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Serialize> Serialize for PaginatedResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PaginatedResult", 8)?;
        state.serialize_field("items", &self.items)?;
        state.serialize_field("total", &self.total)?;
        state.serialize_field("page", &self.page)?;
        state.serialize_field("limit", &self.limit)?;
        state.serialize_field("totalPages", &self.total_pages())?;
        state.serialize_field("offset", &self.offset())?;
        state.serialize_field("hasNext", &self.has_next())?;
        state.serialize_field("hasPrevious", &self.has_previous())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_arithmetic() {
        let result = PaginatedResult::new((0..20).collect::<Vec<_>>(), 127, 3, 20);
        assert_eq!(result.total_pages(), 7);
        assert_eq!(result.offset(), 40);
        assert!(result.has_previous());
        assert!(result.has_next());
        assert!(!result.is_first_page());
        assert!(!result.is_last_page());
        assert_eq!(result.len(), 20);
    }

    #[test]
    fn test_last_and_empty_pages() {
        let last = PaginatedResult::new(vec![1, 2, 3, 4, 5, 6, 7], 127, 7, 20);
        assert!(last.is_last_page());
        assert!(!last.has_next());

        let empty: PaginatedResult<i32> = PaginatedResult::empty(1, 20);
        assert!(empty.is_empty());
        assert_eq!(empty.total_pages(), 0);
        assert!(empty.is_first_page());
        assert!(empty.is_last_page());
        assert!(!empty.has_next());
        assert!(!empty.has_previous());
    }

    #[test]
    fn test_map_and_iterate() {
        let result = PaginatedResult::new(vec![1, 2, 3], 3, 1, 10);
        let doubled = result.map(|x| x * 2);
        assert_eq!(doubled.iter().copied().collect::<Vec<_>>(), vec![2, 4, 6]);
        assert_eq!(doubled.total(), 3);

        let sum: i32 = (&doubled).into_iter().sum();
        assert_eq!(sum, 12);
        assert_eq!(doubled.into_iter().count(), 3);
    }

    #[test]
    fn test_serialized_shape() {
        let result = PaginatedResult::new(vec!["a"], 21, 2, 20);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["totalPages"], 2);
        assert_eq!(json["hasPrevious"], true);
        assert_eq!(json["hasNext"], false);
        assert_eq!(json["items"][0], "a");
    }
}
