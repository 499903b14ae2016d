use std::str::FromStr;

use serde::Serialize;

pub const DEFAULT_PAGE_LIMIT: u64 = 20;
pub const MAX_PAGE_LIMIT: u64 = 200;

/// Validated page window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u64,
    pub offset: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

/// Column a list is ordered by. Rows that tie are ordered by id in the
/// same direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Name,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" => Ok(SortField::CreatedAt),
            "updated_at" => Ok(SortField::UpdatedAt),
            "name" => Ok(SortField::Name),
            other => Err(format!(
                "invalid sort_by '{}': expected created_at, updated_at or name",
                other
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(format!("invalid order '{}': expected asc or desc", s)),
        }
    }
}

/// Newest first unless the caller asks otherwise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sorting {
    pub field: SortField,
    pub order: SortOrder,
}

/// One page of records plus the size of the whole filtered set and the
/// window that produced it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, window: Pagination) -> Self {
        Self {
            items,
            total,
            limit: window.limit,
            offset: window.offset,
        }
    }

    pub fn empty(total: u64, window: Pagination) -> Self {
        Self::new(Vec::new(), total, window)
    }

    /// Offset a client passes to read the page after this one.
    pub fn next_offset(&self) -> u64 {
        self.offset + self.items.len() as u64
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_offset_advances_by_items_returned() {
        let window = Pagination { limit: 10, offset: 20 };
        let page = Page::new(vec![1, 2, 3], 23, window);
        assert_eq!(page.next_offset(), 23);
        assert_eq!(Page::<u8>::empty(5, window).next_offset(), 20);
    }

    #[test]
    fn test_sorting_parses_known_values() {
        assert_eq!("updated_at".parse::<SortField>().unwrap(), SortField::UpdatedAt);
        assert!("owner".parse::<SortField>().is_err());
        assert_eq!("ASC".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert!("up".parse::<SortOrder>().is_err());

        let sorting = Sorting::default();
        assert_eq!(sorting.field, SortField::CreatedAt);
        assert_eq!(sorting.order, SortOrder::Desc);
    }
}
