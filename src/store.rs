use serde::Serialize;

use crate::error::StoreError;
use crate::models::{NewApplication, Record};

/// Ordering and size of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    /// `None` and `Some(0)` both mean "everything".
    pub limit: Option<usize>,
    pub descending: bool,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            limit: None,
            descending: true,
        }
    }
}

impl ListQuery {
    pub fn effective_limit(&self) -> Option<usize> {
        self.limit.filter(|&n| n > 0)
    }
}

pub const PAGE_SIZE: usize = 20;

/// One page of a listing of `total` items. Out-of-range pages clamp to the
/// last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub index: usize,
    pub count: usize,
    pub start: usize,
    pub end: usize,
}

impl Page {
    pub fn of(total: usize, index: usize) -> Self {
        let count = total.div_ceil(PAGE_SIZE).max(1);
        let index = index.min(count - 1);
        let start = index * PAGE_SIZE;
        let end = (start + PAGE_SIZE).min(total);
        Self {
            index,
            count,
            start,
            end,
        }
    }
}

/// Common capability of both backends.
pub trait RecordStore {
    /// Persists one application, returning the backend's document id if it
    /// assigns one.
    fn insert(&self, application: &NewApplication) -> Result<Option<String>, StoreError>;

    /// Fully populated records ordered by date per `query`, dates in display
    /// form.
    fn list(&self, query: &ListQuery) -> Result<Vec<Record>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    pub version: String,
    pub vendor: Option<String>,
}

/// A network backend that can identify itself.
pub trait RemoteStore: RecordStore {
    fn server_info(&self) -> Result<ServerInfo, StoreError>;
}
