pub mod catalog;

pub use catalog::CatalogSearch;

use crate::model::SearchResult;
use crate::prelude::SearchError;

/// Location search widget adapter.
pub trait LocationSearch {
    /// `Ok(None)` means the query was understood but matched nothing.
    fn search(&self, query: &str) -> Result<Option<SearchResult>, SearchError>;

    /// True when the widget moves the map camera itself after a result.
    fn drives_viewport(&self) -> bool {
        false
    }
}
