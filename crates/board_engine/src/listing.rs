use std::fmt;
use std::sync::Arc;

use board_core::{RowDecoder, TerminationPolicy, YearInference};
use url::Url;

/// Pager convention of older boards: the current page is a `strong.active`
/// and a following page link means there is more.
pub const ACTIVE_SIBLING_PAGER: &str = "strong.active + a.p-page__link";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("invalid selector {selector:?}: {message}")]
    Selector { selector: String, message: String },
    #[error("source {0} has no page parameter but a multi-page pager")]
    PagerWithoutPageParam(String),
}

/// Where the rows of a listing page are and how they split into cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowLayout {
    /// Rows matched by `rows`; cells are the row's direct `td` children.
    Table { rows: String },
    /// Items matched by `items`; cell `i` is the first match of `cells[i]`
    /// inside the item (or the item's own element), empty when absent.
    Cards { items: String, cells: Vec<String> },
}

/// How a page signals that another page follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pager {
    /// The listing is one page; never fetch a second.
    SinglePage,
    /// Another page exists while this selector matches.
    NextLink(String),
    /// No pager to probe; pages are read until one comes back empty.
    UntilEmpty,
}

/// One board, immutable for the run.
#[derive(Clone)]
pub struct ListingSource {
    pub id: String,
    pub category: String,
    /// List endpoint. Relative links in rows resolve against it.
    pub url: Url,
    /// Base query parameters sent with every page.
    pub params: Vec<(String, String)>,
    /// Query parameter carrying the 1-based page index.
    pub page_param: Option<String>,
    pub layout: RowLayout,
    pub pager: Pager,
    /// Element whose presence marks a fully rendered listing.
    pub ready_marker: Option<String>,
    pub decoder: Arc<dyn RowDecoder>,
    pub policy: TerminationPolicy,
    pub years: YearInference,
}

impl fmt::Debug for ListingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListingSource")
            .field("id", &self.id)
            .field("url", &self.url.as_str())
            .field("decoder", &self.decoder)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// A single page fetch, built fresh from the source for each page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub source_id: String,
    pub page: u32,
    pub url: Url,
    pub ready_marker: Option<String>,
}

impl ListingSource {
    pub fn page_request(&self, page: u32) -> PageRequest {
        let mut url = self.url.clone();
        if !self.params.is_empty() || self.page_param.is_some() {
            let mut query = url.query_pairs_mut();
            query.extend_pairs(self.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            if let Some(name) = self.page_param.as_deref() {
                query.append_pair(name, &page.to_string());
            }
        }
        PageRequest {
            source_id: self.id.clone(),
            page,
            url,
            ready_marker: self.ready_marker.clone(),
        }
    }

    /// Check the definition before a walk starts.
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.page_param.is_none() && !matches!(self.pager, Pager::SinglePage) {
            return Err(SourceError::PagerWithoutPageParam(self.id.clone()));
        }
        Ok(())
    }
}
