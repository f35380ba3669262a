//! Board engine: page fetching, listing parsing, the async board walker
//! and JSON output.
mod decode;
mod export;
mod fetch;
mod html;
mod listing;
mod persist;
mod types;
mod walker;

pub use decode::{decode_html, DecodeError, DecodedHtml};
pub use export::{
    BoardReport, BoardStatus, CrawlSummary, OutputDocument, OutputWriter, SUMMARY_FILENAME,
};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use html::{CompiledLayout, ListingPage};
pub use listing::{
    ListingSource, PageRequest, Pager, RowLayout, SourceError, ACTIVE_SIBLING_PAGER,
};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput};
pub use walker::{BoardWalker, WalkSettings};
