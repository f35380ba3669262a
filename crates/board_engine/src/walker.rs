use std::sync::Arc;
use std::time::Duration;

use board_core::{
    Clock, RetentionPolicy, RowVerdict, Step, TerminationReason, WalkOutcome, WalkPlan,
    WalkState, DEFAULT_MAX_CONSECUTIVE_FAILURES,
};
use board_logging::{board_debug, board_error, board_info, board_warn};

use crate::decode::decode_html;
use crate::fetch::Fetcher;
use crate::html::{CompiledLayout, ListingPage};
use crate::listing::{ListingSource, PageRequest};
use crate::{FailureKind, FetchError};

#[derive(Debug, Clone)]
pub struct WalkSettings {
    pub max_consecutive_failures: u32,
    /// Pause between two successfully read pages.
    pub page_delay: Duration,
    /// Pause before retrying a page that failed.
    pub failure_delay: Duration,
}

impl Default for WalkSettings {
    fn default() -> Self {
        Self {
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            page_delay: Duration::from_secs(1),
            failure_delay: Duration::from_secs(2),
        }
    }
}

/// Drives one board at a time through its pages.
pub struct BoardWalker {
    fetcher: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
    settings: WalkSettings,
}

impl BoardWalker {
    pub fn new(fetcher: Arc<dyn Fetcher>, clock: Arc<dyn Clock>, settings: WalkSettings) -> Self {
        Self {
            fetcher,
            clock,
            settings,
        }
    }

    /// Walk `source` until its policy, the pager, the page cap or the
    /// failure tolerance ends it. Never fails: whatever was accepted before
    /// the walk ended is returned with the reason in the summary.
    pub async fn walk(
        &self,
        source: &ListingSource,
        retention: RetentionPolicy,
        page_cap: u32,
    ) -> WalkOutcome {
        let plan = WalkPlan {
            source_id: source.id.clone(),
            category: source.category.clone(),
            policy: source.policy,
            retention,
            years: source.years,
            page_cap,
            max_consecutive_failures: self.settings.max_consecutive_failures,
            today: self.clock.today(),
        };
        let mut state = WalkState::new(plan);
        board_info!(
            "walking {} ({}, horizon from {}, page cap {page_cap})",
            source.id,
            source.policy,
            state.horizon().cutoff()
        );

        let layout = match source
            .validate()
            .and_then(|()| CompiledLayout::for_source(source))
        {
            Ok(layout) => layout,
            Err(err) => {
                board_error!("{}: {err}", source.id);
                state.stop(TerminationReason::InvalidSource);
                return state.finish();
            }
        };

        while let Step::Fetch { page } = state.next_step() {
            let request = source.page_request(page);
            match self.load(&request, &layout).await {
                Ok(listing) => {
                    board_debug!("{} page {page}: {} rows", source.id, listing.rows.len());
                    state.begin_page(listing.rows.len());
                    for (index, row) in listing.rows.iter().enumerate() {
                        let decoded = source.decoder.decode(row, &source.url);
                        if state.offer_row(index, decoded) == RowVerdict::Stop {
                            break;
                        }
                    }
                    state.end_page(listing.has_next);
                    self.pause(&state, self.settings.page_delay).await;
                }
                Err(err) => {
                    let count = state.record_failure();
                    board_warn!(
                        "{} page {page} failed ({count}/{}): {err}",
                        source.id,
                        self.settings.max_consecutive_failures
                    );
                    self.pause(&state, self.settings.failure_delay).await;
                }
            }
        }

        let outcome = state.finish();
        let summary = &outcome.summary;
        match summary.terminated_reason {
            Some(reason) if reason.is_failure() => board_warn!(
                "{} ended early ({reason}): {} records kept",
                source.id,
                outcome.records.len()
            ),
            reason => board_info!(
                "{} done after {} pages ({}): {} kept, {} rejected, {} skipped",
                source.id,
                summary.pages_visited,
                reason.map(|r| r.to_string()).unwrap_or_default(),
                summary.rows_accepted,
                summary.rows_rejected,
                summary.rows_skipped
            ),
        }
        outcome
    }

    async fn load(
        &self,
        request: &PageRequest,
        layout: &CompiledLayout,
    ) -> Result<ListingPage, FetchError> {
        let output = self.fetcher.fetch(request).await?;
        let decoded = decode_html(
            &output.bytes,
            output.metadata.content_type.as_deref(),
            request.url.host_str(),
        )
        .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))?;
        layout.parse(&decoded.html)
    }

    async fn pause(&self, state: &WalkState, delay: Duration) {
        if matches!(state.next_step(), Step::Fetch { .. }) && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
