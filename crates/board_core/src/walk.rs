//! Pagination state for one board walk.
//!
//! The engine owns the I/O loop; this module decides, page by page and row
//! by row, what to keep and when to stop. One [`WalkState`] per walk; it is
//! never shared.

use std::collections::HashSet;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::horizon::{Horizon, RetentionPolicy};
use crate::record::{DecodedRow, Record};
use crate::resolve::{ResolvedDate, RolloverRule, YearContext};
use crate::sequence::SequenceYearResolver;
use crate::signal::select_signal;

/// Consecutive transient failures tolerated before a walk gives up.
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminationPolicy {
    /// Rows arrive newest first; the first stale row ends the walk.
    SortedBoard,
    /// No ordering; read everything, filter once at the end.
    UnsortedBoard,
    /// Like `SortedBoard`, but on posting dates against its own rolling
    /// window, independent of the run's retention policy.
    Notice { lookback_months: u32 },
}

impl TerminationPolicy {
    pub fn stops_at_first_stale_row(&self) -> bool {
        !matches!(self, TerminationPolicy::UnsortedBoard)
    }

    pub fn horizon(&self, retention: RetentionPolicy, today: NaiveDate) -> Horizon {
        match *self {
            TerminationPolicy::Notice { lookback_months } => Horizon::new(
                RetentionPolicy::RollingWindow {
                    months: lookback_months,
                },
                today,
            ),
            TerminationPolicy::SortedBoard | TerminationPolicy::UnsortedBoard => {
                Horizon::new(retention, today)
            }
        }
    }

    /// Same policy with a notice lookback widened by `extra_months`.
    pub fn widened(self, extra_months: u32) -> Self {
        match self {
            TerminationPolicy::Notice { lookback_months } => TerminationPolicy::Notice {
                lookback_months: lookback_months + extra_months,
            },
            other => other,
        }
    }
}

impl fmt::Display for TerminationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationPolicy::SortedBoard => write!(f, "sorted"),
            TerminationPolicy::UnsortedBoard => write!(f, "unsorted"),
            TerminationPolicy::Notice { lookback_months } => {
                write!(f, "notice({lookback_months} months)")
            }
        }
    }
}

/// How month/day dates of a board get their year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearInference {
    TodayRelative(Option<RolloverRule>),
    /// Descending (month, day) list; years come from month discontinuities.
    Sequence,
}

impl Default for YearInference {
    fn default() -> Self {
        YearInference::TodayRelative(Some(RolloverRule::default()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminationReason {
    /// A page had no rows.
    EndOfData,
    /// No "next page" affordance after a page.
    NoNextPage,
    PageCapReached,
    /// A sorted board produced a row outside the horizon.
    StaleRow,
    TooManyFailures,
    /// The source definition could not be turned into requests.
    InvalidSource,
}

impl TerminationReason {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TerminationReason::TooManyFailures | TerminationReason::InvalidSource
        )
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TerminationReason::EndOfData => "end of data",
            TerminationReason::NoNextPage => "no next page",
            TerminationReason::PageCapReached => "page cap reached",
            TerminationReason::StaleRow => "stale row",
            TerminationReason::TooManyFailures => "too many consecutive failures",
            TerminationReason::InvalidSource => "invalid source",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalkSummary {
    pub pages_visited: u32,
    pub rows_accepted: usize,
    pub rows_rejected: usize,
    /// Rows that decoded to nothing (schema mismatch, pinned, filtered).
    pub rows_skipped: usize,
    pub failures: u32,
    pub terminated_reason: Option<TerminationReason>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOutcome {
    pub records: Vec<Record>,
    pub summary: WalkSummary,
}

/// What to do after a page fetch or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Fetch { page: u32 },
    Finished(TerminationReason),
}

/// Verdict on one offered row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowVerdict {
    Skipped,
    /// Kept (sorted policies) or held for the final filter (unsorted).
    Accepted,
    /// Outside the horizon; the rest of the walk is abandoned.
    Stop,
}

/// Immutable inputs of one walk.
#[derive(Debug, Clone)]
pub struct WalkPlan {
    pub source_id: String,
    pub category: String,
    pub policy: TerminationPolicy,
    pub retention: RetentionPolicy,
    pub years: YearInference,
    pub page_cap: u32,
    pub max_consecutive_failures: u32,
    pub today: NaiveDate,
}

#[derive(Debug)]
enum YearSource {
    TodayRelative(YearContext),
    Sequence(SequenceYearResolver),
}

#[derive(Debug)]
pub struct WalkState {
    plan: WalkPlan,
    horizon: Horizon,
    page: u32,
    consecutive_failures: u32,
    held: Vec<(Record, ResolvedDate)>,
    seen: HashSet<(u32, usize)>,
    years: YearSource,
    stopped: Option<TerminationReason>,
    summary: WalkSummary,
}

impl WalkState {
    pub fn new(plan: WalkPlan) -> Self {
        let horizon = plan.policy.horizon(plan.retention, plan.today);
        let years = match plan.years {
            YearInference::Sequence => {
                YearSource::Sequence(SequenceYearResolver::new(plan.today.year()))
            }
            YearInference::TodayRelative(rule) => {
                YearSource::TodayRelative(YearContext::TodayRelative(rule))
            }
        };
        Self {
            plan,
            horizon,
            page: 1,
            consecutive_failures: 0,
            held: Vec::new(),
            seen: HashSet::new(),
            years,
            stopped: None,
            summary: WalkSummary::default(),
        }
    }

    pub fn plan(&self) -> &WalkPlan {
        &self.plan
    }

    pub fn horizon(&self) -> Horizon {
        self.horizon
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn next_step(&self) -> Step {
        match self.stopped {
            Some(reason) => Step::Finished(reason),
            None => Step::Fetch { page: self.page },
        }
    }

    pub fn stop(&mut self, reason: TerminationReason) {
        if self.stopped.is_none() {
            self.stopped = Some(reason);
        }
    }

    /// Count a fetch or parse failure of the current page. The same page is
    /// fetched again until the tolerance is used up.
    pub fn record_failure(&mut self) -> u32 {
        self.consecutive_failures += 1;
        self.summary.failures += 1;
        if self.consecutive_failures >= self.plan.max_consecutive_failures.max(1) {
            self.stop(TerminationReason::TooManyFailures);
        }
        self.consecutive_failures
    }

    /// A page arrived with `row_count` rows. An empty page ends the walk.
    pub fn begin_page(&mut self, row_count: usize) {
        self.consecutive_failures = 0;
        self.summary.pages_visited += 1;
        if row_count == 0 {
            self.stop(TerminationReason::EndOfData);
        }
    }

    /// Offer the decoded row at `index` of the current page, in page order.
    /// Excluded rows still pass through year resolution before they are
    /// skipped.
    pub fn offer_row(&mut self, index: usize, decoded: Option<DecodedRow>) -> RowVerdict {
        if self.stopped.is_some() {
            return RowVerdict::Skipped;
        }
        let Some(row) = decoded else {
            self.summary.rows_skipped += 1;
            return RowVerdict::Skipped;
        };
        if !self.seen.insert((self.page, index)) {
            return RowVerdict::Skipped;
        }

        let resolved = self.resolve(&row.date_text);
        if row.excluded {
            self.summary.rows_skipped += 1;
            return RowVerdict::Skipped;
        }
        let record = Record::new(&self.plan.source_id, &self.plan.category, row, resolved);

        if !self.plan.policy.stops_at_first_stale_row() {
            self.held.push((record, resolved));
            return RowVerdict::Accepted;
        }
        if self.horizon.retains(&resolved) {
            self.summary.rows_accepted += 1;
            self.held.push((record, resolved));
            RowVerdict::Accepted
        } else {
            self.summary.rows_rejected += 1;
            self.stop(TerminationReason::StaleRow);
            RowVerdict::Stop
        }
    }

    /// Close the current page; `has_next` is the pager probe result.
    pub fn end_page(&mut self, has_next: bool) {
        if self.stopped.is_some() {
            return;
        }
        if !has_next {
            self.stop(TerminationReason::NoNextPage);
        } else if self.page >= self.plan.page_cap.max(1) {
            self.stop(TerminationReason::PageCapReached);
        } else {
            self.page += 1;
        }
    }

    /// Final records in discovery order. Unsorted walks are filtered here.
    pub fn finish(mut self) -> WalkOutcome {
        let records = if self.plan.policy.stops_at_first_stale_row() {
            self.held.into_iter().map(|(record, _)| record).collect()
        } else {
            let horizon = self.horizon;
            let (kept, dropped): (Vec<_>, Vec<_>) = self
                .held
                .into_iter()
                .partition(|(_, resolved)| horizon.retains(resolved));
            self.summary.rows_accepted += kept.len();
            self.summary.rows_rejected += dropped.len();
            kept.into_iter().map(|(record, _)| record).collect()
        };
        self.summary.terminated_reason = self.stopped;
        WalkOutcome {
            records,
            summary: self.summary,
        }
    }

    fn resolve(&mut self, date_text: &str) -> ResolvedDate {
        let today = self.plan.today;
        match &mut self.years {
            YearSource::TodayRelative(context) => {
                ResolvedDate::from_text(date_text, today, context)
            }
            YearSource::Sequence(resolver) => {
                resolver.resolve_next(select_signal(date_text).as_ref(), today)
            }
        }
    }
}
