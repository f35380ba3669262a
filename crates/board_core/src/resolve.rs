use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::signal::{select_signal, DateSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    #[error("{year:04}-{month:02}-{day:02} is not a calendar date")]
    InvalidCalendarDate { year: i32, month: u32, day: u32 },
}

/// A concrete calendar date, or `Indeterminate` when the text carried no
/// usable date. Indeterminate dates are always retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedDate {
    Date(NaiveDate),
    Indeterminate,
}

impl ResolvedDate {
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            ResolvedDate::Date(date) => Some(*date),
            ResolvedDate::Indeterminate => None,
        }
    }

    /// Select the authoritative signal in `text` and resolve it. Missing
    /// signals and calendar-invalid values both become `Indeterminate`.
    pub fn from_text(text: &str, today: NaiveDate, context: &YearContext) -> Self {
        match select_signal(text) {
            Some(signal) => resolve(&signal, today, context).into(),
            None => ResolvedDate::Indeterminate,
        }
    }
}

impl From<Result<NaiveDate, DateError>> for ResolvedDate {
    fn from(result: Result<NaiveDate, DateError>) -> Self {
        result.map_or(ResolvedDate::Indeterminate, ResolvedDate::Date)
    }
}

/// Year-end heuristic for today-relative resolution: late in the year, a
/// listing that mentions January/February means next year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloverRule {
    /// Signal months up to and including this are "early in the year".
    pub early_month_max: u32,
    /// Today's month from which early months roll into next year.
    pub today_month_min: u32,
}

impl Default for RolloverRule {
    fn default() -> Self {
        Self {
            early_month_max: 2,
            today_month_min: 7,
        }
    }
}

impl RolloverRule {
    fn rolls_forward(&self, month: u32, today: NaiveDate) -> bool {
        month <= self.early_month_max && today.month() >= self.today_month_min
    }
}

/// Where the year of a month/day signal comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearContext {
    /// Assume today's year, optionally rolling early months forward.
    TodayRelative(Option<RolloverRule>),
    /// The year was inferred elsewhere (sequence mode).
    Known(i32),
}

impl Default for YearContext {
    fn default() -> Self {
        YearContext::TodayRelative(Some(RolloverRule::default()))
    }
}

/// Resolve a signal to a calendar date. Pure: the result depends only on
/// the arguments.
pub fn resolve(
    signal: &DateSignal,
    today: NaiveDate,
    context: &YearContext,
) -> Result<NaiveDate, DateError> {
    let (year, month, day) = match *signal {
        DateSignal::FullDate { year, month, day } => (year, month, day),
        DateSignal::MonthDayKorean { month, day } | DateSignal::MonthDaySlash { month, day } => {
            let year = match *context {
                YearContext::Known(year) => year,
                YearContext::TodayRelative(rule) => {
                    let rolls = rule.is_some_and(|rule| rule.rolls_forward(month, today));
                    if rolls {
                        today.year() + 1
                    } else {
                        today.year()
                    }
                }
            };
            (year, month, day)
        }
    };
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or(DateError::InvalidCalendarDate { year, month, day })
}
