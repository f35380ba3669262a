use chrono::NaiveDate;

use crate::resolve::{resolve, ResolvedDate, YearContext};
use crate::signal::DateSignal;

/// Reconstructs years for a year-less list sorted by descending (month, day).
///
/// Walking down such a list, the month can only stay or decrease until the
/// list passes January into the previous year; an increase marks that
/// crossing. Rows must be fed in delivery order.
#[derive(Debug, Clone)]
pub struct SequenceYearResolver {
    current_year: i32,
    previous_month: Option<u32>,
    crossed: bool,
}

impl SequenceYearResolver {
    pub fn new(current_year: i32) -> Self {
        Self {
            current_year,
            previous_month: None,
            crossed: false,
        }
    }

    pub fn previous_month(&self) -> Option<u32> {
        self.previous_month
    }

    pub fn crossed_year_boundary(&self) -> bool {
        self.crossed
    }

    /// Year assigned to a row with `month`, advancing the crossover state.
    pub fn next_year(&mut self, month: u32) -> i32 {
        if self.previous_month.is_some_and(|previous| month > previous) {
            self.crossed = true;
        }
        self.previous_month = Some(month);
        if self.crossed {
            self.current_year - 1
        } else {
            self.current_year
        }
    }

    /// Resolve the next row's signal. Rows without a signal leave the state
    /// untouched; full dates keep their own year but still feed the month.
    pub fn resolve_next(&mut self, signal: Option<&DateSignal>, today: NaiveDate) -> ResolvedDate {
        let Some(signal) = signal else {
            return ResolvedDate::Indeterminate;
        };
        let year = self.next_year(signal.month());
        resolve(signal, today, &YearContext::Known(year)).into()
    }
}
