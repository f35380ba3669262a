use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::clock::{first_of_month, months_before};
use crate::resolve::ResolvedDate;

/// How far back a record may be dated and still count as current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetentionPolicy {
    /// Keep dates on or after today.
    FutureOnly,
    /// Keep dates on or after the first day of the month `months` back.
    RollingWindow { months: u32 },
}

impl RetentionPolicy {
    pub fn cutoff(&self, today: NaiveDate) -> NaiveDate {
        match *self {
            RetentionPolicy::FutureOnly => today,
            RetentionPolicy::RollingWindow { months } => {
                first_of_month(months_before(today, months))
            }
        }
    }
}

impl fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetentionPolicy::FutureOnly => write!(f, "future-only"),
            RetentionPolicy::RollingWindow { months } => {
                write!(f, "rolling-window({months} months)")
            }
        }
    }
}

/// A retention policy evaluated against one "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon {
    policy: RetentionPolicy,
    cutoff: NaiveDate,
}

impl Horizon {
    pub fn new(policy: RetentionPolicy, today: NaiveDate) -> Self {
        Self {
            policy,
            cutoff: policy.cutoff(today),
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    pub fn cutoff(&self) -> NaiveDate {
        self.cutoff
    }

    pub fn retains(&self, date: &ResolvedDate) -> bool {
        match date {
            ResolvedDate::Indeterminate => true,
            ResolvedDate::Date(date) => *date >= self.cutoff,
        }
    }
}

/// Total, pure retention check. Indeterminate dates are always kept.
pub fn is_retained(date: &ResolvedDate, policy: RetentionPolicy, today: NaiveDate) -> bool {
    Horizon::new(policy, today).retains(date)
}
