use std::sync::LazyLock;

use regex::Regex;

static FULL_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap());
static MONTH_DAY_KOREAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})월\s*(\d{1,2})일").unwrap());
static MONTH_DAY_SLASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})/(\d{1,2})").unwrap());

/// Which textual convention a date signal was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalFormat {
    /// `YYYY-MM-DD`
    FullDate,
    /// `M월 D일`
    MonthDayKorean,
    /// `M/D`
    MonthDaySlash,
}

/// A date expression found in free text. Month/day signals carry no year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSignal {
    FullDate { year: i32, month: u32, day: u32 },
    MonthDayKorean { month: u32, day: u32 },
    MonthDaySlash { month: u32, day: u32 },
}

impl DateSignal {
    pub fn format(&self) -> SignalFormat {
        match self {
            DateSignal::FullDate { .. } => SignalFormat::FullDate,
            DateSignal::MonthDayKorean { .. } => SignalFormat::MonthDayKorean,
            DateSignal::MonthDaySlash { .. } => SignalFormat::MonthDaySlash,
        }
    }

    pub fn month(&self) -> u32 {
        match *self {
            DateSignal::FullDate { month, .. }
            | DateSignal::MonthDayKorean { month, .. }
            | DateSignal::MonthDaySlash { month, .. } => month,
        }
    }

    pub fn day(&self) -> u32 {
        match *self {
            DateSignal::FullDate { day, .. }
            | DateSignal::MonthDayKorean { day, .. }
            | DateSignal::MonthDaySlash { day, .. } => day,
        }
    }

    /// Year written in the text, if the format carries one.
    pub fn year(&self) -> Option<i32> {
        match *self {
            DateSignal::FullDate { year, .. } => Some(year),
            _ => None,
        }
    }
}

/// One format-specific link of the extractor chain.
trait SignalExtractor: Sync {
    /// All matches as `(byte offset, signal)` in reading order.
    fn find_all(&self, text: &str) -> Vec<(usize, DateSignal)>;
}

struct FullDateExtractor;
struct KoreanMonthDayExtractor;
struct SlashMonthDayExtractor;

impl SignalExtractor for FullDateExtractor {
    fn find_all(&self, text: &str) -> Vec<(usize, DateSignal)> {
        FULL_DATE_RE
            .captures_iter(text)
            .filter_map(|caps| {
                let start = caps.get(0)?.start();
                Some((
                    start,
                    DateSignal::FullDate {
                        year: caps[1].parse().ok()?,
                        month: caps[2].parse().ok()?,
                        day: caps[3].parse().ok()?,
                    },
                ))
            })
            .collect()
    }
}

impl SignalExtractor for KoreanMonthDayExtractor {
    fn find_all(&self, text: &str) -> Vec<(usize, DateSignal)> {
        month_day_matches(&MONTH_DAY_KOREAN_RE, text, |month, day| {
            DateSignal::MonthDayKorean { month, day }
        })
    }
}

impl SignalExtractor for SlashMonthDayExtractor {
    fn find_all(&self, text: &str) -> Vec<(usize, DateSignal)> {
        month_day_matches(&MONTH_DAY_SLASH_RE, text, |month, day| {
            DateSignal::MonthDaySlash { month, day }
        })
    }
}

fn month_day_matches(
    re: &Regex,
    text: &str,
    build: impl Fn(u32, u32) -> DateSignal,
) -> Vec<(usize, DateSignal)> {
    re.captures_iter(text)
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            Some((start, build(caps[1].parse().ok()?, caps[2].parse().ok()?)))
        })
        .collect()
}

/// Extractors in priority order: the first format that matches wins.
static CHAIN: [&dyn SignalExtractor; 3] = [
    &FullDateExtractor,
    &KoreanMonthDayExtractor,
    &SlashMonthDayExtractor,
];

/// Every date signal in `text`, across all formats, in reading order.
pub fn extract_signals(text: &str) -> Vec<DateSignal> {
    let mut found: Vec<(usize, DateSignal)> = CHAIN
        .iter()
        .flat_map(|extractor| extractor.find_all(text))
        .collect();
    found.sort_by_key(|(offset, _)| *offset);
    found.into_iter().map(|(_, signal)| signal).collect()
}

/// The authoritative signal of `text`.
///
/// Formats are tried in chain order and the first format present decides.
/// Within that format the last occurrence wins: a period reads
/// "start ~ end" and its end is the cutoff.
pub fn select_signal(text: &str) -> Option<DateSignal> {
    CHAIN.iter().find_map(|extractor| {
        extractor
            .find_all(text)
            .into_iter()
            .last()
            .map(|(_, signal)| signal)
    })
}
