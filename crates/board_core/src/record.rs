use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::resolve::ResolvedDate;

/// A link found inside a cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Anchor {
    pub text: String,
    pub href: Option<String>,
    pub onclick: Option<String>,
}

/// One cell of a listing row, reduced to what decoders read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCell {
    /// Whole text content, trimmed.
    pub text: String,
    /// Non-empty text fragments in document order, each trimmed.
    pub lines: Vec<String>,
    pub anchors: Vec<Anchor>,
    /// `alt` attributes of images in the cell.
    pub image_alts: Vec<String>,
}

impl RawCell {
    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        Self {
            text: text.to_string(),
            lines: text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchors.push(anchor);
        self
    }

    pub fn with_image_alt(mut self, alt: &str) -> Self {
        self.image_alts.push(alt.to_string());
        self
    }

    pub fn anchor(&self) -> Option<&Anchor> {
        self.anchors.first()
    }

    /// Text fragments joined with `separator`, like a rendered multi-line cell.
    pub fn joined(&self, separator: &str) -> String {
        self.lines.join(separator)
    }
}

/// Cells of one listing row in column order. Consumed by a row decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub cells: Vec<RawCell>,
}

impl RawRow {
    pub fn new(cells: Vec<RawCell>) -> Self {
        Self { cells }
    }

    pub fn width(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, index: usize) -> Option<&RawCell> {
        self.cells.get(index)
    }
}

/// What a row decoder extracts from a row: the record fields plus the raw
/// date-like text that decides retention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRow {
    pub title: String,
    pub fields: BTreeMap<&'static str, String>,
    pub status: String,
    pub url: String,
    pub date_text: String,
    /// Listed but not wanted in the output. Its date still advances
    /// sequence year inference.
    pub excluded: bool,
}

/// Normalized output record. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub source: String,
    #[serde(rename = "type")]
    pub category: String,
    pub title: String,
    #[serde(flatten)]
    pub fields: BTreeMap<&'static str, String>,
    pub date: String,
    pub resolved_date: Option<NaiveDate>,
    pub status: String,
    pub url: String,
}

impl Record {
    pub fn new(source: &str, category: &str, row: DecodedRow, resolved: ResolvedDate) -> Self {
        Self {
            source: source.to_string(),
            category: category.to_string(),
            title: row.title,
            fields: row.fields,
            date: row.date_text,
            resolved_date: resolved.as_date(),
            status: row.status,
            url: row.url,
        }
    }
}
