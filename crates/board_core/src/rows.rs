use std::fmt;

use url::Url;

use crate::record::{Anchor, DecodedRow, RawCell, RawRow};

/// Maps one board's fixed column layout to a decoded row.
///
/// Rows whose width differs from [`RowDecoder::expected_width`] are header,
/// footer or pinned rows and decode to `None`; that is not an error.
pub trait RowDecoder: fmt::Debug + Send + Sync {
    fn expected_width(&self) -> usize;

    /// Decode a row already known to have the expected width.
    fn decode_cells(&self, row: &RawRow, base: &Url) -> Option<DecodedRow>;

    fn decode(&self, row: &RawRow, base: &Url) -> Option<DecodedRow> {
        if row.width() != self.expected_width() {
            return None;
        }
        self.decode_cells(row, base)
    }
}

/// Resolve `reference` against `base`. Absolute references are kept as-is so
/// they are never double-prefixed; empty, fragment-only and `javascript:`
/// references resolve to nothing.
pub fn absolute_url(base: &Url, reference: &str) -> Option<String> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('#') || lower.starts_with("javascript:") {
        return None;
    }
    if let Ok(url) = Url::parse(trimmed) {
        return Some(url.into());
    }
    base.join(trimmed).ok().map(Into::into)
}

pub(crate) fn anchor_url(base: &Url, anchor: Option<&Anchor>) -> Option<String> {
    anchor
        .and_then(|a| a.href.as_deref())
        .and_then(|href| absolute_url(base, href))
}

/// Prefer the explicit apply action, fall back to the title link, then to
/// the board's own origin.
pub(crate) fn apply_or_title_url(
    base: &Url,
    apply: Option<&Anchor>,
    title: Option<&Anchor>,
) -> String {
    anchor_url(base, apply)
        .or_else(|| anchor_url(base, title))
        .unwrap_or_else(|| base.to_string())
}

/// Title from the cell's link text, else the cell text.
pub(crate) fn title_of(cell: &RawCell) -> String {
    cell.anchor()
        .map(|a| a.text.trim())
        .filter(|text| !text.is_empty())
        .unwrap_or(cell.text.as_str())
        .to_string()
}
