use board_core::{Anchor, RawCell, RawRow};
use scraper::{ElementRef, Html, Selector};

use crate::listing::{ListingSource, Pager, RowLayout, SourceError};
use crate::{FailureKind, FetchError};

/// Rows of one listing page plus the pager probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub rows: Vec<RawRow>,
    pub has_next: bool,
}

enum CellLayout {
    TableCells,
    Cards(Vec<Selector>),
}

enum NextProbe {
    Never,
    Always,
    Matches(Selector),
}

/// Selectors of a source, parsed once per walk.
pub struct CompiledLayout {
    rows: Selector,
    cells: CellLayout,
    next: NextProbe,
    marker: Option<(String, Selector)>,
}

fn compile(selector: &str) -> Result<Selector, SourceError> {
    Selector::parse(selector).map_err(|err| SourceError::Selector {
        selector: selector.to_string(),
        message: err.to_string(),
    })
}

impl CompiledLayout {
    pub fn for_source(source: &ListingSource) -> Result<Self, SourceError> {
        let (rows, cells) = match &source.layout {
            RowLayout::Table { rows } => (compile(rows)?, CellLayout::TableCells),
            RowLayout::Cards { items, cells } => (
                compile(items)?,
                CellLayout::Cards(
                    cells
                        .iter()
                        .map(|c| compile(c))
                        .collect::<Result<_, _>>()?,
                ),
            ),
        };
        let next = match &source.pager {
            Pager::SinglePage => NextProbe::Never,
            Pager::UntilEmpty => NextProbe::Always,
            Pager::NextLink(selector) => NextProbe::Matches(compile(selector)?),
        };
        let marker = source
            .ready_marker
            .as_deref()
            .map(|m| compile(m).map(|sel| (m.to_string(), sel)))
            .transpose()?;
        Ok(Self {
            rows,
            cells,
            next,
            marker,
        })
    }

    /// Split a document into raw rows. A missing ready marker is a failed
    /// load; zero matching rows is a legitimate empty page.
    pub fn parse(&self, html: &str) -> Result<ListingPage, FetchError> {
        let doc = Html::parse_document(html);

        if let Some((name, marker)) = &self.marker {
            if doc.select(marker).next().is_none() {
                return Err(FetchError::new(
                    FailureKind::MarkerMissing {
                        marker: name.clone(),
                    },
                    "listing not rendered",
                ));
            }
        }

        let rows = doc
            .select(&self.rows)
            .map(|row| match &self.cells {
                CellLayout::TableCells => RawRow::new(
                    row.children()
                        .filter_map(ElementRef::wrap)
                        .filter(|el| el.value().name().eq_ignore_ascii_case("td"))
                        .map(raw_cell)
                        .collect(),
                ),
                CellLayout::Cards(selectors) => RawRow::new(
                    selectors
                        .iter()
                        .map(|sel| {
                            row.select(sel)
                                .next()
                                .map(raw_cell)
                                .unwrap_or_default()
                        })
                        .collect(),
                ),
            })
            .collect();

        let has_next = match &self.next {
            NextProbe::Never => false,
            NextProbe::Always => true,
            NextProbe::Matches(sel) => doc.select(sel).next().is_some(),
        };

        Ok(ListingPage { rows, has_next })
    }
}

fn elements_named<'a>(
    el: ElementRef<'a>,
    name: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> {
    el.descendants()
        .filter_map(ElementRef::wrap)
        .filter(move |e| e.value().name().eq_ignore_ascii_case(name))
}

fn raw_cell(el: ElementRef) -> RawCell {
    let lines = el
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToOwned::to_owned)
        .collect();
    // `descendants` starts at the cell itself, so a card whose cell is the
    // link element still yields its anchor.
    let anchors = elements_named(el, "a")
        .map(|a| Anchor {
            text: a.text().collect::<String>().trim().to_string(),
            href: a.value().attr("href").map(str::to_string),
            onclick: a.value().attr("onclick").map(str::to_string),
        })
        .collect();
    let image_alts = elements_named(el, "img")
        .map(|img| img.value().attr("alt").unwrap_or_default().to_string())
        .collect();
    RawCell {
        text: el.text().collect::<String>().trim().to_string(),
        lines,
        anchors,
        image_alts,
    }
}
