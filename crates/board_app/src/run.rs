use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use board_core::{Clock, Record, SystemClock};
use board_engine::{
    ensure_output_dir, BoardReport, BoardStatus, BoardWalker, CrawlSummary, Fetcher,
    OutputDocument, OutputWriter, ReqwestFetcher,
};
use board_logging::{board_info, board_warn};
use chrono::Local;

use crate::catalog::{catalog, CatalogEntry, OutputGroup};
use crate::config::Settings;

#[derive(Debug, Default)]
struct GroupResult {
    records: Vec<Record>,
    errors: Vec<String>,
}

pub(crate) async fn run(settings: &Settings) -> Result<CrawlSummary> {
    let fetcher =
        Arc::new(ReqwestFetcher::new(settings.fetch.clone()).context("preparing the fetcher")?);
    run_with(settings, fetcher, Arc::new(SystemClock)).await
}

/// Walk the selected boards one after another. A board that fails is
/// reported and the run moves on; only output errors abort the run.
async fn run_with(
    settings: &Settings,
    fetcher: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
) -> Result<CrawlSummary> {
    let entries = select(
        catalog().context("building the source catalog")?,
        settings.only.as_deref(),
    )?;
    ensure_output_dir(&settings.output_dir)?;

    let walker = BoardWalker::new(fetcher, clock, settings.walk.clone());
    let profile = settings.profile;
    let mut groups: BTreeMap<OutputGroup, GroupResult> = BTreeMap::new();
    let mut summary = CrawlSummary::new(Local::now());

    board_info!("crawling {} boards", entries.len());
    for CatalogEntry { group, mut source } in entries {
        source.policy = source.policy.widened(profile.notice_lookback_widening);
        let outcome = walker
            .walk(&source, profile.retention, profile.page_cap)
            .await;
        let report = BoardReport::from(&outcome);

        let result = groups.entry(group).or_default();
        if report.status == BoardStatus::Failed {
            let reason = report
                .terminated_reason
                .map(|r| r.to_string())
                .unwrap_or_default();
            board_warn!("{} failed: {reason}", source.id);
            result.errors.push(format!("{}: {reason}", source.id));
        }
        result.records.extend(outcome.records);
        summary.add(&source.id, report);
    }

    let writer = OutputWriter::new(settings.output_dir.clone());
    let updated_at = Local::now();
    for (group, result) in &groups {
        let error = (!result.errors.is_empty()).then(|| result.errors.join("; "));
        let document = OutputDocument::new(&result.records, updated_at, error);
        writer
            .write_group(group.filename(), &document)
            .with_context(|| format!("writing {}", group.filename()))?;
    }
    writer
        .write_summary(&summary)
        .context("writing the run summary")?;

    board_info!(
        "collected {} records, {} boards failed",
        summary.total,
        summary.failed_boards().count()
    );
    Ok(summary)
}

fn select(entries: Vec<CatalogEntry>, only: Option<&str>) -> Result<Vec<CatalogEntry>> {
    let Some(id) = only else {
        return Ok(entries);
    };
    let selected: Vec<_> = entries.into_iter().filter(|e| e.source.id == id).collect();
    if selected.is_empty() {
        bail!("no board with id {id:?}");
    }
    Ok(selected)
}
