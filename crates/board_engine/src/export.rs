use std::collections::BTreeMap;
use std::path::PathBuf;

use board_core::{Record, TerminationReason, WalkOutcome};
use board_logging::board_info;
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::persist::{AtomicFileWriter, PersistError};

pub const SUMMARY_FILENAME: &str = "crawl_summary.json";

/// One output group as written to disk.
#[derive(Debug, Clone, Serialize)]
pub struct OutputDocument<'a> {
    pub data: &'a [Record],
    pub count: usize,
    pub updated_at: DateTime<Local>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<'a> OutputDocument<'a> {
    pub fn new(data: &'a [Record], updated_at: DateTime<Local>, error: Option<String>) -> Self {
        Self {
            data,
            count: data.len(),
            updated_at,
            error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardReport {
    pub status: BoardStatus,
    pub count: usize,
    pub pages_visited: u32,
    pub rows_accepted: usize,
    pub rows_rejected: usize,
    pub terminated_reason: Option<TerminationReason>,
}

impl From<&WalkOutcome> for BoardReport {
    fn from(outcome: &WalkOutcome) -> Self {
        let summary = &outcome.summary;
        let failed = summary
            .terminated_reason
            .is_some_and(|reason| reason.is_failure());
        Self {
            status: if failed {
                BoardStatus::Failed
            } else {
                BoardStatus::Success
            },
            count: outcome.records.len(),
            pages_visited: summary.pages_visited,
            rows_accepted: summary.rows_accepted,
            rows_rejected: summary.rows_rejected,
            terminated_reason: summary.terminated_reason,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlSummary {
    pub updated_at: DateTime<Local>,
    pub boards: BTreeMap<String, BoardReport>,
    pub total: usize,
}

impl CrawlSummary {
    pub fn new(updated_at: DateTime<Local>) -> Self {
        Self {
            updated_at,
            boards: BTreeMap::new(),
            total: 0,
        }
    }

    pub fn add(&mut self, source_id: &str, report: BoardReport) {
        self.total += report.count;
        self.boards.insert(source_id.to_string(), report);
    }

    pub fn failed_boards(&self) -> impl Iterator<Item = &str> {
        self.boards
            .iter()
            .filter(|(_, report)| report.status == BoardStatus::Failed)
            .map(|(id, _)| id.as_str())
    }
}

/// Writes group documents and the run summary into one directory.
pub struct OutputWriter {
    writer: AtomicFileWriter,
}

impl OutputWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
        }
    }

    pub fn write_group(
        &self,
        filename: &str,
        document: &OutputDocument<'_>,
    ) -> Result<PathBuf, PersistError> {
        let path = self.writer.write_json(filename, document)?;
        board_info!("wrote {} records to {}", document.count, path.display());
        Ok(path)
    }

    pub fn write_summary(&self, summary: &CrawlSummary) -> Result<PathBuf, PersistError> {
        let path = self.writer.write_json(SUMMARY_FILENAME, summary)?;
        board_info!("wrote run summary to {}", path.display());
        Ok(path)
    }
}
