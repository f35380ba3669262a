use std::collections::BTreeMap;
use std::fs;

use board_core::{
    DecodedRow, Record, ResolvedDate, TerminationReason, WalkOutcome, WalkSummary,
};
use board_engine::{
    ensure_output_dir, AtomicFileWriter, BoardReport, BoardStatus, CrawlSummary, OutputDocument,
    OutputWriter, SUMMARY_FILENAME,
};
use chrono::{Local, NaiveDate, TimeZone};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tempfile::TempDir;

fn record(title: &str) -> Record {
    let mut fields = BTreeMap::new();
    fields.insert("location", "동대문구청".to_string());
    Record::new(
        "camps",
        "방학캠프",
        DecodedRow {
            title: title.to_string(),
            fields,
            status: "신청".to_string(),
            url: "https://www.ddm.go.kr/apply?n=1".to_string(),
            date_text: "2025-08-01".to_string(),
            excluded: false,
        },
        ResolvedDate::Date(NaiveDate::from_ymd_opt(2025, 8, 1).unwrap()),
    )
}

fn outcome(records: Vec<Record>, reason: TerminationReason) -> WalkOutcome {
    WalkOutcome {
        summary: WalkSummary {
            pages_visited: 2,
            rows_accepted: records.len(),
            rows_rejected: 1,
            rows_skipped: 0,
            failures: 0,
            terminated_reason: Some(reason),
        },
        records,
    }
}

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("ddm_news.json", "[]").unwrap();
    assert_eq!(fs::read_to_string(&first).unwrap(), "[]");

    let second = writer.write("ddm_news.json", "[1]").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "[1]");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("ddm_news.json", "{}").is_err());
    assert!(!file_path.with_file_name("ddm_news.json").exists());
}

#[test]
fn group_document_lists_records_with_count() {
    let temp = TempDir::new().unwrap();
    let writer = OutputWriter::new(temp.path().to_path_buf());
    let records = vec![record("여름 캠프")];
    let at = Local.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap();

    let path = writer
        .write_group("ddm_edu_programs.json", &OutputDocument::new(&records, at, None))
        .unwrap();
    let text = fs::read_to_string(path).unwrap();
    assert!(text.contains("여름 캠프"), "non-ASCII text is written as is");

    let doc: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(doc["count"], 1);
    assert_eq!(doc["data"][0]["type"], "방학캠프");
    assert_eq!(doc["data"][0]["location"], "동대문구청");
    assert_eq!(doc["data"][0]["resolved_date"], "2025-08-01");
    assert!(doc.get("error").is_none());
}

#[test]
fn failed_group_is_still_written() {
    let temp = TempDir::new().unwrap();
    let writer = OutputWriter::new(temp.path().to_path_buf());
    let at = Local.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap();

    let path = writer
        .write_group(
            "warak_programs.json",
            &OutputDocument::new(&[], at, Some("too many consecutive failures".into())),
        )
        .unwrap();
    let doc: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(doc["count"], 0);
    assert_eq!(doc["data"], Value::Array(Vec::new()));
    assert_eq!(doc["error"], "too many consecutive failures");
}

#[test]
fn summary_marks_failed_boards() {
    let temp = TempDir::new().unwrap();
    let writer = OutputWriter::new(temp.path().to_path_buf());
    let at = Local.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap();

    let mut summary = CrawlSummary::new(at);
    summary.add(
        "camps",
        BoardReport::from(&outcome(vec![record("a"), record("b")], TerminationReason::StaleRow)),
    );
    summary.add(
        "warak",
        BoardReport::from(&outcome(vec![record("c")], TerminationReason::TooManyFailures)),
    );
    assert_eq!(summary.total, 3);
    assert_eq!(summary.failed_boards().collect::<Vec<_>>(), vec!["warak"]);
    assert_eq!(summary.boards["camps"].status, BoardStatus::Success);

    let path = writer.write_summary(&summary).unwrap();
    assert_eq!(path.file_name().unwrap(), SUMMARY_FILENAME);
    let doc: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(doc["total"], 3);
    assert_eq!(doc["boards"]["warak"]["status"], "failed");
    assert_eq!(doc["boards"]["warak"]["terminated_reason"], "too-many-failures");
    assert_eq!(doc["boards"]["camps"]["pages_visited"], 2);
}
