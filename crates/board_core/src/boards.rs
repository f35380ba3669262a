//! Row schemas of the district education boards.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::record::{Anchor, DecodedRow, RawRow};
use crate::rows::{absolute_url, anchor_url, apply_or_title_url, title_of, RowDecoder};

/// Status label used when a row offers no apply action.
pub const CLOSED_LABEL: &str = "마감";
const UNTITLED: &str = "제목 없음";
const NOTICE_PIN_ALT: &str = "공지";
const WRITTEN_ON_LABEL: &str = "작성일";

static NTT_NO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"nttNo["\s]*[:=]["\s]*(\d+)"#).unwrap());
static LOCATION_HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"location\.href\s*=\s*['"]([^'"]+)['"]"#).unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

fn status_of(apply: Option<&Anchor>) -> String {
    apply
        .map(|a| a.text.trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| CLOSED_LABEL.to_string())
}

/// Event boards: no, title, event date, (unused), target, location, apply.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventBoardRow;

impl RowDecoder for EventBoardRow {
    fn expected_width(&self) -> usize {
        7
    }

    fn decode_cells(&self, row: &RawRow, base: &Url) -> Option<DecodedRow> {
        let title_cell = row.cell(1)?;
        let apply = row.cell(6)?.anchor();
        let mut fields = BTreeMap::new();
        fields.insert("target", row.cell(4)?.text.clone());
        fields.insert("location", row.cell(5)?.text.clone());
        Some(DecodedRow {
            title: title_of(title_cell),
            fields,
            status: status_of(apply),
            url: apply_or_title_url(base, apply, title_cell.anchor()),
            date_text: row.cell(2)?.text.clone(),
            excluded: false,
        })
    }
}

/// Admission fair listings: no, title, event period, registration period,
/// apply. The registration period's end governs retention.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpoRow;

impl RowDecoder for ExpoRow {
    fn expected_width(&self) -> usize {
        5
    }

    fn decode_cells(&self, row: &RawRow, base: &Url) -> Option<DecodedRow> {
        let title_cell = row.cell(1)?;
        let apply = row.cell(4)?.anchor();
        let registration = row.cell(3)?.text.clone();
        let mut fields = BTreeMap::new();
        fields.insert("event_period", row.cell(2)?.text.clone());
        fields.insert("registration_period", registration.clone());
        Some(DecodedRow {
            title: title_of(title_cell),
            fields,
            status: status_of(apply),
            url: apply_or_title_url(base, apply, title_cell.anchor()),
            date_text: registration,
            excluded: false,
        })
    }
}

/// Education-center notices: no, title, (unused), posted on, (unused).
#[derive(Debug, Default, Clone, Copy)]
pub struct BoardNoticeRow;

impl RowDecoder for BoardNoticeRow {
    fn expected_width(&self) -> usize {
        5
    }

    fn decode_cells(&self, row: &RawRow, base: &Url) -> Option<DecodedRow> {
        let title_cell = row.cell(1)?;
        Some(DecodedRow {
            title: title_of(title_cell),
            fields: BTreeMap::new(),
            status: String::new(),
            url: anchor_url(base, title_cell.anchor()).unwrap_or_else(|| base.to_string()),
            date_text: row.cell(3)?.text.clone(),
            excluded: false,
        })
    }
}

/// District news: no, title, department, written on, attachment.
///
/// Pinned notices are skipped. Detail links are script handlers carrying an
/// `nttNo`; the detail URL is rebuilt from it.
#[derive(Debug, Clone)]
pub struct NewsRow {
    /// Detail page without the `nttNo` parameter.
    pub view_url: String,
    /// Listing page used when no detail link can be recovered.
    pub list_url: String,
}

impl NewsRow {
    fn detail_url(&self, base: &Url, anchor: &Anchor) -> String {
        if let Some(onclick) = anchor.onclick.as_deref() {
            if onclick.contains("selectBbsNttView") {
                return match NTT_NO_RE.captures(onclick) {
                    Some(caps) => format!("{}&nttNo={}", self.view_url, &caps[1]),
                    None => self.list_url.clone(),
                };
            }
        }
        anchor
            .href
            .as_deref()
            .and_then(|href| absolute_url(base, href))
            .unwrap_or_else(|| self.list_url.clone())
    }
}

impl RowDecoder for NewsRow {
    fn expected_width(&self) -> usize {
        5
    }

    fn decode_cells(&self, row: &RawRow, base: &Url) -> Option<DecodedRow> {
        let pinned = row
            .cells
            .iter()
            .any(|c| c.image_alts.iter().any(|alt| alt == NOTICE_PIN_ALT));
        if pinned {
            return None;
        }
        let anchor = row.cell(1)?.anchor()?;
        let title = anchor.text.trim().to_string();

        let written_on = row.cell(3)?.text.replace(WRITTEN_ON_LABEL, "");
        let written_on = WHITESPACE_RE.replace_all(written_on.trim(), " ").into_owned();

        let attachment = row.cell(4)?;
        let has_attachment = !attachment.image_alts.is_empty() || attachment.text.contains("첨부");

        let mut fields = BTreeMap::new();
        fields.insert("department", row.cell(2)?.text.clone());
        fields.insert("has_attachment", has_attachment.to_string());
        Some(DecodedRow {
            title,
            fields,
            status: String::new(),
            url: self.detail_url(base, anchor),
            date_text: written_on,
            excluded: false,
        })
    }
}

/// Recover a target from `onclick="location.href='...'"`.
fn onclick_url(base: &Url, anchor: Option<&Anchor>) -> Option<String> {
    let onclick = anchor?.onclick.as_deref()?;
    let caps = LOCATION_HREF_RE.captures(onclick)?;
    absolute_url(base, &caps[1])
}

fn reserve_url(base: &Url, title: Option<&Anchor>, action: Option<&Anchor>) -> String {
    onclick_url(base, action)
        .or_else(|| anchor_url(base, title))
        .unwrap_or_else(|| base.to_string())
}

fn reserve_title(title: Option<&Anchor>) -> String {
    title
        .map(|a| a.text.trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string())
}

/// Reservation portal course list: no, title, location, periods (application
/// then education, one per line), time, selection, capacity, action.
#[derive(Debug, Clone)]
pub struct ReserveProgramRow {
    /// Listing variant this row was read from ("접수예정", "접수중").
    pub status: String,
}

impl RowDecoder for ReserveProgramRow {
    fn expected_width(&self) -> usize {
        8
    }

    fn decode_cells(&self, row: &RawRow, base: &Url) -> Option<DecodedRow> {
        let title = row.cell(1)?.anchor();
        let action = row.cell(7)?.anchor();
        let periods = &row.cell(3)?.lines;
        let application = periods.first().cloned().unwrap_or_default();

        let mut fields = BTreeMap::new();
        fields.insert("location", row.cell(2)?.text.clone());
        fields.insert("application_period", application.clone());
        fields.insert("education_period", periods.get(1).cloned().unwrap_or_default());
        fields.insert("education_time", row.cell(4)?.joined(" "));
        fields.insert("selection_method", row.cell(5)?.text.clone());
        fields.insert("capacity_status", row.cell(6)?.joined(" "));
        fields.insert(
            "button_text",
            action.map(|a| a.text.trim().to_string()).unwrap_or_default(),
        );
        Some(DecodedRow {
            title: reserve_title(title),
            fields,
            status: self.status.clone(),
            url: reserve_url(base, title, action),
            date_text: application,
            excluded: false,
        })
    }
}

/// Reservation portal online reception list: no, title, department,
/// application period, selection, capacity, fee, action.
#[derive(Debug, Clone)]
pub struct OnlineReceptionRow {
    pub status: String,
}

impl RowDecoder for OnlineReceptionRow {
    fn expected_width(&self) -> usize {
        8
    }

    fn decode_cells(&self, row: &RawRow, base: &Url) -> Option<DecodedRow> {
        let title = row.cell(1)?.anchor();
        let action = row.cell(7)?.anchor();
        let application = row.cell(3)?.joined("~");

        let mut fields = BTreeMap::new();
        fields.insert("department", row.cell(2)?.text.clone());
        fields.insert("application_period", application.clone());
        fields.insert("selection_method", row.cell(4)?.text.clone());
        fields.insert("capacity_status", row.cell(5)?.joined("/"));
        fields.insert("fee", row.cell(6)?.text.clone());
        fields.insert(
            "button_text",
            action.map(|a| a.text.trim().to_string()).unwrap_or_default(),
        );
        Some(DecodedRow {
            title: reserve_title(title),
            fields,
            status: self.status.clone(),
            url: reserve_url(base, title, action),
            date_text: application,
            excluded: false,
        })
    }
}

/// Warak center program cards: status, title, tags, duration, link. Only
/// cards open for booking or application are kept, but closed cards are
/// still decoded as excluded rows; dates live in the title.
#[derive(Debug, Default, Clone, Copy)]
pub struct WarakCardRow;

impl RowDecoder for WarakCardRow {
    fn expected_width(&self) -> usize {
        5
    }

    fn decode_cells(&self, row: &RawRow, base: &Url) -> Option<DecodedRow> {
        let status = row.cell(0)?.text.clone();
        let open = status.contains("예약") || status.contains("신청");
        let title = match row.cell(1)?.text.as_str() {
            "" => UNTITLED.to_string(),
            text => text.to_string(),
        };
        let duration = match row.cell(3)?.text.as_str() {
            "" => "시간 정보 없음".to_string(),
            text => text.to_string(),
        };

        let mut fields = BTreeMap::new();
        fields.insert("tags", row.cell(2)?.text.clone());
        fields.insert("duration", duration);
        Some(DecodedRow {
            date_text: title.clone(),
            title,
            fields,
            status,
            url: anchor_url(base, row.cell(4)?.anchor()).unwrap_or_else(|| base.to_string()),
            excluded: !open,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawCell;
    use pretty_assertions::assert_eq;

    fn base() -> Url {
        Url::parse("https://www.ddm.go.kr/jinhak/selectBbsNttList.do").unwrap()
    }

    fn link(text: &str, href: &str) -> Anchor {
        Anchor {
            text: text.to_string(),
            href: Some(href.to_string()),
            onclick: None,
        }
    }

    fn event_row(apply: Option<Anchor>) -> RawRow {
        let mut apply_cell = RawCell::from_text("");
        if let Some(a) = apply {
            apply_cell = RawCell::from_text(&a.text.clone()).with_anchor(a);
        }
        RawRow::new(vec![
            RawCell::from_text("12"),
            RawCell::from_text("여름 캠프").with_anchor(link("여름 캠프", "/jinhak/view.do?n=1")),
            RawCell::from_text("2025-08-01 ~ 2025-08-03"),
            RawCell::from_text(""),
            RawCell::from_text("중학생"),
            RawCell::from_text("구민회관"),
            apply_cell,
        ])
    }

    #[test]
    fn event_row_prefers_apply_link() {
        let row = event_row(Some(link("신청하기", "https://apply.example.com/form?id=3")));
        let decoded = EventBoardRow.decode(&row, &base()).unwrap();
        assert_eq!(decoded.title, "여름 캠프");
        assert_eq!(decoded.status, "신청하기");
        assert_eq!(decoded.url, "https://apply.example.com/form?id=3");
        assert_eq!(decoded.date_text, "2025-08-01 ~ 2025-08-03");
        assert_eq!(decoded.fields["target"], "중학생");
    }

    #[test]
    fn event_row_without_apply_is_closed_and_uses_title_link() {
        let decoded = EventBoardRow.decode(&event_row(None), &base()).unwrap();
        assert_eq!(decoded.status, CLOSED_LABEL);
        assert_eq!(decoded.url, "https://www.ddm.go.kr/jinhak/view.do?n=1");
    }

    #[test]
    fn width_mismatch_is_skipped() {
        let mut row = event_row(None);
        row.cells.pop();
        assert_eq!(EventBoardRow.decode(&row, &base()), None);
        assert_eq!(ExpoRow.decode(&RawRow::default(), &base()), None);
    }

    fn news() -> NewsRow {
        NewsRow {
            view_url: "https://www.ddm.go.kr/www/selectBbsNttView.do?key=575&bbsNo=38".into(),
            list_url: "https://www.ddm.go.kr/www/selectBbsNttList.do?key=575&bbsNo=38".into(),
        }
    }

    fn news_row(title: Anchor, number: RawCell) -> RawRow {
        RawRow::new(vec![
            number,
            RawCell::from_text(&title.text.clone()).with_anchor(title),
            RawCell::from_text("교육지원과"),
            RawCell::from_text("작성일\n   2025-08-20 "),
            RawCell::from_text("").with_image_alt("첨부파일"),
        ])
    }

    #[test]
    fn news_row_rebuilds_detail_url_from_onclick() {
        let anchor = Anchor {
            text: "방과후 안내".into(),
            href: Some("#".into()),
            onclick: Some("selectBbsNttView('nttNo': '91234'); return false;".into()),
        };
        let decoded = news()
            .decode(&news_row(anchor, RawCell::from_text("3")), &base())
            .unwrap();
        assert_eq!(
            decoded.url,
            "https://www.ddm.go.kr/www/selectBbsNttView.do?key=575&bbsNo=38&nttNo=91234"
        );
        assert_eq!(decoded.date_text, "2025-08-20");
        assert_eq!(decoded.fields["has_attachment"], "true");
    }

    #[test]
    fn news_row_falls_back_to_href_then_list() {
        let with_href = news()
            .decode(
                &news_row(link("a", "selectBbsNttView.do?nttNo=5"), RawCell::from_text("1")),
                &base(),
            )
            .unwrap();
        assert_eq!(
            with_href.url,
            "https://www.ddm.go.kr/jinhak/selectBbsNttView.do?nttNo=5"
        );

        let script_only = news()
            .decode(
                &news_row(link("b", "javascript:void(0);"), RawCell::from_text("2")),
                &base(),
            )
            .unwrap();
        assert_eq!(script_only.url, news().list_url);
    }

    #[test]
    fn pinned_news_row_is_skipped() {
        let row = news_row(link("a", "/x"), RawCell::from_text("").with_image_alt("공지"));
        assert_eq!(news().decode(&row, &base()), None);
    }

    #[test]
    fn reserve_program_splits_periods_and_prefers_the_action() {
        let action = Anchor {
            text: "신청".into(),
            href: None,
            onclick: Some("location.href='/reserve/apply.do?id=7'".into()),
        };
        let title = link("도자기 교실", "/reserve/view.do?id=7");
        let row = RawRow::new(vec![
            RawCell::from_text("1"),
            RawCell::from_text("도자기 교실").with_anchor(title),
            RawCell::from_text("평생학습관"),
            RawCell::from_text("2025-09-01 ~ 2025-09-10\n2025-09-15 ~ 2025-10-30"),
            RawCell::from_text("화 10:00\n12:00"),
            RawCell::from_text("선착순"),
            RawCell::from_text("3\n/ 20"),
            RawCell::from_text("신청").with_anchor(action),
        ]);
        let decoded = ReserveProgramRow {
            status: "접수중".into(),
        }
        .decode(&row, &base())
        .unwrap();
        assert_eq!(decoded.date_text, "2025-09-01 ~ 2025-09-10");
        assert_eq!(decoded.fields["education_period"], "2025-09-15 ~ 2025-10-30");
        assert_eq!(decoded.fields["education_time"], "화 10:00 12:00");
        assert_eq!(decoded.url, "https://www.ddm.go.kr/reserve/apply.do?id=7");
        assert_eq!(decoded.status, "접수중");
    }

    #[test]
    fn reception_without_action_falls_back_to_title_link() {
        let row = RawRow::new(vec![
            RawCell::from_text("2"),
            RawCell::from_text("요가").with_anchor(link("요가", "/reserve/view.do?id=9")),
            RawCell::from_text("체육과"),
            RawCell::from_text("2025-09-01\n2025-09-05"),
            RawCell::from_text("추첨"),
            RawCell::from_text("0\n30"),
            RawCell::from_text("무료"),
            RawCell::from_text("대기"),
        ]);
        let decoded = OnlineReceptionRow {
            status: "접수예정".into(),
        }
        .decode(&row, &base())
        .unwrap();
        assert_eq!(decoded.url, "https://www.ddm.go.kr/reserve/view.do?id=9");
        assert_eq!(decoded.fields["button_text"], "");
    }

    #[test]
    fn short_rows_decode_to_nothing() {
        let short = RawRow::new(vec![RawCell::from_text("1"), RawCell::from_text("제목")]);
        assert_eq!(EventBoardRow.decode_cells(&short, &base()), None);
        let reserve = ReserveProgramRow {
            status: "접수중".into(),
        };
        assert_eq!(reserve.decode_cells(&short, &base()), None);
        assert_eq!(WarakCardRow.decode_cells(&RawRow::default(), &base()), None);
    }

    #[test]
    fn closed_warak_cards_are_excluded() {
        let card = |status: &str| {
            RawRow::new(vec![
                RawCell::from_text(status),
                RawCell::from_text("8/12 부모 특강"),
                RawCell::from_text("#부모"),
                RawCell::from_text(""),
                RawCell::default().with_anchor(link("", "https://www.ddmwarak.com/service-page/x")),
            ])
        };
        let closed = WarakCardRow.decode(&card("마감"), &base()).unwrap();
        assert!(closed.excluded);
        assert_eq!(closed.date_text, "8/12 부모 특강");

        let decoded = WarakCardRow.decode(&card("예약하기"), &base()).unwrap();
        assert!(!decoded.excluded);
        assert_eq!(decoded.date_text, "8/12 부모 특강");
        assert_eq!(decoded.fields["duration"], "시간 정보 없음");
        assert_eq!(decoded.url, "https://www.ddmwarak.com/service-page/x");
    }
}
