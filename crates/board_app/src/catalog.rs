//! The boards a run walks, and the output document each one feeds.

use std::sync::Arc;

use board_core::{
    BoardNoticeRow, EventBoardRow, ExpoRow, NewsRow, OnlineReceptionRow, ReserveProgramRow,
    RowDecoder, TerminationPolicy, WarakCardRow, YearInference,
};
use board_engine::{ListingSource, Pager, RowLayout, ACTIVE_SIBLING_PAGER};
use url::Url;

const EDU_BOARD_URL: &str = "https://www.ddm.go.kr/jinhak/selectBbsNttList.do";
const EXPO_BOARD_URL: &str = "https://www.ddm.go.kr/jinhak/selectUserExpoList.do";
const EDU_ROWS: &str = "table.p-table tbody tr";

const NEWS_LIST_URL: &str = "https://www.ddm.go.kr/www/selectBbsNttList.do";
const NEWS_VIEW_URL: &str = "https://www.ddm.go.kr/www/selectBbsNttView.do?key=575&bbsNo=38";
const NEWS_PLAIN_LIST_URL: &str = "https://www.ddm.go.kr/www/selectBbsNttList.do?key=575&bbsNo=38";

const RESERVE_PROGRAM_URL: &str = "https://www.ddm.go.kr/reserve/selectDongdaemunUserCourseList.do";
const RESERVE_RECEPTION_URL: &str =
    "https://www.ddm.go.kr/reserve/selectUserOnlineReceptionList.do";
const RESERVE_MARKER: &str = "tbody.text_center";

const WARAK_URL: &str =
    "https://www.ddmwarak.com/book-online?category=44962198-7cc6-4efd-83be-39d4dd7f08d8";

/// Reservation listing variants: status label and query value.
const RESERVE_VARIANTS: [(&str, &str); 2] = [("접수예정", "TBCCPT"), ("접수중", "ACCPT")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum OutputGroup {
    Warak,
    DdmEdu,
    DdmNews,
    DdmReserve,
}

impl OutputGroup {
    pub const ALL: [OutputGroup; 4] = [
        OutputGroup::Warak,
        OutputGroup::DdmEdu,
        OutputGroup::DdmNews,
        OutputGroup::DdmReserve,
    ];

    pub fn filename(self) -> &'static str {
        match self {
            OutputGroup::Warak => "warak_programs.json",
            OutputGroup::DdmEdu => "ddm_edu_programs.json",
            OutputGroup::DdmNews => "ddm_news.json",
            OutputGroup::DdmReserve => "ddm_reserve.json",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CatalogEntry {
    pub group: OutputGroup,
    pub source: ListingSource,
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn edu_board(
    id: &str,
    category: &str,
    url: &str,
    params: &[(&str, &str)],
    decoder: Arc<dyn RowDecoder>,
    policy: TerminationPolicy,
) -> Result<CatalogEntry, url::ParseError> {
    Ok(CatalogEntry {
        group: OutputGroup::DdmEdu,
        source: ListingSource {
            id: id.to_string(),
            category: category.to_string(),
            url: Url::parse(url)?,
            params: pairs(params),
            page_param: Some("pageIndex".to_string()),
            layout: RowLayout::Table {
                rows: EDU_ROWS.to_string(),
            },
            pager: Pager::NextLink(ACTIVE_SIBLING_PAGER.to_string()),
            ready_marker: None,
            decoder,
            policy,
            years: YearInference::default(),
        },
    })
}

fn reserve_board(
    id: &str,
    category: &str,
    url: &str,
    params: Vec<(String, String)>,
    rows: &str,
    decoder: Arc<dyn RowDecoder>,
) -> Result<CatalogEntry, url::ParseError> {
    Ok(CatalogEntry {
        group: OutputGroup::DdmReserve,
        source: ListingSource {
            id: id.to_string(),
            category: category.to_string(),
            url: Url::parse(url)?,
            params,
            page_param: None,
            layout: RowLayout::Table {
                rows: rows.to_string(),
            },
            pager: Pager::SinglePage,
            ready_marker: Some(RESERVE_MARKER.to_string()),
            decoder,
            policy: TerminationPolicy::UnsortedBoard,
            years: YearInference::default(),
        },
    })
}

/// Every board in run order.
pub(crate) fn catalog() -> Result<Vec<CatalogEntry>, url::ParseError> {
    let sorted = TerminationPolicy::SortedBoard;
    let event: Arc<dyn RowDecoder> = Arc::new(EventBoardRow);
    let expo: Arc<dyn RowDecoder> = Arc::new(ExpoRow);

    let mut entries = vec![CatalogEntry {
        group: OutputGroup::Warak,
        source: ListingSource {
            id: "warak".to_string(),
            category: "와락센터".to_string(),
            url: Url::parse(WARAK_URL)?,
            params: Vec::new(),
            page_param: None,
            layout: RowLayout::Cards {
                items: "li.sWsUGva".to_string(),
                cells: vec![
                    "span.sqQSaw2".to_string(),
                    "h2.sK8oMUK".to_string(),
                    "p.sYCZueN".to_string(),
                    "p.s__8v7Zit".to_string(),
                    "a.sk3GcZh".to_string(),
                ],
            },
            pager: Pager::SinglePage,
            ready_marker: Some("ul.sVaQi4G".to_string()),
            decoder: Arc::new(WarakCardRow),
            policy: TerminationPolicy::UnsortedBoard,
            years: YearInference::Sequence,
        },
    }];

    entries.extend([
        edu_board(
            "edu_notices",
            "공지사항",
            EDU_BOARD_URL,
            &[("bbsNo", "175"), ("key", "3646")],
            Arc::new(BoardNoticeRow),
            TerminationPolicy::Notice { lookback_months: 2 },
        )?,
        edu_board(
            "expo_university",
            "대입수시박람회",
            EXPO_BOARD_URL,
            &[("key", "3634"), ("expoTypeNo", "7")],
            expo.clone(),
            sorted,
        )?,
        edu_board(
            "camps",
            "방학캠프",
            EDU_BOARD_URL,
            &[("bbsNo", "332"), ("key", "3622")],
            event.clone(),
            sorted,
        )?,
        edu_board(
            "parent_programs",
            "학부모역량강화",
            EDU_BOARD_URL,
            &[("bbsNo", "333"), ("key", "3623")],
            event.clone(),
            sorted,
        )?,
        edu_board(
            "expo_college",
            "전문대학정보박람회",
            EXPO_BOARD_URL,
            &[("key", "3635"), ("expoTypeNo", "2")],
            expo.clone(),
            sorted,
        )?,
        edu_board(
            "expo_highschool",
            "고교입학박람회",
            EXPO_BOARD_URL,
            &[("key", "3636"), ("expoTypeNo", "1")],
            expo,
            sorted,
        )?,
        edu_board(
            "parent_lectures",
            "학부모진학교실",
            EDU_BOARD_URL,
            &[("bbsNo", "345"), ("key", "3632")],
            event,
            TerminationPolicy::UnsortedBoard,
        )?,
    ]);

    entries.push(CatalogEntry {
        group: OutputGroup::DdmNews,
        source: ListingSource {
            id: "news".to_string(),
            category: "교육소식".to_string(),
            url: Url::parse(NEWS_LIST_URL)?,
            params: pairs(&[("key", "575"), ("bbsNo", "38"), ("searchCtgry", "교육")]),
            page_param: Some("pageIndex".to_string()),
            layout: RowLayout::Table {
                rows: "tbody.text_center tr".to_string(),
            },
            pager: Pager::UntilEmpty,
            ready_marker: Some("tbody.text_center".to_string()),
            decoder: Arc::new(NewsRow {
                view_url: NEWS_VIEW_URL.to_string(),
                list_url: NEWS_PLAIN_LIST_URL.to_string(),
            }),
            policy: TerminationPolicy::Notice { lookback_months: 1 },
            years: YearInference::default(),
        },
    });

    for (status, code) in RESERVE_VARIANTS {
        entries.push(reserve_board(
            &format!("reserve_programs_{}", code.to_ascii_lowercase()),
            "전체프로그램",
            RESERVE_PROGRAM_URL,
            pairs(&[
                ("key", "1529"),
                ("searchTime", "접수기간"),
                ("receptionStts", code),
                ("searchCnd", "SJ"),
            ]),
            "div.program.lecture tbody.text_center tr",
            Arc::new(ReserveProgramRow {
                status: status.to_string(),
            }),
        )?);
    }
    for (status, code) in RESERVE_VARIANTS {
        entries.push(reserve_board(
            &format!("reserve_reception_{}", code.to_ascii_lowercase()),
            "온라인접수",
            RESERVE_RECEPTION_URL,
            pairs(&[("key", "3133"), ("searchCnd", code)]),
            "div.online_accept.list tbody.text_center tr",
            Arc::new(OnlineReceptionRow {
                status: status.to_string(),
            }),
        )?);
    }

    Ok(entries)
}
