use std::sync::Arc;
use std::time::Duration;

use board_core::{BoardNoticeRow, TerminationPolicy, YearInference};
use board_engine::{
    FailureKind, FetchSettings, Fetcher, ListingSource, PageRequest, Pager, ReqwestFetcher,
    RowLayout,
};
use url::Url;
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(url: &str) -> PageRequest {
    PageRequest {
        source_id: "test".into(),
        page: 1,
        url: Url::parse(url).unwrap(),
        ready_marker: None,
    }
}

fn fetcher(settings: FetchSettings) -> ReqwestFetcher {
    ReqwestFetcher::new(settings).unwrap()
}

fn board_source(server: &MockServer) -> ListingSource {
    ListingSource {
        id: "edu_notice".into(),
        category: "공지사항".into(),
        url: Url::parse(&format!("{}/jinhak/selectBbsNttList.do", server.uri())).unwrap(),
        params: vec![("bbsNo".into(), "331".into())],
        page_param: Some("pageIndex".into()),
        layout: RowLayout::Table {
            rows: "tbody tr".into(),
        },
        pager: Pager::SinglePage,
        ready_marker: None,
        decoder: Arc::new(BoardNoticeRow),
        policy: TerminationPolicy::Notice { lookback_months: 2 },
        years: YearInference::default(),
    }
}

#[tokio::test]
async fn fetcher_returns_html_and_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>ok</html>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let fetcher = fetcher(FetchSettings::default());
    let url = format!("{}/doc", server.uri());

    let output = fetcher.fetch(&request(&url)).await.expect("fetch ok");
    assert_eq!(output.metadata.final_url, url);
    assert!(output
        .metadata
        .content_type
        .unwrap()
        .starts_with("text/html"));
    assert_eq!(output.bytes, b"<html>ok</html>");
}

#[tokio::test]
async fn page_requests_carry_the_page_index() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jinhak/selectBbsNttList.do"))
        .and(query_param("bbsNo", "331"))
        .and(query_param("pageIndex", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>two</p>", "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    let source = board_source(&server);
    let fetcher = fetcher(FetchSettings::default());
    let output = fetcher.fetch(&source.page_request(2)).await.expect("fetch ok");
    assert_eq!(output.bytes, b"<p>two</p>");
}

#[tokio::test]
async fn fetcher_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = fetcher(FetchSettings::default());
    let url = format!("{}/missing", server.uri());

    let err = fetcher.fetch(&request(&url)).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
}

#[tokio::test]
async fn fetcher_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_string("slow"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let fetcher = fetcher(settings);
    let url = format!("{}/slow", server.uri());

    let err = fetcher.fetch(&request(&url)).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn fetcher_rejects_too_large_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/html")
                .insert_header("Content-Length", "11")
                .set_body_string("01234567890"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: 10,
        ..FetchSettings::default()
    };
    let fetcher = fetcher(settings);
    let url = format!("{}/large", server.uri());

    let err = fetcher.fetch(&request(&url)).await.unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 10,
            actual: Some(11)
        }
    );
}

#[tokio::test]
async fn fetcher_rejects_non_html_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&server)
        .await;

    let fetcher = fetcher(FetchSettings::default());
    let url = format!("{}/data", server.uri());

    let err = fetcher.fetch(&request(&url)).await.unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::UnsupportedContentType {
            content_type: "application/json".into()
        }
    );
}

#[tokio::test]
async fn failures_name_the_page_that_broke() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jinhak/selectBbsNttList.do"))
        .and(query_param("pageIndex", "3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let request = board_source(&server).page_request(3);
    let err = fetcher(FetchSettings::default())
        .fetch(&request)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(500));
    assert!(err.message.contains("pageIndex=3"), "{}", err.message);
    assert!(err.to_string().starts_with("http status 500"));
}

#[tokio::test]
async fn boards_are_asked_for_korean_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ko"))
        .and(header_exists("accept-language"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>한국어</p>", "text/html"))
        .expect(2)
        .mount(&server)
        .await;

    let fetcher = fetcher(FetchSettings::default());
    let url = format!("{}/ko", server.uri());
    for _ in 0..2 {
        let output = fetcher.fetch(&request(&url)).await.expect("fetch ok");
        assert_eq!(output.bytes, "<p>한국어</p>".as_bytes());
    }
    let received = server.received_requests().await.unwrap();
    let language = received[0].headers.get("accept-language").unwrap();
    assert!(language.to_str().unwrap().starts_with("ko-KR"));
}

#[tokio::test]
async fn redirects_report_the_final_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", format!("{}/new", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>moved</p>", "text/html"))
        .mount(&server)
        .await;

    let url = format!("{}/old", server.uri());
    let output = fetcher(FetchSettings::default())
        .fetch(&request(&url))
        .await
        .expect("fetch ok");
    assert_eq!(output.metadata.final_url, format!("{}/new", server.uri()));

    let no_redirects = FetchSettings {
        redirect_limit: 0,
        ..FetchSettings::default()
    };
    let err = fetcher(no_redirects)
        .fetch(&request(&url))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::RedirectLimitExceeded);
}

#[tokio::test]
async fn non_http_urls_are_rejected_before_sending() {
    let err = fetcher(FetchSettings::default())
        .fetch(&request("ftp://www.ddm.go.kr/list"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}
