use std::fmt;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};

use crate::listing::PageRequest;
use crate::{FailureKind, FetchError, FetchMetadata, FetchOutput};

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";
const BOARD_LANGUAGES: &str = "ko-KR,ko;q=0.9,en;q=0.5";
const LISTING_ACCEPT: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.5";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub user_agent: String,
    /// Media types a listing page may be served as; parameters are ignored.
    pub listing_types: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            listing_types: vec!["text/html".to_string(), "application/xhtml+xml".to_string()],
        }
    }
}

/// Fetch collaborator: one page request in, raw document bytes out.
///
/// A rendering implementation would load the page in a browser and return
/// the DOM once `request.ready_marker` shows up; the plain HTTP fetcher
/// returns the response body and leaves the marker check to the parser.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &PageRequest) -> Result<FetchOutput, FetchError>;
}

/// Plain HTTP fetcher. One client serves every board of a run so
/// connections to the same portal are reused from page to page.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(LISTING_ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(BOARD_LANGUAGES));

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.as_str())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .build()
            .map_err(|err| {
                FetchError::new(FailureKind::Network, format!("building client: {err}"))
            })?;
        Ok(Self { client, settings })
    }

    fn is_listing_type(&self, content_type: &str) -> bool {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        self.settings
            .listing_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(essence))
    }

    async fn read_body(
        &self,
        request: &PageRequest,
        response: reqwest::Response,
    ) -> Result<Vec<u8>, FetchError> {
        let max_bytes = self.settings.max_bytes;
        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| transport_error(request, err))?;
            let len = (body.len() + chunk.len()) as u64;
            if len > max_bytes {
                return Err(too_large(request, max_bytes, len));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<FetchOutput, FetchError> {
        if !matches!(request.url.scheme(), "http" | "https") {
            return Err(page_error(
                request,
                FailureKind::InvalidUrl,
                "only http and https boards can be fetched",
            ));
        }
        let response = self
            .client
            .get(request.url.as_str())
            .send()
            .await
            .map_err(|err| transport_error(request, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(page_error(
                request,
                FailureKind::HttpStatus(status.as_u16()),
                status,
            ));
        }
        if let Some(declared) = response.content_length() {
            if declared > self.settings.max_bytes {
                return Err(too_large(request, self.settings.max_bytes, declared));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if let Some(ct) = content_type.as_deref().filter(|ct| !self.is_listing_type(ct)) {
            return Err(page_error(
                request,
                FailureKind::UnsupportedContentType {
                    content_type: ct.to_string(),
                },
                "not a listing page",
            ));
        }

        let final_url = response.url().to_string();
        let bytes = self.read_body(request, response).await?;
        Ok(FetchOutput {
            bytes,
            metadata: FetchMetadata {
                final_url,
                content_type,
            },
        })
    }
}

/// Failure naming the requested page URL, so paged boards show which page
/// index broke.
fn page_error(
    request: &PageRequest,
    kind: FailureKind,
    detail: impl fmt::Display,
) -> FetchError {
    FetchError::new(kind, format!("{} ({detail})", request.url))
}

fn too_large(request: &PageRequest, max_bytes: u64, actual: u64) -> FetchError {
    page_error(
        request,
        FailureKind::TooLarge {
            max_bytes,
            actual: Some(actual),
        },
        "listing page too large",
    )
}

fn transport_error(request: &PageRequest, err: reqwest::Error) -> FetchError {
    let kind = if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_redirect() {
        FailureKind::RedirectLimitExceeded
    } else {
        FailureKind::Network
    };
    page_error(request, kind, err.without_url())
}
