use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::cookie::Jar;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT_LANGUAGE, CONTENT_TYPE, REFERER, USER_AGENT,
};
use tokio::sync::Semaphore;
use toon_logging::toon_debug;

use crate::decode::decode_document;
use crate::{Document, EngineEvent, FailureKind, FetchMetadata, FetchOutput, HeaderProfile, RetrievalError};

#[cfg(target_os = "windows")]
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) \
Chrome/92.0.4515.107 Safari/537.36";
#[cfg(not(target_os = "windows"))]
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux ppc64le; rv:75.0) \
Gecko/20100101 Firefox/75.0";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// Upper bound on simultaneous requests across every caller sharing the
    /// fetcher; also the idle pool size per host.
    pub max_connections: usize,
    pub user_agent: String,
    pub accept_language: String,
    pub asset_referer: String,
    /// `Set-Cookie` style strings stored for `cookie_url` before the first request.
    pub cookies: Vec<String>,
    pub cookie_url: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 32 * 1024 * 1024,
            max_connections: 100,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            asset_referer: "https://www.webtoons.com/".to_string(),
            cookies: ["needGDPR", "needCCPA", "needCOPPA"]
                .iter()
                .map(|name| format!("{name}=FALSE; Domain=.webtoons.com; Path=/"))
                .collect(),
            cookie_url: "https://www.webtoons.com/".to_string(),
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: EngineEvent) {}
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, profile: HeaderProfile) -> Result<FetchOutput, RetrievalError>;

    /// Fetches an HTML page with the page header profile and decodes it.
    async fn fetch_document(&self, url: &str) -> Result<Document, RetrievalError> {
        let output = self.fetch(url, HeaderProfile::Page).await?;
        Ok(decode_document(&output))
    }
}

/// Fetcher backed by one shared `reqwest` client, cookie jar and request
/// permit pool.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
    client: reqwest::Client,
    permits: Arc<Semaphore>,
    page_headers: HeaderMap,
    asset_headers: HeaderMap,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, RetrievalError> {
        let jar = Arc::new(Jar::default());
        if !settings.cookies.is_empty() {
            let cookie_url = reqwest::Url::parse(&settings.cookie_url).map_err(|err| {
                RetrievalError::new(FailureKind::InvalidUrl, &settings.cookie_url, err.to_string())
            })?;
            for cookie in &settings.cookies {
                jar.add_cookie_str(cookie, &cookie_url);
            }
        }

        let page_headers = build_headers(&settings, HeaderProfile::Page)?;
        let asset_headers = build_headers(&settings, HeaderProfile::Asset)?;

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .pool_max_idle_per_host(settings.max_connections)
            .cookie_provider(jar)
            .build()
            .map_err(|err| RetrievalError::new(FailureKind::Network, "", err.to_string()))?;

        let permits = Arc::new(Semaphore::new(settings.max_connections.max(1)));

        Ok(Self {
            settings,
            client,
            permits,
            page_headers,
            asset_headers,
        })
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    fn headers(&self, profile: HeaderProfile) -> HeaderMap {
        match profile {
            HeaderProfile::Page => self.page_headers.clone(),
            HeaderProfile::Asset => self.asset_headers.clone(),
        }
    }
}

fn build_headers(settings: &FetchSettings, profile: HeaderProfile) -> Result<HeaderMap, RetrievalError> {
    let value = |raw: &str| {
        HeaderValue::from_str(raw).map_err(|err| {
            RetrievalError::new(FailureKind::InvalidSettings, "", format!("header value {raw:?}: {err}"))
        })
    };

    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static("dnt"), HeaderValue::from_static("1"));
    headers.insert(USER_AGENT, value(&settings.user_agent)?);
    headers.insert(ACCEPT_LANGUAGE, value(&settings.accept_language)?);
    if profile == HeaderProfile::Asset {
        headers.insert(REFERER, value(&settings.asset_referer)?);
    }
    Ok(headers)
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, profile: HeaderProfile) -> Result<FetchOutput, RetrievalError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| RetrievalError::new(FailureKind::InvalidUrl, url, err.to_string()))?;

        // Held until the body is fully read so concurrent callers cannot
        // outgrow the connection pool.
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|err| RetrievalError::new(FailureKind::Network, url, err.to_string()))?;

        toon_debug!("GET {} ({:?})", url, profile);
        let response = self
            .client
            .get(parsed)
            .headers(self.headers(profile))
            .send()
            .await
            .map_err(|err| map_reqwest_error(url, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::new(
                FailureKind::HttpStatus(status.as_u16()),
                url,
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(RetrievalError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(content_len),
                    },
                    url,
                    "response too large",
                ));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| map_reqwest_error(url, err))?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(RetrievalError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    url,
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        let metadata = FetchMetadata {
            original_url: url.to_string(),
            final_url,
            content_type,
            byte_len: bytes.len() as u64,
        };

        Ok(FetchOutput {
            bytes: Bytes::from(bytes),
            metadata,
        })
    }
}

fn map_reqwest_error(url: &str, err: reqwest::Error) -> RetrievalError {
    if err.is_timeout() {
        return RetrievalError::new(FailureKind::Timeout, url, err.to_string());
    }
    if err.is_redirect() {
        return RetrievalError::new(FailureKind::RedirectLimitExceeded, url, err.to_string());
    }
    RetrievalError::new(FailureKind::Network, url, err.to_string())
}
