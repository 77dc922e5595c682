use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use thiserror::Error;
use toon_core::{DuplicateEpisodeError, Phase, SelectionError};

use crate::extract::MetadataError;
use crate::package::PackageError;
use crate::persist::PersistError;

/// Header set used for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProfile {
    /// Generic site headers, used for every HTML page.
    Page,
    /// Page headers plus the referer the image host insists on.
    Asset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Bytes,
    pub metadata: FetchMetadata,
}

/// A fetched HTML page, decoded to UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub url: String,
    pub html: String,
    pub encoding_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} fetching {url}: {message}")]
pub struct RetrievalError {
    pub kind: FailureKind,
    pub url: String,
    pub message: String,
}

impl RetrievalError {
    pub(crate) fn new(kind: FailureKind, url: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.to_string(),
            message: message.into(),
        }
    }

    /// Status and transport failures may succeed on another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            FailureKind::HttpStatus(_) | FailureKind::Timeout | FailureKind::Network
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    InvalidSettings,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::InvalidSettings => write!(f, "invalid fetch settings"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Failure of a single image; the rest of the chapter carries on.
#[derive(Debug, Error)]
pub enum PageError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error("unable to handle content type {content_type:?} from {url}")]
    UnsupportedContentType {
        content_type: Option<String>,
        url: String,
    },
    #[error("failed to write page: {0}")]
    Persist(#[from] PersistError),
}

/// Failure of a whole chapter job; sibling chapters carry on.
#[derive(Debug, Error)]
pub enum ChapterError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error("unable to download chapter {episode_number}: viewer page has no image list")]
    ChapterUnavailable { episode_number: u32 },
    #[error("failed to prepare chapter directory: {0}")]
    Persist(#[from] PersistError),
    #[error("failed to package chapter: {0}")]
    Package(#[from] PackageError),
    #[error("chapter job ended abnormally: {0}")]
    Aborted(String),
}

/// Failures that end a whole series run.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error("failed to fetch series page: {0}")]
    Retrieval(#[from] RetrievalError),
    #[error("failed to resolve series metadata: {0}")]
    Metadata(#[from] MetadataError),
    #[error("failed to prepare series directory: {0}")]
    Persist(#[from] PersistError),
    #[error(transparent)]
    Duplicate(#[from] DuplicateEpisodeError),
    #[error("interrupted before any chapter was downloaded")]
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub index: usize,
    pub url: String,
    pub reason: String,
}

/// What one chapter job produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterReport {
    pub episode_number: u32,
    pub directory: PathBuf,
    pub page_count: usize,
    pub pages_written: usize,
    pub failed_pages: Vec<PageFailure>,
    pub comic_info: PathBuf,
    pub archive: Option<PathBuf>,
}

/// Progress notifications. Counters may arrive out of completion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    PhaseChanged(Phase),
    /// Pagination crawl: `total` grows as pages reveal more links.
    ChapterListPages { resolved: usize, total: usize },
    /// Chapter collection: chapter-list pages fetched so far.
    ChapterListFetched { fetched: usize, total: usize },
    ChapterStarted { episode_number: u32, page_count: usize },
    PageCompleted {
        episode_number: u32,
        index: usize,
        byte_size: u64,
    },
    PageFailed {
        episode_number: u32,
        index: usize,
        reason: String,
    },
    ChapterCompleted {
        episode_number: u32,
        result: Result<ChapterReport, String>,
    },
}
