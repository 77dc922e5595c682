use std::path::{Path, PathBuf};

use futures_util::stream::{self, StreamExt};
use toon_core::{apply_completions, zero_padding_width, ChapterInfo, PageCompletion, PageInfo};
use toon_logging::{toon_debug, toon_error, toon_info};
use url::Url;

use crate::extract::SiteExtractor;
use crate::fetch::{Fetcher, ProgressSink};
use crate::filename::page_filename;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::{ChapterError, EngineEvent, FetchOutput, HeaderProfile, PageError, PageFailure, RetrievalError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrieveSettings {
    /// Concurrent image downloads within one chapter.
    pub image_workers: usize,
    /// Extra attempts for an image after a status or transport failure.
    pub page_retries: u32,
}

impl Default for RetrieveSettings {
    fn default() -> Self {
        Self {
            image_workers: 16,
            page_retries: 0,
        }
    }
}

/// Pages of one chapter after their downloads settled. Failed pages keep a
/// byte size of 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterDownload {
    pub pages: Vec<PageInfo>,
    pub written: Vec<PathBuf>,
    pub failed: Vec<PageFailure>,
}

/// Maps a declared image content type to a file extension.
pub fn image_extension(content_type: Option<&str>) -> Option<&'static str> {
    let mime = content_type?.split(';').next()?.trim();
    if mime.eq_ignore_ascii_case("image/jpeg") {
        Some("jpg")
    } else if mime.eq_ignore_ascii_case("image/png") {
        Some("png")
    } else {
        None
    }
}

/// Downloads every image of `chapter` into `chapter_dir`.
///
/// Page order comes from the viewer markup, never from download completion
/// order. A page that fails is logged and skipped; only a missing image list
/// or an unreachable viewer page fails the chapter.
pub async fn retrieve_chapter(
    fetcher: &dyn Fetcher,
    extractor: &dyn SiteExtractor,
    base_url: &Url,
    chapter: &ChapterInfo,
    chapter_dir: &Path,
    settings: RetrieveSettings,
    sink: &dyn ProgressSink,
) -> Result<ChapterDownload, ChapterError> {
    let episode_number = chapter.episode_number;
    let viewer_url = base_url.join(&chapter.viewer_url).map_err(|err| {
        RetrievalError::new(crate::FailureKind::InvalidUrl, &chapter.viewer_url, err.to_string())
    })?;
    let viewer = fetcher.fetch_document(viewer_url.as_str()).await?;

    let images = extractor
        .images(&viewer.html)
        .ok_or(ChapterError::ChapterUnavailable { episode_number })?;

    let mut pages: Vec<PageInfo> = images
        .into_iter()
        .enumerate()
        .map(|(index, image)| {
            let url = viewer_url
                .join(&image.url)
                .map(String::from)
                .unwrap_or(image.url);
            PageInfo::new(index, image.width, image.height, url)
        })
        .collect();
    let width = zero_padding_width(pages.len());

    sink.emit(EngineEvent::ChapterStarted {
        episode_number,
        page_count: pages.len(),
    });
    toon_debug!("Chapter {} has {} pages", episode_number, pages.len());

    let writer = AtomicFileWriter::new(chapter_dir.to_path_buf());
    let outcomes: Vec<(usize, Result<(PageCompletion, PathBuf), PageError>)> =
        stream::iter(pages.clone())
            .map(|page| {
                let writer = writer.clone();
                async move {
                    let outcome =
                        download_page(fetcher, &page, &writer, width, settings.page_retries).await;
                    (page.index, outcome)
                }
            })
            .buffer_unordered(settings.image_workers.max(1))
            .collect()
            .await;

    let mut completions = Vec::with_capacity(outcomes.len());
    let mut written = Vec::with_capacity(outcomes.len());
    let mut failed = Vec::new();
    for (index, outcome) in outcomes {
        match outcome {
            Ok((completion, path)) => {
                sink.emit(EngineEvent::PageCompleted {
                    episode_number,
                    index,
                    byte_size: completion.byte_size,
                });
                completions.push(completion);
                written.push(path);
            }
            Err(err) => {
                let url = pages.get(index).map(|p| p.url.clone()).unwrap_or_default();
                toon_error!(
                    "Chapter {}: could not retrieve page {} ({}): {}",
                    episode_number,
                    index,
                    url,
                    err
                );
                sink.emit(EngineEvent::PageFailed {
                    episode_number,
                    index,
                    reason: err.to_string(),
                });
                failed.push(PageFailure {
                    index,
                    url,
                    reason: err.to_string(),
                });
            }
        }
    }

    apply_completions(&mut pages, &completions);
    written.sort();
    failed.sort_by_key(|failure| failure.index);

    toon_info!(
        "Chapter {}: {} of {} pages written",
        episode_number,
        written.len(),
        pages.len()
    );
    Ok(ChapterDownload {
        pages,
        written,
        failed,
    })
}

async fn download_page(
    fetcher: &dyn Fetcher,
    page: &PageInfo,
    writer: &AtomicFileWriter,
    width: usize,
    retries: u32,
) -> Result<(PageCompletion, PathBuf), PageError> {
    let output = fetch_with_retries(fetcher, &page.url, retries).await?;

    let content_type = output.metadata.content_type.clone();
    let extension = image_extension(content_type.as_deref()).ok_or_else(|| {
        PageError::UnsupportedContentType {
            content_type,
            url: page.url.clone(),
        }
    })?;

    let filename = page_filename(page.index, width, extension);
    let byte_size = output.bytes.len() as u64;
    let writer = writer.clone();
    let bytes = output.bytes;
    let path = tokio::task::spawn_blocking(move || writer.write(&filename, &bytes))
        .await
        .map_err(|err| PersistError::Io(std::io::Error::other(err)))??;

    Ok((
        PageCompletion {
            index: page.index,
            byte_size,
        },
        path,
    ))
}

async fn fetch_with_retries(
    fetcher: &dyn Fetcher,
    url: &str,
    retries: u32,
) -> Result<FetchOutput, RetrievalError> {
    let mut attempt = 0;
    loop {
        match fetcher.fetch(url, HeaderProfile::Asset).await {
            Err(err) if attempt < retries && err.is_transient() => {
                attempt += 1;
                toon_debug!("Retrying {} ({}/{}): {}", url, attempt, retries, err);
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_map_to_extensions() {
        assert_eq!(image_extension(Some("image/jpeg")), Some("jpg"));
        assert_eq!(image_extension(Some("image/PNG; charset=binary")), Some("png"));
        assert_eq!(image_extension(Some("image/webp")), None);
        assert_eq!(image_extension(None), None);
    }
}
