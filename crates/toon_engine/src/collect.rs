use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::future::join_all;
use toon_core::{resolve_duplicates, sort_chapters, ChapterInfo, DuplicateEpisodeError, DuplicatePolicy};
use toon_logging::{toon_debug, toon_warn};
use url::Url;

use crate::extract::SiteExtractor;
use crate::fetch::{Fetcher, ProgressSink};
use crate::EngineEvent;

/// Fetches every chapter-list page concurrently and merges their entries
/// with the root page's own.
///
/// Merge order is the root page first, then `page_hrefs` in set order, so the
/// duplicate policy is deterministic no matter which fetch finishes first. The
/// result is sorted ascending by episode number.
pub async fn collect_chapters(
    fetcher: &dyn Fetcher,
    extractor: &dyn SiteExtractor,
    base_url: &Url,
    page_hrefs: &BTreeSet<String>,
    root_chapters: Vec<ChapterInfo>,
    policy: DuplicatePolicy,
    sink: &dyn ProgressSink,
) -> Result<Vec<ChapterInfo>, DuplicateEpisodeError> {
    let total = page_hrefs.len();
    let fetched = AtomicUsize::new(0);

    let per_page = join_all(page_hrefs.iter().map(|href| {
        let fetched = &fetched;
        async move {
            let url = match base_url.join(href) {
                Ok(url) => url,
                Err(err) => {
                    toon_warn!("Invalid chapter-list link {:?}: {}", href, err);
                    return Vec::new();
                }
            };
            let chapters = match fetcher.fetch_document(url.as_str()).await {
                Ok(doc) => extractor.chapters(&doc.html),
                Err(err) => {
                    toon_warn!("Skipping chapter-list page: {}", err);
                    Vec::new()
                }
            };
            let done = fetched.fetch_add(1, Ordering::Relaxed) + 1;
            sink.emit(EngineEvent::ChapterListFetched {
                fetched: done,
                total,
            });
            toon_debug!("{} chapters on {}", chapters.len(), url);
            chapters
        }
    }))
    .await;

    let merged: Vec<ChapterInfo> = root_chapters
        .into_iter()
        .chain(per_page.into_iter().flatten())
        .collect();
    let mut chapters = resolve_duplicates(merged, policy)?;
    sort_chapters(&mut chapters);
    Ok(chapters)
}
