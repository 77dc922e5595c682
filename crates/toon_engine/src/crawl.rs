use std::collections::{BTreeSet, HashSet};

use toon_logging::{toon_debug, toon_error, toon_info, toon_trace, toon_warn};
use url::Url;

use crate::extract::{Pagination, SiteExtractor};
use crate::fetch::{Fetcher, ProgressSink};
use crate::EngineEvent;

/// Discovers every chapter-list page reachable from the root page's
/// pagination control, returned as the hrefs found in the markup.
///
/// A "Next Page" link is only known once the page before it has been
/// fetched, so this walks the chain one page at a time. An empty set means
/// the root page is the only page. Fetch failures end the walk early with
/// whatever has been found so far.
pub async fn crawl_chapter_list_pages(
    fetcher: &dyn Fetcher,
    extractor: &dyn SiteExtractor,
    base_url: &Url,
    root_html: &str,
    sink: &dyn ProgressSink,
) -> BTreeSet<String> {
    let mut pages = BTreeSet::new();
    let mut followed = HashSet::new();
    let mut total = 0usize;
    let mut resolved = 0usize;
    let mut fetched_html: Option<String> = None;

    loop {
        let html = fetched_html.as_deref().unwrap_or(root_html);
        let links = match extractor.pagination(html) {
            Pagination::Absent => break,
            Pagination::Malformed => {
                toon_error!("Unable to paginate for more chapters, returning what we have");
                break;
            }
            Pagination::Links(links) => links,
        };

        toon_debug!("Found pagination with {} links", links.len());
        total += links.len();
        sink.emit(EngineEvent::ChapterListPages { resolved, total });

        let mut next_page = None;
        for link in links {
            if link.is_next_page() {
                // Once the next block is shown this URL collapses to `#`,
                // so it has to be recorded here.
                pages.insert(link.href.clone());
                next_page = Some(link.href);
            } else if link.is_placeholder() {
                continue;
            } else {
                toon_trace!("Chapter-list page {}", link.href);
                resolved += 1;
                pages.insert(link.href);
                sink.emit(EngineEvent::ChapterListPages { resolved, total });
            }
        }

        let Some(href) = next_page else {
            break;
        };
        if !followed.insert(href.clone()) {
            toon_warn!("Pagination loops back to {}, stopping", href);
            break;
        }
        let next_url = match base_url.join(&href) {
            Ok(url) => url,
            Err(err) => {
                toon_warn!("Invalid next page link {:?}: {}", href, err);
                break;
            }
        };
        match fetcher.fetch_document(next_url.as_str()).await {
            Ok(doc) => fetched_html = Some(doc.html),
            Err(err) => {
                toon_error!("Could not fetch next chapter-list page: {}", err);
                break;
            }
        }
    }

    if !pages.is_empty() {
        toon_info!("Found {} chapter-list pages", pages.len());
    }
    pages
}
