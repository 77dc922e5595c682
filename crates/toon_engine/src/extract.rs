use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use toon_core::{ChapterInfo, SeriesInfo};
use toon_logging::{toon_debug, toon_warn};

/// Label of the pagination link that leads to the next block of pages.
pub const NEXT_PAGE_LABEL: &str = "Next Page";

const RELEASE_DATE_FORMAT: &str = "%b %d, %Y";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("series page has no {0} meta tag")]
    MissingField(&'static str),
}

/// Pagination control found on a chapter-list page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pagination {
    Absent,
    /// Something is marked as pagination but is not the expected container.
    Malformed,
    Links(Vec<PaginationLink>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationLink {
    pub label: String,
    pub href: String,
}

impl PaginationLink {
    pub fn is_next_page(&self) -> bool {
        self.label == NEXT_PAGE_LABEL
    }

    /// The current page is rendered as a `#` link.
    pub fn is_placeholder(&self) -> bool {
        self.href == "#"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub width: u32,
    pub height: u32,
    pub url: String,
}

/// Site-specific reading of fetched pages.
pub trait SiteExtractor: Send + Sync {
    fn series_info(&self, html: &str) -> Result<SeriesInfo, MetadataError>;
    fn chapters(&self, html: &str) -> Vec<ChapterInfo>;
    fn pagination(&self, html: &str) -> Pagination;
    /// `None` when the viewer page has no image container at all.
    fn images(&self, html: &str) -> Option<Vec<ImageDescriptor>>;
}

/// Extractor for the webtoons.com markup.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebtoonExtractor;

impl SiteExtractor for WebtoonExtractor {
    fn series_info(&self, html: &str) -> Result<SeriesInfo, MetadataError> {
        let doc = Html::parse_document(html);

        // Later tags override earlier ones.
        let meta = |property: &str| {
            let css = format!(r#"meta[property="{property}"]"#);
            Selector::parse(&css).ok().and_then(|sel| {
                doc.select(&sel)
                    .filter_map(|el| el.value().attr("content"))
                    .last()
                    .map(str::to_string)
            })
        };

        let title = meta("og:title").ok_or(MetadataError::MissingField("og:title"))?;
        let url = meta("og:url").ok_or(MetadataError::MissingField("og:url"))?;
        let image = meta("og:image").ok_or(MetadataError::MissingField("og:image"))?;
        let description =
            meta("og:description").ok_or(MetadataError::MissingField("og:description"))?;
        let author = meta("com-linewebtoon:webtoon:author").unwrap_or_default();

        let genres: Vec<String> = Selector::parse("h2.genre")
            .map(|sel| doc.select(&sel).map(element_text).collect())
            .unwrap_or_default();

        Ok(SeriesInfo::new(title, description, &image, url, author, genres))
    }

    fn chapters(&self, html: &str) -> Vec<ChapterInfo> {
        let doc = Html::parse_document(html);
        let Ok(entry_sel) = Selector::parse("li[data-episode-no]") else {
            return Vec::new();
        };
        doc.select(&entry_sel)
            .filter_map(|entry| match parse_chapter_entry(entry) {
                Ok(chapter) => Some(chapter),
                Err(reason) => {
                    toon_warn!("Skipping chapter entry: {}", reason);
                    None
                }
            })
            .collect()
    }

    fn pagination(&self, html: &str) -> Pagination {
        let doc = Html::parse_document(html);
        let (Ok(container_sel), Ok(link_sel)) = (Selector::parse(".paginate"), Selector::parse("a"))
        else {
            return Pagination::Absent;
        };
        let Some(container) = doc.select(&container_sel).next() else {
            return Pagination::Absent;
        };
        if container.value().name() != "div" {
            return Pagination::Malformed;
        }

        let links = container
            .select(&link_sel)
            .filter_map(|anchor| {
                let href = anchor.value().attr("href")?.trim().to_string();
                Some(PaginationLink {
                    label: element_text(anchor),
                    href,
                })
            })
            .collect();
        Pagination::Links(links)
    }

    fn images(&self, html: &str) -> Option<Vec<ImageDescriptor>> {
        let doc = Html::parse_document(html);
        let container_sel = Selector::parse("div#_imageList").ok()?;
        let container = doc.select(&container_sel).next()?;

        // Direct children only, in document order.
        let images = container
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "img")
            .filter_map(|img| {
                let attrs = img.value();
                // `src` only holds the lazy-load placeholder.
                let Some(url) = attrs.attr("data-url") else {
                    toon_warn!("Image without data-url in viewer page, skipping");
                    return None;
                };
                Some(ImageDescriptor {
                    width: dimension(attrs.attr("width")),
                    height: dimension(attrs.attr("height")),
                    url: url.trim().to_string(),
                })
            })
            .collect();
        Some(images)
    }
}

fn parse_chapter_entry(entry: ElementRef<'_>) -> Result<ChapterInfo, String> {
    let raw_number = entry.value().attr("data-episode-no").unwrap_or_default();
    let episode_number: u32 = raw_number
        .trim()
        .parse()
        .map_err(|_| format!("episode number {raw_number:?} is not an integer"))?;

    let title = first_text(entry, "span.subj")
        .ok_or_else(|| format!("episode {episode_number} has no title"))?;
    let raw_date = first_text(entry, "span.date")
        .ok_or_else(|| format!("episode {episode_number} has no release date"))?;
    let release_date = NaiveDate::parse_from_str(&raw_date, RELEASE_DATE_FORMAT)
        .map_err(|err| format!("episode {episode_number} date {raw_date:?}: {err}"))?;
    let viewer_url = Selector::parse("a")
        .ok()
        .and_then(|sel| entry.select(&sel).find_map(|a| a.value().attr("href")))
        .map(|href| href.trim().to_string())
        .ok_or_else(|| format!("episode {episode_number} has no viewer link"))?;

    Ok(ChapterInfo {
        title,
        episode_number,
        release_date,
        viewer_url,
    })
}

fn first_text(root: ElementRef<'_>, css: &str) -> Option<String> {
    let sel = Selector::parse(css).ok()?;
    root.select(&sel).next().map(element_text)
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Dimensions are fractional on some pages; round up like the viewer does.
fn dimension(raw: Option<&str>) -> u32 {
    match raw.map(str::trim).map(str::parse::<f64>) {
        Some(Ok(value)) if value.is_finite() && value >= 0.0 => value.ceil() as u32,
        Some(_) => {
            toon_debug!("Unparseable image dimension {:?}", raw);
            0
        }
        None => 0,
    }
}
