use chrono::NaiveDate;

use crate::urls::strip_crop_transform;

/// Series-level metadata resolved once from the series landing page.
///
/// The cover image URL never carries a crop transform: it is stripped on
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesInfo {
    title: String,
    description: String,
    image_url: String,
    canonical_url: String,
    author: String,
    genres: Vec<String>,
}

impl SeriesInfo {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        image_url: &str,
        canonical_url: impl Into<String>,
        author: impl Into<String>,
        genres: Vec<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            image_url: strip_crop_transform(image_url),
            canonical_url: canonical_url.into(),
            author: author.into(),
            genres,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn genres(&self) -> &[String] {
        &self.genres
    }
}

/// One entry of a chapter-list page.
///
/// Chapters are ordered by `episode_number` only; use [`sort_chapters`]
/// rather than comparing whole records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterInfo {
    pub title: String,
    pub episode_number: u32,
    pub release_date: NaiveDate,
    pub viewer_url: String,
}

/// Sorts ascending by episode number. Stable, so equal numbers keep their
/// relative order.
pub fn sort_chapters(chapters: &mut [ChapterInfo]) {
    chapters.sort_by_key(|chapter| chapter.episode_number);
}

/// One image of a chapter, in viewer order. Index 0 is the cover page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub url: String,
    byte_size: u64,
}

impl PageInfo {
    pub fn new(index: usize, width: u32, height: u32, url: impl Into<String>) -> Self {
        Self {
            index,
            width,
            height,
            url: url.into(),
            byte_size: 0,
        }
    }

    /// Size of the downloaded image, 0 until a completion has been applied.
    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    pub fn is_cover(&self) -> bool {
        self.index == 0
    }
}

/// Result of one successful page download, produced by the download worker
/// and applied by the chapter owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCompletion {
    pub index: usize,
    pub byte_size: u64,
}

/// Applies completion records to their pages. Records for unknown indexes are
/// ignored; returns how many pages were updated.
pub fn apply_completions(pages: &mut [PageInfo], completions: &[PageCompletion]) -> usize {
    let mut applied = 0;
    for completion in completions {
        // Pages are built contiguous from 0, so the index is the position.
        if let Some(page) = pages.get_mut(completion.index) {
            if page.index == completion.index {
                page.byte_size = completion.byte_size;
                applied += 1;
            }
        }
    }
    applied
}
