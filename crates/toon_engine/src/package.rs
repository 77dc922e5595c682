//! ComicInfo sidecar and `.cbz` packaging for a finished chapter directory.

use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::Datelike;
use tempfile::NamedTempFile;
use thiserror::Error;
use toon_core::{ChapterInfo, PageInfo, SeriesInfo};
use toon_logging::{toon_debug, toon_info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::persist::{AtomicFileWriter, PersistError};

pub const COMIC_INFO_FILENAME: &str = "ComicInfo.xml";
pub const ARCHIVE_EXTENSION: &str = "cbz";

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("{0} has no parent directory to hold the archive")]
    NoParent(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    FrontCover,
    Story,
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageKind::FrontCover => write!(f, "FrontCover"),
            PageKind::Story => write!(f, "Story"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComicPage {
    pub image: usize,
    pub kind: PageKind,
    pub image_size: u64,
    pub image_width: u32,
    pub image_height: u32,
}

/// Comic reader metadata for one chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComicInfo {
    pub title: String,
    pub series: String,
    pub number: u32,
    pub summary: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub writer: String,
    pub genre: String,
    pub page_count: usize,
    pub web: String,
    pub pages: Vec<ComicPage>,
}

impl ComicInfo {
    pub fn build(series: &SeriesInfo, chapter: &ChapterInfo, pages: &[PageInfo]) -> Self {
        Self {
            title: chapter.title.clone(),
            series: series.title().to_string(),
            number: chapter.episode_number,
            summary: series.description().to_string(),
            year: chapter.release_date.year(),
            month: chapter.release_date.month(),
            day: chapter.release_date.day(),
            writer: series.author().to_string(),
            genre: series.genres().join(","),
            page_count: pages.len(),
            web: chapter.viewer_url.clone(),
            pages: pages
                .iter()
                .map(|page| ComicPage {
                    image: page.index,
                    kind: if page.is_cover() {
                        PageKind::FrontCover
                    } else {
                        PageKind::Story
                    },
                    image_size: page.byte_size(),
                    image_width: page.width,
                    image_height: page.height,
                })
                .collect(),
        }
    }

    /// Serializes to the `ComicInfo.xml` layout, two-space indented.
    pub fn to_xml(&self) -> String {
        let fields: [(&str, String); 13] = [
            ("Title", self.title.clone()),
            ("Series", self.series.clone()),
            ("Number", self.number.to_string()),
            ("Summary", self.summary.clone()),
            ("Year", self.year.to_string()),
            ("Month", self.month.to_string()),
            ("Day", self.day.to_string()),
            ("Writer", self.writer.clone()),
            ("Genre", self.genre.clone()),
            ("PageCount", self.page_count.to_string()),
            ("BlackAndWhite", "No".to_string()),
            ("Manga", "No".to_string()),
            ("Web", self.web.clone()),
        ];

        let mut lines = vec!["<ComicInfo>".to_string()];
        for (tag, value) in fields {
            lines.push(format!("  <{tag}>{}</{tag}>", xml_escape(&value)));
        }
        if self.pages.is_empty() {
            lines.push("  <Pages/>".to_string());
        } else {
            lines.push("  <Pages>".to_string());
            for page in &self.pages {
                lines.push(format!(
                    r#"    <Page Image="{}" Type="{}" ImageSize="{}" ImageWidth="{}" ImageHeight="{}"/>"#,
                    page.image, page.kind, page.image_size, page.image_width, page.image_height
                ));
            }
            lines.push("  </Pages>".to_string());
        }
        lines.push("</ComicInfo>".to_string());

        let mut xml = lines.join("\n");
        xml.push('\n');
        xml
    }
}

/// Escape XML special characters for element text.
pub fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageOptions {
    pub compress: bool,
    /// Leave the image directory in place after the archive is written.
    pub keep_uncompressed: bool,
}

impl Default for PackageOptions {
    fn default() -> Self {
        Self {
            compress: true,
            keep_uncompressed: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutput {
    pub comic_info: PathBuf,
    pub archive: Option<PathBuf>,
}

/// Writes the sidecar and, if asked, archives the chapter directory.
pub fn package_chapter(
    series: &SeriesInfo,
    chapter: &ChapterInfo,
    pages: &[PageInfo],
    chapter_dir: &Path,
    options: PackageOptions,
) -> Result<PackageOutput, PackageError> {
    let info = ComicInfo::build(series, chapter, pages);
    let writer = AtomicFileWriter::new(chapter_dir.to_path_buf());
    let comic_info = writer.write(COMIC_INFO_FILENAME, info.to_xml())?;

    let archive = if options.compress {
        let archive = compress_directory(chapter_dir)?;
        if !options.keep_uncompressed {
            fs::remove_dir_all(chapter_dir)?;
            toon_debug!("Removed {}", chapter_dir.display());
        }
        Some(archive)
    } else {
        None
    };

    Ok(PackageOutput {
        comic_info,
        archive,
    })
}

/// Zips every regular file of `dir` into a sibling `<dir>.cbz`, entries in
/// lexical name order.
pub fn compress_directory(dir: &Path) -> Result<PathBuf, PackageError> {
    let parent = dir
        .parent()
        .ok_or_else(|| PackageError::NoParent(dir.display().to_string()))?;
    let mut target = dir.as_os_str().to_owned();
    target.push(".");
    target.push(ARCHIVE_EXTENSION);
    let target = PathBuf::from(target);

    let mut entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let mut tmp = NamedTempFile::new_in(parent)?;
    {
        let mut zip = ZipWriter::new(tmp.as_file_mut());
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for entry in &entries {
            zip.start_file(entry.file_name().to_string_lossy(), options)?;
            let mut source = File::open(entry.path())?;
            io::copy(&mut source, &mut zip)?;
        }
        zip.finish()?;
    }
    tmp.as_file_mut().sync_all()?;
    tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;

    toon_info!("Packaged {} files into {}", entries.len(), target.display());
    Ok(target)
}
