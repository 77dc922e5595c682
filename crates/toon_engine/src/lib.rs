//! Toon engine: fetching, discovery, downloads and packaging, driven by
//! the state machine in `toon_core`.
mod collect;
mod crawl;
mod decode;
mod engine;
mod extract;
mod fetch;
mod filename;
mod package;
mod persist;
mod retrieve;
mod types;

pub use collect::collect_chapters;
pub use crawl::crawl_chapter_list_pages;
pub use decode::decode_document;
pub use engine::{ChapterListing, EngineConfig, SeriesDownloader, SeriesReport, SeriesRequest};
pub use extract::{
    ImageDescriptor, MetadataError, Pagination, PaginationLink, SiteExtractor, WebtoonExtractor,
    NEXT_PAGE_LABEL,
};
pub use fetch::{FetchSettings, Fetcher, NullProgressSink, ProgressSink, ReqwestFetcher};
pub use filename::{chapter_dir_name, page_filename, sanitize_component};
pub use package::{
    compress_directory, package_chapter, ComicInfo, ComicPage, PackageError, PackageOptions,
    PackageOutput, PageKind, ARCHIVE_EXTENSION, COMIC_INFO_FILENAME,
};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use retrieve::{image_extension, retrieve_chapter, ChapterDownload, RetrieveSettings};
pub use types::{
    ChapterError, ChapterReport, Document, EngineEvent, FailureKind, FetchMetadata, FetchOutput,
    HarvestError, HeaderProfile, PageError, PageFailure, RetrievalError,
};
