use crate::JobResultKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// The series landing page was fetched.
    RootFetched,
    /// Series metadata was extracted from the landing page.
    MetadataResolved,
    /// The series output directory exists.
    DirectoryPrepared,
    /// Pagination crawl and chapter collection finished.
    ChaptersDiscovered { count: usize },
    /// The selector picked these episodes, in download order.
    ChaptersSelected { episode_numbers: Vec<u32> },
    /// Begin fanning chapters out to at most `workers` concurrent jobs.
    StartDownloads { workers: usize },
    /// A chapter job ended.
    ChapterFinished {
        episode_number: u32,
        result: JobResultKind,
    },
    /// External interrupt (Ctrl-C).
    InterruptReceived,
    NoOp,
}
