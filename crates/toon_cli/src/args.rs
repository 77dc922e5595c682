use std::path::PathBuf;

use clap::{ArgAction, Parser};
use toon_core::DuplicatePolicy;
use toon_engine::{EngineConfig, HarvestError, SeriesRequest};
use toon_logging::LogDestination;

/// Download a webtoon series as image folders and comic archives.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Series URL, e.g. https://www.webtoons.com/en/fantasy/tower-of-god/list?title_no=95
    pub url: String,

    /// First episode number to download (inclusive)
    #[arg(long)]
    pub start: Option<u32>,

    /// Last episode number to download (inclusive)
    #[arg(long)]
    pub end: Option<u32>,

    /// Only download the latest episode
    #[arg(long)]
    pub latest: bool,

    /// Parent directory; the series gets its own folder inside it
    #[arg(short, long, default_value = ".")]
    pub dest: PathBuf,

    /// Skip building a .cbz archive per chapter
    #[arg(long = "no-compress", action = ArgAction::SetFalse)]
    pub compress: bool,

    /// Delete each chapter's image folder once its archive is written
    #[arg(long)]
    pub remove_uncompressed: bool,

    /// Print the selected chapters as JSON lines and exit
    #[arg(long)]
    pub list: bool,

    /// Increase log verbosity (-v errors .. -vvvv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Also write the log to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Chapters downloaded at the same time [default: CPU count]
    #[arg(long)]
    pub chapter_workers: Option<usize>,

    /// Images downloaded at the same time within a chapter
    #[arg(long, default_value_t = 16)]
    pub image_workers: usize,

    /// Extra attempts for an image after an HTTP or network failure
    #[arg(long, default_value_t = 0)]
    pub page_retries: u32,

    /// Episode numbers listed twice: reject, keep-first or keep-last
    #[arg(long, default_value_t = DuplicatePolicy::KeepFirst)]
    pub duplicates: DuplicatePolicy,
}

impl Args {
    pub fn request(&self) -> Result<SeriesRequest, HarvestError> {
        SeriesRequest::new(&self.url, self.start, self.end, self.latest)
    }

    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::default_with_output(self.dest.clone());
        if let Some(workers) = self.chapter_workers {
            config.chapter_workers = workers.max(1);
        }
        config.retrieve.image_workers = self.image_workers.max(1);
        config.retrieve.page_retries = self.page_retries;
        config.package.compress = self.compress;
        config.package.keep_uncompressed = !self.remove_uncompressed;
        config.duplicate_policy = self.duplicates;
        config
    }

    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }
}
