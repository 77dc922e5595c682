use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;
use toon_core::{
    normalize_series_url, update, zero_padding_width, ChapterInfo, ChapterSelection,
    DuplicatePolicy, Effect, JobResultKind, Msg, RunSummary, SeriesInfo, SeriesState,
};
use toon_logging::{toon_debug, toon_error, toon_info, toon_warn};
use url::Url;

use crate::collect::collect_chapters;
use crate::crawl::crawl_chapter_list_pages;
use crate::extract::{SiteExtractor, WebtoonExtractor};
use crate::fetch::{FetchSettings, Fetcher, NullProgressSink, ProgressSink, ReqwestFetcher};
use crate::filename::{chapter_dir_name, sanitize_component};
use crate::package::{package_chapter, PackageOptions};
use crate::persist::ensure_output_dir;
use crate::retrieve::{retrieve_chapter, RetrieveSettings};
use crate::{ChapterError, ChapterReport, EngineEvent, FailureKind, HarvestError, RetrievalError};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Parent folder; each series gets `<destination>/<series title>`.
    pub destination: PathBuf,
    pub fetch: FetchSettings,
    /// Chapters processed at the same time.
    pub chapter_workers: usize,
    pub retrieve: RetrieveSettings,
    pub package: PackageOptions,
    pub duplicate_policy: DuplicatePolicy,
}

impl EngineConfig {
    pub fn default_with_output(destination: PathBuf) -> Self {
        let chapter_workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            destination,
            fetch: FetchSettings::default(),
            chapter_workers,
            retrieve: RetrieveSettings::default(),
            package: PackageOptions::default(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

/// One series to download. Validated before anything touches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRequest {
    pub url: String,
    pub selection: ChapterSelection,
}

impl SeriesRequest {
    pub fn new(
        url: &str,
        start: Option<u32>,
        end: Option<u32>,
        latest: bool,
    ) -> Result<Self, HarvestError> {
        let selection = ChapterSelection::new(start, end, latest)?;
        Ok(Self {
            url: normalize_series_url(url),
            selection,
        })
    }
}

/// Chapters of a series before any image is downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterListing {
    pub series: SeriesInfo,
    /// Every discovered chapter, ascending by episode number.
    pub chapters: Vec<ChapterInfo>,
    pub selected: Vec<ChapterInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesReport {
    pub series: SeriesInfo,
    pub series_dir: PathBuf,
    pub summary: RunSummary,
    /// Successful chapters, ascending by episode number.
    pub chapters: Vec<ChapterReport>,
}

/// Drives a full series download: landing page, metadata, chapter
/// discovery, selection, then chapter jobs on a bounded worker set.
pub struct SeriesDownloader {
    config: EngineConfig,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn SiteExtractor>,
    sink: Arc<dyn ProgressSink>,
}

struct Discovery {
    base_url: Url,
    series: SeriesInfo,
    root_html: String,
}

/// Everything a chapter job needs, shared across jobs.
struct JobContext {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn SiteExtractor>,
    sink: Arc<dyn ProgressSink>,
    series: SeriesInfo,
    series_dir: PathBuf,
    base_url: Url,
    chapter_width: usize,
    retrieve: RetrieveSettings,
    package: PackageOptions,
}

impl SeriesDownloader {
    /// Uses the HTTP fetcher and webtoons.com extractor.
    pub fn new(config: EngineConfig) -> Result<Self, HarvestError> {
        let fetcher = ReqwestFetcher::new(config.fetch.clone())?;
        Ok(Self::with_parts(
            config,
            Arc::new(fetcher),
            Arc::new(WebtoonExtractor),
            Arc::new(NullProgressSink),
        ))
    }

    pub fn with_parts(
        config: EngineConfig,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn SiteExtractor>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            config,
            fetcher,
            extractor,
            sink,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolves metadata and the selected chapters without writing anything.
    pub async fn list(&self, request: &SeriesRequest) -> Result<ChapterListing, HarvestError> {
        let discovery = self.fetch_series(&request.url).await?;
        let chapters = self.discover_chapters(&discovery).await?;
        let selected = request.selection.apply(&chapters);
        Ok(ChapterListing {
            series: discovery.series,
            chapters,
            selected,
        })
    }

    /// Downloads the selected chapters.
    ///
    /// Cancelling `cancel` during discovery aborts with
    /// [`HarvestError::Interrupted`]. Once chapters are selected it stops new
    /// chapter jobs from starting; jobs already running are awaited before
    /// this returns.
    pub async fn run(
        &self,
        request: &SeriesRequest,
        cancel: CancellationToken,
    ) -> Result<SeriesReport, HarvestError> {
        let mut state = SeriesState::new();

        let discovery = until_cancelled(&cancel, self.fetch_series(&request.url)).await?;
        state = self.step(state, Msg::RootFetched).0;
        toon_debug!("{:?}", discovery.series);
        state = self.step(state, Msg::MetadataResolved).0;

        let series_dir = self
            .config
            .destination
            .join(sanitize_component(discovery.series.title()));
        ensure_output_dir(&series_dir)?;
        toon_info!("Series downloading to: {}", series_dir.display());
        state = self.step(state, Msg::DirectoryPrepared).0;

        let chapters = until_cancelled(&cancel, self.discover_chapters(&discovery)).await?;
        state = self
            .step(
                state,
                Msg::ChaptersDiscovered {
                    count: chapters.len(),
                },
            )
            .0;

        let chapter_width = zero_padding_width(chapters.len());
        let selected = request.selection.apply(&chapters);
        toon_info!(
            "Selected {} of {} chapters",
            selected.len(),
            chapters.len()
        );
        state = self
            .step(
                state,
                Msg::ChaptersSelected {
                    episode_numbers: selected.iter().map(|c| c.episode_number).collect(),
                },
            )
            .0;

        let context = Arc::new(JobContext {
            fetcher: self.fetcher.clone(),
            extractor: self.extractor.clone(),
            sink: self.sink.clone(),
            series: discovery.series.clone(),
            series_dir: series_dir.clone(),
            base_url: discovery.base_url.clone(),
            chapter_width,
            retrieve: self.config.retrieve,
            package: self.config.package,
        });
        let mut waiting: HashMap<u32, ChapterInfo> = selected
            .into_iter()
            .map(|chapter| (chapter.episode_number, chapter))
            .collect();

        let mut jobs: JoinSet<Result<ChapterReport, ChapterError>> = JoinSet::new();
        let mut job_episodes: HashMap<Id, u32> = HashMap::new();
        let mut reports = Vec::new();
        let mut interrupted = cancel.is_cancelled();

        let first = if interrupted {
            Msg::InterruptReceived
        } else {
            Msg::StartDownloads {
                workers: self.config.chapter_workers,
            }
        };
        let (next, mut effects) = self.step(state, first);
        state = next;

        loop {
            let mut finished = false;
            for effect in effects.drain(..) {
                match effect {
                    Effect::SubmitChapter { episode_number } => {
                        if let Some(chapter) = waiting.remove(&episode_number) {
                            let handle = jobs.spawn(chapter_job(context.clone(), chapter));
                            job_episodes.insert(handle.id(), episode_number);
                        }
                    }
                    Effect::StopSubmitting => {
                        toon_warn!(
                            "Received interrupt, letting {} running chapters drain/complete",
                            jobs.len()
                        );
                    }
                    Effect::Finish => finished = true,
                }
            }
            if finished || jobs.is_empty() {
                break;
            }

            let msg = tokio::select! {
                _ = cancel.cancelled(), if !interrupted => {
                    interrupted = true;
                    Msg::InterruptReceived
                }
                Some(joined) = jobs.join_next_with_id() => {
                    let (episode_number, result) = match joined {
                        Ok((id, result)) => (job_episodes.remove(&id), result),
                        Err(err) => (
                            job_episodes.remove(&err.id()),
                            Err(ChapterError::Aborted(err.to_string())),
                        ),
                    };
                    let episode_number = episode_number.unwrap_or_default();
                    let result = self.record_chapter(episode_number, result, &mut reports);
                    Msg::ChapterFinished { episode_number, result }
                }
                else => break,
            };
            let (next, next_effects) = self.step(state, msg);
            state = next;
            effects = next_effects;
        }

        reports.sort_by_key(|report: &ChapterReport| report.episode_number);
        let summary = state.summary();
        toon_info!(
            "Finished {}: {} chapters succeeded, {} failed, {} not started",
            discovery.series.title(),
            summary.succeeded,
            summary.failed,
            summary.not_submitted
        );
        Ok(SeriesReport {
            series: discovery.series,
            series_dir,
            summary,
            chapters: reports,
        })
    }

    fn step(&self, state: SeriesState, msg: Msg) -> (SeriesState, Vec<Effect>) {
        let before = state.phase();
        let (state, effects) = update(state, msg);
        if state.phase() != before {
            toon_debug!("Phase {:?} -> {:?}", before, state.phase());
            self.sink.emit(EngineEvent::PhaseChanged(state.phase()));
        }
        (state, effects)
    }

    fn record_chapter(
        &self,
        episode_number: u32,
        result: Result<ChapterReport, ChapterError>,
        reports: &mut Vec<ChapterReport>,
    ) -> JobResultKind {
        let (kind, event_result) = match result {
            Ok(report) => {
                toon_info!(
                    "Chapter {} done ({} of {} pages)",
                    episode_number,
                    report.pages_written,
                    report.page_count
                );
                reports.push(report.clone());
                (JobResultKind::Succeeded, Ok(report))
            }
            Err(err) => {
                toon_error!("Chapter {} failed: {}", episode_number, err);
                (JobResultKind::Failed, Err(err.to_string()))
            }
        };
        self.sink.emit(EngineEvent::ChapterCompleted {
            episode_number,
            result: event_result,
        });
        kind
    }

    async fn fetch_series(&self, url: &str) -> Result<Discovery, HarvestError> {
        let base_url = Url::parse(url)
            .map_err(|err| RetrievalError::new(FailureKind::InvalidUrl, url, err.to_string()))?;
        let root = self.fetcher.fetch_document(base_url.as_str()).await?;
        let series = self.extractor.series_info(&root.html)?;
        Ok(Discovery {
            base_url,
            series,
            root_html: root.html,
        })
    }

    async fn discover_chapters(&self, discovery: &Discovery) -> Result<Vec<ChapterInfo>, HarvestError> {
        let root_chapters = self.extractor.chapters(&discovery.root_html);
        let page_hrefs = crawl_chapter_list_pages(
            self.fetcher.as_ref(),
            self.extractor.as_ref(),
            &discovery.base_url,
            &discovery.root_html,
            self.sink.as_ref(),
        )
        .await;
        let chapters = collect_chapters(
            self.fetcher.as_ref(),
            self.extractor.as_ref(),
            &discovery.base_url,
            &page_hrefs,
            root_chapters,
            self.config.duplicate_policy,
            self.sink.as_ref(),
        )
        .await?;
        Ok(chapters)
    }
}

async fn until_cancelled<T>(
    cancel: &CancellationToken,
    work: impl Future<Output = Result<T, HarvestError>>,
) -> Result<T, HarvestError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            toon_warn!("Interrupted during chapter discovery");
            Err(HarvestError::Interrupted)
        }
        result = work => result,
    }
}

async fn chapter_job(
    ctx: Arc<JobContext>,
    chapter: ChapterInfo,
) -> Result<ChapterReport, ChapterError> {
    let directory = ctx
        .series_dir
        .join(chapter_dir_name(chapter.episode_number, ctx.chapter_width));
    ensure_output_dir(&directory)?;

    let download = retrieve_chapter(
        ctx.fetcher.as_ref(),
        ctx.extractor.as_ref(),
        &ctx.base_url,
        &chapter,
        &directory,
        ctx.retrieve,
        ctx.sink.as_ref(),
    )
    .await?;

    let page_count = download.pages.len();
    let pages_written = download.written.len();
    let failed_pages = download.failed;
    let episode_number = chapter.episode_number;
    let package_ctx = ctx.clone();
    let package_dir = directory.clone();
    let pages = download.pages;
    let packaged = tokio::task::spawn_blocking(move || {
        package_chapter(
            &package_ctx.series,
            &chapter,
            &pages,
            &package_dir,
            package_ctx.package,
        )
    })
    .await
    .map_err(|err| ChapterError::Aborted(err.to_string()))??;

    Ok(ChapterReport {
        episode_number,
        directory,
        page_count,
        pages_written,
        failed_pages,
        comic_info: packaged.comic_info,
        archive: packaged.archive,
    })
}
