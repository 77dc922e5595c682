mod common;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use toon_core::{Phase, SelectionError};
use toon_engine::{
    EngineConfig, EngineEvent, FetchSettings, HarvestError, MetadataError, ProgressSink,
    ReqwestFetcher, SeriesDownloader, SeriesRequest, WebtoonExtractor, COMIC_INFO_FILENAME,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{html, list_page, mount_chapter, mount_root, series_url, viewer_page, TestSink};

fn downloader(config: EngineConfig, sink: &TestSink) -> SeriesDownloader {
    let fetcher = ReqwestFetcher::new(FetchSettings::default()).unwrap();
    SeriesDownloader::with_parts(
        config,
        Arc::new(fetcher),
        Arc::new(WebtoonExtractor),
        Arc::new(sink.clone()),
    )
}

fn phases(events: &[EngineEvent]) -> Vec<Phase> {
    events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::PhaseChanged(phase) => Some(*phase),
            _ => None,
        })
        .collect()
}

#[test]
fn inverted_range_is_rejected_before_any_request() {
    let err = SeriesRequest::new("https://www.webtoons.com/x/list?title_no=1", Some(5), Some(3), false)
        .unwrap_err();
    assert!(matches!(
        err,
        HarvestError::Selection(SelectionError::InvalidRange { start: 5, end: 3 })
    ));

    let err = SeriesRequest::new("https://www.webtoons.com/x/list?title_no=1", Some(1), None, true)
        .unwrap_err();
    assert!(matches!(err, HarvestError::Selection(SelectionError::MutualExclusion)));
}

#[test]
fn request_url_drops_page_parameter() {
    let request = SeriesRequest::new(
        " https://www.webtoons.com/en/fantasy/tower/list?title_no=95&page=3 ",
        None,
        None,
        false,
    )
    .unwrap();
    assert_eq!(
        request.url,
        "https://www.webtoons.com/en/fantasy/tower/list?title_no=95"
    );
}

#[tokio::test]
async fn downloads_whole_series() {
    common::init_logging();
    let server = MockServer::start().await;
    mount_root(&server, list_page([3, 2, 1], "")).await;
    for episode in 1..=3 {
        mount_chapter(&server, episode, 2).await;
    }

    let out = tempfile::tempdir().unwrap();
    let sink = TestSink::new();
    let engine = downloader(
        EngineConfig::default_with_output(out.path().to_path_buf()),
        &sink,
    );
    let request = SeriesRequest::new(&series_url(&server), None, None, false).unwrap();

    let report = engine
        .run(&request, CancellationToken::new())
        .await
        .expect("series downloads");

    let series_dir = out.path().join("Tower of God");
    assert_eq!(report.series_dir, series_dir);
    assert_eq!(report.summary.phase, Phase::Done);
    assert_eq!(report.summary.discovered, 3);
    assert_eq!(report.summary.succeeded, 3);
    assert_eq!(report.summary.failed, 0);
    assert!(!report.summary.cancelled);

    let episodes: Vec<_> = report.chapters.iter().map(|c| c.episode_number).collect();
    assert_eq!(episodes, [1, 2, 3]);
    for (chapter, dir) in report.chapters.iter().zip(["01", "02", "03"]) {
        assert_eq!(chapter.directory, series_dir.join(dir));
        assert_eq!(chapter.pages_written, 2);
        assert!(series_dir.join(dir).join("00.jpg").is_file());
        assert!(series_dir.join(dir).join("01.jpg").is_file());
        assert!(series_dir.join(dir).join(COMIC_INFO_FILENAME).is_file());
        assert_eq!(chapter.archive, Some(series_dir.join(format!("{dir}.cbz"))));
    }

    let sidecar = fs::read_to_string(series_dir.join("02").join(COMIC_INFO_FILENAME)).unwrap();
    assert!(sidecar.contains("<Number>2</Number>"));
    assert!(sidecar.contains("<Series>Tower of God</Series>"));
    assert!(sidecar.contains("<PageCount>2</PageCount>"));

    assert_eq!(
        phases(&sink.take()),
        [
            Phase::RootFetched,
            Phase::MetadataResolved,
            Phase::DirectoryPrepared,
            Phase::ChaptersDiscovered,
            Phase::ChaptersSelected,
            Phase::Downloading,
            Phase::Done,
        ]
    );
}

#[tokio::test]
async fn range_and_latest_limit_chapter_jobs() {
    let server = MockServer::start().await;
    mount_root(&server, list_page(1..=4, "")).await;
    for episode in 1..=4 {
        mount_chapter(&server, episode, 1).await;
    }
    let out = tempfile::tempdir().unwrap();
    let mut config = EngineConfig::default_with_output(out.path().to_path_buf());
    config.package.compress = false;
    let engine = downloader(config, &TestSink::new());

    let range = SeriesRequest::new(&series_url(&server), Some(2), Some(3), false).unwrap();
    let report = engine.run(&range, CancellationToken::new()).await.unwrap();
    let episodes: Vec<_> = report.chapters.iter().map(|c| c.episode_number).collect();
    assert_eq!(episodes, [2, 3]);
    assert!(report.chapters.iter().all(|c| c.archive.is_none()));

    let latest = SeriesRequest::new(&series_url(&server), None, None, true).unwrap();
    let report = engine.run(&latest, CancellationToken::new()).await.unwrap();
    assert_eq!(report.summary.selected, 1);
    assert_eq!(report.chapters[0].episode_number, 4);
    assert_eq!(report.chapters[0].directory, report.series_dir.join("04"));
}

#[tokio::test]
async fn unavailable_chapter_does_not_stop_siblings() {
    let server = MockServer::start().await;
    mount_root(&server, list_page([1, 2], "")).await;
    mount_chapter(&server, 1, 1).await;
    Mock::given(method("GET"))
        .and(path("/en/fantasy/tower/ep-2/viewer"))
        .respond_with(html("<html><body>Daily Pass only</body></html>".to_string()))
        .mount(&server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let sink = TestSink::new();
    let engine = downloader(EngineConfig::default_with_output(out.path().to_path_buf()), &sink);
    let request = SeriesRequest::new(&series_url(&server), None, None, false).unwrap();

    let report = engine.run(&request, CancellationToken::new()).await.unwrap();

    assert_eq!(report.summary.succeeded, 1);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.chapters.len(), 1);
    let failure = sink.take().into_iter().find_map(|event| match event {
        EngineEvent::ChapterCompleted {
            episode_number: 2,
            result: Err(reason),
        } => Some(reason),
        _ => None,
    });
    assert!(failure.expect("chapter 2 reported").contains("chapter 2"));
}

/// Cancels the run as soon as downloads begin, while chapter 1 is still
/// waiting on its delayed viewer page.
struct CancelOnDownload {
    cancel: CancellationToken,
    inner: TestSink,
}

impl ProgressSink for CancelOnDownload {
    fn emit(&self, event: EngineEvent) {
        if event == EngineEvent::PhaseChanged(Phase::Downloading) {
            self.cancel.cancel();
        }
        self.inner.emit(event);
    }
}

async fn mount_slow_chapters(server: &MockServer, episodes: std::ops::RangeInclusive<u32>) {
    for episode in episodes {
        Mock::given(method("GET"))
            .and(path(format!("/en/fantasy/tower/ep-{episode}/viewer")))
            .respond_with(
                html(viewer_page(&format!("{}/ep{episode}", server.uri()), 1))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/ep{episode}/img/0.jpg")))
            .respond_with(common::jpeg(0))
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn interrupt_drains_running_chapters_and_skips_the_rest() {
    let server = MockServer::start().await;
    mount_root(&server, list_page(1..=3, "")).await;
    mount_slow_chapters(&server, 1..=3).await;

    let out = tempfile::tempdir().unwrap();
    let mut config = EngineConfig::default_with_output(out.path().to_path_buf());
    config.chapter_workers = 1;
    let cancel = CancellationToken::new();
    let sink = TestSink::new();
    let engine = SeriesDownloader::with_parts(
        config,
        Arc::new(ReqwestFetcher::new(FetchSettings::default()).unwrap()),
        Arc::new(WebtoonExtractor),
        Arc::new(CancelOnDownload {
            cancel: cancel.clone(),
            inner: sink.clone(),
        }),
    );
    let request = SeriesRequest::new(&series_url(&server), None, None, false).unwrap();

    let report = engine.run(&request, cancel).await.unwrap();

    assert!(report.summary.cancelled);
    assert_eq!(report.summary.phase, Phase::Done);
    assert_eq!(report.summary.succeeded, 1);
    assert_eq!(report.summary.not_submitted, 2);
    assert_eq!(report.chapters[0].episode_number, 1);
    assert!(report.series_dir.join("01").join("0.jpg").is_file());
    assert!(!report.series_dir.join("02").exists());

    let seen = phases(&sink.take());
    assert!(seen.ends_with(&[Phase::Downloading, Phase::Cancelling, Phase::Done]));
}

#[tokio::test]
async fn interrupt_before_downloads_submits_no_chapter() {
    let server = MockServer::start().await;
    mount_root(&server, list_page(1..=3, "")).await;
    mount_slow_chapters(&server, 1..=3).await;

    let out = tempfile::tempdir().unwrap();
    let mut config = EngineConfig::default_with_output(out.path().to_path_buf());
    config.chapter_workers = 4;
    let engine = downloader(config, &TestSink::new());
    let request = SeriesRequest::new(&series_url(&server), None, None, false).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = engine.run(&request, cancel).await.unwrap_err();

    assert!(matches!(err, HarvestError::Interrupted));
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    let viewer_hits = server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path().ends_with("/viewer"))
        .count();
    assert_eq!(viewer_hits, 0);
}

#[tokio::test]
async fn listing_writes_nothing() {
    let server = MockServer::start().await;
    mount_root(&server, list_page([2, 1, 3], "")).await;
    let out = tempfile::tempdir().unwrap();
    let engine = downloader(
        EngineConfig::default_with_output(out.path().to_path_buf()),
        &TestSink::new(),
    );
    let request = SeriesRequest::new(&series_url(&server), Some(2), None, false).unwrap();

    let listing = engine.list(&request).await.unwrap();

    assert_eq!(listing.series.title(), "Tower of God");
    let all: Vec<_> = listing.chapters.iter().map(|c| c.episode_number).collect();
    let selected: Vec<_> = listing.selected.iter().map(|c| c.episode_number).collect();
    assert_eq!(all, [1, 2, 3]);
    assert_eq!(selected, [2, 3]);
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn missing_metadata_is_fatal() {
    let server = MockServer::start().await;
    mount_root(&server, "<html><head></head><body></body></html>".to_string()).await;
    let out = tempfile::tempdir().unwrap();
    let engine = downloader(
        EngineConfig::default_with_output(out.path().to_path_buf()),
        &TestSink::new(),
    );
    let request = SeriesRequest::new(&series_url(&server), None, None, false).unwrap();

    let err = engine.run(&request, CancellationToken::new()).await.unwrap_err();
    assert!(matches!(
        err,
        HarvestError::Metadata(MetadataError::MissingField("og:title"))
    ));
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn unreachable_series_page_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let out = tempfile::tempdir().unwrap();
    let engine = downloader(
        EngineConfig::default_with_output(out.path().to_path_buf()),
        &TestSink::new(),
    );
    let request = SeriesRequest::new(&series_url(&server), None, None, false).unwrap();

    let err = engine.run(&request, CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, HarvestError::Retrieval(_)));
}
