#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use toon_engine::{EngineEvent, ProgressSink};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(toon_logging::initialize_for_tests);
}

#[derive(Default, Clone)]
pub struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub const RELEASE_DATES: [&str; 4] = ["Jan 15, 2021", "Feb 02, 2021", "Mar 30, 2022", "Dec 01, 2023"];

pub fn chapter_entry(episode: u32) -> String {
    let date = RELEASE_DATES[episode as usize % RELEASE_DATES.len()];
    format!(
        r#"<li class="_episodeItem" data-episode-no="{episode}">
  <a href="/en/fantasy/tower/ep-{episode}/viewer?title_no=95&amp;episode_no={episode}">
    <span class="subj"><span>Episode {episode}</span></span>
    <span class="date">{date}</span>
  </a>
</li>"#
    )
}

/// Numbered links plus an optional trailing "Next Page" link. `current` is
/// rendered as the `#` placeholder.
pub fn paginate(current: u32, pages: &[u32], next: Option<u32>) -> String {
    let mut links = String::new();
    for page in pages {
        if *page == current {
            links.push_str(&format!(r##"<a href="#" class="on"><span>{page}</span></a>"##));
        } else {
            links.push_str(&format!(
                r#"<a href="/en/fantasy/tower/list?title_no=95&amp;page={page}"><span>{page}</span></a>"#
            ));
        }
    }
    if let Some(next) = next {
        links.push_str(&format!(
            r#"<a href="/en/fantasy/tower/list?title_no=95&amp;page={next}" class="pg_next"><em>Next Page</em></a>"#
        ));
    }
    format!(r#"<div class="paginate">{links}</div>"#)
}

pub fn list_page(episodes: impl IntoIterator<Item = u32>, pagination: &str) -> String {
    let entries: String = episodes.into_iter().map(chapter_entry).collect();
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta property="og:title" content="Tower of God">
  <meta property="og:url" content="https://www.webtoons.com/en/fantasy/tower/list?title_no=95">
  <meta property="og:image" content="https://swebtoon-phinf.pstatic.net/thumb.jpg?type=crop540_540&amp;v=2">
  <meta property="og:description" content="What do you desire? Money and wealth? Honor and pride?">
  <meta property="com-linewebtoon:webtoon:author" content="SIU">
</head>
<body>
  <h2 class="genre g_fantasy">Fantasy</h2>
  <ul id="_listUl">{entries}</ul>
  {pagination}
</body>
</html>"#
    )
}

pub fn viewer_page(base: &str, image_count: usize) -> String {
    let images: String = (0..image_count)
        .map(|i| {
            format!(
                r#"<img src="/bg.png" data-url="{base}/img/{i}.jpg" width="800" height="1279.5" class="_images">"#
            )
        })
        .collect();
    format!(
        r#"<html><body><div class="viewer_img" id="_imageList">{images}</div></body></html>"#
    )
}

pub fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

pub fn jpeg(index: usize) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(format!("jpeg-{index}").into_bytes(), "image/jpeg")
}

pub const LIST_PATH: &str = "/en/fantasy/tower/list";

pub fn series_url(server: &MockServer) -> String {
    format!("{}{LIST_PATH}?title_no=95", server.uri())
}

/// Serves the series landing page and nothing else.
pub async fn mount_root(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(html(body))
        .with_priority(10)
        .mount(server)
        .await;
}

pub async fn mount_list_page(server: &MockServer, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(query_param("page", page.to_string()))
        .respond_with(html(body))
        .with_priority(1)
        .mount(server)
        .await;
}

/// Viewer page for `episode` with `image_count` images, each served as jpeg.
pub async fn mount_chapter(server: &MockServer, episode: u32, image_count: usize) {
    Mock::given(method("GET"))
        .and(path(format!("/en/fantasy/tower/ep-{episode}/viewer")))
        .respond_with(html(viewer_page(&format!("{}/ep{episode}", server.uri()), image_count)))
        .mount(server)
        .await;
    for i in 0..image_count {
        Mock::given(method("GET"))
            .and(path(format!("/ep{episode}/img/{i}.jpg")))
            .respond_with(jpeg(i))
            .mount(server)
            .await;
    }
}
