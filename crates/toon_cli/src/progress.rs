use std::sync::atomic::{AtomicUsize, Ordering};

use toon_engine::{EngineEvent, ProgressSink};
use toon_logging::{toon_debug, toon_info, toon_trace};

/// Reports engine progress through the process logger.
#[derive(Debug, Default)]
pub struct LogProgress {
    chapters_done: AtomicUsize,
    chapters_total: AtomicUsize,
}

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chapter jobs reported as finished, successful or not.
    pub fn chapters_done(&self) -> usize {
        self.chapters_done.load(Ordering::Relaxed)
    }
}

impl ProgressSink for LogProgress {
    fn emit(&self, event: EngineEvent) {
        match event {
            EngineEvent::PhaseChanged(phase) => {
                toon_debug!("Phase: {:?}", phase);
            }
            EngineEvent::ChapterListPages { resolved, total } => {
                toon_trace!("Resolving chapter-list pages {}/{}", resolved, total);
            }
            EngineEvent::ChapterListFetched { fetched, total } => {
                toon_debug!("Fetched chapter-list page {}/{}", fetched, total);
            }
            EngineEvent::ChapterStarted {
                episode_number,
                page_count,
            } => {
                self.chapters_total.fetch_add(1, Ordering::Relaxed);
                toon_info!(
                    "Downloading chapter {} ({} pages)",
                    episode_number,
                    page_count
                );
            }
            EngineEvent::PageCompleted {
                episode_number,
                index,
                byte_size,
            } => {
                toon_trace!(
                    "Chapter {} page {} ({} bytes)",
                    episode_number,
                    index,
                    byte_size
                );
            }
            // The engine already logs page failures with their URL.
            EngineEvent::PageFailed { .. } => {}
            EngineEvent::ChapterCompleted {
                episode_number,
                result,
            } => {
                let done = self.chapters_done.fetch_add(1, Ordering::Relaxed) + 1;
                let started = self.chapters_total.load(Ordering::Relaxed);
                match result {
                    Ok(report) => toon_info!(
                        "[{}/{}] Chapter {} saved to {}",
                        done,
                        started,
                        episode_number,
                        report
                            .archive
                            .as_ref()
                            .unwrap_or(&report.directory)
                            .display()
                    ),
                    Err(_) => toon_debug!("[{}/{}] Chapter {} failed", done, started, episode_number),
                }
            }
        }
    }
}
