/// Work the driver must perform after an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start the retrieve-and-package job for this episode.
    SubmitChapter { episode_number: u32 },
    /// Stop handing out new jobs; in-flight ones are left to drain.
    StopSubmitting,
    /// No jobs remain in flight or pending; the run is over.
    Finish,
}
