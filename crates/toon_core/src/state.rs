use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Linear lifecycle of one series run. `Cancelling` is only reachable from
/// `Downloading`; an interrupt before downloads start goes straight to `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Phase {
    #[default]
    Init,
    RootFetched,
    MetadataResolved,
    DirectoryPrepared,
    ChaptersDiscovered,
    ChaptersSelected,
    Downloading,
    Cancelling,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobResultKind {
    Succeeded,
    Failed,
}

/// Counts describing a run, safe to read at any phase.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub phase: Phase,
    pub discovered: usize,
    pub selected: usize,
    pub in_flight: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub not_submitted: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeriesState {
    phase: Phase,
    discovered: usize,
    selected: usize,
    workers: usize,
    pending: VecDeque<u32>,
    in_flight: BTreeSet<u32>,
    finished: BTreeMap<u32, JobResultKind>,
    not_submitted: usize,
    cancelled: bool,
}

impl SeriesState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn summary(&self) -> RunSummary {
        let succeeded = self
            .finished
            .values()
            .filter(|r| **r == JobResultKind::Succeeded)
            .count();
        RunSummary {
            phase: self.phase,
            discovered: self.discovered,
            selected: self.selected,
            in_flight: self.in_flight.len(),
            succeeded,
            failed: self.finished.len() - succeeded,
            not_submitted: self.not_submitted,
            cancelled: self.cancelled,
        }
    }

    pub(crate) fn advance(&mut self, from: Phase, to: Phase) -> bool {
        if self.phase == from {
            self.phase = to;
            true
        } else {
            false
        }
    }

    pub(crate) fn set_discovered(&mut self, count: usize) {
        self.discovered = count;
    }

    pub(crate) fn set_selected(&mut self, episode_numbers: Vec<u32>) {
        self.selected = episode_numbers.len();
        self.pending = episode_numbers.into();
    }

    pub(crate) fn set_workers(&mut self, workers: usize) {
        self.workers = workers.max(1);
    }

    /// Moves pending episodes into flight while capacity remains.
    pub(crate) fn fill_slots(&mut self) -> Vec<u32> {
        let mut submitted = Vec::new();
        while self.in_flight.len() < self.workers {
            let Some(episode) = self.pending.pop_front() else {
                break;
            };
            self.in_flight.insert(episode);
            submitted.push(episode);
        }
        submitted
    }

    pub(crate) fn record_finished(&mut self, episode_number: u32, result: JobResultKind) -> bool {
        if !self.in_flight.remove(&episode_number) {
            return false;
        }
        self.finished.insert(episode_number, result);
        true
    }

    pub(crate) fn abandon_pending(&mut self) {
        self.cancelled = true;
        self.not_submitted += self.pending.len();
        self.pending.clear();
    }

    pub(crate) fn is_drained(&self) -> bool {
        self.in_flight.is_empty() && self.pending.is_empty()
    }
}
