use crate::{Effect, Msg, Phase, SeriesState};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages that do not fit the current phase leave the state untouched.
pub fn update(mut state: SeriesState, msg: Msg) -> (SeriesState, Vec<Effect>) {
    let effects = match msg {
        Msg::RootFetched => {
            state.advance(Phase::Init, Phase::RootFetched);
            Vec::new()
        }
        Msg::MetadataResolved => {
            state.advance(Phase::RootFetched, Phase::MetadataResolved);
            Vec::new()
        }
        Msg::DirectoryPrepared => {
            state.advance(Phase::MetadataResolved, Phase::DirectoryPrepared);
            Vec::new()
        }
        Msg::ChaptersDiscovered { count } => {
            if state.advance(Phase::DirectoryPrepared, Phase::ChaptersDiscovered) {
                state.set_discovered(count);
            }
            Vec::new()
        }
        Msg::ChaptersSelected { episode_numbers } => {
            if state.advance(Phase::ChaptersDiscovered, Phase::ChaptersSelected) {
                state.set_selected(episode_numbers);
            }
            Vec::new()
        }
        Msg::StartDownloads { workers } => {
            if state.advance(Phase::ChaptersSelected, Phase::Downloading) {
                state.set_workers(workers);
                let mut effects = submit_effects(&mut state);
                if state.is_drained() {
                    state.advance(Phase::Downloading, Phase::Done);
                    effects.push(Effect::Finish);
                }
                effects
            } else {
                Vec::new()
            }
        }
        Msg::ChapterFinished {
            episode_number,
            result,
        } => {
            let active = matches!(state.phase(), Phase::Downloading | Phase::Cancelling);
            if active && state.record_finished(episode_number, result) {
                let mut effects = if state.phase() == Phase::Downloading {
                    submit_effects(&mut state)
                } else {
                    Vec::new()
                };
                if state.is_drained() {
                    let from = state.phase();
                    state.advance(from, Phase::Done);
                    effects.push(Effect::Finish);
                }
                effects
            } else {
                Vec::new()
            }
        }
        Msg::InterruptReceived => {
            if state.advance(Phase::ChaptersSelected, Phase::Done) {
                // Nothing was submitted yet, so there is nothing to drain.
                state.abandon_pending();
                vec![Effect::StopSubmitting, Effect::Finish]
            } else if state.advance(Phase::Downloading, Phase::Cancelling) {
                state.abandon_pending();
                let mut effects = vec![Effect::StopSubmitting];
                if state.is_drained() {
                    state.advance(Phase::Cancelling, Phase::Done);
                    effects.push(Effect::Finish);
                }
                effects
            } else {
                Vec::new()
            }
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn submit_effects(state: &mut SeriesState) -> Vec<Effect> {
    state
        .fill_slots()
        .into_iter()
        .map(|episode_number| Effect::SubmitChapter { episode_number })
        .collect()
}
