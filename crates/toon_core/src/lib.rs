//! Toon core: IO-free domain model, chapter selection and the series run
//! state machine.
mod duplicates;
mod effect;
mod model;
mod msg;
mod padding;
mod selection;
mod state;
mod update;
mod urls;

pub use duplicates::{resolve_duplicates, DuplicateEpisodeError, DuplicatePolicy};
pub use effect::Effect;
pub use model::{apply_completions, sort_chapters, ChapterInfo, PageCompletion, PageInfo, SeriesInfo};
pub use msg::Msg;
pub use padding::{padded, zero_padding_width};
pub use selection::{ChapterSelection, SelectionError};
pub use state::{JobResultKind, Phase, RunSummary, SeriesState};
pub use update::update;
pub use urls::{normalize_series_url, pop_query_param, strip_crop_transform};
