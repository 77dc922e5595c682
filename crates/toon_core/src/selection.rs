use thiserror::Error;

use crate::ChapterInfo;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("end={end} should not be less than start={start}")]
    InvalidRange { start: u32, end: u32 },
    #[error("an explicit start/end range and latest-only are mutually exclusive")]
    MutualExclusion,
}

/// Which chapters of a series to download.
///
/// Build it with [`ChapterSelection::new`], which validates the combination up
/// front so no network work happens for a bad request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChapterSelection {
    /// Inclusive range; `None` bounds default to 0 and the highest episode.
    Range { start: Option<u32>, end: Option<u32> },
    /// Only the highest-numbered chapter.
    Latest,
    #[default]
    All,
}

impl ChapterSelection {
    pub fn new(start: Option<u32>, end: Option<u32>, latest: bool) -> Result<Self, SelectionError> {
        if latest {
            if start.is_some() || end.is_some() {
                return Err(SelectionError::MutualExclusion);
            }
            return Ok(Self::Latest);
        }
        if let Some(end) = end {
            let start = start.unwrap_or(0);
            if end < start {
                return Err(SelectionError::InvalidRange { start, end });
            }
        }
        if start.is_none() && end.is_none() {
            return Ok(Self::All);
        }
        Ok(Self::Range { start, end })
    }

    /// Filters a collection sorted ascending by episode number.
    pub fn apply(&self, sorted: &[ChapterInfo]) -> Vec<ChapterInfo> {
        match *self {
            Self::All => sorted.to_vec(),
            Self::Latest => sorted.last().cloned().into_iter().collect(),
            Self::Range { start, end } => {
                let Some(max) = sorted.last().map(|c| c.episode_number) else {
                    return Vec::new();
                };
                let start = start.unwrap_or(0);
                let end = end.unwrap_or(max);
                sorted
                    .iter()
                    .filter(|c| (start..=end).contains(&c.episode_number))
                    .cloned()
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;

    fn chapters(numbers: &[u32]) -> Vec<ChapterInfo> {
        numbers
            .iter()
            .map(|&n| ChapterInfo {
                title: format!("Episode {n}"),
                episode_number: n,
                release_date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
                viewer_url: format!("https://example.com/ep{n}"),
            })
            .collect()
    }

    fn numbers(chapters: &[ChapterInfo]) -> Vec<u32> {
        chapters.iter().map(|c| c.episode_number).collect()
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert_eq!(
            ChapterSelection::new(Some(5), Some(3), false),
            Err(SelectionError::InvalidRange { start: 5, end: 3 })
        );
    }

    #[test]
    fn latest_with_range_is_rejected() {
        assert_eq!(
            ChapterSelection::new(Some(1), None, true),
            Err(SelectionError::MutualExclusion)
        );
        assert_eq!(
            ChapterSelection::new(None, Some(4), true),
            Err(SelectionError::MutualExclusion)
        );
    }

    #[test]
    fn latest_returns_highest_episode() {
        let sorted = chapters(&[1, 2, 3, 9]);
        let selection = ChapterSelection::new(None, None, true).unwrap();
        assert_eq!(numbers(&selection.apply(&sorted)), vec![9]);
        assert!(selection.apply(&[]).is_empty());
    }

    #[test]
    fn range_defaults_fill_missing_bounds() {
        let sorted = chapters(&[1, 2, 3, 4, 5, 6]);
        let from_four = ChapterSelection::new(Some(4), None, false).unwrap();
        assert_eq!(numbers(&from_four.apply(&sorted)), vec![4, 5, 6]);
        let up_to_two = ChapterSelection::new(None, Some(2), false).unwrap();
        assert_eq!(numbers(&up_to_two.apply(&sorted)), vec![1, 2]);
        let inclusive = ChapterSelection::new(Some(2), Some(4), false).unwrap();
        assert_eq!(numbers(&inclusive.apply(&sorted)), vec![2, 3, 4]);
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let sorted = chapters(&[1, 3, 5, 7, 9, 11]);
        for selection in [
            ChapterSelection::All,
            ChapterSelection::Latest,
            ChapterSelection::new(Some(3), Some(9), false).unwrap(),
            ChapterSelection::new(Some(6), None, false).unwrap(),
        ] {
            let once = selection.apply(&sorted);
            let twice = selection.apply(&once);
            assert_eq!(once, twice, "{selection:?}");
        }
    }
}
