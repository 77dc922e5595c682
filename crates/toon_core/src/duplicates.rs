use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::ChapterInfo;

/// What to do when two chapter-list entries share an episode number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Fail the run.
    Reject,
    /// Keep the entry seen first in merge order.
    #[default]
    KeepFirst,
    /// Keep the entry seen last in merge order.
    KeepLast,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "keep-first" | "first" => Ok(Self::KeepFirst),
            "keep-last" | "last" => Ok(Self::KeepLast),
            other => Err(format!("unknown duplicate policy {other:?}")),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::KeepFirst => write!(f, "keep-first"),
            Self::KeepLast => write!(f, "keep-last"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("episode {episode_number} is listed more than once")]
pub struct DuplicateEpisodeError {
    pub episode_number: u32,
}

/// Resolves duplicate episode numbers in merge order. The survivors keep the
/// position of the first occurrence; sorting happens afterwards.
pub fn resolve_duplicates(
    merged: Vec<ChapterInfo>,
    policy: DuplicatePolicy,
) -> Result<Vec<ChapterInfo>, DuplicateEpisodeError> {
    let mut slots: HashMap<u32, usize> = HashMap::with_capacity(merged.len());
    let mut kept: Vec<ChapterInfo> = Vec::with_capacity(merged.len());

    for chapter in merged {
        match slots.get(&chapter.episode_number) {
            None => {
                slots.insert(chapter.episode_number, kept.len());
                kept.push(chapter);
            }
            Some(&slot) => match policy {
                DuplicatePolicy::Reject => {
                    return Err(DuplicateEpisodeError {
                        episode_number: chapter.episode_number,
                    })
                }
                DuplicatePolicy::KeepFirst => {}
                DuplicatePolicy::KeepLast => kept[slot] = chapter,
            },
        }
    }
    Ok(kept)
}
