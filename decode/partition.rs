//! Splits the study universe into the selected set and its comparison set.

use crate::types::DecodeError;
use ahash::AHashSet;

/// Selected studies and the studies they are compared against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudySets {
    pub selected: Vec<String>,
    pub unselected: Vec<String>,
}

impl StudySets {
    pub fn n_selected(&self) -> usize {
        self.selected.len()
    }

    pub fn n_unselected(&self) -> usize {
        self.unselected.len()
    }
}

/// Builds the selected/unselected partition.
///
/// `universe` must be sorted (as returned by `CoordinateTable::study_universe`). The
/// complement is taken in universe order, so it is sorted and reproducible. An
/// explicit `unselected` set is used verbatim, without any set difference.
pub fn partition(
    universe: &[String],
    selected: &[String],
    unselected: Option<&[String]>,
) -> Result<StudySets, DecodeError> {
    if selected.is_empty() {
        return Err(DecodeError::EmptySelection);
    }

    let unselected = match unselected {
        Some(explicit) => explicit.to_vec(),
        None => {
            let chosen: AHashSet<&str> = selected.iter().map(String::as_str).collect();
            universe
                .iter()
                .filter(|id| !chosen.contains(id.as_str()))
                .cloned()
                .collect()
        }
    };

    if unselected.is_empty() {
        log::warn!(
            "No unselected studies remain after partitioning {} selected studies; reverse-inference statistics will be degenerate",
            selected.len()
        );
    }

    Ok(StudySets {
        selected: selected.to_vec(),
        unselected,
    })
}
