//! Per-feature association counts between feature presence and study selection.

use crate::binarize::FeaturePresence;
use crate::dataset::CoordinateTable;
use crate::partition::StudySets;
use crate::types::DecodeError;
use ndarray::{Array1, Array3, Zip};

/// Study-level counts for every decoded feature.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationCounts {
    pub n_selected: usize,
    pub n_unselected: usize,
    /// Selected studies showing each feature.
    pub n_selected_term: Array1<usize>,
    /// Unselected studies showing each feature.
    pub n_unselected_term: Array1<usize>,
}

impl AssociationCounts {
    pub fn from_presence(
        presence: &FeaturePresence<'_>,
        sets: &StudySets,
    ) -> Result<Self, DecodeError> {
        Ok(Self {
            n_selected: sets.n_selected(),
            n_unselected: sets.n_unselected(),
            n_selected_term: presence.count_present(&sets.selected)?,
            n_unselected_term: presence.count_present(&sets.unselected)?,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_selected_term.len()
    }

    pub fn n_selected_noterm(&self) -> Array1<usize> {
        self.n_selected_term.mapv(|n| self.n_selected - n)
    }

    pub fn n_unselected_noterm(&self) -> Array1<usize> {
        self.n_unselected_term.mapv(|n| self.n_unselected - n)
    }

    /// Studies in either set showing each feature.
    pub fn n_term(&self) -> Array1<usize> {
        &self.n_selected_term + &self.n_unselected_term
    }

    /// Studies in either set not showing each feature.
    pub fn n_noterm(&self) -> Array1<usize> {
        self.n_term()
            .mapv(|n| self.n_selected + self.n_unselected - n)
    }

    /// Stack of 2x2 tables `[[sel_term, sel_noterm], [unsel_term, unsel_noterm]]`,
    /// shape `(n_features, 2, 2)`.
    pub fn contingency_tables(&self) -> Array3<f64> {
        let selected_noterm = self.n_selected_noterm();
        let unselected_noterm = self.n_unselected_noterm();
        let mut cells = Array3::zeros((self.n_features(), 2, 2));
        for (f, mut table) in cells.outer_iter_mut().enumerate() {
            table[[0, 0]] = self.n_selected_term[f] as f64;
            table[[0, 1]] = selected_noterm[f] as f64;
            table[[1, 0]] = self.n_unselected_term[f] as f64;
            table[[1, 1]] = unselected_noterm[f] as f64;
        }
        cells
    }
}

impl AsRef<AssociationCounts> for AssociationCounts {
    fn as_ref(&self) -> &AssociationCounts {
        self
    }
}

/// Focus-level counts used by BrainMap-style decoding. A focus inherits the feature
/// status of the study that reported it.
#[derive(Debug, Clone, PartialEq)]
pub struct FociCounts {
    pub n_foci_in_database: usize,
    /// Foci belonging to studies that show each feature.
    pub n_term_foci: Array1<usize>,
    /// Foci belonging to studies that do not show each feature.
    pub n_noterm_foci: Array1<usize>,
}

impl FociCounts {
    /// Every study referenced by the coordinate table must have an annotation row.
    pub fn from_coordinates(
        coordinates: &CoordinateTable,
        presence: &FeaturePresence<'_>,
    ) -> Result<Self, DecodeError> {
        let n_features = presence.n_features();
        let mut n_term_foci = Array1::<usize>::zeros(n_features);
        let mut n_noterm_foci = Array1::<usize>::zeros(n_features);

        for (study, n_foci) in coordinates.foci_per_study() {
            let row = presence.row(study)?;
            Zip::from(&mut n_term_foci)
                .and(&mut n_noterm_foci)
                .and(&row)
                .for_each(|term, noterm, &present| {
                    if present {
                        *term += n_foci;
                    } else {
                        *noterm += n_foci;
                    }
                });
        }

        Ok(Self {
            n_foci_in_database: coordinates.len(),
            n_term_foci,
            n_noterm_foci,
        })
    }
}

/// Element-wise `numerator / denominator` as floats. A zero denominator yields a
/// non-finite value for that feature only.
pub fn ratio(numerator: &Array1<usize>, denominator: &Array1<usize>) -> Array1<f64> {
    Zip::from(numerator)
        .and(denominator)
        .map_collect(|&num, &den| num as f64 / den as f64)
}
