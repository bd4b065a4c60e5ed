use ahash::AHashMap;
use ndarray::{Array2, ArrayView2};
use polars::prelude::PolarsError;
use thiserror::Error;

/// Identifier columns that are never treated as features.
pub const RESERVED_ID_COLUMNS: [&str; 3] = ["id", "study_id", "contrast_id"];

/// Errors raised while building or loading dataset tables.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error(
        "The required column '{0}' was not found in the input file. Please check spelling and case."
    )]
    ColumnNotFound(String),
    #[error(
        "The column '{column_name}' could not be converted to the expected type '{expected_type}'. (Found type: {found_type})"
    )]
    ColumnWrongType {
        column_name: String,
        expected_type: &'static str,
        found_type: String,
    },
    #[error("Row {0} of the input table has no study identifier.")]
    MissingStudyId(usize),
    #[error("Study '{0}' appears more than once in the annotation matrix.")]
    DuplicateStudy(String),
    #[error("Feature '{0}' appears more than once in the annotation matrix.")]
    DuplicateFeature(String),
    #[error(
        "Annotation weights have shape {found:?}, but {studies} studies and {features} features were declared."
    )]
    ShapeMismatch {
        found: (usize, usize),
        studies: usize,
        features: usize,
    },
    #[error("The coordinate table lists {foci} foci but {positions} coordinate rows.")]
    PositionCountMismatch { foci: usize, positions: usize },
}

/// Study-by-feature weights, keyed by study id (rows) and feature name (columns).
///
/// Missing values are stored as NaN; they are only an error once a decoder needs them.
#[derive(Debug, Clone)]
pub struct AnnotationMatrix {
    study_ids: Vec<String>,
    features: Vec<String>,
    weights: Array2<f64>,
    study_index: AHashMap<String, usize>,
    feature_index: AHashMap<String, usize>,
}

impl AnnotationMatrix {
    pub fn new(
        study_ids: Vec<String>,
        features: Vec<String>,
        weights: Array2<f64>,
    ) -> Result<Self, DatasetError> {
        if weights.dim() != (study_ids.len(), features.len()) {
            return Err(DatasetError::ShapeMismatch {
                found: weights.dim(),
                studies: study_ids.len(),
                features: features.len(),
            });
        }

        let mut study_index = AHashMap::with_capacity(study_ids.len());
        for (row, id) in study_ids.iter().enumerate() {
            if study_index.insert(id.clone(), row).is_some() {
                return Err(DatasetError::DuplicateStudy(id.clone()));
            }
        }
        let mut feature_index = AHashMap::with_capacity(features.len());
        for (col, name) in features.iter().enumerate() {
            if feature_index.insert(name.clone(), col).is_some() {
                return Err(DatasetError::DuplicateFeature(name.clone()));
            }
        }

        Ok(Self {
            study_ids,
            features,
            weights,
            study_index,
            feature_index,
        })
    }

    pub fn study_ids(&self) -> &[String] {
        &self.study_ids
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn weights(&self) -> ArrayView2<'_, f64> {
        self.weights.view()
    }

    pub fn study_position(&self, study_id: &str) -> Option<usize> {
        self.study_index.get(study_id).copied()
    }

    pub fn feature_position(&self, feature: &str) -> Option<usize> {
        self.feature_index.get(feature).copied()
    }

    pub fn weight(&self, study_id: &str, feature: &str) -> Option<f64> {
        let row = self.study_position(study_id)?;
        let col = self.feature_position(feature)?;
        Some(self.weights[[row, col]])
    }

    /// Every column except the reserved identifier columns, in column order.
    pub fn default_features(&self) -> Vec<String> {
        self.features
            .iter()
            .filter(|name| !RESERVED_ID_COLUMNS.contains(&name.as_str()))
            .cloned()
            .collect()
    }
}

/// One row per reported focus. Only the owning study is needed for decoding; the
/// stereotactic position is kept when the source provides it.
#[derive(Debug, Clone, Default)]
pub struct CoordinateTable {
    study_ids: Vec<String>,
    positions: Option<Array2<f64>>,
}

impl CoordinateTable {
    pub fn new(study_ids: Vec<String>) -> Self {
        Self {
            study_ids,
            positions: None,
        }
    }

    /// Builds a table with an `n_foci x 3` matrix of x/y/z positions.
    pub fn with_positions(
        study_ids: Vec<String>,
        positions: Array2<f64>,
    ) -> Result<Self, DatasetError> {
        if positions.nrows() != study_ids.len() || positions.ncols() != 3 {
            return Err(DatasetError::PositionCountMismatch {
                foci: study_ids.len(),
                positions: positions.nrows(),
            });
        }
        Ok(Self {
            study_ids,
            positions: Some(positions),
        })
    }

    pub fn len(&self) -> usize {
        self.study_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.study_ids.is_empty()
    }

    /// Study id of every focus, in table order.
    pub fn study_ids(&self) -> &[String] {
        &self.study_ids
    }

    pub fn positions(&self) -> Option<ArrayView2<'_, f64>> {
        self.positions.as_ref().map(|p| p.view())
    }

    /// Sorted, de-duplicated study ids referenced by the table.
    pub fn study_universe(&self) -> Vec<String> {
        let mut ids = self.study_ids.clone();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Number of foci reported by each study.
    pub fn foci_per_study(&self) -> AHashMap<&str, usize> {
        let mut counts = AHashMap::new();
        for id in &self.study_ids {
            *counts.entry(id.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn annotation_lookup_by_key() {
        let matrix = AnnotationMatrix::new(
            ids(&["s1", "s2"]),
            ids(&["pain", "study_id"]),
            array![[0.2, 1.0], [0.0, 2.0]],
        )
        .unwrap();
        assert_eq!(matrix.weight("s1", "pain"), Some(0.2));
        assert_eq!(matrix.weight("s3", "pain"), None);
        assert_eq!(matrix.default_features(), ids(&["pain"]));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let err = AnnotationMatrix::new(ids(&["s1", "s1"]), ids(&["pain"]), array![[0.0], [1.0]])
            .unwrap_err();
        assert!(matches!(err, DatasetError::DuplicateStudy(id) if id == "s1"));

        let err = AnnotationMatrix::new(ids(&["s1"]), ids(&["a", "a"]), array![[0.0, 1.0]])
            .unwrap_err();
        assert!(matches!(err, DatasetError::DuplicateFeature(name) if name == "a"));
    }

    #[test]
    fn weight_shape_must_match_keys() {
        let err = AnnotationMatrix::new(ids(&["s1"]), ids(&["a"]), array![[0.0, 1.0]])
            .unwrap_err();
        assert!(matches!(err, DatasetError::ShapeMismatch { .. }));
    }

    #[test]
    fn coordinate_universe_is_sorted_and_unique() {
        let table = CoordinateTable::new(ids(&["s3", "s1", "s3", "s2"]));
        assert_eq!(table.study_universe(), ids(&["s1", "s2", "s3"]));
        let per_study = table.foci_per_study();
        assert_eq!(per_study["s3"], 2);
        assert_eq!(per_study["s1"], 1);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn positions_must_cover_every_focus() {
        let err =
            CoordinateTable::with_positions(ids(&["s1", "s2"]), array![[0.0, 1.0, 2.0]]).unwrap_err();
        assert!(matches!(err, DatasetError::PositionCountMismatch { foci: 2, positions: 1 }));
    }
}
