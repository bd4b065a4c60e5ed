//! Thresholds continuous annotation weights into per-study feature presence.

use crate::dataset::AnnotationMatrix;
use crate::types::DecodeError;
use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Boolean presence of each decoded feature in every study of the annotation matrix.
///
/// Rows follow the annotation matrix's row order; columns follow the decoded feature
/// order. Borrowing the matrix keeps study lookups key-based.
#[derive(Debug, Clone)]
pub struct FeaturePresence<'a> {
    annotations: &'a AnnotationMatrix,
    features: Vec<String>,
    present: Array2<bool>,
}

impl<'a> FeaturePresence<'a> {
    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    /// Presence row for one study.
    pub fn row(&self, study_id: &str) -> Result<ArrayView1<'_, bool>, DecodeError> {
        let row = self
            .annotations
            .study_position(study_id)
            .ok_or_else(|| DecodeError::MissingStudy(study_id.to_string()))?;
        Ok(self.present.row(row))
    }

    /// Per-feature number of the given studies that show the feature.
    pub fn count_present(&self, study_ids: &[String]) -> Result<Array1<usize>, DecodeError> {
        let mut counts = Array1::zeros(self.n_features());
        for id in study_ids {
            let row = self.row(id)?;
            counts.zip_mut_with(&row, |count: &mut usize, &present| {
                if present {
                    *count += 1;
                }
            });
        }
        Ok(counts)
    }

    /// Number of true entries over every study and decoded feature.
    pub fn total_present(&self) -> usize {
        self.present.iter().filter(|&&p| p).count()
    }
}

/// Resolves the feature list: the caller's list when given, otherwise every
/// non-identifier annotation column.
pub fn resolve_features(
    annotations: &AnnotationMatrix,
    requested: Option<&[String]>,
) -> Result<Vec<String>, DecodeError> {
    match requested {
        Some(features) => {
            for feature in features {
                if annotations.feature_position(feature).is_none() {
                    return Err(DecodeError::MissingFeature(feature.clone()));
                }
            }
            Ok(features.to_vec())
        }
        None => Ok(annotations.default_features()),
    }
}

/// Marks `(study, feature)` present when its weight is at least `threshold`.
///
/// Every pair must resolve: an unknown feature or a NaN weight is an error naming the
/// offending study and feature.
pub fn binarize<'a>(
    annotations: &'a AnnotationMatrix,
    features: &[String],
    threshold: f64,
) -> Result<FeaturePresence<'a>, DecodeError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(DecodeError::InvalidParameter(format!(
            "frequency threshold must lie in [0, 1], got {threshold}"
        )));
    }

    let columns = features
        .iter()
        .map(|feature| {
            annotations
                .feature_position(feature)
                .ok_or_else(|| DecodeError::MissingFeature(feature.clone()))
        })
        .collect::<Result<Vec<usize>, _>>()?;

    let weights = annotations.weights().select(Axis(1), &columns);
    if let Some(((row, col), _)) = weights.indexed_iter().find(|(_, w)| w.is_nan()) {
        return Err(DecodeError::MissingFeatureValue {
            study: annotations.study_ids()[row].clone(),
            feature: features[col].clone(),
        });
    }

    let present = weights.mapv(|w| w >= threshold);
    log::debug!(
        "Binarized {} studies x {} features at threshold {}",
        present.nrows(),
        present.ncols(),
        threshold
    );

    Ok(FeaturePresence {
        annotations,
        features: features.to_vec(),
        present,
    })
}
