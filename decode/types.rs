// ========================================================================================
//                             High-Level Data Contracts
// ========================================================================================

// This file is ONLY for types that are shared by the discrete decoders.

use crate::stats::StatsError;
use thiserror::Error;

/// Errors raised by the discrete decoders.
///
/// Degenerate statistics (a zero denominator for one feature) are not errors: that
/// feature's values come back non-finite and the rest of the batch is unaffected.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Study '{0}' is not present in the annotation matrix.")]
    MissingStudy(String),
    #[error("Feature '{0}' is not a column of the annotation matrix.")]
    MissingFeature(String),
    #[error(
        "Missing feature value for study '{study}', feature '{feature}'. Every study must have a value for every decoded feature."
    )]
    MissingFeatureValue { study: String, feature: String },
    #[error("The selected study set is empty. At least one study must be selected.")]
    EmptySelection,
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error(transparent)]
    Stats(#[from] StatsError),
}

/// The study subset to decode and, optionally, the comparison set and feature list.
///
/// Ids are borrowed from the caller for the duration of one decoding call.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    /// Selected study ids, in caller order.
    pub selected: &'a [String],
    /// Explicit comparison set. When absent, every other study in the coordinate
    /// table is used.
    pub unselected: Option<&'a [String]>,
    /// Features to decode. When absent, every non-identifier annotation column.
    pub features: Option<&'a [String]>,
}

impl<'a> Selection<'a> {
    pub fn new(selected: &'a [String]) -> Self {
        Self {
            selected,
            unselected: None,
            features: None,
        }
    }

    pub fn with_unselected(mut self, unselected: &'a [String]) -> Self {
        self.unselected = Some(unselected);
        self
    }

    pub fn with_features(mut self, features: &'a [String]) -> Self {
        self.features = Some(features);
        self
    }
}
