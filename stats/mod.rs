//! # Statistical Primitives
//!
//! Small, batch-oriented building blocks shared by every decoder: the p-to-z
//! transform, sign conventions, contingency-table tests and multiple-comparisons
//! correction. Everything here is a pure function over `ndarray` views.

pub mod contingency;
pub mod correction;

use ndarray::{Array1, ArrayView1};
use statrs::function::erf::erfc_inv;
use std::f64::consts::SQRT_2;
use thiserror::Error;

pub use contingency::{binomial_upper_tail, chi2_sf, chi2_sf_df1, one_way, two_way};
pub use correction::{CorrectedPValues, Correction, correct};

/// Errors raised by the statistical primitives. Degenerate per-feature inputs are
/// never errors; they surface as non-finite values instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error(
        "Unknown multiple-comparisons correction '{0}'. Expected one of: none, bonferroni, sidak, holm, holm-sidak, fdr_bh, fdr_by."
    )]
    UnknownCorrection(String),
    #[error("The significance level must lie strictly between 0 and 1, got {0}.")]
    InvalidAlpha(f64),
}

/// Which tail of the standard normal a p-value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tail {
    One,
    Two,
}

/// Converts p-values to unsigned z-scores.
///
/// p-values below machine epsilon are clamped to epsilon so that a p of zero maps to a
/// large but finite z. NaN stays NaN.
pub fn p_to_z(p_values: ArrayView1<f64>, tail: Tail) -> Array1<f64> {
    p_values.mapv(|p| p_to_z_scalar(p, tail))
}

fn p_to_z_scalar(p: f64, tail: Tail) -> f64 {
    if p.is_nan() {
        return f64::NAN;
    }
    let p = p.clamp(f64::EPSILON, 1.0);
    match tail {
        // isf(p / 2) of the standard normal
        Tail::Two => SQRT_2 * erfc_inv(p),
        Tail::One => SQRT_2 * erfc_inv(2.0 * p),
    }
}

/// Three-valued sign: -1, 0 or +1, NaN for NaN.
///
/// `f64::signum` maps +0.0 to 1.0, which would give a tied feature a direction.
#[inline]
pub fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else if value == 0.0 {
        0.0
    } else {
        f64::NAN
    }
}
