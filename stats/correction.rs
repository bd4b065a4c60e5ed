//! Multiple-comparisons correction of a p-value family.
//!
//! Method names and corrected values follow the statsmodels `multipletests`
//! conventions so results can be compared with existing meta-analytic tooling.

use super::StatsError;
use itertools::Itertools;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A multiple-comparisons correction procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Correction {
    /// Identity mapping.
    #[serde(rename = "none")]
    None,
    #[serde(rename = "bonferroni")]
    Bonferroni,
    #[serde(rename = "sidak")]
    Sidak,
    /// Holm step-down (Bonferroni based).
    #[serde(rename = "holm")]
    Holm,
    /// Holm step-down with Sidak adjustments.
    #[serde(rename = "holm-sidak")]
    HolmSidak,
    /// Benjamini-Hochberg false discovery rate.
    #[default]
    #[serde(rename = "fdr_bh")]
    FdrBh,
    /// Benjamini-Yekutieli false discovery rate, valid under arbitrary dependence.
    #[serde(rename = "fdr_by")]
    FdrBy,
}

impl Correction {
    pub const ALL: [Correction; 7] = [
        Correction::None,
        Correction::Bonferroni,
        Correction::Sidak,
        Correction::Holm,
        Correction::HolmSidak,
        Correction::FdrBh,
        Correction::FdrBy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Correction::None => "none",
            Correction::Bonferroni => "bonferroni",
            Correction::Sidak => "sidak",
            Correction::Holm => "holm",
            Correction::HolmSidak => "holm-sidak",
            Correction::FdrBh => "fdr_bh",
            Correction::FdrBy => "fdr_by",
        }
    }
}

impl fmt::Display for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Correction {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Correction::ALL
            .iter()
            .copied()
            .find(|method| method.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| StatsError::UnknownCorrection(s.to_string()))
    }
}

/// Output of [`correct`].
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectedPValues {
    /// Corrected p-values in the input order. NaN inputs stay NaN.
    pub p_corrected: Array1<f64>,
    /// `p_corrected <= alpha`, false for NaN entries.
    pub reject: Array1<bool>,
}

impl CorrectedPValues {
    pub fn n_rejected(&self) -> usize {
        self.reject.iter().filter(|&&r| r).count()
    }
}

/// Corrects a family of p-values for multiple comparisons.
///
/// NaN entries are left out of the family: they do not count towards the number of
/// tests and come back as NaN.
pub fn correct(
    p_values: ArrayView1<f64>,
    method: Correction,
    alpha: f64,
) -> Result<CorrectedPValues, StatsError> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(StatsError::InvalidAlpha(alpha));
    }

    let mut p_corrected = p_values.to_owned();
    if method != Correction::None {
        let order: Vec<usize> = (0..p_values.len())
            .filter(|&i| !p_values[i].is_nan())
            .sorted_by(|&a, &b| p_values[a].total_cmp(&p_values[b]))
            .collect();
        let sorted: Vec<f64> = order.iter().map(|&i| p_values[i]).collect();
        let adjusted = adjust_sorted(&sorted, method);
        for (&i, value) in order.iter().zip(adjusted) {
            p_corrected[i] = value;
        }
    }

    let reject = p_corrected.mapv(|p| p <= alpha);
    Ok(CorrectedPValues {
        p_corrected,
        reject,
    })
}

/// Adjusts an ascending slice of p-values.
fn adjust_sorted(sorted: &[f64], method: Correction) -> Vec<f64> {
    let m = sorted.len() as f64;
    let adjusted: Vec<f64> = match method {
        Correction::None => sorted.to_vec(),
        Correction::Bonferroni => sorted.iter().map(|&p| p * m).collect(),
        Correction::Sidak => sorted.iter().map(|&p| sidak(p, m)).collect(),
        Correction::Holm => running_max(
            sorted
                .iter()
                .enumerate()
                .map(|(i, &p)| p * (m - i as f64)),
        ),
        Correction::HolmSidak => running_max(
            sorted
                .iter()
                .enumerate()
                .map(|(i, &p)| sidak(p, m - i as f64)),
        ),
        Correction::FdrBh => step_up(sorted, 1.0),
        Correction::FdrBy => {
            let harmonic: f64 = (1..=sorted.len()).map(|k| 1.0 / k as f64).sum();
            step_up(sorted, harmonic)
        }
    };
    adjusted.into_iter().map(|p| p.min(1.0)).collect()
}

#[inline]
fn sidak(p: f64, tests: f64) -> f64 {
    // 1 - (1 - p)^n without cancellation for tiny p
    -((-p).ln_1p() * tests).exp_m1()
}

fn running_max(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut best = f64::NEG_INFINITY;
    values
        .map(|v| {
            best = best.max(v);
            best
        })
        .collect()
}

/// Benjamini-style step-up: `p_(i) * m * scale / i`, then a running minimum from the
/// largest p downwards.
fn step_up(sorted: &[f64], scale: f64) -> Vec<f64> {
    let m = sorted.len() as f64;
    let mut adjusted: Vec<f64> = sorted
        .iter()
        .enumerate()
        .map(|(i, &p)| p * m * scale / (i + 1) as f64)
        .collect();
    let mut best = f64::INFINITY;
    for value in adjusted.iter_mut().rev() {
        best = best.min(*value);
        *value = best;
    }
    adjusted
}
