//! Chi-square and binomial tests over per-feature counts.
//!
//! Counts are passed as `f64` arrays so the tests can run as batched array
//! operations across a whole feature set.

use ndarray::{Array1, ArrayView1, ArrayView3, Zip};
use statrs::distribution::{Binomial, DiscreteCDF};
use statrs::function::erf::erfc;

/// Upper-tail probability of a chi-square statistic with one degree of freedom.
#[inline]
pub fn chi2_sf_df1(statistic: f64) -> f64 {
    if statistic.is_nan() {
        f64::NAN
    } else if statistic <= 0.0 {
        1.0
    } else {
        erfc((statistic / 2.0).sqrt())
    }
}

/// Vectorised [`chi2_sf_df1`].
pub fn chi2_sf(statistics: ArrayView1<f64>) -> Array1<f64> {
    statistics.mapv(chi2_sf_df1)
}

/// Pearson contribution of a single cell. Cells with no expected mass carry no
/// information and contribute nothing.
#[inline]
fn cell_contribution(observed: f64, expected: f64) -> f64 {
    if expected > 0.0 {
        let diff = observed - expected;
        diff * diff / expected
    } else {
        0.0
    }
}

/// One-way (goodness-of-fit) chi-square statistic per feature.
///
/// For each feature, `observed[i]` of `totals[i]` trials fell into the target group,
/// against an expected share of `expected_proportion`. Both the "in group" and
/// "out of group" cells contribute to the statistic.
pub fn one_way(
    observed: ArrayView1<f64>,
    totals: ArrayView1<f64>,
    expected_proportion: f64,
) -> Array1<f64> {
    Zip::from(&observed)
        .and(&totals)
        .map_collect(|&hit, &total| {
            if expected_proportion.is_nan() {
                return f64::NAN;
            }
            let expected_hit = total * expected_proportion;
            cell_contribution(hit, expected_hit)
                + cell_contribution(total - hit, total - expected_hit)
        })
}

/// Two-way chi-square statistic of independence for a stack of 2x2 tables.
///
/// `cells` has shape `(n_features, 2, 2)`, indexed as `[feature, row, column]`.
pub fn two_way(cells: ArrayView3<f64>) -> Array1<f64> {
    cells
        .outer_iter()
        .map(|table| {
            let total = table.sum();
            let mut statistic = 0.0;
            for row in 0..2 {
                for col in 0..2 {
                    let expected = table.row(row).sum() * table.column(col).sum() / total;
                    statistic += cell_contribution(table[[row, col]], expected);
                }
            }
            statistic
        })
        .collect()
}

/// `P(X >= successes)` for `X ~ Binomial(trials, probability)`.
///
/// Returns NaN when `probability` is not a valid probability.
pub fn binomial_upper_tail(successes: u64, trials: u64, probability: f64) -> f64 {
    let distribution = match Binomial::new(probability, trials) {
        Ok(distribution) => distribution,
        Err(_) => return f64::NAN,
    };
    if successes == 0 {
        return 1.0;
    }
    distribution.sf(successes - 1)
}
