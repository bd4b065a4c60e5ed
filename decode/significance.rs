//! Forward and reverse inference tests shared by the discrete decoders.

use crate::counts::AssociationCounts;
use crate::stats::{chi2_sf, sign, two_way};
use ndarray::{Array1, ArrayView1, Zip};

/// Raw p-values and their direction for one inference direction.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalTest {
    pub p: Array1<f64>,
    /// -1, 0 or +1 per feature (NaN when undefined).
    pub sign: Array1<f64>,
}

/// Forward-inference direction: each feature's selected count against the mean
/// selected count of the whole decoded batch.
///
/// This depends on the batch: decoding a different feature set can flip a feature's
/// sign.
pub fn centered_sign(n_selected_term: &Array1<usize>) -> Array1<f64> {
    let counts = n_selected_term.mapv(|n| n as f64);
    match counts.mean() {
        Some(mean) => counts.mapv(|n| sign(n - mean)),
        None => Array1::zeros(0),
    }
}

/// Reverse inference: two-way chi-square test of independence between feature
/// presence and selection, signed by whether the feature raises the selection rate.
pub fn reverse_test(
    counts: &AssociationCounts,
    p_selected_g_term: ArrayView1<f64>,
    p_selected_g_noterm: ArrayView1<f64>,
) -> DirectionalTest {
    let statistic = two_way(counts.contingency_tables().view());
    let p = chi2_sf(statistic.view());
    let direction = Zip::from(&p_selected_g_term)
        .and(&p_selected_g_noterm)
        .map_collect(|&with, &without| sign(with - without));
    DirectionalTest { p, sign: direction }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counts::ratio;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn centered_sign_uses_batch_mean() {
        assert_eq!(centered_sign(&array![6, 1]), array![1.0, -1.0]);
        // same feature, different batch
        assert_eq!(centered_sign(&array![6, 8, 10]), array![-1.0, 0.0, 1.0]);
        assert_eq!(centered_sign(&array![4]), array![0.0]);
        assert_eq!(centered_sign(&Array1::zeros(0)).len(), 0);
    }

    #[test]
    fn reverse_test_direction_follows_conditional_rates() {
        let counts = AssociationCounts {
            n_selected: 10,
            n_unselected: 20,
            n_selected_term: array![6, 1],
            n_unselected_term: array![2, 15],
        };
        let with = ratio(&counts.n_selected_term, &counts.n_term());
        let without = ratio(&counts.n_selected_noterm(), &counts.n_noterm());
        let test = reverse_test(&counts, with.view(), without.view());

        assert_eq!(test.sign, array![1.0, -1.0]);
        // chi2 = 300000 / 35200 for the first table
        assert_abs_diff_eq!(
            test.p[0],
            crate::stats::chi2_sf_df1(300_000.0 / 35_200.0),
            epsilon = 1e-12
        );
        assert!(test.p[0] < 0.01);
    }
}
