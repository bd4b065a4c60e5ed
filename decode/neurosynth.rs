//! # Neurosynth-Style Discrete Decoding
//!
//! Forward inference is a one-way chi-square test of each feature's selected share
//! against the overall selection rate. Effects are posterior estimates adjusted by a
//! per-feature prior; unlike BrainMap, reverse effects are not renormalised.

use crate::config::{DiscreteSettings, NeurosynthOptions};
use crate::counts::{AssociationCounts, ratio};
use crate::dataset::{AnnotationMatrix, CoordinateTable};
use crate::method::{DecodingMethod, Effects, MethodInputs, run_discrete};
use crate::references::{Citation, NEUROSYNTH};
use crate::result::DiscreteDecoding;
use crate::significance::{DirectionalTest, centered_sign};
use crate::stats::{chi2_sf, one_way};
use crate::types::{DecodeError, Selection};
use ndarray::{Array1, Zip};

pub use crate::config::NeurosynthPrior;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Neurosynth {
    pub options: NeurosynthOptions,
}

impl Neurosynth {
    pub fn new(options: NeurosynthOptions) -> Self {
        Self { options }
    }

    pub fn decode(
        &self,
        coordinates: &CoordinateTable,
        annotations: &AnnotationMatrix,
        selection: &Selection<'_>,
    ) -> Result<DiscreteDecoding, DecodeError> {
        run_discrete(self, coordinates, annotations, selection)
    }

    /// Per-feature prior, resolving the empirical base rate from the counts.
    fn prior(&self, counts: &AssociationCounts) -> Array1<f64> {
        match &self.options.prior {
            NeurosynthPrior::Empirical => {
                let n_studies = counts.n_selected + counts.n_unselected;
                counts.n_term().mapv(|n| n as f64 / n_studies as f64)
            }
            NeurosynthPrior::Fixed(prior) => Array1::from_elem(counts.n_features(), *prior),
            NeurosynthPrior::PerFeature(priors) => Array1::from(priors.clone()),
        }
    }
}

fn check_probability(value: f64) -> Result<(), DecodeError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(DecodeError::InvalidParameter(format!(
            "Neurosynth prior must lie in [0, 1], got {value}"
        )))
    }
}

impl DecodingMethod for Neurosynth {
    type Counts = AssociationCounts;

    fn name(&self) -> &'static str {
        "neurosynth"
    }

    fn citation(&self) -> &'static Citation {
        &NEUROSYNTH
    }

    fn forward_effect_label(&self) -> &'static str {
        "probForward"
    }

    fn settings(&self) -> &DiscreteSettings {
        &self.options.settings
    }

    fn validate(&self, n_features: usize) -> Result<(), DecodeError> {
        match &self.options.prior {
            NeurosynthPrior::Empirical => Ok(()),
            NeurosynthPrior::Fixed(prior) => check_probability(*prior),
            NeurosynthPrior::PerFeature(priors) => {
                if priors.len() != n_features {
                    return Err(DecodeError::InvalidParameter(format!(
                        "expected one Neurosynth prior per feature ({n_features}), got {}",
                        priors.len()
                    )));
                }
                priors.iter().try_for_each(|&p| check_probability(p))
            }
        }
    }

    fn count(&self, inputs: &MethodInputs<'_>) -> Result<AssociationCounts, DecodeError> {
        AssociationCounts::from_presence(inputs.presence, inputs.sets)
    }

    fn forward_test(&self, counts: &AssociationCounts) -> DirectionalTest {
        let selection_rate =
            counts.n_selected as f64 / (counts.n_selected + counts.n_unselected) as f64;
        let observed = counts.n_selected_term.mapv(|n| n as f64);
        let totals = counts.n_term().mapv(|n| n as f64);
        let statistic = one_way(observed.view(), totals.view(), selection_rate);
        DirectionalTest {
            p: chi2_sf(statistic.view()),
            sign: centered_sign(&counts.n_selected_term),
        }
    }

    fn selection_rates(&self, counts: &AssociationCounts) -> (Array1<f64>, Array1<f64>) {
        (
            ratio(&counts.n_selected_term, &counts.n_term()),
            ratio(&counts.n_selected_noterm(), &counts.n_noterm()),
        )
    }

    fn effects(&self, counts: &AssociationCounts) -> Result<Effects, DecodeError> {
        let (with_term, without_term) = self.selection_rates(counts);
        let prior = self.prior(counts);

        let forward = Zip::from(&prior)
            .and(&with_term)
            .and(&without_term)
            .map_collect(|&prior, &with, &without| prior * with + (1.0 - prior) * without);
        let reverse = Zip::from(&prior)
            .and(&with_term)
            .and(&forward)
            .map_collect(|&prior, &with, &mixture| with * prior / mixture);

        Ok(Effects { forward, reverse })
    }
}

/// Decodes a set of selected studies with the Neurosynth method.
pub fn neurosynth_decode(
    coordinates: &CoordinateTable,
    annotations: &AnnotationMatrix,
    selection: &Selection<'_>,
    options: &NeurosynthOptions,
) -> Result<DiscreteDecoding, DecodeError> {
    Neurosynth::new(options.clone()).decode(coordinates, annotations, selection)
}
