//! # BrainMap-Style Discrete Decoding
//!
//! Forward inference compares selected-study counts against foci counts with a
//! one-sided binomial test. Forward effects are likelihood ratios and reverse
//! effects are posteriors renormalised across the whole decoded feature set.

use crate::binarize::FeaturePresence;
use crate::config::{BrainMapOptions, DiscreteSettings};
use crate::counts::{AssociationCounts, FociCounts, ratio};
use crate::dataset::{AnnotationMatrix, CoordinateTable};
use crate::method::{DecodingMethod, Effects, MethodInputs, run_discrete};
use crate::references::{BRAINMAP_DECODING, Citation};
use crate::result::DiscreteDecoding;
use crate::significance::{DirectionalTest, centered_sign};
use crate::stats::binomial_upper_tail;
use crate::types::{DecodeError, Selection};
use ndarray::{Array1, Zip};

/// Study and focus counts for one BrainMap decoding call.
#[derive(Debug, Clone, PartialEq)]
pub struct BrainMapCounts {
    pub studies: AssociationCounts,
    pub foci: FociCounts,
    /// Number of (study, feature) presences over the whole database, counting a
    /// study once per feature it shows.
    pub n_exps_across_terms: usize,
}

impl AsRef<AssociationCounts> for BrainMapCounts {
    fn as_ref(&self) -> &AssociationCounts {
        &self.studies
    }
}

impl BrainMapCounts {
    /// `n_selected / n_foci_in_database`, the base rate used by the binomial test.
    pub fn p_selected(&self) -> f64 {
        self.studies.n_selected as f64 / self.foci.n_foci_in_database as f64
    }

    /// `p(selected | term)`, NaN for features no focus carries.
    pub fn p_selected_g_term(&self) -> Array1<f64> {
        ratio(&self.studies.n_selected_term, &self.foci.n_term_foci)
    }

    pub fn p_selected_g_noterm(&self) -> Array1<f64> {
        ratio(&self.studies.n_selected_noterm(), &self.foci.n_noterm_foci)
    }

    /// Share of all database presences that belong to each feature.
    pub fn p_term(&self) -> Array1<f64> {
        let total = self.n_exps_across_terms as f64;
        self.studies.n_term().mapv(|n| n as f64 / total)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrainMap {
    pub options: BrainMapOptions,
}

impl BrainMap {
    pub fn new(options: BrainMapOptions) -> Self {
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
}

fn count_brainmap(
    coordinates: &CoordinateTable,
    presence: &FeaturePresence<'_>,
    studies: AssociationCounts,
) -> Result<BrainMapCounts, DecodeError> {
    let foci = FociCounts::from_coordinates(coordinates, presence)?;
    Ok(BrainMapCounts {
        studies,
        foci,
        n_exps_across_terms: presence.total_present(),
    })
}

impl DecodingMethod for BrainMap {
    type Counts = BrainMapCounts;

    fn name(&self) -> &'static str {
        "brainmap"
    }

    fn citation(&self) -> &'static Citation {
        &BRAINMAP_DECODING
    }

    fn forward_effect_label(&self) -> &'static str {
        "likelihoodForward"
    }

    fn settings(&self) -> &DiscreteSettings {
        &self.options.settings
    }

    fn count(&self, inputs: &MethodInputs<'_>) -> Result<BrainMapCounts, DecodeError> {
        let studies = AssociationCounts::from_presence(inputs.presence, inputs.sets)?;
        count_brainmap(inputs.coordinates, inputs.presence, studies)
    }

    fn forward_test(&self, counts: &BrainMapCounts) -> DirectionalTest {
        let p_selected = counts.p_selected();
        let p = Zip::from(&counts.studies.n_selected_term)
            .and(&counts.foci.n_term_foci)
            .map_collect(|&hits, &trials| {
                binomial_upper_tail(hits as u64, trials as u64, p_selected)
            });
        DirectionalTest {
            p,
            sign: centered_sign(&counts.studies.n_selected_term),
        }
    }

    fn selection_rates(&self, counts: &BrainMapCounts) -> (Array1<f64>, Array1<f64>) {
        (counts.p_selected_g_term(), counts.p_selected_g_noterm())
    }

    /// Rare features cannot reach significance in either direction.
    fn adjust_raw_p_values(
        &self,
        counts: &BrainMapCounts,
        forward: &mut Array1<f64>,
        reverse: &mut Array1<f64>,
    ) -> usize {
        let threshold = self.options.rare_feature_threshold;
        let mut n_rare = 0;
        Zip::from(&counts.studies.n_selected_term)
            .and(forward)
            .and(reverse)
            .for_each(|&n, p_forward, p_reverse| {
                if n < threshold {
                    *p_forward = 1.0;
                    *p_reverse = 1.0;
                    n_rare += 1;
                }
            });
        if n_rare > 0 {
            log::info!(
                "Suppressed {} features present in fewer than {} selected studies",
                n_rare,
                threshold
            );
        }
        n_rare
    }

    fn effects(&self, counts: &BrainMapCounts) -> Result<Effects, DecodeError> {
        let p_selected = counts.p_selected();
        let p_selected_g_term = counts.p_selected_g_term();
        let likelihood = p_selected_g_term.mapv(|p| p / p_selected);

        let mut posterior = &p_selected_g_term * &counts.p_term() / p_selected;
        let finite_sum: f64 = posterior.iter().filter(|v| v.is_finite()).sum();
        posterior.mapv_inplace(|v| v / finite_sum);

        Ok(Effects {
            forward: likelihood,
            reverse: posterior,
        })
    }
}

/// Decodes a set of selected studies with the BrainMap method.
pub fn brainmap_decode(
    coordinates: &CoordinateTable,
    annotations: &AnnotationMatrix,
    selection: &Selection<'_>,
    options: &BrainMapOptions,
) -> Result<DiscreteDecoding, DecodeError> {
    BrainMap::new(options.clone()).decode(coordinates, annotations, selection)
}
