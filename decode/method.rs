//! # Shared Discrete Decoding Pipeline
//!
//! BrainMap and Neurosynth decoding share one skeleton:
//!
//! 1. resolve and binarize the feature set,
//! 2. partition the study universe into selected/unselected,
//! 3. count associations (method specific),
//! 4. forward test (method specific) and reverse test (shared two-way chi-square),
//! 5. optional raw p-value adjustment (method specific),
//! 6. correct forward and reverse p-values as two separate families,
//! 7. signed z-scores, effect sizes (method specific), and assembly in feature order.
//!
//! A decoding method plugs into this skeleton through [`DecodingMethod`].

use crate::binarize::{FeaturePresence, binarize, resolve_features};
use crate::config::DiscreteSettings;
use crate::counts::AssociationCounts;
use crate::dataset::{AnnotationMatrix, CoordinateTable};
use crate::partition::{StudySets, partition};
use crate::references::Citation;
use crate::result::{DiscreteDecoding, TermAssociation};
use crate::significance::{DirectionalTest, reverse_test};
use crate::stats::{Tail, correct, p_to_z};
use crate::types::{DecodeError, Selection};
use ndarray::Array1;

/// Everything a method may count from.
pub struct MethodInputs<'a> {
    pub coordinates: &'a CoordinateTable,
    pub presence: &'a FeaturePresence<'a>,
    pub sets: &'a StudySets,
}

/// Per-feature effect sizes for both inference directions.
#[derive(Debug, Clone, PartialEq)]
pub struct Effects {
    pub forward: Array1<f64>,
    pub reverse: Array1<f64>,
}

/// The method-specific parts of discrete decoding.
pub trait DecodingMethod {
    /// Method counts; always expose the study-level counts.
    type Counts: AsRef<AssociationCounts>;

    fn name(&self) -> &'static str;

    fn citation(&self) -> &'static Citation;

    /// Column label of the forward effect size in tabular output.
    fn forward_effect_label(&self) -> &'static str;

    fn settings(&self) -> &DiscreteSettings;

    /// Checks method parameters that depend on the decoded feature count.
    fn validate(&self, n_features: usize) -> Result<(), DecodeError> {
        let _ = n_features;
        Ok(())
    }

    fn count(&self, inputs: &MethodInputs<'_>) -> Result<Self::Counts, DecodeError>;

    fn forward_test(&self, counts: &Self::Counts) -> DirectionalTest;

    /// `(p(selected | term), p(selected | no term))` per feature, which sign the
    /// reverse test.
    fn selection_rates(&self, counts: &Self::Counts) -> (Array1<f64>, Array1<f64>);

    /// Adjusts raw p-values before correction. Returns the number of features touched.
    fn adjust_raw_p_values(
        &self,
        counts: &Self::Counts,
        forward: &mut Array1<f64>,
        reverse: &mut Array1<f64>,
    ) -> usize {
        let _ = (counts, forward, reverse);
        0
    }

    fn effects(&self, counts: &Self::Counts) -> Result<Effects, DecodeError>;
}

/// Runs the shared pipeline for one method.
pub fn run_discrete<M: DecodingMethod>(
    method: &M,
    coordinates: &CoordinateTable,
    annotations: &AnnotationMatrix,
    selection: &Selection<'_>,
) -> Result<DiscreteDecoding, DecodeError> {
    let settings = method.settings();
    settings.validate()?;

    let features = resolve_features(annotations, selection.features)?;
    method.validate(features.len())?;
    let presence = binarize(annotations, &features, settings.frequency_threshold)?;
    let sets = partition(
        &coordinates.study_universe(),
        selection.selected,
        selection.unselected,
    )?;
    log::info!(
        "{} decoding of {} features: {} selected vs {} unselected studies",
        method.name(),
        features.len(),
        sets.n_selected(),
        sets.n_unselected()
    );

    let inputs = MethodInputs {
        coordinates,
        presence: &presence,
        sets: &sets,
    };
    let counts = method.count(&inputs)?;

    let mut forward = method.forward_test(&counts);
    let (with_term, without_term) = method.selection_rates(&counts);
    let mut reverse = reverse_test(counts.as_ref(), with_term.view(), without_term.view());

    let adjusted = method.adjust_raw_p_values(&counts, &mut forward.p, &mut reverse.p);
    if adjusted > 0 {
        log::debug!(
            "{} features had their raw p-values adjusted before correction",
            adjusted
        );
    }

    let forward_corrected = correct(forward.p.view(), settings.correction, settings.alpha)?;
    let reverse_corrected = correct(reverse.p.view(), settings.correction, settings.alpha)?;
    log::info!(
        "{} correction at alpha {}: {} forward and {} reverse features significant",
        settings.correction,
        settings.alpha,
        forward_corrected.n_rejected(),
        reverse_corrected.n_rejected()
    );

    let z_forward = p_to_z(forward_corrected.p_corrected.view(), Tail::Two) * &forward.sign;
    let z_reverse = p_to_z(reverse_corrected.p_corrected.view(), Tail::Two) * &reverse.sign;
    let effects = method.effects(&counts)?;

    let study_counts = counts.as_ref();
    let terms = features
        .into_iter()
        .enumerate()
        .map(|(i, term)| TermAssociation {
            term,
            p_forward: forward_corrected.p_corrected[i],
            z_forward: z_forward[i],
            effect_forward: effects.forward[i],
            p_reverse: reverse_corrected.p_corrected[i],
            z_reverse: z_reverse[i],
            effect_reverse: effects.reverse[i],
            n_selected_term: study_counts.n_selected_term[i],
            n_unselected_term: study_counts.n_unselected_term[i],
        })
        .collect();

    Ok(DiscreteDecoding {
        method: method.name(),
        forward_effect_label: method.forward_effect_label(),
        citation: method.citation(),
        terms,
    })
}
