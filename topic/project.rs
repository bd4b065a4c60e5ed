//! Projection of a region of interest through a spatial topic model into term space.

use super::model::{TopicError, TopicModel, Volume};
use super::priors::weight_priors;
use crate::config::GcldaOptions;
use crate::references::{Citation, GCLDA_DECODING};
use ndarray::{Array1, ArrayView1, Axis};
use rayon::prelude::*;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A region of interest, either already in memory or serialized on disk.
#[derive(Debug, Clone, Copy)]
pub enum RoiInput<'a> {
    Volume(&'a Volume),
    Path(&'a Path),
}

impl<'a> From<&'a Volume> for RoiInput<'a> {
    fn from(volume: &'a Volume) -> Self {
        RoiInput::Volume(volume)
    }
}

impl<'a> From<&'a Path> for RoiInput<'a> {
    fn from(path: &'a Path) -> Self {
        RoiInput::Path(path)
    }
}

impl<'a> RoiInput<'a> {
    fn resolve(self) -> Result<Cow<'a, Volume>, TopicError> {
        match self {
            RoiInput::Volume(volume) => Ok(Cow::Borrowed(volume)),
            RoiInput::Path(path) => Volume::load(path)
                .map(Cow::Owned)
                .map_err(|err| TopicError::InputType(format!("{}: {err}", path.display()))),
        }
    }
}

/// A per-topic prior and how strongly it is applied.
#[derive(Debug, Clone, Copy)]
pub struct TopicPrior<'a> {
    pub priors: ArrayView1<'a, f64>,
    /// In [0, 1]; zero disables the prior.
    pub weight: f64,
}

impl<'a> TopicPrior<'a> {
    pub fn new(priors: ArrayView1<'a, f64>, weight: f64) -> Self {
        Self { priors, weight }
    }

    /// Applies `priors` with the configured prior weight.
    pub fn with_options(priors: ArrayView1<'a, f64>, options: &GcldaOptions) -> Self {
        Self::new(priors, options.prior_weight)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TermWeight {
    pub term: String,
    pub weight: f64,
}

/// Term weights for one ROI in vocabulary order, plus the topic weights behind them.
///
/// Weights are arbitrary-scale relevance scores: they need not sum to one or lie in
/// [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct TopicDecoding {
    pub terms: Vec<TermWeight>,
    pub topic_weights: Array1<f64>,
    /// In-mask voxels that fell inside the ROI.
    pub n_roi_voxels: usize,
    pub citation: &'static Citation,
}

impl TopicDecoding {
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn get(&self, term: &str) -> Option<f64> {
        self.terms.iter().find(|t| t.term == term).map(|t| t.weight)
    }

    /// Writes `Term` and `Weight` columns as tab-separated text.
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut out = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);
        out.write_record(["Term", "Weight"])?;
        for row in &self.terms {
            out.write_record([row.term.clone(), row.weight.to_string()])?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn save_tsv(&self, path: &Path) -> Result<(), csv::Error> {
        let file = File::create(path).map_err(csv::Error::from)?;
        self.write_tsv(BufWriter::new(file))
    }
}

/// Decodes ROIs against one borrowed model. Holds no state of its own, so one
/// projector can serve many threads.
#[derive(Debug, Clone, Copy)]
pub struct TopicProjector<'model> {
    model: &'model TopicModel,
}

impl<'model> TopicProjector<'model> {
    pub fn new(model: &'model TopicModel) -> Self {
        Self { model }
    }

    /// Decodes one ROI. A frame mismatch is reported before the prior is looked at.
    pub fn decode(
        &self,
        roi: RoiInput<'_>,
        prior: Option<TopicPrior<'_>>,
    ) -> Result<TopicDecoding, TopicError> {
        let roi = self.aligned(roi)?;
        let weighted = self.weighted_prior(prior)?;
        Ok(self.project(&roi, weighted.as_ref()))
    }

    /// Decodes each ROI independently in parallel. Results follow input order.
    ///
    /// Every ROI is loaded and frame-checked before the prior is weighted, so a
    /// misaligned ROI anywhere in the batch surfaces as `SpatialAlignment`.
    pub fn decode_many(
        &self,
        rois: &[RoiInput<'_>],
        prior: Option<TopicPrior<'_>>,
    ) -> Result<Vec<TopicDecoding>, TopicError> {
        let volumes = rois
            .par_iter()
            .map(|roi| self.aligned(*roi))
            .collect::<Result<Vec<_>, _>>()?;
        let weighted = self.weighted_prior(prior)?;
        log::info!(
            "Decoding {} ROIs against {} topics",
            volumes.len(),
            self.model.n_topics()
        );
        Ok(volumes
            .par_iter()
            .map(|roi| self.project(roi, weighted.as_ref()))
            .collect())
    }

    fn check_frame(&self, roi: &Volume) -> Result<(), TopicError> {
        let mask = self.model.mask();
        if roi.same_frame(mask) {
            Ok(())
        } else {
            Err(TopicError::SpatialAlignment {
                roi: roi.describe_frame(),
                mask: mask.describe_frame(),
            })
        }
    }

    fn aligned<'a>(&self, roi: RoiInput<'a>) -> Result<Cow<'a, Volume>, TopicError> {
        let roi = roi.resolve()?;
        self.check_frame(&roi)?;
        Ok(roi)
    }

    /// Summed `p(topic | voxel)` over every in-mask voxel inside an aligned ROI, and
    /// the number of such voxels.
    fn topic_weights(&self, roi: &Volume) -> (Array1<f64>, usize) {
        // Mask rows are numbered in logical (C) order of the grid.
        let rows: Vec<usize> = self
            .model
            .mask()
            .data()
            .iter()
            .zip(roi.data().iter())
            .filter(|(in_mask, _)| **in_mask)
            .enumerate()
            .filter_map(|(row, (_, in_roi))| in_roi.then_some(row))
            .collect();

        let weights = self
            .model
            .p_topic_g_voxel()
            .select(Axis(0), &rows)
            .sum_axis(Axis(0));
        (weights, rows.len())
    }

    fn weighted_prior(
        &self,
        prior: Option<TopicPrior<'_>>,
    ) -> Result<Option<Array1<f64>>, TopicError> {
        let Some(prior) = prior else {
            return Ok(None);
        };
        if prior.priors.len() != self.model.n_topics() {
            return Err(TopicError::InvalidPrior(format!(
                "expected {} topic priors, got {}",
                self.model.n_topics(),
                prior.priors.len()
            )));
        }
        weight_priors(prior.priors, prior.weight).map(Some)
    }

    fn project(&self, roi: &Volume, weighted_prior: Option<&Array1<f64>>) -> TopicDecoding {
        let (mut topic_weights, n_roi_voxels) = self.topic_weights(roi);
        if n_roi_voxels == 0 {
            log::warn!("The ROI does not overlap the model mask; every term weight is zero");
        } else {
            log::debug!("Decoding ROI covering {} in-mask voxels", n_roi_voxels);
        }
        if let Some(prior) = weighted_prior {
            topic_weights *= prior;
        }

        let word_weights = self.model.p_word_g_topic().dot(&topic_weights);
        let terms = self
            .model
            .vocabulary()
            .iter()
            .zip(word_weights.iter())
            .map(|(term, &weight)| TermWeight {
                term: term.clone(),
                weight,
            })
            .collect();

        TopicDecoding {
            terms,
            topic_weights,
            n_roi_voxels,
            citation: &GCLDA_DECODING,
        }
    }
}

/// Decodes one ROI with a GCLDA-style topic model. `options.prior_weight` only
/// matters when `topic_priors` is given.
pub fn gclda_decode_roi(
    model: &TopicModel,
    roi: RoiInput<'_>,
    topic_priors: Option<ArrayView1<'_, f64>>,
    options: &GcldaOptions,
) -> Result<TopicDecoding, TopicError> {
    let prior = topic_priors.map(|priors| TopicPrior::with_options(priors, options));
    TopicProjector::new(model).decode(roi, prior)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topic::Affine;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array3, array};
    use tempfile::NamedTempFile;

    const MNI_2MM: Affine = [
        [2.0, 0.0, 0.0, -90.0],
        [0.0, 2.0, 0.0, -126.0],
        [0.0, 0.0, 2.0, -72.0],
        [0.0, 0.0, 0.0, 1.0],
    ];

    fn volume(values: [bool; 4]) -> Volume {
        Volume::new(
            Array3::from_shape_vec((2, 2, 1), values.to_vec()).unwrap(),
            MNI_2MM,
        )
    }

    fn decode_without_prior(
        model: &TopicModel,
        roi: RoiInput<'_>,
    ) -> Result<TopicDecoding, TopicError> {
        gclda_decode_roi(model, roi, None, &GcldaOptions::default())
    }

    /// Mask covers voxels 0, 1 and 3 (rows 0, 1, 2). One word, two topics.
    fn model() -> TopicModel {
        TopicModel::new(
            array![[0.5, 0.5], [0.2, 0.8], [0.9, 0.1]],
            array![[1.0, 0.5]],
            vec!["pain".to_string()],
            volume([true, true, false, true]),
        )
        .unwrap()
    }

    #[test]
    fn single_voxel_projection() {
        let model = model();
        let roi = volume([false, true, false, false]);
        let result = decode_without_prior(&model, RoiInput::from(&roi)).unwrap();

        assert_eq!(result.n_roi_voxels, 1);
        assert_abs_diff_eq!(result.topic_weights[0], 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(result.topic_weights[1], 0.8, epsilon = 1e-12);
        // 0.2 * 1.0 + 0.8 * 0.5
        assert_abs_diff_eq!(result.get("pain").unwrap(), 0.6, epsilon = 1e-12);
        assert_eq!(result.citation.key, "gclda_decoding");
    }

    #[test]
    fn roi_voxels_outside_the_mask_are_ignored() {
        let model = model();
        let roi = volume([false, true, true, true]);
        let result = decode_without_prior(&model, RoiInput::from(&roi)).unwrap();
        assert_eq!(result.n_roi_voxels, 2);
        assert_abs_diff_eq!(result.topic_weights[0], 1.1, epsilon = 1e-12);
        assert_abs_diff_eq!(result.topic_weights[1], 0.9, epsilon = 1e-12);
    }

    #[test]
    fn prior_reweights_topics() {
        let model = model();
        let roi = volume([false, true, false, false]);
        let priors = array![3.0, 1.0];
        let options = GcldaOptions::default();
        let result =
            gclda_decode_roi(&model, RoiInput::from(&roi), Some(priors.view()), &options).unwrap();
        // tau = [0.2 * 0.75, 0.8 * 0.25]
        assert_abs_diff_eq!(result.topic_weights[0], 0.15, epsilon = 1e-12);
        assert_abs_diff_eq!(result.topic_weights[1], 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(result.get("pain").unwrap(), 0.25, epsilon = 1e-12);

        let wrong_length = array![1.0, 1.0, 1.0];
        assert!(matches!(
            gclda_decode_roi(&model, RoiInput::from(&roi), Some(wrong_length.view()), &options),
            Err(TopicError::InvalidPrior(_))
        ));
    }

    #[test]
    fn misaligned_roi_is_rejected() {
        let model = model();
        let mut affine = MNI_2MM;
        affine[2][3] = -70.0;
        let roi = Volume::new(
            Array3::from_shape_vec((2, 2, 1), vec![true; 4]).unwrap(),
            affine,
        );
        let err = decode_without_prior(&model, RoiInput::from(&roi)).unwrap_err();
        assert!(matches!(err, TopicError::SpatialAlignment { .. }));
    }

    #[test]
    fn frame_mismatch_is_reported_before_prior_errors() {
        let model = model();
        let mut affine = MNI_2MM;
        affine[0][3] += 5.0;
        let shifted = Volume::new(
            Array3::from_shape_vec((2, 2, 1), vec![true; 4]).unwrap(),
            affine,
        );
        let aligned = volume([false, true, false, false]);
        let projector = TopicProjector::new(&model);
        let batch = [RoiInput::from(&aligned), RoiInput::from(&shifted)];

        let too_long = array![1.0, 1.0, 1.0];
        let zero_sum = array![0.0, 0.0];
        for priors in [too_long.view(), zero_sum.view()] {
            let prior = Some(TopicPrior::new(priors, 1.0));
            assert!(matches!(
                projector.decode(RoiInput::from(&shifted), prior),
                Err(TopicError::SpatialAlignment { .. })
            ));
            assert!(matches!(
                projector.decode_many(&batch, prior),
                Err(TopicError::SpatialAlignment { .. })
            ));
            // aligned inputs still reach the prior check
            assert!(matches!(
                projector.decode(RoiInput::from(&aligned), prior),
                Err(TopicError::InvalidPrior(_))
            ));
            assert!(matches!(
                projector.decode_many(&batch[..1], prior),
                Err(TopicError::InvalidPrior(_))
            ));
        }
    }

    #[test]
    fn roi_path_is_loaded_or_rejected() {
        let model = model();
        let roi = volume([false, true, false, false]);
        let file = NamedTempFile::new().unwrap();
        roi.save(file.path()).unwrap();
        let from_disk = decode_without_prior(&model, RoiInput::from(file.path())).unwrap();
        assert_abs_diff_eq!(from_disk.get("pain").unwrap(), 0.6, epsilon = 1e-12);

        let garbage = NamedTempFile::new().unwrap();
        std::fs::write(garbage.path(), "not a volume").unwrap();
        assert!(matches!(
            decode_without_prior(&model, RoiInput::from(garbage.path())),
            Err(TopicError::InputType(_))
        ));
    }

    #[test]
    fn many_rois_keep_input_order() {
        let model = model();
        let rois = [
            volume([true, false, false, false]),
            volume([false, true, false, false]),
            volume([false, false, false, true]),
        ];
        let inputs: Vec<RoiInput<'_>> = rois.iter().map(RoiInput::from).collect();
        let results = TopicProjector::new(&model).decode_many(&inputs, None).unwrap();
        let weights: Vec<f64> = results.iter().map(|r| r.get("pain").unwrap()).collect();
        // rows [0.5, 0.5], [0.2, 0.8], [0.9, 0.1] against word row [1.0, 0.5]
        assert_abs_diff_eq!(weights[0], 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(weights[1], 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(weights[2], 0.95, epsilon = 1e-12);
    }

    #[test]
    fn decoding_is_bit_identical_across_calls() {
        let model = model();
        let roi = volume([true, true, false, true]);
        let priors = array![0.3, 0.7];
        let options = GcldaOptions { prior_weight: 0.4 };
        let first =
            gclda_decode_roi(&model, RoiInput::from(&roi), Some(priors.view()), &options).unwrap();
        let second =
            gclda_decode_roi(&model, RoiInput::from(&roi), Some(priors.view()), &options).unwrap();

        for (a, b) in first.terms.iter().zip(&second.terms) {
            assert_eq!(a.term, b.term);
            assert_eq!(a.weight.to_bits(), b.weight.to_bits());
        }
        for (a, b) in first.topic_weights.iter().zip(second.topic_weights.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
        assert_eq!(first.n_roi_voxels, second.n_roi_voxels);
    }

    #[test]
    fn tsv_lists_every_vocabulary_term() {
        let model = model();
        let roi = volume([false, true, false, false]);
        let result = decode_without_prior(&model, RoiInput::from(&roi)).unwrap();
        let mut buffer = Vec::new();
        result.write_tsv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().next(), Some("Term\tWeight"));
        assert_eq!(text.lines().count(), 2);
    }
}
