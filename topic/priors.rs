use super::model::TopicError;
use ndarray::{Array1, ArrayView1};

/// Blends a topic prior with a uniform prior.
///
/// The prior is normalised to sum to one, scaled by `weight`, and shifted by
/// `(1 - weight) / n_topics`. A weight of one keeps the normalised prior as is; a
/// weight of zero gives a flat vector and so leaves topic weights unchanged up to scale.
pub fn weight_priors(priors: ArrayView1<f64>, weight: f64) -> Result<Array1<f64>, TopicError> {
    if !(0.0..=1.0).contains(&weight) {
        return Err(TopicError::InvalidPrior(format!(
            "prior weight must lie in [0, 1], got {weight}"
        )));
    }
    if priors.is_empty() {
        return Err(TopicError::InvalidPrior("the prior vector is empty".to_string()));
    }
    if let Some(bad) = priors.iter().find(|p| !(p.is_finite() && **p >= 0.0)) {
        return Err(TopicError::InvalidPrior(format!(
            "prior entries must be finite and non-negative, found {bad}"
        )));
    }
    let total = priors.sum();
    if total <= 0.0 {
        return Err(TopicError::InvalidPrior(
            "prior entries sum to zero".to_string(),
        ));
    }

    let floor = (1.0 - weight) / priors.len() as f64;
    Ok(priors.mapv(|p| p / total * weight + floor))
}
