//! # Spatial Topic Decoding
//!
//! Decodes a region of interest into term weights with a pretrained GCLDA-style
//! topic model:
//!
//! 1. check the ROI frame against the model mask,
//! 2. sum `p(topic | voxel)` over in-mask ROI voxels,
//! 3. optionally reweight topics by a blended prior,
//! 4. project through `p(word | topic)`.

pub mod model;
pub mod priors;
pub mod project;

pub use model::{Affine, TopicError, TopicModel, Volume};
pub use priors::weight_priors;
pub use project::{
    RoiInput, TermWeight, TopicDecoding, TopicPrior, TopicProjector, gclda_decode_roi,
};
