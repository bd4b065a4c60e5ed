#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
//! Discrete functional decoding for meta-analytic neuroimaging.
//!
//! Three decoders map a study subset or a brain region onto a vocabulary of terms:
//!
//! - [`brainmap_decode`]: binomial forward test over foci counts, two-way chi-square
//!   reverse test, likelihood and renormalised posterior effects.
//! - [`neurosynth_decode`]: one-way chi-square forward test, two-way chi-square
//!   reverse test, prior-adjusted posterior effects.
//! - [`gclda_decode_roi`]: projects a region of interest through a pretrained
//!   spatial topic model into term weights.
//!
//! The library installs no logger; progress is reported through the `log` facade.

pub mod binarize;
pub mod brainmap;
pub mod config;
pub mod counts;
pub mod method;
pub mod neurosynth;
pub mod partition;
pub mod references;
pub mod result;
pub mod significance;
pub mod types;

#[path = "../stats/mod.rs"]
pub mod stats;

#[path = "../dataset/mod.rs"]
pub mod dataset;

#[path = "../topic/mod.rs"]
pub mod topic;

pub use brainmap::{BrainMap, brainmap_decode};
pub use config::{BrainMapOptions, DecoderConfig, DiscreteSettings, GcldaOptions, NeurosynthOptions};
pub use dataset::{AnnotationMatrix, CoordinateTable};
pub use neurosynth::{Neurosynth, NeurosynthPrior, neurosynth_decode};
pub use result::{DiscreteDecoding, TermAssociation};
pub use topic::{RoiInput, TopicDecoding, TopicModel, TopicProjector, Volume, gclda_decode_roi};
pub use types::{DecodeError, Selection};
