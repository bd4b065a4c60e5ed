use ndarray::{Array2, Array3, ArrayView2, ArrayView3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Voxel-to-world transform of a volume, row-major.
pub type Affine = [[f64; 4]; 4];

#[derive(Error, Debug)]
pub enum TopicError {
    #[error("ROI input could not be read as a volume: {0}")]
    InputType(String),
    #[error(
        "The ROI must share the model mask's coordinate frame.\nROI:  {roi}\nMask: {mask}"
    )]
    SpatialAlignment { roi: String, mask: String },
    #[error("Malformed topic model: {0}")]
    InvalidModel(String),
    #[error("Invalid topic prior: {0}")]
    InvalidPrior(String),
    #[error("Failed to read or write file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
}

/// A boolean volume with its coordinate frame. Used both for the model mask and for
/// regions of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    affine: Affine,
    data: Array3<bool>,
}

impl Volume {
    pub fn new(data: Array3<bool>, affine: Affine) -> Self {
        Self { affine, data }
    }

    pub fn affine(&self) -> &Affine {
        &self.affine
    }

    pub fn data(&self) -> ArrayView3<'_, bool> {
        self.data.view()
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Number of voxels inside the volume.
    pub fn n_true(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Exact frame equality: same affine and same grid. No tolerance is applied.
    pub fn same_frame(&self, other: &Volume) -> bool {
        self.affine == other.affine && self.shape() == other.shape()
    }

    pub(crate) fn describe_frame(&self) -> String {
        format!("shape {:?}, affine {:?}", self.shape(), self.affine)
    }

    pub fn save(&self, path: &Path) -> Result<(), TopicError> {
        save_toml(self, path)
    }

    pub fn load(path: &Path) -> Result<Self, TopicError> {
        let toml_string = fs::read_to_string(path)?;
        Ok(toml::from_str(&toml_string)?)
    }
}

/// A pretrained spatial topic model, read-only during decoding.
///
/// `p_topic_g_voxel` has one row per in-mask voxel, in C order of the mask grid.
/// `p_word_g_topic` has one row per vocabulary word and one column per topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicModel {
    vocabulary: Vec<String>,
    mask: Volume,
    p_topic_g_voxel: Array2<f64>,
    p_word_g_topic: Array2<f64>,
}

impl TopicModel {
    pub fn new(
        p_topic_g_voxel: Array2<f64>,
        p_word_g_topic: Array2<f64>,
        vocabulary: Vec<String>,
        mask: Volume,
    ) -> Result<Self, TopicError> {
        let model = Self {
            vocabulary,
            mask,
            p_topic_g_voxel,
            p_word_g_topic,
        };
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), TopicError> {
        let n_in_mask = self.mask.n_true();
        if self.p_topic_g_voxel.nrows() != n_in_mask {
            return Err(TopicError::InvalidModel(format!(
                "p_topic_g_voxel has {} rows but the mask holds {} voxels",
                self.p_topic_g_voxel.nrows(),
                n_in_mask
            )));
        }
        if self.p_word_g_topic.ncols() != self.p_topic_g_voxel.ncols() {
            return Err(TopicError::InvalidModel(format!(
                "p_word_g_topic has {} topic columns but p_topic_g_voxel has {}",
                self.p_word_g_topic.ncols(),
                self.p_topic_g_voxel.ncols()
            )));
        }
        if self.vocabulary.len() != self.p_word_g_topic.nrows() {
            return Err(TopicError::InvalidModel(format!(
                "vocabulary has {} words but p_word_g_topic has {} rows",
                self.vocabulary.len(),
                self.p_word_g_topic.nrows()
            )));
        }
        Ok(())
    }

    pub fn n_topics(&self) -> usize {
        self.p_topic_g_voxel.ncols()
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn mask(&self) -> &Volume {
        &self.mask
    }

    pub fn p_topic_g_voxel(&self) -> ArrayView2<'_, f64> {
        self.p_topic_g_voxel.view()
    }

    pub fn p_word_g_topic(&self) -> ArrayView2<'_, f64> {
        self.p_word_g_topic.view()
    }

    /// Saves the model in TOML format.
    pub fn save(&self, path: &Path) -> Result<(), TopicError> {
        save_toml(self, path)
    }

    /// Loads a model from a TOML file and checks its shapes.
    pub fn load(path: &Path) -> Result<Self, TopicError> {
        let toml_string = fs::read_to_string(path)?;
        let model: Self = toml::from_str(&toml_string)?;
        model.validate()?;
        Ok(model)
    }
}

fn save_toml<T: Serialize>(value: &T, path: &Path) -> Result<(), TopicError> {
    let toml_string = toml::to_string_pretty(value)?;
    let mut file = BufWriter::new(fs::File::create(path)?);
    file.write_all(toml_string.as_bytes())?;
    Ok(())
}
