//! Citation metadata attached to each decoding entry point. Purely descriptive.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Citation {
    pub key: &'static str,
    pub description: &'static str,
    pub reference: &'static str,
    pub doi: &'static str,
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} https://doi.org/{}", self.reference, self.doi)
    }
}

pub const GCLDA_DECODING: Citation = Citation {
    key: "gclda_decoding",
    description: "Citation for GCLDA decoding.",
    reference: "Rubin, Timothy N., et al. \"Decoding brain activity using a large-scale probabilistic functional-anatomical atlas of human cognition.\" PLoS computational biology 13.10 (2017): e1005649.",
    doi: "10.1371/journal.pcbi.1005649",
};

pub const BRAINMAP_DECODING: Citation = Citation {
    key: "brainmap_decoding",
    description: "Citation for BrainMap-style decoding.",
    reference: "Amft, Maren, et al. \"Definition and characterization of an extended social-affective default network.\" Brain Structure and Function 220.2 (2015): 1031-1049.",
    doi: "10.1007/s00429-013-0698-0",
};

pub const NEUROSYNTH: Citation = Citation {
    key: "neurosynth",
    description: "Introduces Neurosynth.",
    reference: "Yarkoni, Tal, et al. \"Large-scale automated synthesis of human functional neuroimaging data.\" Nature methods 8.8 (2011): 665.",
    doi: "10.1038/nmeth.1635",
};
