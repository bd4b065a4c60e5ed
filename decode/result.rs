//! The per-term table returned by the discrete decoders.

use crate::references::Citation;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One decoded feature. Non-finite values mark degenerate statistics for this
/// feature only.
#[derive(Debug, Clone, PartialEq)]
pub struct TermAssociation {
    pub term: String,
    /// Corrected forward p-value.
    pub p_forward: f64,
    pub z_forward: f64,
    pub effect_forward: f64,
    /// Corrected reverse p-value.
    pub p_reverse: f64,
    pub z_reverse: f64,
    pub effect_reverse: f64,
    pub n_selected_term: usize,
    pub n_unselected_term: usize,
}

/// Result of one discrete decoding call, in the order the features were requested.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteDecoding {
    pub method: &'static str,
    /// Column name for `effect_forward` in tabular output.
    pub forward_effect_label: &'static str,
    pub citation: &'static Citation,
    pub terms: Vec<TermAssociation>,
}

impl DiscreteDecoding {
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Looks up one term by name.
    pub fn get(&self, term: &str) -> Option<&TermAssociation> {
        self.terms.iter().find(|row| row.term == term)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TermAssociation> {
        self.terms.iter()
    }

    /// Writes the table as tab-separated text with a header row.
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut out = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);
        out.write_record([
            "Term",
            "pForward",
            "zForward",
            self.forward_effect_label,
            "pReverse",
            "zReverse",
            "probReverse",
        ])?;
        for row in &self.terms {
            out.write_record([
                row.term.clone(),
                row.p_forward.to_string(),
                row.z_forward.to_string(),
                row.effect_forward.to_string(),
                row.p_reverse.to_string(),
                row.z_reverse.to_string(),
                row.effect_reverse.to_string(),
            ])?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn save_tsv(&self, path: &Path) -> Result<(), csv::Error> {
        let file = File::create(path).map_err(csv::Error::from)?;
        self.write_tsv(BufWriter::new(file))
    }
}

impl<'a> IntoIterator for &'a DiscreteDecoding {
    type Item = &'a TermAssociation;
    type IntoIter = std::slice::Iter<'a, TermAssociation>;

    fn into_iter(self) -> Self::IntoIter {
        self.terms.iter()
    }
}
