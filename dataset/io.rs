//! # Tab-Separated Dataset Loading
//!
//! Reads the two database tables from tab-separated text with the `polars` CSV reader
//! and converts them into the key-indexed views used by the decoders.
//!
//! - Annotations: one row per study. The `id` column is the row key; every other
//!   column except the reserved identifier columns is a numeric feature. Empty cells
//!   become NaN so the decoder can report exactly which study/feature is missing.
//! - Coordinates: one row per focus. The `id` column names the owning study; `x`, `y`
//!   and `z` are read when all three are present.

use super::tables::{AnnotationMatrix, CoordinateTable, DatasetError, RESERVED_ID_COLUMNS};
use ndarray::{Array2, ShapeBuilder};
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

const ID_COLUMN: &str = "id";
const POSITION_COLUMNS: [&str; 3] = ["x", "y", "z"];

/// Loads a study-by-feature annotation table.
pub fn load_annotations(path: &Path) -> Result<AnnotationMatrix, DatasetError> {
    let df = read_table(path)?;
    let columns = column_names(&df);
    if !columns.contains(ID_COLUMN) {
        return Err(DatasetError::ColumnNotFound(ID_COLUMN.to_string()));
    }

    let study_ids = extract_ids(&df, ID_COLUMN)?;
    let features: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .filter(|name| !RESERVED_ID_COLUMNS.contains(&name.as_str()))
        .collect();

    let n_studies = study_ids.len();
    let mut buffer = Vec::with_capacity(n_studies * features.len());
    for feature in &features {
        buffer.append(&mut extract_weights(&df, feature)?);
    }
    let weights = Array2::from_shape_vec((n_studies, features.len()).f(), buffer).map_err(
        |_| DatasetError::ShapeMismatch {
            found: (df.height(), df.width()),
            studies: n_studies,
            features: features.len(),
        },
    )?;

    log::info!(
        "Loaded annotations for {} studies and {} features from '{}'",
        n_studies,
        features.len(),
        path.display()
    );
    AnnotationMatrix::new(study_ids, features, weights)
}

/// Loads a focus-level coordinate table.
pub fn load_coordinates(path: &Path) -> Result<CoordinateTable, DatasetError> {
    let df = read_table(path)?;
    let columns = column_names(&df);
    if !columns.contains(ID_COLUMN) {
        return Err(DatasetError::ColumnNotFound(ID_COLUMN.to_string()));
    }

    let study_ids = extract_ids(&df, ID_COLUMN)?;
    let has_positions = POSITION_COLUMNS.iter().all(|c| columns.contains(*c));
    let table = if has_positions {
        let n_foci = study_ids.len();
        let mut buffer = Vec::with_capacity(n_foci * 3);
        for axis in POSITION_COLUMNS {
            let mut values = extract_weights(&df, axis)?;
            if values.iter().any(|v| v.is_nan()) {
                return Err(DatasetError::ColumnWrongType {
                    column_name: axis.to_string(),
                    expected_type: "complete f64 (numeric)",
                    found_type: "column with missing values".to_string(),
                });
            }
            buffer.append(&mut values);
        }
        let positions = Array2::from_shape_vec((n_foci, 3).f(), buffer).map_err(|_| {
            DatasetError::PositionCountMismatch {
                foci: n_foci,
                positions: df.height(),
            }
        })?;
        CoordinateTable::with_positions(study_ids, positions)?
    } else {
        CoordinateTable::new(study_ids)
    };

    log::info!(
        "Loaded {} foci from '{}'",
        table.len(),
        path.display()
    );
    Ok(table)
}

fn read_table(path: &Path) -> Result<DataFrame, DatasetError> {
    let df = CsvReader::new(File::open(path)?)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_parse_options(CsvParseOptions::default().with_separator(b'\t')),
        )
        .finish()?;
    log::debug!(
        "Read {} rows x {} columns from '{}'",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}

fn column_names(df: &DataFrame) -> HashSet<String> {
    df.get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect()
}

fn extract_ids(df: &DataFrame, column_name: &str) -> Result<Vec<String>, DatasetError> {
    let column = df.column(column_name)?;
    let casted = column.cast(&DataType::String)?;
    casted
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            _ => Err(DatasetError::MissingStudyId(row + 1)),
        })
        .collect()
}

/// Reads a numeric column, mapping empty cells to NaN.
fn extract_weights(df: &DataFrame, column_name: &str) -> Result<Vec<f64>, DatasetError> {
    let column = df.column(column_name)?;
    let casted = match column.cast(&DataType::Float64) {
        Ok(casted) if casted.null_count() == column.null_count() => casted,
        _ => {
            return Err(DatasetError::ColumnWrongType {
                column_name: column_name.to_string(),
                expected_type: "f64 (numeric)",
                found_type: format!("{:?}", column.dtype()),
            });
        }
    };
    let values = casted
        .f64()?
        .into_iter()
        .map(|value| value.unwrap_or(f64::NAN))
        .collect();
    Ok(values)
}
