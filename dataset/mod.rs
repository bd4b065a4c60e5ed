//! Read-only views over the meta-analytic database: the focus-level coordinate table
//! and the study-by-feature annotation matrix, plus tab-separated loaders for both.

pub mod io;
pub mod tables;

pub use io::{load_annotations, load_coordinates};
pub use tables::{AnnotationMatrix, CoordinateTable, DatasetError, RESERVED_ID_COLUMNS};
