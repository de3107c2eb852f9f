//! Utility functions and types

pub mod data_loader;
pub mod sparse;
mod timer;

pub use data_loader::{load_labeled, read_files_to_map, read_files_to_vec, FilePattern, LabeledDocument};
pub use sparse::{csr_from_rows, SparseMatrix, SparseRow};
pub use timer::{StageTiming, Timer};
