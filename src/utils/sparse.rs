//! Sparse document-term matrices
//!
//! Feature matrices are CSR: one compressed row per document, holding only
//! the terms that occur in it.

use crate::error::{Result, TextClfError};
use ndarray::Array1;
use sprs::{CsMat, CsVecView, TriMat};

/// Row-major sparse matrix of feature values
pub type SparseMatrix = CsMat<f64>;

/// One document's row of a [`SparseMatrix`]
pub type SparseRow<'a> = CsVecView<'a, f64>;

/// `(column, value)` entries of one row
pub type RowEntries = Vec<(usize, f64)>;

/// Build a CSR matrix with `n_cols` columns from per-row entries.
///
/// Entries repeating a column within a row are summed.
pub fn csr_from_rows(rows: &[RowEntries], n_cols: usize) -> SparseMatrix {
    let nnz = rows.iter().map(Vec::len).sum();
    let mut triplets = TriMat::with_capacity((rows.len(), n_cols), nnz);
    for (i, row) in rows.iter().enumerate() {
        for &(j, value) in row {
            triplets.add_triplet(i, j, value);
        }
    }
    triplets.to_csr()
}

/// Concatenate CSR blocks column-wise, keeping block order
pub fn hstack(blocks: &[SparseMatrix]) -> Result<SparseMatrix> {
    let n_rows = match blocks.first() {
        Some(first) => first.rows(),
        None => return Err(TextClfError::ValidationError("Nothing to stack".to_string())),
    };
    if let Some(block) = blocks.iter().find(|b| b.rows() != n_rows) {
        return Err(TextClfError::ShapeError {
            expected: format!("{} rows", n_rows),
            actual: format!("{} rows", block.rows()),
        });
    }
    if let [single] = blocks {
        return Ok(single.clone());
    }

    let mut rows: Vec<RowEntries> = vec![Vec::new(); n_rows];
    let mut offset = 0;
    for block in blocks {
        for (entries, row) in rows.iter_mut().zip(block.outer_iterator()) {
            entries.extend(row.iter().map(|(j, &v)| (j + offset, v)));
        }
        offset += block.cols();
    }

    Ok(csr_from_rows(&rows, offset))
}

/// Dot product of a sparse row with a dense vector
pub fn row_dot(row: &SparseRow<'_>, dense: &Array1<f64>) -> f64 {
    row.iter().map(|(j, &v)| v * dense[j]).sum()
}

pub fn row_norm_sq(row: &SparseRow<'_>) -> f64 {
    row.data().iter().map(|v| v * v).sum()
}

/// `dense += scale * row`
pub fn add_scaled_row(dense: &mut Array1<f64>, scale: f64, row: &SparseRow<'_>) {
    for (j, &v) in row.iter() {
        dense[j] += scale * v;
    }
}

/// `x · w` for every row of `x`
pub fn matvec(x: &SparseMatrix, dense: &Array1<f64>) -> Array1<f64> {
    x.outer_iterator().map(|row| row_dot(&row, dense)).collect()
}

/// Reject matrices stored column-major; every consumer walks rows
pub fn ensure_csr(x: &SparseMatrix) -> Result<()> {
    if x.is_csr() {
        Ok(())
    } else {
        Err(TextClfError::ValidationError("Expected a row-major (CSR) feature matrix".to_string()))
    }
}

/// Sparse copy of a dense matrix, dropping zeros
#[cfg(test)]
pub(crate) fn csr_from_dense(x: &ndarray::Array2<f64>) -> SparseMatrix {
    let rows: Vec<RowEntries> = x
        .rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .filter(|(_, &v)| v != 0.0)
                .map(|(j, &v)| (j, v))
                .collect()
        })
        .collect();
    csr_from_rows(&rows, x.ncols())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_csr_from_rows_sums_duplicates() {
        let rows = vec![vec![(2, 1.0), (0, 1.0), (2, 1.0)], vec![], vec![(1, 3.0)]];
        let m = csr_from_rows(&rows, 3);

        assert_eq!(m.shape(), (3, 3));
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.get(0, 2), Some(&2.0));
        assert_eq!(m.get(1, 0), None);
        assert!(m.is_csr());
    }

    #[test]
    fn test_hstack_offsets_columns() {
        let a = csr_from_rows(&[vec![(0, 1.0)], vec![(1, 2.0)]], 2);
        let b = csr_from_rows(&[vec![(2, 5.0)], vec![]], 3);

        let m = hstack(&[a, b]).unwrap();
        assert_eq!(m.shape(), (2, 5));
        assert_eq!(m.get(0, 0), Some(&1.0));
        assert_eq!(m.get(0, 4), Some(&5.0));
        assert_eq!(m.get(1, 1), Some(&2.0));
        assert_eq!(m.nnz(), 3);
    }

    #[test]
    fn test_hstack_row_mismatch() {
        let a = csr_from_rows(&[vec![(0, 1.0)]], 1);
        let b = csr_from_rows(&[vec![], vec![]], 1);
        assert!(matches!(hstack(&[a, b]), Err(TextClfError::ShapeError { .. })));
        assert!(hstack(&[]).is_err());
    }

    #[test]
    fn test_row_ops() {
        let m = csr_from_rows(&[vec![(0, 2.0), (2, 1.0)]], 3);
        let row = m.outer_view(0).unwrap();
        let w = array![1.0, 10.0, 3.0];

        assert_eq!(row_dot(&row, &w), 5.0);
        assert_eq!(row_norm_sq(&row), 5.0);
        assert_eq!(matvec(&m, &w), array![5.0]);

        let mut acc = Array1::zeros(3);
        add_scaled_row(&mut acc, 0.5, &row);
        assert_eq!(acc, array![1.0, 0.0, 0.5]);
    }
}
