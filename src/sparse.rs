use crate::error::{FemError, FemResult};

use itertools::Itertools;

/// Triplet storage that the solver backends convert into their own formats.
///
/// Duplicate entries are summed on conversion.
#[derive(Debug, Default, Clone)]
pub struct SparseMatrix {
  nrows: usize,
  ncols: usize,
  triplets: Vec<(usize, usize, f64)>,
}

impl SparseMatrix {
  pub fn new(nrows: usize, ncols: usize) -> Self {
    Self::from_triplets(nrows, ncols, Vec::new())
  }

  pub fn from_triplets(nrows: usize, ncols: usize, triplets: Vec<(usize, usize, f64)>) -> Self {
    Self {
      nrows,
      ncols,
      triplets,
    }
  }

  /// Collects the non-zero entries of a dense matrix in column-major order.
  pub fn from_dense(m: &na::DMatrix<f64>) -> Self {
    let triplets = m
      .column_iter()
      .enumerate()
      .flat_map(|(c, col)| {
        col
          .iter()
          .enumerate()
          .filter(|&(_, &v)| v != 0.0)
          .map(move |(r, &v)| (r, c, v))
          .collect::<Vec<_>>()
      })
      .collect();
    Self::from_triplets(m.nrows(), m.ncols(), triplets)
  }

  pub fn nrows(&self) -> usize {
    self.nrows
  }
  pub fn ncols(&self) -> usize {
    self.ncols
  }
  pub fn triplets(&self) -> &[(usize, usize, f64)] {
    &self.triplets
  }
  pub fn ntriplets(&self) -> usize {
    self.triplets.len()
  }

  pub fn push(&mut self, r: usize, c: usize, v: f64) {
    if v != 0.0 {
      self.triplets.push((r, c, v));
    }
  }

  pub fn set_zero<F>(&mut self, predicate: F)
  where
    F: Fn(usize, usize) -> bool,
  {
    self.triplets.retain(|&(r, c, _)| !predicate(r, c));
  }

  pub fn to_nalgebra_coo(&self) -> FemResult<nas::CooMatrix<f64>> {
    let (rows, cols, vals): (Vec<_>, Vec<_>, Vec<_>) = self.triplets.iter().copied().multiunzip();
    nas::CooMatrix::try_from_triplets(self.nrows, self.ncols, rows, cols, vals)
      .map_err(|e| FemError::InvalidInput(format!("bad sparse triplets: {e}")))
  }

  pub fn to_nalgebra_csr(&self) -> FemResult<nas::CsrMatrix<f64>> {
    Ok((&self.to_nalgebra_coo()?).into())
  }

  pub fn to_nalgebra_dense(&self) -> FemResult<na::DMatrix<f64>> {
    Ok((&self.to_nalgebra_coo()?).into())
  }

  pub fn to_faer_csc(&self) -> FemResult<faer::sparse::SparseColMat<usize, f64>> {
    faer::sparse::SparseColMat::try_new_from_triplets(self.nrows, self.ncols, &self.triplets)
      .map_err(|e| FemError::InvalidInput(format!("bad sparse triplets: {e:?}")))
  }
}
