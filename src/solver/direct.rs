use crate::{
  assemble::{GalMat, GalVec},
  error::{FemError, FemResult},
  sparse::SparseMatrix,
};

use faer::solvers::SpSolver;

/// Systems with $norm(b) < "tol" norm(A) norm(x)$ are treated as singular.
///
/// $norm(A) norm(x) / norm(b)$ bounds the condition number from below.
pub const SINGULARITY_TOL: f64 = 1e-13;

/// Rejects non-finite solutions and solutions that reveal a numerically
/// singular matrix.
pub(crate) fn check_solution(a_norm: f64, x: &GalVec, b: &GalVec) -> FemResult<()> {
  if x.iter().any(|v| !v.is_finite()) {
    return Err(FemError::SingularMatrix(
      "solution has non-finite entries".to_owned(),
    ));
  }
  let x_norm = x.norm();
  let b_norm = b.norm();
  if b_norm < SINGULARITY_TOL * a_norm * x_norm {
    return Err(FemError::SingularMatrix(format!(
      "condition number at least {:e}",
      a_norm * x_norm / b_norm
    )));
  }
  Ok(())
}

/// Dense LU decomposition with partial pivoting.
pub fn dense_lu(galmat: &GalMat, galvec: &GalVec) -> FemResult<GalVec> {
  let x = galmat
    .clone()
    .lu()
    .solve(galvec)
    .ok_or_else(|| FemError::SingularMatrix("zero pivot in dense LU".to_owned()))?;
  check_solution(galmat.norm(), &x, galvec)?;
  Ok(x)
}

/// Sparse LU decomposition.
pub fn sparse_lu(galmat: &SparseMatrix, galvec: &GalVec) -> FemResult<GalVec> {
  let lu = FaerLu::new(galmat)?;
  let x = lu.solve(galvec);
  let a_norm = galmat
    .triplets()
    .iter()
    .map(|&(_, _, v)| v * v)
    .sum::<f64>()
    .sqrt();
  check_solution(a_norm, &x, galvec)?;
  Ok(x)
}

pub struct FaerLu {
  raw: faer::sparse::linalg::solvers::Lu<usize, f64>,
}
impl FaerLu {
  pub fn new(a: &SparseMatrix) -> FemResult<Self> {
    let raw = a
      .to_faer_csc()?
      .sp_lu()
      .map_err(|e| FemError::SingularMatrix(format!("sparse LU failed: {e:?}")))?;
    Ok(Self { raw })
  }

  pub fn solve(&self, b: &na::DVector<f64>) -> na::DVector<f64> {
    let b = faer::col::from_slice(b.as_slice());
    na::DVector::from_vec(self.raw.solve(b).as_slice().to_vec())
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use approx::assert_relative_eq;

  fn system() -> (GalMat, GalVec) {
    #[rustfmt::skip]
    let a = GalMat::from_row_slice(3, 3, &[
       4.0, -1.0,  0.0,
      -1.0,  4.0, -1.0,
       0.0, -1.0,  4.0,
    ]);
    let b = GalVec::from_row_slice(&[1.0, 2.0, 3.0]);
    (a, b)
  }

  #[test]
  fn dense_and_sparse_agree() {
    let (a, b) = system();
    let dense = dense_lu(&a, &b).unwrap();
    let sparse = sparse_lu(&SparseMatrix::from_dense(&a), &b).unwrap();
    assert_relative_eq!(dense, sparse, epsilon = 1e-14);
    assert_relative_eq!(&a * dense, b, epsilon = 1e-14);
  }

  #[test]
  fn repeated_row_is_singular() {
    let a = GalMat::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
    let b = GalVec::from_row_slice(&[1.0, 1.0]);
    assert!(matches!(dense_lu(&a, &b), Err(FemError::SingularMatrix(_))));
    assert!(matches!(
      sparse_lu(&SparseMatrix::from_dense(&a), &b),
      Err(FemError::SingularMatrix(_))
    ));
  }

  #[test]
  fn pure_neumann_laplacian_is_singular() {
    #[rustfmt::skip]
    let a = GalMat::from_row_slice(3, 3, &[
       1.0, -1.0,  0.0,
      -1.0,  2.0, -1.0,
       0.0, -1.0,  1.0,
    ]);
    let b = GalVec::from_row_slice(&[1.0, 0.0, 0.0]);
    assert!(matches!(dense_lu(&a, &b), Err(FemError::SingularMatrix(_))));
  }
}
