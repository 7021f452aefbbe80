//! Enforcement of essential (Dirichlet) boundary conditions on the assembled
//! linear system of equations.

use crate::{
  assemble::{GalMat, GalVec},
  error::{FemError, FemResult},
  space::dof_index,
  util, DofIdx, VertexIdx,
};

/// Prescribed values on a set of unique DOFs.
#[derive(Debug, Clone, PartialEq)]
pub struct DirichletBc {
  ndofs: usize,
  dof_coeffs: Vec<(DofIdx, f64)>,
}

impl DirichletBc {
  /// Fails on out of range DOFs and on DOFs given twice with different values.
  /// Repetitions with the same value are merged.
  pub fn new(ndofs: usize, dof_coeffs: Vec<(DofIdx, f64)>) -> FemResult<Self> {
    let mut prescribed: Vec<Option<f64>> = vec![None; ndofs];
    let mut unique = Vec::with_capacity(dof_coeffs.len());
    for (idof, value) in dof_coeffs {
      if idof >= ndofs {
        return Err(FemError::InvalidInput(format!(
          "fixed dof {idof} out of range for {ndofs} dofs"
        )));
      }
      if !value.is_finite() {
        return Err(FemError::InvalidInput(format!(
          "fixed dof {idof} has non-finite value {value}"
        )));
      }
      match prescribed[idof] {
        None => {
          prescribed[idof] = Some(value);
          unique.push((idof, value));
        }
        Some(old) if old == value => {
          tracing::debug!("dof {idof} fixed twice to {value}");
        }
        Some(old) => {
          return Err(FemError::InvalidInput(format!(
            "dof {idof} fixed to conflicting values {old} and {value}"
          )));
        }
      }
    }
    Ok(Self {
      ndofs,
      dof_coeffs: unique,
    })
  }

  /// Parallel lists of fixed DOFs and their values.
  pub fn from_dofs_values(ndofs: usize, dofs: &[DofIdx], values: &[f64]) -> FemResult<Self> {
    if dofs.len() != values.len() {
      return Err(FemError::DimensionMismatch {
        expected: dofs.len(),
        found: values.len(),
        context: "fixed dof values",
      });
    }
    Self::new(ndofs, dofs.iter().copied().zip(values.iter().copied()).collect())
  }

  /// Fixes the given DOFs to zero.
  pub fn homogeneous(ndofs: usize, dofs: &[DofIdx]) -> FemResult<Self> {
    Self::new(ndofs, dofs.iter().map(|&idof| (idof, 0.0)).collect())
  }

  /// Fixes every component of each node to the node's value.
  pub fn from_fixed_nodes(
    nnodes: usize,
    ndofs_per_node: usize,
    nodes: &[VertexIdx],
    values: &[f64],
  ) -> FemResult<Self> {
    if nodes.len() != values.len() {
      return Err(FemError::DimensionMismatch {
        expected: nodes.len(),
        found: values.len(),
        context: "fixed node values",
      });
    }
    if let Some(&inode) = nodes.iter().find(|&&inode| inode >= nnodes) {
      return Err(FemError::InvalidInput(format!(
        "fixed node {inode} out of range for {nnodes} nodes"
      )));
    }
    let dof_coeffs = nodes
      .iter()
      .zip(values)
      .flat_map(|(&inode, &value)| {
        (0..ndofs_per_node).map(move |icomp| (dof_index(inode, icomp, ndofs_per_node), value))
      })
      .collect();
    Self::new(nnodes * ndofs_per_node, dof_coeffs)
  }

  pub fn ndofs(&self) -> usize {
    self.ndofs
  }
  pub fn dof_coeffs(&self) -> &[(DofIdx, f64)] {
    &self.dof_coeffs
  }
  pub fn dofs(&self) -> impl Iterator<Item = DofIdx> + '_ {
    self.dof_coeffs.iter().map(|&(idof, _)| idof)
  }
  pub fn is_empty(&self) -> bool {
    self.dof_coeffs.is_empty()
  }

  /// Modifies the system in place, see [`fix_dofs_coeff`].
  pub fn apply(&self, galmat: &mut GalMat, galvec: &mut GalVec) -> FemResult<()> {
    if galmat.nrows() != self.ndofs || galmat.ncols() != self.ndofs {
      return Err(FemError::DimensionMismatch {
        expected: self.ndofs,
        found: galmat.nrows().max(galmat.ncols()),
        context: "boundary conditions vs. galerkin matrix",
      });
    }
    if galvec.len() != self.ndofs {
      return Err(FemError::DimensionMismatch {
        expected: self.ndofs,
        found: galvec.len(),
        context: "boundary conditions vs. galerkin vector",
      });
    }
    fix_dofs_coeff(&self.dof_coeffs, galmat, galvec);
    Ok(())
  }
}

/// Fix DOFs of FE solution.
///
/// Modifies supplied galerkin matrix and galerkin vector,
/// such that the FE solution has the given coefficents on the dofs.
/// $mat(A_0, 0; 0, I) vec(mu_0, mu_diff) = vec(phi - A_(0 diff) gamma, gamma)$
///
/// The fixed columns are moved to the right-hand side before they are
/// zeroed, so the free DOFs see the prescribed values.
pub fn fix_dofs_coeff(dof_coeffs: &[(DofIdx, f64)], galmat: &mut GalMat, galvec: &mut GalVec) {
  let ndofs = galmat.nrows();

  let dof_coeffs_opt = util::sparse_to_dense_data(dof_coeffs.to_vec(), ndofs);
  let dof_coeffs_zeroed =
    na::DVector::from_iterator(ndofs, dof_coeffs_opt.iter().map(|v| v.unwrap_or(0.0)));

  *galvec -= &*galmat * dof_coeffs_zeroed;

  for &(idof, value) in dof_coeffs {
    galmat.row_mut(idof).fill(0.0);
    galmat.column_mut(idof).fill(0.0);
    galmat[(idof, idof)] = 1.0;
    galvec[idof] = value;
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn laplace_1d(n: usize) -> GalMat {
    GalMat::from_fn(n, n, |i, j| match i.abs_diff(j) {
      0 => 2.0,
      1 => -1.0,
      _ => 0.0,
    })
  }

  #[test]
  fn fixed_rows_and_columns_are_unit() {
    let mut galmat = laplace_1d(5);
    let mut galvec = GalVec::from_element(5, 1.0);
    let bc = DirichletBc::new(5, vec![(0, 3.0), (4, -2.0)]).unwrap();
    bc.apply(&mut galmat, &mut galvec).unwrap();

    for (d, value) in [(0, 3.0), (4, -2.0)] {
      for k in 0..5 {
        let expected = if k == d { 1.0 } else { 0.0 };
        assert_eq!(galmat[(d, k)], expected);
        assert_eq!(galmat[(k, d)], expected);
      }
      assert_eq!(galvec[d], value);
    }
    // lifted neighbours
    assert_eq!(galvec[1], 1.0 + 3.0);
    assert_eq!(galvec[3], 1.0 - 2.0);
    assert_eq!(galvec[2], 1.0);
  }

  #[test]
  fn application_is_idempotent() {
    let bc = DirichletBc::new(4, vec![(1, 0.0), (2, 0.0)]).unwrap();
    let mut galmat = laplace_1d(4);
    let mut galvec = GalVec::from_element(4, 1.0);
    bc.apply(&mut galmat, &mut galvec).unwrap();
    let (once_mat, once_vec) = (galmat.clone(), galvec.clone());
    bc.apply(&mut galmat, &mut galvec).unwrap();
    assert_eq!(galmat, once_mat);
    assert_eq!(galvec, once_vec);
  }

  #[test]
  fn conflicting_values_are_rejected() {
    assert!(matches!(
      DirichletBc::new(3, vec![(1, 1.0), (1, 2.0)]),
      Err(FemError::InvalidInput(_))
    ));
    let merged = DirichletBc::new(3, vec![(1, 1.0), (1, 1.0)]).unwrap();
    assert_eq!(merged.dof_coeffs(), &[(1, 1.0)]);
  }

  #[test]
  fn out_of_range_is_rejected() {
    assert!(DirichletBc::new(3, vec![(3, 0.0)]).is_err());
    assert!(DirichletBc::from_fixed_nodes(2, 2, &[2], &[0.0]).is_err());
    assert!(matches!(
      DirichletBc::from_dofs_values(3, &[0, 1], &[0.0]),
      Err(FemError::DimensionMismatch { .. })
    ));
  }

  #[test]
  fn fixed_nodes_map_to_interleaved_dofs() {
    let bc = DirichletBc::from_fixed_nodes(4, 2, &[0, 3], &[0.0, 0.0]).unwrap();
    assert_eq!(bc.dofs().collect::<Vec<_>>(), vec![0, 1, 6, 7]);
    assert_eq!(bc.ndofs(), 8);
  }

  #[test]
  fn size_mismatch() {
    let bc = DirichletBc::homogeneous(3, &[0]).unwrap();
    let mut galmat = laplace_1d(4);
    let mut galvec = GalVec::zeros(4);
    assert!(matches!(
      bc.apply(&mut galmat, &mut galvec),
      Err(FemError::DimensionMismatch { .. })
    ));
  }
}
