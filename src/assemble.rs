use crate::{
  error::FemResult,
  fe::ElmatProvider,
  mesh::TriangleMesh,
  space::DofHandler,
};

use rayon::prelude::*;

pub type GalMat = na::DMatrix<f64>;
pub type GalVec = na::DVector<f64>;

/// Element contributions as `(row, col, value)` triplets.
fn element_triplets(
  mesh: &TriangleMesh,
  dof_handler: &DofHandler,
  elmat: &impl ElmatProvider,
) -> FemResult<Vec<Vec<(usize, usize, f64)>>> {
  (0..mesh.ncells())
    .into_par_iter()
    .map(|icell| {
      let geo = mesh.cell_geometry(icell);
      let elmat = elmat.eval(&geo).map_err(|e| e.with_cell(icell))?;
      let dofs = dof_handler.local2global(icell);

      let mut local_triplets = Vec::with_capacity(dofs.len() * dofs.len());
      for (ilocal, &iglobal) in dofs.iter().enumerate() {
        for (jlocal, &jglobal) in dofs.iter().enumerate() {
          local_triplets.push((iglobal, jglobal, elmat[(ilocal, jlocal)]));
        }
      }
      Ok(local_triplets)
    })
    .collect()
}

/// Assembly algorithm for the Galerkin Matrix.
///
/// Element matrices are computed in parallel into per-element buffers, which
/// are then summed into the global matrix in element order.
pub fn assemble_galmat(mesh: &TriangleMesh, elmat: &impl ElmatProvider) -> FemResult<GalMat> {
  let dof_handler = DofHandler::new(mesh, elmat.ndofs_per_node());
  let ndofs = dof_handler.ndofs();

  let buffers = element_triplets(mesh, &dof_handler, elmat)?;

  let mut galmat = GalMat::zeros(ndofs, ndofs);
  for (r, c, v) in buffers.into_iter().flatten() {
    galmat[(r, c)] += v;
  }
  Ok(galmat)
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{error::FemError, fe::Material, mesh::regular_grid};
  use approx::assert_relative_eq;

  fn unit_square() -> TriangleMesh {
    TriangleMesh::from_coords(
      &[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
      vec![[0, 1, 2], [0, 2, 3]],
    )
    .unwrap()
  }

  #[test]
  fn unit_square_conductivity() {
    let galmat = assemble_galmat(&unit_square(), &Material::Conductivity { k: 1.0 }).unwrap();
    #[rustfmt::skip]
    let expected = GalMat::from_row_slice(4, 4, &[
       1.0, -0.5,  0.0, -0.5,
      -0.5,  1.0, -0.5,  0.0,
       0.0, -0.5,  1.0, -0.5,
      -0.5,  0.0, -0.5,  1.0,
    ]);
    assert_relative_eq!(galmat, expected, epsilon = 1e-14);
  }

  #[test]
  fn shared_entries_are_summed() {
    let mesh = unit_square();
    let galmat = assemble_galmat(&mesh, &Material::Density { rho: 12.0 }).unwrap();
    assert_eq!(galmat.nrows(), 8);
    // nodes 0 and 2 are shared by both triangles of area 0.5
    assert_relative_eq!(galmat[(0, 0)], 2.0 * 2.0 * 0.5, epsilon = 1e-14);
    assert_relative_eq!(galmat[(4, 5)], 0.0);
    assert_relative_eq!(galmat.sum(), 2.0 * 12.0, epsilon = 1e-12);
  }

  #[test]
  fn conductivity_rows_sum_to_zero() {
    let mesh = regular_grid(0.0, 2.0, 0.0, 1.0, 5, 4).unwrap();
    let galmat = assemble_galmat(&mesh, &Material::Conductivity { k: 3.0 }).unwrap();
    for row in galmat.row_iter() {
      assert!(row.sum().abs() < 1e-12);
    }
    assert_relative_eq!(galmat, galmat.transpose(), epsilon = 1e-14);
  }

  #[test]
  fn degenerate_cell_is_reported() {
    let mesh = TriangleMesh::from_coords(
      &[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [0.0, 1.0]],
      vec![[0, 1, 3], [0, 1, 2]],
    )
    .unwrap();
    assert!(matches!(
      assemble_galmat(&mesh, &Material::Conductivity { k: 1.0 }),
      Err(FemError::DegenerateGeometry { cell: Some(1), .. })
    ));
  }
}
