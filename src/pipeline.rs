//! Straight-line FEM pipeline: assembly, boundary conditions, solve.

use crate::{
  assemble::{self, GalVec},
  error::{FemError, FemResult},
  fe::Material,
  lse::DirichletBc,
  mesh::TriangleMesh,
  solver::{self, LinearSolution, SolveMethod},
  space::dof_index,
  util, DofIdx, VertexIdx,
};

use std::time::{Duration, Instant};

/// Solution of one pipeline run together with its diagnostics.
#[derive(Debug, Clone)]
pub struct FemSolution {
  ndofs_per_node: usize,
  method: SolveMethod,
  solution: LinearSolution,
  elapsed: Duration,
}

/// Summary of one solve for result logging.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveRecord {
  pub ndofs: usize,
  pub method: &'static str,
  pub elapsed: Duration,
  pub residual_norm: f64,
}

impl FemSolution {
  /// Nodal values, one DOF per node or interleaved `(x, y)` pairs.
  pub fn values(&self) -> &GalVec {
    &self.solution.x
  }
  pub fn into_values(self) -> GalVec {
    self.solution.x
  }

  pub fn ndofs(&self) -> usize {
    self.solution.x.len()
  }
  pub fn ndofs_per_node(&self) -> usize {
    self.ndofs_per_node
  }
  pub fn nnodes(&self) -> usize {
    self.ndofs() / self.ndofs_per_node
  }

  pub fn node_value(&self, inode: VertexIdx, icomp: usize) -> f64 {
    self.solution.x[dof_index(inode, icomp, self.ndofs_per_node)]
  }

  /// Per node displacement vectors of a vector problem.
  pub fn node_vectors(&self) -> Option<Vec<na::Vector2<f64>>> {
    (self.ndofs_per_node == 2).then(|| {
      (0..self.nnodes())
        .map(|inode| na::Vector2::new(self.node_value(inode, 0), self.node_value(inode, 1)))
        .collect()
    })
  }

  pub fn linear_solution(&self) -> &LinearSolution {
    &self.solution
  }
  pub fn converged(&self) -> bool {
    self.solution.converged
  }
  pub fn residual_norm(&self) -> f64 {
    self.solution.residual_norm
  }
  pub fn method(&self) -> &SolveMethod {
    &self.method
  }

  pub fn record(&self) -> SolveRecord {
    SolveRecord {
      ndofs: self.ndofs(),
      method: self.method.name(),
      elapsed: self.elapsed,
      residual_norm: self.solution.residual_norm,
    }
  }
}

/// Assembles, constrains and solves the system of `material` on `mesh`.
///
/// `load` is the right-hand side of size `ndofs_per_node * nnodes`.
pub fn solve_problem(
  mesh: &TriangleMesh,
  material: &Material,
  fixed_dofs: &[DofIdx],
  fixed_values: &[f64],
  load: &GalVec,
  method: &SolveMethod,
) -> FemResult<FemSolution> {
  let ndofs = material.ndofs_per_node() * mesh.nnodes();
  let bc = DirichletBc::from_dofs_values(ndofs, fixed_dofs, fixed_values)?;
  solve_with_bc(mesh, material, &bc, load, method)
}

/// Like [`solve_problem`] with prebuilt boundary conditions.
pub fn solve_with_bc(
  mesh: &TriangleMesh,
  material: &Material,
  bc: &DirichletBc,
  load: &GalVec,
  method: &SolveMethod,
) -> FemResult<FemSolution> {
  material.validate()?;
  let ndofs_per_node = material.ndofs_per_node();
  let ndofs = ndofs_per_node * mesh.nnodes();
  if load.len() != ndofs {
    return Err(FemError::DimensionMismatch {
      expected: ndofs,
      found: load.len(),
      context: "load vector vs. mesh dofs",
    });
  }
  let unreferenced = mesh.unreferenced_nodes();
  if !unreferenced.is_empty() {
    tracing::warn!("{} nodes belong to no triangle", unreferenced.len());
  }

  let start = Instant::now();
  let mut galmat = assemble::assemble_galmat(mesh, material)?;
  tracing::info!(
    "assembled global {} matrix ({} dofs) in {:?}",
    material.name(),
    galmat.nrows(),
    start.elapsed()
  );

  let mut galvec = load.clone();
  let start = Instant::now();
  bc.apply(&mut galmat, &mut galvec)?;
  tracing::info!("applied {} boundary conditions in {:?}", bc.dof_coeffs().len(), start.elapsed());
  tracing::debug!("matrix density: {}", util::density(&galmat));

  let start = Instant::now();
  let solution = solver::solve(&galmat, &galvec, method)?;
  let elapsed = start.elapsed();
  tracing::info!("solved with {method} in {elapsed:?}");

  Ok(FemSolution {
    ndofs_per_node,
    method: *method,
    solution,
    elapsed,
  })
}
