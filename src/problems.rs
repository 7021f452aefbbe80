//! Front-ends for the three problem classes, taking fixed nodes instead of DOFs.

use crate::{
  assemble::GalVec,
  error::FemResult,
  fe::Material,
  lse::DirichletBc,
  mesh::TriangleMesh,
  pipeline::{solve_with_bc, FemSolution},
  solver::SolveMethod,
  VertexIdx,
};

/// Steady heat conduction.
///
/// `heat_sources` holds one nodal heat flow per node.
pub fn solve_heat(
  mesh: &TriangleMesh,
  k: f64,
  fixed_nodes: &[VertexIdx],
  fixed_temperatures: &[f64],
  heat_sources: &GalVec,
  method: &SolveMethod,
) -> FemResult<FemSolution> {
  let bc = DirichletBc::from_fixed_nodes(mesh.nnodes(), 1, fixed_nodes, fixed_temperatures)?;
  solve_with_bc(mesh, &Material::Conductivity { k }, &bc, heat_sources, method)
}

/// Plane stress elasticity with both displacement components of every fixed
/// node clamped to zero.
///
/// `forces` holds interleaved nodal forces $(f_x, f_y)$.
pub fn solve_elasticity(
  mesh: &TriangleMesh,
  youngs_modulus: f64,
  poisson_ratio: f64,
  fixed_nodes: &[VertexIdx],
  forces: &GalVec,
  method: &SolveMethod,
) -> FemResult<FemSolution> {
  let material = Material::Elastic {
    youngs_modulus,
    poisson_ratio,
  };
  let bc = clamped(mesh, fixed_nodes)?;
  solve_with_bc(mesh, &material, &bc, forces, method)
}

/// Single mass matrix solve $M u = f$ with clamped nodes.
pub fn solve_mass(
  mesh: &TriangleMesh,
  rho: f64,
  fixed_nodes: &[VertexIdx],
  forces: &GalVec,
  method: &SolveMethod,
) -> FemResult<FemSolution> {
  let bc = clamped(mesh, fixed_nodes)?;
  solve_with_bc(mesh, &Material::Density { rho }, &bc, forces, method)
}

fn clamped(mesh: &TriangleMesh, fixed_nodes: &[VertexIdx]) -> FemResult<DirichletBc> {
  let zeros = vec![0.0; fixed_nodes.len()];
  DirichletBc::from_fixed_nodes(mesh.nnodes(), 2, fixed_nodes, &zeros)
}
