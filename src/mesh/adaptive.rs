use super::{
  polygon::Polygon,
  random::{random_triangulation_with, triangulate_domain, Domain, SamplingConfig},
  TriangleMesh,
};
use crate::{error::FemResult, geometry::GeometryTriangle};

/// Outcome of an adaptive refinement run.
#[derive(Debug, Clone)]
pub struct RefinedMesh {
  pub mesh: TriangleMesh,
  /// Number of refinement passes that inserted at least one point.
  pub npasses: usize,
  /// Node count of the initial random triangulation.
  pub ninitial_nodes: usize,
}

/// Refines a random triangulation of `polygon` by centroid insertion.
///
/// Every pass inserts the centroid of each triangle for which `refine` holds
/// and re-triangulates from scratch. Stops as soon as the mesh has at least
/// `2 * initial_num_points` nodes, or a pass inserts no point.
pub fn adaptive_refinement<F>(
  polygon: &Polygon,
  initial_num_points: usize,
  seed: u64,
  refine: F,
) -> FemResult<RefinedMesh>
where
  F: Fn(&GeometryTriangle) -> bool,
{
  adaptive_refinement_with(
    polygon,
    initial_num_points,
    seed,
    &SamplingConfig::default(),
    refine,
  )
}

pub fn adaptive_refinement_with<F>(
  polygon: &Polygon,
  initial_num_points: usize,
  seed: u64,
  config: &SamplingConfig,
  refine: F,
) -> FemResult<RefinedMesh>
where
  F: Fn(&GeometryTriangle) -> bool,
{
  let domain = Domain::Polygon(polygon.clone());
  let mut mesh = random_triangulation_with(&domain, initial_num_points, seed, config)?;
  let ninitial_nodes = mesh.nnodes();
  let target = 2 * initial_num_points;

  let mut npasses = 0;
  loop {
    let centroids: Vec<_> = mesh
      .cell_geometries()
      .filter(|geo| refine(geo))
      .map(|geo| geo.centroid())
      .collect();

    if centroids.is_empty() {
      tracing::debug!("refinement pass {npasses} added no points, stopping");
      break;
    }

    let (mut nodes, _) = mesh.into_parts();
    nodes.extend(centroids);
    mesh = triangulate_domain(nodes, &domain)?;
    npasses += 1;
    tracing::debug!(
      "refinement pass {npasses}: {} nodes, {} triangles",
      mesh.nnodes(),
      mesh.ncells()
    );

    if mesh.nnodes() >= target {
      break;
    }
  }

  Ok(RefinedMesh {
    mesh,
    npasses,
    ninitial_nodes,
  })
}
