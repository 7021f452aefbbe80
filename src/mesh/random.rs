use super::{
  cartesian::Rect,
  delaunay::{cull_exterior_cells, triangulate},
  polygon::Polygon,
  Cell, TriangleMesh,
};
use crate::{
  error::{FemError, FemResult},
  geometry::Point,
};

use rand::{rngs::StdRng, Rng, SeedableRng};

/// Region to scatter points in.
#[derive(Debug, Clone, PartialEq)]
pub enum Domain {
  /// Points are sampled uniformly inside the box.
  Rect(Rect),
  /// Polygon vertices are kept as nodes, interior points are rejection sampled.
  Polygon(Polygon),
}

impl Domain {
  pub fn rect(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> FemResult<Self> {
    Rect::new_min_max(Point::new(xmin, ymin), Point::new(xmax, ymax)).map(Self::Rect)
  }

  pub fn contains(&self, p: &Point) -> bool {
    match self {
      Self::Rect(rect) => rect.contains(p),
      Self::Polygon(polygon) => polygon.contains(p),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingConfig {
  /// Rejection sampling gives up after this many draws per requested point.
  pub max_attempts_per_point: usize,
}

impl Default for SamplingConfig {
  fn default() -> Self {
    Self {
      max_attempts_per_point: 1000,
    }
  }
}

fn sample_in_rect(rect: &Rect, rng: &mut impl Rng) -> Point {
  let (min, max) = (rect.min(), rect.max());
  Point::new(rng.gen_range(min.x..max.x), rng.gen_range(min.y..max.y))
}

/// Draws `num_points` uniform points inside `polygon`.
///
/// Bounded rejection loop over the polygon's bounding box.
pub fn sample_in_polygon(
  polygon: &Polygon,
  num_points: usize,
  rng: &mut impl Rng,
  config: &SamplingConfig,
) -> FemResult<Vec<Point>> {
  let bbox = polygon.bounding_box()?;
  let max_attempts = config.max_attempts_per_point.saturating_mul(num_points.max(1));

  let mut points = Vec::with_capacity(num_points);
  let mut attempts = 0;
  while points.len() < num_points {
    if attempts >= max_attempts {
      return Err(FemError::InvalidInput(format!(
        "sampled only {} of {num_points} points inside polygon after {attempts} attempts",
        points.len()
      )));
    }
    attempts += 1;
    let p = sample_in_rect(&bbox, rng);
    if polygon.contains(&p) {
      points.push(p);
    }
  }
  tracing::trace!("rejection sampling took {attempts} draws for {num_points} points");
  Ok(points)
}

/// Seeded point cloud for a domain, polygon vertices first.
pub fn sample_points(
  domain: &Domain,
  num_points: usize,
  rng: &mut impl Rng,
  config: &SamplingConfig,
) -> FemResult<Vec<Point>> {
  match domain {
    Domain::Rect(rect) => Ok((0..num_points).map(|_| sample_in_rect(rect, rng)).collect()),
    Domain::Polygon(polygon) => {
      let mut points = polygon.vertices().to_vec();
      points.extend(sample_in_polygon(polygon, num_points, rng, config)?);
      Ok(points)
    }
  }
}

/// Delaunay triangulates `points`, culls triangles outside of the domain and
/// drops nodes no triangle references.
pub fn triangulate_domain(points: Vec<Point>, domain: &Domain) -> FemResult<TriangleMesh> {
  let mut cells = triangulate(&points)?;
  if let Domain::Polygon(polygon) = domain {
    cells = cull_exterior_cells(&points, cells, polygon);
  }
  if cells.is_empty() {
    return Err(FemError::InvalidInput(
      "no triangle lies inside the domain".to_owned(),
    ));
  }
  Ok(compact(points, cells))
}

/// Removes unreferenced nodes and renumbers the cells, preserving node order.
fn compact(points: Vec<Point>, cells: Vec<Cell>) -> TriangleMesh {
  let mut new_idx = vec![None; points.len()];
  cells.iter().flatten().for_each(|&v| new_idx[v] = Some(0));
  let npoints = points.len();

  let mut nodes = Vec::with_capacity(npoints);
  for (i, p) in points.into_iter().enumerate() {
    if new_idx[i].is_some() {
      new_idx[i] = Some(nodes.len());
      nodes.push(p);
    }
  }
  if nodes.len() < npoints {
    tracing::debug!("dropped {} unreferenced nodes", npoints - nodes.len());
  }

  let cells = cells
    .into_iter()
    .map(|cell| cell.map(|v| new_idx[v].unwrap_or(v)))
    .collect();
  TriangleMesh::new_unchecked(nodes, cells)
}

/// Random Delaunay mesh of `num_points` seeded points over a domain.
pub fn random_triangulation(domain: &Domain, num_points: usize, seed: u64) -> FemResult<TriangleMesh> {
  random_triangulation_with(domain, num_points, seed, &SamplingConfig::default())
}

pub fn random_triangulation_with(
  domain: &Domain,
  num_points: usize,
  seed: u64,
  config: &SamplingConfig,
) -> FemResult<TriangleMesh> {
  if matches!(domain, Domain::Rect(_)) && num_points < 3 {
    return Err(FemError::InvalidInput(format!(
      "random triangulation needs at least 3 points, got {num_points}"
    )));
  }
  let mut rng = StdRng::seed_from_u64(seed);
  let points = sample_points(domain, num_points, &mut rng, config)?;
  let mesh = triangulate_domain(points, domain)?;
  tracing::debug!(
    "random triangulation: {} nodes, {} triangles",
    mesh.nnodes(),
    mesh.ncells()
  );
  Ok(mesh)
}
