//! Delaunay triangulation via the Bowyer-Watson incremental insertion algorithm.
//!
//! For non-convex domains a post-processing step removes triangles whose
//! centroids lie outside the domain polygon.

use super::{polygon::Polygon, Cell};
use crate::{
  error::{FemError, FemResult},
  geometry::{GeometryTriangle, Point},
};

use std::collections::HashMap;

/// Triangle with cached circumcircle.
struct BwTriangle {
  v: Cell,
  center: Point,
  radius_sq: f64,
}

/// Edge key with sorted vertex indices.
#[derive(Hash, Eq, PartialEq)]
struct EdgeKey([usize; 2]);

impl EdgeKey {
  fn new(a: usize, b: usize) -> Self {
    Self([a.min(b), a.max(b)])
  }
}

/// Three vertices of a triangle enclosing all points well inside its circumcircle.
fn super_triangle(points: &[Point]) -> [Point; 3] {
  let (mut min, mut max) = (points[0], points[0]);
  for p in points {
    min.x = min.x.min(p.x);
    min.y = min.y.min(p.y);
    max.x = max.x.max(p.x);
    max.y = max.y.max(p.y);
  }
  let cx = 0.5 * (min.x + max.x);
  let cy = 0.5 * (min.y + max.y);
  let extent = (max.x - min.x).max(max.y - min.y).max(1e-6);
  // far enough that hull triangles of nearly collinear points survive
  let scale = 1e5 * extent;

  [
    Point::new(cx - 2.0 * scale, cy - scale),
    Point::new(cx + 2.0 * scale, cy - scale),
    Point::new(cx, cy + 2.0 * scale),
  ]
}

fn bw_triangle(points: &[Point], v: Cell) -> Option<BwTriangle> {
  let geo = GeometryTriangle::new(points[v[0]], points[v[1]], points[v[2]]);
  let (center, radius_sq) = geo.circumcircle()?;
  // store counter-clockwise
  let v = if geo.det_area() < 0.0 {
    [v[0], v[2], v[1]]
  } else {
    v
  };
  Some(BwTriangle {
    v,
    center,
    radius_sq,
  })
}

/// Bowyer-Watson Delaunay triangulation of a point set.
///
/// Returned triangles index into `points`, are counter-clockwise and
/// non-degenerate. Fails with fewer than 3 points or if all points are collinear.
pub fn triangulate(points: &[Point]) -> FemResult<Vec<Cell>> {
  let n = points.len();
  if n < 3 {
    return Err(FemError::InvalidInput(format!(
      "triangulation needs at least 3 points, got {n}"
    )));
  }

  let mut all_points: Vec<Point> = points.to_vec();
  all_points.extend_from_slice(&super_triangle(points));
  let si = [n, n + 1, n + 2];

  let mut triangles: Vec<BwTriangle> = bw_triangle(&all_points, si).into_iter().collect();

  for i in 0..n {
    let pt = all_points[i];

    // bad triangles: circumcircle strictly contains the new point
    let mut bad_indices: Vec<usize> = triangles
      .iter()
      .enumerate()
      .filter(|(_, tri)| (tri.center - pt).norm_squared() < tri.radius_sq * (1.0 - 1e-12))
      .map(|(itri, _)| itri)
      .collect();

    if bad_indices.is_empty() {
      tracing::warn!("point {i} not inserted, duplicate or outside super triangle");
      continue;
    }

    // cavity boundary: edges belonging to exactly one bad triangle
    let mut edge_count: HashMap<EdgeKey, (usize, [usize; 2])> = HashMap::new();
    for &bi in &bad_indices {
      let v = triangles[bi].v;
      for edge in [[v[0], v[1]], [v[1], v[2]], [v[2], v[0]]] {
        edge_count
          .entry(EdgeKey::new(edge[0], edge[1]))
          .and_modify(|(count, _)| *count += 1)
          .or_insert((1, edge));
      }
    }
    let boundary_edges: Vec<[usize; 2]> = edge_count
      .into_values()
      .filter(|(count, _)| *count == 1)
      .map(|(_, edge)| edge)
      .collect();

    bad_indices.sort_unstable();
    for &bi in bad_indices.iter().rev() {
      triangles.swap_remove(bi);
    }

    for [a, b] in boundary_edges {
      if let Some(tri) = bw_triangle(&all_points, [a, b, i]) {
        triangles.push(tri);
      }
    }
  }

  triangles.retain(|t| t.v.iter().all(|&vi| vi < n));

  let cells: Vec<Cell> = triangles
    .into_iter()
    .map(|t| t.v)
    .filter(|v| !GeometryTriangle::new(points[v[0]], points[v[1]], points[v[2]]).is_degenerate())
    .collect();

  if cells.is_empty() {
    return Err(FemError::InvalidInput(
      "points are collinear, no triangle could be formed".to_owned(),
    ));
  }
  Ok(cells)
}

/// Removes triangles whose centroids lie outside the polygon.
pub fn cull_exterior_cells(points: &[Point], cells: Vec<Cell>, polygon: &Polygon) -> Vec<Cell> {
  let ncells = cells.len();
  let culled: Vec<Cell> = cells
    .into_iter()
    .filter(|v| {
      let centroid = GeometryTriangle::new(points[v[0]], points[v[1]], points[v[2]]).centroid();
      polygon.contains(&centroid)
    })
    .collect();
  if culled.len() < ncells {
    tracing::debug!("culled {} exterior triangles", ncells - culled.len());
  }
  culled
}

#[cfg(test)]
mod test {
  use super::*;

  fn assert_delaunay(points: &[Point], cells: &[Cell]) {
    for cell in cells {
      let geo = GeometryTriangle::new(points[cell[0]], points[cell[1]], points[cell[2]]);
      assert!(geo.det_area() > 0.0, "triangle {cell:?} not counter-clockwise");
      let (center, r2) = geo.circumcircle().unwrap();
      for (ip, p) in points.iter().enumerate() {
        if cell.contains(&ip) {
          continue;
        }
        assert!(
          (p - center).norm_squared() >= r2 * (1.0 - 1e-9),
          "point {ip} inside circumcircle of {cell:?}"
        );
      }
    }
  }

  #[test]
  fn single_triangle() {
    let points = vec![
      Point::new(0.0, 0.0),
      Point::new(1.0, 0.0),
      Point::new(0.0, 1.0),
    ];
    let cells = triangulate(&points).unwrap();
    assert_eq!(cells.len(), 1);
    let mut sorted = cells[0];
    sorted.sort_unstable();
    assert_eq!(sorted, [0, 1, 2]);
  }

  #[test]
  fn square_with_center() {
    let points = vec![
      Point::new(0.0, 0.0),
      Point::new(1.0, 0.0),
      Point::new(1.0, 1.0),
      Point::new(0.0, 1.0),
      Point::new(0.5, 0.5),
    ];
    let cells = triangulate(&points).unwrap();
    assert_eq!(cells.len(), 4);
    assert!(cells.iter().all(|c| c.contains(&4)));
    let area: f64 = cells
      .iter()
      .map(|c| GeometryTriangle::new(points[c[0]], points[c[1]], points[c[2]]).area())
      .sum();
    approx::assert_relative_eq!(area, 1.0, epsilon = 1e-12);
  }

  #[test]
  fn empty_circle_property() {
    // deterministic pseudo scattered points
    let points: Vec<Point> = (0..40)
      .map(|i| {
        let t = i as f64;
        Point::new((t * 0.618_033_988_7).fract(), (t * 0.754_877_666_2 + 0.1).fract())
      })
      .collect();
    let cells = triangulate(&points).unwrap();
    assert_delaunay(&points, &cells);
  }

  #[test]
  fn collinear_fails() {
    let points = vec![
      Point::new(0.0, 0.0),
      Point::new(1.0, 1.0),
      Point::new(2.0, 2.0),
      Point::new(3.0, 3.0),
    ];
    assert!(triangulate(&points).is_err());
  }

  #[test]
  fn too_few_points() {
    assert!(triangulate(&[Point::new(0.0, 0.0), Point::new(1.0, 0.0)]).is_err());
  }
}
