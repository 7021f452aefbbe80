use crate::error::{FemError, FemResult};

pub type Point = na::Point2<f64>;

/// Relative area below which a triangle counts as degenerate.
///
/// Compared against the squared length of the longest edge.
pub const DEGENERACY_TOL: f64 = 1e-12;

/// The three vertex positions of one triangle, in mesh order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryTriangle {
  vertices: [Point; 3],
}

impl GeometryTriangle {
  pub fn new(v0: Point, v1: Point, v2: Point) -> Self {
    Self {
      vertices: [v0, v1, v2],
    }
  }

  /// The reference triangle `(0,0), (1,0), (0,1)`.
  pub fn new_ref() -> Self {
    Self::new(
      Point::new(0.0, 0.0),
      Point::new(1.0, 0.0),
      Point::new(0.0, 1.0),
    )
  }

  pub fn vertices(&self) -> &[Point; 3] {
    &self.vertices
  }
  pub fn vertex(&self, i: usize) -> Point {
    self.vertices[i]
  }

  /// Signed area. Positive for counter-clockwise vertex order.
  ///
  /// Half the determinant of the homogeneous coordinate matrix
  /// $mat(1, x_0, y_0; 1, x_1, y_1; 1, x_2, y_2)$.
  pub fn det_area(&self) -> f64 {
    let [v0, v1, v2] = self.vertices;
    0.5 * (v0.x * (v1.y - v2.y) + v1.x * (v2.y - v0.y) + v2.x * (v0.y - v1.y))
  }

  /// The (unsigned) area.
  pub fn area(&self) -> f64 {
    self.det_area().abs()
  }

  pub fn centroid(&self) -> Point {
    let [v0, v1, v2] = self.vertices;
    Point::from((v0.coords + v1.coords + v2.coords) / 3.0)
  }

  /// Length of the longest edge.
  pub fn diameter(&self) -> f64 {
    let [v0, v1, v2] = self.vertices;
    [(v0, v1), (v1, v2), (v2, v0)]
      .iter()
      .map(|(a, b)| (b - a).norm())
      .fold(0.0, f64::max)
  }

  pub fn is_degenerate(&self) -> bool {
    let finite = self
      .vertices
      .iter()
      .all(|v| v.x.is_finite() && v.y.is_finite());
    let area = self.area();
    let diam = self.diameter();
    !finite || area == 0.0 || area <= DEGENERACY_TOL * diam * diam
  }

  /// Returns the signed area, failing for degenerate triangles.
  pub fn checked_det_area(&self) -> FemResult<f64> {
    if self.is_degenerate() {
      return Err(FemError::DegenerateGeometry {
        cell: None,
        area: self.det_area(),
      });
    }
    Ok(self.det_area())
  }

  /// Coordinate differences $beta_i = y_j - y_k$ and $gamma_i = x_k - x_j$
  /// for the cyclic permutations $(i,j,k)$.
  ///
  /// These are `2A` times the gradients of the barycentric coordinate functions.
  pub fn difbarys_scaled(&self) -> ([f64; 3], [f64; 3]) {
    let [v0, v1, v2] = self.vertices;
    let beta = [v1.y - v2.y, v2.y - v0.y, v0.y - v1.y];
    let gamma = [v2.x - v1.x, v0.x - v2.x, v1.x - v0.x];
    (beta, gamma)
  }

  /// Circumcenter and squared circumradius.
  ///
  /// `None` for collinear vertices.
  pub fn circumcircle(&self) -> Option<(Point, f64)> {
    let [a, b, c] = self.vertices;
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d == 0.0 || !d.is_finite() {
      return None;
    }
    let a2 = a.coords.norm_squared();
    let b2 = b.coords.norm_squared();
    let c2 = c.coords.norm_squared();
    let ux = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
    let uy = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;
    let center = Point::new(ux, uy);
    Some((center, (a - center).norm_squared()))
  }
}
