use super::cartesian::Rect;
use crate::{
  error::{FemError, FemResult},
  geometry::Point,
};

/// Simple polygon given by its vertices in order (either orientation).
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
  vertices: Vec<Point>,
}

impl Polygon {
  pub fn new(vertices: Vec<Point>) -> FemResult<Self> {
    if vertices.len() < 3 {
      return Err(FemError::InvalidInput(format!(
        "polygon needs at least 3 vertices, got {}",
        vertices.len()
      )));
    }
    if vertices.iter().any(|v| !v.x.is_finite() || !v.y.is_finite()) {
      return Err(FemError::InvalidInput(
        "polygon has non-finite vertex".to_owned(),
      ));
    }
    let polygon = Self { vertices };
    if polygon.signed_area() == 0.0 {
      return Err(FemError::InvalidInput(
        "polygon encloses no area".to_owned(),
      ));
    }
    Ok(polygon)
  }

  pub fn from_coords(coords: &[[f64; 2]]) -> FemResult<Self> {
    Self::new(coords.iter().map(|&[x, y]| Point::new(x, y)).collect())
  }

  pub fn vertices(&self) -> &[Point] {
    &self.vertices
  }

  pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
    let n = self.vertices.len();
    (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
  }

  /// Shoelace formula. Positive for counter-clockwise vertex order.
  pub fn signed_area(&self) -> f64 {
    0.5
      * self
        .edges()
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum::<f64>()
  }

  pub fn bounding_box(&self) -> FemResult<Rect> {
    let (mut min, mut max) = (self.vertices[0], self.vertices[0]);
    for v in &self.vertices {
      min.x = min.x.min(v.x);
      min.y = min.y.min(v.y);
      max.x = max.x.max(v.x);
      max.y = max.y.max(v.y);
    }
    Rect::new_min_max(min, max)
  }

  /// Even-odd ray casting test. Points on the boundary may land on either side.
  pub fn contains(&self, p: &Point) -> bool {
    let mut inside = false;
    for (a, b) in self.edges() {
      if (a.y > p.y) != (b.y > p.y) {
        let x_cross = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
        if p.x < x_cross {
          inside = !inside;
        }
      }
    }
    inside
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn l_shape() -> Polygon {
    Polygon::from_coords(&[
      [0.0, 0.0],
      [2.0, 0.0],
      [2.0, 1.0],
      [1.0, 1.0],
      [1.0, 2.0],
      [0.0, 2.0],
    ])
    .unwrap()
  }

  #[test]
  fn l_shape_membership() {
    let poly = l_shape();
    assert!(poly.contains(&Point::new(0.5, 0.5)));
    assert!(poly.contains(&Point::new(1.5, 0.5)));
    assert!(poly.contains(&Point::new(0.5, 1.5)));
    assert!(!poly.contains(&Point::new(1.5, 1.5)));
    assert!(!poly.contains(&Point::new(-0.5, 0.5)));
  }

  #[test]
  fn l_shape_area_and_bbox() {
    let poly = l_shape();
    assert_eq!(poly.signed_area(), 3.0);
    let bbox = poly.bounding_box().unwrap();
    assert_eq!(*bbox.min(), Point::new(0.0, 0.0));
    assert_eq!(*bbox.max(), Point::new(2.0, 2.0));
  }

  #[test]
  fn rejects_degenerate() {
    assert!(Polygon::from_coords(&[[0.0, 0.0], [1.0, 0.0]]).is_err());
    assert!(Polygon::from_coords(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]).is_err());
  }
}
