use super::{Cell, TriangleMesh};
use crate::{
  error::{FemError, FemResult},
  geometry::Point,
  VertexIdx,
};

/// converts linear index to cartesian index
///
/// converts linear index in 0..nx*ny to cartesian index (ix, iy),
/// with x varying fastest
pub fn linear_index2cartesian_index(lin_idx: usize, nx: usize) -> [usize; 2] {
  [lin_idx % nx, lin_idx / nx]
}

/// converts cartesian index to linear index
pub fn cartesian_index2linear_index([ix, iy]: [usize; 2], nx: usize) -> usize {
  iy * nx + ix
}

/// Axis aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
  min: Point,
  max: Point,
}

impl Rect {
  pub fn new_min_max(min: Point, max: Point) -> FemResult<Self> {
    let valid = min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite();
    if !valid || min.x >= max.x || min.y >= max.y {
      return Err(FemError::InvalidInput(format!(
        "empty rectangle [{}, {}] x [{}, {}]",
        min.x, max.x, min.y, max.y
      )));
    }
    Ok(Self { min, max })
  }
  pub fn new_unit() -> Self {
    Self {
      min: Point::new(0.0, 0.0),
      max: Point::new(1.0, 1.0),
    }
  }

  pub fn min(&self) -> &Point {
    &self.min
  }
  pub fn max(&self) -> &Point {
    &self.max
  }
  pub fn side_lengths(&self) -> na::Vector2<f64> {
    self.max - self.min
  }
  pub fn contains(&self, p: &Point) -> bool {
    p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
  }
}

/// Structured lattice of `nx * ny` nodes over a rectangle.
pub struct CartesianMesh {
  rect: Rect,
  nx: usize,
  ny: usize,
}

impl CartesianMesh {
  pub fn new(rect: Rect, nx: usize, ny: usize) -> FemResult<Self> {
    if nx < 2 || ny < 2 {
      return Err(FemError::InvalidInput(format!(
        "regular grid needs at least 2 nodes per axis, got nx={nx}, ny={ny}"
      )));
    }
    Ok(Self { rect, nx, ny })
  }

  pub fn rect(&self) -> &Rect {
    &self.rect
  }
  pub fn nnodes(&self) -> usize {
    self.nx * self.ny
  }
  pub fn ncells(&self) -> usize {
    2 * (self.nx - 1) * (self.ny - 1)
  }

  pub fn node_pos(&self, inode: VertexIdx) -> Point {
    let [ix, iy] = linear_index2cartesian_index(inode, self.nx);
    let side = self.rect.side_lengths();
    let min = self.rect.min();
    Point::new(
      min.x + side.x * ix as f64 / (self.nx - 1) as f64,
      min.y + side.y * iy as f64 / (self.ny - 1) as f64,
    )
  }

  pub fn is_node_on_boundary(&self, inode: VertexIdx) -> bool {
    let [ix, iy] = linear_index2cartesian_index(inode, self.nx);
    ix == 0 || iy == 0 || ix == self.nx - 1 || iy == self.ny - 1
  }

  pub fn boundary_nodes(&self) -> Vec<VertexIdx> {
    (0..self.nnodes())
      .filter(|&inode| self.is_node_on_boundary(inode))
      .collect()
  }

  /// Splits every grid cell along the diagonal from its lower-left to its
  /// upper-right node. Both triangles are counter-clockwise.
  pub fn compute_cells(&self) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(self.ncells());
    for iy in 0..self.ny - 1 {
      for ix in 0..self.nx - 1 {
        let n1 = cartesian_index2linear_index([ix, iy], self.nx);
        let n2 = n1 + 1;
        let n3 = n1 + self.nx;
        let n4 = n3 + 1;
        cells.push([n1, n2, n4]);
        cells.push([n1, n4, n3]);
      }
    }
    cells
  }

  pub fn to_mesh(&self) -> TriangleMesh {
    let nodes = (0..self.nnodes()).map(|i| self.node_pos(i)).collect();
    TriangleMesh::new_unchecked(nodes, self.compute_cells())
  }
}

/// Regular triangulation of `[xmin, xmax] x [ymin, ymax]` with `nx * ny` nodes.
pub fn regular_grid(
  xmin: f64,
  xmax: f64,
  ymin: f64,
  ymax: f64,
  nx: usize,
  ny: usize,
) -> FemResult<TriangleMesh> {
  let rect = Rect::new_min_max(Point::new(xmin, ymin), Point::new(xmax, ymax))?;
  let mesh = CartesianMesh::new(rect, nx, ny)?.to_mesh();
  tracing::debug!(
    "regular grid: {} nodes, {} triangles",
    mesh.nnodes(),
    mesh.ncells()
  );
  Ok(mesh)
}
