//! A mesh is an ordered list of node positions together with an ordered list
//! of triangles referencing them.
//!
//! Node indices are global node ids. The mesh is immutable once built; the
//! generators in the submodules construct new meshes rather than mutating.

pub mod adaptive;
pub mod cartesian;
pub mod delaunay;
pub mod polygon;
pub mod random;

use crate::{
  error::{FemError, FemResult},
  geometry::{GeometryTriangle, Point},
  CellIdx, VertexIdx,
};

pub use cartesian::regular_grid;
pub use polygon::Polygon;
pub use random::{random_triangulation, Domain, SamplingConfig};

/// Triangle as a triple of node indices.
pub type Cell = [VertexIdx; 3];

#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
  nodes: Vec<Point>,
  cells: Vec<Cell>,
}

impl TriangleMesh {
  /// Builds a mesh from caller supplied nodes and triangles.
  ///
  /// Fails if any triangle references a node outside of `nodes` or
  /// repeats a node.
  pub fn new(nodes: Vec<Point>, cells: Vec<Cell>) -> FemResult<Self> {
    let nnodes = nodes.len();
    for (icell, cell) in cells.iter().enumerate() {
      if let Some(&ivertex) = cell.iter().find(|&&v| v >= nnodes) {
        return Err(FemError::InvalidInput(format!(
          "triangle {icell} references node {ivertex}, but mesh has {nnodes} nodes"
        )));
      }
      if cell[0] == cell[1] || cell[1] == cell[2] || cell[0] == cell[2] {
        return Err(FemError::InvalidInput(format!(
          "triangle {icell} repeats a node: {cell:?}"
        )));
      }
    }
    Ok(Self { nodes, cells })
  }

  /// Convenience constructor from raw coordinate pairs.
  pub fn from_coords(coords: &[[f64; 2]], cells: Vec<Cell>) -> FemResult<Self> {
    let nodes = coords.iter().map(|&[x, y]| Point::new(x, y)).collect();
    Self::new(nodes, cells)
  }

  /// Constructor for generators, which guarantee the index invariant.
  pub(crate) fn new_unchecked(nodes: Vec<Point>, cells: Vec<Cell>) -> Self {
    debug_assert!(cells.iter().flatten().all(|&v| v < nodes.len()));
    Self { nodes, cells }
  }

  pub fn nodes(&self) -> &[Point] {
    &self.nodes
  }
  pub fn cells(&self) -> &[Cell] {
    &self.cells
  }
  pub fn nnodes(&self) -> usize {
    self.nodes.len()
  }
  pub fn ncells(&self) -> usize {
    self.cells.len()
  }

  pub fn into_parts(self) -> (Vec<Point>, Vec<Cell>) {
    (self.nodes, self.cells)
  }

  pub fn cell_geometry(&self, icell: CellIdx) -> GeometryTriangle {
    let [a, b, c] = self.cells[icell];
    GeometryTriangle::new(self.nodes[a], self.nodes[b], self.nodes[c])
  }

  pub fn cell_geometries(&self) -> impl Iterator<Item = GeometryTriangle> + '_ {
    (0..self.ncells()).map(|icell| self.cell_geometry(icell))
  }

  pub fn signed_area(&self, icell: CellIdx) -> f64 {
    self.cell_geometry(icell).det_area()
  }

  /// The unsigned area of every element, in element order.
  pub fn element_areas(&self) -> Vec<f64> {
    self.cell_geometries().map(|g| g.area()).collect()
  }

  pub fn total_area(&self) -> f64 {
    self.element_areas().iter().sum()
  }

  /// Reports the first degenerate triangle, if any.
  pub fn validate_geometry(&self) -> FemResult<()> {
    for (icell, geo) in self.cell_geometries().enumerate() {
      geo.checked_det_area().map_err(|e| e.with_cell(icell))?;
    }
    Ok(())
  }

  /// Nodes that are not referenced by any triangle.
  ///
  /// Such nodes produce empty rows in the system matrix.
  pub fn unreferenced_nodes(&self) -> Vec<VertexIdx> {
    let mut flags = vec![false; self.nnodes()];
    self.cells.iter().flatten().for_each(|&v| flags[v] = true);
    crate::util::flags_to_indicies(&flags.iter().map(|f| !f).collect::<Vec<_>>())
  }
}
