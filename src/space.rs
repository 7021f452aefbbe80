use crate::{mesh::TriangleMesh, CellIdx, DofIdx, VertexIdx};

/// Global DOF of component `icomp` of node `inode`.
///
/// DOFs are interleaved per node: $2 i + c$ for vector problems.
pub fn dof_index(inode: VertexIdx, icomp: usize, ndofs_per_node: usize) -> DofIdx {
  ndofs_per_node * inode + icomp
}

/// Maps the local DOFs of every cell to global DOFs.
pub struct DofHandler {
  ndofs_per_node: usize,
  ndofs: usize,
  local2global_idx: Vec<Vec<DofIdx>>,
}

impl DofHandler {
  pub fn new(mesh: &TriangleMesh, ndofs_per_node: usize) -> Self {
    let local2global_idx = mesh
      .cells()
      .iter()
      .map(|cell| {
        cell
          .iter()
          .flat_map(|&inode| (0..ndofs_per_node).map(move |c| dof_index(inode, c, ndofs_per_node)))
          .collect()
      })
      .collect();
    Self {
      ndofs_per_node,
      ndofs: ndofs_per_node * mesh.nnodes(),
      local2global_idx,
    }
  }

  pub fn ndofs(&self) -> usize {
    self.ndofs
  }
  pub fn ndofs_per_node(&self) -> usize {
    self.ndofs_per_node
  }

  pub fn local2global(&self, icell: CellIdx) -> &[DofIdx] {
    &self.local2global_idx[icell]
  }
}
