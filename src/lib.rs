extern crate nalgebra as na;
extern crate nalgebra_sparse as nas;

pub mod assemble;
pub mod error;
pub mod fe;
pub mod geometry;
pub mod lse;
pub mod mesh;
pub mod pipeline;
pub mod problems;
pub mod solver;
pub mod space;
pub mod sparse;
pub mod util;

pub use error::{FemError, FemResult};
pub use fe::Material;
pub use lse::DirichletBc;
pub use mesh::TriangleMesh;
pub use pipeline::{solve_problem, FemSolution, SolveRecord};
pub use solver::{solve, IterativeConfig, LinearSolution, SolveMethod};

pub type VertexIdx = usize;
pub type CellIdx = usize;
pub type DofIdx = usize;
