use crate::CellIdx;

pub type FemResult<T> = std::result::Result<T, FemError>;

/// Errors that abort a pipeline run.
///
/// Solver non-convergence is not an error, it is reported through
/// [`crate::solver::LinearSolution::converged`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FemError {
  /// Malformed mesh request or boundary condition set.
  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// Sizes of matrix, vector or mesh do not agree.
  #[error("dimension mismatch: expected {expected}, found {found} ({context})")]
  DimensionMismatch {
    expected: usize,
    found: usize,
    context: &'static str,
  },

  /// Zero or near-zero element area.
  #[error("degenerate triangle {cell:?} with area {area:e}")]
  DegenerateGeometry { cell: Option<CellIdx>, area: f64 },

  /// Direct solve on a non-invertible system.
  #[error("singular matrix: {0}")]
  SingularMatrix(String),
}

impl FemError {
  pub(crate) fn with_cell(self, icell: CellIdx) -> Self {
    match self {
      Self::DegenerateGeometry { area, .. } => Self::DegenerateGeometry {
        cell: Some(icell),
        area,
      },
      other => other,
    }
  }
}
