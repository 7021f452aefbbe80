//! Linear solve backends behind one interface.
//!
//! Direct backends fail on singular systems. Iterative backends always return
//! their last iterate and report convergence as data.

pub mod accelerated;
pub mod direct;
pub mod krylov;

use crate::{
  assemble::{GalMat, GalVec},
  error::{FemError, FemResult},
  sparse::SparseMatrix,
};

use std::{
  fmt,
  str::FromStr,
  time::{Duration, Instant},
};

/// Stopping criteria of the iterative solvers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterativeConfig {
  /// Relative residual $norm(b - A x) / norm(b)$ to reach.
  pub tolerance: f64,
  pub max_iterations: usize,
}

impl Default for IterativeConfig {
  fn default() -> Self {
    Self {
      tolerance: 1e-10,
      max_iterations: 10_000,
    }
  }
}

pub const DEFAULT_GMRES_RESTART: usize = 20;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum SolveMethod {
  /// Dense LU with partial pivoting.
  #[default]
  DenseDirect,
  /// Sparse LU.
  SparseDirect,
  ConjugateGradient(IterativeConfig),
  BiCg(IterativeConfig),
  BiCgStab(IterativeConfig),
  Gmres {
    config: IterativeConfig,
    restart: usize,
  },
  Minres(IterativeConfig),
  Lsqr(IterativeConfig),
  /// Dense LU on a separate compute device, with explicit transfers.
  AcceleratedDense,
}

impl SolveMethod {
  pub fn name(&self) -> &'static str {
    match self {
      Self::DenseDirect => "dense",
      Self::SparseDirect => "sparse",
      Self::ConjugateGradient(_) => "cg",
      Self::BiCg(_) => "bicg",
      Self::BiCgStab(_) => "bicgstab",
      Self::Gmres { .. } => "gmres",
      Self::Minres(_) => "minres",
      Self::Lsqr(_) => "lsqr",
      Self::AcceleratedDense => "accelerated",
    }
  }

  pub fn is_iterative(&self) -> bool {
    self.iterative_config().is_some()
  }

  pub fn iterative_config(&self) -> Option<&IterativeConfig> {
    match self {
      Self::ConjugateGradient(config)
      | Self::BiCg(config)
      | Self::BiCgStab(config)
      | Self::Gmres { config, .. }
      | Self::Minres(config)
      | Self::Lsqr(config) => Some(config),
      Self::DenseDirect | Self::SparseDirect | Self::AcceleratedDense => None,
    }
  }

  /// Same method with other stopping criteria. No-op for direct methods.
  pub fn with_config(self, new: IterativeConfig) -> Self {
    match self {
      Self::ConjugateGradient(_) => Self::ConjugateGradient(new),
      Self::BiCg(_) => Self::BiCg(new),
      Self::BiCgStab(_) => Self::BiCgStab(new),
      Self::Gmres { restart, .. } => Self::Gmres {
        config: new,
        restart,
      },
      Self::Minres(_) => Self::Minres(new),
      Self::Lsqr(_) => Self::Lsqr(new),
      direct => direct,
    }
  }
}

impl fmt::Display for SolveMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for SolveMethod {
  type Err = FemError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let config = IterativeConfig::default();
    let method = match s.to_ascii_lowercase().as_str() {
      "solve" | "dense" => Self::DenseDirect,
      "spsolve" | "sparse" => Self::SparseDirect,
      "cg" => Self::ConjugateGradient(config),
      "bicg" => Self::BiCg(config),
      "bicgstab" => Self::BiCgStab(config),
      "gmres" => Self::Gmres {
        config,
        restart: DEFAULT_GMRES_RESTART,
      },
      "minres" => Self::Minres(config),
      "lsqr" => Self::Lsqr(config),
      "accelerated" | "gpu" => Self::AcceleratedDense,
      _ => {
        return Err(FemError::InvalidInput(format!(
          "unknown solver method `{s}`"
        )))
      }
    };
    Ok(method)
  }
}

/// Wall clock time spent in the phases of one solve.
///
/// Only the accelerated backend has transfer phases.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolveTimings {
  pub upload: Duration,
  pub compute: Duration,
  pub download: Duration,
}

impl SolveTimings {
  pub fn total(&self) -> Duration {
    self.upload + self.compute + self.download
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearSolution {
  pub x: GalVec,
  /// Always true for direct methods.
  pub converged: bool,
  /// True residual $norm(A x - b)$.
  pub residual_norm: f64,
  /// Zero for direct methods.
  pub iterations: usize,
  pub timings: SolveTimings,
}

pub fn residual_norm(galmat: &GalMat, x: &GalVec, galvec: &GalVec) -> f64 {
  (galmat * x - galvec).norm()
}

/// Solves $A x = b$ with the chosen backend.
pub fn solve(galmat: &GalMat, galvec: &GalVec, method: &SolveMethod) -> FemResult<LinearSolution> {
  let n = galmat.nrows();
  if galmat.ncols() != n {
    return Err(FemError::DimensionMismatch {
      expected: n,
      found: galmat.ncols(),
      context: "galerkin matrix must be square",
    });
  }
  if galvec.len() != n {
    return Err(FemError::DimensionMismatch {
      expected: n,
      found: galvec.len(),
      context: "galerkin vector vs. matrix",
    });
  }

  let (x, timings, stats) = match method {
    SolveMethod::DenseDirect => {
      let (x, timings) = timed(|| direct::dense_lu(galmat, galvec))?;
      (x, timings, None)
    }
    SolveMethod::SparseDirect => {
      let (x, timings) = timed(|| direct::sparse_lu(&SparseMatrix::from_dense(galmat), galvec))?;
      (x, timings, None)
    }
    SolveMethod::AcceleratedDense => {
      let (x, timings) = accelerated::solve_on_device(&accelerated::HostDevice, galmat, galvec)?;
      (x, timings, None)
    }
    SolveMethod::ConjugateGradient(config) => iterate(galmat, |op| krylov::cg(op, galvec, config))?,
    SolveMethod::BiCg(config) => iterate(galmat, |op| krylov::bicg(op, galvec, config))?,
    SolveMethod::BiCgStab(config) => iterate(galmat, |op| krylov::bicgstab(op, galvec, config))?,
    SolveMethod::Gmres { config, restart } => {
      iterate(galmat, |op| krylov::gmres(op, galvec, config, *restart))?
    }
    SolveMethod::Minres(config) => iterate(galmat, |op| krylov::minres(op, galvec, config))?,
    SolveMethod::Lsqr(config) => iterate(galmat, |op| krylov::lsqr(op, galvec, config))?,
  };

  let residual_norm = residual_norm(galmat, &x, galvec);
  let (converged, iterations) = stats.unwrap_or((true, 0));

  if converged {
    tracing::debug!(
      "{method} solve of {n} dofs: residual {residual_norm:e}, {iterations} iterations"
    );
  } else {
    tracing::warn!(
      "{method} did not converge after {iterations} iterations, residual norm {residual_norm:e}"
    );
  }

  Ok(LinearSolution {
    x,
    converged,
    residual_norm,
    iterations,
    timings,
  })
}

fn timed<T>(f: impl FnOnce() -> FemResult<T>) -> FemResult<(T, SolveTimings)> {
  let start = Instant::now();
  let out = f()?;
  let timings = SolveTimings {
    compute: start.elapsed(),
    ..Default::default()
  };
  Ok((out, timings))
}

type Iterated = (GalVec, SolveTimings, Option<(bool, usize)>);

/// Runs a Krylov method on the sparse form of `galmat`.
fn iterate<F>(galmat: &GalMat, method: F) -> FemResult<Iterated>
where
  F: FnOnce(&krylov::CsrOperator) -> krylov::KrylovOutcome,
{
  let op = krylov::CsrOperator::new(SparseMatrix::from_dense(galmat).to_nalgebra_csr()?);
  let (outcome, timings) = timed(|| Ok(method(&op)))?;
  Ok((
    outcome.x,
    timings,
    Some((outcome.converged, outcome.iterations)),
  ))
}
