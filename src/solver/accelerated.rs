//! Dense direct solves on a separate compute device.
//!
//! A device owns copies of the system. Uploading, factorizing and downloading
//! are separate steps and are timed independently, since the transfers often
//! dominate for small and medium systems. Device buffers are released as soon
//! as the solution has been downloaded.

use super::{direct::check_solution, SolveTimings};
use crate::{
  assemble::{GalMat, GalVec},
  error::{FemError, FemResult},
};

use faer::solvers::SpSolver;
use std::time::Instant;

/// A compute backend holding its own copies of matrices and vectors.
pub trait DenseDevice {
  type Matrix;
  type Vector;

  fn name(&self) -> &'static str;
  fn upload_matrix(&self, m: &GalMat) -> Self::Matrix;
  fn upload_vector(&self, v: &GalVec) -> Self::Vector;
  /// LU factorization with partial pivoting followed by the triangular solves.
  fn lu_solve(&self, a: &Self::Matrix, b: &Self::Vector) -> Self::Vector;
  fn download(&self, v: &Self::Vector) -> GalVec;
}

/// Device emulated by faer's dense kernels on the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostDevice;

impl DenseDevice for HostDevice {
  type Matrix = faer::Mat<f64>;
  type Vector = faer::Col<f64>;

  fn name(&self) -> &'static str {
    "faer-host"
  }

  fn upload_matrix(&self, m: &GalMat) -> Self::Matrix {
    faer::Mat::from_fn(m.nrows(), m.ncols(), |i, j| m[(i, j)])
  }

  fn upload_vector(&self, v: &GalVec) -> Self::Vector {
    faer::Col::from_fn(v.len(), |i| v[i])
  }

  fn lu_solve(&self, a: &Self::Matrix, b: &Self::Vector) -> Self::Vector {
    a.partial_piv_lu().solve(b.as_ref())
  }

  fn download(&self, v: &Self::Vector) -> GalVec {
    GalVec::from_iterator(v.nrows(), (0..v.nrows()).map(|i| v.read(i)))
  }
}

/// Solves $A x = b$ on `device`, timing transfers and compute separately.
pub fn solve_on_device<D: DenseDevice>(
  device: &D,
  galmat: &GalMat,
  galvec: &GalVec,
) -> FemResult<(GalVec, SolveTimings)> {
  let n = galmat.nrows();
  if n == 0 {
    return Ok((GalVec::zeros(0), SolveTimings::default()));
  }

  let start = Instant::now();
  let a_dev = device.upload_matrix(galmat);
  let b_dev = device.upload_vector(galvec);
  let upload = start.elapsed();
  tracing::trace!("uploaded {n}x{n} system to {}", device.name());

  let start = Instant::now();
  let x_dev = device.lu_solve(&a_dev, &b_dev);
  let compute = start.elapsed();

  let start = Instant::now();
  let x = device.download(&x_dev);
  let download = start.elapsed();

  drop(x_dev);
  drop(b_dev);
  drop(a_dev);
  tracing::trace!("released device buffers on {}", device.name());

  check_solution(galmat.norm(), &x, galvec).map_err(|e| match e {
    FemError::SingularMatrix(msg) => FemError::SingularMatrix(format!("{}: {msg}", device.name())),
    other => other,
  })?;

  let timings = SolveTimings {
    upload,
    compute,
    download,
  };
  tracing::debug!(
    "device solve: upload {:?}, compute {:?}, download {:?}",
    timings.upload,
    timings.compute,
    timings.download
  );
  Ok((x, timings))
}
