//! Krylov subspace methods on sparse matrices.
//!
//! All methods start from $x_0 = 0$ and stop once the relative residual
//! $norm(r_k) / norm(b)$ drops below the configured tolerance. Running out of
//! iterations or a breakdown is not an error: the last iterate is returned
//! with `converged == false`.

use super::IterativeConfig;
use crate::assemble::GalVec;

/// Action of a matrix and its transpose on a vector.
pub trait LinearOperator {
  fn dim(&self) -> usize;
  fn apply(&self, x: &GalVec) -> GalVec;
  fn apply_transpose(&self, x: &GalVec) -> GalVec;
}

pub struct CsrOperator {
  a: nas::CsrMatrix<f64>,
  at: nas::CsrMatrix<f64>,
}

impl CsrOperator {
  pub fn new(a: nas::CsrMatrix<f64>) -> Self {
    let at = a.transpose();
    Self { a, at }
  }
}

fn spmv(a: &nas::CsrMatrix<f64>, x: &GalVec) -> GalVec {
  GalVec::from_iterator(
    a.nrows(),
    a.row_iter().map(|row| {
      row
        .col_indices()
        .iter()
        .zip(row.values())
        .map(|(&j, &v)| v * x[j])
        .sum::<f64>()
    }),
  )
}

impl LinearOperator for CsrOperator {
  fn dim(&self) -> usize {
    self.a.nrows()
  }
  fn apply(&self, x: &GalVec) -> GalVec {
    spmv(&self.a, x)
  }
  fn apply_transpose(&self, x: &GalVec) -> GalVec {
    spmv(&self.at, x)
  }
}

impl LinearOperator for na::DMatrix<f64> {
  fn dim(&self) -> usize {
    self.nrows()
  }
  fn apply(&self, x: &GalVec) -> GalVec {
    self * x
  }
  fn apply_transpose(&self, x: &GalVec) -> GalVec {
    self.tr_mul(x)
  }
}

#[derive(Debug, Clone)]
pub struct KrylovOutcome {
  pub x: GalVec,
  pub converged: bool,
  pub iterations: usize,
}

impl KrylovOutcome {
  fn new(x: GalVec, converged: bool, iterations: usize) -> Self {
    Self {
      x,
      converged,
      iterations,
    }
  }
}

/// Absolute residual target, `None` for a zero right-hand side.
fn target(b: &GalVec, config: &IterativeConfig) -> Option<f64> {
  let bnorm = b.norm();
  (bnorm > 0.0).then_some(config.tolerance * bnorm)
}

/// Conjugate gradients. Requires a symmetric positive definite matrix.
pub fn cg(op: &impl LinearOperator, b: &GalVec, config: &IterativeConfig) -> KrylovOutcome {
  let n = op.dim();
  let mut x = GalVec::zeros(n);
  let Some(tol) = target(b, config) else {
    return KrylovOutcome::new(x, true, 0);
  };

  let mut r = b.clone();
  let mut p = r.clone();
  let mut rr = r.norm_squared();

  for iter in 0..config.max_iterations {
    if rr.sqrt() <= tol {
      return KrylovOutcome::new(x, true, iter);
    }
    let ap = op.apply(&p);
    let pap = p.dot(&ap);
    if pap == 0.0 || !pap.is_finite() {
      tracing::debug!("cg breakdown at iteration {iter}");
      return KrylovOutcome::new(x, false, iter);
    }
    let alpha = rr / pap;
    x.axpy(alpha, &p, 1.0);
    r.axpy(-alpha, &ap, 1.0);

    let rr_new = r.norm_squared();
    p.axpy(1.0, &r, rr_new / rr);
    rr = rr_new;
  }
  let converged = rr.sqrt() <= tol;
  KrylovOutcome::new(x, converged, config.max_iterations)
}

/// Biconjugate gradients.
pub fn bicg(op: &impl LinearOperator, b: &GalVec, config: &IterativeConfig) -> KrylovOutcome {
  let n = op.dim();
  let mut x = GalVec::zeros(n);
  let Some(tol) = target(b, config) else {
    return KrylovOutcome::new(x, true, 0);
  };

  let mut r = b.clone();
  let mut rt = r.clone();
  let mut p = r.clone();
  let mut pt = rt.clone();
  let mut rho = rt.dot(&r);

  for iter in 0..config.max_iterations {
    if r.norm() <= tol {
      return KrylovOutcome::new(x, true, iter);
    }
    let q = op.apply(&p);
    let qt = op.apply_transpose(&pt);
    let ptq = pt.dot(&q);
    if ptq == 0.0 || rho == 0.0 {
      tracing::debug!("bicg breakdown at iteration {iter}");
      return KrylovOutcome::new(x, false, iter);
    }
    let alpha = rho / ptq;
    x.axpy(alpha, &p, 1.0);
    r.axpy(-alpha, &q, 1.0);
    rt.axpy(-alpha, &qt, 1.0);

    let rho_new = rt.dot(&r);
    let beta = rho_new / rho;
    p.axpy(1.0, &r, beta);
    pt.axpy(1.0, &rt, beta);
    rho = rho_new;
  }
  let converged = r.norm() <= tol;
  KrylovOutcome::new(x, converged, config.max_iterations)
}

/// Stabilized biconjugate gradients.
pub fn bicgstab(op: &impl LinearOperator, b: &GalVec, config: &IterativeConfig) -> KrylovOutcome {
  let n = op.dim();
  let mut x = GalVec::zeros(n);
  let Some(tol) = target(b, config) else {
    return KrylovOutcome::new(x, true, 0);
  };

  let mut r = b.clone();
  let r0 = r.clone();
  let mut p = GalVec::zeros(n);
  let mut v = GalVec::zeros(n);
  let (mut rho, mut alpha, mut omega) = (1.0, 1.0, 1.0);

  for iter in 0..config.max_iterations {
    if r.norm() <= tol {
      return KrylovOutcome::new(x, true, iter);
    }
    let rho_new = r0.dot(&r);
    if rho_new == 0.0 || omega == 0.0 {
      tracing::debug!("bicgstab breakdown at iteration {iter}");
      return KrylovOutcome::new(x, false, iter);
    }
    let beta = (rho_new / rho) * (alpha / omega);
    // p = r + beta (p - omega v)
    p.axpy(-omega, &v, 1.0);
    p.axpy(1.0, &r, beta);

    v = op.apply(&p);
    let r0v = r0.dot(&v);
    if r0v == 0.0 {
      tracing::debug!("bicgstab breakdown at iteration {iter}");
      return KrylovOutcome::new(x, false, iter);
    }
    alpha = rho_new / r0v;

    let mut s = r.clone();
    s.axpy(-alpha, &v, 1.0);
    if s.norm() <= tol {
      x.axpy(alpha, &p, 1.0);
      return KrylovOutcome::new(x, true, iter + 1);
    }

    let t = op.apply(&s);
    let tt = t.norm_squared();
    omega = if tt == 0.0 { 0.0 } else { t.dot(&s) / tt };

    x.axpy(alpha, &p, 1.0);
    x.axpy(omega, &s, 1.0);
    s.axpy(-omega, &t, 1.0);
    r = s;
    rho = rho_new;
  }
  let converged = r.norm() <= tol;
  KrylovOutcome::new(x, converged, config.max_iterations)
}

/// Givens rotation `(c, s)` zeroing `b` in $(a, b)^T$.
fn givens(a: f64, b: f64) -> (f64, f64) {
  let h = a.hypot(b);
  if h == 0.0 {
    (1.0, 0.0)
  } else {
    (a / h, b / h)
  }
}

/// Restarted generalized minimal residual method GMRES(m).
///
/// Every iteration counts one Arnoldi step.
pub fn gmres(
  op: &impl LinearOperator,
  b: &GalVec,
  config: &IterativeConfig,
  restart: usize,
) -> KrylovOutcome {
  let n = op.dim();
  let m = restart.clamp(1, n.max(1));
  let mut x = GalVec::zeros(n);
  let Some(tol) = target(b, config) else {
    return KrylovOutcome::new(x, true, 0);
  };

  let mut iterations = 0;
  loop {
    let r = b - op.apply(&x);
    let beta = r.norm();
    if beta <= tol {
      return KrylovOutcome::new(x, true, iterations);
    }
    if iterations >= config.max_iterations {
      return KrylovOutcome::new(x, false, iterations);
    }

    let mut basis = vec![r / beta];
    let mut h = na::DMatrix::<f64>::zeros(m + 1, m);
    let mut rotations: Vec<(f64, f64)> = Vec::with_capacity(m);
    let mut g = GalVec::zeros(m + 1);
    g[0] = beta;

    let mut k = 0;
    let mut stagnated = false;
    while k < m && iterations < config.max_iterations {
      let mut w = op.apply(&basis[k]);
      // modified Gram-Schmidt
      for (i, vi) in basis.iter().enumerate() {
        h[(i, k)] = w.dot(vi);
        w.axpy(-h[(i, k)], vi, 1.0);
      }
      let hnext = w.norm();
      h[(k + 1, k)] = hnext;

      for (i, &(c, s)) in rotations.iter().enumerate() {
        let (hi, hi1) = (h[(i, k)], h[(i + 1, k)]);
        h[(i, k)] = c * hi + s * hi1;
        h[(i + 1, k)] = -s * hi + c * hi1;
      }
      let (c, s) = givens(h[(k, k)], h[(k + 1, k)]);
      h[(k, k)] = c * h[(k, k)] + s * h[(k + 1, k)];
      h[(k + 1, k)] = 0.0;
      rotations.push((c, s));
      g[k + 1] = -s * g[k];
      g[k] *= c;

      iterations += 1;
      k += 1;

      if g[k].abs() <= tol || hnext == 0.0 {
        break;
      }
      basis.push(w / hnext);
    }

    // back substitution of the triangular least squares system
    let mut y = GalVec::zeros(k);
    for i in (0..k).rev() {
      let sum: f64 = (i + 1..k).map(|j| h[(i, j)] * y[j]).sum();
      if h[(i, i)] == 0.0 {
        stagnated = true;
        break;
      }
      y[i] = (g[i] - sum) / h[(i, i)];
    }
    if stagnated {
      tracing::debug!("gmres breakdown after {iterations} iterations");
      return KrylovOutcome::new(x, false, iterations);
    }
    for (yi, vi) in y.iter().zip(&basis) {
      x.axpy(*yi, vi, 1.0);
    }
  }
}

/// Minimum residual method for symmetric, possibly indefinite, matrices.
pub fn minres(op: &impl LinearOperator, b: &GalVec, config: &IterativeConfig) -> KrylovOutcome {
  let n = op.dim();
  let mut x = GalVec::zeros(n);
  let Some(tol) = target(b, config) else {
    return KrylovOutcome::new(x, true, 0);
  };

  let beta1 = b.norm();
  let mut r1 = b.clone();
  let mut r2 = b.clone();
  let mut y = b.clone();
  let mut w = GalVec::zeros(n);
  let mut w2 = GalVec::zeros(n);

  let mut oldb = 0.0;
  let mut beta = beta1;
  let mut dbar = 0.0;
  let mut epsln = 0.0;
  let mut phibar = beta1;
  let (mut cs, mut sn) = (-1.0, 0.0);

  for iter in 1..=config.max_iterations {
    // Lanczos step
    let v = &y / beta;
    y = op.apply(&v);
    if iter >= 2 {
      y.axpy(-beta / oldb, &r1, 1.0);
    }
    let alfa = v.dot(&y);
    y.axpy(-alfa / beta, &r2, 1.0);
    r1 = std::mem::replace(&mut r2, y.clone());
    oldb = beta;
    beta = r2.norm();

    // QR factorization of the tridiagonal Lanczos matrix
    let oldeps = epsln;
    let delta = cs * dbar + sn * alfa;
    let gbar = sn * dbar - cs * alfa;
    epsln = sn * beta;
    dbar = -cs * beta;
    let gamma = gbar.hypot(beta).max(f64::EPSILON);
    cs = gbar / gamma;
    sn = beta / gamma;
    let phi = cs * phibar;
    phibar *= sn;

    // w = (v - oldeps w1 - delta w2) / gamma
    let w1 = std::mem::replace(&mut w2, w.clone());
    w = v;
    w.axpy(-oldeps, &w1, 1.0);
    w.axpy(-delta, &w2, 1.0);
    w /= gamma;
    x.axpy(phi, &w, 1.0);

    if phibar.abs() <= tol {
      return KrylovOutcome::new(x, true, iter);
    }
    if beta == 0.0 {
      tracing::debug!("minres lanczos breakdown at iteration {iter}");
      return KrylovOutcome::new(x, false, iter);
    }
  }
  KrylovOutcome::new(x, false, config.max_iterations)
}

/// Least squares QR, minimizing $norm(A x - b)$ via the bidiagonalization of `A`.
pub fn lsqr(op: &impl LinearOperator, b: &GalVec, config: &IterativeConfig) -> KrylovOutcome {
  let n = op.dim();
  let mut x = GalVec::zeros(n);
  let Some(tol) = target(b, config) else {
    return KrylovOutcome::new(x, true, 0);
  };

  let mut u = b.clone();
  let mut beta = u.norm();
  u /= beta;
  let mut v = op.apply_transpose(&u);
  let mut alpha = v.norm();
  if alpha == 0.0 {
    // b is orthogonal to the range of A, x = 0 is the least squares solution
    return KrylovOutcome::new(x, false, 0);
  }
  v /= alpha;

  let mut w = v.clone();
  let mut phibar = beta;
  let mut rhobar = alpha;

  for iter in 1..=config.max_iterations {
    // bidiagonalization
    u = op.apply(&v) - &u * alpha;
    beta = u.norm();
    if beta > 0.0 {
      u /= beta;
    }
    v = op.apply_transpose(&u) - &v * beta;
    alpha = v.norm();
    if alpha > 0.0 {
      v /= alpha;
    }

    // orthogonal transformation
    let rho = rhobar.hypot(beta);
    let c = rhobar / rho;
    let s = beta / rho;
    let theta = s * alpha;
    rhobar = -c * alpha;
    let phi = c * phibar;
    phibar *= s;

    x.axpy(phi / rho, &w, 1.0);
    w = &v - &w * (theta / rho);

    if phibar.abs() <= tol {
      return KrylovOutcome::new(x, true, iter);
    }
    if alpha == 0.0 || beta == 0.0 {
      tracing::debug!("lsqr bidiagonalization terminated at iteration {iter}");
      return KrylovOutcome::new(x, phibar.abs() <= tol, iter);
    }
  }
  KrylovOutcome::new(x, false, config.max_iterations)
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::sparse::SparseMatrix;

  fn laplace_1d(n: usize) -> na::DMatrix<f64> {
    na::DMatrix::from_fn(n, n, |i, j| match i.abs_diff(j) {
      0 => 2.0,
      1 => -1.0,
      _ => 0.0,
    })
  }

  /// Diagonally dominant non-symmetric tridiagonal matrix.
  fn convection_1d(n: usize) -> na::DMatrix<f64> {
    na::DMatrix::from_fn(n, n, |i, j| {
      if i == j {
        3.0
      } else if j + 1 == i {
        -1.5
      } else if i + 1 == j {
        -0.5
      } else {
        0.0
      }
    })
  }

  fn rhs(n: usize) -> GalVec {
    GalVec::from_fn(n, |i, _| (i as f64 * 0.7).sin() + 1.0)
  }

  fn assert_solves(a: &na::DMatrix<f64>, outcome: &KrylovOutcome, b: &GalVec, tol: f64) {
    assert!(outcome.converged, "not converged after {}", outcome.iterations);
    let res = (a * &outcome.x - b).norm() / b.norm();
    assert!(res < tol, "relative residual {res:e}");
  }

  #[test]
  fn symmetric_methods() {
    let n = 30;
    let a = laplace_1d(n);
    let b = rhs(n);
    let config = IterativeConfig::default();
    let op = CsrOperator::new(SparseMatrix::from_dense(&a).to_nalgebra_csr().unwrap());

    assert_solves(&a, &cg(&op, &b, &config), &b, 1e-8);
    assert_solves(&a, &minres(&op, &b, &config), &b, 1e-8);
  }

  #[test]
  fn nonsymmetric_methods() {
    let n = 30;
    let a = convection_1d(n);
    let b = rhs(n);
    let config = IterativeConfig::default();
    let op = CsrOperator::new(SparseMatrix::from_dense(&a).to_nalgebra_csr().unwrap());

    assert_solves(&a, &bicg(&op, &b, &config), &b, 1e-8);
    assert_solves(&a, &bicgstab(&op, &b, &config), &b, 1e-8);
    assert_solves(&a, &gmres(&op, &b, &config, 10), &b, 1e-8);
    assert_solves(&a, &gmres(&op, &b, &config, 50), &b, 1e-8);
    assert_solves(&a, &lsqr(&op, &b, &config), &b, 1e-8);
  }

  #[test]
  fn dense_operator_matches_csr() {
    let a = convection_1d(8);
    let b = rhs(8);
    let op = CsrOperator::new(SparseMatrix::from_dense(&a).to_nalgebra_csr().unwrap());
    approx::assert_relative_eq!(
      op.apply(&b),
      LinearOperator::apply(&a, &b),
      epsilon = 1e-14
    );
    approx::assert_relative_eq!(
      op.apply_transpose(&b),
      LinearOperator::apply_transpose(&a, &b),
      epsilon = 1e-14
    );
  }

  #[test]
  fn zero_rhs_gives_zero() {
    let a = laplace_1d(5);
    let b = GalVec::zeros(5);
    let outcome = gmres(&a, &b, &IterativeConfig::default(), 3);
    assert!(outcome.converged);
    assert_eq!(outcome.iterations, 0);
    assert_eq!(outcome.x, GalVec::zeros(5));
  }

  #[test]
  fn iteration_budget_is_reported() {
    let n = 50;
    let a = laplace_1d(n);
    let b = rhs(n);
    let config = IterativeConfig {
      tolerance: 1e-12,
      max_iterations: 3,
    };
    let outcome = cg(&a, &b, &config);
    assert!(!outcome.converged);
    assert_eq!(outcome.iterations, 3);
    assert!(outcome.x.iter().all(|v| v.is_finite()));
  }
}
