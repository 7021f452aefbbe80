//! Element matrices of linear (P1) triangles.
//!
//! Every kernel is a pure function of the vertex coordinates and one material
//! parameter. Local DOFs are ordered node-major: for vector problems local DOF
//! `2*i + c` is component `c` of local vertex `i`.

use crate::{
  error::{FemError, FemResult},
  geometry::GeometryTriangle,
};

pub type ElMat = na::DMatrix<f64>;

/// Provides the element matrix of one triangle.
pub trait ElmatProvider: Sync {
  /// Number of DOFs attached to every node.
  fn ndofs_per_node(&self) -> usize;

  /// Local matrix of size `3 * ndofs_per_node`.
  fn eval(&self, geo: &GeometryTriangle) -> FemResult<ElMat>;
}

/// Physical parameters, one variant per problem class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
  /// Steady heat conduction with thermal conductivity `k`.
  Conductivity { k: f64 },
  /// Lumped mass with density `rho`.
  Density { rho: f64 },
  /// Plane stress elasticity.
  Elastic {
    youngs_modulus: f64,
    poisson_ratio: f64,
  },
}

impl Material {
  pub fn ndofs_per_node(&self) -> usize {
    match self {
      Self::Conductivity { .. } => 1,
      Self::Density { .. } | Self::Elastic { .. } => 2,
    }
  }

  pub fn name(&self) -> &'static str {
    match self {
      Self::Conductivity { .. } => "conductivity",
      Self::Density { .. } => "mass",
      Self::Elastic { .. } => "stiffness",
    }
  }

  pub fn validate(&self) -> FemResult<()> {
    let valid = match *self {
      Self::Conductivity { k } => k.is_finite(),
      Self::Density { rho } => rho.is_finite(),
      Self::Elastic {
        youngs_modulus,
        poisson_ratio,
      } => youngs_modulus.is_finite() && poisson_ratio.is_finite() && poisson_ratio.abs() != 1.0,
    };
    if valid {
      Ok(())
    } else {
      Err(FemError::InvalidInput(format!(
        "invalid material parameters {self:?}"
      )))
    }
  }
}

impl ElmatProvider for Material {
  fn ndofs_per_node(&self) -> usize {
    Material::ndofs_per_node(self)
  }

  fn eval(&self, geo: &GeometryTriangle) -> FemResult<ElMat> {
    match *self {
      Self::Conductivity { k } => conductivity_elmat(k, geo),
      Self::Density { rho } => mass_elmat_vector(rho, geo),
      Self::Elastic {
        youngs_modulus,
        poisson_ratio,
      } => stiffness_elmat(youngs_modulus, poisson_ratio, geo),
    }
  }
}

/// 3x3 conductivity matrix $k A B^T B$ with the unsigned area `A`.
///
/// `B` (2x3) holds the barycentric gradients.
pub fn conductivity_elmat(k: f64, geo: &GeometryTriangle) -> FemResult<ElMat> {
  geo.checked_det_area()?;
  let area = geo.area();
  let (beta, gamma) = geo.difbarys_scaled();

  #[rustfmt::skip]
  let b = na::Matrix2x3::new(
    beta[0],  beta[1],  beta[2],
    gamma[0], gamma[1], gamma[2],
  ) / (2.0 * area);

  let elmat = (k * area) * b.transpose() * b;
  Ok(ElMat::from_column_slice(3, 3, elmat.as_slice()))
}

/// 3x3 consistent mass matrix $rho A / 12 mat(2,1,1; 1,2,1; 1,1,2)$.
pub fn mass_elmat(rho: f64, geo: &GeometryTriangle) -> FemResult<ElMat> {
  geo.checked_det_area()?;
  let area = geo.area();
  let mut elmat = ElMat::from_element(3, 3, 1.0);
  elmat.fill_diagonal(2.0);
  Ok(elmat * (rho * area / 12.0))
}

/// 6x6 mass matrix acting on both displacement components independently.
pub fn mass_elmat_vector(rho: f64, geo: &GeometryTriangle) -> FemResult<ElMat> {
  let scalar = mass_elmat(rho, geo)?;
  Ok(scalar.kronecker(&ElMat::identity(2, 2)))
}

/// Plane stress constitutive matrix.
pub fn plane_stress_matrix(youngs_modulus: f64, poisson_ratio: f64) -> na::Matrix3<f64> {
  let nu = poisson_ratio;
  #[rustfmt::skip]
  let d = na::Matrix3::new(
    1.0, nu,  0.0,
    nu,  1.0, 0.0,
    0.0, 0.0, (1.0 - nu) / 2.0,
  );
  d * (youngs_modulus / (1.0 - nu * nu))
}

/// 3x6 strain-displacement matrix, normalized by the signed area.
pub fn strain_displacement_matrix(geo: &GeometryTriangle) -> FemResult<na::SMatrix<f64, 3, 6>> {
  let det_area = geo.checked_det_area()?;
  let (beta, gamma) = geo.difbarys_scaled();

  #[rustfmt::skip]
  let b = na::SMatrix::<f64, 3, 6>::from_row_slice(&[
    beta[0],  0.0,      beta[1],  0.0,      beta[2],  0.0,
    0.0,      gamma[0], 0.0,      gamma[1], 0.0,      gamma[2],
    gamma[0], beta[0],  gamma[1], beta[1],  gamma[2], beta[2],
  ]);
  Ok(b / (2.0 * det_area))
}

/// 6x6 plane stress stiffness matrix $A B^T D B$ with the signed area `A`.
///
/// Counter-clockwise triangles give a positive semi-definite matrix.
pub fn stiffness_elmat(
  youngs_modulus: f64,
  poisson_ratio: f64,
  geo: &GeometryTriangle,
) -> FemResult<ElMat> {
  let b = strain_displacement_matrix(geo)?;
  let d = plane_stress_matrix(youngs_modulus, poisson_ratio);
  let elmat = geo.det_area() * b.transpose() * d * b;
  Ok(ElMat::from_column_slice(6, 6, elmat.as_slice()))
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::geometry::Point;
  use approx::assert_relative_eq;

  #[test]
  fn ref_conductivity() {
    let elmat = conductivity_elmat(1.0, &GeometryTriangle::new_ref()).unwrap();
    #[rustfmt::skip]
    let expected = ElMat::from_row_slice(3, 3, &[
       1.0, -0.5, -0.5,
      -0.5,  0.5,  0.0,
      -0.5,  0.0,  0.5,
    ]);
    assert_relative_eq!(elmat, expected, epsilon = 1e-14);
  }

  #[test]
  fn ref_mass_sums_to_area() {
    let elmat = mass_elmat(3.0, &GeometryTriangle::new_ref()).unwrap();
    assert_relative_eq!(elmat.sum(), 3.0 * 0.5, epsilon = 1e-14);
    assert_relative_eq!(elmat[(0, 0)], 3.0 * 0.5 / 6.0, epsilon = 1e-14);
  }

  #[test]
  fn vector_mass_has_no_component_coupling() {
    let elmat = mass_elmat_vector(1.0, &GeometryTriangle::new_ref()).unwrap();
    let scalar = mass_elmat(1.0, &GeometryTriangle::new_ref()).unwrap();
    for i in 0..3 {
      for j in 0..3 {
        assert_eq!(elmat[(2 * i, 2 * j)], scalar[(i, j)]);
        assert_eq!(elmat[(2 * i + 1, 2 * j + 1)], scalar[(i, j)]);
        assert_eq!(elmat[(2 * i, 2 * j + 1)], 0.0);
        assert_eq!(elmat[(2 * i + 1, 2 * j)], 0.0);
      }
    }
  }

  #[test]
  fn stiffness_rigid_body_modes() {
    let geo = GeometryTriangle::new(
      Point::new(0.2, 0.1),
      Point::new(1.3, 0.4),
      Point::new(0.5, 1.1),
    );
    let elmat = stiffness_elmat(200e9, 0.3, &geo).unwrap();
    let scale = elmat.amax();

    let tx = na::DVector::from_row_slice(&[1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
    let ty = na::DVector::from_row_slice(&[0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
    let rot = na::DVector::from_iterator(
      6,
      geo.vertices().iter().flat_map(|v| [-v.y, v.x]),
    );
    for mode in [tx, ty, rot] {
      assert!((&elmat * mode).amax() < 1e-10 * scale);
    }
  }

  #[test]
  fn stiffness_sign_follows_orientation() {
    let ccw = GeometryTriangle::new_ref();
    let [v0, v1, v2] = *ccw.vertices();
    let cw = GeometryTriangle::new(v0, v2, v1);
    let k_ccw = stiffness_elmat(1.0, 0.25, &ccw).unwrap();
    let k_cw = stiffness_elmat(1.0, 0.25, &cw).unwrap();
    assert!(k_ccw.diagonal().iter().all(|&d| d > 0.0));
    assert!(k_cw.diagonal().iter().all(|&d| d < 0.0));
  }

  #[test]
  fn degenerate_triangle_fails() {
    let geo = GeometryTriangle::new(
      Point::new(0.0, 0.0),
      Point::new(0.5, 0.5),
      Point::new(1.0, 1.0),
    );
    for material in [
      Material::Conductivity { k: 1.0 },
      Material::Density { rho: 1.0 },
      Material::Elastic {
        youngs_modulus: 1.0,
        poisson_ratio: 0.3,
      },
    ] {
      assert!(matches!(
        material.eval(&geo),
        Err(FemError::DegenerateGeometry { .. })
      ));
    }
  }
}
