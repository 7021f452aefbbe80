extern crate nalgebra as na;

use trifem::{
  fe::{self, ElmatProvider, Material},
  geometry::{GeometryTriangle, Point},
  FemError,
};

use rand::{rngs::StdRng, Rng, SeedableRng};

fn random_ccw_triangle(rng: &mut impl Rng) -> GeometryTriangle {
  loop {
    let mut v = || Point::new(rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0));
    let (a, b, c) = (v(), v(), v());
    let geo = GeometryTriangle::new(a, b, c);
    if geo.is_degenerate() || geo.area() < 1e-3 {
      continue;
    }
    return if geo.det_area() > 0.0 {
      geo
    } else {
      GeometryTriangle::new(a, c, b)
    };
  }
}

fn assert_symmetric_psd(elmat: &na::DMatrix<f64>) {
  let scale = elmat.amax();
  let asym = (elmat - elmat.transpose()).amax();
  assert!(asym <= 1e-12 * scale, "asymmetry {asym:e}");
  let eigen = elmat.clone().symmetric_eigen();
  let min = eigen.eigenvalues.min();
  assert!(min >= -1e-10 * scale, "negative eigenvalue {min:e}\n{elmat:.3}");
}

#[test]
fn element_matrices_are_symmetric_psd() {
  let mut rng = StdRng::seed_from_u64(42);
  let materials = [
    Material::Conductivity { k: 2.5 },
    Material::Density { rho: 7800.0 },
    Material::Elastic {
      youngs_modulus: 210e9,
      poisson_ratio: 0.3,
    },
  ];
  for _ in 0..50 {
    let geo = random_ccw_triangle(&mut rng);
    for material in &materials {
      let elmat = material.eval(&geo).unwrap();
      let n = 3 * material.ndofs_per_node();
      assert_eq!(elmat.shape(), (n, n));
      assert_symmetric_psd(&elmat);
    }
  }
}

#[test]
fn conductivity_ignores_orientation() {
  let mut rng = StdRng::seed_from_u64(1);
  for _ in 0..20 {
    let geo = random_ccw_triangle(&mut rng);
    let [a, b, c] = *geo.vertices();
    let flipped = GeometryTriangle::new(a, c, b);

    let k = fe::conductivity_elmat(1.0, &geo).unwrap();
    let k_flipped = fe::conductivity_elmat(1.0, &flipped).unwrap();
    // same matrix with local dofs 1 and 2 swapped
    let perm = na::DMatrix::from_row_slice(3, 3, &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
    approx::assert_relative_eq!(k_flipped, &perm * k * &perm, epsilon = 1e-12);
  }
}

#[test]
fn conductivity_annihilates_constants() {
  let mut rng = StdRng::seed_from_u64(3);
  let ones = na::DVector::from_element(3, 1.0);
  for _ in 0..20 {
    let geo = random_ccw_triangle(&mut rng);
    let elmat = fe::conductivity_elmat(4.0, &geo).unwrap();
    assert!((elmat * &ones).amax() < 1e-12);
  }
}

#[test]
fn collinear_vertices_are_rejected_by_every_kernel() {
  let geo = GeometryTriangle::new(
    Point::new(0.0, 0.0),
    Point::new(1.0, 2.0),
    Point::new(2.0, 4.0),
  );
  let results = [
    fe::conductivity_elmat(1.0, &geo),
    fe::mass_elmat(1.0, &geo),
    fe::mass_elmat_vector(1.0, &geo),
    fe::stiffness_elmat(1.0, 0.3, &geo),
  ];
  for res in results {
    assert!(matches!(res, Err(FemError::DegenerateGeometry { .. })));
  }
}

#[test]
fn near_zero_area_is_rejected() {
  let geo = GeometryTriangle::new(
    Point::new(0.0, 0.0),
    Point::new(1.0, 0.0),
    Point::new(0.5, 1e-14),
  );
  assert!(matches!(
    fe::conductivity_elmat(1.0, &geo),
    Err(FemError::DegenerateGeometry { .. })
  ));
}
