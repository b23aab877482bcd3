use super::miller::MillerIndex;
use nalgebra::{Matrix3, Vector3};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CellError {
    #[error("Invalid unit cell parameter '{name}' = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
    #[error("Unit cell parameters describe a degenerate cell (volume {volume})")]
    Degenerate { volume: f64 },
}

/// Unit cell with its derived metric.
///
/// Lengths are in Ångströms and angles in degrees. The orthogonalization follows the
/// PDB convention: `a` along x, `b` in the xy plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitCell {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    volume: f64,
    orth: Matrix3<f64>,
    frac: Matrix3<f64>,
    reciprocal_lengths: [f64; 3],
}

impl UnitCell {
    pub fn new(
        a: f64,
        b: f64,
        c: f64,
        alpha: f64,
        beta: f64,
        gamma: f64,
    ) -> Result<Self, CellError> {
        for (name, value) in [("a", a), ("b", b), ("c", c)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(CellError::InvalidParameter {
                    name,
                    value,
                    reason: "length must be positive",
                });
            }
        }
        for (name, value) in [("alpha", alpha), ("beta", beta), ("gamma", gamma)] {
            if !(value.is_finite() && value > 0.0 && value < 180.0) {
                return Err(CellError::InvalidParameter {
                    name,
                    value,
                    reason: "angle must lie strictly between 0 and 180 degrees",
                });
            }
        }

        let (cos_alpha, cos_beta, cos_gamma) = (
            alpha.to_radians().cos(),
            beta.to_radians().cos(),
            gamma.to_radians().cos(),
        );
        let (sin_beta, sin_gamma) = (beta.to_radians().sin(), gamma.to_radians().sin());

        let volume_factor = 1.0 - cos_alpha * cos_alpha - cos_beta * cos_beta
            - cos_gamma * cos_gamma
            + 2.0 * cos_alpha * cos_beta * cos_gamma;
        if volume_factor <= 1e-12 {
            return Err(CellError::Degenerate {
                volume: a * b * c * volume_factor.max(0.0).sqrt(),
            });
        }
        let volume = a * b * c * volume_factor.sqrt();

        let cos_alpha_star = (cos_beta * cos_gamma - cos_alpha) / (sin_beta * sin_gamma);
        let sin_alpha_star = (1.0 - cos_alpha_star * cos_alpha_star).max(0.0).sqrt();

        #[rustfmt::skip]
        let orth = Matrix3::new(
            a,   b * cos_gamma, c * cos_beta,
            0.0, b * sin_gamma, -c * sin_beta * cos_alpha_star,
            0.0, 0.0,           c * sin_beta * sin_alpha_star,
        );
        let frac = orth
            .try_inverse()
            .ok_or(CellError::Degenerate { volume })?;

        let reciprocal_lengths = [
            frac.row(0).norm(),
            frac.row(1).norm(),
            frac.row(2).norm(),
        ];

        Ok(Self {
            a,
            b,
            c,
            alpha,
            beta,
            gamma,
            volume,
            orth,
            frac,
            reciprocal_lengths,
        })
    }

    pub fn parameters(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.alpha, self.beta, self.gamma]
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn orthogonalization_matrix(&self) -> &Matrix3<f64> {
        &self.orth
    }

    pub fn fractionalization_matrix(&self) -> &Matrix3<f64> {
        &self.frac
    }

    /// Lengths of a*, b* and c*.
    pub fn reciprocal_lengths(&self) -> [f64; 3] {
        self.reciprocal_lengths
    }

    /// Cartesian reciprocal-space vector `h a* + k b* + l c*`.
    #[inline]
    pub fn reciprocal_vector(&self, hkl: MillerIndex) -> Vector3<f64> {
        self.frac.transpose() * Vector3::new(hkl.h as f64, hkl.k as f64, hkl.l as f64)
    }

    #[inline]
    pub fn calculate_1_d2(&self, hkl: MillerIndex) -> f64 {
        self.reciprocal_vector(hkl).norm_squared()
    }

    /// Resolution (d-spacing). Infinite for the origin.
    #[inline]
    pub fn calculate_d(&self, hkl: MillerIndex) -> f64 {
        1.0 / self.calculate_1_d2(hkl).sqrt()
    }

    /// (sin θ / λ)² = 1 / (4 d²).
    #[inline]
    pub fn calculate_stol2(&self, hkl: MillerIndex) -> f64 {
        0.25 * self.calculate_1_d2(hkl)
    }

    /// Expresses a fractional rotation in Cartesian coordinates.
    pub fn cartesian_rotation(&self, fractional: &Matrix3<f64>) -> Matrix3<f64> {
        self.orth * fractional * self.frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn cubic_cell_resolution_follows_pythagoras() {
        let cell = UnitCell::new(10.0, 10.0, 10.0, 90.0, 90.0, 90.0).unwrap();
        assert!(f64_approx_equal(cell.volume(), 1000.0));
        assert!(f64_approx_equal(
            cell.calculate_1_d2(MillerIndex::new(1, 2, 2)),
            9.0 / 100.0
        ));
        assert!(f64_approx_equal(
            cell.calculate_d(MillerIndex::new(1, 2, 2)),
            10.0 / 3.0
        ));
        assert!(f64_approx_equal(
            cell.calculate_stol2(MillerIndex::new(2, 0, 0)),
            0.25 * 0.04
        ));
    }

    #[test]
    fn monoclinic_cell_matches_reciprocal_metric() {
        let cell = UnitCell::new(30.0, 40.0, 50.0, 90.0, 110.0, 90.0).unwrap();
        let beta = 110.0f64.to_radians();
        let expected_volume = 30.0 * 40.0 * 50.0 * beta.sin();
        assert!((cell.volume() - expected_volume).abs() < 1e-6);

        // 1/d² for monoclinic (b unique):
        // (h²/a² + l²/c² - 2hl cosβ/(ac)) / sin²β + k²/b²
        let (h, k, l) = (2.0, 3.0, -1.0);
        let expected = (h * h / 900.0 + l * l / 2500.0 - 2.0 * h * l * beta.cos() / 1500.0)
            / (beta.sin() * beta.sin())
            + k * k / 1600.0;
        let computed = cell.calculate_1_d2(MillerIndex::new(2, 3, -1));
        assert!((computed - expected).abs() < 1e-12);
    }

    #[test]
    fn fractionalization_inverts_orthogonalization() {
        let cell = UnitCell::new(12.0, 15.0, 21.0, 80.0, 95.0, 100.0).unwrap();
        let product = cell.orthogonalization_matrix() * cell.fractionalization_matrix();
        assert!((product - Matrix3::identity()).norm() < 1e-12);
    }

    #[test]
    fn reciprocal_lengths_of_orthorhombic_cell_are_inverse_lengths() {
        let cell = UnitCell::new(20.0, 25.0, 40.0, 90.0, 90.0, 90.0).unwrap();
        let [ar, br, cr] = cell.reciprocal_lengths();
        assert!(f64_approx_equal(ar, 0.05));
        assert!(f64_approx_equal(br, 0.04));
        assert!(f64_approx_equal(cr, 0.025));
    }

    #[test]
    fn new_rejects_non_positive_lengths() {
        let result = UnitCell::new(0.0, 10.0, 10.0, 90.0, 90.0, 90.0);
        assert!(matches!(
            result,
            Err(CellError::InvalidParameter { name: "a", .. })
        ));
    }

    #[test]
    fn new_rejects_out_of_range_angles() {
        let result = UnitCell::new(10.0, 10.0, 10.0, 90.0, 180.0, 90.0);
        assert!(matches!(
            result,
            Err(CellError::InvalidParameter { name: "beta", .. })
        ));
    }

    #[test]
    fn new_rejects_degenerate_angle_combination() {
        let result = UnitCell::new(10.0, 10.0, 10.0, 120.0, 120.0, 120.0);
        assert!(matches!(result, Err(CellError::Degenerate { .. })));
    }
}
