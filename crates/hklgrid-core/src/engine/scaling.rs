use super::config::ScalingConfig;
use crate::core::models::asu_data::AsuData;
use crate::core::models::cell::UnitCell;
use crate::core::models::miller::MillerIndex;
use crate::core::models::value::ValueSigma;
use crate::core::symmetry::spacegroup::SpaceGroup;
use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use num_complex::Complex64;
use std::cmp::Ordering;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace, warn};

const MIN_POINTS: usize = 4;
const MAX_DAMPING: f64 = 1e12;
const BASIS_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScalingError {
    #[error("Too few points for scaling: {found} usable, at least {required} required")]
    TooFewPoints { found: usize, required: usize },
    #[error("Normal equations are not positive definite")]
    Singular,
    #[error("Scaling did not converge after {iterations} iterations")]
    NotConverged { iterations: usize },
}

/// A reflection present in both the calculated and the observed set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalePoint {
    pub hkl: MillerIndex,
    pub stol2: f64,
    pub f_calc: Complex64,
    pub f_obs: f64,
    pub sigma: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitReport {
    pub iterations: usize,
    pub initial_residual: f64,
    pub final_residual: f64,
}

/// Overall scaling of calculated structure factors against observed amplitudes.
///
/// The model is `k · exp(-¼ sᵀ B s) · |F_calc|` with `s` the Cartesian reciprocal
/// vector and `B` a symmetric Cartesian tensor restricted to the subspace left
/// invariant by the point group. An isotropic `B` reduces to `exp(-B · stol²)`.
#[derive(Debug, Clone)]
pub struct Scaling {
    cell: UnitCell,
    spacegroup: Arc<SpaceGroup>,
    config: ScalingConfig,
    points: Vec<ScalePoint>,
    k_overall: f64,
    /// B11, B22, B33, B12, B13, B23.
    b_overall: [f64; 6],
}

impl Scaling {
    pub fn new(cell: UnitCell, spacegroup: Arc<SpaceGroup>) -> Self {
        Self::with_config(cell, spacegroup, ScalingConfig::default())
    }

    pub fn with_config(cell: UnitCell, spacegroup: Arc<SpaceGroup>, config: ScalingConfig) -> Self {
        Self {
            cell,
            spacegroup,
            config,
            points: Vec::new(),
            k_overall: 1.0,
            b_overall: [0.0; 6],
        }
    }

    pub fn config(&self) -> &ScalingConfig {
        &self.config
    }

    pub fn points(&self) -> &[ScalePoint] {
        &self.points
    }

    pub fn k_overall(&self) -> f64 {
        self.k_overall
    }

    /// Cartesian B tensor.
    pub fn b_overall(&self) -> Matrix3<f64> {
        tensor_from_components(&self.b_overall)
    }

    /// Isotropic equivalent, a third of the trace.
    pub fn b_iso(&self) -> f64 {
        (self.b_overall[0] + self.b_overall[1] + self.b_overall[2]) / 3.0
    }

    pub fn set_parameters(&mut self, k_overall: f64, b_overall: &Matrix3<f64>) {
        self.k_overall = k_overall;
        self.b_overall = components_of(b_overall);
    }

    /// Joins calculated and observed data by Miller index and returns the number of
    /// usable points. Missing or non-positive observations and zero calculated
    /// amplitudes are skipped.
    pub fn prepare_points(&mut self, calc: &AsuData<Complex64>, obs: &AsuData<ValueSigma>) -> usize {
        let mut points = Vec::with_capacity(calc.len().min(obs.len()));
        let mut invalid = 0usize;
        let mut calc_iter = calc.iter().peekable();
        let mut obs_iter = obs.iter().peekable();

        while let (Some(c), Some(o)) = (calc_iter.peek(), obs_iter.peek()) {
            match c.hkl.cmp(&o.hkl) {
                Ordering::Less => {
                    calc_iter.next();
                }
                Ordering::Greater => {
                    obs_iter.next();
                }
                Ordering::Equal => {
                    let f_obs = o.value.value;
                    let f_calc = c.value;
                    if f_obs.is_nan() || f_obs <= 0.0 || !f_calc.norm().is_normal() {
                        invalid += 1;
                    } else {
                        points.push(ScalePoint {
                            hkl: c.hkl,
                            stol2: self.cell.calculate_stol2(c.hkl),
                            f_calc,
                            f_obs,
                            sigma: o.value.sigma,
                        });
                    }
                    calc_iter.next();
                    obs_iter.next();
                }
            }
        }

        if invalid > 0 {
            warn!(skipped = invalid, "Skipped reflections with unusable amplitudes.");
        }
        debug!(
            calculated = calc.len(),
            observed = obs.len(),
            points = points.len(),
            "Prepared scaling points."
        );
        self.points = points;
        self.points.len()
    }

    /// Scale factor applied to the calculated value at `hkl`.
    pub fn scale_factor(&self, hkl: MillerIndex) -> f64 {
        let s = self.cell.reciprocal_vector(hkl);
        self.k_overall * (-0.25 * quadratic_form(&self.b_overall, &s)).exp()
    }

    pub fn weighted_residual(&self) -> f64 {
        self.points
            .iter()
            .map(|p| {
                let diff = p.f_obs - self.scale_factor(p.hkl) * p.f_calc.norm();
                self.weight(p) * diff * diff
            })
            .sum()
    }

    /// `Σ |F_obs - F_model| / Σ F_obs`; NaN when no points are prepared.
    pub fn r_factor(&self) -> f64 {
        let (num, den) = self.points.iter().fold((0.0, 0.0), |(num, den), p| {
            let model = self.scale_factor(p.hkl) * p.f_calc.norm();
            (num + (p.f_obs - model).abs(), den + p.f_obs)
        });
        num / den
    }

    /// Linear fit of `ln(F_obs / |F_calc|)` against stol²: the intercept gives
    /// `ln k` and the slope `-B`. Sets an isotropic B and returns `(k, B)`.
    pub fn fit_isotropic_b_approximately(&mut self) -> Result<(f64, f64), ScalingError> {
        if self.points.len() < MIN_POINTS {
            return Err(ScalingError::TooFewPoints {
                found: self.points.len(),
                required: MIN_POINTS,
            });
        }
        let n = self.points.len() as f64;
        let (mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0);
        for p in &self.points {
            let x = p.stol2;
            let y = (p.f_obs / p.f_calc.norm()).ln();
            sx += x;
            sy += y;
            sxx += x * x;
            sxy += x * y;
        }
        let denominator = n * sxx - sx * sx;
        if denominator <= 1e-12 * n * sxx || denominator <= 0.0 {
            return Err(ScalingError::Singular);
        }
        let slope = (n * sxy - sx * sy) / denominator;
        let intercept = (sy - slope * sx) / n;

        let b_iso = -slope;
        self.k_overall = intercept.exp();
        self.b_overall = [b_iso, b_iso, b_iso, 0.0, 0.0, 0.0];
        debug!(k = self.k_overall, b_iso, "Approximate isotropic scaling.");
        Ok((self.k_overall, b_iso))
    }

    /// Levenberg–Marquardt refinement of `k` and the symmetry-allowed B components,
    /// starting from the current parameters. Parameters are only updated when the
    /// refinement converges.
    pub fn fit_parameters(&mut self) -> Result<FitReport, ScalingError> {
        let basis = if self.config.anisotropic {
            b_tensor_basis(&self.cell, &self.spacegroup)
        } else {
            isotropic_basis()
        };
        let nparams = 1 + basis.len();
        let required = nparams.max(MIN_POINTS);
        if self.points.len() < required {
            return Err(ScalingError::TooFewPoints {
                found: self.points.len(),
                required,
            });
        }

        let problem = FitProblem::new(self, &basis);
        let mut params = DVector::from_iterator(
            nparams,
            std::iter::once(self.k_overall).chain(basis.iter().map(|b| dot6(&self.b_overall, b))),
        );

        let initial_residual = problem.cost(&params);
        // Residuals this small are rounding noise in the model.
        let residual_floor = f64::EPSILON * problem.weighted_obs_squared();
        let mut cost = initial_residual;
        let mut lambda = self.config.initial_damping;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.config.max_iterations {
            iterations += 1;
            let (normal, gradient) = problem.normal_equations(&params);
            if normal.clone().cholesky().is_none() {
                return Err(ScalingError::Singular);
            }

            loop {
                let mut damped = normal.clone();
                for i in 0..nparams {
                    damped[(i, i)] += lambda * normal[(i, i)];
                }
                let step = damped
                    .cholesky()
                    .ok_or(ScalingError::Singular)?
                    .solve(&gradient);
                let trial = &params + &step;
                let trial_cost = if trial[0] > 0.0 {
                    problem.cost(&trial)
                } else {
                    f64::INFINITY
                };

                if trial_cost < cost {
                    let decrease = (cost - trial_cost) / cost;
                    params = trial;
                    cost = trial_cost;
                    lambda = (lambda / 10.0).max(f64::EPSILON);
                    converged =
                        decrease < self.config.convergence_threshold || cost <= residual_floor;
                    break;
                }
                lambda *= 10.0;
                if lambda > MAX_DAMPING {
                    // No downhill step left.
                    converged = true;
                    break;
                }
            }
            trace!(iteration = iterations, residual = cost, lambda, "Scaling iteration.");
            if converged {
                break;
            }
        }

        if !converged {
            return Err(ScalingError::NotConverged { iterations });
        }

        self.k_overall = params[0];
        let mut b = [0.0; 6];
        for (j, basis_tensor) in basis.iter().enumerate() {
            for (component, value) in b.iter_mut().zip(basis_tensor) {
                *component += params[j + 1] * value;
            }
        }
        self.b_overall = b;

        debug!(
            iterations,
            initial_residual,
            final_residual = cost,
            k = self.k_overall,
            b_iso = self.b_iso(),
            "Refined scaling parameters."
        );
        Ok(FitReport {
            iterations,
            initial_residual,
            final_residual: cost,
        })
    }

    /// Multiplies every value by its scale factor.
    pub fn scale_data(&self, data: &mut AsuData<Complex64>) {
        for (hkl, value) in data.iter_mut() {
            *value *= self.scale_factor(hkl);
        }
    }

    pub fn scaled(&self, data: &AsuData<Complex64>) -> AsuData<Complex64> {
        let mut copy = data.clone();
        self.scale_data(&mut copy);
        copy
    }

    fn weight(&self, point: &ScalePoint) -> f64 {
        weight_of(point, self.config.use_sigma)
    }
}

fn weight_of(point: &ScalePoint, use_sigma: bool) -> f64 {
    if use_sigma && point.sigma.is_finite() && point.sigma > 0.0 {
        1.0 / (point.sigma * point.sigma)
    } else {
        1.0
    }
}

/// Per-point quantities that stay fixed during the refinement.
struct FitProblem {
    f_obs: Vec<f64>,
    f_calc: Vec<f64>,
    weights: Vec<f64>,
    /// `sᵀ b_j s` for each point and basis tensor.
    quads: Vec<Vec<f64>>,
}

impl FitProblem {
    fn new(scaling: &Scaling, basis: &[[f64; 6]]) -> Self {
        let points = &scaling.points;
        Self {
            f_obs: points.iter().map(|p| p.f_obs).collect(),
            f_calc: points.iter().map(|p| p.f_calc.norm()).collect(),
            weights: points
                .iter()
                .map(|p| weight_of(p, scaling.config.use_sigma))
                .collect(),
            quads: points
                .iter()
                .map(|p| {
                    let s = scaling.cell.reciprocal_vector(p.hkl);
                    basis.iter().map(|b| quadratic_form(b, &s)).collect()
                })
                .collect(),
        }
    }

    fn model(&self, params: &DVector<f64>, i: usize) -> f64 {
        let exponent: f64 = self.quads[i]
            .iter()
            .enumerate()
            .map(|(j, q)| params[j + 1] * q)
            .sum();
        params[0] * (-0.25 * exponent).exp() * self.f_calc[i]
    }

    fn weighted_obs_squared(&self) -> f64 {
        self.f_obs
            .iter()
            .zip(&self.weights)
            .map(|(f, w)| w * f * f)
            .sum()
    }

    fn cost(&self, params: &DVector<f64>) -> f64 {
        (0..self.f_obs.len())
            .map(|i| {
                let diff = self.f_obs[i] - self.model(params, i);
                self.weights[i] * diff * diff
            })
            .sum()
    }

    /// `(Jᵀ W J, Jᵀ W r)` at `params`.
    fn normal_equations(&self, params: &DVector<f64>) -> (DMatrix<f64>, DVector<f64>) {
        let n = params.len();
        let mut normal = DMatrix::zeros(n, n);
        let mut gradient = DVector::zeros(n);
        let mut row = DVector::zeros(n);
        for i in 0..self.f_obs.len() {
            let model = self.model(params, i);
            row[0] = model / params[0];
            for (j, q) in self.quads[i].iter().enumerate() {
                row[j + 1] = -0.25 * q * model;
            }
            let w = self.weights[i];
            let residual = self.f_obs[i] - model;
            normal += &row * row.transpose() * w;
            gradient += &row * (w * residual);
        }
        (normal, gradient)
    }
}

fn isotropic_basis() -> Vec<[f64; 6]> {
    let c = 1.0 / 3f64.sqrt();
    vec![[c, c, c, 0.0, 0.0, 0.0]]
}

/// Orthonormal basis of symmetric tensors with `R B Rᵀ = B` for every Cartesian
/// rotation of the point group.
fn b_tensor_basis(cell: &UnitCell, spacegroup: &SpaceGroup) -> Vec<[f64; 6]> {
    let rotations: Vec<Matrix3<f64>> = spacegroup
        .rotation_matrices()
        .iter()
        .map(|r| cell.cartesian_rotation(r))
        .collect();
    let mut basis: Vec<[f64; 6]> = Vec::new();
    for j in 0..6 {
        let mut unit = [0.0; 6];
        unit[j] = 1.0;
        let unit = tensor_from_components(&unit);
        let mut average = Matrix3::zeros();
        for r in &rotations {
            average += r * unit * r.transpose();
        }
        average /= rotations.len() as f64;

        let mut v = components_of(&average);
        for b in &basis {
            let projection = dot6(&v, b);
            for (x, y) in v.iter_mut().zip(b) {
                *x -= projection * y;
            }
        }
        let norm = dot6(&v, &v).sqrt();
        if norm > BASIS_TOLERANCE {
            basis.push(v.map(|x| x / norm));
        }
    }
    basis
}

fn tensor_from_components(b: &[f64; 6]) -> Matrix3<f64> {
    Matrix3::new(b[0], b[3], b[4], b[3], b[1], b[5], b[4], b[5], b[2])
}

fn components_of(m: &Matrix3<f64>) -> [f64; 6] {
    [
        m[(0, 0)],
        m[(1, 1)],
        m[(2, 2)],
        0.5 * (m[(0, 1)] + m[(1, 0)]),
        0.5 * (m[(0, 2)] + m[(2, 0)]),
        0.5 * (m[(1, 2)] + m[(2, 1)]),
    ]
}

#[inline]
fn dot6(a: &[f64; 6], b: &[f64; 6]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// `sᵀ B s` for B given by its six components.
#[inline]
fn quadratic_form(b: &[f64; 6], s: &Vector3<f64>) -> f64 {
    b[0] * s.x * s.x
        + b[1] * s.y * s.y
        + b[2] * s.z * s.z
        + 2.0 * (b[3] * s.x * s.y + b[4] * s.x * s.z + b[5] * s.y * s.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::symmetry::spacegroup::find_spacegroup_by_name;
    use crate::engine::config::ScalingConfigBuilder;
    use crate::engine::test_data::{asu_structure_factors, orthorhombic_cell, spacegroup};

    const TOLERANCE: f64 = 1e-6;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE * (1.0 + a.abs().max(b.abs()))
    }

    fn observed_from(calc: &AsuData<Complex64>, k: f64, b: [f64; 6]) -> AsuData<ValueSigma> {
        let cell = *calc.unit_cell();
        let pairs = calc.iter().map(|c| {
            let s = cell.reciprocal_vector(c.hkl);
            let f = k * (-0.25 * quadratic_form(&b, &s)).exp() * c.value.norm();
            (c.hkl, ValueSigma::new(f, 1.0))
        });
        AsuData::from_reflections(cell, Arc::clone(calc.spacegroup()), pairs).unwrap()
    }

    #[test]
    fn isotropic_fit_recovers_exact_parameters() {
        let sg = spacegroup("P 21 21 21");
        let calc = asu_structure_factors(&sg, orthorhombic_cell(), 5);
        let obs = observed_from(&calc, 3.0, [15.0, 15.0, 15.0, 0.0, 0.0, 0.0]);

        let mut scaling = Scaling::new(orthorhombic_cell(), sg);
        assert_eq!(scaling.prepare_points(&calc, &obs), calc.len());
        let (k, b) = scaling.fit_isotropic_b_approximately().unwrap();
        assert!(f64_approx_equal(k, 3.0));
        assert!(f64_approx_equal(b, 15.0));
        assert!(scaling.weighted_residual() < 1e-12);
    }

    #[test]
    fn anisotropic_fit_recovers_orthorhombic_tensor() {
        let sg = spacegroup("P 21 21 21");
        let calc = asu_structure_factors(&sg, orthorhombic_cell(), 6);
        let obs = observed_from(&calc, 2.5, [12.0, 18.0, 25.0, 0.0, 0.0, 0.0]);

        let mut scaling = Scaling::new(orthorhombic_cell(), sg);
        scaling.prepare_points(&calc, &obs);
        let before = scaling.weighted_residual();
        scaling.fit_isotropic_b_approximately().unwrap();
        let after_approx = scaling.weighted_residual();
        let report = scaling.fit_parameters().unwrap();

        assert!(after_approx <= before);
        assert!(report.final_residual <= report.initial_residual);
        assert!(f64_approx_equal(report.initial_residual, after_approx));
        assert!(scaling.weighted_residual() <= after_approx);

        let b = scaling.b_overall();
        assert!((scaling.k_overall() - 2.5).abs() < 1e-4);
        assert!((b[(0, 0)] - 12.0).abs() < 1e-3);
        assert!((b[(1, 1)] - 18.0).abs() < 1e-3);
        assert!((b[(2, 2)] - 25.0).abs() < 1e-3);
        assert!(b[(0, 1)].abs() < 1e-6 && b[(0, 2)].abs() < 1e-6 && b[(1, 2)].abs() < 1e-6);
        assert!(scaling.r_factor() < 1e-4);
    }

    /// Observations that follow `k = 2`, `B = 4` with σ = 0.1, except the strongest
    /// reflection, which is fifty times too large and carries σ = 1e6.
    fn observed_with_outlier(calc: &AsuData<Complex64>) -> AsuData<ValueSigma> {
        let cell = *calc.unit_cell();
        let strongest = calc
            .iter()
            .max_by(|a, b| a.value.norm().total_cmp(&b.value.norm()))
            .map(|c| c.hkl)
            .unwrap();
        let pairs = calc.iter().map(|c| {
            let f = 2.0 * (-4.0 * cell.calculate_stol2(c.hkl)).exp() * c.value.norm();
            if c.hkl == strongest {
                (c.hkl, ValueSigma::new(50.0 * f, 1e6))
            } else {
                (c.hkl, ValueSigma::new(f, 0.1))
            }
        });
        AsuData::from_reflections(cell, Arc::clone(calc.spacegroup()), pairs).unwrap()
    }

    fn fit_isotropic_with_sigma(use_sigma: bool) -> Scaling {
        let sg = spacegroup("P 21 21 21");
        let calc = asu_structure_factors(&sg, orthorhombic_cell(), 5);
        let obs = observed_with_outlier(&calc);
        let config = ScalingConfigBuilder::new()
            .anisotropic(false)
            .use_sigma(use_sigma)
            .max_iterations(500)
            .build()
            .unwrap();
        let mut scaling = Scaling::with_config(orthorhombic_cell(), sg, config);
        scaling.prepare_points(&calc, &obs);
        scaling.set_parameters(2.0, &(Matrix3::identity() * 4.0));
        scaling.fit_parameters().unwrap();
        scaling
    }

    #[test]
    fn sigma_weighting_suppresses_uncertain_outlier() {
        let weighted = fit_isotropic_with_sigma(true);
        assert!((weighted.k_overall() - 2.0).abs() < 1e-6);
        assert!((weighted.b_iso() - 4.0).abs() < 1e-4);

        let unweighted = fit_isotropic_with_sigma(false);
        assert!((unweighted.k_overall() - 2.0).abs() > 1e-2);
    }

    #[test]
    fn isotropic_only_fit_keeps_tensor_spherical() {
        let sg = spacegroup("P 21 21 21");
        let calc = asu_structure_factors(&sg, orthorhombic_cell(), 5);
        let obs = observed_from(&calc, 1.5, [10.0, 14.0, 20.0, 0.0, 0.0, 0.0]);
        let config = ScalingConfigBuilder::new().anisotropic(false).build().unwrap();

        let mut scaling = Scaling::with_config(orthorhombic_cell(), sg, config);
        scaling.prepare_points(&calc, &obs);
        scaling.fit_isotropic_b_approximately().unwrap();
        let report = scaling.fit_parameters().unwrap();
        let b = scaling.b_overall();
        assert!(report.final_residual <= report.initial_residual);
        assert!(f64_approx_equal(b[(0, 0)], b[(1, 1)]));
        assert!(f64_approx_equal(b[(1, 1)], b[(2, 2)]));
        assert!(b[(0, 0)] > 10.0 && b[(0, 0)] < 20.0);
    }

    #[test]
    fn scaled_data_matches_observations() {
        let sg = spacegroup("P 21 21 21");
        let calc = asu_structure_factors(&sg, orthorhombic_cell(), 5);
        let obs = observed_from(&calc, 0.5, [8.0, 8.0, 8.0, 0.0, 0.0, 0.0]);
        let mut scaling = Scaling::new(orthorhombic_cell(), sg);
        scaling.prepare_points(&calc, &obs);
        scaling.fit_isotropic_b_approximately().unwrap();

        let scaled = scaling.scaled(&calc);
        for (s, o) in scaled.iter().zip(obs.iter()) {
            assert_eq!(s.hkl, o.hkl);
            assert!((s.value.norm() - o.value.value).abs() < 1e-9 * (1.0 + o.value.value));
        }
        let original = calc.get(calc.items()[0].hkl).unwrap();
        let first = scaled.items()[0].value;
        assert!((first.arg() - original.arg()).abs() < 1e-12);
    }

    #[test]
    fn prepare_points_keeps_only_usable_pairs() {
        let cell = orthorhombic_cell();
        let sg = find_spacegroup_by_name("P 1").unwrap();
        let calc = AsuData::from_reflections(
            cell,
            Arc::clone(&sg),
            vec![
                (MillerIndex::new(1, 0, 0), Complex64::new(2.0, 0.0)),
                (MillerIndex::new(2, 0, 0), Complex64::new(0.0, 0.0)),
                (MillerIndex::new(3, 0, 0), Complex64::new(1.0, 1.0)),
                (MillerIndex::new(4, 0, 0), Complex64::new(1.0, 0.0)),
                (MillerIndex::new(5, 0, 0), Complex64::new(1.0, 0.0)),
            ],
        )
        .unwrap();
        let obs = AsuData::from_reflections(
            cell,
            sg,
            vec![
                (MillerIndex::new(1, 0, 0), ValueSigma::new(3.0, 0.1)),
                (MillerIndex::new(2, 0, 0), ValueSigma::new(3.0, 0.1)),
                (MillerIndex::new(3, 0, 0), ValueSigma::new(-1.0, 0.1)),
                (MillerIndex::new(4, 0, 0), ValueSigma::without_sigma(f64::NAN)),
                (MillerIndex::new(6, 0, 0), ValueSigma::new(3.0, 0.1)),
            ],
        )
        .unwrap();

        let mut scaling = Scaling::new(cell, Arc::clone(calc.spacegroup()));
        assert_eq!(scaling.prepare_points(&calc, &obs), 1);
        let point = scaling.points()[0];
        assert_eq!(point.hkl, MillerIndex::new(1, 0, 0));
        assert!(f64_approx_equal(point.stol2, 0.25 / (24.0 * 24.0)));
        assert_eq!(point.sigma, 0.1);
    }

    #[test]
    fn fits_report_too_few_points_and_singular_data() {
        let cell = UnitCell::new(20.0, 20.0, 20.0, 90.0, 90.0, 90.0).unwrap();
        let sg = find_spacegroup_by_name("P 1").unwrap();
        let same_resolution = [(1, 1, 0), (1, -1, 0), (1, 0, 1), (0, 1, 1)];
        let calc = AsuData::from_reflections(
            cell,
            Arc::clone(&sg),
            same_resolution
                .iter()
                .map(|&(h, k, l)| (MillerIndex::new(h, k, l), Complex64::new(1.0, 0.0))),
        )
        .unwrap();
        let obs = calc.map_values(|f| ValueSigma::new(2.0 * f.norm(), 0.1));

        let mut scaling = Scaling::new(cell, Arc::clone(&sg));
        assert_eq!(scaling.prepare_points(&calc, &obs), 4);
        assert_eq!(
            scaling.fit_isotropic_b_approximately(),
            Err(ScalingError::Singular)
        );

        let few = calc.filter(|item| item.hkl.l == 0);
        let few_obs = few.map_values(|f| ValueSigma::new(f.norm(), 0.1));
        scaling.prepare_points(&few, &few_obs);
        assert_eq!(
            scaling.fit_isotropic_b_approximately(),
            Err(ScalingError::TooFewPoints {
                found: 2,
                required: 4
            })
        );
        // P 1 allows all six tensor components.
        assert_eq!(
            scaling.fit_parameters(),
            Err(ScalingError::TooFewPoints {
                found: 2,
                required: 7
            })
        );
    }

    #[test]
    fn fit_reports_non_convergence_without_committing() {
        let sg = spacegroup("P 21 21 21");
        let calc = asu_structure_factors(&sg, orthorhombic_cell(), 5);
        let obs = observed_from(&calc, 4.0, [5.0, 30.0, 12.0, 0.0, 0.0, 0.0]);
        let config = ScalingConfigBuilder::new()
            .max_iterations(1)
            .convergence_threshold(0.0)
            .build()
            .unwrap();

        let mut scaling = Scaling::with_config(orthorhombic_cell(), sg, config);
        scaling.prepare_points(&calc, &obs);
        assert_eq!(
            scaling.fit_parameters(),
            Err(ScalingError::NotConverged { iterations: 1 })
        );
        assert_eq!(scaling.k_overall(), 1.0);
        assert_eq!(scaling.b_iso(), 0.0);
    }

    #[test]
    fn tensor_basis_dimension_follows_crystal_system() {
        let cases = [
            ("P 1", UnitCell::new(30.0, 40.0, 50.0, 80.0, 95.0, 105.0).unwrap(), 6),
            ("C 1 2 1", UnitCell::new(30.0, 40.0, 50.0, 90.0, 105.0, 90.0).unwrap(), 4),
            ("P 21 21 21", orthorhombic_cell(), 3),
            ("P 41 21 2", UnitCell::new(40.0, 40.0, 60.0, 90.0, 90.0, 90.0).unwrap(), 2),
            ("P 61 2 2", UnitCell::new(40.0, 40.0, 60.0, 90.0, 90.0, 120.0).unwrap(), 2),
            ("P 21 3", UnitCell::new(50.0, 50.0, 50.0, 90.0, 90.0, 90.0).unwrap(), 1),
        ];
        for (name, cell, expected) in cases {
            let sg = find_spacegroup_by_name(name).unwrap();
            let basis = b_tensor_basis(&cell, &sg);
            assert_eq!(basis.len(), expected, "{}", name);
            for b in &basis {
                let tensor = tensor_from_components(b);
                for r in sg.rotation_matrices() {
                    let rc = cell.cartesian_rotation(&r);
                    let rotated = rc * tensor * rc.transpose();
                    assert!((rotated - tensor).abs().max() < 1e-9, "{}", name);
                }
            }
        }
    }
}
