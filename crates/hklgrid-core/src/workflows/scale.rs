use crate::core::io::source::ReflectionSource;
use crate::core::models::asu_data::AsuData;
use crate::engine::config::ScalingConfig;
use crate::engine::error::EngineError;
use crate::engine::scaling::{FitReport, Scaling};
use nalgebra::Matrix3;
use num_complex::Complex64;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Column labels used by the scaling workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleLabels {
    pub f_calc: String,
    pub phi_calc: String,
    pub f_obs: String,
    pub sigma_obs: String,
}

#[derive(Debug, Clone)]
pub struct ScaleResult {
    pub k_overall: f64,
    pub b_overall: Matrix3<f64>,
    pub report: FitReport,
    pub point_count: usize,
    pub r_factor: f64,
    pub scaled: AsuData<Complex64>,
}

#[instrument(skip_all, name = "scale_workflow")]
pub fn run(
    source: &impl ReflectionSource,
    labels: &ScaleLabels,
    config: &ScalingConfig,
) -> Result<ScaleResult, EngineError> {
    // === Phase 1: Load calculated and observed data ===
    info!("Reading calculated and observed reflections.");
    let calc = source.get_f_phi(&labels.f_calc, &labels.phi_calc)?;
    let obs = source.get_value_sigma(&labels.f_obs, &labels.sigma_obs)?;

    let mut scaling = Scaling::with_config(
        *source.unit_cell(),
        Arc::clone(source.spacegroup()),
        config.clone(),
    );
    let point_count = scaling.prepare_points(&calc, &obs);
    info!(points = point_count, "Matched calculated and observed reflections.");

    // === Phase 2: Isotropic initial estimate ===
    let (k, b_iso) = scaling.fit_isotropic_b_approximately()?;
    info!(k, b_iso, r_factor = scaling.r_factor(), "Initial isotropic scaling.");

    // === Phase 3: Refinement ===
    let report = scaling.fit_parameters()?;
    if report.final_residual > report.initial_residual {
        warn!("Refinement did not reduce the residual.");
    }

    let r_factor = scaling.r_factor();
    let scaled = scaling.scaled(&calc);
    info!(
        k = scaling.k_overall(),
        b_iso = scaling.b_iso(),
        r_factor,
        iterations = report.iterations,
        "Scaling workflow complete."
    );
    Ok(ScaleResult {
        k_overall: scaling.k_overall(),
        b_overall: scaling.b_overall(),
        report,
        point_count,
        r_factor,
        scaled,
    })
}
