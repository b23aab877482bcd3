use crate::core::io::source::ReflectionSource;
use crate::core::models::asu_data::AsuData;
use crate::core::models::grid::{Grid, GridStatistics, Packing};
use crate::engine::config::{GridSizing, MapConfig};
use crate::engine::error::EngineError;
use crate::engine::expansion::{AsuExtractOptions, expand_to_grid, prepare_asu_data, size_for_reflections};
use crate::engine::fourier::{real_to_reciprocal, reciprocal_to_real};
use num_complex::Complex64;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct MapResult {
    pub map: Grid<f64>,
    pub statistics: GridStatistics,
    pub reflection_count: usize,
}

/// Sizes a grid, expands the structure factors onto it and transforms to density.
#[instrument(skip_all, name = "transform_f_phi_to_map")]
pub fn transform_f_phi_to_map(
    data: &AsuData<Complex64>,
    config: &MapConfig,
) -> Result<Grid<f64>, EngineError> {
    let size = match config.sizing {
        GridSizing::SampleRate(rate) => size_for_reflections(data, rate),
        GridSizing::Exact(size) => size,
    };
    let grid = expand_to_grid(data, size, config.packing, config.axis_order)?;
    Ok(reciprocal_to_real(&grid)?)
}

/// Structure factors of a map, reduced to the asymmetric unit.
#[instrument(skip_all, name = "transform_map_to_f_phi")]
pub fn transform_map_to_f_phi(
    map: &Grid<f64>,
    options: &AsuExtractOptions,
) -> Result<AsuData<Complex64>, EngineError> {
    let grid = real_to_reciprocal(map, Packing::Full)?;
    Ok(prepare_asu_data(&grid, options)?)
}

#[instrument(skip_all, name = "map_workflow")]
pub fn run(
    source: &impl ReflectionSource,
    f_label: &str,
    phi_label: &str,
    config: &MapConfig,
) -> Result<MapResult, EngineError> {
    info!(f_label, phi_label, "Reading structure factors.");
    let data = source.get_f_phi(f_label, phi_label)?;
    if data.is_empty() {
        return Err(EngineError::PhaseFailed {
            phase: "read structure factors",
            reason: format!("no reflections with both '{}' and '{}'", f_label, phi_label),
        });
    }

    info!(reflections = data.len(), "Computing density map.");
    let map = transform_f_phi_to_map(&data, config)?;
    let statistics = map.statistics();

    info!(
        dims = ?map.dims(),
        rms = statistics.rms,
        "Map workflow complete."
    );
    Ok(MapResult {
        map,
        statistics,
        reflection_count: data.len(),
    })
}
