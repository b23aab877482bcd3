use hklgrid::core::models::cell::UnitCell;
use hklgrid::core::symmetry::spacegroup::SpaceGroup;
use hklgrid::engine::config as core_config;
use hklgrid::workflows::scale::ScaleLabels;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Crystal {
    pub cell: UnitCell,
    pub spacegroup: Arc<SpaceGroup>,
}

pub struct MapAppConfig {
    pub input_path: PathBuf,
    pub crystal: Crystal,
    pub f_label: String,
    pub phi_label: String,
    pub core_config: core_config::MapConfig,
}

pub struct ScaleAppConfig {
    pub input_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub crystal: Crystal,
    pub labels: ScaleLabels,
    pub core_config: core_config::ScalingConfig,
}

pub struct BinAppConfig {
    pub input_path: PathBuf,
    pub crystal: Crystal,
    pub label: String,
    pub core_config: core_config::BinningConfig,
}

pub struct ColumnsAppConfig {
    pub input_path: PathBuf,
    pub crystal: Crystal,
    pub remove: Option<String>,
    pub output_path: Option<PathBuf>,
}
