use thiserror::Error;

use super::binner::BinnerError;
use super::config::ConfigError;
use super::scaling::ScalingError;
use crate::core::io::table::TableError;
use crate::core::models::asu_data::AsuDataError;
use crate::core::models::cell::CellError;
use crate::core::models::grid::GridError;
use crate::core::symmetry::SymmetryError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Invalid unit cell: {source}")]
    Cell {
        #[from]
        source: CellError,
    },

    #[error("Symmetry error: {source}")]
    Symmetry {
        #[from]
        source: SymmetryError,
    },

    #[error("Reflection data error: {source}")]
    AsuData {
        #[from]
        source: AsuDataError,
    },

    #[error("Grid error: {source}")]
    Grid {
        #[from]
        source: GridError,
    },

    #[error("Binning failed: {source}")]
    Binner {
        #[from]
        source: BinnerError,
    },

    #[error("Scaling failed: {source}")]
    Scaling {
        #[from]
        source: ScalingError,
    },

    #[error("Reflection table error: {source}")]
    Table {
        #[from]
        source: TableError,
    },

    #[error("Workflow phase '{phase}' failed: {reason}")]
    PhaseFailed { phase: &'static str, reason: String },
}
