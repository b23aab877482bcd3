//! # Engine Module
//!
//! Computational components of the reciprocal-space engine, built on the models and
//! symmetry oracles of [`crate::core`].
//!
//! ## Architecture
//!
//! - **Grid Expansion** ([`expansion`]) - Grid sizing, expansion of ASU data onto
//!   dense reciprocal grids and reduction of grids back to ASU data
//! - **Fourier Engine** ([`fourier`]) - Reciprocal-space grids to real-space maps and
//!   back, with Hermitian half-packing and both axis orders
//! - **Binning** ([`binner`]) - Resolution shells over 1/d²
//! - **Scaling** ([`scaling`]) - Overall scale and symmetry-constrained anisotropic
//!   B-factor fitting between calculated and observed amplitudes
//! - **Configuration** ([`config`]) - Builders for map, scaling and binning parameters
//! - **Error Handling** ([`error`]) - The aggregated [`error::EngineError`]
//!
//! Grid expansion and the per-axis FFT line transforms run on `rayon` when the
//! `parallel` feature is enabled; results do not depend on it.

pub mod binner;
pub mod config;
pub mod error;
pub mod expansion;
pub mod fourier;
pub mod scaling;
#[cfg(test)]
pub(crate) mod test_data;
