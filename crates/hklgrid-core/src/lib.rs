//! # hklgrid Core Library
//!
//! A reciprocal-space crystallographic data engine. It stores symmetry-unique
//! reflections, expands them onto dense reciprocal grids, transforms those grids to
//! real-space density maps and back, partitions reflections into resolution shells,
//! and fits overall scale and B-factor corrections between calculated and observed
//! amplitudes.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models and oracles: Miller indices,
//!   unit cells, symmetry operators and space groups, the symmetry reducer, the
//!   asymmetric-unit reflection store (`AsuData`), dense grids, and reflection tables
//!   with their CSV adapter.
//!
//! - **[`engine`]: The Logic Core.** Computational components built on the models:
//!   grid expansion and reduction, the Fourier engine, resolution binning, and the
//!   least-squares scaler, together with configuration builders and error types.
//!
//! - **[`workflows`]: The Public API.** Complete procedures driven from any reflection
//!   source: density maps from amplitudes and phases, amplitude scaling, and per-shell
//!   statistics.

pub mod core;
pub mod engine;
pub mod workflows;
