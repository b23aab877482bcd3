//! # Core Module
//!
//! Fundamental building blocks of the reciprocal-space engine.
//!
//! - **Data Models** ([`models`]) - Miller indices, reflection values, unit cells,
//!   asymmetric-unit reflection stores and dense grids
//! - **Symmetry** ([`symmetry`]) - Operators, space groups and the reducer that maps
//!   any Miller index to its asymmetric-unit representative
//! - **Reflection I/O** ([`io`]) - The reflection-source capability and the columnar
//!   reflection table with its CSV adapter
//!
//! Unit cells and space groups are immutable once constructed. Space groups are
//! shared through `Arc` so that every store, grid and table built from the same
//! source points at one operator table.

pub mod io;
pub mod models;
pub mod symmetry;
