//! Core data types shared by every engine component.
//!
//! - [`miller`] - Miller indices
//! - [`value`] - Reflection values and how they transform under symmetry
//! - [`cell`] - Unit cell metric
//! - [`asu_data`] - Sorted, symmetry-unique reflection sets
//! - [`grid`] - Dense reciprocal- and real-space grids with their layout rules

pub mod asu_data;
pub mod cell;
pub mod grid;
pub mod miller;
pub mod value;
