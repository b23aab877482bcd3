//! # Symmetry Module
//!
//! Crystallographic symmetry needed to index reciprocal space correctly.
//!
//! - [`op`] - Symmetry operators (integer rotation plus fractional translation),
//!   coordinate-triplet parsing and formatting, and their action on Miller indices
//! - [`spacegroup`] - Space groups built from Hall symbols or triplets, centering,
//!   systematic absences and the built-in table of common groups
//! - [`reducer`] - Maps any Miller index to its asymmetric-unit representative with
//!   the phase correction needed to rebuild the value at the original index
//!
//! The reciprocal asymmetric unit used throughout the crate is defined by the
//! reducer: an index belongs to the ASU when it is the largest of its symmetry
//! images (Friedel mates included) under lexicographic `(l, h, k)` ordering.

pub mod op;
pub mod reducer;
pub mod spacegroup;
mod table;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SymmetryError {
    #[error("Malformed coordinate triplet '{triplet}': {reason}")]
    MalformedTriplet { triplet: String, reason: String },

    #[error("Malformed Hall symbol '{symbol}': {reason}")]
    MalformedHall { symbol: String, reason: String },

    #[error("Operator '{0}' is not a rotation or rotoinversion")]
    NotInvertible(String),

    #[error("Operators do not close into a crystallographic group (more than {0} rotations)")]
    NotAGroup(usize),

    #[error("Unknown space group '{0}'")]
    UnknownSpaceGroup(String),
}
