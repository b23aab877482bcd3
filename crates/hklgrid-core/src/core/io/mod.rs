//! Provides reflection data sources and their text adapters.
//!
//! This module defines the trait-based interface through which the engine obtains
//! Miller indices and reflection columns, an in-memory columnar reflection table
//! modelled on MTZ files, and a CSV reader/writer for that table.

pub mod csv;
pub mod source;
pub mod table;
