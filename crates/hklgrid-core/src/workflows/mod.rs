//! # Workflows Module
//!
//! High-level entry points that drive the engine from any
//! [`ReflectionSource`](crate::core::io::source::ReflectionSource).
//!
//! - **Map Workflow** ([`map`]) - Amplitude and phase columns to a real-space density
//!   map, and maps back to ASU structure factors
//! - **Scaling Workflow** ([`scale`]) - Calculated structure factors scaled against
//!   observed amplitudes with an overall k and B tensor
//! - **Shell Workflow** ([`shells`]) - Per-resolution-shell counts and mean values
//!
//! Each workflow logs its phases through `tracing` and reports failures as
//! [`EngineError`](crate::engine::error::EngineError).

pub mod map;
pub mod scale;
pub mod shells;
