use super::binner::BinningMethod;
use crate::core::models::grid::{AxisOrder, Packing, validate_layout};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// How the reciprocal grid size is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridSizing {
    /// Oversampling factor relative to the highest index, rounded up to an FFT-friendly size.
    SampleRate(f64),
    /// Explicit grid size along h, k and l.
    Exact([usize; 3]),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub sizing: GridSizing,
    pub axis_order: AxisOrder,
    pub packing: Packing,
}

#[derive(Default)]
pub struct MapConfigBuilder {
    sample_rate: Option<f64>,
    exact_size: Option<[usize; 3]>,
    axis_order: Option<AxisOrder>,
    packing: Option<Packing>,
}

impl MapConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_rate(mut self, rate: f64) -> Self {
        self.sample_rate = Some(rate);
        self
    }
    pub fn exact_size(mut self, size: [usize; 3]) -> Self {
        self.exact_size = Some(size);
        self
    }
    pub fn axis_order(mut self, order: AxisOrder) -> Self {
        self.axis_order = Some(order);
        self
    }
    pub fn packing(mut self, packing: Packing) -> Self {
        self.packing = Some(packing);
        self
    }

    pub fn build(self) -> Result<MapConfig, ConfigError> {
        let sizing = match (self.sample_rate, self.exact_size) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::InvalidParameter {
                    name: "sample_rate",
                    reason: "cannot be combined with an exact grid size".to_string(),
                });
            }
            (Some(rate), None) => {
                if !(rate.is_finite() && rate > 0.0) {
                    return Err(ConfigError::InvalidParameter {
                        name: "sample_rate",
                        reason: format!("must be a positive number, got {}", rate),
                    });
                }
                GridSizing::SampleRate(rate)
            }
            (None, Some(size)) => {
                if size.contains(&0) {
                    return Err(ConfigError::InvalidParameter {
                        name: "exact_size",
                        reason: format!("every dimension must be positive, got {:?}", size),
                    });
                }
                GridSizing::Exact(size)
            }
            (None, None) => return Err(ConfigError::MissingParameter("sample_rate")),
        };

        let axis_order = self.axis_order.unwrap_or_default();
        let packing = self.packing.unwrap_or_default();
        validate_layout(packing, axis_order).map_err(|e| ConfigError::InvalidParameter {
            name: "packing",
            reason: e.to_string(),
        })?;

        Ok(MapConfig {
            sizing,
            axis_order,
            packing,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalingConfig {
    pub max_iterations: usize,
    /// Relative residual decrease below which the fit is considered converged.
    pub convergence_threshold: f64,
    pub initial_damping: f64,
    /// Weight points by 1/σ² when a positive sigma is available.
    pub use_sigma: bool,
    /// Refine the symmetry-allowed anisotropic B tensor instead of a single B.
    pub anisotropic: bool,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            convergence_threshold: 1e-9,
            initial_damping: 1e-3,
            use_sigma: true,
            anisotropic: true,
        }
    }
}

#[derive(Default)]
pub struct ScalingConfigBuilder {
    max_iterations: Option<usize>,
    convergence_threshold: Option<f64>,
    initial_damping: Option<f64>,
    use_sigma: Option<bool>,
    anisotropic: Option<bool>,
}

impl ScalingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = Some(iterations);
        self
    }
    pub fn convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = Some(threshold);
        self
    }
    pub fn initial_damping(mut self, damping: f64) -> Self {
        self.initial_damping = Some(damping);
        self
    }
    pub fn use_sigma(mut self, use_sigma: bool) -> Self {
        self.use_sigma = Some(use_sigma);
        self
    }
    pub fn anisotropic(mut self, anisotropic: bool) -> Self {
        self.anisotropic = Some(anisotropic);
        self
    }

    pub fn build(self) -> Result<ScalingConfig, ConfigError> {
        let defaults = ScalingConfig::default();
        let config = ScalingConfig {
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
            convergence_threshold: self
                .convergence_threshold
                .unwrap_or(defaults.convergence_threshold),
            initial_damping: self.initial_damping.unwrap_or(defaults.initial_damping),
            use_sigma: self.use_sigma.unwrap_or(defaults.use_sigma),
            anisotropic: self.anisotropic.unwrap_or(defaults.anisotropic),
        };
        if config.max_iterations == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "max_iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(config.convergence_threshold.is_finite() && config.convergence_threshold >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "convergence_threshold",
                reason: format!("must be non-negative, got {}", config.convergence_threshold),
            });
        }
        if !(config.initial_damping.is_finite() && config.initial_damping > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "initial_damping",
                reason: format!("must be positive, got {}", config.initial_damping),
            });
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinningConfig {
    pub nbins: usize,
    pub method: BinningMethod,
}

#[derive(Default)]
pub struct BinningConfigBuilder {
    nbins: Option<usize>,
    method: Option<BinningMethod>,
}

impl BinningConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nbins(mut self, nbins: usize) -> Self {
        self.nbins = Some(nbins);
        self
    }
    pub fn method(mut self, method: BinningMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn build(self) -> Result<BinningConfig, ConfigError> {
        let nbins = self.nbins.ok_or(ConfigError::MissingParameter("nbins"))?;
        if nbins == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "nbins",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(BinningConfig {
            nbins,
            method: self.method.unwrap_or_default(),
        })
    }
}
