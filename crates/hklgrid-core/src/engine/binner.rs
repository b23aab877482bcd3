use crate::core::io::source::MillerSource;
use crate::core::models::cell::UnitCell;
use crate::core::models::miller::MillerIndex;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Relative difference below which two 1/d² values count as the same resolution.
/// Symmetry mates computed in a different component order differ in the last bits.
const TIE_TOLERANCE: f64 = 1e-9;

fn is_tied(lower: f64, upper: f64) -> bool {
    upper - lower <= TIE_TOLERANCE * upper.abs()
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BinnerError {
    #[error("Number of bins must be at least 1")]
    NoBins,
    #[error("Cannot set up resolution bins without data")]
    NoData,
    #[error("Non-finite 1/d² value {value} at position {index}")]
    NonFiniteValue { index: usize, value: f64 },
    #[error("Cannot place {nbins} shells over {distinct} distinct 1/d² value(s)")]
    TooFewDistinctValues { nbins: usize, distinct: usize },
}

/// Strategy used to place the shell boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BinningMethod {
    /// Roughly the same number of reflections per shell.
    EqualCount,
    /// Equal steps in d*.
    Dstar,
    /// Equal steps in d*².
    Dstar2,
    /// Equal steps in d*³, i.e. shells of similar reciprocal-space volume.
    #[default]
    Dstar3,
}

impl BinningMethod {
    fn dstar_power(self) -> Option<f64> {
        match self {
            BinningMethod::EqualCount => None,
            BinningMethod::Dstar => Some(1.0),
            BinningMethod::Dstar2 => Some(2.0),
            BinningMethod::Dstar3 => Some(3.0),
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid binning method: '{0}'")]
pub struct ParseBinningMethodError(String);

impl FromStr for BinningMethod {
    type Err = ParseBinningMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "equal-count" | "equalcount" => Ok(BinningMethod::EqualCount),
            "dstar" => Ok(BinningMethod::Dstar),
            "dstar2" => Ok(BinningMethod::Dstar2),
            "dstar3" => Ok(BinningMethod::Dstar3),
            _ => Err(ParseBinningMethodError(s.to_string())),
        }
    }
}

impl fmt::Display for BinningMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinningMethod::EqualCount => "equal-count",
            BinningMethod::Dstar => "dstar",
            BinningMethod::Dstar2 => "dstar2",
            BinningMethod::Dstar3 => "dstar3",
        };
        write!(f, "{}", s)
    }
}

/// Resolution shells over 1/d².
///
/// `limits[i]` is the upper 1/d² boundary of shell `i`; the last limit is the largest
/// 1/d² seen during setup. Lookups outside the setup range are clamped to the first
/// or last shell.
#[derive(Debug, Clone, PartialEq)]
pub struct Binner {
    method: BinningMethod,
    cell: UnitCell,
    min_1_d2: f64,
    max_1_d2: f64,
    limits: Vec<f64>,
}

impl Binner {
    pub fn setup(
        nbins: usize,
        method: BinningMethod,
        source: &impl MillerSource,
    ) -> Result<Self, BinnerError> {
        Self::setup_from_1_d2(nbins, method, &source.make_1_d2_array(), *source.unit_cell())
    }

    pub fn setup_from_miller(
        nbins: usize,
        method: BinningMethod,
        indices: &[MillerIndex],
        cell: UnitCell,
    ) -> Result<Self, BinnerError> {
        let values: Vec<f64> = indices.iter().map(|&hkl| cell.calculate_1_d2(hkl)).collect();
        Self::setup_from_1_d2(nbins, method, &values, cell)
    }

    pub fn setup_from_1_d2(
        nbins: usize,
        method: BinningMethod,
        values: &[f64],
        cell: UnitCell,
    ) -> Result<Self, BinnerError> {
        if nbins == 0 {
            return Err(BinnerError::NoBins);
        }
        if values.is_empty() {
            return Err(BinnerError::NoData);
        }
        if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(BinnerError::NonFiniteValue { index, value });
        }

        let min_1_d2 = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max_1_d2 = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mut limits = match method.dstar_power() {
            Some(_) if nbins > 1 && is_tied(min_1_d2, max_1_d2) => {
                return Err(BinnerError::TooFewDistinctValues { nbins, distinct: 1 });
            }
            Some(power) => power_limits(nbins, power, min_1_d2, max_1_d2),
            None => quantile_limits(nbins, values)?,
        };
        if let Some(last) = limits.last_mut() {
            *last = max_1_d2;
        }

        debug!(
            %method,
            nbins,
            reflections = values.len(),
            min_1_d2,
            max_1_d2,
            "Set up resolution bins."
        );
        Ok(Self {
            method,
            cell,
            min_1_d2,
            max_1_d2,
            limits,
        })
    }

    pub fn method(&self) -> BinningMethod {
        self.method
    }

    pub fn unit_cell(&self) -> &UnitCell {
        &self.cell
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.limits.len()
    }

    pub fn limits(&self) -> &[f64] {
        &self.limits
    }

    pub fn min_1_d2(&self) -> f64 {
        self.min_1_d2
    }

    pub fn max_1_d2(&self) -> f64 {
        self.max_1_d2
    }

    #[inline]
    pub fn get_bin(&self, hkl: MillerIndex) -> usize {
        self.get_bin_from_1_d2(self.cell.calculate_1_d2(hkl))
    }

    /// Index of the first limit not below `inv_d2`, clamped to the last shell.
    #[inline]
    pub fn get_bin_from_1_d2(&self, inv_d2: f64) -> usize {
        let pos = self.limits.partition_point(|&limit| limit < inv_d2);
        pos.min(self.limits.len() - 1)
    }

    pub fn get_bins(&self, indices: &[MillerIndex]) -> Vec<usize> {
        indices.iter().map(|&hkl| self.get_bin(hkl)).collect()
    }

    pub fn get_bins_from_1_d2(&self, values: &[f64]) -> Vec<usize> {
        values.iter().map(|&x| self.get_bin_from_1_d2(x)).collect()
    }

    /// High-resolution edge of shell `i` in Ångströms.
    pub fn dmin_of_bin(&self, i: usize) -> Option<f64> {
        self.limits.get(i).map(|&limit| 1.0 / limit.sqrt())
    }

    /// Low-resolution edge of shell `i` in Ångströms. Infinite when the setup data
    /// contained the origin.
    pub fn dmax_of_bin(&self, i: usize) -> Option<f64> {
        if i >= self.limits.len() {
            return None;
        }
        let lower = if i == 0 {
            self.min_1_d2
        } else {
            self.limits[i - 1]
        };
        Some(1.0 / lower.sqrt())
    }
}

fn power_limits(nbins: usize, power: f64, min_1_d2: f64, max_1_d2: f64) -> Vec<f64> {
    let min_p = min_1_d2.powf(power / 2.0);
    let max_p = max_1_d2.powf(power / 2.0);
    let step = (max_p - min_p) / nbins as f64;
    (0..nbins)
        .map(|i| (min_p + (i + 1) as f64 * step).powf(2.0 / power))
        .collect()
}

/// Equal-count boundaries placed only where the sorted 1/d² value changes (beyond
/// [`TIE_TOLERANCE`]), so tied reflections share a shell and the limits are strictly
/// ascending.
fn quantile_limits(nbins: usize, values: &[f64]) -> Result<Vec<f64>, BinnerError> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();

    // Positions p where sorted[p] starts a new resolution.
    let changes: Vec<usize> = (1..n)
        .filter(|&p| !is_tied(sorted[p - 1], sorted[p]))
        .collect();
    if changes.len() + 1 < nbins {
        return Err(BinnerError::TooFewDistinctValues {
            nbins,
            distinct: changes.len() + 1,
        });
    }

    let mut limits = Vec::with_capacity(nbins);
    let mut lo = 0;
    for i in 0..nbins - 1 {
        let target = (i + 1) * n / nbins;
        let hi = changes.len() - (nbins - 1 - i);
        let mut j = changes.partition_point(|&p| p < target).clamp(lo, hi);
        if j > lo && target - changes[j - 1] <= changes[j].saturating_sub(target) {
            j -= 1;
        }
        let p = changes[j];
        limits.push(0.5 * (sorted[p - 1] + sorted[p]));
        lo = j + 1;
    }
    limits.push(sorted[n - 1]);
    Ok(limits)
}
