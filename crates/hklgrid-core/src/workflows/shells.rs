use crate::core::io::source::ReflectionSource;
use crate::engine::binner::Binner;
use crate::engine::config::BinningConfig;
use crate::engine::error::EngineError;
use tracing::{info, instrument};

/// Summary of one resolution shell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShellStatistics {
    pub bin: usize,
    /// Low-resolution edge in Ångströms.
    pub dmax: f64,
    /// High-resolution edge in Ångströms.
    pub dmin: f64,
    pub count: usize,
    pub mean_value: f64,
}

/// Bins the reflections of a value column and reports count and mean per shell.
///
/// Empty shells are reported with a count of zero and a NaN mean.
#[instrument(skip_all, name = "shells_workflow")]
pub fn run(
    source: &impl ReflectionSource,
    label: &str,
    config: &BinningConfig,
) -> Result<Vec<ShellStatistics>, EngineError> {
    info!(label, nbins = config.nbins, method = %config.method, "Binning reflections.");
    let data = source.get_values(label)?;
    let binner = Binner::setup(config.nbins, config.method, &data)?;
    let bins = binner.get_bins(&data.miller_array());

    let mut sums = vec![0.0; binner.size()];
    let mut counts = vec![0usize; binner.size()];
    for (bin, item) in bins.into_iter().zip(data.iter()) {
        sums[bin] += item.value;
        counts[bin] += 1;
    }

    let shells = (0..binner.size())
        .map(|bin| ShellStatistics {
            bin,
            dmax: binner.dmax_of_bin(bin).unwrap_or(f64::INFINITY),
            dmin: binner.dmin_of_bin(bin).unwrap_or(0.0),
            count: counts[bin],
            mean_value: if counts[bin] > 0 {
                sums[bin] / counts[bin] as f64
            } else {
                f64::NAN
            },
        })
        .collect::<Vec<_>>();
    info!(shells = shells.len(), reflections = data.len(), "Shell workflow complete.");
    Ok(shells)
}
