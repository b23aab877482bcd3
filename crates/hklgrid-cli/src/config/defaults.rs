use hklgrid::engine::binner::BinningMethod;
use hklgrid::engine::expansion::DEFAULT_SAMPLE_RATE;

pub struct DefaultsConfig {
    pub f_label: String,
    pub phi_label: String,
    pub sample_rate: f64,
    pub f_calc: String,
    pub phi_calc: String,
    pub f_obs: String,
    pub sigma_obs: String,
    pub bin_label: String,
    pub nbins: usize,
    pub binning_method: BinningMethod,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            f_label: "FWT".to_string(),
            phi_label: "PHWT".to_string(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            f_calc: "FC".to_string(),
            phi_calc: "PHIC".to_string(),
            f_obs: "FP".to_string(),
            sigma_obs: "SIGFP".to_string(),
            bin_label: "FP".to_string(),
            nbins: 20,
            binning_method: BinningMethod::Dstar3,
        }
    }
}
