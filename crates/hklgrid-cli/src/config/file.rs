use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileCrystalConfig {
    pub cell: Option<[f64; 6]>,
    pub space_group: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileMapConfig {
    pub f_label: Option<String>,
    pub phi_label: Option<String>,
    pub sample_rate: Option<f64>,
    pub grid_size: Option<[usize; 3]>,
    pub axis_order: Option<String>,
    pub packing: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileScaleConfig {
    pub f_calc: Option<String>,
    pub phi_calc: Option<String>,
    pub f_obs: Option<String>,
    pub sigma_obs: Option<String>,
    pub max_iterations: Option<usize>,
    pub convergence_threshold: Option<f64>,
    pub initial_damping: Option<f64>,
    pub anisotropic: Option<bool>,
    pub use_sigma: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileBinConfig {
    pub label: Option<String>,
    pub nbins: Option<usize>,
    pub method: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub crystal: Option<FileCrystalConfig>,
    pub map: Option<FileMapConfig>,
    pub scale: Option<FileScaleConfig>,
    pub bin: Option<FileBinConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_section() {
        let config = FileConfig::from_toml_str(
            r#"
            [crystal]
            cell = [40.0, 50.0, 60.0, 90.0, 100.0, 90.0]
            space-group = "C 1 2 1"

            [map]
            f-label = "FWT"
            grid-size = [48, 60, 72]
            axis-order = "zyx"

            [scale]
            max-iterations = 25
            anisotropic = false

            [bin]
            nbins = 12
            method = "equal-count"
            "#,
        )
        .unwrap();
        let crystal = config.crystal.unwrap();
        assert_eq!(crystal.cell.unwrap()[4], 100.0);
        assert_eq!(crystal.space_group.as_deref(), Some("C 1 2 1"));
        assert_eq!(config.map.unwrap().grid_size, Some([48, 60, 72]));
        assert_eq!(config.scale.unwrap().anisotropic, Some(false));
        assert_eq!(config.bin.unwrap().method.as_deref(), Some("equal-count"));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(FileConfig::from_toml_str("[map]\nresolution = 2.0\n").is_err());
        assert!(FileConfig::from_toml_str("[refine]\ncycles = 3\n").is_err());
    }

    #[test]
    fn from_file_wraps_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[crystal]\ncell = \"not a list\"\n").unwrap();
        assert!(matches!(
            FileConfig::from_file(&path),
            Err(CliError::FileParsing { .. })
        ));
        assert!(matches!(
            FileConfig::from_file(&dir.path().join("missing.toml")),
            Err(CliError::Io(_))
        ));
    }
}
