use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::{BinAppConfig, ColumnsAppConfig, Crystal, MapAppConfig, ScaleAppConfig};
use crate::cli::{BinArgs, ColumnsArgs, InputArgs, MapArgs, ScaleArgs};
use crate::error::{CliError, Result};
use crate::utils::parser;
use hklgrid::core::models::cell::UnitCell;
use hklgrid::core::symmetry::spacegroup::find_spacegroup_by_name;
use hklgrid::engine::config as core_config;
use hklgrid::workflows::scale::ScaleLabels;
use std::str::FromStr;
use tracing::debug;

pub fn build_map_config(args: &MapArgs) -> Result<MapAppConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = load_file_config(&args.input)?;
    let crystal = build_crystal(&args.input, &file_config)?;
    let map_file = file_config.map.take().unwrap_or_default();

    let f_label = args
        .f_label
        .clone()
        .or(map_file.f_label)
        .unwrap_or(defaults.f_label);
    let phi_label = args
        .phi_label
        .clone()
        .or(map_file.phi_label)
        .unwrap_or(defaults.phi_label);

    let mut builder = core_config::MapConfigBuilder::new();

    // A sizing rule on the command line replaces both sizing keys from the file.
    let cli_grid = args
        .grid
        .as_deref()
        .map(parser::parse_grid_size)
        .transpose()
        .map_err(|e| CliError::Argument(e.to_string()))?;
    builder = match (cli_grid, args.sample_rate) {
        (Some(size), _) => builder.exact_size(size),
        (None, Some(rate)) => builder.sample_rate(rate),
        (None, None) => match (map_file.grid_size, map_file.sample_rate) {
            (Some(size), None) => builder.exact_size(size),
            (None, rate) => builder.sample_rate(rate.unwrap_or(defaults.sample_rate)),
            (Some(_), Some(_)) => {
                return Err(CliError::Config(
                    "`map` cannot set both `sample-rate` and `grid-size`".to_string(),
                ));
            }
        },
    };

    let axis_order = match args.axis_order {
        Some(order) => Some(order),
        None => parse_file_value("map.axis-order", map_file.axis_order.as_deref())?,
    };
    if let Some(order) = axis_order {
        builder = builder.axis_order(order);
    }
    let packing = match args.packing {
        Some(packing) => Some(packing),
        None => parse_file_value("map.packing", map_file.packing.as_deref())?,
    };
    if let Some(packing) = packing {
        builder = builder.packing(packing);
    }

    let core_config = builder
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(MapAppConfig {
        input_path: args.input.input.clone(),
        crystal,
        f_label,
        phi_label,
        core_config,
    })
}

pub fn build_scale_config(args: &ScaleArgs) -> Result<ScaleAppConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = load_file_config(&args.input)?;
    let crystal = build_crystal(&args.input, &file_config)?;
    let scale_file = file_config.scale.take().unwrap_or_default();

    let labels = ScaleLabels {
        f_calc: args
            .f_calc
            .clone()
            .or(scale_file.f_calc)
            .unwrap_or(defaults.f_calc),
        phi_calc: args
            .phi_calc
            .clone()
            .or(scale_file.phi_calc)
            .unwrap_or(defaults.phi_calc),
        f_obs: args
            .f_obs
            .clone()
            .or(scale_file.f_obs)
            .unwrap_or(defaults.f_obs),
        sigma_obs: args
            .sigma_obs
            .clone()
            .or(scale_file.sigma_obs)
            .unwrap_or(defaults.sigma_obs),
    };

    let mut builder = core_config::ScalingConfigBuilder::new();
    if let Some(iterations) = args.max_iterations.or(scale_file.max_iterations) {
        builder = builder.max_iterations(iterations);
    }
    if let Some(threshold) = scale_file.convergence_threshold {
        builder = builder.convergence_threshold(threshold);
    }
    if let Some(damping) = scale_file.initial_damping {
        builder = builder.initial_damping(damping);
    }
    if args.isotropic {
        builder = builder.anisotropic(false);
    } else if let Some(anisotropic) = scale_file.anisotropic {
        builder = builder.anisotropic(anisotropic);
    }
    if args.no_sigma {
        builder = builder.use_sigma(false);
    } else if let Some(use_sigma) = scale_file.use_sigma {
        builder = builder.use_sigma(use_sigma);
    }

    let core_config = builder
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(ScaleAppConfig {
        input_path: args.input.input.clone(),
        output_path: args.output.clone(),
        crystal,
        labels,
        core_config,
    })
}

pub fn build_bin_config(args: &BinArgs) -> Result<BinAppConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = load_file_config(&args.input)?;
    let crystal = build_crystal(&args.input, &file_config)?;
    let bin_file = file_config.bin.take().unwrap_or_default();

    let label = args
        .label
        .clone()
        .or(bin_file.label)
        .unwrap_or(defaults.bin_label);
    let method = match args.method {
        Some(method) => method,
        None => parse_file_value("bin.method", bin_file.method.as_deref())?
            .unwrap_or(defaults.binning_method),
    };

    let core_config = core_config::BinningConfigBuilder::new()
        .nbins(args.nbins.or(bin_file.nbins).unwrap_or(defaults.nbins))
        .method(method)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(BinAppConfig {
        input_path: args.input.input.clone(),
        crystal,
        label,
        core_config,
    })
}

pub fn build_columns_config(args: &ColumnsArgs) -> Result<ColumnsAppConfig> {
    let file_config = load_file_config(&args.input)?;
    let crystal = build_crystal(&args.input, &file_config)?;
    Ok(ColumnsAppConfig {
        input_path: args.input.input.clone(),
        crystal,
        remove: args.remove.clone(),
        output_path: args.output.clone(),
    })
}

fn load_file_config(input: &InputArgs) -> Result<FileConfig> {
    let file_config = if let Some(config_path) = &input.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };
    apply_set_values(file_config, &input.set_values)
}

fn build_crystal(input: &InputArgs, file_config: &FileConfig) -> Result<Crystal> {
    let crystal_file = file_config.crystal.clone().unwrap_or_default();

    let parameters = match input.cell.as_deref() {
        Some(cell) => parser::parse_cell(cell).map_err(|e| CliError::Argument(e.to_string()))?,
        None => crystal_file.cell.ok_or_else(|| {
            CliError::Config(
                "No unit cell given. Pass --cell or set `cell` in the [crystal] section."
                    .to_string(),
            )
        })?,
    };
    let [a, b, c, alpha, beta, gamma] = parameters;
    let cell = UnitCell::new(a, b, c, alpha, beta, gamma)
        .map_err(|e| CliError::Config(e.to_string()))?;

    let name = input
        .space_group
        .clone()
        .or(crystal_file.space_group)
        .ok_or_else(|| {
            CliError::Config(
                "No space group given. Pass --space-group or set `space-group` in the [crystal] section."
                    .to_string(),
            )
        })?;
    let spacegroup =
        find_spacegroup_by_name(&name).map_err(|e| CliError::Config(e.to_string()))?;

    debug!(cell = ?cell.parameters(), spacegroup = spacegroup.name(), "Resolved crystal.");
    Ok(Crystal { cell, spacegroup })
}

fn parse_file_value<T: FromStr>(key: &str, value: Option<&str>) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    value
        .map(|s| {
            s.parse::<T>()
                .map_err(|e| CliError::Config(format!("Invalid value for {}: {}", key, e)))
        })
        .transpose()
}

fn parse_set_value<T: FromStr>(key: &str, value_str: &str, kind: &str) -> Result<T> {
    value_str.parse().map_err(|_| {
        CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value_str))
    })
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    if set_values.is_empty() {
        return Ok(config);
    }
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key {
            "crystal.space-group" => {
                config
                    .crystal
                    .get_or_insert_with(Default::default)
                    .space_group = Some(value_str.to_string());
            }
            "map.f-label" => {
                config.map.get_or_insert_with(Default::default).f_label =
                    Some(value_str.to_string());
            }
            "map.phi-label" => {
                config.map.get_or_insert_with(Default::default).phi_label =
                    Some(value_str.to_string());
            }
            "map.sample-rate" => {
                let map = config.map.get_or_insert_with(Default::default);
                map.sample_rate = Some(parse_set_value(key, value_str, "float")?);
                map.grid_size = None;
            }
            "map.axis-order" => {
                config.map.get_or_insert_with(Default::default).axis_order =
                    Some(value_str.to_string());
            }
            "map.packing" => {
                config.map.get_or_insert_with(Default::default).packing =
                    Some(value_str.to_string());
            }
            "scale.max-iterations" => {
                config.scale.get_or_insert_with(Default::default).max_iterations =
                    Some(parse_set_value(key, value_str, "integer")?);
            }
            "scale.convergence-threshold" => {
                config
                    .scale
                    .get_or_insert_with(Default::default)
                    .convergence_threshold = Some(parse_set_value(key, value_str, "float")?);
            }
            "scale.anisotropic" => {
                config.scale.get_or_insert_with(Default::default).anisotropic =
                    Some(parse_set_value(key, value_str, "boolean")?);
            }
            "scale.use-sigma" => {
                config.scale.get_or_insert_with(Default::default).use_sigma =
                    Some(parse_set_value(key, value_str, "boolean")?);
            }
            "bin.label" => {
                config.bin.get_or_insert_with(Default::default).label =
                    Some(value_str.to_string());
            }
            "bin.nbins" => {
                config.bin.get_or_insert_with(Default::default).nbins =
                    Some(parse_set_value(key, value_str, "integer")?);
            }
            "bin.method" => {
                config.bin.get_or_insert_with(Default::default).method =
                    Some(value_str.to_string());
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
