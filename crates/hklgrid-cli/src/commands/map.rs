use crate::cli::MapArgs;
use crate::config::builder::build_map_config;
use crate::error::Result;
use crate::utils::table::load_table;
use hklgrid::workflows;
use tracing::info;

pub fn run(args: MapArgs) -> Result<()> {
    info!("Building map configuration...");
    let config = build_map_config(&args)?;
    let table = load_table(&config.input_path, &config.crystal)?;

    println!(
        "Computing density map from '{}' and '{}'...",
        config.f_label, config.phi_label
    );
    let result = workflows::map::run(
        &table,
        &config.f_label,
        &config.phi_label,
        &config.core_config,
    )?;

    let [nh, nk, nl] = result.map.size_hkl();
    let stats = result.statistics;
    println!("Reflections used: {}", result.reflection_count);
    println!(
        "Grid: {} x {} x {} ({} order)",
        nh,
        nk,
        nl,
        result.map.order()
    );
    println!(
        "Density: min {:.5}  max {:.5}  mean {:.5}  rms {:.5}",
        stats.min, stats.max, stats.mean, stats.rms
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{input_args, write_reflections};
    use crate::error::CliError;

    fn map_args(input: std::path::PathBuf) -> MapArgs {
        MapArgs {
            input: input_args(input),
            f_label: Some("FC".to_string()),
            phi_label: Some("PHIC".to_string()),
            sample_rate: None,
            grid: Some("12,12,12".to_string()),
            axis_order: None,
            packing: None,
        }
    }

    #[test]
    fn map_command_runs_on_a_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_reflections(dir.path());
        assert!(run(map_args(path)).is_ok());
    }

    #[test]
    fn map_command_reports_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_reflections(dir.path());
        let mut args = map_args(path);
        args.phi_label = Some("PHWT".to_string());
        assert!(matches!(run(args), Err(CliError::Engine(_))));
    }
}
