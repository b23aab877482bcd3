use crate::cli::BinArgs;
use crate::config::builder::build_bin_config;
use crate::error::Result;
use crate::utils::table::load_table;
use hklgrid::workflows;
use tracing::info;

pub fn run(args: BinArgs) -> Result<()> {
    info!("Building binning configuration...");
    let config = build_bin_config(&args)?;
    let table = load_table(&config.input_path, &config.crystal)?;

    let shells = workflows::shells::run(&table, &config.label, &config.core_config)?;

    println!(
        "Resolution shells for '{}' ({} bins, {})",
        config.label,
        shells.len(),
        config.core_config.method
    );
    println!("{:>4} {:>9} {:>9} {:>8} {:>12}", "bin", "dmax", "dmin", "count", "mean");
    for shell in &shells {
        println!(
            "{:>4} {:>9.3} {:>9.3} {:>8} {:>12.4}",
            shell.bin + 1,
            shell.dmax,
            shell.dmin,
            shell.count,
            shell.mean_value
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{input_args, write_reflections};
    use crate::error::CliError;
    use hklgrid::engine::binner::BinningMethod;

    #[test]
    fn bin_command_prints_shells() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_reflections(dir.path());
        let args = BinArgs {
            input: input_args(path),
            label: Some("FP".to_string()),
            nbins: Some(4),
            method: Some(BinningMethod::EqualCount),
        };
        assert!(run(args).is_ok());
    }

    #[test]
    fn bin_command_rejects_zero_bins() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_reflections(dir.path());
        let args = BinArgs {
            input: input_args(path),
            label: None,
            nbins: Some(0),
            method: None,
        };
        assert!(matches!(run(args), Err(CliError::Config(_))));
    }
}
