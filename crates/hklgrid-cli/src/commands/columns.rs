use crate::cli::ColumnsArgs;
use crate::config::builder::build_columns_config;
use crate::error::{CliError, Result};
use crate::utils::table::{load_table, save_table};
use hklgrid::core::io::table::ReflectionTable;
use hklgrid::engine::error::EngineError;
use tracing::info;

pub fn run(args: ColumnsArgs) -> Result<()> {
    let config = build_columns_config(&args)?;
    let mut table = load_table(&config.input_path, &config.crystal)?;

    print_columns(&table);

    if let Some(label) = &config.remove {
        let position = table.column_position(label).ok_or_else(|| {
            CliError::Argument(format!("No column labelled '{}' in the table", label))
        })?;
        let removed = table.remove_column(position).map_err(EngineError::from)?;
        info!(label = %removed.label, "Removed column.");

        let output = config.output_path.as_ref().ok_or_else(|| {
            CliError::Argument("--remove requires --output".to_string())
        })?;
        save_table(&table, output)?;
        println!(
            "Removed column '{}'; table written to: {}",
            removed.label,
            output.display()
        );
    }
    Ok(())
}

fn print_columns(table: &ReflectionTable) {
    println!("{} reflections, {} columns", table.row_count(), table.column_count());
    println!("{:>3}  {:<16} {:<4} {}", "#", "label", "type", "dataset");
    for (i, column) in table.columns().iter().enumerate() {
        println!(
            "{:>3}  {:<16} {:<4} {}",
            i, column.label, column.column_type, column.dataset_id
        );
    }
}
