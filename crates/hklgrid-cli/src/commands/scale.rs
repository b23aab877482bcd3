use crate::cli::ScaleArgs;
use crate::config::builder::build_scale_config;
use crate::error::Result;
use crate::utils::table::{load_table, save_table, values_for_rows};
use hklgrid::core::io::table::ReflectionTable;
use hklgrid::engine::error::EngineError;
use hklgrid::workflows;
use hklgrid::workflows::scale::{ScaleLabels, ScaleResult};
use tracing::{info, warn};

pub fn run(args: ScaleArgs) -> Result<()> {
    info!("Building scaling configuration...");
    let config = build_scale_config(&args)?;
    let mut table = load_table(&config.input_path, &config.crystal)?;

    println!(
        "Scaling '{}' against '{}'...",
        config.labels.f_calc, config.labels.f_obs
    );
    let result = workflows::scale::run(&table, &config.labels, &config.core_config)?;

    let b = result.b_overall;
    println!(
        "Refinement finished after {} iteration(s) using {} reflections.",
        result.report.iterations, result.point_count
    );
    println!("k_overall = {:.6}", result.k_overall);
    println!(
        "B_overall = [{:.4} {:.4} {:.4}; {:.4} {:.4} {:.4}] (B11 B22 B33; B12 B13 B23)",
        b[(0, 0)],
        b[(1, 1)],
        b[(2, 2)],
        b[(0, 1)],
        b[(0, 2)],
        b[(1, 2)]
    );
    println!("R-factor = {:.4}", result.r_factor);

    match &config.output_path {
        Some(path) => {
            let (f_label, phi_label) = append_scaled_columns(&mut table, &config.labels, &result)?;
            save_table(&table, path)?;
            println!(
                "Scaled columns '{}' and '{}' written to: {}",
                f_label,
                phi_label,
                path.display()
            );
        }
        None => warn!("No output path given; scaled values were not written."),
    }
    Ok(())
}

/// Adds (or overwrites) `<F>_SCALED` and `<PHI>_SCALED` columns holding the scaled
/// calculated structure factors. Returns the two labels.
fn append_scaled_columns(
    table: &mut ReflectionTable,
    labels: &ScaleLabels,
    result: &ScaleResult,
) -> Result<(String, String)> {
    let f_label = format!("{}_SCALED", labels.f_calc);
    let phi_label = format!("{}_SCALED", labels.phi_calc);

    let amplitudes = values_for_rows(table, &result.scaled, |f| f.norm());
    let phases = values_for_rows(table, &result.scaled, |f| f.arg().to_degrees());

    for (label, column_type, values) in [(&f_label, 'F', amplitudes), (&phi_label, 'P', phases)] {
        let position = match table.column_position(label) {
            Some(position) => position,
            None => table
                .add_column(label, column_type, 0, None)
                .map_err(EngineError::from)?,
        };
        table
            .set_column_values(position, &values)
            .map_err(EngineError::from)?;
    }
    Ok((f_label, phi_label))
}
