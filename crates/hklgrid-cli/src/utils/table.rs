use crate::config::models::Crystal;
use crate::error::{CliError, Result};
use hklgrid::core::io::csv::{read_csv, write_csv};
use hklgrid::core::io::source::MillerSource;
use hklgrid::core::io::table::ReflectionTable;
use hklgrid::core::models::asu_data::AsuData;
use hklgrid::core::models::value::SymmetricValue;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub fn load_table(path: &Path, crystal: &Crystal) -> Result<ReflectionTable> {
    info!("Loading reflection table from {:?}", path);
    read_csv(path, crystal.cell, Arc::clone(&crystal.spacegroup)).map_err(|e| {
        CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        }
    })
}

pub fn save_table(table: &ReflectionTable, path: &Path) -> Result<()> {
    info!("Writing reflection table to {:?}", path);
    write_csv(table, path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

/// Values of `data` at every row of `table`, reconstructed through symmetry;
/// rows without a counterpart get NaN.
pub fn values_for_rows<T: SymmetricValue>(
    table: &ReflectionTable,
    data: &AsuData<T>,
    extract: impl Fn(T) -> f64,
) -> Vec<f32> {
    table
        .miller_indices()
        .into_iter()
        .map(|hkl| data.get(hkl).map_or(f32::NAN, |v| extract(v) as f32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hklgrid::core::models::cell::UnitCell;
    use hklgrid::core::models::miller::MillerIndex;
    use hklgrid::core::symmetry::spacegroup::find_spacegroup_by_name;

    fn crystal() -> Crystal {
        Crystal {
            cell: UnitCell::new(30.0, 40.0, 50.0, 90.0, 90.0, 90.0).unwrap(),
            spacegroup: find_spacegroup_by_name("P 21 21 21").unwrap(),
        }
    }

    #[test]
    fn values_for_rows_uses_symmetry_equivalents() {
        let crystal = crystal();
        let mut table = ReflectionTable::new(crystal.cell, Arc::clone(&crystal.spacegroup));
        table.add_column("I", 'J', 0, None).unwrap();
        table.push_row(MillerIndex::new(1, 2, 3), &[1.0]).unwrap();
        table.push_row(MillerIndex::new(-1, 2, -3), &[1.0]).unwrap();
        table.push_row(MillerIndex::new(4, 4, 4), &[1.0]).unwrap();

        let data = AsuData::from_reflections(
            crystal.cell,
            Arc::clone(&crystal.spacegroup),
            vec![(MillerIndex::new(1, 2, 3), 7.5f64)],
        )
        .unwrap();
        let values = values_for_rows(&table, &data, |v| v);
        assert_eq!(values[0], 7.5);
        assert_eq!(values[1], 7.5);
        assert!(values[2].is_nan());
    }

    #[test]
    fn load_table_reports_parse_failures_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "A,B,C\n1,2,3\n").unwrap();
        let result = load_table(&path, &crystal());
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }
}
