//! CSV adapter for [`ReflectionTable`].
//!
//! The header row names each column as `LABEL:TYPE` (for example `FP:F`), with the
//! type defaulting to `R`. The first three columns must be H, K and L. Empty fields
//! and `NaN` are read as missing values and missing values are written as empty
//! fields. Lines starting with `#` are ignored.

use super::table::{Column, INDEX_COLUMNS, ReflectionTable, TableError};
use crate::core::models::cell::UnitCell;
use crate::core::symmetry::spacegroup::SpaceGroup;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub fn read_csv(
    path: &Path,
    cell: UnitCell,
    spacegroup: Arc<SpaceGroup>,
) -> Result<ReflectionTable, TableError> {
    let file = File::open(path).map_err(|e| TableError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    let table = read_csv_from(file, &path.to_string_lossy(), cell, spacegroup)?;
    debug!(
        path = %path.display(),
        rows = table.row_count(),
        columns = table.column_count(),
        "Read reflection table."
    );
    Ok(table)
}

pub fn read_csv_from(
    reader: impl Read,
    source_name: &str,
    cell: UnitCell,
    spacegroup: Arc<SpaceGroup>,
) -> Result<ReflectionTable, TableError> {
    let csv_error = |e| TableError::Csv {
        path: source_name.to_string(),
        source: e,
    };
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .trim(::csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers().map_err(csv_error)?.clone();
    let columns = headers
        .iter()
        .map(parse_header)
        .collect::<Result<Vec<_>, _>>()?;
    let index_labels: Vec<&str> = columns
        .iter()
        .take(INDEX_COLUMNS)
        .map(|c| c.label.as_str())
        .collect();
    if index_labels != ["H", "K", "L"] {
        return Err(TableError::InvalidHeader(
            headers.iter().collect::<Vec<_>>().join(","),
        ));
    }

    let mut values = Vec::new();
    let mut rows = 0;
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        for (field, column) in record.iter().zip(&columns) {
            values.push(parse_value(field).ok_or_else(|| TableError::InvalidValue {
                row: rows + 1,
                column: column.label.clone(),
                value: field.to_string(),
            })?);
        }
        rows += 1;
    }

    let extra_columns = columns.into_iter().skip(INDEX_COLUMNS).collect();
    ReflectionTable::from_parts(cell, spacegroup, extra_columns, rows, values)
}

pub fn write_csv(table: &ReflectionTable, path: &Path) -> Result<(), TableError> {
    let file = File::create(path).map_err(|e| TableError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    write_csv_to(table, file, &path.to_string_lossy())?;
    debug!(path = %path.display(), rows = table.row_count(), "Wrote reflection table.");
    Ok(())
}

pub fn write_csv_to(
    table: &ReflectionTable,
    writer: impl Write,
    target_name: &str,
) -> Result<(), TableError> {
    let csv_error = |e| TableError::Csv {
        path: target_name.to_string(),
        source: e,
    };
    let mut writer = ::csv::Writer::from_writer(writer);
    writer
        .write_record(
            table
                .columns()
                .iter()
                .map(|c| format!("{}:{}", c.label, c.column_type)),
        )
        .map_err(csv_error)?;
    for row in table.array().rows() {
        writer
            .write_record(row.iter().map(|&v| format_value(v)))
            .map_err(csv_error)?;
    }
    writer.flush().map_err(|e| TableError::Io {
        path: target_name.to_string(),
        source: e,
    })
}

fn parse_header(field: &str) -> Result<Column, TableError> {
    let (label, column_type) = match field.split_once(':') {
        Some((label, code)) => {
            let mut chars = code.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => (label, c),
                _ => return Err(TableError::InvalidHeader(field.to_string())),
            }
        }
        None => (field, 'R'),
    };
    if label.is_empty() {
        return Err(TableError::InvalidHeader(field.to_string()));
    }
    Ok(Column {
        label: label.to_string(),
        column_type,
        dataset_id: 0,
    })
}

fn parse_value(field: &str) -> Option<f32> {
    if field.is_empty() || field.eq_ignore_ascii_case("nan") || field == "?" {
        return Some(f32::NAN);
    }
    field.parse::<f32>().ok()
}

fn format_value(value: f32) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::miller::MillerIndex;
    use crate::core::symmetry::spacegroup::find_spacegroup_by_name;
    use std::fs;
    use tempfile::tempdir;

    fn cell() -> UnitCell {
        UnitCell::new(30.0, 40.0, 50.0, 90.0, 90.0, 90.0).unwrap()
    }

    const SAMPLE: &str = "\
# comment line
H:H,K:H,L:H,FP:F,SIGFP:Q,PHIC:P
1,2,3,10.5,0.5,30
2,0,4,20,,180
0,1,1,NaN,?,0
";

    #[test]
    fn read_csv_parses_labels_types_and_missing_values() {
        let sg = find_spacegroup_by_name("P 21 21 21").unwrap();
        let table = read_csv_from(SAMPLE.as_bytes(), "sample", cell(), sg).unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_count(), 6);
        assert_eq!(table.columns()[4].label, "SIGFP");
        assert_eq!(table.columns()[4].column_type, 'Q');
        let sigmas = table.column_values(4).unwrap();
        assert_eq!(sigmas[0], 0.5);
        assert!(sigmas[1].is_nan());
        assert!(sigmas[2].is_nan());
    }

    #[test]
    fn write_then_read_preserves_table_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.csv");
        let sg = find_spacegroup_by_name("P 21 21 21").unwrap();
        let table = read_csv_from(SAMPLE.as_bytes(), "sample", cell(), Arc::clone(&sg)).unwrap();

        write_csv(&table, &path).unwrap();
        let reread = read_csv(&path, cell(), sg).unwrap();
        assert!(reread.same_contents(&table));
    }

    #[test]
    fn read_csv_rejects_missing_index_columns() {
        let sg = find_spacegroup_by_name("P 1").unwrap();
        let result = read_csv_from("H,K,FP\n1,2,3\n".as_bytes(), "bad", cell(), sg);
        assert!(matches!(result, Err(TableError::InvalidHeader(_))));
    }

    #[test]
    fn read_csv_reports_unparsable_values_with_position() {
        let sg = find_spacegroup_by_name("P 1").unwrap();
        let result = read_csv_from(
            "H,K,L,FP:F\n1,2,3,abc\n".as_bytes(),
            "bad",
            cell(),
            sg,
        );
        match result {
            Err(TableError::InvalidValue { row, column, value }) => {
                assert_eq!(row, 1);
                assert_eq!(column, "FP");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn read_csv_rejects_missing_or_fractional_indices() {
        let sg = find_spacegroup_by_name("P 1").unwrap();
        let result = read_csv_from(
            "H,K,L,FP:F\n1,2,3,4.0\n2,,1,5.0\n".as_bytes(),
            "bad",
            cell(),
            Arc::clone(&sg),
        );
        match result {
            Err(TableError::InvalidValue { row, column, value }) => {
                assert_eq!(row, 2);
                assert_eq!(column, "K");
                assert_eq!(value, "NaN");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let result = read_csv_from("H,K,L\n1,2.5,3\n".as_bytes(), "bad", cell(), sg);
        assert!(matches!(result, Err(TableError::InvalidValue { row: 1, .. })));
    }

    #[test]
    fn read_csv_fails_for_missing_file() {
        let dir = tempdir().unwrap();
        let sg = find_spacegroup_by_name("P 1").unwrap();
        let result = read_csv(&dir.path().join("absent.csv"), cell(), sg);
        assert!(matches!(result, Err(TableError::Io { .. })));
    }

    #[test]
    fn written_file_uses_typed_headers_and_empty_missing_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let sg = find_spacegroup_by_name("P 1").unwrap();
        let mut table = ReflectionTable::new(cell(), sg);
        table.add_column("I", 'J', 0, None).unwrap();
        table.push_row(MillerIndex::new(1, 0, 0), &[f32::NAN]).unwrap();
        write_csv(&table, &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "H:H,K:H,L:H,I:J\n1,0,0,\n");
    }
}
