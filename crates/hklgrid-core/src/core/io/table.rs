use super::source::{MillerSource, ReflectionSource};
use crate::core::models::cell::UnitCell;
use crate::core::models::miller::MillerIndex;
use crate::core::symmetry::spacegroup::SpaceGroup;
use ndarray::{Array2, ArrayView2, Axis};
use std::sync::Arc;
use thiserror::Error;

/// Number of leading index columns (H, K, L) that every table carries.
pub const INDEX_COLUMNS: usize = 3;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    #[error("Column position {position} out of range (table has {count} columns)")]
    PositionOutOfRange { position: usize, count: usize },

    #[error("Column {0} holds Miller indices and cannot be changed")]
    ProtectedColumn(usize),

    #[error("Expected {expected} values, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("Unknown dataset id {0}")]
    UnknownDataset(usize),

    #[error("Invalid table header '{0}'")]
    InvalidHeader(String),

    #[error("Invalid value '{value}' in row {row}, column '{column}'")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },

    #[error("Inconsistent table shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub label: String,
    /// MTZ-style type code: `H` index, `F` amplitude, `Q` sigma, `P` phase,
    /// `J` intensity, `I` integer, `R` any real.
    pub column_type: char,
    pub dataset_id: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub id: usize,
    pub project_name: String,
    pub crystal_name: String,
    pub dataset_name: String,
    pub wavelength: f64,
}

/// Dense reflection table, one row per reflection, `f32` storage with NaN for
/// missing values. The first three columns are H, K and L.
#[derive(Debug, Clone)]
pub struct ReflectionTable {
    cell: UnitCell,
    spacegroup: Arc<SpaceGroup>,
    datasets: Vec<Dataset>,
    columns: Vec<Column>,
    data: Array2<f32>,
}

impl ReflectionTable {
    pub fn new(cell: UnitCell, spacegroup: Arc<SpaceGroup>) -> Self {
        let columns = ["H", "K", "L"]
            .iter()
            .map(|label| Column {
                label: label.to_string(),
                column_type: 'H',
                dataset_id: 0,
            })
            .collect();
        Self {
            cell,
            spacegroup,
            datasets: vec![Dataset {
                id: 0,
                project_name: "HKL_base".to_string(),
                crystal_name: "HKL_base".to_string(),
                dataset_name: "HKL_base".to_string(),
                wavelength: 0.0,
            }],
            columns,
            data: Array2::zeros((0, INDEX_COLUMNS)),
        }
    }

    /// Builds a table from column descriptions and row-major values.
    ///
    /// H, K and L must be finite integers in every row; a missing or fractional index
    /// is reported as [`TableError::InvalidValue`].
    pub fn from_parts(
        cell: UnitCell,
        spacegroup: Arc<SpaceGroup>,
        extra_columns: Vec<Column>,
        rows: usize,
        values: Vec<f32>,
    ) -> Result<Self, TableError> {
        let mut table = Self::new(cell, spacegroup);
        table.columns.extend(extra_columns);
        for column in &table.columns {
            table.dataset(column.dataset_id)?;
        }
        table.data = Array2::from_shape_vec((rows, table.columns.len()), values)?;
        for (row, indices) in table.data.rows().into_iter().enumerate() {
            for (column, &value) in table.columns.iter().zip(indices.iter().take(INDEX_COLUMNS)) {
                if !value.is_finite() || value.fract() != 0.0 {
                    return Err(TableError::InvalidValue {
                        row: row + 1,
                        column: column.label.clone(),
                        value: value.to_string(),
                    });
                }
            }
        }
        Ok(table)
    }

    pub fn cell(&self) -> &UnitCell {
        &self.cell
    }

    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    pub fn dataset(&self, id: usize) -> Result<&Dataset, TableError> {
        self.datasets
            .iter()
            .find(|d| d.id == id)
            .ok_or(TableError::UnknownDataset(id))
    }

    pub fn add_dataset(&mut self, dataset: Dataset) {
        self.datasets.retain(|d| d.id != dataset.id);
        self.datasets.push(dataset);
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.data.nrows()
    }

    pub fn column_with_label(&self, label: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.label == label)
    }

    pub fn column_position(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.label == label)
    }

    /// Rows × columns view of the raw values.
    pub fn array(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    pub fn column_values(&self, position: usize) -> Result<Vec<f32>, TableError> {
        self.check_position(position, self.columns.len())?;
        Ok(self.data.column(position).to_vec())
    }

    pub fn set_column_values(&mut self, position: usize, values: &[f32]) -> Result<(), TableError> {
        self.check_mutable(position)?;
        self.check_length(values.len())?;
        for (slot, &value) in self.data.column_mut(position).iter_mut().zip(values) {
            *slot = value;
        }
        Ok(())
    }

    /// Appends one reflection. `values` holds every column after H, K, L.
    pub fn push_row(&mut self, hkl: MillerIndex, values: &[f32]) -> Result<(), TableError> {
        let expected = self.columns.len() - INDEX_COLUMNS;
        if values.len() != expected {
            return Err(TableError::LengthMismatch {
                expected,
                found: values.len(),
            });
        }
        let mut row = Vec::with_capacity(self.columns.len());
        row.extend([hkl.h as f32, hkl.k as f32, hkl.l as f32]);
        row.extend_from_slice(values);
        self.data.push_row(ndarray::ArrayView1::from(&row))?;
        Ok(())
    }

    /// Inserts a NaN-filled column at `position` (appends when `None`) and returns
    /// its position. Existing columns at and after `position` shift right.
    pub fn add_column(
        &mut self,
        label: &str,
        column_type: char,
        dataset_id: usize,
        position: Option<usize>,
    ) -> Result<usize, TableError> {
        self.dataset(dataset_id)?;
        let count = self.columns.len();
        let position = position.unwrap_or(count);
        self.check_position(position, count + 1)?;
        if position < INDEX_COLUMNS {
            return Err(TableError::ProtectedColumn(position));
        }

        let old = &self.data;
        let widened = Array2::from_shape_fn((old.nrows(), count + 1), |(row, col)| {
            if col < position {
                old[[row, col]]
            } else if col == position {
                f32::NAN
            } else {
                old[[row, col - 1]]
            }
        });
        self.data = widened;
        self.columns.insert(
            position,
            Column {
                label: label.to_string(),
                column_type,
                dataset_id,
            },
        );
        Ok(position)
    }

    /// Removes the column at `position`, returning its description.
    pub fn remove_column(&mut self, position: usize) -> Result<Column, TableError> {
        self.check_mutable(position)?;
        let kept: Vec<usize> = (0..self.columns.len()).filter(|&c| c != position).collect();
        self.data = self.data.select(Axis(1), &kept);
        Ok(self.columns.remove(position))
    }

    /// Element-wise equality that treats two NaNs as equal.
    pub fn same_contents(&self, other: &ReflectionTable) -> bool {
        self.columns == other.columns
            && self.data.dim() == other.data.dim()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| a == b || (a.is_nan() && b.is_nan()))
    }

    fn check_position(&self, position: usize, count: usize) -> Result<(), TableError> {
        if position >= count {
            return Err(TableError::PositionOutOfRange {
                position,
                count: self.columns.len(),
            });
        }
        Ok(())
    }

    fn check_mutable(&self, position: usize) -> Result<(), TableError> {
        self.check_position(position, self.columns.len())?;
        if position < INDEX_COLUMNS {
            return Err(TableError::ProtectedColumn(position));
        }
        Ok(())
    }

    fn check_length(&self, found: usize) -> Result<(), TableError> {
        let expected = self.row_count();
        if found != expected {
            return Err(TableError::LengthMismatch { expected, found });
        }
        Ok(())
    }
}

impl MillerSource for ReflectionTable {
    fn unit_cell(&self) -> &UnitCell {
        &self.cell
    }

    fn miller_indices(&self) -> Vec<MillerIndex> {
        self.data
            .rows()
            .into_iter()
            .map(|row| {
                MillerIndex::new(
                    row[0].round() as i32,
                    row[1].round() as i32,
                    row[2].round() as i32,
                )
            })
            .collect()
    }
}

impl ReflectionSource for ReflectionTable {
    fn spacegroup(&self) -> &Arc<SpaceGroup> {
        &self.spacegroup
    }

    fn reflection_count(&self) -> usize {
        self.row_count()
    }

    fn column(&self, label: &str) -> Option<Vec<f64>> {
        let position = self.column_position(label)?;
        Some(self.data.column(position).iter().map(|&v| v as f64).collect())
    }
}
