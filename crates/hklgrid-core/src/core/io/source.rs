use crate::core::models::asu_data::{AsuData, AsuDataError};
use crate::core::models::cell::UnitCell;
use crate::core::models::miller::MillerIndex;
use crate::core::models::value::{SymmetricValue, ValueSigma};
use crate::core::symmetry::spacegroup::SpaceGroup;
use num_complex::Complex64;
use std::sync::Arc;

/// Anything that can supply Miller indices together with the unit cell they refer to.
pub trait MillerSource {
    fn unit_cell(&self) -> &UnitCell;

    fn miller_indices(&self) -> Vec<MillerIndex>;

    /// 1/d² of every index, in source order.
    fn make_1_d2_array(&self) -> Vec<f64> {
        let cell = self.unit_cell();
        self.miller_indices()
            .into_iter()
            .map(|hkl| cell.calculate_1_d2(hkl))
            .collect()
    }
}

/// Defines the interface for reading reflection columns from a data source.
///
/// Implementors expose labelled numeric columns aligned with
/// [`MillerSource::miller_indices`]. The provided methods assemble ASU data sets
/// from those columns, skipping rows where a required value is missing (NaN).
pub trait ReflectionSource: MillerSource {
    fn spacegroup(&self) -> &Arc<SpaceGroup>;

    fn reflection_count(&self) -> usize;

    /// Values of the column with the given label, or `None` if there is no such column.
    fn column(&self, label: &str) -> Option<Vec<f64>>;

    /// Builds complex structure factors from an amplitude and a phase column.
    ///
    /// # Arguments
    ///
    /// * `f_label` - Label of the amplitude column.
    /// * `phi_label` - Label of the phase column, in degrees.
    ///
    /// # Errors
    ///
    /// Returns an error if a column is missing, has the wrong length, or two rows
    /// reduce to the same ASU representative.
    fn get_f_phi(&self, f_label: &str, phi_label: &str) -> Result<AsuData<Complex64>, AsuDataError> {
        let amplitudes = self.required_column(f_label)?;
        let phases = self.required_column(phi_label)?;
        let reflections = self
            .miller_indices()
            .into_iter()
            .zip(amplitudes.into_iter().zip(phases))
            .filter(|(_, (f, phi))| !f.is_nan() && !phi.is_nan())
            .map(|(hkl, (f, phi))| (hkl, Complex64::from_polar(f, phi.to_radians())));
        self.collect_asu_data(reflections)
    }

    /// Builds value/sigma pairs; rows with a missing sigma are kept with a NaN sigma.
    fn get_value_sigma(
        &self,
        value_label: &str,
        sigma_label: &str,
    ) -> Result<AsuData<ValueSigma>, AsuDataError> {
        let values = self.required_column(value_label)?;
        let sigmas = self.required_column(sigma_label)?;
        let reflections = self
            .miller_indices()
            .into_iter()
            .zip(values.into_iter().zip(sigmas))
            .filter(|(_, (value, _))| !value.is_nan())
            .map(|(hkl, (value, sigma))| (hkl, ValueSigma::new(value, sigma)));
        self.collect_asu_data(reflections)
    }

    fn get_values(&self, label: &str) -> Result<AsuData<f64>, AsuDataError> {
        let values = self.required_column(label)?;
        let reflections = self
            .miller_indices()
            .into_iter()
            .zip(values)
            .filter(|(_, value)| !value.is_nan());
        self.collect_asu_data(reflections)
    }

    #[doc(hidden)]
    fn required_column(&self, label: &str) -> Result<Vec<f64>, AsuDataError> {
        let values = self
            .column(label)
            .ok_or_else(|| AsuDataError::MissingColumn(label.to_string()))?;
        let expected = self.reflection_count();
        if values.len() != expected {
            return Err(AsuDataError::LengthMismatch {
                expected,
                found: values.len(),
            });
        }
        Ok(values)
    }

    #[doc(hidden)]
    fn collect_asu_data<T: SymmetricValue>(
        &self,
        reflections: impl Iterator<Item = (MillerIndex, T)>,
    ) -> Result<AsuData<T>, AsuDataError> {
        AsuData::from_reflections(
            *self.unit_cell(),
            Arc::clone(self.spacegroup()),
            reflections,
        )
    }
}
