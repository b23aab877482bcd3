use super::cell::UnitCell;
use super::miller::MillerIndex;
use super::value::SymmetricValue;
use crate::core::io::source::MillerSource;
use crate::core::symmetry::reducer::SymmetryReducer;
use crate::core::symmetry::spacegroup::SpaceGroup;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AsuDataError {
    #[error("Reflections reduce to the same ASU representative {hkl}")]
    DuplicateReflection { hkl: MillerIndex },

    #[error("Miller index {0} is not an ASU representative")]
    NotInAsu(MillerIndex),

    #[error("Column '{0}' not found")]
    MissingColumn(String),

    #[error("Column length mismatch: expected {expected} values, found {found}")]
    LengthMismatch { expected: usize, found: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HklValue<T> {
    pub hkl: MillerIndex,
    pub value: T,
}

/// The independent reflections of a data set: one entry per ASU representative,
/// sorted by Miller index and bound to a unit cell and space group.
#[derive(Debug, Clone)]
pub struct AsuData<T> {
    cell: UnitCell,
    spacegroup: Arc<SpaceGroup>,
    items: Vec<HklValue<T>>,
}

impl<T> AsuData<T> {
    /// Wraps items that are already unique ASU representatives in sorted order.
    pub(crate) fn from_sorted_unchecked(
        cell: UnitCell,
        spacegroup: Arc<SpaceGroup>,
        items: Vec<HklValue<T>>,
    ) -> Self {
        debug_assert!(items.windows(2).all(|w| w[0].hkl < w[1].hkl));
        Self {
            cell,
            spacegroup,
            items,
        }
    }

    pub fn unit_cell(&self) -> &UnitCell {
        &self.cell
    }

    pub fn spacegroup(&self) -> &Arc<SpaceGroup> {
        &self.spacegroup
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HklValue<T>> {
        self.items.iter()
    }

    /// Mutable access to values; Miller indices stay fixed.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (MillerIndex, &mut T)> {
        self.items.iter_mut().map(|item| (item.hkl, &mut item.value))
    }

    pub fn items(&self) -> &[HklValue<T>] {
        &self.items
    }

    pub fn miller_array(&self) -> Vec<MillerIndex> {
        self.items.iter().map(|item| item.hkl).collect()
    }

    pub fn make_1_d2_array(&self) -> Vec<f64> {
        self.items
            .iter()
            .map(|item| self.cell.calculate_1_d2(item.hkl))
            .collect()
    }

    pub fn make_d_array(&self) -> Vec<f64> {
        self.items
            .iter()
            .map(|item| self.cell.calculate_d(item.hkl))
            .collect()
    }

    /// Largest absolute index along h, k and l.
    pub fn max_abs_index(&self) -> [i32; 3] {
        self.items.iter().fold([0; 3], |mut acc, item| {
            for (axis, m) in acc.iter_mut().enumerate() {
                *m = (*m).max(item.hkl.component(axis).abs());
            }
            acc
        })
    }

    pub fn map_values<U>(&self, f: impl Fn(&T) -> U) -> AsuData<U> {
        AsuData {
            cell: self.cell,
            spacegroup: Arc::clone(&self.spacegroup),
            items: self
                .items
                .iter()
                .map(|item| HklValue {
                    hkl: item.hkl,
                    value: f(&item.value),
                })
                .collect(),
        }
    }

    fn position(&self, hkl: MillerIndex) -> Option<usize> {
        self.items.binary_search_by_key(&hkl, |item| item.hkl).ok()
    }
}

impl<T: Clone> AsuData<T> {
    pub fn value_array(&self) -> Vec<T> {
        self.items.iter().map(|item| item.value.clone()).collect()
    }

    /// Subset of the reflections sharing this cell and space group.
    pub fn filter(&self, predicate: impl Fn(&HklValue<T>) -> bool) -> Self {
        Self {
            cell: self.cell,
            spacegroup: Arc::clone(&self.spacegroup),
            items: self
                .items
                .iter()
                .filter(|item| predicate(item))
                .cloned()
                .collect(),
        }
    }

    /// Keeps reflections with resolution `d >= dmin`.
    pub fn filter_by_resolution(&self, dmin: f64) -> Self {
        let max_1_d2 = 1.0 / (dmin * dmin);
        self.filter(|item| self.cell.calculate_1_d2(item.hkl) <= max_1_d2)
    }
}

impl<T: SymmetricValue> AsuData<T> {
    /// Builds the ASU set from reflections given at arbitrary symmetry-equivalent
    /// indices.
    ///
    /// Each value is transformed to its representative. Two inputs that reduce to
    /// the same representative are an error.
    pub fn from_reflections(
        cell: UnitCell,
        spacegroup: Arc<SpaceGroup>,
        reflections: impl IntoIterator<Item = (MillerIndex, T)>,
    ) -> Result<Self, AsuDataError> {
        let reducer = SymmetryReducer::new(&spacegroup);
        let mut items: Vec<HklValue<T>> = reflections
            .into_iter()
            .map(|(hkl, value)| {
                let r = reducer.reduce(hkl);
                HklValue {
                    hkl: r.hkl,
                    value: value.untransformed(r.phase_shift, r.friedel),
                }
            })
            .collect();
        items.sort_by_key(|item| item.hkl);
        if let Some(pair) = items.windows(2).find(|w| w[0].hkl == w[1].hkl) {
            return Err(AsuDataError::DuplicateReflection { hkl: pair[0].hkl });
        }
        debug!(
            reflections = items.len(),
            spacegroup = spacegroup.name(),
            "Built ASU data set."
        );
        Ok(Self {
            cell,
            spacegroup,
            items,
        })
    }

    /// Value at any Miller index, reconstructed from its representative.
    pub fn get(&self, hkl: MillerIndex) -> Option<T> {
        let r = SymmetryReducer::new(&self.spacegroup).reduce(hkl);
        self.position(r.hkl)
            .map(|pos| self.items[pos].value.transformed(r.phase_shift, r.friedel))
    }

    /// Value stored for an ASU representative.
    pub fn get_exact(&self, hkl: MillerIndex) -> Result<Option<T>, AsuDataError> {
        if !self.spacegroup.is_in_asu(hkl) {
            return Err(AsuDataError::NotInAsu(hkl));
        }
        Ok(self.position(hkl).map(|pos| self.items[pos].value))
    }
}

impl<T> MillerSource for AsuData<T> {
    fn unit_cell(&self) -> &UnitCell {
        &self.cell
    }

    fn miller_indices(&self) -> Vec<MillerIndex> {
        self.miller_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::symmetry::spacegroup::find_spacegroup_by_name;
    use num_complex::Complex64;
    use std::f64::consts::PI;

    const TOLERANCE: f64 = 1e-12;

    fn cubic_cell() -> UnitCell {
        UnitCell::new(20.0, 20.0, 20.0, 90.0, 90.0, 90.0).unwrap()
    }

    #[test]
    fn from_reflections_moves_values_to_representatives_and_sorts() {
        let sg = find_spacegroup_by_name("P 1").unwrap();
        let data = AsuData::from_reflections(
            cubic_cell(),
            sg,
            vec![
                (MillerIndex::new(0, 0, 2), Complex64::new(1.0, 0.0)),
                (MillerIndex::new(-1, -2, -3), Complex64::from_polar(2.0, 0.5)),
            ],
        )
        .unwrap();

        assert_eq!(
            data.miller_array(),
            vec![MillerIndex::new(0, 0, 2), MillerIndex::new(1, 2, 3)]
        );
        let stored = data.get_exact(MillerIndex::new(1, 2, 3)).unwrap().unwrap();
        assert!((stored - Complex64::from_polar(2.0, -0.5)).norm() < TOLERANCE);
    }

    #[test]
    fn get_reconstructs_value_at_equivalent_indices() {
        let sg = find_spacegroup_by_name("P 21 21 21").unwrap();
        let data = AsuData::from_reflections(
            cubic_cell(),
            sg,
            vec![(MillerIndex::new(1, 2, 3), Complex64::from_polar(5.0, 0.25))],
        )
        .unwrap();

        let original = data.get(MillerIndex::new(1, 2, 3)).unwrap();
        assert!((original - Complex64::from_polar(5.0, 0.25)).norm() < TOLERANCE);

        // -x+1/2,-y,z+1/2 maps (1 2 3) to (-1 -2 3) with phase -2π(1/2 + 3/2)
        let image = data.get(MillerIndex::new(-1, -2, 3)).unwrap();
        let expected = Complex64::from_polar(5.0, 0.25 - 4.0 * PI);
        assert!((image - expected).norm() < 1e-9);

        let mate = data.get(MillerIndex::new(-1, -2, -3)).unwrap();
        assert!((mate - Complex64::from_polar(5.0, -0.25)).norm() < TOLERANCE);

        assert!(data.get(MillerIndex::new(4, 4, 4)).is_none());
    }

    #[test]
    fn duplicate_representatives_are_rejected() {
        let sg = find_spacegroup_by_name("P 1").unwrap();
        let result = AsuData::from_reflections(
            cubic_cell(),
            sg,
            vec![
                (MillerIndex::new(1, 1, 1), 1.0f64),
                (MillerIndex::new(-1, -1, -1), 2.0f64),
            ],
        );
        assert_eq!(
            result.unwrap_err(),
            AsuDataError::DuplicateReflection {
                hkl: MillerIndex::new(1, 1, 1)
            }
        );
    }

    #[test]
    fn get_exact_requires_representative() {
        let sg = find_spacegroup_by_name("P 1").unwrap();
        let data =
            AsuData::from_reflections(cubic_cell(), sg, vec![(MillerIndex::new(1, 0, 1), 3.0f64)])
                .unwrap();
        assert_eq!(
            data.get_exact(MillerIndex::new(-1, 0, -1)),
            Err(AsuDataError::NotInAsu(MillerIndex::new(-1, 0, -1)))
        );
        assert_eq!(data.get_exact(MillerIndex::new(1, 0, 1)), Ok(Some(3.0)));
        assert_eq!(data.get_exact(MillerIndex::new(2, 0, 1)), Ok(None));
    }

    #[test]
    fn filter_by_resolution_keeps_low_resolution_reflections() {
        let sg = find_spacegroup_by_name("P 1").unwrap();
        let data = AsuData::from_reflections(
            cubic_cell(),
            sg,
            (1..=10).map(|l| (MillerIndex::new(0, 0, l), l as f64)),
        )
        .unwrap();
        // d = 20 / l
        let filtered = data.filter_by_resolution(4.0);
        assert_eq!(filtered.len(), 5);
        assert!(filtered.make_d_array().iter().all(|&d| d >= 4.0 - 1e-12));
        assert!(Arc::ptr_eq(filtered.spacegroup(), data.spacegroup()));
    }

    #[test]
    fn accessors_report_extent_and_values() {
        let sg = find_spacegroup_by_name("P 1").unwrap();
        let data = AsuData::from_reflections(
            cubic_cell(),
            sg,
            vec![
                (MillerIndex::new(-7, 2, 1), 1.0f64),
                (MillerIndex::new(3, -4, 5), 2.0f64),
            ],
        )
        .unwrap();
        assert_eq!(data.max_abs_index(), [7, 4, 5]);
        assert_eq!(data.value_array(), vec![1.0, 2.0]);
        let doubled = data.map_values(|v| v * 2.0);
        assert_eq!(doubled.value_array(), vec![2.0, 4.0]);
        let one_over_d2 = data.make_1_d2_array();
        assert!((one_over_d2[0] - (49.0 + 4.0 + 1.0) / 400.0).abs() < TOLERANCE);
    }
}
