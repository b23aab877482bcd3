use crate::core::models::asu_data::{AsuData, HklValue};
use crate::core::models::grid::{AxisOrder, Grid, GridError, GridLayout, Packing, validate_layout};
use crate::core::models::miller::MillerIndex;
use crate::core::models::value::SymmetricValue;
use crate::core::symmetry::reducer::SymmetryReducer;
use crate::core::symmetry::spacegroup::SpaceGroup;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Oversampling applied when sizing a grid for a set of reflections.
pub const DEFAULT_SAMPLE_RATE: f64 = 1.5;

/// Which grid points become reflections when reducing a grid to ASU data.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AsuExtractOptions {
    /// Drop reflections with d below this resolution (Å).
    pub dmin: Option<f64>,
    pub with_000: bool,
    pub with_sys_abs: bool,
}

/// Smallest integer `>= n` whose only prime factors are 2, 3 and 5.
pub fn good_fft_size(n: usize) -> usize {
    let mut m = n.max(1);
    loop {
        let mut rest = m;
        for p in [2, 3, 5] {
            while rest % p == 0 {
                rest /= p;
            }
        }
        if rest == 1 {
            return m;
        }
        m += 1;
    }
}

/// Largest absolute component along h, k and l over every symmetry image of
/// the stored reflections.
pub fn max_abs_index_with_symmetry<T>(data: &AsuData<T>) -> [i32; 3] {
    let ops = data.spacegroup().sym_ops();
    data.iter().fold([0; 3], |mut acc, item| {
        for op in ops {
            let image = op.apply_to_hkl(item.hkl);
            for (axis, m) in acc.iter_mut().enumerate() {
                *m = (*m).max(image.component(axis).abs());
            }
        }
        acc
    })
}

/// Grid size (h, k, l order) that holds every reflection and its symmetry images
/// without aliasing, oversampled by `sample_rate` and rounded up to FFT-friendly
/// sizes.
pub fn size_for_reflections<T>(data: &AsuData<T>, sample_rate: f64) -> [usize; 3] {
    let max = max_abs_index_with_symmetry(data);
    let mut size = [0; 3];
    for (n, &m) in size.iter_mut().zip(max.iter()) {
        let m = m as usize;
        let sampled = if sample_rate > 0.0 {
            (2.0 * m as f64 * sample_rate).ceil() as usize
        } else {
            0
        };
        *n = good_fft_size((2 * m + 1).max(sampled));
    }
    size
}

#[inline]
fn index_fits(hkl: MillerIndex, size: [usize; 3]) -> bool {
    hkl.as_array()
        .iter()
        .zip(size.iter())
        .all(|(&c, &n)| 2 * (c.unsigned_abs() as usize) < n)
}

fn orbit_fits(spacegroup: &SpaceGroup, hkl: MillerIndex, size: [usize; 3]) -> bool {
    spacegroup
        .sym_ops()
        .iter()
        .all(|op| index_fits(op.apply_to_hkl(hkl), size))
}

fn first_misfit<T>(data: &AsuData<T>, size: [usize; 3]) -> Option<MillerIndex> {
    let sg = data.spacegroup();
    data.iter()
        .map(|item| item.hkl)
        .find(|&hkl| !orbit_fits(sg, hkl, size))
}

/// True iff every stored reflection and its symmetry images satisfy
/// `2·|component| < size` on each axis.
pub fn fits_within<T>(data: &AsuData<T>, size: [usize; 3]) -> bool {
    first_misfit(data, size).is_none()
}

/// Expands ASU data to a dense grid.
///
/// Every grid point is reduced to its ASU representative and receives the stored
/// value transformed to that point, or `T::default()` when the reflection was not
/// measured.
///
/// # Errors
///
/// `UnsupportedConfiguration` for half-L packing with Zyx order, `DataDoesNotFit`
/// when the data would alias on a grid of this size.
#[instrument(skip_all, name = "expand_to_grid")]
pub fn expand_to_grid<T: SymmetricValue>(
    data: &AsuData<T>,
    size_hkl: [usize; 3],
    packing: Packing,
    order: AxisOrder,
) -> Result<Grid<T>, GridError> {
    validate_layout(packing, order)?;
    if let Some(hkl) = first_misfit(data, size_hkl) {
        return Err(GridError::DataDoesNotFit {
            hkl,
            size: size_hkl,
        });
    }
    let mut grid = Grid::new(
        size_hkl,
        order,
        packing,
        *data.unit_cell(),
        Arc::clone(data.spacegroup()),
    )?;
    grid.fill_by_hkl(|hkl| data.get(hkl).unwrap_or_default());
    debug!(
        reflections = data.len(),
        size = ?size_hkl,
        %packing,
        %order,
        "Expanded ASU data to grid."
    );
    Ok(grid)
}

/// Collects the ASU reflections of a reciprocal-space grid.
///
/// The first value met for each representative is kept. Representatives whose
/// symmetry images do not fit the grid (Nyquist planes) are skipped so the result
/// expands back onto the same grid.
#[instrument(skip_all, name = "prepare_asu_data")]
pub fn prepare_asu_data<T: SymmetricValue>(
    grid: &Grid<T>,
    options: &AsuExtractOptions,
) -> Result<AsuData<T>, GridError> {
    validate_layout(grid.packing(), grid.order())?;
    let layout: GridLayout = *grid.layout();
    let size = layout.size_hkl();
    let spacegroup = grid.spacegroup();
    let cell = grid.unit_cell();
    let reducer = SymmetryReducer::new(spacegroup);
    let max_1_d2 = options.dmin.map(|d| 1.0 / (d * d));

    let mut collected: BTreeMap<MillerIndex, T> = BTreeMap::new();
    let mut rejected: BTreeSet<MillerIndex> = BTreeSet::new();
    for (idx, value) in grid.data().iter().enumerate() {
        let hkl = layout.hkl_of_index(idx);
        if !options.with_000 && hkl.is_origin() {
            continue;
        }
        if let Some(limit) = max_1_d2 {
            if cell.calculate_1_d2(hkl) > limit {
                continue;
            }
        }
        let r = reducer.reduce(hkl);
        if collected.contains_key(&r.hkl) || rejected.contains(&r.hkl) {
            continue;
        }
        let keep = (options.with_sys_abs || !spacegroup.is_systematically_absent(r.hkl))
            && orbit_fits(spacegroup, r.hkl, size);
        if keep {
            collected.insert(r.hkl, value.untransformed(r.phase_shift, r.friedel));
        } else {
            rejected.insert(r.hkl);
        }
    }

    debug!(
        reflections = collected.len(),
        skipped = rejected.len(),
        "Reduced grid to ASU data."
    );
    let items = collected
        .into_iter()
        .map(|(hkl, value)| HklValue { hkl, value })
        .collect();
    Ok(AsuData::from_sorted_unchecked(
        *cell,
        Arc::clone(spacegroup),
        items,
    ))
}
