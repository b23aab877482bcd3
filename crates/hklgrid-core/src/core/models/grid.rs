use super::cell::UnitCell;
use super::miller::MillerIndex;
use crate::core::symmetry::spacegroup::SpaceGroup;
use ndarray::{ArrayView3, ShapeBuilder};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    #[error("Unsupported grid configuration: {packing} packing with {order} axis order")]
    UnsupportedConfiguration { packing: Packing, order: AxisOrder },

    #[error("Reflection {hkl} does not fit in a grid of size {size:?} (h, k, l)")]
    DataDoesNotFit { hkl: MillerIndex, size: [usize; 3] },

    #[error("Grid data has {found} points, expected {expected}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("Grid size {0:?} has an empty dimension")]
    EmptyDimension([usize; 3]),
}

/// Which axis varies fastest in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AxisOrder {
    /// u ↔ h (x), w ↔ l (z).
    #[default]
    Xyz,
    /// u ↔ l (z), w ↔ h (x).
    Zyx,
}

/// Storage of the last (w) axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Packing {
    #[default]
    Full,
    /// Hermitian half grid: only `w` in `0..=nw/2` is stored.
    HalfL,
}

#[derive(Debug, Error)]
#[error("Invalid axis order '{0}' (expected 'xyz' or 'zyx')")]
pub struct ParseAxisOrderError(String);

#[derive(Debug, Error)]
#[error("Invalid packing '{0}' (expected 'full' or 'half-l')")]
pub struct ParsePackingError(String);

impl FromStr for AxisOrder {
    type Err = ParseAxisOrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xyz" => Ok(AxisOrder::Xyz),
            "zyx" => Ok(AxisOrder::Zyx),
            _ => Err(ParseAxisOrderError(s.to_string())),
        }
    }
}

impl fmt::Display for AxisOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AxisOrder::Xyz => "xyz",
            AxisOrder::Zyx => "zyx",
        })
    }
}

impl FromStr for Packing {
    type Err = ParsePackingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(Packing::Full),
            "half-l" | "half_l" | "half" => Ok(Packing::HalfL),
            _ => Err(ParsePackingError(s.to_string())),
        }
    }
}

impl fmt::Display for Packing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Packing::Full => "full",
            Packing::HalfL => "half-l",
        })
    }
}

/// Rejects the one combination no grid entry point supports: half-L packing with
/// the last-fastest axis order.
pub fn validate_layout(packing: Packing, order: AxisOrder) -> Result<(), GridError> {
    match (packing, order) {
        (Packing::HalfL, AxisOrder::Zyx) => {
            Err(GridError::UnsupportedConfiguration { packing, order })
        }
        _ => Ok(()),
    }
}

#[inline]
fn signed_index(i: usize, n: usize) -> i32 {
    if 2 * i >= n {
        i as i32 - n as i32
    } else {
        i as i32
    }
}

/// Shape and indexing rules of a grid, independent of its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    size_hkl: [usize; 3],
    order: AxisOrder,
    packing: Packing,
}

impl GridLayout {
    pub fn new(size_hkl: [usize; 3], order: AxisOrder, packing: Packing) -> Result<Self, GridError> {
        validate_layout(packing, order)?;
        if size_hkl.contains(&0) {
            return Err(GridError::EmptyDimension(size_hkl));
        }
        Ok(Self {
            size_hkl,
            order,
            packing,
        })
    }

    /// Full logical size in (h, k, l) order.
    pub fn size_hkl(&self) -> [usize; 3] {
        self.size_hkl
    }

    pub fn order(&self) -> AxisOrder {
        self.order
    }

    pub fn packing(&self) -> Packing {
        self.packing
    }

    /// Logical (nu, nv, nw) in memory order, nw not reduced by packing.
    pub fn dims(&self) -> [usize; 3] {
        let [nh, nk, nl] = self.size_hkl;
        match self.order {
            AxisOrder::Xyz => [nh, nk, nl],
            AxisOrder::Zyx => [nl, nk, nh],
        }
    }

    /// Number of w planes actually stored.
    pub fn stored_nw(&self) -> usize {
        let nw = self.dims()[2];
        match self.packing {
            Packing::Full => nw,
            Packing::HalfL => nw / 2 + 1,
        }
    }

    pub fn point_count(&self) -> usize {
        let [nu, nv, _] = self.dims();
        nu * nv * self.stored_nw()
    }

    #[inline]
    pub fn index(&self, u: usize, v: usize, w: usize) -> usize {
        let [nu, nv, _] = self.dims();
        u + nu * (v + nv * w)
    }

    #[inline]
    pub fn coords(&self, idx: usize) -> [usize; 3] {
        let [nu, nv, _] = self.dims();
        [idx % nu, (idx / nu) % nv, idx / (nu * nv)]
    }

    /// Miller index of a stored grid point.
    pub fn to_hkl(&self, u: usize, v: usize, w: usize) -> MillerIndex {
        let [nu, nv, nw] = self.dims();
        let su = signed_index(u, nu);
        let sv = signed_index(v, nv);
        let sw = match self.packing {
            Packing::Full => signed_index(w, nw),
            Packing::HalfL => w as i32,
        };
        match self.order {
            AxisOrder::Xyz => MillerIndex::new(su, sv, sw),
            AxisOrder::Zyx => MillerIndex::new(sw, sv, su),
        }
    }

    #[inline]
    pub fn hkl_of_index(&self, idx: usize) -> MillerIndex {
        let [u, v, w] = self.coords(idx);
        self.to_hkl(u, v, w)
    }

    /// Storage index of a Miller index, wrapping periodically. `None` for indices
    /// whose half-L slot is not stored (negative l).
    pub fn index_of_hkl(&self, hkl: MillerIndex) -> Option<usize> {
        let [nh, nk, nl] = self.size_hkl;
        let wrap = |c: i32, n: usize| c.rem_euclid(n as i32) as usize;
        let (h, k) = (wrap(hkl.h, nh), wrap(hkl.k, nk));
        let l = match self.packing {
            Packing::Full => wrap(hkl.l, nl),
            Packing::HalfL => {
                if hkl.l < 0 || hkl.l as usize > nl / 2 {
                    return None;
                }
                hkl.l as usize
            }
        };
        Some(match self.order {
            AxisOrder::Xyz => self.index(h, k, l),
            AxisOrder::Zyx => self.index(l, k, h),
        })
    }
}

/// Dense 3D grid over reciprocal or real space, `u` fastest in memory.
#[derive(Debug, Clone)]
pub struct Grid<T> {
    layout: GridLayout,
    cell: UnitCell,
    spacegroup: Arc<SpaceGroup>,
    data: Vec<T>,
}

impl<T> Grid<T> {
    pub fn from_data(
        layout: GridLayout,
        cell: UnitCell,
        spacegroup: Arc<SpaceGroup>,
        data: Vec<T>,
    ) -> Result<Self, GridError> {
        if data.len() != layout.point_count() {
            return Err(GridError::ShapeMismatch {
                expected: layout.point_count(),
                found: data.len(),
            });
        }
        Ok(Self {
            layout,
            cell,
            spacegroup,
            data,
        })
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn dims(&self) -> [usize; 3] {
        self.layout.dims()
    }

    pub fn size_hkl(&self) -> [usize; 3] {
        self.layout.size_hkl()
    }

    pub fn order(&self) -> AxisOrder {
        self.layout.order()
    }

    pub fn packing(&self) -> Packing {
        self.layout.packing()
    }

    pub fn stored_nw(&self) -> usize {
        self.layout.stored_nw()
    }

    pub fn unit_cell(&self) -> &UnitCell {
        &self.cell
    }

    pub fn spacegroup(&self) -> &Arc<SpaceGroup> {
        &self.spacegroup
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    #[inline]
    pub fn to_hkl(&self, u: usize, v: usize, w: usize) -> MillerIndex {
        self.layout.to_hkl(u, v, w)
    }

    #[inline]
    pub fn index_of_hkl(&self, hkl: MillerIndex) -> Option<usize> {
        self.layout.index_of_hkl(hkl)
    }

    pub fn get(&self, u: usize, v: usize, w: usize) -> Option<&T> {
        let [nu, nv, _] = self.dims();
        if u >= nu || v >= nv || w >= self.stored_nw() {
            return None;
        }
        self.data.get(self.layout.index(u, v, w))
    }

    /// View with logical shape (nu, nv, stored nw), indexed as `[u, v, w]`.
    ///
    /// The view borrows the grid storage directly, so it is column-major (Fortran
    /// order, strides `[1, nu, nu * nv]`) rather than C-contiguous. Callers that need a
    /// row-major array should copy with `as_standard_layout()`.
    pub fn array(&self) -> Result<ArrayView3<'_, T>, GridError> {
        let [nu, nv, _] = self.dims();
        let shape = (nu, nv, self.stored_nw()).f();
        ArrayView3::from_shape(shape, &self.data).map_err(|_| GridError::ShapeMismatch {
            expected: self.layout.point_count(),
            found: self.data.len(),
        })
    }

    /// Same data in the other axis order. Half-L grids have no transposed form.
    pub fn transposed(&self) -> Result<Grid<T>, GridError>
    where
        T: Clone,
    {
        let target = match self.order() {
            AxisOrder::Xyz => AxisOrder::Zyx,
            AxisOrder::Zyx => AxisOrder::Xyz,
        };
        let layout = GridLayout::new(self.size_hkl(), target, self.packing())?;
        let data = (0..layout.point_count())
            .map(|idx| {
                let [u, v, w] = layout.coords(idx);
                self.data[self.layout.index(w, v, u)].clone()
            })
            .collect();
        Ok(Grid {
            layout,
            cell: self.cell,
            spacegroup: Arc::clone(&self.spacegroup),
            data,
        })
    }
}

impl<T: Clone + Default> Grid<T> {
    pub fn new(
        size_hkl: [usize; 3],
        order: AxisOrder,
        packing: Packing,
        cell: UnitCell,
        spacegroup: Arc<SpaceGroup>,
    ) -> Result<Self, GridError> {
        let layout = GridLayout::new(size_hkl, order, packing)?;
        Ok(Self {
            layout,
            cell,
            spacegroup,
            data: vec![T::default(); layout.point_count()],
        })
    }
}

impl<T: Send> Grid<T> {
    /// Sets every stored point from its Miller index.
    pub fn fill_by_hkl<F>(&mut self, f: F)
    where
        F: Fn(MillerIndex) -> T + Sync + Send,
    {
        let layout = self.layout;

        #[cfg(not(feature = "parallel"))]
        let iterator = self.data.iter_mut().enumerate();

        #[cfg(feature = "parallel")]
        let iterator = self.data.par_iter_mut().enumerate();

        iterator.for_each(|(idx, slot)| *slot = f(layout.hkl_of_index(idx)));
    }
}

impl<T> Index<[usize; 3]> for Grid<T> {
    type Output = T;

    fn index(&self, [u, v, w]: [usize; 3]) -> &T {
        &self.data[self.layout.index(u, v, w)]
    }
}

impl<T> IndexMut<[usize; 3]> for Grid<T> {
    fn index_mut(&mut self, [u, v, w]: [usize; 3]) -> &mut T {
        let idx = self.layout.index(u, v, w);
        &mut self.data[idx]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub rms: f64,
}

impl Grid<f64> {
    /// Minimum, maximum, mean and root-mean-square deviation from the mean.
    pub fn statistics(&self) -> GridStatistics {
        let n = self.data.len().max(1) as f64;
        let (min, max, sum) = self.data.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), &v| (min.min(v), max.max(v), sum + v),
        );
        let mean = sum / n;
        let variance = self.data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        GridStatistics {
            min,
            max,
            mean,
            rms: variance.sqrt(),
        }
    }
}
