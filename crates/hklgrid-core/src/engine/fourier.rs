use crate::core::models::grid::{Grid, GridError, GridLayout, Packing, validate_layout};
use num_complex::Complex64;
use rustfft::{Fft, FftDirection, FftPlanner};
use std::sync::Arc;
use tracing::{debug, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Computes the electron density from a reciprocal-space grid:
/// `ρ(x) = (1/V) Σ_h F(h) exp(-2πi h·x)`.
///
/// A half-L grid is first expanded to the full Hermitian grid. The map keeps the
/// axis order of the input and is always fully packed.
#[instrument(skip_all, name = "reciprocal_to_real")]
pub fn reciprocal_to_real(grid: &Grid<Complex64>) -> Result<Grid<f64>, GridError> {
    validate_layout(grid.packing(), grid.order())?;
    let layout = GridLayout::new(grid.size_hkl(), grid.order(), Packing::Full)?;
    let dims = layout.dims();

    let mut data = match grid.packing() {
        Packing::Full => grid.data().to_vec(),
        Packing::HalfL => expand_hermitian(grid.data(), dims),
    };
    fft_3d(&mut data, dims, FftDirection::Forward);

    let volume = grid.unit_cell().volume();
    let density = data.into_iter().map(|f| f.re / volume).collect();
    debug!(dims = ?dims, "Transformed reciprocal grid to real-space map.");
    Grid::from_data(
        layout,
        *grid.unit_cell(),
        Arc::clone(grid.spacegroup()),
        density,
    )
}

/// Computes structure factors from a real-space map:
/// `F(h) = (V/N) Σ_x ρ(x) exp(+2πi h·x)`.
///
/// With `Packing::HalfL` only the non-redundant half of the last axis is kept.
#[instrument(skip_all, name = "real_to_reciprocal")]
pub fn real_to_reciprocal(map: &Grid<f64>, packing: Packing) -> Result<Grid<Complex64>, GridError> {
    if map.packing() != Packing::Full {
        return Err(GridError::UnsupportedConfiguration {
            packing: map.packing(),
            order: map.order(),
        });
    }
    let layout = GridLayout::new(map.size_hkl(), map.order(), packing)?;
    let dims = layout.dims();

    let mut data: Vec<Complex64> = map.data().iter().map(|&v| Complex64::new(v, 0.0)).collect();
    fft_3d(&mut data, dims, FftDirection::Inverse);

    let point_count = data.len() as f64;
    let scale = map.unit_cell().volume() / point_count;
    data.truncate(layout.point_count());
    for f in data.iter_mut() {
        *f *= scale;
    }
    debug!(dims = ?dims, %packing, "Transformed real-space map to reciprocal grid.");
    Grid::from_data(layout, *map.unit_cell(), Arc::clone(map.spacegroup()), data)
}

/// Rebuilds the full grid from its `0..=nw/2` half using `F(-h) = conj(F(h))`.
fn expand_hermitian(packed: &[Complex64], dims: [usize; 3]) -> Vec<Complex64> {
    let [nu, nv, nw] = dims;
    let half = nw / 2;
    let plane = nu * nv;
    let mut full = vec![Complex64::default(); plane * nw];
    full[..packed.len()].copy_from_slice(packed);
    for w in half + 1..nw {
        let mate_w = nw - w;
        for v in 0..nv {
            let mate_v = (nv - v) % nv;
            for u in 0..nu {
                let mate_u = (nu - u) % nu;
                full[u + nu * (v + nv * w)] = packed[mate_u + nu * (mate_v + nv * mate_w)].conj();
            }
        }
    }
    full
}

/// Unnormalized 3D DFT in place over `dims` (u fastest).
pub fn fft_3d(data: &mut [Complex64], dims: [usize; 3], direction: FftDirection) {
    let mut planner = FftPlanner::new();
    for (axis, &n) in dims.iter().enumerate() {
        if n > 1 {
            let fft = planner.plan_fft(n, direction);
            transform_axis(data, dims, axis, fft.as_ref());
        }
    }
}

/// Applies a 1D transform along one axis. Lines of axes 1 and 2 are gathered into
/// a contiguous buffer, transformed and scattered back.
fn transform_axis(data: &mut [Complex64], dims: [usize; 3], axis: usize, fft: &dyn Fft<f64>) {
    let n = dims[axis];
    if axis == 0 {
        process_lines(data, n, fft);
        return;
    }
    let stride: usize = dims[..axis].iter().product();
    let block = stride * n;

    let mut lines = vec![Complex64::default(); data.len()];
    for (outer, chunk) in data.chunks(block).enumerate() {
        for i in 0..n {
            for inner in 0..stride {
                lines[(outer * stride + inner) * n + i] = chunk[i * stride + inner];
            }
        }
    }
    process_lines(&mut lines, n, fft);
    for (outer, chunk) in data.chunks_mut(block).enumerate() {
        for i in 0..n {
            for inner in 0..stride {
                chunk[i * stride + inner] = lines[(outer * stride + inner) * n + i];
            }
        }
    }
}

fn process_lines(buffer: &mut [Complex64], n: usize, fft: &dyn Fft<f64>) {
    #[cfg(feature = "parallel")]
    buffer.par_chunks_mut(n).for_each_init(
        || vec![Complex64::default(); fft.get_inplace_scratch_len()],
        |scratch, line| fft.process_with_scratch(line, scratch),
    );

    #[cfg(not(feature = "parallel"))]
    {
        let _ = n;
        fft.process(buffer);
    }
}
