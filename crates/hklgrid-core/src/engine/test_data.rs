use crate::core::models::asu_data::AsuData;
use crate::core::models::cell::UnitCell;
use crate::core::models::miller::MillerIndex;
use crate::core::symmetry::reducer::SymmetryReducer;
use crate::core::symmetry::spacegroup::{SpaceGroup, find_spacegroup_by_name};
use num_complex::Complex64;
use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::sync::Arc;

pub const ATOMS: [[f64; 3]; 3] = [[0.11, 0.23, 0.37], [0.41, 0.07, 0.19], [0.29, 0.33, 0.08]];

pub fn orthorhombic_cell() -> UnitCell {
    UnitCell::new(24.0, 30.0, 36.0, 90.0, 90.0, 90.0).unwrap()
}

pub fn spacegroup(name: &str) -> Arc<SpaceGroup> {
    find_spacegroup_by_name(name).unwrap()
}

/// Structure factor of point atoms (with a mild temperature factor) at every
/// symmetry-equivalent position.
pub fn structure_factor(sg: &SpaceGroup, cell: &UnitCell, hkl: MillerIndex) -> Complex64 {
    let falloff = (-8.0 * cell.calculate_stol2(hkl)).exp();
    let mut sum = Complex64::new(0.0, 0.0);
    for atom in ATOMS {
        for op in sg.all_ops() {
            let mut x = [0.0; 3];
            for i in 0..3 {
                x[i] = (0..3).map(|j| op.rot[i][j] as f64 * atom[j]).sum::<f64>()
                    + op.tran[i] as f64 / 12.0;
            }
            let arg = 2.0 * PI * (hkl.h as f64 * x[0] + hkl.k as f64 * x[1] + hkl.l as f64 * x[2]);
            sum += Complex64::from_polar(6.0 * falloff, arg);
        }
    }
    sum
}

/// All ASU reflections with every component in `-max..=max`, origin and
/// systematic absences excluded.
pub fn asu_structure_factors(sg: &Arc<SpaceGroup>, cell: UnitCell, max: i32) -> AsuData<Complex64> {
    let reducer = SymmetryReducer::new(sg);
    let mut reps = BTreeSet::new();
    for h in -max..=max {
        for k in -max..=max {
            for l in -max..=max {
                let hkl = MillerIndex::new(h, k, l);
                let rep = reducer.to_asu(hkl);
                let images_fit = sg
                    .sym_ops()
                    .iter()
                    .map(|op| op.apply_to_hkl(rep))
                    .all(|img| img.as_array().iter().all(|c| c.abs() <= max));
                if !hkl.is_origin() && !sg.is_systematically_absent(rep) && images_fit {
                    reps.insert(rep);
                }
            }
        }
    }
    let reflections = reps
        .into_iter()
        .map(|hkl| (hkl, structure_factor(sg, &cell, hkl)))
        .collect::<Vec<_>>();
    AsuData::from_reflections(cell, Arc::clone(sg), reflections).unwrap()
}
