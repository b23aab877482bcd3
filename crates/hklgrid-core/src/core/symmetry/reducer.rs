use super::op::Op;
use super::spacegroup::SpaceGroup;
use crate::core::models::miller::MillerIndex;

/// Result of mapping a Miller index to its asymmetric-unit representative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reduction {
    /// The ASU representative.
    pub hkl: MillerIndex,
    /// Phase (radians) to add to the representative's phase to obtain the value at
    /// the reduced index.
    pub phase_shift: f64,
    /// The reduced index is reached from the representative only via Friedel
    /// negation, so complex values must be conjugated.
    pub friedel: bool,
    pub centric: bool,
}

/// Reduces Miller indices to the reciprocal asymmetric unit of a space group.
///
/// The representative of an index is the largest of all its symmetry images,
/// Friedel mates included, compared lexicographically on `(l, h, k)`. Because the
/// choice depends only on the orbit, reduction is idempotent and independent of
/// call order.
#[derive(Debug, Clone, Copy)]
pub struct SymmetryReducer<'a> {
    spacegroup: &'a SpaceGroup,
}

#[inline]
fn asu_key(hkl: MillerIndex) -> (i32, i32, i32) {
    (hkl.l, hkl.h, hkl.k)
}

impl<'a> SymmetryReducer<'a> {
    pub fn new(spacegroup: &'a SpaceGroup) -> Self {
        Self { spacegroup }
    }

    pub fn spacegroup(&self) -> &'a SpaceGroup {
        self.spacegroup
    }

    pub fn reduce(&self, hkl: MillerIndex) -> Reduction {
        let ops = self.spacegroup.sym_ops();

        let mut best = hkl;
        for op in ops {
            let image = op.apply_to_hkl(hkl);
            for candidate in [image, -image] {
                if asu_key(candidate) > asu_key(best) {
                    best = candidate;
                }
            }
        }

        let mate = -hkl;
        let (carrier, friedel) = ops
            .iter()
            .find(|op| op.apply_to_hkl(best) == hkl)
            .map(|op| (*op, false))
            .or_else(|| {
                ops.iter()
                    .find(|op| op.apply_to_hkl(best) == mate)
                    .map(|op| (*op, true))
            })
            // unreachable for a closed group: best lies in the orbit of ±hkl
            .unwrap_or((Op::IDENTITY, false));

        Reduction {
            hkl: best,
            phase_shift: carrier.phase_shift(best),
            friedel,
            centric: ops.iter().any(|op| op.apply_to_hkl(hkl) == mate),
        }
    }

    #[inline]
    pub fn to_asu(&self, hkl: MillerIndex) -> MillerIndex {
        self.reduce(hkl).hkl
    }

    #[inline]
    pub fn is_in_asu(&self, hkl: MillerIndex) -> bool {
        self.to_asu(hkl) == hkl
    }
}
