use std::fmt;
use std::ops::Neg;

/// Integer triple (h, k, l) indexing a reciprocal-lattice point.
///
/// Ordering is lexicographic on `(h, k, l)`, which is the order reflections are
/// kept in by [`AsuData`](super::asu_data::AsuData).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MillerIndex {
    pub h: i32,
    pub k: i32,
    pub l: i32,
}

impl MillerIndex {
    pub const ORIGIN: MillerIndex = MillerIndex { h: 0, k: 0, l: 0 };

    pub const fn new(h: i32, k: i32, l: i32) -> Self {
        Self { h, k, l }
    }

    #[inline]
    pub fn as_array(self) -> [i32; 3] {
        [self.h, self.k, self.l]
    }

    #[inline]
    pub fn is_origin(self) -> bool {
        self == Self::ORIGIN
    }

    /// Component along axis 0 (h), 1 (k) or 2 (l).
    #[inline]
    pub fn component(self, axis: usize) -> i32 {
        match axis {
            0 => self.h,
            1 => self.k,
            _ => self.l,
        }
    }
}

impl From<[i32; 3]> for MillerIndex {
    fn from(hkl: [i32; 3]) -> Self {
        Self::new(hkl[0], hkl[1], hkl[2])
    }
}

impl From<MillerIndex> for [i32; 3] {
    fn from(hkl: MillerIndex) -> Self {
        hkl.as_array()
    }
}

impl Neg for MillerIndex {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.h, -self.k, -self.l)
    }
}

impl fmt::Display for MillerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.h, self.k, self.l)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_lexicographic_on_h_k_l() {
        let mut indices = vec![
            MillerIndex::new(1, 0, 0),
            MillerIndex::new(0, 2, -1),
            MillerIndex::new(0, 2, -3),
            MillerIndex::new(-1, 5, 5),
        ];
        indices.sort();
        assert_eq!(
            indices,
            vec![
                MillerIndex::new(-1, 5, 5),
                MillerIndex::new(0, 2, -3),
                MillerIndex::new(0, 2, -1),
                MillerIndex::new(1, 0, 0),
            ]
        );
    }

    #[test]
    fn negation_flips_every_component() {
        assert_eq!(-MillerIndex::new(1, -2, 3), MillerIndex::new(-1, 2, -3));
    }

    #[test]
    fn display_uses_parenthesized_triple() {
        assert_eq!(MillerIndex::new(1, -2, 3).to_string(), "(1 -2 3)");
    }

    #[test]
    fn conversion_from_array_preserves_components() {
        let hkl: MillerIndex = [4, 5, 6].into();
        assert_eq!(hkl.component(0), 4);
        assert_eq!(hkl.component(1), 5);
        assert_eq!(hkl.component(2), 6);
        assert!(!hkl.is_origin());
        assert!(MillerIndex::ORIGIN.is_origin());
    }
}
