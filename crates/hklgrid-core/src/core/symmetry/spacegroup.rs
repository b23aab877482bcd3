use super::SymmetryError;
use super::op::{DEN, Op, Rot, Tran};
use super::reducer::SymmetryReducer;
use super::table::{HM_ALIASES, HM_TO_HALL};
use crate::core::models::miller::MillerIndex;
use nalgebra::Matrix3;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tracing::warn;

/// Upper bound on the number of distinct rotations in a crystallographic point group.
const MAX_ROTATIONS: usize = 48;

const INVERSION: Rot = [[-1, 0, 0], [0, -1, 0], [0, 0, -1]];

/// A space group as primitive symmetry operators plus centering translations.
///
/// `sym_ops` always starts with the identity and contains one operator per
/// point-group rotation. The full operator list is the product of `sym_ops` and
/// `cen_ops`. Instances are immutable and shared as `Arc<SpaceGroup>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceGroup {
    name: String,
    number: Option<u8>,
    hall: Option<String>,
    sym_ops: Vec<Op>,
    cen_ops: Vec<Tran>,
}

impl SpaceGroup {
    /// Builds a space group from a Hall symbol such as `-P 2ybc` or `P 61 2 (0 0 -1)`.
    pub fn from_hall(symbol: &str) -> Result<Self, SymmetryError> {
        let malformed = |reason: String| SymmetryError::MalformedHall {
            symbol: symbol.to_string(),
            reason,
        };

        let trimmed = symbol.trim();
        let (centrosymmetric, rest) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };
        let mut chars = rest.chars();
        let lattice = chars
            .next()
            .ok_or_else(|| malformed("missing lattice symbol".to_string()))?;
        let cen_ops = lattice_translations(lattice)
            .ok_or_else(|| malformed(format!("'{}' is not a lattice symbol", lattice)))?;
        let body = chars.as_str();

        let (generator_part, origin_shift) = match body.find('(') {
            Some(open) => {
                let close = body[open..]
                    .find(')')
                    .map(|offset| open + offset)
                    .ok_or_else(|| malformed("missing ')'".to_string()))?;
                if !body[close + 1..].trim().is_empty() {
                    return Err(malformed("unexpected text after origin shift".to_string()));
                }
                let shift = parse_origin_shift(&body[open + 1..close]).map_err(malformed)?;
                (&body[..open], Some(shift))
            }
            None => (body, None),
        };

        let mut generators = vec![Op::IDENTITY];
        if centrosymmetric {
            generators.push(Op::new(INVERSION, [0, 0, 0]));
        }
        let mut first = None;
        let mut count = 0;
        for token in generator_part.split_whitespace() {
            count += 1;
            let first_char = *first.get_or_insert(token.chars().next().unwrap_or('1'));
            if token == "1" {
                continue;
            }
            let op = hall_matrix_symbol(token, count, first_char).map_err(malformed)?;
            generators.push(op);
        }
        if count == 0 {
            return Err(malformed("no rotation matrix symbols".to_string()));
        }
        if let Some(shift) = origin_shift {
            for op in generators.iter_mut() {
                *op = op.shift_origin(shift);
            }
        }

        Ok(Self {
            name: trimmed.to_string(),
            number: None,
            hall: Some(trimmed.to_string()),
            sym_ops: close_group(generators)?,
            cen_ops,
        })
    }

    /// Builds a space group from coordinate triplets.
    ///
    /// Operators with an identity rotation and non-zero translation are taken as
    /// centering vectors. The remaining operators are closed into a group.
    pub fn from_triplets(name: &str, triplets: &[&str]) -> Result<Self, SymmetryError> {
        let ops = triplets
            .iter()
            .map(|t| Op::parse_triplet(t))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_ops(name, ops)
    }

    pub fn from_ops(name: &str, ops: Vec<Op>) -> Result<Self, SymmetryError> {
        let mut cen_ops = vec![[0, 0, 0]];
        let mut generators = vec![Op::IDENTITY];
        for mut op in ops {
            op.normalize_tran();
            if op.rot == Op::IDENTITY.rot {
                if op.tran != [0, 0, 0] && !cen_ops.contains(&op.tran) {
                    cen_ops.push(op.tran);
                }
            } else {
                generators.push(op);
            }
        }
        Ok(Self {
            name: name.to_string(),
            number: None,
            hall: None,
            sym_ops: close_group(generators)?,
            cen_ops,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number(&self) -> Option<u8> {
        self.number
    }

    pub fn hall(&self) -> Option<&str> {
        self.hall.as_deref()
    }

    pub fn sym_ops(&self) -> &[Op] {
        &self.sym_ops
    }

    pub fn cen_ops(&self) -> &[Tran] {
        &self.cen_ops
    }

    /// Number of operators including centering.
    pub fn order(&self) -> usize {
        self.sym_ops.len() * self.cen_ops.len()
    }

    /// Every operator, centering translations applied.
    pub fn all_ops(&self) -> impl Iterator<Item = Op> + '_ {
        self.sym_ops.iter().flat_map(move |op| {
            self.cen_ops.iter().map(move |&cen| {
                let mut full = op.translated(cen);
                full.normalize_tran();
                full
            })
        })
    }

    pub fn is_centrosymmetric(&self) -> bool {
        self.sym_ops.iter().any(|op| op.rot == INVERSION)
    }

    /// True when the reflection is extinct because of screw axes, glide planes or
    /// lattice centering.
    pub fn is_systematically_absent(&self, hkl: MillerIndex) -> bool {
        let dot = |t: &Tran| hkl.h * t[0] + hkl.k * t[1] + hkl.l * t[2];
        if self.cen_ops.iter().any(|c| dot(c).rem_euclid(DEN) != 0) {
            return true;
        }
        self.sym_ops
            .iter()
            .any(|op| op.apply_to_hkl(hkl) == hkl && dot(&op.tran).rem_euclid(DEN) != 0)
    }

    /// Number of point-group operators that leave the index unchanged.
    pub fn epsilon_factor(&self, hkl: MillerIndex) -> usize {
        self.sym_ops
            .iter()
            .filter(|op| op.apply_to_hkl(hkl) == hkl)
            .count()
    }

    /// True when some operator maps the index onto its Friedel mate.
    pub fn is_centric(&self, hkl: MillerIndex) -> bool {
        let mate = -hkl;
        self.sym_ops.iter().any(|op| op.apply_to_hkl(hkl) == mate)
    }

    pub fn is_in_asu(&self, hkl: MillerIndex) -> bool {
        SymmetryReducer::new(self).is_in_asu(hkl)
    }

    /// Point-group rotations as floating-point matrices in fractional coordinates.
    pub fn rotation_matrices(&self) -> Vec<Matrix3<f64>> {
        self.sym_ops.iter().map(Op::rot_matrix).collect()
    }

    fn with_table_entry(mut self, name: &str, number: u8) -> Self {
        self.name = name.to_string();
        self.number = Some(number);
        self
    }
}

static SPACE_GROUPS: LazyLock<HashMap<&'static str, Arc<SpaceGroup>>> = LazyLock::new(|| {
    HM_TO_HALL
        .entries()
        .filter_map(|(&name, &(number, hall))| match SpaceGroup::from_hall(hall) {
            Ok(sg) => Some((name, Arc::new(sg.with_table_entry(name, number)))),
            Err(e) => {
                warn!("Skipping space group table entry '{}': {}", name, e);
                None
            }
        })
        .collect()
});

/// Looks up a space group by Hermann-Mauguin name (`P 21 21 21`, `P212121`, `P 21`)
/// or by number.
pub fn find_spacegroup_by_name(name: &str) -> Result<Arc<SpaceGroup>, SymmetryError> {
    let normalized = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if let Ok(number) = normalized.parse::<u8>() {
        return find_spacegroup_by_number(number);
    }
    let canonical = HM_ALIASES
        .get(normalized.as_str())
        .copied()
        .unwrap_or(normalized.as_str());
    if let Some(sg) = SPACE_GROUPS.get(canonical) {
        return Ok(Arc::clone(sg));
    }
    let compact: String = normalized.chars().filter(|c| !c.is_whitespace()).collect();
    SPACE_GROUPS
        .iter()
        .find(|(key, _)| key.chars().filter(|c| !c.is_whitespace()).eq(compact.chars()))
        .map(|(_, sg)| Arc::clone(sg))
        .ok_or_else(|| SymmetryError::UnknownSpaceGroup(name.to_string()))
}

pub fn find_spacegroup_by_number(number: u8) -> Result<Arc<SpaceGroup>, SymmetryError> {
    SPACE_GROUPS
        .values()
        .find(|sg| sg.number == Some(number))
        .map(Arc::clone)
        .ok_or_else(|| SymmetryError::UnknownSpaceGroup(number.to_string()))
}

/// Adds every product of known operators whose rotation is new, until closed.
fn close_group(generators: Vec<Op>) -> Result<Vec<Op>, SymmetryError> {
    let mut ops: Vec<Op> = Vec::with_capacity(generators.len());
    for mut op in generators {
        op.normalize_tran();
        if !ops.iter().any(|known| known.rot == op.rot) {
            ops.push(op);
        }
    }
    loop {
        let mut added = false;
        let mut i = 0;
        while i < ops.len() {
            let mut j = 0;
            while j < ops.len() {
                let product = ops[i].combine(&ops[j]);
                if !ops.iter().any(|known| known.rot == product.rot) {
                    if ops.len() >= MAX_ROTATIONS {
                        return Err(SymmetryError::NotAGroup(MAX_ROTATIONS));
                    }
                    ops.push(product);
                    added = true;
                }
                j += 1;
            }
            i += 1;
        }
        if !added {
            return Ok(ops);
        }
    }
}

fn lattice_translations(lattice: char) -> Option<Vec<Tran>> {
    let translations = match lattice.to_ascii_uppercase() {
        'P' => vec![[0, 0, 0]],
        'A' => vec![[0, 0, 0], [0, 6, 6]],
        'B' => vec![[0, 0, 0], [6, 0, 6]],
        'C' => vec![[0, 0, 0], [6, 6, 0]],
        'I' => vec![[0, 0, 0], [6, 6, 6]],
        'R' => vec![[0, 0, 0], [8, 4, 4], [4, 8, 8]],
        'S' => vec![[0, 0, 0], [4, 4, 8], [8, 4, 8]],
        'T' => vec![[0, 0, 0], [4, 8, 4], [8, 4, 8]],
        'F' => vec![[0, 0, 0], [0, 6, 6], [6, 0, 6], [6, 6, 0]],
        _ => return None,
    };
    Some(translations)
}

fn rotation_around_z(order: i32) -> Rot {
    match order {
        2 => [[-1, 0, 0], [0, -1, 0], [0, 0, 1]],
        3 => [[0, -1, 0], [1, -1, 0], [0, 0, 1]],
        4 => [[0, -1, 0], [1, 0, 0], [0, 0, 1]],
        6 => [[1, -1, 0], [1, 0, 0], [0, 0, 1]],
        _ => Op::IDENTITY.rot,
    }
}

fn translation_from_symbol(symbol: char) -> Option<Tran> {
    match symbol {
        'a' => Some([6, 0, 0]),
        'b' => Some([0, 6, 0]),
        'c' => Some([0, 0, 6]),
        'n' => Some([6, 6, 6]),
        'u' => Some([3, 0, 0]),
        'v' => Some([0, 3, 0]),
        'w' => Some([0, 0, 3]),
        'd' => Some([3, 3, 3]),
        _ => None,
    }
}

/// Parses one Hall matrix symbol (`2ac`, `-4bd`, `3*`, `61`) at position `pos`
/// (1-based) given the first character of the first symbol.
fn hall_matrix_symbol(token: &str, pos: usize, first: char) -> Result<Op, String> {
    let (negative, body) = match token.strip_prefix('-') {
        Some(body) => (true, body),
        None => (false, token),
    };
    let mut chars = body.chars();
    let order = match chars.next() {
        Some(c @ ('1' | '2' | '3' | '4' | '6')) => c as i32 - '0' as i32,
        _ => return Err(format!("wrong n-fold order notation '{}'", token)),
    };

    let mut fractional = 0;
    let mut principal_axis = None;
    let mut diagonal_axis = None;
    let mut tran = [0; 3];
    for c in chars {
        match c {
            '1'..='5' => {
                if fractional != 0 {
                    return Err(format!("two numeric subscripts in '{}'", token));
                }
                fractional = c as i32 - '0' as i32;
            }
            '\'' | '"' | '*' => {
                let expected = if c == '*' { 3 } else { 2 };
                if order != expected {
                    return Err(format!("wrong symbol '{}'", token));
                }
                diagonal_axis = Some(c);
            }
            'x' | 'y' | 'z' => principal_axis = Some(c),
            _ => {
                let t = translation_from_symbol(c)
                    .ok_or_else(|| format!("unknown translation symbol '{}'", c))?;
                for i in 0..3 {
                    tran[i] += t[i];
                }
            }
        }
    }

    if principal_axis.is_none() && diagonal_axis.is_none() {
        match (pos, order) {
            (1, _) => principal_axis = Some('z'),
            (2, 2) if first == '2' || first == '4' => principal_axis = Some('x'),
            (2, 2) if first == '3' || first == '6' => diagonal_axis = Some('\''),
            (3, 3) => diagonal_axis = Some('*'),
            _ => return Err(format!("missing axis in '{}'", token)),
        }
    }

    let mut op = Op::new(
        match diagonal_axis {
            None => rotation_around_z(order),
            Some('\'') => [[0, -1, 0], [-1, 0, 0], [0, 0, -1]],
            Some('"') => [[0, 1, 0], [1, 0, 0], [0, 0, -1]],
            Some(_) => [[0, 0, 1], [1, 0, 0], [0, 1, 0]],
        },
        tran,
    );
    if negative {
        op.rot = op.negated_rot();
    }
    if fractional != 0 {
        let axis = principal_axis
            .ok_or_else(|| format!("screw subscript without principal axis in '{}'", token))?;
        op.tran[axis as usize - 'x' as usize] += DEN / order * fractional;
    }
    let r = op.rot;
    match principal_axis {
        Some('x') => {
            op.rot = [
                [r[2][2], r[2][0], r[2][1]],
                [r[0][2], r[0][0], r[0][1]],
                [r[1][2], r[1][0], r[1][1]],
            ]
        }
        Some('y') => {
            op.rot = [
                [r[1][1], r[1][2], r[1][0]],
                [r[2][1], r[2][2], r[2][0]],
                [r[0][1], r[0][2], r[0][0]],
            ]
        }
        _ => {}
    }
    Ok(op)
}

/// Origin shift `(x y z)` given in twelfths.
fn parse_origin_shift(text: &str) -> Result<Tran, String> {
    let values = text
        .split_whitespace()
        .map(|v| v.parse::<i32>().map(|n| n % DEN))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("wrong format of translation '{}': {}", text, e))?;
    match values.as_slice() {
        [x, y, z] => Ok([*x, *y, *z]),
        _ => Err(format!("expected three numbers in origin shift '{}'", text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triplets(sg: &SpaceGroup) -> Vec<String> {
        sg.sym_ops().iter().map(Op::triplet).collect()
    }

    #[test]
    fn p1_has_only_identity() {
        let sg = find_spacegroup_by_name("P 1").unwrap();
        assert_eq!(sg.order(), 1);
        assert_eq!(sg.sym_ops()[0], Op::IDENTITY);
        assert!(!sg.is_centrosymmetric());
    }

    #[test]
    fn p_minus_1_is_centrosymmetric() {
        let sg = find_spacegroup_by_name("P -1").unwrap();
        assert_eq!(sg.order(), 2);
        assert!(sg.is_centrosymmetric());
        assert!(sg.is_centric(MillerIndex::new(1, 2, 3)));
    }

    #[test]
    fn p212121_matches_tabulated_operators() {
        let sg = find_spacegroup_by_name("P 21 21 21").unwrap();
        assert_eq!(sg.number(), Some(19));
        assert_eq!(sg.order(), 4);
        let ops = triplets(&sg);
        for expected in ["x,y,z", "-x+1/2,-y,z+1/2", "x+1/2,-y+1/2,-z", "-x,y+1/2,-z+1/2"] {
            assert!(ops.iter().any(|op| op == expected), "missing {}", expected);
        }
    }

    #[test]
    fn p6122_origin_shift_moves_twofold_translation() {
        let sg = find_spacegroup_by_name("P 61 2 2").unwrap();
        assert_eq!(sg.order(), 12);
        let ops = triplets(&sg);
        assert!(ops.iter().any(|op| op == "-y,-x,-z+5/6"), "{:?}", ops);
        assert!(ops.iter().any(|op| op == "x-y,x,z+1/6"), "{:?}", ops);
    }

    #[test]
    fn p3112_origin_shift_applies_to_every_generator() {
        let sg = find_spacegroup_by_name("P 31 1 2").unwrap();
        let ops = triplets(&sg);
        assert!(ops.iter().any(|op| op == "-y,-x,-z+2/3"), "{:?}", ops);
    }

    #[test]
    fn centered_groups_multiply_order_by_centering() {
        let c2 = find_spacegroup_by_name("C 1 2 1").unwrap();
        assert_eq!(c2.sym_ops().len(), 2);
        assert_eq!(c2.cen_ops().len(), 2);
        assert_eq!(c2.order(), 4);

        let f432 = find_spacegroup_by_name("F 4 3 2").unwrap();
        assert_eq!(f432.sym_ops().len(), 24);
        assert_eq!(f432.order(), 96);

        let h3 = find_spacegroup_by_name("R 3").unwrap();
        assert_eq!(h3.order(), 9);
    }

    #[test]
    fn every_table_entry_builds_a_closed_group() {
        for (name, (_, hall)) in HM_TO_HALL.entries() {
            let sg = SpaceGroup::from_hall(hall).unwrap_or_else(|e| panic!("{}: {}", name, e));
            for a in sg.sym_ops() {
                for b in sg.sym_ops() {
                    let product = a.combine(b);
                    assert!(
                        sg.sym_ops().iter().any(|op| op.rot == product.rot),
                        "{} is not closed",
                        name
                    );
                }
            }
            assert!(sg.order() <= 192);
        }
    }

    #[test]
    fn lookup_accepts_compact_names_aliases_and_numbers() {
        assert_eq!(find_spacegroup_by_name("P212121").unwrap().number(), Some(19));
        assert_eq!(find_spacegroup_by_name("P 21").unwrap().number(), Some(4));
        assert_eq!(find_spacegroup_by_name("  C  2 ").unwrap().number(), Some(5));
        assert_eq!(find_spacegroup_by_name("96").unwrap().name(), "P 43 21 2");
    }

    #[test]
    fn lookup_of_unknown_name_fails() {
        assert!(matches!(
            find_spacegroup_by_name("Q 7"),
            Err(SymmetryError::UnknownSpaceGroup(_))
        ));
    }

    #[test]
    fn shared_groups_are_the_same_allocation() {
        let a = find_spacegroup_by_name("P 43 21 2").unwrap();
        let b = find_spacegroup_by_name("P 43 21 2").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn systematic_absences_follow_screw_axes_and_centering() {
        let p212121 = find_spacegroup_by_name("P 21 21 21").unwrap();
        assert!(p212121.is_systematically_absent(MillerIndex::new(1, 0, 0)));
        assert!(!p212121.is_systematically_absent(MillerIndex::new(2, 0, 0)));
        assert!(p212121.is_systematically_absent(MillerIndex::new(0, 0, 3)));
        assert!(!p212121.is_systematically_absent(MillerIndex::new(1, 1, 1)));

        let c2 = find_spacegroup_by_name("C 1 2 1").unwrap();
        assert!(c2.is_systematically_absent(MillerIndex::new(1, 0, 0)));
        assert!(!c2.is_systematically_absent(MillerIndex::new(1, 1, 0)));
    }

    #[test]
    fn epsilon_factor_counts_stabilizing_operators() {
        let sg = find_spacegroup_by_name("P 4 2 2").unwrap();
        assert_eq!(sg.epsilon_factor(MillerIndex::new(0, 0, 2)), 4);
        assert_eq!(sg.epsilon_factor(MillerIndex::new(1, 2, 3)), 1);
    }

    #[test]
    fn from_triplets_separates_centering_and_closes_group() {
        let sg = SpaceGroup::from_triplets("C 2 custom", &["-x,y,-z", "x+1/2,y+1/2,z"]).unwrap();
        assert_eq!(sg.sym_ops().len(), 2);
        assert_eq!(sg.cen_ops(), &[[0, 0, 0], [6, 6, 0]]);

        let generated = SpaceGroup::from_triplets("P 4", &["-y,x,z"]).unwrap();
        assert_eq!(generated.order(), 4);
    }

    #[test]
    fn from_hall_rejects_malformed_symbols() {
        assert!(matches!(
            SpaceGroup::from_hall("Q 2"),
            Err(SymmetryError::MalformedHall { .. })
        ));
        assert!(SpaceGroup::from_hall("P 5").is_err());
        assert!(SpaceGroup::from_hall("P 2 (0 0").is_err());
        assert!(SpaceGroup::from_hall("P").is_err());
    }

    #[test]
    fn all_ops_enumerates_every_operator_with_centering() {
        let sg = find_spacegroup_by_name("C 1 2 1").unwrap();
        let ops: Vec<Op> = sg.all_ops().collect();
        assert_eq!(ops.len(), 4);
        assert!(ops.iter().any(|op| op.triplet() == "-x+1/2,y+1/2,-z"));
    }
}
