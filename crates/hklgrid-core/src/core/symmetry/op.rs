use super::SymmetryError;
use crate::core::models::miller::MillerIndex;
use nalgebra::Matrix3;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Translations are stored as integers in units of `1 / DEN`.
pub const DEN: i32 = 12;

pub type Rot = [[i32; 3]; 3];
pub type Tran = [i32; 3];

/// A symmetry operator `x' = R x + t` acting on fractional coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Op {
    pub rot: Rot,
    pub tran: Tran,
}

impl Op {
    pub const IDENTITY: Op = Op {
        rot: [[1, 0, 0], [0, 1, 0], [0, 0, 1]],
        tran: [0, 0, 0],
    };

    pub const fn new(rot: Rot, tran: Tran) -> Self {
        Self { rot, tran }
    }

    /// Parses a coordinate triplet such as `-x,y+1/2,-z`.
    pub fn parse_triplet(triplet: &str) -> Result<Self, SymmetryError> {
        let malformed = |reason: String| SymmetryError::MalformedTriplet {
            triplet: triplet.to_string(),
            reason,
        };
        let parts: Vec<&str> = triplet.split(',').collect();
        if parts.len() != 3 {
            return Err(malformed("expected exactly two commas".to_string()));
        }
        let mut rot = [[0; 3]; 3];
        let mut tran = [0; 3];
        for (row, part) in parts.iter().enumerate() {
            let parsed = parse_triplet_part(part).map_err(malformed)?;
            rot[row] = [parsed[0], parsed[1], parsed[2]];
            tran[row] = parsed[3];
        }
        Ok(Self { rot, tran })
    }

    pub fn triplet(&self) -> String {
        (0..3)
            .map(|i| make_triplet_part(self.rot[i], self.tran[i]))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn is_identity(&self) -> bool {
        self.rot == Self::IDENTITY.rot && self.tran.iter().all(|t| t % DEN == 0)
    }

    /// Determinant of the rotation part: 1 for proper rotations, -1 with inversion.
    pub fn det_rot(&self) -> i32 {
        let r = &self.rot;
        r[0][0] * (r[1][1] * r[2][2] - r[1][2] * r[2][1])
            - r[0][1] * (r[1][0] * r[2][2] - r[1][2] * r[2][0])
            + r[0][2] * (r[1][0] * r[2][1] - r[1][1] * r[2][0])
    }

    pub fn inverted(&self) -> Result<Self, SymmetryError> {
        let detr = self.det_rot();
        if detr != 1 && detr != -1 {
            return Err(SymmetryError::NotInvertible(self.triplet()));
        }
        let r = &self.rot;
        let mut inv = [[0; 3]; 3];
        inv[0][0] = detr * (r[1][1] * r[2][2] - r[2][1] * r[1][2]);
        inv[0][1] = detr * (r[0][2] * r[2][1] - r[0][1] * r[2][2]);
        inv[0][2] = detr * (r[0][1] * r[1][2] - r[0][2] * r[1][1]);
        inv[1][0] = detr * (r[1][2] * r[2][0] - r[1][0] * r[2][2]);
        inv[1][1] = detr * (r[0][0] * r[2][2] - r[0][2] * r[2][0]);
        inv[1][2] = detr * (r[1][0] * r[0][2] - r[0][0] * r[1][2]);
        inv[2][0] = detr * (r[1][0] * r[2][1] - r[2][0] * r[1][1]);
        inv[2][1] = detr * (r[2][0] * r[0][1] - r[0][0] * r[2][1]);
        inv[2][2] = detr * (r[0][0] * r[1][1] - r[1][0] * r[0][1]);
        let mut tran = [0; 3];
        for (i, t) in tran.iter_mut().enumerate() {
            *t = -(self.tran[0] * inv[i][0] + self.tran[1] * inv[i][1] + self.tran[2] * inv[i][2]);
        }
        let mut op = Self { rot: inv, tran };
        op.normalize_tran();
        Ok(op)
    }

    /// Wraps translations into `[0, DEN)`.
    pub fn normalize_tran(&mut self) -> &mut Self {
        for t in self.tran.iter_mut() {
            *t = t.rem_euclid(DEN);
        }
        self
    }

    pub fn translated(&self, shift: Tran) -> Self {
        let mut op = *self;
        for i in 0..3 {
            op.tran[i] += shift[i];
        }
        op
    }

    pub fn negated_rot(&self) -> Rot {
        let mut rot = self.rot;
        for row in rot.iter_mut() {
            for v in row.iter_mut() {
                *v = -*v;
            }
        }
        rot
    }

    /// Composition `self ∘ other`: applies `other` first.
    pub fn combine(&self, other: &Op) -> Op {
        let mut rot = [[0; 3]; 3];
        let mut tran = self.tran;
        for i in 0..3 {
            for j in 0..3 {
                rot[i][j] = (0..3).map(|m| self.rot[i][m] * other.rot[m][j]).sum();
                tran[i] += self.rot[i][j] * other.tran[j];
            }
        }
        let mut op = Op { rot, tran };
        op.normalize_tran();
        op
    }

    /// Conjugates the operator by an origin shift `v`: `t' = t + v - R v`.
    pub fn shift_origin(&self, shift: Tran) -> Op {
        let mut op = *self;
        for i in 0..3 {
            let rv: i32 = (0..3).map(|j| self.rot[i][j] * shift[j]).sum();
            op.tran[i] += shift[i] - rv;
        }
        op.normalize_tran();
        op
    }

    /// Image of a Miller index, `hkl · R` (indices transform as row vectors).
    #[inline]
    pub fn apply_to_hkl(&self, hkl: MillerIndex) -> MillerIndex {
        let h = hkl.as_array();
        let mut r = [0; 3];
        for (i, out) in r.iter_mut().enumerate() {
            *out = h[0] * self.rot[0][i] + h[1] * self.rot[1][i] + h[2] * self.rot[2][i];
        }
        MillerIndex::from(r)
    }

    /// Phase shift `-2π (hkl · t)` in radians, for the image `hkl · R` of `hkl`.
    #[inline]
    pub fn phase_shift(&self, hkl: MillerIndex) -> f64 {
        let dot = hkl.h * self.tran[0] + hkl.k * self.tran[1] + hkl.l * self.tran[2];
        -2.0 * PI * dot as f64 / DEN as f64
    }

    pub fn rot_matrix(&self) -> Matrix3<f64> {
        Matrix3::from_fn(|i, j| self.rot[i][j] as f64)
    }
}

impl FromStr for Op {
    type Err = SymmetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_triplet(s)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.triplet())
    }
}

fn parse_triplet_part(part: &str) -> Result<[i32; 4], String> {
    let mut r = [0; 4];
    // 0 means a term was just read and the next one must start with a sign
    let mut sign = 1;
    let chars: Vec<char> = part.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '+' | '-' => {
                sign = if c == '+' { 1 } else { -1 };
                i += 1;
                continue;
            }
            ' ' | '\t' => {
                i += 1;
                continue;
            }
            _ => {}
        }
        if sign == 0 {
            return Err(format!("missing sign before '{}'", c));
        }
        if c.is_ascii_digit() {
            let numerator = read_integer(&chars, &mut i);
            if i < chars.len() && chars[i] == '*' {
                i += 1;
                let axis = chars
                    .get(i)
                    .and_then(|&c| axis_of(c))
                    .ok_or_else(|| "expected axis after '*'".to_string())?;
                r[axis] += sign * numerator;
                i += 1;
                sign = 0;
                continue;
            }
            let mut denominator = 1;
            if i < chars.len() && chars[i] == '/' {
                i += 1;
                denominator = read_integer(&chars, &mut i);
                if !matches!(denominator, 1 | 2 | 3 | 4 | 6) {
                    return Err(format!("unexpected denominator {}", denominator));
                }
            }
            r[3] = sign * numerator * (DEN / denominator);
        } else {
            let axis = axis_of(c).ok_or_else(|| format!("unexpected character '{}'", c))?;
            r[axis] += sign;
            i += 1;
        }
        sign = 0;
    }
    if sign != 0 {
        return Err("empty term or trailing sign".to_string());
    }
    Ok(r)
}

fn axis_of(c: char) -> Option<usize> {
    match c {
        'x' | 'X' | 'h' | 'H' | 'a' | 'A' => Some(0),
        'y' | 'Y' | 'k' | 'K' | 'b' | 'B' => Some(1),
        'z' | 'Z' | 'l' | 'L' | 'c' | 'C' => Some(2),
        _ => None,
    }
}

fn read_integer(chars: &[char], i: &mut usize) -> i32 {
    let mut value = 0i32;
    while *i < chars.len() {
        match chars[*i].to_digit(10) {
            Some(d) => {
                value = value.saturating_mul(10).saturating_add(d as i32);
                *i += 1;
            }
            None => break,
        }
    }
    value
}

fn make_triplet_part(row: [i32; 3], tran: i32) -> String {
    let mut s = String::new();
    for (i, &v) in row.iter().enumerate() {
        if v != 0 {
            if v < 0 {
                s.push('-');
            } else if !s.is_empty() {
                s.push('+');
            }
            if v.abs() != 1 {
                s.push_str(&v.abs().to_string());
                s.push('*');
            }
            s.push((b'x' + i as u8) as char);
        }
    }
    if tran != 0 {
        let mut numerator = tran;
        let mut denominator = DEN;
        for factor in [2, 2, 3] {
            if numerator % factor == 0 && denominator % factor == 0 {
                numerator /= factor;
                denominator /= factor;
            }
        }
        if numerator > 0 && !s.is_empty() {
            s.push('+');
        }
        s.push_str(&numerator.to_string());
        if denominator != 1 {
            s.push('/');
            s.push_str(&denominator.to_string());
        }
    }
    if s.is_empty() {
        s.push('0');
    }
    s
}
