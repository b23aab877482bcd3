use num_complex::Complex64;

/// A measured value with its standard uncertainty.
///
/// A missing uncertainty is stored as `NaN`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ValueSigma {
    pub value: f64,
    pub sigma: f64,
}

impl ValueSigma {
    pub fn new(value: f64, sigma: f64) -> Self {
        Self { value, sigma }
    }

    pub fn without_sigma(value: f64) -> Self {
        Self {
            value,
            sigma: f64::NAN,
        }
    }

    #[inline]
    pub fn has_sigma(&self) -> bool {
        self.sigma.is_finite() && self.sigma > 0.0
    }
}

/// Describes how a reflection value changes between symmetry-equivalent indices.
///
/// If a representative `r` is carried to index `h` by an operator with phase shift
/// `φ`, the value at `h` is `transformed(v_r, φ, friedel)`. Scalars (amplitudes,
/// intensities, flags) are invariant; complex structure factors pick up the phase
/// shift and are conjugated when `h` is only reached through Friedel negation.
///
/// `Default` is the value written for unmeasured reflections.
pub trait SymmetricValue: Copy + Default + Send + Sync + 'static {
    fn transformed(self, phase_shift: f64, friedel: bool) -> Self;

    /// Inverse of [`transformed`](Self::transformed).
    fn untransformed(self, phase_shift: f64, friedel: bool) -> Self;
}

impl SymmetricValue for Complex64 {
    #[inline]
    fn transformed(self, phase_shift: f64, friedel: bool) -> Self {
        let shifted = self * Complex64::from_polar(1.0, phase_shift);
        if friedel { shifted.conj() } else { shifted }
    }

    #[inline]
    fn untransformed(self, phase_shift: f64, friedel: bool) -> Self {
        let value = if friedel { self.conj() } else { self };
        value * Complex64::from_polar(1.0, -phase_shift)
    }
}

macro_rules! impl_invariant_value {
    ($($t:ty),*) => {
        $(
            impl SymmetricValue for $t {
                #[inline]
                fn transformed(self, _phase_shift: f64, _friedel: bool) -> Self {
                    self
                }

                #[inline]
                fn untransformed(self, _phase_shift: f64, _friedel: bool) -> Self {
                    self
                }
            }
        )*
    };
}

impl_invariant_value!(f32, f64, ValueSigma);
