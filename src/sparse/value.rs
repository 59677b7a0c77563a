//! Numeric overlay for matrix elements.
//!
//! Every element carries a single [`ElementValue`] with a real lane and an
//! imaginary lane. In real mode only the real lane is read or written; in
//! complex mode both lanes form one complex number. The matrix mode flag is the
//! only thing deciding which view is active, so switching modes never
//! reinterprets stored bits.
//!
//! The factorization and solve routines are written once, generic over
//! [`Scalar`], and instantiated for `f64` and [`Complex64`].

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

use num_complex::Complex64;

/// Value stored in a matrix element.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ElementValue {
    /// Real lane
    pub re: f64,
    /// Imaginary lane (only meaningful in complex mode)
    pub im: f64,
}

impl ElementValue {
    /// The zero value.
    pub const ZERO: ElementValue = ElementValue { re: 0.0, im: 0.0 };

    /// Create a value from both lanes.
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Real interpretation of the value.
    pub fn real(&self) -> f64 {
        self.re
    }

    /// Complex interpretation of the value.
    pub fn complex(&self) -> Complex64 {
        Complex64::new(self.re, self.im)
    }

    /// Zero both lanes.
    pub fn clear(&mut self) {
        *self = Self::ZERO;
    }
}

impl From<f64> for ElementValue {
    fn from(re: f64) -> Self {
        Self { re, im: 0.0 }
    }
}

impl From<Complex64> for ElementValue {
    fn from(c: Complex64) -> Self {
        Self { re: c.re, im: c.im }
    }
}

impl fmt::Display for ElementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.im == 0.0 {
            write!(f, "{:.6e}", self.re)
        } else {
            write!(f, "{:.6e}{:+.6e}j", self.re, self.im)
        }
    }
}

/// Arithmetic used by the factorization and solve routines.
pub trait Scalar:
    Copy
    + fmt::Debug
    + PartialEq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
{
    /// Whether this scalar is the complex view of an element.
    const COMPLEX: bool;

    /// Additive identity.
    fn zero() -> Self;

    /// Multiplicative identity.
    fn one() -> Self;

    /// Read the lanes this scalar type uses.
    fn load(value: &ElementValue) -> Self;

    /// Write the lanes this scalar type uses.
    fn store(self, value: &mut ElementValue);

    /// Pivoting magnitude: `|re| + |im|`.
    fn magnitude(self) -> f64;

    /// Add to the lanes this scalar type uses.
    fn accumulate(self, value: &mut ElementValue) {
        let current = Self::load(value);
        (current + self).store(value);
    }
}

impl Scalar for f64 {
    const COMPLEX: bool = false;

    fn zero() -> Self {
        0.0
    }

    fn one() -> Self {
        1.0
    }

    fn load(value: &ElementValue) -> Self {
        value.re
    }

    fn store(self, value: &mut ElementValue) {
        value.re = self;
    }

    fn magnitude(self) -> f64 {
        self.abs()
    }
}

impl Scalar for Complex64 {
    const COMPLEX: bool = true;

    fn zero() -> Self {
        Complex64::new(0.0, 0.0)
    }

    fn one() -> Self {
        Complex64::new(1.0, 0.0)
    }

    fn load(value: &ElementValue) -> Self {
        value.complex()
    }

    fn store(self, value: &mut ElementValue) {
        value.re = self.re;
        value.im = self.im;
    }

    fn magnitude(self) -> f64 {
        self.l1_norm()
    }
}
