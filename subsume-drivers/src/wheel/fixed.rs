//! Q16.16 fixed-point numbers for the wheel loop
//!
//! Wheel loop gains are small fractions applied to tick-rate errors of a
//! few dozen ticks, well inside the Q16.16 range.

use core::ops::{Add, Neg, Sub};

/// Signed Q16.16 fixed-point value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Q16(i32);

impl Q16 {
    /// Zero value
    pub const ZERO: Self = Self(0);
    /// One
    pub const ONE: Self = Self(1 << Self::FRAC_BITS);

    const FRAC_BITS: u32 = 16;

    /// Whole number
    ///
    /// ```
    /// use subsume_drivers::wheel::fixed::Q16;
    /// assert_eq!(Q16::from_int(-12).round(), -12);
    /// ```
    pub const fn from_int(n: i16) -> Self {
        Self((n as i32) << Self::FRAC_BITS)
    }

    /// Value given in hundredths, e.g. `125` for 1.25
    pub const fn from_hundredths(n: i32) -> Self {
        Self((((n as i64) << Self::FRAC_BITS) / 100) as i32)
    }

    /// Round to the nearest integer, halves away from zero
    pub const fn round(self) -> i32 {
        let half = 1 << (Self::FRAC_BITS - 1);
        if self.0 >= 0 {
            self.0.saturating_add(half) >> Self::FRAC_BITS
        } else {
            -(self.0.saturating_neg().saturating_add(half) >> Self::FRAC_BITS)
        }
    }

    /// Multiply by an integer quantity such as a tick error
    pub fn scale(self, n: i32) -> Self {
        Self(self.0.saturating_mul(n))
    }

    /// Add, saturating at the numeric bounds
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Limit to `[-limit, limit]`
    pub fn limit(self, limit: Self) -> Self {
        let bound = limit.0.saturating_abs();
        Self(self.0.clamp(-bound, bound))
    }

    /// Check for exactly zero
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Add for Q16 {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        self.saturating_add(other)
    }
}

impl Sub for Q16 {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl Neg for Q16 {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}
