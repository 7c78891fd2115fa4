// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Numeric domains for spectral reconstruction.
//!
//! The decoder is generic over a [`Sample`] type. Two domains are provided: `f32` and [`Fixed`],
//! a signed Q15.16 fixed-point number.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use lazy_static::lazy_static;

/// The largest quantized magnitude an escape sequence can yield.
const MAX_QUANT: usize = 8191;

lazy_static! {
    /// Pre-computed table of y = x^(4/3).
    static ref POW43_TABLE: [f32; MAX_QUANT + 1] = {
        let mut pow43 = [0f32; MAX_QUANT + 1];
        for (i, pow43) in pow43.iter_mut().enumerate() {
            *pow43 = f32::powf(i as f32, 4.0 / 3.0);
        }
        pow43
    };

    /// Pre-computed table of y = x * cbrt(x), in Q8.
    static ref CBRT_TABLE: [u32; MAX_QUANT + 1] = {
        let mut cbrt = [0u32; MAX_QUANT + 1];
        for (i, cbrt) in cbrt.iter_mut().enumerate() {
            *cbrt = (i as f64 * (i as f64).cbrt() * 256.0).round() as u32;
        }
        cbrt
    };
}

/// 2^(i/4) for i in 0..4, in Q14.
const QUARTER_POW2_Q14: [i64; 4] = [16384, 19484, 23170, 27554];

/// 2^(i/4) for i in 0..4, in Q16.
const QUARTER_POW2_Q16: [i64; 4] = [65536, 77936, 92682, 110218];

/// A numeric domain the spectral decoder and reconstruction tools operate in.
pub trait Sample:
    Copy
    + Default
    + PartialEq
    + PartialOrd
    + fmt::Debug
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
{
    /// The additive identity.
    const ZERO: Self;

    fn from_f32(value: f32) -> Self;

    fn to_f32(self) -> f32;

    /// The square root. Negative values yield zero.
    fn sqrt(self) -> Self;

    /// Returns `2^(exp / 4)`.
    fn pow2_quarter(exp: i32) -> Self;

    /// Dequantizes a quantized spectral value: `sign(q) * |q|^(4/3) * 2^(exp / 4)`.
    fn dequantize(q: i32, exp: i32) -> Self;
}

impl Sample for f32 {
    const ZERO: Self = 0.0;

    #[inline(always)]
    fn from_f32(value: f32) -> Self {
        value
    }

    #[inline(always)]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline(always)]
    fn sqrt(self) -> Self {
        if self > 0.0 {
            f32::sqrt(self)
        }
        else {
            0.0
        }
    }

    #[inline(always)]
    fn pow2_quarter(exp: i32) -> Self {
        2.0f32.powf(0.25 * exp as f32)
    }

    #[inline]
    fn dequantize(q: i32, exp: i32) -> Self {
        let mag = q.unsigned_abs() as usize;

        let pow43 = match POW43_TABLE.get(mag) {
            Some(&pow43) => pow43,
            None => (mag as f32).powf(4.0 / 3.0),
        };

        let val = pow43 * Self::pow2_quarter(exp);

        if q < 0 {
            -val
        }
        else {
            val
        }
    }
}

/// A signed Q15.16 fixed-point number. Arithmetic saturates.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed(i32);

impl Fixed {
    /// The number of fractional bits.
    pub const FRAC_BITS: u32 = 16;

    pub const ONE: Fixed = Fixed(1 << Self::FRAC_BITS);

    pub const fn from_bits(bits: i32) -> Self {
        Fixed(bits)
    }

    pub const fn to_bits(self) -> i32 {
        self.0
    }

    #[inline(always)]
    fn saturate(value: i64) -> Self {
        Fixed(value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
    }

    /// Multiplies `value` by `2^exp` with rounding, where `value` has `frac_bits` fractional bits,
    /// and returns the result in Q16.
    #[inline]
    fn scale_to_q16(value: i64, frac_bits: i32, exp: i32) -> Self {
        let shift = frac_bits - Self::FRAC_BITS as i32 - exp;

        if shift > 0 {
            if shift >= 63 {
                Fixed(0)
            }
            else {
                Self::saturate((value + (1 << (shift - 1))) >> shift)
            }
        }
        else {
            let shift = -shift;
            if shift >= 32 || value.unsigned_abs() > (u64::from(u32::MAX) >> shift) {
                Self::saturate(if value < 0 { i64::MIN } else { i64::MAX })
            }
            else {
                Self::saturate(value << shift)
            }
        }
    }
}

impl fmt::Debug for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed({})", self.to_f32())
    }
}

impl Add for Fixed {
    type Output = Fixed;

    #[inline(always)]
    fn add(self, rhs: Fixed) -> Fixed {
        Fixed(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Fixed {
    type Output = Fixed;

    #[inline(always)]
    fn sub(self, rhs: Fixed) -> Fixed {
        Fixed(self.0.saturating_sub(rhs.0))
    }
}

impl Mul for Fixed {
    type Output = Fixed;

    #[inline(always)]
    fn mul(self, rhs: Fixed) -> Fixed {
        let prod = i64::from(self.0) * i64::from(rhs.0);
        Fixed::saturate((prod + (1 << (Fixed::FRAC_BITS - 1))) >> Fixed::FRAC_BITS)
    }
}

impl Div for Fixed {
    type Output = Fixed;

    #[inline(always)]
    fn div(self, rhs: Fixed) -> Fixed {
        if rhs.0 == 0 {
            return Fixed::saturate(if self.0 < 0 { i64::MIN } else { i64::MAX });
        }
        Fixed::saturate((i64::from(self.0) << Fixed::FRAC_BITS) / i64::from(rhs.0))
    }
}

impl Neg for Fixed {
    type Output = Fixed;

    #[inline(always)]
    fn neg(self) -> Fixed {
        Fixed(self.0.saturating_neg())
    }
}

impl AddAssign for Fixed {
    #[inline(always)]
    fn add_assign(&mut self, rhs: Fixed) {
        *self = *self + rhs;
    }
}

impl SubAssign for Fixed {
    #[inline(always)]
    fn sub_assign(&mut self, rhs: Fixed) {
        *self = *self - rhs;
    }
}

impl Sample for Fixed {
    const ZERO: Self = Fixed(0);

    #[inline(always)]
    fn from_f32(value: f32) -> Self {
        // Float to integer casts saturate.
        Fixed((value * (1 << Self::FRAC_BITS) as f32).round() as i32)
    }

    #[inline(always)]
    fn to_f32(self) -> f32 {
        self.0 as f32 / (1 << Self::FRAC_BITS) as f32
    }

    fn sqrt(self) -> Self {
        if self.0 <= 0 {
            return Fixed(0);
        }

        // sqrt(x * 2^16) * 2^8 = sqrt(x * 2^32), computed as an integer square root.
        let n = (self.0 as u64) << Self::FRAC_BITS;

        let mut root = 0u64;
        let mut rem = n;
        let mut bit = 1u64 << 62;

        while bit > n {
            bit >>= 2;
        }

        while bit != 0 {
            if rem >= root + bit {
                rem -= root + bit;
                root = (root >> 1) + bit;
            }
            else {
                root >>= 1;
            }
            bit >>= 2;
        }

        Fixed(root as i32)
    }

    #[inline]
    fn pow2_quarter(exp: i32) -> Self {
        let mant = QUARTER_POW2_Q16[exp.rem_euclid(4) as usize];
        Self::scale_to_q16(mant, 16, exp.div_euclid(4))
    }

    #[inline]
    fn dequantize(q: i32, exp: i32) -> Self {
        let mag = q.unsigned_abs() as usize;

        let pow43 = match CBRT_TABLE.get(mag) {
            Some(&pow43) => i64::from(pow43),
            None => (mag as f64 * (mag as f64).cbrt() * 256.0).round() as i64,
        };

        // Q8 * Q14 = Q22.
        let val = pow43 * QUARTER_POW2_Q14[exp.rem_euclid(4) as usize];
        let val = Self::scale_to_q16(val, 22, exp.div_euclid(4));

        if q < 0 {
            -val
        }
        else {
            val
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32, rel: f32, abs: f32) -> bool {
        (a - b).abs() <= (rel * b.abs()).max(abs)
    }

    #[test]
    fn verify_fixed_arithmetic() {
        let a = Fixed::from_f32(1.5);
        let b = Fixed::from_f32(-0.25);

        assert_eq!((a + b).to_f32(), 1.25);
        assert_eq!((a - b).to_f32(), 1.75);
        assert_eq!((a * b).to_f32(), -0.375);
        assert_eq!((a / b).to_f32(), -6.0);
        assert_eq!((-a).to_f32(), -1.5);
        assert_eq!(Fixed::from_f32(2.25).sqrt().to_f32(), 1.5);
        assert_eq!(Fixed::from_f32(-1.0).sqrt(), Fixed::ZERO);

        // Saturation instead of overflow.
        let big = Fixed::from_bits(i32::MAX);
        assert_eq!((big + big).to_bits(), i32::MAX);
        assert_eq!((big * Fixed::from_f32(4.0)).to_bits(), i32::MAX);
        assert_eq!((Fixed::ONE / Fixed::ZERO).to_bits(), i32::MAX);
    }

    #[test]
    fn verify_pow2_quarter() {
        for exp in -40..40 {
            let fl = f32::pow2_quarter(exp);
            let fx = Fixed::pow2_quarter(exp).to_f32();
            assert!(close(fx, fl, 1e-4, 2.0 / 65536.0), "exp={} {} != {}", exp, fx, fl);
        }
    }

    #[test]
    fn verify_dequantize_domains_agree() {
        // Scalefactor exponents spanning typical content, chosen so the fixed-point range is not
        // exceeded by the largest magnitude.
        for exp in -60..-12 {
            for q in [0, 1, -1, 2, 3, -7, 16, 100, -1000, 8191] {
                let fl = f32::dequantize(q, exp);
                let fx = Fixed::dequantize(q, exp).to_f32();
                assert!(close(fx, fl, 2e-3, 2.0 / 65536.0), "q={} exp={} {} != {}", q, exp, fx, fl);
            }
        }
    }

    #[test]
    fn verify_dequantize_zero_is_exact() {
        for exp in -100..100 {
            assert_eq!(f32::dequantize(0, exp), 0.0);
            assert_eq!(Fixed::dequantize(0, exp), Fixed::ZERO);
        }
    }

    #[test]
    fn verify_dequantize_large_magnitude() {
        // Magnitudes beyond the table are computed directly.
        let fl = f32::dequantize(8200, 0);
        assert!(close(fl, 8200f32.powf(4.0 / 3.0), 1e-5, 0.0));
        assert_eq!(Fixed::dequantize(8200, 0).to_bits(), i32::MAX);
    }
}
