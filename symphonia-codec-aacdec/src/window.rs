// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// Previous Author: Kostya Shishkov <kostya.shiskov@gmail.com>
//
// This source file includes code originally written for the NihAV
// project. With the author's permission, it has been relicensed for,
// and ported to the Symphonia project.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transform window generation.

use std::f32::consts;

use lazy_static::lazy_static;

/// Window types.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowType {
    /// Simple sine window.
    Sine,
    /// Kaiser-Bessel derived window.
    KaiserBessel(f32),
}

lazy_static! {
    pub static ref KBD_LONG_1024: [f32; 1024] = rising_half(WindowType::KaiserBessel(4.0));
    pub static ref KBD_SHORT_128: [f32; 128] = rising_half(WindowType::KaiserBessel(6.0));
    pub static ref SINE_LONG_1024: [f32; 1024] = rising_half(WindowType::Sine);
    pub static ref SINE_SHORT_128: [f32; 128] = rising_half(WindowType::Sine);
    pub static ref SINE_LONG_512: [f32; 512] = rising_half(WindowType::Sine);
    /// The low overlap window of the 512 sample low delay filterbank.
    pub static ref LOW_OVERLAP_512: [f32; 512] = low_overlap();
}

/// The rising half of a window of `2 * N` samples.
fn rising_half<const N: usize>(mode: WindowType) -> [f32; N] {
    let mut win = [0.0; N];
    generate_window(mode, 1.0, N, true, &mut win);
    win
}

/// A window that is zero for the first 3/8 of the half, and one for the last 3/8, with a sine
/// transition between.
fn low_overlap() -> [f32; 512] {
    let mut win = [0.0; 512];

    let mut sine = [0.0; 128];
    generate_window(WindowType::Sine, 1.0, 128, true, &mut sine);

    win[192..320].copy_from_slice(&sine);
    win[320..].fill(1.0);
    win
}

/// Calculates window coefficients for the requested window type and size.
///
/// Set `half` flag to calculate only the first half of the window.
pub fn generate_window(mode: WindowType, scale: f32, size: usize, half: bool, dst: &mut [f32]) {
    match mode {
        WindowType::Sine => {
            let param =
                if half { consts::PI / ((2 * size) as f32) } else { consts::PI / (size as f32) };

            for (n, w) in dst[..size].iter_mut().enumerate() {
                *w = (((n as f32) + 0.5) * param).sin() * scale;
            }
        }
        WindowType::KaiserBessel(alpha) => {
            let dlen = if half { size as f32 } else { (size as f32) * 0.5 };
            let alpha2 = f64::from((alpha * consts::PI / dlen) * (alpha * consts::PI / dlen));

            let mut kb: Vec<f64> = Vec::with_capacity(size);
            let mut sum = 0.0;

            for n in 0..size {
                let b = bessel_i0(((n * (size - n)) as f64) * alpha2);
                sum += b;
                kb.push(sum);
            }

            sum += 1.0;

            for (w, k) in dst[..size].iter_mut().zip(&kb) {
                *w = (k / sum).sqrt() as f32 * scale;
            }
        }
    };
}

fn bessel_i0(inval: f64) -> f64 {
    let mut val: f64 = 1.0;
    for n in (1..64).rev() {
        val *= inval / f64::from(n * n);
        val += 1.0;
    }
    val
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A window half `w` permits perfect reconstruction if `w[n]^2 + w[N - 1 - n]^2 = 1`.
    fn is_power_complementary(win: &[f32]) -> bool {
        let n = win.len();
        (0..n).all(|i| (win[i] * win[i] + win[n - 1 - i] * win[n - 1 - i] - 1.0).abs() < 1e-4)
    }

    #[test]
    fn verify_windows_reconstruct() {
        assert!(is_power_complementary(&SINE_LONG_1024[..]));
        assert!(is_power_complementary(&SINE_SHORT_128[..]));
        assert!(is_power_complementary(&KBD_LONG_1024[..]));
        assert!(is_power_complementary(&KBD_SHORT_128[..]));
        assert!(is_power_complementary(&LOW_OVERLAP_512[..]));
    }

    #[test]
    fn verify_windows_rise() {
        for win in [&SINE_LONG_1024[..], &KBD_LONG_1024[..], &LOW_OVERLAP_512[..]] {
            assert!(win.windows(2).all(|w| w[0] <= w[1]));
            assert!(win[0] < 0.01);
            assert!(win[win.len() - 1] > 0.99);
        }
    }
}
