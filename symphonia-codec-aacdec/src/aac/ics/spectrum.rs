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

//! Spectral data decoding and dequantization.

use symphonia_core::errors::Result;
use symphonia_core::io::ReadBitsLtr;

use crate::aac::codebooks::{self, ESC_FLAG};
use crate::aac::common::*;
use crate::aac::ics::pulse::Pulse;
use crate::aac::ics::*;
use crate::sample::Sample;

/// The widest scalefactor band of any window length.
const MAX_BAND_WIDTH: usize = 1024;

/// Decode and dequantize the spectral coefficients of all bands. Pulses are added to the
/// quantized values of long window bands.
pub fn decode_spectrum<S: Sample, B: ReadBitsLtr>(
    ics: &mut Ics<S>,
    bs: &mut B,
    lcg: &mut Lcg,
    pulse: Option<&Pulse>,
) -> Result<()> {
    // Zero all spectral coefficients.
    ics.coeffs.fill(S::ZERO);

    let frame_len = ics.frame_len();
    let info = &ics.info;
    let bands = info.swb_offset;
    let stride = info.window_stride(frame_len);

    let mut quant = [0i32; MAX_BAND_WIDTH];

    let mut cur_w = 0;

    for g in 0..info.num_window_groups {
        let next_w = cur_w + info.group_len[g];

        for sfb in 0..info.max_sfb {
            let start = bands[sfb];
            let end = bands[sfb + 1];

            let band_type = ics.band_type[g][sfb];
            let exp = ics.sf[g][sfb];

            for w in cur_w..next_w {
                let dst = &mut ics.coeffs[start + w * stride..end + w * stride];
                let quant = &mut quant[..end - start];

                // Derived from ISO/IEC-14496-3 Table 4.151.
                match band_type {
                    ZERO_HCB | INTENSITY_HCB2 | INTENSITY_HCB => continue,
                    NOISE_HCB => {
                        decode_noise(lcg, exp, dst);
                        continue;
                    }
                    1 | 2 => {
                        let cb = &codebooks::QUADS[band_type as usize - 1];
                        decode_quads_signed(bs, cb, quant)?
                    }
                    3 | 4 => {
                        let cb = &codebooks::QUADS[band_type as usize - 1];
                        decode_quads_unsigned(bs, cb, quant)?
                    }
                    5 | 6 => {
                        let cb = &codebooks::PAIRS[band_type as usize - 5];
                        decode_pairs_signed(bs, cb, quant)?
                    }
                    7..=10 => {
                        let cb = &codebooks::PAIRS[band_type as usize - 5];
                        decode_pairs_unsigned(bs, cb, quant)?
                    }
                    ESC_HCB => decode_pairs_escape(bs, quant)?,
                    // The reserved band type is rejected when band types are decoded.
                    _ => continue,
                }

                // Pulses are only present with long windows.
                if let Some(pulse) = pulse {
                    pulse.apply(start, quant);
                }

                for (out, &q) in dst.iter_mut().zip(quant.iter()) {
                    if q != 0 {
                        *out = S::dequantize(q, exp);
                    }
                }
            }
        }

        cur_w = next_w;
    }

    Ok(())
}

/// Perceptual noise substitution decode step. Section 4.6.13.3.
fn decode_noise<S: Sample>(lcg: &mut Lcg, exp: i32, dst: &mut [S]) {
    let mut energy = S::ZERO;

    for spec in dst.iter_mut() {
        // The top 16 bits of the generator output, normalized to [-1, 1).
        *spec = S::from_f32(f32::from((lcg.next() >> 16) as i16) / 32768.0);
        energy += *spec * *spec;
    }

    let norm = energy.sqrt();

    if norm == S::ZERO {
        dst.fill(S::ZERO);
        return;
    }

    let scale = S::pow2_quarter(exp) / norm;

    for spec in dst.iter_mut() {
        *spec = *spec * scale;
    }
}

#[inline(always)]
fn read_sign<B: ReadBitsLtr>(bs: &mut B, val: i32) -> Result<i32> {
    if val != 0 && bs.read_bool()? {
        Ok(-val)
    }
    else {
        Ok(val)
    }
}

fn decode_quads_signed<B: ReadBitsLtr>(
    bs: &mut B,
    cb: &codebooks::QuadsCodebook,
    quant: &mut [i32],
) -> Result<()> {
    for out in quant.chunks_exact_mut(4) {
        let quad = cb.read_quad(bs)?;

        for (out, q) in out.iter_mut().zip(quad) {
            *out = i32::from(q);
        }
    }
    Ok(())
}

fn decode_quads_unsigned<B: ReadBitsLtr>(
    bs: &mut B,
    cb: &codebooks::QuadsCodebook,
    quant: &mut [i32],
) -> Result<()> {
    for out in quant.chunks_exact_mut(4) {
        let quad = cb.read_quad(bs)?;

        for (out, q) in out.iter_mut().zip(quad) {
            *out = read_sign(bs, i32::from(q))?;
        }
    }

    Ok(())
}

fn decode_pairs_signed<B: ReadBitsLtr>(
    bs: &mut B,
    cb: &codebooks::PairsCodebook,
    quant: &mut [i32],
) -> Result<()> {
    for out in quant.chunks_exact_mut(2) {
        let [x, y] = cb.read_pair(bs)?;

        out[0] = i32::from(x);
        out[1] = i32::from(y);
    }
    Ok(())
}

fn decode_pairs_unsigned<B: ReadBitsLtr>(
    bs: &mut B,
    cb: &codebooks::PairsCodebook,
    quant: &mut [i32],
) -> Result<()> {
    for out in quant.chunks_exact_mut(2) {
        let [x, y] = cb.read_pair(bs)?;

        out[0] = read_sign(bs, i32::from(x))?;
        out[1] = read_sign(bs, i32::from(y))?;
    }

    Ok(())
}

fn decode_pairs_escape<B: ReadBitsLtr>(bs: &mut B, quant: &mut [i32]) -> Result<()> {
    for out in quant.chunks_exact_mut(2) {
        let [a, b] = codebooks::ESC.read_pair(bs)?;

        // Read the signs of the quantized values before any escape words.
        let x = read_sign(bs, i32::from(a))?;
        let y = read_sign(bs, i32::from(b))?;

        out[0] = if a as u16 == ESC_FLAG { x.signum() * read_escape(bs)? } else { x };
        out[1] = if b as u16 == ESC_FLAG { y.signum() * read_escape(bs)? } else { y };
    }
    Ok(())
}

/// Read an escape word following an escape sentinel.
pub fn read_escape<B: ReadBitsLtr>(bs: &mut B) -> Result<i32> {
    let mut n = 0;

    while bs.read_bool()? {
        n += 1;
        validate!(n < 9);
    }

    // The escape word is added to 2^(n + 4) to yield the unsigned value.
    Ok((1 << (n + 4)) + bs.read_bits_leq32(n + 4)? as i32)
}
