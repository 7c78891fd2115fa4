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

//! Temporal noise shaping.

use symphonia_core::errors::{decode_error, Result};
use symphonia_core::io::ReadBitsLtr;

use std::f32::consts;

use lazy_static::lazy_static;

use crate::aac::common::*;
use crate::aac::ics::IcsInfo;
use crate::common::M4AType;
use crate::sample::Sample;

const TNS_MAX_ORDER: usize = 20;
const TNS_MAX_FILTERS: usize = 4;

lazy_static! {
    /// Inverse quantized reflection coefficients, indexed by `2 * compress + resolution` and the
    /// transmitted coefficient.
    static ref TNS_COEFS: [[f32; 16]; 4] = {
        let mut table = [[0f32; 16]; 4];

        for (i, row) in table.iter_mut().enumerate() {
            let coef_res = i & 1 == 1;
            let coef_compress = i & 2 == 2;

            // If coef_res is true, then the transmitted resolution of the filter coefficients
            // is 4 bits, otherwise it's 3 (4.6.9.2). If coef_compress is true, the most
            // significant bit is not transmitted.
            let coef_res_bits = (if coef_res { 4 } else { 3 }) - usize::from(coef_compress);

            let sign_mask = 1 << (coef_res_bits - 1);
            let neg_mask = !((1 << coef_res_bits) - 1);

            // Derived from `1 << (coef_res_bits - 1)` before compression.
            let fac_base = if coef_res { 8.0 } else { 4.0 };

            let iqfac = (fac_base - 0.5) / consts::FRAC_PI_2;
            let iqfac_m = (fac_base + 0.5) / consts::FRAC_PI_2;

            for (val, coef) in row[..1 << coef_res_bits].iter_mut().enumerate() {
                let val = val as u8;

                // Convert to signed integer.
                let c = f32::from(if (val & sign_mask) != 0 {
                    (val | neg_mask) as i8
                }
                else {
                    val as i8
                });

                *coef = (if c >= 0.0 { c / iqfac } else { c / iqfac_m }).sin();
            }
        }

        table
    };
}

#[derive(Copy, Clone)]
struct TnsFilter<S: Sample> {
    length: usize,
    order: usize,
    direction: bool,
    lpc: [S; TNS_MAX_ORDER],
}

impl<S: Sample> TnsFilter<S> {
    fn new() -> Self {
        Self { length: 0, order: 0, direction: false, lpc: [S::ZERO; TNS_MAX_ORDER] }
    }

    fn read<B: ReadBitsLtr>(
        &mut self,
        bs: &mut B,
        eight_short: bool,
        coef_res: bool,
        max_order: usize,
    ) -> Result<()> {
        self.length = bs.read_bits_leq32(if eight_short { 4 } else { 6 })? as usize;
        self.order = bs.read_bits_leq32(if eight_short { 3 } else { 5 })? as usize;

        if self.order > max_order {
            log::error!("tns filter order {} is greater than {}", self.order, max_order);
            self.order = 0;
            return decode_error("aac: invalid tns filter order");
        }

        if self.order > 0 {
            self.direction = bs.read_bool()?;

            let coef_compress = bs.read_bool()?;

            let coef_len = u32::from(coef_res) + 3 - u32::from(coef_compress);
            let table = &TNS_COEFS[2 * usize::from(coef_compress) + usize::from(coef_res)];

            let mut parcor = [0f32; TNS_MAX_ORDER];

            for el in parcor[..self.order].iter_mut() {
                *el = table[bs.read_bits_leq32(coef_len)? as usize];
            }

            // Generate LPC coefficients
            let mut lpc = [0f32; TNS_MAX_ORDER];
            let mut b = [0f32; TNS_MAX_ORDER + 1];

            for m in 1..=self.order {
                for i in 1..m {
                    b[i] = lpc[i - 1] + parcor[m - 1] * lpc[m - i - 1];
                }

                lpc[..(m - 1)].copy_from_slice(&b[1..m]);
                lpc[m - 1] = parcor[m - 1];
            }

            for (dst, &src) in self.lpc.iter_mut().zip(&lpc) {
                *dst = S::from_f32(src);
            }
        }

        Ok(())
    }
}

#[derive(Clone)]
pub struct Tns<S: Sample> {
    pub present: bool,
    n_filt: [usize; MAX_WINDOWS],
    filters: [[TnsFilter<S>; TNS_MAX_FILTERS]; MAX_WINDOWS],
}

impl<S: Sample> Tns<S> {
    pub fn new() -> Self {
        Self {
            present: false,
            n_filt: [0; MAX_WINDOWS],
            filters: [[TnsFilter::new(); TNS_MAX_FILTERS]; MAX_WINDOWS],
        }
    }

    /// Read the TNS data of an ICS.
    pub fn read<B: ReadBitsLtr>(
        &mut self,
        bs: &mut B,
        info: &IcsInfo,
        object_type: M4AType,
    ) -> Result<()> {
        let eight_short = info.is_eight_short();

        // Table 4.156
        let max_order = if eight_short {
            7
        }
        else if object_type == M4AType::Main {
            TNS_MAX_ORDER
        }
        else {
            12
        };

        for w in 0..info.num_windows {
            self.n_filt[w] = bs.read_bits_leq32(if eight_short { 1 } else { 2 })? as usize;

            if self.n_filt[w] == 0 {
                continue;
            }

            let coef_res = bs.read_bool()?;

            for filt in 0..self.n_filt[w] {
                self.filters[w][filt].read(bs, eight_short, coef_res, max_order)?;
            }
        }

        Ok(())
    }

    /// Apply the TNS filters to the spectral coefficients.
    pub fn apply(&self, info: &IcsInfo, coeffs: &mut [S]) {
        let bands = info.swb_offset;
        let tns_max_bands = info.tns_max_bands.min(info.max_sfb);

        if tns_max_bands == 0 {
            return;
        }

        let win_len = coeffs.len() / info.num_windows;

        for w in 0..info.num_windows {
            let mut bottom = info.num_swb;

            for filt in &self.filters[w][..self.n_filt[w]] {
                let top = bottom;

                bottom = top.saturating_sub(filt.length);

                let order = filt.order;

                if order == 0 {
                    continue;
                }

                let start = w * win_len + bands[bottom.min(tns_max_bands)];
                let end = w * win_len + bands[top.min(tns_max_bands)];

                if end <= start {
                    continue;
                }

                let lpc = &filt.lpc;

                if !filt.direction {
                    for (m, i) in (start..end).enumerate() {
                        for j in 0..order.min(m) {
                            let prev = coeffs[i - j - 1];
                            coeffs[i] -= prev * lpc[j];
                        }
                    }
                }
                else {
                    for (m, i) in (start..end).rev().enumerate() {
                        for j in 0..order.min(m) {
                            let next = coeffs[i + j + 1];
                            coeffs[i] -= next * lpc[j];
                        }
                    }
                }
            }
        }
    }
}
