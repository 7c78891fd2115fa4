// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! AAC Main backward-adaptive frequency domain prediction (ISO/IEC 14496-3, 4.6.7).

use crate::aac::ics::IcsInfo;
use crate::sample::Sample;

/// The number of coefficients with a predictor.
const MAX_PREDICTORS: usize = 672;

/// The number of predictor reset groups.
const NUM_RESET_GROUPS: usize = 30;

/// Scale from the decoder's coefficient domain to the domain the predictor operates in.
const PRED_SCALE: f32 = 16384.0;

#[inline(always)]
fn flt16_round(x: f32) -> f32 {
    f32::from_bits(x.to_bits().wrapping_add(0x8000) & 0xffff_0000)
}

#[inline(always)]
fn flt16_even(x: f32) -> f32 {
    let bits = x.to_bits();
    f32::from_bits(bits.wrapping_add(0x7fff + (bits & 1)) & 0xffff_0000)
}

#[inline(always)]
fn flt16_trunc(x: f32) -> f32 {
    f32::from_bits(x.to_bits() & 0xffff_0000)
}

#[derive(Clone, Copy)]
struct PredictorState {
    cor0: f32,
    cor1: f32,
    var0: f32,
    var1: f32,
    r0: f32,
    r1: f32,
}

impl Default for PredictorState {
    fn default() -> Self {
        PredictorState { cor0: 0.0, cor1: 0.0, var0: 1.0, var1: 1.0, r0: 0.0, r1: 0.0 }
    }
}

impl PredictorState {
    /// Run the second order lattice predictor for one coefficient. If `output` is set, the
    /// prediction is added to the coefficient.
    fn predict(&mut self, coef: &mut f32, output: bool) {
        const A: f32 = 0.953125;
        const ALPHA: f32 = 0.90625;

        let k1 = if self.var0 > 1.0 { self.cor0 * flt16_even(A / self.var0) } else { 0.0 };
        let k2 = if self.var1 > 1.0 { self.cor1 * flt16_even(A / self.var1) } else { 0.0 };

        let pv = flt16_round(k1 * self.r0 + k2 * self.r1);

        if output {
            *coef += pv;
        }

        let e0 = *coef;
        let e1 = e0 - k1 * self.r0;

        self.cor1 = flt16_trunc(ALPHA * self.cor1 + self.r1 * e1);
        self.var1 = flt16_trunc(ALPHA * self.var1 + 0.5 * (self.r1 * self.r1 + e1 * e1));
        self.cor0 = flt16_trunc(ALPHA * self.cor0 + self.r0 * e0);
        self.var0 = flt16_trunc(ALPHA * self.var0 + 0.5 * (self.r0 * self.r0 + e0 * e0));

        self.r1 = flt16_trunc(A * (self.r0 - k1 * e0));
        self.r0 = flt16_trunc(A * e0);
    }
}

/// The predictor states of one channel. States are allocated on first use.
#[derive(Clone, Default)]
pub struct Predictor {
    states: Vec<PredictorState>,
}

impl Predictor {
    pub fn new() -> Self {
        Predictor { states: Vec::new() }
    }

    /// Discard all state. The predictors are reset when next used.
    pub fn invalidate(&mut self) {
        self.states.clear();
    }

    fn reset_all(&mut self) {
        self.states.clear();
        self.states.resize(MAX_PREDICTORS, PredictorState::default());
    }

    fn reset_group(&mut self, group: usize) {
        for state in self.states.iter_mut().skip(group - 1).step_by(NUM_RESET_GROUPS) {
            *state = PredictorState::default();
        }
    }

    /// Apply prediction to the coefficients of a frame and update the predictor states.
    pub fn apply<S: Sample>(&mut self, coeffs: &mut [S], info: &IcsInfo, pred_sfb_max: usize) {
        if self.states.is_empty() {
            self.reset_all();
        }

        if info.is_eight_short() {
            self.reset_all();
            return;
        }

        let bands = info.swb_offset;

        for sfb in 0..pred_sfb_max.min(info.num_swb) {
            let output = info.predictor_present && info.prediction_used[sfb];

            let end = bands[sfb + 1].min(MAX_PREDICTORS);

            for k in bands[sfb]..end {
                let mut coef = coeffs[k].to_f32() * PRED_SCALE;

                self.states[k].predict(&mut coef, output);

                if output {
                    coeffs[k] = S::from_f32(coef / PRED_SCALE);
                }
            }
        }

        if info.predictor_present && info.predictor_reset_group != 0 {
            self.reset_group(info.predictor_reset_group);
        }
    }
}
