// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use symphonia_core::errors::Result;
use symphonia_core::io::ReadBitsLtr;

use crate::aac::common::MAX_LTP_LONG_SFB;
use crate::aac::ics::IcsInfo;
use crate::sample::Sample;

/// Quantized long term prediction gains (Table 4.147).
const LTP_COEF: [f32; 8] =
    [0.570829, 0.696616, 0.813004, 0.911304, 0.984900, 1.067894, 1.194601, 1.369533];

/// Long term prediction side information.
#[derive(Clone, Copy, Debug)]
pub struct Ltp {
    pub present: bool,
    pub lag: u16,
    pub coef: f32,
    pub used: [bool; MAX_LTP_LONG_SFB],
}

impl Default for Ltp {
    fn default() -> Self {
        Ltp { present: false, lag: 0, coef: 0.0, used: [false; MAX_LTP_LONG_SFB] }
    }
}

impl Ltp {
    pub fn read<B: ReadBitsLtr>(&mut self, bs: &mut B, max_sfb: usize) -> Result<()> {
        self.lag = bs.read_bits_leq32(11)? as u16;
        self.coef = LTP_COEF[bs.read_bits_leq32(3)? as usize];

        for used in self.used[..max_sfb.min(MAX_LTP_LONG_SFB)].iter_mut() {
            *used = bs.read_bool()?;
        }

        Ok(())
    }

    /// Add the predicted coefficients of every band that uses prediction.
    pub fn add_prediction<S: Sample>(&self, info: &IcsInfo, pred: &[S], coeffs: &mut [S]) {
        let bands = info.swb_offset;

        for sfb in 0..info.max_sfb.min(MAX_LTP_LONG_SFB) {
            if !self.used[sfb] {
                continue;
            }

            let range = bands[sfb]..bands[sfb + 1];

            for (c, &p) in coeffs[range.clone()].iter_mut().zip(&pred[range]) {
                *c += p;
            }
        }
    }
}

/// The time-domain history of a channel: the output of the last two frames, followed by the
/// windowed overlap of the last frame.
#[derive(Clone)]
pub struct LtpState<S: Sample> {
    buf: Vec<S>,
}

impl<S: Sample> LtpState<S> {
    pub fn new(frame_len: usize) -> Self {
        LtpState { buf: vec![S::ZERO; 3 * frame_len] }
    }

    pub fn reset(&mut self) {
        self.buf.fill(S::ZERO);
    }

    /// Shift in the output and overlap of the frame just transformed.
    pub fn update(&mut self, output: &[S], overlap: &[S]) {
        let n = overlap.len();

        self.buf.copy_within(n..2 * n, 0);
        self.buf[n..2 * n].copy_from_slice(&output[..n]);
        self.buf[2 * n..].copy_from_slice(overlap);
    }

    /// Write the predicted time signal of two frames, the history delayed by the lag and scaled
    /// by the gain. Samples past the end of the history are zero.
    pub fn predict(&self, ltp: &Ltp, dst: &mut [f32]) {
        let n = self.buf.len() / 3;
        let lag = usize::from(ltp.lag).min(2 * n);

        let count = if lag < n { lag + n } else { 2 * n };

        for (out, &x) in dst[..count].iter_mut().zip(&self.buf[2 * n - lag..]) {
            *out = x.to_f32() * ltp.coef;
        }

        dst[count..2 * n].fill(0.0);
    }
}
