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

//! Inverse transform and overlap-add of a channel.

use symphonia_core::dsp::mdct::Imdct;
use symphonia_core::errors::{unsupported_error, Result};

use crate::aac::common::*;
use crate::aac::ics::Ics;
use crate::common::M4AType;
use crate::sample::Sample;
use crate::window::*;

/// Converts the spectral coefficients of one channel into time-domain samples.
pub trait SpectralTransform<S: Sample>: Send + Sync {
    /// Transform `ics.coeffs` into the first frame length samples of `ics.output`, adding the
    /// overlap of the previous frame and saving the overlap of this frame in `ics.overlap`.
    fn synth(&mut self, ics: &mut Ics<S>, object_type: M4AType) -> Result<()>;

    /// Transform the long term prediction of a long window channel into `pred`. Returns false if
    /// the transform has no forward transform for the frame length.
    fn predict_ltp(&mut self, _ics: &Ics<S>, _pred: &mut [S]) -> Result<bool> {
        Ok(false)
    }
}

const NO_WINDOW: &[f32] = &[];

/// The long and short windows of a window shape for 1024 sample frames.
fn standard_windows(shape: bool) -> (&'static [f32], &'static [f32]) {
    if shape {
        (&KBD_LONG_1024[..], &KBD_SHORT_128[..])
    }
    else {
        (&SINE_LONG_1024[..], &SINE_SHORT_128[..])
    }
}

/// A forward MDCT built on the inverse transform. The MDCT of 2N samples folds into a DCT-IV of N
/// samples, and the DCT-IV is the middle half of an N-point IMDCT.
struct Mdct {
    imdct: Imdct,
    folded: Vec<f32>,
    pcm: Vec<f32>,
}

impl Mdct {
    fn new_scaled(n: usize, scale: f64) -> Self {
        Mdct { imdct: Imdct::new_scaled(n, scale), folded: vec![0.0; n], pcm: vec![0.0; 2 * n] }
    }

    /// Transform the 2N samples of `src` into the N coefficients of `dst`.
    fn mdct(&mut self, src: &[f32], dst: &mut [f32]) {
        let n = self.folded.len();
        let h = n / 2;

        let (a, rest) = src.split_at(h);
        let (b, rest) = rest.split_at(h);
        let (c, d) = rest.split_at(h);

        for i in 0..h {
            self.folded[i] = -c[h - 1 - i] - d[i];
            self.folded[h + i] = a[i] - b[h - 1 - i];
        }

        self.imdct.imdct(&self.folded, &mut self.pcm);

        // The first half of the DCT-IV is mirrored, with a sign change, past the middle.
        for k in 0..h {
            dst[k] = -self.pcm[3 * h - 1 - k];
        }

        dst[h..n].copy_from_slice(&self.pcm[..h]);
    }
}

/// The long term prediction path of 1024 sample frames.
struct LtpAnalysis {
    mdct: Mdct,
    time: Vec<f32>,
    spec: Vec<f32>,
}

impl LtpAnalysis {
    fn new() -> Self {
        // The inverse transform is scaled by 1 / 2N. A factor of 2 maps output samples back onto
        // coefficients.
        LtpAnalysis {
            mdct: Mdct::new_scaled(1024, 2.0),
            time: vec![0.0; 2048],
            spec: vec![0.0; 1024],
        }
    }

    fn predict<S: Sample>(&mut self, ics: &Ics<S>, pred: &mut [S]) {
        let info = &ics.info;

        ics.ltp_state.predict(&info.ltp, &mut self.time);

        let (long_win, short_win) = standard_windows(info.window_shape);
        let (prev_long_win, prev_short_win) = standard_windows(info.prev_window_shape);

        let (first, second) = self.time.split_at_mut(1024);

        if info.window_sequence != LONG_STOP_SEQUENCE {
            for (x, &w) in first.iter_mut().zip(prev_long_win) {
                *x *= w;
            }
        }
        else {
            first[..448].fill(0.0);

            for (x, &w) in first[448..576].iter_mut().zip(prev_short_win) {
                *x *= w;
            }
        }

        if info.window_sequence != LONG_START_SEQUENCE {
            for (x, &w) in second.iter_mut().zip(long_win.iter().rev()) {
                *x *= w;
            }
        }
        else {
            for (x, &w) in second[448..576].iter_mut().zip(short_win.iter().rev()) {
                *x *= w;
            }

            second[576..].fill(0.0);
        }

        self.mdct.mdct(&self.time, &mut self.spec);

        for (p, &x) in pred.iter_mut().zip(&self.spec) {
            *p = S::from_f32(x);
        }
    }
}

/// An inverse MDCT filterbank for one frame length.
struct Filterbank {
    len: usize,
    imdct_long: Imdct,
    imdct_short: Option<Imdct>,
    pcm_long: Vec<f32>,
    pcm_short: Vec<f32>,
}

impl Filterbank {
    /// The standard filterbank with long and short windows.
    fn standard() -> Self {
        Filterbank {
            len: 1024,
            imdct_long: Imdct::new_scaled(1024, 1.0 / 2048.0),
            imdct_short: Some(Imdct::new_scaled(128, 1.0 / 256.0)),
            pcm_long: vec![0.0; 2048],
            pcm_short: vec![0.0; 1024 + 128],
        }
    }

    /// The low delay filterbank, long windows only.
    fn low_delay() -> Self {
        Filterbank {
            len: 512,
            imdct_long: Imdct::new_scaled(512, 1.0 / 1024.0),
            imdct_short: None,
            pcm_long: vec![0.0; 1024],
            pcm_short: Vec::new(),
        }
    }

    /// Get the long and short windows of a window shape.
    fn windows(&self, shape: bool) -> (&'static [f32], &'static [f32]) {
        match (self.len, shape) {
            (1024, _) => standard_windows(shape),
            (_, true) => (&LOW_OVERLAP_512[..], NO_WINDOW),
            (_, false) => (&SINE_LONG_512[..], NO_WINDOW),
        }
    }

    #[allow(clippy::cognitive_complexity)]
    fn synth(
        &mut self,
        coeffs: &[f32],
        delay: &mut [f32],
        seq: u8,
        window_shape: bool,
        prev_window_shape: bool,
        dst: &mut [f32],
    ) -> Result<()> {
        let n = self.len;
        let s = n / 8;

        // The region of a frame covered by the eight short windows.
        let point0 = n / 2 - s / 2;
        let point1 = n / 2 + s / 2;

        let (long_win, short_win) = self.windows(window_shape);
        let (prev_long_win, prev_short_win) = self.windows(prev_window_shape);

        if seq != ONLY_LONG_SEQUENCE && self.imdct_short.is_none() {
            return unsupported_error("aac: short windows in a low delay frame");
        }

        // Inverse MDCT
        if seq != EIGHT_SHORT_SEQUENCE {
            self.imdct_long.imdct(coeffs, &mut self.pcm_long);
        }
        else if let Some(imdct_short) = self.imdct_short.as_mut() {
            for (ain, aout) in coeffs.chunks_exact(s).zip(self.pcm_long.chunks_exact_mut(2 * s)) {
                imdct_short.imdct(ain, aout);
            }

            // Zero the eight short sequence buffer.
            self.pcm_short.fill(0.0);

            for (w, src) in self.pcm_long.chunks_exact(2 * s).enumerate() {
                let prev_win = if w > 0 { short_win } else { prev_short_win };

                for i in 0..s {
                    self.pcm_short[w * s + i] += src[i] * prev_win[i];
                    self.pcm_short[w * s + i + s] += src[i + s] * short_win[s - 1 - i];
                }
            }
        }

        // Output new audio samples.
        match seq {
            ONLY_LONG_SEQUENCE | LONG_START_SEQUENCE => {
                for i in 0..n {
                    dst[i] = delay[i] + (self.pcm_long[i] * prev_long_win[i]);
                }
            }
            EIGHT_SHORT_SEQUENCE => {
                dst[..point0].copy_from_slice(&delay[..point0]);

                for i in point0..n {
                    dst[i] = delay[i] + self.pcm_short[i - point0];
                }
            }
            _ => {
                dst[..point0].copy_from_slice(&delay[..point0]);

                for i in point0..point1 {
                    dst[i] = delay[i] + self.pcm_long[i] * prev_short_win[i - point0];
                }
                for i in point1..n {
                    dst[i] = delay[i] + self.pcm_long[i];
                }
            }
        };

        // Save delay for overlap.
        match seq {
            ONLY_LONG_SEQUENCE | LONG_STOP_SEQUENCE => {
                for i in 0..n {
                    delay[i] = self.pcm_long[i + n] * long_win[n - 1 - i];
                }
            }
            EIGHT_SHORT_SEQUENCE => {
                // Last part is already windowed.
                delay[..point1].copy_from_slice(&self.pcm_short[point1..point1 + point1]);
                delay[point1..].fill(0.0);
            }
            _ => {
                delay[..point0].copy_from_slice(&self.pcm_long[n..n + point0]);

                for i in point0..point1 {
                    delay[i] = self.pcm_long[i + n] * short_win[s - 1 - (i - point0)];
                }

                delay[point1..].fill(0.0);
            }
        };

        Ok(())
    }
}

/// The built-in transform. Supports 1024 sample frames and long window 512 sample low delay
/// frames.
pub struct ImdctTransform {
    standard: Option<Filterbank>,
    low_delay: Option<Filterbank>,
    ltp: Option<LtpAnalysis>,
    coeffs: Vec<f32>,
    delay: Vec<f32>,
    out: Vec<f32>,
}

impl ImdctTransform {
    pub fn new() -> Self {
        ImdctTransform {
            standard: None,
            low_delay: None,
            ltp: None,
            coeffs: Vec::new(),
            delay: Vec::new(),
            out: Vec::new(),
        }
    }

    fn filterbank(&mut self, len: usize, object_type: M4AType) -> Result<&mut Filterbank> {
        match (len, object_type) {
            (1024, _) if !object_type.is_low_delay() => {
                Ok(self.standard.get_or_insert_with(Filterbank::standard))
            }
            (512, M4AType::ER_AAC_LD) => {
                Ok(self.low_delay.get_or_insert_with(Filterbank::low_delay))
            }
            _ => {
                log::warn!("no transform for {} with frame length {}", object_type, len);
                unsupported_error("aac: unsupported transform length")
            }
        }
    }
}

impl Default for ImdctTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Sample> SpectralTransform<S> for ImdctTransform {
    fn synth(&mut self, ics: &mut Ics<S>, object_type: M4AType) -> Result<()> {
        let len = ics.frame_len();

        // Move the working buffers out so the filterbank may be borrowed alongside them.
        let mut coeffs = std::mem::take(&mut self.coeffs);
        let mut delay = std::mem::take(&mut self.delay);
        let mut out = std::mem::take(&mut self.out);

        coeffs.clear();
        coeffs.extend(ics.coeffs.iter().map(|c| c.to_f32()));
        delay.clear();
        delay.extend(ics.overlap.iter().map(|c| c.to_f32()));
        out.resize(len, 0.0);

        let info = &ics.info;

        let res = self.filterbank(len, object_type).and_then(|fb| {
            fb.synth(
                &coeffs,
                &mut delay,
                info.window_sequence,
                info.window_shape,
                info.prev_window_shape,
                &mut out,
            )
        });

        if res.is_ok() {
            for (o, &x) in ics.output.iter_mut().zip(&out) {
                *o = S::from_f32(x);
            }
            for (o, &x) in ics.overlap.iter_mut().zip(&delay) {
                *o = S::from_f32(x);
            }
        }

        self.coeffs = coeffs;
        self.delay = delay;
        self.out = out;

        res
    }

    fn predict_ltp(&mut self, ics: &Ics<S>, pred: &mut [S]) -> Result<bool> {
        if ics.frame_len() != 1024 || ics.info.is_eight_short() {
            return Ok(false);
        }

        self.ltp.get_or_insert_with(LtpAnalysis::new).predict(ics, pred);

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(len: usize, seq: u8) -> Ics<f32> {
        let mut ics = Ics::new(len);
        ics.info.window_sequence = seq;
        ics
    }

    #[test]
    fn verify_silence() {
        let mut transform = ImdctTransform::new();

        for seq in [ONLY_LONG_SEQUENCE, LONG_START_SEQUENCE, EIGHT_SHORT_SEQUENCE] {
            let mut ics = channel(1024, seq);
            transform.synth(&mut ics, M4AType::Lc).unwrap();

            assert!(ics.output[..1024].iter().all(|&x| x == 0.0));
            assert!(ics.overlap.iter().all(|&x| x == 0.0));
        }
    }

    #[test]
    fn verify_overlap_carried() {
        let mut transform = ImdctTransform::new();

        let mut ics = channel(1024, ONLY_LONG_SEQUENCE);
        ics.coeffs[4] = 1.0;

        transform.synth(&mut ics, M4AType::Lc).unwrap();

        assert!(ics.output[..1024].iter().any(|&x| x != 0.0));
        assert!(ics.overlap.iter().any(|&x| x != 0.0));

        // A silent frame outputs the overlap of the previous frame.
        let overlap = ics.overlap.clone();
        ics.coeffs.fill(0.0);

        transform.synth(&mut ics, M4AType::Lc).unwrap();

        assert_eq!(&ics.output[..1024], &overlap[..]);
        assert!(ics.overlap.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn verify_low_delay() {
        let mut transform = ImdctTransform::new();

        let mut ics = channel(512, ONLY_LONG_SEQUENCE);
        ics.coeffs[1] = 1.0;
        transform.synth(&mut ics, M4AType::ER_AAC_LD).unwrap();
        assert!(ics.overlap.iter().any(|&x| x != 0.0));

        // Only long windows are permitted.
        let mut ics = channel(512, EIGHT_SHORT_SEQUENCE);
        assert!(transform.synth(&mut ics, M4AType::ER_AAC_LD).is_err());
    }

    #[test]
    fn verify_mdct() {
        let n = 16;

        let src: Vec<f32> = (0..2 * n).map(|i| ((i * 7) % 11) as f32 - 5.0).collect();

        let mut actual = vec![0.0; n];
        Mdct::new_scaled(n, 1.0).mdct(&src, &mut actual);

        let pi_n = std::f64::consts::PI / n as f64;

        for (k, &actual) in actual.iter().enumerate() {
            let expected: f64 = src
                .iter()
                .enumerate()
                .map(|(i, &x)| {
                    let phase = pi_n * (i as f64 + 0.5 + n as f64 / 2.0) * (k as f64 + 0.5);
                    f64::from(x) * phase.cos()
                })
                .sum();

            assert!((f64::from(actual) - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn verify_ltp_prediction() {
        let mut transform = ImdctTransform::new();

        // A frame with one coefficient, then the prediction of the next frame from its output.
        let mut ics = channel(1024, ONLY_LONG_SEQUENCE);
        ics.coeffs[20] = 1000.0;
        transform.synth(&mut ics, M4AType::Ltp).unwrap();
        ics.ltp_state.update(&ics.output, &ics.overlap);

        ics.info.ltp.present = true;
        ics.info.ltp.lag = 1024;
        ics.info.ltp.coef = 1.0;

        let mut pred = vec![0.0; 1024];
        assert!(transform.predict_ltp(&ics, &mut pred).unwrap());

        // The frame is predicted from its own output, so its coefficient dominates.
        let peak = pred.iter().enumerate().max_by(|a, b| a.1.abs().total_cmp(&b.1.abs())).unwrap();
        assert_eq!(peak.0, 20);

        // No prediction with short windows.
        ics.info.window_sequence = EIGHT_SHORT_SEQUENCE;
        assert!(!transform.predict_ltp(&ics, &mut pred).unwrap());
    }

    #[test]
    fn verify_unsupported_lengths() {
        let mut transform = ImdctTransform::new();

        for (len, object_type) in [(960, M4AType::Lc), (480, M4AType::ER_AAC_LD)] {
            let mut ics = channel(len, ONLY_LONG_SEQUENCE);
            let res = SpectralTransform::<f32>::synth(&mut transform, &mut ics, object_type);
            assert!(res.is_err());
        }
    }
}
