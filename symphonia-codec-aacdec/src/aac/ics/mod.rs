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

//! Individual channel stream (ICS) parsing.

use symphonia_core::errors::{decode_error, unsupported_error, Result};
use symphonia_core::io::vlc::{Codebook, Entry8x16};
use symphonia_core::io::ReadBitsLtr;

use crate::aac::codebooks;
use crate::aac::common::*;
use crate::common::M4AType;
use crate::sample::Sample;

use log::{debug, warn};

pub mod gain;
pub mod ltp;
pub mod prediction;
pub mod pulse;
pub mod spectrum;
pub mod tns;

pub const ZERO_HCB: u8 = 0;
pub const ESC_HCB: u8 = 11;
pub const RESERVED_HCB: u8 = 12;
pub const NOISE_HCB: u8 = 13;
pub const INTENSITY_HCB2: u8 = 14;
pub const INTENSITY_HCB: u8 = 15;

const INTENSITY_SCALE_MIN: i32 = -155;
const INTENSITY_SCALE_MAX: i32 = 100;
const NOISE_SCALE_MIN: i32 = -100;
const NOISE_SCALE_MAX: i32 = 155;

/// Stream parameters that select the ICS syntax and band layout.
#[derive(Clone, Copy, Debug)]
pub struct IcsParams {
    pub object_type: M4AType,
    pub bands: BandLayout,
    pub frame_len: usize,
    pub strict: bool,
}

impl IcsParams {
    pub fn is_eld(&self) -> bool {
        self.object_type == M4AType::ER_AAC_ELD
    }

    pub fn is_er(&self) -> bool {
        self.object_type.is_er()
    }
}

#[derive(Clone)]
pub struct IcsInfo {
    pub window_sequence: u8,
    pub prev_window_sequence: u8,
    pub window_shape: bool,
    pub prev_window_shape: bool,
    pub max_sfb: usize,
    pub num_windows: usize,
    pub num_window_groups: usize,
    pub group_len: [usize; MAX_WINDOWS],
    /// Band offsets for the active window length.
    pub swb_offset: &'static [usize],
    pub num_swb: usize,
    pub tns_max_bands: usize,
    pub predictor_present: bool,
    pub predictor_reset_group: usize,
    pub prediction_used: [bool; MAX_SFBS],
    pub ltp: ltp::Ltp,
}

impl IcsInfo {
    pub fn new() -> Self {
        Self {
            window_sequence: ONLY_LONG_SEQUENCE,
            prev_window_sequence: ONLY_LONG_SEQUENCE,
            window_shape: false,
            prev_window_shape: false,
            max_sfb: 0,
            num_windows: 1,
            num_window_groups: 1,
            group_len: [1, 0, 0, 0, 0, 0, 0, 0],
            swb_offset: &[0],
            num_swb: 0,
            tns_max_bands: 0,
            predictor_present: false,
            predictor_reset_group: 0,
            prediction_used: [false; MAX_SFBS],
            ltp: ltp::Ltp::default(),
        }
    }

    #[inline(always)]
    pub fn is_eight_short(&self) -> bool {
        self.window_sequence == EIGHT_SHORT_SEQUENCE
    }

    /// Decode the ICS info. On failure the band count is reset so that no stale bands are used.
    pub fn decode<B: ReadBitsLtr>(&mut self, bs: &mut B, params: &IcsParams) -> Result<()> {
        let res = self.decode_inner(bs, params);

        if res.is_err() {
            self.max_sfb = 0;
        }

        res
    }

    fn decode_inner<B: ReadBitsLtr>(&mut self, bs: &mut B, params: &IcsParams) -> Result<()> {
        self.prev_window_sequence = self.window_sequence;
        self.prev_window_shape = self.window_shape;

        if !params.is_eld() {
            if bs.read_bool()? {
                if params.strict {
                    return decode_error("aac: ics reserved bit set");
                }
                warn!("ics reserved bit set");
            }

            self.window_sequence = bs.read_bits_leq32(2)? as u8;

            if params.object_type == M4AType::ER_AAC_LD
                && self.window_sequence != ONLY_LONG_SEQUENCE
            {
                log::error!("ld requires only long windows");
                self.window_sequence = ONLY_LONG_SEQUENCE;
                return decode_error("aac: invalid window sequence for low delay");
            }

            match self.prev_window_sequence {
                ONLY_LONG_SEQUENCE | LONG_STOP_SEQUENCE => {
                    if (self.window_sequence != ONLY_LONG_SEQUENCE)
                        && (self.window_sequence != LONG_START_SEQUENCE)
                    {
                        debug!("previous window is invalid");
                    }
                }
                _ => {
                    if (self.window_sequence != EIGHT_SHORT_SEQUENCE)
                        && (self.window_sequence != LONG_STOP_SEQUENCE)
                    {
                        debug!("previous window is invalid");
                    }
                }
            }

            self.window_shape = bs.read_bool()?;
        }

        self.num_window_groups = 1;
        self.group_len = [1, 0, 0, 0, 0, 0, 0, 0];
        self.predictor_present = false;
        self.predictor_reset_group = 0;
        self.ltp.present = false;

        if self.is_eight_short() {
            if params.bands.short_bands.is_empty() {
                return decode_error("aac: short windows are not allowed");
            }

            self.max_sfb = bs.read_bits_leq32(4)? as usize;

            for _ in 0..MAX_WINDOWS - 1 {
                if bs.read_bool()? {
                    self.group_len[self.num_window_groups - 1] += 1;
                }
                else {
                    self.num_window_groups += 1;
                    self.group_len[self.num_window_groups - 1] = 1;
                }
            }

            self.num_windows = 8;
            self.swb_offset = params.bands.short_bands;
            self.num_swb = params.bands.num_swb_short();
            self.tns_max_bands = params.bands.tns_max_short;
        }
        else {
            self.max_sfb = bs.read_bits_leq32(6)? as usize;
            self.num_windows = 1;
            self.swb_offset = params.bands.long_bands;
            self.num_swb = params.bands.num_swb_long();
            self.tns_max_bands = params.bands.tns_max_long;

            if !params.is_eld() {
                self.predictor_present = bs.read_bool()?;
            }

            if self.predictor_present {
                match params.object_type {
                    M4AType::Main => self.decode_prediction(bs, params)?,
                    M4AType::Lc | M4AType::ER_AAC_LC => {
                        log::error!("prediction is not allowed in aac lc");
                        return decode_error("aac: prediction in aac lc");
                    }
                    M4AType::ER_AAC_LD => {
                        return unsupported_error("aac: ltp in er aac ld");
                    }
                    _ => {
                        self.ltp.present = bs.read_bool()?;

                        if self.ltp.present {
                            self.ltp.read(bs, self.max_sfb)?;
                        }
                    }
                }
            }
        }

        if self.max_sfb > self.num_swb {
            log::error!(
                "number of scalefactor bands in group ({}) exceeds limit ({})",
                self.max_sfb,
                self.num_swb
            );
            return decode_error("aac: max_sfb exceeds the number of bands");
        }

        Ok(())
    }

    fn decode_prediction<B: ReadBitsLtr>(&mut self, bs: &mut B, params: &IcsParams) -> Result<()> {
        if bs.read_bool()? {
            self.predictor_reset_group = bs.read_bits_leq32(5)? as usize;

            if self.predictor_reset_group == 0 || self.predictor_reset_group > 30 {
                log::error!("invalid predictor reset group");
                return decode_error("aac: invalid predictor reset group");
            }
        }

        for used in self.prediction_used[..self.max_sfb.min(params.bands.pred_sfb_max)].iter_mut()
        {
            *used = bs.read_bool()?;
        }

        Ok(())
    }

    pub fn copy_from_common(&mut self, other: &IcsInfo) {
        // Maintain the previous window sequence and shape.
        let prev_window_sequence = self.window_sequence;
        let prev_window_shape = self.window_shape;

        *self = other.clone();

        self.prev_window_sequence = prev_window_sequence;
        self.prev_window_shape = prev_window_shape;
    }

    /// The number of coefficients between consecutive windows.
    #[inline(always)]
    pub fn window_stride(&self, frame_len: usize) -> usize {
        if self.is_eight_short() {
            frame_len / 8
        }
        else {
            0
        }
    }
}

impl Default for IcsInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// One half-channel of a channel element.
#[derive(Clone)]
pub struct Ics<S: Sample> {
    pub info: IcsInfo,
    /// Band types, indexed by window group and band.
    pub band_type: [[u8; MAX_SFBS]; MAX_WINDOWS],
    /// The first band after the section each band belongs to.
    pub band_type_run_end: [[u8; MAX_SFBS]; MAX_WINDOWS],
    /// Scalefactor exponents in quarter steps of two.
    pub sf: [[i32; MAX_SFBS]; MAX_WINDOWS],
    pub tns: tns::Tns<S>,
    /// Spectral coefficients of the current frame.
    pub coeffs: Vec<S>,
    /// Overlap of the previous frame's transform.
    pub overlap: Vec<S>,
    /// Time-domain output. Twice the frame length to hold the output of a bandwidth extension.
    pub output: Vec<S>,
    pub predictor: prediction::Predictor,
    pub ltp_state: ltp::LtpState<S>,
    /// Set if the last decoded stream carried gain control data.
    pub gain_control: bool,
}

impl<S: Sample> Ics<S> {
    pub fn new(frame_len: usize) -> Self {
        Self {
            info: IcsInfo::new(),
            band_type: [[ZERO_HCB; MAX_SFBS]; MAX_WINDOWS],
            band_type_run_end: [[0; MAX_SFBS]; MAX_WINDOWS],
            sf: [[0; MAX_SFBS]; MAX_WINDOWS],
            tns: tns::Tns::new(),
            coeffs: vec![S::ZERO; frame_len],
            overlap: vec![S::ZERO; frame_len],
            output: vec![S::ZERO; 2 * frame_len],
            predictor: prediction::Predictor::new(),
            ltp_state: ltp::LtpState::new(frame_len),
            gain_control: false,
        }
    }

    pub fn frame_len(&self) -> usize {
        self.coeffs.len()
    }

    pub fn reset(&mut self) {
        self.info = IcsInfo::new();
        self.tns.present = false;
        self.overlap.fill(S::ZERO);
        self.predictor.invalidate();
        self.ltp_state.reset();
    }

    #[inline(always)]
    pub fn is_zero(&self, g: usize, sfb: usize) -> bool {
        self.band_type[g][sfb] == ZERO_HCB
    }

    #[inline(always)]
    pub fn is_intensity(&self, g: usize, sfb: usize) -> bool {
        (self.band_type[g][sfb] == INTENSITY_HCB) || (self.band_type[g][sfb] == INTENSITY_HCB2)
    }

    #[inline(always)]
    pub fn is_noise(&self, g: usize, sfb: usize) -> bool {
        self.band_type[g][sfb] == NOISE_HCB
    }

    /// Decode an individual channel stream.
    ///
    /// If `common_window` is set, the ICS info was decoded previously by the channel pair.
    pub fn decode<B: ReadBitsLtr>(
        &mut self,
        bs: &mut B,
        params: &IcsParams,
        noise: &mut Lcg,
        common_window: bool,
        scale_flag: bool,
    ) -> Result<()> {
        let res = self.decode_inner(bs, params, noise, common_window, scale_flag);

        if res.is_err() {
            self.tns.present = false;
        }

        res
    }

    fn decode_inner<B: ReadBitsLtr>(
        &mut self,
        bs: &mut B,
        params: &IcsParams,
        noise: &mut Lcg,
        common_window: bool,
        scale_flag: bool,
    ) -> Result<()> {
        let global_gain = bs.read_bits_leq32(8)? as i32;

        if !common_window && !scale_flag {
            self.info.decode(bs, params)?;
        }

        self.decode_band_types(bs)?;
        self.decode_scalefactors(bs, global_gain)?;

        let mut pulse = None;

        if !scale_flag {
            if !params.is_eld() && bs.read_bool()? {
                if self.info.is_eight_short() {
                    log::error!("pulse tool not allowed in eight short sequence");
                    return decode_error("aac: pulse data with short windows");
                }

                pulse = Some(pulse::Pulse::read(bs, self.info.swb_offset, self.info.num_swb)?);
            }

            self.tns.present = bs.read_bool()?;

            if self.tns.present && !params.is_er() {
                self.tns.read(bs, &self.info, params.object_type)?;
            }

            self.gain_control = !params.is_eld() && bs.read_bool()?;

            if self.gain_control {
                gain::skip_gain_control(bs, self.info.window_sequence)?;
            }

            if self.tns.present && params.is_er() {
                self.tns.read(bs, &self.info, params.object_type)?;
            }
        }

        spectrum::decode_spectrum(self, bs, noise, pulse.as_ref())?;

        if params.object_type == M4AType::Main && !common_window {
            self.predictor.apply(&mut self.coeffs, &self.info, params.bands.pred_sfb_max);
        }

        Ok(())
    }

    fn decode_band_types<B: ReadBitsLtr>(&mut self, bs: &mut B) -> Result<()> {
        let info = &self.info;

        let sect_bits = if info.is_eight_short() { 3 } else { 5 };
        let sect_esc_val = (1 << sect_bits) - 1;

        for g in 0..info.num_window_groups {
            let mut k = 0;

            while k < info.max_sfb {
                let band_type = bs.read_bits_leq32(4)? as u8;

                if band_type == RESERVED_HCB {
                    log::error!("invalid band type");
                    return decode_error("aac: invalid band type");
                }

                let mut sect_end = k;

                loop {
                    let sect_len_incr = bs.read_bits_leq32(sect_bits)? as usize;

                    sect_end += sect_len_incr;

                    validate!(sect_end <= info.max_sfb);

                    if sect_len_incr != sect_esc_val {
                        break;
                    }
                }

                for sfb in k..sect_end {
                    self.band_type[g][sfb] = band_type;
                    self.band_type_run_end[g][sfb] = sect_end as u8;
                }

                k = sect_end;
            }

            self.band_type[g][info.max_sfb..].fill(ZERO_HCB);
        }

        Ok(())
    }

    fn decode_scalefactors<B: ReadBitsLtr>(&mut self, bs: &mut B, global_gain: i32) -> Result<()> {
        let mut noise_pcm_flag = true;
        let mut scf_normal = global_gain;
        let mut scf_noise = global_gain - 90;
        let mut scf_intensity = 0i32;

        let scf_cb: &Codebook<Entry8x16> = &codebooks::SCALEFACTORS;

        for g in 0..self.info.num_window_groups {
            for sfb in 0..self.info.max_sfb {
                self.sf[g][sfb] = match self.band_type[g][sfb] {
                    ZERO_HCB => 0,
                    INTENSITY_HCB | INTENSITY_HCB2 => {
                        scf_intensity += i32::from(bs.read_codebook(scf_cb)?.0) - 60;

                        let clipped = scf_intensity.clamp(INTENSITY_SCALE_MIN, INTENSITY_SCALE_MAX);

                        if clipped != scf_intensity {
                            warn!(
                                "clipped intensity stereo position ({} -> {})",
                                scf_intensity, clipped
                            );
                        }

                        -clipped
                    }
                    NOISE_HCB => {
                        if noise_pcm_flag {
                            noise_pcm_flag = false;
                            scf_noise += bs.read_bits_leq32(9)? as i32 - 256;
                        }
                        else {
                            scf_noise += i32::from(bs.read_codebook(scf_cb)?.0) - 60;
                        }

                        let clipped = scf_noise.clamp(NOISE_SCALE_MIN, NOISE_SCALE_MAX);

                        if clipped != scf_noise {
                            warn!("clipped noise gain ({} -> {})", scf_noise, clipped);
                        }

                        clipped - 56
                    }
                    _ => {
                        scf_normal += i32::from(bs.read_codebook(scf_cb)?.0) - 60;

                        let clipped = scf_normal.clamp(0, 255);

                        if clipped != scf_normal {
                            warn!("clipped scalefactor ({} -> {})", scf_normal, clipped);
                        }

                        clipped - 100 - 56
                    }
                };
            }
        }

        Ok(())
    }
}
