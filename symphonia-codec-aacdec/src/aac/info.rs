// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stream parameters and the MPEG-4 AudioSpecificConfig.

use std::fmt;

use symphonia_core::errors::{decode_error, unsupported_error, Result};
use symphonia_core::io::{BitReaderLtr, FiniteBitStream, ReadBitsLtr};

use log::{debug, error, warn};

use crate::aac::common::{ensure_bits, BandLayout, FrameKind};
use crate::aac::pce::ProgramConfig;
use crate::common::{sample_rate_index, M4AType, AAC_SAMPLE_RATES};

/// Signalled presence of a bandwidth extension tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presence {
    Absent,
    /// Not signalled. The tool may be found implicitly in the bitstream.
    Unknown,
    Present,
}

/// Parameters of the stream, as signalled by the container or in-band headers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamInfo {
    pub object_type: M4AType,
    pub sf_index: usize,
    pub sample_rate: u32,
    /// The channel configuration index. 0 if the layout is given by a program config element.
    pub chan_config: usize,
    pub sbr: Presence,
    pub ps: Presence,
    /// The sample rate of the bandwidth extension output, or 0.
    pub ext_sample_rate: u32,
    /// Set for 960 (or 480 for low delay) sample frames.
    pub frame_length_short: bool,
}

impl StreamInfo {
    pub fn new(sample_rate: u32) -> Self {
        StreamInfo {
            object_type: M4AType::Lc,
            sf_index: sample_rate_index(sample_rate),
            sample_rate,
            chan_config: 0,
            sbr: Presence::Unknown,
            ps: Presence::Unknown,
            ext_sample_rate: 0,
            frame_length_short: false,
        }
    }

    pub fn frame_kind(&self) -> FrameKind {
        FrameKind::new(self.object_type.is_low_delay(), self.frame_length_short)
    }

    /// The number of samples per channel in one frame of the core decoder.
    pub fn frame_len(&self) -> usize {
        self.frame_kind().frame_len()
    }

    pub fn bands(&self) -> Option<BandLayout> {
        BandLayout::find(self.sf_index, self.frame_kind())
    }

    /// Returns true if the bandwidth extension doubles the output sample rate.
    pub fn is_upsampled(&self) -> bool {
        self.sbr == Presence::Present && self.ext_sample_rate > self.sample_rate
    }
}

impl fmt::Display for StreamInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MPEG 4 Audio {}, {} Hz, channel config {}, {} samples per frame, sbr {:?}, ps {:?}",
            self.object_type,
            self.sample_rate,
            self.chan_config,
            self.frame_len(),
            self.sbr,
            self.ps
        )
    }
}

/// A decoded AudioSpecificConfig (ISO/IEC 14496-3, 1.6.2.1).
#[derive(Clone, Debug)]
pub struct AudioSpecificConfig {
    pub info: StreamInfo,
    /// The in-band program config element if the channel configuration is 0.
    pub pce: Option<ProgramConfig>,
}

fn read_object_type<B: ReadBitsLtr>(bs: &mut B) -> Result<M4AType> {
    let index = match bs.read_bits_leq32(5)? {
        31 => 32 + bs.read_bits_leq32(6)? as usize,
        index => index as usize,
    };

    Ok(M4AType::from_index(index))
}

/// Read a sampling frequency index, and the explicit sample rate if the index is 15.
fn read_sampling_frequency<B: ReadBitsLtr>(bs: &mut B) -> Result<(usize, u32)> {
    match bs.read_bits_leq32(4)? as usize {
        15 => Ok((15, bs.read_bits_leq32(24)?)),
        index => Ok((index, AAC_SAMPLE_RATES[index])),
    }
}

fn bit_pos(bs: &BitReaderLtr<'_>, total_bits: u64) -> u64 {
    total_bits - bs.bits_left()
}

impl AudioSpecificConfig {
    pub fn read(buf: &[u8]) -> Result<Self> {
        let total_bits = 8 * buf.len() as u64;

        let mut bs = BitReaderLtr::new(buf);

        let mut info = StreamInfo::new(0);

        info.object_type = read_object_type(&mut bs)?;
        (info.sf_index, info.sample_rate) = read_sampling_frequency(&mut bs)?;
        info.chan_config = bs.read_bits_leq32(4)? as usize;

        info.sbr = Presence::Unknown;
        info.ps = Presence::Unknown;

        // Explicit hierarchical signalling of SBR and PS.
        let mut explicit_sbr = false;

        if info.object_type == M4AType::Sbr
            || (info.object_type == M4AType::PS && !Self::is_ps_fallback(buf, &bs, total_bits)?)
        {
            if info.object_type == M4AType::PS {
                info.ps = Presence::Present;
            }

            explicit_sbr = true;
            info.sbr = Presence::Present;
            info.ext_sample_rate = read_sampling_frequency(&mut bs)?.1;
            info.object_type = read_object_type(&mut bs)?;

            if info.object_type == M4AType::ER_BSAC {
                let _ext_chan_config = bs.read_bits_leq32(4)?;
            }
        }

        if !explicit_sbr {
            // Backwards compatible signalling appended after the specific config.
            let mut ext = BitReaderLtr::new(buf);
            ext.ignore_bits(bit_pos(&bs, total_bits) as u32)?;
            Self::read_sync_extension(&mut ext, &mut info)?;
        }

        if info.sf_index > 12 {
            error!("invalid sampling rate index {}", info.sf_index);
            return decode_error("aac: invalid sampling rate index");
        }

        if info.object_type == M4AType::ER_AAC_LD && !(3..=7).contains(&info.sf_index) {
            error!("invalid low delay sampling rate index {}", info.sf_index);
            return decode_error("aac: invalid low delay sampling rate index");
        }

        let pce = match info.object_type {
            M4AType::Main
            | M4AType::Lc
            | M4AType::Ssr
            | M4AType::Ltp
            | M4AType::ER_AAC_LC
            | M4AType::ER_AAC_LD => Self::read_ga_specific_config(&mut bs, &mut info)?,
            M4AType::ER_AAC_ELD => {
                Self::read_eld_specific_config(&mut bs, &mut info)?;
                None
            }
            _ => {
                warn!("unsupported audio object type {}", info.object_type);
                return unsupported_error("aac: unsupported audio object type");
            }
        };

        debug!("{}", info);

        Ok(AudioSpecificConfig { info, pce })
    }

    /// Returns true if an object type of PS is followed by bits that are not an explicit
    /// extension header.
    fn is_ps_fallback(buf: &[u8], bs: &BitReaderLtr<'_>, total_bits: u64) -> Result<bool> {
        let pos = bit_pos(bs, total_bits);

        if total_bits < pos + 9 {
            return Ok(false);
        }

        let mut peek = BitReaderLtr::new(buf);
        peek.ignore_bits(pos as u32)?;

        let bits = peek.read_bits_leq32(9)?;

        Ok((bits >> 6) & 0x3 != 0 && bits & 0x3f == 0)
    }

    fn read_sync_extension(bs: &mut BitReaderLtr<'_>, info: &mut StreamInfo) -> Result<()> {
        let mut window = 0u32;
        let mut read = 0;

        while bs.bits_left() > 0 {
            window = ((window << 1) | bs.read_bits_leq32(1)?) & 0x7ff;
            read += 1;

            if read < 11 {
                continue;
            }

            // More than 15 bits must have remained at the start of the sync word.
            if bs.bits_left() + 11 <= 15 {
                break;
            }

            if window != 0x2b7 {
                continue;
            }

            if read_object_type(bs)? == M4AType::Sbr {
                info.sbr = if bs.read_bool()? { Presence::Present } else { Presence::Absent };

                if info.sbr == Presence::Present {
                    info.ext_sample_rate = read_sampling_frequency(bs)?.1;

                    if info.ext_sample_rate == info.sample_rate {
                        info.sbr = Presence::Unknown;
                    }
                }
            }

            if bs.bits_left() > 11 && bs.read_bits_leq32(11)? == 0x548 {
                info.ps = if bs.read_bool()? { Presence::Present } else { Presence::Absent };
            }

            break;
        }

        Ok(())
    }

    fn read_ga_specific_config(
        bs: &mut BitReaderLtr<'_>,
        info: &mut StreamInfo,
    ) -> Result<Option<ProgramConfig>> {
        info.frame_length_short = bs.read_bool()?;

        if info.frame_length_short && info.sbr == Presence::Present {
            warn!("sbr with 960 sample frames is not supported");
            info.sbr = Presence::Absent;
            info.ps = Presence::Absent;
        }

        // Depends on core coder, and the core coder delay.
        if bs.read_bool()? {
            bs.ignore_bits(14)?;
        }

        let extension_flag = bs.read_bool()?;

        let pce = if info.chan_config == 0 {
            // Element instance tag.
            bs.ignore_bits(4)?;
            Some(ProgramConfig::read(bs, info.sf_index)?)
        }
        else {
            None
        };

        if extension_flag {
            if matches!(info.object_type, M4AType::ER_AAC_LC | M4AType::ER_AAC_LD) {
                let res_flags = bs.read_bits_leq32(3)?;

                if res_flags != 0 {
                    warn!("data resilience flags {:#x} are not supported", res_flags);
                    return unsupported_error("aac: data resilience");
                }
            }

            // Extension flag 3.
            bs.ignore_bits(1)?;
        }

        if info.object_type.is_er() {
            Self::read_ep_config(bs)?;
        }

        Ok(pce)
    }

    fn read_eld_specific_config(bs: &mut BitReaderLtr<'_>, info: &mut StreamInfo) -> Result<()> {
        const ELDEXT_TERM: u32 = 0;

        info.sbr = Presence::Absent;
        info.ps = Presence::Absent;
        info.frame_length_short = bs.read_bool()?;

        let res_flags = bs.read_bits_leq32(3)?;

        if res_flags != 0 {
            warn!("data resilience flags {:#x} are not supported", res_flags);
            return unsupported_error("aac: data resilience");
        }

        if bs.read_bool()? {
            return unsupported_error("aac: low delay sbr");
        }

        while bs.read_bits_leq32(4)? != ELDEXT_TERM {
            let mut len = bs.read_bits_leq32(4)?;

            if len == 15 {
                len += bs.read_bits_leq32(8)?;
            }

            if len == 15 + 255 {
                len += bs.read_bits_leq32(16)?;
            }

            ensure_bits(bs, 8 * u64::from(len) + 4)?;

            bs.ignore_bits(8 * len)?;
        }

        Self::read_ep_config(bs)
    }

    fn read_ep_config(bs: &mut BitReaderLtr<'_>) -> Result<()> {
        let ep_config = bs.read_bits_leq32(2)?;

        if ep_config != 0 {
            warn!("error protection config {} is not supported", ep_config);
            return unsupported_error("aac: error protection");
        }

        Ok(())
    }
}
