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

use bitflags::bitflags;

#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum M4AType {
    None,
    Main,
    Lc,
    Ssr,
    Ltp,
    Sbr,
    Scalable,
    TwinVQ,
    Celp,
    Hvxc,
    Ttsi,
    MainSynth,
    WavetableSynth,
    GeneralMIDI,
    Algorithmic,
    ER_AAC_LC,
    ER_AAC_LTP,
    ER_AAC_Scalable,
    ER_TwinVQ,
    ER_BSAC,
    ER_AAC_LD,
    ER_CELP,
    ER_HVXC,
    ER_HILN,
    ER_Parametric,
    Ssc,
    PS,
    MPEGSurround,
    Layer1,
    Layer2,
    Layer3,
    Dst,
    Als,
    Sls,
    SLSNonCore,
    ER_AAC_ELD,
    SMRSimple,
    SMRMain,
    Reserved,
    Unknown,
}

impl std::fmt::Display for M4AType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", M4A_TYPE_NAMES[*self as usize])
    }
}

pub const M4A_TYPES: &[M4AType] = &[
    M4AType::None,
    M4AType::Main,
    M4AType::Lc,
    M4AType::Ssr,
    M4AType::Ltp,
    M4AType::Sbr,
    M4AType::Scalable,
    M4AType::TwinVQ,
    M4AType::Celp,
    M4AType::Hvxc,
    M4AType::Reserved,
    M4AType::Reserved,
    M4AType::Ttsi,
    M4AType::MainSynth,
    M4AType::WavetableSynth,
    M4AType::GeneralMIDI,
    M4AType::Algorithmic,
    M4AType::ER_AAC_LC,
    M4AType::Reserved,
    M4AType::ER_AAC_LTP,
    M4AType::ER_AAC_Scalable,
    M4AType::ER_TwinVQ,
    M4AType::ER_BSAC,
    M4AType::ER_AAC_LD,
    M4AType::ER_CELP,
    M4AType::ER_HVXC,
    M4AType::ER_HILN,
    M4AType::ER_Parametric,
    M4AType::Ssc,
    M4AType::PS,
    M4AType::MPEGSurround,
    M4AType::Reserved, /*escape*/
    M4AType::Layer1,
    M4AType::Layer2,
    M4AType::Layer3,
    M4AType::Dst,
    M4AType::Als,
    M4AType::Sls,
    M4AType::SLSNonCore,
    M4AType::ER_AAC_ELD,
    M4AType::SMRSimple,
    M4AType::SMRMain,
];

pub const M4A_TYPE_NAMES: &[&str] = &[
    "None",
    "AAC Main",
    "AAC LC",
    "AAC SSR",
    "AAC LTP",
    "SBR",
    "AAC Scalable",
    "TwinVQ",
    "CELP",
    "HVXC",
    // "(reserved10)",
    // "(reserved11)",
    "TTSI",
    "Main synthetic",
    "Wavetable synthesis",
    "General MIDI",
    "Algorithmic Synthesis and Audio FX",
    "ER AAC LC",
    // "(reserved18)",
    "ER AAC LTP",
    "ER AAC Scalable",
    "ER TwinVQ",
    "ER BSAC",
    "ER AAC LD",
    "ER CELP",
    "ER HVXC",
    "ER HILN",
    "ER Parametric",
    "SSC",
    "PS",
    "MPEG Surround",
    // "(escape)",
    "Layer-1",
    "Layer-2",
    "Layer-3",
    "DST",
    "ALS",
    "SLS",
    "SLS non-core",
    "ER AAC ELD",
    "SMR Simple",
    "SMR Main",
    "(reserved)",
    "(unknown)",
];

pub const AAC_SAMPLE_RATES: [u32; 16] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350, 0, 0,
    0,
];

/// The number of output channels for each channel configuration index.
pub const AAC_CHANNELS: [usize; 16] = [0, 1, 2, 3, 4, 5, 6, 8, 0, 0, 0, 7, 8, 24, 8, 0];

impl M4AType {
    pub fn from_index(index: usize) -> M4AType {
        M4A_TYPES.get(index).copied().unwrap_or(M4AType::Unknown)
    }

    /// Returns true if the object type uses the error resilient bitstream syntax.
    pub fn is_er(self) -> bool {
        matches!(
            self,
            M4AType::ER_AAC_LC | M4AType::ER_AAC_LTP | M4AType::ER_AAC_LD | M4AType::ER_AAC_ELD
        )
    }

    /// Returns true if the object type is one of the low delay types.
    pub fn is_low_delay(self) -> bool {
        matches!(self, M4AType::ER_AAC_LD | M4AType::ER_AAC_ELD)
    }
}

/// Get the sampling frequency index that best matches an arbitrary sample rate.
pub fn sample_rate_index(rate: u32) -> usize {
    const THRESHOLDS: [u32; 11] =
        [92017, 75132, 55426, 46009, 37566, 27713, 23004, 18783, 13856, 11502, 9391];

    THRESHOLDS.iter().position(|&min| rate >= min).unwrap_or(11)
}

/// Get the channel configuration index for a channel count, or 0 if there is none.
pub fn channel_config_for_count(channels: usize) -> usize {
    match channels {
        1..=6 => channels,
        7 => 11,
        8 => 7,
        24 => 13,
        _ => 0,
    }
}

bitflags! {
    /// Loudspeaker positions in canonical order.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ChannelPositions: u64 {
        const FRONT_LEFT            = 1 << 0;
        const FRONT_RIGHT           = 1 << 1;
        const FRONT_CENTRE          = 1 << 2;
        const LFE1                  = 1 << 3;
        const BACK_LEFT             = 1 << 4;
        const BACK_RIGHT            = 1 << 5;
        const FRONT_LEFT_CENTRE     = 1 << 6;
        const FRONT_RIGHT_CENTRE    = 1 << 7;
        const BACK_CENTRE           = 1 << 8;
        const SIDE_LEFT             = 1 << 9;
        const SIDE_RIGHT            = 1 << 10;
        const TOP_CENTRE            = 1 << 11;
        const TOP_FRONT_LEFT        = 1 << 12;
        const TOP_FRONT_CENTRE      = 1 << 13;
        const TOP_FRONT_RIGHT       = 1 << 14;
        const TOP_BACK_LEFT         = 1 << 15;
        const TOP_BACK_CENTRE       = 1 << 16;
        const TOP_BACK_RIGHT        = 1 << 17;
        const LFE2                  = 1 << 35;
        const TOP_SIDE_LEFT         = 1 << 36;
        const TOP_SIDE_RIGHT        = 1 << 37;
        const BOTTOM_FRONT_CENTRE   = 1 << 38;
        const BOTTOM_FRONT_LEFT     = 1 << 39;
        const BOTTOM_FRONT_RIGHT    = 1 << 40;
    }
}

impl ChannelPositions {
    /// The position value used to order channels. Lower values come first.
    pub fn order(self) -> u32 {
        self.bits().trailing_zeros()
    }
}

/// The resolved output channel layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelLayout {
    /// A number of channels with no known loudspeaker positions.
    Unspecified(usize),
    /// One channel per position, in canonical order.
    Positions(ChannelPositions),
}

impl ChannelLayout {
    pub fn count(&self) -> usize {
        match self {
            ChannelLayout::Unspecified(count) => *count,
            ChannelLayout::Positions(positions) => positions.bits().count_ones() as usize,
        }
    }

    pub fn positions(&self) -> Option<ChannelPositions> {
        match self {
            ChannelLayout::Unspecified(_) => None,
            ChannelLayout::Positions(positions) => Some(*positions),
        }
    }
}

impl Default for ChannelLayout {
    fn default() -> Self {
        ChannelLayout::Unspecified(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_sample_rate_index() {
        for (i, &rate) in AAC_SAMPLE_RATES[..12].iter().enumerate() {
            assert_eq!(sample_rate_index(rate), i);
        }
        assert_eq!(sample_rate_index(7350), 11);
        assert_eq!(sample_rate_index(192000), 0);
        assert_eq!(sample_rate_index(44000), 4);
    }

    #[test]
    fn verify_channel_config_for_count() {
        for config in [1, 2, 3, 4, 5, 6, 7, 11, 13] {
            assert_eq!(channel_config_for_count(AAC_CHANNELS[config]), config);
        }
        assert_eq!(channel_config_for_count(9), 0);
    }

    #[test]
    fn verify_layout_count() {
        let stereo = ChannelPositions::FRONT_LEFT | ChannelPositions::FRONT_RIGHT;
        assert_eq!(ChannelLayout::Positions(stereo).count(), 2);
        assert_eq!(ChannelLayout::Unspecified(5).count(), 5);
        assert_eq!(ChannelPositions::LFE2.order(), 35);
    }
}
