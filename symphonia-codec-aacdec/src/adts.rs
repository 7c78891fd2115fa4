// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Audio Data Transport Stream (ADTS) frame headers.

use symphonia_core::errors::{decode_error, Result};
use symphonia_core::io::ReadBitsLtr;

use crate::common::{M4AType, AAC_SAMPLE_RATES, M4A_TYPES};

/// The ADTS syncword.
const SYNC_WORD: u32 = 0xfff;

/// An ADTS frame header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdtsHeader {
    pub object_type: M4AType,
    pub sf_index: usize,
    pub sample_rate: u32,
    /// The channel configuration, or 0 if a program config element describes the channels.
    pub chan_config: usize,
    /// If set, a 16-bit CRC follows the header.
    pub crc_present: bool,
    /// The length of the frame in bytes, including the header.
    pub frame_len: usize,
    pub num_raw_blocks: usize,
}

impl AdtsHeader {
    /// The size of a header without CRC.
    pub const SIZE: usize = 7;

    /// Returns true if the buffer starts with the ADTS syncword.
    pub fn is_sync(buf: &[u8]) -> bool {
        buf.len() >= 2 && buf[0] == 0xff && buf[1] & 0xf0 == 0xf0
    }

    /// Read a header, excluding the CRC.
    pub fn read<B: ReadBitsLtr>(bs: &mut B) -> Result<Self> {
        if bs.read_bits_leq32(12)? != SYNC_WORD {
            return decode_error("adts: missing syncword");
        }

        // MPEG version, layer.
        bs.ignore_bits(3)?;

        let crc_present = !bs.read_bool()?;

        // Profile
        let object_type = M4A_TYPES[bs.read_bits_leq32(2)? as usize + 1];

        // Sample rate index.
        let sf_index = bs.read_bits_leq32(4)? as usize;

        let sample_rate = match AAC_SAMPLE_RATES[sf_index] {
            0 => return decode_error("adts: invalid sample rate"),
            rate => rate,
        };

        // Private bit.
        bs.ignore_bits(1)?;

        let chan_config = bs.read_bits_leq32(3)? as usize;

        // Originality, Home, Copyrighted ID bit, Copyright ID start bits. Only used for encoding.
        bs.ignore_bits(4)?;

        // Frame length = Header size (7) + AAC frame size
        let frame_len = bs.read_bits_leq32(13)? as usize;

        if frame_len < AdtsHeader::SIZE {
            return decode_error("adts: invalid adts frame length");
        }

        let _fullness = bs.read_bits_leq32(11)?;
        let num_raw_blocks = bs.read_bits_leq32(2)? as usize + 1;

        Ok(AdtsHeader {
            object_type,
            sf_index,
            sample_rate,
            chan_config,
            crc_present,
            frame_len,
            num_raw_blocks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia_core::io::BitReaderLtr;

    #[test]
    fn verify_adts_header() {
        // LC, 44.1 kHz, stereo, no CRC, 371 bytes, one raw block.
        let buf = [0xff, 0xf1, 0x50, 0x80, 0x2e, 0x7f, 0xfc];

        assert!(AdtsHeader::is_sync(&buf));

        let header = AdtsHeader::read(&mut BitReaderLtr::new(&buf)).unwrap();

        assert_eq!(header.object_type, M4AType::Lc);
        assert_eq!(header.sf_index, 4);
        assert_eq!(header.sample_rate, 44100);
        assert_eq!(header.chan_config, 2);
        assert!(!header.crc_present);
        assert_eq!(header.frame_len, 371);
        assert_eq!(header.num_raw_blocks, 1);
    }

    #[test]
    fn verify_adts_invalid_header() {
        // Reserved sample rate index 13.
        let buf = [0xff, 0xf1, 0x74, 0x80, 0x2e, 0x7f, 0xfc];
        assert!(AdtsHeader::read(&mut BitReaderLtr::new(&buf)).is_err());

        // Frame shorter than its header.
        let buf = [0xff, 0xf1, 0x50, 0x80, 0x00, 0xdf, 0xfc];
        assert!(AdtsHeader::read(&mut BitReaderLtr::new(&buf)).is_err());

        assert!(!AdtsHeader::is_sync(&[0x12, 0x10]));
    }
}
