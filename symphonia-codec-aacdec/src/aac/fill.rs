// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data stream and fill elements.

use log::debug;

use symphonia_core::errors::Result;
use symphonia_core::io::{FiniteBitStream, ReadBitsLtr};

use crate::aac::common::{ensure_bits, MAX_CHANNELS};

/// Extension payload types of a fill element.
pub const EXT_FILL: u32 = 0x0;
pub const EXT_FILL_DATA: u32 = 0x1;
pub const EXT_DATA_ELEMENT: u32 = 0x2;
pub const EXT_DYNAMIC_RANGE: u32 = 0xb;
pub const EXT_SBR_DATA: u32 = 0xd;
pub const EXT_SBR_DATA_CRC: u32 = 0xe;

/// The maximum number of dynamic range control bands.
const MAX_DRC_BANDS: usize = 16;

/// Skip a data stream element.
pub fn skip_data_stream<B: ReadBitsLtr + FiniteBitStream>(bs: &mut B) -> Result<()> {
    let byte_align = bs.read_bool()?;

    let mut count = bs.read_bits_leq32(8)?;

    if count == 255 {
        count += bs.read_bits_leq32(8)?;
    }

    if byte_align {
        bs.realign();
    }

    ensure_bits(bs, 8 * u64::from(count))?;
    bs.ignore_bits(8 * count)?;

    Ok(())
}

/// Read the byte count of a fill element given the 4-bit count field.
pub fn read_fill_count<B: ReadBitsLtr>(bs: &mut B, count: usize) -> Result<usize> {
    if count == 15 {
        return Ok(count + bs.read_bits_leq32(8)? as usize - 1);
    }

    Ok(count)
}

/// Dynamic range control information (ISO/IEC 14496-3, 4.5.2.7).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DynamicRange {
    /// The program the information applies to.
    pub pce_instance_tag: Option<u8>,
    /// Channels excluded from dynamic range control, in output order.
    pub exclude_mask: [bool; MAX_CHANNELS],
    pub band_incr: u8,
    pub interpolation_scheme: u8,
    /// The top of each band, in units of 4 spectral lines.
    pub band_top: [u8; MAX_DRC_BANDS],
    /// The program reference level, in steps of 0.25 dB below full scale.
    pub prog_ref_level: Option<u8>,
    /// The sign of the control value of each band. True to compress.
    pub dyn_rng_sgn: [bool; MAX_DRC_BANDS],
    pub dyn_rng_ctl: [u8; MAX_DRC_BANDS],
}

impl Default for DynamicRange {
    fn default() -> Self {
        DynamicRange {
            pce_instance_tag: None,
            exclude_mask: [false; MAX_CHANNELS],
            band_incr: 0,
            interpolation_scheme: 0,
            band_top: [0; MAX_DRC_BANDS],
            prog_ref_level: None,
            dyn_rng_sgn: [false; MAX_DRC_BANDS],
            dyn_rng_ctl: [0; MAX_DRC_BANDS],
        }
    }
}

impl DynamicRange {
    /// The number of control bands.
    pub fn num_bands(&self) -> usize {
        1 + usize::from(self.band_incr)
    }

    /// Read a dynamic range payload, updating the fields present. Returns the number of bytes
    /// the payload occupies.
    pub fn read<B: ReadBitsLtr>(&mut self, bs: &mut B) -> Result<usize> {
        let mut n = 1;

        if bs.read_bool()? {
            self.pce_instance_tag = Some(bs.read_bits_leq32(4)? as u8);
            // Reserved.
            bs.ignore_bits(4)?;
            n += 1;
        }

        if bs.read_bool()? {
            n += self.read_exclusions(bs)?;
        }

        let mut num_bands = 1;

        if bs.read_bool()? {
            self.band_incr = bs.read_bits_leq32(4)? as u8;
            self.interpolation_scheme = bs.read_bits_leq32(4)? as u8;
            n += 1;

            num_bands = self.num_bands();

            for top in self.band_top[..num_bands].iter_mut() {
                *top = bs.read_bits_leq32(8)? as u8;
                n += 1;
            }
        }

        if bs.read_bool()? {
            self.prog_ref_level = Some(bs.read_bits_leq32(7)? as u8);
            // Reserved.
            bs.ignore_bits(1)?;
            n += 1;
        }

        for band in 0..num_bands {
            self.dyn_rng_sgn[band] = bs.read_bool()?;
            self.dyn_rng_ctl[band] = bs.read_bits_leq32(7)? as u8;
            n += 1;
        }

        Ok(n)
    }

    /// Read the excluded channel mask in groups of 7, each group followed by a continuation bit.
    fn read_exclusions<B: ReadBitsLtr>(&mut self, bs: &mut B) -> Result<usize> {
        let mut num_excl_chan = 0;

        loop {
            for _ in 0..7 {
                self.exclude_mask[num_excl_chan] = bs.read_bool()?;
                num_excl_chan += 1;
            }

            if num_excl_chan >= MAX_CHANNELS - 7 || !bs.read_bool()? {
                break;
            }
        }

        Ok(num_excl_chan / 7)
    }
}

/// Read a fill payload of `len` bits. Returns the version of the encoder if the payload carries
/// a libfaac marker.
pub fn read_fill_data<B: ReadBitsLtr>(bs: &mut B, len: u32) -> Result<Option<(u32, u32)>> {
    if len < 13 + 7 * 8 {
        bs.ignore_bits(len)?;
        return Ok(None);
    }

    bs.ignore_bits(13)?;

    let mut left = len - 13;
    let mut text = Vec::with_capacity(left as usize / 8);

    while text.len() < 255 && left >= 8 {
        text.push(bs.read_bits_leq32(8)? as u8);
        left -= 8;
    }

    bs.ignore_bits(left)?;

    debug!("fill: {}", String::from_utf8_lossy(&text).trim_end_matches('\0'));

    Ok(libfaac_version(&text))
}

/// Parse the "libfaac <major>.<minor>" marker.
fn libfaac_version(text: &[u8]) -> Option<(u32, u32)> {
    let text = text.strip_prefix(b"libfaac ")?;

    let number = |text: &[u8]| -> Option<(u32, usize)> {
        let digits = text.iter().take_while(|c| c.is_ascii_digit()).count();
        let value = std::str::from_utf8(&text[..digits]).ok()?.parse().ok()?;
        Some((value, digits))
    };

    let (major, digits) = number(text)?;
    let text = text[digits..].strip_prefix(b".")?;
    let (minor, _) = number(text)?;

    Some((major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia_core::io::BitReaderLtr;

    fn pack(bits: impl Iterator<Item = bool>) -> Vec<u8> {
        let mut buf = Vec::new();
        for (i, bit) in bits.enumerate() {
            if i % 8 == 0 {
                buf.push(0);
            }
            if bit {
                buf[i / 8] |= 0x80 >> (i % 8);
            }
        }
        buf
    }

    #[test]
    fn verify_skip_data_stream() {
        // Not aligned, 2 bytes, then a marker bit.
        let buf = [0x01, 0x00, 0x00, 0x40];
        let mut bs = BitReaderLtr::new(&buf);
        skip_data_stream(&mut bs).unwrap();
        assert!(bs.read_bool().unwrap());

        // 3 bytes declared, 2 available.
        let buf = [0x01, 0x80, 0x00, 0x00];
        let mut bs = BitReaderLtr::new(&buf);
        assert!(skip_data_stream(&mut bs).is_err());
    }

    #[test]
    fn verify_fill_count() {
        let mut bs = BitReaderLtr::new(&[0x50]);
        assert_eq!(read_fill_count(&mut bs, 5).unwrap(), 5);
        assert_eq!(bs.bits_left(), 8);

        // Escaped: 15 + 16 - 1.
        let mut bs = BitReaderLtr::new(&[0x10]);
        assert_eq!(read_fill_count(&mut bs, 15).unwrap(), 30);
    }

    #[test]
    fn verify_dynamic_range() {
        // Tag 3, no exclusions, two bands with tops 10 and 20, reference level 40, band
        // controls (+, 5) and (-, 6).
        //
        // 1 0011 0000 | 0 | 1 0001 0000 00001010 00010100 | 1 0101000 0 | 0 0000101 1 0000110
        let bits = "100110000010001000000001010000101001010100000000010110000110";

        let buf = pack(bits.bytes().map(|b| b == b'1'));

        let mut drc = DynamicRange::default();
        let mut bs = BitReaderLtr::new(&buf);
        let n = drc.read(&mut bs).unwrap();

        assert_eq!(n, 8);
        assert_eq!(drc.pce_instance_tag, Some(3));
        assert_eq!(drc.num_bands(), 2);
        assert_eq!(&drc.band_top[..2], &[10, 20]);
        assert_eq!(drc.prog_ref_level, Some(40));
        assert_eq!(&drc.dyn_rng_sgn[..2], &[false, true]);
        assert_eq!(&drc.dyn_rng_ctl[..2], &[5, 6]);
    }

    #[test]
    fn verify_libfaac_marker() {
        assert_eq!(libfaac_version(b"libfaac 1.28\0"), Some((1, 28)));
        assert_eq!(libfaac_version(b"libfaac x"), None);
        assert_eq!(libfaac_version(b"Lavc58.54"), None);

        // 13 bits of padding followed by the text.
        let text = b"libfaac 1.28";
        let text_bits = text.iter().flat_map(|&c| (0..8).map(move |i| c & (0x80 >> i) != 0));
        let buf = pack(std::iter::repeat(false).take(13).chain(text_bits));

        let mut bs = BitReaderLtr::new(&buf);
        let len = 13 + 8 * text.len() as u32;
        assert_eq!(read_fill_data(&mut bs, len).unwrap(), Some((1, 28)));

        // Too short to carry a marker.
        let mut bs = BitReaderLtr::new(&buf);
        assert_eq!(read_fill_data(&mut bs, 60).unwrap(), None);
    }
}
