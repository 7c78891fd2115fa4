// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Program config element (ISO/IEC 14496-3, 4.4.1.1).

use symphonia_core::errors::Result;
use symphonia_core::io::{FiniteBitStream, ReadBitsLtr};

use log::warn;

use crate::aac::common::ensure_bits;
use crate::aac::element::ElementType;
use crate::aac::output::{ChannelPosition, LayoutEntry};

/// A decoded program config element.
#[derive(Clone, Debug, Default)]
pub struct ProgramConfig {
    /// The profile field. Ignored by the decoder.
    pub profile: u8,
    pub sf_index: usize,
    /// Front, side, back, LFE and coupling elements, in that order.
    pub layout_map: Vec<LayoutEntry>,
    pub mono_mixdown: Option<u8>,
    pub stereo_mixdown: Option<u8>,
    /// Matrix mixdown index and the pseudo surround flag.
    pub matrix_mixdown: Option<(u8, bool)>,
    pub comment: Vec<u8>,
}

impl ProgramConfig {
    /// Read a program config element following its element instance tag.
    ///
    /// `sf_index` is the sampling frequency index configured by the container. Byte alignment is
    /// relative to the start of the reader's buffer.
    pub fn read<B: ReadBitsLtr + FiniteBitStream>(bs: &mut B, sf_index: usize) -> Result<Self> {
        let profile = bs.read_bits_leq32(2)? as u8;

        let pce_sf_index = bs.read_bits_leq32(4)? as usize;

        if pce_sf_index != sf_index {
            warn!(
                "sample rate index in program config element ({}) does not match the \
                 configured index ({})",
                pce_sf_index, sf_index
            );
        }

        let num_front = bs.read_bits_leq32(4)? as usize;
        let num_side = bs.read_bits_leq32(4)? as usize;
        let num_back = bs.read_bits_leq32(4)? as usize;
        let num_lfe = bs.read_bits_leq32(2)? as usize;
        let num_assoc_data = bs.read_bits_leq32(3)? as usize;
        let num_cc = bs.read_bits_leq32(4)? as usize;

        let mono_mixdown =
            if bs.read_bool()? { Some(bs.read_bits_leq32(4)? as u8) } else { None };

        let stereo_mixdown =
            if bs.read_bool()? { Some(bs.read_bits_leq32(4)? as u8) } else { None };

        let matrix_mixdown = if bs.read_bool()? {
            let index = bs.read_bits_leq32(2)? as u8;
            let pseudo_surround = bs.read_bool()?;
            Some((index, pseudo_surround))
        }
        else {
            None
        };

        let map_bits = 5 * (num_front + num_side + num_back + num_cc)
            + 4 * (num_lfe + num_assoc_data + num_cc);

        ensure_bits(bs, map_bits as u64)?;

        let mut layout_map = Vec::with_capacity(num_front + num_side + num_back + num_lfe + num_cc);

        read_channel_map(bs, &mut layout_map, ChannelPosition::Front, num_front)?;
        read_channel_map(bs, &mut layout_map, ChannelPosition::Side, num_side)?;
        read_channel_map(bs, &mut layout_map, ChannelPosition::Back, num_back)?;
        read_channel_map(bs, &mut layout_map, ChannelPosition::Lfe, num_lfe)?;

        // Associated data element tags.
        bs.ignore_bits(4 * num_assoc_data as u32)?;

        read_channel_map(bs, &mut layout_map, ChannelPosition::Cc, num_cc)?;

        bs.realign();

        let comment_len = bs.read_bits_leq32(8)? as usize;

        ensure_bits(bs, 8 * comment_len as u64)?;

        let mut comment = Vec::with_capacity(comment_len);

        for _ in 0..comment_len {
            comment.push(bs.read_bits_leq32(8)? as u8);
        }

        Ok(ProgramConfig {
            profile,
            sf_index: pce_sf_index,
            layout_map,
            mono_mixdown,
            stereo_mixdown,
            matrix_mixdown,
            comment,
        })
    }
}

fn read_channel_map<B: ReadBitsLtr>(
    bs: &mut B,
    layout_map: &mut Vec<LayoutEntry>,
    position: ChannelPosition,
    count: usize,
) -> Result<()> {
    for _ in 0..count {
        let kind = match position {
            ChannelPosition::Lfe => ElementType::Lfe,
            ChannelPosition::Cc => {
                // Independently switched flag.
                bs.ignore_bits(1)?;
                ElementType::Cce
            }
            _ => {
                if bs.read_bool()? {
                    ElementType::Cpe
                }
                else {
                    ElementType::Sce
                }
            }
        };

        let id = bs.read_bits_leq32(4)? as usize;

        layout_map.push(LayoutEntry::new(kind, id, position));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia_core::io::BitReaderLtr;

    #[test]
    fn verify_pce_5_1() {
        // profile 1, sf_index 3, 2 front, 0 side, 1 back, 1 lfe, 0 assoc, 0 cc, no mixdowns,
        // front: SCE 0, CPE 0; back: CPE 1; lfe: 0; comment length 0.
        let buf = [
            0b0100_1100, // profile, sf_index, num_front[3:2]
            0b1000_0000, // num_front[1:0], num_side, num_back[3:2]
            0b0101_0000, // num_back[1:0], num_lfe, num_assoc, num_cc[3]
            0b0000_0000, // num_cc[2:0], mixdowns, front 0 is_cpe, front 0 tag[3]
            0b0001_0000, // front 0 tag[2:0], front 1 is_cpe, front 1 tag
            0b1000_1000, // back 0 is_cpe, back 0 tag, lfe tag[3:1]
            0b0000_0000, // lfe tag[0], alignment
            0b0000_0000, // comment length
        ];

        let mut bs = BitReaderLtr::new(&buf);
        let pce = ProgramConfig::read(&mut bs, 3).unwrap();

        assert_eq!(pce.profile, 1);
        assert_eq!(pce.sf_index, 3);
        assert_eq!(
            pce.layout_map,
            vec![
                LayoutEntry::new(ElementType::Sce, 0, ChannelPosition::Front),
                LayoutEntry::new(ElementType::Cpe, 0, ChannelPosition::Front),
                LayoutEntry::new(ElementType::Cpe, 1, ChannelPosition::Back),
                LayoutEntry::new(ElementType::Lfe, 0, ChannelPosition::Lfe),
            ]
        );
        assert!(pce.comment.is_empty());
    }

    #[test]
    fn verify_pce_overread() {
        // 15 front elements but only a few bytes of data.
        let buf = [0b0001_0011, 0b1100_0000, 0, 0];
        let mut bs = BitReaderLtr::new(&buf);
        assert!(ProgramConfig::read(&mut bs, 4).is_err());
    }
}
