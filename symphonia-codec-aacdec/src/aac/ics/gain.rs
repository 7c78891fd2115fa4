// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use symphonia_core::errors::Result;
use symphonia_core::io::ReadBitsLtr;

/// Window count, whether the first window uses 4 bit locations, and the location size, for each
/// window sequence.
const GAIN_MODE: [(usize, bool, u32); 4] =
    [(1, false, 5), (2, true, 2), (8, false, 2), (2, true, 5)];

/// Skip over SSR gain control data.
pub fn skip_gain_control<B: ReadBitsLtr>(bs: &mut B, window_sequence: u8) -> Result<()> {
    let (num_windows, short_first, loc_bits) = GAIN_MODE[usize::from(window_sequence & 3)];

    let max_band = bs.read_bits_leq32(2)?;

    for _ in 0..max_band {
        for wd in 0..num_windows {
            let adjust_num = bs.read_bits_leq32(3)?;

            let bits = 4 + if wd == 0 && short_first { 4 } else { loc_bits };

            for _ in 0..adjust_num {
                bs.ignore_bits(bits)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia_core::io::{BitReaderLtr, FiniteBitStream};

    #[test]
    fn verify_skip_gain_control() {
        // One band, one adjustment of 4 + 5 bits on the single long window.
        let buf = [0b0100_1000, 0b0000_0000, 0b0000_0000];
        let mut bs = BitReaderLtr::new(&buf);

        skip_gain_control(&mut bs, 0).unwrap();
        assert_eq!(bs.bits_left(), 24 - 2 - 3 - 9);
    }
}
