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

use symphonia_core::errors::Result;
use symphonia_core::io::ReadBitsLtr;

use crate::aac::common::validate;

/// Explicit corrections to the quantized magnitudes of up to four long window coefficients.
#[derive(Clone, Copy, Debug)]
pub struct Pulse {
    num_pulse: usize,
    pos: [usize; 4],
    amp: [u8; 4],
}

impl Pulse {
    pub fn read<B: ReadBitsLtr>(bs: &mut B, bands: &[usize], num_swb: usize) -> Result<Self> {
        let num_pulse = bs.read_bits_leq32(2)? as usize + 1;
        let pulse_start_sfb = bs.read_bits_leq32(6)? as usize;

        validate!(pulse_start_sfb < num_swb);

        let mut pos = [0; 4];
        let mut amp = [0; 4];

        let mut k = bands[pulse_start_sfb];

        for i in 0..num_pulse {
            k += bs.read_bits_leq32(5)? as usize;

            validate!(k < bands[num_swb]);

            pos[i] = k;
            amp[i] = bs.read_bits_leq32(4)? as u8;
        }

        Ok(Self { num_pulse, pos, amp })
    }

    /// Add the pulses that fall within a band to its quantized values. `start` is the index of
    /// the first coefficient of the band.
    pub fn apply(&self, start: usize, quant: &mut [i32]) {
        for (&pos, &amp) in self.pos[..self.num_pulse].iter().zip(&self.amp) {
            if let Some(q) = pos.checked_sub(start).and_then(|i| quant.get_mut(i)) {
                let amp = i32::from(amp);
                *q += if *q > 0 { amp } else { -amp };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia_core::io::BitReaderLtr;

    #[test]
    fn verify_pulse_apply() {
        // Two pulses starting at band 1: offset 2 with amplitude 3, then offset 1 with amplitude 5.
        let buf = [0b0100_0001, 0b0001_0001, 0b1000_0101, 0b0100_0000];
        let mut bs = BitReaderLtr::new(&buf);

        let bands = [0, 4, 8, 12];
        let pulse = Pulse::read(&mut bs, &bands, 3).unwrap();

        assert_eq!(&pulse.pos[..2], &[6, 7]);

        // Pulses outside the band are ignored.
        let mut quant = [1, -2, 0, 0];
        pulse.apply(0, &mut quant);
        assert_eq!(quant, [1, -2, 0, 0]);

        // Positive values grow, zero and negative values shrink.
        let mut quant = [0, 0, 2, 0];
        pulse.apply(4, &mut quant);
        assert_eq!(quant, [0, 0, 5, -5]);

        let mut quant = [0, 0, -2, 1];
        pulse.apply(4, &mut quant);
        assert_eq!(quant, [0, 0, -5, 6]);
    }
}
