// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Coupling channel element (ISO/IEC 14496-3, 4.6.8.3).

use symphonia_core::errors::Result;
use symphonia_core::io::vlc::{Codebook, Entry8x16};
use symphonia_core::io::ReadBitsLtr;

use crate::aac::codebooks;
use crate::aac::common::Lcg;
use crate::aac::element::{ChannelElement, ElementType};
use crate::aac::ics::{Ics, IcsParams};
use crate::sample::Sample;

/// Gain scale steps selected by the 2-bit scale index: 2^(1/8), 2^(1/4), 2^(1/2), 2.
const CCE_SCALE: [f32; 4] = [1.0905077, 1.1892071, std::f32::consts::SQRT_2, 2.0];

/// Where in the reconstruction pipeline the coupling channel is added to its targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CouplingPoint {
    /// Spectral coefficients, before TNS.
    BeforeTns,
    /// Spectral coefficients, after TNS and before the inverse transform.
    BetweenTnsAndImdct,
    /// Time-domain samples, after the inverse transform.
    AfterImdct,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CouplingTarget {
    pub kind: ElementType,
    /// The coded id of the target.
    pub id: usize,
    /// For a channel pair: 1 for the left channel, 2 for the right, 3 for both with separate gains,
    /// and 0 for both with a shared gain. Always 2 for a single channel.
    pub ch_select: u8,
}

/// The coupling parameters of a coupling channel element.
#[derive(Clone, Debug)]
pub struct Coupling<S: Sample> {
    pub point: CouplingPoint,
    pub targets: Vec<CouplingTarget>,
    /// Gains per gain list, indexed by window group and band. After the inverse transform, a
    /// single gain per list.
    pub gains: Vec<Vec<S>>,
    /// Set if coupling data was decoded in the current block.
    pub active: bool,
}

impl<S: Sample> Coupling<S> {
    pub fn new() -> Self {
        Coupling {
            point: CouplingPoint::BeforeTns,
            targets: Vec::new(),
            gains: Vec::new(),
            active: false,
        }
    }

    /// Get the channel halves of a target element and the gain list applied to each.
    pub fn target_gains(&self, kind: ElementType, id: usize) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        let mut index = 0;

        for target in &self.targets {
            if target.kind == kind && target.id == id {
                if target.ch_select != 1 {
                    out.push((0, index));

                    if target.ch_select != 0 {
                        index += 1;
                    }
                }

                if target.ch_select != 2 {
                    out.push((1, index));
                    index += 1;
                }
            }
            else {
                index += 1 + usize::from(target.ch_select == 3);
            }
        }

        out
    }

    /// Add the spectral coefficients of the coupling channel, scaled per band, to `dest`.
    pub fn apply_dependent(&self, cce: &Ics<S>, index: usize, dest: &mut [S]) {
        let Some(gains) = self.gains.get(index)
        else {
            return;
        };

        let info = &cce.info;
        let bands = info.swb_offset;
        let stride = info.window_stride(cce.frame_len());
        let len = dest.len().min(cce.coeffs.len());

        let mut idx = 0;
        let mut cur_w = 0;

        for g in 0..info.num_window_groups {
            let next_w = cur_w + info.group_len[g];

            for sfb in 0..info.max_sfb {
                if !cce.is_zero(g, sfb) {
                    let gain = gains[idx];

                    for w in cur_w..next_w {
                        let start = (bands[sfb] + w * stride).min(len);
                        let end = (bands[sfb + 1] + w * stride).min(len);

                        for (d, &s) in dest[start..end].iter_mut().zip(&cce.coeffs[start..end]) {
                            *d += gain * s;
                        }
                    }
                }

                idx += 1;
            }

            cur_w = next_w;
        }
    }

    /// Add the time-domain output of the coupling channel, scaled, to `dest`.
    pub fn apply_independent(&self, src: &[S], index: usize, dest: &mut [S]) {
        let Some(&gain) = self.gains.get(index).and_then(|gains| gains.first())
        else {
            return;
        };

        for (d, &s) in dest.iter_mut().zip(src) {
            *d += gain * s;
        }
    }
}

impl<S: Sample> Default for Coupling<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[inline(always)]
fn cce_gain<S: Sample>(scale: f32, gain: i32) -> S {
    S::from_f32(scale.powi(-gain))
}

/// Decode a coupling channel element.
pub fn decode_cce<S: Sample, B: ReadBitsLtr>(
    elem: &mut ChannelElement<S>,
    bs: &mut B,
    params: &IcsParams,
    noise: &mut Lcg,
) -> Result<()> {
    let coup = &mut elem.coupling;

    coup.active = false;

    let ind_sw = bs.read_bool()?;
    let num_coupled = bs.read_bits_leq32(3)? as usize + 1;

    let mut num_gain = 0;

    coup.targets.clear();

    for _ in 0..num_coupled {
        num_gain += 1;

        let kind = if bs.read_bool()? { ElementType::Cpe } else { ElementType::Sce };
        let id = bs.read_bits_leq32(4)? as usize;

        let ch_select = if kind == ElementType::Cpe {
            let ch_select = bs.read_bits_leq32(2)? as u8;

            if ch_select == 3 {
                num_gain += 1;
            }

            ch_select
        }
        else {
            2
        };

        coup.targets.push(CouplingTarget { kind, id, ch_select });
    }

    // The independently switched flag forces coupling after the inverse transform.
    coup.point = match (ind_sw, bs.read_bool()?) {
        (true, _) => CouplingPoint::AfterImdct,
        (false, false) => CouplingPoint::BeforeTns,
        (false, true) => CouplingPoint::BetweenTnsAndImdct,
    };

    let sign = bs.read_bool()?;
    let scale = CCE_SCALE[bs.read_bits_leq32(2)? as usize];

    elem.ch[0].decode(bs, params, noise, false, false)?;

    let coup = &mut elem.coupling;
    let ics = &elem.ch[0];
    let info = &ics.info;

    let scf_cb: &Codebook<Entry8x16> = &codebooks::SCALEFACTORS;

    coup.gains.resize_with(num_gain, Vec::new);

    for c in 0..num_gain {
        let mut cge = true;
        let mut gain = 0;
        let mut gain_cache = S::from_f32(1.0);

        if c > 0 {
            cge = coup.point == CouplingPoint::AfterImdct || bs.read_bool()?;

            if cge {
                gain = i32::from(bs.read_codebook(scf_cb)?.0) - 60;
            }

            gain_cache = cce_gain(scale, gain);
        }

        let gains = &mut coup.gains[c];
        gains.clear();

        if coup.point == CouplingPoint::AfterImdct {
            gains.push(gain_cache);
            continue;
        }

        gains.resize(info.num_window_groups * info.max_sfb, S::ZERO);

        let mut idx = 0;

        for g in 0..info.num_window_groups {
            for sfb in 0..info.max_sfb {
                if !ics.is_zero(g, sfb) {
                    if !cge {
                        let t = i32::from(bs.read_codebook(scf_cb)?.0) - 60;

                        if t != 0 {
                            gain += t;

                            gain_cache = if sign {
                                let s = S::from_f32(1.0 - 2.0 * (gain & 1) as f32);
                                s * cce_gain(scale, gain >> 1)
                            }
                            else {
                                cce_gain(scale, gain)
                            };
                        }
                    }

                    gains[idx] = gain_cache;
                }

                idx += 1;
            }
        }
    }

    coup.active = true;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coupling(targets: &[CouplingTarget]) -> Coupling<f32> {
        let mut coup = Coupling::new();
        coup.targets = targets.to_vec();
        coup
    }

    #[test]
    fn verify_target_gain_indices() {
        let coup = coupling(&[
            CouplingTarget { kind: ElementType::Sce, id: 0, ch_select: 2 },
            CouplingTarget { kind: ElementType::Cpe, id: 0, ch_select: 3 },
            CouplingTarget { kind: ElementType::Cpe, id: 1, ch_select: 0 },
            CouplingTarget { kind: ElementType::Cpe, id: 2, ch_select: 1 },
        ]);

        assert_eq!(coup.target_gains(ElementType::Sce, 0), vec![(0, 0)]);
        // Separate gains for both halves.
        assert_eq!(coup.target_gains(ElementType::Cpe, 0), vec![(0, 1), (1, 2)]);
        // One shared gain.
        assert_eq!(coup.target_gains(ElementType::Cpe, 1), vec![(0, 3), (1, 3)]);
        // Right channel only.
        assert_eq!(coup.target_gains(ElementType::Cpe, 2), vec![(1, 4)]);
        assert!(coup.target_gains(ElementType::Sce, 1).is_empty());
    }

    #[test]
    fn verify_independent_coupling() {
        let mut coup = coupling(&[]);
        coup.gains = vec![vec![0.5]];

        let src = [1.0f32, 2.0, 3.0];
        let mut dest = [1.0f32; 3];
        coup.apply_independent(&src, 0, &mut dest);
        assert_eq!(dest, [1.5, 2.0, 2.5]);

        // Unknown gain lists are ignored.
        coup.apply_independent(&src, 1, &mut dest);
        assert_eq!(dest, [1.5, 2.0, 2.5]);
    }

    #[test]
    fn verify_gain_scale() {
        assert!((cce_gain::<f32>(CCE_SCALE[3], -2) - 4.0).abs() < 1e-6);
        assert!((cce_gain::<f32>(CCE_SCALE[2], 2) - 0.5).abs() < 1e-6);
    }
}
