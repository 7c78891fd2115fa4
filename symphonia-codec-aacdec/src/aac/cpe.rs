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

//! Channel pair element and joint-stereo reconstruction.

use symphonia_core::errors::{decode_error, Result};
use symphonia_core::io::ReadBitsLtr;

use crate::aac::common::*;
use crate::aac::element::ChannelElement;
use crate::aac::ics::{IcsParams, INTENSITY_HCB, NOISE_HCB};
use crate::common::M4AType;
use crate::sample::Sample;

/// Decode a channel pair element.
pub fn decode_cpe<S: Sample, B: ReadBitsLtr>(
    elem: &mut ChannelElement<S>,
    bs: &mut B,
    params: &IcsParams,
    noise: &mut Lcg,
) -> Result<()> {
    let common_window = params.is_eld() || bs.read_bool()?;

    elem.common_window = common_window;
    elem.ms_present = 0;

    if common_window {
        // Decode the common ICS info block into the first channel.
        elem.ch[0].info.decode(bs, params)?;

        // Copy the common ICS info decoded in the first channel to the second channel.
        let (ch0, ch1) = elem.ch.split_at_mut(1);
        ch1[0].info.copy_from_common(&ch0[0].info);

        let info1 = &mut elem.ch[1].info;

        // The second channel signals its own long term prediction.
        if info1.predictor_present && params.object_type != M4AType::Main {
            info1.ltp.present = bs.read_bool()?;

            if info1.ltp.present {
                let max_sfb = info1.max_sfb;
                info1.ltp.read(bs, max_sfb)?;
            }
        }

        elem.ms_present = bs.read_bits_leq32(2)? as u8;

        let info = &elem.ch[0].info;

        match elem.ms_present {
            0 => (),
            1 => {
                // If mid-side mask present is 1, then read a bit for each band indicating if
                // the band uses mid-side coding.
                for g in 0..info.num_window_groups {
                    for sfb in 0..info.max_sfb {
                        elem.ms_mask[g][sfb] = bs.read_bool()?;
                    }
                }
            }
            2 => {
                for g in 0..info.num_window_groups {
                    elem.ms_mask[g][..info.max_sfb].fill(true);
                }
            }
            _ => {
                log::error!("ms_present = 3 is reserved");
                return decode_error("aac: invalid mid-side mask");
            }
        }
    }

    elem.ch[0].decode(bs, params, noise, common_window, false)?;
    elem.ch[1].decode(bs, params, noise, common_window, false)?;

    if common_window {
        if elem.ms_present != 0 {
            apply_mid_side(elem);
        }

        if params.object_type == M4AType::Main {
            for ics in elem.ch.iter_mut() {
                ics.predictor.apply(&mut ics.coeffs, &ics.info, params.bands.pred_sfb_max);
            }
        }
    }

    apply_intensity(elem);

    Ok(())
}

/// Mid-side stereo (ISO/IEC 14496-3, 4.6.8.1).
fn apply_mid_side<S: Sample>(elem: &mut ChannelElement<S>) {
    let [ch0, ch1] = &mut elem.ch;

    let info = &ch0.info;
    let bands = info.swb_offset;
    let stride = info.window_stride(ch0.frame_len());

    let mut cur_w = 0;

    for g in 0..info.num_window_groups {
        let next_w = cur_w + info.group_len[g];

        for sfb in 0..info.max_sfb {
            if !elem.ms_mask[g][sfb]
                || ch0.band_type[g][sfb] >= NOISE_HCB
                || ch1.band_type[g][sfb] >= NOISE_HCB
            {
                continue;
            }

            for w in cur_w..next_w {
                let start = w * stride + bands[sfb];
                let end = w * stride + bands[sfb + 1];

                let mid = &mut ch0.coeffs[start..end];
                let side = &mut ch1.coeffs[start..end];

                for (m, s) in mid.iter_mut().zip(side) {
                    let tmp = *m - *s;
                    *m += *s;
                    *s = tmp;
                }
            }
        }

        cur_w = next_w;
    }
}

/// Intensity stereo (ISO/IEC 14496-3, 4.6.8.2).
fn apply_intensity<S: Sample>(elem: &mut ChannelElement<S>) {
    let [ch0, ch1] = &mut elem.ch;

    let info = &ch1.info;
    let bands = info.swb_offset;
    let stride = info.window_stride(ch1.frame_len());
    let invert_by_mask = elem.ms_present != 0;

    let mut cur_w = 0;

    for g in 0..info.num_window_groups {
        let next_w = cur_w + info.group_len[g];

        let mut sfb = 0;

        while sfb < info.max_sfb {
            let run_end = usize::from(ch1.band_type_run_end[g][sfb]).clamp(sfb + 1, info.max_sfb);

            if !ch1.is_intensity(g, sfb) {
                sfb = run_end;
                continue;
            }

            for sfb in sfb..run_end {
                let mut positive = ch1.band_type[g][sfb] == INTENSITY_HCB;

                if invert_by_mask && elem.ms_mask[g][sfb] {
                    positive = !positive;
                }

                let scale = S::pow2_quarter(ch1.sf[g][sfb]);
                let scale = if positive { scale } else { -scale };

                for w in cur_w..next_w {
                    let start = w * stride + bands[sfb];
                    let end = w * stride + bands[sfb + 1];

                    let left = &ch0.coeffs[start..end];
                    let right = &mut ch1.coeffs[start..end];

                    for (r, &l) in right.iter_mut().zip(left) {
                        *r = scale * l;
                    }
                }
            }

            sfb = run_end;
        }

        cur_w = next_w;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aac::element::ElementType;
    use crate::aac::ics::INTENSITY_HCB2;

    fn pair() -> ChannelElement<f32> {
        let mut elem = ChannelElement::new(ElementType::Cpe, 1024);

        for ics in elem.ch.iter_mut() {
            ics.info.swb_offset = &SWB_OFFSET_48K_LONG;
            ics.info.num_swb = 49;
            ics.info.max_sfb = 2;
        }

        elem
    }

    #[test]
    fn verify_mid_side() {
        let mut elem = pair();
        elem.ms_present = 1;
        elem.ms_mask[0][0] = true;

        elem.ch[0].coeffs[..8].fill(3.0);
        elem.ch[1].coeffs[..8].fill(1.0);

        apply_mid_side(&mut elem);

        // Band 0 is reconstructed, band 1 is not.
        assert_eq!(&elem.ch[0].coeffs[..5], &[4.0, 4.0, 4.0, 4.0, 3.0]);
        assert_eq!(&elem.ch[1].coeffs[..5], &[2.0, 2.0, 2.0, 2.0, 1.0]);
    }

    #[test]
    fn verify_mid_side_skips_noise() {
        let mut elem = pair();
        elem.ms_present = 2;
        elem.ms_mask[0][..2].fill(true);
        elem.ch[1].band_type[0][0] = NOISE_HCB;

        elem.ch[0].coeffs[..8].fill(3.0);
        elem.ch[1].coeffs[..8].fill(1.0);

        apply_mid_side(&mut elem);

        assert_eq!(elem.ch[0].coeffs[0], 3.0);
        assert_eq!(elem.ch[0].coeffs[4], 4.0);
    }

    #[test]
    fn verify_intensity() {
        let mut elem = pair();

        elem.ch[0].coeffs[..8].fill(2.0);

        // Band 0: in phase, scale 0.5. Band 1: out of phase, scale 1.
        elem.ch[1].band_type[0][0] = INTENSITY_HCB;
        elem.ch[1].band_type_run_end[0][0] = 1;
        elem.ch[1].sf[0][0] = -4;
        elem.ch[1].band_type[0][1] = INTENSITY_HCB2;
        elem.ch[1].band_type_run_end[0][1] = 2;
        elem.ch[1].sf[0][1] = 0;

        apply_intensity(&mut elem);

        assert!(elem.ch[1].coeffs[..4].iter().all(|&c| (c - 1.0).abs() < 1e-6));
        assert!(elem.ch[1].coeffs[4..8].iter().all(|&c| (c + 2.0).abs() < 1e-6));

        // The mid-side mask inverts the direction.
        elem.ms_present = 1;
        elem.ms_mask[0][0] = true;

        apply_intensity(&mut elem);

        assert!(elem.ch[1].coeffs[..4].iter().all(|&c| (c + 1.0).abs() < 1e-6));
    }
}
