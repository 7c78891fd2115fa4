// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reconstruction of decoded elements into an output frame.

use log::{debug, warn};

use symphonia_core::errors::Result;

use crate::aac::cce::CouplingPoint;
use crate::aac::common::MAX_ELEM_ID;
use crate::aac::dsp::SpectralTransform;
use crate::aac::element::{ElementArena, ElementKey, ElementType};
use crate::aac::ics::Ics;
use crate::aac::output::OutputManager;
use crate::common::{ChannelLayout, ChannelPositions, M4AType};
use crate::sample::Sample;

/// The elements are reconstructed in this order so that coupling channels are complete before
/// their targets.
const RECONSTRUCT_ORDER: [ElementType; 4] =
    [ElementType::Lfe, ElementType::Cce, ElementType::Cpe, ElementType::Sce];

/// How to output a stereo stream made of two independent mono programs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DualMonoMode {
    /// Output both programs.
    #[default]
    Off,
    /// Output the first program on both channels.
    LeftToBoth,
    /// Output the second program on both channels.
    RightToBoth,
}

/// A decoded frame of planar audio.
#[derive(Clone, Debug)]
pub struct AudioFrame<S: Sample> {
    planes: Vec<Vec<S>>,
    frames: usize,
    sample_rate: u32,
    key_frame: bool,
    layout: ChannelLayout,
}

impl<S: Sample> AudioFrame<S> {
    pub fn new() -> Self {
        AudioFrame {
            planes: Vec::new(),
            frames: 0,
            sample_rate: 0,
            key_frame: false,
            layout: ChannelLayout::default(),
        }
    }

    /// The number of channels.
    pub fn channels(&self) -> usize {
        self.planes.len()
    }

    /// The number of samples per channel. Zero if the last block carried no audio.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns true if the frame can be output without a preceding frame.
    pub fn is_key_frame(&self) -> bool {
        self.key_frame
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    /// Get the samples of a channel.
    pub fn plane(&self, ch: usize) -> &[S] {
        &self.planes[ch][..self.frames]
    }

    /// Iterate over the samples of all channels, in output order.
    pub fn planes(&self) -> impl Iterator<Item = &[S]> {
        self.planes.iter().map(move |plane| &plane[..self.frames])
    }

    pub(crate) fn clear(&mut self) {
        self.frames = 0;
        self.key_frame = false;
    }
}

impl<S: Sample> Default for AudioFrame<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Hands the coefficients of decoded elements to the transform and extension stages, and
/// gathers the resulting samples into an [`AudioFrame`].
pub struct FrameAssembler<S: Sample> {
    transform: Box<dyn SpectralTransform<S>>,
    frame: AudioFrame<S>,
    dual_mono: DualMonoMode,
    /// Predicted coefficients of the channel being reconstructed.
    ltp_pred: Vec<S>,
    warned_ltp_coupling: bool,
    warned_ltp: bool,
}

impl<S: Sample> FrameAssembler<S> {
    pub fn new(transform: Box<dyn SpectralTransform<S>>, dual_mono: DualMonoMode) -> Self {
        FrameAssembler {
            transform,
            frame: AudioFrame::new(),
            dual_mono,
            ltp_pred: Vec::new(),
            warned_ltp_coupling: false,
            warned_ltp: false,
        }
    }

    pub fn set_transform(&mut self, transform: Box<dyn SpectralTransform<S>>) {
        self.transform = transform;
    }

    pub fn frame(&self) -> &AudioFrame<S> {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut AudioFrame<S> {
        &mut self.frame
    }

    /// Reconstruct the samples of every element decoded in the current block.
    ///
    /// `out_len` is the number of samples per channel after the bandwidth extension.
    pub fn spectral_to_sample(
        &mut self,
        elements: &mut ElementArena<S>,
        object_type: M4AType,
        sbr_present: bool,
        out_len: usize,
    ) -> Result<()> {
        for kind in RECONSTRUCT_ORDER {
            for id in 0..MAX_ELEM_ID {
                let key = ElementKey::new(kind, id);

                if !elements.get(key).is_some_and(|elem| elem.present) {
                    continue;
                }

                let is_target = matches!(kind, ElementType::Sce | ElementType::Cpe);

                if is_target {
                    self.apply_coupling(elements, key, CouplingPoint::BeforeTns, object_type, 0);
                }

                let halves = if kind == ElementType::Cpe { 2 } else { 1 };

                if object_type == M4AType::Ltp {
                    if let Some(elem) = elements.get_mut(key) {
                        for ics in elem.ch[..halves].iter_mut() {
                            self.apply_ltp(ics)?;
                        }
                    }
                }

                if let Some(elem) = elements.get_mut(key) {
                    for ics in elem.ch.iter_mut() {
                        if ics.tns.present {
                            ics.tns.apply(&ics.info, &mut ics.coeffs);
                        }
                    }
                }

                if is_target {
                    let point = CouplingPoint::BetweenTnsAndImdct;
                    self.apply_coupling(elements, key, point, object_type, 0);
                }

                if let Some(elem) = elements.get_mut(key) {
                    if kind != ElementType::Cce || elem.coupling.point == CouplingPoint::AfterImdct
                    {
                        self.transform.synth(&mut elem.ch[0], object_type)?;

                        if kind == ElementType::Cpe {
                            self.transform.synth(&mut elem.ch[1], object_type)?;
                        }

                        if object_type == M4AType::Ltp {
                            for ics in elem.ch[..halves].iter_mut() {
                                ics.ltp_state.update(&ics.output, &ics.overlap);
                            }
                        }

                        if let Some(ext) = elem.extension.as_mut().filter(|_| sbr_present) {
                            let [ch0, ch1] = &mut elem.ch;
                            let right = is_target.then_some(&mut ch1.output[..]);
                            ext.apply(kind, &mut ch0.output, right)?;
                        }
                    }
                }

                if is_target {
                    let point = CouplingPoint::AfterImdct;
                    self.apply_coupling(elements, key, point, object_type, out_len);
                }

                if let Some(elem) = elements.get_mut(key) {
                    elem.present = false;
                }
            }
        }

        Ok(())
    }

    /// Add the long term prediction of a channel to the bands that use it.
    fn apply_ltp(&mut self, ics: &mut Ics<S>) -> Result<()> {
        let ltp = ics.info.ltp;

        if !ics.info.predictor_present || !ltp.present || ics.info.is_eight_short() {
            return Ok(());
        }

        self.ltp_pred.clear();
        self.ltp_pred.resize(ics.frame_len(), S::ZERO);

        if !self.transform.predict_ltp(ics, &mut self.ltp_pred)? {
            if !self.warned_ltp {
                warn!("long term prediction is not supported by the transform");
                self.warned_ltp = true;
            }
            return Ok(());
        }

        if ics.tns.present {
            ics.tns.apply(&ics.info, &mut self.ltp_pred);
        }

        ltp.add_prediction(&ics.info, &self.ltp_pred, &mut ics.coeffs);

        Ok(())
    }

    /// Add every active coupling channel with a matching coupling point to the target element.
    fn apply_coupling(
        &mut self,
        elements: &mut ElementArena<S>,
        target: ElementKey,
        point: CouplingPoint,
        object_type: M4AType,
        out_len: usize,
    ) {
        let Some((kind, tag)) = elements.get(target).map(|elem| (elem.kind, elem.tag))
        else {
            return;
        };

        for id in 0..MAX_ELEM_ID {
            let cce_key = ElementKey::new(ElementType::Cce, id);

            let gains = match elements.get(cce_key) {
                Some(cce) if cce.coupling.active && cce.coupling.point == point => {
                    cce.coupling.target_gains(kind, tag)
                }
                _ => continue,
            };

            if gains.is_empty() {
                continue;
            }

            if point != CouplingPoint::AfterImdct && object_type == M4AType::Ltp {
                if !self.warned_ltp_coupling {
                    warn!("dependent coupling is not supported together with ltp");
                    self.warned_ltp_coupling = true;
                }
                continue;
            }

            let (Some(cce), Some(elem)) = elements.get_pair_mut(cce_key, target)
            else {
                continue;
            };

            for (half, index) in gains {
                let dest = &mut elem.ch[half];

                if point == CouplingPoint::AfterImdct {
                    let len = out_len.min(dest.output.len()).min(cce.ch[0].output.len());
                    let src = &cce.ch[0].output[..len];
                    cce.coupling.apply_independent(src, index, &mut dest.output[..len]);
                }
                else {
                    cce.coupling.apply_dependent(&cce.ch[0], index, &mut dest.coeffs);
                }
            }
        }
    }

    /// Gather the output channels into the frame.
    ///
    /// `sce_count` is the number of single channel elements decoded in the block, used to detect
    /// dual mono streams.
    pub fn assemble(
        &mut self,
        output: &mut OutputManager<S>,
        frames: usize,
        sample_rate: u32,
        sce_count: usize,
    ) {
        if output.take_frame_request() {
            debug!("reallocating output frame for {} channels", output.channels().len());
            self.frame.planes = Vec::new();
        }

        let channels = output.channels();

        self.frame.planes.resize_with(channels.len(), Vec::new);

        for (plane, out) in self.frame.planes.iter_mut().zip(channels) {
            plane.clear();

            if let Some(elem) = output.elements.get(out.key) {
                let src = &elem.ch[out.half].output;
                plane.extend_from_slice(&src[..frames.min(src.len())]);
            }

            plane.resize(frames, S::ZERO);
        }

        self.frame.frames = frames;
        self.frame.sample_rate = sample_rate;
        self.frame.key_frame = frames > 0;
        self.frame.layout = output.layout();

        let stereo = ChannelPositions::FRONT_LEFT | ChannelPositions::FRONT_RIGHT;

        let is_dual_mono = self.dual_mono != DualMonoMode::Off
            && sce_count == 2
            && self.frame.layout == ChannelLayout::Positions(stereo);

        if is_dual_mono {
            let (left, right) = self.frame.planes.split_at_mut(1);

            match self.dual_mono {
                DualMonoMode::LeftToBoth => right[0].copy_from_slice(&left[0]),
                DualMonoMode::RightToBoth => left[0].copy_from_slice(&right[0]),
                DualMonoMode::Off => (),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aac::cce::CouplingTarget;
    use crate::aac::common::MAX_LTP_LONG_SFB;
    use crate::aac::dsp::ImdctTransform;
    use crate::aac::info::StreamInfo;
    use crate::aac::output::{ChannelOrder, ChannelPosition, LayoutEntry, OutputStatus};

    /// A transform that copies the coefficients to the output.
    struct Passthrough;

    impl SpectralTransform<f32> for Passthrough {
        fn synth(&mut self, ics: &mut Ics<f32>, _: M4AType) -> Result<()> {
            let len = ics.frame_len();
            ics.output[..len].copy_from_slice(&ics.coeffs);
            Ok(())
        }
    }

    fn dual_mono() -> OutputManager<f32> {
        let mut output = OutputManager::new(StreamInfo::new(48000), ChannelOrder::Default, false);

        let map = [
            LayoutEntry::new(ElementType::Sce, 0, ChannelPosition::Front),
            LayoutEntry::new(ElementType::Sce, 1, ChannelPosition::Front),
            LayoutEntry::new(ElementType::Cce, 0, ChannelPosition::Cc),
        ];

        output.configure_output(&map, OutputStatus::TrialFrame, true).unwrap();
        output
    }

    fn fill(output: &mut OutputManager<f32>, kind: ElementType, id: usize, value: f32) {
        let elem = output.elements.get_mut(ElementKey::new(kind, id)).unwrap();
        elem.tag = id;
        elem.present = true;
        elem.ch[0].coeffs.fill(value);
    }

    #[test]
    fn verify_dual_mono() {
        for (mode, expected) in [
            (DualMonoMode::Off, [1.0, 2.0]),
            (DualMonoMode::LeftToBoth, [1.0, 1.0]),
            (DualMonoMode::RightToBoth, [2.0, 2.0]),
        ] {
            let mut output = dual_mono();
            fill(&mut output, ElementType::Sce, 0, 1.0);
            fill(&mut output, ElementType::Sce, 1, 2.0);

            let mut asm = FrameAssembler::new(Box::new(Passthrough), mode);
            asm.spectral_to_sample(&mut output.elements, M4AType::Lc, false, 1024).unwrap();
            asm.assemble(&mut output, 1024, 48000, 2);

            let frame = asm.frame();
            assert_eq!(frame.channels(), 2);
            assert_eq!(frame.frames(), 1024);
            assert!(frame.is_key_frame());
            assert_eq!(frame.plane(0)[0], expected[0]);
            assert_eq!(frame.plane(1)[0], expected[1]);
        }
    }

    #[test]
    fn verify_independent_coupling() {
        let mut output = dual_mono();
        fill(&mut output, ElementType::Sce, 0, 1.0);
        fill(&mut output, ElementType::Sce, 1, 1.0);
        fill(&mut output, ElementType::Cce, 0, 4.0);

        // Couple the CCE into the second SCE after the transform, at half gain.
        let cce = output.elements.get_mut(ElementKey::new(ElementType::Cce, 0)).unwrap();
        cce.coupling.point = CouplingPoint::AfterImdct;
        cce.coupling.targets = vec![CouplingTarget { kind: ElementType::Sce, id: 1, ch_select: 2 }];
        cce.coupling.gains = vec![vec![0.5]];
        cce.coupling.active = true;

        let mut asm = FrameAssembler::new(Box::new(Passthrough), DualMonoMode::Off);
        asm.spectral_to_sample(&mut output.elements, M4AType::Lc, false, 1024).unwrap();
        asm.assemble(&mut output, 1024, 48000, 2);

        assert_eq!(asm.frame().plane(0)[10], 1.0);
        assert_eq!(asm.frame().plane(1)[10], 3.0);

        // Presence is cleared once reconstructed.
        assert!(!output.elements.get(ElementKey::new(ElementType::Sce, 0)).unwrap().present);
    }

    #[test]
    fn verify_inactive_coupling_ignored() {
        let mut output = dual_mono();
        fill(&mut output, ElementType::Sce, 1, 1.0);

        let cce = output.elements.get_mut(ElementKey::new(ElementType::Cce, 0)).unwrap();
        cce.coupling.point = CouplingPoint::AfterImdct;
        cce.coupling.targets = vec![CouplingTarget { kind: ElementType::Sce, id: 1, ch_select: 2 }];
        cce.coupling.gains = vec![vec![0.5]];
        cce.ch[0].output.fill(4.0);

        let mut asm = FrameAssembler::new(Box::new(Passthrough), DualMonoMode::Off);
        asm.spectral_to_sample(&mut output.elements, M4AType::Lc, false, 1024).unwrap();
        asm.assemble(&mut output, 1024, 48000, 1);

        assert_eq!(asm.frame().plane(1)[0], 1.0);
        // An element absent from the block outputs its previous samples, here silence.
        assert_eq!(asm.frame().plane(0)[0], 0.0);
    }

    /// Reconstruct a frame of the first SCE, optionally with long term prediction.
    fn decode_ltp_frame(
        asm: &mut FrameAssembler<f32>,
        output: &mut OutputManager<f32>,
        coeff: f32,
        ltp: bool,
    ) -> Vec<f32> {
        let bands = StreamInfo::new(48000).bands().unwrap().long_bands;

        fill(output, ElementType::Sce, 0, 0.0);

        let elem = output.elements.get_mut(ElementKey::new(ElementType::Sce, 0)).unwrap();
        let ics = &mut elem.ch[0];

        ics.coeffs[12] = coeff;
        ics.info.swb_offset = bands;
        ics.info.max_sfb = 10;
        ics.info.predictor_present = ltp;
        ics.info.ltp.present = ltp;
        ics.info.ltp.lag = 1024;
        ics.info.ltp.coef = 1.0;
        ics.info.ltp.used = [true; MAX_LTP_LONG_SFB];

        asm.spectral_to_sample(&mut output.elements, M4AType::Ltp, false, 1024).unwrap();
        asm.assemble(output, 1024, 48000, 1);
        asm.frame().plane(0).to_vec()
    }

    #[test]
    fn verify_long_term_prediction() {
        let mut plain = dual_mono();
        let mut predicted = dual_mono();

        let mut asm_plain = FrameAssembler::new(Box::new(ImdctTransform::new()), DualMonoMode::Off);
        let mut asm_predicted =
            FrameAssembler::new(Box::new(ImdctTransform::new()), DualMonoMode::Off);

        // The same first frame, with no history to predict from.
        let a = decode_ltp_frame(&mut asm_plain, &mut plain, 1000.0, false);
        let b = decode_ltp_frame(&mut asm_predicted, &mut predicted, 1000.0, true);
        assert!(a.iter().any(|&x| x != 0.0));
        assert_eq!(a, b);

        // A silent second frame is predicted from the output of the first.
        let a = decode_ltp_frame(&mut asm_plain, &mut plain, 0.0, false);
        let b = decode_ltp_frame(&mut asm_predicted, &mut predicted, 0.0, true);
        assert!(a.iter().zip(&b).any(|(x, y)| (x - y).abs() > 1e-3));
    }

    #[test]
    fn verify_silent_block() {
        let mut output = dual_mono();
        fill(&mut output, ElementType::Sce, 0, 0.0);

        let mut asm = FrameAssembler::new(Box::new(ImdctTransform::new()), DualMonoMode::Off);
        asm.spectral_to_sample(&mut output.elements, M4AType::Lc, false, 1024).unwrap();
        asm.assemble(&mut output, 1024, 48000, 1);

        assert!(asm.frame().planes().all(|plane| plane.iter().all(|&s| s == 0.0)));
    }
}
