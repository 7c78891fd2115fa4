// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw data block decoding.

use log::{debug, error, info, trace, warn};

use symphonia_core::errors::{decode_error, unsupported_error, Error, Result};
use symphonia_core::io::{BitReaderLtr, FiniteBitStream, ReadBitsLtr};

use crate::aac::cce::decode_cce;
use crate::aac::common::{ensure_bits, Lcg, MAX_ELEM_ID, NOISE_SEED};
use crate::aac::cpe::decode_cpe;
use crate::aac::dsp::{ImdctTransform, SpectralTransform};
use crate::aac::element::{ElementKey, ElementType};
use crate::aac::extension::ExtensionFactory;
use crate::aac::fill::*;
use crate::aac::frame::{AudioFrame, DualMonoMode, FrameAssembler};
use crate::aac::ics::IcsParams;
use crate::aac::info::{AudioSpecificConfig, Presence, StreamInfo};
use crate::aac::output::{ChannelPosition, LayoutEntry, OutputManager, OutputStatus};
use crate::aac::pce::ProgramConfig;
use crate::aac::AacDecoderOptions;
use crate::adts::AdtsHeader;
use crate::common::{channel_config_for_count, sample_rate_index, M4AType};
use crate::sample::Sample;

// Syntactic element ids of a raw data block. Ids 0 to 3 are channel elements.
const ID_DSE: u32 = 4;
const ID_PCE: u32 = 5;
const ID_FIL: u32 = 6;
const ID_END: u32 = 7;

/// The number of output channels of a layout map.
fn count_channels(map: &[LayoutEntry]) -> usize {
    map.iter()
        .filter(|entry| !matches!(entry.position, ChannelPosition::Off | ChannelPosition::Cc))
        .map(|entry| if entry.kind == ElementType::Cpe { 2 } else { 1 })
        .sum()
}

/// Decodes raw data blocks into frames of planar audio.
///
/// A raw data block is either a bare access unit as stored in a container, or one prefixed by an
/// ADTS header.
pub struct BlockDecoder<S: Sample> {
    output: OutputManager<S>,
    assembler: FrameAssembler<S>,
    noise: Lcg,
    dual_mono: DualMonoMode,
    drc: DynamicRange,
    skip_samples: usize,
    warned_short_sbr: bool,
    warned_no_extension: bool,
    warned_gain_control: bool,
}

impl<S: Sample> BlockDecoder<S> {
    /// Instantiate a decoder without an output configuration.
    pub fn new(info: StreamInfo, opts: &AacDecoderOptions) -> Self {
        BlockDecoder {
            output: OutputManager::new(info, opts.channel_order, opts.strict),
            assembler: FrameAssembler::new(Box::new(ImdctTransform::new()), opts.dual_mono),
            noise: Lcg::new(NOISE_SEED),
            dual_mono: opts.dual_mono,
            drc: DynamicRange::default(),
            skip_samples: 0,
            warned_short_sbr: false,
            warned_no_extension: false,
            warned_gain_control: false,
        }
    }

    /// Instantiate a decoder from an AudioSpecificConfig.
    pub fn from_audio_specific_config(buf: &[u8], opts: &AacDecoderOptions) -> Result<Self> {
        let asc = AudioSpecificConfig::read(buf)?;

        let mut dec = BlockDecoder::new(asc.info, opts);

        let map = match &asc.pce {
            Some(pce) => pce.layout_map.clone(),
            None => dec.output.set_default_config(asc.info.chan_config)?,
        };

        // Parametric stereo only applies to mono streams.
        if count_channels(&map) > 1 {
            dec.output.current.info.ps = Presence::Absent;
        }

        let info = dec.output.current.info;

        debug!(
            "audio specific config: {}, {} Hz, channel config {}, sbr {:?}, ps {:?}",
            info.object_type, info.sample_rate, info.chan_config, info.sbr, info.ps,
        );

        dec.output.configure_output(&map, OutputStatus::GlobalHeader, false)?;

        Ok(dec)
    }

    /// Instantiate a decoder from a sample rate and channel count. The object type is assumed to
    /// be AAC-LC. The streams are expected to carry ADTS headers or program config elements if
    /// the channel count has no default configuration.
    pub fn from_stream_params(
        sample_rate: u32,
        channels: usize,
        opts: &AacDecoderOptions,
    ) -> Result<Self> {
        let mut info = StreamInfo::new(sample_rate);

        info.sf_index = sample_rate_index(sample_rate);
        info.chan_config = channel_config_for_count(channels);

        let mut dec = BlockDecoder::new(info, opts);

        if info.chan_config != 0 {
            let map = dec.output.set_default_config(info.chan_config)?;
            dec.output.configure_output(&map, OutputStatus::GlobalHeader, false)?;
        }
        else {
            debug!("no default configuration for {} channels", channels);
        }

        Ok(dec)
    }

    /// Replace the spectral to time-domain transform.
    pub fn set_transform(&mut self, transform: Box<dyn SpectralTransform<S>>) {
        self.assembler.set_transform(transform);
    }

    /// Install a bandwidth extension factory. The current elements are reallocated.
    pub fn set_extension(&mut self, factory: Box<dyn ExtensionFactory<S>>) -> Result<()> {
        self.output.set_extension(factory);

        let map = self.output.current.layout_map.clone();
        let status = self.output.status();

        // A mono stream with spectral band replication may carry parametric stereo.
        let info = &mut self.output.current.info;

        if status < OutputStatus::Locked
            && info.sbr == Presence::Present
            && info.ps == Presence::Unknown
            && count_channels(&map) == 1
        {
            info.ps = Presence::Present;
        }

        // Elements are reallocated with extensions as they are configured.
        for kind in ElementType::ALL {
            for id in 0..MAX_ELEM_ID {
                self.output.elements.free(ElementKey::new(kind, id));
            }
        }

        self.output.configure_output(&map, status, true)
    }

    pub fn info(&self) -> &StreamInfo {
        &self.output.current.info
    }

    pub fn output(&self) -> &OutputManager<S> {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut OutputManager<S> {
        &mut self.output
    }

    /// The most recently decoded frame.
    pub fn frame(&self) -> &AudioFrame<S> {
        self.assembler.frame()
    }

    /// The most recent dynamic range control information.
    pub fn dynamic_range(&self) -> &DynamicRange {
        &self.drc
    }

    /// The number of leading samples the encoder is known to have delayed the stream by.
    pub fn skip_samples(&self) -> usize {
        self.skip_samples
    }

    /// Clear all inter-frame state. The output configuration is kept.
    pub fn reset(&mut self) {
        self.output.reset();
        self.assembler.frame_mut().clear();
    }

    /// Decode one raw data block.
    ///
    /// Returns the decoded frame. A block without channel elements produces a frame without
    /// samples.
    pub fn decode(&mut self, buf: &[u8]) -> Result<&AudioFrame<S>> {
        self.assembler.frame_mut().clear();

        for elem in self.output.elements.iter_mut() {
            elem.present = false;
            elem.coupling.active = false;
        }

        let mut bs = BitReaderLtr::new(buf);

        let res = if self.output.current.info.object_type.is_er() {
            self.decode_er(&mut bs)
        }
        else {
            let res = self.decode_ga(&mut bs, AdtsHeader::is_sync(buf));

            // Restore the previous configuration if a trial configuration failed.
            if res.is_err() {
                self.output.pop();
            }

            res
        };

        match res {
            Ok(()) => Ok(self.assembler.frame()),
            Err(Error::IoError(err)) => {
                debug!("block overrun: {}", err);
                decode_error("aac: input exhausted before end element")
            }
            Err(err) => Err(err),
        }
    }

    fn ics_params(&self) -> Result<IcsParams> {
        let info = &self.output.current.info;

        let bands = match info.bands() {
            Some(bands) => bands,
            None => return unsupported_error("aac: unsupported sample rate"),
        };

        Ok(IcsParams {
            object_type: info.object_type,
            bands,
            frame_len: info.frame_len(),
            strict: self.output.is_strict(),
        })
    }

    /// Read an ADTS header and apply its configuration as a trial.
    fn read_adts_header(&mut self, bs: &mut BitReaderLtr<'_>) -> Result<()> {
        let header = AdtsHeader::read(bs)?;

        if header.num_raw_blocks > 1 {
            warn!("adts frame with {} raw data blocks", header.num_raw_blocks);
            return unsupported_error("aac: multiple raw data blocks per adts frame");
        }

        let reset_extensions = match self.output.saved() {
            Some(saved) => {
                saved.status != OutputStatus::Locked
                    || saved.info.chan_config != header.chan_config
                    || saved.info.sample_rate != header.sample_rate
            }
            None => true,
        };

        self.output.push();

        let info = &mut self.output.current.info;

        info.object_type = header.object_type;
        info.sf_index = header.sf_index;
        info.sample_rate = header.sample_rate;
        info.chan_config = header.chan_config;
        info.frame_length_short = false;

        if reset_extensions {
            info.sbr = Presence::Unknown;
            info.ps = Presence::Unknown;
        }

        if header.chan_config != 0 {
            let map = self.output.set_default_config(header.chan_config)?;
            self.output.configure_output(&map, OutputStatus::TrialFrame, false)?;
        }
        else if self.dual_mono != DualMonoMode::Off && self.output.saved().is_none() {
            let map = [
                LayoutEntry::new(ElementType::Sce, 0, ChannelPosition::Front),
                LayoutEntry::new(ElementType::Sce, 1, ChannelPosition::Front),
            ];
            self.output.configure_output(&map, OutputStatus::TrialFrame, false)?;
        }

        if header.crc_present {
            bs.ignore_bits(16)?;
        }

        Ok(())
    }

    /// Look up the element for a coded channel element, checking for duplicates.
    fn channel_element(
        &mut self,
        kind: ElementType,
        id: usize,
        seen: &mut [[bool; MAX_ELEM_ID]; 4],
    ) -> Result<ElementKey> {
        let dup = &mut seen[kind as usize][id];

        if *dup && kind != ElementType::Cce {
            if self.output.is_strict() {
                error!("duplicate {} {}", kind, id);
                return decode_error("aac: duplicate channel element");
            }
            warn!("duplicate {} {}", kind, id);
        }

        *dup = true;

        match self.output.get_che(kind, id) {
            Some(key) => Ok(key),
            None => {
                error!("channel element {} {} is not allocated", kind, id);
                decode_error("aac: channel element not allocated")
            }
        }
    }

    /// Decode one channel element into the element at `key`.
    fn decode_channel_element(
        &mut self,
        bs: &mut BitReaderLtr<'_>,
        key: ElementKey,
        id: usize,
        params: &IcsParams,
    ) -> Result<()> {
        let elem = match self.output.elements.get_mut(key) {
            Some(elem) => elem,
            None => return decode_error("aac: channel element not allocated"),
        };

        if elem.frame_len() != params.frame_len {
            return decode_error("aac: channel element frame length mismatch");
        }

        elem.tag = id;
        elem.present = true;

        for ics in elem.ch.iter_mut() {
            ics.gain_control = false;
        }

        let res = match elem.kind {
            ElementType::Sce | ElementType::Lfe => {
                elem.ch[0].decode(bs, params, &mut self.noise, false, false)
            }
            ElementType::Cpe => decode_cpe(elem, bs, params, &mut self.noise),
            ElementType::Cce => decode_cce(elem, bs, params, &mut self.noise),
        };

        if elem.ch.iter().any(|ics| ics.gain_control) && !self.warned_gain_control {
            warn!("gain control is not supported, decoding without it");
            self.warned_gain_control = true;
        }

        res
    }

    /// Decode a raw data block of a general audio object type.
    fn decode_ga(&mut self, bs: &mut BitReaderLtr<'_>, is_adts: bool) -> Result<()> {
        if is_adts {
            self.read_adts_header(bs)?;

            if self.output.current.info.sf_index > 12 {
                return decode_error("aac: invalid sampling rate index");
            }
        }

        self.output.begin_block();

        let mut seen = [[false; MAX_ELEM_ID]; 4];
        let mut prev: Option<ElementKey> = None;
        let mut frames = 0;
        let mut sce_count = 0;
        let mut audio_found = false;
        let mut pce_found = false;

        loop {
            let elem_type = bs.read_bits_leq32(3)?;

            if elem_type == ID_END {
                break;
            }

            let id = bs.read_bits_leq32(4)? as usize;

            trace!("element type {} id {}", elem_type, id);

            if self.output.channels().is_empty() && elem_type != ID_PCE {
                error!("no channel configuration for element type {}", elem_type);
                return decode_error("aac: no channel configuration");
            }

            if let Some(kind) = ElementType::from_syntax(elem_type) {
                let key = self.channel_element(kind, id, &mut seen)?;

                let params = self.ics_params()?;
                frames = params.frame_len;

                self.decode_channel_element(bs, key, id, &params)?;

                if kind == ElementType::Sce {
                    sce_count += 1;
                }

                if kind != ElementType::Cce {
                    audio_found = true;
                }

                prev = Some(key);
            }
            else {
                match elem_type {
                    ID_DSE => skip_data_stream(bs)?,
                    ID_PCE => self.decode_pce(bs, &mut pce_found)?,
                    ID_FIL => self.decode_fill(bs, id, prev)?,
                    _ => return decode_error("aac: invalid element type"),
                }
            }

            if bs.bits_left() < 3 {
                error!("block overread, {} bits left", bs.bits_left());
                return decode_error("aac: input exhausted before end element");
            }
        }

        if self.output.channels().is_empty() {
            return Ok(());
        }

        let info = self.output.current.info;
        let upsampled = self.output.is_upsampled();

        frames <<= usize::from(upsampled);

        self.assembler.spectral_to_sample(
            &mut self.output.elements,
            info.object_type,
            info.sbr == Presence::Present,
            frames,
        )?;

        if self.output.status() != OutputStatus::None && audio_found {
            self.output.lock();
        }

        let sample_rate = info.sample_rate << u32::from(upsampled);

        self.assembler.assemble(&mut self.output, frames, sample_rate, sce_count);

        Ok(())
    }

    /// Decode a raw data block of an error resilient object type. The elements are given by the
    /// channel configuration rather than coded.
    fn decode_er(&mut self, bs: &mut BitReaderLtr<'_>) -> Result<()> {
        let info = self.output.current.info;

        let chan_config = info.chan_config;

        if !matches!(chan_config, 1..=7 | 11..=12) {
            warn!("unsupported channel configuration {} for {}", chan_config, info.object_type);
            return decode_error("aac: invalid channel configuration for error resilient stream");
        }

        self.output.begin_block();

        let map = self.output.set_default_config(chan_config)?;
        let params = self.ics_params()?;

        let mut sce_count = 0;

        for entry in map {
            let key = match self.output.get_che(entry.kind, entry.id) {
                Some(key) => key,
                None => {
                    error!("channel element {} {} is not allocated", entry.kind, entry.id);
                    return decode_error("aac: channel element not allocated");
                }
            };

            if info.object_type != M4AType::ER_AAC_ELD {
                // Element instance tag.
                bs.ignore_bits(4)?;
            }

            self.decode_channel_element(bs, key, entry.id, &params)?;

            if entry.kind == ElementType::Sce {
                sce_count += 1;
            }
        }

        let frames = params.frame_len;

        self.assembler.spectral_to_sample(
            &mut self.output.elements,
            info.object_type,
            info.sbr == Presence::Present,
            frames,
        )?;

        self.assembler.assemble(&mut self.output, frames, info.sample_rate, sce_count);

        Ok(())
    }

    fn decode_pce(&mut self, bs: &mut BitReaderLtr<'_>, pce_found: &mut bool) -> Result<()> {
        let sf_index = self.output.current.info.sf_index;

        if self.output.status() == OutputStatus::Locked {
            ProgramConfig::read(bs, sf_index)?;
            warn!("ignoring a program config element after the configuration was locked");
            return Ok(());
        }

        if *pce_found {
            ProgramConfig::read(bs, sf_index)?;
            error!("ignoring a further program config element in the same block");
            return Ok(());
        }

        self.output.push();

        let pce = ProgramConfig::read(bs, sf_index)?;

        self.output.configure_output(&pce.layout_map, OutputStatus::TrialPce, true)?;
        self.output.current.info.chan_config = 0;

        *pce_found = true;

        Ok(())
    }

    fn decode_fill(
        &mut self,
        bs: &mut BitReaderLtr<'_>,
        id: usize,
        prev: Option<ElementKey>,
    ) -> Result<()> {
        let mut count = read_fill_count(bs, id)?;

        ensure_bits(bs, 8 * count as u64)?;

        let end = bs.bits_left() - 8 * count as u64;

        while count > 0 {
            match self.decode_extension_payload(bs, count, prev) {
                Ok(n) => count = count.saturating_sub(n.max(1)),
                Err(err) => {
                    error!("extension payload: {}", err);
                    break;
                }
            }
        }

        let left = bs.bits_left();

        if left < end {
            error!("fill element overread by {} bits", end - left);
            return decode_error("aac: fill element overread");
        }

        bs.ignore_bits((left - end) as u32)?;

        Ok(())
    }

    /// Decode one extension payload of at most `count` bytes. Returns the number of bytes used.
    fn decode_extension_payload(
        &mut self,
        bs: &mut BitReaderLtr<'_>,
        count: usize,
        prev: Option<ElementKey>,
    ) -> Result<usize> {
        let ext_type = bs.read_bits_leq32(4)?;
        let rest = (8 * count - 4) as u32;

        match ext_type {
            EXT_SBR_DATA | EXT_SBR_DATA_CRC => {
                self.decode_sbr_payload(bs, count, rest, ext_type == EXT_SBR_DATA_CRC, prev)?;
                Ok(count)
            }
            EXT_DYNAMIC_RANGE => self.drc.read(bs),
            EXT_FILL => {
                if let Some((major, minor)) = read_fill_data(bs, rest)? {
                    info!("libfaac {}.{} stream, 1024 samples of encoder delay", major, minor);
                    self.skip_samples = 1024;
                }
                Ok(count)
            }
            _ => {
                bs.ignore_bits(rest)?;
                Ok(count)
            }
        }
    }

    fn decode_sbr_payload(
        &mut self,
        bs: &mut BitReaderLtr<'_>,
        count: usize,
        rest: u32,
        crc: bool,
        prev: Option<ElementKey>,
    ) -> Result<()> {
        let key = match prev {
            Some(key) => key,
            None => {
                error!("sbr payload without a preceding channel element");
                return Ok(());
            }
        };

        let info = self.output.current.info;
        let status = self.output.status();

        if info.frame_length_short {
            if !self.warned_short_sbr {
                warn!("sbr with 960 sample frames is not supported");
                self.warned_short_sbr = true;
            }
            bs.ignore_bits(rest)?;
            return Ok(());
        }

        if info.sbr == Presence::Absent {
            error!("sbr payload in a stream signalled without sbr");
            bs.ignore_bits(rest)?;
            return Ok(());
        }

        if info.sbr == Presence::Unknown && status == OutputStatus::Locked {
            error!("implicit sbr found after the configuration was locked");
            bs.ignore_bits(rest)?;
            return Ok(());
        }

        if !self.output.elements.get(key).is_some_and(|elem| elem.extension.is_some()) {
            if !self.warned_no_extension {
                debug!("no bandwidth extension decoder, skipping sbr payloads");
                self.warned_no_extension = true;
            }
            bs.ignore_bits(rest)?;
            return Ok(());
        }

        let start = bs.bits_left();

        if info.ps == Presence::Unknown
            && status < OutputStatus::Locked
            && self.output.channels().len() == 1
        {
            self.output.current.info.sbr = Presence::Present;
            self.output.current.info.ps = Presence::Present;

            let map = self.output.current.layout_map.clone();
            self.output.configure_output(&map, status, true)?;
        }
        else {
            self.output.current.info.sbr = Presence::Present;
        }

        let elem = match self.output.elements.get_mut(key) {
            Some(elem) => elem,
            None => return decode_error("aac: channel element not allocated"),
        };

        if let Some(ext) = elem.extension.as_mut() {
            ext.decode_extension(bs, elem.kind, crc, count)?;
        }

        let used = start - bs.bits_left();

        if used > u64::from(rest) {
            return decode_error("aac: sbr payload overread");
        }

        bs.ignore_bits(rest - used as u32)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aac::extension::BandwidthExtension;

    /// Writes bits MSB first.
    #[derive(Default)]
    struct BitWriter {
        buf: Vec<u8>,
        len: usize,
    }

    impl BitWriter {
        fn put(&mut self, value: u32, bits: u32) -> &mut Self {
            for i in (0..bits).rev() {
                if self.len % 8 == 0 {
                    self.buf.push(0);
                }
                if value & (1 << i) != 0 {
                    self.buf[self.len / 8] |= 0x80 >> (self.len % 8);
                }
                self.len += 1;
            }
            self
        }

        fn finish(&mut self) -> Vec<u8> {
            // END, then padding so the block does not end within 3 bits of the last element.
            self.put(ID_END, 3);
            let mut buf = std::mem::take(&mut self.buf);
            buf.push(0);
            buf
        }
    }

    /// A silent long window ICS with no scalefactor bands.
    fn silent_ics(bw: &mut BitWriter) {
        // global_gain
        bw.put(100, 8);
        // ics_reserved_bit, window_sequence, window_shape, max_sfb, predictor_data_present
        bw.put(0, 1).put(0, 2).put(0, 1).put(0, 6).put(0, 1);
        // pulse_data_present, tns_data_present, gain_control_data_present
        bw.put(0, 1).put(0, 1).put(0, 1);
    }

    fn opts() -> AacDecoderOptions {
        AacDecoderOptions::default()
    }

    fn mono_block() -> Vec<u8> {
        let mut bw = BitWriter::default();
        bw.put(0, 3).put(0, 4);
        silent_ics(&mut bw);
        bw.finish()
    }

    #[test]
    fn verify_count_channels() {
        let map = [
            LayoutEntry::new(ElementType::Sce, 0, ChannelPosition::Front),
            LayoutEntry::new(ElementType::Cpe, 0, ChannelPosition::Front),
            LayoutEntry::new(ElementType::Cce, 0, ChannelPosition::Cc),
            LayoutEntry::new(ElementType::Lfe, 0, ChannelPosition::Lfe),
            LayoutEntry::new(ElementType::Cpe, 1, ChannelPosition::Off),
        ];
        assert_eq!(count_channels(&map), 4);
    }

    #[test]
    fn verify_mono_block() {
        // LC, 48 kHz, mono.
        let mut dec = BlockDecoder::<f32>::from_audio_specific_config(&[0x11, 0x88], &opts())
            .unwrap();

        assert_eq!(dec.info().ps, Presence::Unknown);

        let frame = dec.decode(&mono_block()).unwrap();

        assert_eq!(frame.frames(), 1024);
        assert_eq!(frame.sample_rate(), 48000);
        assert!(frame.is_key_frame());
        assert!(frame.planes().all(|plane| plane.iter().all(|&x| x == 0.0)));
        assert_eq!(dec.output().status(), OutputStatus::Locked);
    }

    #[test]
    fn verify_empty_block() {
        let mut dec = BlockDecoder::<f32>::from_stream_params(44100, 2, &opts()).unwrap();

        // END only.
        let frame = dec.decode(&[0xe0, 0x00]).unwrap();
        assert_eq!(frame.frames(), 0);
        assert!(!frame.is_key_frame());
    }

    #[test]
    fn verify_no_configuration() {
        let mut dec = BlockDecoder::<f32>::new(StreamInfo::new(44100), &opts());
        assert!(dec.decode(&mono_block()).is_err());
    }

    #[test]
    fn verify_unallocated_element() {
        let mut dec = BlockDecoder::<f32>::from_stream_params(48000, 1, &opts()).unwrap();

        // LFE in a mono configuration.
        let mut bw = BitWriter::default();
        bw.put(3, 3).put(0, 4);
        silent_ics(&mut bw);

        assert!(dec.decode(&bw.finish()).is_err());
    }

    #[test]
    fn verify_truncated_block() {
        let mut dec = BlockDecoder::<f32>::from_stream_params(48000, 1, &opts()).unwrap();
        let block = mono_block();
        assert!(dec.decode(&block[..2]).is_err());

        // The decoder recovers on the next block.
        assert_eq!(dec.decode(&block).unwrap().frames(), 1024);
    }

    #[test]
    fn verify_duplicate_element() {
        let mut bw = BitWriter::default();
        bw.put(0, 3).put(0, 4);
        silent_ics(&mut bw);
        bw.put(0, 3).put(0, 4);
        silent_ics(&mut bw);
        let block = bw.finish();

        // Elements of a program configuration are mapped by tag.
        let map = [LayoutEntry::new(ElementType::Sce, 0, ChannelPosition::Front)];

        let mut dec = BlockDecoder::<f32>::new(StreamInfo::new(48000), &opts());
        dec.output_mut().configure_output(&map, OutputStatus::GlobalHeader, false).unwrap();
        assert!(dec.decode(&block).is_ok());

        let strict = AacDecoderOptions { strict: true, ..Default::default() };
        let mut dec = BlockDecoder::<f32>::new(StreamInfo::new(48000), &strict);
        dec.output_mut().configure_output(&map, OutputStatus::GlobalHeader, false).unwrap();
        assert!(dec.decode(&block).is_err());
    }

    #[test]
    fn verify_fill_and_data_stream() {
        let mut bw = BitWriter::default();
        bw.put(0, 3).put(0, 4);
        silent_ics(&mut bw);

        // DSE with 2 bytes, not aligned.
        bw.put(ID_DSE, 3).put(0, 4).put(0, 1).put(2, 8).put(0xabcd, 16);

        // FIL with 3 bytes: an unknown extension type.
        bw.put(ID_FIL, 3).put(3, 4).put(0x2, 4).put(0xfffff, 20);

        let mut dec = BlockDecoder::<f32>::from_stream_params(48000, 1, &opts()).unwrap();
        assert_eq!(dec.decode(&bw.finish()).unwrap().frames(), 1024);
    }

    #[test]
    fn verify_sbr_without_extension() {
        let mut bw = BitWriter::default();
        bw.put(0, 3).put(0, 4);
        silent_ics(&mut bw);

        // FIL with 2 bytes of SBR data.
        bw.put(ID_FIL, 3).put(2, 4).put(EXT_SBR_DATA, 4).put(0xfff, 12);

        let mut dec = BlockDecoder::<f32>::from_stream_params(48000, 1, &opts()).unwrap();
        let frame = dec.decode(&bw.finish()).unwrap();

        assert_eq!(frame.frames(), 1024);
        assert_eq!(dec.info().sbr, Presence::Unknown);
    }

    /// Copies the core output of the left channel into the right channel.
    struct StereoCopy;

    impl BandwidthExtension<f32> for StereoCopy {
        fn decode_extension(
            &mut self,
            _: &mut BitReaderLtr<'_>,
            _: ElementType,
            _: bool,
            _: usize,
        ) -> Result<()> {
            Ok(())
        }

        fn apply(
            &mut self,
            _: ElementType,
            left: &mut [f32],
            right: Option<&mut [f32]>,
        ) -> Result<()> {
            if let Some(right) = right {
                right.copy_from_slice(left);
            }
            Ok(())
        }
    }

    struct StereoCopyFactory;

    impl ExtensionFactory<f32> for StereoCopyFactory {
        fn alloc_init(&self, _: ElementType) -> Result<Box<dyn BandwidthExtension<f32>>> {
            Ok(Box::new(StereoCopy))
        }
    }

    #[test]
    fn verify_explicit_sbr_without_extension() {
        // SBR, 24 kHz, mono, 48 kHz extension, AAC LC core.
        let asc = [0x2b, 0x09, 0x88, 0x00];

        let mut dec = BlockDecoder::<f32>::from_audio_specific_config(&asc, &opts()).unwrap();
        assert_eq!(dec.info().sbr, Presence::Present);
        assert_eq!(dec.info().ps, Presence::Unknown);

        // The core frame is output at the core rate.
        let frame = dec.decode(&mono_block()).unwrap();
        assert_eq!(frame.frames(), 1024);
        assert_eq!(frame.sample_rate(), 24000);
        assert_eq!(frame.channels(), 1);
    }

    #[test]
    fn verify_explicit_sbr_with_extension() {
        let asc = [0x2b, 0x09, 0x88, 0x00];

        let mut dec = BlockDecoder::<f32>::from_audio_specific_config(&asc, &opts()).unwrap();
        dec.set_extension(Box::new(StereoCopyFactory)).unwrap();

        assert_eq!(dec.info().ps, Presence::Present);
        assert_eq!(dec.output().channels().len(), 2);

        let frame = dec.decode(&mono_block()).unwrap();
        assert_eq!(frame.frames(), 2048);
        assert_eq!(frame.sample_rate(), 48000);
        assert_eq!(frame.channels(), 2);
    }

    #[test]
    fn verify_gain_control_skipped() {
        let mut bw = BitWriter::default();
        bw.put(0, 3).put(0, 4);
        bw.put(100, 8);
        bw.put(0, 1).put(0, 2).put(0, 1).put(0, 6).put(0, 1);
        // No pulses or TNS, then gain control data with no bands.
        bw.put(0, 1).put(0, 1).put(1, 1).put(0, 2);
        let block = bw.finish();

        let mut dec = BlockDecoder::<f32>::from_stream_params(48000, 1, &opts()).unwrap();
        assert_eq!(dec.decode(&block).unwrap().frames(), 1024);
        assert!(dec.warned_gain_control);

        // The following block decodes as well.
        assert_eq!(dec.decode(&mono_block()).unwrap().frames(), 1024);
    }

    #[test]
    fn verify_er_block() {
        let mut info = StreamInfo::new(48000);
        info.object_type = M4AType::ER_AAC_LC;
        info.chan_config = 1;

        let mut dec = BlockDecoder::<f32>::new(info, &opts());
        let map = dec.output_mut().set_default_config(1).unwrap();
        dec.output_mut().configure_output(&map, OutputStatus::GlobalHeader, false).unwrap();

        // Element instance tag, then the channel stream. No element type or end element.
        let mut bw = BitWriter::default();
        bw.put(0, 4);
        silent_ics(&mut bw);

        let frame = dec.decode(&bw.buf).unwrap();
        assert_eq!(frame.channels(), 1);
        assert_eq!(frame.frames(), 1024);

        // Configuration 0 has no implied elements.
        let mut info = StreamInfo::new(48000);
        info.object_type = M4AType::ER_AAC_LC;
        let mut dec = BlockDecoder::<f32>::new(info, &opts());
        assert!(dec.decode(&bw.buf).is_err());
    }

    #[test]
    fn verify_adts_block() {
        // LC, 48 kHz, mono, no CRC.
        let mut bw = BitWriter::default();
        bw.put(0xfff, 12).put(0, 1).put(0, 2).put(1, 1);
        bw.put(1, 2).put(3, 4).put(0, 1).put(1, 3).put(0, 4);
        bw.put(20, 13).put(0x7ff, 11).put(0, 2);

        bw.put(0, 3).put(0, 4);
        silent_ics(&mut bw);

        let mut dec = BlockDecoder::<f32>::new(StreamInfo::new(44100), &opts());
        let frame = dec.decode(&bw.finish()).unwrap();

        assert_eq!(frame.frames(), 1024);
        assert_eq!(frame.sample_rate(), 48000);
        assert_eq!(frame.channels(), 1);
        assert_eq!(dec.output().status(), OutputStatus::Locked);
    }

    #[test]
    fn verify_program_config_block() {
        let mut bw = BitWriter::default();

        // PCE: tag 0, LC, 48 kHz, one front SCE.
        bw.put(ID_PCE, 3).put(0, 4);
        bw.put(1, 2).put(3, 4);
        bw.put(1, 4).put(0, 4).put(0, 4).put(0, 2).put(0, 3).put(0, 4);
        bw.put(0, 1).put(0, 1).put(0, 1);
        bw.put(0, 1).put(0, 4);

        // Byte align, then an empty comment.
        let pad = (8 - bw.len % 8) % 8;
        bw.put(0, pad as u32).put(0, 8);

        bw.put(0, 3).put(0, 4);
        silent_ics(&mut bw);

        let mut dec = BlockDecoder::<f32>::new(StreamInfo::new(48000), &opts());
        let frame = dec.decode(&bw.finish()).unwrap();

        assert_eq!(frame.channels(), 1);
        assert_eq!(frame.frames(), 1024);
        assert_eq!(dec.info().chan_config, 0);
        assert_eq!(dec.output().status(), OutputStatus::Locked);
    }
}
