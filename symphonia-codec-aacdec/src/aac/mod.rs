// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::debug;

use symphonia_core::audio::{AsAudioBufferRef, AudioBuffer, AudioBufferRef, Channels};
use symphonia_core::audio::{Signal, SignalSpec};
use symphonia_core::codecs::{CodecDescriptor, CodecParameters, CODEC_TYPE_AAC};
use symphonia_core::codecs::{Decoder, DecoderOptions, FinalizeResult};
use symphonia_core::errors::{unsupported_error, Result};
use symphonia_core::formats::Packet;
use symphonia_core::support_codec;

pub mod block;
pub mod cce;
mod codebooks;
pub mod common;
mod cpe;
pub mod dsp;
pub mod element;
pub mod extension;
pub mod fill;
pub mod frame;
pub mod ics;
pub mod info;
pub mod output;
pub mod pce;

use crate::common::{ChannelLayout, ChannelPositions};
use block::BlockDecoder;
use common::validate;
use frame::DualMonoMode;
use output::ChannelOrder;

/// The largest number of samples per channel in a frame, reached by a 1024 sample frame with
/// spectral band replication.
const MAX_FRAMES_PER_PACKET: usize = 2048;

/// The number of channel positions Symphonia can express.
const MAX_SYMPHONIA_CHANNELS: usize = 26;

/// Options for the AAC decoder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AacDecoderOptions {
    /// Reject streams with minor deviations from the standard instead of concealing them.
    pub strict: bool,
    pub channel_order: ChannelOrder,
    pub dual_mono: DualMonoMode,
}

/// Map a resolved layout to Symphonia channels. Layouts with positions Symphonia can't express
/// are output as the first `count` channels.
fn map_to_channels(layout: ChannelLayout, count: usize) -> Result<Channels> {
    if let Some(positions) = layout.positions() {
        // Positions up to the top back right share their bit with Symphonia.
        let shared = ChannelPositions::from_bits_truncate((1 << 18) - 1);

        let mut channels = Channels::from_bits_truncate((positions & shared).bits() as u32);

        if positions.contains(ChannelPositions::LFE2) {
            channels |= Channels::LFE2;
        }

        if channels.count() == count {
            return Ok(channels);
        }
    }

    if count > MAX_SYMPHONIA_CHANNELS {
        return unsupported_error("aac: too many channels");
    }

    Ok(Channels::from_bits_truncate(((1u64 << count) - 1) as u32))
}

/// Advanced Audio Coding (AAC) decoder.
///
/// Implements a decoder for the AAC Main, LC, LTP and error resilient LC, LTP and LD object
/// types as defined in ISO/IEC 13818-7 and ISO/IEC 14496-3. Packets may be raw data blocks or
/// ADTS frames.
pub struct AacDecoder {
    core: BlockDecoder<f32>,
    params: CodecParameters,
    buf: AudioBuffer<f32>,
}

impl AacDecoder {
    pub fn try_new_with_options(
        params: &CodecParameters,
        opts: &AacDecoderOptions,
    ) -> Result<Self> {
        // This decoder only supports AAC.
        if params.codec != CODEC_TYPE_AAC {
            return unsupported_error("aac: invalid codec");
        }

        // If extra data present, parse the audio specific config. Otherwise, assume the stream
        // carries ADTS headers or in-band program config elements.
        let core = if let Some(extra_data_buf) = &params.extra_data {
            validate!(extra_data_buf.len() >= 2);
            BlockDecoder::from_audio_specific_config(extra_data_buf, opts)?
        }
        else {
            let sample_rate = match params.sample_rate {
                Some(rate) => rate,
                None => return unsupported_error("aac: sample rate is required"),
            };

            let channels = if let Some(channels) = &params.channels {
                channels.count()
            }
            else {
                return unsupported_error("aac: channels or channel layout is required");
            };

            BlockDecoder::from_stream_params(sample_rate, channels, opts)?
        };

        let info = *core.info();
        let output = core.output();

        let channels = map_to_channels(output.layout(), output.channels().len())?;

        debug!(
            "{}, {} Hz, {} channels, {} samples per frame",
            info.object_type,
            info.sample_rate,
            output.channels().len(),
            info.frame_len()
        );

        // Clone and amend the codec parameters with information from the extra data.
        let mut params = params.clone();

        params
            .with_sample_rate(info.sample_rate)
            .with_max_frames_per_packet(MAX_FRAMES_PER_PACKET as u64);

        if !channels.is_empty() {
            params.with_channels(channels);
        }

        let spec = SignalSpec::new(info.sample_rate, channels);
        let buf = AudioBuffer::new(MAX_FRAMES_PER_PACKET as u64, spec);

        Ok(AacDecoder { core, params, buf })
    }

    /// The underlying raw data block decoder.
    pub fn block_decoder(&self) -> &BlockDecoder<f32> {
        &self.core
    }

    /// The underlying raw data block decoder. Use it to install a bandwidth extension or
    /// transform.
    pub fn block_decoder_mut(&mut self) -> &mut BlockDecoder<f32> {
        &mut self.core
    }

    fn decode_inner(&mut self, packet: &Packet) -> Result<()> {
        // Clear the audio output buffer.
        self.buf.clear();

        let frame = self.core.decode(packet.buf())?;

        if frame.frames() == 0 {
            return Ok(());
        }

        let channels = map_to_channels(frame.layout(), frame.channels())?;
        let spec = SignalSpec::new(frame.sample_rate(), channels);

        if *self.buf.spec() != spec || self.buf.capacity() < frame.frames() {
            debug!("output changed to {} Hz, {} channels", spec.rate, spec.channels.count());

            let duration = frame.frames().max(MAX_FRAMES_PER_PACKET);

            self.buf = AudioBuffer::new(duration as u64, spec);
            self.params.with_sample_rate(spec.rate).with_channels(spec.channels);
        }

        self.buf.render_reserved(Some(frame.frames()));

        for (ch, plane) in frame.planes().enumerate() {
            self.buf.chan_mut(ch).copy_from_slice(plane);
        }

        Ok(())
    }
}

impl Decoder for AacDecoder {
    fn try_new(params: &CodecParameters, _opts: &DecoderOptions) -> Result<Self> {
        AacDecoder::try_new_with_options(params, &AacDecoderOptions::default())
    }

    fn supported_codecs() -> &'static [CodecDescriptor] {
        &[support_codec!(CODEC_TYPE_AAC, "aac", "Advanced Audio Coding")]
    }

    fn reset(&mut self) {
        self.core.reset();
    }

    fn codec_params(&self) -> &CodecParameters {
        &self.params
    }

    fn decode(&mut self, packet: &Packet) -> Result<AudioBufferRef<'_>> {
        if let Err(e) = self.decode_inner(packet) {
            self.buf.clear();
            Err(e)
        }
        else {
            Ok(self.buf.as_audio_buffer_ref())
        }
    }

    fn finalize(&mut self) -> FinalizeResult {
        Default::default()
    }

    fn last_decoded(&self) -> AudioBufferRef<'_> {
        self.buf.as_audio_buffer_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_map_to_channels() {
        let stereo = ChannelPositions::FRONT_LEFT | ChannelPositions::FRONT_RIGHT;
        let channels = map_to_channels(ChannelLayout::Positions(stereo), 2).unwrap();
        assert_eq!(channels, Channels::FRONT_LEFT | Channels::FRONT_RIGHT);

        let positions = ChannelPositions::FRONT_CENTRE | ChannelPositions::LFE2;
        let channels = map_to_channels(ChannelLayout::Positions(positions), 2).unwrap();
        assert_eq!(channels, Channels::FRONT_CENTRE | Channels::LFE2);

        // Top side positions have no equivalent.
        let positions = ChannelPositions::TOP_SIDE_LEFT | ChannelPositions::TOP_SIDE_RIGHT;
        let channels = map_to_channels(ChannelLayout::Positions(positions), 2).unwrap();
        assert_eq!(channels.count(), 2);

        let channels = map_to_channels(ChannelLayout::Unspecified(3), 3).unwrap();
        assert_eq!(channels.count(), 3);

        assert!(map_to_channels(ChannelLayout::Unspecified(27), 27).is_err());
    }

    #[test]
    fn verify_try_new() {
        // LC, 44.1 kHz, stereo.
        let mut params = CodecParameters::new();
        params.for_codec(CODEC_TYPE_AAC).with_extra_data(Box::new([0x12, 0x10]));

        let dec = AacDecoder::try_new(&params, &Default::default()).unwrap();

        assert_eq!(dec.codec_params().sample_rate, Some(44100));
        let stereo = Channels::FRONT_LEFT | Channels::FRONT_RIGHT;
        assert_eq!(dec.codec_params().channels, Some(stereo));

        // Without extra data the sample rate and channels are required.
        let mut params = CodecParameters::new();
        params.for_codec(CODEC_TYPE_AAC).with_sample_rate(48000);
        assert!(AacDecoder::try_new(&params, &Default::default()).is_err());

        let mut params = CodecParameters::new();
        params.for_codec(CODEC_TYPE_AAC).with_extra_data(Box::new([0x12]));
        assert!(AacDecoder::try_new(&params, &Default::default()).is_err());
    }

    #[test]
    fn verify_decode_empty_block() {
        let mut params = CodecParameters::new();
        params
            .for_codec(CODEC_TYPE_AAC)
            .with_sample_rate(48000)
            .with_channels(Channels::FRONT_LEFT | Channels::FRONT_RIGHT);

        let mut dec = AacDecoder::try_new(&params, &Default::default()).unwrap();

        let packet = Packet::new_from_slice(0, 0, 0, &[0xe0, 0x00]);
        let buf = dec.decode(&packet).unwrap();
        assert_eq!(buf.frames(), 0);
    }
}
