// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![allow(clippy::needless_range_loop)]

mod aac;
mod adts;
mod common;
mod sample;
mod window;

pub use aac::block::BlockDecoder;
pub use aac::dsp::{ImdctTransform, SpectralTransform};
pub use aac::element::ElementType;
pub use aac::extension::{BandwidthExtension, ExtensionFactory};
pub use aac::fill::DynamicRange;
pub use aac::frame::{AudioFrame, DualMonoMode};
pub use aac::ics::Ics;
pub use aac::info::{AudioSpecificConfig, Presence, StreamInfo};
pub use aac::output::{ChannelOrder, ChannelPosition, LayoutEntry, OutputStatus};
pub use aac::{AacDecoder, AacDecoderOptions};
pub use adts::AdtsHeader;
pub use common::{ChannelLayout, ChannelPositions, M4AType};
pub use sample::{Fixed, Sample};
