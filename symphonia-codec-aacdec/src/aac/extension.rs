// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hooks for bandwidth extension (SBR and parametric stereo) modules.

use symphonia_core::errors::Result;
use symphonia_core::io::BitReaderLtr;

use crate::aac::element::ElementType;
use crate::sample::Sample;

/// A bandwidth extension decoder attached to one channel element.
pub trait BandwidthExtension<S: Sample>: Send + Sync {
    /// Decode an extension payload of `len` bytes. The reader is positioned after the 4-bit
    /// extension type. Bits the module does not consume are skipped by the caller.
    fn decode_extension(
        &mut self,
        bs: &mut BitReaderLtr<'_>,
        kind: ElementType,
        crc: bool,
        len: usize,
    ) -> Result<()>;

    /// Extend the time-domain output of the element in place. Each buffer holds twice the core
    /// frame length, of which the first half is the core decoder output.
    fn apply(&mut self, kind: ElementType, left: &mut [S], right: Option<&mut [S]>) -> Result<()>;

    /// Release resources before the element is freed.
    fn close(&mut self) {}
}

/// Instantiates extension decoders for newly allocated channel elements.
pub trait ExtensionFactory<S: Sample>: Send + Sync {
    fn alloc_init(&self, kind: ElementType) -> Result<Box<dyn BandwidthExtension<S>>>;
}
