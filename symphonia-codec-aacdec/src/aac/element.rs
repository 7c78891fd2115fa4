// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Channel elements and their storage.

use std::fmt;

use symphonia_core::errors::Result;

use crate::aac::cce::Coupling;
use crate::aac::common::{MAX_ELEM_ID, MAX_SFBS, MAX_WINDOWS};
use crate::aac::extension::{BandwidthExtension, ExtensionFactory};
use crate::aac::ics::Ics;
use crate::sample::Sample;

/// The type of a channel element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Single channel element.
    Sce = 0,
    /// Channel pair element.
    Cpe = 1,
    /// Coupling channel element.
    Cce = 2,
    /// Low frequency effects element.
    Lfe = 3,
}

impl ElementType {
    pub const ALL: [ElementType; 4] =
        [ElementType::Sce, ElementType::Cpe, ElementType::Cce, ElementType::Lfe];

    /// Get the element type of a syntactic element id, if it is a channel element.
    pub fn from_syntax(id: u32) -> Option<ElementType> {
        match id {
            0 => Some(ElementType::Sce),
            1 => Some(ElementType::Cpe),
            2 => Some(ElementType::Cce),
            3 => Some(ElementType::Lfe),
            _ => None,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::Sce => "SCE",
            ElementType::Cpe => "CPE",
            ElementType::Cce => "CCE",
            ElementType::Lfe => "LFE",
        };
        f.write_str(name)
    }
}

/// The storage key of a channel element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ElementKey {
    pub kind: ElementType,
    pub id: usize,
}

impl ElementKey {
    pub fn new(kind: ElementType, id: usize) -> Self {
        ElementKey { kind, id }
    }

    fn index(self) -> usize {
        self.kind as usize * MAX_ELEM_ID + self.id
    }
}

/// A single channel, channel pair, coupling channel or LFE element.
pub struct ChannelElement<S: Sample> {
    pub kind: ElementType,
    /// The coded element id of the most recently decoded instance.
    pub tag: usize,
    /// Set when the element was decoded in the current block.
    pub present: bool,
    pub ch: [Ics<S>; 2],
    pub common_window: bool,
    pub ms_mask: [[bool; MAX_SFBS]; MAX_WINDOWS],
    pub ms_present: u8,
    pub coupling: Coupling<S>,
    pub extension: Option<Box<dyn BandwidthExtension<S>>>,
}

impl<S: Sample> ChannelElement<S> {
    pub fn new(kind: ElementType, frame_len: usize) -> Self {
        ChannelElement {
            kind,
            tag: 0,
            present: false,
            ch: [Ics::new(frame_len), Ics::new(frame_len)],
            common_window: false,
            ms_mask: [[false; MAX_SFBS]; MAX_WINDOWS],
            ms_present: 0,
            coupling: Coupling::new(),
            extension: None,
        }
    }

    pub fn frame_len(&self) -> usize {
        self.ch[0].frame_len()
    }

    /// Clear all inter-frame state.
    pub fn reset(&mut self) {
        self.present = false;
        self.ch[0].reset();
        self.ch[1].reset();
    }
}

impl<S: Sample> Drop for ChannelElement<S> {
    fn drop(&mut self) {
        if let Some(ext) = self.extension.as_mut() {
            ext.close();
        }
    }
}

/// Storage for all channel elements, keyed by element type and id.
pub struct ElementArena<S: Sample> {
    slots: Vec<Option<Box<ChannelElement<S>>>>,
    allocations: usize,
}

impl<S: Sample> ElementArena<S> {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(4 * MAX_ELEM_ID);
        slots.resize_with(4 * MAX_ELEM_ID, || None);
        ElementArena { slots, allocations: 0 }
    }

    pub fn get(&self, key: ElementKey) -> Option<&ChannelElement<S>> {
        self.slots[key.index()].as_deref()
    }

    pub fn get_mut(&mut self, key: ElementKey) -> Option<&mut ChannelElement<S>> {
        self.slots[key.index()].as_deref_mut()
    }

    pub fn is_allocated(&self, key: ElementKey) -> bool {
        self.slots[key.index()].is_some()
    }

    /// Allocate the element if it does not exist, or if it was allocated for another frame
    /// length.
    pub fn alloc(
        &mut self,
        key: ElementKey,
        frame_len: usize,
        extension: Option<&dyn ExtensionFactory<S>>,
    ) -> Result<()> {
        let slot = &mut self.slots[key.index()];

        if slot.as_ref().is_some_and(|elem| elem.frame_len() == frame_len) {
            return Ok(());
        }

        let mut elem = Box::new(ChannelElement::new(key.kind, frame_len));

        if let Some(factory) = extension {
            elem.extension = Some(factory.alloc_init(key.kind)?);
        }

        *slot = Some(elem);
        self.allocations += 1;

        Ok(())
    }

    pub fn free(&mut self, key: ElementKey) {
        self.slots[key.index()] = None;
    }

    /// The total number of element allocations made.
    pub fn allocations(&self) -> usize {
        self.allocations
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ChannelElement<S>> {
        self.slots.iter_mut().filter_map(|slot| slot.as_deref_mut())
    }

    /// Get two distinct elements mutably.
    pub fn get_pair_mut(
        &mut self,
        a: ElementKey,
        b: ElementKey,
    ) -> (Option<&mut ChannelElement<S>>, Option<&mut ChannelElement<S>>) {
        let (ia, ib) = (a.index(), b.index());

        if ia == ib {
            return (self.slots[ia].as_deref_mut(), None);
        }

        if ia < ib {
            let (lo, hi) = self.slots.split_at_mut(ib);
            (lo[ia].as_deref_mut(), hi[0].as_deref_mut())
        }
        else {
            let (lo, hi) = self.slots.split_at_mut(ia);
            (hi[0].as_deref_mut(), lo[ib].as_deref_mut())
        }
    }
}

impl<S: Sample> Default for ElementArena<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_arena_alloc_free() {
        let mut arena = ElementArena::<f32>::new();
        let key = ElementKey::new(ElementType::Cpe, 3);

        assert!(arena.get(key).is_none());

        arena.alloc(key, 1024, None).unwrap();
        arena.alloc(key, 1024, None).unwrap();
        assert_eq!(arena.allocations(), 1);
        assert_eq!(arena.get(key).unwrap().kind, ElementType::Cpe);

        // A different frame length reallocates.
        arena.alloc(key, 960, None).unwrap();
        assert_eq!(arena.allocations(), 2);
        assert_eq!(arena.get(key).unwrap().frame_len(), 960);

        arena.free(key);
        assert!(!arena.is_allocated(key));
    }

    #[test]
    fn verify_arena_pair_access() {
        let mut arena = ElementArena::<f32>::new();
        let a = ElementKey::new(ElementType::Cce, 0);
        let b = ElementKey::new(ElementType::Sce, 1);
        arena.alloc(a, 1024, None).unwrap();
        arena.alloc(b, 1024, None).unwrap();

        let (ea, eb) = arena.get_pair_mut(a, b);
        assert_eq!(ea.unwrap().kind, ElementType::Cce);
        assert_eq!(eb.unwrap().kind, ElementType::Sce);
    }
}
