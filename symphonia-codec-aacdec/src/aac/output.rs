// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Output channel configuration.
//!
//! The output configuration maps the channel elements of the bitstream to output channels. A
//! configuration may be provided by a global header, by an in-band program config element, or by
//! an in-band frame header. Configurations found in-band are trials until a block decodes
//! successfully with them, at which point they are locked. A trial that fails is rolled back to
//! the previously saved configuration.

use symphonia_core::errors::{decode_error, unsupported_error, Result};

use log::{debug, info, warn};

use crate::aac::common::{MAX_CHANNELS, MAX_ELEM_ID};
use crate::aac::element::{ElementArena, ElementKey, ElementType};
use crate::aac::extension::ExtensionFactory;
use crate::aac::info::{Presence, StreamInfo};
use crate::common::{ChannelLayout, ChannelPositions};
use crate::sample::Sample;

/// The maximum number of entries in a layout map.
pub const MAX_LAYOUT_TAGS: usize = 4 * MAX_ELEM_ID;

/// The spatial category of an element in a layout map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelPosition {
    /// The element is not part of the configuration.
    Off,
    Front,
    Side,
    Back,
    Lfe,
    /// Coupling channel.
    Cc,
}

impl ChannelPosition {
    fn map_index(self) -> Option<usize> {
        match self {
            ChannelPosition::Front => Some(0),
            ChannelPosition::Side => Some(1),
            ChannelPosition::Back => Some(2),
            ChannelPosition::Lfe => Some(3),
            _ => None,
        }
    }
}

/// One element of a layout map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutEntry {
    pub kind: ElementType,
    /// The coded element id.
    pub id: usize,
    pub position: ChannelPosition,
}

impl LayoutEntry {
    pub const fn new(kind: ElementType, id: usize, position: ChannelPosition) -> Self {
        LayoutEntry { kind, id, position }
    }
}

/// The provenance and trust level of an output configuration. Later variants take precedence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum OutputStatus {
    None,
    /// Trial configuration from an in-band program config element.
    TrialPce,
    /// Trial configuration from an in-band frame header.
    TrialFrame,
    /// Configuration from a global header.
    GlobalHeader,
    /// Configuration confirmed by a successfully decoded block.
    Locked,
}

/// The order of the output channels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChannelOrder {
    /// Canonical loudspeaker order, derived from the element positions.
    #[default]
    Default,
    /// The order in which the elements are coded.
    Coded,
}

#[derive(Clone, Debug)]
pub struct OutputConfiguration {
    pub info: StreamInfo,
    /// The layout map in coded order.
    pub layout_map: Vec<LayoutEntry>,
    pub layout: ChannelLayout,
    pub status: OutputStatus,
}

impl OutputConfiguration {
    pub fn new(info: StreamInfo) -> Self {
        OutputConfiguration {
            info,
            layout_map: Vec::new(),
            layout: ChannelLayout::default(),
            status: OutputStatus::None,
        }
    }
}

/// An output channel and its source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputChannel {
    pub key: ElementKey,
    /// The channel of the element, 0 or 1.
    pub half: usize,
    /// The loudspeaker position, or empty if the layout is unspecified.
    pub position: ChannelPositions,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MapSlot {
    Pos(ChannelPositions),
    /// No channel at this slot; pairing starts at the next slot.
    Unused,
    /// The layout can't be expressed.
    Absent,
}

use MapSlot::{Absent, Pos, Unused};

/// Channel slots by layer and spatial category. Slot 0 is the centre channel, slots 1 to 4 are
/// two left/right pairs, and slot 5 is the odd channel remaining after pairing.
const CHANNEL_MAP: [[[MapSlot; 6]; 4]; 3] = [
    [
        [
            Pos(ChannelPositions::FRONT_CENTRE),
            Pos(ChannelPositions::FRONT_LEFT_CENTRE),
            Pos(ChannelPositions::FRONT_RIGHT_CENTRE),
            Pos(ChannelPositions::FRONT_LEFT),
            Pos(ChannelPositions::FRONT_RIGHT),
            Absent,
        ],
        [Unused, Absent, Absent, Absent, Absent, Absent],
        [
            Unused,
            Pos(ChannelPositions::SIDE_LEFT),
            Pos(ChannelPositions::SIDE_RIGHT),
            Pos(ChannelPositions::BACK_LEFT),
            Pos(ChannelPositions::BACK_RIGHT),
            Pos(ChannelPositions::BACK_CENTRE),
        ],
        [
            Pos(ChannelPositions::LFE1),
            Pos(ChannelPositions::LFE2),
            Absent,
            Absent,
            Absent,
            Absent,
        ],
    ],
    [
        [
            Pos(ChannelPositions::TOP_FRONT_CENTRE),
            Absent,
            Absent,
            Pos(ChannelPositions::TOP_FRONT_LEFT),
            Pos(ChannelPositions::TOP_FRONT_RIGHT),
            Absent,
        ],
        [
            Unused,
            Pos(ChannelPositions::TOP_SIDE_LEFT),
            Pos(ChannelPositions::TOP_SIDE_RIGHT),
            Absent,
            Absent,
            Pos(ChannelPositions::TOP_CENTRE),
        ],
        [
            Unused,
            Absent,
            Absent,
            Pos(ChannelPositions::TOP_BACK_LEFT),
            Pos(ChannelPositions::TOP_BACK_RIGHT),
            Pos(ChannelPositions::TOP_BACK_CENTRE),
        ],
        [Absent; 6],
    ],
    [
        [
            Pos(ChannelPositions::BOTTOM_FRONT_CENTRE),
            Absent,
            Absent,
            Pos(ChannelPositions::BOTTOM_FRONT_LEFT),
            Pos(ChannelPositions::BOTTOM_FRONT_RIGHT),
            Absent,
        ],
        [Absent; 6],
        [Absent; 6],
        [Absent; 6],
    ],
];

const LAYOUT_22_2: ChannelPositions = ChannelPositions::all();

/// The number of elements in each default channel configuration.
pub const TAGS_PER_CONFIG: [usize; 16] = [0, 1, 1, 2, 3, 3, 4, 5, 0, 0, 0, 5, 5, 16, 5, 0];

const fn sce(id: usize, position: ChannelPosition) -> LayoutEntry {
    LayoutEntry::new(ElementType::Sce, id, position)
}

const fn cpe(id: usize, position: ChannelPosition) -> LayoutEntry {
    LayoutEntry::new(ElementType::Cpe, id, position)
}

const fn lfe(id: usize) -> LayoutEntry {
    LayoutEntry::new(ElementType::Lfe, id, ChannelPosition::Lfe)
}

const F: ChannelPosition = ChannelPosition::Front;
const SD: ChannelPosition = ChannelPosition::Side;
const B: ChannelPosition = ChannelPosition::Back;

/// Layout maps of the default channel configurations, indexed by channel configuration.
const DEFAULT_LAYOUTS: [&[LayoutEntry]; 15] = [
    &[],
    &[sce(0, F)],
    &[cpe(0, F)],
    &[sce(0, F), cpe(0, F)],
    &[sce(0, F), cpe(0, F), sce(1, B)],
    &[sce(0, F), cpe(0, F), cpe(1, B)],
    &[sce(0, F), cpe(0, F), cpe(1, B), lfe(0)],
    &[sce(0, F), cpe(0, F), cpe(1, F), cpe(2, B), lfe(0)],
    &[],
    &[],
    &[],
    &[sce(0, F), cpe(0, F), cpe(1, B), sce(1, B), lfe(0)],
    &[sce(0, F), cpe(0, F), cpe(1, B), cpe(2, B), lfe(0)],
    &[
        sce(0, F),
        cpe(0, F),
        cpe(1, F),
        cpe(2, B),
        cpe(3, B),
        sce(1, B),
        lfe(0),
        lfe(1),
        sce(2, F),
        cpe(4, F),
        cpe(5, SD),
        sce(3, SD),
        cpe(6, B),
        sce(4, B),
        sce(5, F),
        cpe(7, F),
    ],
    &[sce(0, F), cpe(0, F), cpe(1, B), lfe(0), cpe(2, F)],
];

/// An element of a layout map with the loudspeaker positions of its channels.
#[derive(Clone, Copy, Debug)]
struct Assigned {
    entry: LayoutEntry,
    positions: [ChannelPositions; 2],
}

impl Assigned {
    fn single(entry: LayoutEntry, position: ChannelPositions) -> Self {
        Assigned { entry, positions: [position, ChannelPositions::empty()] }
    }

    fn mask(&self) -> ChannelPositions {
        self.positions[0] | self.positions[1]
    }
}

/// Count the channels of the run of elements at `position` starting at `current`. Returns `None`
/// if single channel elements can't be paired around the channel pair elements.
fn count_paired_channels(
    map: &[LayoutEntry],
    position: ChannelPosition,
    current: usize,
) -> Option<usize> {
    let mut num_channels = 0;
    let mut first_cpe = false;
    let mut sce_parity = false;

    for entry in map.iter().skip(current).take_while(|entry| entry.position == position) {
        if entry.kind == ElementType::Cpe {
            if sce_parity {
                if position == ChannelPosition::Front && !first_cpe {
                    sce_parity = false;
                }
                else {
                    return None;
                }
            }
            num_channels += 2;
            first_cpe = true;
        }
        else {
            num_channels += 1;
            sce_parity ^= position != ChannelPosition::Lfe;
        }
    }

    if sce_parity && position == ChannelPosition::Front && first_cpe {
        return None;
    }

    Some(num_channels)
}

fn assign_pair(
    assigned: &mut [Option<Assigned>],
    map: &[LayoutEntry],
    offset: usize,
    left: ChannelPositions,
    right: ChannelPositions,
    layout: &mut ChannelPositions,
) -> Option<usize> {
    let entry = *map.get(offset)?;

    *layout |= left | right;

    if entry.kind == ElementType::Cpe {
        assigned[offset] = Some(Assigned { entry, positions: [left, right] });
        Some(1)
    }
    else {
        let next = *map.get(offset + 1)?;
        assigned[offset] = Some(Assigned::single(entry, left));
        assigned[offset + 1] = Some(Assigned::single(next, right));
        Some(2)
    }
}

/// Assign loudspeaker positions to the run of elements at `position` starting at `current`.
/// Returns `None` if the run can't be expressed in `layer`. A run that is too long is skipped.
fn assign_channels(
    assigned: &mut [Option<Assigned>],
    map: &[LayoutEntry],
    layout: &mut ChannelPositions,
    layer: usize,
    position: ChannelPosition,
    current: &mut usize,
) -> Option<()> {
    let mut num_channels = match count_paired_channels(map, position, *current) {
        Some(count) if count <= 5 => count,
        _ => return Some(()),
    };

    let slots = &CHANNEL_MAP[layer][position.map_index()?];

    let mut i = *current;

    if position == ChannelPosition::Lfe {
        for &slot in slots.iter().take(num_channels) {
            let Pos(pos) = slot
            else {
                return None;
            };

            assigned[i] = Some(Assigned::single(*map.get(i)?, pos));
            *layout |= pos;
            i += 1;
        }

        *current = i;
        return Some(());
    }

    if num_channels % 2 == 1 {
        match slots[0] {
            Absent => return None,
            Unused => (),
            Pos(pos) => {
                assigned[i] = Some(Assigned::single(*map.get(i)?, pos));
                *layout |= pos;
                i += 1;
                num_channels -= 1;
            }
        }
    }

    let mut j = if position != ChannelPosition::Side && num_channels <= 3 { 3 } else { 1 };

    while num_channels >= 2 {
        let (Pos(left), Pos(right)) = (*slots.get(j)?, *slots.get(j + 1)?)
        else {
            return None;
        };

        i += assign_pair(assigned, map, i, left, right, layout)?;
        j += 2;
        num_channels -= 2;
    }

    if num_channels == 1 {
        let Pos(pos) = slots[5]
        else {
            return None;
        };

        assigned[i] = Some(Assigned::single(*map.get(i)?, pos));
        *layout |= pos;
        i += 1;
    }

    *current = i;
    Some(())
}

/// Reorder the layout map into canonical loudspeaker order. Returns the channel mask and the
/// positions of the reordered entries, which make up the head of the map. The map is left
/// untouched on failure.
fn sniff_channel_order(map: &mut [LayoutEntry]) -> Option<(ChannelPositions, Vec<Assigned>)> {
    if map.len() > MAX_LAYOUT_TAGS {
        return None;
    }

    let mut assigned = vec![None; map.len()];
    let mut layout = ChannelPositions::empty();

    let mut i = 0;
    let mut layer = 0;

    while layer < 3 && i < map.len() {
        for position in [
            ChannelPosition::Front,
            ChannelPosition::Side,
            ChannelPosition::Back,
            ChannelPosition::Lfe,
        ] {
            assign_channels(&mut assigned, map, &mut layout, layer, position, &mut i)?;
        }
        layer += 1;
    }

    let total = i;

    let mut assigned = assigned[..total].iter().copied().collect::<Option<Vec<_>>>()?;

    if layout == LAYOUT_22_2 && total > 12 {
        for (a, b) in [(2, 0), (2, 1), (6, 2), (4, 3), (6, 4), (7, 6), (9, 8), (11, 10), (12, 11)] {
            assigned.swap(a, b);
        }
    }
    else {
        assigned.sort_by_key(|a| a.mask().bits());
    }

    for (entry, a) in map.iter_mut().zip(&assigned) {
        *entry = a.entry;
    }

    Some((layout, assigned))
}

/// A legacy channel mapping for a stream whose elements don't follow its channel configuration.
struct RemapRule {
    configs: &'static [usize],
    matches: fn(&OutputState, ElementType, usize) -> bool,
    /// The element to map to, or `None` to map the element to itself.
    target: Option<ElementKey>,
    /// Warn once if the element was remapped to a different element.
    warn: bool,
}

/// The state a remap rule is evaluated against.
struct OutputState {
    chan_config: usize,
    tags_mapped: usize,
}

impl OutputState {
    fn is_last_tag(&self) -> bool {
        self.tags_mapped + 1 == TAGS_PER_CONFIG[self.chan_config]
    }
}

const fn key(kind: ElementType, id: usize) -> Option<ElementKey> {
    Some(ElementKey { kind, id })
}

/// The legacy remap rules in order of precedence. The first matching rule is applied.
const REMAP_RULES: &[RemapRule] = &[
    RemapRule {
        configs: &[14],
        matches: |s, kind, id| {
            s.tags_mapped > 2
                && ((kind == ElementType::Cpe && id < 3) || (kind == ElementType::Lfe && id < 1))
        },
        target: None,
        warn: false,
    },
    RemapRule {
        configs: &[14, 13],
        matches: |s, kind, id| {
            s.tags_mapped > 3
                && ((kind == ElementType::Cpe && id < 8)
                    || (kind == ElementType::Sce && id < 6)
                    || (kind == ElementType::Lfe && id < 2))
        },
        target: None,
        warn: false,
    },
    RemapRule {
        configs: &[14, 13, 12, 7],
        matches: |s, kind, _| s.tags_mapped == 3 && kind == ElementType::Cpe,
        target: key(ElementType::Cpe, 2),
        warn: false,
    },
    RemapRule {
        configs: &[14, 13, 12, 7, 11],
        matches: |s, kind, _| s.tags_mapped == 3 && kind == ElementType::Sce,
        target: key(ElementType::Sce, 1),
        warn: false,
    },
    // 5.1 coded as SCE, CPE, CPE, SCE instead of SCE, CPE, CPE, LFE.
    RemapRule {
        configs: &[14, 13, 12, 7, 11, 6],
        matches: |s, kind, _| {
            s.is_last_tag() && (kind == ElementType::Lfe || kind == ElementType::Sce)
        },
        target: key(ElementType::Lfe, 0),
        warn: true,
    },
    RemapRule {
        configs: &[14, 13, 12, 7, 11, 6, 5],
        matches: |s, kind, _| s.tags_mapped == 2 && kind == ElementType::Cpe,
        target: key(ElementType::Cpe, 1),
        warn: false,
    },
    // 4.0 coded as SCE, CPE, LFE instead of SCE, CPE, SCE.
    RemapRule {
        configs: &[14, 13, 12, 7, 11, 6, 5, 4],
        matches: |s, kind, _| {
            s.is_last_tag() && (kind == ElementType::Lfe || kind == ElementType::Sce)
        },
        target: key(ElementType::Sce, 1),
        warn: true,
    },
    RemapRule {
        configs: &[4],
        matches: |s, kind, _| s.tags_mapped == 2 && kind == ElementType::Sce,
        target: key(ElementType::Sce, 1),
        warn: false,
    },
    RemapRule {
        configs: &[14, 13, 12, 7, 11, 6, 5, 4, 3, 2],
        matches: |s, kind, _| {
            s.tags_mapped == usize::from(s.chan_config != 2) && kind == ElementType::Cpe
        },
        target: key(ElementType::Cpe, 0),
        warn: false,
    },
    RemapRule {
        configs: &[2],
        matches: |s, kind, _| s.tags_mapped == 1 && kind == ElementType::Sce,
        target: key(ElementType::Sce, 1),
        warn: false,
    },
    RemapRule {
        configs: &[14, 13, 12, 7, 11, 6, 5, 4, 3, 2, 1],
        matches: |s, kind, _| s.tags_mapped == 0 && kind == ElementType::Sce,
        target: key(ElementType::Sce, 0),
        warn: false,
    },
];

/// Tracks the current and saved output configurations, and owns the channel elements.
pub struct OutputManager<S: Sample> {
    pub current: OutputConfiguration,
    saved: Option<OutputConfiguration>,
    pub elements: ElementArena<S>,
    /// Maps a coded (type, id) to the element that decodes it.
    tag_map: [[Option<ElementKey>; MAX_ELEM_ID]; 4],
    outputs: Vec<OutputChannel>,
    order: ChannelOrder,
    strict: bool,
    extension: Option<Box<dyn ExtensionFactory<S>>>,
    /// The number of elements mapped by position in the current block.
    tags_mapped: usize,
    warned_71: bool,
    warned_remapping: bool,
    frame_request: bool,
}

impl<S: Sample> OutputManager<S> {
    pub fn new(info: StreamInfo, order: ChannelOrder, strict: bool) -> Self {
        OutputManager {
            current: OutputConfiguration::new(info),
            saved: None,
            elements: ElementArena::new(),
            tag_map: [[None; MAX_ELEM_ID]; 4],
            outputs: Vec::new(),
            order,
            strict,
            extension: None,
            tags_mapped: 0,
            warned_71: false,
            warned_remapping: false,
            frame_request: false,
        }
    }

    /// Install the factory used to attach bandwidth extension decoders to new elements.
    pub fn set_extension(&mut self, factory: Box<dyn ExtensionFactory<S>>) {
        self.extension = Some(factory);
    }

    pub fn has_extension(&self) -> bool {
        self.extension.is_some()
    }

    /// Returns true if frames are output at the extension sample rate. Without an extension
    /// decoder the core frame is output at the core rate.
    pub fn is_upsampled(&self) -> bool {
        self.has_extension() && self.current.info.is_upsampled()
    }

    /// The output channels in output order.
    pub fn channels(&self) -> &[OutputChannel] {
        &self.outputs
    }

    pub fn layout(&self) -> ChannelLayout {
        self.current.layout
    }

    pub fn status(&self) -> OutputStatus {
        self.current.status
    }

    pub fn saved(&self) -> Option<&OutputConfiguration> {
        self.saved.as_ref()
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Look up the element that decodes a coded (type, id).
    pub fn tag_lookup(&self, kind: ElementType, id: usize) -> Option<ElementKey> {
        self.tag_map[kind as usize].get(id).copied().flatten()
    }

    /// Begin a new raw data block.
    pub fn begin_block(&mut self) {
        self.tags_mapped = 0;
    }

    /// Returns true, once, if a configuration change requested new output buffers.
    pub fn take_frame_request(&mut self) -> bool {
        std::mem::take(&mut self.frame_request)
    }

    /// Clear the inter-frame state of all elements.
    pub fn reset(&mut self) {
        for elem in self.elements.iter_mut() {
            elem.reset();
        }
    }

    /// Apply a layout map with the given status.
    ///
    /// Elements are allocated for every entry with a position, and freed if no longer
    /// referenced. If `new_frame` is set, the frame assembler is asked to reallocate its output.
    pub fn configure_output(
        &mut self,
        map: &[LayoutEntry],
        status: OutputStatus,
        new_frame: bool,
    ) -> Result<()> {
        if map.len() > MAX_LAYOUT_TAGS {
            return decode_error("aac: too many elements in layout");
        }

        let mut type_counts = [0usize; 4];
        let mut id_map = [[0usize; MAX_ELEM_ID]; 4];
        let mut seen = [[false; MAX_ELEM_ID]; 4];

        for entry in map {
            if entry.id >= MAX_ELEM_ID {
                return decode_error("aac: invalid element id in layout");
            }

            let t = entry.kind as usize;

            if seen[t][entry.id] && entry.kind != ElementType::Cce {
                warn!("duplicate {} {} in layout, the last entry is used", entry.kind, entry.id);
            }

            seen[t][entry.id] = true;

            id_map[t][entry.id] = type_counts[t];
            type_counts[t] += 1;

            if id_map[t][entry.id] >= MAX_ELEM_ID {
                warn!("too many {} elements in layout", entry.kind);
                return unsupported_error("aac: too many elements of one type");
            }
        }

        self.current.layout_map = map.to_vec();

        let mut map = map.to_vec();

        let sniffed = match self.order {
            ChannelOrder::Default => sniff_channel_order(&mut map),
            ChannelOrder::Coded => None,
        };

        let (mut mask, assigned) = sniffed.unwrap_or_default();

        self.tag_map = [[None; MAX_ELEM_ID]; 4];
        self.outputs.clear();

        let frame_len = self.current.info.frame_len();
        let ps = self.has_extension() && self.current.info.ps == Presence::Present;

        let mut referenced = [[false; MAX_ELEM_ID]; 4];

        for (i, entry) in map.iter().enumerate() {
            let key = ElementKey::new(entry.kind, id_map[entry.kind as usize][entry.id]);

            let positions = match assigned.get(i) {
                Some(a) => a.positions,
                None => [ChannelPositions::empty(); 2],
            };

            self.configure_element(key, entry.position, positions, ps, frame_len)?;

            if entry.position != ChannelPosition::Off {
                referenced[key.kind as usize][key.id] = true;
                self.tag_map[entry.kind as usize][entry.id] = Some(key);
            }
        }

        for kind in ElementType::ALL {
            for id in 0..MAX_ELEM_ID {
                if !referenced[kind as usize][id] {
                    self.elements.free(ElementKey::new(kind, id));
                }
            }
        }

        // A parametric stereo mono element is output as a front stereo pair.
        if ps && self.outputs.len() == 2 {
            if mask == ChannelPositions::FRONT_CENTRE {
                mask = ChannelPositions::FRONT_LEFT | ChannelPositions::FRONT_RIGHT;
                self.outputs[0].position = ChannelPositions::FRONT_LEFT;
                self.outputs[1].position = ChannelPositions::FRONT_RIGHT;
            }
            else {
                mask = ChannelPositions::empty();
            }
        }

        let count = self.outputs.len();

        let union =
            self.outputs.iter().fold(ChannelPositions::empty(), |acc, out| acc | out.position);

        let is_complete = !mask.is_empty()
            && mask.bits().count_ones() as usize == count
            && union == mask
            && self.outputs.iter().all(|out| out.position.bits().count_ones() == 1);

        self.current.layout = if is_complete {
            ChannelLayout::Positions(mask)
        }
        else {
            for out in self.outputs.iter_mut() {
                out.position = ChannelPositions::empty();
            }
            ChannelLayout::Unspecified(count)
        };

        self.current.status = status;

        if new_frame {
            self.frame_request = true;
        }

        debug!(
            "configured output: {} channels, layout {:?}, status {:?}",
            count, self.current.layout, status
        );

        Ok(())
    }

    fn configure_element(
        &mut self,
        key: ElementKey,
        position: ChannelPosition,
        positions: [ChannelPositions; 2],
        ps: bool,
        frame_len: usize,
    ) -> Result<()> {
        if self.outputs.len() >= MAX_CHANNELS {
            return decode_error("aac: too many channels");
        }

        if position == ChannelPosition::Off {
            self.elements.free(key);
            return Ok(());
        }

        self.elements.alloc(key, frame_len, self.extension.as_deref())?;

        if key.kind != ElementType::Cce {
            let stereo = key.kind == ElementType::Cpe || (key.kind == ElementType::Sce && ps);

            if self.outputs.len() + usize::from(stereo) >= MAX_CHANNELS {
                return decode_error("aac: too many channels");
            }

            self.outputs.push(OutputChannel { key, half: 0, position: positions[0] });

            if stereo {
                self.outputs.push(OutputChannel { key, half: 1, position: positions[1] });
            }
        }

        Ok(())
    }

    /// Save the current configuration before a trial configuration is applied. Returns true if
    /// the configuration was saved. The current status is reset to none.
    pub fn push(&mut self) -> bool {
        let pushed = self.current.status == OutputStatus::Locked || self.saved.is_none();

        if pushed {
            self.saved =
                Some(self.current.clone()).filter(|saved| saved.status != OutputStatus::None);
        }

        self.current.status = OutputStatus::None;

        pushed
    }

    /// Restore the saved configuration if the current configuration was never locked.
    pub fn pop(&mut self) {
        if self.current.status == OutputStatus::Locked {
            return;
        }

        if let Some(saved) = self.saved.clone() {
            self.current = saved.clone();

            if let Err(err) = self.configure_output(&saved.layout_map, saved.status, false) {
                warn!("failed to restore output configuration: {}", err);
            }
        }
    }

    /// Mark the current configuration as confirmed.
    pub fn lock(&mut self) {
        self.current.status = OutputStatus::Locked;
    }

    /// Get the layout map of a default channel configuration.
    pub fn set_default_config(&mut self, chan_config: usize) -> Result<Vec<LayoutEntry>> {
        if !matches!(chan_config, 1..=7 | 11..=14) {
            warn!("invalid default channel configuration ({})", chan_config);
            return decode_error("aac: invalid default channel configuration");
        }

        let mut map = DEFAULT_LAYOUTS[chan_config].to_vec();

        // Most 7.1 streams signal configuration 7 with side channels coded as the second front
        // pair.
        if chan_config == 7 && !self.strict {
            map[2].position = ChannelPosition::Back;

            if !self.warned_71 {
                info!(
                    "assuming an incorrectly encoded 7.1 channel layout instead of a \
                     a standard 7.1(wide) layout"
                );
                self.warned_71 = true;
            }
        }

        Ok(map)
    }

    /// Get the element that decodes the coded element (kind, id) of the current block.
    ///
    /// For a program configuration, elements are mapped by their coded id. For a default channel
    /// configuration, elements are mapped by position, tolerating streams that code elements
    /// inconsistently with their configuration.
    pub fn get_che(&mut self, kind: ElementType, id: usize) -> Option<ElementKey> {
        if id >= MAX_ELEM_ID {
            return None;
        }

        if self.current.info.chan_config == 0 {
            return self.tag_lookup(kind, id);
        }

        // Stereo signalled as mono.
        if self.tags_mapped == 0 && kind == ElementType::Cpe && self.current.info.chan_config == 1
        {
            self.push();

            debug!("mono with cpe");

            let map = self.set_default_config(2).ok()?;
            self.configure_output(&map, OutputStatus::TrialFrame, true).ok()?;

            self.current.info.chan_config = 2;
            self.current.info.ps = Presence::Absent;
        }

        // Mono pair signalled as stereo.
        if self.tags_mapped == 0 && kind == ElementType::Sce && self.current.info.chan_config == 2
        {
            self.push();

            debug!("stereo with sce");

            let map = [sce(0, ChannelPosition::Front), sce(1, ChannelPosition::Front)];
            self.configure_output(&map, OutputStatus::TrialFrame, true).ok()?;

            if self.current.info.sbr != Presence::Absent {
                self.current.info.ps = Presence::Unknown;
            }
        }

        let state = OutputState {
            chan_config: self.current.info.chan_config,
            tags_mapped: self.tags_mapped,
        };

        let rule = REMAP_RULES.iter().find(|rule| {
            rule.configs.contains(&state.chan_config) && (rule.matches)(&state, kind, id)
        })?;

        let own = ElementKey::new(kind, id);
        let target = rule.target.unwrap_or(own);

        if rule.warn && target != own && !self.warned_remapping {
            warn!(
                "assuming a remapped channel layout: {} {} is decoded as {} {}",
                kind, id, target.kind, target.id
            );
            self.warned_remapping = true;
        }

        self.tags_mapped += 1;

        let mapped = self.elements.is_allocated(target).then_some(target);

        self.tag_map[kind as usize][id] = mapped;

        mapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aac::extension::BandwidthExtension;
    use crate::common::AAC_CHANNELS;
    use symphonia_core::io::BitReaderLtr;

    fn manager() -> OutputManager<f32> {
        OutputManager::new(StreamInfo::new(48000), ChannelOrder::Default, false)
    }

    fn configure_default(mgr: &mut OutputManager<f32>, config: usize) {
        let map = mgr.set_default_config(config).unwrap();
        mgr.current.info.chan_config = config;
        mgr.configure_output(&map, OutputStatus::GlobalHeader, false).unwrap();
    }

    #[test]
    fn verify_default_config_channel_counts() {
        for config in [1, 2, 3, 4, 5, 6, 7, 11, 12, 13, 14] {
            let mut mgr = manager();
            configure_default(&mut mgr, config);

            assert_eq!(mgr.channels().len(), AAC_CHANNELS[config], "config {}", config);
            assert!(mgr.channels().len() <= MAX_CHANNELS);

            // All default layouts are expressible with loudspeaker positions.
            assert_eq!(mgr.layout().count(), AAC_CHANNELS[config]);
            assert!(mgr.layout().positions().is_some(), "config {}", config);
        }
    }

    #[test]
    fn verify_invalid_default_config() {
        let mut mgr = manager();
        for config in [0, 8, 9, 10, 15] {
            assert!(mgr.set_default_config(config).is_err());
        }
    }

    #[test]
    fn verify_configure_idempotent() {
        let mut mgr = manager();
        configure_default(&mut mgr, 6);

        let channels = mgr.channels().to_vec();
        let layout = mgr.layout();
        let allocations = mgr.elements.allocations();

        configure_default(&mut mgr, 6);

        assert_eq!(mgr.channels(), &channels[..]);
        assert_eq!(mgr.layout(), layout);
        assert_eq!(mgr.elements.allocations(), allocations);
    }

    #[test]
    fn verify_5_1_order() {
        let mut mgr = manager();
        configure_default(&mut mgr, 6);

        let positions: Vec<_> = mgr.channels().iter().map(|out| out.position).collect();

        assert_eq!(
            positions,
            vec![
                ChannelPositions::FRONT_LEFT,
                ChannelPositions::FRONT_RIGHT,
                ChannelPositions::FRONT_CENTRE,
                ChannelPositions::LFE1,
                ChannelPositions::BACK_LEFT,
                ChannelPositions::BACK_RIGHT,
            ]
        );
    }

    #[test]
    fn verify_7_1_back_remap() {
        let mut mgr = manager();
        configure_default(&mut mgr, 7);

        let expected = ChannelPositions::FRONT_LEFT
            | ChannelPositions::FRONT_RIGHT
            | ChannelPositions::FRONT_CENTRE
            | ChannelPositions::LFE1
            | ChannelPositions::BACK_LEFT
            | ChannelPositions::BACK_RIGHT
            | ChannelPositions::SIDE_LEFT
            | ChannelPositions::SIDE_RIGHT;

        assert_eq!(mgr.layout(), ChannelLayout::Positions(expected));
    }

    #[test]
    fn verify_22_2_order() {
        let mut mgr = manager();
        configure_default(&mut mgr, 13);

        assert_eq!(mgr.layout(), ChannelLayout::Positions(LAYOUT_22_2));

        let positions: Vec<_> = mgr.channels().iter().map(|out| out.position).collect();

        assert_eq!(
            &positions[..10],
            &[
                ChannelPositions::FRONT_LEFT,
                ChannelPositions::FRONT_RIGHT,
                ChannelPositions::FRONT_CENTRE,
                ChannelPositions::LFE1,
                ChannelPositions::BACK_LEFT,
                ChannelPositions::BACK_RIGHT,
                ChannelPositions::FRONT_LEFT_CENTRE,
                ChannelPositions::FRONT_RIGHT_CENTRE,
                ChannelPositions::BACK_CENTRE,
                ChannelPositions::LFE2,
            ]
        );
    }

    #[test]
    fn verify_coded_order() {
        let mut mgr = OutputManager::<f32>::new(StreamInfo::new(48000), ChannelOrder::Coded, false);
        configure_default(&mut mgr, 6);

        assert_eq!(mgr.layout(), ChannelLayout::Unspecified(6));
        assert_eq!(mgr.channels()[0].key, ElementKey::new(ElementType::Sce, 0));
        assert_eq!(mgr.channels()[5].key, ElementKey::new(ElementType::Lfe, 0));
    }

    #[test]
    fn verify_unexpressible_layout() {
        let mut mgr = manager();

        // Six front mono elements can't be paired.
        let map: Vec<_> = (0..6).map(|id| sce(id, ChannelPosition::Front)).collect();
        mgr.configure_output(&map, OutputStatus::TrialPce, false).unwrap();

        assert_eq!(mgr.layout(), ChannelLayout::Unspecified(6));
    }

    #[test]
    fn verify_channel_cap() {
        let mut mgr = manager();

        let mut map = Vec::new();
        map.extend((0..16).map(|id| cpe(id, ChannelPosition::Front)));
        map.extend((0..16).map(|id| sce(id, ChannelPosition::Side)));
        map.extend((0..16).map(lfe));
        mgr.configure_output(&map, OutputStatus::TrialPce, false).unwrap();
        assert_eq!(mgr.channels().len(), MAX_CHANNELS);

        map.push(LayoutEntry::new(ElementType::Cce, 0, ChannelPosition::Cc));
        assert!(mgr.configure_output(&map, OutputStatus::TrialPce, false).is_err());
    }

    struct NullExtension;

    impl BandwidthExtension<f32> for NullExtension {
        fn decode_extension(
            &mut self,
            _: &mut BitReaderLtr<'_>,
            _: ElementType,
            _: bool,
            _: usize,
        ) -> Result<()> {
            Ok(())
        }

        fn apply(&mut self, _: ElementType, _: &mut [f32], _: Option<&mut [f32]>) -> Result<()> {
            Ok(())
        }
    }

    struct NullFactory;

    impl ExtensionFactory<f32> for NullFactory {
        fn alloc_init(&self, _: ElementType) -> Result<Box<dyn BandwidthExtension<f32>>> {
            Ok(Box::new(NullExtension))
        }
    }

    #[test]
    fn verify_parametric_stereo_layout() {
        // Without an extension decoder the core channel is output alone.
        let mut mgr = manager();
        mgr.current.info.ps = Presence::Present;
        configure_default(&mut mgr, 1);
        assert_eq!(mgr.channels().len(), 1);

        let mut mgr = manager();
        mgr.set_extension(Box::new(NullFactory));
        mgr.current.info.ps = Presence::Present;
        configure_default(&mut mgr, 1);

        assert_eq!(
            mgr.layout(),
            ChannelLayout::Positions(ChannelPositions::FRONT_LEFT | ChannelPositions::FRONT_RIGHT)
        );
        assert_eq!(mgr.channels().len(), 2);
    }

    #[test]
    fn verify_push_pop() {
        let mut mgr = manager();
        configure_default(&mut mgr, 2);
        mgr.lock();

        assert!(mgr.push());
        assert_eq!(mgr.status(), OutputStatus::None);

        let map = mgr.set_default_config(6).unwrap();
        mgr.configure_output(&map, OutputStatus::TrialPce, false).unwrap();
        assert_eq!(mgr.channels().len(), 6);

        // A trial that never locks is rolled back.
        mgr.pop();
        assert_eq!(mgr.status(), OutputStatus::Locked);
        assert_eq!(mgr.channels().len(), 2);
        assert!(!mgr.elements.is_allocated(ElementKey::new(ElementType::Lfe, 0)));

        // A locked trial is kept.
        assert!(mgr.push());
        mgr.configure_output(&map, OutputStatus::TrialPce, false).unwrap();
        mgr.lock();
        mgr.pop();
        assert_eq!(mgr.channels().len(), 6);
    }

    #[test]
    fn verify_legacy_5_1_remap() {
        let mut mgr = manager();
        configure_default(&mut mgr, 6);

        mgr.begin_block();
        assert_eq!(mgr.get_che(ElementType::Sce, 0), Some(ElementKey::new(ElementType::Sce, 0)));
        assert_eq!(mgr.get_che(ElementType::Cpe, 0), Some(ElementKey::new(ElementType::Cpe, 0)));
        assert_eq!(mgr.get_che(ElementType::Cpe, 1), Some(ElementKey::new(ElementType::Cpe, 1)));

        // An SCE coded in place of the LFE is decoded by the LFE.
        assert_eq!(mgr.get_che(ElementType::Sce, 1), Some(ElementKey::new(ElementType::Lfe, 0)));

        // No further elements are expected.
        assert_eq!(mgr.get_che(ElementType::Sce, 2), None);
    }

    #[test]
    fn verify_mono_with_cpe() {
        let mut mgr = manager();
        configure_default(&mut mgr, 1);
        mgr.lock();

        mgr.begin_block();
        assert_eq!(mgr.get_che(ElementType::Cpe, 0), Some(ElementKey::new(ElementType::Cpe, 0)));
        assert_eq!(mgr.current.info.chan_config, 2);
        assert_eq!(mgr.status(), OutputStatus::TrialFrame);
        assert_eq!(mgr.channels().len(), 2);
        assert!(mgr.take_frame_request());
        assert!(!mgr.take_frame_request());
    }
}
