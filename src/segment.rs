//! Per-segment state records and the invariant-preserving store.
//!
//! A segment is a contiguous stretch of pixels mapped one-to-one to a
//! distance-sensor channel. All mutation funnels through [`SegmentStore`]
//! (and the installation that owns it) so the invariants hold everywhere:
//! ranges partition the strip, `initialized` implies `connected`, and a
//! disconnected segment is never lit.

use core::ops::Range;

use embassy_time::Instant;

use crate::color::{BLACK, Rgb};

/// One stair segment: pixel range plus sensor and animation state.
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub(crate) id: u8,
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) connected: bool,
    pub(crate) initialized: bool,
    pub(crate) active: bool,
    pub(crate) is_adjacent: bool,
    pub(crate) trigger_at: Instant,
    pub(crate) brightness: u8,
    pub(crate) target: Rgb,
}

impl Segment {
    fn new(id: u8, start: usize, end: usize) -> Self {
        Self {
            id,
            start,
            end,
            connected: false,
            initialized: false,
            active: false,
            is_adjacent: false,
            trigger_at: Instant::from_ticks(0),
            brightness: 0,
            target: BLACK,
        }
    }

    pub const fn id(&self) -> u8 {
        self.id
    }

    /// Pixel range `[start, end)` owned by this segment.
    pub const fn pixel_range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub const fn is_active(&self) -> bool {
        self.active
    }

    pub const fn is_adjacent(&self) -> bool {
        self.is_adjacent
    }

    pub const fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Color the segment fades toward, chosen at trigger time.
    pub const fn target(&self) -> Rgb {
        self.target
    }

    /// Whether the sensing task may act on this segment's readings.
    pub(crate) const fn ready(&self) -> bool {
        self.connected && self.initialized
    }

    pub(crate) const fn deactivate(&mut self) {
        self.active = false;
        self.is_adjacent = false;
        self.brightness = 0;
    }
}

/// Fixed-size array of segments, built once at startup.
pub struct SegmentStore<const SEGMENTS: usize> {
    segments: [Segment; SEGMENTS],
}

impl<const SEGMENTS: usize> SegmentStore<SEGMENTS> {
    /// Partition `total_pixels` into `SEGMENTS` contiguous ranges, ordered by
    /// id. The split is equal-sized; any remainder is folded into the last
    /// segment so the partition covers the whole strip exactly once.
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(total_pixels: usize) -> Self {
        let per_segment = if SEGMENTS == 0 {
            0
        } else {
            total_pixels / SEGMENTS
        };
        let segments = core::array::from_fn(|i| {
            let start = i * per_segment;
            let end = if i + 1 == SEGMENTS {
                total_pixels
            } else {
                (i + 1) * per_segment
            };
            Segment::new(i as u8, start, end)
        });
        Self { segments }
    }

    pub const fn len(&self) -> usize {
        SEGMENTS
    }

    pub const fn is_empty(&self) -> bool {
        SEGMENTS == 0
    }

    /// Read view of a segment.
    pub fn get(&self, id: usize) -> Option<&Segment> {
        self.segments.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: usize) -> Option<&mut Segment> {
        self.segments.get_mut(id)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> core::slice::IterMut<'_, Segment> {
        self.segments.iter_mut()
    }

    /// Record sensor presence for a segment.
    ///
    /// Losing connectivity forces the segment dark: it drops out of `Active`,
    /// clears the adjacency flag and the initialized marker. Returns whether
    /// the connectivity flag actually changed.
    pub fn mark_connectivity(&mut self, id: usize, connected: bool) -> bool {
        let Some(segment) = self.segments.get_mut(id) else {
            return false;
        };
        let changed = segment.connected != connected;
        segment.connected = connected;
        if !connected {
            segment.initialized = false;
            segment.deactivate();
        }
        changed
    }

    /// Record that a segment's sensor is configured for continuous ranging.
    /// Implies connectivity.
    pub fn mark_initialized(&mut self, id: usize) {
        if let Some(segment) = self.segments.get_mut(id) {
            segment.connected = true;
            segment.initialized = true;
        }
    }
}
