//! Shared installation state: segment store, frame buffer, process-wide mode.
//!
//! Everything the two periodic tasks share lives in one [`Installation`],
//! wrapped by [`SharedInstallation`] in a `critical-section` mutex so each
//! task's pass over it is a single atomic unit: the sensing task's
//! "observe reading, apply trigger or blank on disconnect" and the rendering
//! task's "tick segments, write buffer, flush". The lock is never held
//! across bus I/O.

use core::cell::RefCell;

use critical_section::Mutex;
use embassy_time::{Duration, Instant};

use crate::bus::OUT_OF_RANGE_MM;
use crate::color::{BLACK, Rgb};
use crate::math8::fade_level;
use crate::mode::{self, ADJACENT_LEVEL, ModeId};
use crate::rng::SplitMix64;
use crate::segment::SegmentStore;

/// The segment whose trigger advances the process-wide mode.
pub const MODE_SELECT_SEGMENT: usize = 0;

/// Default trigger threshold: 27 inches.
pub const DEFAULT_TRIGGER_DISTANCE_MM: u16 = 686;

/// Default fade-out duration.
pub const DEFAULT_FADE: Duration = Duration::from_millis(2000);

/// Tunables fixed at startup.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Distances below this trigger a segment.
    pub trigger_distance_mm: u16,
    /// How long an activation takes to fade out.
    pub fade: Duration,
    /// Mode at startup.
    pub initial_mode: ModeId,
    /// Seed for the hue RNG.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trigger_distance_mm: DEFAULT_TRIGGER_DISTANCE_MM,
            fade: DEFAULT_FADE,
            initial_mode: ModeId::ImpactFade,
            seed: 0x5741_1257_a127_c0de,
        }
    }
}

/// What a distance observation amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// The segment activated (or refreshed an ongoing activation).
    Triggered { fresh: bool, mode_advanced: bool },
    /// The reading was the out-of-range sentinel; the sensor is gone.
    OutOfRange,
    /// Valid reading above the threshold.
    Clear,
    /// Segment unknown or not ready; nothing done.
    Ignored,
}

/// The whole installation: segments, pixels, mode, RNG.
pub struct Installation<const LEDS: usize, const SEGMENTS: usize> {
    segments: SegmentStore<SEGMENTS>,
    frame: [Rgb; LEDS],
    mode: ModeId,
    rng: SplitMix64,
    trigger_distance_mm: u16,
    fade: Duration,
}

impl<const LEDS: usize, const SEGMENTS: usize> Installation<LEDS, SEGMENTS> {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            segments: SegmentStore::new(LEDS),
            frame: [BLACK; LEDS],
            mode: config.initial_mode,
            rng: SplitMix64::new(config.seed),
            trigger_distance_mm: config.trigger_distance_mm,
            fade: config.fade,
        }
    }

    pub const fn mode(&self) -> ModeId {
        self.mode
    }

    pub const fn segments(&self) -> &SegmentStore<SEGMENTS> {
        &self.segments
    }

    pub fn frame(&self) -> &[Rgb] {
        &self.frame
    }

    /// Reconcile a segment's connectivity flag.
    ///
    /// A disconnect blanks the segment's pixels in the same operation, so a
    /// mid-fade segment whose sensor drops goes dark within one pass.
    /// Returns whether the flag actually changed.
    pub fn mark_connectivity(&mut self, id: usize, connected: bool) -> bool {
        let changed = self.segments.mark_connectivity(id, connected);
        if !connected {
            if let Some(segment) = self.segments.get(id) {
                mode::fill(&mut self.frame[segment.pixel_range()], BLACK);
            }
        }
        changed
    }

    /// Record that a segment's sensor is configured for continuous ranging.
    pub fn mark_initialized(&mut self, id: usize) {
        self.segments.mark_initialized(id);
    }

    /// Feed one distance reading from a segment's sensor into the engine.
    pub fn observe_distance(&mut self, id: usize, distance_mm: u16, now: Instant) -> Observation {
        let Some(segment) = self.segments.get(id) else {
            return Observation::Ignored;
        };
        if !segment.ready() {
            return Observation::Ignored;
        }
        if distance_mm >= OUT_OF_RANGE_MM {
            self.mark_connectivity(id, false);
            return Observation::OutOfRange;
        }
        if distance_mm < self.trigger_distance_mm {
            return self.apply_trigger(id, now);
        }
        Observation::Clear
    }

    /// Activate a segment.
    ///
    /// A fresh activation (segment idle, or lit only as a neighbor) runs the
    /// current mode's trigger behavior; re-triggering an already-active
    /// segment just refreshes its timestamp so it stays lit while presence
    /// persists. Triggering the mode-select segment first advances the
    /// process-wide mode, then animates under the new one.
    pub fn apply_trigger(&mut self, id: usize, now: Instant) -> Observation {
        let Some(segment) = self.segments.get(id) else {
            return Observation::Ignored;
        };
        if !segment.ready() {
            return Observation::Ignored;
        }

        let fresh = !segment.is_active() || segment.is_adjacent();
        if !fresh {
            if let Some(segment) = self.segments.get_mut(id) {
                segment.trigger_at = now;
            }
            return Observation::Triggered {
                fresh: false,
                mode_advanced: false,
            };
        }

        let mut mode_advanced = false;
        if id == MODE_SELECT_SEGMENT {
            self.mode = self.mode.next();
            mode_advanced = true;
        }

        let mode = self.mode;
        let Self {
            segments,
            frame,
            rng,
            ..
        } = self;
        if let Some(segment) = segments.get_mut(id) {
            let range = segment.start..segment.end;
            segment.active = true;
            segment.is_adjacent = false;
            segment.trigger_at = now;
            mode::trigger(mode, segment, &mut frame[range], rng);
        }

        if mode == ModeId::CascadeFade {
            self.activate_neighbors(id, now);
        }

        Observation::Triggered {
            fresh: true,
            mode_advanced,
        }
    }

    /// Light the immediate neighbors of a cascade trigger at half level.
    fn activate_neighbors(&mut self, id: usize, now: Instant) {
        let Some(target) = self.segments.get(id).map(|segment| segment.target) else {
            return;
        };
        let neighbors = [id.checked_sub(1), id.checked_add(1)];
        for neighbor_id in neighbors.into_iter().flatten() {
            let Some(neighbor) = self.segments.get_mut(neighbor_id) else {
                continue;
            };
            if !neighbor.ready() {
                continue;
            }
            // An own activation outranks a spill-over from next door.
            if neighbor.active && !neighbor.is_adjacent {
                continue;
            }
            neighbor.active = true;
            neighbor.is_adjacent = true;
            neighbor.trigger_at = now;
            neighbor.brightness = ADJACENT_LEVEL;
            neighbor.target = target;
        }
    }

    /// Tick every segment through the animation engine into the frame buffer.
    pub fn render(&mut self, now: Instant) {
        let mode = self.mode;
        let fade = self.fade;
        let Self {
            segments, frame, ..
        } = self;

        for segment in segments.iter_mut() {
            let range = segment.start..segment.end;
            let pixels = &mut frame[range];

            if !segment.connected {
                mode::fill(pixels, BLACK);
                continue;
            }
            if !segment.active {
                segment.brightness = 0;
                mode::fill(pixels, mode.idle_color());
                continue;
            }

            let elapsed = if now.as_ticks() >= segment.trigger_at.as_ticks() {
                now - segment.trigger_at
            } else {
                Duration::from_ticks(0)
            };
            if elapsed >= fade {
                segment.deactivate();
                mode::fill(pixels, mode.idle_color());
                continue;
            }

            let mut level = fade_level(elapsed, fade);
            if segment.is_adjacent {
                level /= 2;
            }
            segment.brightness = level;
            mode::render(mode, segment, elapsed, pixels);
        }
    }
}

/// [`Installation`] behind the single mutual-exclusion region both tasks use.
pub struct SharedInstallation<const LEDS: usize, const SEGMENTS: usize> {
    inner: Mutex<RefCell<Installation<LEDS, SEGMENTS>>>,
}

impl<const LEDS: usize, const SEGMENTS: usize> SharedInstallation<LEDS, SEGMENTS> {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Installation::new(config))),
        }
    }

    /// Run `f` with exclusive access to the installation.
    ///
    /// The scoped closure guarantees release on every exit path.
    pub fn with<R>(&self, f: impl FnOnce(&mut Installation<LEDS, SEGMENTS>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow(cs).borrow_mut()))
    }

    pub fn observe_distance(&self, id: usize, distance_mm: u16, now: Instant) -> Observation {
        self.with(|installation| installation.observe_distance(id, distance_mm, now))
    }

    pub fn mark_connectivity(&self, id: usize, connected: bool) -> bool {
        self.with(|installation| installation.mark_connectivity(id, connected))
    }

    pub fn mark_initialized(&self, id: usize) {
        self.with(|installation| installation.mark_initialized(id));
    }

    pub fn mode(&self) -> ModeId {
        self.with(|installation| installation.mode())
    }
}
