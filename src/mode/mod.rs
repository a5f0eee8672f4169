//! Animation modes with compile-time known variants
//!
//! One module per mode, each exposing a trigger routine and a per-frame
//! render routine, selected here by a single dispatch. Adding a mode is a
//! one-place change.

mod cascade;
mod gradient;
mod impact;
mod police;

use embassy_time::Duration;

pub(crate) use cascade::ADJACENT_LEVEL;

use crate::color::{BLACK, Rgb};
use crate::rng::SplitMix64;
use crate::segment::Segment;

const MODE_NAME_IMPACT_FADE: &str = "impact_fade";
const MODE_NAME_CASCADE_FADE: &str = "cascade_fade";
const MODE_NAME_GRADIENT_FADE: &str = "gradient_fade";
const MODE_NAME_POLICE_LIGHTS: &str = "police_lights";

const MODE_ID_IMPACT_FADE: u8 = 0;
const MODE_ID_CASCADE_FADE: u8 = 1;
const MODE_ID_GRADIENT_FADE: u8 = 2;
const MODE_ID_POLICE_LIGHTS: u8 = 3;

const MODE_COUNT: u8 = 4;

/// Faint glow used as the idle color of the modes that stay visible when
/// nothing is triggered.
pub const DIM_GLOW: Rgb = Rgb { r: 8, g: 8, b: 8 };

/// Process-wide animation mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ModeId {
    ImpactFade = MODE_ID_IMPACT_FADE,
    CascadeFade = MODE_ID_CASCADE_FADE,
    GradientFade = MODE_ID_GRADIENT_FADE,
    PoliceLights = MODE_ID_POLICE_LIGHTS,
}

impl Default for ModeId {
    fn default() -> Self {
        Self::ImpactFade
    }
}

impl ModeId {
    /// Decode a raw mode value.
    ///
    /// Out-of-range values reset to the first mode so an invalid state can
    /// never leak out of the mode-advance arithmetic.
    pub const fn from_raw(value: u8) -> Self {
        match value {
            MODE_ID_CASCADE_FADE => Self::CascadeFade,
            MODE_ID_GRADIENT_FADE => Self::GradientFade,
            MODE_ID_POLICE_LIGHTS => Self::PoliceLights,
            _ => Self::ImpactFade,
        }
    }

    /// Cyclic advance to the next mode.
    pub const fn next(self) -> Self {
        Self::from_raw((self as u8).wrapping_add(1) % MODE_COUNT)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ImpactFade => MODE_NAME_IMPACT_FADE,
            Self::CascadeFade => MODE_NAME_CASCADE_FADE,
            Self::GradientFade => MODE_NAME_GRADIENT_FADE,
            Self::PoliceLights => MODE_NAME_POLICE_LIGHTS,
        }
    }

    /// Color a segment shows while idle under this mode.
    pub(crate) const fn idle_color(self) -> Rgb {
        match self {
            Self::ImpactFade | Self::CascadeFade => BLACK,
            Self::GradientFade | Self::PoliceLights => DIM_GLOW,
        }
    }
}

/// Trigger side effects local to the triggered segment.
///
/// CascadeFade's neighbor activation happens at the installation level,
/// where both adjacent segments are reachable under the same lock.
pub(crate) fn trigger(
    mode: ModeId,
    segment: &mut Segment,
    pixels: &mut [Rgb],
    rng: &mut SplitMix64,
) {
    match mode {
        ModeId::ImpactFade => impact::trigger(segment, pixels, rng),
        ModeId::CascadeFade => cascade::trigger(segment, pixels, rng),
        ModeId::GradientFade => gradient::trigger(segment, pixels, rng),
        ModeId::PoliceLights => police::trigger(segment, pixels),
    }
}

/// Per-frame rendering for an `Active` segment.
///
/// The segment's brightness for this frame is already computed (ease-out
/// curve, halved for adjacent segments).
pub(crate) fn render(mode: ModeId, segment: &Segment, elapsed: Duration, pixels: &mut [Rgb]) {
    match mode {
        ModeId::ImpactFade => impact::render(segment, pixels),
        ModeId::CascadeFade => cascade::render(segment, pixels),
        ModeId::GradientFade => gradient::render(segment, pixels),
        ModeId::PoliceLights => police::render(elapsed, pixels),
    }
}

pub(crate) fn fill(pixels: &mut [Rgb], color: Rgb) {
    for led in pixels {
        *led = color;
    }
}
