//! Impact fade: flash white, fade out toward a random color.
//!
//! On trigger the segment picks a uniformly random hue at full saturation and
//! value, lights up white at full brightness, then blends toward that hue as
//! the ease-out curve decays, gamma-scaled so the tail reads as dark.

use super::fill;
use crate::color::{Rgb, WHITE, blend_colors, hue_color, scale_rgb};
use crate::gamma;
use crate::rng::SplitMix64;
use crate::segment::Segment;

pub(super) fn trigger(segment: &mut Segment, pixels: &mut [Rgb], rng: &mut SplitMix64) {
    segment.target = hue_color(rng.next_u8());
    segment.brightness = 255;
    fill(pixels, WHITE);
}

pub(super) fn render(segment: &Segment, pixels: &mut [Rgb]) {
    let level = segment.brightness;
    let base = blend_colors(WHITE, segment.target, 255 - level);
    fill(pixels, scale_rgb(base, gamma::correct(level)));
}
