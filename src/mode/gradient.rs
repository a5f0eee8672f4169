//! Gradient fade: paint a random two-color gradient, then dim it away.
//!
//! The gradient is written once at trigger time. Every frame afterwards the
//! live pixels are scaled down in place by the current level, so repeated
//! passes compound and the colors sink toward black together.

use super::fill;
use crate::color::{Hsv, Rgb, fill_two_hue_gradient, scale_rgb};
use crate::rng::SplitMix64;
use crate::segment::Segment;

pub(super) fn trigger(segment: &mut Segment, pixels: &mut [Rgb], rng: &mut SplitMix64) {
    let from = Hsv {
        hue: rng.next_u8(),
        sat: 255,
        val: 255,
    };
    let to = Hsv {
        hue: rng.next_u8(),
        sat: 255,
        val: 255,
    };
    fill_two_hue_gradient(pixels, from, to);
    segment.target = pixels.first().copied().unwrap_or_default();
    segment.brightness = 255;
}

pub(super) fn render(segment: &Segment, pixels: &mut [Rgb]) {
    if segment.brightness == 0 {
        fill(pixels, super::DIM_GLOW);
        return;
    }
    for led in pixels {
        *led = scale_rgb(*led, segment.brightness);
    }
}
