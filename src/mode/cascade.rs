//! Cascade fade: impact fade that spills onto the neighboring segments.
//!
//! The triggering segment behaves exactly like impact fade. Its immediate
//! neighbors (id - 1, id + 1) light up too, marked adjacent, sharing the same
//! target color; the installation performs that activation since it holds
//! both segments. Adjacent segments start at half brightness and keep fading
//! at half the computed curve (integer halving of the eased value).

use super::impact;
use crate::color::Rgb;
use crate::rng::SplitMix64;
use crate::segment::Segment;

/// Initial brightness of an adjacent segment at trigger time.
pub(crate) const ADJACENT_LEVEL: u8 = 128;

pub(super) fn trigger(segment: &mut Segment, pixels: &mut [Rgb], rng: &mut SplitMix64) {
    impact::trigger(segment, pixels, rng);
}

pub(super) fn render(segment: &Segment, pixels: &mut [Rgb]) {
    // The halved brightness is already in the segment; the blend is the same.
    impact::render(segment, pixels);
}
