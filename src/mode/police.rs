//! Police lights: hard two-color strobe while active.
//!
//! No fading; the pixels alternate between the alert colors on a fixed
//! sub-interval keyed off elapsed time, then drop to the dim idle glow when
//! the activation runs out.

use embassy_time::Duration;

use super::fill;
use crate::color::Rgb;
use crate::segment::Segment;

/// Alternation sub-interval.
const STROBE_INTERVAL_MS: u64 = 100;

const ALERT: Rgb = Rgb { r: 255, g: 0, b: 0 };
const SECONDARY: Rgb = Rgb { r: 0, g: 0, b: 255 };

pub(super) fn trigger(segment: &mut Segment, pixels: &mut [Rgb]) {
    segment.target = ALERT;
    segment.brightness = 255;
    fill(pixels, ALERT);
}

pub(super) fn render(elapsed: Duration, pixels: &mut [Rgb]) {
    let phase = (elapsed.as_millis() / STROBE_INTERVAL_MS) % 2;
    let color = if phase == 0 { ALERT } else { SECONDARY };
    fill(pixels, color);
}
