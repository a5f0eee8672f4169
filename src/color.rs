pub use smart_leds::hsv::hsv2rgb;
use smart_leds::{RGB8, hsv::Hsv as HSV};

use crate::math8::{blend8, scale8};

pub type Rgb = RGB8;
pub type Hsv = HSV;

pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
pub const WHITE: Rgb = Rgb {
    r: 255,
    g: 255,
    b: 255,
};

/// Blend two RGB colors
///
/// # Arguments
/// * `a` - First color
/// * `b` - Second color
/// * `amount_of_b` - Blend factor (0 = all a, 255 = all b)
#[inline]
pub const fn blend_colors(a: Rgb, b: Rgb, amount_of_b: u8) -> Rgb {
    Rgb {
        r: blend8(a.r, b.r, amount_of_b),
        g: blend8(a.g, b.g, amount_of_b),
        b: blend8(a.b, b.b, amount_of_b),
    }
}

/// Scale all channels of a color by a 0-255 factor.
#[inline]
pub const fn scale_rgb(color: Rgb, level: u8) -> Rgb {
    Rgb {
        r: scale8(color.r, level),
        g: scale8(color.g, level),
        b: scale8(color.b, level),
    }
}

/// A fully saturated, full-value color at the given hue.
#[inline]
pub fn hue_color(hue: u8) -> Rgb {
    hsv2rgb(Hsv {
        hue,
        sat: 255,
        val: 255,
    })
}

/// Fill a two-color linear gradient between two hues.
///
/// Both endpoints are rendered at full saturation and value; hue, like the
/// other channels, is interpolated over the numeric range (no wrap-around).
#[allow(clippy::cast_possible_truncation)]
pub fn fill_two_hue_gradient(leds: &mut [Rgb], from: Hsv, to: Hsv) {
    let len = leds.len();
    if len == 0 {
        return;
    }
    if len == 1 {
        leds[0] = hsv2rgb(from);
        return;
    }

    for (i, led) in leds.iter_mut().enumerate() {
        let amount = ((i * 255) / (len - 1)) as u8;
        *led = hsv2rgb(Hsv {
            hue: blend8(from.hue, to.hue, amount),
            sat: blend8(from.sat, to.sat, amount),
            val: blend8(from.val, to.val, amount),
        });
    }
}
