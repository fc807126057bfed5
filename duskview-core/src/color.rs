//! # HSV Color Transforms
//!
//! CPU reference for the three filter programs. The WGSL in `shaders` runs
//! the same math per fragment; this module is what the GPU output is checked
//! against and what documents the exact curves.
//!
//! Hue is kept on a [0, 1) scale, not degrees.

use crate::mode::FilterMode;

/// Brightness ceiling used by `dampen`
pub const DAMPEN_VALUE_CEILING: f32 = 0.50;
/// How much of the brightness above the ceiling survives
pub const DAMPEN_VALUE_OVERSHOOT: f32 = 0.15;
/// Saturation ceiling used by `dampen`
pub const DAMPEN_SATURATION_CEILING: f32 = 0.65;
/// How much of the saturation above the ceiling survives
pub const DAMPEN_SATURATION_OVERSHOOT: f32 = 0.25;

/// Fraction of brightness removed by `darken`
pub const DARKEN_VALUE_CUT: f32 = 0.75;
/// Fraction of saturation removed by `darken`
pub const DARKEN_SATURATION_CUT: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub h: f32,
    pub s: f32,
    pub v: f32,
}

pub fn rgb_to_hsv(rgb: [f32; 3]) -> Hsv {
    let [r, g, b] = rgb;
    let cmax = r.max(g.max(b));
    let cmin = r.min(g.min(b));
    let delta = cmax - cmin;

    let h = if delta <= 0.0 {
        0.0
    } else if cmax == r {
        ((g - b) / delta).rem_euclid(6.0) / 6.0
    } else if cmax == g {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };

    let s = if cmax > 0.0 { delta / cmax } else { 0.0 };

    Hsv { h, s, v: cmax }
}

pub fn hsv_to_rgb(hsv: Hsv) -> [f32; 3] {
    let Hsv { h, s, v } = hsv;
    let h6 = h.rem_euclid(1.0) * 6.0;
    let sector = h6.floor();
    let f = h6 - sector;

    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);

    match sector as u32 {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}

/// Apply a mode in HSV space
pub fn transform_hsv(mode: FilterMode, hsv: Hsv) -> Hsv {
    match mode {
        FilterMode::Invert => Hsv { v: 1.0 - hsv.v, ..hsv },
        FilterMode::Dampen => {
            let v_ceiling = DAMPEN_VALUE_CEILING
                + (hsv.v - DAMPEN_VALUE_CEILING).max(0.0) * DAMPEN_VALUE_OVERSHOOT;
            let s_ceiling = DAMPEN_SATURATION_CEILING
                + (hsv.s - DAMPEN_SATURATION_CEILING).max(0.0) * DAMPEN_SATURATION_OVERSHOOT;
            Hsv {
                h: hsv.h,
                s: hsv.s.min(s_ceiling),
                v: hsv.v.min(v_ceiling),
            }
        }
        FilterMode::Darken => Hsv {
            h: hsv.h,
            s: hsv.s - DARKEN_SATURATION_CUT * hsv.s,
            v: hsv.v - DARKEN_VALUE_CUT * hsv.v,
        },
    }
}

/// Apply a mode to one normalized RGB color
pub fn transform_rgb(mode: FilterMode, rgb: [f32; 3]) -> [f32; 3] {
    hsv_to_rgb(transform_hsv(mode, rgb_to_hsv(rgb)))
}

/// Apply a mode in place to tightly packed RGBA8 pixels. Alpha is untouched.
pub fn transform_rgba8(mode: FilterMode, pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        let rgb = [
            px[0] as f32 / 255.0,
            px[1] as f32 / 255.0,
            px[2] as f32 / 255.0,
        ];
        let out = transform_rgb(mode, rgb);
        for (dst, c) in px.iter_mut().zip(out) {
            *dst = (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
    }
}
