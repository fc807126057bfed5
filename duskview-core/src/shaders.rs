//! WGSL programs, one per filter mode.
//!
//! Every program shares the pass-through vertex stage and the HSV helpers;
//! only the fragment body differs. Constants mirror `color`.

use crate::mode::FilterMode;

const PRELUDE: &str = r#"
struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) tex_coords: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) tex_coords: vec2<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(in.position, 0.0, 1.0);
    out.tex_coords = in.tex_coords;
    return out;
}

@group(0) @binding(0) var t_video: texture_2d<f32>;
@group(0) @binding(1) var s_video: sampler;

// Hue in [0, 1)
fn rgb_to_hsv(c: vec3<f32>) -> vec3<f32> {
    let cmax = max(c.r, max(c.g, c.b));
    let cmin = min(c.r, min(c.g, c.b));
    let delta = cmax - cmin;

    var h: f32 = 0.0;
    if delta > 0.0 {
        if cmax == c.r {
            h = (c.g - c.b) / delta;
            h = h - 6.0 * floor(h / 6.0);
        } else if cmax == c.g {
            h = (c.b - c.r) / delta + 2.0;
        } else {
            h = (c.r - c.g) / delta + 4.0;
        }
        h = h / 6.0;
    }

    var s: f32 = 0.0;
    if cmax > 0.0 {
        s = delta / cmax;
    }

    return vec3<f32>(h, s, cmax);
}

fn hsv_to_rgb(c: vec3<f32>) -> vec3<f32> {
    let h6 = fract(c.x) * 6.0;
    let sector = floor(h6);
    let f = h6 - sector;

    let v = c.z;
    let p = v * (1.0 - c.y);
    let q = v * (1.0 - f * c.y);
    let t = v * (1.0 - (1.0 - f) * c.y);

    var rgb: vec3<f32>;
    switch i32(sector) {
        case 0: { rgb = vec3<f32>(v, t, p); }
        case 1: { rgb = vec3<f32>(q, v, p); }
        case 2: { rgb = vec3<f32>(p, v, t); }
        case 3: { rgb = vec3<f32>(p, q, v); }
        case 4: { rgb = vec3<f32>(t, p, v); }
        default: { rgb = vec3<f32>(v, p, q); }
    }
    return rgb;
}
"#;

const FS_INVERT: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(t_video, s_video, in.tex_coords);
    var hsv = rgb_to_hsv(color.rgb);
    hsv.z = 1.0 - hsv.z;
    return vec4<f32>(hsv_to_rgb(hsv), color.a);
}
"#;

const FS_DAMPEN: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(t_video, s_video, in.tex_coords);
    var hsv = rgb_to_hsv(color.rgb);
    let v_ceiling = 0.50 + max(0.0, hsv.z - 0.50) * 0.15;
    let s_ceiling = 0.65 + max(0.0, hsv.y - 0.65) * 0.25;
    hsv.z = min(hsv.z, v_ceiling);
    hsv.y = min(hsv.y, s_ceiling);
    return vec4<f32>(hsv_to_rgb(hsv), color.a);
}
"#;

const FS_DARKEN: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(t_video, s_video, in.tex_coords);
    var hsv = rgb_to_hsv(color.rgb);
    hsv.z = hsv.z - 0.75 * hsv.z;
    hsv.y = hsv.y - 0.2 * hsv.y;
    return vec4<f32>(hsv_to_rgb(hsv), color.a);
}
"#;

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Full WGSL module for a mode
pub fn program_source(mode: FilterMode) -> String {
    let fragment = match mode {
        FilterMode::Invert => FS_INVERT,
        FilterMode::Dampen => FS_DAMPEN,
        FilterMode::Darken => FS_DARKEN,
    };
    format!("{PRELUDE}{fragment}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_mode_has_both_entry_points() {
        for mode in FilterMode::ALL {
            let src = program_source(mode);
            assert!(src.contains("fn vs_main"));
            assert!(src.contains("fn fs_main"));
            assert_eq!(src.matches("@fragment").count(), 1, "{mode}");
        }
    }
}
