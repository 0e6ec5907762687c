//! # Stage Animator
//!
//! Evaluates a stage's color and texture-coordinate transform at a given
//! frame time. Evaluation is a pure function of `(stage, time, base color)`,
//! so a stage can be evaluated once per mesh without drifting.
//!
//! ## Conventions
//!
//! - Waveforms have a period of 1 in their input; `(time + phase) * frequency`
//!   is the input.
//! - Texture-coordinate modifiers apply in declaration order: the first
//!   modifier transforms the coordinates first.

use crate::foundation::math::{constants::TAU, Mat3, Mat3Ext};
use crate::render::material::{AlphaGen, ColorGen, Stage, TexMod, WaveParams, Waveform};

/// RGBA color
pub type Color = [f32; 4];

/// Opaque white
pub const WHITE: Color = [1.0, 1.0, 1.0, 1.0];

/// Evaluated state of one stage at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageState {
    /// Modulation color
    pub color: Color,
    /// Texture-coordinate transform
    pub uv: Mat3,
}

/// Evaluate `stage` at `time` starting from the identity UV transform.
/// `base_color` is what vertex-driven generators pass through.
pub fn evaluate(stage: &Stage, time: f32, base_color: Color) -> StageState {
    evaluate_with_uv(stage, time, base_color, Mat3::identity())
}

/// Evaluate `stage` at `time` on top of a base UV transform
pub fn evaluate_with_uv(stage: &Stage, time: f32, base_color: Color, base_uv: Mat3) -> StageState {
    let mut color = base_color;

    match stage.rgb_gen {
        ColorGen::Vertex => {}
        ColorGen::Constant(rgb) => color[..3].copy_from_slice(&rgb),
        ColorGen::Wave(wave) => {
            let value = wave_value(&wave, time);
            color[..3].copy_from_slice(&[value; 3]);
        }
    }

    match stage.alpha_gen {
        AlphaGen::Vertex => {}
        AlphaGen::Constant(alpha) => color[3] = alpha,
        AlphaGen::Wave(wave) => color[3] = wave_value(&wave, time),
    }

    let uv = stage
        .tc_mods
        .iter()
        .fold(base_uv, |uv, tc_mod| tc_mod_matrix(tc_mod, time) * uv);

    StageState { color, uv }
}

/// `base + amplitude * waveform((time + phase) * frequency)`
pub fn wave_value(wave: &WaveParams, time: f32) -> f32 {
    wave.base + wave.amplitude * waveform(wave.waveform, (time + wave.phase) * wave.frequency)
}

/// Unit-period waveform sampled at `x`
pub fn waveform(kind: Waveform, x: f32) -> f32 {
    let t = x - x.floor();
    match kind {
        Waveform::Sine => (x * TAU).sin(),
        Waveform::Square => {
            if t < 0.5 { 1.0 } else { -1.0 }
        }
        Waveform::Triangle => {
            if t < 0.25 {
                4.0 * t
            } else if t < 0.75 {
                2.0 - 4.0 * t
            } else {
                4.0 * t - 4.0
            }
        }
        Waveform::Sawtooth => t,
        Waveform::InverseSawtooth => 1.0 - t,
        Waveform::Noise => value_noise(x),
        Waveform::Random => hash_unit(x.floor() as i32) * 2.0 - 1.0,
    }
}

// Smoothly interpolated lattice noise in [-1, 1]
fn value_noise(x: f32) -> f32 {
    let cell = x.floor();
    let f = x - cell;
    let a = hash_unit(cell as i32);
    let b = hash_unit(cell as i32 + 1);
    let s = f * f * (3.0 - 2.0 * f);
    (a + (b - a) * s) * 2.0 - 1.0
}

// Integer hash mapped to [0, 1]
fn hash_unit(n: i32) -> f32 {
    let mut h = n as u32;
    h = h.wrapping_mul(0x2783_0c5b) ^ (h >> 15);
    h = h.wrapping_mul(0x9e37_79b1);
    h ^= h >> 13;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 16;
    (h & 0x00ff_ffff) as f32 / 0x00ff_ffff as f32
}

/// Matrix of one modifier at `time`
pub fn tc_mod_matrix(tc_mod: &TexMod, time: f32) -> Mat3 {
    match *tc_mod {
        TexMod::Scale { s, t } => Mat3::uv_scale(s, t),
        TexMod::Scroll { s, t } => Mat3::uv_translate(s * time, t * time),
        TexMod::Transform(m) => m,
        TexMod::Rotate { radians_per_sec } => about_centre(Mat3::uv_rotate(radians_per_sec * time)),
        TexMod::Stretch(wave) => {
            let value = wave_value(&wave, time);
            let scale = if value != 0.0 { 1.0 / value } else { 1.0 };
            about_centre(Mat3::uv_scale(scale, scale))
        }
        TexMod::Turb(wave) => {
            let offset = wave.amplitude * ((time + wave.phase) * wave.frequency * TAU).sin();
            Mat3::uv_translate(offset, offset)
        }
    }
}

fn about_centre(m: Mat3) -> Mat3 {
    Mat3::uv_translate(0.5, 0.5) * m * Mat3::uv_translate(-0.5, -0.5)
}
