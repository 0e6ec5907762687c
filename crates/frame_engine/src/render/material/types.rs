//! Material and stage data model

use serde::{Serialize, Deserialize};

use crate::foundation::math::Mat3;

/// Stable handle of a registered material. Handle 0 is the built-in default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialHandle(pub u32);

impl MaterialHandle {
    /// The built-in default material
    pub const DEFAULT: MaterialHandle = MaterialHandle(0);

    /// Whether this is the built-in default material
    pub fn is_default(self) -> bool {
        self.0 == 0
    }

    /// Slot index in the registry arena
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Texture reference handed out by the texture collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Image lookup collaborator used while building materials
pub trait TextureProvider {
    /// Look up (or load) the image called `name`. `None` if no such image.
    fn register_texture(&mut self, name: &str, mipmaps: bool) -> Option<TextureId>;
}

/// Fixed-function blend factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendFactor {
    /// `GL_ONE`
    One,
    /// `GL_ZERO`
    Zero,
    /// `GL_SRC_COLOR`
    SrcColor,
    /// `GL_DST_COLOR`
    DstColor,
    /// `GL_SRC_ALPHA`
    SrcAlpha,
    /// `GL_DST_ALPHA`
    DstAlpha,
    /// `GL_ONE_MINUS_SRC_COLOR`
    OneMinusSrcColor,
    /// `GL_ONE_MINUS_DST_COLOR`
    OneMinusDstColor,
    /// `GL_ONE_MINUS_SRC_ALPHA`
    OneMinusSrcAlpha,
    /// `GL_ONE_MINUS_DST_ALPHA`
    OneMinusDstAlpha,
}

impl BlendFactor {
    /// Parse a `GL_*` blend token, ignoring case
    pub fn from_token(token: &str) -> Option<Self> {
        let factor = match token.to_ascii_uppercase().as_str() {
            "GL_ONE" => Self::One,
            "GL_ZERO" => Self::Zero,
            "GL_SRC_COLOR" => Self::SrcColor,
            "GL_DST_COLOR" => Self::DstColor,
            "GL_SRC_ALPHA" => Self::SrcAlpha,
            "GL_DST_ALPHA" => Self::DstAlpha,
            "GL_ONE_MINUS_SRC_COLOR" => Self::OneMinusSrcColor,
            "GL_ONE_MINUS_DST_COLOR" => Self::OneMinusDstColor,
            "GL_ONE_MINUS_SRC_ALPHA" => Self::OneMinusSrcAlpha,
            "GL_ONE_MINUS_DST_ALPHA" => Self::OneMinusDstAlpha,
            _ => return None,
        };
        Some(factor)
    }
}

/// Source/destination blend pair of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendFunc {
    /// Source factor
    pub src: BlendFactor,
    /// Destination factor
    pub dst: BlendFactor,
}

impl BlendFunc {
    /// Plain replacement, no blending
    pub const REPLACE: BlendFunc = BlendFunc::new(BlendFactor::One, BlendFactor::Zero);

    /// Classic alpha blending
    pub const ALPHA: BlendFunc = BlendFunc::new(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);

    /// Create a blend pair
    pub const fn new(src: BlendFactor, dst: BlendFactor) -> Self {
        Self { src, dst }
    }

    /// Whether this pair reads the destination at all
    pub fn is_blending(&self) -> bool {
        *self != Self::REPLACE
    }
}

impl From<(BlendFactor, BlendFactor)> for BlendFunc {
    fn from((src, dst): (BlendFactor, BlendFactor)) -> Self {
        Self::new(src, dst)
    }
}

/// Periodic function used by wave generators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    /// `sin`
    Sine,
    /// `square`
    Square,
    /// `triangle`
    Triangle,
    /// `sawtooth`
    Sawtooth,
    /// `inverse_sawtooth`
    InverseSawtooth,
    /// `noise`
    Noise,
    /// `random`
    Random,
}

impl Waveform {
    /// Parse a waveform token, ignoring case
    pub fn from_token(token: &str) -> Option<Self> {
        let waveform = match token.to_ascii_lowercase().as_str() {
            "sin" => Self::Sine,
            "square" => Self::Square,
            "triangle" => Self::Triangle,
            "sawtooth" => Self::Sawtooth,
            "inverse_sawtooth" | "inversesawtooth" => Self::InverseSawtooth,
            "noise" => Self::Noise,
            "random" => Self::Random,
            _ => return None,
        };
        Some(waveform)
    }
}

/// `{waveform, base, amplitude, phase, frequency}`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveParams {
    /// Periodic function
    pub waveform: Waveform,
    /// Offset added to the scaled wave
    pub base: f32,
    /// Wave scale
    pub amplitude: f32,
    /// Phase offset, in periods
    pub phase: f32,
    /// Periods per second
    pub frequency: f32,
}

impl WaveParams {
    /// Create wave parameters
    pub fn new(waveform: Waveform, base: f32, amplitude: f32, phase: f32, frequency: f32) -> Self {
        Self { waveform, base, amplitude, phase, frequency }
    }
}

/// How a stage's RGB color is produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorGen {
    /// Pass the caller-supplied color through
    Vertex,
    /// Fixed color
    Constant([f32; 3]),
    /// White scaled by a wave
    Wave(WaveParams),
}

/// How a stage's alpha is produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlphaGen {
    /// Pass the caller-supplied alpha through
    Vertex,
    /// Fixed alpha
    Constant(f32),
    /// Opaque alpha scaled by a wave
    Wave(WaveParams),
}

/// Texture-coordinate modifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TexMod {
    /// Sinusoidal wobble; the waveform is always sine
    Turb(WaveParams),
    /// Constant scale
    Scale {
        /// S factor
        s: f32,
        /// T factor
        t: f32,
    },
    /// Scroll in texture units per second
    Scroll {
        /// S speed
        s: f32,
        /// T speed
        t: f32,
    },
    /// Scale about the texture centre by the reciprocal of a wave
    Stretch(WaveParams),
    /// Fixed affine transform
    Transform(Mat3),
    /// Rotation about the texture centre
    Rotate {
        /// Radians per second
        radians_per_sec: f32,
    },
}

/// One rendering layer of a material
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    /// Diffuse texture
    pub diffuse: Option<TextureId>,
    /// Blend pair
    pub blend: BlendFunc,
    /// Clamp-to-border sampling instead of repeat
    pub clamp: bool,
    /// Color generator
    pub rgb_gen: ColorGen,
    /// Alpha generator
    pub alpha_gen: AlphaGen,
    /// Texture-coordinate modifiers in declaration order
    pub tc_mods: Vec<TexMod>,
    /// Stage asked for depth writes
    pub depth_write: bool,
    /// Glow layer
    pub glow: bool,
}

impl Stage {
    /// Create an empty stage with the given blend pair
    pub fn new(blend: BlendFunc) -> Self {
        Self {
            diffuse: None,
            blend,
            clamp: false,
            rgb_gen: ColorGen::Vertex,
            alpha_gen: AlphaGen::Vertex,
            tc_mods: Vec::new(),
            depth_write: false,
            glow: false,
        }
    }

    /// Single-stage image material layer
    pub fn image(texture: TextureId) -> Self {
        Self {
            diffuse: Some(texture),
            ..Self::new(BlendFunc::ALPHA)
        }
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new(BlendFunc::REPLACE)
    }
}

/// Named sort keys, lower draws first
pub mod sort {
    /// Portal surfaces
    pub const PORTAL: f32 = 1.0;
    /// Sky
    pub const SKY: f32 = 2.0;
    /// Opaque geometry
    pub const OPAQUE: f32 = 3.0;
    /// Decals and banners
    pub const BANNER: f32 = 6.0;
    /// Underwater surfaces
    pub const UNDERWATER: f32 = 8.0;
    /// Blended surfaces
    pub const ADDITIVE: f32 = 9.0;
    /// Drawn last
    pub const NEAREST: f32 = 16.0;

    /// Resolve a `sort` keyword, ignoring case
    pub fn from_keyword(keyword: &str) -> Option<f32> {
        let key = match keyword.to_ascii_lowercase().as_str() {
            "portal" => PORTAL,
            "sky" => SKY,
            "opaque" => OPAQUE,
            "banner" => BANNER,
            "underwater" => UNDERWATER,
            "additive" => ADDITIVE,
            "nearest" => NEAREST,
            _ => return None,
        };
        Some(key)
    }
}

/// Six directional sky box textures
#[derive(Debug, Clone, PartialEq)]
pub struct SkyParams {
    /// `_rt _bk _lf _ft _up _dn`; `None` where the image is missing
    pub sides: [Option<TextureId>; 6],
    /// Cloud layer height
    pub cloud_height: f32,
}

impl SkyParams {
    /// Side suffixes in bind order
    pub const SUFFIXES: [&'static str; 6] = ["_rt", "_bk", "_lf", "_ft", "_up", "_dn"];
}

/// A named, ordered list of stages plus sort and depth metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Registered name
    pub name: String,
    /// Stages in draw order
    pub stages: Vec<Stage>,
    /// Sort key, lower draws first
    pub sort: f32,
    /// Whether geometry writes depth
    pub depth_write: bool,
    /// Sky parameters; sky materials skip the regular sort
    pub sky: Option<SkyParams>,
    /// Slot is live
    pub in_use: bool,
    /// Texture lookups request mipmaps
    pub mipmaps: bool,
    /// Texture lookups honour picmip
    pub picmip: bool,
}

impl Material {
    /// Name of the built-in default material
    pub const DEFAULT_NAME: &'static str = "*default";

    /// Create an empty opaque material
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            sort: sort::OPAQUE,
            depth_write: true,
            sky: None,
            in_use: true,
            mipmaps: true,
            picmip: true,
        }
    }

    /// The blank material living at handle 0
    pub fn default_material() -> Self {
        Self::new(Self::DEFAULT_NAME)
    }

    /// Add a stage
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Set the sort key
    pub fn with_sort(mut self, sort: f32) -> Self {
        self.sort = sort;
        self
    }

    /// Set depth writing
    pub fn with_depth_write(mut self, depth_write: bool) -> Self {
        self.depth_write = depth_write;
        self
    }

    /// Whether this material is drawn in the sky pass
    pub fn is_sky(&self) -> bool {
        self.sky.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_tokens_ignore_case() {
        assert_eq!(BlendFactor::from_token("gl_one_minus_src_alpha"), Some(BlendFactor::OneMinusSrcAlpha));
        assert_eq!(BlendFactor::from_token("GL_DST_COLOR"), Some(BlendFactor::DstColor));
        assert_eq!(BlendFactor::from_token("GL_SATURATE"), None);
    }

    #[test]
    fn test_sort_keywords() {
        assert_eq!(sort::from_keyword("Additive"), Some(9.0));
        assert_eq!(sort::from_keyword("nearest"), Some(16.0));
        assert_eq!(sort::from_keyword("front"), None);
    }

    #[test]
    fn test_replace_is_not_blending() {
        assert!(!BlendFunc::REPLACE.is_blending());
        assert!(BlendFunc::ALPHA.is_blending());
    }
}
