//! Material description parser
//!
//! Builds a [`Material`] from one `{ ... }` description block. The parser is
//! forgiving: a malformed directive is reported with a warning and skipped,
//! and only structural problems (no opening brace, an unterminated block, a
//! stage image that cannot be found) abort the material.

use log::warn;

use super::lexer::Lexer;
use super::types::{
    sort, AlphaGen, BlendFactor, BlendFunc, ColorGen, Material, SkyParams, Stage, TexMod,
    TextureProvider, WaveParams, Waveform,
};
use crate::foundation::math::{utils, Mat3};

/// Structural errors that abort parsing of a single material
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MaterialParseError {
    /// The description does not start with `{`
    #[error("material '{name}' is missing its opening brace")]
    MissingOpenBrace {
        /// Material name
        name: String,
    },

    /// Input ended before the material's closing brace
    #[error("material '{name}' ends abruptly")]
    UnterminatedMaterial {
        /// Material name
        name: String,
    },

    /// Input ended before a stage's closing brace
    #[error("stage {stage} of material '{name}' ends abruptly")]
    UnterminatedStage {
        /// Material name
        name: String,
        /// Zero-based stage index
        stage: usize,
    },

    /// `map`/`clampmap` named an image that could not be found
    #[error("stage {stage} of material '{name}' has invalid map '{image}', could not find this image")]
    MissingImage {
        /// Material name
        name: String,
        /// Zero-based stage index
        stage: usize,
        /// Requested image
        image: String,
    },
}

/// Parses description blocks, resolving images through a [`TextureProvider`]
pub struct MaterialParser<'t> {
    textures: &'t mut dyn TextureProvider,
    default_blend: BlendFunc,
}

impl<'t> MaterialParser<'t> {
    /// Create a parser. Stages without `blendFunc` get `default_blend`.
    pub fn new(textures: &'t mut dyn TextureProvider, default_blend: BlendFunc) -> Self {
        Self { textures, default_blend }
    }

    /// Parse the block `source` as material `name`
    pub fn parse(&mut self, name: &str, source: &str, mipmaps: bool) -> Result<Material, MaterialParseError> {
        let mut lexer = Lexer::new(source);
        let mut material = Material::new(name);
        material.mipmaps = mipmaps;

        if lexer.next_token() != Some("{") {
            return Err(MaterialParseError::MissingOpenBrace { name: name.to_string() });
        }

        let mut explicit_sort = None;
        loop {
            let Some(token) = lexer.next_token() else {
                return Err(MaterialParseError::UnterminatedMaterial { name: name.to_string() });
            };

            match token.to_ascii_lowercase().as_str() {
                "}" => break,
                "{" => {
                    let stage = self.parse_stage(name, &mut lexer, material.stages.len(), material.mipmaps)?;
                    material.stages.push(stage);
                }
                "sort" => match lexer.next_arg() {
                    Some(value) => match sort::from_keyword(value).or_else(|| value.parse().ok()) {
                        Some(key) => explicit_sort = Some(key),
                        None => warn!("Material '{}' has invalid sort '{}'", name, value),
                    },
                    None => warn!("Material '{}' has sort without a value", name),
                },
                "skyparms" => material.sky = self.parse_sky_params(name, &mut lexer, material.mipmaps),
                "nomipmaps" => material.mipmaps = false,
                "nopicmip" => material.picmip = false,
                "qer_editorimage" => {
                    lexer.rest_of_line();
                }
                _ => {
                    warn!("Material '{}' has unknown/invalid key '{}'", name, token);
                    lexer.rest_of_line();
                }
            }
        }

        apply_derived_defaults(&mut material, explicit_sort);
        Ok(material)
    }

    fn parse_stage(
        &mut self,
        name: &str,
        lexer: &mut Lexer<'_>,
        index: usize,
        mipmaps: bool,
    ) -> Result<Stage, MaterialParseError> {
        let mut stage = Stage::new(self.default_blend);

        loop {
            let Some(token) = lexer.next_token() else {
                return Err(MaterialParseError::UnterminatedStage { name: name.to_string(), stage: index });
            };

            match token.to_ascii_lowercase().as_str() {
                "}" => break,
                key @ ("map" | "clampmap") => {
                    let image = lexer.next_arg().unwrap_or_default();
                    match self.textures.register_texture(image, mipmaps) {
                        Some(texture) => {
                            stage.diffuse = Some(texture);
                            stage.clamp = key == "clampmap";
                        }
                        None => {
                            return Err(MaterialParseError::MissingImage {
                                name: name.to_string(),
                                stage: index,
                                image: image.to_string(),
                            });
                        }
                    }
                }
                "blendfunc" => {
                    let src = blend_factor(name, lexer.next_arg());
                    let dst = blend_factor(name, lexer.next_arg());
                    stage.blend = BlendFunc::new(src, dst);
                }
                "rgbgen" => {
                    if let Some(gen) = parse_rgb_gen(name, lexer) {
                        stage.rgb_gen = gen;
                    }
                }
                "alphagen" => {
                    if let Some(gen) = parse_alpha_gen(name, lexer) {
                        stage.alpha_gen = gen;
                    }
                }
                "tcmod" => {
                    let args = lexer.rest_of_line();
                    if let Some(tc_mod) = parse_tc_mod(name, &args) {
                        stage.tc_mods.push(tc_mod);
                    }
                }
                "depthwrite" => stage.depth_write = true,
                "glow" => stage.glow = true,
                _ => {
                    warn!("Stage {} of material '{}' has unknown/invalid key '{}'", index, name, token);
                    lexer.rest_of_line();
                }
            }
        }

        Ok(stage)
    }

    fn parse_sky_params(&mut self, name: &str, lexer: &mut Lexer<'_>, mipmaps: bool) -> Option<SkyParams> {
        let args = lexer.rest_of_line();
        let farbox = match args.first() {
            Some(&"-") => return None,
            Some(farbox) => *farbox,
            None => {
                warn!("Material '{}' has skyParms without a far box", name);
                return None;
            }
        };
        let cloud_height = args.get(1).and_then(|h| h.parse().ok()).unwrap_or(512.0);

        let mut sides = [None; 6];
        for (side, suffix) in sides.iter_mut().zip(SkyParams::SUFFIXES) {
            let image = format!("{}{}", farbox, suffix);
            *side = self.textures.register_texture(&image, mipmaps);
            if side.is_none() {
                warn!("Material '{}' is missing sky image '{}'", name, image);
            }
        }

        Some(SkyParams { sides, cloud_height })
    }
}

// A material that blends in its first stage sorts with the blended surfaces and
// only writes depth on request; anything else is opaque.
fn apply_derived_defaults(material: &mut Material, explicit_sort: Option<f32>) {
    let depth_requested = material.stages.iter().any(|stage| stage.depth_write);
    let blends = material
        .stages
        .first()
        .map(|stage| stage.blend.is_blending())
        .unwrap_or(false);

    if blends {
        material.sort = explicit_sort.unwrap_or(sort::ADDITIVE);
        material.depth_write = depth_requested;
    } else {
        material.sort = explicit_sort.unwrap_or(sort::OPAQUE);
        material.depth_write = true;
    }
}

fn blend_factor(name: &str, token: Option<&str>) -> BlendFactor {
    let token = token.unwrap_or_default();
    BlendFactor::from_token(token).unwrap_or_else(|| {
        warn!("Material '{}' requested invalid blend factor '{}', defaulting to GL_ONE", name, token);
        BlendFactor::One
    })
}

fn waveform(name: &str, token: &str) -> Waveform {
    Waveform::from_token(token).unwrap_or_else(|| {
        warn!("Material '{}' requested invalid waveform '{}', defaulting to random", name, token);
        Waveform::Random
    })
}

// Reads `<waveform> <base> <amplitude> <phase> <frequency>`. A missing or
// malformed parameter drops the rest of the line.
fn parse_wave(name: &str, directive: &str, lexer: &mut Lexer<'_>) -> Option<WaveParams> {
    let Some(func) = lexer.next_arg() else {
        warn!("Material '{}' is missing {} wave parameter 'waveform'", name, directive);
        return None;
    };
    let waveform = waveform(name, func);

    let mut values = [0.0f32; 4];
    for (value, param) in values.iter_mut().zip(["base", "amplitude", "phase", "frequency"]) {
        match lexer.next_arg().and_then(|token| token.parse().ok()) {
            Some(v) => *value = v,
            None => {
                warn!("Material '{}' is missing {} wave parameter '{}'", name, directive, param);
                lexer.rest_of_line();
                return None;
            }
        }
    }

    let [base, amplitude, phase, frequency] = values;
    Some(WaveParams::new(waveform, base, amplitude, phase, frequency))
}

// `( a b c )`
fn parse_vector<const N: usize>(lexer: &mut Lexer<'_>) -> Option<[f32; N]> {
    if lexer.next_arg()? != "(" {
        return None;
    }
    let mut out = [0.0; N];
    for value in out.iter_mut() {
        *value = lexer.next_arg()?.parse().ok()?;
    }
    if lexer.next_arg()? != ")" {
        return None;
    }
    Some(out)
}

fn parse_rgb_gen(name: &str, lexer: &mut Lexer<'_>) -> Option<ColorGen> {
    let kind = lexer.next_arg().unwrap_or_default();
    let gen = match kind.to_ascii_lowercase().as_str() {
        "const" => match parse_vector::<3>(lexer) {
            Some(color) => ColorGen::Constant(color),
            None => {
                warn!("Material '{}' has malformed rgbGen const color", name);
                lexer.rest_of_line();
                return None;
            }
        },
        "identity" => ColorGen::Constant([1.0; 3]),
        "vertex" => ColorGen::Vertex,
        "wave" => ColorGen::Wave(parse_wave(name, "rgbGen", lexer)?),
        _ => {
            warn!("Material '{}' has unknown/invalid rgbGen '{}'", name, kind);
            lexer.rest_of_line();
            return None;
        }
    };
    Some(gen)
}

fn parse_alpha_gen(name: &str, lexer: &mut Lexer<'_>) -> Option<AlphaGen> {
    let kind = lexer.next_arg().unwrap_or_default();
    let gen = match kind.to_ascii_lowercase().as_str() {
        "const" => match lexer.next_arg().and_then(|token| token.parse().ok()) {
            Some(alpha) => AlphaGen::Constant(alpha),
            None => {
                warn!("Material '{}' has malformed alphaGen const value", name);
                lexer.rest_of_line();
                return None;
            }
        },
        "identity" => AlphaGen::Constant(1.0),
        "vertex" => AlphaGen::Vertex,
        "wave" => AlphaGen::Wave(parse_wave(name, "alphaGen", lexer)?),
        _ => {
            warn!("Material '{}' has unknown/invalid alphaGen '{}'", name, kind);
            lexer.rest_of_line();
            return None;
        }
    };
    Some(gen)
}

fn numbers<const N: usize>(args: &[&str], params: [&'static str; N]) -> Result<[f32; N], &'static str> {
    let mut out = [0.0; N];
    for (i, param) in params.into_iter().enumerate() {
        out[i] = args.get(i).and_then(|token| token.parse().ok()).ok_or(param)?;
    }
    Ok(out)
}

/// Parse the arguments of one `tcMod` line. Unknown modifiers and missing
/// parameters are reported and yield `None`.
pub fn parse_tc_mod(name: &str, args: &[&str]) -> Option<TexMod> {
    let Some((kind, params)) = args.split_first() else {
        warn!("Material '{}' has tcMod without a modifier", name);
        return None;
    };

    let parsed = match kind.to_ascii_lowercase().as_str() {
        "turb" => numbers(params, ["base", "amplitude", "phase", "frequency"])
            .map(|[base, amp, phase, freq]| TexMod::Turb(WaveParams::new(Waveform::Sine, base, amp, phase, freq))),
        "scale" => numbers(params, ["s", "t"]).map(|[s, t]| TexMod::Scale { s, t }),
        "scroll" => numbers(params, ["s", "t"]).map(|[s, t]| TexMod::Scroll { s, t }),
        "stretch" => match params.split_first() {
            Some((func, rest)) => numbers(rest, ["base", "amplitude", "phase", "frequency"])
                .map(|[base, amp, phase, freq]| {
                    TexMod::Stretch(WaveParams::new(waveform(name, func), base, amp, phase, freq))
                }),
            None => Err("waveform"),
        },
        "transform" => numbers(params, ["m00", "m01", "m10", "m11", "t0", "t1"])
            .map(|[m00, m01, m10, m11, t0, t1]| {
                TexMod::Transform(Mat3::new(
                    m00, m10, t0,
                    m01, m11, t1,
                    0.0, 0.0, 1.0,
                ))
            }),
        "rotate" => numbers(params, ["degrees per second"])
            .map(|[deg]| TexMod::Rotate { radians_per_sec: utils::deg_to_rad(deg) }),
        _ => {
            warn!("Material '{}' has unknown tcMod '{}'", name, kind);
            return None;
        }
    };

    match parsed {
        Ok(tc_mod) => Some(tc_mod),
        Err(param) => {
            warn!("Material '{}' is missing tcMod {} parameter '{}'", name, kind, param);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::material::types::TextureId;
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Images {
        known: HashMap<String, TextureId>,
    }

    impl Images {
        fn with(names: &[&str]) -> Self {
            let known = names
                .iter()
                .enumerate()
                .map(|(i, n)| (n.to_string(), TextureId(i as u32 + 1)))
                .collect();
            Self { known }
        }
    }

    impl TextureProvider for Images {
        fn register_texture(&mut self, name: &str, _mipmaps: bool) -> Option<TextureId> {
            self.known.get(name).copied()
        }
    }

    fn parse(images: &mut Images, src: &str) -> Result<Material, MaterialParseError> {
        MaterialParser::new(images, BlendFunc::REPLACE).parse("test", src, true)
    }

    #[test]
    fn test_single_line_material() {
        let mut images = Images::with(&["foo.tga"]);
        let material = parse(&mut images, "{ { map foo.tga } }").unwrap();
        assert_eq!(material.stages.len(), 1);
        assert_eq!(material.stages[0].diffuse, Some(TextureId(1)));
        assert_eq!(material.stages[0].blend, BlendFunc::REPLACE);
        assert!(material.depth_write);
        assert_eq!(material.sort, sort::OPAQUE);
    }

    #[test]
    fn test_full_stage_directives() {
        let mut images = Images::with(&["a.tga", "b.tga"]);
        let src = "{
            nopicmip
            {
                clampmap a.tga
                BLENDFUNC gl_src_alpha GL_ONE_MINUS_SRC_ALPHA
                rgbGen wave sin 0.5 0.5 0 2
                alphaGen const 0.25
                tcMod scroll 0.1 -0.2
                tcMod rotate 90
                glow
            }
            {
                map b.tga
                rgbGen const ( 0.2 0.4 0.6 )
            }
        }";
        let material = parse(&mut images, src).unwrap();
        assert!(!material.picmip);
        assert_eq!(material.stages.len(), 2);

        let first = &material.stages[0];
        assert!(first.clamp);
        assert!(first.glow);
        assert_eq!(first.blend, BlendFunc::ALPHA);
        assert_eq!(first.rgb_gen, ColorGen::Wave(WaveParams::new(Waveform::Sine, 0.5, 0.5, 0.0, 2.0)));
        assert_eq!(first.alpha_gen, AlphaGen::Constant(0.25));
        assert_eq!(first.tc_mods.len(), 2);
        match first.tc_mods[1] {
            TexMod::Rotate { radians_per_sec } => assert_relative_eq!(radians_per_sec, std::f32::consts::FRAC_PI_2),
            other => panic!("unexpected modifier {:?}", other),
        }

        assert_eq!(material.stages[1].rgb_gen, ColorGen::Constant([0.2, 0.4, 0.6]));
        // First stage blends and no stage asked for depth writes
        assert_eq!(material.sort, sort::ADDITIVE);
        assert!(!material.depth_write);
    }

    #[test]
    fn test_missing_wave_parameter_keeps_stage() {
        let mut images = Images::with(&["a.tga"]);
        let src = "{\n{\nmap a.tga\nrgbGen wave sin 1 0.5\ntcMod scale 2 2\n}\n}";
        let material = parse(&mut images, src).unwrap();
        let stage = &material.stages[0];
        assert_eq!(stage.rgb_gen, ColorGen::Vertex);
        assert_eq!(stage.tc_mods, vec![TexMod::Scale { s: 2.0, t: 2.0 }]);
    }

    #[test]
    fn test_unknown_directives_are_skipped() {
        let mut images = Images::with(&["a.tga"]);
        let src = "{\nsurfaceparm nolightmap\n{\nmap a.tga\ntcGen environment\ntcMod wobble 1 2\nblendFunc GL_ONE GL_BOGUS\n}\nsort banner\n}";
        let material = parse(&mut images, src).unwrap();
        let stage = &material.stages[0];
        assert!(stage.tc_mods.is_empty());
        assert_eq!(stage.blend, BlendFunc::new(BlendFactor::One, BlendFactor::One));
        assert_eq!(material.sort, sort::BANNER);
    }

    #[test]
    fn test_structural_errors() {
        let mut images = Images::with(&["a.tga"]);
        assert!(matches!(parse(&mut images, "map a.tga"), Err(MaterialParseError::MissingOpenBrace { .. })));
        assert!(matches!(parse(&mut images, "{ sort 3"), Err(MaterialParseError::UnterminatedMaterial { .. })));
        assert!(matches!(parse(&mut images, "{ { map a.tga"), Err(MaterialParseError::UnterminatedStage { .. })));
        assert!(matches!(
            parse(&mut images, "{ { map missing.tga } }"),
            Err(MaterialParseError::MissingImage { ref image, .. }) if image == "missing.tga"
        ));
    }

    #[test]
    fn test_depth_write_on_blended_material() {
        let mut images = Images::with(&["a.tga"]);
        let src = "{\n{\nmap a.tga\nblendFunc GL_ONE GL_ONE\ndepthWrite\n}\n}";
        let material = parse(&mut images, src).unwrap();
        assert_eq!(material.sort, sort::ADDITIVE);
        assert!(material.depth_write);
    }

    #[test]
    fn test_sky_params() {
        let sides: Vec<String> = SkyParams::SUFFIXES.iter().map(|s| format!("env/space{}", s)).collect();
        let names: Vec<&str> = sides.iter().map(String::as_str).collect();
        let mut images = Images::with(&names);
        let material = parse(&mut images, "{\nskyParms env/space 512 -\n}").unwrap();
        let sky = material.sky.unwrap();
        assert!(sky.sides.iter().all(Option::is_some));
        assert_relative_eq!(sky.cloud_height, 512.0);

        let plain = parse(&mut images, "{\nskyParms - 512 -\n}").unwrap();
        assert!(!plain.is_sky());
    }

    #[test]
    fn test_transform_matrix_layout() {
        let tc_mod = parse_tc_mod("t", &["transform", "1", "2", "3", "4", "5", "6"]).unwrap();
        let TexMod::Transform(m) = tc_mod else { panic!("expected transform") };
        // s' = s*m00 + t*m10 + t0
        assert_eq!(m[(0, 0)], 1.0);
        assert_eq!(m[(0, 1)], 3.0);
        assert_eq!(m[(0, 2)], 5.0);
        assert_eq!(m[(1, 0)], 2.0);
        assert_eq!(m[(1, 1)], 4.0);
        assert_eq!(m[(1, 2)], 6.0);
    }

    #[test]
    fn test_tc_mod_missing_parameter() {
        assert!(parse_tc_mod("t", &["scroll", "1"]).is_none());
        assert!(parse_tc_mod("t", &["stretch"]).is_none());
        assert!(parse_tc_mod("t", &["turb", "0", "0.1", "0", "x"]).is_none());
        assert!(parse_tc_mod("t", &[]).is_none());
    }
}
