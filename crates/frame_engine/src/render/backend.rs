//! Backend abstraction for the frame executor
//!
//! The executor drives a graphics API through [`RenderBackend`]: fixed
//! pipeline state, a handful of programs, per-stage uniforms and draws of
//! backend-owned meshes. [`RecordingBackend`] implements the trait by
//! recording every call, which is what the tests and the demo run against.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

use super::error::{BackendResult, RenderError};
use super::material::{BlendFunc, TextureId};
use super::model::MeshId;
use crate::foundation::math::{Mat3, Mat4};

bitflags! {
    /// Buffers cleared by [`RenderBackend::clear`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearFlags: u32 {
        /// Color buffer
        const COLOR = 1 << 0;
        /// Depth buffer
        const DEPTH = 1 << 1;
        /// Stencil buffer
        const STENCIL = 1 << 2;
    }
}

/// Shader programs the executor binds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Program {
    /// Textured, color-modulated material stage
    Stage,
    /// Writes sky footprints into the stencil buffer
    SkyboxStencil,
    /// Six-sided sky box
    Skybox,
    /// Flat wireframe lines
    Line,
}

/// Stencil and depth comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareFunc {
    /// Always passes
    Always,
    /// Passes when equal to the reference
    Equal,
}

/// Stencil buffer update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilOp {
    /// Keep the current value
    Keep,
    /// Write the reference value
    Replace,
    /// Increment, clamping at the maximum
    Incr,
}

/// Rasterization mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonMode {
    /// Filled triangles
    Fill,
    /// Triangle edges only
    Line,
}

/// Texture addressing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    /// Tile
    Repeat,
    /// Transparent border outside `[0, 1]`
    ClampToBorder,
    /// Edge texels outside `[0, 1]`
    ClampToEdge,
}

/// Stencil test configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilState {
    /// Comparison against `reference`
    pub func: CompareFunc,
    /// Reference value
    pub reference: u32,
    /// Bits compared and written
    pub mask: u32,
    /// Stencil test failed
    pub fail: StencilOp,
    /// Stencil passed, depth failed
    pub depth_fail: StencilOp,
    /// Both passed
    pub pass: StencilOp,
}

impl StencilState {
    /// Write `reference` wherever geometry lands
    pub fn write(reference: u32) -> Self {
        Self {
            func: CompareFunc::Always,
            reference,
            mask: 0xff,
            fail: StencilOp::Replace,
            depth_fail: StencilOp::Replace,
            pass: StencilOp::Replace,
        }
    }

    /// Only draw where the stencil equals `reference`, leaving it unchanged
    pub fn test_equal(reference: u32) -> Self {
        Self {
            func: CompareFunc::Equal,
            reference,
            mask: 0xff,
            fail: StencilOp::Keep,
            depth_fail: StencilOp::Keep,
            pass: StencilOp::Keep,
        }
    }

    /// Draw each pixel once: pass on zero, then bump the low bit
    pub fn edge_thinning() -> Self {
        Self {
            func: CompareFunc::Equal,
            reference: 0,
            mask: 1,
            fail: StencilOp::Keep,
            depth_fail: StencilOp::Keep,
            pass: StencilOp::Incr,
        }
    }
}

/// Fixed-function pipeline state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineState {
    /// Depth testing
    pub depth_test: bool,
    /// Depth writes
    pub depth_write: bool,
    /// Stencil testing, when set
    pub stencil: Option<StencilState>,
    /// Blending, when set
    pub blend: Option<BlendFunc>,
    /// Back-face culling
    pub cull: bool,
    /// Rasterization mode
    pub polygon_mode: PolygonMode,
    /// Line width for [`PolygonMode::Line`]
    pub line_width: f32,
}

impl PipelineState {
    /// Filled, depth-tested, opaque, culled
    pub fn new() -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            stencil: None,
            blend: None,
            cull: true,
            polygon_mode: PolygonMode::Fill,
            line_width: 1.0,
        }
    }

    /// Set depth testing and writing
    pub fn with_depth(mut self, test: bool, write: bool) -> Self {
        self.depth_test = test;
        self.depth_write = write;
        self
    }

    /// Set the stencil test
    pub fn with_stencil(mut self, stencil: Option<StencilState>) -> Self {
        self.stencil = stencil;
        self
    }

    /// Set blending
    pub fn with_blend(mut self, blend: Option<BlendFunc>) -> Self {
        self.blend = blend;
        self
    }

    /// Set culling
    pub fn with_cull(mut self, cull: bool) -> Self {
        self.cull = cull;
        self
    }

    /// Switch to wireframe with the given line width
    pub fn with_lines(mut self, width: f32) -> Self {
        self.polygon_mode = PolygonMode::Line;
        self.line_width = width;
        self
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-stage uniform block, laid out for std140
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct StageUniforms {
    /// Model-view-projection, column major
    pub mvp: [[f32; 4]; 4],
    /// Texture-coordinate transform, column major, columns padded to vec4
    pub uv: [[f32; 4]; 3],
    /// Modulation color
    pub color: [f32; 4],
}

impl StageUniforms {
    /// Pack matrices and color
    pub fn new(mvp: &Mat4, uv: &Mat3, color: [f32; 4]) -> Self {
        let mut uv_cols = [[0.0; 4]; 3];
        for (c, col) in uv_cols.iter_mut().enumerate() {
            for (r, value) in col.iter_mut().take(3).enumerate() {
                *value = uv[(r, c)];
            }
        }

        let mut mvp_cols = [[0.0; 4]; 4];
        for (c, col) in mvp_cols.iter_mut().enumerate() {
            for (r, value) in col.iter_mut().enumerate() {
                *value = mvp[(r, c)];
            }
        }

        Self { mvp: mvp_cols, uv: uv_cols, color }
    }

    /// Raw bytes for upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Everything bound for one stage draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageBinding {
    /// Diffuse texture; `None` binds the backend's blank texture
    pub texture: Option<TextureId>,
    /// Stage blend pair
    pub blend: BlendFunc,
    /// Sampler addressing
    pub wrap: WrapMode,
    /// Uniforms
    pub uniforms: StageUniforms,
}

/// Main rendering backend trait
pub trait RenderBackend {
    /// Compile and link programs. Failure is fatal.
    fn initialize(&mut self) -> BackendResult<()> {
        Ok(())
    }

    /// Clear buffers
    fn clear(&mut self, flags: ClearFlags) -> BackendResult<()>;

    /// Apply pipeline state
    fn set_pipeline_state(&mut self, state: &PipelineState) -> BackendResult<()>;

    /// Change only the stencil test
    fn set_stencil(&mut self, stencil: &StencilState) -> BackendResult<()>;

    /// Bind a program
    fn bind_program(&mut self, program: Program) -> BackendResult<()>;

    /// Set the transform of programs without stage uniforms
    fn set_mvp(&mut self, mvp: &Mat4) -> BackendResult<()>;

    /// Bind a stage's texture, blending, sampler and uniforms
    fn bind_stage(&mut self, binding: &StageBinding) -> BackendResult<()>;

    /// Bind the six sky box sides, sampled clamp-to-edge
    fn bind_sky_textures(&mut self, sides: &[Option<TextureId>; 6]) -> BackendResult<()>;

    /// Bind the lightmap atlas
    fn bind_lightmap(&mut self, lightmap: TextureId) -> BackendResult<()>;

    /// Draw a backend mesh with the current state
    fn draw_mesh(&mut self, mesh: MeshId) -> BackendResult<()>;

    /// Draw the sky box cube
    fn draw_skybox(&mut self) -> BackendResult<()>;

    /// Draw the unit quad used for screen rectangles
    fn draw_unit_quad(&mut self) -> BackendResult<()>;

    /// Present the finished frame
    fn present(&mut self) -> BackendResult<()>;
}

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// [`RenderBackend::clear`]
    Clear(ClearFlags),
    /// [`RenderBackend::set_pipeline_state`]
    State(PipelineState),
    /// [`RenderBackend::set_stencil`]
    Stencil(StencilState),
    /// [`RenderBackend::bind_program`]
    Program(Program),
    /// [`RenderBackend::set_mvp`]
    Mvp(Mat4),
    /// [`RenderBackend::bind_stage`]
    Stage(StageBinding),
    /// [`RenderBackend::bind_sky_textures`]
    SkyTextures([Option<TextureId>; 6]),
    /// [`RenderBackend::bind_lightmap`]
    Lightmap(TextureId),
    /// [`RenderBackend::draw_mesh`]
    DrawMesh(MeshId),
    /// [`RenderBackend::draw_skybox`]
    DrawSkybox,
    /// [`RenderBackend::draw_unit_quad`]
    DrawUnitQuad,
    /// [`RenderBackend::present`]
    Present,
}

impl DrawOp {
    /// Whether this op submits geometry
    pub fn is_draw(&self) -> bool {
        matches!(self, DrawOp::DrawMesh(_) | DrawOp::DrawSkybox | DrawOp::DrawUnitQuad)
    }
}

/// Backend that records calls instead of talking to a GPU
#[derive(Debug, Default)]
pub struct RecordingBackend {
    ops: Vec<DrawOp>,
    frames_presented: u64,
    init_failure: Option<String>,
}

impl RecordingBackend {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Make [`RenderBackend::initialize`] fail, as a broken program link would
    pub fn with_init_failure(mut self, reason: impl Into<String>) -> Self {
        self.init_failure = Some(reason.into());
        self
    }

    /// Recorded calls since the last [`RecordingBackend::take_ops`]
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Drain recorded calls
    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }

    /// Number of recorded draws
    pub fn draw_count(&self) -> usize {
        self.ops.iter().filter(|op| op.is_draw()).count()
    }

    /// Number of presented frames
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}

impl RenderBackend for RecordingBackend {
    fn initialize(&mut self) -> BackendResult<()> {
        match &self.init_failure {
            Some(reason) => Err(RenderError::InitializationFailed(reason.clone())),
            None => Ok(()),
        }
    }

    fn clear(&mut self, flags: ClearFlags) -> BackendResult<()> {
        self.ops.push(DrawOp::Clear(flags));
        Ok(())
    }

    fn set_pipeline_state(&mut self, state: &PipelineState) -> BackendResult<()> {
        self.ops.push(DrawOp::State(*state));
        Ok(())
    }

    fn set_stencil(&mut self, stencil: &StencilState) -> BackendResult<()> {
        self.ops.push(DrawOp::Stencil(*stencil));
        Ok(())
    }

    fn bind_program(&mut self, program: Program) -> BackendResult<()> {
        self.ops.push(DrawOp::Program(program));
        Ok(())
    }

    fn set_mvp(&mut self, mvp: &Mat4) -> BackendResult<()> {
        self.ops.push(DrawOp::Mvp(*mvp));
        Ok(())
    }

    fn bind_stage(&mut self, binding: &StageBinding) -> BackendResult<()> {
        self.ops.push(DrawOp::Stage(*binding));
        Ok(())
    }

    fn bind_sky_textures(&mut self, sides: &[Option<TextureId>; 6]) -> BackendResult<()> {
        self.ops.push(DrawOp::SkyTextures(*sides));
        Ok(())
    }

    fn bind_lightmap(&mut self, lightmap: TextureId) -> BackendResult<()> {
        self.ops.push(DrawOp::Lightmap(lightmap));
        Ok(())
    }

    fn draw_mesh(&mut self, mesh: MeshId) -> BackendResult<()> {
        self.ops.push(DrawOp::DrawMesh(mesh));
        Ok(())
    }

    fn draw_skybox(&mut self) -> BackendResult<()> {
        self.ops.push(DrawOp::DrawSkybox);
        Ok(())
    }

    fn draw_unit_quad(&mut self) -> BackendResult<()> {
        self.ops.push(DrawOp::DrawUnitQuad);
        Ok(())
    }

    fn present(&mut self) -> BackendResult<()> {
        self.ops.push(DrawOp::Present);
        self.frames_presented += 1;
        Ok(())
    }
}
