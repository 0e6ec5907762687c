//! # Rendering System
//!
//! Frame-rendering pipeline: draw commands are recorded into a per-frame
//! buffer, resolved against the material registry, batched by material and
//! executed pass by pass against a [`RenderBackend`].
//!
//! ## Architecture
//!
//! - **Renderer**: host-facing façade owning every piece below
//! - **MaterialRegistry**: named materials behind stable handles
//! - **Animator**: per-stage color and texture-coordinate animation
//! - **FrameRecorder**: the frame command buffer and its lifecycle
//! - **Batcher**: material grouping and draw ordering
//! - **FrameExecutor**: skybox, geometry, 2D and debug passes
//! - **RenderBackend**: the graphics API seam

pub mod animator;
pub mod backend;
pub mod batch;
pub mod error;
pub mod executor;
pub mod frame;
pub mod material;
pub mod model;


pub use animator::{Color, StageState, WHITE};
pub use backend::{DrawOp, PipelineState, Program, RecordingBackend, RenderBackend, StageUniforms};
pub use batch::{BatchStats, Batcher, DrawBatch, DrawMesh, SortedBatches};
pub use error::{BackendResult, RenderError};
pub use executor::{FrameContext, FrameExecutor, FrameResources, FrameStats};
pub use frame::{DrawCommand, Frame, FrameRecorder, FrameState, ModelInstance, SceneFlags, SceneView, StretchPic};
pub use material::{
    Material, MaterialHandle, MaterialLibrary, MaterialRegistry, TextureId, TextureProvider,
};
pub use model::{MeshId, Model, ModelId, ModelKind, ModelStore, StaticWorld, Surface, WorldSurface, WorldVisibility};

use log::info;

use crate::core::config::RendererConfig;
use crate::foundation::math::Mat4;

/// Host-facing renderer
///
/// Owns the material registry, model store, frame recorder and executor, and
/// drives a backend `B`. One frame is recorded and executed per tick:
///
/// ```ignore
/// renderer.begin_frame();
/// renderer.add_model(model, transform)?;
/// renderer.render_scene(view)?;
/// renderer.draw_stretch_pic(0.0, 0.0, 64.0, 64.0, 0.0, 0.0, 1.0, 1.0, hud)?;
/// let stats = renderer.end_frame(time)?;
/// ```
pub struct Renderer<B: RenderBackend> {
    backend: B,
    registry: MaterialRegistry,
    models: ModelStore,
    world: Option<Box<dyn WorldVisibility>>,
    recorder: FrameRecorder,
    executor: FrameExecutor,
    color: Color,
}

impl<B: RenderBackend> Renderer<B> {
    /// Create a renderer. Fails if the backend cannot set up its programs.
    pub fn new(
        config: RendererConfig,
        mut backend: B,
        library: MaterialLibrary,
        textures: Box<dyn TextureProvider>,
    ) -> Result<Self, RenderError> {
        backend.initialize()?;

        let registry = MaterialRegistry::new(library, textures).with_default_blend(config.default_blend.into());
        info!(
            "Renderer initialized (cull distance {}, wireframe {})",
            config.cull_distance,
            config.debug_overlay_enabled()
        );

        Ok(Self {
            backend,
            registry,
            models: ModelStore::new(),
            world: None,
            recorder: FrameRecorder::new(),
            executor: FrameExecutor::new(config),
            color: WHITE,
        })
    }

    /// Resolve a material by name, creating it on first use
    pub fn register_material(&mut self, name: &str) -> MaterialHandle {
        self.registry.resolve(name)
    }

    /// Resolve a material whose images are loaded without mipmaps
    pub fn register_material_nomip(&mut self, name: &str) -> MaterialHandle {
        self.registry.resolve_with_mipmaps(name, false)
    }

    /// Release a material; its slot is recycled after the current frame
    pub fn release_material(&mut self, handle: MaterialHandle) {
        self.registry.release(handle);
    }

    /// Material registry
    pub fn materials(&self) -> &MaterialRegistry {
        &self.registry
    }

    /// Mutable material registry, for loading more descriptions
    pub fn materials_mut(&mut self) -> &mut MaterialRegistry {
        &mut self.registry
    }

    /// Add a model
    pub fn register_model(&mut self, model: Model) -> ModelId {
        self.models.insert(model)
    }

    /// Model store
    pub fn models(&self) -> &ModelStore {
        &self.models
    }

    /// Install or remove the world drawn behind every scene
    pub fn set_world(&mut self, world: Option<Box<dyn WorldVisibility>>) {
        self.world = world;
    }

    /// Start recording a frame
    pub fn begin_frame(&mut self) {
        self.recorder.begin_frame();
    }

    /// Finalize the open scene with its camera and open the next one
    pub fn render_scene(&mut self, view: SceneView) -> Result<(), RenderError> {
        self.recorder.finalize_scene(view)
    }

    /// Draw a model in the open scene
    pub fn add_model(&mut self, model: ModelId, transform: Mat4) -> Result<(), RenderError> {
        self.recorder.submit(DrawCommand::Model(ModelInstance { model, transform }))
    }

    /// Draw a screen rectangle over every scene, tinted by the current color
    #[allow(clippy::too_many_arguments)]
    pub fn draw_stretch_pic(
        &mut self,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        s1: f32,
        t1: f32,
        s2: f32,
        t2: f32,
        material: MaterialHandle,
    ) -> Result<(), RenderError> {
        self.recorder.submit_overlay(StretchPic {
            x,
            y,
            w,
            h,
            s1,
            t1,
            s2,
            t2,
            material,
            color: self.color,
        })
    }

    /// Color for subsequent screen rectangles; `None` resets to white
    pub fn set_color(&mut self, color: Option<Color>) {
        self.color = color.unwrap_or(WHITE);
    }

    /// Execute the recorded frame at `time` and present it.
    ///
    /// Released materials become reusable once the frame has been consumed.
    pub fn end_frame(&mut self, time: f32) -> Result<FrameStats, RenderError> {
        let frame = self.recorder.finish()?;

        let resources = FrameResources {
            registry: &self.registry,
            models: &self.models,
            world: self.world.as_deref(),
        };
        let stats = self.executor.execute(&frame, time, resources, &mut self.backend)?;

        self.recorder.mark_consumed()?;
        self.registry.recycle_released();
        Ok(stats)
    }

    /// Recorder lifecycle state
    pub fn frame_state(&self) -> FrameState {
        self.recorder.state()
    }

    /// Backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable backend
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
