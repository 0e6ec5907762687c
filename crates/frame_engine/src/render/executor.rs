//! # Frame Executor
//!
//! Turns a finished [`Frame`] into backend calls.
//!
//! ## Passes
//!
//! For every finalized scene, in frame order:
//! - **Skybox**: stencil-write one id per sky material over its geometry,
//!   then draw the sky box once per id with a rotation-only projection
//! - **Geometry**: sorted batches, one draw per `(stage, mesh)`
//!
//! After every scene:
//! - **2D**: screen rectangles from finalized scenes and the frame overlay,
//!   one unit quad per stage in a 640x480 virtual screen
//! - **Debug**: optional wireframe of everything drawn, sorted by geometry
//!
//! Renderer state that the passes share (current color, UI flag, debug
//! list) lives in a [`FrameContext`] created per frame.

use log::{debug, warn};

use super::animator::{self, Color, WHITE};
use super::backend::{
    ClearFlags, PipelineState, Program, RenderBackend, StageBinding, StageUniforms, StencilState,
    WrapMode,
};
use super::batch::{batch_scene, BatchStats, DrawBatch, SortedBatches};
use super::error::RenderError;
use super::frame::{DrawCommand, Frame, SceneView, StretchPic};
use super::material::{BlendFactor, BlendFunc, Material, MaterialRegistry, Stage};
use super::model::{MeshId, ModelStore, WorldVisibility};
use crate::core::config::RendererConfig;
use crate::foundation::math::{Mat3, Mat3Ext, Mat4, Mat4Ext, Vec3};

/// Virtual screen width of the 2D pass
pub const SCREEN_WIDTH: f32 = 640.0;
/// Virtual screen height of the 2D pass
pub const SCREEN_HEIGHT: f32 = 480.0;

const NEAR_PLANE: f32 = 4.0;
const SKY_NEAR_PLANE: f32 = 0.125;
const SKY_FAR_PLANE: f32 = 8.0;
const MAX_STENCIL_ID: usize = 0xff;

/// Geometry of a debug overlay entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugGeometry {
    /// Backend mesh
    Mesh(MeshId),
    /// Screen rectangle
    UnitQuad,
}

/// One entry of the wireframe overlay
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugDraw {
    /// What was drawn
    pub geometry: DebugGeometry,
    /// Transform it was drawn with
    pub mvp: Mat4,
}

/// Per-frame renderer state threaded through every pass
#[derive(Debug, Clone)]
pub struct FrameContext {
    /// Frame time driving stage animation
    pub time: f32,
    /// Set while the 2D pass runs
    pub ui_draw: bool,
    /// Color handed to vertex-driven generators
    pub shader_color: Color,
    /// Everything drawn this frame, when the wireframe overlay is on
    pub debug_draws: Option<Vec<DebugDraw>>,
    /// Draws issued so far
    pub draw_calls: usize,
}

impl FrameContext {
    /// Fresh context for a frame at `time`
    pub fn new(time: f32, collect_debug: bool) -> Self {
        Self {
            time,
            ui_draw: false,
            shader_color: WHITE,
            debug_draws: collect_debug.then(Vec::new),
            draw_calls: 0,
        }
    }

    fn record_debug(&mut self, geometry: DebugGeometry, mvp: Mat4) {
        if let Some(list) = &mut self.debug_draws {
            list.push(DebugDraw { geometry, mvp });
        }
    }
}

/// Everything the executor reads besides the frame
#[derive(Clone, Copy)]
pub struct FrameResources<'a> {
    /// Materials
    pub registry: &'a MaterialRegistry,
    /// Models referenced by draw commands
    pub models: &'a ModelStore,
    /// World geometry, when a map is loaded
    pub world: Option<&'a dyn WorldVisibility>,
}

/// Statistics of one executed frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    /// Scenes rendered
    pub scenes_rendered: usize,
    /// Scenes dropped because they were never finalized
    pub scenes_skipped: usize,
    /// Draw calls issued, wireframe overlay included
    pub draw_calls: usize,
    /// Screen rectangles drawn
    pub pics_drawn: usize,
    /// Batching statistics summed over every scene
    pub batches: BatchStats,
}

/// Executes frames against a backend
#[derive(Debug, Clone)]
pub struct FrameExecutor {
    config: RendererConfig,
}

impl FrameExecutor {
    /// Create an executor
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Camera and sky box view-projections of a scene
    pub fn view_projections(&self, view: &SceneView) -> (Mat4, Mat4) {
        let cull = view.cull_distance.unwrap_or(self.config.cull_distance);
        let projection = Mat4::perspective_fov(view.fov_y, view.width, view.height, NEAR_PLANE, cull * 2.0);
        let view_projection = projection * Mat4::view_matrix(view.origin, view.angles);

        let sky_projection =
            Mat4::perspective_fov(view.fov_y, view.width, view.height, SKY_NEAR_PLANE, SKY_FAR_PLANE);
        let sky_view_projection = sky_projection * Mat4::view_rotation(view.angles);

        (view_projection, sky_view_projection)
    }

    /// Render every finalized scene, then the 2D and debug passes, then present
    pub fn execute(
        &self,
        frame: &Frame,
        time: f32,
        resources: FrameResources<'_>,
        backend: &mut dyn RenderBackend,
    ) -> Result<FrameStats, RenderError> {
        let mut ctx = FrameContext::new(time, self.config.debug_overlay_enabled());
        let mut stats = FrameStats::default();

        for scene in &frame.scenes {
            let view = match (&scene.view, scene.finalized) {
                (Some(view), true) => view,
                _ => {
                    stats.scenes_skipped += 1;
                    continue;
                }
            };

            let (view_projection, sky_view_projection) = self.view_projections(view);
            let sorted = batch_scene(
                scene,
                view,
                &view_projection,
                resources.models,
                resources.world,
                resources.registry,
            )?;

            self.skybox_pass(&mut ctx, &sorted.skyboxes, &sky_view_projection, resources.registry, backend)?;
            self.geometry_pass(&mut ctx, &sorted, resources, backend)?;

            accumulate(&mut stats.batches, &sorted.stats);
            stats.scenes_rendered += 1;
        }

        let pics: Vec<&StretchPic> = frame
            .finalized_scenes()
            .flat_map(|scene| scene.commands.iter())
            .filter_map(|command| match command {
                DrawCommand::StretchPic(pic) => Some(pic),
                DrawCommand::Model(_) => None,
            })
            .chain(frame.overlay.iter())
            .collect();
        stats.pics_drawn = self.screen_pass(&mut ctx, &pics, resources.registry, backend)?;

        self.debug_pass(&mut ctx, backend)?;

        backend.present()?;
        if self.config.draw_call_stats {
            debug!("{} draw calls", ctx.draw_calls);
        }
        stats.draw_calls = ctx.draw_calls;
        Ok(stats)
    }

    fn skybox_pass(
        &self,
        ctx: &mut FrameContext,
        skyboxes: &[DrawBatch],
        sky_view_projection: &Mat4,
        registry: &MaterialRegistry,
        backend: &mut dyn RenderBackend,
    ) -> Result<(), RenderError> {
        if skyboxes.is_empty() {
            return Ok(());
        }

        let skyboxes = if skyboxes.len() > MAX_STENCIL_ID {
            warn!("{} sky materials in one scene, drawing the first {}", skyboxes.len(), MAX_STENCIL_ID);
            &skyboxes[..MAX_STENCIL_ID]
        } else {
            skyboxes
        };

        backend.set_pipeline_state(
            &PipelineState::new()
                .with_depth(false, false)
                .with_cull(false)
                .with_stencil(Some(StencilState::write(1))),
        )?;
        backend.clear(ClearFlags::STENCIL)?;

        backend.bind_program(Program::SkyboxStencil)?;
        for (id, sky) in (1u32..).zip(skyboxes) {
            backend.set_stencil(&StencilState::write(id))?;
            for draw in &sky.meshes {
                backend.set_mvp(&draw.mvp)?;
                backend.draw_mesh(draw.mesh)?;
                ctx.draw_calls += 1;
                ctx.record_debug(DebugGeometry::Mesh(draw.mesh), draw.mvp);
            }
        }

        backend.bind_program(Program::Skybox)?;
        backend.set_mvp(sky_view_projection)?;
        for (id, sky) in (1u32..).zip(skyboxes) {
            let Some(params) = registry.get(sky.material).and_then(|m| m.sky.as_ref()) else {
                continue;
            };
            backend.set_stencil(&StencilState::test_equal(id))?;
            backend.bind_sky_textures(&params.sides)?;
            backend.draw_skybox()?;
            ctx.draw_calls += 1;
        }

        Ok(())
    }

    fn geometry_pass(
        &self,
        ctx: &mut FrameContext,
        sorted: &SortedBatches,
        resources: FrameResources<'_>,
        backend: &mut dyn RenderBackend,
    ) -> Result<(), RenderError> {
        let state = PipelineState::new();
        backend.set_pipeline_state(&state)?;
        backend.clear(ClearFlags::DEPTH | ClearFlags::STENCIL)?;
        backend.bind_program(Program::Stage)?;

        if let Some(lightmap) = resources.world.and_then(|world| world.lightmap()) {
            backend.bind_lightmap(lightmap)?;
        }

        for batch in &sorted.batches {
            let Some(material) = resources.registry.get(batch.material) else {
                continue;
            };
            backend.set_pipeline_state(&state.with_depth(true, material.depth_write))?;

            for stage in &material.stages {
                for draw in &batch.meshes {
                    let stage_state = animator::evaluate(stage, ctx.time, ctx.shader_color);
                    backend.bind_stage(&stage_binding(stage, &draw.mvp, &stage_state.uv, stage_state.color))?;
                    backend.draw_mesh(draw.mesh)?;
                    ctx.draw_calls += 1;
                }
            }

            for draw in &batch.meshes {
                ctx.record_debug(DebugGeometry::Mesh(draw.mesh), draw.mvp);
            }
        }

        Ok(())
    }

    fn screen_pass(
        &self,
        ctx: &mut FrameContext,
        pics: &[&StretchPic],
        registry: &MaterialRegistry,
        backend: &mut dyn RenderBackend,
    ) -> Result<usize, RenderError> {
        if pics.is_empty() {
            return Ok(0);
        }

        backend.set_pipeline_state(
            &PipelineState::new()
                .with_depth(false, false)
                .with_cull(false)
                .with_blend(Some(BlendFunc::ALPHA)),
        )?;
        backend.bind_program(Program::Stage)?;
        ctx.ui_draw = true;

        let ortho = Mat4::screen_ortho(SCREEN_WIDTH, SCREEN_HEIGHT);
        let mut drawn = 0;

        for pic in pics {
            let Some(material) = registry.get(pic.material) else {
                debug!("Skipping screen rectangle with unregistered material {}", pic.material.0);
                continue;
            };
            // Blank material
            if material.stages.is_empty() {
                continue;
            }

            let (mvp, uv) = pic_transforms(pic, &ortho);
            ctx.shader_color = pic.color;
            ctx.record_debug(DebugGeometry::UnitQuad, mvp);
            draw_quad_stages(ctx, material, &mvp, uv, backend)?;
            drawn += 1;
        }

        ctx.ui_draw = false;
        ctx.shader_color = WHITE;
        Ok(drawn)
    }

    fn debug_pass(&self, ctx: &mut FrameContext, backend: &mut dyn RenderBackend) -> Result<(), RenderError> {
        let Some(mut draws) = ctx.debug_draws.take() else {
            return Ok(());
        };
        if draws.is_empty() {
            return Ok(());
        }

        draws.sort_by_key(|draw| draw.geometry);

        let stencil = self.config.show_edges.then(StencilState::edge_thinning);
        backend.set_pipeline_state(
            &PipelineState::new()
                .with_depth(false, false)
                .with_cull(false)
                .with_lines(self.config.show_tris.max(1.0))
                .with_blend(Some(BlendFunc::new(BlendFactor::OneMinusDstColor, BlendFactor::Zero)))
                .with_stencil(stencil),
        )?;
        backend.clear(ClearFlags::STENCIL)?;
        backend.bind_program(Program::Line)?;

        for draw in &draws {
            backend.set_mvp(&draw.mvp)?;
            match draw.geometry {
                DebugGeometry::Mesh(mesh) => backend.draw_mesh(mesh)?,
                DebugGeometry::UnitQuad => backend.draw_unit_quad()?,
            }
            ctx.draw_calls += 1;
        }

        Ok(())
    }
}

/// Screen transform and base texture transform of a rectangle. A zero width
/// keeps the 4:3 aspect of the virtual screen.
pub fn pic_transforms(pic: &StretchPic, ortho: &Mat4) -> (Mat4, Mat3) {
    let w = if pic.w == 0.0 { pic.h * SCREEN_WIDTH / SCREEN_HEIGHT } else { pic.w };
    let model = Mat4::new_translation(&Vec3::new(pic.x, pic.y, 0.0))
        * Mat4::new_nonuniform_scaling(&Vec3::new(w, pic.h, 1.0));
    let uv = Mat3::uv_translate(pic.s1, pic.t1) * Mat3::uv_scale(pic.s2 - pic.s1, pic.t2 - pic.t1);
    (ortho * model, uv)
}

fn draw_quad_stages(
    ctx: &mut FrameContext,
    material: &Material,
    mvp: &Mat4,
    base_uv: Mat3,
    backend: &mut dyn RenderBackend,
) -> Result<(), RenderError> {
    for stage in &material.stages {
        let state = animator::evaluate_with_uv(stage, ctx.time, ctx.shader_color, base_uv);
        backend.bind_stage(&stage_binding(stage, mvp, &state.uv, state.color))?;
        backend.draw_unit_quad()?;
        ctx.draw_calls += 1;
    }
    Ok(())
}

fn stage_binding(stage: &Stage, mvp: &Mat4, uv: &Mat3, color: Color) -> StageBinding {
    StageBinding {
        texture: stage.diffuse,
        blend: stage.blend,
        wrap: if stage.clamp { WrapMode::ClampToBorder } else { WrapMode::Repeat },
        uniforms: StageUniforms::new(mvp, uv, color),
    }
}

fn accumulate(total: &mut BatchStats, scene: &BatchStats) {
    total.total_draws += scene.total_draws;
    total.batch_count += scene.batch_count;
    total.sky_count += scene.sky_count;
    total.skipped_draws += scene.skipped_draws;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::material::MaterialHandle;
    use approx::assert_relative_eq;

    fn pic(w: f32) -> StretchPic {
        StretchPic {
            x: 10.0,
            y: 20.0,
            w,
            h: 48.0,
            s1: 0.25,
            t1: 0.0,
            s2: 0.75,
            t2: 0.5,
            material: MaterialHandle::DEFAULT,
            color: WHITE,
        }
    }

    #[test]
    fn test_pic_transforms() {
        let (model, uv) = pic_transforms(&pic(32.0), &Mat4::identity());
        let far_corner = model.transform_point(&crate::foundation::math::Point3::new(1.0, 1.0, 0.0));
        assert_relative_eq!(far_corner.x, 42.0, epsilon = 1e-5);
        assert_relative_eq!(far_corner.y, 68.0, epsilon = 1e-5);

        let corner = uv.apply_uv(1.0, 1.0);
        assert_relative_eq!(corner.x, 0.75, epsilon = 1e-6);
        assert_relative_eq!(corner.y, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_width_keeps_aspect() {
        let (model, _) = pic_transforms(&pic(0.0), &Mat4::identity());
        assert_relative_eq!(model[(0, 0)], 64.0, epsilon = 1e-5);
    }

    #[test]
    fn test_far_plane_follows_cull_distance() {
        let executor = FrameExecutor::new(RendererConfig::new().with_cull_distance(100.0));
        let (near_cull, _) = executor.view_projections(&SceneView::default());
        let (far_cull, sky) = executor.view_projections(&SceneView::default().with_cull_distance(1000.0));
        assert_ne!(near_cull, far_cull);

        // Sky box projection ignores the camera position
        let moved = SceneView::default().with_camera(Vec3::new(100.0, -50.0, 30.0), [0.0; 3]);
        assert_eq!(executor.view_projections(&moved).1, sky);
    }

    #[test]
    fn test_debug_geometry_orders_meshes_first() {
        let mut draws = [DebugGeometry::UnitQuad, DebugGeometry::Mesh(MeshId(7)), DebugGeometry::Mesh(MeshId(2))];
        draws.sort();
        assert_eq!(draws, [DebugGeometry::Mesh(MeshId(2)), DebugGeometry::Mesh(MeshId(7)), DebugGeometry::UnitQuad]);
    }
}
