//! # Frame Engine
//!
//! Frame-rendering pipeline for a 3D engine with scripted materials, plus an
//! entity placement search over world geometry.
//!
//! ## Features
//!
//! - **Materials**: text-defined multi-stage materials behind stable handles
//! - **Stage Animation**: waveform colors and texture-coordinate modifiers
//! - **Frame Recording**: per-frame command buffer with a strict lifecycle
//! - **Batching**: material-grouped, sort-key ordered draw lists
//! - **Passes**: skybox stencil, geometry, 2D overlay and debug wireframe
//! - **Placement**: parallel random-walk search for entity spawn points
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use frame_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     frame_engine::foundation::logging::init_with_level("info");
//!
//!     let library = MaterialLibrary::parse("hud/crosshair\n{\n}\n");
//!     let mut renderer = Renderer::new(
//!         RendererConfig::default(),
//!         RecordingBackend::new(),
//!         library,
//!         Box::new(NoTextures),
//!     )?;
//!
//!     let crosshair = renderer.register_material("hud/crosshair");
//!     renderer.begin_frame();
//!     renderer.draw_stretch_pic(312.0, 232.0, 16.0, 16.0, 0.0, 0.0, 1.0, 1.0, crosshair)?;
//!     renderer.end_frame(0.0)?;
//!     Ok(())
//! }
//!
//! struct NoTextures;
//!
//! impl TextureProvider for NoTextures {
//!     fn register_texture(&mut self, _name: &str, _mipmaps: bool) -> Option<TextureId> {
//!         None
//!     }
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod placement;
pub mod render;
pub mod spatial;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{ApplicationConfig, Config, EngineConfig, PathfinderConfig, RendererConfig},
        foundation::{
            math::{Mat3, Mat4, Vec3},
            time::{Deadline, Timer},
        },
        placement::{EggConcept, EntityDesc, EntityHost, Pathfinder, TaskQueue},
        render::{
            FrameStats, MaterialHandle, MaterialLibrary, ModelId, RecordingBackend, RenderBackend,
            RenderError, Renderer, SceneView, TextureId, TextureProvider,
        },
        spatial::{Aabb, BrushWorld, TraceQuery},
    };
}
