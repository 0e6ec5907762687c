//! # Unified Configuration System
//!
//! Typed configuration records for every subsystem, loadable from TOML or RON
//! through the [`Config`] trait.
//!
//! ## Configuration Categories
//!
//! - **Engine Config**: logging
//! - **Renderer Config**: culling, debug overlays, default stage blending
//! - **Pathfinder Config**: placement search limits and social distancing
//! - **Application Config**: the top-level record holding all of the above

use serde::{Serialize, Deserialize};

pub use crate::config::{Config, ConfigError};
use crate::render::material::BlendFactor;

/// # Engine Configuration
///
/// Core engine behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Default log filter (`error`, `warn`, `info`, `debug`, `trace`), used
    /// when `RUST_LOG` is unset
    pub log_level: String,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.log_level.to_ascii_lowercase().as_str() {
            "off" | "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
            other => Err(ConfigError::Invalid(format!("unknown log level '{}'", other))),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Renderer Configuration
///
/// Settings consumed by the frame executor and the material registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Default culling distance for scenes that do not set their own.
    /// The far plane sits at twice this distance.
    pub cull_distance: f32,
    /// Wireframe overlay line width; `0` disables the overlay
    pub show_tris: f32,
    /// Draw only outer edges in the wireframe overlay (stencil thinning)
    pub show_edges: bool,
    /// Log per-frame draw call counts
    pub draw_call_stats: bool,
    /// Blend pair given to stages that do not declare `blendFunc`
    pub default_blend: (BlendFactor, BlendFactor),
}

impl RendererConfig {
    /// Create a new renderer configuration
    pub fn new() -> Self {
        Self {
            cull_distance: 4096.0,
            show_tris: 0.0,
            show_edges: false,
            draw_call_stats: false,
            default_blend: (BlendFactor::One, BlendFactor::Zero),
        }
    }

    /// Set the default culling distance
    pub fn with_cull_distance(mut self, distance: f32) -> Self {
        self.cull_distance = distance;
        self
    }

    /// Enable the wireframe overlay with the given line width
    pub fn with_show_tris(mut self, line_width: f32) -> Self {
        self.show_tris = line_width;
        self
    }

    /// Restrict the wireframe overlay to outer edges
    pub fn with_show_edges(mut self, enabled: bool) -> Self {
        self.show_edges = enabled;
        self
    }

    /// Enable per-frame draw call logging
    pub fn with_draw_call_stats(mut self, enabled: bool) -> Self {
        self.draw_call_stats = enabled;
        self
    }

    /// Set the default stage blend pair
    pub fn with_default_blend(mut self, src: BlendFactor, dst: BlendFactor) -> Self {
        self.default_blend = (src, dst);
        self
    }

    /// Whether the wireframe overlay runs at all
    pub fn debug_overlay_enabled(&self) -> bool {
        self.show_tris > 0.0 || self.show_edges
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cull_distance > 4.0) {
            return Err(ConfigError::Invalid(
                "cull distance must lie beyond the near plane (4 units)".to_string(),
            ));
        }
        if self.show_tris < 0.0 {
            return Err(ConfigError::Invalid("show_tris cannot be negative".to_string()));
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Pathfinder Configuration
///
/// Limits and thresholds for the placement search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathfinderConfig {
    /// Also score the two diagonal axes
    pub intercardinal: bool,
    /// Byte cap of the prospect pool
    pub buffer_bytes: usize,
    /// Minimum distance between placements approved in the same call
    pub social_distance_intra: f32,
    /// Minimum distance to placements approved in earlier calls
    pub social_distance_inter: f32,
    /// Consecutive short steps before a walker resets to the start point
    pub stuck_limit: usize,
    /// Shortest step a walker accepts
    pub min_step: f32,
    /// Lower bound of the fraction of a step actually taken
    pub step_lerp_min: f32,
    /// Upper bound of the fraction of a step actually taken
    pub step_lerp_max: f32,
}

impl PathfinderConfig {
    /// Create a new pathfinder configuration
    pub fn new() -> Self {
        Self {
            intercardinal: false,
            buffer_bytes: 1024 * 1024,
            social_distance_intra: 256.0,
            social_distance_inter: 128.0,
            stuck_limit: 32,
            min_step: 32.0,
            step_lerp_min: 0.4,
            step_lerp_max: 0.9,
        }
    }

    /// Enable diagonal scoring
    pub fn with_intercardinal(mut self, enabled: bool) -> Self {
        self.intercardinal = enabled;
        self
    }

    /// Set the prospect pool byte cap
    pub fn with_buffer_bytes(mut self, bytes: usize) -> Self {
        self.buffer_bytes = bytes;
        self
    }

    /// Set both social distancing thresholds
    pub fn with_social_distance(mut self, intra: f32, inter: f32) -> Self {
        self.social_distance_intra = intra;
        self.social_distance_inter = inter;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.social_distance_intra < 0.0 || self.social_distance_inter < 0.0 {
            return Err(ConfigError::Invalid("social distances cannot be negative".to_string()));
        }
        if self.stuck_limit == 0 {
            return Err(ConfigError::Invalid("stuck limit must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.step_lerp_min)
            || !(0.0..=1.0).contains(&self.step_lerp_max)
            || self.step_lerp_min >= self.step_lerp_max
        {
            return Err(ConfigError::Invalid(
                "step lerp range must be an increasing range within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration that encompasses all engine subsystems.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Engine core configuration
    pub engine: EngineConfig,
    /// Rendering configuration
    pub renderer: RendererConfig,
    /// Placement search configuration
    pub pathfinder: PathfinderConfig,
}

impl ApplicationConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.renderer.validate()?;
        self.pathfinder.validate()?;
        Ok(())
    }
}

impl Config for ApplicationConfig {}
