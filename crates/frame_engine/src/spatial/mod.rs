//! Spatial queries against world geometry
//!
//! Provides the box trace interface used by the placement search and an
//! axis-aligned brush world implementing it.

pub mod brush_world;
pub mod trace;

pub use brush_world::{Brush, BrushWorld};
pub use trace::{
    is_forbidden_surface, Aabb, ContentMask, EntityId, SurfaceFlags, TraceQuery, TraceResult,
    DIST_EPSILON, TRACE_INFINITY,
};
