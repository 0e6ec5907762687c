//! Box trace query interface
//!
//! The placement search senses world geometry only through
//! [`TraceQuery::trace`]: sweep an axis-aligned box from a start point toward
//! an end point and report where it stopped and what it hit.

use std::sync::Arc;

use bitflags::bitflags;

use crate::foundation::math::Vec3;

/// Distance used for "trace until something is hit"
pub const TRACE_INFINITY: f32 = 16_777_216.0;

/// Gap kept between a stopped box and the surface it hit
pub const DIST_EPSILON: f32 = 0.03125;

/// Surfaces that only exist to seal or clip the map. Hitting one means the
/// trace is outside the playable space.
pub const FORBIDDEN_SURFACES: [&str; 4] = [
    "textures/common/caulk",
    "textures/system/caulk",
    "textures/system/clip",
    "textures/system/physics_clip",
];

/// Whether `name` is a map-sealing surface, ignoring case
pub fn is_forbidden_surface(name: &str) -> bool {
    FORBIDDEN_SURFACES.iter().any(|forbidden| forbidden.eq_ignore_ascii_case(name))
}

bitflags! {
    /// Content classes of brushes, used as trace masks
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ContentMask: u32 {
        /// Solid world geometry
        const SOLID = 1 << 0;
        /// Lava volumes
        const LAVA = 1 << 3;
        /// Slime volumes
        const SLIME = 1 << 4;
        /// Water volumes
        const WATER = 1 << 5;
        /// Invisible player-only clip
        const PLAYER_CLIP = 1 << 16;
        /// Entity bodies
        const BODY = 1 << 25;
        /// Trigger volumes
        const TRIGGER = 1 << 30;

        /// Everything a player collides with
        const PLAYER_SOLID = Self::SOLID.bits() | Self::PLAYER_CLIP.bits() | Self::BODY.bits();
    }
}

bitflags! {
    /// Surface properties reported by a trace hit
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SurfaceFlags: u32 {
        /// Open sky
        const SKY = 1 << 2;
        /// No impact marks
        const NO_IMPACT = 1 << 4;
        /// Never drawn
        const NO_DRAW = 1 << 7;
    }
}

/// Entity identifier reported by traces
pub type EntityId = u32;

/// Axis-aligned box relative to a trace origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub mins: Vec3,
    /// Maximum corner
    pub maxs: Vec3,
}

impl Aabb {
    /// Create a box from its corners
    pub fn new(mins: Vec3, maxs: Vec3) -> Self {
        Self { mins, maxs }
    }

    /// Zero-size box; traces with it are ray casts
    pub fn point() -> Self {
        Self::new(Vec3::zeros(), Vec3::zeros())
    }

    /// Box scaled about the origin
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(self.mins * factor, self.maxs * factor)
    }

    /// Centre of the box
    pub fn center(&self) -> Vec3 {
        (self.mins + self.maxs) * 0.5
    }

    /// Height along Z
    pub fn height(&self) -> f32 {
        self.maxs.z - self.mins.z
    }

    /// Zero-width column through the horizontal centre, keeping the height
    pub fn center_column(&self) -> Self {
        let c = self.center();
        Self::new(Vec3::new(c.x, c.y, self.mins.z), Vec3::new(c.x, c.y, self.maxs.z))
    }

    /// Zero-width column at the origin, keeping the height
    pub fn vertical_span(&self) -> Self {
        Self::new(Vec3::new(0.0, 0.0, self.mins.z), Vec3::new(0.0, 0.0, self.maxs.z))
    }

    /// Whether the two boxes overlap, touching included
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.mins.x <= other.maxs.x && self.maxs.x >= other.mins.x &&
        self.mins.y <= other.maxs.y && self.maxs.y >= other.mins.y &&
        self.mins.z <= other.maxs.z && self.maxs.z >= other.mins.z
    }
}

/// Outcome of a box trace
#[derive(Debug, Clone, PartialEq)]
pub struct TraceResult {
    /// Fraction of the move completed, `1.0` if nothing was hit
    pub fraction: f32,
    /// Where the box stopped
    pub end: Vec3,
    /// Normal of the surface hit; zero if nothing was hit
    pub normal: Vec3,
    /// The box started inside matching contents
    pub start_solid: bool,
    /// The box never left matching contents
    pub all_solid: bool,
    /// Contents of what was hit
    pub contents: ContentMask,
    /// Flags of the surface hit
    pub surface_flags: SurfaceFlags,
    /// Name of the surface hit
    pub surface_name: Option<Arc<str>>,
    /// Entity owning what was hit or started in
    pub entity: Option<EntityId>,
}

impl TraceResult {
    /// A trace that reached `end` unobstructed
    pub fn clear(end: Vec3) -> Self {
        Self {
            fraction: 1.0,
            end,
            normal: Vec3::zeros(),
            start_solid: false,
            all_solid: false,
            contents: ContentMask::empty(),
            surface_flags: SurfaceFlags::empty(),
            surface_name: None,
            entity: None,
        }
    }

    /// Whether anything was hit
    pub fn hit(&self) -> bool {
        self.fraction < 1.0
    }
}

/// World geometry as seen by box traces. Implementations are read-only and
/// shared between placement workers.
pub trait TraceQuery: Send + Sync {
    /// Sweep `bounds` from `start` to `end` against contents in `mask`
    fn trace(&self, start: Vec3, bounds: &Aabb, end: Vec3, mask: ContentMask) -> TraceResult;

    /// Whether touching `entity` hurts
    fn entity_damages(&self, entity: EntityId) -> bool;
}
