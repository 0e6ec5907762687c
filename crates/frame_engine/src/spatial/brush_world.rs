//! Axis-aligned brush world
//!
//! A world made of axis-aligned boxes ("brushes"), each with contents,
//! a surface name and flags, and optionally an owning entity. Box traces are
//! swept against every brush expanded by the traced box (Minkowski sum), so
//! a trace is a ray cast against slabs.
//!
//! Hits stop [`DIST_EPSILON`] short of the surface along its normal, so a
//! trace starting where another one ended is never considered inside.

use std::collections::HashSet;
use std::sync::Arc;

use nalgebra::Vector3;

use super::trace::{
    Aabb, ContentMask, EntityId, SurfaceFlags, TraceQuery, TraceResult, DIST_EPSILON,
};
use crate::foundation::math::Vec3;

/// Surface name given to brushes that do not set one
pub const DEFAULT_SURFACE: &str = "textures/base/wall";

/// One axis-aligned box of world geometry
#[derive(Debug, Clone, PartialEq)]
pub struct Brush {
    /// World-space bounds
    pub bounds: Aabb,
    /// Content class
    pub contents: ContentMask,
    /// Surface name
    pub surface_name: Arc<str>,
    /// Surface flags
    pub surface_flags: SurfaceFlags,
    /// Owning entity, for triggers and movers
    pub entity: Option<EntityId>,
}

impl Brush {
    /// Solid brush between two corners
    pub fn solid(mins: Vec3, maxs: Vec3) -> Self {
        Self {
            bounds: Aabb::new(mins, maxs),
            contents: ContentMask::SOLID,
            surface_name: Arc::from(DEFAULT_SURFACE),
            surface_flags: SurfaceFlags::empty(),
            entity: None,
        }
    }

    /// Trigger volume owned by `entity`
    pub fn trigger(mins: Vec3, maxs: Vec3, entity: EntityId) -> Self {
        Self::solid(mins, maxs)
            .with_contents(ContentMask::TRIGGER)
            .with_entity(entity)
    }

    /// Set the surface name and flags
    pub fn with_surface(mut self, name: &str, flags: SurfaceFlags) -> Self {
        self.surface_name = Arc::from(name);
        self.surface_flags = flags;
        self
    }

    /// Set the content class
    pub fn with_contents(mut self, contents: ContentMask) -> Self {
        self.contents = contents;
        self
    }

    /// Set the owning entity
    pub fn with_entity(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }
}

/// Brush soup implementing [`TraceQuery`]
#[derive(Debug, Clone, Default)]
pub struct BrushWorld {
    brushes: Vec<Brush>,
    damaging: HashSet<EntityId>,
}

impl BrushWorld {
    /// Create an empty world
    pub fn new() -> Self {
        Self::default()
    }

    /// Closed room: six slabs of `thickness` around the interior `mins..maxs`
    pub fn room(mins: Vec3, maxs: Vec3, thickness: f32) -> Self {
        let t = Vec3::repeat(thickness);
        let (outer_min, outer_max) = (mins - t, maxs + t);

        let mut world = Self::new();
        world
            .add_brush(Brush::solid(outer_min, Vec3::new(outer_max.x, outer_max.y, mins.z)))
            .add_brush(Brush::solid(Vec3::new(outer_min.x, outer_min.y, maxs.z), outer_max))
            .add_brush(Brush::solid(outer_min, Vec3::new(mins.x, outer_max.y, outer_max.z)))
            .add_brush(Brush::solid(Vec3::new(maxs.x, outer_min.y, outer_min.z), outer_max))
            .add_brush(Brush::solid(outer_min, Vec3::new(outer_max.x, mins.y, outer_max.z)))
            .add_brush(Brush::solid(Vec3::new(outer_min.x, maxs.y, outer_min.z), outer_max));
        world
    }

    /// Add a brush
    pub fn add_brush(&mut self, brush: Brush) -> &mut Self {
        self.brushes.push(brush);
        self
    }

    /// Mark an entity as hurting whoever touches it
    pub fn add_damaging_entity(&mut self, entity: EntityId) -> &mut Self {
        self.damaging.insert(entity);
        self
    }

    /// Every brush
    pub fn brushes(&self) -> &[Brush] {
        &self.brushes
    }
}

impl TraceQuery for BrushWorld {
    fn trace(&self, start: Vec3, bounds: &Aabb, end: Vec3, mask: ContentMask) -> TraceResult {
        let s = start.cast::<f64>();
        let delta = (end - start).cast::<f64>();

        let mut result = TraceResult::clear(end);
        let mut best = 1.0f64;

        for brush in self.brushes.iter().filter(|b| b.contents.intersects(mask)) {
            let lo = (brush.bounds.mins - bounds.maxs).cast::<f64>();
            let hi = (brush.bounds.maxs - bounds.mins).cast::<f64>();

            if strictly_inside(&s, &lo, &hi) {
                result.start_solid = true;
                result.contents |= brush.contents;
                result.entity = result.entity.or(brush.entity);
                if strictly_inside(&(s + delta), &lo, &hi) {
                    result.all_solid = true;
                    best = 0.0;
                }
                continue;
            }

            let Some((fraction, normal)) = sweep(&s, &delta, &lo, &hi) else {
                continue;
            };
            if fraction < best {
                best = fraction;
                result.normal = normal;
                result.contents = brush.contents;
                result.surface_flags = brush.surface_flags;
                result.surface_name = Some(brush.surface_name.clone());
                result.entity = brush.entity;
            }
        }

        if best < 1.0 {
            result.fraction = best as f32;
            result.end = (s + delta * best).cast::<f32>();
        }
        result
    }

    fn entity_damages(&self, entity: EntityId) -> bool {
        self.damaging.contains(&entity)
    }
}

fn strictly_inside(p: &Vector3<f64>, lo: &Vector3<f64>, hi: &Vector3<f64>) -> bool {
    (0..3).all(|i| p[i] > lo[i] && p[i] < hi[i])
}

// Slab test of the ray `s + t * d`, `t` in `[0, 1]`, against `lo..hi`.
// Returns the backed-off hit fraction and the entered face normal.
fn sweep(s: &Vector3<f64>, d: &Vector3<f64>, lo: &Vector3<f64>, hi: &Vector3<f64>) -> Option<(f64, Vec3)> {
    let mut enter = f64::NEG_INFINITY;
    let mut exit = f64::INFINITY;
    let mut axis = 0;

    for i in 0..3 {
        if d[i] == 0.0 {
            if s[i] <= lo[i] || s[i] >= hi[i] {
                return None;
            }
            continue;
        }

        let (near, far) = if d[i] > 0.0 {
            ((lo[i] - s[i]) / d[i], (hi[i] - s[i]) / d[i])
        } else {
            ((hi[i] - s[i]) / d[i], (lo[i] - s[i]) / d[i])
        };
        if near > enter {
            enter = near;
            axis = i;
        }
        exit = exit.min(far);
    }

    if enter >= exit || !(0.0..=1.0).contains(&enter) {
        return None;
    }

    let fraction = (enter - DIST_EPSILON as f64 / d[axis].abs()).max(0.0);
    let mut normal = Vec3::zeros();
    normal[axis] = if d[axis] > 0.0 { -1.0 } else { 1.0 };
    Some((fraction, normal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::trace::TRACE_INFINITY;
    use approx::assert_relative_eq;

    fn room() -> BrushWorld {
        BrushWorld::room(Vec3::new(-64.0, -64.0, 0.0), Vec3::new(64.0, 64.0, 128.0), 16.0)
    }

    fn down(from: Vec3) -> Vec3 {
        from - Vec3::new(0.0, 0.0, TRACE_INFINITY)
    }

    #[test]
    fn test_ray_hits_floor() {
        let world = room();
        let start = Vec3::new(0.0, 0.0, 64.0);
        let tr = world.trace(start, &Aabb::point(), down(start), ContentMask::PLAYER_SOLID);
        assert!(tr.hit());
        assert!(!tr.start_solid);
        assert_relative_eq!(tr.end.z, DIST_EPSILON, epsilon = 1e-4);
        assert_eq!(tr.normal, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(tr.surface_name.as_deref(), Some(DEFAULT_SURFACE));
    }

    #[test]
    fn test_box_rests_on_floor() {
        let world = room();
        let bounds = Aabb::new(Vec3::repeat(-8.0), Vec3::repeat(8.0));
        let start = Vec3::new(10.0, -20.0, 64.0);
        let tr = world.trace(start, &bounds, down(start), ContentMask::PLAYER_SOLID);
        assert_relative_eq!(tr.end.z, 8.0 + DIST_EPSILON, epsilon = 1e-4);
        assert_relative_eq!(tr.end.x, 10.0, epsilon = 1e-4);

        // Tracing again from where it stopped does not start solid
        let again = world.trace(tr.end, &bounds, down(tr.end), ContentMask::PLAYER_SOLID);
        assert!(!again.start_solid);
        assert_eq!(again.fraction, 0.0);
    }

    #[test]
    fn test_box_stops_at_wall() {
        let world = room();
        let bounds = Aabb::new(Vec3::repeat(-8.0), Vec3::repeat(8.0));
        let start = Vec3::new(0.0, 0.0, 64.0);
        let tr = world.trace(start, &bounds, start + Vec3::new(TRACE_INFINITY, 0.0, 0.0), ContentMask::PLAYER_SOLID);
        assert_relative_eq!(tr.end.x, 56.0 - DIST_EPSILON, epsilon = 1e-3);
        assert_eq!(tr.normal, Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_start_inside_solid() {
        let world = room();
        let start = Vec3::new(0.0, 0.0, -5.0);
        let tr = world.trace(start, &Aabb::point(), start, ContentMask::PLAYER_SOLID);
        assert!(tr.start_solid);
        assert!(tr.all_solid);
        assert_eq!(tr.fraction, 0.0);
    }

    #[test]
    fn test_mask_filters_contents() {
        let mut world = room();
        world.add_brush(
            Brush::solid(Vec3::new(-64.0, -64.0, 0.0), Vec3::new(64.0, 64.0, 32.0))
                .with_contents(ContentMask::WATER),
        );
        let start = Vec3::new(0.0, 0.0, 64.0);

        let solid_only = world.trace(start, &Aabb::point(), down(start), ContentMask::PLAYER_SOLID);
        assert_relative_eq!(solid_only.end.z, DIST_EPSILON, epsilon = 1e-4);

        let with_water = world.trace(start, &Aabb::point(), down(start), ContentMask::PLAYER_SOLID | ContentMask::WATER);
        assert_relative_eq!(with_water.end.z, 32.0 + DIST_EPSILON, epsilon = 1e-4);
        assert_eq!(with_water.contents, ContentMask::WATER);
    }

    #[test]
    fn test_sky_surface_reported() {
        let mut world = BrushWorld::new();
        world.add_brush(
            Brush::solid(Vec3::new(-64.0, -64.0, 128.0), Vec3::new(64.0, 64.0, 144.0))
                .with_surface("textures/skies/night", SurfaceFlags::SKY),
        );
        let start = Vec3::new(0.0, 0.0, 64.0);
        let tr = world.trace(start, &Aabb::point(), start + Vec3::new(0.0, 0.0, TRACE_INFINITY), ContentMask::PLAYER_SOLID);
        assert!(tr.surface_flags.contains(SurfaceFlags::SKY));
    }

    #[test]
    fn test_damaging_trigger() {
        let mut world = room();
        world
            .add_brush(Brush::trigger(Vec3::new(-16.0, -16.0, 0.0), Vec3::new(16.0, 16.0, 32.0), 7))
            .add_damaging_entity(7);

        let bounds = Aabb::new(Vec3::repeat(-4.0), Vec3::repeat(4.0));
        let inside = Vec3::new(0.0, 0.0, 8.0);
        let tr = world.trace(inside, &bounds, inside, ContentMask::TRIGGER);
        assert!(tr.start_solid);
        assert_eq!(tr.entity, Some(7));
        assert!(world.entity_damages(7));

        // Triggers are not solid to players
        let tr = world.trace(inside, &bounds, inside, ContentMask::PLAYER_SOLID);
        assert!(!tr.start_solid);
    }
}
