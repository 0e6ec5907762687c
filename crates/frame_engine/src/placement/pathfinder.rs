//! # Placement Pathfinder
//!
//! Finds spots in the world to place entities described by an
//! [`EggConcept`], then places a requested number of them.
//!
//! ## Architecture
//!
//! - **explore**: parallel random walkers sample floor locations reachable
//!   from a start point, score them and append them to a shared prospect pool
//! - **score_location**: box traces measure ceiling and wall distances around
//!   a spot; lower scores are tighter spots and are placed first
//! - **spawn_eggs**: walks the sorted pool, enforces group-aware minimum
//!   separation and a few sanity checks, and queues entity creation on the
//!   host's [`TaskQueue`]
//!
//! The pool is the only shared mutable state during exploration. It sits
//! behind one mutex whose critical section is the capacity check and append.

use std::mem::size_of;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;
use rand::Rng;

use super::concept::EggConcept;
use super::tasks::{EntityHost, TaskQueue};
use crate::core::config::PathfinderConfig;
use crate::foundation::math::{constants::axes, Vec3};
use crate::foundation::time::Deadline;
use crate::spatial::{is_forbidden_surface, Aabb, ContentMask, SurfaceFlags, TraceQuery, TRACE_INFINITY};

/// Score of a location that must never be used
pub const INVALID_SCORE: f32 = TRACE_INFINITY;

// Locations are scored slightly above where the box settled
const SCORE_HEIGHT_OFFSET: f32 = 0.5;
// Ceiling clearance counts three times as much as wall clearance
const CEILING_WEIGHT: f32 = 3.0;
const BOOMERANG_TOLERANCE: f32 = 0.1;

/// A scored candidate location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prospect {
    /// Origin for the placed entity
    pub location: Vec3,
    /// Lower is tighter
    pub score: f32,
    /// Failed a placement check; never considered again
    pub rejected: bool,
}

impl Prospect {
    /// Unrejected prospect
    pub fn new(location: Vec3, score: f32) -> Self {
        Self { location, score, rejected: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Ledge,
    DamagingTrigger,
    Anomaly,
}

/// Placement search state for one concept
pub struct Pathfinder {
    concept: EggConcept,
    config: PathfinderConfig,
    prospects: Vec<Prospect>,
    approved: Vec<(u32, Prospect)>,
    spawn_group: u32,
    locations_scored: u64,
    tasks: Arc<TaskQueue>,
}

impl Pathfinder {
    /// Create a pathfinder placing `concept`, queueing entity creation on `tasks`
    pub fn new(concept: EggConcept, config: PathfinderConfig, tasks: Arc<TaskQueue>) -> Self {
        Self {
            concept,
            config,
            prospects: Vec::new(),
            approved: Vec::new(),
            spawn_group: 0,
            locations_scored: 0,
            tasks,
        }
    }

    /// Concept being placed
    pub fn concept(&self) -> &EggConcept {
        &self.concept
    }

    /// Active configuration
    pub fn config(&self) -> &PathfinderConfig {
        &self.config
    }

    /// Prospect pool, sorted by ascending score after exploration
    pub fn prospects(&self) -> &[Prospect] {
        &self.prospects
    }

    /// Approved placements with the group they were approved in
    pub fn approved(&self) -> &[(u32, Prospect)] {
        &self.approved
    }

    /// Group number the next `spawn_eggs` call approves into
    pub fn spawn_group(&self) -> u32 {
        self.spawn_group
    }

    /// Most prospects the pool may hold
    pub fn capacity(&self) -> usize {
        self.config.buffer_bytes / size_of::<Prospect>()
    }

    /// Run `divisions` random walkers from `start` until `budget` has passed.
    ///
    /// Returns the number of prospects added. The pool never grows past
    /// [`Pathfinder::capacity`]; reaching it logs a warning.
    pub fn explore(&mut self, world: &dyn TraceQuery, start: Vec3, divisions: usize, budget: Duration) -> usize {
        let old_count = self.prospects.len();
        let capacity = self.capacity();

        let pool = Mutex::new(std::mem::take(&mut self.prospects));
        let scored = AtomicU64::new(0);
        let walker = Walker {
            world,
            bounds: self.concept.bounds,
            config: &self.config,
            start,
            deadline: Deadline::after(budget),
            pool: &pool,
            capacity,
            scored: &scored,
        };

        std::thread::scope(|scope| {
            for _ in 0..divisions {
                scope.spawn(|| walker.run(&mut rand::thread_rng()));
            }
        });

        self.prospects = pool.into_inner();
        self.locations_scored += scored.into_inner();

        if self.prospects.len() >= capacity {
            warn!(
                "Prospect buffer limit reached ({} bytes), cull the list and try again or raise the limit",
                self.config.buffer_bytes
            );
        }

        self.prospects.sort_by(|a, b| a.score.total_cmp(&b.score));

        let added = self.prospects.len() - old_count;
        info!(
            "Explored from ({}, {}, {}) with {} walkers: {} new prospects, {} total",
            start.x, start.y, start.z, divisions, added, self.prospects.len()
        );
        added
    }

    /// Approve up to `target` prospects, best first, and queue their entities.
    ///
    /// Each call approves into a new group; returns the number approved.
    pub fn spawn_eggs(&mut self, world: &dyn TraceQuery, target: usize) -> usize {
        let mut approved = 0;

        for index in 0..self.prospects.len() {
            if approved == target {
                break;
            }

            let prospect = self.prospects[index];
            if prospect.rejected || self.too_close(&prospect) {
                continue;
            }

            if let Some(rejection) = self.vet(world, &prospect) {
                if rejection == Rejection::Anomaly {
                    warn!(
                        "Prospect at ({}, {}, {}) passed scoring but failed the solidity round trip",
                        prospect.location.x, prospect.location.y, prospect.location.z
                    );
                } else {
                    debug!("Prospect rejected: {:?}", rejection);
                }
                self.prospects[index].rejected = true;
                continue;
            }

            let concept = self.concept.clone();
            let location = prospect.location;
            self.tasks.enqueue(move |host: &mut dyn EntityHost| {
                host.spawn(concept.instantiate(location, &mut rand::thread_rng()));
            });
            self.approved.push((self.spawn_group, prospect));
            approved += 1;
        }

        self.spawn_group += 1;
        approved
    }

    fn too_close(&self, prospect: &Prospect) -> bool {
        self.approved.iter().any(|(group, other)| {
            let threshold = if *group == self.spawn_group {
                self.config.social_distance_intra
            } else {
                self.config.social_distance_inter
            };
            (other.location - prospect.location).norm() < threshold
        })
    }

    fn vet(&self, world: &dyn TraceQuery, prospect: &Prospect) -> Option<Rejection> {
        let location = prospect.location;
        let bounds = &self.concept.bounds;

        let allowance = bounds.height() / 4.0;
        let drop = world.trace(location, &bounds.center_column(), below(location), ContentMask::PLAYER_SOLID);
        if (drop.end.z - location.z).abs() > allowance {
            return Some(Rejection::Ledge);
        }

        let touch = world.trace(location, bounds, location, ContentMask::TRIGGER);
        if touch.start_solid && touch.entity.is_some_and(|entity| world.entity_damages(entity)) {
            return Some(Rejection::DamagingTrigger);
        }

        let boxes = [Aabb::point(), bounds.scaled(0.5), *bounds];
        if !boxes.iter().all(|b| boomerang_all(world, location, b)) {
            return Some(Rejection::Anomaly);
        }

        None
    }

    /// Clear the approved list so earlier placements stop constraining new ones
    pub fn forget(&mut self) {
        self.approved.clear();
    }

    /// Bytes used by the prospect pool
    pub fn buffer_usage(&self) -> usize {
        self.prospects.len() * size_of::<Prospect>()
    }

    /// Keep only the best prospects filling `percent` of the byte cap
    pub fn cull(&mut self, percent: f64) {
        let bytes = (percent / 100.0 * self.config.buffer_bytes as f64).max(0.0) as usize;
        self.prospects.truncate(bytes / size_of::<Prospect>());
    }

    /// Locations scored over every exploration
    pub fn locations_scored(&self) -> u64 {
        self.locations_scored
    }

    /// Prospects in the pool
    pub fn locations_valid(&self) -> usize {
        self.prospects.len()
    }

    /// Prospects approved since the last [`Pathfinder::forget`]
    pub fn locations_used(&self) -> usize {
        self.approved.len()
    }

    #[cfg(test)]
    fn seed_prospects(&mut self, locations: &[Vec3]) {
        self.prospects.extend(locations.iter().map(|l| Prospect::new(*l, 0.0)));
    }
}

struct Walker<'a> {
    world: &'a dyn TraceQuery,
    bounds: Aabb,
    config: &'a PathfinderConfig,
    start: Vec3,
    deadline: Deadline,
    pool: &'a Mutex<Vec<Prospect>>,
    capacity: usize,
    scored: &'a AtomicU64,
}

impl Walker<'_> {
    fn run<R: Rng>(&self, rng: &mut R) {
        let mut origin = self.start;
        let mut stuck = 0;

        while !self.deadline.expired() {
            let direction = random_direction(rng);
            let tr = self.world.trace(
                origin,
                &self.bounds,
                origin + direction * TRACE_INFINITY,
                ContentMask::PLAYER_SOLID,
            );

            if tr.start_solid || tr.all_solid || stuck >= self.config.stuck_limit {
                stuck = 0;
                origin = self.start;
                continue;
            }

            if (tr.end - origin).norm() < self.config.min_step {
                stuck += 1;
                continue;
            }

            stuck = 0;
            let (lo, hi) = (self.config.step_lerp_min, self.config.step_lerp_max);
            let t = if lo < hi { rng.gen_range(lo..hi) } else { lo };
            origin = origin.lerp(&tr.end, t);

            let Some(prospect) = self.settle_and_score(origin) else {
                continue;
            };

            let mut pool = self.pool.lock();
            if pool.len() >= self.capacity {
                return;
            }
            pool.push(prospect);
        }
    }

    fn settle_and_score(&self, origin: Vec3) -> Option<Prospect> {
        let floor = self.world.trace(origin, &self.bounds, below(origin), ContentMask::PLAYER_SOLID);
        if floor.normal.z <= 0.0 {
            return None;
        }

        self.scored.fetch_add(1, Ordering::Relaxed);
        let probe = floor.end + Vec3::new(0.0, 0.0, SCORE_HEIGHT_OFFSET);
        let score = penalize_slope(
            score_location(self.world, probe, &self.bounds, self.config.intercardinal),
            floor.normal.z,
        );

        (score < INVALID_SCORE).then_some(Prospect::new(floor.end, score))
    }
}

/// Score a location: tripled ceiling clearance plus, for each horizontal
/// axis, both wall distances and the nearer of the two again. Optional
/// diagonal axes count half. Returns [`INVALID_SCORE`] or more when the spot
/// is inside solid, touches a map-sealing surface, or sees open sky in more
/// than one horizontal direction.
pub fn score_location(world: &dyn TraceQuery, position: Vec3, bounds: &Aabb, intercardinal: bool) -> f32 {
    let mut probe = Probe { world, position, sky_hits: 0 };

    let mut score = probe.distance(axes::zp(), bounds) * CEILING_WEIGHT;
    if score >= INVALID_SCORE {
        return INVALID_SCORE;
    }

    // Sky overhead is fine
    probe.sky_hits = 0;

    score += probe.axis(axes::xp(), bounds);
    score += probe.axis(axes::yp(), bounds);

    if probe.sky_hits > 1 {
        return INVALID_SCORE;
    }

    if intercardinal {
        let span = bounds.vertical_span();
        score += probe.axis(axes::xp_yp(), &span) / 2.0;
        score += probe.axis(axes::xp_yn(), &span) / 2.0;
    }

    score
}

/// Divide by the cube of the floor normal's vertical component
pub fn penalize_slope(score: f32, normal_z: f32) -> f32 {
    if normal_z == 1.0 {
        score
    } else {
        score / (normal_z * normal_z * normal_z)
    }
}

struct Probe<'a> {
    world: &'a dyn TraceQuery,
    position: Vec3,
    sky_hits: u32,
}

impl Probe<'_> {
    fn distance(&mut self, direction: Vec3, bounds: &Aabb) -> f32 {
        let tr = self.world.trace(
            self.position,
            bounds,
            self.position + direction * TRACE_INFINITY,
            ContentMask::PLAYER_SOLID | ContentMask::WATER | ContentMask::LAVA,
        );

        if tr.start_solid {
            return INVALID_SCORE;
        }
        if tr.surface_name.as_deref().is_some_and(is_forbidden_surface) {
            return INVALID_SCORE;
        }
        if tr.surface_flags.contains(SurfaceFlags::SKY) {
            self.sky_hits += 1;
        }

        (tr.end - self.position).norm()
    }

    fn axis(&mut self, axis: Vec3, bounds: &Aabb) -> f32 {
        let p = self.distance(axis, bounds);
        let n = self.distance(-axis, bounds);
        (p + n) + p.min(n)
    }
}

fn below(point: Vec3) -> Vec3 {
    point + axes::zn() * TRACE_INFINITY
}

// Trace out along each axis and back; anything but a return to the start
// means the location is inside or straddling geometry.
fn boomerang_all(world: &dyn TraceQuery, location: Vec3, bounds: &Aabb) -> bool {
    [axes::xn(), axes::xp(), axes::yn(), axes::yp(), axes::zn(), axes::zp()]
        .into_iter()
        .all(|direction| {
            let out = world.trace(location, bounds, location + direction * TRACE_INFINITY, ContentMask::PLAYER_SOLID);
            let back = world.trace(out.end, bounds, location, ContentMask::PLAYER_SOLID);
            (back.end - location).norm() < BOOMERANG_TOLERANCE
        })
}

fn random_direction<R: Rng>(rng: &mut R) -> Vec3 {
    loop {
        let v = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
        let length = v.norm();
        if length > 1e-3 && length <= 1.0 {
            return v / length;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::concept::EntityDesc;
    use crate::spatial::{Brush, BrushWorld, DIST_EPSILON};
    use approx::assert_relative_eq;

    fn bounds() -> Aabb {
        Aabb::new(Vec3::new(-8.0, -8.0, 0.0), Vec3::new(8.0, 8.0, 16.0))
    }

    fn pathfinder(config: PathfinderConfig) -> Pathfinder {
        Pathfinder::new(EggConcept::new("misc_egg", bounds()), config, Arc::new(TaskQueue::new()))
    }

    fn hall() -> BrushWorld {
        BrushWorld::room(Vec3::new(-1024.0, -1024.0, 0.0), Vec3::new(1024.0, 1024.0, 256.0), 16.0)
    }

    fn on_floor(x: f32, y: f32) -> Vec3 {
        Vec3::new(x, y, DIST_EPSILON)
    }

    #[test]
    fn test_enclosed_start_finds_nothing() {
        let cell = BrushWorld::room(Vec3::repeat(-0.5), Vec3::repeat(0.5), 16.0);

        // Concept larger than the cell: every walk starts solid
        let mut pf = pathfinder(PathfinderConfig::new());
        assert_eq!(pf.explore(&cell, Vec3::zeros(), 4, Duration::from_millis(10)), 0);

        // Point concept: every step is shorter than the minimum
        let mut pf = Pathfinder::new(
            EggConcept::new("misc_egg", Aabb::point()),
            PathfinderConfig::new(),
            Arc::new(TaskQueue::new()),
        );
        assert_eq!(pf.explore(&cell, Vec3::zeros(), 4, Duration::from_millis(10)), 0);
        assert_eq!(pf.locations_valid(), 0);
    }

    #[test]
    fn test_explore_respects_capacity() {
        let world = BrushWorld::room(Vec3::new(-256.0, -256.0, 0.0), Vec3::new(256.0, 256.0, 128.0), 16.0);
        let cap = 8 * size_of::<Prospect>();
        let mut pf = pathfinder(PathfinderConfig::new().with_buffer_bytes(cap));

        let added = pf.explore(&world, Vec3::new(0.0, 0.0, 64.0), 4, Duration::from_millis(50));
        assert!(added > 0);
        assert!(added <= 8);
        assert!(pf.buffer_usage() <= cap);
        assert!(pf.locations_scored() >= added as u64);

        // Sorted best first, all on the floor
        let scores: Vec<f32> = pf.prospects().iter().map(|p| p.score).collect();
        assert!(scores.windows(2).all(|w| w[0] <= w[1]));
        for p in pf.prospects() {
            assert_relative_eq!(p.location.z, DIST_EPSILON, epsilon = 1e-3);
        }

        // A full pool admits nothing more
        if pf.locations_valid() == 8 {
            assert_eq!(pf.explore(&world, Vec3::new(0.0, 0.0, 64.0), 2, Duration::from_millis(10)), 0);
        }
    }

    #[test]
    fn test_zero_walkers_explore_nothing() {
        let mut pf = pathfinder(PathfinderConfig::new());
        assert_eq!(pf.explore(&hall(), Vec3::new(0.0, 0.0, 64.0), 0, Duration::from_millis(5)), 0);
    }

    #[test]
    fn test_score_tracks_open_clearance() {
        let position = Vec3::new(0.0, 0.0, 8.0);
        let mut last = 0.0;
        for far_wall in [40.0, 80.0, 160.0, 320.0] {
            let world = BrushWorld::room(Vec3::new(-32.0, -32.0, 0.0), Vec3::new(far_wall, 32.0, 64.0), 16.0);
            let score = score_location(&world, position, &bounds(), false);
            assert!(score < INVALID_SCORE);
            assert!(score > last);
            last = score;
        }
    }

    #[test]
    fn test_score_components() {
        let world = BrushWorld::room(Vec3::new(-32.0, -64.0, 0.0), Vec3::new(32.0, 64.0, 64.0), 16.0);
        let position = Vec3::new(0.0, 0.0, 0.5);
        let score = score_location(&world, position, &bounds(), false);
        // ceiling: 64 - 16 - 0.5, walls: x 24 + 24 + 24, y 56 + 56 + 56
        let expected = (47.5 - DIST_EPSILON) * 3.0 + (24.0 - DIST_EPSILON) * 3.0 + (56.0 - DIST_EPSILON) * 3.0;
        assert_relative_eq!(score, expected, epsilon = 1e-2);

        let diagonal = score_location(&world, position, &bounds(), true);
        assert!(diagonal > score);
    }

    #[test]
    fn test_two_sky_walls_invalidate() {
        let sky = |mins: Vec3, maxs: Vec3| Brush::solid(mins, maxs).with_surface("textures/skies/night", SurfaceFlags::SKY);
        let position = Vec3::new(0.0, 0.0, 0.5);

        let mut world = BrushWorld::room(Vec3::new(-64.0, -64.0, 0.0), Vec3::new(64.0, 64.0, 64.0), 16.0);
        world.add_brush(sky(Vec3::new(48.0, -64.0, 0.0), Vec3::new(64.0, 64.0, 64.0)));
        assert!(score_location(&world, position, &bounds(), false) < INVALID_SCORE);

        world.add_brush(sky(Vec3::new(-64.0, 48.0, 0.0), Vec3::new(64.0, 64.0, 64.0)));
        assert_eq!(score_location(&world, position, &bounds(), false), INVALID_SCORE);

        // Sky overhead does not count
        let mut world = BrushWorld::room(Vec3::new(-64.0, -64.0, 0.0), Vec3::new(64.0, 64.0, 64.0), 16.0);
        world.add_brush(sky(Vec3::new(-64.0, -64.0, 48.0), Vec3::new(64.0, 64.0, 64.0)));
        world.add_brush(sky(Vec3::new(48.0, -64.0, 0.0), Vec3::new(64.0, 64.0, 48.0)));
        assert!(score_location(&world, position, &bounds(), false) < INVALID_SCORE);
    }

    #[test]
    fn test_forbidden_surface_invalidates() {
        let mut world = BrushWorld::room(Vec3::new(-64.0, -64.0, 0.0), Vec3::new(64.0, 64.0, 64.0), 16.0);
        world.add_brush(
            Brush::solid(Vec3::new(-64.0, -64.0, 0.0), Vec3::new(64.0, -48.0, 64.0))
                .with_surface("textures/common/caulk", SurfaceFlags::empty()),
        );
        assert!(score_location(&world, Vec3::new(0.0, 0.0, 0.5), &bounds(), false) >= INVALID_SCORE);
    }

    #[test]
    fn test_inside_solid_invalidates() {
        let world = hall();
        assert_eq!(score_location(&world, Vec3::new(0.0, 0.0, -8.0), &bounds(), false), INVALID_SCORE);
    }

    #[test]
    fn test_slope_penalty() {
        assert_eq!(penalize_slope(10.0, 1.0), 10.0);
        assert_relative_eq!(penalize_slope(10.0, 0.5), 80.0, epsilon = 1e-4);
    }

    #[test]
    fn test_intra_group_distance_is_strict() {
        let world = hall();
        let config = PathfinderConfig::new().with_social_distance(256.0, 128.0);

        let mut pf = pathfinder(config.clone());
        pf.seed_prospects(&[on_floor(0.0, 0.0), on_floor(256.0, 0.0)]);
        assert_eq!(pf.spawn_eggs(&world, 10), 2);

        let mut pf = pathfinder(config);
        pf.seed_prospects(&[on_floor(0.0, 0.0), on_floor(255.9, 0.0)]);
        assert_eq!(pf.spawn_eggs(&world, 10), 1);
        // Too close is not a permanent rejection
        assert!(!pf.prospects()[1].rejected);
    }

    #[test]
    fn test_inter_group_distance() {
        let world = hall();
        let mut pf = pathfinder(PathfinderConfig::new().with_social_distance(256.0, 128.0));
        pf.seed_prospects(&[on_floor(0.0, 0.0), on_floor(200.0, 0.0), on_floor(100.0, 0.0)]);

        assert_eq!(pf.spawn_eggs(&world, 1), 1);
        assert_eq!(pf.spawn_group(), 1);

        // 200 away passes the looser cross-group threshold, 100 does not
        assert_eq!(pf.spawn_eggs(&world, 10), 1);
        let groups: Vec<(u32, f32)> = pf.approved().iter().map(|(g, p)| (*g, p.location.x)).collect();
        assert_eq!(groups, vec![(0, 0.0), (1, 200.0)]);

        // Forgotten placements no longer block the spot
        pf.forget();
        assert_eq!(pf.locations_used(), 0);
        assert_eq!(pf.spawn_eggs(&world, 10), 1);
        assert_eq!(pf.approved()[0].1.location.x, 0.0);
    }

    #[test]
    fn test_target_limits_approvals() {
        let world = hall();
        let mut pf = pathfinder(PathfinderConfig::new());
        pf.seed_prospects(&[on_floor(-512.0, 0.0), on_floor(0.0, 0.0), on_floor(512.0, 0.0)]);
        assert_eq!(pf.spawn_eggs(&world, 2), 2);
        assert_eq!(pf.spawn_eggs(&world, 0), 0);
    }

    #[test]
    fn test_ledge_rejected() {
        let mut world = BrushWorld::new();
        world
            .add_brush(Brush::solid(Vec3::new(-512.0, -512.0, -16.0), Vec3::new(0.0, 512.0, 0.0)))
            .add_brush(Brush::solid(Vec3::new(0.0, -512.0, -216.0), Vec3::new(512.0, 512.0, -200.0)));

        let mut pf = pathfinder(PathfinderConfig::new());
        pf.seed_prospects(&[on_floor(4.0, 0.0)]);
        assert_eq!(pf.spawn_eggs(&world, 1), 0);
        assert!(pf.prospects()[0].rejected);
    }

    #[test]
    fn test_damaging_trigger_rejected() {
        let mut world = hall();
        world
            .add_brush(Brush::trigger(Vec3::new(-32.0, -32.0, 0.0), Vec3::new(32.0, 32.0, 64.0), 3))
            .add_brush(Brush::trigger(Vec3::new(480.0, -32.0, 0.0), Vec3::new(544.0, 32.0, 64.0), 4))
            .add_damaging_entity(3);

        let mut pf = pathfinder(PathfinderConfig::new());
        pf.seed_prospects(&[on_floor(0.0, 0.0), on_floor(512.0, 0.0)]);
        assert_eq!(pf.spawn_eggs(&world, 10), 1);
        assert!(pf.prospects()[0].rejected);
        assert_eq!(pf.approved()[0].1.location.x, 512.0);
    }

    #[test]
    fn test_location_inside_geometry_is_anomaly() {
        let mut world = hall();
        world.add_brush(Brush::solid(Vec3::new(-32.0, -32.0, 0.0), Vec3::new(32.0, 32.0, 64.0)));

        let mut pf = pathfinder(PathfinderConfig::new());
        pf.seed_prospects(&[on_floor(0.0, 0.0)]);
        assert_eq!(pf.spawn_eggs(&world, 1), 0);
        assert!(pf.prospects()[0].rejected);

        // Rejected prospects stay rejected
        assert_eq!(pf.spawn_eggs(&world, 1), 0);
    }

    #[test]
    fn test_approved_entities_are_queued() {
        let world = hall();
        let tasks = Arc::new(TaskQueue::new());
        let concept = EggConcept::new("misc_egg", bounds())
            .with_models(["models/egg.md3"])
            .with_behaviour(true, true);
        let mut pf = Pathfinder::new(concept, PathfinderConfig::new(), Arc::clone(&tasks));
        pf.seed_prospects(&[on_floor(0.0, 0.0), on_floor(512.0, 512.0)]);

        assert_eq!(pf.spawn_eggs(&world, 10), 2);
        assert_eq!(tasks.len(), 2);

        let mut spawned: Vec<EntityDesc> = Vec::new();
        tasks.run_pending(&mut spawned);
        assert_eq!(spawned.len(), 2);
        assert_eq!(spawned[1].origin, on_floor(512.0, 512.0));
        assert_eq!(spawned[0].model.as_deref(), Some("models/egg.md3"));
        assert_eq!(spawned[0].health, Some(100));
    }

    #[test]
    fn test_cull_truncates_pool() {
        let cap = 10 * size_of::<Prospect>();
        let mut pf = pathfinder(PathfinderConfig::new().with_buffer_bytes(cap));
        pf.seed_prospects(&[on_floor(0.0, 0.0); 10]);
        assert_eq!(pf.buffer_usage(), cap);

        pf.cull(50.0);
        assert_eq!(pf.locations_valid(), 5);
        pf.cull(100.0);
        assert_eq!(pf.locations_valid(), 5);
    }
}
