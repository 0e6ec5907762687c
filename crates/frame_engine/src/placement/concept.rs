//! Placement concepts
//!
//! An [`EggConcept`] describes the entity the placement search puts into the
//! world: its class, candidate models, collision box and behaviour flags.
//! [`EggConcept::instantiate`] turns it into an [`EntityDesc`] the host can
//! construct.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::foundation::math::{utils::hsl_to_rgb, Vec3};
use crate::spatial::{Aabb, ContentMask};

/// Health given to damageable placements
pub const DAMAGEABLE_HEALTH: i32 = 100;

/// What to place
#[derive(Debug, Clone, PartialEq)]
pub struct EggConcept {
    /// Entity class name
    pub classname: String,
    /// Candidate models, one picked at random per entity
    pub models: Vec<String>,
    /// Model scale in percent
    pub model_scale_percent: u32,
    /// Give every entity a random saturated colour
    pub random_color: bool,
    /// Collision box relative to the entity origin
    pub bounds: Aabb,
    /// Players can use the entity
    pub usable: bool,
    /// The entity takes damage
    pub damageable: bool,
}

impl EggConcept {
    /// Create a concept with the given class and collision box
    pub fn new(classname: impl Into<String>, bounds: Aabb) -> Self {
        Self {
            classname: classname.into(),
            models: Vec::new(),
            model_scale_percent: 100,
            random_color: false,
            bounds,
            usable: false,
            damageable: false,
        }
    }

    /// Set the candidate models
    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    /// Set the model scale in percent
    pub fn with_model_scale(mut self, percent: u32) -> Self {
        self.model_scale_percent = percent;
        self
    }

    /// Enable random colours
    pub fn with_random_color(mut self, enabled: bool) -> Self {
        self.random_color = enabled;
        self
    }

    /// Set the usable and damageable flags
    pub fn with_behaviour(mut self, usable: bool, damageable: bool) -> Self {
        self.usable = usable;
        self.damageable = damageable;
        self
    }

    /// Build the entity placed at `origin`
    pub fn instantiate<R: Rng>(&self, origin: Vec3, rng: &mut R) -> EntityDesc {
        let color = self.random_color.then(|| {
            let [r, g, b] = hsl_to_rgb(rng.gen_range(0.0..1.0), 1.0, rng.gen_range(0.5..0.8));
            [to_byte(r), to_byte(g), to_byte(b), 255]
        });

        EntityDesc {
            classname: self.classname.clone(),
            model: self.models.choose(rng).cloned(),
            model_scale_percent: self.model_scale_percent,
            color,
            bounds: self.bounds,
            contents: ContentMask::SOLID,
            clip_mask: ContentMask::SOLID,
            usable: self.usable,
            health: self.damageable.then_some(DAMAGEABLE_HEALTH),
            origin,
        }
    }
}

fn to_byte(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Everything the host needs to construct and link one entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDesc {
    /// Entity class name
    pub classname: String,
    /// Model drawn
    pub model: Option<String>,
    /// Model scale in percent
    pub model_scale_percent: u32,
    /// RGBA tint
    pub color: Option<[u8; 4]>,
    /// Collision box
    pub bounds: Aabb,
    /// Contents the entity occupies
    pub contents: ContentMask,
    /// Contents the entity collides with
    pub clip_mask: ContentMask,
    /// Players can use the entity
    pub usable: bool,
    /// Starting and maximum health of damageable entities
    pub health: Option<i32>,
    /// World position
    pub origin: Vec3,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn concept() -> EggConcept {
        EggConcept::new("misc_egg", Aabb::new(Vec3::new(-8.0, -8.0, 0.0), Vec3::new(8.0, 8.0, 16.0)))
    }

    #[test]
    fn test_instantiate_picks_listed_model() {
        let concept = concept().with_models(["models/egg_a.md3", "models/egg_b.md3"]);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..16 {
            let desc = concept.instantiate(Vec3::new(1.0, 2.0, 3.0), &mut rng);
            assert!(concept.models.contains(desc.model.as_ref().unwrap()));
            assert_eq!(desc.origin, Vec3::new(1.0, 2.0, 3.0));
            assert_eq!(desc.contents, ContentMask::SOLID);
        }
    }

    #[test]
    fn test_damageable_gets_health() {
        let mut rng = StdRng::seed_from_u64(2);
        let plain = concept().instantiate(Vec3::zeros(), &mut rng);
        assert_eq!(plain.health, None);
        assert!(!plain.usable);
        assert_eq!(plain.model, None);

        let tough = concept().with_behaviour(true, true).instantiate(Vec3::zeros(), &mut rng);
        assert_eq!(tough.health, Some(DAMAGEABLE_HEALTH));
        assert!(tough.usable);
    }

    #[test]
    fn test_random_color_is_saturated() {
        let mut rng = StdRng::seed_from_u64(3);
        let concept = concept().with_random_color(true);
        for _ in 0..16 {
            let [r, g, b, a] = concept.instantiate(Vec3::zeros(), &mut rng).color.unwrap();
            assert_eq!(a, 255);
            // Full saturation at lightness >= 0.5 always maxes one channel
            assert_eq!(r.max(g).max(b), 255);
        }
    }
}
