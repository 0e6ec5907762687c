//! # Batcher / Sorter
//!
//! Groups a scene's 3D draws by material and orders the groups for
//! submission.
//!
//! ## Architecture
//!
//! - **Batcher**: collects `(material, mesh, mvp)` draws, grouping by material
//!   in encounter order
//! - **DrawBatch**: one material with every mesh drawn with it this scene
//! - **SortedBatches**: sky batches in encounter order plus the regular
//!   batches sorted by `(sort asc, depth_write desc, handle asc)`
//!
//! Batches are rebuilt from scratch for every scene and never outlive the
//! frame.

use std::cmp::Ordering;
use std::collections::HashMap;

use log::{debug, warn};

use super::error::RenderError;
use super::frame::{DrawCommand, ModelInstance, Scene, SceneView, SceneFlags};
use super::material::{Material, MaterialHandle, MaterialRegistry};
use super::model::{MeshId, ModelKind, ModelStore, WorldVisibility};
use crate::foundation::math::Mat4;

/// A mesh with its model-view-projection transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawMesh {
    /// Geometry
    pub mesh: MeshId,
    /// Model-view-projection transform
    pub mvp: Mat4,
}

/// Every mesh drawn with one material
#[derive(Debug, Clone, PartialEq)]
pub struct DrawBatch {
    /// Shared material
    pub material: MaterialHandle,
    /// Meshes in submission order
    pub meshes: Vec<DrawMesh>,
}

/// Statistics for one batching pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Draws collected, sky draws included
    pub total_draws: usize,
    /// Regular batches produced
    pub batch_count: usize,
    /// Sky batches produced
    pub sky_count: usize,
    /// Draws dropped because their material is not registered
    pub skipped_draws: usize,
}

impl BatchStats {
    /// Average meshes per batch, sky batches included
    pub fn avg_draws_per_batch(&self) -> f32 {
        let batches = self.batch_count + self.sky_count;
        if batches == 0 {
            0.0
        } else {
            (self.total_draws - self.skipped_draws) as f32 / batches as f32
        }
    }
}

/// Output of a batching pass
#[derive(Debug, Clone, Default)]
pub struct SortedBatches {
    /// Sky materials, in encounter order
    pub skyboxes: Vec<DrawBatch>,
    /// Remaining materials, in draw order
    pub batches: Vec<DrawBatch>,
    /// Pass statistics
    pub stats: BatchStats,
}

impl SortedBatches {
    /// Every mesh of every batch, sky batches first
    pub fn all_meshes(&self) -> impl Iterator<Item = &DrawMesh> {
        self.skyboxes
            .iter()
            .chain(self.batches.iter())
            .flat_map(|batch| batch.meshes.iter())
    }
}

/// Collects draws grouped by material
#[derive(Debug, Default)]
pub struct Batcher {
    batches: Vec<DrawBatch>,
    index: HashMap<MaterialHandle, usize>,
    total_draws: usize,
}

impl Batcher {
    /// Create an empty batcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one draw
    pub fn add(&mut self, material: MaterialHandle, draw: DrawMesh) {
        self.total_draws += 1;
        let slot = *self.index.entry(material).or_insert_with(|| {
            self.batches.push(DrawBatch { material, meshes: Vec::new() });
            self.batches.len() - 1
        });
        self.batches[slot].meshes.push(draw);
    }

    /// Add every surface of a model instance.
    ///
    /// Unknown models and non-mesh models without surfaces are skipped; a mesh
    /// model without surfaces is a fatal asset error.
    pub fn add_model(
        &mut self,
        models: &ModelStore,
        instance: &ModelInstance,
        view_projection: &Mat4,
    ) -> Result<(), RenderError> {
        let Some(model) = models.get(instance.model) else {
            warn!("Skipping draw of unregistered model {:?}", instance.model);
            return Ok(());
        };

        let Some(surfaces) = &model.surfaces else {
            return match model.kind {
                ModelKind::Mesh => Err(RenderError::MeshNotRenderable(model.name.clone())),
                _ => {
                    debug!("Skipping model '{}' without renderable data", model.name);
                    Ok(())
                }
            };
        };

        let mvp = view_projection * instance.transform;
        for surface in surfaces {
            self.add(surface.material, DrawMesh { mesh: surface.mesh, mvp });
        }
        Ok(())
    }

    /// Add the world surfaces visible from `view`. Surfaces without geometry
    /// are skipped.
    pub fn add_world(&mut self, world: &dyn WorldVisibility, view: &SceneView, view_projection: &Mat4) {
        for surface in world.visible_surfaces(view) {
            if let Some(mesh) = surface.mesh {
                self.add(surface.material, DrawMesh { mesh, mvp: *view_projection });
            }
        }
    }

    /// Resolve materials, split out sky materials and sort the rest
    pub fn finish(self, registry: &MaterialRegistry) -> SortedBatches {
        let mut stats = BatchStats {
            total_draws: self.total_draws,
            ..Default::default()
        };
        let mut skyboxes = Vec::new();
        let mut regular: Vec<(&Material, DrawBatch)> = Vec::new();

        for batch in self.batches {
            let Some(material) = registry.get(batch.material) else {
                warn!(
                    "Skipping {} draws with unregistered material {}",
                    batch.meshes.len(),
                    batch.material.0
                );
                stats.skipped_draws += batch.meshes.len();
                continue;
            };

            if material.is_sky() {
                skyboxes.push(batch);
            } else {
                regular.push((material, batch));
            }
        }

        regular.sort_by(|(ma, a), (mb, b)| draw_order(ma, a.material, mb, b.material));

        stats.batch_count = regular.len();
        stats.sky_count = skyboxes.len();

        SortedBatches {
            skyboxes,
            batches: regular.into_iter().map(|(_, batch)| batch).collect(),
            stats,
        }
    }
}

/// Total draw order of two materials: sort key ascending, depth-writing
/// materials first, then handle
pub fn draw_order(a: &Material, a_handle: MaterialHandle, b: &Material, b_handle: MaterialHandle) -> Ordering {
    a.sort
        .total_cmp(&b.sort)
        .then_with(|| b.depth_write.cmp(&a.depth_write))
        .then_with(|| a_handle.cmp(&b_handle))
}

/// Batch one scene: world surfaces (unless disabled) then the scene's model
/// commands. Screen-space commands in the scene are ignored here.
pub fn batch_scene(
    scene: &Scene,
    view: &SceneView,
    view_projection: &Mat4,
    models: &ModelStore,
    world: Option<&dyn WorldVisibility>,
    registry: &MaterialRegistry,
) -> Result<SortedBatches, RenderError> {
    let mut batcher = Batcher::new();

    if let Some(world) = world {
        if !view.flags.contains(SceneFlags::NO_WORLD_MODEL) {
            batcher.add_world(world, view, view_projection);
        }
    }

    for command in &scene.commands {
        match command {
            DrawCommand::Model(instance) => batcher.add_model(models, instance, view_projection)?,
            DrawCommand::StretchPic(_) => {}
        }
    }

    Ok(batcher.finish(registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::material::{sort, MaterialLibrary, SkyParams, TextureId, TextureProvider};
    use crate::render::model::{Model, StaticWorld, Surface, WorldSurface};

    struct NoImages;

    impl TextureProvider for NoImages {
        fn register_texture(&mut self, _name: &str, _mipmaps: bool) -> Option<TextureId> {
            None
        }
    }

    fn registry() -> MaterialRegistry {
        MaterialRegistry::new(MaterialLibrary::new(), Box::new(NoImages))
    }

    fn draw(mesh: u32) -> DrawMesh {
        DrawMesh { mesh: MeshId(mesh), mvp: Mat4::identity() }
    }

    fn order(sorted: &SortedBatches) -> Vec<MaterialHandle> {
        sorted.batches.iter().map(|b| b.material).collect()
    }

    #[test]
    fn test_groups_by_material_in_encounter_order() {
        let mut registry = registry();
        let a = registry.insert(Material::new("a"));
        let b = registry.insert(Material::new("b"));

        let mut batcher = Batcher::new();
        batcher.add(b, draw(1));
        batcher.add(a, draw(2));
        batcher.add(b, draw(3));
        let sorted = batcher.finish(&registry);

        assert_eq!(sorted.stats.total_draws, 3);
        assert_eq!(sorted.batches.len(), 2);
        let b_batch = sorted.batches.iter().find(|batch| batch.material == b).unwrap();
        assert_eq!(b_batch.meshes.iter().map(|d| d.mesh).collect::<Vec<_>>(), vec![MeshId(1), MeshId(3)]);
    }

    #[test]
    fn test_sort_key_then_depth_write_then_handle() {
        let mut registry = registry();
        let blended = registry.insert(Material::new("glass").with_sort(sort::ADDITIVE).with_depth_write(false));
        let wall = registry.insert(Material::new("wall"));
        let no_depth = registry.insert(Material::new("decal").with_depth_write(false));
        let floor = registry.insert(Material::new("floor"));
        let portal = registry.insert(Material::new("portal").with_sort(sort::PORTAL));

        // Submission order must not matter
        for submission in [
            vec![blended, wall, no_depth, floor, portal],
            vec![portal, floor, no_depth, wall, blended],
        ] {
            let mut batcher = Batcher::new();
            for (i, handle) in submission.iter().enumerate() {
                batcher.add(*handle, draw(i as u32));
            }
            let sorted = batcher.finish(&registry);
            assert_eq!(order(&sorted), vec![portal, wall, floor, no_depth, blended]);
        }
    }

    #[test]
    fn test_sky_materials_split_out() {
        let mut registry = registry();
        let mut sky = Material::new("sky");
        sky.sky = Some(SkyParams { sides: [None; 6], cloud_height: 512.0 });
        let sky = registry.insert(sky);
        let wall = registry.insert(Material::new("wall"));

        let mut batcher = Batcher::new();
        batcher.add(sky, draw(1));
        batcher.add(wall, draw(2));
        let sorted = batcher.finish(&registry);

        assert_eq!(sorted.skyboxes.len(), 1);
        assert_eq!(sorted.skyboxes[0].material, sky);
        assert_eq!(order(&sorted), vec![wall]);
        assert_eq!(sorted.all_meshes().count(), 2);
    }

    #[test]
    fn test_unregistered_material_skipped() {
        let registry = registry();
        let mut batcher = Batcher::new();
        batcher.add(MaterialHandle(42), draw(1));
        batcher.add(MaterialHandle::DEFAULT, draw(2));
        let sorted = batcher.finish(&registry);
        assert_eq!(order(&sorted), vec![MaterialHandle::DEFAULT]);
        assert_eq!(sorted.stats.skipped_draws, 1);
    }

    #[test]
    fn test_model_without_renderable_data() {
        let mut models = ModelStore::new();
        let broken_mesh = models.insert(Model::unloaded("models/broken.obj", ModelKind::Mesh));
        let brush = models.insert(Model::unloaded("*1", ModelKind::Brush));

        let mut batcher = Batcher::new();
        let instance = |model| ModelInstance { model, transform: Mat4::identity() };
        assert!(batcher.add_model(&models, &instance(brush), &Mat4::identity()).is_ok());

        let err = batcher.add_model(&models, &instance(broken_mesh), &Mat4::identity()).unwrap_err();
        assert_eq!(err, RenderError::MeshNotRenderable("models/broken.obj".to_string()));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_scene_batches_world_and_models() {
        let mut registry = registry();
        let wall = registry.insert(Material::new("wall"));
        let prop = registry.insert(Material::new("prop"));

        let mut models = ModelStore::new();
        let crate_model = models.insert(Model::mesh("crate", vec![Surface { material: prop, mesh: MeshId(10) }]));
        let world = StaticWorld {
            surfaces: vec![
                WorldSurface { material: wall, mesh: Some(MeshId(1)) },
                WorldSurface { material: wall, mesh: None },
            ],
            lightmap: None,
        };

        let transform = Mat4::new_translation(&crate::foundation::math::Vec3::new(1.0, 2.0, 3.0));
        let scene = Scene {
            view: None,
            commands: vec![DrawCommand::Model(ModelInstance { model: crate_model, transform })],
            finalized: true,
        };

        let view = SceneView::default();
        let sorted = batch_scene(&scene, &view, &Mat4::identity(), &models, Some(&world), &registry).unwrap();
        assert_eq!(sorted.stats.total_draws, 2);
        let prop_batch = sorted.batches.iter().find(|b| b.material == prop).unwrap();
        assert_eq!(prop_batch.meshes[0].mvp, transform);

        let no_world = view.with_flags(SceneFlags::NO_WORLD_MODEL);
        let sorted = batch_scene(&scene, &no_world, &Mat4::identity(), &models, Some(&world), &registry).unwrap();
        assert_eq!(order(&sorted), vec![prop]);
    }
}
