//! Frame pipeline demo application
//!
//! Drives a few frames through the renderer against a recording backend,
//! then searches a small brush room for spots to place entities.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use frame_engine::core::config::{ApplicationConfig, Config};
use frame_engine::foundation::math::{Mat4, Vec3};
use frame_engine::foundation::time::Timer;
use frame_engine::placement::{EggConcept, EntityDesc, Pathfinder, TaskQueue};
use frame_engine::render::{
    MaterialLibrary, MeshId, Model, RecordingBackend, Renderer, SceneView, StaticWorld, Surface, TextureId,
    TextureProvider, WorldSurface,
};
use frame_engine::spatial::{Aabb, BrushWorld};

const MATERIALS: &str = r#"
textures/base/floor
{
    {
        map textures/base/floor.tga
    }
    {
        map $lightmap
        blendFunc GL_DST_COLOR GL_ZERO
    }
}

textures/skies/dusk
{
    skyParms env/dusk - -
}

models/egg
{
    {
        map models/egg.tga
        rgbGen wave sin 0.75 0.25 0 0.5
        tcMod rotate 30
    }
}

hud/crosshair
{
    {
        map hud/crosshair.tga
        blendFunc GL_SRC_ALPHA GL_ONE_MINUS_SRC_ALPHA
    }
}
"#;

/// Hands out sequential texture ids and remembers names
#[derive(Default)]
struct DemoTextures {
    names: HashMap<String, TextureId>,
}

impl TextureProvider for DemoTextures {
    fn register_texture(&mut self, name: &str, _mipmaps: bool) -> Option<TextureId> {
        let next = TextureId(self.names.len() as u32 + 1);
        Some(*self.names.entry(name.to_string()).or_insert(next))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ApplicationConfig::load_or_default("frame_demo.toml")?;
    config.validate()?;
    // Initialize logging, RUST_LOG overrides the configured level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.engine.log_level.as_str()))
        .init();

    log::info!("Starting frame pipeline demo...");
    render_frames(&config)?;
    place_eggs(&config);
    log::info!("Demo finished");
    Ok(())
}

fn render_frames(config: &ApplicationConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut renderer = Renderer::new(
        config.renderer.clone(),
        RecordingBackend::new(),
        MaterialLibrary::parse(MATERIALS),
        Box::<DemoTextures>::default(),
    )?;

    let floor = renderer.register_material("textures/base/floor");
    let sky = renderer.register_material("textures/skies/dusk");
    let egg = renderer.register_material("models/egg");
    let crosshair = renderer.register_material("hud/crosshair");

    renderer.set_world(Some(Box::new(StaticWorld {
        surfaces: vec![
            WorldSurface { material: floor, mesh: Some(MeshId(1)) },
            WorldSurface { material: sky, mesh: Some(MeshId(2)) },
        ],
        lightmap: Some(TextureId(100)),
    })));
    let egg_model = renderer.register_model(Model::mesh("models/egg.md3", vec![Surface { material: egg, mesh: MeshId(3) }]));

    let mut timer = Timer::new();
    for frame in 0..4u32 {
        timer.step(1.0 / 60.0);
        renderer.begin_frame();
        for i in 0..3 {
            let transform = Mat4::new_translation(&Vec3::new(i as f32 * 32.0, 64.0, 0.0));
            renderer.add_model(egg_model, transform)?;
        }
        renderer.render_scene(
            SceneView::new(640.0, 480.0).with_camera(Vec3::new(0.0, 0.0, 48.0), [0.0, 90.0, 0.0]),
        )?;
        renderer.draw_stretch_pic(312.0, 232.0, 16.0, 16.0, 0.0, 0.0, 1.0, 1.0, crosshair)?;

        let stats = renderer.end_frame(timer.total_time())?;
        log::info!(
            "Frame {}: {} scenes, {} draw calls, {} batches",
            frame,
            stats.scenes_rendered,
            stats.draw_calls,
            stats.batches.batch_count
        );
    }

    log::info!(
        "Backend recorded {} draws over {} frames",
        renderer.backend().draw_count(),
        renderer.backend().frames_presented()
    );
    Ok(())
}

fn place_eggs(config: &ApplicationConfig) {
    let world = BrushWorld::room(Vec3::new(-512.0, -512.0, 0.0), Vec3::new(512.0, 512.0, 256.0), 16.0);
    let concept = EggConcept::new("misc_egg", Aabb::new(Vec3::new(-12.0, -12.0, 0.0), Vec3::new(12.0, 12.0, 24.0)))
        .with_models(["models/egg.md3"])
        .with_random_color(true)
        .with_behaviour(true, true);

    let tasks = Arc::new(TaskQueue::new());
    let mut pathfinder = Pathfinder::new(concept, config.pathfinder.clone(), Arc::clone(&tasks));

    let mut rng = rand::thread_rng();
    let start = Vec3::new(rng.gen_range(-256.0..256.0), rng.gen_range(-256.0..256.0), 64.0);
    let found = pathfinder.explore(&world, start, 4, Duration::from_millis(100));
    let placed = pathfinder.spawn_eggs(&world, 8);
    log::info!(
        "Placement: {} prospects found, {} scored, {} placed, {} bytes buffered",
        found,
        pathfinder.locations_scored(),
        placed,
        pathfinder.buffer_usage()
    );

    let mut spawned: Vec<EntityDesc> = Vec::new();
    tasks.run_pending(&mut spawned);
    for entity in &spawned {
        log::info!(
            "Spawned {} at ({:.1}, {:.1}, {:.1})",
            entity.classname,
            entity.origin.x,
            entity.origin.y,
            entity.origin.z
        );
    }
}
