//! Material registry
//!
//! An arena of [`Material`] records addressed by stable [`MaterialHandle`]s,
//! with a name lookup and a free list of recycled slots. Slot 0 always holds
//! the built-in default material.
//!
//! Resolution never fails: a name without a usable description falls back to
//! a single-stage image material, and a name without an image maps to the
//! default material.

use std::collections::HashMap;

use log::{debug, error, info, warn};

use super::library::MaterialLibrary;
use super::parser::MaterialParser;
use super::types::{BlendFunc, Material, MaterialHandle, Stage, TextureProvider};

/// Owns every material of the session
pub struct MaterialRegistry {
    materials: Vec<Material>,
    lookup: HashMap<String, MaterialHandle>,
    free: Vec<u32>,
    pending_release: Vec<u32>,
    library: MaterialLibrary,
    textures: Box<dyn TextureProvider>,
    default_blend: BlendFunc,
}

impl MaterialRegistry {
    /// Create a registry reading descriptions from `library` and images from
    /// `textures`
    pub fn new(library: MaterialLibrary, textures: Box<dyn TextureProvider>) -> Self {
        let mut lookup = HashMap::new();
        lookup.insert(Material::DEFAULT_NAME.to_string(), MaterialHandle::DEFAULT);

        Self {
            materials: vec![Material::default_material()],
            lookup,
            free: Vec::new(),
            pending_release: Vec::new(),
            library,
            textures,
            default_blend: BlendFunc::REPLACE,
        }
    }

    /// Blend pair for stages that do not declare one
    pub fn with_default_blend(mut self, blend: BlendFunc) -> Self {
        self.default_blend = blend;
        self
    }

    /// Add more descriptions; already resolved materials are not reparsed
    pub fn add_library(&mut self, library: MaterialLibrary) {
        self.library.merge(library);
    }

    /// Resolve `name` to a handle, creating the material on first use
    pub fn resolve(&mut self, name: &str) -> MaterialHandle {
        self.resolve_with_mipmaps(name, true)
    }

    /// Resolve `name`, controlling whether image lookups request mipmaps
    pub fn resolve_with_mipmaps(&mut self, name: &str, mipmaps: bool) -> MaterialHandle {
        if let Some(&handle) = self.lookup.get(&lookup_key(name)) {
            debug!("Material '{}' already registered at {}", name, handle.0);
            return handle;
        }

        let material = match self.build(name, mipmaps) {
            Some(material) => material,
            None => {
                error!("Could not find image for material '{}', using the blank material", name);
                self.lookup.insert(lookup_key(name), MaterialHandle::DEFAULT);
                return MaterialHandle::DEFAULT;
            }
        };

        let handle = self.insert(material);
        info!("Material '{}' registered at {}", name, handle.0);
        handle
    }

    fn build(&mut self, name: &str, mipmaps: bool) -> Option<Material> {
        if let Some(source) = self.library.get(name) {
            let mut parser = MaterialParser::new(self.textures.as_mut(), self.default_blend);
            match parser.parse(name, source, mipmaps) {
                Ok(material) => return Some(material),
                Err(e) => error!("Could not parse material '{}': {}", name, e),
            }
        }

        let texture = self.textures.register_texture(name, mipmaps)?;
        info!("Image material: {}", name);
        Some(Material::new(name).with_stage(Stage::image(texture)))
    }

    /// Register an already built material under its name, reusing a free
    /// slot before growing. Replaces any previous name mapping.
    pub fn insert(&mut self, mut material: Material) -> MaterialHandle {
        material.in_use = true;
        let key = lookup_key(&material.name);

        let handle = match self.free.pop() {
            Some(index) => {
                self.materials[index as usize] = material;
                MaterialHandle(index)
            }
            None => {
                self.materials.push(material);
                MaterialHandle((self.materials.len() - 1) as u32)
            }
        };

        self.lookup.insert(key, handle);
        handle
    }

    /// Material behind `handle`. Released materials stay readable until
    /// [`MaterialRegistry::recycle_released`].
    pub fn get(&self, handle: MaterialHandle) -> Option<&Material> {
        let material = self.materials.get(handle.index())?;
        (material.in_use || self.pending_release.contains(&handle.0)).then_some(material)
    }

    /// Handle of an already resolved name, without resolving it
    pub fn handle_of(&self, name: &str) -> Option<MaterialHandle> {
        self.lookup.get(&lookup_key(name)).copied()
    }

    /// Number of live materials, the default included
    pub fn len(&self) -> usize {
        self.materials.iter().filter(|m| m.in_use).count()
    }

    /// Whether only the default material is live
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Number of arena slots, live or not
    pub fn slot_count(&self) -> usize {
        self.materials.len()
    }

    /// Mark a material unused. Its slot becomes reusable after the next
    /// [`MaterialRegistry::recycle_released`].
    pub fn release(&mut self, handle: MaterialHandle) {
        if handle.is_default() {
            warn!("Attempted to release the default material");
            return;
        }
        let Some(material) = self.materials.get_mut(handle.index()) else {
            warn!("Attempted to release unknown material handle {}", handle.0);
            return;
        };
        if !material.in_use {
            return;
        }

        material.in_use = false;
        self.lookup.retain(|_, h| *h != handle);
        self.pending_release.push(handle.0);
        debug!("Material '{}' released", material.name);
    }

    /// Move released slots to the free list. Call once no frame in flight can
    /// reference them.
    pub fn recycle_released(&mut self) {
        self.free.append(&mut self.pending_release);
    }
}

// Names match case-insensitively, as in the description library
fn lookup_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::material::types::{sort, BlendFactor, TextureId};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Images {
        known: Vec<&'static str>,
        requests: Rc<RefCell<Vec<String>>>,
    }

    impl TextureProvider for Images {
        fn register_texture(&mut self, name: &str, _mipmaps: bool) -> Option<TextureId> {
            self.requests.borrow_mut().push(name.to_string());
            self.known.iter().position(|k| *k == name).map(|i| TextureId(i as u32 + 1))
        }
    }

    fn registry(library: &str, known: Vec<&'static str>) -> (MaterialRegistry, Rc<RefCell<Vec<String>>>) {
        let requests = Rc::new(RefCell::new(Vec::new()));
        let images = Images { known, requests: requests.clone() };
        (MaterialRegistry::new(MaterialLibrary::parse(library), Box::new(images)), requests)
    }

    #[test]
    fn test_default_material_at_zero() {
        let (registry, _) = registry("", vec![]);
        let default = registry.get(MaterialHandle::DEFAULT).unwrap();
        assert_eq!(default.name, "*default");
        assert!(default.stages.is_empty());
        assert_eq!(registry.handle_of("*default"), Some(MaterialHandle::DEFAULT));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let (mut registry, requests) = registry("X { { map foo.tga } }", vec!["foo.tga"]);
        let first = registry.resolve("X");
        let second = registry.resolve("X");
        assert_eq!(first, second);
        assert_ne!(first, MaterialHandle::DEFAULT);
        assert_eq!(requests.borrow().len(), 1);

        let material = registry.get(first).unwrap();
        assert_eq!(material.stages.len(), 1);
        assert_eq!(material.stages[0].diffuse, Some(TextureId(1)));
        assert_eq!(material.stages[0].blend, BlendFunc::REPLACE);
        assert!(material.depth_write);
    }

    #[test]
    fn test_resolve_ignores_case() {
        let (mut registry, requests) =
            registry("textures/base/wall { { map wall.tga } }", vec!["wall.tga"]);
        let lower = registry.resolve("textures/base/wall");
        let upper = registry.resolve("Textures/Base/Wall");
        assert_eq!(lower, upper);
        assert_eq!(registry.slot_count(), 2);
        assert_eq!(requests.borrow().len(), 1);
        assert_eq!(registry.handle_of("TEXTURES/BASE/WALL"), Some(lower));
    }

    #[test]
    fn test_image_fallback() {
        let (mut registry, _) = registry("", vec!["gfx/crosshair.tga"]);
        let handle = registry.resolve("gfx/crosshair.tga");
        let material = registry.get(handle).unwrap();
        assert_eq!(material.stages.len(), 1);
        assert_eq!(material.stages[0].blend, BlendFunc::ALPHA);
    }

    #[test]
    fn test_invalid_description_falls_back_to_image() {
        let (mut registry, _) = registry("broken { { map missing.tga } }", vec!["broken"]);
        let handle = registry.resolve("broken");
        assert_ne!(handle, MaterialHandle::DEFAULT);
        assert_eq!(registry.get(handle).unwrap().stages[0].blend, BlendFunc::ALPHA);
    }

    #[test]
    fn test_unresolvable_name_maps_to_default() {
        let (mut registry, requests) = registry("", vec![]);
        assert_eq!(registry.resolve("nothing"), MaterialHandle::DEFAULT);
        assert_eq!(registry.resolve("nothing"), MaterialHandle::DEFAULT);
        // Second resolve hits the cached mapping
        assert_eq!(requests.borrow().len(), 1);
        assert_eq!(registry.slot_count(), 1);
    }

    #[test]
    fn test_released_slot_reused_after_recycle() {
        let (mut registry, _) = registry("", vec!["a", "b", "c"]);
        let a = registry.resolve("a");
        let b = registry.resolve("b");
        registry.release(a);

        // Still readable this frame, slot not yet reusable
        assert!(registry.get(a).is_some());
        assert_eq!(registry.handle_of("a"), None);
        let c = registry.resolve("c");
        assert_ne!(c, a);

        registry.recycle_released();
        assert!(registry.get(a).is_none());
        let again = registry.resolve("a");
        assert_eq!(again, a);
        assert_ne!(again, b);
        assert_eq!(registry.slot_count(), 4);
    }

    #[test]
    fn test_default_cannot_be_released() {
        let (mut registry, _) = registry("", vec![]);
        registry.release(MaterialHandle::DEFAULT);
        registry.recycle_released();
        assert!(registry.get(MaterialHandle::DEFAULT).is_some());
    }

    #[test]
    fn test_configured_default_blend() {
        let (registry, _) = registry("X { { map foo.tga } }", vec!["foo.tga"]);
        let mut registry = registry.with_default_blend(BlendFunc::new(BlendFactor::One, BlendFactor::One));
        let handle = registry.resolve("X");
        let material = registry.get(handle).unwrap();
        assert_eq!(material.stages[0].blend, BlendFunc::new(BlendFactor::One, BlendFactor::One));
        assert_eq!(material.sort, sort::ADDITIVE);
    }
}
