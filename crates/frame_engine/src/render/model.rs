//! Models, meshes and the world-visibility seam

use slotmap::{new_key_type, SlotMap};

use super::frame::SceneView;
use super::material::{MaterialHandle, TextureId};

new_key_type! {
    /// Key of a registered model
    pub struct ModelId;
}

/// Backend mesh reference. Ordering groups draws of the same mesh together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u32);

/// One material/mesh pair of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    /// Material drawn on the mesh
    pub material: MaterialHandle,
    /// Geometry
    pub mesh: MeshId,
}

/// What a model is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Triangle mesh; must have renderable surfaces to be drawn
    Mesh,
    /// Inline brush model
    Brush,
    /// Skeletal model handled elsewhere
    Skeletal,
}

/// A drawable model
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// Asset name
    pub name: String,
    /// Model type
    pub kind: ModelKind,
    /// Renderable surfaces; `None` until the model is set up for rendering
    pub surfaces: Option<Vec<Surface>>,
}

impl Model {
    /// Mesh model with its surfaces
    pub fn mesh(name: impl Into<String>, surfaces: Vec<Surface>) -> Self {
        Self {
            name: name.into(),
            kind: ModelKind::Mesh,
            surfaces: Some(surfaces),
        }
    }

    /// Model of `kind` that has not been set up for rendering
    pub fn unloaded(name: impl Into<String>, kind: ModelKind) -> Self {
        Self {
            name: name.into(),
            kind,
            surfaces: None,
        }
    }
}

/// Registered models
#[derive(Default)]
pub struct ModelStore {
    models: SlotMap<ModelId, Model>,
}

impl ModelStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model
    pub fn insert(&mut self, model: Model) -> ModelId {
        self.models.insert(model)
    }

    /// Look up a model
    pub fn get(&self, id: ModelId) -> Option<&Model> {
        self.models.get(id)
    }

    /// Unregister a model
    pub fn remove(&mut self, id: ModelId) -> Option<Model> {
        self.models.remove(id)
    }

    /// Number of models
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// A world surface potentially visible from a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldSurface {
    /// Material drawn on the surface
    pub material: MaterialHandle,
    /// Geometry; `None` for surfaces without uploaded geometry, which are skipped
    pub mesh: Option<MeshId>,
}

/// World geometry collaborator: visibility determination and lightmaps
pub trait WorldVisibility {
    /// Surfaces visible from `view`
    fn visible_surfaces(&self, view: &SceneView) -> Vec<WorldSurface>;

    /// Lightmap atlas bound during the geometry pass
    fn lightmap(&self) -> Option<TextureId>;
}

/// World whose surfaces are all visible from everywhere
#[derive(Debug, Clone, Default)]
pub struct StaticWorld {
    /// Every surface of the world
    pub surfaces: Vec<WorldSurface>,
    /// Lightmap atlas
    pub lightmap: Option<TextureId>,
}

impl WorldVisibility for StaticWorld {
    fn visible_surfaces(&self, _view: &SceneView) -> Vec<WorldSurface> {
        self.surfaces.clone()
    }

    fn lightmap(&self) -> Option<TextureId> {
        self.lightmap
    }
}
