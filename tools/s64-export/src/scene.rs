//! Parsed scene data model.
//!
//! Everything is owned, ordered storage: meshes and animations keep their
//! declaration order (the writers and the keyframe normalizer depend on
//! it), faces reference vertices by index into their mesh, and materials by
//! index into the global [`MaterialTable`](crate::material::MaterialTable).

use crate::material::MaterialTable;

pub type Vec2 = [f32; 2];
pub type Vec3 = [f32; 3];
/// Quaternion stored wxyz, matching the scene file's keyframe lines.
pub type Quat = [f32; 4];

#[derive(Debug, Clone, Copy, Default)]
pub struct Vertex {
    pub pos: Vec3,
    pub normal: Vec3,
    /// Vertex color, each channel in [0, 1].
    pub color: Vec3,
    pub uv: Vec2,
}

/// A triangle: three vertex indices into the owning mesh plus a material
/// index into the global table.
#[derive(Debug, Clone, Copy)]
pub struct Face {
    pub verts: [usize; 3],
    pub material: usize,
}

/// One vertex-cache group: an ordered run of mesh vertex indices sized to
/// fit the hardware vertex cache, plus the faces that draw from it. Faces
/// only reference vertices resident in their own group.
#[derive(Debug, Clone, Default)]
pub struct VertCache {
    pub verts: Vec<usize>,
    pub faces: Vec<Face>,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: String,
    pub parent: Option<String>,
    pub root: Vec3,
    pub verts: Vec<Vertex>,
    pub faces: Vec<Face>,
    /// Materials referenced by any face, in first-use order.
    pub materials: Vec<usize>,
    pub props: Vec<String>,
    /// Filled in by the optimizer.
    pub caches: Vec<VertCache>,
}

impl Mesh {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn has_property(&self, prop: &str) -> bool {
        self.props.iter().any(|p| p == prop)
    }
}

/// Per-mesh transform inside one keyframe. `mesh` is `None` when the
/// keyframe named a mesh the scene never declared; such transforms are
/// kept but never emitted.
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    pub mesh: Option<usize>,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

#[derive(Debug, Clone, Default)]
pub struct Keyframe {
    pub frame: i32,
    pub transforms: Vec<Transform>,
}

#[derive(Debug, Clone, Default)]
pub struct Animation {
    pub name: String,
    pub keyframes: Vec<Keyframe>,
}

impl Animation {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            keyframes: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    pub meshes: Vec<Mesh>,
    pub animations: Vec<Animation>,
    pub materials: MaterialTable,
}

impl Scene {
    pub fn new(materials: MaterialTable) -> Self {
        Self {
            meshes: Vec::new(),
            animations: Vec::new(),
            materials,
        }
    }

    pub fn find_mesh(&self, name: &str) -> Option<usize> {
        self.meshes.iter().position(|m| m.name == name)
    }

    pub fn is_multimesh(&self) -> bool {
        self.meshes.len() > 1
    }
}
