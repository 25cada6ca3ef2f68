//! Output writers for the three export flavors.

mod binary;
mod opengl;
mod text;

pub use binary::write_output_binary;
pub use text::write_output_text;

use crate::material::Material;
use crate::scene::{Mesh, Scene, VertCache, Vertex};
use anyhow::{Context, Result};

/// Symbol suffix for a mesh: just the model name for single-mesh scenes,
/// `model_mesh` otherwise.
pub(crate) fn mesh_symbol(scene: &Scene, mesh: &Mesh, model_name: &str) -> String {
    if scene.is_multimesh() {
        format!("{}_{}", model_name, mesh.name)
    } else {
        model_name.to_string()
    }
}

/// Declaration index of a mesh's parent, -1 when it has none (or names a
/// mesh that was never declared).
pub(crate) fn parent_index(scene: &Scene, mesh: &Mesh) -> i16 {
    mesh.parent
        .as_deref()
        .and_then(|name| scene.find_mesh(name))
        .map(|index| index as i16)
        .unwrap_or(-1)
}

/// The material of the first face in the cache group that references this
/// vertex. Every emitted vertex must be drawn by some face of its group.
pub(crate) fn find_material_from_vert(cache: &VertCache, vert: usize) -> Option<usize> {
    cache
        .faces
        .iter()
        .find(|face| face.verts.contains(&vert))
        .map(|face| face.material)
}

/// Texture dimensions used to scale this vertex's UVs, 0x0 for anything
/// that is not a texture.
pub(crate) fn vert_texture_dims(mat: &Material) -> (u32, u32) {
    mat.texture()
        .map(|tex| (tex.width, tex.height))
        .unwrap_or((0, 0))
}

/// The vertex's color-or-normal triple: normals scaled to signed bytes when
/// the material is lit, vertex colors scaled to unsigned bytes otherwise.
pub(crate) fn vert_color_normal(mat: &Material, vert: &Vertex) -> [i32; 3] {
    if mat.is_omit() {
        return [0; 3];
    }
    if mat.has_geo_flag("G_LIGHTING") {
        [
            (vert.normal[0] * 127.0).round() as i32,
            (vert.normal[1] * 127.0).round() as i32,
            (vert.normal[2] * 127.0).round() as i32,
        ]
    } else {
        [
            (vert.color[0] * 255.0).round() as i32,
            (vert.color[1] * 255.0).round() as i32,
            (vert.color[2] * 255.0).round() as i32,
        ]
    }
}

/// Walk a mesh's cache groups in emission order, yielding each vertex with
/// its resolved material. Fails on a vertex no face of its group draws.
pub(crate) fn emitted_verts<'a>(
    scene: &'a Scene,
    mesh: &'a Mesh,
) -> Result<Vec<(&'a Vertex, &'a Material)>> {
    let mut out = Vec::with_capacity(mesh.verts.len());
    for cache in &mesh.caches {
        for &vert_index in &cache.verts {
            let material = find_material_from_vert(cache, vert_index)
                .context("Inconsistent face/vertex texture information")?;
            out.push((&mesh.verts[vert_index], scene.materials.get(material)));
        }
    }
    Ok(out)
}
