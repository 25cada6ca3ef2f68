//! Mesh optimization: material-run sorting and vertex-cache partitioning.
//!
//! Faces are stably sorted by material so shared-material runs coalesce
//! state changes and fuse into two-triangle commands, then packed greedily
//! into cache groups no larger than the hardware vertex cache. A vertex
//! needed by faces in two groups is duplicated into each; afterwards every
//! mesh's vertex list is rebuilt as the concatenation of its groups, so the
//! emitted vertex array and the per-group load offsets line up by
//! construction. Vertices no face references drop out here.

use crate::scene::{Face, Mesh, Scene, VertCache, Vertex};

pub fn optimize_scene(scene: &mut Scene, cache_size: usize) {
    for mesh in &mut scene.meshes {
        optimize_mesh(mesh, cache_size);
        tracing::info!(
            "Optimized mesh '{}': {} vertices across {} cache blocks",
            mesh.name,
            mesh.verts.len(),
            mesh.caches.len()
        );
    }
}

fn optimize_mesh(mesh: &mut Mesh, cache_size: usize) {
    mesh.faces.sort_by_key(|f| f.material);

    // Greedy packing over the sorted faces, tracking which source vertices
    // are resident in the open group.
    struct Group {
        verts: Vec<usize>,
        faces: Vec<Face>,
    }
    let mut groups: Vec<Group> = Vec::new();
    let mut open = Group {
        verts: Vec::new(),
        faces: Vec::new(),
    };

    for face in &mesh.faces {
        let mut missing: Vec<usize> = Vec::new();
        for &v in &face.verts {
            if !open.verts.contains(&v) && !missing.contains(&v) {
                missing.push(v);
            }
        }
        if !open.faces.is_empty() && open.verts.len() + missing.len() > cache_size {
            groups.push(std::mem::replace(
                &mut open,
                Group {
                    verts: Vec::new(),
                    faces: Vec::new(),
                },
            ));
            missing.clear();
            for &v in &face.verts {
                if !missing.contains(&v) {
                    missing.push(v);
                }
            }
        }
        open.verts.extend_from_slice(&missing);
        open.faces.push(*face);
    }
    if !open.faces.is_empty() {
        groups.push(open);
    }

    // Rebuild the vertex list as the concatenation of the groups and remap
    // face indices into it.
    let mut new_verts: Vec<Vertex> = Vec::new();
    let mut new_faces: Vec<Face> = Vec::new();
    let mut caches: Vec<VertCache> = Vec::new();
    for group in groups {
        let base = new_verts.len();
        let mut remap = hashbrown::HashMap::with_capacity(group.verts.len());
        for &old in &group.verts {
            remap.insert(old, new_verts.len());
            new_verts.push(mesh.verts[old]);
        }
        let faces: Vec<Face> = group
            .faces
            .iter()
            .map(|f| Face {
                verts: f.verts.map(|v| remap[&v]),
                material: f.material,
            })
            .collect();
        new_faces.extend_from_slice(&faces);
        caches.push(VertCache {
            verts: (base..new_verts.len()).collect(),
            faces,
        });
    }

    mesh.verts = new_verts;
    mesh.faces = new_faces;
    mesh.caches = caches;
}
