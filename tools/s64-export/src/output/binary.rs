//! Binary container emission (`<output>.bin`).
//!
//! Everything is big-endian. The mesh TOC points at each mesh's metadata
//! record, vertex records, and display-list blob; the animation section
//! follows the last mesh. See `s64_common::formats::model` for the record
//! layouts.

use super::{emitted_verts, parent_index, vert_color_normal, vert_texture_dims};
use crate::dlist::{encode_op, synthesize, DlistState};
use crate::scene::Scene;
use crate::Config;
use anyhow::{Context, Result};
use s64_common::{float_to_s10p5, GlVert, MeshDataRecord, MeshTocEntry, ModelHeader, UltraVert};
use std::fs;

struct MeshBlob {
    data: Vec<u8>,
    verts: Vec<u8>,
    dlist: Vec<u8>,
    slots: u32,
}

/// Write the `.bin` output file.
pub fn write_output_binary(scene: &Scene, config: &Config) -> Result<()> {
    let path = format!("{}.bin", config.output_name);

    // The loaded-material cache spans every mesh in the file, like the
    // text flavor.
    let mut state = DlistState::new(config);

    let mut blobs = Vec::with_capacity(scene.meshes.len());
    for mesh in &scene.meshes {
        let record = MeshDataRecord {
            parent: parent_index(scene, mesh),
            is_billboard: mesh.has_property("Billboard"),
            name: mesh.name.clone(),
        };

        let verts = if config.opengl {
            gl_vert_data(scene, mesh)
        } else {
            ultra_vert_data(scene, mesh)?
        };

        // The OpenGL flavor carries no command stream; its render blocks
        // are rebuilt by the loader from the material switches.
        let (dlist, slots) = if config.opengl {
            (Vec::new(), 0)
        } else {
            let mut blob = Vec::new();
            let mut slots = 0u32;
            for op in synthesize(&mut state, scene, mesh, &config.model_name, false)? {
                if let Some(rec) = encode_op(&op, &scene.materials)? {
                    blob.extend_from_slice(&rec.to_bytes());
                    slots += 1;
                }
            }
            (blob, slots)
        };

        blobs.push(MeshBlob {
            data: record.to_bytes(),
            verts,
            dlist,
            slots,
        });
    }

    let anim_section = animation_data(scene);

    // Lay the file out: header, TOC, mesh payloads, animation section.
    let mut header = ModelHeader::new(scene.meshes.len() as u16, scene.animations.len() as u16);
    header.offset_meshes = ModelHeader::SIZE as u32;

    let mut cursor = ModelHeader::SIZE + blobs.len() * MeshTocEntry::SIZE;
    let mut toc = Vec::with_capacity(blobs.len());
    for blob in &blobs {
        let mut entry = MeshTocEntry {
            meshdata_offset: cursor as u32,
            meshdata_size: blob.data.len() as u32,
            ..Default::default()
        };
        cursor += blob.data.len();
        entry.vertdata_offset = cursor as u32;
        entry.vertdata_size = blob.verts.len() as u32;
        cursor += blob.verts.len();
        entry.dldata_offset = cursor as u32;
        entry.dldata_size = blob.dlist.len() as u32;
        entry.dldata_slots = blob.slots;
        cursor += blob.dlist.len();
        toc.push(entry);
    }
    header.offset_anims = if scene.animations.is_empty() {
        0
    } else {
        cursor as u32
    };

    let mut file = Vec::with_capacity(cursor + anim_section.len());
    file.extend_from_slice(&header.to_bytes());
    for entry in &toc {
        file.extend_from_slice(&entry.to_bytes());
    }
    for blob in &blobs {
        file.extend_from_slice(&blob.data);
        file.extend_from_slice(&blob.verts);
        file.extend_from_slice(&blob.dlist);
    }
    file.extend_from_slice(&anim_section);

    fs::write(&path, file).with_context(|| format!("Unable to open '{}' for writing", path))?;
    tracing::info!("Wrote output to '{}'", path);
    Ok(())
}

/// Hardware vertex records, one cache group after another: the same
/// scaling and color/normal selection as the text flavor.
fn ultra_vert_data(scene: &Scene, mesh: &crate::scene::Mesh) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(mesh.verts.len() * UltraVert::SIZE);
    for (vert, mat) in emitted_verts(scene, mesh)? {
        let (tex_w, tex_h) = vert_texture_dims(mat);
        let [r, g, b] = vert_color_normal(mat, vert);
        let record = UltraVert {
            pos: [
                vert.pos[0].round() as i16,
                vert.pos[1].round() as i16,
                vert.pos[2].round() as i16,
            ],
            tex: [
                float_to_s10p5(vert.uv[0] * tex_w as f32),
                float_to_s10p5(vert.uv[1] * tex_h as f32),
            ],
            color_normal: [r as u8, g as u8, b as u8, 255],
        };
        out.extend_from_slice(&record.to_bytes());
    }
    Ok(out)
}

/// Float vertex records for the OpenGL flavor.
fn gl_vert_data(_scene: &Scene, mesh: &crate::scene::Mesh) -> Vec<u8> {
    let mut out = Vec::with_capacity(mesh.verts.len() * GlVert::SIZE);
    for cache in &mesh.caches {
        for &vi in &cache.verts {
            let vert = &mesh.verts[vi];
            let record = GlVert {
                pos: vert.pos,
                tex: vert.uv,
                normal: vert.normal,
                color: vert.color,
            };
            out.extend_from_slice(&record.to_bytes());
        }
    }
    out
}

/// Animation section: per animation a keyframe count and NUL-terminated
/// name, then each keyframe's timestamp and mesh transforms.
fn animation_data(scene: &Scene) -> Vec<u8> {
    let mut out = Vec::new();
    for anim in &scene.animations {
        out.extend_from_slice(&(anim.keyframes.len() as u32).to_be_bytes());
        out.extend_from_slice(anim.name.as_bytes());
        out.push(0);
        for keyframe in &anim.keyframes {
            out.extend_from_slice(&keyframe.frame.to_be_bytes());
            let emitted: Vec<_> = keyframe
                .transforms
                .iter()
                .filter(|t| t.mesh.is_some())
                .collect();
            out.extend_from_slice(&(emitted.len() as u32).to_be_bytes());
            for transform in emitted {
                let mesh_index = transform.mesh.unwrap_or(0) as u16;
                out.extend_from_slice(&mesh_index.to_be_bytes());
                for &f in transform
                    .translation
                    .iter()
                    .chain(transform.rotation.iter())
                    .chain(transform.scale.iter())
                {
                    out.extend_from_slice(&f.to_bits().to_be_bytes());
                }
            }
        }
    }
    out
}

/// A decoded display-list blob ends with the terminator record; used by
/// the tests to validate emitted files.
#[cfg(test)]
pub(crate) fn dlist_terminated(blob: &[u8]) -> bool {
    use s64_common::{DlistRecord, GfxCommand};
    let mut rest = blob;
    let mut last = None;
    while !rest.is_empty() {
        match DlistRecord::parse(rest) {
            Some((rec, used)) => {
                last = Some(rec.cmd);
                rest = &rest[used..];
            }
            None => return false,
        }
    }
    last == Some(GfxCommand::SPEndDisplayList)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::MaterialTable;
    use crate::optimizer::optimize_scene;
    use crate::parser::parse_scene;
    use std::io::Cursor;

    const SRC: &str = "\
BEGIN MESH Body
BEGIN VERTICES
0.0 0.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 0.0 0.0
1.0 0.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 1.0 0.0
1.0 1.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 1.0 1.0
END
BEGIN FACES
3 0 1 2 None
END
END
BEGIN ANIMATION Idle
BEGIN KEYFRAME 0
Body 0.0 0.0 0.0 1.0 0.0 0.0 0.0 1.0 1.0 1.0
END
END
";

    fn scene() -> Scene {
        let mut scene = parse_scene(Cursor::new(SRC), MaterialTable::new(), false).unwrap();
        optimize_scene(&mut scene, 32);
        scene
    }

    #[test]
    fn container_walks_back_out() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("model");
        let config = Config {
            output_name: out.to_str().unwrap().to_string(),
            ..Config::default()
        };
        write_output_binary(&scene(), &config).unwrap();

        let bytes = fs::read(dir.path().join("model.bin")).unwrap();
        let header = ModelHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header.mesh_count, 1);
        assert_eq!(header.anim_count, 1);
        assert_eq!(header.offset_meshes as usize, ModelHeader::SIZE);

        let toc = MeshTocEntry::from_bytes(&bytes[header.offset_meshes as usize..]).unwrap();
        let record =
            MeshDataRecord::from_bytes(&bytes[toc.meshdata_offset as usize..]).unwrap();
        assert_eq!(record.name, "Body");
        assert_eq!(record.parent, -1);
        assert_eq!(toc.vertdata_size as usize, 3 * UltraVert::SIZE);

        let dl_start = toc.dldata_offset as usize;
        let dl = &bytes[dl_start..dl_start + toc.dldata_size as usize];
        assert!(dlist_terminated(dl));
        // SPVertex + SP1Triangle + SPEndDisplayList
        assert_eq!(toc.dldata_slots, 3);

        // the animation section starts right after the display list
        assert_eq!(header.offset_anims as usize, dl_start + dl.len());
        let anims = &bytes[header.offset_anims as usize..];
        assert_eq!(u32::from_be_bytes([anims[0], anims[1], anims[2], anims[3]]), 1);
        assert_eq!(&anims[4..8], b"Idle");
    }

    #[test]
    fn vertex_record_contents() {
        let scene = scene();
        let data = ultra_vert_data(&scene, &scene.meshes[0]).unwrap();
        assert_eq!(data.len(), 3 * UltraVert::SIZE);
        let second = UltraVert::from_bytes(&data[UltraVert::SIZE..]).unwrap();
        assert_eq!(second.pos, [1, 0, 0]);
        // OMIT material: zeroed color/normal, opaque alpha
        assert_eq!(second.color_normal, [0, 0, 0, 255]);
    }
}
