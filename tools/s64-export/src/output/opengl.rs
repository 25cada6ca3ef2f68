//! OpenGL-flavor C header body: material structs, interleaved vertex
//! arrays, index buffers, and per-material render blocks. No stateful
//! command stream here; the runtime walks the render blocks directly.

use super::mesh_symbol;
use crate::material::MaterialKind;
use crate::scene::{Mesh, Scene};
use crate::Config;
use anyhow::Result;
use std::fmt::Write as _;

/// A run of faces sharing one material, with the vertex window it draws
/// from. `material` is `None` for OMIT or DONTLOAD runs, which render with
/// whatever state is active.
pub(crate) struct RenderBlock {
    pub material: Option<usize>,
    pub vert_offset: usize,
    pub vert_count: usize,
    pub face_offset: usize,
    pub face_count: usize,
}

/// Split a mesh's face stream into render blocks at every material switch.
pub(crate) fn render_blocks(scene: &Scene, mesh: &Mesh) -> Vec<RenderBlock> {
    let mut blocks: Vec<RenderBlock> = Vec::new();
    let mut last_material: Option<usize> = None;
    let mut face_count = 0usize;
    let mut face_offset = 0usize;
    let mut min_vert = usize::MAX;
    let mut max_vert = 0usize;

    for cache in &mesh.caches {
        for face in &cache.faces {
            if last_material != Some(face.material) {
                last_material = Some(face.material);
                let mat = scene.materials.get(face.material);
                let vert_offset = blocks
                    .last()
                    .map(|b| b.vert_offset + b.vert_count)
                    .unwrap_or(0);
                blocks.push(RenderBlock {
                    material: (!mat.is_omit() && !mat.dontload).then_some(face.material),
                    vert_offset,
                    vert_count: 0,
                    face_offset: face_count,
                    face_count: 0,
                });
                face_offset = face_count;
                min_vert = usize::MAX;
                max_vert = 0;
            }

            for &vert in &face.verts {
                min_vert = min_vert.min(vert);
                max_vert = max_vert.max(vert);
            }
            face_count += 1;

            if let Some(block) = blocks.last_mut() {
                block.face_count = face_count - face_offset;
                block.face_offset = face_offset;
                block.vert_count = max_vert - min_vert + 1;
            }
        }
    }
    blocks
}

fn gl_filter(texfilter: &str) -> &'static str {
    if texfilter == "G_TF_POINT" {
        "GL_NEAREST"
    } else {
        "GL_LINEAR"
    }
}

fn gl_wrap(texmode: &str) -> &'static str {
    match texmode {
        "G_TX_MIRROR" => "GL_MIRRORED_REPEAT_ARB",
        "G_TX_WRAP" => "GL_REPEAT",
        _ => "GL_CLAMP",
    }
}

/// Build the materials and models sections of the OpenGL header.
pub(crate) fn construct_opengl(scene: &Scene, config: &Config) -> Result<String> {
    let mut out = String::new();

    out.push_str(
        "\n/*********************************\n\
         \x20            Materials\n\
         *********************************/\n\n",
    );

    for mat in scene.materials.iter() {
        if mat.is_omit() || mat.dontload {
            continue;
        }
        match &mat.kind {
            MaterialKind::Texture(tex) => {
                let _ = writeln!(
                    out,
                    "static s64Texture matdata_{} = {{&{}, {}, {}, {}, {}, {}}};",
                    mat.name,
                    mat.name,
                    tex.width,
                    tex.height,
                    gl_filter(&mat.texfilter),
                    gl_wrap(&tex.texmode_s),
                    gl_wrap(&tex.texmode_t)
                );
            }
            MaterialKind::PrimColor { r, g, b } => {
                let _ = writeln!(
                    out,
                    "static s64PrimColor matdata_{} = {{{}, {}, {}, 255}};",
                    mat.name, r, g, b
                );
            }
            MaterialKind::Omit => {}
        }

        let type_name = match mat.kind {
            MaterialKind::Texture(_) => "TYPE_TEXTURE",
            _ => "TYPE_PRIMCOL",
        };
        let _ = writeln!(
            out,
            "static s64Material mat_{} = {{{}, &matdata_{}, {}, {}, {}, {}, {}}};\n",
            mat.name,
            type_name,
            mat.name,
            mat.has_geo_flag("G_LIGHTING") as u8,
            mat.has_geo_flag("G_CULL_FRONT") as u8,
            mat.has_geo_flag("G_CULL_BACK") as u8,
            mat.has_geo_flag("G_SHADING_SMOOTH") as u8,
            mat.has_geo_flag("G_ZBUFFER") as u8
        );
    }

    out.push_str(
        "\n/*********************************\n\
         \x20             Models\n\
         *********************************/\n\n",
    );

    for mesh in &scene.meshes {
        let symbol = mesh_symbol(scene, mesh, &config.model_name);
        let blocks = render_blocks(scene, mesh);

        let _ = writeln!(out, "static f32 vtx_{}[][11] = {{", symbol);
        let mut vert_index = 0usize;
        for cache in &mesh.caches {
            for &vi in &cache.verts {
                let vert = &mesh.verts[vi];
                let _ = writeln!(
                    out,
                    "    {{{:.4}f, {:.4}f, {:.4}f, {:.4}f, {:.4}f, {:.4}f, {:.4}f, {:.4}f, {:.4}f, {:.4}f, {:.4}f}}, /* {} */",
                    vert.pos[0], vert.pos[1], vert.pos[2],
                    vert.uv[0], vert.uv[1],
                    vert.normal[0], vert.normal[1], vert.normal[2],
                    vert.color[0], vert.color[1], vert.color[2],
                    vert_index
                );
                vert_index += 1;
            }
        }
        out.push_str("};\n\n");

        let _ = writeln!(out, "static u16 ind_{}[][3] = {{", symbol);
        let mut face_index = 0usize;
        for cache in &mesh.caches {
            for face in &cache.faces {
                let _ = writeln!(
                    out,
                    "    {{{}, {}, {}}}, /* {} */",
                    face.verts[0], face.verts[1], face.verts[2], face_index
                );
                face_index += 1;
            }
        }
        out.push_str("};\n\n");

        let _ = writeln!(out, "static s64RenderBlock renb_{}[] = {{", symbol);
        for block in &blocks {
            let _ = write!(
                out,
                "\t{{&vtx_{}[{}], {}, {}, &ind_{}[{}], ",
                symbol, block.vert_offset, block.vert_count, block.face_count, symbol, block.face_offset
            );
            match block.material {
                Some(mat) => {
                    let _ = writeln!(out, "&mat_{}}},", scene.materials.get(mat).name);
                }
                None => {
                    let _ = writeln!(out, "NULL}},");
                }
            }
        }
        out.push_str("};\n\n");

        let _ = writeln!(
            out,
            "static s64Gfx gfx_{} = {{{}, 0xFFFFFFFF, 0xFFFFFFFF, 0xFFFFFFFF, renb_{}}};\n",
            symbol,
            blocks.len(),
            symbol
        );
    }

    tracing::info!("Finish building display lists");
    Ok(out)
}
