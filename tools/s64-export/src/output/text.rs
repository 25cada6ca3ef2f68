//! C header emission: vertex arrays, display lists, animation tables, and
//! the aggregate model structs.

use super::{emitted_verts, mesh_symbol, opengl, parent_index, vert_color_normal, vert_texture_dims};
use crate::dlist::{format_op, synthesize, DlistState};
use crate::scene::Scene;
use crate::Config;
use anyhow::{Context, Result};
use s64_common::float_to_s10p5;
use std::fmt::Write as _;
use std::fs;

/// Write the `.h` output file.
pub fn write_output_text(scene: &Scene, config: &Config) -> Result<()> {
    let path = format!("{}.h", config.output_name);
    let model = &config.model_name;
    let make_structs = !scene.animations.is_empty() || scene.is_multimesh();

    let mut out = String::new();
    let _ = writeln!(out, "// Generated by s64-export v{}\n", env!("CARGO_PKG_VERSION"));

    if make_structs {
        let _ = writeln!(out, "// Model convenience macro");
        let _ = writeln!(out, "#define MODEL_{} (&mdl_{})\n", model, model);

        let longest_mesh = scene.meshes.iter().map(|m| m.name.len()).max().unwrap_or(0);
        let _ = writeln!(out, "// Mesh data\n#define MESHCOUNT_{} {}\n", model, scene.meshes.len());
        for (index, mesh) in scene.meshes.iter().enumerate() {
            let pad = " ".repeat(longest_mesh - mesh.name.len());
            let _ = writeln!(out, "#define MESH_{}_{} {}{}", model, mesh.name, pad, index);
        }
        out.push('\n');

        let longest_anim = scene
            .animations
            .iter()
            .map(|a| a.name.len())
            .max()
            .unwrap_or(0);
        let _ = writeln!(
            out,
            "// Animation data\n#define ANIMATIONCOUNT_{} {}\n",
            model,
            scene.animations.len()
        );
        for (index, anim) in scene.animations.iter().enumerate() {
            let pad = " ".repeat(longest_anim - anim.name.len());
            let _ = writeln!(out, "#define ANIMATION_{}_{} {}{}", model, anim.name, pad, index);
        }
        out.push('\n');
    }

    if config.opengl {
        out.push_str(&opengl::construct_opengl(scene, config)?);
    } else {
        out.push_str(&construct_dltext(scene, config)?);
    }

    if !scene.animations.is_empty() {
        push_animation_data(&mut out, scene, model);
    }

    if make_structs {
        push_model_structs(&mut out, scene, config);
    }

    fs::write(&path, out).with_context(|| format!("Unable to open '{}' for writing", path))?;
    tracing::info!("Wrote output to '{}'", path);
    Ok(())
}

/// Build the vertex arrays and RSP display lists for every mesh.
fn construct_dltext(scene: &Scene, config: &Config) -> Result<String> {
    tracing::info!("Constructing display lists");
    let mut out = String::new();

    out.push_str(
        "\n// Custom combine mode to allow mixing primitive and vertex colors\n\
         #ifndef G_CC_PRIMLITE\n    #define G_CC_PRIMLITE SHADE,0,PRIMITIVE,0,0,0,0,PRIMITIVE\n#endif\n\n\n\
         /*********************************\n\
         \x20             Models\n\
         *********************************/\n\n",
    );

    // The loaded-material cache spans every mesh in the file.
    let mut state = DlistState::new(config);

    for mesh in &scene.meshes {
        let symbol = mesh_symbol(scene, mesh, &config.model_name);

        let _ = writeln!(out, "static Vtx vtx_{}[] = {{", symbol);
        for (index, (vert, mat)) in emitted_verts(scene, mesh)?.into_iter().enumerate() {
            let (tex_w, tex_h) = vert_texture_dims(mat);
            let [r, g, b] = vert_color_normal(mat, vert);
            let _ = writeln!(
                out,
                "    {{{}, {}, {}, 0, {}, {}, {}, {}, {}, 255}}, /* {} */",
                vert.pos[0].round() as i32,
                vert.pos[1].round() as i32,
                vert.pos[2].round() as i32,
                float_to_s10p5(vert.uv[0] * tex_w as f32),
                float_to_s10p5(vert.uv[1] * tex_h as f32),
                r,
                g,
                b,
                index
            );
        }
        out.push_str("};\n\n");

        let _ = writeln!(out, "static Gfx gfx_{}[] = {{", symbol);
        for op in synthesize(&mut state, scene, mesh, &config.model_name, true)? {
            out.push_str(&format_op(&op));
        }
        out.push_str("};\n\n");
    }

    tracing::info!("Finish building display lists");
    Ok(out)
}

/// Per-keyframe transform arrays plus the keyframe table of each animation.
fn push_animation_data(out: &mut String, scene: &Scene, model: &str) {
    out.push('\n');
    out.push_str(
        "/*********************************\n\
         \x20         Animation Data\n\
         *********************************/",
    );

    for anim in &scene.animations {
        out.push_str("\n\n");
        for keyframe in &anim.keyframes {
            let _ = writeln!(
                out,
                "static s64Transform anim_{}_{}_framedata{}[] = {{",
                model, anim.name, keyframe.frame
            );
            for mesh_index in 0..scene.meshes.len() {
                let Some(t) = keyframe
                    .transforms
                    .iter()
                    .find(|t| t.mesh == Some(mesh_index))
                else {
                    continue;
                };
                let _ = writeln!(
                    out,
                    "    {{{{{:.4}f, {:.4}f, {:.4}f}}, {{{:.4}f, {:.4}f, {:.4}f, {:.4}f}}, {{{:.4}f, {:.4}f, {:.4}f}}}},",
                    t.translation[0], t.translation[1], t.translation[2],
                    t.rotation[0], t.rotation[1], t.rotation[2], t.rotation[3],
                    t.scale[0], t.scale[1], t.scale[2]
                );
            }
            out.push_str("};\n");
        }

        let _ = writeln!(out, "static s64KeyFrame anim_{}_{}_keyframes[] = {{", model, anim.name);
        for keyframe in &anim.keyframes {
            let _ = writeln!(
                out,
                "    {{{}, anim_{}_{}_framedata{}}},",
                keyframe.frame, model, anim.name, keyframe.frame
            );
        }
        out.push_str("};");
    }
}

/// The aggregate mesh list, animation list, and model struct.
fn push_model_structs(out: &mut String, scene: &Scene, config: &Config) {
    let model = &config.model_name;
    out.push_str("\n\n\n");
    out.push_str(
        "/*********************************\n\
         \x20       Sausage64 Structs\n\
         *********************************/\n\n",
    );

    let _ = writeln!(out, "static s64Mesh meshes_{}[] = {{", model);
    for mesh in &scene.meshes {
        let symbol = mesh_symbol(scene, mesh, model);
        let gfx_ref = if config.opengl { "&" } else { "" };
        let _ = writeln!(
            out,
            "    {{\"{}\", {}, {}gfx_{}, {}}},",
            mesh.name,
            mesh.has_property("Billboard") as u8,
            gfx_ref,
            symbol,
            parent_index(scene, mesh)
        );
    }
    out.push_str("};\n\n");

    let _ = writeln!(out, "static s64Animation anims_{}[] = {{", model);
    for anim in &scene.animations {
        let _ = writeln!(
            out,
            "    {{\"{}\", {}, anim_{}_{}_keyframes}},",
            anim.name,
            anim.keyframes.len(),
            model,
            anim.name
        );
    }
    out.push_str("};\n\n");

    let _ = write!(
        out,
        "static s64ModelData mdl_{} = {{{}, {}, meshes_{}, anims_{}}};",
        model,
        scene.meshes.len(),
        scene.animations.len(),
        model,
        model
    );
}
