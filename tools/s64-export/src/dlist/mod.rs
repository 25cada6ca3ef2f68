//! Display-list synthesis.
//!
//! The synthesizer walks a mesh's vertex-cache groups and emits the minimal
//! command stream that reproduces each face's material state on a stateful
//! GPU: only the deltas between the previously loaded material and the next
//! one are emitted, state-class changes share a single trailing pipe sync,
//! and consecutive faces drawn with the loaded material fuse into one
//! two-triangle command.
//!
//! The loaded-material tracking deliberately spans meshes: the emitter
//! state lives in [`DlistState`] and is threaded through every mesh of a
//! compilation run, so the first face of a later mesh can inherit state
//! from the previous one.

mod binary;
mod text;

pub use binary::{encode_command, encode_op};
pub use text::format_op;

use crate::material::MaterialKind;
use crate::scene::{Mesh, Scene};
use crate::Config;
use anyhow::{Context, Result};
use s64_common::{nearest_pow2, GfxCommand};

/// One emitted display-list command, carrying its typed arguments.
/// `Separator` is a text-only blank line between vertex cache groups.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    SetCycleType { cycle: String },
    SetRenderMode { mode1: String, mode2: String },
    SetCombineMode { mode1: String, mode2: String },
    SetTextureFilter { filter: String },
    ClearGeometryMode,
    SetGeometryMode { flags: Vec<String> },
    LoadTextureBlock { texture: String, data: TextureArgs },
    SetPrimColor { r: u8, g: u8, b: u8 },
    Vertex { symbol: String, offset: usize, count: usize },
    Tri1 { v: [usize; 3] },
    Tri2 { a: [usize; 3], b: [usize; 3] },
    PipeSync,
    EndDisplayList,
    Separator,
}

/// Texture-load arguments lifted from the material.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureArgs {
    pub coltype: String,
    pub colsize: String,
    pub width: u32,
    pub height: u32,
    pub texmode_s: String,
    pub texmode_t: String,
}

impl Op {
    /// The microcode command this op emits, or `None` for the text-only
    /// separator.
    pub fn command(&self) -> Option<GfxCommand> {
        Some(match self {
            Op::SetCycleType { .. } => GfxCommand::DPSetCycleType,
            Op::SetRenderMode { .. } => GfxCommand::DPSetRenderMode,
            Op::SetCombineMode { .. } => GfxCommand::DPSetCombineMode,
            Op::SetTextureFilter { .. } => GfxCommand::DPSetTextureFilter,
            Op::ClearGeometryMode => GfxCommand::SPClearGeometryMode,
            Op::SetGeometryMode { .. } => GfxCommand::SPSetGeometryMode,
            Op::LoadTextureBlock { data, .. } => {
                if data.colsize == "G_IM_SIZ_4b" {
                    GfxCommand::DPLoadTextureBlock4b
                } else {
                    GfxCommand::DPLoadTextureBlock
                }
            }
            Op::SetPrimColor { .. } => GfxCommand::DPSetPrimColor,
            Op::Vertex { .. } => GfxCommand::SPVertex,
            Op::Tri1 { .. } => GfxCommand::SP1Triangle,
            Op::Tri2 { .. } => GfxCommand::SP2Triangles,
            Op::PipeSync => GfxCommand::DPPipeSync,
            Op::EndDisplayList => GfxCommand::SPEndDisplayList,
            Op::Separator => return None,
        })
    }

    /// Render the argument list in its textual macro-call form. Both
    /// serializers consume this, so arity always matches the command table.
    pub fn args(&self) -> Vec<String> {
        match self {
            Op::SetCycleType { cycle } => vec![cycle.clone()],
            Op::SetRenderMode { mode1, mode2 } => vec![mode1.clone(), mode2.clone()],
            Op::SetCombineMode { mode1, mode2 } => vec![mode1.clone(), mode2.clone()],
            Op::SetTextureFilter { filter } => vec![filter.clone()],
            Op::ClearGeometryMode => vec!["0xFFFFFFFF".into()],
            Op::SetGeometryMode { flags } => vec![flags.join(" | ")],
            Op::LoadTextureBlock { texture, data } => {
                let mut args = vec![texture.clone(), data.coltype.clone()];
                if data.colsize != "G_IM_SIZ_4b" {
                    args.push(data.colsize.clone());
                }
                args.extend([
                    data.width.to_string(),
                    data.height.to_string(),
                    "0".into(),
                    data.texmode_s.clone(),
                    data.texmode_t.clone(),
                    nearest_pow2(data.width).to_string(),
                    nearest_pow2(data.height).to_string(),
                    "G_TX_NOLOD".into(),
                    "G_TX_NOLOD".into(),
                ]);
                args
            }
            Op::SetPrimColor { r, g, b } => vec![
                "0".into(),
                "0".into(),
                r.to_string(),
                g.to_string(),
                b.to_string(),
                "255".into(),
            ],
            Op::Vertex { symbol, offset, count } => vec![
                format!("{}+{}", symbol, offset),
                count.to_string(),
                "0".into(),
            ],
            Op::Tri1 { v } => vec![
                v[0].to_string(),
                v[1].to_string(),
                v[2].to_string(),
                "0".into(),
            ],
            Op::Tri2 { a, b } => vec![
                a[0].to_string(),
                a[1].to_string(),
                a[2].to_string(),
                "0".into(),
                b[0].to_string(),
                b[1].to_string(),
                b[2].to_string(),
                "0".into(),
            ],
            Op::PipeSync | Op::EndDisplayList | Op::Separator => Vec::new(),
        }
    }
}

/// Emitter state carried across every mesh of one output file.
#[derive(Debug)]
pub struct DlistState {
    pub last_material: Option<usize>,
    initial_load_elided: bool,
    no_two_tri: bool,
}

impl DlistState {
    pub fn new(config: &Config) -> Self {
        Self {
            last_material: None,
            initial_load_elided: config.initial_load_elided,
            no_two_tri: config.no_two_tri,
        }
    }
}

/// Geometry-mode sets compare as multisets of flag names.
fn geo_flags_changed(new: &[String], old: &[String]) -> bool {
    if new.len() != old.len() {
        return true;
    }
    new.iter().any(|flag| !old.contains(flag))
}

/// Build the command sequence for one mesh. `text_mode` only controls the
/// blank-line separators between vertex cache groups.
pub fn synthesize(
    state: &mut DlistState,
    scene: &Scene,
    mesh: &Mesh,
    model_name: &str,
    text_mode: bool,
) -> Result<Vec<Op>> {
    let mut ops = Vec::new();
    let mut vert_cursor = 0usize;

    let mut symbol = format!("vtx_{}", model_name);
    if scene.is_multimesh() {
        symbol.push('_');
        symbol.push_str(&mesh.name);
    }

    for (cache_index, cache) in mesh.caches.iter().enumerate() {
        let mut loaded_verts = false;
        let mut face_index = 0;

        while face_index < cache.faces.len() {
            let face = &cache.faces[face_index];
            let mat = scene.materials.get(face.material);

            // A pre-initialized GPU: adopt the first material unseen.
            if state.last_material.is_none() && state.initial_load_elided {
                state.last_material = Some(face.material);
            }

            if state.last_material != Some(face.material) && !mat.is_omit() {
                let last = state.last_material.map(|m| scene.materials.get(m));
                let mut pipesync = false;

                if last.map_or(true, |l| l.cycle != mat.cycle) {
                    ops.push(Op::SetCycleType {
                        cycle: mat.cycle.clone(),
                    });
                    pipesync = true;
                }
                if last.map_or(true, |l| {
                    l.rendermode1 != mat.rendermode1 || l.rendermode2 != mat.rendermode2
                }) {
                    ops.push(Op::SetRenderMode {
                        mode1: mat.rendermode1.clone(),
                        mode2: mat.rendermode2.clone(),
                    });
                    pipesync = true;
                }
                if last.map_or(true, |l| {
                    l.combinemode1 != mat.combinemode1 || l.combinemode2 != mat.combinemode2
                }) {
                    ops.push(Op::SetCombineMode {
                        mode1: mat.combinemode1.clone(),
                        mode2: mat.combinemode2.clone(),
                    });
                    pipesync = true;
                }
                if last.map_or(true, |l| l.texfilter != mat.texfilter) {
                    ops.push(Op::SetTextureFilter {
                        filter: mat.texfilter.clone(),
                    });
                    pipesync = true;
                }

                // Geometry-mode deltas never demand a pipe sync.
                if last.map_or(true, |l| geo_flags_changed(&mat.geo_flags, &l.geo_flags)) {
                    ops.push(Op::ClearGeometryMode);
                    ops.push(Op::SetGeometryMode {
                        flags: mat.geo_flags.clone(),
                    });
                }

                if !mat.dontload {
                    match &mat.kind {
                        MaterialKind::Texture(tex) => {
                            ops.push(Op::LoadTextureBlock {
                                texture: mat.name.clone(),
                                data: TextureArgs {
                                    coltype: tex.coltype.clone(),
                                    colsize: tex.colsize.clone(),
                                    width: tex.width,
                                    height: tex.height,
                                    texmode_s: tex.texmode_s.clone(),
                                    texmode_t: tex.texmode_t.clone(),
                                },
                            });
                            pipesync = true;
                        }
                        MaterialKind::PrimColor { r, g, b } => {
                            ops.push(Op::SetPrimColor {
                                r: *r,
                                g: *g,
                                b: *b,
                            });
                        }
                        MaterialKind::Omit => {}
                    }
                }

                if pipesync {
                    ops.push(Op::PipeSync);
                }
                state.last_material = Some(face.material);
            }

            if !loaded_verts {
                ops.push(Op::Vertex {
                    symbol: symbol.clone(),
                    offset: vert_cursor,
                    count: cache.verts.len(),
                });
                vert_cursor += cache.verts.len();
                loaded_verts = true;
            }

            let local = |vert: usize| -> Result<usize> {
                cache
                    .verts
                    .iter()
                    .position(|&v| v == vert)
                    .context("Inconsistent face/vertex cache information")
            };

            // Fuse with the next face when it draws with the material that
            // is actually loaded (which an interleaved OMIT face may have
            // left different from this face's own material).
            let fuse = !state.no_two_tri
                && face_index + 1 < cache.faces.len()
                && Some(cache.faces[face_index + 1].material) == state.last_material;
            if fuse {
                let next = &cache.faces[face_index + 1];
                ops.push(Op::Tri2 {
                    a: [local(face.verts[0])?, local(face.verts[1])?, local(face.verts[2])?],
                    b: [local(next.verts[0])?, local(next.verts[1])?, local(next.verts[2])?],
                });
                face_index += 2;
            } else {
                ops.push(Op::Tri1 {
                    v: [local(face.verts[0])?, local(face.verts[1])?, local(face.verts[2])?],
                });
                face_index += 1;
            }
        }

        if text_mode && cache_index + 1 < mesh.caches.len() {
            ops.push(Op::Separator);
        }
    }

    ops.push(Op::EndDisplayList);
    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{parse_material_file, MaterialTable};
    use crate::optimizer::optimize_scene;
    use crate::parser::parse_scene;
    use std::io::Cursor;

    const MATERIALS: &str = "\
BEGIN MATERIAL Stone
    TYPE TEXTURE
    IMAGE 32 32 G_IM_FMT_RGBA G_IM_SIZ_16b G_TX_WRAP G_TX_WRAP
    CYCLE G_CYC_1CYCLE
    RENDERMODE G_RM_AA_ZB_OPA_SURF G_RM_AA_ZB_OPA_SURF2
    COMBINEMODE G_CC_MODULATEIDECALA G_CC_MODULATEIDECALA
    TEXFILTER G_TF_BILERP
    GEOFLAGS G_ZBUFFER G_SHADE G_LIGHTING
END MATERIAL
BEGIN MATERIAL StoneFast
    TYPE TEXTURE
    IMAGE 32 32 G_IM_FMT_RGBA G_IM_SIZ_16b G_TX_WRAP G_TX_WRAP
    CYCLE G_CYC_2CYCLE
    RENDERMODE G_RM_AA_ZB_OPA_SURF G_RM_AA_ZB_OPA_SURF2
    COMBINEMODE G_CC_MODULATEIDECALA G_CC_MODULATEIDECALA
    TEXFILTER G_TF_BILERP
    GEOFLAGS G_ZBUFFER G_SHADE G_LIGHTING
    DONTLOAD
END MATERIAL
";

    fn table() -> MaterialTable {
        let mut table = MaterialTable::new();
        parse_material_file(Cursor::new(MATERIALS), &mut table).unwrap();
        table
    }

    fn scene_of(faces: &str) -> Scene {
        let src = format!(
            "BEGIN MESH M\nBEGIN VERTICES\n\
             0.0 0.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 0.0 0.0\n\
             1.0 0.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 1.0 0.0\n\
             1.0 1.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 1.0 1.0\n\
             0.0 1.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 0.0 1.0\n\
             END\nBEGIN FACES\n{}END\nEND\n",
            faces
        );
        let mut scene = parse_scene(Cursor::new(src.as_str()), table(), false).unwrap();
        optimize_scene(&mut scene, 32);
        scene
    }

    fn names(ops: &[Op]) -> Vec<&'static str> {
        ops.iter()
            .filter_map(|op| op.command())
            .map(|c| c.name())
            .collect()
    }

    fn run(scene: &Scene, config: &Config) -> Vec<Op> {
        let mut state = DlistState::new(config);
        synthesize(&mut state, scene, &scene.meshes[0], "M", true).unwrap()
    }

    #[test]
    fn single_triangle_full_state_emission() {
        let scene = scene_of("3 0 1 2 Stone\n");
        let ops = run(&scene, &Config::default());
        assert_eq!(
            names(&ops),
            vec![
                "DPSetCycleType",
                "DPSetRenderMode",
                "DPSetCombineMode",
                "DPSetTextureFilter",
                "SPClearGeometryMode",
                "SPSetGeometryMode",
                "DPLoadTextureBlock",
                "DPPipeSync",
                "SPVertex",
                "SP1Triangle",
                "SPEndDisplayList",
            ]
        );
        assert!(ops.contains(&Op::Vertex {
            symbol: "vtx_M".into(),
            offset: 0,
            count: 3
        }));
    }

    #[test]
    fn elided_initial_load_adopts_the_first_material() {
        let scene = scene_of("3 0 1 2 Stone\n");
        let config = Config {
            initial_load_elided: true,
            ..Config::default()
        };
        let ops = run(&scene, &config);
        assert_eq!(names(&ops), vec!["SPVertex", "SP1Triangle", "SPEndDisplayList"]);
    }

    #[test]
    fn adjacent_same_material_faces_fuse() {
        let scene = scene_of("3 0 1 2 Stone\n3 0 2 3 Stone\n");
        let ops = run(&scene, &Config::default());
        let tri_names: Vec<_> = names(&ops)
            .into_iter()
            .filter(|n| n.contains("Triangle"))
            .collect();
        assert_eq!(tri_names, vec!["SP2Triangles"]);
    }

    #[test]
    fn fusion_disabled_emits_single_triangles() {
        let scene = scene_of("3 0 1 2 Stone\n3 0 2 3 Stone\n");
        let config = Config {
            no_two_tri: true,
            ..Config::default()
        };
        let ops = run(&scene, &config);
        let tri_names: Vec<_> = names(&ops)
            .into_iter()
            .filter(|n| n.contains("Triangle"))
            .collect();
        assert_eq!(tri_names, vec!["SP1Triangle", "SP1Triangle"]);
    }

    #[test]
    fn only_the_changed_state_class_re_emits() {
        // Stone and StoneFast differ in cycle type alone.
        let scene = scene_of("3 0 1 2 Stone\n3 0 2 3 StoneFast\n");
        let ops = run(&scene, &Config::default());
        let all = names(&ops);
        let second_change: Vec<_> = all
            .iter()
            .skip_while(|n| **n != "SP1Triangle")
            .skip(1)
            .take_while(|n| !n.contains("Triangle"))
            .copied()
            .collect();
        assert_eq!(second_change, vec!["DPSetCycleType", "DPPipeSync"]);
    }

    #[test]
    fn pipesync_only_follows_pipe_state_changes() {
        let scene = scene_of("3 0 1 2 Stone\n3 0 2 3 StoneFast\n");
        let ops = run(&scene, &Config::default());
        let pipe_setters = [
            "DPSetCycleType",
            "DPSetRenderMode",
            "DPSetCombineMode",
            "DPSetTextureFilter",
            "DPLoadTextureBlock",
            "DPLoadTextureBlock_4b",
        ];
        let mut armed = false;
        for name in names(&ops) {
            if pipe_setters.contains(&name) {
                armed = true;
            } else if name == "DPPipeSync" {
                assert!(armed, "pipe sync without a prior pipe-stage change");
                armed = false;
            }
        }
    }

    #[test]
    fn state_persists_across_meshes() {
        let src = "\
BEGIN MESH A
BEGIN VERTICES
0.0 0.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 0.0 0.0
1.0 0.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 1.0 0.0
1.0 1.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 1.0 1.0
END
BEGIN FACES
3 0 1 2 Stone
END
END
BEGIN MESH B
BEGIN VERTICES
0.0 0.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 0.0 0.0
1.0 0.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 1.0 0.0
1.0 1.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 1.0 1.0
END
BEGIN FACES
3 0 1 2 Stone
END
END
";
        let mut scene = parse_scene(Cursor::new(src), table(), false).unwrap();
        optimize_scene(&mut scene, 32);
        let config = Config::default();
        let mut state = DlistState::new(&config);
        let _ = synthesize(&mut state, &scene, &scene.meshes[0], "M", true).unwrap();
        let second = synthesize(&mut state, &scene, &scene.meshes[1], "M", true).unwrap();
        // Mesh B inherits Stone from mesh A: no state commands at all.
        assert_eq!(
            names(&second),
            vec!["SPVertex", "SP1Triangle", "SPEndDisplayList"]
        );
        assert!(second.contains(&Op::Vertex {
            symbol: "vtx_M_B".into(),
            offset: 0,
            count: 3
        }));
    }

    #[test]
    fn separator_splits_cache_groups_in_text_mode() {
        let src = "\
BEGIN MESH M
BEGIN VERTICES
0.0 0.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 0.0 0.0
1.0 0.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 1.0 0.0
1.0 1.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 1.0 1.0
0.0 1.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 0.0 1.0
2.0 0.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 0.0 0.0
2.0 1.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 0.0 1.0
END
BEGIN FACES
3 0 1 2 Stone
3 1 2 3 Stone
3 2 3 4 Stone
3 3 4 5 Stone
END
END
";
        let mut scene = parse_scene(Cursor::new(src), table(), false).unwrap();
        optimize_scene(&mut scene, 4);
        let config = Config::default();
        let mut state = DlistState::new(&config);
        let text_ops = synthesize(&mut state, &scene, &scene.meshes[0], "M", true).unwrap();
        assert!(text_ops.contains(&Op::Separator));
        // vertex loads advance the running cursor by each group's size
        let loads: Vec<(usize, usize)> = text_ops
            .iter()
            .filter_map(|op| match op {
                Op::Vertex { offset, count, .. } => Some((*offset, *count)),
                _ => None,
            })
            .collect();
        assert!(loads.len() >= 2);
        assert_eq!(loads[0].0, 0);
        assert_eq!(loads[1].0, loads[0].1);

        let mut state = DlistState::new(&config);
        let bin_ops = synthesize(&mut state, &scene, &scene.meshes[0], "M", false).unwrap();
        assert!(!bin_ops.contains(&Op::Separator));
    }
}
