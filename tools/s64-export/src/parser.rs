//! Sausage64 `.s64` scene parser.
//!
//! Line and token oriented, with a small lexer state machine and a single
//! saved predecessor state for one level of BEGIN/END (and block comment)
//! nesting. Comments are recognized at whitespace-token granularity only:
//! a `/*` glued to the middle of a word is treated as opening a comment for
//! the rest of the line. Files exported from Blender never hit that.
//!
//! After the file is consumed, three normalization passes run: keyframe
//! transforms are reordered to mesh declaration order, keyframe timestamps
//! are rebased so animations start at frame 0, and (optionally) each mesh's
//! root pivot is subtracted from its vertices and re-added to animated
//! translations.

use crate::material::{atoi, MaterialTable};
use crate::scene::{Animation, Face, Keyframe, Mesh, Scene, Transform, Vertex};
use anyhow::{bail, Context, Result};
use std::io::BufRead;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    None,
    Mesh,
    Vertices,
    Faces,
    Animation,
    Keyframe,
    CommentBlock,
}

/// Lexer state with a one-deep history.
struct Lexer {
    cur: LexState,
    prev: LexState,
}

impl Lexer {
    fn new() -> Self {
        Self {
            cur: LexState::None,
            prev: LexState::None,
        }
    }

    fn change(&mut self, state: LexState) {
        self.prev = self.cur;
        self.cur = state;
    }

    fn restore(&mut self) {
        if self.cur == self.prev {
            self.prev = LexState::None;
        }
        self.cur = self.prev;
    }
}

fn atof(s: &str) -> f32 {
    s.parse().unwrap_or(0.0)
}

/// Parse a `.s64` scene and run the post-parse normalization passes.
pub fn parse_scene<R: BufRead>(
    reader: R,
    materials: MaterialTable,
    fix_root: bool,
) -> Result<Scene> {
    tracing::info!("Parsing s64 model");

    let mut scene = Scene::new(materials);
    let mut lexer = Lexer::new();
    let mut cur_anim: Option<usize> = None;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line.context("Problem reading s64 file")?;
        let toks: Vec<&str> = line.split_whitespace().collect();
        parse_line(&mut scene, &mut lexer, &mut cur_anim, &toks)
            .with_context(|| format!("at s64 line {}", lineno + 1))?;
    }

    tracing::info!(
        "Finished parsing s64 model: {} meshes, {} animations, {} materials",
        scene.meshes.len(),
        scene.animations.len(),
        scene.materials.len() - 1
    );

    sort_keyframe_transforms(&mut scene);
    rebase_keyframes(&mut scene);
    if fix_root {
        fix_roots(&mut scene);
        tracing::info!("Fixed model and animation roots");
    }

    Ok(scene)
}

fn parse_line(
    scene: &mut Scene,
    lexer: &mut Lexer,
    cur_anim: &mut Option<usize>,
    toks: &[&str],
) -> Result<()> {
    let mut i = 0;
    while i < toks.len() {
        let tok = toks[i];

        // Line comments kill the rest of the line; a block comment opener
        // does too, and flips the lexer until its closer shows up.
        if tok.contains("//") {
            break;
        }
        if tok.contains("/*") {
            lexer.change(LexState::CommentBlock);
            break;
        }
        if lexer.cur == LexState::CommentBlock {
            if tok.contains("*/") {
                lexer.restore();
            }
            i += 1;
            continue;
        }

        if tok == "BEGIN" {
            let what = *toks.get(i + 1).context("Truncated BEGIN")?;
            i += 2;
            match lexer.cur {
                LexState::None => {
                    if what == "MESH" {
                        lexer.change(LexState::Mesh);
                        let name = *toks.get(i).context("MESH without a name")?;
                        i += 1;
                        scene.meshes.push(Mesh::new(name));
                        tracing::info!("Created new mesh '{}'", name);
                    } else if what == "ANIMATION" {
                        lexer.change(LexState::Animation);
                        let name = *toks.get(i).context("ANIMATION without a name")?;
                        i += 1;
                        scene.animations.push(Animation::new(name));
                        *cur_anim = Some(scene.animations.len() - 1);
                        tracing::info!("Created new animation '{}'", name);
                    }
                }
                LexState::Mesh => {
                    if what == "VERTICES" {
                        lexer.change(LexState::Vertices);
                    } else if what == "FACES" {
                        lexer.change(LexState::Faces);
                    }
                }
                LexState::Animation => {
                    if what == "KEYFRAME" {
                        lexer.change(LexState::Keyframe);
                        let stamp = *toks.get(i).context("KEYFRAME without a frame number")?;
                        i += 1;
                        let anim = cur_anim
                            .and_then(|a| scene.animations.get_mut(a))
                            .context("KEYFRAME outside an animation")?;
                        anim.keyframes.push(Keyframe {
                            frame: atoi(stamp) as i32,
                            transforms: Vec::new(),
                        });
                    }
                }
                _ => {}
            }
        } else if tok == "END" {
            lexer.restore();
            i += 1;
        } else {
            match lexer.cur {
                LexState::Mesh => {
                    let mesh = scene.meshes.last_mut().context("Mesh data outside a mesh")?;
                    match tok {
                        "ROOT" => {
                            if toks.len() < i + 4 {
                                bail!("ROOT needs three coordinates");
                            }
                            mesh.root = [atof(toks[i + 1]), atof(toks[i + 2]), atof(toks[i + 3])];
                            i += 4;
                        }
                        "PARENT" => {
                            let name = *toks.get(i + 1).context("PARENT without a name")?;
                            mesh.parent = Some(name.to_string());
                            i += 2;
                        }
                        "PROPERTIES" => {
                            for prop in &toks[i + 1..] {
                                if prop.contains("//") || prop.contains("/*") {
                                    break;
                                }
                                mesh.props.push(prop.to_string());
                            }
                            i = toks.len();
                        }
                        _ => {
                            i += 1;
                        }
                    }
                }
                LexState::Vertices => {
                    if toks.len() < i + 11 {
                        bail!("Vertex line needs 11 values");
                    }
                    let f = |k: usize| atof(toks[i + k]);
                    let mesh = scene
                        .meshes
                        .last_mut()
                        .context("Vertex data outside a mesh")?;
                    mesh.verts.push(Vertex {
                        pos: [f(0), f(1), f(2)],
                        normal: [f(3), f(4), f(5)],
                        color: [f(6), f(7), f(8)],
                        uv: [f(9), f(10)],
                    });
                    i += 11;
                }
                LexState::Faces => {
                    i = parse_face(scene, toks, i)?;
                }
                LexState::Keyframe => {
                    if toks.len() < i + 11 {
                        bail!("Keyframe line needs a mesh name and 10 values");
                    }
                    let mesh = scene.find_mesh(toks[i]);
                    let f = |k: usize| atof(toks[i + k]);
                    let transform = Transform {
                        mesh,
                        translation: [f(1), f(2), f(3)],
                        rotation: [f(4), f(5), f(6), f(7)],
                        scale: [f(8), f(9), f(10)],
                    };
                    let anim = cur_anim
                        .and_then(|a| scene.animations.get_mut(a))
                        .context("Keyframe data outside an animation")?;
                    let keyframe = anim
                        .keyframes
                        .last_mut()
                        .context("Keyframe data outside a keyframe")?;
                    keyframe.transforms.push(transform);
                    i += 11;
                }
                _ => {
                    i += 1;
                }
            }
        }
    }
    Ok(())
}

/// Parse one face entry, splitting quads into two triangles that share the
/// (v0, v2) diagonal.
fn parse_face(scene: &mut Scene, toks: &[&str], start: usize) -> Result<usize> {
    let mut i = start;
    let vertcount = atoi(toks[i]) as usize;
    i += 1;
    if vertcount > 4 {
        bail!("This tool does not support faces with more than 4 vertices");
    }
    if toks.len() < i + vertcount.max(3) + 1 {
        bail!("Truncated face line");
    }

    let vert = |k: usize| atof(toks[i + k]) as usize;
    let first = [vert(0), vert(1), vert(2)];
    let second = (vertcount == 4).then(|| [vert(0), vert(2), vert(3)]);
    i += vertcount.max(3);

    let material = scene.materials.find_or_request(toks[i]);
    i += 1;

    let mesh = scene.meshes.last_mut().context("Face data outside a mesh")?;
    mesh.faces.push(Face { verts: first, material });
    if let Some(verts) = second {
        mesh.faces.push(Face { verts, material });
    }
    if !mesh.materials.contains(&material) {
        mesh.materials.push(material);
    }
    Ok(i)
}

/// Reorder every keyframe's transforms to mesh declaration order.
/// Transforms naming a mesh the scene never declared keep their relative
/// order at the tail.
fn sort_keyframe_transforms(scene: &mut Scene) {
    let mesh_count = scene.meshes.len();
    for anim in &mut scene.animations {
        for keyframe in &mut anim.keyframes {
            let mut ordered = Vec::with_capacity(keyframe.transforms.len());
            for mesh_index in 0..mesh_count {
                if let Some(pos) = keyframe
                    .transforms
                    .iter()
                    .position(|t| t.mesh == Some(mesh_index))
                {
                    ordered.push(keyframe.transforms.remove(pos));
                }
            }
            ordered.append(&mut keyframe.transforms);
            keyframe.transforms = ordered;
        }
    }
}

/// Shift every animation so it starts at frame 0. An animation whose first
/// keyframe already sits at 0 is left untouched, even if later frames are
/// misordered.
fn rebase_keyframes(scene: &mut Scene) {
    for anim in &mut scene.animations {
        let mut firstframe = -1;
        for keyframe in &mut anim.keyframes {
            if firstframe == -1 && keyframe.frame == 0 {
                break;
            }
            if firstframe == -1 && keyframe.frame != 0 {
                firstframe = keyframe.frame;
            }
            keyframe.frame -= firstframe;
        }
    }
}

/// Subtract each mesh's root pivot from its vertices and add it back to
/// the animated translations, so transforms rotate about the pivot.
fn fix_roots(scene: &mut Scene) {
    for mesh in &mut scene.meshes {
        for vert in &mut mesh.verts {
            for axis in 0..3 {
                vert.pos[axis] -= mesh.root[axis];
            }
        }
    }
    let roots: Vec<[f32; 3]> = scene.meshes.iter().map(|m| m.root).collect();
    for anim in &mut scene.animations {
        for keyframe in &mut anim.keyframes {
            for transform in &mut keyframe.transforms {
                if let Some(mesh_index) = transform.mesh {
                    for axis in 0..3 {
                        transform.translation[axis] += roots[mesh_index][axis];
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(src: &str) -> Scene {
        parse_scene(Cursor::new(src), MaterialTable::new(), false).unwrap()
    }

    const TWO_MESH: &str = "\
BEGIN MESH Body
ROOT 1.0 2.0 3.0
BEGIN VERTICES
0.0 0.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 0.0 0.0
1.0 0.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 1.0 0.0
1.0 1.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 1.0 1.0
0.0 1.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 0.0 1.0
END
BEGIN FACES
4 0 1 2 3 Skin
END
END
BEGIN MESH Head
PARENT Body
PROPERTIES Billboard
BEGIN VERTICES
0.0 0.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 0.0 0.0
1.0 0.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 1.0 0.0
1.0 1.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 1.0 1.0
END
BEGIN FACES
3 0 1 2 None
END
END
";

    #[test]
    fn meshes_and_attributes() {
        let scene = parse(TWO_MESH);
        assert_eq!(scene.meshes.len(), 2);
        let body = &scene.meshes[0];
        assert_eq!(body.root, [1.0, 2.0, 3.0]);
        assert_eq!(body.verts.len(), 4);
        let head = &scene.meshes[1];
        assert_eq!(head.parent.as_deref(), Some("Body"));
        assert!(head.has_property("Billboard"));
    }

    #[test]
    fn quad_splits_on_v0_v2_diagonal() {
        let scene = parse(TWO_MESH);
        let faces = &scene.meshes[0].faces;
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].verts, [0, 1, 2]);
        assert_eq!(faces[1].verts, [0, 2, 3]);
        assert_eq!(faces[0].material, faces[1].material);
        // the quad's material was request-created
        assert_eq!(scene.materials.get(faces[0].material).name, "Skin");
    }

    #[test]
    fn none_material_is_the_sentinel() {
        let scene = parse(TWO_MESH);
        let face = scene.meshes[1].faces[0];
        assert_eq!(face.material, 0);
        assert!(scene.materials.get(0).is_omit());
    }

    #[test]
    fn too_many_face_verts_is_fatal() {
        let src = "BEGIN MESH M\nBEGIN FACES\n5 0 1 2 3 4 None\nEND\nEND\n";
        let result = parse_scene(Cursor::new(src), MaterialTable::new(), false);
        assert!(result.is_err());
    }

    #[test]
    fn comments_and_blocks() {
        let src = "\
// leading comment
BEGIN MESH M
/* block
spanning lines */
ROOT 5.0 0.0 0.0 // trailing
END
";
        let scene = parse(src);
        assert_eq!(scene.meshes[0].root, [5.0, 0.0, 0.0]);
    }

    const ANIMATED: &str = "\
BEGIN MESH A
BEGIN VERTICES
0.0 0.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 0.0 0.0
1.0 0.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 1.0 0.0
1.0 1.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 1.0 1.0
END
BEGIN FACES
3 0 1 2 None
END
END
BEGIN MESH B
BEGIN VERTICES
0.0 0.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 0.0 0.0
1.0 0.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 1.0 0.0
1.0 1.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 1.0 1.0
END
BEGIN FACES
3 0 1 2 None
END
END
BEGIN ANIMATION Walk
BEGIN KEYFRAME 10
B 0.0 0.0 0.0 1.0 0.0 0.0 0.0 1.0 1.0 1.0
A 1.0 2.0 3.0 1.0 0.0 0.0 0.0 1.0 1.0 1.0
END
BEGIN KEYFRAME 20
A 4.0 5.0 6.0 1.0 0.0 0.0 0.0 1.0 1.0 1.0
END
END
";

    #[test]
    fn transforms_follow_mesh_declaration_order() {
        let scene = parse(ANIMATED);
        let kf = &scene.animations[0].keyframes[0];
        assert_eq!(kf.transforms[0].mesh, Some(0));
        assert_eq!(kf.transforms[1].mesh, Some(1));
    }

    #[test]
    fn keyframes_rebase_to_zero() {
        let scene = parse(ANIMATED);
        let frames: Vec<i32> = scene.animations[0]
            .keyframes
            .iter()
            .map(|k| k.frame)
            .collect();
        assert_eq!(frames, vec![0, 10]);
    }

    #[test]
    fn rebase_short_circuits_on_leading_zero() {
        let src = "\
BEGIN ANIMATION Idle
BEGIN KEYFRAME 0
END
BEGIN KEYFRAME 7
END
END
";
        let scene = parse(src);
        let frames: Vec<i32> = scene.animations[0]
            .keyframes
            .iter()
            .map(|k| k.frame)
            .collect();
        // already anchored at 0, later frames untouched
        assert_eq!(frames, vec![0, 7]);
    }

    #[test]
    fn root_fixup_moves_verts_and_translations() {
        let src = "\
BEGIN MESH M
ROOT 2.0 0.0 0.0
BEGIN VERTICES
3.0 1.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 0.0 0.0
4.0 1.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 1.0 0.0
4.0 2.0 0.0 0.0 1.0 0.0 1.0 1.0 1.0 1.0 1.0
END
BEGIN FACES
3 0 1 2 None
END
END
BEGIN ANIMATION Idle
BEGIN KEYFRAME 0
M 1.0 0.0 0.0 1.0 0.0 0.0 0.0 1.0 1.0 1.0
END
END
";
        let scene = parse_scene(Cursor::new(src), MaterialTable::new(), true).unwrap();
        assert_eq!(scene.meshes[0].verts[0].pos, [1.0, 1.0, 0.0]);
        let t = scene.animations[0].keyframes[0].transforms[0];
        assert_eq!(t.translation, [3.0, 0.0, 0.0]);
    }

    #[test]
    fn unknown_mesh_transform_stays_at_tail() {
        let src = "\
BEGIN MESH M
END
BEGIN ANIMATION Idle
BEGIN KEYFRAME 0
Ghost 0.0 0.0 0.0 1.0 0.0 0.0 0.0 1.0 1.0 1.0
M 1.0 0.0 0.0 1.0 0.0 0.0 0.0 1.0 1.0 1.0
END
END
";
        let scene = parse(src);
        let kf = &scene.animations[0].keyframes[0];
        assert_eq!(kf.transforms.len(), 2);
        assert_eq!(kf.transforms[0].mesh, Some(0));
        assert_eq!(kf.transforms[1].mesh, None);
    }
}
