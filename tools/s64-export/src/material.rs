//! Material table and material description file parsing.
//!
//! Materials are declared in an optional side file using the same BEGIN/END
//! block shape as the scene file:
//!
//! ```text
//! BEGIN MATERIAL GrassTexture
//!     TYPE TEXTURE
//!     IMAGE 32 32 G_IM_FMT_RGBA G_IM_SIZ_16b G_TX_WRAP G_TX_WRAP
//!     CYCLE G_CYC_1CYCLE
//!     RENDERMODE G_RM_AA_ZB_OPA_SURF G_RM_AA_ZB_OPA_SURF2
//!     COMBINEMODE G_CC_MODULATEIDECALA G_CC_MODULATEIDECALA
//!     TEXFILTER G_TF_BILERP
//!     GEOFLAGS G_ZBUFFER G_SHADE G_CULL_BACK G_LIGHTING G_SHADING_SMOOTH
//! END MATERIAL
//! ```
//!
//! Faces naming a material that was never declared get a stub texture with
//! the defaults below and a warning.

use anyhow::{bail, Context, Result};
use hashbrown::HashMap;
use std::io::BufRead;

/// Geometry-mode flags a single material can carry.
pub const MAX_GEO_FLAGS: usize = 8;

const DEFAULT_CYCLE: &str = "G_CYC_1CYCLE";
const DEFAULT_RENDERMODE_1: &str = "G_RM_AA_ZB_OPA_SURF";
const DEFAULT_RENDERMODE_2: &str = "G_RM_AA_ZB_OPA_SURF2";
const DEFAULT_COMBINEMODE: &str = "G_CC_MODULATEIDECALA";
const DEFAULT_TEXFILTER: &str = "G_TF_BILERP";
const DEFAULT_GEO_FLAGS: [&str; 5] = [
    "G_ZBUFFER",
    "G_SHADE",
    "G_CULL_BACK",
    "G_LIGHTING",
    "G_SHADING_SMOOTH",
];

#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub coltype: String,
    pub colsize: String,
    pub texmode_s: String,
    pub texmode_t: String,
}

impl Default for TextureData {
    fn default() -> Self {
        Self {
            width: 32,
            height: 32,
            coltype: "G_IM_FMT_RGBA".into(),
            colsize: "G_IM_SIZ_16b".into(),
            texmode_s: "G_TX_WRAP".into(),
            texmode_t: "G_TX_WRAP".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MaterialKind {
    /// Draws with whatever state is already loaded.
    Omit,
    Texture(TextureData),
    PrimColor { r: u8, g: u8, b: u8 },
}

#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub kind: MaterialKind,
    pub cycle: String,
    pub rendermode1: String,
    pub rendermode2: String,
    pub combinemode1: String,
    pub combinemode2: String,
    pub texfilter: String,
    pub geo_flags: Vec<String>,
    /// Suppress state emission for this material; it still terminates a
    /// shared-material triangle run.
    pub dontload: bool,
}

impl Material {
    /// The sentinel material faces get when they name `None`.
    fn none() -> Self {
        Self {
            name: "None".into(),
            kind: MaterialKind::Omit,
            cycle: String::new(),
            rendermode1: String::new(),
            rendermode2: String::new(),
            combinemode1: String::new(),
            combinemode2: String::new(),
            texfilter: String::new(),
            geo_flags: Vec::new(),
            dontload: false,
        }
    }

    /// Stub created for a face material that was never declared.
    pub fn requested(name: &str) -> Self {
        Self {
            name: name.into(),
            kind: MaterialKind::Texture(TextureData::default()),
            cycle: DEFAULT_CYCLE.into(),
            rendermode1: DEFAULT_RENDERMODE_1.into(),
            rendermode2: DEFAULT_RENDERMODE_2.into(),
            combinemode1: DEFAULT_COMBINEMODE.into(),
            combinemode2: DEFAULT_COMBINEMODE.into(),
            texfilter: DEFAULT_TEXFILTER.into(),
            geo_flags: DEFAULT_GEO_FLAGS.iter().map(|s| s.to_string()).collect(),
            dontload: false,
        }
    }

    pub fn is_omit(&self) -> bool {
        self.kind == MaterialKind::Omit
    }

    pub fn has_geo_flag(&self, flag: &str) -> bool {
        self.geo_flags.iter().any(|f| f == flag)
    }

    pub fn texture(&self) -> Option<&TextureData> {
        match &self.kind {
            MaterialKind::Texture(data) => Some(data),
            _ => None,
        }
    }
}

/// The global material list. Index 0 is always the `None` sentinel.
#[derive(Debug)]
pub struct MaterialTable {
    materials: Vec<Material>,
    by_name: HashMap<String, usize>,
}

impl Default for MaterialTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialTable {
    pub fn new() -> Self {
        let mut table = Self {
            materials: Vec::new(),
            by_name: HashMap::new(),
        };
        table.push(Material::none());
        table
    }

    fn push(&mut self, mat: Material) -> usize {
        let index = self.materials.len();
        self.by_name.insert(mat.name.clone(), index);
        self.materials.push(mat);
        index
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn get(&self, index: usize) -> &Material {
        &self.materials[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.materials.iter()
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn insert(&mut self, mat: Material) -> Result<usize> {
        if self.by_name.contains_key(&mat.name) {
            bail!("Material '{}' declared twice", mat.name);
        }
        Ok(self.push(mat))
    }

    /// Resolve a face's material reference, creating a requested stub for
    /// names the table has never seen.
    pub fn find_or_request(&mut self, name: &str) -> usize {
        if let Some(index) = self.find(name) {
            return index;
        }
        tracing::warn!("Material '{}' not in the material file, using defaults", name);
        self.push(Material::requested(name))
    }
}

/// Parse a material description file into `table`.
pub fn parse_material_file<R: BufRead>(reader: R, table: &mut MaterialTable) -> Result<()> {
    let mut current: Option<Material> = None;
    let mut in_comment = false;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line.context("Problem reading material file")?;
        let toks: Vec<&str> = line.split_whitespace().collect();

        let mut i = 0;
        while i < toks.len() {
            let tok = toks[i];
            if tok.contains("//") {
                break;
            }
            if tok.contains("/*") {
                in_comment = true;
                break;
            }
            if in_comment {
                if tok.contains("*/") {
                    in_comment = false;
                }
                i += 1;
                continue;
            }

            let err = |what: &str| format!("{} at material file line {}", what, lineno + 1);
            match tok {
                "BEGIN" => {
                    let what = *toks.get(i + 1).with_context(|| err("Truncated BEGIN"))?;
                    if what != "MATERIAL" {
                        bail!(err(&format!("Unknown block '{}'", what)));
                    }
                    if current.is_some() {
                        bail!(err("Nested MATERIAL block"));
                    }
                    let name = *toks.get(i + 2).with_context(|| err("MATERIAL without a name"))?;
                    let mut mat = Material::requested(name);
                    mat.geo_flags.clear();
                    current = Some(mat);
                    i = toks.len();
                }
                "END" => {
                    let mat = current
                        .take()
                        .with_context(|| err("END outside a MATERIAL block"))?;
                    table.insert(mat)?;
                    i = toks.len();
                }
                _ => {
                    let mat = current
                        .as_mut()
                        .with_context(|| err(&format!("Unexpected '{}'", tok)))?;
                    match tok {
                        "TYPE" => {
                            let ty = *toks.get(i + 1).with_context(|| err("TYPE without a value"))?;
                            mat.kind = match ty {
                                "TEXTURE" => MaterialKind::Texture(TextureData::default()),
                                "PRIMCOL" => MaterialKind::PrimColor { r: 255, g: 255, b: 255 },
                                "OMIT" => MaterialKind::Omit,
                                other => bail!(err(&format!("Unknown material type '{}'", other))),
                            };
                        }
                        "IMAGE" => {
                            if toks.len() < i + 7 {
                                bail!(err("IMAGE needs width, height, format, size and wrap modes"));
                            }
                            mat.kind = MaterialKind::Texture(TextureData {
                                width: atoi(toks[i + 1]) as u32,
                                height: atoi(toks[i + 2]) as u32,
                                coltype: toks[i + 3].into(),
                                colsize: toks[i + 4].into(),
                                texmode_s: toks[i + 5].into(),
                                texmode_t: toks[i + 6].into(),
                            });
                        }
                        "COLOR" => {
                            if toks.len() < i + 4 {
                                bail!(err("COLOR needs three channels"));
                            }
                            mat.kind = MaterialKind::PrimColor {
                                r: atoi(toks[i + 1]) as u8,
                                g: atoi(toks[i + 2]) as u8,
                                b: atoi(toks[i + 3]) as u8,
                            };
                        }
                        "CYCLE" => {
                            mat.cycle = toks
                                .get(i + 1)
                                .with_context(|| err("CYCLE without a value"))?
                                .to_string();
                        }
                        "RENDERMODE" => {
                            if toks.len() < i + 3 {
                                bail!(err("RENDERMODE needs both cycle modes"));
                            }
                            mat.rendermode1 = toks[i + 1].into();
                            mat.rendermode2 = toks[i + 2].into();
                        }
                        "COMBINEMODE" => {
                            if toks.len() < i + 3 {
                                bail!(err("COMBINEMODE needs both cycle modes"));
                            }
                            mat.combinemode1 = toks[i + 1].into();
                            mat.combinemode2 = toks[i + 2].into();
                        }
                        "TEXFILTER" => {
                            mat.texfilter = toks
                                .get(i + 1)
                                .with_context(|| err("TEXFILTER without a value"))?
                                .to_string();
                        }
                        "GEOFLAGS" => {
                            for flag in &toks[i + 1..] {
                                if flag.contains("//") || flag.contains("/*") {
                                    break;
                                }
                                mat.geo_flags.push(flag.to_string());
                            }
                            if mat.geo_flags.len() > MAX_GEO_FLAGS {
                                bail!(err(&format!(
                                    "Material '{}' has more than {} geometry flags",
                                    mat.name, MAX_GEO_FLAGS
                                )));
                            }
                        }
                        "DONTLOAD" => {
                            mat.dontload = true;
                        }
                        other => bail!(err(&format!("Unknown material attribute '{}'", other))),
                    }
                    i = toks.len();
                }
            }
        }
    }

    if let Some(mat) = current {
        bail!("Material '{}' is missing its END", mat.name);
    }
    Ok(())
}

/// Permissive decimal parse: optional sign plus leading digits, 0 otherwise.
pub(crate) fn atoi(s: &str) -> i64 {
    let s = s.trim();
    let (neg, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let val: i64 = digits[..end].parse().unwrap_or(0);
    if neg {
        -val
    } else {
        val
    }
}
