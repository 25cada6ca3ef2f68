//! s64-export library
//!
//! Compiles Sausage64 `.s64` scenes (meshes, materials, keyframed
//! animations) into either a C header with static vertex arrays and an RSP
//! display list, a compact binary asset, or an OpenGL-oriented C header.

pub mod dlist;
pub mod material;
pub mod optimizer;
pub mod output;
pub mod parser;
pub mod scene;

pub use material::{Material, MaterialKind, MaterialTable, TextureData};
pub use scene::{Animation, Face, Keyframe, Mesh, Scene, Transform, VertCache, Vertex};

/// Program settings assembled from the command line and threaded through
/// the pipeline by reference.
#[derive(Debug, Clone)]
pub struct Config {
    /// Symbol prefix for everything emitted into the C header.
    pub model_name: String,
    /// Output basename; the writers append `.h` or `.bin`.
    pub output_name: String,
    /// Hardware vertex cache size each cache group must fit in.
    pub cache_size: usize,
    /// Emit the binary container instead of a C header.
    pub binary_out: bool,
    /// Emit the OpenGL flavor instead of RSP display lists.
    pub opengl: bool,
    /// Rebase vertices against each mesh's root pivot and re-add the pivot
    /// to animated translations.
    pub fix_root: bool,
    /// Skip the initial material setup, assuming the caller pre-initialized
    /// the GPU state.
    pub initial_load_elided: bool,
    /// Disable SP2Triangles fusion.
    pub no_two_tri: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_name: "MyModel".into(),
            output_name: "outdlist".into(),
            cache_size: 32,
            binary_out: true,
            opengl: false,
            fix_root: true,
            initial_load_elided: false,
            no_two_tri: false,
        }
    }
}
