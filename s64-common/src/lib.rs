//! s64-common — shared Sausage64 asset definitions
//!
//! Provides the RSP microcode command table, macro value tables, and the
//! binary model container structs used by the exporter tool and by anything
//! that consumes the emitted `.bin` assets.

pub mod formats;
pub mod gbi;
pub mod packing;

pub use formats::model::{
    DlistRecord, GlVert, MeshDataRecord, MeshTocEntry, ModelHeader, UltraVert,
};
pub use gbi::{resolve_combine_mode, resolve_macro, GfxCommand};
pub use packing::{float_to_s10p5, nearest_pow2};
