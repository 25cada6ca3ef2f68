//! Binary format definitions for emitted Sausage64 assets.

pub mod model;
