//! Fixed-point and texture-dimension helpers.

/// Convert a float to s10.5 fixed point (10 integer bits, 5 fractional).
///
/// Texture coordinates in emitted vertex data use this encoding,
/// pre-scaled by the owning texture's dimensions.
#[inline]
pub fn float_to_s10p5(val: f32) -> i16 {
    (val * 32.0).round() as i16
}

/// Mask bits covering a texture dimension: the exponent of the power of two
/// nearest to `val`, ties rounding up. This is the value `G_TX_MASK`
/// arguments expect.
pub fn nearest_pow2(val: u32) -> u32 {
    if val <= 1 {
        return 0;
    }
    let floor = 31 - val.leading_zeros();
    if floor >= 31 {
        return 31;
    }
    let lower = 1u32 << floor;
    if val == lower {
        return floor;
    }
    let upper = lower << 1;
    if val - lower < upper - val {
        floor
    } else {
        floor + 1
    }
}
