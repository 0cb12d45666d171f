//! Byte ↔ pixel reshaping.
//!
//! A byte sequence is laid out over a square RGBA8 grid, row-major
//! (y outer, x inner), four bytes per pixel in R, G, B, A order.  This is a
//! pure reshape: nothing is compressed or transformed, so the first `len`
//! bytes of [`unpack`] always equal the input to [`pack`].
//!
//! Channels past the end of the input are padding: R/G/B are 0 and A is 255
//! so the padded area renders opaque.  Readers never depend on padding values.

use image::RgbaImage;
use thiserror::Error;

/// Bytes carried by one RGBA8 pixel.
pub const CHANNELS: usize = 4;
/// Alpha value written into padding pixels.
pub const ALPHA_PAD: u8 = 255;

#[derive(Error, Debug)]
pub enum PixelError {
    #[error("Payload of {0} bytes does not fit in a single image")]
    TooLarge(usize),
}

/// Side length of the smallest square grid holding `len` bytes:
/// `ceil(sqrt(ceil(len / 4)))`.
pub fn side_for(len: usize) -> u64 {
    let pixels = len.div_ceil(CHANNELS) as u64;
    // Float estimate, then corrected to the exact integer ceiling.
    let mut side = (pixels as f64).sqrt() as u64;
    while side * side < pixels {
        side += 1;
    }
    while side > 0 && (side - 1) * (side - 1) >= pixels {
        side -= 1;
    }
    side
}

/// Reshape `bytes` into a square RGBA image.
pub fn pack(bytes: &[u8]) -> Result<RgbaImage, PixelError> {
    let side = u32::try_from(side_for(bytes.len()))
        .map_err(|_| PixelError::TooLarge(bytes.len()))?;
    let capacity = (side as usize)
        .checked_mul(side as usize)
        .and_then(|n| n.checked_mul(CHANNELS))
        .ok_or(PixelError::TooLarge(bytes.len()))?;

    let mut raw = Vec::with_capacity(capacity);
    raw.extend_from_slice(bytes);
    raw.resize(capacity, 0);
    for i in (bytes.len()..capacity).filter(|i| i % CHANNELS == CHANNELS - 1) {
        raw[i] = ALPHA_PAD;
    }

    RgbaImage::from_raw(side, side, raw).ok_or(PixelError::TooLarge(bytes.len()))
}

/// Flatten `image` back into its `width * height * 4` channel bytes.
///
/// `RgbaImage` already stores pixels row-major in R, G, B, A order, so this
/// borrows the buffer rather than copying it.
pub fn unpack(image: &RgbaImage) -> &[u8] {
    image.as_raw()
}
