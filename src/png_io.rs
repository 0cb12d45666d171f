//! PNG container I/O for packed images.
//!
//! PNG is lossless, so the RGBA channels written here come back bit-exact.
//! Any decodable input is converted to RGBA8 before the codec sees it.

use std::fs;
use std::io;
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageFormat, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PngError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub fn to_png_bytes(image: &RgbaImage) -> Result<Vec<u8>, PngError> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ColorType::Rgba8,
    )?;
    Ok(out)
}

pub fn from_png_bytes(bytes: &[u8]) -> Result<RgbaImage, PngError> {
    Ok(image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8())
}

pub fn write_png<P: AsRef<Path>>(image: &RgbaImage, path: P) -> Result<(), PngError> {
    fs::write(path, to_png_bytes(image)?)?;
    Ok(())
}

pub fn read_png<P: AsRef<Path>>(path: P) -> Result<RgbaImage, PngError> {
    from_png_bytes(&fs::read(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_bytes_roundtrip() {
        let raw: Vec<u8> = (0..=255u8).cycle().take(5 * 5 * 4).collect();
        let img = RgbaImage::from_raw(5, 5, raw.clone()).unwrap();
        let png = to_png_bytes(&img).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        assert_eq!(from_png_bytes(&png).unwrap().into_raw(), raw);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(from_png_bytes(b"not a png"), Err(PngError::Image(_))));
    }
}
