use anyhow::{bail, Context, Result};
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use std::io::Cursor;

use super::types::FaceBox;

/// Decode an encoded image (PNG, JPEG, ...) into RGB pixels.
pub fn decode_frame(bytes: &[u8]) -> Result<RgbImage> {
    if bytes.is_empty() {
        bail!("Frame is empty");
    }

    let image = image::load_from_memory(bytes).context("Could not decode image data")?;
    Ok(image.to_rgb8())
}

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut Cursor::new(&mut buffer), ImageOutputFormat::Png)
        .context("Failed to encode PNG")?;
    Ok(buffer)
}

/// Cut a face out of the frame. `None` when the box lies outside it.
pub fn crop_face(frame: &RgbImage, face: &FaceBox) -> Option<RgbImage> {
    let clamped = face.clamp_to(frame.width(), frame.height())?;
    Some(
        image::imageops::crop_imm(
            frame,
            clamped.x,
            clamped.y,
            clamped.width,
            clamped.height,
        )
        .to_image(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn sample_frame() -> RgbImage {
        RgbImage::from_fn(64, 48, |x, y| Rgb([x as u8, y as u8, 128]))
    }

    #[test]
    fn test_decode_png() {
        let bytes = encode_png(&sample_frame()).unwrap();
        let frame = decode_frame(&bytes).unwrap();
        assert_eq!(frame.dimensions(), (64, 48));
        assert_eq!(frame.get_pixel(10, 20), &Rgb([10, 20, 128]));
    }

    #[test]
    fn test_decode_rejects_empty_and_garbage() {
        assert!(decode_frame(&[]).is_err());
        assert!(decode_frame(b"definitely not an image").is_err());
    }

    #[test]
    fn test_crop_face() {
        let frame = sample_frame();
        let crop = crop_face(&frame, &FaceBox::new(10, 5, 20, 10)).unwrap();
        assert_eq!(crop.dimensions(), (20, 10));
        assert_eq!(crop.get_pixel(0, 0), &Rgb([10, 5, 128]));
    }

    #[test]
    fn test_crop_clamps_to_frame() {
        let frame = sample_frame();
        let crop = crop_face(&frame, &FaceBox::new(50, 40, 40, 40)).unwrap();
        assert_eq!(crop.dimensions(), (14, 8));
        assert!(crop_face(&frame, &FaceBox::new(64, 0, 10, 10)).is_none());
    }
}
