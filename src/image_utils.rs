use image::{codecs::jpeg::JpegEncoder, ImageFormat};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageUtilsError {
    #[error("Failed to decode image: {0}")]
    DecodeFailed(image::ImageError),
    #[error("Failed to encode image: {0}")]
    EncodeFailed(image::ImageError),
}

pub struct EncodedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

pub fn reencode_jpeg(bytes: &[u8], quality: u8) -> Result<EncodedImage, ImageUtilsError> {
    let decoded = image::load_from_memory(bytes).map_err(ImageUtilsError::DecodeFailed)?;
    // JPEG has no alpha channel
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut data = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut data, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)
        .map_err(ImageUtilsError::EncodeFailed)?;

    Ok(EncodedImage {
        data,
        width,
        height,
    })
}

pub fn is_supported_image(path: &Path) -> bool {
    matches!(
        ImageFormat::from_path(path),
        Ok(ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Bmp)
    )
}
