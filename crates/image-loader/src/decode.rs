use crate::types::{Bitmap, FetchError};
use thiserror::Error as ThisError;
use zune_core::{
    bit_depth::BitDepth, colorspace::ColorSpace as ZuneColorSpace,
    options::DecoderOptions as ZuneDecoderOptions,
};
use zune_image::image::Image as ZuneImage;

#[derive(ThisError, Debug)]
pub enum ImageErrors {
    #[error("Zune Error: {0}")]
    ZuneError(String),
    #[error("Generic: {0}")]
    Generic(String),
}

impl From<ImageErrors> for FetchError {
    fn from(e: ImageErrors) -> Self {
        FetchError::Decode(e.to_string())
    }
}

#[inline]
fn push_rgba(output: &mut Vec<u8>, pixel: &[u8], color_space: ZuneColorSpace) {
    match color_space {
        ZuneColorSpace::RGB => output.extend_from_slice(&[pixel[0], pixel[1], pixel[2], 255]),
        ZuneColorSpace::RGBA => output.extend_from_slice(&pixel[..4]),
        ZuneColorSpace::BGR => output.extend_from_slice(&[pixel[2], pixel[1], pixel[0], 255]),
        ZuneColorSpace::BGRA => output.extend_from_slice(&[pixel[2], pixel[1], pixel[0], pixel[3]]),
        ZuneColorSpace::Luma => output.extend_from_slice(&[pixel[0], pixel[0], pixel[0], 255]),
        ZuneColorSpace::LumaA => {
            output.extend_from_slice(&[pixel[0], pixel[0], pixel[0], pixel[1]])
        }
        _ => unreachable!("filtered by bytes_per_pixel"),
    }
}

fn bytes_per_pixel(color_space: ZuneColorSpace) -> Option<usize> {
    match color_space {
        ZuneColorSpace::RGB | ZuneColorSpace::BGR => Some(3),
        ZuneColorSpace::RGBA | ZuneColorSpace::BGRA => Some(4),
        ZuneColorSpace::Luma => Some(1),
        ZuneColorSpace::LumaA => Some(2),
        _ => None,
    }
}

fn decode_zune_internal(data: &[u8]) -> Result<Bitmap, ImageErrors> {
    if data.is_empty() {
        return Err(ImageErrors::Generic("Empty image data".to_string()));
    }

    let image = ZuneImage::read(data, ZuneDecoderOptions::default())
        .map_err(|e| ImageErrors::ZuneError(format!("{:?}", e)))?;

    let depth = image.depth();
    let color_space = image.colorspace();
    let (width, height) = image.dimensions();

    // Only supporting 8 bit depth for now
    if depth != BitDepth::Eight {
        return Err(ImageErrors::Generic(format!(
            "Unsupported depth: {:?}",
            depth
        )));
    }

    let bytes_per_pixel = bytes_per_pixel(color_space).ok_or_else(|| {
        ImageErrors::Generic(format!("Unsupported color space: {:?}", color_space))
    })?;

    if width == 0 || height == 0 {
        return Err(ImageErrors::Generic(format!(
            "Invalid dimensions: {}x{}",
            width, height
        )));
    }

    // Animated images only show their first frame
    let frame = image
        .flatten_frames::<u8>()
        .into_iter()
        .next()
        .ok_or_else(|| ImageErrors::Generic("Image has no frames".to_string()))?;

    let expected = width * height * bytes_per_pixel;
    if frame.len() < expected {
        return Err(ImageErrors::Generic(format!(
            "Short frame: got {} bytes, expected {}",
            frame.len(),
            expected
        )));
    }

    let mut rgba = Vec::with_capacity(width * height * 4);
    for pixel in frame[..expected].chunks_exact(bytes_per_pixel) {
        push_rgba(&mut rgba, pixel, color_space);
    }

    Ok(Bitmap::new(width as u32, height as u32, rgba))
}

/// Decodes a PNG or JPEG into an RGBA8 bitmap.
pub fn decode_image(data: &[u8]) -> Result<Bitmap, FetchError> {
    Ok(decode_zune_internal(data)?)
}
