//! Still-image conversion to baseline JPEG.
//!
//! Inputs are decoded in whatever format the `image` crate recognises from
//! the bytes themselves, flattened to 8-bit RGB (JPEG has no alpha or
//! palette), and re-encoded.

use std::io::BufReader;

use image::{DynamicImage, GenericImageView, ImageReader, codecs::jpeg::JpegEncoder};

use crate::{Error, Result, store::ByteStore};

/// JPEG quality used when none is configured.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Dimensions of a converted image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertedImage {
    pub width: u32,
    pub height: u32,
}

/// Decode `input`, convert to RGB, and write a JPEG into `output`.
///
/// `input` must already be rewound. `output` is rewound on success.
pub fn convert_to_jpeg(
    input: &mut ByteStore,
    output: &mut ByteStore,
    quality: u8,
) -> Result<ConvertedImage> {
    let decoded = ImageReader::new(BufReader::new(input))
        .with_guessed_format()?
        .decode()
        .map_err(Error::Decode)?;

    let (width, height) = decoded.dimensions();
    let rgb = DynamicImage::ImageRgb8(decoded.into_rgb8());

    let encoder = JpegEncoder::new_with_quality(&mut *output, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder).map_err(Error::Encode)?;
    output.rewind()?;

    Ok(ConvertedImage { width, height })
}
