//! Image encoding: `DynamicImage` → file bytes in a chosen raster format.
//!
//! Used for rendered PDF pages and for native image conversion. JPEG drops
//! the alpha channel (it has none); the other encoders take RGBA8 so every
//! decoded colour type is accepted.

use crate::error::AxevoraError;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::str::FromStr;
use tracing::debug;

/// Raster output formats supported natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RasterFormat {
    Png,
    Jpeg,
    WebP,
    Bmp,
    Gif,
    Tiff,
}

impl RasterFormat {
    pub fn extension(self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
            RasterFormat::Jpeg => "jpg",
            RasterFormat::WebP => "webp",
            RasterFormat::Bmp => "bmp",
            RasterFormat::Gif => "gif",
            RasterFormat::Tiff => "tiff",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            RasterFormat::Png => "image/png",
            RasterFormat::Jpeg => "image/jpeg",
            RasterFormat::WebP => "image/webp",
            RasterFormat::Bmp => "image/bmp",
            RasterFormat::Gif => "image/gif",
            RasterFormat::Tiff => "image/tiff",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            RasterFormat::Png => ImageFormat::Png,
            RasterFormat::Jpeg => ImageFormat::Jpeg,
            RasterFormat::WebP => ImageFormat::WebP,
            RasterFormat::Bmp => ImageFormat::Bmp,
            RasterFormat::Gif => ImageFormat::Gif,
            RasterFormat::Tiff => ImageFormat::Tiff,
        }
    }
}

impl FromStr for RasterFormat {
    type Err = AxevoraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(RasterFormat::Png),
            "jpg" | "jpeg" => Ok(RasterFormat::Jpeg),
            "webp" => Ok(RasterFormat::WebP),
            "bmp" => Ok(RasterFormat::Bmp),
            "gif" => Ok(RasterFormat::Gif),
            "tif" | "tiff" => Ok(RasterFormat::Tiff),
            other => Err(AxevoraError::UnsupportedFormat {
                name: other.to_string(),
                detail: "expected png, jpeg, webp, bmp, gif or tiff".into(),
            }),
        }
    }
}

/// Encode an image. `jpeg_quality` is ignored for the lossless formats.
pub fn encode_image(
    img: &DynamicImage,
    format: RasterFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, AxevoraError> {
    let mut buf = Vec::new();
    match format {
        RasterFormat::Jpeg => {
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, jpeg_quality.clamp(1, 100));
            img.to_rgb8().write_with_encoder(encoder)?;
        }
        RasterFormat::Png => {
            img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        }
        other => {
            DynamicImage::ImageRgba8(img.to_rgba8())
                .write_to(&mut Cursor::new(&mut buf), other.image_format())?;
        }
    }
    debug!("Encoded {}x{} → {} bytes {:?}", img.width(), img.height(), buf.len(), format);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn encode_small_image_in_every_format() {
        for format in [
            RasterFormat::Png,
            RasterFormat::Jpeg,
            RasterFormat::WebP,
            RasterFormat::Bmp,
            RasterFormat::Gif,
            RasterFormat::Tiff,
        ] {
            let bytes = encode_image(&red(), format, 80).expect("encode should succeed");
            let guessed = image::guess_format(&bytes).expect("recognisable output");
            assert_eq!(guessed, format.image_format(), "{format:?}");
        }
    }

    #[test]
    fn parse_names() {
        assert_eq!("JPG".parse::<RasterFormat>().unwrap(), RasterFormat::Jpeg);
        assert_eq!("tif".parse::<RasterFormat>().unwrap(), RasterFormat::Tiff);
        assert!("heic".parse::<RasterFormat>().is_err());
    }
}
