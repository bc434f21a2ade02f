//! Native raster conversion with the `image` crate.

use crate::config::ToolkitConfig;
use crate::error::AxevoraError;
use crate::input::{FileKind, SelectedFile};
use crate::media::{ConvertOptions, MediaConverter, OutputFormat};
use crate::output::{derived_name, Artifact};
use crate::pdf::encode::encode_image;
use crate::pdf::run_blocking;
use crate::progress::{PercentReporter, ProgressCallback};
use futures::future::BoxFuture;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;

/// Converts between PNG, JPEG, WebP, BMP, GIF and TIFF in-process.
#[derive(Debug, Clone)]
pub struct ImageConverter {
    default_quality: u8,
}

impl ImageConverter {
    pub fn new(default_quality: u8) -> Self {
        Self {
            default_quality: default_quality.clamp(1, 100),
        }
    }

    pub fn from_config(config: &ToolkitConfig) -> Self {
        Self::new(config.jpeg_quality)
    }
}

/// Shrink to fit `max_width` × `max_height`, keeping the aspect ratio.
/// Images already inside the box are returned unchanged.
pub fn fit_within(img: DynamicImage, max_width: Option<u32>, max_height: Option<u32>) -> DynamicImage {
    let max_w = max_width.unwrap_or(u32::MAX).max(1);
    let max_h = max_height.unwrap_or(u32::MAX).max(1);
    if img.width() <= max_w && img.height() <= max_h {
        return img;
    }
    let resized = img.resize(max_w, max_h, FilterType::Lanczos3);
    debug!(
        "Resized {}x{} → {}x{}",
        img.width(),
        img.height(),
        resized.width(),
        resized.height()
    );
    resized
}

impl MediaConverter for ImageConverter {
    fn name(&self) -> &'static str {
        "image"
    }

    fn supports(&self, input: FileKind, output: OutputFormat) -> bool {
        input.is_decodable_image() && output.is_image()
    }

    fn convert<'a>(
        &'a self,
        file: &'a SelectedFile,
        options: &'a ConvertOptions,
        progress: Option<&'a ProgressCallback>,
    ) -> BoxFuture<'a, Result<Artifact, AxevoraError>> {
        Box::pin(async move {
            let OutputFormat::Image(format) = options.output_format else {
                return Err(AxevoraError::UnsupportedFormat {
                    name: file.name.clone(),
                    detail: format!("{} is not an image format", options.output_format),
                });
            };
            let mut reporter = PercentReporter::new(progress);
            reporter.report(0);

            let name = file.name.clone();
            let bytes = file.bytes.clone();
            let quality = options.quality.unwrap_or(self.default_quality);
            let (max_w, max_h) = (options.max_width, options.max_height);
            let out = run_blocking("image convert", move || {
                let img = image::load_from_memory(&bytes).map_err(|e| {
                    AxevoraError::UnsupportedFormat {
                        name: name.clone(),
                        detail: format!("could not decode image: {e}"),
                    }
                })?;
                let img = fit_within(img, max_w, max_h);
                encode_image(&img, format, quality)
            })
            .await?;

            reporter.report(100);
            Ok(Artifact::new(
                derived_name(&file.name, "", format.extension()),
                format.mime(),
                out,
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::encode::RasterFormat;
    use image::{GenericImageView, Rgb, RgbImage};

    fn photo(w: u32, h: u32) -> SelectedFile {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([200, 100, 0])));
        SelectedFile::from_bytes("photo.png", encode_image(&img, RasterFormat::Png, 90).unwrap())
    }

    #[test]
    fn fit_within_keeps_small_images() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(10, 20));
        let out = fit_within(img, Some(100), None);
        assert_eq!(out.dimensions(), (10, 20));
    }

    #[test]
    fn fit_within_keeps_aspect() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(400, 200));
        let out = fit_within(img, Some(100), Some(100));
        assert_eq!(out.dimensions(), (100, 50));
    }

    #[tokio::test]
    async fn png_to_jpeg_with_resize() {
        let converter = ImageConverter::new(80);
        let options = ConvertOptions::new(OutputFormat::Image(RasterFormat::Jpeg))
            .max_size(Some(16), None);
        let out = converter.convert(&photo(64, 32), &options, None).await.unwrap();
        assert_eq!(out.file_name, "photo.jpg");
        assert_eq!(out.mime, "image/jpeg");
        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (16, 8));
    }

    #[test]
    fn supports_only_image_pairs() {
        let c = ImageConverter::new(90);
        assert!(c.supports(FileKind::Png, OutputFormat::Image(RasterFormat::WebP)));
        assert!(!c.supports(FileKind::Heic, OutputFormat::Image(RasterFormat::Png)));
        assert!(!c.supports(FileKind::Audio, OutputFormat::Image(RasterFormat::Png)));
    }
}
