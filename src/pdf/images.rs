//! Images → PDF, one page per image.
//!
//! JPEG input is embedded as-is (`DCTDecode`); every other format is decoded
//! and re-encoded as JPEG at the configured quality first.

use crate::config::ToolkitConfig;
use crate::error::AxevoraError;
use crate::input::{FileKind, SelectedFile};
use crate::output::{derived_name, Artifact};
use crate::pdf::document::A4_POINTS;
use crate::pdf::encode::{encode_image, RasterFormat};
use crate::pdf::{run_blocking, PdfDocument};
use lopdf::{Dictionary, Document, Object, Stream};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Points per pixel when an image keeps its own size (96 DPI screen pixels).
const POINTS_PER_PIXEL: f64 = 72.0 / 96.0;

/// Margin around the image on A4 pages, in points.
const A4_MARGIN: f64 = 24.0;

/// Page geometry for [`images_to_pdf`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageFit {
    /// Page is exactly the image size.
    #[default]
    Original,
    /// A4, portrait or landscape to match the image, image scaled to fit.
    A4,
}

/// One image ready to embed.
struct PreparedImage {
    jpeg: Vec<u8>,
    width: u32,
    height: u32,
    gray: bool,
}

fn prepare(file: &SelectedFile, quality: u8) -> Result<PreparedImage, AxevoraError> {
    if file.kind == FileKind::Heic {
        return Err(AxevoraError::UnsupportedFormat {
            name: file.name.clone(),
            detail: "HEIC images cannot be decoded; convert to JPEG or PNG first".into(),
        });
    }
    let img = image::load_from_memory(&file.bytes).map_err(|e| AxevoraError::UnsupportedFormat {
        name: file.name.clone(),
        detail: e.to_string(),
    })?;
    let gray = img.color().channel_count() < 3;
    // Only 1- and 3-component JPEGs map onto DeviceGray / DeviceRGB;
    // CMYK and YCCK go through the decoder instead.
    let passthrough = file.kind == FileKind::Jpeg
        && jpeg_components(&file.bytes) == Some(if gray { 1 } else { 3 });
    let jpeg = if passthrough {
        file.bytes.clone()
    } else {
        let source = if gray {
            image::DynamicImage::ImageLuma8(img.to_luma8())
        } else {
            img.clone()
        };
        encode_image(&source, RasterFormat::Jpeg, quality)?
    };
    Ok(PreparedImage {
        jpeg,
        width: img.width(),
        height: img.height(),
        gray,
    })
}

/// Component count from the first SOF segment of a JPEG.
fn jpeg_components(bytes: &[u8]) -> Option<u8> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut i = 2;
    while i + 1 < bytes.len() {
        if bytes[i] != 0xFF {
            return None;
        }
        let marker = bytes[i + 1];
        match marker {
            0xFF => {
                i += 1;
                continue;
            }
            0x01 | 0xD0..=0xD7 => {
                i += 2;
                continue;
            }
            _ => {}
        }
        let len = usize::from(u16::from_be_bytes([*bytes.get(i + 2)?, *bytes.get(i + 3)?]));
        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            return bytes.get(i + 9).copied();
        }
        i += 2 + len;
    }
    None
}

/// Page size and image placement `(page_w, page_h, x, y, w, h)` in points.
fn layout(width: u32, height: u32, fit: PageFit) -> (f64, f64, f64, f64, f64, f64) {
    let img_w = f64::from(width) * POINTS_PER_PIXEL;
    let img_h = f64::from(height) * POINTS_PER_PIXEL;
    match fit {
        PageFit::Original => (img_w, img_h, 0.0, 0.0, img_w, img_h),
        PageFit::A4 => {
            let (page_w, page_h) = if width > height {
                (A4_POINTS.1, A4_POINTS.0)
            } else {
                A4_POINTS
            };
            let avail_w = page_w - 2.0 * A4_MARGIN;
            let avail_h = page_h - 2.0 * A4_MARGIN;
            let scale = (avail_w / img_w).min(avail_h / img_h).min(1.0);
            let (w, h) = (img_w * scale, img_h * scale);
            (page_w, page_h, (page_w - w) / 2.0, (page_h - h) / 2.0, w, h)
        }
    }
}

fn build_document(images: Vec<PreparedImage>, fit: PageFit) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(images.len());

    for img in images {
        let mut xobject = Dictionary::new();
        xobject.set("Type", Object::Name(b"XObject".to_vec()));
        xobject.set("Subtype", Object::Name(b"Image".to_vec()));
        xobject.set("Width", Object::Integer(i64::from(img.width)));
        xobject.set("Height", Object::Integer(i64::from(img.height)));
        let space: &[u8] = if img.gray { b"DeviceGray" } else { b"DeviceRGB" };
        xobject.set("ColorSpace", Object::Name(space.to_vec()));
        xobject.set("BitsPerComponent", Object::Integer(8));
        xobject.set("Filter", Object::Name(b"DCTDecode".to_vec()));
        let image_id = doc.add_object(Object::Stream(Stream::new(xobject, img.jpeg)));

        let (page_w, page_h, x, y, w, h) = layout(img.width, img.height, fit);
        let content = format!("q {w:.2} 0 0 {h:.2} {x:.2} {y:.2} cm /Im0 Do Q");
        let content_id =
            doc.add_object(Object::Stream(Stream::new(Dictionary::new(), content.into_bytes())));

        let mut xobjects = Dictionary::new();
        xobjects.set("Im0", Object::Reference(image_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        page.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page_w as f32),
                Object::Real(page_h as f32),
            ]),
        );
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Reference(content_id));
        kids.push(Object::Reference(doc.add_object(Object::Dictionary(page))));
    }

    let mut tree = Dictionary::new();
    tree.set("Type", Object::Name(b"Pages".to_vec()));
    tree.set("Count", Object::Integer(kids.len() as i64));
    tree.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(tree));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc
}

/// Combine images into a PDF in the order given.
pub async fn images_to_pdf(
    files: &[SelectedFile],
    fit: PageFit,
    config: &ToolkitConfig,
) -> Result<Artifact, AxevoraError> {
    if files.is_empty() {
        return Err(AxevoraError::NotEnoughFiles {
            operation: "Images to PDF".into(),
            needed: 1,
            got: 0,
        });
    }

    let file_name = if files.len() == 1 {
        derived_name(&files[0].name, "", "pdf")
    } else {
        "images.pdf".to_string()
    };
    let files = files.to_vec();
    let quality = config.jpeg_quality;
    let callback = config.progress_callback.clone();
    let steps = files.len();
    info!("Combining {} images into a PDF ({:?})", steps, fit);

    let bytes = run_blocking("images to pdf", move || {
        if let Some(cb) = &callback {
            cb.on_task_start("images to pdf", steps);
        }
        let mut prepared = Vec::with_capacity(steps);
        for (i, file) in files.iter().enumerate() {
            let img = prepare(file, quality)?;
            debug!("{}: {}x{}", file.name, img.width, img.height);
            prepared.push(img);
            if let Some(cb) = &callback {
                cb.on_step_complete(i + 1, steps);
            }
        }
        let doc = build_document(prepared, fit);
        let bytes = PdfDocument::from_lopdf("images.pdf", doc).to_bytes()?;
        if let Some(cb) = &callback {
            cb.on_task_complete(steps, steps);
        }
        Ok(bytes)
    })
    .await?;

    Ok(Artifact::pdf(file_name, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn png(w: u32, h: u32) -> SelectedFile {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([0, 128, 255])));
        let bytes = encode_image(&img, RasterFormat::Png, 90).unwrap();
        SelectedFile::from_bytes("shot.png", bytes)
    }

    #[test]
    fn original_fit_matches_image() {
        let (pw, ph, x, y, w, h) = layout(960, 480, PageFit::Original);
        assert_eq!((pw, ph, x, y), (720.0, 360.0, 0.0, 0.0));
        assert_eq!((w, h), (720.0, 360.0));
    }

    #[test]
    fn a4_fit_picks_orientation_and_centres() {
        let (pw, ph, x, _y, w, h) = layout(4000, 1000, PageFit::A4);
        assert_eq!((pw, ph), (842.0, 595.0));
        assert!(w <= pw - 2.0 * A4_MARGIN + 1e-6);
        assert!(h <= ph);
        assert!((x - (pw - w) / 2.0).abs() < 1e-6);
    }

    #[test]
    fn heic_is_unsupported() {
        let f = SelectedFile::from_bytes("p.heic", b"\0\0\0\x18ftypheic\0\0\0\0".to_vec());
        assert!(matches!(prepare(&f, 90), Err(AxevoraError::UnsupportedFormat { .. })));
    }

    #[test]
    fn sof_component_count() {
        // SOI, APP14 (Adobe), SOF0 with 4 components.
        let mut cmyk = vec![0xFF, 0xD8, 0xFF, 0xEE, 0x00, 0x04, 0x41, 0x64];
        cmyk.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x14, 0x08, 0x00, 0x10, 0x00, 0x10, 0x04]);
        assert_eq!(jpeg_components(&cmyk), Some(4));
        assert_eq!(jpeg_components(b"\x89PNG"), None);

        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([1, 2, 3])));
        let bytes = encode_image(&rgb, RasterFormat::Jpeg, 80).unwrap();
        assert_eq!(jpeg_components(&bytes), Some(3));
    }

    #[test]
    fn rgb_jpeg_is_embedded_unchanged() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 4, Rgb([200, 10, 10])));
        let bytes = encode_image(&rgb, RasterFormat::Jpeg, 80).unwrap();
        let prepared = prepare(&SelectedFile::from_bytes("p.jpg", bytes.clone()), 50).unwrap();
        assert_eq!(prepared.jpeg, bytes);
        assert!(!prepared.gray);
        assert_eq!((prepared.width, prepared.height), (8, 4));
    }

    #[tokio::test]
    async fn one_page_per_image() {
        let out = images_to_pdf(&[png(20, 10), png(10, 20)], PageFit::A4, &ToolkitConfig::default())
            .await
            .unwrap();
        assert_eq!(out.file_name, "images.pdf");
        let doc = PdfDocument::load_bytes("x.pdf", &out.bytes, None).unwrap();
        assert_eq!(doc.page_count(), 2);
    }

    #[tokio::test]
    async fn empty_input_rejected() {
        let err = images_to_pdf(&[], PageFit::Original, &ToolkitConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AxevoraError::NotEnoughFiles { .. }));
    }
}
