//! Boundary with the page rasterizer.

use crate::domain::RenderError;
use tiny_skia::{ColorU8, Pixmap};

/// Native (scale 1.0) dimensions of a page, in document pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// Turns a document byte buffer into page bitmaps.
///
/// Page indices are 1-based; callers clamp them into `[1, page_count]`.
pub trait PageRasterizer: Send + Sync {
    fn page_count(&self, document: &[u8]) -> Result<usize, RenderError>;

    fn page_size(&self, document: &[u8], page_index: usize) -> Result<PageSize, RenderError>;

    fn render(&self, document: &[u8], page_index: usize, scale: f64)
    -> Result<Pixmap, RenderError>;
}

/// Treats a raster image (PNG, JPEG, ...) as a single-page document.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRasterizer;

impl ImageRasterizer {
    fn decode(document: &[u8]) -> Result<image::DynamicImage, RenderError> {
        image::load_from_memory(document).map_err(|e| RenderError::InvalidSource(e.to_string()))
    }

    fn check_index(page_index: usize) -> Result<(), RenderError> {
        if page_index != 1 {
            return Err(RenderError::PageOutOfRange {
                index: page_index,
                count: 1,
            });
        }
        Ok(())
    }
}

impl PageRasterizer for ImageRasterizer {
    fn page_count(&self, document: &[u8]) -> Result<usize, RenderError> {
        Self::decode(document)?;
        Ok(1)
    }

    fn page_size(&self, document: &[u8], page_index: usize) -> Result<PageSize, RenderError> {
        Self::check_index(page_index)?;
        let image = Self::decode(document)?;
        Ok(PageSize {
            width: f64::from(image.width()),
            height: f64::from(image.height()),
        })
    }

    fn render(
        &self,
        document: &[u8],
        page_index: usize,
        scale: f64,
    ) -> Result<Pixmap, RenderError> {
        Self::check_index(page_index)?;
        let image = Self::decode(document)?;
        let width = scaled(image.width(), scale);
        let height = scaled(image.height(), scale);
        let rgba = image
            .resize_exact(width, height, image::imageops::FilterType::Triangle)
            .to_rgba8();

        let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::Bitmap { width, height })?;
        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(rgba.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
        }
        Ok(pixmap)
    }
}

fn scaled(length: u32, scale: f64) -> u32 {
    ((f64::from(length) * scale).round() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_image_is_single_page() {
        let doc = png(200, 400);
        let rasterizer = ImageRasterizer;
        assert_eq!(rasterizer.page_count(&doc).unwrap(), 1);
        assert_eq!(
            rasterizer.page_size(&doc, 1).unwrap(),
            PageSize {
                width: 200.0,
                height: 400.0
            }
        );
        assert_eq!(
            rasterizer.page_size(&doc, 2),
            Err(RenderError::PageOutOfRange { index: 2, count: 1 })
        );
    }

    #[test]
    fn test_render_scales_bitmap() {
        let doc = png(200, 400);
        let pixmap = ImageRasterizer.render(&doc, 1, 0.5).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (100, 200));
    }

    #[test]
    fn test_garbage_is_invalid_source() {
        let err = ImageRasterizer.page_count(b"not an image").unwrap_err();
        assert!(matches!(err, RenderError::InvalidSource(_)));
    }
}
