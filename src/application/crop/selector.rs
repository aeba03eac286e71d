use super::action::CropAction;
use crate::domain::{CropEdge, CropState, RenderError, display_pixels, document_pixels};
use crate::infra::render::{PageRasterizer, PageSize};
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tiny_skia::{Paint, Pixmap, Rect, Transform};

/// Translucent red used for the excluded bands.
const BAND_RGBA: [u8; 4] = [220, 38, 38, 96];

/// Display dimensions of the page currently shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderedPage {
    pub page_index: usize,
    pub page_count: usize,
    pub width: u32,
    pub height: u32,
}

struct LoadedPage {
    index: usize,
    size: PageSize,
    bitmap: Pixmap,
}

struct LoadedDocument {
    bytes: Arc<[u8]>,
    page_count: usize,
    page: LoadedPage,
}

/// A page render that may run off the caller's task.
pub struct RenderRequest {
    ticket: u64,
    page_index: usize,
    scale: f64,
    document: Arc<[u8]>,
    rasterizer: Arc<dyn PageRasterizer>,
}

impl RenderRequest {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn run(self) -> RenderOutcome {
        let result = self
            .rasterizer
            .page_size(&self.document, self.page_index)
            .and_then(|size| {
                let bitmap = self
                    .rasterizer
                    .render(&self.document, self.page_index, self.scale)?;
                Ok((size, bitmap))
            });
        RenderOutcome {
            ticket: self.ticket,
            page_index: self.page_index,
            result,
        }
    }

    /// Rasterize on the blocking pool.
    pub fn spawn(self) -> tokio::task::JoinHandle<RenderOutcome> {
        tokio::task::spawn_blocking(move || self.run())
    }
}

#[derive(Debug)]
pub struct RenderOutcome {
    ticket: u64,
    page_index: usize,
    result: Result<(PageSize, Pixmap), RenderError>,
}

/// Preview of one document side with header/footer bands.
///
/// Depths are stored in document space; the preview is drawn at `scale`.
/// All mutation goes through [`CropSelector::dispatch`]. Page renders carry
/// a ticket and only the most recent one is applied.
pub struct CropSelector {
    rasterizer: Arc<dyn PageRasterizer>,
    scale: f64,
    crop: CropState,
    document: Option<LoadedDocument>,
    latest_ticket: u64,
    pending: Option<(u64, usize)>,
    dirty: bool,
    preview: Option<Pixmap>,
    redraws: u64,
}

impl CropSelector {
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, scale: f64) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            log::warn!("Invalid preview scale {}, using 1.0", scale);
            1.0
        };
        Self {
            rasterizer,
            scale,
            crop: CropState::default(),
            document: None,
            latest_ticket: 0,
            pending: None,
            dirty: false,
            preview: None,
            redraws: 0,
        }
    }

    pub fn with_crop(mut self, crop: CropState) -> Self {
        self.crop = crop;
        self
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn page_index(&self) -> Option<usize> {
        self.document.as_ref().map(|d| d.page.index)
    }

    pub fn page_count(&self) -> Option<usize> {
        self.document.as_ref().map(|d| d.page_count)
    }

    pub fn rendered_page(&self) -> Option<RenderedPage> {
        self.document.as_ref().map(|d| RenderedPage {
            page_index: d.page.index,
            page_count: d.page_count,
            width: d.page.bitmap.width(),
            height: d.page.bitmap.height(),
        })
    }

    /// Last composited preview, if any.
    pub fn preview(&self) -> Option<&Pixmap> {
        self.preview.as_ref()
    }

    pub fn redraw_count(&self) -> u64 {
        self.redraws
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn page_height(&self) -> Option<f64> {
        self.document.as_ref().map(|d| d.page.size.height)
    }

    pub async fn open(&mut self, path: &Path) -> anyhow::Result<RenderedPage> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let page = self
            .load_page(bytes, 1)
            .with_context(|| format!("rendering {}", path.display()))?;
        Ok(page)
    }

    /// Render `page_index` (1-based) of `source` at the preview scale.
    ///
    /// On failure the preview is left blank.
    pub fn load_page(
        &mut self,
        source: impl Into<Arc<[u8]>>,
        page_index: usize,
    ) -> Result<RenderedPage, RenderError> {
        let bytes: Arc<[u8]> = source.into();
        self.invalidate();
        self.document = None;
        self.preview = None;

        let page_count = self.rasterizer.page_count(&bytes)?;
        if page_count == 0 {
            return Err(RenderError::EmptyDocument);
        }
        if !(1..=page_count).contains(&page_index) {
            return Err(RenderError::PageOutOfRange {
                index: page_index,
                count: page_count,
            });
        }
        let size = self.rasterizer.page_size(&bytes, page_index)?;
        let bitmap = self.rasterizer.render(&bytes, page_index, self.scale)?;
        log::debug!(
            "Loaded page {}/{} ({}x{} at scale {})",
            page_index,
            page_count,
            size.width,
            size.height,
            self.scale
        );

        self.document = Some(LoadedDocument {
            bytes,
            page_count,
            page: LoadedPage {
                index: page_index,
                size,
                bitmap,
            },
        });
        self.dirty = true;
        self.rendered_page().ok_or(RenderError::NothingLoaded)
    }

    /// Apply one intent. Navigation returns the render it needs.
    pub fn dispatch(&mut self, action: CropAction) -> Option<RenderRequest> {
        match action {
            CropAction::SetDepth {
                edge,
                display_pixels,
            } => {
                let mut depth = document_pixels(display_pixels, self.scale);
                if !depth.is_finite() {
                    depth = 0.0;
                }
                if let Some(height) = self.page_height() {
                    depth = depth.min(height).max(0.0);
                }
                self.crop = match edge {
                    CropEdge::Header => CropState::new(depth, self.crop.footer_depth),
                    CropEdge::Footer => CropState::new(self.crop.header_depth, depth),
                };
                self.dirty = true;
                None
            }
            CropAction::Restore(crop) => {
                self.crop = CropState::new(crop.header_depth, crop.footer_depth);
                self.dirty = true;
                None
            }
            CropAction::NextPage => self.navigate(1),
            CropAction::PreviousPage => self.navigate(-1),
        }
    }

    fn navigate(&mut self, step: isize) -> Option<RenderRequest> {
        let document = self.document.as_ref()?;
        let from = self
            .pending
            .map_or(document.page.index, |(_, target)| target);
        let target = from
            .checked_add_signed(step)
            .filter(|target| (1..=document.page_count).contains(target))?;

        self.latest_ticket += 1;
        self.pending = Some((self.latest_ticket, target));
        Some(RenderRequest {
            ticket: self.latest_ticket,
            page_index: target,
            scale: self.scale,
            document: Arc::clone(&document.bytes),
            rasterizer: Arc::clone(&self.rasterizer),
        })
    }

    /// Install a finished render. Outcomes of superseded requests are dropped.
    pub fn finish_render(
        &mut self,
        outcome: RenderOutcome,
    ) -> Result<Option<RenderedPage>, RenderError> {
        match self.pending {
            Some((ticket, _)) if ticket == outcome.ticket => self.pending = None,
            _ => {
                log::debug!("Discarding stale render of page {}", outcome.page_index);
                return Ok(None);
            }
        }
        let (size, bitmap) = outcome.result.inspect_err(|_| self.preview = None)?;
        let Some(document) = self.document.as_mut() else {
            return Ok(None);
        };
        document.page = LoadedPage {
            index: outcome.page_index,
            size,
            bitmap,
        };
        self.dirty = true;
        Ok(self.rendered_page())
    }

    pub fn next(&mut self) -> Result<Option<RenderedPage>, RenderError> {
        self.navigate_now(CropAction::NextPage)
    }

    pub fn previous(&mut self) -> Result<Option<RenderedPage>, RenderError> {
        self.navigate_now(CropAction::PreviousPage)
    }

    fn navigate_now(&mut self, action: CropAction) -> Result<Option<RenderedPage>, RenderError> {
        match self.dispatch(action) {
            Some(request) => self.finish_render(request.run()),
            None => Ok(None),
        }
    }

    pub fn set_crop_depth(&mut self, edge: CropEdge, display_pixels: f64) {
        self.dispatch(CropAction::SetDepth {
            edge,
            display_pixels,
        });
    }

    /// Depths in document space, clamped jointly to the page.
    pub fn current_crop_state(&self) -> CropState {
        match self.page_height() {
            Some(height) => self.crop.clamped_to(height),
            None => self.crop,
        }
    }

    /// Repaint the bands now.
    pub fn render_overlay(&mut self) -> Result<&Pixmap, RenderError> {
        let document = self.document.as_ref().ok_or(RenderError::NothingLoaded)?;
        let crop = self.crop.clamped_to(document.page.size.height);
        let mut preview = document.page.bitmap.clone();
        paint_bands(&mut preview, &crop, self.scale);

        self.dirty = false;
        self.redraws += 1;
        Ok(self.preview.insert(preview))
    }

    /// Repaint at most once if anything changed since the last paint.
    pub fn frame(&mut self) -> Result<bool, RenderError> {
        if !self.dirty || self.document.is_none() {
            return Ok(false);
        }
        self.render_overlay()?;
        Ok(true)
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, RenderError> {
        let preview = self.preview.as_ref().ok_or(RenderError::NothingLoaded)?;
        preview
            .encode_png()
            .map_err(|e| RenderError::Encoding(e.to_string()))
    }

    /// Drop the document. Renders still in flight become no-ops.
    pub fn close(&mut self) {
        self.invalidate();
        self.document = None;
        self.preview = None;
        self.dirty = false;
    }

    fn invalidate(&mut self) {
        self.latest_ticket += 1;
        self.pending = None;
    }
}

fn paint_bands(pixmap: &mut Pixmap, crop: &CropState, scale: f64) {
    let width = pixmap.width() as f32;
    let height = pixmap.height() as f32;
    let header = (display_pixels(crop.header_depth, scale) as f32).min(height);
    let footer = (display_pixels(crop.footer_depth, scale) as f32).min(height - header);

    let mut paint = Paint::default();
    let [r, g, b, a] = BAND_RGBA;
    paint.set_color_rgba8(r, g, b, a);

    let bands = [
        (header > 0.0).then(|| Rect::from_xywh(0.0, 0.0, width, header)),
        (footer > 0.0).then(|| Rect::from_xywh(0.0, height - footer, width, footer)),
    ];
    for band in bands.into_iter().flatten().flatten() {
        pixmap.fill_rect(band, &paint, Transform::identity(), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::render::ImageRasterizer;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tiny_skia::Color;

    /// Multi-page document of identical 100x200 white pages.
    struct PagedRasterizer {
        pages: usize,
        renders: AtomicUsize,
    }

    impl PagedRasterizer {
        fn new(pages: usize) -> Arc<Self> {
            Arc::new(Self {
                pages,
                renders: AtomicUsize::new(0),
            })
        }
    }

    impl PageRasterizer for PagedRasterizer {
        fn page_count(&self, _document: &[u8]) -> Result<usize, RenderError> {
            Ok(self.pages)
        }

        fn page_size(&self, _document: &[u8], page_index: usize) -> Result<PageSize, RenderError> {
            if !(1..=self.pages).contains(&page_index) {
                return Err(RenderError::PageOutOfRange {
                    index: page_index,
                    count: self.pages,
                });
            }
            Ok(PageSize {
                width: 100.0,
                height: 200.0,
            })
        }

        fn render(
            &self,
            _document: &[u8],
            _page_index: usize,
            scale: f64,
        ) -> Result<Pixmap, RenderError> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            let width = (100.0 * scale) as u32;
            let height = (200.0 * scale) as u32;
            let mut pixmap =
                Pixmap::new(width, height).ok_or(RenderError::Bitmap { width, height })?;
            pixmap.fill(Color::WHITE);
            Ok(pixmap)
        }
    }

    fn loaded(pages: usize) -> CropSelector {
        let mut selector = CropSelector::new(PagedRasterizer::new(pages), 0.5);
        selector.load_page(b"doc".to_vec(), 1).unwrap();
        selector
    }

    fn white_png(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_display_pixels_become_document_pixels() {
        let mut selector = loaded(1);
        selector.set_crop_depth(CropEdge::Header, 20.0);
        selector.set_crop_depth(CropEdge::Footer, 15.0);
        assert_eq!(selector.current_crop_state(), CropState::new(40.0, 30.0));
    }

    #[test]
    fn test_depth_is_clamped_to_page() {
        let mut selector = loaded(1);
        selector.set_crop_depth(CropEdge::Header, 150.0);
        assert_eq!(selector.current_crop_state().header_depth, 200.0);

        selector.set_crop_depth(CropEdge::Footer, 30.0);
        assert_eq!(selector.current_crop_state().footer_depth, 0.0);

        selector.set_crop_depth(CropEdge::Header, -10.0);
        assert_eq!(selector.current_crop_state(), CropState::new(0.0, 60.0));
    }

    #[test]
    fn test_non_finite_depth_resets_edge() {
        let mut selector = loaded(1);
        selector.set_crop_depth(CropEdge::Footer, 10.0);
        selector.set_crop_depth(CropEdge::Header, f64::NAN);
        assert_eq!(selector.current_crop_state(), CropState::new(0.0, 20.0));
        selector.set_crop_depth(CropEdge::Header, f64::INFINITY);
        assert_eq!(selector.current_crop_state().header_depth, 0.0);

        let mut unloaded = CropSelector::new(PagedRasterizer::new(1), 0.5);
        unloaded.set_crop_depth(CropEdge::Header, f64::NAN);
        assert_eq!(unloaded.current_crop_state(), CropState::new(0.0, 0.0));
    }

    #[test]
    fn test_empty_document_is_an_error() {
        let mut selector = CropSelector::new(PagedRasterizer::new(0), 0.5);
        assert_eq!(
            selector.load_page(b"doc".to_vec(), 1),
            Err(RenderError::EmptyDocument)
        );
        assert!(selector.rendered_page().is_none());
        assert_eq!(selector.render_overlay().err(), Some(RenderError::NothingLoaded));
    }

    #[test]
    fn test_page_index_out_of_range() {
        let mut selector = CropSelector::new(PagedRasterizer::new(2), 0.5);
        assert_eq!(
            selector.load_page(b"doc".to_vec(), 3),
            Err(RenderError::PageOutOfRange { index: 3, count: 2 })
        );
    }

    #[test]
    fn test_navigation_is_bounded() {
        let rasterizer = PagedRasterizer::new(3);
        let mut selector = CropSelector::new(rasterizer.clone(), 0.5);
        selector.load_page(b"doc".to_vec(), 1).unwrap();
        selector.set_crop_depth(CropEdge::Header, 10.0);

        assert_eq!(selector.previous().unwrap(), None);
        assert_eq!(rasterizer.renders.load(Ordering::SeqCst), 1);

        assert_eq!(selector.next().unwrap().map(|p| p.page_index), Some(2));
        assert_eq!(selector.next().unwrap().map(|p| p.page_index), Some(3));
        assert_eq!(selector.next().unwrap(), None);
        assert_eq!(selector.page_index(), Some(3));
        assert_eq!(rasterizer.renders.load(Ordering::SeqCst), 3);

        assert_eq!(selector.current_crop_state().header_depth, 20.0);
        assert!(selector.is_dirty());
    }

    #[test]
    fn test_latest_render_wins() {
        let mut selector = loaded(3);
        let first = selector.dispatch(CropAction::NextPage).unwrap();
        let second = selector.dispatch(CropAction::NextPage).unwrap();
        assert_eq!(first.page_index(), 2);
        assert_eq!(second.page_index(), 3);
        assert!(second.ticket() > first.ticket());

        let applied = selector.finish_render(second.run()).unwrap();
        assert_eq!(applied.map(|p| p.page_index), Some(3));
        assert_eq!(selector.finish_render(first.run()).unwrap(), None);
        assert_eq!(selector.page_index(), Some(3));
    }

    #[test]
    fn test_close_discards_in_flight_render() {
        let mut selector = loaded(2);
        let request = selector.dispatch(CropAction::NextPage).unwrap();
        selector.close();
        assert_eq!(selector.finish_render(request.run()).unwrap(), None);
        assert_eq!(selector.page_index(), None);
        assert!(!selector.frame().unwrap());
    }

    #[test]
    fn test_frame_coalesces_rapid_changes() {
        let mut selector = loaded(1);
        for step in 0..10 {
            selector.set_crop_depth(CropEdge::Header, f64::from(step));
        }
        assert!(selector.frame().unwrap());
        assert!(!selector.frame().unwrap());
        assert_eq!(selector.redraw_count(), 1);

        selector.render_overlay().unwrap();
        assert_eq!(selector.redraw_count(), 2);
        assert_eq!(selector.current_crop_state().header_depth, 18.0);
    }

    #[test]
    fn test_overlay_paints_bands_in_display_space() {
        let mut selector = CropSelector::new(Arc::new(ImageRasterizer), 0.5);
        let page = selector.load_page(white_png(100, 200), 1).unwrap();
        assert_eq!((page.width, page.height), (50, 100));

        let preview = selector.render_overlay().unwrap();
        let green = |y: u32| preview.pixel(10, y).unwrap().green();
        assert!(green(5) < 255);
        assert!(green(19) < 255);
        assert_eq!(green(20), 255);
        assert_eq!(green(50), 255);
        assert_eq!(green(79), 255);
        assert!(green(80) < 255);
        assert!(green(99) < 255);

        let png = selector.encode_png().unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[test]
    fn test_restore_replaces_both_depths() {
        let mut selector = loaded(1);
        selector.dispatch(CropAction::Restore(CropState::new(12.0, 8.0)));
        assert_eq!(selector.current_crop_state(), CropState::new(12.0, 8.0));
    }

    #[tokio::test]
    async fn test_spawned_render_applies() {
        let mut selector = loaded(2);
        let request = selector.dispatch(CropAction::NextPage).unwrap();
        let outcome = request.spawn().await.unwrap();
        let page = selector.finish_render(outcome).unwrap().unwrap();
        assert_eq!(page.page_index, 2);
    }

    #[tokio::test]
    async fn test_open_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        std::fs::write(&path, white_png(40, 80)).unwrap();

        let mut selector = CropSelector::new(Arc::new(ImageRasterizer), 1.0);
        let page = selector.open(&path).await.unwrap();
        assert_eq!((page.page_index, page.width, page.height), (1, 40, 80));
    }
}
