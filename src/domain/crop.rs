use serde::{Deserialize, Serialize};
use std::fmt;

/// Crop depth used when the user never opens the crop tool.
pub const DEFAULT_CROP_DEPTH: f64 = 40.0;

/// Which document of the pair a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSide {
    Left,
    Right,
}

impl fmt::Display for DocumentSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// Top or bottom band of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropEdge {
    Header,
    Footer,
}

impl fmt::Display for CropEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => write!(f, "header"),
            Self::Footer => write!(f, "footer"),
        }
    }
}

/// Header/footer depths of one document, in document-space pixels (scale 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropState {
    pub header_depth: f64,
    pub footer_depth: f64,
}

impl Default for CropState {
    fn default() -> Self {
        Self::uniform(DEFAULT_CROP_DEPTH)
    }
}

impl CropState {
    pub fn new(header_depth: f64, footer_depth: f64) -> Self {
        Self {
            header_depth: sanitize(header_depth),
            footer_depth: sanitize(footer_depth),
        }
    }

    pub fn uniform(depth: f64) -> Self {
        Self::new(depth, depth)
    }

    pub fn depth(&self, edge: CropEdge) -> f64 {
        match edge {
            CropEdge::Header => self.header_depth,
            CropEdge::Footer => self.footer_depth,
        }
    }

    /// Clamp both depths so the bands stay inside a page of `page_height`.
    ///
    /// The header wins when the two bands would overlap.
    pub fn clamped_to(&self, page_height: f64) -> Self {
        let page_height = sanitize(page_height);
        let header = self.header_depth.clamp(0.0, page_height);
        let footer = self.footer_depth.clamp(0.0, page_height - header);
        Self {
            header_depth: header,
            footer_depth: footer,
        }
    }

    /// Integer form sent to the comparison service.
    pub fn rounded(&self) -> (i64, i64) {
        (
            self.header_depth.round() as i64,
            self.footer_depth.round() as i64,
        )
    }
}

/// Convert a display-space measurement to document space at preview scale `scale`.
pub fn document_pixels(display_pixels: f64, scale: f64) -> f64 {
    display_pixels / scale
}

/// Convert a document-space measurement to display space at preview scale `scale`.
pub fn display_pixels(document_pixels: f64, scale: f64) -> f64 {
    document_pixels * scale
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_uses_preset_depth() {
        let state = CropState::default();
        assert_eq!(state.header_depth, DEFAULT_CROP_DEPTH);
        assert_eq!(state.footer_depth, DEFAULT_CROP_DEPTH);
    }

    #[test]
    fn test_negative_and_nan_depths_become_zero() {
        let state = CropState::new(-5.0, f64::NAN);
        assert_eq!(state.header_depth, 0.0);
        assert_eq!(state.footer_depth, 0.0);
    }

    #[test]
    fn test_clamp_keeps_bands_inside_page() {
        let state = CropState::new(700.0, 300.0).clamped_to(792.0);
        assert_eq!(state.header_depth, 700.0);
        assert_eq!(state.footer_depth, 92.0);

        let state = CropState::new(900.0, 10.0).clamped_to(792.0);
        assert_eq!(state.header_depth, 792.0);
        assert_eq!(state.footer_depth, 0.0);
    }

    #[test]
    fn test_rounding_for_submission() {
        assert_eq!(CropState::new(39.6, 40.4).rounded(), (40, 40));
    }

    #[test]
    fn test_scale_conversion() {
        assert_eq!(document_pixels(20.0, 0.5), 40.0);
        assert_eq!(display_pixels(40.0, 0.5), 20.0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn scale_round_trip(depth in 0.0f64..2000.0, scale in 0.05f64..4.0) {
            let back = document_pixels(display_pixels(depth, scale), scale);
            prop_assert!((back - depth).abs() < 1e-9 * depth.max(1.0));
        }

        #[test]
        fn clamped_bands_never_exceed_page(
            header in 0.0f64..3000.0,
            footer in 0.0f64..3000.0,
            page in 1.0f64..2000.0,
        ) {
            let clamped = CropState::new(header, footer).clamped_to(page);
            prop_assert!(clamped.header_depth <= page);
            prop_assert!(clamped.header_depth + clamped.footer_depth <= page + 1e-9);
        }
    }
}
