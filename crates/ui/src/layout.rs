//! Overlay surface layout
//!
//! The drawing surface tracks the page's content layer: same CSS box, same
//! transform, and a backing store of `round(css * dpr)` device pixels.

use crate::input::{ClientRect, InteractionMode};
use pdf_ink_render::PlatformFamily;

/// Opaque host handle for a page element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// Geometry of a page as reported by the host
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageGeometry {
    /// Offset of the content layer inside the page element, in CSS pixels
    pub offset_left: f32,
    pub offset_top: f32,

    /// CSS size of the content layer
    pub css_width: f32,
    pub css_height: f32,

    /// Computed `transform` of the content layer, if any
    pub transform: Option<String>,

    /// Computed `transform-origin` of the content layer
    pub transform_origin: Option<String>,

    /// Client rectangle of the page element
    pub page_rect: ClientRect,

    /// Client rectangle of the drawing surface
    pub surface_rect: ClientRect,
}

/// Device pixel ratio applied to overlay surfaces
///
/// The raw ratio is capped, pinned to 1 where the platform requires it,
/// rounded to two decimals and never below 1.
pub fn effective_pixel_ratio(raw: f32, cap: f32, platform: PlatformFamily) -> f32 {
    let raw = if raw.is_finite() && raw > 0.0 { raw } else { 1.0 };
    let ratio = if platform.pins_pixel_ratio() { 1.0 } else { raw.min(cap) };
    ((ratio * 100.0).round() / 100.0).max(1.0)
}

/// Device pixels for a CSS length, at least one
pub fn surface_pixels(css: f32, ratio: f32) -> u32 {
    (css * ratio).round().max(1.0) as u32
}

/// CSS properties the host applies to the drawing surface
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceStyle {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    pub transform: String,
    pub transform_origin: String,
    /// `pointer-events: auto` when true, `none` otherwise
    pub pointer_events: bool,
    pub touch_action: &'static str,
}

/// Resolved surface geometry for one layout pass
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceLayout {
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub pixel_ratio: f32,
    pub css_left: f32,
    pub css_top: f32,
    pub css_width: f32,
    pub css_height: f32,
    pub transform: String,
    pub transform_origin: String,
}

impl SurfaceLayout {
    /// Resolve the layout for `geometry` at a raw device pixel ratio
    pub fn compute(
        geometry: &PageGeometry,
        raw_ratio: f32,
        ratio_cap: f32,
        platform: PlatformFamily,
    ) -> Self {
        // Collapsed layers still get a one-pixel surface
        let css = |value: f32| if value.is_finite() && value > 0.0 { value } else { 1.0 };
        let (css_width, css_height) = (css(geometry.css_width), css(geometry.css_height));
        let pixel_ratio = effective_pixel_ratio(raw_ratio, ratio_cap, platform);

        Self {
            pixel_width: surface_pixels(css_width, pixel_ratio),
            pixel_height: surface_pixels(css_height, pixel_ratio),
            pixel_ratio,
            css_left: geometry.offset_left,
            css_top: geometry.offset_top,
            css_width,
            css_height,
            transform: geometry.transform.clone().unwrap_or_else(|| "none".to_string()),
            transform_origin: geometry
                .transform_origin
                .clone()
                .unwrap_or_else(|| "0 0".to_string()),
        }
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        (self.pixel_width, self.pixel_height)
    }

    /// CSS style for the surface in `mode`
    pub fn style(&self, mode: InteractionMode) -> SurfaceStyle {
        SurfaceStyle {
            left: self.css_left,
            top: self.css_top,
            width: self.css_width,
            height: self.css_height,
            transform: self.transform.clone(),
            transform_origin: self.transform_origin.clone(),
            pointer_events: mode.accepts_pointer(),
            touch_action: mode.touch_action(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_ratio_rules() {
        assert_eq!(effective_pixel_ratio(3.0, 2.0, PlatformFamily::Other), 2.0);
        assert_eq!(effective_pixel_ratio(1.333, 2.0, PlatformFamily::Other), 1.33);
        assert_eq!(effective_pixel_ratio(0.5, 2.0, PlatformFamily::Other), 1.0);
        assert_eq!(effective_pixel_ratio(3.0, 2.0, PlatformFamily::Ios), 1.0);
        assert_eq!(effective_pixel_ratio(f32::NAN, 2.0, PlatformFamily::Other), 1.0);
    }

    #[test]
    fn test_layout_pixel_size() {
        let geometry = PageGeometry {
            offset_left: 9.0,
            offset_top: 4.0,
            css_width: 612.3,
            css_height: 0.0,
            ..PageGeometry::default()
        };
        let layout = SurfaceLayout::compute(&geometry, 2.0, 2.0, PlatformFamily::Other);
        assert_eq!(layout.pixel_size(), (1225, 2));
        assert_eq!(layout.transform, "none");
        assert_eq!(layout.transform_origin, "0 0");

        let style = layout.style(InteractionMode::Pan);
        assert_eq!((style.left, style.top), (9.0, 4.0));
        assert!(!style.pointer_events);
    }
}
