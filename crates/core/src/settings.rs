//! Ink configuration
//!
//! All fields default so partially written settings files still load.

use serde::{Deserialize, Serialize};

/// Lowest opacity the pen accepts
pub const MIN_PEN_OPACITY: f32 = 0.1;

/// Which rasterizer the overlays draw with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererMode {
    /// CPU path rasterizer only
    Path,
    /// GPU rasterizer, failing loudly when unavailable
    Gpu,
    /// GPU where it is reliable, CPU otherwise
    #[default]
    Auto,
}

/// User-facing ink settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InkSettings {
    /// Pen color as `#rrggbb`
    pub pen_color: String,

    /// Pen base size in device-independent units
    pub pen_size: f32,

    /// Pen opacity in `[0.1, 1]`
    pub pen_opacity: f32,

    /// Faster motion thins the stroke
    pub velocity_affects_size: bool,

    /// Only the stylus may draw; touch pans
    pub only_pen_draws: bool,

    /// Two-finger double tap triggers undo
    pub double_tap_undo: bool,

    /// Upper bound applied to the device pixel ratio
    pub device_pixel_ratio_cap: f32,

    /// Rasterizer selection
    pub renderer_mode: RendererMode,

    /// Soft cap on simultaneously live overlays
    pub overlay_cap: usize,

    /// Neighboring pages kept live around the visible range
    pub page_margin: u32,

    /// Quiet period before an autosave runs
    pub autosave_delay_ms: u64,
}

impl Default for InkSettings {
    fn default() -> Self {
        Self {
            pen_color: "#ff2d55".to_string(),
            pen_size: 3.0,
            pen_opacity: 1.0,
            velocity_affects_size: true,
            only_pen_draws: true,
            double_tap_undo: true,
            device_pixel_ratio_cap: 2.0,
            renderer_mode: RendererMode::Auto,
            overlay_cap: 18,
            page_margin: 2,
            autosave_delay_ms: 800,
        }
    }
}

impl InkSettings {
    /// Set the pen opacity, clamped to `[0.1, 1]`
    pub fn set_pen_opacity(&mut self, opacity: f32) {
        self.pen_opacity = if opacity.is_finite() {
            opacity.clamp(MIN_PEN_OPACITY, 1.0)
        } else {
            1.0
        };
    }

    /// Parse settings from JSON, filling missing fields with defaults
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(text)?;
        settings.set_pen_opacity(settings.pen_opacity);
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = InkSettings::default();
        assert_eq!(settings.pen_color, "#ff2d55");
        assert_eq!(settings.pen_size, 3.0);
        assert!(settings.only_pen_draws);
        assert_eq!(settings.overlay_cap, 18);
        assert_eq!(settings.renderer_mode, RendererMode::Auto);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{ "pen_size": 5, "renderer_mode": "gpu", "pen_opacity": 0 }"#;
        let settings = InkSettings::from_json(json).expect("settings should parse");
        assert_eq!(settings.pen_size, 5.0);
        assert_eq!(settings.renderer_mode, RendererMode::Gpu);
        assert_eq!(settings.pen_opacity, MIN_PEN_OPACITY);
        assert_eq!(settings.autosave_delay_ms, 800);
    }

    #[test]
    fn test_opacity_clamp() {
        let mut settings = InkSettings::default();
        settings.set_pen_opacity(4.0);
        assert_eq!(settings.pen_opacity, 1.0);
        settings.set_pen_opacity(0.5);
        assert_eq!(settings.pen_opacity, 0.5);
    }
}
