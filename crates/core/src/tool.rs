//! Drawing tools
//!
//! A tool turns the first sample of a gesture into a new live stroke.

use crate::settings::InkSettings;
use crate::stroke::{DeviceKind, Point, Stroke, ToolKind};

/// Eraser strokes are never smaller than this
const MIN_ERASER_SIZE: f32 = 4.0;

/// Parameters for starting a stroke
#[derive(Debug, Clone, Copy)]
pub struct StrokeInit {
    pub device: DeviceKind,
    /// Surface width in pixels when the stroke starts
    pub ref_w: f32,
    /// Surface height in pixels when the stroke starts
    pub ref_h: f32,
    pub point: Point,
}

/// A drawing tool
pub trait Tool {
    fn kind(&self) -> ToolKind;

    /// Build a new one-point live stroke from the current settings
    fn create_stroke(&self, init: StrokeInit, settings: &InkSettings) -> Stroke;
}

/// Alpha-blended pen
#[derive(Debug, Default, Clone, Copy)]
pub struct PenTool;

impl Tool for PenTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Pen
    }

    fn create_stroke(&self, init: StrokeInit, settings: &InkSettings) -> Stroke {
        Stroke {
            tool: ToolKind::Pen,
            device: init.device,
            color: settings.pen_color.clone(),
            size: settings.pen_size,
            ref_w: init.ref_w,
            ref_h: init.ref_h,
            opacity: settings.pen_opacity,
            points: vec![init.point],
        }
    }
}

/// Subtractive eraser
#[derive(Debug, Default, Clone, Copy)]
pub struct EraserTool;

impl Tool for EraserTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Eraser
    }

    fn create_stroke(&self, init: StrokeInit, settings: &InkSettings) -> Stroke {
        Stroke {
            tool: ToolKind::Eraser,
            device: init.device,
            // Ignored by the renderers
            color: "#000000".to_string(),
            size: settings.pen_size.max(MIN_ERASER_SIZE),
            ref_w: init.ref_w,
            ref_h: init.ref_h,
            opacity: 1.0,
            points: vec![init.point],
        }
    }
}

/// Holds the available tools and the active one
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    active: ToolKind,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry").field("active", &self.active).finish_non_exhaustive()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create a registry with the pen and eraser, pen active
    pub fn new() -> Self {
        Self { tools: vec![Box::new(PenTool), Box::new(EraserTool)], active: ToolKind::Pen }
    }

    /// Register a tool, replacing any with the same kind
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.retain(|existing| existing.kind() != tool.kind());
        self.tools.push(tool);
    }

    pub fn get(&self, kind: ToolKind) -> Option<&dyn Tool> {
        self.tools.iter().find(|tool| tool.kind() == kind).map(|tool| tool.as_ref())
    }

    pub fn set_active(&mut self, kind: ToolKind) {
        self.active = kind;
    }

    pub fn active_kind(&self) -> ToolKind {
        self.active
    }

    pub fn active(&self) -> Option<&dyn Tool> {
        self.get(self.active)
    }
}
