//! Draw hook for tables
//!
//! The simulation never draws on its own. A front end implements `Canvas`
//! and calls `Table::draw` whenever it wants a frame; `DrawList` records the
//! calls for headless runs and tests.

use glam::DVec2;

use crate::sim::geometry::Rect;
use crate::sim::spec::Color;

/// Minimal 2D fill surface
pub trait Canvas {
    /// Clear the whole table area
    fn fill_background(&mut self, dims: DVec2, color: Color);
    fn fill_rect(&mut self, rect: Rect, color: Color);
    fn fill_circle(&mut self, center: DVec2, radius: f64, color: Color);
}

/// One recorded canvas call
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    Background { dims: DVec2, color: Color },
    Rect { rect: Rect, color: Color },
    Circle { center: DVec2, radius: f64, color: Color },
}

/// Canvas that records commands in call order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawList {
    pub commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Canvas for DrawList {
    fn fill_background(&mut self, dims: DVec2, color: Color) {
        self.commands.push(DrawCommand::Background { dims, color });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::Rect { rect, color });
    }

    fn fill_circle(&mut self, center: DVec2, radius: f64, color: Color) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            color,
        });
    }
}
