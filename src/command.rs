use crate::tile_cache::TileCoord;
use macroquad::prelude::{Color, Rect, Vec2};

/// One primitive emitted by the viewport renderer, in screen pixels.
///
/// A frame is a `Vec<DrawCommand>` executed in order.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Fill the whole surface
    Clear(Color),
    /// Draw a cached background tile stretched into `dest`
    Image {
        /// Tile whose image to draw
        tile: TileCoord,
        /// Destination on screen
        dest: Rect,
    },
    /// Solid rectangle
    FillRect {
        /// Area
        rect: Rect,
        /// Fill color
        color: Color,
    },
    /// Rectangle outline
    StrokeRect {
        /// Area
        rect: Rect,
        /// Line width in pixels
        thickness: f32,
        /// Line color
        color: Color,
    },
    /// Single line of text; `pos` is the baseline origin
    Text {
        /// Content
        text: String,
        /// Baseline origin
        pos: Vec2,
        /// Font size in pixels
        size: f32,
        /// Text color
        color: Color,
    },
}

impl DrawCommand {
    /// Text content, if this is a text command
    pub fn text(&self) -> Option<&str> {
        match self {
            DrawCommand::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}
