//! Text overlays: status lines, truncation banner, notices, delete dialog.

use crate::command::DrawCommand;
use crate::controller::ToolMode;
use crate::deletion::DeletionState;
use crate::gateway::SaveStats;
use crate::spatial::index::{Chunk, ChunkCoord};
use crate::viewer::Notice;
use macroquad::prelude::*;

const FONT_SIZE: f32 = 18.0;
const LINE_HEIGHT: f32 = 20.0;
const PANEL_BG: Color = Color::new(0.0, 0.0, 0.0, 0.65);
const TEXT: Color = Color::new(0.92, 0.92, 0.92, 1.0);
const WARNING_BG: Color = Color::new(0.55, 0.32, 0.0, 0.9);
const ERROR_TEXT: Color = Color::new(1.0, 0.45, 0.4, 1.0);
const WARNING_TEXT: Color = Color::new(1.0, 0.8, 0.35, 1.0);
const DIALOG_BG: Color = Color::new(0.08, 0.08, 0.1, 0.95);
const DIALOG_BORDER: Color = Color::new(0.85, 0.25, 0.2, 1.0);

/// Everything the HUD shows besides the map itself.
pub struct HudState<'a> {
    /// Open save
    pub save: Option<&'a str>,
    /// Active tool
    pub tool: ToolMode,
    /// Chunks in the index
    pub loaded: usize,
    /// Selected chunks
    pub selected: usize,
    /// Bytes of the selected, loaded chunks
    pub selected_bytes: u64,
    /// Cell under the pointer and its chunk, if there is one
    pub hover: Option<(ChunkCoord, Option<&'a Chunk>)>,
    /// Storage numbers of the save
    pub stats: Option<&'a SaveStats>,
    /// Listing was truncated
    pub limit_reached: bool,
    /// Message for the operator
    pub notice: Option<&'a Notice>,
    /// Delete dialog state
    pub deletion: DeletionState,
}

/// `1536` -> `"1.5 KiB"`
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

fn text(out: &mut Vec<DrawCommand>, s: String, x: f32, y: f32, color: Color) {
    out.push(DrawCommand::Text {
        text: s,
        pos: vec2(x, y),
        size: FONT_SIZE,
        color,
    });
}

fn panel(out: &mut Vec<DrawCommand>, lines: Vec<(String, Color)>, x: f32, y: f32, width: f32) -> f32 {
    let h = lines.len() as f32 * LINE_HEIGHT + 8.0;
    out.push(DrawCommand::FillRect {
        rect: Rect::new(x, y, width, h),
        color: PANEL_BG,
    });
    for (i, (s, color)) in lines.into_iter().enumerate() {
        text(out, s, x + 8.0, y + (i as f32 + 1.0) * LINE_HEIGHT, color);
    }
    y + h
}

/// Append the status panel, banners, notice and delete dialog.
pub fn push_hud(out: &mut Vec<DrawCommand>, hud: &HudState<'_>, viewport: Vec2) {
    let mut lines = Vec::new();
    lines.push((
        format!(
            "{} | {} chunks | tool: {}",
            hud.save.unwrap_or("no save"),
            hud.loaded,
            hud.tool.label()
        ),
        TEXT,
    ));
    lines.push((
        format!("selected: {} ({})", hud.selected, format_bytes(hud.selected_bytes)),
        TEXT,
    ));
    if let Some((coord, chunk)) = hud.hover {
        let detail = match chunk {
            Some(c) => format!(" {} [{}]", format_bytes(c.size_bytes), c.source_tag),
            None => String::new(),
        };
        lines.push((format!("{}, {}{}", coord.x, coord.y, detail), TEXT));
    }
    if let Some(stats) = hud.stats {
        lines.push((
            format!(
                "on disk: {} in {} folders",
                format_bytes(stats.total_size_bytes),
                stats.per_folder.len()
            ),
            TEXT,
        ));
    }
    if let Some(notice) = hud.notice {
        let color = match notice {
            Notice::Info(_) => TEXT,
            Notice::Warning(_) => WARNING_TEXT,
            Notice::Error(_) => ERROR_TEXT,
        };
        lines.push((notice.message().to_owned(), color));
    }
    panel(out, lines, 8.0, 8.0, (viewport.x - 16.0).min(520.0).max(0.0));

    if hud.limit_reached {
        let y = viewport.y - LINE_HEIGHT - 12.0;
        out.push(DrawCommand::FillRect {
            rect: Rect::new(0.0, y, viewport.x, LINE_HEIGHT + 12.0),
            color: WARNING_BG,
        });
        text(
            out,
            format!(
                "Listing truncated: only {} chunks are loaded; select all / invert cover loaded chunks only",
                hud.loaded
            ),
            8.0,
            y + LINE_HEIGHT,
            TEXT,
        );
    }

    push_delete_dialog(out, hud.deletion, viewport);
}

fn push_delete_dialog(out: &mut Vec<DrawCommand>, state: DeletionState, viewport: Vec2) {
    let lines = match state {
        DeletionState::Idle => return,
        DeletionState::Confirming { summary, backup } => vec![
            format!(
                "Delete {} chunks ({})?",
                summary.count,
                format_bytes(summary.total_bytes)
            ),
            format!("[b] backup: {}", if backup { "on" } else { "off" }),
            "[Enter] confirm   [Esc] cancel".to_owned(),
        ],
        DeletionState::Pending => vec!["Deleting chunks...".to_owned()],
    };

    let w = 360.0_f32.min(viewport.x);
    let h = lines.len() as f32 * LINE_HEIGHT + 16.0;
    let rect = Rect::new((viewport.x - w) / 2.0, (viewport.y - h) / 2.0, w, h);
    out.push(DrawCommand::FillRect { rect, color: DIALOG_BG });
    out.push(DrawCommand::StrokeRect {
        rect,
        thickness: 2.0,
        color: DIALOG_BORDER,
    });
    for (i, s) in lines.into_iter().enumerate() {
        text(out, s, rect.x + 12.0, rect.y + 4.0 + (i as f32 + 1.0) * LINE_HEIGHT, TEXT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_are_human_readable() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }
}
