//! Macroquad side of the viewer: executes draw commands and loads tile textures.

use crate::command::DrawCommand;
use crate::tile_cache::{TileCache, TileCoord, TileFetcher, TileLoad};
use macroquad::experimental::coroutines::{start_coroutine, Coroutine};
use macroquad::prelude::*;

/// Run a frame's commands against the current macroquad window.
pub fn execute(commands: &[DrawCommand], tiles: &TileCache<Texture2D>) {
    for cmd in commands {
        match cmd {
            DrawCommand::Clear(color) => clear_background(*color),
            DrawCommand::Image { tile, dest } => {
                // drawn only if still cached; the renderer already checked
                if let Some(tex) = tiles.image(*tile) {
                    draw_texture_ex(
                        tex,
                        dest.x,
                        dest.y,
                        WHITE,
                        DrawTextureParams {
                            dest_size: Some(vec2(dest.w, dest.h)),
                            ..Default::default()
                        },
                    );
                }
            }
            DrawCommand::FillRect { rect, color } => {
                draw_rectangle(rect.x, rect.y, rect.w, rect.h, *color)
            }
            DrawCommand::StrokeRect {
                rect,
                thickness,
                color,
            } => draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, *thickness, *color),
            DrawCommand::Text {
                text,
                pos,
                size,
                color,
            } => {
                draw_text(text, pos.x, pos.y, *size, *color);
            }
        }
    }
}

/// Loads tile textures on macroquad coroutines; poll with [`TextureFetcher::drain`].
#[derive(Default)]
pub struct TextureFetcher {
    in_flight: Vec<(TileCoord, Coroutine<Result<Texture2D, String>>)>,
}

impl TextureFetcher {
    /// Nothing in flight
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches still running
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Completed loads since the last call.
    pub fn drain(&mut self) -> Vec<TileLoad<Texture2D>> {
        let mut done = Vec::new();
        self.in_flight.retain(|(coord, co)| {
            if !co.is_done() {
                return true;
            }
            let result = co
                .retrieve()
                .unwrap_or_else(|| Err("coroutine finished without a result".to_owned()));
            done.push(TileLoad { coord: *coord, result });
            false
        });
        done
    }
}

impl TileFetcher<Texture2D> for TextureFetcher {
    fn fetch(&mut self, coord: TileCoord, url: &str) {
        let url = url.to_owned();
        let co = start_coroutine(async move {
            let tex = load_texture(&url).await.map_err(|e| e.to_string())?;
            tex.set_filter(FilterMode::Linear);
            Ok::<_, String>(tex)
        });
        self.in_flight.push((coord, co));
    }
}
