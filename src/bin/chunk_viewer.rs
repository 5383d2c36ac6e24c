//! Interactive chunk map viewer over a directory of saves.
//!
//! Left drag selects (Shift/Alt subtracts), middle or right drag pans, the
//! wheel zooms. `Delete` asks to remove the selection, `Tab` opens the next save.
//! Listing, stats and deletion run on a gateway worker thread.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chunkmap_viewer::render::backend::{execute, TextureFetcher};
use chunkmap_viewer::{
    ChunkViewer, FsGateway, GatewayReply, GatewayWorker, Key, Modifiers, PointerButton,
    ViewerConfig, ViewerEvent,
};
use clap::Parser;
use macroquad::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "chunk_viewer")]
#[command(about = "Browse a save's chunk map and delete selected regions")]
struct Args {
    /// JSON config file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding one sub-directory per save (overrides the config).
    #[arg(long)]
    saves_root: Option<PathBuf>,

    /// Save to open on start; the first save otherwise.
    #[arg(short, long)]
    save: Option<String>,

    #[arg(long, default_value_t = 1280)]
    width: i32,

    #[arg(long, default_value_t = 720)]
    height: i32,
}

fn window_conf() -> Conf {
    let args = Args::parse();
    Conf {
        window_title: "Chunk Viewer".into(),
        window_width: args.width,
        window_height: args.height,
        window_resizable: true,
        ..Default::default()
    }
}

const KEYS: [(KeyCode, Key); 11] = [
    (KeyCode::Escape, Key::Escape),
    (KeyCode::Enter, Key::Enter),
    (KeyCode::KpEnter, Key::Enter),
    (KeyCode::Delete, Key::Delete),
    (KeyCode::Backspace, Key::Delete),
    (KeyCode::Key1, Key::Digit(1)),
    (KeyCode::Key2, Key::Digit(2)),
    (KeyCode::A, Key::Char('a')),
    (KeyCode::I, Key::Char('i')),
    (KeyCode::F, Key::Char('f')),
    (KeyCode::B, Key::Char('b')),
];

const BUTTONS: [(MouseButton, PointerButton); 3] = [
    (MouseButton::Left, PointerButton::Primary),
    (MouseButton::Middle, PointerButton::Middle),
    (MouseButton::Right, PointerButton::Secondary),
];

fn modifiers() -> Modifiers {
    Modifiers {
        subtract: is_key_down(KeyCode::LeftShift)
            || is_key_down(KeyCode::RightShift)
            || is_key_down(KeyCode::LeftAlt)
            || is_key_down(KeyCode::RightAlt),
    }
}

fn load_config(args: &Args) -> Result<ViewerConfig> {
    let mut config = match &args.config {
        Some(path) => ViewerConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ViewerConfig::default(),
    };
    if let Some(root) = &args.saves_root {
        config.saves_root = root.clone();
    }
    Ok(config)
}

fn next_save(viewer: &ChunkViewer<Texture2D>) -> Option<String> {
    let saves = viewer.saves();
    if saves.is_empty() {
        return None;
    }
    let pos = viewer
        .current_save()
        .and_then(|cur| saves.iter().position(|s| s.name == cur))
        .map_or(0, |i| (i + 1) % saves.len());
    Some(saves[pos].name.clone())
}

async fn run() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    let gateway = FsGateway::from_config(&config);
    let mut worker = GatewayWorker::spawn(gateway);
    let mut viewer = ChunkViewer::new(config, vec2(screen_width(), screen_height()));
    let mut fetcher = TextureFetcher::new();
    prevent_quit();

    viewer.refresh_saves();
    // without --save, the first listed save opens once the list arrives
    let mut open_first = match &args.save {
        Some(name) => {
            viewer.open_save(name)?;
            false
        }
        None => true,
    };

    let mut frame = Vec::new();
    let mut last_mouse: Option<Vec2> = None;
    let mut held: Option<MouseButton> = None;

    loop {
        for reply in worker.drain() {
            let listed_saves = matches!(reply, GatewayReply::Saves(Ok(_)));
            viewer.apply(reply);
            if listed_saves && open_first {
                open_first = false;
                match next_save(&viewer) {
                    Some(name) => viewer.open_save(&name)?,
                    None => log::warn!("no saves found"),
                }
            }
        }

        viewer.resize(vec2(screen_width(), screen_height()));

        let (mx, my) = mouse_position();
        let mouse = vec2(mx, my);
        let inside = mx >= 0.0 && my >= 0.0 && mx < screen_width() && my < screen_height();
        let mods = modifiers();

        if inside {
            if last_mouse != Some(mouse) {
                viewer.pointer_move(mouse, mods);
            }
            last_mouse = Some(mouse);
        } else if last_mouse.take().is_some() {
            viewer.pointer_leave();
        }

        for (mb, button) in BUTTONS {
            if inside && held.is_none() && is_mouse_button_pressed(mb) {
                held = Some(mb);
                viewer.pointer_down(button, mouse, mods);
            }
            // other buttons' releases must not end the drag
            if held == Some(mb) && is_mouse_button_released(mb) {
                held = None;
                viewer.pointer_up(button, mouse, mods);
            }
        }

        let (_, wheel_y) = mouse_wheel();
        if inside && wheel_y != 0.0 {
            viewer.wheel(mouse, wheel_y);
        }

        for (code, key) in KEYS {
            if is_key_pressed(code) && viewer.key(key, false) == ViewerEvent::ConfirmDelete {
                if let Err(e) = viewer.confirm_delete() {
                    log::error!("delete not sent: {}", e);
                }
            }
        }
        if is_key_pressed(KeyCode::Tab) && !viewer.deletion().is_open() {
            viewer.refresh_saves();
            if let Some(name) = next_save(&viewer) {
                // refused while a deletion is pending; the HUD says so
                let _ = viewer.open_save(&name);
            }
        }

        viewer.tick(get_time());
        for request in viewer.take_requests() {
            if !worker.send(request) {
                anyhow::bail!("gateway worker stopped");
            }
        }

        viewer.deliver_tiles(fetcher.drain());
        if let Some(commands) = viewer.frame(&mut fetcher) {
            frame = commands;
        }
        execute(&frame, viewer.tiles());

        if is_quit_requested() {
            break;
        }
        next_frame().await;
    }

    viewer.teardown();
    if worker.in_flight() > 0 {
        log::info!("waiting for {} gateway requests", worker.in_flight());
    }
    worker.shutdown();
    Ok(())
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();
    if let Err(e) = run().await {
        log::error!("{:#}", e);
        eprintln!("chunk_viewer: {:#}", e);
        std::process::exit(1);
    }
}
