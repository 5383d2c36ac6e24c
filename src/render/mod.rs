//! Turning viewer state into draw commands, and drawing them.

pub mod backend;
/// Which chunks a view can see.
pub mod cull;
pub mod hud;
pub mod viewport;

pub use viewport::{render_viewport, PointerSnapshot, RenderInput};
