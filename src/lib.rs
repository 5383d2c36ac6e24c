#![warn(missing_docs)]

//! Chunk map viewer and region-selection editor for game server saves,
//! rendered with Macroquad.

pub mod camera;
/// Draw commands a frame is made of.
pub mod command;
/// JSON viewer configuration.
pub mod config;
pub mod controller;
pub mod deletion;
mod error;
pub mod gateway;
/// World-space rectangles.
pub mod geom;
pub mod render;
pub mod scheduler;
/// Selected chunks and the click / drag commit rules.
pub mod selection;
pub mod spatial {
    //! Chunk index with coarse bucket lookup.

    /// Chunk records and the index over them.
    pub mod index;
}
pub mod tile_cache;
pub mod viewer;

pub use camera::ViewCamera;
pub use config::ViewerConfig;
pub use controller::{InteractionController, Key, Modifiers, PointerButton, ToolMode};
pub use deletion::{DeletionResult, DeletionState, DeletionWorkflow};
pub use error::ViewerError;
pub use gateway::fs_gateway::FsGateway;
pub use gateway::worker::{GatewayReply, GatewayRequest, GatewayWorker, ListPurpose};
pub use gateway::{ChunkListing, DataGateway, DeleteOutcome, Save, SaveStats};
pub use selection::Selection;
pub use spatial::index::{Bounds, Chunk, ChunkCoord, ChunkIndex, FileRef};
pub use tile_cache::{TileCache, TileCoord, TileFetcher, TileLoad};
pub use viewer::{ChunkViewer, Notice, ViewerEvent};
