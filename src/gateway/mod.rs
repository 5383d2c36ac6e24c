//! Data access consumed by the viewer: saves, chunk listings, stats, deletion.

use crate::error::ViewerError;
use crate::spatial::index::{Bounds, Chunk, FileRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Gateway over a directory of save directories.
pub mod fs_gateway;
pub mod worker;

/// One save as shown in the save picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Save {
    /// Directory / display name
    pub name: String,
    /// Last modification, unix seconds
    pub modified: u64,
    /// Chunk files in the save
    pub chunk_count: usize,
    /// Total bytes of chunk files
    pub size_bytes: u64,
}

/// Result of listing the chunks of one save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkListing {
    /// Chunks, at most the gateway's cap
    pub chunks: Vec<Chunk>,
    /// Bounds of `chunks`, `None` when empty
    pub bounds: Option<Bounds>,
    /// `true` when the save holds more chunks than were returned
    pub limit_reached: bool,
}

/// Per-folder totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderStats {
    /// Number of files
    pub files: usize,
    /// Total bytes
    pub bytes: u64,
}

/// Display-only storage numbers for a save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveStats {
    /// Bytes across every file in the save
    pub total_size_bytes: u64,
    /// Keyed by top-level folder, `"."` for files in the save root
    pub per_folder: BTreeMap<String, FolderStats>,
}

/// What a deletion actually did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    /// Files removed
    pub deleted_count: usize,
    /// Refs that could not be removed; non-empty means a partial deletion
    pub failed: Vec<FileRef>,
    /// Where the backup went, if one was made
    pub backup_path: Option<String>,
}

impl DeleteOutcome {
    /// Every requested chunk was removed
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Backend the viewer reads saves from and deletes chunks through.
pub trait DataGateway {
    /// All saves, sorted by name
    fn list_saves(&self) -> Result<Vec<Save>, ViewerError>;

    /// Chunks of one save, possibly truncated (see [`ChunkListing::limit_reached`])
    fn list_chunks(&self, save: &str) -> Result<ChunkListing, ViewerError>;

    /// Storage summary of one save
    fn get_stats(&self, save: &str) -> Result<SaveStats, ViewerError>;

    /// Remove `refs` from `save`. An `Err` means nothing was deleted; partial
    /// deletions are reported through [`DeleteOutcome::failed`].
    fn delete_chunks(
        &mut self,
        save: &str,
        refs: &[FileRef],
        create_backup: bool,
    ) -> Result<DeleteOutcome, ViewerError>;
}
