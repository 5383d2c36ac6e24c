// src/gateway/fs_gateway.rs
use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::gateway::{ChunkListing, DataGateway, DeleteOutcome, FolderStats, Save, SaveStats};
use crate::spatial::index::{Bounds, Chunk, ChunkCoord, FileRef};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Folder tag for files that sit directly in the save directory.
pub const ROOT_FOLDER: &str = ".";

struct ScannedFile {
    /// Save-relative path with `/` separators
    rel: String,
    folder: String,
    name: String,
    size: u64,
}

/// Gateway over a directory tree: `root/<save>/[<folder>/]<prefix>_<x>_<y>.bin`.
#[derive(Debug, Clone)]
pub struct FsGateway {
    root: PathBuf,
    backup_root: PathBuf,
    max_chunks: usize,
    prefixes: Vec<String>,
}

impl FsGateway {
    /// Saves under `root`, backups under `backup_root`, default cap and prefixes.
    pub fn new(root: impl Into<PathBuf>, backup_root: impl Into<PathBuf>) -> Self {
        FsGateway {
            root: root.into(),
            backup_root: backup_root.into(),
            max_chunks: crate::config::DEFAULT_MAX_CHUNKS,
            prefixes: vec!["map".to_owned()],
        }
    }

    /// Roots, cap and prefixes taken from `config`.
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(&config.saves_root, &config.backup_root)
            .with_max_chunks(config.max_chunks)
            .with_prefixes(config.chunk_prefixes.clone())
    }

    /// Cap on chunks returned by `list_chunks`.
    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = max_chunks.max(1);
        self
    }

    /// File-name prefixes recognised as chunk files.
    pub fn with_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.prefixes = prefixes;
        self
    }

    fn save_dir(&self, save: &str) -> Result<PathBuf, ViewerError> {
        if save.is_empty() || !is_plain_relative(Path::new(save)) || Path::new(save).components().count() != 1 {
            return Err(ViewerError::SaveNotFound(save.to_owned()));
        }
        let dir = self.root.join(save);
        if !dir.is_dir() {
            return Err(ViewerError::SaveNotFound(save.to_owned()));
        }
        Ok(dir)
    }

    /// `map_-3_12.bin` -> `(-3, 12)` when `map` is a known prefix.
    fn parse_chunk_name(&self, name: &str) -> Option<ChunkCoord> {
        let stem = name.strip_suffix(".bin")?;
        let mut parts = stem.rsplitn(3, '_');
        let y = parts.next()?.parse().ok()?;
        let x = parts.next()?.parse().ok()?;
        let prefix = parts.next()?;
        if !self.prefixes.iter().any(|p| p == prefix) {
            return None;
        }
        Some(ChunkCoord::new(x, y))
    }

    /// Chunk files in the save, sorted by relative path, duplicates dropped.
    fn scan_chunks(&self, dir: &Path) -> Result<Vec<Chunk>, ViewerError> {
        let mut seen = HashSet::new();
        let mut chunks = Vec::new();
        for file in scan_files(dir)? {
            let Some(coord) = self.parse_chunk_name(&file.name) else {
                continue;
            };
            if !seen.insert(coord) {
                log::debug!("ignoring duplicate chunk {} at {}", coord, file.rel);
                continue;
            }
            chunks.push(Chunk {
                x: coord.x,
                y: coord.y,
                size_bytes: file.size,
                source_tag: file.folder,
                file_ref: FileRef(file.rel),
            });
        }
        Ok(chunks)
    }

    fn backup_dir(&self, save: &str) -> PathBuf {
        let secs = unix_secs(SystemTime::now());
        let mut dir = self.backup_root.join(format!("{save}_{secs}"));
        let mut n = 1;
        while dir.exists() {
            dir = self.backup_root.join(format!("{save}_{secs}_{n}"));
            n += 1;
        }
        dir
    }

    fn backup(&self, save_dir: &Path, save: &str, refs: &[FileRef]) -> Result<PathBuf, ViewerError> {
        let dest_root = self.backup_dir(save);
        for r in refs {
            let src = save_dir.join(r.as_str());
            if !src.is_file() {
                continue;
            }
            let dest = dest_root.join(r.as_str());
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|source| ViewerError::Backup {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            fs::copy(&src, &dest).map_err(|source| ViewerError::Backup { path: dest.clone(), source })?;
        }
        Ok(dest_root)
    }
}

impl DataGateway for FsGateway {
    fn list_saves(&self) -> Result<Vec<Save>, ViewerError> {
        let entries = fs::read_dir(&self.root).map_err(|e| ViewerError::io(&self.root, e))?;
        let mut saves = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ViewerError::io(&self.root, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if path == self.backup_root {
                continue;
            }
            let chunks = self.scan_chunks(&path)?;
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .map(unix_secs)
                .unwrap_or(0);
            saves.push(Save {
                name,
                modified,
                chunk_count: chunks.len(),
                size_bytes: chunks.iter().map(|c| c.size_bytes).sum(),
            });
        }
        saves.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(saves)
    }

    fn list_chunks(&self, save: &str) -> Result<ChunkListing, ViewerError> {
        let dir = self.save_dir(save)?;
        let mut chunks = self.scan_chunks(&dir)?;
        let limit_reached = chunks.len() > self.max_chunks;
        if limit_reached {
            log::warn!(
                "save '{}' has {} chunks, listing only the first {}",
                save,
                chunks.len(),
                self.max_chunks
            );
            chunks.truncate(self.max_chunks);
        }
        let bounds = Bounds::from_coords(chunks.iter().map(Chunk::coord));
        Ok(ChunkListing {
            chunks,
            bounds,
            limit_reached,
        })
    }

    fn get_stats(&self, save: &str) -> Result<SaveStats, ViewerError> {
        let dir = self.save_dir(save)?;
        let mut stats = SaveStats::default();
        for file in scan_files(&dir)? {
            stats.total_size_bytes += file.size;
            let folder = stats.per_folder.entry(file.folder).or_insert_with(FolderStats::default);
            folder.files += 1;
            folder.bytes += file.size;
        }
        Ok(stats)
    }

    fn delete_chunks(
        &mut self,
        save: &str,
        refs: &[FileRef],
        create_backup: bool,
    ) -> Result<DeleteOutcome, ViewerError> {
        if let Some(bad) = refs.iter().find(|r| r.as_str().is_empty() || !is_plain_relative(Path::new(r.as_str()))) {
            return Err(ViewerError::InvalidChunkRef(bad.0.clone()));
        }
        let dir = self.save_dir(save)?;

        let backup_path = if create_backup {
            let path = self.backup(&dir, save, refs)?;
            log::info!("backed up {} chunks of '{}' to {}", refs.len(), save, path.display());
            Some(path.display().to_string())
        } else {
            None
        };

        let mut outcome = DeleteOutcome {
            backup_path,
            ..DeleteOutcome::default()
        };
        for r in refs {
            match fs::remove_file(dir.join(r.as_str())) {
                Ok(()) => outcome.deleted_count += 1,
                Err(e) => {
                    log::warn!("could not delete {}: {}", r.as_str(), e);
                    outcome.failed.push(r.clone());
                }
            }
        }
        log::info!(
            "deleted {}/{} chunks from '{}'",
            outcome.deleted_count,
            refs.len(),
            save
        );
        Ok(outcome)
    }
}

/// Files directly in `dir` plus files one folder down, sorted by relative path.
fn scan_files(dir: &Path) -> Result<Vec<ScannedFile>, ViewerError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| ViewerError::io(dir, e))? {
        let entry = entry.map_err(|e| ViewerError::io(dir, e))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if path.is_dir() {
            for inner in fs::read_dir(&path).map_err(|e| ViewerError::io(&path, e))? {
                let inner = inner.map_err(|e| ViewerError::io(&path, e))?;
                let meta = inner.metadata().map_err(|e| ViewerError::io(inner.path(), e))?;
                if !meta.is_file() {
                    continue;
                }
                let inner_name = inner.file_name().to_string_lossy().into_owned();
                files.push(ScannedFile {
                    rel: format!("{name}/{inner_name}"),
                    folder: name.clone(),
                    name: inner_name,
                    size: meta.len(),
                });
            }
        } else {
            let meta = entry.metadata().map_err(|e| ViewerError::io(&path, e))?;
            files.push(ScannedFile {
                rel: name.clone(),
                folder: ROOT_FOLDER.to_owned(),
                name,
                size: meta.len(),
            });
        }
    }
    files.sort_by(|a, b| a.rel.cmp(&b.rel));
    Ok(files)
}

fn is_plain_relative(p: &Path) -> bool {
    p.components().all(|c| matches!(c, Component::Normal(_)))
}

fn unix_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT: AtomicUsize = AtomicUsize::new(0);

    fn temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock went backwards")
            .as_nanos();
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!("chunkmap_fs_{nanos}_{n}"));
        fs::create_dir_all(&dir).expect("failed to create temp dir");
        dir
    }

    #[test]
    fn parses_known_prefixes_only() {
        let gw = FsGateway::new("x", "y").with_prefixes(vec!["map".into(), "chunk_data".into()]);
        assert_eq!(gw.parse_chunk_name("map_-3_12.bin"), Some(ChunkCoord::new(-3, 12)));
        assert_eq!(gw.parse_chunk_name("chunk_data_4_5.bin"), Some(ChunkCoord::new(4, 5)));
        assert_eq!(gw.parse_chunk_name("zpop_4_5.bin"), None);
        assert_eq!(gw.parse_chunk_name("map_4_5.png"), None);
        assert_eq!(gw.parse_chunk_name("map_a_5.bin"), None);
    }

    #[test]
    fn rejects_escaping_refs_before_touching_files() {
        let root = temp_dir();
        fs::create_dir_all(root.join("world")).expect("mkdir");
        fs::write(root.join("world/map_0_0.bin"), b"abc").expect("write");
        let mut gw = FsGateway::new(&root, root.join("backups"));

        let err = gw
            .delete_chunks("world", &[FileRef("map_0_0.bin".into()), FileRef("../x.bin".into())], false)
            .expect_err("should reject");
        assert!(matches!(err, ViewerError::InvalidChunkRef(_)));
        assert!(root.join("world/map_0_0.bin").exists());
    }

    #[test]
    fn unknown_save_is_typed_error() {
        let root = temp_dir();
        let gw = FsGateway::new(&root, root.join("backups"));
        assert!(matches!(gw.list_chunks("nope"), Err(ViewerError::SaveNotFound(_))));
        assert!(matches!(gw.list_chunks("../etc"), Err(ViewerError::SaveNotFound(_))));
    }

    #[test]
    fn duplicates_keep_first_by_path_and_listing_truncates() {
        let root = temp_dir();
        let save = root.join("world");
        fs::create_dir_all(save.join("region")).expect("mkdir");
        fs::write(save.join("map_1_1.bin"), b"aa").expect("write");
        fs::write(save.join("map_2_1.bin"), b"aa").expect("write");
        fs::write(save.join("region/map_1_1.bin"), b"bbbb").expect("write");
        fs::write(save.join("region/map_3_1.bin"), b"bbbb").expect("write");
        fs::write(save.join("notes.txt"), b"hello").expect("write");
        let gw = FsGateway::new(&root, root.join("backups"));

        let listing = gw.list_chunks("world").expect("list");
        assert!(!listing.limit_reached);
        assert_eq!(listing.chunks.len(), 3);
        let dup = listing.chunks.iter().find(|c| c.coord() == ChunkCoord::new(1, 1)).expect("chunk");
        assert_eq!(dup.source_tag, ROOT_FOLDER);
        assert_eq!(dup.size_bytes, 2);
        assert_eq!(listing.bounds.map(|b| (b.min_x, b.max_x)), Some((1, 3)));

        let capped = gw.clone().with_max_chunks(2).list_chunks("world").expect("list");
        assert!(capped.limit_reached);
        assert_eq!(capped.chunks.len(), 2);

        // stats count every file, chunk or not
        let stats = gw.get_stats("world").expect("stats");
        assert_eq!(stats.total_size_bytes, 2 + 2 + 4 + 4 + 5);
        assert_eq!(stats.per_folder[ROOT_FOLDER].files, 3);
        assert_eq!(stats.per_folder["region"].bytes, 8);
    }

    #[test]
    fn backup_root_inside_saves_is_not_a_save() {
        let root = temp_dir();
        fs::create_dir_all(root.join("world")).expect("mkdir");
        fs::write(root.join("world/map_0_0.bin"), b"abc").expect("write");
        let mut gw = FsGateway::new(&root, root.join("_backups"));

        let outcome = gw
            .delete_chunks("world", &[FileRef("map_0_0.bin".into())], true)
            .expect("delete");
        assert_eq!(outcome.deleted_count, 1);
        let backup = PathBuf::from(outcome.backup_path.expect("backup made"));
        assert_eq!(fs::read(backup.join("map_0_0.bin")).expect("read"), b"abc");

        let saves = gw.list_saves().expect("saves");
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].name, "world");
        assert_eq!(saves[0].chunk_count, 0);
    }

    #[test]
    fn missing_files_are_reported_not_hidden() {
        let root = temp_dir();
        fs::create_dir_all(root.join("world")).expect("mkdir");
        fs::write(root.join("world/map_0_0.bin"), b"abc").expect("write");
        let mut gw = FsGateway::new(&root, root.join("backups"));

        let outcome = gw
            .delete_chunks(
                "world",
                &[FileRef("map_0_0.bin".into()), FileRef("map_9_9.bin".into())],
                false,
            )
            .expect("delete");
        assert_eq!(outcome.deleted_count, 1);
        assert_eq!(outcome.failed, vec![FileRef("map_9_9.bin".into())]);
        assert!(!outcome.is_complete());
    }
}
