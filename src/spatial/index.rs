use crate::geom::WorldRect;
use crate::selection::Selection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Edge length, in chunks, of the coarse buckets used for rectangle queries.
pub const BUCKET_SIZE: i32 = 32;

/// Integer chunk coordinate. One world unit = one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl ChunkCoord {
    /// Build a coordinate
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        ChunkCoord { x, y }
    }

    /// Chunk whose unit square contains world point `p`.
    #[inline]
    pub fn containing(p: macroquad::prelude::Vec2) -> Self {
        ChunkCoord {
            x: p.x.floor() as i32,
            y: p.y.floor() as i32,
        }
    }

    /// Selection key in `"x_y"` form.
    pub fn key(self) -> String {
        self.to_string()
    }

    /// Parse an `"x_y"` key back into a coordinate.
    pub fn parse_key(key: &str) -> Option<Self> {
        // split on the separator after the first char so "-3_-4" works
        let sep = key.char_indices().skip(1).find(|&(_, c)| c == '_')?.0;
        let x = key[..sep].parse().ok()?;
        let y = key[sep + 1..].parse().ok()?;
        Some(ChunkCoord { x, y })
    }

    #[inline]
    fn bucket(self) -> BucketCoord {
        BucketCoord {
            x: self.x.div_euclid(BUCKET_SIZE),
            y: self.y.div_euclid(BUCKET_SIZE),
        }
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.x, self.y)
    }
}

/// Opaque reference the gateway uses to locate a chunk's backing file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileRef(pub String);

impl FileRef {
    /// Raw reference string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One save-file chunk as reported by the data gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
    /// Size of the backing file
    pub size_bytes: u64,
    /// Folder or category the chunk was found in
    pub source_tag: String,
    /// Gateway reference used for deletion
    pub file_ref: FileRef,
}

impl Chunk {
    /// Coordinate of this chunk
    #[inline]
    pub fn coord(&self) -> ChunkCoord {
        ChunkCoord::new(self.x, self.y)
    }
}

/// Inclusive integer rectangle covering every loaded chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    /// Smallest column
    pub min_x: i32,
    /// Largest column
    pub max_x: i32,
    /// Smallest row
    pub min_y: i32,
    /// Largest row
    pub max_y: i32,
}

impl Bounds {
    /// Bounds of a single chunk
    pub fn of(coord: ChunkCoord) -> Self {
        Bounds {
            min_x: coord.x,
            max_x: coord.x,
            min_y: coord.y,
            max_y: coord.y,
        }
    }

    /// Grow to include `coord`
    pub fn include(&mut self, coord: ChunkCoord) {
        self.min_x = self.min_x.min(coord.x);
        self.max_x = self.max_x.max(coord.x);
        self.min_y = self.min_y.min(coord.y);
        self.max_y = self.max_y.max(coord.y);
    }

    /// Bounds over an iterator of coordinates, `None` when empty.
    pub fn from_coords<I: IntoIterator<Item = ChunkCoord>>(coords: I) -> Option<Self> {
        let mut iter = coords.into_iter();
        let mut bounds = Bounds::of(iter.next()?);
        for c in iter {
            bounds.include(c);
        }
        Some(bounds)
    }

    /// Number of columns covered (inclusive)
    #[inline]
    pub fn width(&self) -> i64 {
        self.max_x as i64 - self.min_x as i64 + 1
    }

    /// Number of rows covered (inclusive)
    #[inline]
    pub fn height(&self) -> i64 {
        self.max_y as i64 - self.min_y as i64 + 1
    }

    /// World rectangle spanning the full footprint of every cell.
    pub fn world_rect(&self) -> WorldRect {
        use macroquad::prelude::vec2;
        WorldRect {
            min: vec2(self.min_x as f32, self.min_y as f32),
            max: vec2(self.max_x as f32 + 1.0, self.max_y as f32 + 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BucketCoord {
    x: i32,
    y: i32,
}

/// In-memory lookup of the loaded chunks of one save.
#[derive(Debug, Default)]
pub struct ChunkIndex {
    chunks: HashMap<ChunkCoord, Chunk>,
    buckets: HashMap<BucketCoord, Vec<ChunkCoord>>,
    bounds: Option<Bounds>,
}

impl ChunkIndex {
    /// Empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a listing.
    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        let mut index = Self::new();
        index.load(chunks);
        index
    }

    /// Replace the whole index and recompute bounds in one pass.
    /// A later chunk with an already seen coordinate replaces the earlier one.
    pub fn load(&mut self, chunks: Vec<Chunk>) {
        self.chunks = HashMap::with_capacity(chunks.len());
        self.buckets = HashMap::new();
        self.bounds = None;

        for chunk in chunks {
            let coord = chunk.coord();
            match self.bounds.as_mut() {
                Some(b) => b.include(coord),
                None => self.bounds = Some(Bounds::of(coord)),
            }
            if self.chunks.insert(coord, chunk).is_none() {
                self.buckets.entry(coord.bucket()).or_default().push(coord);
            }
        }

        log::debug!(
            "chunk index loaded: {} chunks in {} buckets",
            self.chunks.len(),
            self.buckets.len()
        );
    }

    /// Chunk at `(x, y)`, if loaded
    #[inline]
    pub fn lookup(&self, x: i32, y: i32) -> Option<&Chunk> {
        self.chunks.get(&ChunkCoord::new(x, y))
    }

    /// Chunk at `coord`, if loaded
    #[inline]
    pub fn get(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    /// Whether `coord` is loaded
    #[inline]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    /// Bounds of all loaded chunks, `None` for an empty index.
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Number of loaded chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether nothing is loaded
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// All loaded chunks, unordered
    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// All loaded coordinates, unordered
    pub fn coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.chunks.keys().copied()
    }

    /// Sum of `size_bytes` over selected chunks. Stale keys contribute nothing.
    pub fn total_selected_size(&self, selection: &Selection) -> u64 {
        selection
            .iter()
            .filter_map(|c| self.chunks.get(&c))
            .map(|c| c.size_bytes)
            .sum()
    }

    /// Chunks whose unit square overlaps `rect`, unordered.
    pub fn overlapping<'a>(&'a self, rect: &'a WorldRect) -> impl Iterator<Item = &'a Chunk> + 'a {
        self.candidates(rect)
            .filter(move |c| rect.overlaps_cell(c.x, c.y))
    }

    /// Chunks in every bucket touched by `rect`; callers refine further.
    pub(crate) fn candidates<'a>(&'a self, rect: &WorldRect) -> impl Iterator<Item = &'a Chunk> + 'a {
        let ((x0, y0), (x1, y1)) = rect.cell_range();
        let b_min = ChunkCoord::new(x0, y0).bucket();
        let b_max = ChunkCoord::new(x1, y1).bucket();

        // a huge rect touches more buckets than exist; walk the map instead
        let span = (b_max.x as i64 - b_min.x as i64 + 1) * (b_max.y as i64 - b_min.y as i64 + 1);
        let keys: Vec<BucketCoord> = if span > self.buckets.len() as i64 {
            self.buckets
                .keys()
                .filter(|b| b.x >= b_min.x && b.x <= b_max.x && b.y >= b_min.y && b.y <= b_max.y)
                .copied()
                .collect()
        } else {
            (b_min.y..=b_max.y)
                .flat_map(|by| (b_min.x..=b_max.x).map(move |bx| BucketCoord { x: bx, y: by }))
                .collect()
        };

        keys.into_iter()
            .filter_map(move |b| self.buckets.get(&b))
            .flatten()
            .filter_map(move |c| self.chunks.get(c))
    }
}
