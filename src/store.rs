//! Authored segment records
//!
//! On disk a library is a directory:
//! - `plain.json`: the fixed start/end segment
//! - `normal/*.json`: the normal pool
//! - `tunnel/*.json`: the tunnel pool
//!
//! Files are read in name order so a seed reproduces the same route on
//! every machine. Record fields also accept the legacy names (`blocks`,
//! `block_type`, `pre_requisits`, `post_requisits`, `tunnel`).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::{SEGMENT_TILES, TILE_SIZE};
use crate::error::StoreError;
use crate::sim::generator::SegmentPool;
use crate::sim::segment::{Opening, Segment, Tile, TileKind};

/// One tile as authored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRecord {
    /// Offset from the segment origin
    pub pos: (i32, i32),
    #[serde(alias = "block_type")]
    pub kind: i64,
}

/// One segment as authored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRecord {
    #[serde(alias = "blocks")]
    pub tiles: Vec<TileRecord>,
    #[serde(alias = "pre_requisits")]
    pub entry_intervals: Vec<Opening>,
    #[serde(alias = "post_requisits")]
    pub exit_intervals: Vec<Opening>,
    #[serde(alias = "tunnel", default)]
    pub is_tunnel_variant: bool,
}

impl SegmentRecord {
    /// Decode into a segment keyed `id`, rejecting unknown tile kinds
    pub fn into_segment(self, id: &str) -> Result<Segment, StoreError> {
        let tiles = self
            .tiles
            .iter()
            .map(|t| {
                TileKind::from_code(t.kind)
                    .map(|kind| Tile::new(t.pos, kind))
                    .ok_or_else(|| StoreError::UnknownTileKind {
                        segment: id.to_string(),
                        kind: t.kind,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Segment::new(
            id,
            tiles,
            self.entry_intervals,
            self.exit_intervals,
            self.is_tunnel_variant,
        ))
    }

    /// Read one record file
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let json = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl From<&Segment> for SegmentRecord {
    fn from(segment: &Segment) -> Self {
        Self {
            tiles: segment
                .tiles
                .iter()
                .map(|t| TileRecord {
                    pos: t.offset,
                    kind: t.kind.code() as i64,
                })
                .collect(),
            entry_intervals: segment.entry_intervals.clone(),
            exit_intervals: segment.exit_intervals.clone(),
            is_tunnel_variant: segment.is_tunnel_variant,
        }
    }
}

/// Every authored segment a session can draw from
#[derive(Debug, Clone)]
pub struct SegmentLibrary {
    pub normal: Vec<Segment>,
    pub tunnel: Vec<Segment>,
    /// Fixed start and end segment
    pub plain: Segment,
}

impl SegmentLibrary {
    /// Load a library directory
    pub fn load_dir(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref();
        let plain_path = root.join("plain.json");
        let plain = SegmentRecord::load(&plain_path)?.into_segment("plain")?;
        let normal = load_pool(&root.join("normal"))?;
        let tunnel = load_pool(&root.join("tunnel"))?;
        log::info!(
            "Loaded segment library from {}: {} normal, {} tunnel",
            root.display(),
            normal.len(),
            tunnel.len()
        );
        Ok(Self {
            normal,
            tunnel,
            plain,
        })
    }

    /// Write the library in the layout [`load_dir`](Self::load_dir) reads
    pub fn save_dir(&self, root: impl AsRef<Path>) -> Result<(), StoreError> {
        let root = root.as_ref();
        for dir in [root.join("normal"), root.join("tunnel")] {
            fs::create_dir_all(&dir).map_err(|source| StoreError::Io { path: dir, source })?;
        }
        SegmentRecord::from(&self.plain).save(&root.join("plain.json"))?;
        for (dir, pool) in [("normal", &self.normal), ("tunnel", &self.tunnel)] {
            for segment in pool {
                let path = root.join(dir).join(format!("{}.json", segment.id));
                SegmentRecord::from(segment).save(&path)?;
            }
        }
        Ok(())
    }

    /// Small hand-made library, enough to play without any files
    pub fn builtin() -> Self {
        let floor = || floor_run(0, SEGMENT_TILES, GROUND_Y);

        let mut steps = floor();
        steps.extend(column(6, 2, GROUND_Y));
        steps.extend(column(7, 2, GROUND_Y));

        let mut gap = floor_run(0, 6, GROUND_Y);
        gap.extend(floor_run(9, SEGMENT_TILES, GROUND_Y));

        let mut ledge = floor_run(0, 8, GROUND_Y);
        ledge.extend(floor_run(8, SEGMENT_TILES, LEDGE_Y));
        ledge.extend(fill(8, SEGMENT_TILES, GROUND_Y));

        let mut drop = floor_run(0, 8, LEDGE_Y);
        drop.extend(floor_run(8, SEGMENT_TILES, GROUND_Y));
        drop.extend(fill(0, 8, GROUND_Y));

        let mut tube = floor();
        tube.extend(
            (0..SEGMENT_TILES).map(|c| Tile::new((c * TILE_SIZE, CEILING_Y), TileKind::Metal)),
        );

        let open = vec![Opening::new(0, GROUND_Y)];
        let high = vec![Opening::new(0, LEDGE_Y)];
        let under = vec![Opening::new(CEILING_Y + TILE_SIZE, GROUND_Y)];

        Self {
            plain: Segment::new("plain", floor(), open.clone(), open.clone(), false),
            normal: vec![
                Segment::new("flat", floor(), open.clone(), open.clone(), false),
                Segment::new("steps", steps, open.clone(), open.clone(), false),
                Segment::new("gap", gap, open.clone(), open.clone(), false),
                Segment::new("ledge", ledge, open.clone(), high.clone(), false),
                Segment::new("drop", drop, high, open.clone(), false),
                Segment::new("tube_mouth", floor(), open.clone(), under.clone(), true),
            ],
            tunnel: vec![Segment::new("tube", tube, under.clone(), under, true)],
        }
    }

    /// Look a segment up by store key
    pub fn get(&self, id: &str) -> Result<&Segment, StoreError> {
        std::iter::once(&self.plain)
            .chain(&self.normal)
            .chain(&self.tunnel)
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::MissingSegment(id.to_string()))
    }

    /// Pools handed to the generator
    pub fn pool(&self) -> SegmentPool {
        SegmentPool {
            normal: self.normal.clone(),
            tunnel: self.tunnel.clone(),
        }
    }
}

/// Top of the standard floor
const GROUND_Y: i32 = 448;
/// Top of a raised floor
const LEDGE_Y: i32 = 384;
/// Tunnel roof row
const CEILING_Y: i32 = 256;

/// Surface tiles on top, one underground row below
fn floor_run(from: i32, to: i32, top: i32) -> Vec<Tile> {
    (from..to)
        .flat_map(|c| {
            let x = c * TILE_SIZE;
            [
                Tile::new((x, top), TileKind::Surface),
                Tile::new((x, top + TILE_SIZE), TileKind::Underground),
            ]
        })
        .collect()
}

/// Two underground rows starting at `top`
fn fill(from: i32, to: i32, top: i32) -> Vec<Tile> {
    (from..to)
        .flat_map(|c| {
            let x = c * TILE_SIZE;
            [
                Tile::new((x, top), TileKind::Underground),
                Tile::new((x, top + TILE_SIZE), TileKind::Underground),
            ]
        })
        .collect()
}

/// `height` tiles stacked directly on top of row `base`
fn column(col: i32, height: i32, base: i32) -> Vec<Tile> {
    (1..=height)
        .map(|h| {
            let kind = if h == height {
                TileKind::Surface
            } else {
                TileKind::Underground
            };
            Tile::new((col * TILE_SIZE, base - h * TILE_SIZE), kind)
        })
        .collect()
}

/// Segment files of one pool directory, sorted by name
fn load_pool(dir: &Path) -> Result<Vec<Segment>, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("Pool directory {} is missing", dir.display());
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(StoreError::Io {
                path: dir.to_path_buf(),
                source,
            });
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    paths
        .iter()
        .map(|path| {
            let id = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            SegmentRecord::load(path)?.into_segment(&id)
        })
        .collect()
}
