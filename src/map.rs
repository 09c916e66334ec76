//! Terrain map persistence.
//!
//! Maps are stored as bincode wrapped in a zlib stream. A map only carries the
//! terrain; the cluster graph is cheap enough to rebuild on load.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::area::{Area, Terrain};
use crate::error::MapError;
use crate::math::Location;

pub const MAP_VERSION: u32 = 1;

/// Terrain of every cell of a world, in dense id order (x fastest).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TerrainMap {
    pub version: u32,
    pub size: Location,
    pub cells: Vec<Terrain>,
}

impl TerrainMap {
    /// Snapshot the terrain of `area`.
    pub fn from_area(area: &Area) -> Self {
        Self {
            version: MAP_VERSION,
            size: area.size(),
            cells: area.iter().map(|node| node.terrain).collect(),
        }
    }

    fn validate(&self) -> Result<(), MapError> {
        if self.version != MAP_VERSION {
            return Err(MapError::Version {
                found: self.version,
                expected: MAP_VERSION,
            });
        }
        let expected = self
            .size
            .checked_volume()
            .filter(|&volume| u32::try_from(volume).is_ok())
            .ok_or(MapError::TooLarge { size: self.size })?;
        if expected != self.cells.len() {
            return Err(MapError::CellCount {
                size: self.size,
                expected,
                found: self.cells.len(),
            });
        }
        Ok(())
    }
}

impl Area {
    /// Build a world area from a loaded map.
    pub fn from_map(map: &TerrainMap) -> Result<Self, MapError> {
        map.validate()?;
        Area::from_terrain(map.size, &map.cells).ok_or(MapError::CellCount {
            size: map.size,
            expected: map.size.volume(),
            found: map.cells.len(),
        })
    }
}

pub fn save_map(path: impl AsRef<Path>, map: &TerrainMap) -> Result<(), MapError> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let mut encoder = ZlibEncoder::new(writer, Compression::default());
    bincode::serialize_into(&mut encoder, map)?;
    encoder.finish()?.flush()?;
    info!("Saved {} map to {}", map.size, path.display());
    Ok(())
}

pub fn load_map(path: impl AsRef<Path>) -> Result<TerrainMap, MapError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut decoder = ZlibDecoder::new(reader);
    let map: TerrainMap = bincode::deserialize_from(&mut decoder)?;
    map.validate()?;
    info!("Loaded {} map from {}", map.size, path.display());
    Ok(map)
}
