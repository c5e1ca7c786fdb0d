//! Node location cache used to turn way node lists into geometries.

use anyhow::{Context, Result, bail};
use memmap2::Mmap;
use std::collections::HashMap;
use std::io::{BufWriter, Write};
use tempfile::NamedTempFile;

use crate::config::NodeCacheMode;

/// Degrees to fixed precision (1e-7 degree, as in the PBF format).
const COORD_PRECISION: f64 = 10_000_000.0;
/// Node id (i64) followed by longitude and latitude (i32 each), little endian.
const RECORD_LEN: usize = 16;

/// One node location in fixed precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Location {
    lon: i32,
    lat: i32,
}

impl Location {
    fn from_degrees(lat: f64, lon: f64) -> Self {
        Location {
            lon: (lon * COORD_PRECISION).round() as i32,
            lat: (lat * COORD_PRECISION).round() as i32,
        }
    }

    /// `(lon, lat)` in degrees.
    fn to_degrees(self) -> (f64, f64) {
        (
            f64::from(self.lon) / COORD_PRECISION,
            f64::from(self.lat) / COORD_PRECISION,
        )
    }

    fn encode(self, id: i64) -> [u8; RECORD_LEN] {
        let mut record = [0u8; RECORD_LEN];
        record[..8].copy_from_slice(&id.to_le_bytes());
        record[8..12].copy_from_slice(&self.lon.to_le_bytes());
        record[12..].copy_from_slice(&self.lat.to_le_bytes());
        record
    }

    fn decode(record: &[u8]) -> Option<(i64, Self)> {
        let id = i64::from_le_bytes(record.get(..8)?.try_into().ok()?);
        let lon = i32::from_le_bytes(record.get(8..12)?.try_into().ok()?);
        let lat = i32::from_le_bytes(record.get(12..16)?.try_into().ok()?);
        Some((id, Location { lon, lat }))
    }
}

/// Collects node locations during the indexing pass.
pub struct NodeStoreWriter {
    inner: WriterKind,
}

/// Read-only lookups once indexing is done.
pub struct NodeStoreReader {
    inner: ReaderKind,
}

enum WriterKind {
    Memory(HashMap<i64, Location>),
    Sparse(SparseWriter),
}

enum ReaderKind {
    Memory(HashMap<i64, Location>),
    Sparse(SparseReader),
}

struct SparseWriter {
    file: BufWriter<NamedTempFile>,
    records: u64,
    last_id: Option<i64>,
}

struct SparseReader {
    mmap: Mmap,
    records: usize,
    // Removed from disk on drop.
    _file: NamedTempFile,
}

impl NodeStoreWriter {
    pub fn new(mode: NodeCacheMode) -> Result<Self> {
        match mode {
            NodeCacheMode::Memory => Ok(Self::new_memory()),
            NodeCacheMode::Sparse => Self::new_sparse(),
        }
    }

    pub fn new_memory() -> Self {
        Self {
            inner: WriterKind::Memory(HashMap::new()),
        }
    }

    /// Records appended to a temporary file; node ids must be ascending
    /// (signed order, as in files sorted by `osmium sort`).
    pub fn new_sparse() -> Result<Self> {
        let file = NamedTempFile::new().context("NodeStore: Failed to create temporary file")?;
        Ok(Self {
            inner: WriterKind::Sparse(SparseWriter {
                file: BufWriter::new(file),
                records: 0,
                last_id: None,
            }),
        })
    }

    pub fn put(&mut self, id: i64, lat: f64, lon: f64) -> Result<()> {
        let location = Location::from_degrees(lat, lon);
        match &mut self.inner {
            WriterKind::Memory(nodes) => {
                nodes.insert(id, location);
                Ok(())
            }
            WriterKind::Sparse(writer) => writer.append(id, location),
        }
    }

    pub fn finalize(self) -> Result<NodeStoreReader> {
        let inner = match self.inner {
            WriterKind::Memory(nodes) => ReaderKind::Memory(nodes),
            WriterKind::Sparse(writer) => writer.into_reader()?,
        };
        Ok(NodeStoreReader { inner })
    }
}

impl NodeStoreReader {
    /// Returns `(lon, lat)` in degrees.
    pub fn get(&self, id: i64) -> Option<(f64, f64)> {
        let location = match &self.inner {
            ReaderKind::Memory(nodes) => nodes.get(&id).copied(),
            ReaderKind::Sparse(reader) => reader.lookup(id),
        }?;
        Some(location.to_degrees())
    }
}

impl SparseWriter {
    fn append(&mut self, id: i64, location: Location) -> Result<()> {
        if self.last_id.is_some_and(|last| id < last) {
            bail!(
                "NodeStore: Node {} is out of order for the sparse cache; run `osmium sort` or use --node-cache-mode memory",
                id
            );
        }
        self.file
            .write_all(&location.encode(id))
            .context("NodeStore: Failed to append to sparse cache")?;
        self.last_id = Some(id);
        self.records += 1;
        Ok(())
    }

    fn into_reader(self) -> Result<ReaderKind> {
        let file = self
            .file
            .into_inner()
            .context("NodeStore: Failed to flush sparse cache")?;

        let len = file
            .as_file()
            .metadata()
            .context("NodeStore: Failed to stat sparse cache")?
            .len();
        if len != self.records * RECORD_LEN as u64 {
            bail!(
                "NodeStore: Sparse cache holds {} bytes, expected {} records",
                len,
                self.records
            );
        }

        // Zero-length files cannot be mapped everywhere.
        if self.records == 0 {
            return Ok(ReaderKind::Memory(HashMap::new()));
        }

        // SAFETY: the file is private to this reader and lives as long as the map.
        let mmap = unsafe { Mmap::map(file.as_file()) }
            .context("NodeStore: Failed to map sparse cache")?;

        Ok(ReaderKind::Sparse(SparseReader {
            mmap,
            records: self.records as usize,
            _file: file,
        }))
    }
}

impl SparseReader {
    fn record(&self, index: usize) -> Option<(i64, Location)> {
        let start = index * RECORD_LEN;
        Location::decode(self.mmap.get(start..start + RECORD_LEN)?)
    }

    fn lookup(&self, id: i64) -> Option<Location> {
        let (mut low, mut high) = (0, self.records);
        while low < high {
            let mid = low + (high - low) / 2;
            let (mid_id, location) = self.record(mid)?;
            match mid_id.cmp(&id) {
                std::cmp::Ordering::Less => low = mid + 1,
                std::cmp::Ordering::Greater => high = mid,
                std::cmp::Ordering::Equal => return Some(location),
            }
        }
        None
    }
}
