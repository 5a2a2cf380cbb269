//! Raw 4-byte float grids (b-value, maximum magnitude, taper weight, rate).
//!
//! Grids have no header; the value count is implied by the file length.

use crate::domain::{NshmpError, NshmpResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::debug;

pub type GridValues = Arc<[f64]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    #[default]
    BigEndian,
    LittleEndian,
}

#[derive(Debug, thiserror::Error)]
pub enum GridReadError {
    #[error("failed to read binary grid '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("binary grid '{}' ends mid-value ({length} bytes is not a multiple of 4)", path.display())]
    Truncated { path: PathBuf, length: usize },
}

impl From<GridReadError> for NshmpError {
    fn from(error: GridReadError) -> Self {
        match &error {
            GridReadError::Read { .. } => NshmpError::io_system("IO.BINARY_GRID_READ", error.to_string()),
            GridReadError::Truncated { .. } => {
                NshmpError::file_format("FORMAT.BINARY_GRID_TRUNCATED", error.to_string())
            }
        }
    }
}

/// Decodes consecutive 4-byte floats, `None` when the stream ends mid-value.
pub fn decode_grid(bytes: &[u8], byte_order: ByteOrder) -> Option<Vec<f64>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    let values = bytes
        .chunks_exact(4)
        .map(|chunk| {
            let raw = [chunk[0], chunk[1], chunk[2], chunk[3]];
            let value = match byte_order {
                ByteOrder::BigEndian => f32::from_be_bytes(raw),
                ByteOrder::LittleEndian => f32::from_le_bytes(raw),
            };
            f64::from(value)
        })
        .collect();
    Some(values)
}

fn read_grid(path: &Path, byte_order: ByteOrder) -> Result<GridValues, GridReadError> {
    let bytes = fs::read(path).map_err(|source| GridReadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let values = decode_grid(&bytes, byte_order).ok_or_else(|| GridReadError::Truncated {
        path: path.to_path_buf(),
        length: bytes.len(),
    })?;
    debug!(path = %path.display(), values = values.len(), "loaded binary grid");
    Ok(values.into())
}

type CacheSlot = Arc<OnceLock<NshmpResult<GridValues>>>;

/// Path-keyed grid cache owned by the caller.
///
/// Concurrent first loads of one key coalesce: a single thread reads the file
/// while the others wait for its result. Cached values are immutable.
#[derive(Debug, Default)]
pub struct BinaryGridCache {
    slots: Mutex<HashMap<(PathBuf, ByteOrder), CacheSlot>>,
}

impl BinaryGridCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, path: impl AsRef<Path>, byte_order: ByteOrder) -> NshmpResult<GridValues> {
        let path = path.as_ref();
        let key = (cache_key(path), byte_order);
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key).or_default())
        };
        slot.get_or_init(|| read_grid(path, byte_order).map_err(NshmpError::from))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cache_key(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
