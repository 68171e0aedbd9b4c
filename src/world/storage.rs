//! World persistence.
//!
//! One save file holds the session metadata and the full voxel grid in a
//! versioned little-endian layout with a fixed field order, so a save
//! round-trips byte for byte across builds. Writes go through a
//! temporary file in the destination directory and are renamed into
//! place, so a failed save never destroys the previous one.

use crate::world::session::{GraphicsQuality, SessionMeta, HOTBAR_SLOTS};
use crate::world::voxel_store::VoxelStore;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Well-known save file, relative to the working directory.
pub const SAVE_FILE: &str = "general.data";

const MAGIC: [u8; 4] = *b"VXWD";
const FORMAT_VERSION: u16 = 1;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("not a world save (bad magic)")]
    BadMagic,

    #[error("unsupported save version {0}")]
    UnsupportedVersion(u16),

    #[error("corrupt save: {0}")]
    Corrupt(&'static str),
}

/// A decoded save record: session metadata plus the voxel grid. The grid
/// is absent when the record was written by [`clear_world`], which tells
/// the next launch to generate fresh terrain.
pub struct SavedWorld {
    pub meta: SessionMeta,
    pub store: Option<VoxelStore>,
}

/// Serialize the session to `path`, replacing any previous save.
pub fn save(path: &Path, meta: &SessionMeta, store: &VoxelStore) -> Result<(), PersistenceError> {
    write_record(path, meta, Some(store))
}

/// Rewrite the record with the grid cleared, keeping the metadata.
pub fn clear_world(path: &Path, meta: &SessionMeta) -> Result<(), PersistenceError> {
    write_record(path, meta, None)
}

fn write_record(
    path: &Path,
    meta: &SessionMeta,
    store: Option<&VoxelStore>,
) -> Result<(), PersistenceError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut w = BufWriter::new(tmp.as_file_mut());
        w.write_all(&MAGIC)?;
        w.write_all(&FORMAT_VERSION.to_le_bytes())?;
        w.write_all(&[store.is_some() as u8])?;
        w.write_all(&meta.seed.to_le_bytes())?;
        w.write_all(&meta.hotbar)?;
        w.write_all(&[
            meta.current_slot,
            meta.music_enabled as u8,
            meta.invert_mouse_y as u8,
            meta.graphics_quality as u8,
        ])?;
        if let Some(store) = store {
            w.write_all(&(store.width() as u32).to_le_bytes())?;
            w.write_all(&(store.height() as u32).to_le_bytes())?;
            w.write_all(store.as_bytes())?;
        }
        w.flush()?;
    }
    tmp.persist(path).map_err(|e| PersistenceError::Io(e.error))?;
    Ok(())
}

/// Read the save record. A missing file is not an error, it means "no
/// session yet"; anything undecodable is.
pub fn load(path: &Path) -> Result<Option<SavedWorld>, PersistenceError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut r = BufReader::new(file);

    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(PersistenceError::BadMagic);
    }
    let version = read_u16(&mut r)?;
    if version != FORMAT_VERSION {
        return Err(PersistenceError::UnsupportedVersion(version));
    }
    let has_grid = read_u8(&mut r)? != 0;
    let seed = read_u32(&mut r)?;
    let mut hotbar = [0u8; HOTBAR_SLOTS];
    r.read_exact(&mut hotbar)?;
    let current_slot = read_u8(&mut r)?;
    let music_enabled = read_u8(&mut r)? != 0;
    let invert_mouse_y = read_u8(&mut r)? != 0;
    let graphics_quality = GraphicsQuality::from_byte(read_u8(&mut r)?)
        .ok_or(PersistenceError::Corrupt("unknown graphics quality"))?;
    let meta = SessionMeta {
        seed,
        hotbar,
        current_slot,
        music_enabled,
        invert_mouse_y,
        graphics_quality,
    };

    let store = if has_grid {
        let width = read_u32(&mut r)? as i32;
        let height = read_u32(&mut r)? as i32;
        if width <= 0 || height <= 0 {
            return Err(PersistenceError::Corrupt("bad grid dimensions"));
        }
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(width as usize))
            .ok_or(PersistenceError::Corrupt("grid dimensions overflow"))?;
        let mut blocks = vec![0u8; len];
        r.read_exact(&mut blocks)?;
        Some(VoxelStore::from_raw(width, height, blocks))
    } else {
        None
    };

    Ok(Some(SavedWorld { meta, store }))
}

fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut b = [0u8; 1];
    r.read_exact(&mut b)?;
    Ok(b[0])
}

fn read_u16<R: Read>(r: &mut R) -> io::Result<u16> {
    let mut b = [0u8; 2];
    r.read_exact(&mut b)?;
    Ok(u16::from_le_bytes(b))
}

fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(u32::from_le_bytes(b))
}
