use crate::world::chunk_coord::ChunkCoord;

/// Bounded grid tracking which chunks have been materialized, holding
/// the opaque visual handle the host built for each one. Materialization
/// is monotonic for the lifetime of a session; handles are only swapped,
/// never removed.
pub struct ChunkIndex<H> {
    width: i32,
    height: i32,
    slots: Vec<Option<H>>,
}

impl<H> ChunkIndex<H> {
    pub fn new(width: i32, height: i32) -> Self {
        let len = width as usize * height as usize * width as usize;
        let mut slots = Vec::new();
        slots.resize_with(len, || None);
        Self {
            width,
            height,
            slots,
        }
    }

    /// Width and depth, in chunks.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Height, in chunks.
    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, coord: ChunkCoord) -> bool {
        coord.x() >= 0
            && coord.x() < self.width
            && coord.y() >= 0
            && coord.y() < self.height
            && coord.z() >= 0
            && coord.z() < self.width
    }

    fn slot(&self, coord: ChunkCoord) -> Option<usize> {
        if !self.in_bounds(coord) {
            return None;
        }
        Some(
            (coord.x() as usize * self.height as usize + coord.y() as usize)
                * self.width as usize
                + coord.z() as usize,
        )
    }

    fn coord_of(&self, slot: usize) -> ChunkCoord {
        let slot = slot as i32;
        let z = slot % self.width;
        let y = (slot / self.width) % self.height;
        let x = slot / (self.width * self.height);
        ChunkCoord::new(x, y, z)
    }

    /// Out-of-range coordinates report "not present", never fault.
    pub fn is_materialized(&self, coord: ChunkCoord) -> bool {
        self.slot(coord)
            .map_or(false, |i| self.slots[i].is_some())
    }

    pub fn exists(&self, coord: ChunkCoord) -> bool {
        self.is_materialized(coord)
    }

    pub fn handle(&self, coord: ChunkCoord) -> Option<&H> {
        self.slot(coord).and_then(|i| self.slots[i].as_ref())
    }

    /// Store the handle for a freshly materialized chunk. If the chunk
    /// is already materialized (or out of range) the flag is left alone
    /// and the new handle is handed back so the caller can retire it
    /// rather than leak the external resource.
    #[must_use]
    pub fn mark_materialized(&mut self, coord: ChunkCoord, handle: H) -> Option<H> {
        match self.slot(coord) {
            Some(i) if self.slots[i].is_none() => {
                self.slots[i] = Some(handle);
                None
            }
            _ => Some(handle),
        }
    }

    /// Pull a handle out for replacement during a rebuild walk.
    pub(crate) fn take(&mut self, coord: ChunkCoord) -> Option<H> {
        self.slot(coord).and_then(|i| self.slots[i].take())
    }

    /// Conservative pruning test: the chunk and all six face neighbors
    /// are materialized, so re-streaming it cannot add anything.
    pub fn is_obscured(&self, coord: ChunkCoord) -> bool {
        if !self.in_bounds(coord) {
            return false;
        }
        self.is_materialized(coord)
            && coord.face_neighbors().iter().all(|n| self.exists(*n))
    }

    pub fn materialized_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn materialized_coords(&self) -> Vec<ChunkCoord> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| self.coord_of(i))
            .collect()
    }
}
