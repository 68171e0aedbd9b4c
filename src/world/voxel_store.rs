use crate::world::block::{self, BlockId};
use crate::world::chunk_coord::ChunkCoord;

/// Dense block grid for the whole world. Width and depth are equal, `y`
/// is the vertical axis. Allocated once per session and owned by it.
#[derive(Clone, PartialEq, Eq)]
pub struct VoxelStore {
    width: i32,
    height: i32,
    blocks: Vec<BlockId>,
}

impl VoxelStore {
    pub fn new(width: i32, height: i32) -> Self {
        let len = width as usize * height as usize * width as usize;
        Self {
            width,
            height,
            blocks: vec![block::AIR; len],
        }
    }

    pub(crate) fn from_raw(width: i32, height: i32, blocks: Vec<BlockId>) -> Self {
        debug_assert_eq!(
            blocks.len(),
            width as usize * height as usize * width as usize
        );
        Self {
            width,
            height,
            blocks,
        }
    }

    /// Width and depth, in blocks.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Height, in blocks.
    pub fn height(&self) -> i32 {
        self.height
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.blocks
    }

    fn index(&self, x: i32, y: i32, z: i32) -> usize {
        (x as usize * self.height as usize + y as usize) * self.width as usize + z as usize
    }

    pub fn in_bounds(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height && z >= 0 && z < self.width
    }

    /// Never faults: horizontal overruns and depths below the floor read
    /// as solid, anything above the ceiling reads as air. Boundary
    /// queries therefore see a world that is sealed at the edges and
    /// open to the sky.
    pub fn get(&self, x: i32, y: i32, z: i32) -> BlockId {
        if x < 0 || y < 0 || z < 0 || x >= self.width || z >= self.width {
            return block::DIRT;
        }
        if y >= self.height {
            return block::AIR;
        }
        self.blocks[self.index(x, y, z)]
    }

    /// Raw bounded write used by terrain generation. Overwrites anything,
    /// including the boundary shell.
    pub(crate) fn fill(&mut self, x: i32, y: i32, z: i32, id: BlockId) {
        if !self.in_bounds(x, y, z) {
            return;
        }
        let i = self.index(x, y, z);
        self.blocks[i] = id;
    }

    /// Edit-path write. Out-of-bounds and boundary-material targets are
    /// silently ignored. Emptying a cell also clears an attached block
    /// resting on it, so decorations never float.
    pub fn set(&mut self, x: i32, y: i32, z: i32, id: BlockId) {
        if !self.in_bounds(x, y, z) {
            return;
        }
        let i = self.index(x, y, z);
        if self.blocks[i] == block::BEDROCK {
            return;
        }
        self.blocks[i] = id;
        if id == block::AIR && block::is_attached(self.get(x, y + 1, z)) {
            let above = self.index(x, y + 1, z);
            self.blocks[above] = block::AIR;
        }
    }

    /// True when all six axis-aligned neighbors are non-empty.
    pub fn is_fully_obscured(&self, x: i32, y: i32, z: i32) -> bool {
        block::is_solid(self.get(x, y + 1, z))
            && block::is_solid(self.get(x, y - 1, z))
            && block::is_solid(self.get(x + 1, y, z))
            && block::is_solid(self.get(x - 1, y, z))
            && block::is_solid(self.get(x, y, z + 1))
            && block::is_solid(self.get(x, y, z - 1))
    }

    /// True when any block higher in the same column blocks the sky.
    /// Out-of-bounds cells report false.
    pub fn is_shaded(&self, x: i32, y: i32, z: i32) -> bool {
        if !self.in_bounds(x, y, z) {
            return false;
        }
        (y + 1..self.height).any(|y1| self.get(x, y1, z) != block::AIR)
    }

    /// A chunk region is invisible when every non-empty voxel in it is
    /// fully surrounded; such a chunk cannot contribute a visible face
    /// and is not worth materializing.
    pub fn chunk_is_invisible(&self, coord: ChunkCoord, chunk_size: i32) -> bool {
        let ox = coord.x() * chunk_size;
        let oy = coord.y() * chunk_size;
        let oz = coord.z() * chunk_size;
        for x in ox..ox + chunk_size {
            for y in oy..oy + chunk_size {
                for z in oz..oz + chunk_size {
                    if self.get(x, y, z) != block::AIR && !self.is_fully_obscured(x, y, z) {
                        return false;
                    }
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::block;

    fn store() -> VoxelStore {
        VoxelStore::new(32, 16)
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut s = store();
        s.set(3, 4, 5, block::STONE);
        assert_eq!(s.get(3, 4, 5), block::STONE);
    }

    #[test]
    fn bedrock_rejects_writes() {
        let mut s = store();
        s.fill(1, 0, 1, block::BEDROCK);
        s.set(1, 0, 1, block::AIR);
        assert_eq!(s.get(1, 0, 1), block::BEDROCK);
    }

    #[test]
    fn boundary_law() {
        let s = store();
        assert_eq!(s.get(-1, 4, 5), block::DIRT);
        assert_eq!(s.get(32, 4, 5), block::DIRT);
        assert_eq!(s.get(3, 4, 32), block::DIRT);
        assert_eq!(s.get(3, -1, 5), block::DIRT);
        assert_eq!(s.get(3, 16, 5), block::AIR);
    }

    #[test]
    fn out_of_bounds_set_is_ignored() {
        let mut s = store();
        s.set(-1, 0, 0, block::STONE);
        s.set(0, 16, 0, block::STONE);
        assert_eq!(s.get(0, 15, 0), block::AIR);
    }

    #[test]
    fn clearing_support_clears_attached_block() {
        let mut s = store();
        s.set(5, 5, 5, block::GRASS);
        s.set(5, 6, 5, block::TALL_GRASS);
        s.set(5, 5, 5, block::AIR);
        assert_eq!(s.get(5, 6, 5), block::AIR);
    }

    #[test]
    fn clearing_support_leaves_ordinary_blocks() {
        let mut s = store();
        s.set(5, 5, 5, block::DIRT);
        s.set(5, 6, 5, block::STONE);
        s.set(5, 5, 5, block::AIR);
        assert_eq!(s.get(5, 6, 5), block::STONE);
    }

    #[test]
    fn fully_obscured_needs_all_six_neighbors() {
        let mut s = store();
        for (dx, dy, dz) in [
            (0, 1, 0),
            (0, -1, 0),
            (1, 0, 0),
            (-1, 0, 0),
            (0, 0, 1),
            (0, 0, -1),
        ] {
            s.set(5 + dx, 5 + dy, 5 + dz, block::STONE);
        }
        assert!(s.is_fully_obscured(5, 5, 5));
        s.set(5, 6, 5, block::AIR);
        assert!(!s.is_fully_obscured(5, 5, 5));
    }

    #[test]
    fn edge_voxels_count_the_sealed_world_border() {
        let mut s = store();
        // Voxel at the world corner: the three out-of-range sides read
        // solid, so covering the three in-range sides obscures it.
        s.set(0, 5, 0, block::STONE);
        s.set(1, 5, 0, block::STONE);
        s.set(0, 6, 0, block::STONE);
        s.set(0, 4, 0, block::STONE);
        s.set(0, 5, 1, block::STONE);
        assert!(s.is_fully_obscured(0, 5, 0));
    }

    #[test]
    fn shading_scans_the_column_above() {
        let mut s = store();
        s.set(4, 10, 4, block::STONE);
        assert!(s.is_shaded(4, 2, 4));
        assert!(!s.is_shaded(4, 10, 4));
        assert!(!s.is_shaded(-1, 2, 4));
    }

    #[test]
    fn empty_chunk_is_invisible() {
        let s = store();
        assert!(s.chunk_is_invisible(ChunkCoord::new(0, 0, 0), 16));
    }

    #[test]
    fn chunk_with_exposed_surface_is_visible() {
        let mut s = store();
        s.set(4, 4, 4, block::STONE);
        assert!(!s.chunk_is_invisible(ChunkCoord::new(0, 0, 0), 16));
    }
}
