use glam::{IVec3, Vec3};

/// Coordinate of a cubic chunk region, in chunk units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkCoord(pub IVec3);

impl ChunkCoord {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self(IVec3::new(x, y, z))
    }

    /// Chunk the observer currently occupies. Rounded, not floored: the
    /// observer switches chunks at chunk centers, which keeps the
    /// streaming trigger stable while walking along a chunk boundary.
    pub fn from_observer(position: Vec3, chunk_size: i32) -> Self {
        Self::new(
            (position.x / chunk_size as f32).round() as i32,
            (position.y / chunk_size as f32).round() as i32,
            (position.z / chunk_size as f32).round() as i32,
        )
    }

    pub fn x(&self) -> i32 {
        self.0.x
    }

    pub fn y(&self) -> i32 {
        self.0.y
    }

    pub fn z(&self) -> i32 {
        self.0.z
    }

    /// World-space position of this chunk's origin corner.
    pub fn to_world_pos(&self, chunk_size: i32) -> Vec3 {
        Vec3::new(
            (self.0.x * chunk_size) as f32,
            (self.0.y * chunk_size) as f32,
            (self.0.z * chunk_size) as f32,
        )
    }

    /// Euclidean distance to another chunk coordinate, in chunk units.
    pub fn distance(&self, other: &Self) -> f32 {
        let d = self.0 - other.0;
        ((d.x * d.x + d.y * d.y + d.z * d.z) as f32).sqrt()
    }

    /// The six face-adjacent neighbor coordinates.
    pub fn face_neighbors(&self) -> [Self; 6] {
        let IVec3 { x, y, z } = self.0;
        [
            Self::new(x, y + 1, z),
            Self::new(x, y - 1, z),
            Self::new(x + 1, y, z),
            Self::new(x - 1, y, z),
            Self::new(x, y, z + 1),
            Self::new(x, y, z - 1),
        ]
    }
}

impl From<IVec3> for ChunkCoord {
    fn from(vec: IVec3) -> Self {
        Self(vec)
    }
}

impl From<ChunkCoord> for IVec3 {
    fn from(coord: ChunkCoord) -> Self {
        coord.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observer_rounds_to_nearest_chunk() {
        assert_eq!(
            ChunkCoord::from_observer(Vec3::new(7.0, 0.0, 0.0), 16),
            ChunkCoord::new(0, 0, 0)
        );
        assert_eq!(
            ChunkCoord::from_observer(Vec3::new(9.0, 24.0, 40.0), 16),
            ChunkCoord::new(1, 2, 3)
        );
    }

    #[test]
    fn distance_is_euclidean_in_chunk_units() {
        let a = ChunkCoord::new(0, 0, 0);
        let b = ChunkCoord::new(3, 4, 0);
        assert_eq!(a.distance(&b), 5.0);
    }

    #[test]
    fn face_neighbors_are_the_six_axis_steps() {
        let c = ChunkCoord::new(1, 2, 3);
        let neighbors = c.face_neighbors();
        assert_eq!(neighbors.len(), 6);
        for n in neighbors {
            assert_eq!(c.distance(&n), 1.0);
        }
    }
}
