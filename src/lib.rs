pub mod config;
pub mod world;

// Re-export commonly used types
pub use config::WorldGenConfig;
pub use world::block::BlockId;
pub use world::{
    ChunkCoord, ChunkIndex, ChunkStreamer, GenPhase, Generation, GraphicsQuality,
    PersistenceError, RebuildTask, SavedWorld, SessionMeta, StreamStep, TerrainGenerator,
    VoxelStore, WorldSession,
};
