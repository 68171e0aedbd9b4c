pub mod block;
pub mod chunk_coord;
pub mod chunk_index;
pub mod generator;
pub mod session;
pub mod storage;
pub mod streaming;
pub mod voxel_store;

// Re-export commonly used types
pub use chunk_coord::ChunkCoord;
pub use chunk_index::ChunkIndex;
pub use generator::{GenPhase, Generation, TerrainGenerator};
pub use session::{GraphicsQuality, SessionMeta, WorldSession, HOTBAR_SLOTS};
pub use storage::{PersistenceError, SavedWorld, SAVE_FILE};
pub use streaming::{ChunkStreamer, RebuildTask, StreamStep};
pub use voxel_store::VoxelStore;
