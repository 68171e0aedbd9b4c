pub mod terrain;

pub use terrain::{GenPhase, Generation, TerrainGenerator};
