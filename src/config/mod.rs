pub mod worldgen;

pub use worldgen::WorldGenConfig;
