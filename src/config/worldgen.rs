use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// World-shape and streaming parameters, loadable from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldGenConfig {
    /// Fixed seed; when absent a fresh one is drawn per new world.
    pub seed: Option<u32>,
    /// Cubic chunk edge, in blocks.
    pub chunk_size: i32,
    /// World width and depth, in chunks.
    pub world_width: i32,
    /// World height, in chunks.
    pub world_height: i32,
    /// Streaming radius, in chunks.
    pub view_distance: f32,
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self {
            seed: None,
            chunk_size: 16,
            world_width: 128,
            world_height: 32,
            view_distance: 6.0,
        }
    }
}

impl WorldGenConfig {
    /// World width and depth, in blocks.
    pub fn world_block_width(&self) -> i32 {
        self.world_width * self.chunk_size
    }

    /// World height, in blocks.
    pub fn world_block_height(&self) -> i32 {
        self.world_height * self.chunk_size
    }

    /// Read the config file, falling back to defaults when it is missing
    /// or malformed.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(text) => match toml::from_str(&text) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("ignoring malformed config {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}
