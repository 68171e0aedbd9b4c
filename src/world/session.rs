//! One world session: the sole owner of the voxel grid, the chunk index
//! and the streaming state. Hosts keep exactly one session and route
//! every query and edit through it; nothing in the core is reachable any
//! other way.

use crate::config::WorldGenConfig;
use crate::world::block::BlockId;
use crate::world::chunk_coord::ChunkCoord;
use crate::world::chunk_index::ChunkIndex;
use crate::world::generator::Generation;
use crate::world::storage::{self, SavedWorld};
use crate::world::streaming::{ChunkStreamer, RebuildTask, StreamStep};
use crate::world::voxel_store::VoxelStore;
use glam::Vec3;
use log::{error, info, warn};
use rand::Rng;
use std::path::{Path, PathBuf};

pub const HOTBAR_SLOTS: usize = 9;

/// Starting hotbar for a brand-new world.
const DEFAULT_HOTBAR: [BlockId; HOTBAR_SLOTS] = [5, 13, 14, 15, 5, 23, 24, 1, 2];

/// Chunk appearance tier. The host consults it when building chunk
/// visuals; changing it does nothing on its own, a rebuild has to be
/// requested explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GraphicsQuality {
    Fast = 0,
    Fancy = 1,
    Insane = 2,
}

impl GraphicsQuality {
    pub fn cycle(self) -> Self {
        match self {
            GraphicsQuality::Fast => GraphicsQuality::Fancy,
            GraphicsQuality::Fancy => GraphicsQuality::Insane,
            GraphicsQuality::Insane => GraphicsQuality::Fast,
        }
    }

    pub(crate) fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(GraphicsQuality::Fast),
            1 => Some(GraphicsQuality::Fancy),
            2 => Some(GraphicsQuality::Insane),
            _ => None,
        }
    }
}

/// Everything about a session that outlives the process, persisted as
/// one unit alongside the voxel grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMeta {
    pub seed: u32,
    pub hotbar: [BlockId; HOTBAR_SLOTS],
    pub current_slot: u8,
    pub music_enabled: bool,
    pub invert_mouse_y: bool,
    pub graphics_quality: GraphicsQuality,
}

impl SessionMeta {
    fn new(seed: u32) -> Self {
        Self {
            seed,
            hotbar: DEFAULT_HOTBAR,
            current_slot: 0,
            music_enabled: true,
            invert_mouse_y: false,
            graphics_quality: GraphicsQuality::Fancy,
        }
    }
}

pub struct WorldSession<H> {
    config: WorldGenConfig,
    meta: SessionMeta,
    store: VoxelStore,
    chunks: ChunkIndex<H>,
    streamer: ChunkStreamer,
    save_path: PathBuf,
}

impl<H> WorldSession<H> {
    /// Load the session from `save_path`, falling back to fresh
    /// generation when the file is missing, cleared or unreadable. The
    /// second value is the generation task still to be driven, when any.
    pub fn open(
        config: WorldGenConfig,
        save_path: impl Into<PathBuf>,
    ) -> (Self, Option<Generation>) {
        let save_path: PathBuf = save_path.into();
        let (mut session, generation) = match storage::load(&save_path) {
            Ok(Some(SavedWorld {
                meta,
                store: Some(store),
            })) => {
                info!("loaded world from {}, seed {}", save_path.display(), meta.seed);
                (Self::with_store(config, meta, store), None)
            }
            Ok(Some(SavedWorld { store: None, .. })) => {
                info!("save record requests a fresh world");
                let (session, generation) = Self::generate(config);
                (session, Some(generation))
            }
            Ok(None) => {
                info!("no save file, generating a new world");
                let (session, generation) = Self::generate(config);
                (session, Some(generation))
            }
            Err(e) => {
                error!("failed to load world: {}", e);
                warn!("falling back to a fresh world");
                let (session, generation) = Self::generate(config);
                (session, Some(generation))
            }
        };
        session.save_path = save_path;
        (session, generation)
    }

    /// Start a session over a freshly allocated world. The returned
    /// generation task must run to completion before streaming begins.
    pub fn generate(config: WorldGenConfig) -> (Self, Generation) {
        let seed = config
            .seed
            .unwrap_or_else(|| rand::thread_rng().gen_range(0..100_000));
        info!("generating new world, seed {}", seed);
        let store = VoxelStore::new(config.world_block_width(), config.world_block_height());
        let session = Self::with_store(config, SessionMeta::new(seed), store);
        let generation = Generation::new(seed);
        (session, generation)
    }

    /// The grid dimensions come from the store, which on load may differ
    /// from the configured world size; the saved world wins.
    fn with_store(config: WorldGenConfig, meta: SessionMeta, store: VoxelStore) -> Self {
        let chunk_size = config.chunk_size;
        let chunks = ChunkIndex::new(store.width() / chunk_size, store.height() / chunk_size);
        let streamer = ChunkStreamer::new(chunk_size, config.view_distance);
        Self {
            config,
            meta,
            store,
            chunks,
            streamer,
            save_path: PathBuf::from(storage::SAVE_FILE),
        }
    }

    pub fn config(&self) -> &WorldGenConfig {
        &self.config
    }

    pub fn meta(&self) -> &SessionMeta {
        &self.meta
    }

    /// Host-side toggles (music, mouse inversion, hotbar selection) edit
    /// the metadata directly; it is persisted on the next save.
    pub fn meta_mut(&mut self) -> &mut SessionMeta {
        &mut self.meta
    }

    pub fn store(&self) -> &VoxelStore {
        &self.store
    }

    pub fn chunks(&self) -> &ChunkIndex<H> {
        &self.chunks
    }

    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    pub fn set_save_path(&mut self, path: impl Into<PathBuf>) {
        self.save_path = path.into();
    }

    /// Drive the generation task one pass forward.
    pub fn generate_advance(&mut self, generation: &mut Generation) -> bool {
        generation.advance(&mut self.store).is_some()
    }

    pub fn block_at(&self, x: i32, y: i32, z: i32) -> BlockId {
        self.store.get(x, y, z)
    }

    /// The public edit path (breaking and placing); terrain generation
    /// does not come through here.
    pub fn place_block(&mut self, x: i32, y: i32, z: i32, id: BlockId) {
        self.store.set(x, y, z, id);
    }

    /// Startup streaming: scan around the observer and build every
    /// queued chunk back-to-back. Returns the number of chunks built.
    pub fn start_streaming(
        &mut self,
        observer: Vec3,
        build: &mut dyn FnMut(ChunkCoord) -> H,
    ) -> usize {
        self.streamer
            .initial_scan(observer, &self.store, &self.chunks);
        self.streamer.drain(&mut self.chunks, build)
    }

    /// Per-tick streaming entry: fold in observer movement, then make at
    /// most one unit of progress.
    pub fn stream(
        &mut self,
        observer: Vec3,
        build: &mut dyn FnMut(ChunkCoord) -> H,
    ) -> StreamStep {
        self.streamer.update(observer, &self.store, &self.chunks);
        self.streamer.advance(&mut self.chunks, build)
    }

    /// Materialize one specific chunk out of turn (spawn platforms,
    /// teleport targets). Out-of-bounds requests are ignored.
    pub fn force_chunk(&mut self, coord: ChunkCoord, build: &mut dyn FnMut(ChunkCoord) -> H) {
        self.streamer
            .materialize_at(coord, &self.store, &mut self.chunks, build);
    }

    /// Cycle the appearance tier and hand back the rebuild task that
    /// re-materializes every chunk under the new tier.
    pub fn change_graphics_quality(&mut self) -> RebuildTask {
        self.meta.graphics_quality = self.meta.graphics_quality.cycle();
        info!("graphics quality now {:?}", self.meta.graphics_quality);
        RebuildTask::new(&self.chunks)
    }

    pub fn rebuild_advance(
        &mut self,
        task: &mut RebuildTask,
        rebuild: &mut dyn FnMut(ChunkCoord, H) -> H,
    ) -> usize {
        task.advance(&mut self.chunks, rebuild)
    }

    /// Persist the session. Failures are logged and absorbed; in-memory
    /// state is never touched either way.
    pub fn save(&self) -> bool {
        match storage::save(&self.save_path, &self.meta, &self.store) {
            Ok(()) => {
                info!("world saved to {}", self.save_path.display());
                true
            }
            Err(e) => {
                error!("failed to save world: {}", e);
                false
            }
        }
    }

    /// Persist the session, then rewrite the record with the grid
    /// cleared so the next launch generates fresh terrain.
    pub fn reset_world(&self) -> bool {
        if !self.save() {
            return false;
        }
        match storage::clear_world(&self.save_path, &self.meta) {
            Ok(()) => {
                info!("world reset; next launch will generate fresh terrain");
                true
            }
            Err(e) => {
                error!("failed to reset world: {}", e);
                false
            }
        }
    }
}
