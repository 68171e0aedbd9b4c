use crate::world::block::{self, BlockId};
use crate::world::voxel_store::VoxelStore;
use log::info;
use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;

// Base-terrain thresholds. Density grows toward the world floor, so the
// bands read bottom-up: stone, then the biome's fill block, then air.
const SAND_BIOME_CUTOFF: f64 = 30.0;
const FILL_THRESHOLD: f64 = 0.1;
const STONE_THRESHOLD_SOIL: f64 = 0.4;
const STONE_THRESHOLD_SAND: f64 = 0.8;
const SHELL_THRESHOLD: f64 = 0.4;

/// Minerals and pockets only seed inside the stone band.
const STONE_GATE: f64 = 0.4;
const CAVE_THRESHOLD: f64 = 0.8;
const GROUND_COVER_MIN_Y: i32 = 18;

struct OreField {
    id: BlockId,
    offset: f64,
    scale_xz: f64,
    scale_y: f64,
    threshold: f64,
    max_y: Option<i32>,
}

// Applied in order; later entries overwrite earlier ones at the same
// cell, so pockets take priority over minerals.
const ORE_FIELDS: [OreField; 7] = [
    OreField {
        id: block::COAL_ORE,
        offset: 512.0,
        scale_xz: 10.0,
        scale_y: 10.0,
        threshold: 0.875,
        max_y: None,
    },
    OreField {
        id: block::IRON_ORE,
        offset: 256.0,
        scale_xz: 14.0,
        scale_y: 18.0,
        threshold: 0.92,
        max_y: Some(64),
    },
    OreField {
        id: block::REDSTONE_ORE,
        offset: 1028.0,
        scale_xz: 17.0,
        scale_y: 17.0,
        threshold: 0.94,
        max_y: Some(32),
    },
    OreField {
        id: block::GOLD_ORE,
        offset: 2048.0,
        scale_xz: 20.0,
        scale_y: 20.0,
        threshold: 0.94,
        max_y: Some(52),
    },
    OreField {
        id: block::DIAMOND_ORE,
        offset: 4096.0,
        scale_xz: 20.0,
        scale_y: 20.0,
        threshold: 0.955,
        max_y: Some(45),
    },
    OreField {
        id: block::DIRT,
        offset: 1000.0,
        scale_xz: 30.0,
        scale_y: 30.0,
        threshold: 0.9,
        max_y: None,
    },
    OreField {
        id: block::GRAVEL,
        offset: 2000.0,
        scale_xz: 32.0,
        scale_y: 32.0,
        threshold: 0.9,
        max_y: None,
    },
];

/// One world-generation pass. Passes are strictly ordered; each may read
/// blocks written by the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenPhase {
    BaseTerrain,
    Ores,
    Caves,
    Vegetation,
}

impl GenPhase {
    /// Progress label for a host loading screen.
    pub fn label(&self) -> &'static str {
        match self {
            GenPhase::BaseTerrain => "Generating World",
            GenPhase::Ores => "Spawning Ores",
            GenPhase::Caves => "Digging",
            GenPhase::Vegetation => "Planting",
        }
    }

    fn next(self) -> Option<GenPhase> {
        match self {
            GenPhase::BaseTerrain => Some(GenPhase::Ores),
            GenPhase::Ores => Some(GenPhase::Caves),
            GenPhase::Caves => Some(GenPhase::Vegetation),
            GenPhase::Vegetation => None,
        }
    }
}

/// Seed-parameterized noise sampling for every generation pass. Each
/// field reads the same source at its own coordinate offset and scale,
/// so one seed fixes all of them at once.
pub struct TerrainGenerator {
    seed: u32,
    noise: Perlin,
}

impl TerrainGenerator {
    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            noise: Perlin::new(seed),
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// 2D sample normalized to [0, 1].
    fn sample2(&self, x: f64, z: f64) -> f64 {
        0.5 * (self.noise.get([x, z]) + 1.0)
    }

    /// 3D sample normalized to [0, 1].
    fn sample3(&self, x: f64, y: f64, z: f64) -> f64 {
        0.5 * (self.noise.get([x, y, z]) + 1.0)
    }

    fn seed_f(&self) -> f64 {
        self.seed as f64
    }

    /// Column-scale field: how tightly the 3D terrain noise is sampled.
    fn noise_scale(&self, x: i32, z: i32) -> f64 {
        let s = self.seed_f();
        30.0 + self.sample2((x as f64 + s) / 75.0, (z as f64 + s) / 75.0) * 30.0
    }

    /// Sand-biome field; columns above `SAND_BIOME_CUTOFF` use sand.
    fn sand_biome(&self, x: i32, z: i32) -> f64 {
        let s = self.seed_f();
        self.sample2((x as f64 - 512.0 + s) / 100.0, (z as f64 - 512.0 + s) / 100.0) * 50.0
    }

    /// Combined terrain density: the 3D field plus a bias that grows as
    /// `y` drops, so low cells solidify and the surface undulates.
    fn density(&self, x: i32, y: i32, z: i32, height: i32, scale: f64, biome: f64) -> f64 {
        let s = self.seed_f();
        let n = self.sample3(
            (x as f64 + s) / scale,
            y as f64 / scale,
            (z as f64 + s) / scale,
        );
        let biome_spread = (biome - 20.0) / 3.0;
        n + (height - y - 25) as f64 / (10.0 - biome_spread)
    }

    fn base_terrain(&self, store: &mut VoxelStore) {
        let w = store.width();
        let h = store.height();
        for x in 0..w {
            for z in 0..w {
                let scale = self.noise_scale(x, z);
                let biome = self.sand_biome(x, z);
                let on_face = x == 0 || x == w - 1 || z == 0 || z == w - 1;
                for y in 0..h {
                    let d = self.density(x, y, z, h, scale, biome);
                    let mut id = block::AIR;
                    if biome > SAND_BIOME_CUTOFF {
                        if d > FILL_THRESHOLD {
                            id = block::SAND;
                        }
                        if d > STONE_THRESHOLD_SAND {
                            id = block::STONE;
                        }
                    } else {
                        if d > FILL_THRESHOLD {
                            id = block::DIRT;
                        }
                        if d > STONE_THRESHOLD_SOIL {
                            id = block::STONE;
                        }
                    }
                    if y == 0 || (on_face && d > SHELL_THRESHOLD) {
                        id = block::BEDROCK;
                    }
                    store.fill(x, y, z, id);
                }
            }
        }
    }

    fn spawn_ores(&self, store: &mut VoxelStore) {
        let w = store.width();
        let h = store.height();
        let s = self.seed_f();
        for x in 0..w {
            for z in 0..w {
                let scale = self.noise_scale(x, z);
                let biome = self.sand_biome(x, z);
                for y in 0..h {
                    if self.density(x, y, z, h, scale, biome) <= STONE_GATE {
                        continue;
                    }
                    if store.get(x, y, z) == block::BEDROCK {
                        continue;
                    }
                    for field in &ORE_FIELDS {
                        if field.max_y.map_or(false, |cap| y >= cap) {
                            continue;
                        }
                        let n = self.sample3(
                            (x as f64 + s + field.offset) / field.scale_xz,
                            (y as f64 + s + field.offset) / field.scale_y,
                            (z as f64 + s + field.offset) / field.scale_xz,
                        );
                        if n >= field.threshold {
                            store.fill(x, y, z, field.id);
                        }
                    }
                }
            }
        }
    }

    fn carve_caves(&self, store: &mut VoxelStore) {
        let w = store.width();
        let h = store.height();
        let s = self.seed_f();
        for x in 0..w {
            for y in 0..h {
                for z in 0..w {
                    let n = self.sample3(
                        (x as f64 + s) / 40.0,
                        (y as f64 + s) / 40.0,
                        (z as f64 + s) / 40.0,
                    );
                    if n >= CAVE_THRESHOLD && store.get(x, y, z) != block::BEDROCK {
                        store.fill(x, y, z, block::AIR);
                    }
                }
            }
        }
    }

    /// Trees first, then ground cover. Draw order is part of the world
    /// contract: the same seed must replay the same draws.
    fn plant(&self, store: &mut VoxelStore, rng: &mut ChaCha12Rng) {
        let w = store.width();
        let h = store.height();

        for x in 0..w {
            for z in 0..w {
                if rng.gen_range(0..1000) >= 5 {
                    continue;
                }
                let top_down = rng.gen_range(0..2) == 0;
                let ground = if top_down {
                    (0..h).rev().find(|&y| self.tree_spot(store, x, y, z))
                } else {
                    (0..h).find(|&y| self.tree_spot(store, x, y, z))
                };
                // Either search may come up empty; the tree is skipped.
                let Some(ground) = ground else {
                    continue;
                };
                self.grow_tree(store, rng, x, ground, z);
            }
        }

        for x in 0..w {
            for y in 0..h {
                for z in 0..w {
                    if store.get(x, y, z) != block::DIRT
                        || store.get(x, y + 1, z) != block::AIR
                        || y <= GROUND_COVER_MIN_Y
                    {
                        continue;
                    }
                    let s = self.seed_f();
                    let cover =
                        self.sample2((x as f64 + s) / 30.0, (z as f64 + s) / 30.0) * 200.0;
                    let tall_grass = rng.gen_range(0.0..30.0 + cover) < 2.0;
                    let rose = rng.gen_range(0.0..600.0 + cover) < 2.0;
                    let dandelion = rng.gen_range(0.0..600.0 + cover) < 2.0;
                    store.fill(x, y, z, block::GRASS);
                    if tall_grass {
                        store.fill(x, y + 1, z, block::TALL_GRASS);
                    }
                    if rose {
                        store.fill(x, y + 1, z, block::ROSE);
                    }
                    if dandelion {
                        store.fill(x, y + 1, z, block::DANDELION);
                    }
                }
            }
        }
    }

    fn tree_spot(&self, store: &VoxelStore, x: i32, y: i32, z: i32) -> bool {
        store.get(x, y, z) == block::DIRT && store.get(x, y + 1, z) == block::AIR
    }

    fn grow_tree(&self, store: &mut VoxelStore, rng: &mut ChaCha12Rng, x: i32, ground: i32, z: i32) {
        let trunk_height = rng.gen_range(4..8);
        let top = ground + trunk_height;
        for y in ground + 1..=top {
            store.fill(x, y, z, block::LOG);
        }
        // Full 5x5 canopy layers up to the trunk top, a cross shape in
        // the two layers above it.
        for x1 in x - 2..=x + 2 {
            for y1 in top - 2..=top + 2 {
                for z1 in z - 2..=z + 2 {
                    if store.get(x1, y1, z1) == block::LOG {
                        continue;
                    }
                    if y1 <= top {
                        store.fill(x1, y1, z1, block::LEAVES);
                    } else {
                        let dx = (x1 - x).abs();
                        let dz = (z1 - z).abs();
                        if (dx == 1 && dz == 0) || (dx == 0 && dz == 1) || (dx == 0 && dz == 0) {
                            store.fill(x1, y1, z1, block::LEAVES);
                        }
                    }
                }
            }
        }
    }
}

/// Full-world generation driven one pass per `advance` call, so a host
/// can interleave progress display between passes. The random stream is
/// seeded once and consumed strictly in pass order; a seed therefore
/// fixes the entire world.
pub struct Generation {
    generator: TerrainGenerator,
    rng: ChaCha12Rng,
    next: Option<GenPhase>,
}

impl Generation {
    pub fn new(seed: u32) -> Self {
        Self {
            generator: TerrainGenerator::new(seed),
            rng: ChaCha12Rng::seed_from_u64(seed as u64),
            next: Some(GenPhase::BaseTerrain),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.next.is_none()
    }

    /// Run the next pass to completion and report it, or `None` once
    /// generation is done.
    pub fn advance(&mut self, store: &mut VoxelStore) -> Option<GenPhase> {
        let phase = self.next?;
        info!("{}", phase.label());
        match phase {
            GenPhase::BaseTerrain => self.generator.base_terrain(store),
            GenPhase::Ores => self.generator.spawn_ores(store),
            GenPhase::Caves => self.generator.carve_caves(store),
            GenPhase::Vegetation => self.generator.plant(store, &mut self.rng),
        }
        self.next = phase.next();
        Some(phase)
    }

    pub fn run_to_completion(&mut self, store: &mut VoxelStore) {
        while self.advance(store).is_some() {}
    }
}
