use anyhow::Result;
use glam::Vec3;
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use std::path::Path;

use voxcraft::world::{StreamStep, SAVE_FILE};
use voxcraft::{ChunkCoord, GraphicsQuality, WorldGenConfig, WorldSession};

const CONFIG_FILE: &str = "voxcraft.toml";

/// Stand-in for whatever the host hangs off a materialized chunk (a mesh,
/// a scene node). The core only ever sees the opaque handle.
struct ChunkVisual {
    id: u64,
    quality: GraphicsQuality,
}

fn main() -> Result<()> {
    SimpleLogger::new().with_level(LevelFilter::Info).init()?;
    info!("starting voxcraft demo host");

    let config = if Path::new(CONFIG_FILE).exists() {
        WorldGenConfig::load_or_default(CONFIG_FILE)
    } else {
        // Keep the demo world small enough to generate in a moment.
        WorldGenConfig {
            seed: Some(42),
            chunk_size: 16,
            world_width: 8,
            world_height: 4,
            view_distance: 6.0,
        }
    };

    let (mut session, generation) = WorldSession::<ChunkVisual>::open(config, SAVE_FILE);
    if let Some(mut generation) = generation {
        while session.generate_advance(&mut generation) {}
        info!("generation finished");
    }

    let mut next_visual_id = 0u64;
    let mut quality = session.meta().graphics_quality;
    let mut build = |_: ChunkCoord| {
        next_visual_id += 1;
        ChunkVisual {
            id: next_visual_id,
            quality,
        }
    };

    let spawn = Vec3::new(64.0, 48.0, 64.0);
    let built = session.start_streaming(spawn, &mut build);
    info!("startup stream built {} chunks", built);

    // Walk the observer east for a while, one stream call per simulated
    // host tick; chunks trickle in behind the movement.
    let mut spawned = 0;
    for tick in 0..600 {
        let observer = spawn + Vec3::new(tick as f32 * 0.25, 0.0, 0.0);
        if let StreamStep::Spawned(_) = session.stream(observer, &mut build) {
            spawned += 1;
        }
    }
    info!("incremental streaming spawned {} chunks", spawned);

    // An appearance change re-materializes every chunk under the new
    // tier, a batch per tick.
    let mut rebuild_task = session.change_graphics_quality();
    quality = session.meta().graphics_quality;
    let mut rebuild = |_: ChunkCoord, old: ChunkVisual| ChunkVisual {
        id: old.id,
        quality,
    };
    let mut rebuilt = 0;
    while !rebuild_task.is_finished() {
        rebuilt += session.rebuild_advance(&mut rebuild_task, &mut rebuild);
    }
    info!("rebuilt {} chunks", rebuilt);

    session.save();
    Ok(())
}
