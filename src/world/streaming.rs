//! Incremental chunk materialization around a moving observer.
//!
//! The streamer never builds visuals itself: it decides which chunk to
//! materialize next and asks the host's builder for an opaque handle,
//! one queue entry per resumption, so chunk construction spreads across
//! many host ticks instead of stalling one.

use crate::world::chunk_coord::ChunkCoord;
use crate::world::chunk_index::ChunkIndex;
use crate::world::voxel_store::VoxelStore;
use glam::Vec3;
use log::debug;

/// Host ticks between paced spawns while walking an incremental queue.
pub const STREAM_DELAY_TICKS: u32 = 3;

/// Chunks processed per `RebuildTask::advance` call.
pub const REBUILD_BATCH: usize = 20;

/// Outcome of one streaming `advance` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStep {
    /// A chunk was materialized this tick.
    Spawned(ChunkCoord),
    /// The pacing delay is still counting down.
    Waiting,
    /// The queue is exhausted until the observer changes chunk again.
    Idle,
}

/// Work queue plus cursor, rebuilt whenever the observer crosses into a
/// new chunk. Rebuilding replaces the queue outright; there is no task
/// to cancel.
pub struct ChunkStreamer {
    chunk_size: i32,
    view_distance: f32,
    last_observer_chunk: Option<ChunkCoord>,
    queue: Vec<ChunkCoord>,
    cursor: usize,
    cooldown: u32,
    paced: bool,
}

impl ChunkStreamer {
    pub fn new(chunk_size: i32, view_distance: f32) -> Self {
        Self {
            chunk_size,
            view_distance,
            last_observer_chunk: None,
            queue: Vec::new(),
            cursor: 0,
            cooldown: 0,
            paced: false,
        }
    }

    pub fn chunk_size(&self) -> i32 {
        self.chunk_size
    }

    pub fn view_distance(&self) -> f32 {
        self.view_distance
    }

    /// The pending queue, nearest first. Entries may repeat; duplicates
    /// are absorbed at materialization time.
    pub fn queued(&self) -> &[ChunkCoord] {
        &self.queue
    }

    pub fn remaining(&self) -> usize {
        self.queue.len() - self.cursor
    }

    fn sort_by_observer_distance(queue: &mut [ChunkCoord], observer: Vec3, chunk_size: i32) {
        queue.sort_by(|a, b| {
            let da = observer.distance(a.to_world_pos(chunk_size));
            let db = observer.distance(b.to_world_pos(chunk_size));
            da.total_cmp(&db)
        });
    }

    /// Build the startup queue: every visible unmaterialized chunk within
    /// half the view distance of the observer's chunk, plus the full
    /// vertical column at the observer's own x/z (top-down, regardless
    /// of distance) so the spawn point is never inside unbuilt terrain.
    pub fn initial_scan<H>(&mut self, observer: Vec3, store: &VoxelStore, index: &ChunkIndex<H>) {
        let observer_chunk = ChunkCoord::from_observer(observer, self.chunk_size);
        self.queue.clear();
        let w = index.width();
        let h = index.height();
        for x in 0..w {
            for y in 0..h {
                for z in 0..w {
                    let coord = ChunkCoord::new(x, y, z);
                    if observer_chunk.distance(&coord) <= self.view_distance / 2.0
                        && !store.chunk_is_invisible(coord, self.chunk_size)
                        && !index.is_materialized(coord)
                    {
                        self.queue.push(coord);
                    }
                }
            }
        }
        for y in (1..h).rev() {
            let coord = ChunkCoord::new(observer_chunk.x(), y, observer_chunk.z());
            if !index.in_bounds(coord) {
                continue;
            }
            if !store.chunk_is_invisible(coord, self.chunk_size) && !index.is_materialized(coord) {
                self.queue.push(coord);
            }
        }
        Self::sort_by_observer_distance(&mut self.queue, observer, self.chunk_size);
        self.cursor = 0;
        self.cooldown = 0;
        self.paced = false;
        self.last_observer_chunk = Some(observer_chunk);
        debug!("initial scan queued {} chunks", self.queue.len());
    }

    /// Fold in observer movement. When the observer has crossed into a
    /// new chunk the queue is rebuilt from the surrounding cuboid and the
    /// cursor reset; returns true when that happened.
    pub fn update<H>(&mut self, observer: Vec3, store: &VoxelStore, index: &ChunkIndex<H>) -> bool {
        let observer_chunk = ChunkCoord::from_observer(observer, self.chunk_size);
        if self.last_observer_chunk == Some(observer_chunk) {
            return false;
        }
        self.last_observer_chunk = Some(observer_chunk);
        self.rescan(observer, observer_chunk, store, index);
        true
    }

    /// Incremental queue: the cuboid `±view_distance` horizontally and
    /// `±view_distance/2` vertically around the observer's chunk,
    /// clipped to world bounds, minus invisible and already-built
    /// chunks.
    fn rescan<H>(
        &mut self,
        observer: Vec3,
        observer_chunk: ChunkCoord,
        store: &VoxelStore,
        index: &ChunkIndex<H>,
    ) {
        self.queue.clear();
        let horiz = self.view_distance as i32;
        let vert = (self.view_distance / 2.0) as i32;
        for x in observer_chunk.x() - horiz..=observer_chunk.x() + horiz {
            for y in observer_chunk.y() - vert..=observer_chunk.y() + vert {
                for z in observer_chunk.z() - horiz..=observer_chunk.z() + horiz {
                    let coord = ChunkCoord::new(x, y, z);
                    if !index.in_bounds(coord) {
                        continue;
                    }
                    if !store.chunk_is_invisible(coord, self.chunk_size)
                        && !index.is_materialized(coord)
                    {
                        self.queue.push(coord);
                    }
                }
            }
        }
        Self::sort_by_observer_distance(&mut self.queue, observer, self.chunk_size);
        self.cursor = 0;
        self.cooldown = 0;
        self.paced = true;
        debug!(
            "rescan around chunk ({}, {}, {}) queued {} chunks",
            observer_chunk.x(),
            observer_chunk.y(),
            observer_chunk.z(),
            self.queue.len()
        );
    }

    /// Materialize at most one queue entry. Incremental queues arm a
    /// fixed delay after each spawn; startup queues run back-to-back.
    pub fn advance<H>(
        &mut self,
        index: &mut ChunkIndex<H>,
        build: &mut dyn FnMut(ChunkCoord) -> H,
    ) -> StreamStep {
        if self.cooldown > 0 {
            self.cooldown -= 1;
            return StreamStep::Waiting;
        }
        while self.cursor < self.queue.len() {
            let coord = self.queue[self.cursor];
            self.cursor += 1;
            if index.is_materialized(coord) {
                continue;
            }
            let rejected = index.mark_materialized(coord, build(coord));
            debug_assert!(rejected.is_none());
            if self.paced {
                self.cooldown = STREAM_DELAY_TICKS;
            }
            return StreamStep::Spawned(coord);
        }
        StreamStep::Idle
    }

    /// Walk the current queue to completion, ignoring pacing. Used right
    /// after the startup scan.
    pub fn drain<H>(
        &mut self,
        index: &mut ChunkIndex<H>,
        build: &mut dyn FnMut(ChunkCoord) -> H,
    ) -> usize {
        let mut spawned = 0;
        loop {
            match self.advance(index, build) {
                StreamStep::Spawned(_) => spawned += 1,
                StreamStep::Waiting => continue,
                StreamStep::Idle => break,
            }
        }
        spawned
    }

    /// Force a single chunk in, regardless of distance. Out-of-bounds
    /// requests are silently ignored, as are invisible or already-built
    /// chunks.
    pub fn materialize_at<H>(
        &self,
        coord: ChunkCoord,
        store: &VoxelStore,
        index: &mut ChunkIndex<H>,
        build: &mut dyn FnMut(ChunkCoord) -> H,
    ) {
        if !index.in_bounds(coord) || index.is_materialized(coord) {
            return;
        }
        if store.chunk_is_invisible(coord, self.chunk_size) {
            return;
        }
        let rejected = index.mark_materialized(coord, build(coord));
        debug_assert!(rejected.is_none());
    }
}

/// One-shot full-grid rebuild after an appearance change: every
/// materialized chunk's handle is retired and replaced in place, a batch
/// at a time so the host keeps its frame loop responsive. Independent of
/// the streaming queue.
pub struct RebuildTask {
    coords: Vec<ChunkCoord>,
    pos: usize,
}

impl RebuildTask {
    pub fn new<H>(index: &ChunkIndex<H>) -> Self {
        Self {
            coords: index.materialized_coords(),
            pos: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.pos >= self.coords.len()
    }

    pub fn remaining(&self) -> usize {
        self.coords.len() - self.pos
    }

    /// Rebuild up to `REBUILD_BATCH` chunks. `rebuild` receives the
    /// coordinate and the retired handle and returns its replacement.
    /// Returns the number of chunks processed this call.
    pub fn advance<H>(
        &mut self,
        index: &mut ChunkIndex<H>,
        rebuild: &mut dyn FnMut(ChunkCoord, H) -> H,
    ) -> usize {
        let mut processed = 0;
        while processed < REBUILD_BATCH && self.pos < self.coords.len() {
            let coord = self.coords[self.pos];
            self.pos += 1;
            if let Some(old) = index.take(coord) {
                let rejected = index.mark_materialized(coord, rebuild(coord, old));
                debug_assert!(rejected.is_none());
            }
            processed += 1;
        }
        processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::block;

    const CHUNK: i32 = 16;

    /// Fully solid store: only chunks touching the open sky are visible,
    /// everything deeper is sealed by its neighbors and the world border.
    fn solid_store(width_chunks: i32, height_chunks: i32) -> VoxelStore {
        let mut store = VoxelStore::new(width_chunks * CHUNK, height_chunks * CHUNK);
        for x in 0..store.width() {
            for y in 0..store.height() {
                for z in 0..store.width() {
                    store.fill(x, y, z, block::STONE);
                }
            }
        }
        store
    }

    fn index(width_chunks: i32, height_chunks: i32) -> ChunkIndex<u32> {
        ChunkIndex::new(width_chunks, height_chunks)
    }

    fn counter() -> impl FnMut(ChunkCoord) -> u32 {
        let mut next = 0;
        move |_| {
            next += 1;
            next
        }
    }

    #[test]
    fn incremental_scan_enumerates_the_clipped_cuboid() {
        let store = solid_store(10, 3);
        let idx = index(10, 3);
        let mut streamer = ChunkStreamer::new(CHUNK, 6.0);
        // Prime the last-observed chunk somewhere else so the move to
        // (2, 1, 2) triggers a rescan.
        streamer.last_observer_chunk = Some(ChunkCoord::new(9, 0, 9));

        let observer = ChunkCoord::new(2, 1, 2).to_world_pos(CHUNK);
        assert!(streamer.update(observer, &store, &idx));

        // Cuboid x,z in [-4, 8], y in [-2, 4], clipped to the 10x3x10
        // grid; in a fully solid world only the top chunk layer is
        // visible.
        let mut expected = Vec::new();
        for x in 0..=8 {
            for z in 0..=8 {
                expected.push(ChunkCoord::new(x, 2, z));
            }
        }
        let mut queued: Vec<_> = streamer.queued().to_vec();
        queued.sort_by_key(|c| (c.x(), c.y(), c.z()));
        expected.sort_by_key(|c| (c.x(), c.y(), c.z()));
        assert_eq!(queued, expected);
    }

    #[test]
    fn incremental_scan_skips_materialized_chunks() {
        let store = solid_store(10, 3);
        let mut idx = index(10, 3);
        assert_eq!(idx.mark_materialized(ChunkCoord::new(2, 2, 2), 99), None);
        let mut streamer = ChunkStreamer::new(CHUNK, 6.0);
        streamer.last_observer_chunk = Some(ChunkCoord::new(9, 0, 9));

        let observer = ChunkCoord::new(2, 1, 2).to_world_pos(CHUNK);
        streamer.update(observer, &store, &idx);
        assert!(!streamer.queued().contains(&ChunkCoord::new(2, 2, 2)));
        assert!(streamer.queued().contains(&ChunkCoord::new(3, 2, 2)));
    }

    #[test]
    fn queue_is_sorted_by_observer_distance() {
        let store = solid_store(10, 3);
        let idx = index(10, 3);
        let mut streamer = ChunkStreamer::new(CHUNK, 6.0);
        streamer.last_observer_chunk = Some(ChunkCoord::new(9, 0, 9));

        let observer = Vec3::new(37.0, 20.0, 41.0);
        streamer.update(observer, &store, &idx);
        let distances: Vec<f32> = streamer
            .queued()
            .iter()
            .map(|c| observer.distance(c.to_world_pos(CHUNK)))
            .collect();
        assert!(!distances.is_empty());
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn interior_chunks_are_invisible_and_excluded() {
        let store = solid_store(4, 4);
        // Sealed on all six sides: below the top layer and inside the
        // border columns.
        assert!(store.chunk_is_invisible(ChunkCoord::new(1, 1, 1), CHUNK));
        assert!(!store.chunk_is_invisible(ChunkCoord::new(1, 3, 1), CHUNK));

        let idx = index(4, 4);
        let mut streamer = ChunkStreamer::new(CHUNK, 6.0);
        streamer.last_observer_chunk = Some(ChunkCoord::new(3, 0, 3));
        streamer.update(ChunkCoord::new(1, 1, 1).to_world_pos(CHUNK), &store, &idx);
        assert!(!streamer.queued().contains(&ChunkCoord::new(1, 1, 1)));
    }

    #[test]
    fn initial_scan_forces_the_observer_column() {
        let mut store = solid_store(6, 3);
        // Carve one voxel per chunk of the observer column so each of
        // those chunks exposes a surface.
        for cy in 0..3 {
            store.fill(8, cy * CHUNK + 8, 8, block::AIR);
        }
        let idx = index(6, 3);
        // A view radius too small to reach anything: only the forced
        // column may appear.
        let mut streamer = ChunkStreamer::new(CHUNK, 0.5);
        let observer = Vec3::new(4.0, 20.0, 4.0);
        streamer.initial_scan(observer, &store, &idx);
        let queued = streamer.queued();
        assert!(queued.contains(&ChunkCoord::new(0, 1, 0)));
        assert!(queued.contains(&ChunkCoord::new(0, 2, 0)));
        // The column skips the bottom chunk layer.
        assert!(!queued.contains(&ChunkCoord::new(0, 0, 0)));
    }

    #[test]
    fn startup_drain_is_back_to_back() {
        let store = solid_store(4, 2);
        let mut idx = index(4, 2);
        let mut streamer = ChunkStreamer::new(CHUNK, 10.0);
        let observer = Vec3::new(32.0, 24.0, 32.0);
        streamer.initial_scan(observer, &store, &idx);

        let queued = streamer.remaining();
        assert!(queued > 0);
        let mut build = counter();
        let spawned = streamer.drain(&mut idx, &mut build);
        // Duplicates from the forced column collapse at spawn time.
        assert!(spawned <= queued);
        assert_eq!(idx.materialized_count(), spawned);
        assert_eq!(streamer.advance(&mut idx, &mut build), StreamStep::Idle);
    }

    #[test]
    fn incremental_walk_paces_itself() {
        let store = solid_store(10, 3);
        let mut idx = index(10, 3);
        let mut streamer = ChunkStreamer::new(CHUNK, 6.0);
        streamer.last_observer_chunk = Some(ChunkCoord::new(9, 0, 9));
        streamer.update(ChunkCoord::new(2, 1, 2).to_world_pos(CHUNK), &store, &idx);

        let mut build = counter();
        assert!(matches!(
            streamer.advance(&mut idx, &mut build),
            StreamStep::Spawned(_)
        ));
        for _ in 0..STREAM_DELAY_TICKS {
            assert_eq!(streamer.advance(&mut idx, &mut build), StreamStep::Waiting);
        }
        assert!(matches!(
            streamer.advance(&mut idx, &mut build),
            StreamStep::Spawned(_)
        ));
    }

    #[test]
    fn force_load_ignores_out_of_bounds_and_invisible() {
        let store = solid_store(4, 4);
        let mut idx = index(4, 4);
        let streamer = ChunkStreamer::new(CHUNK, 6.0);
        let mut build = counter();

        streamer.materialize_at(ChunkCoord::new(-1, 0, 0), &store, &mut idx, &mut build);
        streamer.materialize_at(ChunkCoord::new(1, 1, 1), &store, &mut idx, &mut build);
        assert_eq!(idx.materialized_count(), 0);

        streamer.materialize_at(ChunkCoord::new(1, 3, 1), &store, &mut idx, &mut build);
        assert_eq!(idx.materialized_count(), 1);
        streamer.materialize_at(ChunkCoord::new(1, 3, 1), &store, &mut idx, &mut build);
        assert_eq!(idx.materialized_count(), 1);
    }

    #[test]
    fn rebuild_walks_every_materialized_chunk_in_batches() {
        let mut idx: ChunkIndex<u32> = ChunkIndex::new(5, 2);
        let mut n = 0;
        for x in 0..5 {
            for z in 0..5 {
                assert_eq!(idx.mark_materialized(ChunkCoord::new(x, 1, z), n), None);
                n += 1;
            }
        }
        let mut task = RebuildTask::new(&idx);
        assert_eq!(task.remaining(), 25);

        let mut rebuilt = 0;
        let mut rebuild = |_: ChunkCoord, old: u32| {
            rebuilt += 1;
            old + 1000
        };
        assert_eq!(task.advance(&mut idx, &mut rebuild), REBUILD_BATCH);
        assert!(!task.is_finished());
        assert_eq!(task.advance(&mut idx, &mut rebuild), 5);
        assert!(task.is_finished());
        assert_eq!(rebuilt, 25);
        assert_eq!(idx.materialized_count(), 25);
        assert!(idx
            .handle(ChunkCoord::new(0, 1, 0))
            .is_some_and(|h| *h >= 1000));
    }
}
