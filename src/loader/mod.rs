//! Loads the data of dirty tiles in the background and merges it into the live tiles.
//!
//! # Explanation
//! Every frame the [`TileDataLoader`] starts a [`LoadTileData`] job for each dirty tile,
//! as long as there are free slots. The jobs build their state on the async compute
//! task pool and send it back to the main thread, where it is merged into the tile
//! at the end of the frame.
//!
//! Tiles may be despawned at any point in between. Jobs of despawned tiles are
//! canceled on a best-effort basis and discarded once they return.

mod inheritance;
mod load_tile_data;

pub use crate::loader::{
    inheritance::InheritanceUpdater,
    load_tile_data::{build_scratch_state, LoadState, LoadTileData},
};

use crate::{
    map::{MapView, Progress, TileModelSource},
    terrain_data::RenderBindings,
    tile::TerrainTile,
};
use async_channel::{Receiver, Sender};
use bevy::{prelude::*, tasks::AsyncComputeTaskPool, utils::HashMap};
use slab::Slab;
use std::sync::Arc;

/// Everything a [`LoadTileData`] job needs to know about the terrain engine.
#[derive(Resource, Clone)]
pub struct EngineContext {
    pub bindings: Arc<RenderBindings>,
    pub source: Arc<dyn TileModelSource>,
    pub map_view: MapView,
    /// The number of vertices along one side of a tile.
    pub tile_size: u32,
}

struct LoadingTile {
    tile: Entity,
    progress: Arc<Progress>,
}

/// Schedules the [`LoadTileData`] jobs of all dirty tiles.
#[derive(Resource)]
pub struct TileDataLoader {
    loading_tiles: Slab<LoadingTile>,
    max_loading_tiles: usize,
    /// Tiles without data, by the map revision that was checked.
    empty_tiles: HashMap<Entity, u64>,
    sender: Sender<(usize, LoadTileData)>,
    receiver: Receiver<(usize, LoadTileData)>,
}

impl TileDataLoader {
    pub fn new(max_loading_tiles: usize) -> Self {
        let (sender, receiver) = async_channel::unbounded();

        Self {
            loading_tiles: Slab::with_capacity(max_loading_tiles),
            max_loading_tiles: max_loading_tiles.max(1),
            empty_tiles: default(),
            sender,
            receiver,
        }
    }

    /// The number of jobs currently in flight.
    pub fn loading_count(&self) -> usize {
        self.loading_tiles.len()
    }

    pub fn is_loading(&self, tile: Entity) -> bool {
        self.progress(tile).is_some()
    }

    /// The progress of the load in flight for the tile, if any.
    pub fn progress(&self, tile: Entity) -> Option<&Arc<Progress>> {
        self.loading_tiles
            .iter()
            .find(|(_, loading)| loading.tile == tile)
            .map(|(_, loading)| &loading.progress)
    }

    /// Whether the tile was found without data at the map revision.
    pub fn is_empty_tile(&self, tile: Entity, revision: u64) -> bool {
        self.empty_tiles.get(&tile) == Some(&revision)
    }

    fn should_load(&self, tile: Entity, revision: u64) -> bool {
        !self.is_empty_tile(tile, revision) && !self.is_loading(tile)
    }

    fn start_loading(&mut self, mut job: LoadTileData) {
        let slot = self.loading_tiles.insert(LoadingTile {
            tile: job.tile().entity(),
            progress: Arc::clone(job.progress()),
        });

        let sender = self.sender.clone();

        AsyncComputeTaskPool::get()
            .spawn(async move {
                job.invoke();

                // the receiver is only dropped together with the loader
                sender.send((slot, job)).await.ok();
            })
            .detach();
    }

    fn cancel(&mut self, tile: Entity) {
        self.empty_tiles.remove(&tile);

        for (_, loading) in self
            .loading_tiles
            .iter()
            .filter(|(_, loading)| loading.tile == tile)
        {
            debug!("Canceled loading of removed tile {tile:?}.");
            loading.progress.cancel();
        }
    }

    fn finish_loading(&mut self, world: &mut World) {
        let receiver = self.receiver.clone();

        while let Ok((slot, mut job)) = receiver.try_recv() {
            self.loading_tiles.try_remove(slot);

            job.apply(world);

            // despawned tiles were already forgotten by `cancel`
            if job.state() == LoadState::NoData && job.tile().resolve(world).is_some() {
                self.empty_tiles.insert(job.tile().entity(), job.revision());
            }
        }
    }
}

/// Starts loading the data of dirty tiles, until all slots are taken.
pub fn start_loading_tile_data(
    mut loader: ResMut<TileDataLoader>,
    context: Res<EngineContext>,
    tiles: Query<(Entity, &TerrainTile)>,
) {
    for (entity, tile) in &tiles {
        if loader.loading_tiles.len() >= loader.max_loading_tiles {
            break;
        }

        if !tile.is_dirty() || !loader.should_load(entity, context.map_view.revision) {
            continue;
        }

        let job = LoadTileData::new(tile.tile_ref(entity), context.clone());
        loader.start_loading(job);
    }
}

/// Cancels the jobs of tiles, which were despawned while loading.
pub fn cancel_orphaned_loads(
    mut loader: ResMut<TileDataLoader>,
    mut removed: RemovedComponents<TerrainTile>,
) {
    for entity in removed.read() {
        loader.cancel(entity);
    }
}

/// Merges the data of all finished jobs into their tiles.
pub fn finish_loading_tile_data(world: &mut World) {
    world.resource_scope(|world, mut loader: Mut<TileDataLoader>| {
        loader.finish_loading(world);
    });
}
