use crate::{
    loader::{inheritance::InheritanceUpdater, EngineContext},
    map::Progress,
    terrain_data::{
        CompositeTexture, ImageLayerModel, RenderBindings, SamplerBinding, SamplerUsage, StateSet,
        TileModel, TileTexture,
    },
    tile::TileRef,
};
use bevy::prelude::*;
use std::sync::Arc;

/// The state of a [`LoadTileData`] job.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoadState {
    /// The job was created, but not invoked yet.
    Pending,
    /// The tile model and the scratch state are being built.
    Building,
    /// The scratch state is ready to be merged.
    Built,
    /// The data source had no data for the tile. Applying the job does nothing.
    NoData,
    /// The tile was despawned before the job was invoked.
    Failed,
    /// The scratch state is being merged into the tile.
    Applying,
    /// The scratch state was merged into the tile.
    Applied,
    /// The tile was despawned before the scratch state could be merged.
    Abandoned,
}

impl LoadState {
    /// Whether the job has nothing left to do.
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            LoadState::NoData | LoadState::Failed | LoadState::Applied | LoadState::Abandoned
        )
    }
}

/// Loads the data of a single tile in two phases.
///
/// [`LoadTileData::invoke`] fetches the [`TileModel`] and prepares a scratch [`StateSet`]
/// from it. It is slow and runs on a worker thread, without touching the live tile.
/// [`LoadTileData::apply`] then merges the prepared state into the live tile.
/// It runs on the main thread, possibly much later, and therefore checks again
/// whether the tile still exists.
///
/// A job is never retried. If the tile still needs data afterwards, a new job has to be created.
pub struct LoadTileData {
    tile: TileRef,
    context: EngineContext,
    progress: Arc<Progress>,
    model: Option<TileModel>,
    scratch: Option<StateSet>,
    state: LoadState,
}

impl LoadTileData {
    pub fn new(tile: TileRef, context: EngineContext) -> Self {
        Self {
            tile,
            context,
            progress: default(),
            model: None,
            scratch: None,
            state: LoadState::Pending,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn tile(&self) -> &TileRef {
        &self.tile
    }

    /// The map revision this job loads the data of.
    pub fn revision(&self) -> u64 {
        self.context.map_view.revision
    }

    /// Can be used to cancel building the tile model.
    pub fn progress(&self) -> &Arc<Progress> {
        &self.progress
    }

    pub fn model(&self) -> Option<&TileModel> {
        self.model.as_ref()
    }

    /// The state prepared by [`LoadTileData::invoke`], which has not been merged yet.
    pub fn scratch_state(&self) -> Option<&StateSet> {
        self.scratch.as_ref()
    }

    /// Builds the tile model and prepares the scratch state. Runs on a worker thread.
    pub fn invoke(&mut self) {
        if self.state != LoadState::Pending {
            return;
        }

        self.state = LoadState::Building;

        let Some(anchor) = self.tile.resolve_anchor() else {
            // the tile is gone and does not need any data anymore
            debug!("Tile {:?} was removed before loading.", self.tile.entity());
            self.state = LoadState::Failed;
            return;
        };

        let context = &self.context;
        let key = *anchor.key();
        drop(anchor);

        let Some(model) =
            context
                .source
                .build_tile_model(&context.map_view, &key, Some(&self.progress))
        else {
            debug!("No data available for tile {key}.");
            self.state = LoadState::NoData;
            return;
        };

        self.scratch = Some(build_scratch_state(&model, &context.bindings));
        self.model = Some(model);
        self.state = LoadState::Built;
    }

    /// Merges the scratch state into the live tile and updates the inheritance of
    /// its subtree. Runs on the main thread.
    ///
    /// Either the whole merge is performed, or the world is left untouched.
    pub fn apply(&mut self, world: &mut World) {
        if self.state != LoadState::Built {
            return;
        }

        let Some(mut scratch) = self.scratch.take() else {
            return;
        };

        self.state = LoadState::Applying;

        let bindings = Arc::clone(&self.context.bindings);

        {
            let Some(mut tile) = self.tile.resolve_mut(world) else {
                warn!(
                    "Loading tile data failed, tile {:?} disappeared.",
                    self.tile.entity()
                );
                self.model = None;
                self.state = LoadState::Abandoned;
                return;
            };

            // The composite was only part of the scratch state to be prepared off-thread,
            // the tile merges it into its own composite.
            let composite = bindings
                .find_usage(SamplerUsage::Color)
                .and_then(|color| scratch.take_composite(color.unit));

            tile.merge_state(scratch, composite, &bindings);
        }

        InheritanceUpdater::new(
            &bindings,
            &self.context.map_view.info,
            self.context.tile_size,
        )
        .run(world, self.tile.entity());

        if let Some(mut tile) = self.tile.resolve_mut(world) {
            tile.set_dirty(false);
        }

        self.model = None;
        self.state = LoadState::Applied;
    }
}

fn attach_texture(state: &mut StateSet, binding: &SamplerBinding, texture: &TileTexture) {
    state.set_texture(binding.unit, texture.clone());
    state.set_uniform(binding.matrix_name.clone(), Mat4::IDENTITY);
}

/// Prepares the textures and uniforms of the tile model according to the bindings.
///
/// Layers without texture or without binding are skipped.
pub fn build_scratch_state(model: &TileModel, bindings: &RenderBindings) -> StateSet {
    let mut state = StateSet::default();

    if !model.color_layers().is_empty() {
        if let Some(color) = bindings.find_usage(SamplerUsage::Color) {
            let mut composite = CompositeTexture::default();

            for layer in model.color_layers() {
                if let Some(texture) = layer.texture() {
                    composite.set_layer(layer.layer(), texture.clone());
                }
            }

            if !composite.is_empty() {
                state.set_texture(color.unit, composite);
            }
        }
    }

    for (layer, usage) in [
        (model.elevation(), SamplerUsage::Elevation),
        (model.normal(), SamplerUsage::Normal),
    ] {
        let Some(texture) = layer.and_then(ImageLayerModel::texture) else {
            continue;
        };

        if let Some(binding) = bindings.find_usage(usage) {
            attach_texture(&mut state, binding, texture);
        }
    }

    // shared layers are bound by their layer instead of their usage
    for layer in model.shared_layers() {
        let Some(texture) = layer.texture() else {
            continue;
        };

        if let Some(binding) = bindings.find_layer(layer.layer()) {
            attach_texture(&mut state, binding, texture);
        }
    }

    state
}
