use crate::{
    config::TileDataConfig,
    loader::{
        cancel_orphaned_loads, finish_loading_tile_data, start_loading_tile_data, EngineContext,
        TileDataLoader,
    },
    map::{MapView, TileModelSource},
    terrain_data::RenderBindings,
};
use bevy::prelude::*;
use std::sync::Arc;

/// The plugin for loading the data of [`TerrainTile`](crate::tile::TerrainTile)s.
///
/// Requires the task pools to be set up, e.g. by the `TaskPoolPlugin`.
pub struct TileDataPlugin {
    pub config: TileDataConfig,
    pub source: Arc<dyn TileModelSource>,
}

impl TileDataPlugin {
    pub fn new(config: TileDataConfig, source: impl TileModelSource) -> Self {
        Self {
            config,
            source: Arc::new(source),
        }
    }
}

impl Plugin for TileDataPlugin {
    fn build(&self, app: &mut App) {
        let bindings = self.config.render_bindings().unwrap_or_else(|error| {
            error!("Invalid render bindings, using the standard bindings instead: {error}");
            RenderBindings::standard()
        });

        info!(
            "Loading tile data with {} bindings and up to {} concurrent loads.",
            bindings.len(),
            self.config.max_loading_tiles
        );

        app.insert_resource(EngineContext {
            bindings: Arc::new(bindings),
            source: Arc::clone(&self.source),
            map_view: MapView {
                revision: 0,
                info: self.config.map_info,
            },
            tile_size: self.config.tile_size,
        })
        .insert_resource(TileDataLoader::new(self.config.max_loading_tiles))
        .add_systems(
            Last,
            (
                cancel_orphaned_loads,
                finish_loading_tile_data,
                start_loading_tile_data,
            )
                .chain(),
        );
    }
}
