//! This crate loads the data of quadtree terrain tiles in the background and merges it
//! into the live tiles.
//!
//! # Background
//! Every tile of the terrain quadtree is an entity with a [`TerrainTile`](tile::TerrainTile)
//! component, attached to its parent tile with the bevy hierarchy.
//! Tiles are created (and marked dirty) and despawned by the quadtree update at any time.
//!
//! ## How is the data of a tile loaded?
//! The data of a tile is described by a [`TileModel`](terrain_data::TileModel), which
//! is assembled by a [`TileModelSource`](map::TileModelSource), e.g. from the image and
//! elevation layers of a map. This may take long, so it happens on the async compute task pool.
//! The model is turned into textures and matrix uniforms according to the
//! [`RenderBindings`](terrain_data::RenderBindings), which are then merged into the tile
//! on the main thread in a single step.
//! See the [`loader`] module for more information.
//!
//! ## What about tiles without data?
//! Tiles without own data for a binding sample the texture of their closest ancestor,
//! with a texture matrix that selects their quadrant of it.
//! Each time a tile receives new data, its whole subtree is updated accordingly.

pub mod config;
pub mod loader;
pub mod map;
pub mod math;
pub mod plugin;
pub mod terrain_data;
pub mod tile;

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{
        config::TileDataConfig,
        loader::{EngineContext, LoadState, LoadTileData, TileDataLoader},
        map::{MapInfo, MapView, Progress, TileModelSource},
        math::{HeightField, TileKey, TileProfile},
        plugin::TileDataPlugin,
        terrain_data::{
            ImageLayerModel, LayerUid, RenderBindings, SamplerBinding, SamplerUsage, TileModel,
            TileTexture,
        },
        tile::{TerrainTile, TileRef},
    };
}
