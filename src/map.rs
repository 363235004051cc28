//! The boundary to the map data source, which assembles the [`TileModel`]s.

use crate::{math::TileKey, terrain_data::TileModel};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Metadata of the map, that influences how tile data is interpreted.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapInfo {
    /// Scales all elevation samples.
    pub vertical_scale: f32,
    /// The height of the tile skirts relative to the width of the tile.
    pub skirt_ratio: f32,
}

impl Default for MapInfo {
    fn default() -> Self {
        Self {
            vertical_scale: 1.0,
            skirt_ratio: 0.05,
        }
    }
}

/// A snapshot of the map, used to build tile models consistently while the map changes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapView {
    /// Incremented by the data source whenever the layers of the map change.
    pub revision: u64,
    pub info: MapInfo,
}

/// Reports the progress of building a tile model and allows to cancel it.
#[derive(Debug, Default)]
pub struct Progress {
    canceled: AtomicBool,
}

impl Progress {
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }
}

/// A source of tile data, usually backed by a map of image and elevation layers.
///
/// Building a model may take a long time (disk or network access) and is therefore
/// always called on a worker thread. It must not touch the live tiles.
pub trait TileModelSource: Send + Sync + 'static {
    /// Assembles the data of the tile.
    ///
    /// Returns `None` if there is no data for the tile, e.g. when it lies outside of
    /// the extent of all layers, or if the `progress` was canceled.
    fn build_tile_model(
        &self,
        view: &MapView,
        key: &TileKey,
        progress: Option<&Progress>,
    ) -> Option<TileModel>;
}

impl<F> TileModelSource for F
where
    F: Fn(&MapView, &TileKey) -> Option<TileModel> + Send + Sync + 'static,
{
    fn build_tile_model(
        &self,
        view: &MapView,
        key: &TileKey,
        progress: Option<&Progress>,
    ) -> Option<TileModel> {
        if progress.is_some_and(Progress::is_canceled) {
            return None;
        }

        self(view, key)
    }
}
