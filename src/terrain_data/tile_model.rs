use crate::{math::TileKey, terrain_data::TileTexture};
use derive_more::derive::{Display, From};
use serde::{Deserialize, Serialize};

/// The unique identifier of a map layer.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
#[display("{_0}")]
pub struct LayerUid(pub u32);

/// The data of a single image layer for one tile.
#[derive(Clone, Debug)]
pub struct ImageLayerModel {
    layer: LayerUid,
    texture: Option<TileTexture>,
}

impl ImageLayerModel {
    pub fn new(layer: impl Into<LayerUid>, texture: Option<TileTexture>) -> Self {
        Self {
            layer: layer.into(),
            texture,
        }
    }

    pub fn layer(&self) -> LayerUid {
        self.layer
    }

    pub fn texture(&self) -> Option<&TileTexture> {
        self.texture.as_ref()
    }
}

/// A snapshot of all layer data of a tile, fetched for one load.
///
/// The model is assembled once by the map data source and can not be changed afterwards.
#[derive(Clone, Debug)]
pub struct TileModel {
    key: TileKey,
    color_layers: Vec<ImageLayerModel>,
    elevation: Option<ImageLayerModel>,
    normal: Option<ImageLayerModel>,
    shared_layers: Vec<ImageLayerModel>,
}

impl TileModel {
    pub fn new(key: TileKey) -> Self {
        Self {
            key,
            color_layers: Vec::new(),
            elevation: None,
            normal: None,
            shared_layers: Vec::new(),
        }
    }

    /// Appends a color layer. Color layers are composited in the order they were added.
    pub fn with_color_layer(mut self, layer: ImageLayerModel) -> Self {
        self.color_layers.push(layer);
        self
    }

    pub fn with_elevation(mut self, layer: ImageLayerModel) -> Self {
        self.elevation = Some(layer);
        self
    }

    pub fn with_normal(mut self, layer: ImageLayerModel) -> Self {
        self.normal = Some(layer);
        self
    }

    pub fn with_shared_layer(mut self, layer: ImageLayerModel) -> Self {
        self.shared_layers.push(layer);
        self
    }

    pub fn key(&self) -> &TileKey {
        &self.key
    }

    pub fn color_layers(&self) -> &[ImageLayerModel] {
        &self.color_layers
    }

    pub fn elevation(&self) -> Option<&ImageLayerModel> {
        self.elevation.as_ref()
    }

    pub fn normal(&self) -> Option<&ImageLayerModel> {
        self.normal.as_ref()
    }

    pub fn shared_layers(&self) -> &[ImageLayerModel] {
        &self.shared_layers
    }
}
