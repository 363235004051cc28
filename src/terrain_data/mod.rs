//! This module contains the data a terrain tile is rendered with.
//!
//! # Explanation
//! The map data source describes the data of a tile as a [`TileModel`], which lists
//! the color, elevation, normal and shared layers of the tile.
//! Which texture unit each of these layers is bound to, and under which uniform name
//! its texture matrix is passed, is configured by the [`RenderBindings`].
//!
//! Loading a tile turns its model into a [`StateSet`], a plain bag of
//! [`TextureAttachment`]s and matrix uniforms. All color layers share a single texture
//! unit and are therefore combined into one [`CompositeTexture`] first.

mod composite_texture;
mod render_bindings;
mod state_set;
mod tile_model;

pub use crate::terrain_data::{
    composite_texture::{CompositePass, CompositeTexture},
    render_bindings::{RenderBindings, SamplerBinding, SamplerUsage},
    state_set::{StateSet, TextureAttachment, TileTexture},
    tile_model::{ImageLayerModel, LayerUid, TileModel},
};
