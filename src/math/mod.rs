//! Tile addressing and elevation sampling helpers.

mod height_field;
mod tile_key;

pub use crate::math::{
    height_field::{HeightField, NO_DATA_VALUE},
    tile_key::{quadrant_scale_bias, TileKey, TileProfile},
};
