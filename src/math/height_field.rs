use anyhow::{ensure, Result};
use bevy::math::Vec2;

/// Marks a sample without elevation data.
pub const NO_DATA_VALUE: f32 = -32767.0;

/// A square grid of elevation samples in meters.
///
/// The first row corresponds to `v = 0`, matching the texture coordinates of the
/// elevation texture the height field belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightField {
    size: u32,
    heights: Vec<f32>,
}

impl HeightField {
    pub fn new(size: u32, heights: Vec<f32>) -> Result<Self> {
        ensure!(size > 0, "Height field must not be empty.");
        ensure!(
            heights.len() == (size * size) as usize,
            "Height field of size {size} requires {} samples, got {}.",
            size * size,
            heights.len()
        );

        Ok(Self { size, heights })
    }

    pub fn from_fn(size: u32, mut height: impl FnMut(u32, u32) -> f32) -> Result<Self> {
        let heights = (0..size)
            .flat_map(|y| (0..size).map(move |x| (x, y)))
            .map(|(x, y)| height(x, y))
            .collect();

        Self::new(size, heights)
    }

    pub fn flat(size: u32, height: f32) -> Result<Self> {
        Self::from_fn(size, |_, _| height)
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Returns the nearest sample at the texture coordinate, or `None` for no-data samples.
    ///
    /// Coordinates outside of `[0, 1]` are clamped to the border.
    pub fn sample(&self, uv: Vec2) -> Option<f32> {
        let max = (self.size - 1) as f32;
        let texel = (uv.clamp(Vec2::ZERO, Vec2::ONE) * max).round().as_uvec2();

        let height = self.heights[(texel.y * self.size + texel.x) as usize];

        (height != NO_DATA_VALUE).then_some(height)
    }
}
