use crate::terrain_data::LayerUid;
use anyhow::{bail, ensure, Result};
use bevy::utils::HashSet;
use serde::{Deserialize, Serialize};

/// The semantic role of a texture bound to a terrain tile.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SamplerUsage {
    /// The composite of all color layers.
    Color,
    Elevation,
    Normal,
    /// A layer that is bound by its [`LayerUid`] instead of its role.
    Shared,
}

/// Binds a texture role (or a specific shared layer) to a texture unit
/// and the uniform name of its texture matrix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SamplerBinding {
    pub usage: SamplerUsage,
    /// The layer bound by this binding. Only set for [`SamplerUsage::Shared`].
    #[serde(default)]
    pub layer: Option<LayerUid>,
    pub unit: u32,
    pub sampler_name: String,
    pub matrix_name: String,
}

impl SamplerBinding {
    pub fn new(
        usage: SamplerUsage,
        unit: u32,
        sampler_name: impl Into<String>,
        matrix_name: impl Into<String>,
    ) -> Self {
        Self {
            usage,
            layer: None,
            unit,
            sampler_name: sampler_name.into(),
            matrix_name: matrix_name.into(),
        }
    }

    pub fn shared(
        layer: LayerUid,
        unit: u32,
        sampler_name: impl Into<String>,
        matrix_name: impl Into<String>,
    ) -> Self {
        Self {
            layer: Some(layer),
            ..Self::new(SamplerUsage::Shared, unit, sampler_name, matrix_name)
        }
    }
}

/// The table of all [`SamplerBinding`]s used by the terrain.
///
/// The table is validated on construction and read-only afterwards.
/// Missing bindings are not an error, the corresponding layers are simply not rendered.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderBindings {
    bindings: Vec<SamplerBinding>,
}

impl RenderBindings {
    pub fn new(bindings: Vec<SamplerBinding>) -> Result<Self> {
        let mut units = HashSet::default();
        let mut usages = HashSet::default();
        let mut layers = HashSet::default();

        for binding in &bindings {
            ensure!(
                units.insert(binding.unit),
                "Texture unit {} is bound more than once.",
                binding.unit
            );

            match (binding.usage, binding.layer) {
                (SamplerUsage::Shared, Some(layer)) => ensure!(
                    layers.insert(layer),
                    "Shared layer {layer} is bound more than once."
                ),
                (SamplerUsage::Shared, None) => {
                    bail!("Shared binding `{}` has no layer.", binding.sampler_name)
                }
                (usage, None) => ensure!(
                    usages.insert(usage),
                    "Usage {usage:?} is bound more than once."
                ),
                (usage, Some(_)) => {
                    bail!("Binding `{}` of usage {usage:?} must not name a layer.", binding.sampler_name)
                }
            }
        }

        Ok(Self { bindings })
    }

    /// The default table binding color, elevation and normal data to the units 0, 1 and 2.
    pub fn standard() -> Self {
        Self {
            bindings: vec![
                SamplerBinding::new(
                    SamplerUsage::Color,
                    0,
                    "terrain_color_texture",
                    "terrain_color_matrix",
                ),
                SamplerBinding::new(
                    SamplerUsage::Elevation,
                    1,
                    "terrain_elevation_texture",
                    "terrain_elevation_matrix",
                ),
                SamplerBinding::new(
                    SamplerUsage::Normal,
                    2,
                    "terrain_normal_texture",
                    "terrain_normal_matrix",
                ),
            ],
        }
    }

    pub fn find_usage(&self, usage: SamplerUsage) -> Option<&SamplerBinding> {
        self.bindings
            .iter()
            .find(|binding| binding.usage == usage)
    }

    pub fn find_layer(&self, layer: LayerUid) -> Option<&SamplerBinding> {
        self.bindings
            .iter()
            .find(|binding| binding.layer == Some(layer))
    }

    pub fn index_of_usage(&self, usage: SamplerUsage) -> Option<usize> {
        self.bindings
            .iter()
            .position(|binding| binding.usage == usage)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SamplerBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn into_inner(self) -> Vec<SamplerBinding> {
        self.bindings
    }
}
