use crate::{
    map::MapInfo,
    terrain_data::{RenderBindings, SamplerBinding},
};
use anyhow::Result;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// The configuration of the tile data pipeline.
///
/// Stored as RON, every field is optional and falls back to its default.
///
/// ```ron
/// (
///     tile_size: 33,
///     max_loading_tiles: 8,
///     map_info: (vertical_scale: 1.5),
/// )
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileDataConfig {
    /// The number of vertices along one side of a tile.
    pub tile_size: u32,
    /// The maximum number of tiles loaded concurrently.
    pub max_loading_tiles: usize,
    pub map_info: MapInfo,
    /// The texture units and uniforms the tile data is bound to.
    pub bindings: Vec<SamplerBinding>,
}

impl Default for TileDataConfig {
    fn default() -> Self {
        Self {
            tile_size: 17,
            max_loading_tiles: 16,
            map_info: MapInfo::default(),
            bindings: RenderBindings::standard().into_inner(),
        }
    }
}

impl TileDataConfig {
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        Ok(ron::from_str(ron)?)
    }

    pub fn to_ron_string(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(self, PrettyConfig::default())?)
    }

    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let ron = fs::read_to_string(path)?;
        Self::from_ron_str(&ron)
    }

    pub fn save_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let ron = self.to_ron_string()?;
        fs::write(path, ron)?;
        Ok(())
    }

    /// Validates the configured bindings.
    pub fn render_bindings(&self) -> Result<RenderBindings> {
        RenderBindings::new(self.bindings.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain_data::{LayerUid, SamplerUsage};

    #[test]
    fn missing_fields_use_defaults() {
        let config = TileDataConfig::from_ron_str("(tile_size: 33, map_info: (vertical_scale: 1.5))")
            .unwrap();

        assert_eq!(config.tile_size, 33);
        assert_eq!(config.max_loading_tiles, 16);
        assert_eq!(config.map_info.vertical_scale, 1.5);
        assert_eq!(config.map_info.skirt_ratio, MapInfo::default().skirt_ratio);
        assert_eq!(config.render_bindings().unwrap(), RenderBindings::standard());
    }

    #[test]
    fn parse_shared_bindings() {
        let config = TileDataConfig::from_ron_str(
            r#"(
                bindings: [
                    (usage: Color, unit: 0, sampler_name: "color", matrix_name: "colorMatrix"),
                    (usage: Shared, layer: Some(42), unit: 3, sampler_name: "detail", matrix_name: "detailMatrix"),
                ],
            )"#,
        )
        .unwrap();

        let bindings = config.render_bindings().unwrap();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings.find_layer(LayerUid(42)).unwrap().unit, 3);
        assert!(bindings.find_usage(SamplerUsage::Elevation).is_none());
    }

    #[test]
    fn invalid_bindings_are_rejected() {
        let config = TileDataConfig::from_ron_str(
            r#"(
                bindings: [
                    (usage: Color, unit: 0, sampler_name: "a", matrix_name: "aMatrix"),
                    (usage: Elevation, unit: 0, sampler_name: "b", matrix_name: "bMatrix"),
                ],
            )"#,
        )
        .unwrap();

        assert!(config.render_bindings().is_err());
        assert!(TileDataConfig::from_ron_str("(tile_size: \"large\")").is_err());
    }

    #[test]
    fn save_and_load_file() {
        let path = std::env::temp_dir().join(format!("tile_data_config_{}.ron", std::process::id()));

        let mut config = TileDataConfig::default();
        config.tile_size = 9;
        config.save_file(&path).unwrap();

        let loaded = TileDataConfig::load_file(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config, loaded);
        assert!(TileDataConfig::load_file(&path).is_err());
    }
}
