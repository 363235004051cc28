use crate::{math::HeightField, terrain_data::CompositeTexture};
use bevy::{asset::Handle, image::Image, math::Mat4};
use derive_more::derive::From;
use std::{collections::BTreeMap, sync::Arc};

/// A texture of a single layer of a tile.
///
/// Elevation textures additionally keep their samples on the CPU,
/// which are required to derive the bounds of a tile.
#[derive(Clone, Debug, PartialEq)]
pub struct TileTexture {
    image: Handle<Image>,
    heights: Option<Arc<HeightField>>,
}

impl TileTexture {
    pub fn new(image: Handle<Image>) -> Self {
        Self {
            image,
            heights: None,
        }
    }

    pub fn with_heights(mut self, heights: HeightField) -> Self {
        self.heights = Some(Arc::new(heights));
        self
    }

    pub fn image(&self) -> &Handle<Image> {
        &self.image
    }

    pub fn heights(&self) -> Option<&HeightField> {
        self.heights.as_deref()
    }
}

/// The attachment bound to a texture unit.
#[derive(Clone, Debug, PartialEq, From)]
pub enum TextureAttachment {
    Texture(TileTexture),
    Composite(CompositeTexture),
}

impl TextureAttachment {
    pub fn texture(&self) -> Option<&TileTexture> {
        match self {
            TextureAttachment::Texture(texture) => Some(texture),
            TextureAttachment::Composite(_) => None,
        }
    }

    pub fn composite(&self) -> Option<&CompositeTexture> {
        match self {
            TextureAttachment::Texture(_) => None,
            TextureAttachment::Composite(composite) => Some(composite),
        }
    }
}

/// A plain bag of texture attachments (by texture unit) and matrix uniforms (by name).
///
/// It is used both for the scratch state a load job prepares off-thread and for the
/// live state of a [`TerrainTile`](crate::tile::TerrainTile).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateSet {
    textures: BTreeMap<u32, TextureAttachment>,
    uniforms: BTreeMap<String, Mat4>,
}

impl StateSet {
    pub fn set_texture(&mut self, unit: u32, attachment: impl Into<TextureAttachment>) {
        self.textures.insert(unit, attachment.into());
    }

    pub fn texture(&self, unit: u32) -> Option<&TextureAttachment> {
        self.textures.get(&unit)
    }

    pub(crate) fn texture_mut(&mut self, unit: u32) -> Option<&mut TextureAttachment> {
        self.textures.get_mut(&unit)
    }

    /// Detaches the attachment at the unit, but only if it is a [`CompositeTexture`].
    pub fn take_composite(&mut self, unit: u32) -> Option<CompositeTexture> {
        if !matches!(
            self.textures.get(&unit),
            Some(TextureAttachment::Composite(_))
        ) {
            return None;
        }

        match self.textures.remove(&unit) {
            Some(TextureAttachment::Composite(composite)) => Some(composite),
            _ => None,
        }
    }

    pub fn set_uniform(&mut self, name: impl Into<String>, matrix: Mat4) {
        self.uniforms.insert(name.into(), matrix);
    }

    pub fn remove_uniform(&mut self, name: &str) -> Option<Mat4> {
        self.uniforms.remove(name)
    }

    pub fn uniform(&self, name: &str) -> Option<Mat4> {
        self.uniforms.get(name).copied()
    }

    pub fn textures(&self) -> impl Iterator<Item = (u32, &TextureAttachment)> {
        self.textures.iter().map(|(&unit, attachment)| (unit, attachment))
    }

    pub fn uniforms(&self) -> impl Iterator<Item = (&str, Mat4)> {
        self.uniforms
            .iter()
            .map(|(name, &matrix)| (name.as_str(), matrix))
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn uniform_count(&self) -> usize {
        self.uniforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty() && self.uniforms.is_empty()
    }

    pub(crate) fn into_parts(self) -> (BTreeMap<u32, TextureAttachment>, BTreeMap<String, Mat4>) {
        (self.textures, self.uniforms)
    }
}
