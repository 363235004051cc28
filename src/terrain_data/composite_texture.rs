use crate::terrain_data::{LayerUid, TileTexture};

/// A single layer of a [`CompositeTexture`].
#[derive(Clone, Debug, PartialEq)]
pub struct CompositePass {
    pub layer: LayerUid,
    pub texture: TileTexture,
}

/// Multiple color layer textures, which are bound to a single texture unit
/// and rendered as one pass per layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompositeTexture {
    passes: Vec<CompositePass>,
}

impl CompositeTexture {
    /// Sets the texture of the layer.
    ///
    /// Replaces the pass of the layer if present, appends a new one otherwise.
    pub fn set_layer(&mut self, layer: LayerUid, texture: TileTexture) {
        match self.passes.iter_mut().find(|pass| pass.layer == layer) {
            Some(pass) => pass.texture = texture,
            None => self.passes.push(CompositePass { layer, texture }),
        }
    }

    /// Merges the passes of the other composite into this one, layer by layer.
    pub fn merge(&mut self, other: CompositeTexture) {
        for CompositePass { layer, texture } in other.passes {
            self.set_layer(layer, texture);
        }
    }

    pub fn pass(&self, layer: LayerUid) -> Option<&CompositePass> {
        self.passes.iter().find(|pass| pass.layer == layer)
    }

    pub fn passes(&self) -> &[CompositePass] {
        &self.passes
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}
