use crate::{map::MapInfo, terrain_data::RenderBindings, tile::TerrainTile};
use bevy::prelude::*;

/// Propagates the samplers of a tile down to all of its descendants.
///
/// Has to run whenever the state of a tile changed, since its children may sample
/// its textures. The subtree is traversed in pre-order, so each tile sees the already
/// updated samplers of its parent.
pub struct InheritanceUpdater<'a> {
    bindings: &'a RenderBindings,
    map_info: &'a MapInfo,
    tile_size: u32,
}

impl<'a> InheritanceUpdater<'a> {
    pub fn new(bindings: &'a RenderBindings, map_info: &'a MapInfo, tile_size: u32) -> Self {
        Self {
            bindings,
            map_info,
            tile_size,
        }
    }

    /// Updates the samplers and elevation bounds of the `root` tile and its subtree.
    ///
    /// Returns the number of updated tiles.
    pub fn run(&self, world: &mut World, root: Entity) -> usize {
        let mut stack = vec![root];
        let mut count = 0;

        while let Some(entity) = stack.pop() {
            let parent_samplers =
                parent_tile(world, entity).map(|parent| parent.samplers().to_vec());

            if let Some(mut tile) = world.get_mut::<TerrainTile>(entity) {
                tile.inherit_state(parent_samplers.as_deref(), self.bindings);
                tile.update_elevation_data(self.bindings, self.map_info, self.tile_size);
                count += 1;
            }

            if let Some(children) = world.get::<Children>(entity) {
                stack.extend(children.iter().rev());
            }
        }

        count
    }
}

/// The closest ancestor of the entity, that is a tile.
fn parent_tile(world: &World, entity: Entity) -> Option<&TerrainTile> {
    let mut current = world.get::<Parent>(entity)?.get();

    loop {
        if let Some(tile) = world.get::<TerrainTile>(current) {
            return Some(tile);
        }

        current = world.get::<Parent>(current)?.get();
    }
}
