use crate::{
    map::MapInfo,
    math::{quadrant_scale_bias, TileKey},
    terrain_data::{CompositeTexture, RenderBindings, SamplerUsage, StateSet, TextureAttachment},
};
use bevy::prelude::*;
use itertools::{iproduct, Itertools};
use std::{
    iter,
    sync::{Arc, Weak},
};

/// Shared by a [`TerrainTile`] with all [`TileRef`]s pointing to it.
///
/// It lives exactly as long as the tile component, which lets other threads
/// observe whether the tile still exists.
#[derive(Debug)]
pub struct TileAnchor {
    key: TileKey,
}

impl TileAnchor {
    pub fn key(&self) -> &TileKey {
        &self.key
    }
}

/// A weak reference to a [`TerrainTile`], that does not keep the tile alive.
///
/// Tiles may be despawned at any time, so every access has to resolve the reference
/// again and handle the tile being gone.
#[derive(Clone, Debug)]
pub struct TileRef {
    entity: Entity,
    anchor: Weak<TileAnchor>,
}

impl TileRef {
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Promotes the reference to the anchor of the tile, if the tile still exists.
    ///
    /// This is safe to call from any thread, concurrently with the tile being despawned.
    pub fn resolve_anchor(&self) -> Option<Arc<TileAnchor>> {
        self.anchor.upgrade()
    }

    /// Resolves the live tile.
    ///
    /// Fails if the entity was despawned (the entity generation does not match anymore)
    /// or if its tile component was replaced.
    pub fn resolve<'w>(&self, world: &'w World) -> Option<&'w TerrainTile> {
        world
            .get::<TerrainTile>(self.entity)
            .filter(|tile| self.points_to(tile))
    }

    pub fn resolve_mut<'w>(&self, world: &'w mut World) -> Option<Mut<'w, TerrainTile>> {
        world
            .get_mut::<TerrainTile>(self.entity)
            .filter(|tile| self.points_to(tile))
    }

    fn points_to(&self, tile: &TerrainTile) -> bool {
        Arc::as_ptr(&tile.anchor) == self.anchor.as_ptr()
    }
}

/// The texture and texture matrix a tile samples one binding with.
///
/// Tiles without own data for a binding sample the texture of their closest ancestor,
/// using a matrix that maps into the ancestor's texture coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Sampler {
    pub texture: Option<TextureAttachment>,
    pub matrix: Mat4,
    /// Whether the texture belongs to the tile itself.
    pub owned: bool,
}

impl Default for Sampler {
    fn default() -> Self {
        Self {
            texture: None,
            matrix: Mat4::IDENTITY,
            owned: false,
        }
    }
}

/// The vertical extent of a tile, derived from its (possibly inherited) elevation data.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TileElevation {
    pub min_height: f32,
    pub max_height: f32,
    pub skirt_height: f32,
}

/// A tile of the terrain quadtree.
///
/// Child tiles are attached to their parent tile with the bevy hierarchy.
/// The state of a tile is only ever changed on the main thread,
/// load jobs prepare their data separately and merge it in one step.
#[derive(Component, Debug)]
pub struct TerrainTile {
    key: TileKey,
    anchor: Arc<TileAnchor>,
    state: StateSet,
    samplers: Vec<Sampler>,
    elevation: TileElevation,
    dirty: bool,
}

impl TerrainTile {
    /// Creates a new tile, which is marked dirty until its data was loaded.
    pub fn new(key: TileKey) -> Self {
        Self {
            key,
            anchor: Arc::new(TileAnchor { key }),
            state: StateSet::default(),
            samplers: Vec::new(),
            elevation: TileElevation::default(),
            dirty: true,
        }
    }

    pub fn key(&self) -> &TileKey {
        &self.key
    }

    /// Creates a weak reference to this tile, which is attached to the `entity`.
    pub fn tile_ref(&self, entity: Entity) -> TileRef {
        TileRef {
            entity,
            anchor: Arc::downgrade(&self.anchor),
        }
    }

    /// The textures and uniforms owned by this tile.
    pub fn state(&self) -> &StateSet {
        &self.state
    }

    /// The samplers of this tile, in the order of the [`RenderBindings`].
    pub fn samplers(&self) -> &[Sampler] {
        &self.samplers
    }

    pub fn sampler(&self, bindings: &RenderBindings, usage: SamplerUsage) -> Option<&Sampler> {
        bindings
            .index_of_usage(usage)
            .and_then(|index| self.samplers.get(index))
    }

    pub fn elevation(&self) -> TileElevation {
        self.elevation
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Merges a prepared state into the live state of the tile.
    ///
    /// The `composite` is merged layer by layer into the composite bound to the color unit,
    /// all other attachments and uniforms replace the ones present.
    /// The samplers are not touched, run [`TerrainTile::inherit_state`] afterwards.
    pub fn merge_state(
        &mut self,
        state: StateSet,
        composite: Option<CompositeTexture>,
        bindings: &RenderBindings,
    ) {
        let (textures, uniforms) = state.into_parts();

        for (unit, attachment) in textures {
            self.state.set_texture(unit, attachment);
        }

        for (name, matrix) in uniforms {
            self.state.set_uniform(name, matrix);
        }

        let Some(composite) = composite else {
            return;
        };

        let Some(color) = bindings.find_usage(SamplerUsage::Color) else {
            warn!("Tile {} received color layers without a color binding.", self.key);
            return;
        };

        match self.state.texture_mut(color.unit) {
            Some(TextureAttachment::Composite(live)) => live.merge(composite),
            _ => self.state.set_texture(color.unit, composite),
        }
    }

    /// Recomputes the samplers of this tile from its own state and the samplers of its parent.
    ///
    /// Bindings without own data inherit the parent's texture with the parent's matrix
    /// narrowed down to the quadrant of this tile.
    pub fn inherit_state(&mut self, parent: Option<&[Sampler]>, bindings: &RenderBindings) {
        let scale_bias = quadrant_scale_bias(self.key.quadrant());

        let samplers = bindings
            .iter()
            .enumerate()
            .map(|(index, binding)| {
                if let Some(texture) = self.state.texture(binding.unit) {
                    return Sampler {
                        texture: Some(texture.clone()),
                        matrix: Mat4::IDENTITY,
                        owned: true,
                    };
                }

                match parent.and_then(|samplers| samplers.get(index)) {
                    Some(Sampler {
                        texture: Some(texture),
                        matrix,
                        ..
                    }) => Sampler {
                        texture: Some(texture.clone()),
                        matrix: *matrix * scale_bias,
                        owned: false,
                    },
                    _ => Sampler::default(),
                }
            })
            .collect_vec();

        for (binding, sampler) in iter::zip(bindings.iter(), &samplers) {
            if sampler.texture.is_some() {
                self.state
                    .set_uniform(binding.matrix_name.clone(), sampler.matrix);
            } else {
                self.state.remove_uniform(&binding.matrix_name);
            }
        }

        self.samplers = samplers;
    }

    /// Recomputes the vertical extent of the tile.
    ///
    /// The elevation sampler is evaluated on a grid of `tile_size` x `tile_size` vertices.
    /// Tiles without any elevation data are flat at height zero.
    pub fn update_elevation_data(
        &mut self,
        bindings: &RenderBindings,
        map_info: &MapInfo,
        tile_size: u32,
    ) {
        let grid_size = tile_size.max(2);
        let step = 1.0 / (grid_size - 1) as f32;

        let heights = self
            .sampler(bindings, SamplerUsage::Elevation)
            .and_then(|sampler| {
                let texture = sampler.texture.as_ref()?.texture()?;
                Some((texture.heights()?, sampler.matrix))
            });

        let (min_height, max_height) = heights
            .and_then(|(heights, matrix)| {
                iproduct!(0..grid_size, 0..grid_size)
                    .filter_map(|(x, y)| {
                        let uv = Vec2::new(x as f32, y as f32) * step;
                        heights.sample(matrix.transform_point3(uv.extend(0.0)).truncate())
                    })
                    .map(|height| height * map_info.vertical_scale)
                    .minmax_by(f32::total_cmp)
                    .into_option()
            })
            .unwrap_or((0.0, 0.0));

        self.elevation = TileElevation {
            min_height,
            max_height,
            skirt_height: self.key.size_meters().x as f32 * map_info.skirt_ratio,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        math::{HeightField, TileProfile},
        terrain_data::{LayerUid, SamplerBinding, TileTexture},
    };

    fn texture(id: u128) -> TileTexture {
        TileTexture::new(Handle::weak_from_u128(id))
    }

    fn bindings() -> RenderBindings {
        RenderBindings::new(vec![
            SamplerBinding::new(SamplerUsage::Color, 0, "color", "colorMatrix"),
            SamplerBinding::new(SamplerUsage::Elevation, 1, "elevation", "elevMatrix"),
        ])
        .unwrap()
    }

    #[test]
    fn tile_ref_fails_after_despawn() {
        let mut world = World::new();
        let key = TileKey::new(0, 0, 0, TileProfile::Geodetic);

        let entity = world.spawn(TerrainTile::new(key)).id();
        let tile_ref = world.get::<TerrainTile>(entity).unwrap().tile_ref(entity);

        assert!(tile_ref.resolve_anchor().is_some());
        assert!(tile_ref.resolve(&world).is_some());

        world.despawn(entity);

        assert!(tile_ref.resolve_anchor().is_none());
        assert!(tile_ref.resolve(&world).is_none());
    }

    #[test]
    fn tile_ref_fails_for_replaced_tile() {
        let mut world = World::new();
        let key = TileKey::new(0, 0, 0, TileProfile::Geodetic);

        let entity = world.spawn(TerrainTile::new(key)).id();
        let tile_ref = world.get::<TerrainTile>(entity).unwrap().tile_ref(entity);

        world.entity_mut(entity).insert(TerrainTile::new(key));

        assert!(tile_ref.resolve(&world).is_none());
        assert!(tile_ref.resolve_anchor().is_none());
    }

    #[test]
    fn merge_composite_into_live_composite() {
        let bindings = bindings();
        let mut tile = TerrainTile::new(TileKey::new(1, 0, 0, TileProfile::Geodetic));

        let mut first = CompositeTexture::default();
        first.set_layer(LayerUid(1), texture(1));
        tile.merge_state(StateSet::default(), Some(first), &bindings);

        let mut second = CompositeTexture::default();
        second.set_layer(LayerUid(2), texture(2));
        tile.merge_state(StateSet::default(), Some(second), &bindings);

        let composite = tile.state().texture(0).unwrap().composite().unwrap();
        assert_eq!(composite.passes().len(), 2);
    }

    #[test]
    fn child_inherits_parent_texture() {
        let bindings = bindings();
        let parent_key = TileKey::new(1, 0, 0, TileProfile::Geodetic);

        let mut parent = TerrainTile::new(parent_key);
        let mut state = StateSet::default();
        state.set_texture(1, texture(1));
        parent.merge_state(state, None, &bindings);
        parent.inherit_state(None, &bindings);

        let mut child = TerrainTile::new(parent_key.children()[3]);
        child.inherit_state(Some(parent.samplers()), &bindings);

        let sampler = child.sampler(&bindings, SamplerUsage::Elevation).unwrap();
        assert!(!sampler.owned);
        assert_eq!(sampler.texture, Some(texture(1).into()));
        assert_eq!(sampler.matrix, quadrant_scale_bias(3));
        assert_eq!(child.state().uniform("elevMatrix"), Some(quadrant_scale_bias(3)));

        // nothing to inherit for the color binding
        let color = child.sampler(&bindings, SamplerUsage::Color).unwrap();
        assert_eq!(color, &Sampler::default());
        assert_eq!(child.state().uniform("colorMatrix"), None);
    }

    #[test]
    fn elevation_bounds_follow_inherited_matrix() {
        let bindings = bindings();
        let map_info = MapInfo {
            vertical_scale: 2.0,
            skirt_ratio: 0.1,
        };
        let parent_key = TileKey::new(0, 0, 0, TileProfile::Planar { width: 1000.0 });

        // heights increase with v, from 0 at the bottom to 10 at the top
        let heights = HeightField::from_fn(11, |_, y| y as f32).unwrap();

        let mut parent = TerrainTile::new(parent_key);
        let mut state = StateSet::default();
        state.set_texture(1, texture(1).with_heights(heights));
        parent.merge_state(state, None, &bindings);
        parent.inherit_state(None, &bindings);
        parent.update_elevation_data(&bindings, &map_info, 5);

        assert_eq!(parent.elevation().min_height, 0.0);
        assert_eq!(parent.elevation().max_height, 20.0);
        assert_eq!(parent.elevation().skirt_height, 100.0);

        // quadrant 0 covers the upper half of the parent
        let mut child = TerrainTile::new(parent_key.children()[0]);
        child.inherit_state(Some(parent.samplers()), &bindings);
        child.update_elevation_data(&bindings, &map_info, 5);

        assert_eq!(child.elevation().min_height, 10.0);
        assert_eq!(child.elevation().max_height, 20.0);
        assert_eq!(child.elevation().skirt_height, 50.0);
    }

    #[test]
    fn flat_without_elevation() {
        let bindings = bindings();
        let mut tile = TerrainTile::new(TileKey::new(0, 0, 0, TileProfile::Geodetic));

        tile.inherit_state(None, &bindings);
        tile.update_elevation_data(&bindings, &MapInfo::default(), 17);

        assert_eq!(tile.elevation().min_height, 0.0);
        assert_eq!(tile.elevation().max_height, 0.0);
    }
}
