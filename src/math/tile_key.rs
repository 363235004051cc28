use bevy::math::{DVec2, Mat4, Vec3};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Mean equatorial circumference of the WGS84 ellipsoid in meters.
const EARTH_CIRCUMFERENCE: f64 = 40_075_016.685_578_49;

/// The spatial profile a [`TileKey`] is defined in.
///
/// The profile decides how large a tile is on the ground.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum TileProfile {
    /// Two root tiles covering 360°x180° of longitude and latitude.
    #[default]
    Geodetic,
    /// One square root tile in web mercator projection.
    SphericalMercator,
    /// One square root tile of the given width in meters.
    Planar { width: f64 },
}

impl TileProfile {
    /// The approximate ground size of a single tile at the `lod` in meters.
    pub fn tile_size_meters(self, lod: u32) -> DVec2 {
        let root = match self {
            // 180° by 180°
            TileProfile::Geodetic => DVec2::splat(EARTH_CIRCUMFERENCE / 2.0),
            TileProfile::SphericalMercator => DVec2::splat(EARTH_CIRCUMFERENCE),
            TileProfile::Planar { width } => DVec2::splat(width),
        };

        // underflows to zero for very deep lods
        root * 0.5f64.powf(lod as f64)
    }
}

/// The position of a tile inside the terrain quadtree.
///
/// Lod 0 contains the root tiles, each further lod halves the tile size.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TileKey {
    /// The level of detail, where 0 is the coarsest level.
    pub lod: u32,
    /// The x position of the tile in tile sizes.
    pub x: u32,
    /// The y position of the tile in tile sizes.
    pub y: u32,
    pub profile: TileProfile,
}

impl TileKey {
    pub fn new(lod: u32, x: u32, y: u32, profile: TileProfile) -> Self {
        Self { lod, x, y, profile }
    }

    /// The key of the tile this tile was subdivided from, if any.
    pub fn parent(self) -> Option<Self> {
        (self.lod > 0).then(|| Self {
            lod: self.lod - 1,
            x: self.x >> 1,
            y: self.y >> 1,
            profile: self.profile,
        })
    }

    pub fn children(self) -> [Self; 4] {
        [0, 1, 2, 3].map(|quadrant| Self {
            lod: self.lod + 1,
            x: (self.x << 1) + quadrant % 2,
            y: (self.y << 1) + quadrant / 2,
            profile: self.profile,
        })
    }

    /// The position of this tile inside its parent.
    ///
    /// `0` and `1` are the tiles with even y, `0` and `2` are the tiles with even x.
    pub fn quadrant(self) -> u32 {
        (self.x & 1) + 2 * (self.y & 1)
    }

    /// The ground size of this tile in meters.
    pub fn size_meters(self) -> DVec2 {
        self.profile.tile_size_meters(self.lod)
    }
}

/// Maps texture coordinates of a child tile in the given `quadrant` into the
/// texture coordinates of its parent.
///
/// Texture coordinates start in the lower left corner, while tile rows are counted
/// from the top, hence the flipped y offset.
pub fn quadrant_scale_bias(quadrant: u32) -> Mat4 {
    let bias_x = (quadrant % 2) as f32 * 0.5;
    let bias_y = if quadrant / 2 == 0 { 0.5 } else { 0.0 };

    Mat4::from_translation(Vec3::new(bias_x, bias_y, 0.0))
        * Mat4::from_scale(Vec3::new(0.5, 0.5, 1.0))
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}_{}_{}", self.lod, self.x, self.y)
    }
}

impl FromStr for TileKey {
    type Err = anyhow::Error;

    /// Parses a key in the `lod_x_y` form, using the default profile.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('_').collect();

        let &[lod, x, y] = parts.as_slice() else {
            anyhow::bail!("Invalid tile key: {s}");
        };

        Ok(Self {
            lod: lod.parse()?,
            x: x.parse()?,
            y: y.parse()?,
            profile: TileProfile::default(),
        })
    }
}
