use crate::math::Vector2;

/// How projected UVs are fitted before the other settings apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fill {
    /// Keep the projected scale (world units map to UV units).
    #[default]
    Tile,
    /// Uniformly scale into the unit square, preserving aspect ratio.
    Fit,
    /// Scale each axis independently into the unit square.
    Stretch,
}

/// Where the UV bounds are anchored after projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    UpperLeft,
    UpperCenter,
    UpperRight,
    MiddleLeft,
    MiddleCenter,
    MiddleRight,
    LowerLeft,
    LowerCenter,
    LowerRight,
    /// Leave the projected UVs where they land.
    #[default]
    None,
}

/// Per-face parameters of the automatic UV projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoUnwrapSettings {
    /// Project world-space positions instead of local ones.
    pub use_world_space: bool,
    /// Mirror horizontally.
    pub flip_u: bool,
    /// Mirror vertically.
    pub flip_v: bool,
    /// Exchange U and V.
    pub swap_uv: bool,
    /// Fitting mode.
    pub fill: Fill,
    /// Multiplier applied after rotation.
    pub scale: Vector2,
    /// Subtracted last, after anchoring.
    pub offset: Vector2,
    /// Rotation in degrees around the UV bounds center.
    pub rotation: f64,
    /// Bounds anchor.
    pub anchor: Anchor,
}

impl Default for AutoUnwrapSettings {
    fn default() -> Self {
        Self::tile()
    }
}

impl AutoUnwrapSettings {
    /// Tiling projection with identity transform.
    #[must_use]
    pub fn tile() -> Self {
        Self {
            use_world_space: false,
            flip_u: false,
            flip_v: false,
            swap_uv: false,
            fill: Fill::Tile,
            scale: Vector2::new(1.0, 1.0),
            offset: Vector2::zeros(),
            rotation: 0.0,
            anchor: Anchor::None,
        }
    }

    /// Projection fitted into the unit square.
    #[must_use]
    pub fn fit() -> Self {
        Self {
            fill: Fill::Fit,
            ..Self::tile()
        }
    }
}
