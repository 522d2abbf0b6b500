use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 2D visualization coordinates of one text. Only relative proximity within
/// one run is meaningful.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ProjectedPoint {
    pub x: f32,
    pub y: f32,
}

impl ProjectedPoint {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub const fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}
