//! Screen geometry: resolutions and points.
//!
//! Two resolutions exist per session: the *model* resolution (what the model
//! is told it is looking at) and the *device* resolution (the real remote
//! screen). Points are `f64` because models routinely emit fractional
//! coordinates; they stay in model space until explicitly scaled.

use serde::{Deserialize, Serialize};

/// Default cap on the larger axis of the model resolution.
///
/// The model resolution is derived from the device resolution by shrinking it
/// to fit within this dimension while preserving aspect ratio.
pub const DEFAULT_MODEL_MAX_DIM: u32 = 1280;

/// A screen resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Create a resolution.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Largest resolution with the same aspect ratio whose axes both fit
    /// within `max_dim`. Returns `self` unchanged when it already fits.
    pub fn fit_within(self, max_dim: u32) -> Self {
        let longest = self.width.max(self.height);
        if longest <= max_dim || longest == 0 {
            return self;
        }
        let scale = f64::from(max_dim) / f64::from(longest);
        Self {
            width: (f64::from(self.width) * scale).round() as u32,
            height: (f64::from(self.height) * scale).round() as u32,
        }
    }

    /// Whether a model-space point lies inside `[0, width) x [0, height)`.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x < f64::from(self.width) && p.y < f64::from(self.height)
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A 2D point, in model space unless stated otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
