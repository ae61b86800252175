//! Bidirectional coordinate mapping between model space and device space.
//!
//! The model reasons over a viewport it was *told* about (the model
//! resolution); the sandbox screen has its own pixel dimensions (the device
//! resolution). The scaler applies the fixed per-axis `device/model` ratio,
//! the exact inverse of the fit used to choose the model resolution.

use deskpilot_types::{Point, Resolution, DEFAULT_MODEL_MAX_DIM};

/// Fixed per-session coordinate scaler.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionScaler {
    device: Resolution,
    model: Resolution,
}

impl ResolutionScaler {
    /// Build a scaler from independently chosen device and model resolutions.
    pub fn new(device: Resolution, model: Resolution) -> Self {
        Self { device, model }
    }

    /// Build a scaler whose model resolution is the device resolution shrunk
    /// to fit within `max_dim` (see [`Resolution::fit_within`]).
    pub fn with_max_dim(device: Resolution, max_dim: u32) -> Self {
        Self {
            device,
            model: device.fit_within(max_dim),
        }
    }

    /// Build a scaler with the default model viewport cap.
    pub fn for_device(device: Resolution) -> Self {
        Self::with_max_dim(device, DEFAULT_MODEL_MAX_DIM)
    }

    /// The resolution declared to the model.
    pub fn model_resolution(&self) -> Resolution {
        self.model
    }

    /// The real screen resolution.
    pub fn device_resolution(&self) -> Resolution {
        self.device
    }

    /// Map a model-space point into device space.
    pub fn scale_to_device(&self, p: Point) -> Point {
        Point::new(
            p.x * f64::from(self.device.width) / f64::from(self.model.width),
            p.y * f64::from(self.device.height) / f64::from(self.model.height),
        )
    }

    /// Map a model-space point to integer device pixels.
    ///
    /// Clamped to the device viewport: a valid model point near the edge can
    /// round one pixel past the last addressable device pixel.
    pub fn to_device_pixels(&self, p: Point) -> (i32, i32) {
        let scaled = self.scale_to_device(p);
        let max_x = self.device.width.saturating_sub(1) as i32;
        let max_y = self.device.height.saturating_sub(1) as i32;
        (
            (scaled.x.round() as i32).clamp(0, max_x),
            (scaled.y.round() as i32).clamp(0, max_y),
        )
    }

}
