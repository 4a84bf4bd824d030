//! Engine configuration
//!
//! Defaults match `consts`; a host may override any field from JSON.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{FALLBACK_FRAME_MS, LOGICAL_HEIGHT, LOGICAL_WIDTH, MAX_FRAME_MS};
use crate::error::{RadiusError, RadiusResult};
use crate::surface::Color;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Logical coordinate space every layer is authored in
    pub logical_width: f32,
    pub logical_height: f32,

    /// Frame deltas above this are replaced by `fallback_frame_ms`
    pub max_frame_ms: f32,
    pub fallback_frame_ms: f32,

    /// Default layer background
    pub background: Color,
    /// Paint the letterbox margins with the background after drawing
    pub cover_margins: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            logical_width: LOGICAL_WIDTH,
            logical_height: LOGICAL_HEIGHT,
            max_frame_ms: MAX_FRAME_MS,
            fallback_frame_ms: FALLBACK_FRAME_MS,
            background: Color::BLACK,
            cover_margins: true,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> RadiusResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RadiusResult<()> {
        if !(self.logical_width > 0.0 && self.logical_height > 0.0) {
            return Err(RadiusError::config(format!(
                "logical size must be positive, got {}x{}",
                self.logical_width, self.logical_height
            )));
        }
        if self.fallback_frame_ms > self.max_frame_ms {
            return Err(RadiusError::config(format!(
                "fallback_frame_ms ({}) exceeds max_frame_ms ({})",
                self.fallback_frame_ms, self.max_frame_ms
            )));
        }
        Ok(())
    }

    pub fn logical_size(&self) -> Vec2 {
        Vec2::new(self.logical_width, self.logical_height)
    }

    /// Substitute the fallback for deltas from a suspended host
    pub fn clamp_delta(&self, ms: f32) -> f32 {
        if ms > self.max_frame_ms {
            self.fallback_frame_ms
        } else {
            ms
        }
    }
}
