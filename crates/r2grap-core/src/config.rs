use crate::error::{ConstructionError, Result};
use r2grap_data::model::SceneDescription;
use serde::{Deserialize, Serialize};

/// Canvas and timing parameters shared by every stage of the pipeline.
///
/// Passed explicitly to the tessellator, resolver and builder; it is never
/// mutated after the scene is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationInfo {
    pub width: f32,
    pub height: f32,
    pub frame_rate: f32,
    /// Duration in seconds.
    pub duration: f32,
}

impl AnimationInfo {
    pub fn new(width: f32, height: f32, frame_rate: f32, duration: f32) -> Result<Self> {
        let info = Self {
            width,
            height,
            frame_rate,
            duration,
        };
        info.validate()?;
        Ok(info)
    }

    pub fn from_description(desc: &SceneDescription) -> Result<Self> {
        Self::new(desc.width, desc.height, desc.frame_rate, desc.duration)
    }

    fn validate(&self) -> Result<()> {
        let fields = [
            ("width", self.width),
            ("height", self.height),
            ("frame rate", self.frame_rate),
            ("duration", self.duration),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConstructionError::InvalidAnimationInfo(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        if self.frame_count() == 0 {
            return Err(ConstructionError::InvalidAnimationInfo(format!(
                "duration {}s at {} fps yields no frames",
                self.duration, self.frame_rate
            )));
        }
        Ok(())
    }

    /// `duration * frame_rate`, rounded to the nearest whole frame.
    pub fn frame_count(&self) -> usize {
        (self.duration * self.frame_rate).round() as usize
    }

    /// Time in seconds at which frame `frame` is sampled.
    pub fn frame_time(&self, frame: usize) -> f32 {
        frame as f32 / self.frame_rate
    }

    /// Maps any frame index into `[0, frame_count)`, looping.
    pub fn wrap_frame(&self, frame: usize) -> usize {
        frame % self.frame_count().max(1)
    }

    pub fn last_frame(&self) -> usize {
        self.frame_count().saturating_sub(1)
    }
}

/// Controls how bezier segments are flattened into line segments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TessellationConfig {
    /// Maximum distance, in canvas pixels, between a curve and its polyline.
    pub tolerance: f64,
}

impl Default for TessellationConfig {
    fn default() -> Self {
        Self { tolerance: 0.25 }
    }
}
