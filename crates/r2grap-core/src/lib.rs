//! Turns declarative vector-animation scenes into per-frame, render-ready
//! geometry: keyframe evaluation, transform resolution, path tessellation
//! and a flat render list with fixed-timestep playback.

pub mod animatable;
pub mod builder;
pub mod config;
pub mod error;
pub mod geometry;
pub mod playback;
pub mod resolver;
pub mod scene;
pub mod tessellate;
pub mod transform;

pub use animatable::{Animated, CurveKeyframe, Interpolatable, KeyframeCurve};
pub use builder::{build, FrameDraw, RePathObj, RenderList, RenderableObject, StyleData, Transforms};
pub use config::{AnimationInfo, TessellationConfig};
pub use error::{ConstructionError, Result};
pub use geometry::{DrawMode, Normalize, Normalizer, PathGeometry, PathVecContentType};
pub use playback::{render_frame, FrameClock, FrameStats, Player, RecordingBackend, RenderBackend, UploadBuffer};
pub use scene::Scene;

use r2grap_data::model::SceneDescription;

/// Validates and tessellates a scene description and builds its render list.
pub fn load(desc: &SceneDescription, config: TessellationConfig) -> Result<RenderList> {
    let scene = Scene::from_description(desc, config)?;
    Ok(build(&scene))
}
