use crate::animatable::Animated;
use crate::error::Result;
use glam::{Mat4, Vec3};
use r2grap_data::model as data;

/// Position, anchor, scale, rotation and opacity of one scene node.
///
/// Values are stored in engine units: scale as a factor, rotation in
/// radians, opacity in `0..=1`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformTrack {
    pub anchor: Animated<Vec3>,
    pub position: Animated<Vec3>,
    pub scale: Animated<Vec3>,
    pub rotation: Animated<f32>,
    pub opacity: Animated<f32>,
}

impl Default for TransformTrack {
    fn default() -> Self {
        Self {
            anchor: Animated::Constant(Vec3::ZERO),
            position: Animated::Constant(Vec3::ZERO),
            scale: Animated::Constant(Vec3::ONE),
            rotation: Animated::Constant(0.0),
            opacity: Animated::Constant(1.0),
        }
    }
}

impl TransformTrack {
    pub fn from_data(ks: &data::Transform) -> Result<Self> {
        Ok(Self {
            anchor: Animated::from_property(&ks.anchor, |v| Vec3::from(v.0), Vec3::ZERO)?,
            position: Animated::from_property(&ks.position, |v| Vec3::from(v.0), Vec3::ZERO)?,
            scale: Animated::from_property(&ks.scale, |v| Vec3::from(v.0) / 100.0, Vec3::ONE)?,
            rotation: Animated::from_property(&ks.rotation, |v| v.to_radians(), 0.0)?,
            opacity: Animated::from_property(
                &ks.opacity,
                |v| (*v / 100.0).clamp(0.0, 1.0),
                1.0,
            )?,
        })
    }

    /// Full local matrix: `T(position) * R * S * T(-anchor)`.
    pub fn local_matrix(&self, time: f32) -> Mat4 {
        let anchor = self.anchor.value_at(time);
        let position = self.position.value_at(time);
        Mat4::from_translation(position) * self.rotate_scale(time) * Mat4::from_translation(-anchor)
    }

    fn rotate_scale(&self, time: f32) -> Mat4 {
        let rotation = self.rotation.value_at(time);
        let scale = self.scale.value_at(time);
        // Rotation is clockwise on a y-down canvas
        Mat4::from_rotation_z(-rotation) * Mat4::from_scale(scale)
    }

    /// Opacity never feeds the matrix.
    pub fn is_matrix_animated(&self) -> bool {
        self.anchor.is_animated()
            || self.position.is_animated()
            || self.scale.is_animated()
            || self.rotation.is_animated()
    }
}
