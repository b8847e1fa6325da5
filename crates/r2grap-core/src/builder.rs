//! Pairs every visible path with its resolved transform, style and clip range.

use crate::config::AnimationInfo;
use crate::geometry::{DrawMode, PathGeometry, PathVecContentType};
use crate::resolver::{FrameSeries, ResolvedPath, TransformResolver};
use crate::scene::{Scene, StyleSource};
use glam::{Mat4, Vec4};
use std::sync::Arc;

/// Resolved paint: `color` when constant, one entry per frame in
/// `trans_color` otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleData {
    pub color: Vec4,
    pub trans_color: Vec<Vec4>,
}

impl StyleData {
    fn resolve(source: &StyleSource, node_opacity: &FrameSeries<f32>, info: &AnimationInfo) -> Self {
        let frame_count = info.frame_count();
        let color = FrameSeries::sample(&source.color, info);
        let opacity = FrameSeries::sample(&source.opacity, info).zip_with(
            node_opacity,
            frame_count,
            |a, b| a * b,
        );
        let resolved = color.zip_with(&opacity, frame_count, |c, o| {
            Vec4::new(c.x, c.y, c.z, c.w * o)
        });
        match resolved {
            FrameSeries::Constant(color) => Self {
                color,
                trans_color: Vec::new(),
            },
            FrameSeries::PerFrame(trans_color) => Self {
                color: trans_color[0],
                trans_color,
            },
        }
    }

    pub fn is_animated(&self) -> bool {
        !self.trans_color.is_empty()
    }

    pub fn at(&self, frame: usize) -> Vec4 {
        if self.trans_color.is_empty() {
            self.color
        } else {
            self.trans_color[frame % self.trans_color.len()]
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transforms {
    Constant(Mat4),
    PerFrame(Box<[Mat4]>),
}

/// One drawable path with everything a backend needs to draw any frame.
#[derive(Debug, Clone)]
pub struct RenderableObject {
    pub name: String,
    pub path: Arc<PathGeometry>,
    pub transforms: Transforms,
    pub fill: Option<StyleData>,
    pub stroke: Option<StyleData>,
    pub in_frame: f32,
    pub out_frame: f32,
    /// The matrix never changes, so backends can upload it once.
    pub keep_transform: bool,
}

pub type RePathObj = RenderableObject;

impl RenderableObject {
    fn from_resolved(resolved: ResolvedPath, info: &AnimationInfo) -> Self {
        let fill = resolved
            .fill
            .as_ref()
            .map(|s| StyleData::resolve(s, &resolved.opacity, info));
        let stroke = resolved
            .stroke
            .as_ref()
            .map(|s| StyleData::resolve(s, &resolved.opacity, info));
        let (transforms, keep_transform) = match resolved.transforms {
            FrameSeries::Constant(m) => (Transforms::Constant(m), true),
            FrameSeries::PerFrame(m) => (Transforms::PerFrame(m.into_boxed_slice()), false),
        };
        Self {
            name: resolved.name,
            path: resolved.geometry,
            transforms,
            fill,
            stroke,
            in_frame: resolved.in_frame,
            out_frame: resolved.out_frame,
            keep_transform,
        }
    }

    pub fn is_visible(&self, frame: usize) -> bool {
        let frame = frame as f32;
        self.in_frame <= frame && frame <= self.out_frame
    }

    pub fn transform_at(&self, frame: usize) -> Mat4 {
        match &self.transforms {
            Transforms::Constant(m) => *m,
            Transforms::PerFrame(m) => m[frame % m.len()],
        }
    }

    pub fn fill_color_at(&self, frame: usize) -> Option<Vec4> {
        self.fill.as_ref().map(|s| s.at(frame))
    }

    pub fn stroke_color_at(&self, frame: usize) -> Option<Vec4> {
        self.stroke.as_ref().map(|s| s.at(frame))
    }

    pub fn max_vector_size(&self, kind: PathVecContentType) -> usize {
        self.path.max_vector_size(kind)
    }
}

/// Draw parameters of one object at one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameDraw<'a> {
    /// Position of the object in [`RenderList::objects`].
    pub object: usize,
    pub transform: Mat4,
    pub fill: Option<Vec4>,
    pub stroke: Option<Vec4>,
    pub vertices: &'a [f32],
    pub indices: &'a [u32],
    pub mode: DrawMode,
    /// Geometry differs between frames and must be uploaded again.
    pub upload: bool,
}

/// The flat, ordered list of objects for a scene. Read-only once built.
#[derive(Debug, Clone)]
pub struct RenderList {
    info: AnimationInfo,
    objects: Vec<RenderableObject>,
}

impl RenderList {
    pub fn info(&self) -> &AnimationInfo {
        &self.info
    }

    pub fn objects(&self) -> &[RenderableObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Draws for frame `frame` (wrapped into the timeline) in authored
    /// order. Invisible objects and degenerate frames are skipped.
    pub fn frame(&self, frame: usize) -> Vec<FrameDraw<'_>> {
        let frame = self.info.wrap_frame(frame);
        self.objects
            .iter()
            .enumerate()
            .filter(|(_, obj)| obj.is_visible(frame) && !obj.path.is_empty_at(frame))
            .map(|(idx, obj)| FrameDraw {
                object: idx,
                transform: obj.transform_at(frame),
                fill: obj.fill_color_at(frame),
                stroke: obj.stroke_color_at(frame),
                vertices: obj.path.vertices(frame),
                indices: obj.path.triangle_indices(frame),
                mode: obj.path.draw_mode(),
                upload: obj.path.has_keyframe(),
            })
            .collect()
    }
}

/// Builds the render list for a scene. Runs once per scene load.
pub fn build(scene: &Scene) -> RenderList {
    let info = *scene.info();
    let objects: Vec<_> = TransformResolver::new(&info)
        .resolve(scene)
        .into_iter()
        .map(|resolved| RenderableObject::from_resolved(resolved, &info))
        .collect();

    tracing::info!(
        objects = objects.len(),
        animated = objects.iter().filter(|o| !o.keep_transform).count(),
        "render list built"
    );
    RenderList { info, objects }
}
