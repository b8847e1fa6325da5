//! Render-ready path buffers and the pixel-to-normalized coordinate mapping.

use crate::config::AnimationInfo;
use crate::error::{ConstructionError, Result};
use glam::{Mat4, Vec2, Vec3};

/// Floats per vertex in every vertex buffer.
pub const VERTEX_STRIDE: usize = 3;

/// Maps canvas pixels into the centered unit space: `(coord - dim/2) / dim`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    width: f32,
    height: f32,
}

/// Dimension-generic normalization, resolved at compile time.
pub trait Normalize: Copy {
    fn normalize(self, normalizer: &Normalizer) -> Self;
}

impl Normalize for Vec2 {
    fn normalize(self, n: &Normalizer) -> Self {
        Vec2::new(
            (self.x - n.width / 2.0) / n.width,
            (self.y - n.height / 2.0) / n.height,
        )
    }
}

impl Normalize for Vec3 {
    fn normalize(self, n: &Normalizer) -> Self {
        Vec3::new(
            (self.x - n.width / 2.0) / n.width,
            (self.y - n.height / 2.0) / n.height,
            0.0,
        )
    }
}

impl Normalizer {
    pub fn new(info: &AnimationInfo) -> Self {
        Self {
            width: info.width,
            height: info.height,
        }
    }

    pub fn apply<T: Normalize>(&self, point: T) -> T {
        point.normalize(self)
    }

    /// The normalization as an affine matrix (z is kept as-is).
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale(Vec3::new(1.0 / self.width, 1.0 / self.height, 1.0))
            * Mat4::from_translation(Vec3::new(-self.width / 2.0, -self.height / 2.0, 0.0))
    }

    pub fn inverse_matrix(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(self.width / 2.0, self.height / 2.0, 0.0))
            * Mat4::from_scale(Vec3::new(self.width, self.height, 1.0))
    }

    /// Re-expresses a pixel-space transform so it acts on normalized
    /// geometry: `N * m * N^-1`.
    pub fn conjugate(&self, m: Mat4) -> Mat4 {
        self.matrix() * m * self.inverse_matrix()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathVecContentType {
    Vertices,
    TriangleIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    IndexedTriangles,
    LineStrip,
}

#[derive(Debug, Clone, PartialEq)]
enum FrameData<T> {
    Static(Vec<T>),
    PerFrame(Vec<Vec<T>>),
}

impl<T> FrameData<T> {
    fn at(&self, frame: usize) -> &[T] {
        match self {
            FrameData::Static(data) => data,
            FrameData::PerFrame(frames) => {
                if frames.is_empty() {
                    return &[];
                }
                &frames[frame % frames.len()]
            }
        }
    }

    fn max_len(&self) -> usize {
        match self {
            FrameData::Static(data) => data.len(),
            FrameData::PerFrame(frames) => frames.iter().map(Vec::len).max().unwrap_or(0),
        }
    }
}

/// Vertices and triangle indices of one path, either fixed or one set per
/// frame. Vertices are packed `[x, y, z]` in normalized space.
#[derive(Debug, Clone, PartialEq)]
pub struct PathGeometry {
    vertices: FrameData<f32>,
    triangle_indices: FrameData<u32>,
    closed: bool,
}

impl PathGeometry {
    pub fn new_static(vertices: Vec<f32>, triangle_indices: Vec<u32>, closed: bool) -> Result<Self> {
        let triangle_indices = if closed { triangle_indices } else { Vec::new() };
        check_buffers(&vertices, &triangle_indices)?;
        Ok(Self {
            vertices: FrameData::Static(vertices),
            triangle_indices: FrameData::Static(triangle_indices),
            closed,
        })
    }

    /// Per-frame buffers; both sequences must hold exactly `frame_count`
    /// entries (the index sequence may be empty for open paths).
    pub fn new_animated(
        vertices: Vec<Vec<f32>>,
        triangle_indices: Vec<Vec<u32>>,
        closed: bool,
        frame_count: usize,
    ) -> Result<Self> {
        if vertices.len() != frame_count {
            return Err(ConstructionError::FrameCountMismatch {
                what: "vertex buffers",
                expected: frame_count,
                actual: vertices.len(),
            });
        }
        let triangle_indices = if closed {
            if triangle_indices.len() != frame_count {
                return Err(ConstructionError::FrameCountMismatch {
                    what: "triangle index buffers",
                    expected: frame_count,
                    actual: triangle_indices.len(),
                });
            }
            triangle_indices
        } else {
            vec![Vec::new(); frame_count]
        };
        for (verts, indices) in vertices.iter().zip(&triangle_indices) {
            check_buffers(verts, indices)?;
        }
        Ok(Self {
            vertices: FrameData::PerFrame(vertices),
            triangle_indices: FrameData::PerFrame(triangle_indices),
            closed,
        })
    }

    pub fn closed(&self) -> bool {
        self.closed
    }

    /// True when the control points themselves vary per frame.
    pub fn has_keyframe(&self) -> bool {
        matches!(self.vertices, FrameData::PerFrame(_))
    }

    pub fn draw_mode(&self) -> DrawMode {
        if self.closed {
            DrawMode::IndexedTriangles
        } else {
            DrawMode::LineStrip
        }
    }

    /// Vertex floats for `frame`; the frame index wraps for keyframed paths
    /// and is ignored for static ones.
    pub fn vertices(&self, frame: usize) -> &[f32] {
        self.vertices.at(frame)
    }

    pub fn triangle_indices(&self, frame: usize) -> &[u32] {
        self.triangle_indices.at(frame)
    }

    pub fn vertex_count(&self, frame: usize) -> usize {
        self.vertices(frame).len() / VERTEX_STRIDE
    }

    /// Largest buffer needed across all frames: vertices for
    /// [`PathVecContentType::Vertices`], indices for
    /// [`PathVecContentType::TriangleIndex`].
    pub fn max_vector_size(&self, kind: PathVecContentType) -> usize {
        match kind {
            PathVecContentType::Vertices => self.vertices.max_len() / VERTEX_STRIDE,
            PathVecContentType::TriangleIndex => self.triangle_indices.max_len(),
        }
    }

    /// A frame whose geometry draws nothing.
    pub fn is_empty_at(&self, frame: usize) -> bool {
        match self.draw_mode() {
            DrawMode::IndexedTriangles => self.triangle_indices(frame).is_empty(),
            DrawMode::LineStrip => self.vertex_count(frame) < 2,
        }
    }
}

fn check_buffers(vertices: &[f32], indices: &[u32]) -> Result<()> {
    if vertices.len() % VERTEX_STRIDE != 0 {
        return Err(ConstructionError::RaggedVertexBuffer(vertices.len()));
    }
    if indices.len() % 3 != 0 {
        return Err(ConstructionError::IncompleteTriangle(indices.len()));
    }
    let vertex_count = vertices.len() / VERTEX_STRIDE;
    if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(ConstructionError::TriangleIndexOutOfRange {
            index,
            vertex_count,
        });
    }
    Ok(())
}
