//! Frame pacing and the draw-side contract.

use crate::builder::{FrameDraw, RenderList, RenderableObject};
use crate::config::AnimationInfo;
use crate::geometry::{DrawMode, PathVecContentType, VERTEX_STRIDE};
use serde::Serialize;

/// Fixed-timestep frame clock. Elapsed time is accumulated in frame units
/// and every whole unit advances the frame index once, wrapping to 0 after
/// the last frame.
#[derive(Debug, Clone)]
pub struct FrameClock {
    frame_rate: f32,
    frame_count: usize,
    current: usize,
    accumulator: f32,
}

impl FrameClock {
    pub fn new(info: &AnimationInfo) -> Self {
        Self {
            frame_rate: info.frame_rate,
            frame_count: info.frame_count(),
            current: 0,
            accumulator: 0.0,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Steps one frame, looping at the end of the timeline.
    pub fn advance(&mut self) -> usize {
        self.current = (self.current + 1) % self.frame_count;
        self.current
    }

    /// Adds `dt` seconds and calls `on_frame` with the current frame before
    /// each advance. Returns the number of advances.
    pub fn tick(&mut self, dt: f32, mut on_frame: impl FnMut(usize)) -> usize {
        if !dt.is_finite() || dt < 0.0 {
            tracing::debug!(dt, "ignoring invalid time step");
            return 0;
        }
        self.accumulator += dt * self.frame_rate;
        let mut advances = 0;
        while self.accumulator >= 1.0 {
            on_frame(self.current);
            self.advance();
            self.accumulator -= 1.0;
            advances += 1;
        }
        advances
    }
}

/// Anything that can draw a [`RenderList`].
pub trait RenderBackend {
    /// Called once with every object before the first frame.
    fn prepare(&mut self, objects: &[RenderableObject]);

    fn begin_frame(&mut self, _frame: usize) {}

    fn draw(&mut self, draw: &FrameDraw<'_>);

    fn end_frame(&mut self, _frame: usize) {}
}

/// Persistent staging storage for one object, sized once from the largest
/// frame and overwritten in place.
#[derive(Debug, Clone, Default)]
pub struct UploadBuffer {
    vertices: Vec<f32>,
    indices: Vec<u32>,
    vertex_len: usize,
    index_len: usize,
}

impl UploadBuffer {
    pub fn for_object(object: &RenderableObject) -> Self {
        let vertex_capacity = object.max_vector_size(PathVecContentType::Vertices) * VERTEX_STRIDE;
        let index_capacity = object.max_vector_size(PathVecContentType::TriangleIndex);
        Self {
            vertices: vec![0.0; vertex_capacity],
            indices: vec![0; index_capacity],
            vertex_len: 0,
            index_len: 0,
        }
    }

    pub fn vertex_capacity(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_capacity(&self) -> usize {
        self.indices.len()
    }

    pub fn write(&mut self, vertices: &[f32], indices: &[u32]) {
        if vertices.len() > self.vertices.len() || indices.len() > self.indices.len() {
            debug_assert!(
                false,
                "upload of {} floats / {} indices exceeds capacity {} / {}",
                vertices.len(),
                indices.len(),
                self.vertices.len(),
                self.indices.len()
            );
            tracing::warn!(
                vertices = vertices.len(),
                indices = indices.len(),
                "upload exceeds buffer capacity, growing"
            );
            self.vertices.resize(self.vertices.len().max(vertices.len()), 0.0);
            self.indices.resize(self.indices.len().max(indices.len()), 0);
        }
        self.vertices[..vertices.len()].copy_from_slice(vertices);
        self.indices[..indices.len()].copy_from_slice(indices);
        self.vertex_len = vertices.len();
        self.index_len = indices.len();
    }

    pub fn vertices(&self) -> &[f32] {
        &self.vertices[..self.vertex_len]
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices[..self.index_len]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub frame: usize,
    pub draws: usize,
    pub triangles: usize,
    pub line_vertices: usize,
    pub uploads: usize,
}

/// Backend that keeps staging buffers and per-frame statistics instead of
/// talking to a GPU.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    buffers: Vec<UploadBuffer>,
    frames: Vec<FrameStats>,
    current: Option<FrameStats>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffers(&self) -> &[UploadBuffer] {
        &self.buffers
    }

    pub fn frames(&self) -> &[FrameStats] {
        &self.frames
    }
}

impl RenderBackend for RecordingBackend {
    fn prepare(&mut self, objects: &[RenderableObject]) {
        self.buffers = objects
            .iter()
            .map(|object| {
                let mut buffer = UploadBuffer::for_object(object);
                if !object.path.has_keyframe() {
                    buffer.write(object.path.vertices(0), object.path.triangle_indices(0));
                }
                buffer
            })
            .collect();
    }

    fn begin_frame(&mut self, frame: usize) {
        self.current = Some(FrameStats {
            frame,
            ..Default::default()
        });
    }

    fn draw(&mut self, draw: &FrameDraw<'_>) {
        let stats = self.current.get_or_insert_with(FrameStats::default);
        if draw.upload {
            if let Some(buffer) = self.buffers.get_mut(draw.object) {
                buffer.write(draw.vertices, draw.indices);
            }
            stats.uploads += 1;
        }
        stats.draws += 1;
        match draw.mode {
            DrawMode::IndexedTriangles => stats.triangles += draw.indices.len() / 3,
            DrawMode::LineStrip => stats.line_vertices += draw.vertices.len() / VERTEX_STRIDE,
        }
    }

    fn end_frame(&mut self, _frame: usize) {
        if let Some(stats) = self.current.take() {
            self.frames.push(stats);
        }
    }
}

/// Issues the draws of one frame to a backend. Returns the draw count.
pub fn render_frame<B: RenderBackend + ?Sized>(list: &RenderList, frame: usize, backend: &mut B) -> usize {
    let frame = list.info().wrap_frame(frame);
    backend.begin_frame(frame);
    let draws = list.frame(frame);
    for draw in &draws {
        backend.draw(draw);
    }
    backend.end_frame(frame);
    draws.len()
}

/// A render list driven by a [`FrameClock`].
pub struct Player<B> {
    list: RenderList,
    clock: FrameClock,
    backend: B,
    rendered: usize,
}

impl<B: RenderBackend> Player<B> {
    pub fn new(list: RenderList, mut backend: B) -> Self {
        backend.prepare(list.objects());
        let clock = FrameClock::new(list.info());
        Self {
            list,
            clock,
            backend,
            rendered: 0,
        }
    }

    /// Advances by `dt` seconds, rendering every frame the clock passes.
    pub fn tick(&mut self, dt: f32) -> usize {
        let Self {
            list,
            clock,
            backend,
            rendered,
        } = self;
        clock.tick(dt, |frame| {
            render_frame(list, frame, &mut *backend);
            *rendered += 1;
        })
    }

    pub fn current_frame(&self) -> usize {
        self.clock.current()
    }

    pub fn frames_rendered(&self) -> usize {
        self.rendered
    }

    pub fn list(&self) -> &RenderList {
        &self.list
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}
