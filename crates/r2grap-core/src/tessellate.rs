//! Bezier paths to vertex/index buffers.

use crate::animatable::Animated;
use crate::config::{AnimationInfo, TessellationConfig};
use crate::error::Result;
use crate::geometry::{Normalizer, PathGeometry, VERTEX_STRIDE};
use glam::Vec2;
use kurbo::{BezPath, PathEl, Point};
use r2grap_data::model::BezierPath;

const POINT_EPSILON: f32 = 1e-6;

pub struct Tessellator<'a> {
    info: &'a AnimationInfo,
    normalizer: Normalizer,
    config: TessellationConfig,
}

impl<'a> Tessellator<'a> {
    pub fn new(info: &'a AnimationInfo, config: TessellationConfig) -> Self {
        Self {
            info,
            normalizer: Normalizer::new(info),
            config,
        }
    }

    /// Builds the render buffers for one path. `offset` is added to every
    /// control point (in pixels) before normalization.
    ///
    /// `triangles` indexes the control vertices, so it is only honored for
    /// static shapes whose flattened outline is exactly those vertices.
    /// Curved or keyframed shapes are triangulated here.
    pub fn tessellate(
        &self,
        shape: &Animated<BezierPath>,
        triangles: Option<&[u32]>,
        offset: Vec2,
    ) -> Result<PathGeometry> {
        match shape {
            Animated::Constant(path) => {
                let points = flatten(path, offset, self.config.tolerance);
                let (vertices, indices) = match triangles {
                    Some(given) if path.c && points.len() >= 3 && points.len() == path.v.len() => {
                        (self.pack(&points), given.to_vec())
                    }
                    Some(_) if path.c => {
                        tracing::warn!(
                            control_vertices = path.v.len(),
                            flattened = points.len(),
                            "precomputed triangulation does not match the flattened outline, re-triangulating"
                        );
                        self.frame_buffers(&points, path.c, 0)
                    }
                    _ => self.frame_buffers(&points, path.c, 0),
                };
                PathGeometry::new_static(vertices, indices, path.c)
            }
            Animated::Curve(curve) => {
                if triangles.is_some() {
                    tracing::warn!("ignoring precomputed triangulation on a keyframed path");
                }
                let closed = curve.keyframes()[0].value.c;
                let frame_count = self.info.frame_count();
                let mut all_vertices = Vec::with_capacity(frame_count);
                let mut all_indices = Vec::with_capacity(frame_count);
                for frame in 0..frame_count {
                    let path = curve.evaluate(self.info.frame_time(frame));
                    let points = flatten(&path, offset, self.config.tolerance);
                    let (vertices, indices) = self.frame_buffers(&points, closed, frame);
                    all_vertices.push(vertices);
                    all_indices.push(indices);
                }
                PathGeometry::new_animated(all_vertices, all_indices, closed, frame_count)
            }
        }
    }

    fn frame_buffers(&self, points: &[Vec2], closed: bool, frame: usize) -> (Vec<f32>, Vec<u32>) {
        if !closed {
            return (self.pack(points), Vec::new());
        }
        if points.len() < 3 {
            tracing::debug!(
                frame,
                vertices = points.len(),
                "closed path has fewer than 3 vertices, frame draws nothing"
            );
            return (Vec::new(), Vec::new());
        }
        (self.pack(points), triangulate(points))
    }

    fn pack(&self, points: &[Vec2]) -> Vec<f32> {
        let mut out = Vec::with_capacity(points.len() * VERTEX_STRIDE);
        for p in points {
            let n = self.normalizer.apply(*p);
            out.extend_from_slice(&[n.x, n.y, 0.0]);
        }
        out
    }
}

pub fn to_bez_path(path: &BezierPath, offset: Vec2) -> BezPath {
    let mut bp = BezPath::new();
    if path.v.is_empty() {
        return bp;
    }
    let point = |v: [f32; 2]| Point::new((v[0] + offset.x) as f64, (v[1] + offset.y) as f64);
    let tangent = |list: &[[f32; 2]], idx: usize| list.get(idx).copied().unwrap_or([0.0, 0.0]);
    let is_zero = |t: [f32; 2]| t[0] == 0.0 && t[1] == 0.0;

    bp.move_to(point(path.v[0]));
    let count = path.v.len();
    for i in 0..count {
        let next_idx = (i + 1) % count;
        if next_idx == 0 && !path.c {
            break;
        }
        let p0 = path.v[i];
        let p1 = path.v[next_idx];
        let out = tangent(&path.o, i);
        let inc = tangent(&path.i, next_idx);

        if is_zero(out) && is_zero(inc) {
            // The closing edge of a straight polygon comes from close_path
            if next_idx != 0 {
                bp.line_to(point(p1));
            }
            continue;
        }
        bp.curve_to(
            point([p0[0] + out[0], p0[1] + out[1]]),
            point([p1[0] + inc[0], p1[1] + inc[1]]),
            point(p1),
        );
    }
    if path.c {
        bp.close_path();
    }
    bp
}

/// Flattens a bezier shape into a polyline in pixel space. Closed shapes do
/// not repeat their first point.
pub fn flatten(path: &BezierPath, offset: Vec2, tolerance: f64) -> Vec<Vec2> {
    let bez = to_bez_path(path, offset);
    let mut points: Vec<Vec2> = Vec::new();
    kurbo::flatten(bez.iter(), tolerance, |el| {
        if let PathEl::MoveTo(p) | PathEl::LineTo(p) = el {
            let next = Vec2::new(p.x as f32, p.y as f32);
            let duplicate = points
                .last()
                .map(|last| last.distance_squared(next) <= POINT_EPSILON)
                .unwrap_or(false);
            if !duplicate {
                points.push(next);
            }
        }
    });
    if path.c && points.len() > 1 {
        let first = points[0];
        if points
            .last()
            .map(|last| last.distance_squared(first) <= POINT_EPSILON)
            .unwrap_or(false)
        {
            points.pop();
        }
    }
    points
}

fn signed_area(points: &[Vec2]) -> f32 {
    let n = points.len();
    (0..n)
        .map(|i| points[i].perp_dot(points[(i + 1) % n]))
        .sum::<f32>()
        * 0.5
}

fn point_in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    let d1 = (b - a).perp_dot(p - a);
    let d2 = (c - b).perp_dot(p - b);
    let d3 = (a - c).perp_dot(p - c);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// Ear-clipping triangulation of a simple polygon, either winding.
///
/// Polygons with no area produce no triangles; self-intersecting input
/// falls back to a fan over the vertices that could not be clipped.
pub fn triangulate(points: &[Vec2]) -> Vec<u32> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }
    let area = signed_area(points);
    if area.abs() <= f32::EPSILON {
        return Vec::new();
    }
    let orientation = area.signum();

    let mut remaining: Vec<usize> = (0..n).collect();
    let mut indices = Vec::with_capacity((n - 2) * 3);
    let mut cursor = 0;
    let mut misses = 0;

    while remaining.len() > 3 {
        let m = remaining.len();
        let prev = remaining[(cursor + m - 1) % m];
        let cur = remaining[cursor % m];
        let next = remaining[(cursor + 1) % m];
        let (a, b, c) = (points[prev], points[cur], points[next]);

        let convex = (b - a).perp_dot(c - b) * orientation > 0.0;
        let is_ear = convex
            && remaining
                .iter()
                .filter(|&&idx| idx != prev && idx != cur && idx != next)
                .all(|&idx| !point_in_triangle(points[idx], a, b, c));

        if is_ear {
            indices.extend_from_slice(&[prev as u32, cur as u32, next as u32]);
            remaining.remove(cursor % m);
            cursor %= remaining.len();
            misses = 0;
        } else {
            cursor = (cursor + 1) % m;
            misses += 1;
            if misses > m {
                break;
            }
        }
    }

    for k in 1..remaining.len() - 1 {
        indices.extend_from_slice(&[
            remaining[0] as u32,
            remaining[k] as u32,
            remaining[k + 1] as u32,
        ]);
    }
    indices
}
