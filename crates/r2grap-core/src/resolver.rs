//! Flattens the layer/group hierarchy into per-path matrices and opacity.

use crate::animatable::{Animated, Interpolatable};
use crate::config::AnimationInfo;
use crate::geometry::{Normalizer, PathGeometry};
use crate::scene::{GroupNode, LayerNode, Scene, StyleSource};
use crate::transform::TransformTrack;
use glam::Mat4;
use std::sync::Arc;

/// A value over the timeline: one value for every frame, or a single
/// value shared by all of them.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameSeries<T> {
    Constant(T),
    PerFrame(Vec<T>),
}

impl<T: Clone> FrameSeries<T> {
    pub fn is_constant(&self) -> bool {
        matches!(self, FrameSeries::Constant(_))
    }

    pub fn at(&self, frame: usize) -> T {
        match self {
            FrameSeries::Constant(v) => v.clone(),
            FrameSeries::PerFrame(values) => values[frame % values.len()].clone(),
        }
    }

    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> FrameSeries<U> {
        match self {
            FrameSeries::Constant(v) => FrameSeries::Constant(f(v)),
            FrameSeries::PerFrame(values) => FrameSeries::PerFrame(values.iter().map(f).collect()),
        }
    }

    /// Pairs two series frame by frame; stays constant when both are.
    pub fn zip_with<U: Clone, R>(
        &self,
        other: &FrameSeries<U>,
        frame_count: usize,
        f: impl Fn(&T, &U) -> R,
    ) -> FrameSeries<R> {
        match (self, other) {
            (FrameSeries::Constant(a), FrameSeries::Constant(b)) => FrameSeries::Constant(f(a, b)),
            _ => FrameSeries::PerFrame(
                (0..frame_count)
                    .map(|frame| f(&self.at(frame), &other.at(frame)))
                    .collect(),
            ),
        }
    }
}

impl<T: Interpolatable> FrameSeries<T> {
    /// Samples an animated property; constants are evaluated once.
    pub fn sample(prop: &Animated<T>, info: &AnimationInfo) -> Self {
        match prop {
            Animated::Constant(v) => FrameSeries::Constant(v.clone()),
            Animated::Curve(_) => FrameSeries::PerFrame(prop.sample(info)),
        }
    }
}

/// Everything the builder needs for one leaf path.
#[derive(Debug, Clone)]
pub struct ResolvedPath {
    pub layer: usize,
    pub name: String,
    pub geometry: Arc<PathGeometry>,
    /// Normalized-space matrices.
    pub transforms: FrameSeries<Mat4>,
    /// Product of layer and group opacities.
    pub opacity: FrameSeries<f32>,
    pub fill: Option<StyleSource>,
    pub stroke: Option<StyleSource>,
    pub in_frame: f32,
    pub out_frame: f32,
}

pub struct TransformResolver<'a> {
    info: &'a AnimationInfo,
    normalizer: Normalizer,
}

impl<'a> TransformResolver<'a> {
    pub fn new(info: &'a AnimationInfo) -> Self {
        Self {
            info,
            normalizer: Normalizer::new(info),
        }
    }

    /// Resolves every visible path in authored order: layers, then groups
    /// depth-first, paths before nested groups.
    pub fn resolve(&self, scene: &Scene) -> Vec<ResolvedPath> {
        let layers = scene.layers();
        let mut world_cache: Vec<Option<FrameSeries<Mat4>>> = vec![None; layers.len()];
        let mut out = Vec::with_capacity(scene.path_count());

        for (idx, layer) in layers.iter().enumerate() {
            if layer.hidden {
                tracing::debug!(layer = %layer.name, "skipping hidden layer");
                continue;
            }
            let world = self.layer_world(layers, idx, &mut world_cache);
            let opacity = FrameSeries::sample(&layer.transform.opacity, self.info);
            let mut ctx = Walk {
                layer_idx: idx,
                layer,
                out: &mut out,
            };
            for group in &layer.groups {
                self.walk_group(group, &world, &opacity, None, None, &mut ctx);
            }
        }
        out
    }

    /// Pixel-space matrix of a layer including its parent chain.
    fn layer_world(
        &self,
        layers: &[LayerNode],
        idx: usize,
        cache: &mut [Option<FrameSeries<Mat4>>],
    ) -> FrameSeries<Mat4> {
        if let Some(cached) = &cache[idx] {
            return cached.clone();
        }
        let local = self.matrix_series(&layers[idx].transform);
        let world = match layers[idx].parent {
            Some(parent) => {
                let parent_world = self.layer_world(layers, parent, cache);
                parent_world.zip_with(&local, self.info.frame_count(), |p, l| *p * *l)
            }
            None => local,
        };
        cache[idx] = Some(world.clone());
        world
    }

    fn matrix_series(&self, track: &TransformTrack) -> FrameSeries<Mat4> {
        if track.is_matrix_animated() {
            FrameSeries::PerFrame(
                (0..self.info.frame_count())
                    .map(|frame| track.local_matrix(self.info.frame_time(frame)))
                    .collect(),
            )
        } else {
            FrameSeries::Constant(track.local_matrix(0.0))
        }
    }

    fn walk_group(
        &self,
        group: &GroupNode,
        parent: &FrameSeries<Mat4>,
        parent_opacity: &FrameSeries<f32>,
        inherited_fill: Option<&StyleSource>,
        inherited_stroke: Option<&StyleSource>,
        ctx: &mut Walk<'_>,
    ) {
        let frame_count = self.info.frame_count();
        let fill = group.fill.as_ref().or(inherited_fill);
        let stroke = group.stroke.as_ref().or(inherited_stroke);

        let opacity = parent_opacity.zip_with(
            &FrameSeries::sample(&group.transform.opacity, self.info),
            frame_count,
            |a, b| a * b,
        );

        // T(position) * R * S * T(-anchor) on top of the parent
        let world = parent.zip_with(
            &self.matrix_series(&group.transform),
            frame_count,
            |p, l| *p * *l,
        );

        // Own paths already carry the constant position in their vertices
        let baked = group.baked_position();
        let normalized =
            world.map(|m| self.normalizer.conjugate(*m * Mat4::from_translation(-baked)));

        for path in &group.paths {
            ctx.out.push(ResolvedPath {
                layer: ctx.layer_idx,
                name: path.name.clone(),
                geometry: Arc::clone(&path.geometry),
                transforms: normalized.clone(),
                opacity: opacity.clone(),
                fill: fill.cloned(),
                stroke: stroke.cloned(),
                in_frame: ctx.layer.in_frame,
                out_frame: ctx.layer.out_frame,
            });
        }

        for child in &group.children {
            self.walk_group(child, &world, &opacity, fill, stroke, ctx);
        }
    }
}

struct Walk<'s> {
    layer_idx: usize,
    layer: &'s LayerNode,
    out: &'s mut Vec<ResolvedPath>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TessellationConfig;
    use glam::Vec3;
    use r2grap_data::model::SceneDescription;
    use serde_json::json;

    fn scene(layers: serde_json::Value) -> Scene {
        let desc: SceneDescription = serde_json::from_value(json!({
            "width": 100.0,
            "height": 100.0,
            "frame_rate": 10.0,
            "duration": 1.0,
            "layers": layers
        }))
        .unwrap();
        Scene::from_description(&desc, TessellationConfig::default()).unwrap()
    }

    fn triangle() -> serde_json::Value {
        json!({ "shape": { "k": { "c": true, "v": [[0, 0], [10, 0], [0, 10]] } } })
    }

    #[test]
    fn test_frame_series_zip() {
        let a = FrameSeries::Constant(2.0f32);
        let b = FrameSeries::Constant(3.0f32);
        assert_eq!(a.zip_with(&b, 4, |x, y| x * y), FrameSeries::Constant(6.0));

        let c = FrameSeries::PerFrame(vec![1.0f32, 2.0]);
        assert_eq!(
            a.zip_with(&c, 2, |x, y| x * y),
            FrameSeries::PerFrame(vec![2.0, 4.0])
        );
        assert_eq!(c.at(3), 2.0);
    }

    #[test]
    fn test_constant_chain_resolves_once() {
        let scene = scene(json!([
            {
                "transform": { "position": { "k": [10, 10] }, "rotation": { "k": 45 } },
                "groups": [ { "transform": { "scale": { "k": [50, 50] } }, "paths": [ triangle() ] } ]
            }
        ]));
        let resolved = TransformResolver::new(scene.info()).resolve(&scene);
        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].transforms.is_constant());
        assert!(resolved[0].opacity.is_constant());
    }

    #[test]
    fn test_keyframed_ancestor_makes_matrices_per_frame() {
        let scene = scene(json!([
            {
                "ind": 1,
                "transform": {
                    "position": { "k": [ { "t": 0.0, "s": [0, 0] }, { "t": 1.0, "s": [100, 0] } ] }
                }
            },
            {
                "parent": 1,
                "groups": [ { "paths": [ triangle() ] } ]
            }
        ]));
        let resolved = TransformResolver::new(scene.info()).resolve(&scene);
        assert_eq!(resolved.len(), 1);
        match &resolved[0].transforms {
            FrameSeries::PerFrame(m) => {
                assert_eq!(m.len(), 10);
                // Frame 5 = 0.5s: parent moved 50px = 0.5 normalized units
                let moved = m[5].transform_point3(Vec3::ZERO);
                assert!((moved.x - 0.5).abs() < 1e-3, "got {moved:?}");
            }
            other => panic!("expected per-frame matrices, got {other:?}"),
        }
    }

    #[test]
    fn test_opacity_multiplies_down_the_tree() {
        let scene = scene(json!([
            {
                "transform": { "opacity": { "k": 50 } },
                "groups": [
                    {
                        "transform": { "opacity": { "k": 50 } },
                        "groups": [ { "paths": [ triangle() ] } ]
                    }
                ]
            }
        ]));
        let resolved = TransformResolver::new(scene.info()).resolve(&scene);
        assert_eq!(resolved[0].opacity, FrameSeries::Constant(0.25));
    }

    #[test]
    fn test_nested_group_receives_parent_group_position() {
        let scene = scene(json!([
            {
                "groups": [
                    {
                        "transform": { "position": { "k": [20, 0] } },
                        "groups": [ { "paths": [ triangle() ] } ]
                    }
                ]
            }
        ]));
        let resolved = TransformResolver::new(scene.info()).resolve(&scene);
        let m = resolved[0].transforms.at(0);
        let moved = m.transform_point3(Vec3::ZERO);
        assert!((moved.x - 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_animated_group_position_stays_in_matrix() {
        let scene = scene(json!([
            {
                "groups": [
                    {
                        "transform": {
                            "position": { "k": [ { "t": 0.0, "s": [0, 0] }, { "t": 0.9, "s": [90, 0] } ] }
                        },
                        "paths": [ triangle() ]
                    }
                ]
            }
        ]));
        let resolved = TransformResolver::new(scene.info()).resolve(&scene);
        // Vertices are not offset; the first vertex (0,0) normalizes to -0.5
        assert!((resolved[0].geometry.vertices(0)[0] + 0.5).abs() < 1e-6);
        let last = resolved[0].transforms.at(9).transform_point3(Vec3::ZERO);
        assert!((last.x - 0.9).abs() < 1e-3);
    }

    fn placed(path: &ResolvedPath, frame: usize, vertex: usize) -> Vec3 {
        let v = &path.geometry.vertices(frame)[vertex * 3..vertex * 3 + 3];
        path.transforms
            .at(frame)
            .transform_point3(Vec3::new(v[0], v[1], v[2]))
    }

    #[test]
    fn test_group_position_is_applied_after_rotation() {
        let line = json!({ "shape": { "k": { "c": false, "v": [[0, 0], [10, 0]] } } });
        let scene = scene(json!([
            {
                "groups": [
                    {
                        "transform": { "position": { "k": [20, 0] }, "rotation": { "k": 90 } },
                        "paths": [ line.clone() ],
                        "groups": [ { "paths": [ line ] } ]
                    }
                ]
            }
        ]));
        let resolved = TransformResolver::new(scene.info()).resolve(&scene);
        assert_eq!(resolved.len(), 2);
        for path in &resolved {
            // (0,0) lands on the group position: pixel (20,0)
            assert!((placed(path, 0, 0) - Vec3::new(-0.3, -0.5, 0.0)).length() < 1e-5);
            // (10,0) turns clockwise to (0,-10), then moves: pixel (20,-10)
            assert!((placed(path, 0, 1) - Vec3::new(-0.3, -0.6, 0.0)).length() < 1e-5);
        }
    }

    #[test]
    fn test_animated_group_position_with_scale() {
        let scene = scene(json!([
            {
                "groups": [
                    {
                        "transform": {
                            "position": { "k": [ { "t": 0.0, "s": [0, 0] }, { "t": 0.9, "s": [90, 0] } ] },
                            "anchor": { "k": [5, 0] },
                            "scale": { "k": [200, 200] }
                        },
                        "paths": [ { "shape": { "k": { "c": false, "v": [[5, 0], [10, 0]] } } } ]
                    }
                ]
            }
        ]));
        let resolved = TransformResolver::new(scene.info()).resolve(&scene);
        // Anchor sits on the position, the second vertex is 2 * 5px further
        assert!((placed(&resolved[0], 9, 0) - Vec3::new(0.4, -0.5, 0.0)).length() < 1e-4);
        assert!((placed(&resolved[0], 9, 1) - Vec3::new(0.5, -0.5, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_fill_is_inherited_by_nested_groups() {
        let scene = scene(json!([
            {
                "groups": [
                    {
                        "fill": { "color": { "k": [0, 1, 0, 1] } },
                        "groups": [ { "paths": [ triangle() ] } ]
                    }
                ]
            }
        ]));
        let resolved = TransformResolver::new(scene.info()).resolve(&scene);
        assert!(resolved[0].fill.is_some());
        assert!(resolved[0].stroke.is_none());
    }
}
