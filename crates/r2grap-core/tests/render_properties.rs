//! End-to-end checks of the load -> render list -> frame pipeline.
//!
//! Run with: cargo test -p r2grap-core --test render_properties

use glam::{Mat4, Vec3};
use r2grap_core::{
    load, ConstructionError, DrawMode, FrameClock, PathVecContentType, RenderList,
    TessellationConfig,
};
use r2grap_data::model::SceneDescription;
use serde_json::json;

fn scene(frame_rate: f32, duration: f32, layers: serde_json::Value) -> SceneDescription {
    serde_json::from_value(json!({
        "name": "Test",
        "width": 100.0,
        "height": 100.0,
        "frame_rate": frame_rate,
        "duration": duration,
        "layers": layers
    }))
    .expect("Failed to parse test scene")
}

fn render_list(frame_rate: f32, duration: f32, layers: serde_json::Value) -> RenderList {
    load(&scene(frame_rate, duration, layers), TessellationConfig::default())
        .expect("Failed to load test scene")
}

fn triangle_path() -> serde_json::Value {
    json!({ "shape": { "k": { "c": true, "v": [[0, 0], [10, 0], [0, 10]] } } })
}

fn origin_after(m: Mat4) -> Vec3 {
    m.transform_point3(Vec3::ZERO)
}

mod keyframes {
    use super::*;

    #[test]
    fn test_boundaries_clamp_to_first_and_last_value() {
        let list = render_list(
            10.0,
            2.0,
            json!([
                {
                    "transform": {
                        "position": { "k": [ { "t": 0.5, "s": [0, 0] }, { "t": 1.0, "s": [100, 0] } ] }
                    },
                    "groups": [ { "paths": [ triangle_path() ] } ]
                }
            ]),
        );
        let obj = &list.objects()[0];
        assert!(!obj.keep_transform);
        // Before the first keyframe
        assert!(origin_after(obj.transform_at(0)).x.abs() < 1e-5);
        assert!(origin_after(obj.transform_at(5)).x.abs() < 1e-5);
        // At and after the last keyframe: 100px = 1.0 normalized units
        assert!((origin_after(obj.transform_at(10)).x - 1.0).abs() < 1e-4);
        assert!((origin_after(obj.transform_at(19)).x - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_linear_handles_interpolate_monotonically() {
        let list = render_list(
            30.0,
            1.0,
            json!([
                {
                    "transform": {
                        "opacity": {
                            "k": [
                                { "t": 0.0, "s": 0, "o": { "x": 0, "y": 0 } },
                                { "t": 1.0, "s": 100, "i": { "x": 1, "y": 1 } }
                            ]
                        }
                    },
                    "groups": [
                        { "paths": [ triangle_path() ], "fill": { "color": { "k": [1, 1, 1, 1] } } }
                    ]
                }
            ]),
        );
        let fill = list.objects()[0].fill.as_ref().expect("fill");
        assert_eq!(fill.trans_color.len(), 30);
        for pair in fill.trans_color.windows(2) {
            assert!(pair[1].w >= pair[0].w);
        }
        // Frame 15 = 0.5s: halfway under linear easing
        assert!((fill.trans_color[15].w - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_eased_midpoint_differs_from_linear() {
        let list = render_list(
            10.0,
            1.0,
            json!([
                {
                    "transform": {
                        "position": {
                            "k": [
                                { "t": 0.0, "s": [0, 0], "o": { "x": 0.42, "y": 0 } },
                                { "t": 1.0, "s": [100, 0], "i": { "x": 0.58, "y": 1 } }
                            ]
                        }
                    },
                    "groups": [ { "paths": [ triangle_path() ] } ]
                }
            ]),
        );
        let obj = &list.objects()[0];
        // Ease-in-out is symmetric: the midpoint still lands halfway
        assert!((origin_after(obj.transform_at(5)).x - 0.5).abs() < 1e-3);
        // but the first step is slower than linear
        assert!(origin_after(obj.transform_at(1)).x < 0.1);
    }
}

mod transforms {
    use super::*;

    #[test]
    fn test_constant_chain_keeps_transform() {
        let list = render_list(
            30.0,
            1.0,
            json!([
                {
                    "transform": {
                        "anchor": { "k": [5, 5] },
                        "position": { "k": [50, 50] },
                        "scale": { "k": [150, 150] },
                        "rotation": { "k": 30 }
                    },
                    "groups": [
                        {
                            "transform": { "rotation": { "k": 15 } },
                            "paths": [ triangle_path() ]
                        }
                    ]
                }
            ]),
        );
        let obj = &list.objects()[0];
        assert!(obj.keep_transform);
        let first = obj.transform_at(0);
        for frame in 1..30 {
            assert_eq!(obj.transform_at(frame), first);
        }
    }

    fn drawn_vertex(list: &RenderList, frame: usize, object: usize, vertex: usize) -> Vec3 {
        let draw = list
            .frame(frame)
            .into_iter()
            .find(|d| d.object == object)
            .expect("object is drawn");
        let v = &draw.vertices[vertex * 3..vertex * 3 + 3];
        draw.transform.transform_point3(Vec3::new(v[0], v[1], v[2]))
    }

    #[test]
    fn test_group_translation_and_rotation_place_own_and_nested_paths() {
        let line = json!({ "shape": { "k": { "c": false, "v": [[0, 0], [10, 0]] } } });
        let list = render_list(
            10.0,
            1.0,
            json!([
                {
                    "groups": [
                        {
                            "transform": { "position": { "k": [20, 0] }, "rotation": { "k": 90 } },
                            "paths": [ line.clone() ],
                            "groups": [
                                {
                                    "transform": { "position": { "k": [0, 10] } },
                                    "paths": [ line ]
                                }
                            ]
                        }
                    ]
                }
            ]),
        );
        // Own path: (0,0) -> (20,0), (10,0) -> (20,-10)
        assert!((drawn_vertex(&list, 0, 0, 0) - Vec3::new(-0.3, -0.5, 0.0)).length() < 1e-5);
        assert!((drawn_vertex(&list, 0, 0, 1) - Vec3::new(-0.3, -0.6, 0.0)).length() < 1e-5);
        // Nested path offset (0,10) inside the rotated group: (0,10) -> (10,0) + (20,0)
        assert!((drawn_vertex(&list, 0, 1, 0) - Vec3::new(-0.2, -0.5, 0.0)).length() < 1e-5);
        assert!((drawn_vertex(&list, 0, 1, 1) - Vec3::new(-0.2, -0.6, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_layer_scale_with_animated_group_rotation() {
        let list = render_list(
            10.0,
            1.0,
            json!([
                {
                    "transform": { "position": { "k": [50, 50] }, "scale": { "k": [200, 200] } },
                    "groups": [
                        {
                            "transform": {
                                "position": { "k": [5, 0] },
                                "rotation": { "k": [ { "t": 0.0, "s": 0 }, { "t": 0.5, "s": 180 } ] }
                            },
                            "paths": [ { "shape": { "k": { "c": false, "v": [[0, 0], [10, 0]] } } } ]
                        }
                    ]
                }
            ]),
        );
        assert!(!list.objects()[0].keep_transform);
        // Frame 0: (10,0) -> group (15,0) -> layer 2x + (50,50) = (80,50)
        assert!((drawn_vertex(&list, 0, 0, 1) - Vec3::new(0.3, 0.0, 0.0)).length() < 1e-4);
        // Frame 5: half turn, (10,0) -> (-10,0) + (5,0) = (-5,0) -> (40,50)
        assert!((drawn_vertex(&list, 5, 0, 1) - Vec3::new(-0.1, 0.0, 0.0)).length() < 1e-4);
        // The group origin stays put: (0,0) -> (5,0) -> (60,50)
        assert!((drawn_vertex(&list, 5, 0, 0) - Vec3::new(0.1, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_child_layer_follows_parent_transform_only() {
        let list = render_list(
            10.0,
            1.0,
            json!([
                {
                    "ind": 1,
                    "hidden": true,
                    "transform": {
                        "position": { "k": [30, 0] },
                        "opacity": { "k": 0 }
                    }
                },
                {
                    "parent": 1,
                    "groups": [
                        { "paths": [ triangle_path() ], "fill": { "color": { "k": [0, 0, 0, 1] } } }
                    ]
                }
            ]),
        );
        // The hidden parent draws nothing itself
        assert_eq!(list.len(), 1);
        let obj = &list.objects()[0];
        assert!((origin_after(obj.transform_at(0)).x - 0.3).abs() < 1e-5);
        assert_eq!(obj.fill_color_at(0).expect("fill").w, 1.0);
    }
}

mod visibility {
    use super::*;

    #[test]
    fn test_clip_window_is_inclusive() {
        let list = render_list(
            30.0,
            1.0,
            json!([
                { "in_frame": 5, "out_frame": 10, "groups": [ { "paths": [ triangle_path() ] } ] }
            ]),
        );
        let obj = &list.objects()[0];
        assert!(!obj.is_visible(4));
        assert!(!obj.is_visible(11));
        for frame in 5..=10 {
            assert!(obj.is_visible(frame), "frame {frame} should be visible");
            assert_eq!(list.frame(frame).len(), 1);
        }
        assert!(list.frame(4).is_empty());
        assert!(list.frame(11).is_empty());
    }

    #[test]
    fn test_playback_loops_after_last_frame() {
        let list = render_list(30.0, 1.0, json!([ { "groups": [ { "paths": [ triangle_path() ] } ] } ]));
        assert_eq!(list.info().frame_count(), 30);

        let mut clock = FrameClock::new(list.info());
        let mut frames = Vec::new();
        for _ in 0..31 {
            frames.push(clock.current());
            clock.advance();
        }
        assert_eq!(frames[29], 29);
        assert_eq!(frames[30], 0);

        // Out-of-range queries wrap
        assert_eq!(list.frame(30).len(), list.frame(0).len());
    }
}

mod geometry {
    use super::*;

    #[test]
    fn test_static_triangle_round_trip() {
        let list = render_list(
            30.0,
            1.0,
            json!([
                {
                    "groups": [
                        {
                            "paths": [
                                {
                                    "shape": { "k": { "c": true, "v": [[10, 10], [90, 10], [50, 90]] } },
                                    "triangles": [0, 1, 2]
                                }
                            ]
                        }
                    ]
                }
            ]),
        );
        let draws = list.frame(0);
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].vertices.len(), 9);
        assert_eq!(draws[0].indices, &[0, 1, 2]);
        assert_eq!(draws[0].mode, DrawMode::IndexedTriangles);
        assert!(!draws[0].upload);
        // (10,10) on a 100x100 canvas
        assert!((draws[0].vertices[0] + 0.4).abs() < 1e-6);
        assert!((draws[0].vertices[1] + 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_keyframed_max_vector_size() {
        let list = render_list(
            10.0,
            0.3,
            json!([
                {
                    "groups": [
                        {
                            "paths": [
                                {
                                    "shape": {
                                        "k": [
                                            {
                                                "t": 0.0, "h": true,
                                                "s": { "c": false, "v": [[0, 0], [10, 0], [20, 0], [30, 0]] }
                                            },
                                            {
                                                "t": 0.1, "h": true,
                                                "s": { "c": false, "v": [[0, 0], [10, 0], [20, 0], [30, 0], [40, 0], [50, 0], [60, 0]] }
                                            },
                                            {
                                                "t": 0.2,
                                                "s": { "c": false, "v": [[0, 0], [10, 0], [20, 0], [30, 0], [40, 0]] }
                                            }
                                        ]
                                    }
                                }
                            ]
                        }
                    ]
                }
            ]),
        );
        let obj = &list.objects()[0];
        let counts: Vec<_> = (0..3).map(|f| obj.path.vertex_count(f)).collect();
        assert_eq!(counts, [4, 7, 5]);
        assert_eq!(obj.max_vector_size(PathVecContentType::Vertices), 7);
        assert_eq!(obj.max_vector_size(PathVecContentType::TriangleIndex), 0);

        let draws = list.frame(1);
        assert!(draws[0].upload);
        assert_eq!(draws[0].mode, DrawMode::LineStrip);
        assert_eq!(draws[0].vertices.len(), 21);
    }

    #[test]
    fn test_degenerate_closed_frame_draws_nothing() {
        let list = render_list(
            10.0,
            1.0,
            json!([
                {
                    "groups": [
                        { "paths": [ { "shape": { "k": { "c": true, "v": [[0, 0], [10, 10]] } } } ] }
                    ]
                }
            ]),
        );
        assert_eq!(list.len(), 1);
        assert!(list.frame(0).is_empty());
    }

    #[test]
    fn test_out_of_range_triangulation_is_rejected() {
        let desc = scene(
            10.0,
            1.0,
            json!([
                {
                    "name": "shapes",
                    "groups": [
                        {
                            "paths": [
                                {
                                    "name": "tri",
                                    "shape": { "k": { "c": true, "v": [[0, 0], [10, 0], [0, 10]] } },
                                    "triangles": [0, 1, 3]
                                }
                            ]
                        }
                    ]
                }
            ]),
        );
        let err = load(&desc, TessellationConfig::default()).unwrap_err();
        assert_eq!(
            err.root_cause(),
            &ConstructionError::TriangleIndexOutOfRange {
                index: 3,
                vertex_count: 3
            }
        );
        let message = err.to_string();
        assert!(message.contains("shapes"), "{message}");
    }
}

mod demo {
    use super::*;
    use r2grap_core::{Player, RecordingBackend};

    #[test]
    fn test_pulse_demo_plays_a_full_loop() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();

        let desc: SceneDescription =
            serde_json::from_str(include_str!("../../../demos/pulse.json")).expect("demo parses");
        let list = load(&desc, TessellationConfig::default()).expect("demo loads");
        // The hidden rig only drives its child
        let names: Vec<_> = list.objects().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["outline", "morph", "group/path 0"]);

        let frame_count = list.info().frame_count();
        assert_eq!(frame_count, 60);
        let mut player = Player::new(list, RecordingBackend::new());
        player.tick(2.0);
        assert_eq!(player.frames_rendered(), 60);

        let frames = player.backend().frames();
        // Outside the blob's window: the square and the baseline
        assert_eq!(frames[0].draws, 2);
        assert_eq!(frames[0].uploads, 0);
        assert_eq!(frames[20].draws, 3);
        assert_eq!(frames[20].uploads, 1);
    }
}
