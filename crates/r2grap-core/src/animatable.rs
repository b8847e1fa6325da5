use crate::config::AnimationInfo;
use crate::error::{ConstructionError, Result};
use glam::{Vec2, Vec3, Vec4};
use r2grap_data::model::{BezierPath, BezierTangent, Property, Value};

pub trait Interpolatable: Sized + Clone {
    fn lerp(&self, other: &Self, t: f32) -> Self;
}

impl Interpolatable for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Interpolatable for Vec2 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec2::lerp(*self, *other, t)
    }
}

impl Interpolatable for Vec3 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec3::lerp(*self, *other, t)
    }
}

impl Interpolatable for Vec4 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec4::lerp(*self, *other, t)
    }
}

impl Interpolatable for BezierPath {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        if t <= 0.0 {
            return self.clone();
        }
        if t >= 1.0 {
            return other.clone();
        }

        // Vertex correspondence is by index; surplus vertices are dropped
        let min_verts = self.v.len().min(other.v.len());
        if min_verts == 0 {
            return self.clone();
        }

        let mix = |a: [f32; 2], b: [f32; 2]| [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t];
        let tangent = |list: &[[f32; 2]], i: usize| list.get(i).copied().unwrap_or([0.0, 0.0]);

        let mut new_v = Vec::with_capacity(min_verts);
        let mut new_i = Vec::with_capacity(min_verts);
        let mut new_o = Vec::with_capacity(min_verts);
        for idx in 0..min_verts {
            new_v.push(mix(self.v[idx], other.v[idx]));
            new_i.push(mix(tangent(&self.i, idx), tangent(&other.i, idx)));
            new_o.push(mix(tangent(&self.o, idx), tangent(&other.o, idx)));
        }

        BezierPath {
            c: self.c,
            v: new_v,
            i: new_i,
            o: new_o,
        }
    }
}

/// Solves the CSS-style cubic bezier `(0,0) p1 p2 (1,1)` for `x` and
/// returns the matching `y`.
pub fn solve_cubic_bezier(p1: Vec2, p2: Vec2, x: f32) -> f32 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let bezier = |a: f32, b: f32, t: f32| {
        let one_minus_t = 1.0 - t;
        3.0 * one_minus_t * one_minus_t * t * a + 3.0 * one_minus_t * t * t * b + t * t * t
    };

    // Newton-Raphson
    let mut t = x;
    let mut converged = false;
    for _ in 0..8 {
        let err = bezier(p1.x, p2.x, t) - x;
        if err.abs() < 1e-5 {
            converged = true;
            break;
        }

        let one_minus_t = 1.0 - t;
        let dx_dt = 3.0 * one_minus_t * one_minus_t * p1.x
            + 6.0 * one_minus_t * t * (p2.x - p1.x)
            + 3.0 * t * t * (1.0 - p2.x);
        if dx_dt.abs() < 1e-6 {
            break;
        }
        t = (t - err / dx_dt).clamp(0.0, 1.0);
    }

    // Flat derivative or slow convergence: bisect, x(t) is monotonic for
    // handles inside the unit square
    if !converged {
        let (mut lo, mut hi) = (0.0f32, 1.0f32);
        t = x;
        for _ in 0..32 {
            let x_est = bezier(p1.x, p2.x, t);
            if (x_est - x).abs() < 1e-6 {
                break;
            }
            if x_est < x {
                lo = t;
            } else {
                hi = t;
            }
            t = 0.5 * (lo + hi);
        }
    }

    bezier(p1.y, p2.y, t)
}

/// One pinned sample of an animated property.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveKeyframe<T> {
    /// Seconds.
    pub time: f32,
    pub value: T,
    /// Easing handle leaving this keyframe.
    pub out_handle: Vec2,
    /// Easing handle arriving at this keyframe.
    pub in_handle: Vec2,
    pub hold: bool,
}

impl<T> CurveKeyframe<T> {
    pub const LINEAR_OUT: Vec2 = Vec2::ZERO;
    pub const LINEAR_IN: Vec2 = Vec2::ONE;

    pub fn linear(time: f32, value: T) -> Self {
        Self {
            time,
            value,
            out_handle: Self::LINEAR_OUT,
            in_handle: Self::LINEAR_IN,
            hold: false,
        }
    }

    pub fn eased(time: f32, value: T, out_handle: Vec2, in_handle: Vec2) -> Self {
        Self {
            time,
            value,
            out_handle,
            in_handle,
            hold: false,
        }
    }
}

/// An ordered, validated keyframe sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeCurve<T> {
    keyframes: Vec<CurveKeyframe<T>>,
}

impl<T: Interpolatable> KeyframeCurve<T> {
    /// Fails on empty input and on times that are not finite and strictly
    /// increasing.
    pub fn new(keyframes: Vec<CurveKeyframe<T>>) -> Result<Self> {
        if keyframes.is_empty() {
            return Err(ConstructionError::EmptyCurve);
        }
        for (index, kf) in keyframes.iter().enumerate() {
            if !kf.time.is_finite() {
                return Err(ConstructionError::NonFiniteTime {
                    index,
                    time: kf.time,
                });
            }
            if index > 0 {
                let previous = keyframes[index - 1].time;
                if kf.time <= previous {
                    return Err(ConstructionError::UnsortedKeyframes {
                        index,
                        time: kf.time,
                        previous,
                    });
                }
            }
        }
        Ok(Self { keyframes })
    }

    pub fn keyframes(&self) -> &[CurveKeyframe<T>] {
        &self.keyframes
    }

    pub fn evaluate(&self, time: f32) -> T {
        let len = self.keyframes.len();
        let first = &self.keyframes[0];
        let last = &self.keyframes[len - 1];

        if time <= first.time {
            return first.value.clone();
        }
        if time >= last.time {
            return last.value.clone();
        }

        // First keyframe strictly after `time`; the segment is [idx-1, idx]
        let idx = self.keyframes.partition_point(|kf| kf.time <= time);
        let k0 = &self.keyframes[idx - 1];
        let k1 = &self.keyframes[idx];

        let duration = k1.time - k0.time;
        if duration <= 0.0 {
            return k1.value.clone();
        }
        if k0.hold {
            return k0.value.clone();
        }

        let local_t = (time - k0.time) / duration;
        let eased = solve_cubic_bezier(k0.out_handle, k1.in_handle, local_t);
        k0.value.lerp(&k1.value, eased)
    }
}

/// A property that is either fixed for the whole timeline or keyframed.
#[derive(Debug, Clone, PartialEq)]
pub enum Animated<T> {
    Constant(T),
    Curve(KeyframeCurve<T>),
}

impl<T: Interpolatable> Animated<T> {
    pub fn value_at(&self, time: f32) -> T {
        match self {
            Animated::Constant(v) => v.clone(),
            Animated::Curve(curve) => curve.evaluate(time),
        }
    }

    pub fn is_animated(&self) -> bool {
        matches!(self, Animated::Curve(_))
    }

    /// One value per frame in `0..frame_count`.
    pub fn sample(&self, info: &AnimationInfo) -> Vec<T> {
        (0..info.frame_count())
            .map(|f| self.value_at(info.frame_time(f)))
            .collect()
    }

    /// Converts a described property, mapping each raw value with
    /// `converter`. A single keyframe collapses to a constant.
    pub fn from_property<R>(
        prop: &Property<R>,
        converter: impl Fn(&R) -> T,
        default: T,
    ) -> Result<Self> {
        match &prop.k {
            Value::Default => Ok(Animated::Constant(default)),
            Value::Static(v) => Ok(Animated::Constant(converter(v))),
            Value::Animated(keyframes) => {
                let converted = keyframes
                    .iter()
                    .map(|kf| CurveKeyframe {
                        time: kf.t,
                        value: converter(&kf.s),
                        out_handle: handle(kf.o.as_ref(), CurveKeyframe::<T>::LINEAR_OUT),
                        in_handle: handle(kf.i.as_ref(), CurveKeyframe::<T>::LINEAR_IN),
                        hold: kf.h,
                    })
                    .collect();
                let mut curve = KeyframeCurve::new(converted)?;
                if curve.keyframes.len() == 1 {
                    let only = curve.keyframes.remove(0);
                    return Ok(Animated::Constant(only.value));
                }
                Ok(Animated::Curve(curve))
            }
        }
    }
}

fn handle(tangent: Option<&BezierTangent>, default: Vec2) -> Vec2 {
    tangent.map(|t| Vec2::new(t.x, t.y)).unwrap_or(default)
}
