use serde::{de::DeserializeOwned, de::SeqAccess, Deserialize, Deserializer, Serialize};
use std::fmt;

/// Root of a parsed scene description.
///
/// Times inside keyframes are expressed in seconds; `in_frame`/`out_frame`
/// on layers are frame indices.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SceneDescription {
    #[serde(default)]
    pub name: Option<String>,
    pub width: f32,
    pub height: f32,
    pub frame_rate: f32,
    /// Total duration in seconds.
    pub duration: f32,
    #[serde(default)]
    pub layers: Vec<Layer>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Layer {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ind: Option<u32>,
    #[serde(default)]
    pub parent: Option<u32>,
    #[serde(default)]
    pub in_frame: f32,
    /// Last visible frame (inclusive). Defaults to the final frame of the scene.
    #[serde(default)]
    pub out_frame: Option<f32>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub transform: Transform,
    /// Global offset added to every path vertex of this layer, in pixels.
    #[serde(default)]
    pub shape_offset: Vec2,
    #[serde(default)]
    pub groups: Vec<ShapeGroup>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ShapeGroup {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub paths: Vec<PathShape>,
    #[serde(default)]
    pub groups: Vec<ShapeGroup>,
    #[serde(default)]
    pub fill: Option<FillStyle>,
    #[serde(default)]
    pub stroke: Option<StrokeStyle>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PathShape {
    #[serde(default)]
    pub name: Option<String>,
    pub shape: Property<BezierPath>,
    /// Precomputed triangulation for a static closed path.
    #[serde(default)]
    pub triangles: Option<Vec<u32>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FillStyle {
    pub color: Property<Vec4>,
    #[serde(default = "default_opacity")]
    pub opacity: Property<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StrokeStyle {
    pub color: Property<Vec4>,
    #[serde(default = "default_opacity")]
    pub opacity: Property<f32>,
}

fn default_opacity() -> Property<f32> {
    Property::fixed(100.0)
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Transform {
    #[serde(default)]
    pub anchor: Property<Vec3DefaultZero>, // Anchor: Vec3, default z=0
    #[serde(default)]
    pub position: Property<Vec3DefaultZero>, // Position: Vec3, default z=0
    #[serde(default)]
    pub scale: Property<Vec3Scale>, // Scale in percent, default 100
    #[serde(default)]
    pub rotation: Property<f32>, // Degrees, clockwise
    #[serde(default)]
    pub opacity: Property<f32>, // Percent, default 100
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Property<T> {
    #[serde(default)]
    #[serde(bound(deserialize = "T: DeserializeOwned"))]
    pub k: Value<T>,
}

impl<T> Default for Property<T> {
    fn default() -> Self {
        Property { k: Value::Default }
    }
}

impl<T> Property<T> {
    pub fn fixed(value: T) -> Self {
        Property {
            k: Value::Static(value),
        }
    }

    pub fn animated(keyframes: Vec<Keyframe<T>>) -> Self {
        Property {
            k: Value::Animated(keyframes),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub enum Value<T> {
    Default,
    Static(T),
    Animated(Vec<Keyframe<T>>),
}

impl<T> Default for Value<T> {
    fn default() -> Self {
        Value::Default
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Value<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;

        if v.is_null() {
            return Ok(Value::Default);
        }

        // A list of objects carrying a time is a keyframe list
        let looks_animated = v
            .as_array()
            .and_then(|arr| arr.first())
            .map(|first| first.get("t").is_some())
            .unwrap_or(false);
        if looks_animated {
            return serde_json::from_value::<Vec<Keyframe<T>>>(v)
                .map(Value::Animated)
                .map_err(serde::de::Error::custom);
        }

        serde_json::from_value::<T>(v)
            .map(Value::Static)
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Keyframe<T> {
    /// Time in seconds.
    pub t: f32,
    #[serde(bound(deserialize = "T: DeserializeOwned"))]
    pub s: T,
    /// In-handle of this keyframe, shaping the segment that ends here.
    #[serde(default)]
    pub i: Option<BezierTangent>,
    /// Out-handle of this keyframe, shaping the segment that starts here.
    #[serde(default)]
    pub o: Option<BezierTangent>,
    /// Hold: keep `s` until the next keyframe.
    #[serde(default)]
    pub h: bool,
}

impl<T> Keyframe<T> {
    pub fn linear(t: f32, s: T) -> Self {
        Keyframe {
            t,
            s,
            i: None,
            o: None,
            h: false,
        }
    }
}

pub type Vec2 = [f32; 2];
pub type Vec3 = [f32; 3];
pub type Vec4 = [f32; 4];

/// Bezier tangent control point for keyframe easing.
///
/// Accepts either plain numbers or single-element arrays per axis.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct BezierTangent {
    #[serde(deserialize_with = "deserialize_scalar_or_first")]
    pub x: f32,
    #[serde(deserialize_with = "deserialize_scalar_or_first")]
    pub y: f32,
}

fn deserialize_scalar_or_first<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;

    if let Some(n) = v.as_f64() {
        return Ok(n as f32);
    }

    if let Some(first) = v.as_array().and_then(|arr| arr.first()).and_then(|f| f.as_f64()) {
        return Ok(first as f32);
    }

    Err(serde::de::Error::custom(
        "expected a number or a non-empty array of numbers",
    ))
}

// Wrapper for Vec3 with Z defaulting to 0.0
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Vec3DefaultZero(pub Vec3);

impl Default for Vec3DefaultZero {
    fn default() -> Self {
        Vec3DefaultZero([0.0, 0.0, 0.0])
    }
}

impl<'de> Deserialize<'de> for Vec3DefaultZero {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Vec3Visitor;
        impl<'de> serde::de::Visitor<'de> for Vec3Visitor {
            type Value = Vec3DefaultZero;
            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a sequence of 2 or 3 floats")
            }
            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let x = seq.next_element()?.unwrap_or(0.0);
                let y = seq.next_element()?.unwrap_or(0.0);
                let z = seq.next_element()?.unwrap_or(0.0);
                while seq.next_element::<f32>()?.is_some() {}
                Ok(Vec3DefaultZero([x, y, z]))
            }
        }
        deserializer.deserialize_seq(Vec3Visitor)
    }
}

// Wrapper for Vec3 with every axis defaulting to 100.0 (for Scale)
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Vec3Scale(pub Vec3);

impl Default for Vec3Scale {
    fn default() -> Self {
        Vec3Scale([100.0, 100.0, 100.0])
    }
}

impl<'de> Deserialize<'de> for Vec3Scale {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Vec3ScaleVisitor;
        impl<'de> serde::de::Visitor<'de> for Vec3ScaleVisitor {
            type Value = Vec3Scale;
            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a sequence of 2 or 3 floats")
            }
            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let x = seq.next_element()?.unwrap_or(100.0);
                let y = seq.next_element()?.unwrap_or(100.0);
                let z = seq.next_element()?.unwrap_or(100.0);
                while seq.next_element::<f32>()?.is_some() {}
                Ok(Vec3Scale([x, y, z]))
            }
        }
        deserializer.deserialize_seq(Vec3ScaleVisitor)
    }
}

/// A bezier shape: vertices `v` with in-tangents `i` and out-tangents `o`
/// expressed relative to their vertex.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct BezierPath {
    #[serde(default)]
    pub c: bool,
    #[serde(default)]
    pub i: Vec<Vec2>,
    #[serde(default)]
    pub o: Vec<Vec2>,
    #[serde(default)]
    pub v: Vec<Vec2>,
}

impl BezierPath {
    /// A closed polygon through `points` with straight edges.
    pub fn polygon(points: &[Vec2]) -> Self {
        BezierPath {
            c: true,
            i: vec![[0.0, 0.0]; points.len()],
            o: vec![[0.0, 0.0]; points.len()],
            v: points.to_vec(),
        }
    }

    /// An open polyline through `points` with straight edges.
    pub fn polyline(points: &[Vec2]) -> Self {
        BezierPath {
            c: false,
            ..Self::polygon(points)
        }
    }
}
