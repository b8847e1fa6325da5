use crate::animatable::Animated;
use crate::config::{AnimationInfo, TessellationConfig};
use crate::error::{ConstructionError, Result};
use crate::geometry::PathGeometry;
use crate::tessellate::Tessellator;
use crate::transform::TransformTrack;
use glam::{Vec2, Vec3, Vec4};
use r2grap_data::model::{self as data, SceneDescription};
use std::collections::HashMap;
use std::sync::Arc;

/// Fill or stroke paint before resolution against node opacity.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleSource {
    pub color: Animated<Vec4>,
    /// `0..=1`
    pub opacity: Animated<f32>,
}

impl StyleSource {
    fn new(color: &data::Property<data::Vec4>, opacity: &data::Property<f32>) -> Result<Self> {
        Ok(Self {
            color: Animated::from_property(color, |c| Vec4::from(*c), Vec4::ONE)?,
            opacity: Animated::from_property(opacity, |o| (*o / 100.0).clamp(0.0, 1.0), 1.0)?,
        })
    }

    pub fn is_animated(&self) -> bool {
        self.color.is_animated() || self.opacity.is_animated()
    }
}

#[derive(Debug, Clone)]
pub struct PathNode {
    pub name: String,
    pub geometry: Arc<PathGeometry>,
}

#[derive(Debug, Clone)]
pub struct GroupNode {
    pub name: String,
    pub transform: TransformTrack,
    pub paths: Vec<PathNode>,
    pub children: Vec<GroupNode>,
    pub fill: Option<StyleSource>,
    pub stroke: Option<StyleSource>,
}

impl GroupNode {
    /// The constant group position baked into this group's own path
    /// vertices. An animated position stays in the per-frame matrix only.
    pub fn baked_position(&self) -> Vec3 {
        match &self.transform.position {
            Animated::Constant(position) => *position,
            Animated::Curve(_) => Vec3::ZERO,
        }
    }

    pub fn path_count(&self) -> usize {
        self.paths.len() + self.children.iter().map(GroupNode::path_count).sum::<usize>()
    }
}

#[derive(Debug, Clone)]
pub struct LayerNode {
    pub name: String,
    pub index: Option<u32>,
    /// Position of the parent layer inside [`Scene::layers`].
    pub parent: Option<usize>,
    pub in_frame: f32,
    pub out_frame: f32,
    pub hidden: bool,
    pub transform: TransformTrack,
    pub groups: Vec<GroupNode>,
}

impl LayerNode {
    pub fn path_count(&self) -> usize {
        self.groups.iter().map(GroupNode::path_count).sum()
    }
}

/// The validated, tessellated scene. Immutable once built.
#[derive(Debug, Clone)]
pub struct Scene {
    info: AnimationInfo,
    layers: Vec<LayerNode>,
}

impl Scene {
    pub fn from_description(desc: &SceneDescription, config: TessellationConfig) -> Result<Self> {
        let info = AnimationInfo::from_description(desc)?;
        let tessellator = Tessellator::new(&info, config);

        let mut by_index = HashMap::new();
        for (pos, layer) in desc.layers.iter().enumerate() {
            if let Some(ind) = layer.ind {
                if by_index.insert(ind, pos).is_some() {
                    return Err(ConstructionError::DuplicateLayerIndex(ind));
                }
            }
        }

        let mut layers = Vec::with_capacity(desc.layers.len());
        for (pos, layer) in desc.layers.iter().enumerate() {
            let name = layer
                .name
                .clone()
                .unwrap_or_else(|| format!("layer {pos}"));
            let node = build_layer(layer, &name, &info, &tessellator, &by_index)
                .map_err(|e| e.in_layer(&name))?;
            layers.push(node);
        }
        check_parent_cycles(&layers)?;

        let scene = Self { info, layers };
        tracing::info!(
            name = desc.name.as_deref().unwrap_or("unnamed"),
            layers = scene.layers.len(),
            paths = scene.path_count(),
            frames = info.frame_count(),
            "scene constructed"
        );
        Ok(scene)
    }

    pub fn info(&self) -> &AnimationInfo {
        &self.info
    }

    pub fn layers(&self) -> &[LayerNode] {
        &self.layers
    }

    pub fn path_count(&self) -> usize {
        self.layers.iter().map(LayerNode::path_count).sum()
    }
}

fn build_layer(
    layer: &data::Layer,
    name: &str,
    info: &AnimationInfo,
    tessellator: &Tessellator<'_>,
    by_index: &HashMap<u32, usize>,
) -> Result<LayerNode> {
    let out_frame = layer.out_frame.unwrap_or(info.last_frame() as f32);
    if layer.in_frame > out_frame {
        return Err(ConstructionError::InvalidClipRange {
            in_frame: layer.in_frame,
            out_frame,
        });
    }

    let parent = match layer.parent {
        Some(ind) => Some(
            *by_index
                .get(&ind)
                .ok_or(ConstructionError::UnknownParent(ind))?,
        ),
        None => None,
    };

    let shape_offset = Vec2::from(layer.shape_offset);
    let groups = layer
        .groups
        .iter()
        .map(|group| build_group(group, shape_offset, tessellator))
        .collect::<Result<Vec<_>>>()?;

    Ok(LayerNode {
        name: name.to_string(),
        index: layer.ind,
        parent,
        in_frame: layer.in_frame,
        out_frame,
        hidden: layer.hidden,
        transform: TransformTrack::from_data(&layer.transform)?,
        groups,
    })
}

fn build_group(
    group: &data::ShapeGroup,
    shape_offset: Vec2,
    tessellator: &Tessellator<'_>,
) -> Result<GroupNode> {
    let transform = TransformTrack::from_data(&group.transform)?;
    let name = group.name.clone().unwrap_or_else(|| "group".to_string());

    let mut offset = shape_offset;
    if let Animated::Constant(position) = &transform.position {
        offset += position.truncate();
    }

    let mut paths = Vec::with_capacity(group.paths.len());
    for (idx, path) in group.paths.iter().enumerate() {
        let path_name = path
            .name
            .clone()
            .unwrap_or_else(|| format!("{name}/path {idx}"));
        let shape = Animated::from_property(&path.shape, |p| p.clone(), data::BezierPath::default())
            .map_err(|e| e.in_path(&path_name))?;
        let geometry = tessellator
            .tessellate(&shape, path.triangles.as_deref(), offset)
            .map_err(|e| e.in_path(&path_name))?;
        paths.push(PathNode {
            name: path_name,
            geometry: Arc::new(geometry),
        });
    }

    // Nested groups receive the layer offset only; this group's position
    // reaches them through its matrix
    let children = group
        .groups
        .iter()
        .map(|child| build_group(child, shape_offset, tessellator))
        .collect::<Result<Vec<_>>>()?;

    Ok(GroupNode {
        name,
        transform,
        paths,
        children,
        fill: group
            .fill
            .as_ref()
            .map(|f| StyleSource::new(&f.color, &f.opacity))
            .transpose()?,
        stroke: group
            .stroke
            .as_ref()
            .map(|s| StyleSource::new(&s.color, &s.opacity))
            .transpose()?,
    })
}

fn check_parent_cycles(layers: &[LayerNode]) -> Result<()> {
    for start in 0..layers.len() {
        let mut current = layers[start].parent;
        let mut steps = 0;
        while let Some(parent) = current {
            steps += 1;
            if parent == start || steps > layers.len() {
                let ind = layers[start].index.unwrap_or(start as u32);
                return Err(ConstructionError::ParentCycle(ind));
            }
            current = layers[parent].parent;
        }
    }
    Ok(())
}
