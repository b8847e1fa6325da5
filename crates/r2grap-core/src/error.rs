use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConstructionError>;

/// Fatal problems detected while turning a scene description into
/// render-ready data. Nothing here is deferred to render time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstructionError {
    #[error("keyframe curve has no keyframes")]
    EmptyCurve,

    #[error("keyframe {index} has a non-finite time ({time})")]
    NonFiniteTime { index: usize, time: f32 },

    #[error("keyframe {index} at {time}s does not come after the previous keyframe at {previous}s")]
    UnsortedKeyframes {
        index: usize,
        time: f32,
        previous: f32,
    },

    #[error("per-frame {what} holds {actual} frames, the animation has {expected}")]
    FrameCountMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("vertex buffer length {0} is not a multiple of 3")]
    RaggedVertexBuffer(usize),

    #[error("triangle index list length {0} is not a multiple of 3")]
    IncompleteTriangle(usize),

    #[error("triangle index {index} is out of range for {vertex_count} vertices")]
    TriangleIndexOutOfRange { index: u32, vertex_count: usize },

    #[error("invalid animation info: {0}")]
    InvalidAnimationInfo(String),

    #[error("clip range is inverted: in frame {in_frame} is after out frame {out_frame}")]
    InvalidClipRange { in_frame: f32, out_frame: f32 },

    #[error("layer index {0} is used by more than one layer")]
    DuplicateLayerIndex(u32),

    #[error("parent layer {0} does not exist")]
    UnknownParent(u32),

    #[error("layer parenting forms a cycle through layer index {0}")]
    ParentCycle(u32),

    #[error("layer '{layer}': {source}")]
    InLayer {
        layer: String,
        #[source]
        source: Box<ConstructionError>,
    },

    #[error("path '{path}': {source}")]
    InPath {
        path: String,
        #[source]
        source: Box<ConstructionError>,
    },
}

impl ConstructionError {
    pub(crate) fn in_layer(self, layer: &str) -> Self {
        ConstructionError::InLayer {
            layer: layer.to_string(),
            source: Box::new(self),
        }
    }

    pub(crate) fn in_path(self, path: &str) -> Self {
        ConstructionError::InPath {
            path: path.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with layer/path context stripped.
    pub fn root_cause(&self) -> &ConstructionError {
        match self {
            ConstructionError::InLayer { source, .. } | ConstructionError::InPath { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}
