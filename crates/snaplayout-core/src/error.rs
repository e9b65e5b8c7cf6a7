use thiserror::Error;

use crate::component::ComponentId;

/// Why two ports cannot be connected.
#[derive(Debug, Clone, PartialEq)]
pub enum PortMismatch {
    Width { moving: f64, fixed: f64 },
    CrossSection { moving: String, fixed: String },
    PortType { moving: String, fixed: String },
}

impl std::fmt::Display for PortMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortMismatch::Width { moving, fixed } => {
                write!(f, "width {moving} does not match {fixed}")
            }
            PortMismatch::CrossSection { moving, fixed } => {
                write!(f, "cross-section '{moving}' does not match '{fixed}'")
            }
            PortMismatch::PortType { moving, fixed } => {
                write!(f, "port type {moving} does not match {fixed}")
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Port '{port}' not found on component '{component}'")]
    PortNotFound { component: String, port: String },

    #[error("Cannot connect port '{moving}' to '{fixed}': {reason}")]
    PortIncompatible {
        moving: String,
        fixed: String,
        reason: PortMismatch,
    },

    #[error("Cyclic hierarchy: {}", path.join(" -> "))]
    CyclicHierarchy { path: Vec<String> },

    #[error("Parameter '{parameter}' of factory '{factory}' is not cacheable: {reason}")]
    NonCacheableParameter {
        factory: String,
        parameter: String,
        reason: String,
    },

    #[error("Port '{port}' already declared on component '{component}'")]
    DuplicatePort { component: String, port: String },

    #[error("Component {0} is not in the library")]
    UnknownComponent(ComponentId),

    #[error("No factory registered as '{0}'")]
    UnknownFactory(String),

    #[error("Factory '{0}' is already registered")]
    DuplicateFactory(String),

    #[error("Factory '{factory}' has no parameter '{parameter}'")]
    UnknownParameter { factory: String, parameter: String },

    #[error("Missing parameter '{0}'")]
    MissingParameter(String),

    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },

    #[error("Rotation of {angle} degrees is off the 90-degree grid")]
    OffGridRotation { angle: f64 },

    #[error("Invalid placement handle {0}")]
    InvalidHandle(usize),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LayoutError>;
