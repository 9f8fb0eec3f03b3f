use std::fmt;

use crate::render::FatalError;

use super::{EntityId, SceneState};

/// Scene operation rejected by the current state.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneError {
    /// The scene has been disposed; only `dispose` is still accepted.
    Disposed,
    UnknownEntity(EntityId),
    /// A state transition that is not allowed from `from`.
    InvalidTransition { from: SceneState },
    /// Geometry resources failed to initialize; the scene is now disposed.
    Fatal(FatalError),
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::Disposed => write!(f, "scene is disposed"),
            SceneError::UnknownEntity(id) => write!(f, "unknown {id}"),
            SceneError::InvalidTransition { from } => {
                write!(f, "transition to ready not allowed from {from:?}")
            }
            SceneError::Fatal(e) => write!(f, "scene initialization failed: {e}"),
        }
    }
}

impl std::error::Error for SceneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SceneError::Fatal(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FatalError> for SceneError {
    fn from(e: FatalError) -> Self {
        SceneError::Fatal(e)
    }
}
