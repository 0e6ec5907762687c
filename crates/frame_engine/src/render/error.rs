//! Rendering errors

use super::frame::FrameState;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Errors raised while recording or executing a frame
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    /// A mesh model without renderable data was submitted for drawing
    ///
    /// Mesh models must be set up before they are drawn; hitting this means
    /// the asset pipeline produced a broken model. Fatal.
    #[error("tried to draw a mesh not set up for rendering: '{0}'")]
    MeshNotRenderable(String),

    /// A frame lifecycle operation was called in the wrong state
    #[error("cannot {operation} while the frame is {state:?}")]
    InvalidFrameState {
        /// Attempted operation
        operation: &'static str,
        /// State the recorder was in
        state: FrameState,
    },

    /// Backend setup failed, such as a program failing to compile or link. Fatal.
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    BackendError(String),
}

impl RenderError {
    /// Whether the host must stop. Fatal errors indicate corrupted assets or a
    /// broken backend, never a transient condition.
    pub fn is_fatal(&self) -> bool {
        match self {
            RenderError::MeshNotRenderable(_) | RenderError::InitializationFailed(_) => true,
            RenderError::BackendError(_) => true,
            RenderError::InvalidFrameState { .. } => false,
        }
    }
}
