use std::fmt;

/// Initialization failure of the geometry resources.
///
/// Shader or pipeline creation failing is an environment bug, not a transient
/// condition: the canvas that owns the resources is unusable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum FatalError {
    /// No adapter/device could be acquired.
    Device(String),
    /// Shader module compilation failed.
    ShaderCompile(String),
    /// Render pipeline (program link) creation failed.
    PipelineLink(String),
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalError::Device(msg) => write!(f, "gpu device unavailable: {msg}"),
            FatalError::ShaderCompile(msg) => write!(f, "shader compilation failed: {msg}"),
            FatalError::PipelineLink(msg) => write!(f, "pipeline link failed: {msg}"),
        }
    }
}

impl std::error::Error for FatalError {}

/// Recoverable failure of a single GPU operation.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuError {
    /// A draw-time operation was issued before `initialize` or after `destroy`.
    NotInitialized,
    /// Texture creation was rejected (zero-sized or oversized image).
    TextureUpload { width: u32, height: u32, reason: String },
    /// `read_pixels` was called without a capture frame having been drawn.
    NoCapturePending,
    /// Mapping the readback buffer failed.
    Readback(String),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::NotInitialized => write!(f, "geometry resources are not initialized"),
            GpuError::TextureUpload { width, height, reason } => {
                write!(f, "texture upload of {width}x{height} image failed: {reason}")
            }
            GpuError::NoCapturePending => write!(f, "no capture frame was drawn before readback"),
            GpuError::Readback(msg) => write!(f, "framebuffer readback failed: {msg}"),
        }
    }
}

impl std::error::Error for GpuError {}
