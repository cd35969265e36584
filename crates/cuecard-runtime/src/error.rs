#![forbid(unsafe_code)]

//! Engine and surface error types.
//!
//! None of these are fatal: every failure leaves the loaded document and the
//! primary surface fully usable.

use std::fmt;

/// Errors reported by a mirror surface or platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The platform refused to create the secondary surface.
    Denied(String),
    /// The surface cannot take a frame right now; the frame is dropped.
    Busy,
    /// The surface was closed by the platform or the user.
    Closed,
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceError::Denied(reason) => write!(f, "surface denied: {reason}"),
            SurfaceError::Busy => write!(f, "surface busy"),
            SurfaceError::Closed => write!(f, "surface closed"),
        }
    }
}

impl std::error::Error for SurfaceError {}

/// Errors reported by the [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The operation needs a configured session.
    NotConfigured,
    /// The platform has no mirror surface support. Not retried.
    MirrorUnsupported,
    /// The platform failed to provide a secondary surface.
    SurfaceUnavailable(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::NotConfigured => write!(f, "engine is not configured"),
            EngineError::MirrorUnsupported => write!(f, "mirror surface not supported on this platform"),
            EngineError::SurfaceUnavailable(msg) => write!(f, "mirror surface unavailable: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<SurfaceError> for EngineError {
    fn from(e: SurfaceError) -> Self {
        EngineError::SurfaceUnavailable(e.to_string())
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_error_converts() {
        let err: EngineError = SurfaceError::Denied("no overlay permission".into()).into();
        assert_eq!(
            err,
            EngineError::SurfaceUnavailable("surface denied: no overlay permission".into())
        );
        assert_eq!(
            EngineError::MirrorUnsupported.to_string(),
            "mirror surface not supported on this platform"
        );
    }
}
