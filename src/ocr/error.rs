use thiserror::Error;

/// Failures callers need to tell apart from ordinary I/O or parse errors.
/// They travel inside `anyhow::Error`; use `downcast_ref::<OcrError>()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OcrError {
    /// The connected-component walk visited more pixels than allowed. The
    /// image was most likely not thresholded properly.
    #[error(
        "runaway connectivity: component seeded at ({seed_x}, {seed_y}) exceeded {limit} connections"
    )]
    RunawayConnectivity {
        limit: usize,
        seed_x: usize,
        seed_y: usize,
    },

    #[error("extraction seed ({x}, {y}) is not an unprocessed on pixel")]
    InvalidSeed { x: usize, y: usize },

    #[error("raster is {width}x{height} but {actual} samples were supplied (expected {expected})")]
    DimensionMismatch {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    #[error("malformed glyph dictionary: {reason}")]
    MalformedDictionary { reason: String },
}

impl OcrError {
    pub fn is_runaway(&self) -> bool {
        matches!(self, OcrError::RunawayConnectivity { .. })
    }
}

/// True when `err` (or anything in its chain) is a runaway-connectivity abort.
pub fn is_runaway(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<OcrError>()
            .is_some_and(OcrError::is_runaway)
    })
}
