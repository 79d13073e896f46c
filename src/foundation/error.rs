/// Convenience result type used across ninja-qr.
pub type NinjaResult<T> = Result<T, NinjaError>;

/// Top-level error taxonomy for the load/composite/export pipeline.
///
/// Every variant aborts the whole operation; nothing is retried and no partial output is
/// handed to a sink.
#[derive(thiserror::Error, Debug)]
pub enum NinjaError {
    /// The photo reference could not be fetched or decoded.
    #[error("load error: {0}")]
    Load(String),

    /// The QR surface could not be read (zero area, malformed buffer, undecodable PNG).
    #[error("read error: {0}")]
    Read(String),

    /// The composited raster could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// Invalid user-provided options or job data.
    #[error("validation error: {0}")]
    Validation(String),

    /// The save sink rejected or failed to persist the encoded bytes.
    #[error("save error: {0}")]
    Save(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NinjaError {
    /// Build a [`NinjaError::Load`] value.
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    /// Build a [`NinjaError::Read`] value.
    pub fn read(msg: impl Into<String>) -> Self {
        Self::Read(msg.into())
    }

    /// Build a [`NinjaError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`NinjaError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`NinjaError::Save`] value.
    pub fn save(msg: impl Into<String>) -> Self {
        Self::Save(msg.into())
    }

    /// Build a [`NinjaError::Load`] from an error chain, keeping every context layer.
    pub(crate) fn load_from(err: anyhow::Error) -> Self {
        Self::Load(format!("{err:#}"))
    }

    /// Build a [`NinjaError::Read`] from an error chain, keeping every context layer.
    pub(crate) fn read_from(err: anyhow::Error) -> Self {
        Self::Read(format!("{err:#}"))
    }

    /// Build a [`NinjaError::Encode`] from an error chain, keeping every context layer.
    pub(crate) fn encode_from(err: anyhow::Error) -> Self {
        Self::Encode(format!("{err:#}"))
    }

    /// Build a [`NinjaError::Save`] from an error chain, keeping every context layer.
    pub(crate) fn save_from(err: anyhow::Error) -> Self {
        Self::Save(format!("{err:#}"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
