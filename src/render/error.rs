use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
    #[error("renderer needs at least one channel")]
    NoChannels,
    #[error("surface operation failed: {0}")]
    Surface(String),
    #[error("failed to parse renderer config: {0}")]
    Config(#[source] serde_json::Error),
    #[error("malformed device packet: {0}")]
    Packet(#[source] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RenderError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        RenderError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for RenderError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        RenderError::Surface(format!("{value:?}"))
    }
}

impl From<image::ImageError> for RenderError {
    fn from(value: image::ImageError) -> Self {
        RenderError::Surface(value.to_string())
    }
}
