use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("out of memory while warping at zoom {zoom}; retry at a lower zoom")]
    OutOfMemory { zoom: f32 },

    #[error("invalid transform: {0}")]
    InvalidTransform(String),
}

pub type ComposeResult<T> = std::result::Result<T, ComposeError>;

impl From<ComposeError> for ddc_common::DiffError {
    fn from(err: ComposeError) -> Self {
        ddc_common::DiffError::Compose(err.to_string())
    }
}
