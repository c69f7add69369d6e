use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("page {page_index} out of range (document has {total_pages} pages)")]
    PageOutOfRange { page_index: u32, total_pages: u32 },

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("requested resolution would produce {requested} pixels, exceeding the {limit} pixel hard limit")]
    TooLarge { requested: u64, limit: u64 },
}

pub type RenderResult<T> = std::result::Result<T, RenderError>;

impl From<RenderError> for ddc_common::DiffError {
    fn from(err: RenderError) -> Self {
        ddc_common::DiffError::Render(err.to_string())
    }
}
