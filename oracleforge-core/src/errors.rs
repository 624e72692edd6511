use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(&'static str),
    #[error("blob storage failure: {0}")]
    Storage(String),
    #[error("document write failure: {0}")]
    Persistence(String),
    #[error("invalid image data: {0}")]
    InvalidImage(String),
}
