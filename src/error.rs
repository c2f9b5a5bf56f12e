use thiserror::Error;

#[derive(Error, Debug)]
pub enum SymmetryError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),

    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SymmetryError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        SymmetryError::InvalidInput(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SymmetryError>;
