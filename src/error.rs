use thiserror::Error;

pub type VoxResult<T> = Result<T, VoxError>;

#[derive(Error, Debug)]
pub enum VoxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    #[error("Header error: {0}")]
    Header(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Unsupported array dimensions: {0}. Only 1D, 2D, and 3D arrays are supported.")]
    UnsupportedDims(usize),

    #[error("Server error: {0}")]
    Server(String),

    #[error("{0}")]
    Other(String),
}
