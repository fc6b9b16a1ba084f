pub mod csv;
pub mod hdf5;
pub mod npy;

use std::path::Path;

use serde_json::Value;
use tracing::warn;

use crate::error::{VoxError, VoxResult};
use crate::shape::{shape_of, supported_dims};

// ---------------------------------------------------------------------------
// SourceFormat
// ---------------------------------------------------------------------------

/// The set of input file formats the normalizer understands, keyed by file
/// extension. Closed enum dispatch; the format set is fixed and small.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Json,
    Csv,
    Npy,
    Npz,
    Hdf5,
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFormat::Json => write!(f, "json"),
            SourceFormat::Csv => write!(f, "csv"),
            SourceFormat::Npy => write!(f, "npy"),
            SourceFormat::Npz => write!(f, "npz"),
            SourceFormat::Hdf5 => write!(f, "hdf5"),
        }
    }
}

impl SourceFormat {
    /// Map an extension (without the dot, case-insensitive) to its format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(SourceFormat::Json),
            "csv" => Some(SourceFormat::Csv),
            "npy" => Some(SourceFormat::Npy),
            "npz" => Some(SourceFormat::Npz),
            "h5" | "hdf5" | "hdf" => Some(SourceFormat::Hdf5),
            _ => None,
        }
    }

    /// Determine the format from a file path's extension.
    pub fn from_path(path: &Path) -> VoxResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(ext)
            .ok_or_else(|| VoxError::UnsupportedFormat(format!(".{}", ext.to_lowercase())))
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Convert a source file into its canonical JSON text. The full document is
/// computed in memory; nothing is written here.
pub async fn normalize(format: SourceFormat, path: &Path) -> VoxResult<String> {
    match format {
        SourceFormat::Json => {
            // Byte-for-byte passthrough, with the dimension limit enforced.
            let text = tokio::fs::read_to_string(path).await?;
            check_dimension_limit(&text)?;
            Ok(text)
        }
        SourceFormat::Csv => {
            let bytes = tokio::fs::read(path).await?;
            csv::normalize(&bytes)
        }
        SourceFormat::Npy => {
            let bytes = tokio::fs::read(path).await?;
            npy::normalize(&bytes)
        }
        SourceFormat::Npz => {
            let bytes = tokio::fs::read(path).await?;
            npy::normalize_npz(&bytes)
        }
        SourceFormat::Hdf5 => {
            // The HDF5 C library opens files by path and blocks.
            let path = path.to_path_buf();
            tokio::task::spawn_blocking(move || hdf5::normalize(&path))
                .await
                .map_err(|e| VoxError::Other(format!("Task join error: {e}")))?
        }
    }
}

/// Normalize `source` and write the canonical JSON to `dest`, overwriting any
/// previous content. The parent directory is created if needed.
pub async fn normalize_to_file(source: &Path, dest: &Path) -> VoxResult<()> {
    let format = SourceFormat::from_path(source)?;
    let json = normalize(format, source).await?;
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(dest, json).await?;
    Ok(())
}

/// Reject JSON arrays with more axes than the visualizer supports. Ragged
/// arrays only warn; the front end reports those to the user.
fn check_dimension_limit(text: &str) -> VoxResult<()> {
    let value: Value = serde_json::from_str(text)?;
    if value.is_array() && !supported_dims(&value) {
        match shape_of(&value) {
            Some(shape) => return Err(VoxError::UnsupportedDims(shape.len())),
            None => warn!("Input array is ragged; the visualizer will reject it"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn maps_extensions() {
        assert_eq!(SourceFormat::from_extension("json"), Some(SourceFormat::Json));
        assert_eq!(SourceFormat::from_extension("NPY"), Some(SourceFormat::Npy));
        assert_eq!(SourceFormat::from_extension("h5"), Some(SourceFormat::Hdf5));
        assert_eq!(SourceFormat::from_extension("hdf5"), Some(SourceFormat::Hdf5));
        assert_eq!(SourceFormat::from_extension("txt"), None);
    }

    #[test]
    fn unsupported_extension_is_named() {
        let err = SourceFormat::from_path(Path::new("data.txt")).unwrap_err();
        assert!(matches!(err, VoxError::UnsupportedFormat(_)));
        assert!(err.to_string().contains(".txt"));
    }

    #[tokio::test]
    async fn json_passthrough_is_byte_identical() {
        let mut src = tempfile::NamedTempFile::with_suffix(".json").unwrap();
        let text = "[[1, 2], [3, 4]]";
        src.write_all(text.as_bytes()).unwrap();
        let out = normalize(SourceFormat::Json, src.path()).await.unwrap();
        assert_eq!(out, text);
    }

    #[tokio::test]
    async fn json_dimension_limit_is_enforced() {
        let mut src = tempfile::NamedTempFile::with_suffix(".json").unwrap();
        src.write_all(b"[[[[1]]]]").unwrap();
        let err = normalize(SourceFormat::Json, src.path()).await.unwrap_err();
        assert!(matches!(err, VoxError::UnsupportedDims(4)));
    }

    #[tokio::test]
    async fn missing_source_file_is_an_io_error() {
        let err = normalize(SourceFormat::Json, Path::new("no/such/file.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, VoxError::Io(_)));
    }
}
