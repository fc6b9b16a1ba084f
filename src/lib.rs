pub mod error;
pub mod formats;
pub mod server;
pub mod shape;
pub mod types;

// Re-export key types at crate root for convenience.
pub use error::{VoxError, VoxResult};
pub use formats::SourceFormat;
pub use server::ServerConfig;
pub use shape::{MAX_DIMS, nest, shape_of, supported_dims, valid_json_array};
pub use types::{ArrayOrder, DataType, ElementVector, Endian};
