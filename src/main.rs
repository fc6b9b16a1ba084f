use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{error, info};

use voxview::error::{VoxError, VoxResult};
use voxview::server::{self, DEFAULT_PORT, ServerConfig};
use voxview::formats;

/// Location of the canonical JSON cache, clobbered on each run.
const CANONICAL_PATH: &str = "data/temp/temp.json";
const PUBLIC_DIR: &str = "public";

#[derive(Debug, Parser)]
#[command(name = "voxview", version, about = "Browser-based nested array visualizer")]
struct Cli {
    /// Data file to visualize (JSON, CSV, .npy/.npz, HDF5).
    /// Omit to run in GUI mode, where the browser supplies pasted data.
    path: Option<String>,

    /// Port to serve on.
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("Application error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> VoxResult<()> {
    let gui_enabled = cli.path.is_none();

    if let Some(raw) = cli.path.as_deref() {
        if raw.trim().is_empty() {
            return Err(VoxError::Other("File path required.".into()));
        }
        let path = resolve_path(raw);

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(VoxError::Other(format!(
                "Data file path {} is invalid or file does not exist.",
                path.display()
            )));
        }

        info!("Processing file: {}", path.display());
        formats::normalize_to_file(&path, Path::new(CANONICAL_PATH)).await?;
        info!("File processed successfully");
    }

    server::serve(ServerConfig {
        gui_enabled,
        canonical_path: PathBuf::from(CANONICAL_PATH),
        public_dir: PathBuf::from(PUBLIC_DIR),
        port: cli.port,
    })
    .await
}

/// Append `.json` when the filename carries no extension.
fn resolve_path(raw: &str) -> PathBuf {
    let path = PathBuf::from(raw);
    match path.extension() {
        Some(_) => path,
        None => path.with_extension("json"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_extension_is_json() {
        assert_eq!(resolve_path("data"), PathBuf::from("data.json"));
        assert_eq!(resolve_path("data.npy"), PathBuf::from("data.npy"));
        assert_eq!(resolve_path("dir/data.csv"), PathBuf::from("dir/data.csv"));
    }

    // Startup failures must surface as errors (forcing the non-zero exit in
    // main) before any listener is bound; run returning Err proves the server
    // call was never reached.

    #[tokio::test]
    async fn missing_file_fails_before_serving() {
        let err = run(Cli {
            path: Some("no/such/file.json".into()),
            port: DEFAULT_PORT,
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn empty_path_fails_before_serving() {
        let err = run(Cli {
            path: Some("  ".into()),
            port: DEFAULT_PORT,
        })
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "File path required.");
    }
}
