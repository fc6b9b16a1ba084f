//! End-to-end normalization: source file in, canonical JSON file out.

use std::io::Write;

use serde_json::{Value, json};
use tempfile::TempDir;
use voxview::error::VoxError;
use voxview::formats;

fn write_source(dir: &TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Minimal version 1.0 npy file with a little-endian i32 payload.
fn npy_i32(shape: &str, values: &[i32]) -> Vec<u8> {
    let mut dict =
        format!("{{'descr': '<i4', 'fortran_order': False, 'shape': {shape}, }}").into_bytes();
    dict.push(b'\n');

    let mut out = Vec::new();
    out.extend_from_slice(b"\x93NUMPY");
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(dict.len() as u16).to_le_bytes());
    out.extend(dict);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

#[tokio::test]
async fn json_round_trips_byte_identically() {
    let dir = TempDir::new().unwrap();
    let text = "[[1, 2, 3],\n [4, 5, 6]]";
    let source = write_source(&dir, "input.json", text.as_bytes());
    let dest = dir.path().join("cache/temp.json");

    formats::normalize_to_file(&source, &dest).await.unwrap();
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), text);
}

#[tokio::test]
async fn csv_becomes_records() {
    let dir = TempDir::new().unwrap();
    let source = write_source(&dir, "input.csv", b"a,b\n1,2\n3,x\n");
    let dest = dir.path().join("temp.json");

    formats::normalize_to_file(&source, &dest).await.unwrap();
    let value: Value = serde_json::from_str(&std::fs::read_to_string(&dest).unwrap()).unwrap();
    assert_eq!(value, json!([{"a": 1, "b": 2}, {"a": 3, "b": "x"}]));
}

#[tokio::test]
async fn npy_becomes_nested_array() {
    let dir = TempDir::new().unwrap();
    let source = write_source(&dir, "input.npy", &npy_i32("(2, 3)", &[1, 2, 3, 4, 5, 6]));
    let dest = dir.path().join("temp.json");

    formats::normalize_to_file(&source, &dest).await.unwrap();
    let value: Value = serde_json::from_str(&std::fs::read_to_string(&dest).unwrap()).unwrap();
    assert_eq!(value, json!([[1, 2, 3], [4, 5, 6]]));
}

#[tokio::test]
async fn npz_uses_first_member() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("input.npz");
    {
        let file = std::fs::File::create(&source).unwrap();
        let mut archive = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        archive.start_file("arr_0.npy", options).unwrap();
        archive.write_all(&npy_i32("(3,)", &[7, 8, 9])).unwrap();
        archive.finish().unwrap();
    }
    let dest = dir.path().join("temp.json");

    formats::normalize_to_file(&source, &dest).await.unwrap();
    let value: Value = serde_json::from_str(&std::fs::read_to_string(&dest).unwrap()).unwrap();
    assert_eq!(value, json!([7, 8, 9]));
}

#[tokio::test]
async fn unsupported_extension_names_it() {
    let dir = TempDir::new().unwrap();
    let source = write_source(&dir, "input.txt", b"1,2,3");
    let dest = dir.path().join("temp.json");

    let err = formats::normalize_to_file(&source, &dest).await.unwrap_err();
    assert!(matches!(err, VoxError::UnsupportedFormat(_)));
    assert!(err.to_string().contains(".txt"));
    assert!(!dest.exists());
}

#[tokio::test]
async fn canonical_file_is_clobbered_per_run() {
    let dir = TempDir::new().unwrap();
    let first = write_source(&dir, "first.json", b"[1, 2, 3]");
    let second = write_source(&dir, "second.json", b"[4]");
    let dest = dir.path().join("temp.json");

    formats::normalize_to_file(&first, &dest).await.unwrap();
    formats::normalize_to_file(&second, &dest).await.unwrap();
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "[4]");
}
