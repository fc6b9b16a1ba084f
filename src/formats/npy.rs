//! NumPy `.npy` / `.npz` -> canonical JSON conversion.
//!
//! The `.npy` header is a magic string, a format version, a little-endian
//! header length, and a Python-literal dict with `descr`, `fortran_order` and
//! `shape` keys. The payload is a flat buffer reshaped according to the
//! declared shape and order.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use num_traits::ToPrimitive;
use py_literal::Value as PyValue;
use serde_json::Value;
use zip::ZipArchive;

use crate::error::{VoxError, VoxResult};
use crate::shape::nest;
use crate::types::{ArrayOrder, NumPyDataType, bytes_to_vector, parse_numpy_dtype};

/// Magic string to indicate npy format.
const MAGIC_STRING: &[u8] = b"\x93NUMPY";

// ---------------------------------------------------------------------------
// NpyHeader
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NpyHeader {
    pub dtype: NumPyDataType,
    pub fortran_order: bool,
    pub shape: Vec<usize>,
}

impl NpyHeader {
    pub fn order(&self) -> ArrayOrder {
        if self.fortran_order {
            ArrayOrder::F
        } else {
            ArrayOrder::C
        }
    }

    /// Read and parse the header, leaving the reader at the payload start.
    pub fn from_reader<R: Read>(mut reader: R) -> VoxResult<Self> {
        let mut magic = [0u8; 6];
        reader
            .read_exact(&mut magic)
            .map_err(|e| VoxError::Header(format!("Failed to read npy magic: {e}")))?;
        if magic != MAGIC_STRING {
            return Err(VoxError::Header(
                "Start does not match the npy magic string".into(),
            ));
        }

        let mut version = [0u8; 2];
        reader
            .read_exact(&mut version)
            .map_err(|e| VoxError::Header(format!("Failed to read npy version: {e}")))?;
        // Versions 1.0 use a u16 header length; 2.0 and 3.0 use a u32.
        let header_len = match (version[0], version[1]) {
            (1, 0) => reader
                .read_u16::<LittleEndian>()
                .map_err(|e| VoxError::Header(format!("Failed to read header length: {e}")))?
                as usize,
            (2, 0) | (3, 0) => reader
                .read_u32::<LittleEndian>()
                .map_err(|e| VoxError::Header(format!("Failed to read header length: {e}")))?
                as usize,
            (major, minor) => {
                return Err(VoxError::Header(format!(
                    "Unknown npy version: {major}.{minor}"
                )));
            }
        };

        let mut dict_bytes = vec![0u8; header_len];
        reader
            .read_exact(&mut dict_bytes)
            .map_err(|e| VoxError::Header(format!("Failed to read header dict: {e}")))?;
        let without_newline = match dict_bytes.split_last() {
            Some((&b'\n', rest)) => rest,
            _ => return Err(VoxError::Header("Newline missing at end of header".into())),
        };
        let dict_str = std::str::from_utf8(without_newline)
            .map_err(|e| VoxError::Header(format!("Header is not valid UTF-8: {e}")))?;

        let dict: PyValue = dict_str
            .trim()
            .parse()
            .map_err(|e| VoxError::Header(format!("Failed to parse header dict: {e}")))?;
        Self::from_py_dict(dict)
    }

    fn from_py_dict(value: PyValue) -> VoxResult<Self> {
        let PyValue::Dict(dict) = value else {
            return Err(VoxError::Header("Header metadata is not a dict".into()));
        };

        let mut dtype = None;
        let mut fortran_order = None;
        let mut shape = None;
        for (key, value) in dict {
            let PyValue::String(key) = key else {
                return Err(VoxError::Header("Non-string key in header dict".into()));
            };
            match key.as_str() {
                "descr" => match value {
                    PyValue::String(s) => {
                        dtype = Some(parse_numpy_dtype(&s).map_err(VoxError::Header)?);
                    }
                    _ => {
                        return Err(VoxError::Header(
                            "Structured npy dtypes are not supported".into(),
                        ));
                    }
                },
                "fortran_order" => match value {
                    PyValue::Boolean(b) => fortran_order = Some(b),
                    other => {
                        return Err(VoxError::Header(format!(
                            "Illegal fortran_order value: {other}"
                        )));
                    }
                },
                "shape" => {
                    let parsed: Option<Vec<usize>> = value.as_tuple().and_then(|tuple| {
                        tuple
                            .iter()
                            .map(|elem| elem.as_integer()?.to_usize())
                            .collect()
                    });
                    match parsed {
                        Some(s) => shape = Some(s),
                        None => {
                            return Err(VoxError::Header(format!(
                                "Illegal shape value: {value}"
                            )));
                        }
                    }
                }
                other => {
                    return Err(VoxError::Header(format!(
                        "Unknown key in header dict: {other}"
                    )));
                }
            }
        }

        match (dtype, fortran_order, shape) {
            (Some(dtype), Some(fortran_order), Some(shape)) => Ok(NpyHeader {
                dtype,
                fortran_order,
                shape,
            }),
            (None, _, _) => Err(VoxError::Header("Missing header key: descr".into())),
            (_, None, _) => Err(VoxError::Header("Missing header key: fortran_order".into())),
            (_, _, None) => Err(VoxError::Header("Missing header key: shape".into())),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Parse `.npy` bytes into a nested JSON array.
pub fn to_nested(bytes: &[u8]) -> VoxResult<Value> {
    let mut cursor = Cursor::new(bytes);
    let header = NpyHeader::from_reader(&mut cursor)?;

    let mut payload = Vec::new();
    cursor
        .read_to_end(&mut payload)
        .map_err(|e| VoxError::Decode(format!("Failed to read npy payload: {e}")))?;

    if let Some(elem_size) = header.dtype.data_type.byte_size() {
        let expected: usize = header.shape.iter().product::<usize>() * elem_size;
        if payload.len() < expected {
            return Err(VoxError::Decode(format!(
                "Payload holds {} bytes but shape {:?} needs {expected}",
                payload.len(),
                header.shape
            )));
        }
    }

    let elements = bytes_to_vector(
        header.dtype.byte_order,
        header.dtype.data_type,
        &payload,
    )?;
    nest(elements.into_json(), &header.shape, header.order())
}

/// Convert `.npy` bytes into canonical JSON text.
pub fn normalize(bytes: &[u8]) -> VoxResult<String> {
    let value = to_nested(bytes)?;
    Ok(serde_json::to_string(&value)?)
}

/// Convert `.npz` bytes into canonical JSON text by normalizing the first
/// `.npy` member of the archive.
pub fn normalize_npz(bytes: &[u8]) -> VoxResult<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| VoxError::Decode(format!("Invalid npz archive: {e}")))?;

    let name = archive
        .file_names()
        .find(|n| n.ends_with(".npy"))
        .map(|n| n.to_string())
        .ok_or_else(|| VoxError::Decode("npz archive contains no npy member".into()))?;

    let mut member = archive
        .by_name(&name)
        .map_err(|e| VoxError::Decode(format!("Failed to open npz member {name}: {e}")))?;
    let mut buf = Vec::new();
    member
        .read_to_end(&mut buf)
        .map_err(|e| VoxError::Decode(format!("Failed to read npz member {name}: {e}")))?;
    normalize(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, Endian};
    use serde_json::json;

    /// Build a minimal version 1.0 npy file.
    fn npy_bytes(descr: &str, fortran: bool, shape: &str, payload: &[u8]) -> Vec<u8> {
        let order = if fortran { "True" } else { "False" };
        let mut dict =
            format!("{{'descr': '{descr}', 'fortran_order': {order}, 'shape': {shape}, }}")
                .into_bytes();
        dict.push(b'\n');

        let mut out = Vec::new();
        out.extend_from_slice(MAGIC_STRING);
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&(dict.len() as u16).to_le_bytes());
        out.extend(dict);
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn parses_header() {
        let bytes = npy_bytes("<i4", false, "(2, 3)", &[]);
        let header = NpyHeader::from_reader(Cursor::new(&bytes)).unwrap();
        assert_eq!(header.dtype.data_type, DataType::Int32);
        assert_eq!(header.dtype.byte_order, Endian::Little);
        assert!(!header.fortran_order);
        assert_eq!(header.shape, vec![2, 3]);
    }

    #[test]
    fn rejects_bad_magic() {
        let err = NpyHeader::from_reader(Cursor::new(b"\x93NUMPZ..".as_slice())).unwrap_err();
        assert!(matches!(err, VoxError::Header(_)));
    }

    #[test]
    fn reshapes_row_major() {
        let payload: Vec<u8> = [1i32, 2, 3, 4, 5, 6]
            .iter()
            .flat_map(|x| x.to_le_bytes())
            .collect();
        let bytes = npy_bytes("<i4", false, "(2, 3)", &payload);
        assert_eq!(to_nested(&bytes).unwrap(), json!([[1, 2, 3], [4, 5, 6]]));
    }

    #[test]
    fn reshapes_fortran_order() {
        let payload: Vec<u8> = [1i32, 2, 3, 4, 5, 6]
            .iter()
            .flat_map(|x| x.to_le_bytes())
            .collect();
        let bytes = npy_bytes("<i4", true, "(2, 3)", &payload);
        assert_eq!(to_nested(&bytes).unwrap(), json!([[1, 3, 5], [2, 4, 6]]));
    }

    #[test]
    fn one_dimensional_floats() {
        let payload: Vec<u8> = [0.5f64, 1.5]
            .iter()
            .flat_map(|x| x.to_le_bytes())
            .collect();
        let bytes = npy_bytes("<f8", false, "(2,)", &payload);
        assert_eq!(to_nested(&bytes).unwrap(), json!([0.5, 1.5]));
    }

    #[test]
    fn rejects_four_axes() {
        let payload = vec![0u8; 4];
        let bytes = npy_bytes("<i4", false, "(1, 1, 1, 1)", &payload);
        let err = to_nested(&bytes).unwrap_err();
        assert!(matches!(err, VoxError::UnsupportedDims(4)));
    }

    #[test]
    fn rejects_truncated_payload() {
        let bytes = npy_bytes("<i4", false, "(2, 3)", &[0u8; 4]);
        let err = to_nested(&bytes).unwrap_err();
        assert!(matches!(err, VoxError::Decode(_)));
    }
}
