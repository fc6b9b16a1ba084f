use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use half::f16;
use num_complex::Complex;
use serde_json::Value;
use std::io::Cursor;

use crate::error::{VoxError, VoxResult};

// ---------------------------------------------------------------------------
// Endian
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    Little,
    Big,
    NotApplicable,
}

// ---------------------------------------------------------------------------
// ArrayOrder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArrayOrder {
    #[default]
    C,
    F,
}

// ---------------------------------------------------------------------------
// DataType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float16,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    Bytes,
}

impl DataType {
    /// Number of bytes per element for fixed-size types.
    pub fn byte_size(&self) -> Option<usize> {
        match self {
            DataType::Bool => Some(1),
            DataType::Int8 => Some(1),
            DataType::Int16 => Some(2),
            DataType::Int32 => Some(4),
            DataType::Int64 => Some(8),
            DataType::UInt8 => Some(1),
            DataType::UInt16 => Some(2),
            DataType::UInt32 => Some(4),
            DataType::UInt64 => Some(8),
            DataType::Float16 => Some(2),
            DataType::Float32 => Some(4),
            DataType::Float64 => Some(8),
            DataType::Complex64 => Some(8),
            DataType::Complex128 => Some(16),
            DataType::String | DataType::Bytes => None,
        }
    }
}

// ---------------------------------------------------------------------------
// NumPy dtype format strings
// ---------------------------------------------------------------------------

/// A data type paired with the byte order it is stored in, as declared by a
/// NumPy dtype format string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumPyDataType {
    pub data_type: DataType,
    pub byte_order: Endian,
}

/// Intermediate parsed representation of a NumPy format string.
#[derive(Debug)]
struct NumPyFormat {
    byte_order: char,
    type_code: char,
    byte_size: usize,
}

/// Parse a NumPy dtype format string (e.g. `"<f8"`, `">i4"`, `"|b1"`) into a
/// [`NumPyDataType`].
pub fn parse_numpy_dtype(s: &str) -> Result<NumPyDataType, String> {
    let fmt = parse_numpy_format(s)?;
    numpy_format_to_dtype(&fmt)
}

fn parse_numpy_format(s: &str) -> Result<NumPyFormat, String> {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() < 3 {
        return Err(format!("NumPy format string too short: {s}"));
    }

    let byte_order = chars[0];
    if !['<', '>', '|'].contains(&byte_order) {
        return Err(format!("Invalid byte order: {byte_order}"));
    }

    let type_code = chars[1];
    if !['b', 'i', 'u', 'f', 'c', 'M', 'm', 'S', 'U', 'V'].contains(&type_code) {
        return Err(format!("Invalid type code: {type_code}"));
    }

    let rest: String = chars[2..].iter().collect();
    // Datetime/timedelta dtypes carry a bracketed time unit we don't need.
    let size_str = match rest.find('[') {
        Some(pos) => &rest[..pos],
        None => rest.as_str(),
    };
    let byte_size: usize = size_str
        .parse()
        .map_err(|_| format!("Invalid byte size: {rest}"))?;
    if byte_size == 0 {
        return Err(format!("Byte size must be > 0, got {rest}"));
    }

    Ok(NumPyFormat {
        byte_order,
        type_code,
        byte_size,
    })
}

fn parse_byte_order(c: char) -> Result<Endian, String> {
    match c {
        '<' => Ok(Endian::Little),
        '>' => Ok(Endian::Big),
        '|' => Ok(Endian::NotApplicable),
        _ => Err(format!("Invalid byte order: {c}")),
    }
}

fn numpy_format_to_dtype(fmt: &NumPyFormat) -> Result<NumPyDataType, String> {
    let core = match (fmt.type_code, fmt.byte_size) {
        ('b', 1) => DataType::Bool,
        ('i', 1) => DataType::Int8,
        ('i', 2) => DataType::Int16,
        ('i', 4) => DataType::Int32,
        ('i', 8) => DataType::Int64,
        ('u', 1) => DataType::UInt8,
        ('u', 2) => DataType::UInt16,
        ('u', 4) => DataType::UInt32,
        ('u', 8) => DataType::UInt64,
        ('f', 2) => DataType::Float16,
        ('f', 4) => DataType::Float32,
        ('f', 8) => DataType::Float64,
        ('c', 8) => DataType::Complex64,
        ('c', 16) => DataType::Complex128,
        ('S', _) | ('U', _) => DataType::String,
        ('V', _) => DataType::Bytes,
        ('M', _) | ('m', _) => {
            // Treat datetime/timedelta as Int64 (epoch-based)
            DataType::Int64
        }
        _ => {
            return Err(format!(
                "Unsupported NumPy type: {}{}",
                fmt.type_code, fmt.byte_size
            ));
        }
    };

    Ok(NumPyDataType {
        data_type: core,
        byte_order: parse_byte_order(fmt.byte_order)?,
    })
}

// ---------------------------------------------------------------------------
// ElementVector  (typed decoded payload)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum ElementVector {
    VBool(Vec<bool>),
    VInt8(Vec<i8>),
    VInt16(Vec<i16>),
    VInt32(Vec<i32>),
    VInt64(Vec<i64>),
    VUInt8(Vec<u8>),
    VUInt16(Vec<u16>),
    VUInt32(Vec<u32>),
    VUInt64(Vec<u64>),
    VFloat16(Vec<f16>),
    VFloat32(Vec<f32>),
    VFloat64(Vec<f64>),
    VComplex64(Vec<Complex<f32>>),
    VComplex128(Vec<Complex<f64>>),
}

impl ElementVector {
    /// Number of elements in the vector.
    pub fn len(&self) -> usize {
        match self {
            ElementVector::VBool(v) => v.len(),
            ElementVector::VInt8(v) => v.len(),
            ElementVector::VInt16(v) => v.len(),
            ElementVector::VInt32(v) => v.len(),
            ElementVector::VInt64(v) => v.len(),
            ElementVector::VUInt8(v) => v.len(),
            ElementVector::VUInt16(v) => v.len(),
            ElementVector::VUInt32(v) => v.len(),
            ElementVector::VUInt64(v) => v.len(),
            ElementVector::VFloat16(v) => v.len(),
            ElementVector::VFloat32(v) => v.len(),
            ElementVector::VFloat64(v) => v.len(),
            ElementVector::VComplex64(v) => v.len(),
            ElementVector::VComplex128(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert every element to a JSON value. Non-finite floats become null
    /// (JSON has no NaN/Infinity); complex numbers become `[re, im]` pairs.
    pub fn into_json(self) -> Vec<Value> {
        match self {
            ElementVector::VBool(v) => v.into_iter().map(Value::Bool).collect(),
            ElementVector::VInt8(v) => v.into_iter().map(|x| Value::from(x as i64)).collect(),
            ElementVector::VInt16(v) => v.into_iter().map(|x| Value::from(x as i64)).collect(),
            ElementVector::VInt32(v) => v.into_iter().map(|x| Value::from(x as i64)).collect(),
            ElementVector::VInt64(v) => v.into_iter().map(Value::from).collect(),
            ElementVector::VUInt8(v) => v.into_iter().map(|x| Value::from(x as u64)).collect(),
            ElementVector::VUInt16(v) => v.into_iter().map(|x| Value::from(x as u64)).collect(),
            ElementVector::VUInt32(v) => v.into_iter().map(|x| Value::from(x as u64)).collect(),
            ElementVector::VUInt64(v) => v.into_iter().map(Value::from).collect(),
            ElementVector::VFloat16(v) => v.into_iter().map(|x| float_json(x.to_f64())).collect(),
            ElementVector::VFloat32(v) => v.into_iter().map(|x| float_json(x as f64)).collect(),
            ElementVector::VFloat64(v) => v.into_iter().map(float_json).collect(),
            ElementVector::VComplex64(v) => v
                .into_iter()
                .map(|c| Value::Array(vec![float_json(c.re as f64), float_json(c.im as f64)]))
                .collect(),
            ElementVector::VComplex128(v) => v
                .into_iter()
                .map(|c| Value::Array(vec![float_json(c.re), float_json(c.im)]))
                .collect(),
        }
    }
}

/// JSON representation of a float. Integral values serialize without a
/// fractional part; NaN and infinities map to null.
pub fn float_json(x: f64) -> Value {
    if !x.is_finite() {
        return Value::Null;
    }
    if x.fract() == 0.0 && x.abs() < (i64::MAX as f64) {
        return Value::from(x as i64);
    }
    serde_json::Number::from_f64(x).map(Value::Number).unwrap_or(Value::Null)
}

// ---------------------------------------------------------------------------
// Raw bytes -> typed vector
// ---------------------------------------------------------------------------

/// Interpret raw bytes as a typed vector according to `endian` and `dtype`.
pub fn bytes_to_vector(
    endian: Endian,
    dtype: DataType,
    data: &[u8],
) -> VoxResult<ElementVector> {
    match dtype {
        DataType::Bool => Ok(ElementVector::VBool(
            data.iter().map(|b| *b != 0).collect(),
        )),
        DataType::Int8 => Ok(ElementVector::VInt8(
            data.iter().map(|b| *b as i8).collect(),
        )),
        DataType::UInt8 => Ok(ElementVector::VUInt8(data.to_vec())),

        DataType::Int16 => read_vec_typed(
            endian,
            data,
            |c| c.read_i16::<LittleEndian>(),
            |c| c.read_i16::<BigEndian>(),
            ElementVector::VInt16,
        ),
        DataType::Int32 => read_vec_typed(
            endian,
            data,
            |c| c.read_i32::<LittleEndian>(),
            |c| c.read_i32::<BigEndian>(),
            ElementVector::VInt32,
        ),
        DataType::Int64 => read_vec_typed(
            endian,
            data,
            |c| c.read_i64::<LittleEndian>(),
            |c| c.read_i64::<BigEndian>(),
            ElementVector::VInt64,
        ),
        DataType::UInt16 => read_vec_typed(
            endian,
            data,
            |c| c.read_u16::<LittleEndian>(),
            |c| c.read_u16::<BigEndian>(),
            ElementVector::VUInt16,
        ),
        DataType::UInt32 => read_vec_typed(
            endian,
            data,
            |c| c.read_u32::<LittleEndian>(),
            |c| c.read_u32::<BigEndian>(),
            ElementVector::VUInt32,
        ),
        DataType::UInt64 => read_vec_typed(
            endian,
            data,
            |c| c.read_u64::<LittleEndian>(),
            |c| c.read_u64::<BigEndian>(),
            ElementVector::VUInt64,
        ),

        DataType::Float16 => {
            let elem_size = 2;
            let count = data.len() / elem_size;
            let mut out = Vec::with_capacity(count);
            let mut cursor = Cursor::new(data);
            for _ in 0..count {
                let bits = match endian {
                    Endian::Little | Endian::NotApplicable => cursor.read_u16::<LittleEndian>(),
                    Endian::Big => cursor.read_u16::<BigEndian>(),
                }
                .map_err(|e| VoxError::Decode(format!("Failed to read f16: {e}")))?;
                out.push(f16::from_bits(bits));
            }
            Ok(ElementVector::VFloat16(out))
        }
        DataType::Float32 => read_vec_typed(
            endian,
            data,
            |c| c.read_f32::<LittleEndian>(),
            |c| c.read_f32::<BigEndian>(),
            ElementVector::VFloat32,
        ),
        DataType::Float64 => read_vec_typed(
            endian,
            data,
            |c| c.read_f64::<LittleEndian>(),
            |c| c.read_f64::<BigEndian>(),
            ElementVector::VFloat64,
        ),

        DataType::Complex64 => {
            let elem_size = 8;
            let count = data.len() / elem_size;
            let mut out = Vec::with_capacity(count);
            let mut cursor = Cursor::new(data);
            for _ in 0..count {
                let re = match endian {
                    Endian::Little | Endian::NotApplicable => cursor.read_f32::<LittleEndian>(),
                    Endian::Big => cursor.read_f32::<BigEndian>(),
                }
                .map_err(|e| VoxError::Decode(format!("Failed to read complex64 re: {e}")))?;
                let im = match endian {
                    Endian::Little | Endian::NotApplicable => cursor.read_f32::<LittleEndian>(),
                    Endian::Big => cursor.read_f32::<BigEndian>(),
                }
                .map_err(|e| VoxError::Decode(format!("Failed to read complex64 im: {e}")))?;
                out.push(Complex::new(re, im));
            }
            Ok(ElementVector::VComplex64(out))
        }
        DataType::Complex128 => {
            let elem_size = 16;
            let count = data.len() / elem_size;
            let mut out = Vec::with_capacity(count);
            let mut cursor = Cursor::new(data);
            for _ in 0..count {
                let re = match endian {
                    Endian::Little | Endian::NotApplicable => cursor.read_f64::<LittleEndian>(),
                    Endian::Big => cursor.read_f64::<BigEndian>(),
                }
                .map_err(|e| VoxError::Decode(format!("Failed to read complex128 re: {e}")))?;
                let im = match endian {
                    Endian::Little | Endian::NotApplicable => cursor.read_f64::<LittleEndian>(),
                    Endian::Big => cursor.read_f64::<BigEndian>(),
                }
                .map_err(|e| VoxError::Decode(format!("Failed to read complex128 im: {e}")))?;
                out.push(Complex::new(re, im));
            }
            Ok(ElementVector::VComplex128(out))
        }
        DataType::String | DataType::Bytes => Err(VoxError::Decode(
            "Cannot interpret raw bytes as String/Bytes vector without length info".into(),
        )),
    }
}

/// Helper: read a vector of a fixed-size numeric type.
fn read_vec_typed<T: Clone, F1, F2>(
    endian: Endian,
    data: &[u8],
    read_le: F1,
    read_be: F2,
    wrap: fn(Vec<T>) -> ElementVector,
) -> VoxResult<ElementVector>
where
    F1: Fn(&mut Cursor<&[u8]>) -> std::io::Result<T>,
    F2: Fn(&mut Cursor<&[u8]>) -> std::io::Result<T>,
{
    let elem_size = std::mem::size_of::<T>();
    let count = data.len() / elem_size;
    let mut out = Vec::with_capacity(count);
    let mut cursor = Cursor::new(data);
    for _ in 0..count {
        let val = match endian {
            Endian::Little | Endian::NotApplicable => (read_le)(&mut cursor),
            Endian::Big => (read_be)(&mut cursor),
        }
        .map_err(|e| VoxError::Decode(format!("Failed to read value: {e}")))?;
        out.push(val);
    }
    Ok(wrap(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_common_dtypes() {
        let dt = parse_numpy_dtype("<f8").unwrap();
        assert_eq!(dt.data_type, DataType::Float64);
        assert_eq!(dt.byte_order, Endian::Little);

        let dt = parse_numpy_dtype(">i4").unwrap();
        assert_eq!(dt.data_type, DataType::Int32);
        assert_eq!(dt.byte_order, Endian::Big);

        let dt = parse_numpy_dtype("|b1").unwrap();
        assert_eq!(dt.data_type, DataType::Bool);
        assert_eq!(dt.byte_order, Endian::NotApplicable);
    }

    #[test]
    fn rejects_malformed_dtypes() {
        assert!(parse_numpy_dtype("f8").is_err());
        assert!(parse_numpy_dtype("<x8").is_err());
        assert!(parse_numpy_dtype("<i0").is_err());
    }

    #[test]
    fn decodes_little_endian_i32() {
        let data: Vec<u8> = [1i32, 2, 3]
            .iter()
            .flat_map(|x| x.to_le_bytes())
            .collect();
        let vec = bytes_to_vector(Endian::Little, DataType::Int32, &data).unwrap();
        assert_eq!(vec.into_json(), vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn decodes_big_endian_f64() {
        let data: Vec<u8> = [1.5f64, -2.0]
            .iter()
            .flat_map(|x| x.to_be_bytes())
            .collect();
        let vec = bytes_to_vector(Endian::Big, DataType::Float64, &data).unwrap();
        assert_eq!(vec.into_json(), vec![json!(1.5), json!(-2)]);
    }

    #[test]
    fn empty_payload_decodes_to_empty_vector() {
        let vec = bytes_to_vector(Endian::Little, DataType::Float64, &[]).unwrap();
        assert_eq!(vec.len(), 0);
        assert!(vec.is_empty());
    }

    #[test]
    fn non_finite_floats_become_null() {
        let data: Vec<u8> = [f64::NAN, f64::INFINITY, 1.0]
            .iter()
            .flat_map(|x| x.to_le_bytes())
            .collect();
        let vec = bytes_to_vector(Endian::Little, DataType::Float64, &data).unwrap();
        assert_eq!(vec.into_json(), vec![Value::Null, Value::Null, json!(1)]);
    }
}
