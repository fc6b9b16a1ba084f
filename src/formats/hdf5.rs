//! HDF5 -> canonical JSON conversion.
//!
//! The file hierarchy is mirrored into a JSON object: groups become objects
//! keyed by child name (group attributes under `"_attrs"`), datasets become
//! `{shape, dtype, data, attrs?}` objects with the values flattened into a
//! plain array. An unreadable dataset degrades to `data: null` with a logged
//! warning instead of failing the whole conversion.

use std::path::Path;

use hdf5::types::{FloatSize, IntSize, TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Attribute, Dataset, File, Group};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::VoxResult;
use crate::types::float_json;

/// Convert an HDF5 file into canonical JSON text.
pub fn normalize(path: &Path) -> VoxResult<String> {
    let file = File::open(path)?;
    let value = group_to_json(&file)?;
    Ok(serde_json::to_string(&value)?)
}

// ---------------------------------------------------------------------------
// Hierarchy walk
// ---------------------------------------------------------------------------

fn group_to_json(group: &Group) -> VoxResult<Value> {
    let mut obj = Map::new();
    if let Some(attrs) = attrs_to_json(group) {
        obj.insert("_attrs".into(), attrs);
    }
    for name in group.member_names()? {
        if let Ok(child) = group.group(&name) {
            let value = group_to_json(&child)?;
            obj.insert(name, value);
        } else if let Ok(dataset) = group.dataset(&name) {
            let value = dataset_to_json(&name, &dataset);
            obj.insert(name, value);
        }
        // Other link kinds (named datatypes, dangling links) are skipped.
    }
    Ok(Value::Object(obj))
}

fn dataset_to_json(name: &str, dataset: &Dataset) -> Value {
    let mut obj = Map::new();
    obj.insert(
        "shape".into(),
        Value::Array(
            dataset
                .shape()
                .iter()
                .map(|&d| Value::from(d as u64))
                .collect(),
        ),
    );
    obj.insert("dtype".into(), Value::String(dtype_name(dataset)));

    let data = match read_values(dataset) {
        Ok(values) => Value::Array(values),
        Err(e) => {
            warn!("Skipping unreadable dataset {name}: {e}");
            Value::Null
        }
    };
    obj.insert("data".into(), data);

    if let Some(attrs) = attrs_to_json(dataset) {
        obj.insert("attrs".into(), attrs);
    }
    Value::Object(obj)
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// Collect an object's attributes into a JSON object; `None` when there are
/// none. An unreadable attribute becomes null.
fn attrs_to_json(location: &hdf5::Location) -> Option<Value> {
    let names = location.attr_names().ok()?;
    if names.is_empty() {
        return None;
    }
    let mut map = Map::new();
    for name in names {
        let value = location
            .attr(&name)
            .ok()
            .and_then(|attr| attr_to_json(&attr));
        map.insert(name, value.unwrap_or(Value::Null));
    }
    Some(Value::Object(map))
}

fn attr_to_json(attr: &Attribute) -> Option<Value> {
    let scalar = attr.shape().is_empty();
    let mut values = read_values(attr).ok()?;
    if scalar {
        values.pop()
    } else {
        Some(Value::Array(values))
    }
}

// ---------------------------------------------------------------------------
// Value reading
// ---------------------------------------------------------------------------

/// Read a dataset or attribute as a flat list of JSON values, converting
/// numerics to their widest native type.
fn read_values(container: &hdf5::Container) -> hdf5::Result<Vec<Value>> {
    let descriptor = container.dtype()?.to_descriptor()?;
    let values = match descriptor {
        TypeDescriptor::Integer(_) => container
            .read_raw::<i64>()?
            .into_iter()
            .map(Value::from)
            .collect(),
        TypeDescriptor::Unsigned(_) => container
            .read_raw::<u64>()?
            .into_iter()
            .map(Value::from)
            .collect(),
        TypeDescriptor::Float(_) => container
            .read_raw::<f64>()?
            .into_iter()
            .map(float_json)
            .collect(),
        TypeDescriptor::Boolean => container
            .read_raw::<bool>()?
            .into_iter()
            .map(Value::Bool)
            .collect(),
        TypeDescriptor::VarLenUnicode => container
            .read_raw::<VarLenUnicode>()?
            .into_iter()
            .map(|s| Value::String(s.as_str().to_string()))
            .collect(),
        TypeDescriptor::VarLenAscii => container
            .read_raw::<VarLenAscii>()?
            .into_iter()
            .map(|s| Value::String(s.as_str().to_string()))
            .collect(),
        other => {
            return Err(hdf5::Error::from(format!(
                "Unsupported HDF5 dtype: {other:?}"
            )));
        }
    };
    Ok(values)
}

/// NumPy-style name for a dataset's dtype.
fn dtype_name(dataset: &Dataset) -> String {
    let descriptor = match dataset.dtype().and_then(|dt| dt.to_descriptor()) {
        Ok(d) => d,
        Err(_) => return "unknown".into(),
    };
    match descriptor {
        TypeDescriptor::Integer(IntSize::U1) => "int8".into(),
        TypeDescriptor::Integer(IntSize::U2) => "int16".into(),
        TypeDescriptor::Integer(IntSize::U4) => "int32".into(),
        TypeDescriptor::Integer(IntSize::U8) => "int64".into(),
        TypeDescriptor::Unsigned(IntSize::U1) => "uint8".into(),
        TypeDescriptor::Unsigned(IntSize::U2) => "uint16".into(),
        TypeDescriptor::Unsigned(IntSize::U4) => "uint32".into(),
        TypeDescriptor::Unsigned(IntSize::U8) => "uint64".into(),
        TypeDescriptor::Float(FloatSize::U4) => "float32".into(),
        TypeDescriptor::Float(FloatSize::U8) => "float64".into(),
        TypeDescriptor::Boolean => "bool".into(),
        TypeDescriptor::VarLenUnicode | TypeDescriptor::VarLenAscii => "str".into(),
        TypeDescriptor::FixedUnicode(n) => format!("U{n}"),
        TypeDescriptor::FixedAscii(n) => format!("S{n}"),
        other => format!("{other:?}"),
    }
}
