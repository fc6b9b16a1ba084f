//! Shape inference and reshaping for nested JSON arrays.

use serde_json::Value;

use crate::error::{VoxError, VoxResult};
use crate::types::ArrayOrder;

/// Maximum number of axes the visualizer can lay out.
pub const MAX_DIMS: usize = 3;

// ---------------------------------------------------------------------------
// Shape inference
// ---------------------------------------------------------------------------

/// Compute the rectangular shape of a nested JSON value.
///
/// Scalars (numbers, strings, booleans, nulls, objects) have the empty shape.
/// An empty array has shape `[0]`. A non-empty array has shape
/// `[len] ++ inner` where every element must have the same `inner` shape;
/// ragged nesting yields `None`.
///
/// Each element's shape is computed exactly once, bottom-up.
pub fn shape_of(value: &Value) -> Option<Vec<usize>> {
    match value {
        Value::Array(items) => {
            let mut iter = items.iter();
            let inner = match iter.next() {
                Some(first) => shape_of(first)?,
                None => return Some(vec![0]),
            };
            for item in iter {
                if shape_of(item)? != inner {
                    return None;
                }
            }
            let mut shape = Vec::with_capacity(inner.len() + 1);
            shape.push(items.len());
            shape.extend(inner);
            Some(shape)
        }
        _ => Some(Vec::new()),
    }
}

/// True if the value is rectangular with at most [`MAX_DIMS`] axes. This is
/// the dimension-limit gate shared by normalization and input validation.
pub fn supported_dims(value: &Value) -> bool {
    matches!(shape_of(value), Some(shape) if shape.len() <= MAX_DIMS)
}

/// True if `input` parses as a JSON array that is rectangular with at most
/// [`MAX_DIMS`] axes. Used to validate user-pasted array data.
pub fn valid_json_array(input: &str) -> bool {
    match serde_json::from_str::<Value>(input) {
        Ok(value @ Value::Array(_)) => supported_dims(&value),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Index math
// ---------------------------------------------------------------------------

/// Calculate strides for an N-dimensional array.
pub fn strides(shape: &[usize], order: ArrayOrder) -> Vec<usize> {
    match order {
        ArrayOrder::C => {
            // Row-major: last dimension varies fastest.
            let mut s: Vec<usize> = shape
                .iter()
                .rev()
                .scan(1usize, |state, &dim| {
                    let stride = *state;
                    *state *= dim;
                    Some(stride)
                })
                .collect();
            s.reverse();
            s
        }
        ArrayOrder::F => {
            // Column-major: first dimension varies fastest.
            shape
                .iter()
                .scan(1usize, |state, &dim| {
                    let stride = *state;
                    *state *= dim;
                    Some(stride)
                })
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// Reshape (flat -> nested)
// ---------------------------------------------------------------------------

/// Reshape a flat element buffer into nested JSON arrays matching `shape`.
///
/// Supports 1 to [`MAX_DIMS`] axes; anything else is an
/// [`UnsupportedDims`](VoxError::UnsupportedDims) error.
pub fn nest(values: Vec<Value>, shape: &[usize], order: ArrayOrder) -> VoxResult<Value> {
    let total: usize = shape.iter().product();
    if values.len() < total {
        return Err(VoxError::Decode(format!(
            "Buffer holds {} elements but shape {:?} needs {total}",
            values.len(),
            shape
        )));
    }

    let s = strides(shape, order);
    match shape.len() {
        1 => Ok(Value::Array(values.into_iter().take(shape[0]).collect())),
        2 => {
            let (rows, cols) = (shape[0], shape[1]);
            let mut result = Vec::with_capacity(rows);
            for i in 0..rows {
                let mut row = Vec::with_capacity(cols);
                for j in 0..cols {
                    row.push(values[i * s[0] + j * s[1]].clone());
                }
                result.push(Value::Array(row));
            }
            Ok(Value::Array(result))
        }
        3 => {
            let (depth, rows, cols) = (shape[0], shape[1], shape[2]);
            let mut result = Vec::with_capacity(depth);
            for i in 0..depth {
                let mut plane = Vec::with_capacity(rows);
                for j in 0..rows {
                    let mut row = Vec::with_capacity(cols);
                    for k in 0..cols {
                        row.push(values[i * s[0] + j * s[1] + k * s[2]].clone());
                    }
                    plane.push(Value::Array(row));
                }
                result.push(Value::Array(plane));
            }
            Ok(Value::Array(result))
        }
        n => Err(VoxError::UnsupportedDims(n)),
    }
}
