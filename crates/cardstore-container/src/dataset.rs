//! Typed-array datasets.
//!
//! A dataset is a homogeneous array of one element type plus a dataspace
//! describing its shape. The null dataspace carries no elements at all and is
//! the container's native way of saying "nothing stored here".

use serde::{Deserialize, Serialize};

use crate::error::{ContainerError, Result};

/// Element type of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    Int,
    Float,
    Bool,
    Bytes,
}

impl DType {
    pub fn name(self) -> &'static str {
        match self {
            DType::Int => "int64",
            DType::Float => "float64",
            DType::Bool => "bool",
            DType::Bytes => "bytes",
        }
    }
}

/// Flat element storage, row-major for 2-D datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayData {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Bool(Vec<bool>),
    Bytes(Vec<Vec<u8>>),
}

impl ArrayData {
    pub fn empty(dtype: DType) -> Self {
        match dtype {
            DType::Int => ArrayData::Int(Vec::new()),
            DType::Float => ArrayData::Float(Vec::new()),
            DType::Bool => ArrayData::Bool(Vec::new()),
            DType::Bytes => ArrayData::Bytes(Vec::new()),
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            ArrayData::Int(_) => DType::Int,
            ArrayData::Float(_) => DType::Float,
            ArrayData::Bool(_) => DType::Bool,
            ArrayData::Bytes(_) => DType::Bytes,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ArrayData::Int(v) => v.len(),
            ArrayData::Float(v) => v.len(),
            ArrayData::Bool(v) => v.len(),
            ArrayData::Bytes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single element pulled out of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Element<'a> {
    Int(i64),
    Float(f64),
    Bool(bool),
    Bytes(&'a [u8]),
}

/// Shape of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dataspace {
    /// No elements; used to mark an explicitly absent value.
    Null,
    /// Exactly one element, no dimensions.
    Scalar,
    /// An n-dimensional array.
    Simple(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    space: Dataspace,
    data: ArrayData,
}

impl Dataset {
    pub fn null() -> Self {
        Self {
            space: Dataspace::Null,
            data: ArrayData::Int(Vec::new()),
        }
    }

    pub fn scalar_int(value: i64) -> Self {
        Self {
            space: Dataspace::Scalar,
            data: ArrayData::Int(vec![value]),
        }
    }

    pub fn scalar_float(value: f64) -> Self {
        Self {
            space: Dataspace::Scalar,
            data: ArrayData::Float(vec![value]),
        }
    }

    pub fn scalar_bool(value: bool) -> Self {
        Self {
            space: Dataspace::Scalar,
            data: ArrayData::Bool(vec![value]),
        }
    }

    pub fn scalar_bytes(value: impl Into<Vec<u8>>) -> Self {
        Self {
            space: Dataspace::Scalar,
            data: ArrayData::Bytes(vec![value.into()]),
        }
    }

    /// 1-D array holding every element of `data`.
    pub fn array(data: ArrayData) -> Self {
        let n = data.len();
        Self {
            space: Dataspace::Simple(vec![n]),
            data,
        }
    }

    /// N-D array; the product of `shape` must equal the element count.
    pub fn with_shape(data: ArrayData, shape: Vec<usize>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() || shape.is_empty() {
            return Err(ContainerError::ShapeMismatch {
                shape,
                len: data.len(),
            });
        }
        Ok(Self {
            space: Dataspace::Simple(shape),
            data,
        })
    }

    /// 2-D array of `rows x width`, flattened row-major in `data`.
    pub fn matrix(data: ArrayData, width: usize) -> Result<Self> {
        if width == 0 {
            return Err(ContainerError::ShapeMismatch {
                shape: vec![0, width],
                len: data.len(),
            });
        }
        let rows = data.len() / width;
        Self::with_shape(data, vec![rows, width])
    }

    pub fn space(&self) -> &Dataspace {
        &self.space
    }

    pub fn shape(&self) -> &[usize] {
        match &self.space {
            Dataspace::Simple(shape) => shape,
            Dataspace::Null | Dataspace::Scalar => &[],
        }
    }

    pub fn is_null(&self) -> bool {
        self.space == Dataspace::Null
    }

    pub fn is_scalar(&self) -> bool {
        self.space == Dataspace::Scalar
    }

    /// Number of dimensions; 0 for scalar and null datasets.
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Number of stored elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Leading dimension: rows of a 2-D array, elements of a 1-D array.
    pub fn rows(&self) -> usize {
        self.shape().first().copied().unwrap_or(0)
    }

    /// Elements per row; 1 for anything that is not 2-D.
    pub fn row_width(&self) -> usize {
        match self.shape() {
            [_, width] => *width,
            _ => 1,
        }
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn into_data(self) -> ArrayData {
        self.data
    }

    pub fn element(&self, index: usize) -> Option<Element<'_>> {
        match &self.data {
            ArrayData::Int(v) => v.get(index).map(|x| Element::Int(*x)),
            ArrayData::Float(v) => v.get(index).map(|x| Element::Float(*x)),
            ArrayData::Bool(v) => v.get(index).map(|x| Element::Bool(*x)),
            ArrayData::Bytes(v) => v.get(index).map(|x| Element::Bytes(x.as_slice())),
        }
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        match &self.data {
            ArrayData::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match &self.data {
            ArrayData::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bools(&self) -> Option<&[bool]> {
        match &self.data {
            ArrayData::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[Vec<u8>]> {
        match &self.data {
            ArrayData::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_rows_and_width() {
        let ds = Dataset::matrix(ArrayData::Float(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]), 3).unwrap();
        assert_eq!(ds.shape(), &[2, 3]);
        assert_eq!(ds.rows(), 2);
        assert_eq!(ds.row_width(), 3);
        assert_eq!(ds.element(4), Some(Element::Float(4.0)));
    }

    #[test]
    fn shape_must_cover_every_element() {
        let err = Dataset::with_shape(ArrayData::Int(vec![1, 2, 3]), vec![2, 2]).unwrap_err();
        assert!(matches!(err, ContainerError::ShapeMismatch { len: 3, .. }));
    }

    #[test]
    fn null_dataset_has_no_shape() {
        let ds = Dataset::null();
        assert!(ds.is_null());
        assert_eq!(ds.ndim(), 0);
        assert!(ds.is_empty());
    }

    #[test]
    fn empty_array_keeps_its_dtype() {
        let ds = Dataset::array(ArrayData::empty(DType::Bytes));
        assert_eq!(ds.shape(), &[0]);
        assert_eq!(ds.dtype(), DType::Bytes);
    }
}
