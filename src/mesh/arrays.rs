//! Typed point / cell attribute arrays
use crate::{Error, Result};

/// Storage of an attribute array, flat with `n_comp` values per tuple
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValues {
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl ArrayValues {
    const fn len(&self) -> usize {
        match self {
            Self::UInt16(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Float64(v) => v.len(),
        }
    }

    /// VTK type name
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::UInt16(_) => "UInt16",
            Self::Int32(_) => "Int32",
            Self::Float32(_) => "Float32",
            Self::Float64(_) => "Float64",
        }
    }

    const fn same_type(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Self::UInt16(_), Self::UInt16(_))
                | (Self::Int32(_), Self::Int32(_))
                | (Self::Float32(_), Self::Float32(_))
                | (Self::Float64(_), Self::Float64(_))
        )
    }
}

/// Attribute array attached to the points or the cells of a `Grid`
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    values: ArrayValues,
    n_comp: usize,
}

impl DataArray {
    /// Create an array, the length of `values` must be a multiple of `n_comp`
    pub fn new(values: ArrayValues, n_comp: usize) -> Result<Self> {
        if n_comp == 0 || values.len() % n_comp != 0 {
            return Err(Error::from(&format!(
                "invalid array: {} values with {} components",
                values.len(),
                n_comp
            )));
        }
        Ok(Self { values, n_comp })
    }

    #[must_use]
    pub const fn from_u16(v: Vec<u16>) -> Self {
        Self {
            values: ArrayValues::UInt16(v),
            n_comp: 1,
        }
    }

    #[must_use]
    pub const fn from_i32(v: Vec<i32>) -> Self {
        Self {
            values: ArrayValues::Int32(v),
            n_comp: 1,
        }
    }

    #[must_use]
    pub const fn from_f64(v: Vec<f64>) -> Self {
        Self {
            values: ArrayValues::Float64(v),
            n_comp: 1,
        }
    }

    /// Zero-filled `Float32` array with `n` tuples of `n_comp` components
    #[must_use]
    pub fn zeros_f32(n: usize, n_comp: usize) -> Self {
        Self {
            values: ArrayValues::Float32(vec![0.0; n * n_comp]),
            n_comp,
        }
    }

    /// Number of tuples
    #[must_use]
    pub const fn len(&self) -> usize {
        self.values.len() / self.n_comp
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.values.len() == 0
    }

    /// Number of components per tuple
    #[must_use]
    pub const fn n_comp(&self) -> usize {
        self.n_comp
    }

    #[must_use]
    pub const fn values(&self) -> &ArrayValues {
        &self.values
    }

    #[must_use]
    pub fn as_u16(&self) -> Option<&[u16]> {
        match &self.values {
            ArrayValues::UInt16(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i32(&self) -> Option<&[i32]> {
        match &self.values {
            ArrayValues::Int32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i32_mut(&mut self) -> Option<&mut [i32]> {
        match &mut self.values {
            ArrayValues::Int32(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.values {
            ArrayValues::Float32(v) => Some(v),
            _ => None,
        }
    }

    /// Values of a single component array converted to `i64`, whatever the storage type
    #[must_use]
    pub fn to_i64(&self) -> Vec<i64> {
        match &self.values {
            ArrayValues::UInt16(v) => v.iter().map(|&x| i64::from(x)).collect(),
            ArrayValues::Int32(v) => v.iter().map(|&x| i64::from(x)).collect(),
            ArrayValues::Float32(v) => v.iter().map(|&x| x as i64).collect(),
            ArrayValues::Float64(v) => v.iter().map(|&x| x as i64).collect(),
        }
    }

    /// Values converted to `f64`
    #[must_use]
    pub fn to_f64(&self) -> Vec<f64> {
        match &self.values {
            ArrayValues::UInt16(v) => v.iter().map(|&x| f64::from(x)).collect(),
            ArrayValues::Int32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            ArrayValues::Float32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            ArrayValues::Float64(v) => v.clone(),
        }
    }

    /// Check if `other` can be appended to `self`
    #[must_use]
    pub const fn is_compatible(&self, other: &Self) -> bool {
        self.n_comp == other.n_comp && self.values.same_type(&other.values)
    }

    /// Append the tuples of `other`
    pub fn extend(&mut self, other: &Self) -> Result<()> {
        match (&mut self.values, &other.values) {
            (ArrayValues::UInt16(a), ArrayValues::UInt16(b)) if self.n_comp == other.n_comp => {
                a.extend_from_slice(b);
            }
            (ArrayValues::Int32(a), ArrayValues::Int32(b)) if self.n_comp == other.n_comp => {
                a.extend_from_slice(b);
            }
            (ArrayValues::Float32(a), ArrayValues::Float32(b)) if self.n_comp == other.n_comp => {
                a.extend_from_slice(b);
            }
            (ArrayValues::Float64(a), ArrayValues::Float64(b)) if self.n_comp == other.n_comp => {
                a.extend_from_slice(b);
            }
            _ => {
                return Err(Error::from(&format!(
                    "cannot append a {}x{} array to a {}x{} array",
                    other.values.type_name(),
                    other.n_comp,
                    self.values.type_name(),
                    self.n_comp
                )))
            }
        }
        Ok(())
    }

    /// Append `n` zero tuples
    pub fn extend_zeros(&mut self, n: usize) {
        let m = n * self.n_comp;
        match &mut self.values {
            ArrayValues::UInt16(v) => v.resize(v.len() + m, 0),
            ArrayValues::Int32(v) => v.resize(v.len() + m, 0),
            ArrayValues::Float32(v) => v.resize(v.len() + m, 0.0),
            ArrayValues::Float64(v) => v.resize(v.len() + m, 0.0),
        }
    }

    /// Copy the tuples with the given indices, in order
    #[must_use]
    pub fn select(&self, ids: &[usize]) -> Self {
        fn pick<T: Copy>(v: &[T], ids: &[usize], n_comp: usize) -> Vec<T> {
            ids.iter()
                .flat_map(|&i| v[n_comp * i..n_comp * (i + 1)].iter().copied())
                .collect()
        }
        let values = match &self.values {
            ArrayValues::UInt16(v) => ArrayValues::UInt16(pick(v, ids, self.n_comp)),
            ArrayValues::Int32(v) => ArrayValues::Int32(pick(v, ids, self.n_comp)),
            ArrayValues::Float32(v) => ArrayValues::Float32(pick(v, ids, self.n_comp)),
            ArrayValues::Float64(v) => ArrayValues::Float64(pick(v, ids, self.n_comp)),
        };
        Self {
            values,
            n_comp: self.n_comp,
        }
    }
}
