// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! The part-program variable store.
//!
//! Names are case insensitive and live in one of four namespaces: scalars
//! and dense 1-, 2- and 3-dimensional arrays.  A name exists in at most one
//! of them.  Element types are fixed at definition time; callers are
//! expected to `assign_cast` before writing, so a tag mismatch here is a
//! caller bug and reported as [`AccessError::TypeMismatch`].

use std::collections::HashMap;

use crate::value::{Value, ValueType};

/// Largest allowed extent of a single array dimension.
const MAX_ARRAY_SIZE: i32 = 32767;

/// Why a definition was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefineError {
    AlreadyExists,
    InvalidArraySize,
    InvalidDimensionCount,
    OutOfMemory,
}

/// Why a read or write was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    NotDefined,
    IndexOutOfBounds,
    /// Indexing arity outside 1..=3.
    InvalidDimensionCount,
    /// Indexing arity differs from the defined rank.
    DimensionMismatch,
    TypeMismatch,
}

#[derive(Debug, Clone)]
struct Array2 {
    data: Vec<Value>,
    dims: [usize; 2],
}

#[derive(Debug, Clone)]
struct Array3 {
    data: Vec<Value>,
    dims: [usize; 3],
}

/// The store itself.
#[derive(Debug, Default)]
pub struct Variables {
    scalars: HashMap<String, Value>,
    arrays1: HashMap<String, Vec<Value>>,
    arrays2: HashMap<String, Array2>,
    arrays3: HashMap<String, Array3>,
}

fn key(name: &str) -> String {
    name.to_ascii_uppercase()
}

/// Allocate `n` default elements without aborting on exhaustion.
fn alloc(n: usize, t: ValueType) -> Result<Vec<Value>, DefineError> {
    let mut data = Vec::new();
    data.try_reserve_exact(n).map_err(|_| DefineError::OutOfMemory)?;
    data.resize(n, t.default_value());
    Ok(data)
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a scalar with an explicit initial value.
    pub fn define(&mut self, name: &str, init: Value) -> Result<(), DefineError> {
        if self.is_defined(name) {
            return Err(DefineError::AlreadyExists);
        }
        self.scalars.insert(key(name), init);
        Ok(())
    }

    /// Define a default-initialized array of 1 to 3 dimensions.
    pub fn define_array(&mut self, name: &str, t: ValueType, dims: &[i32]) -> Result<(), DefineError> {
        if self.is_defined(name) {
            return Err(DefineError::AlreadyExists);
        }
        if dims.iter().any(|&d| d <= 0 || d > MAX_ARRAY_SIZE) {
            return Err(DefineError::InvalidArraySize);
        }
        // The per-dimension cap still allows a 3-D product beyond addressable
        // memory; the checked product and fallible reserve turn that into
        // OutOfMemory instead of a wrap or abort.
        let total = dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d as usize))
            .ok_or(DefineError::OutOfMemory)?;
        match *dims {
            [_] => {
                self.arrays1.insert(key(name), alloc(total, t)?);
            }
            [d1, d2] => {
                self.arrays2.insert(
                    key(name),
                    Array2 { data: alloc(total, t)?, dims: [d1 as usize, d2 as usize] },
                );
            }
            [d1, d2, d3] => {
                self.arrays3.insert(
                    key(name),
                    Array3 { data: alloc(total, t)?, dims: [d1 as usize, d2 as usize, d3 as usize] },
                );
            }
            _ => return Err(DefineError::InvalidDimensionCount),
        }
        Ok(())
    }

    pub fn is_defined(&self, name: &str) -> bool {
        let k = key(name);
        self.scalars.contains_key(&k)
            || self.arrays1.contains_key(&k)
            || self.arrays2.contains_key(&k)
            || self.arrays3.contains_key(&k)
    }

    /// Rank of a defined name: 0 for scalars, 1-3 for arrays.
    pub fn dimension_count(&self, name: &str) -> Option<usize> {
        let k = key(name);
        if self.scalars.contains_key(&k) {
            Some(0)
        } else if self.arrays1.contains_key(&k) {
            Some(1)
        } else if self.arrays2.contains_key(&k) {
            Some(2)
        } else if self.arrays3.contains_key(&k) {
            Some(3)
        } else {
            None
        }
    }

    pub fn get_value(&self, name: &str) -> Result<Value, AccessError> {
        self.scalars.get(&key(name)).cloned().ok_or(AccessError::NotDefined)
    }

    pub fn set_value(&mut self, name: &str, value: Value) -> Result<(), AccessError> {
        let slot = self.scalars.get_mut(&key(name)).ok_or(AccessError::NotDefined)?;
        if slot.tag() != value.tag() {
            return Err(AccessError::TypeMismatch);
        }
        *slot = value;
        Ok(())
    }

    pub fn get_array_value(&self, name: &str, indices: &[i32]) -> Result<Value, AccessError> {
        Ok(self.array_slot(name, indices)?.clone())
    }

    pub fn set_array_value(&mut self, name: &str, value: Value, indices: &[i32]) -> Result<(), AccessError> {
        let slot = self.array_slot_mut(name, indices)?;
        if slot.tag() != value.tag() {
            return Err(AccessError::TypeMismatch);
        }
        *slot = value;
        Ok(())
    }

    /// Drop every entry.  The controller reseeds `R` and `$P_GG` afterwards.
    pub fn clear(&mut self) {
        self.scalars.clear();
        self.arrays1.clear();
        self.arrays2.clear();
        self.arrays3.clear();
    }

    fn flat_index(dims: &[usize], indices: &[i32]) -> Result<usize, AccessError> {
        let mut flat = 0usize;
        for (&dim, &idx) in dims.iter().zip(indices) {
            if idx < 0 || idx as usize >= dim {
                return Err(AccessError::IndexOutOfBounds);
            }
            flat = flat * dim + idx as usize;
        }
        Ok(flat)
    }

    fn array_slot(&self, name: &str, indices: &[i32]) -> Result<&Value, AccessError> {
        let k = key(name);
        let rank = self.dimension_count(name).ok_or(AccessError::NotDefined)?;
        match indices.len() {
            1..=3 if rank != 0 && rank != indices.len() => Err(AccessError::DimensionMismatch),
            1 => {
                let arr = self.arrays1.get(&k).ok_or(AccessError::NotDefined)?;
                arr.get(Self::flat_index(&[arr.len()], indices)?).ok_or(AccessError::IndexOutOfBounds)
            }
            2 => {
                let arr = self.arrays2.get(&k).ok_or(AccessError::NotDefined)?;
                arr.data.get(Self::flat_index(&arr.dims, indices)?).ok_or(AccessError::IndexOutOfBounds)
            }
            3 => {
                let arr = self.arrays3.get(&k).ok_or(AccessError::NotDefined)?;
                arr.data.get(Self::flat_index(&arr.dims, indices)?).ok_or(AccessError::IndexOutOfBounds)
            }
            _ => Err(AccessError::InvalidDimensionCount),
        }
    }

    fn array_slot_mut(&mut self, name: &str, indices: &[i32]) -> Result<&mut Value, AccessError> {
        let k = key(name);
        let rank = self.dimension_count(name).ok_or(AccessError::NotDefined)?;
        match indices.len() {
            1..=3 if rank != 0 && rank != indices.len() => Err(AccessError::DimensionMismatch),
            1 => {
                let arr = self.arrays1.get_mut(&k).ok_or(AccessError::NotDefined)?;
                let flat = Self::flat_index(&[arr.len()], indices)?;
                arr.get_mut(flat).ok_or(AccessError::IndexOutOfBounds)
            }
            2 => {
                let arr = self.arrays2.get_mut(&k).ok_or(AccessError::NotDefined)?;
                let flat = Self::flat_index(&arr.dims, indices)?;
                arr.data.get_mut(flat).ok_or(AccessError::IndexOutOfBounds)
            }
            3 => {
                let arr = self.arrays3.get_mut(&k).ok_or(AccessError::NotDefined)?;
                let flat = Self::flat_index(&arr.dims, indices)?;
                arr.data.get_mut(flat).ok_or(AccessError::IndexOutOfBounds)
            }
            _ => Err(AccessError::InvalidDimensionCount),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_are_case_insensitive() {
        let mut v = Variables::new();
        v.define("Depth", Value::Real(2.0)).unwrap();
        assert_eq!(v.get_value("DEPTH"), Ok(Value::Real(2.0)));
        assert_eq!(v.define("depth", Value::Real(0.0)), Err(DefineError::AlreadyExists));
    }

    #[test]
    fn one_namespace_per_name() {
        let mut v = Variables::new();
        v.define_array("arr", ValueType::Int, &[4]).unwrap();
        assert_eq!(v.define("ARR", Value::Int(0)), Err(DefineError::AlreadyExists));
        assert_eq!(v.define_array("ARR", ValueType::Int, &[2, 2]), Err(DefineError::AlreadyExists));
    }

    #[test]
    fn array_definition_limits() {
        let mut v = Variables::new();
        assert_eq!(v.define_array("a", ValueType::Int, &[0]), Err(DefineError::InvalidArraySize));
        assert_eq!(v.define_array("a", ValueType::Int, &[32768]), Err(DefineError::InvalidArraySize));
        assert_eq!(v.define_array("a", ValueType::Int, &[1, 1, 1, 1]), Err(DefineError::InvalidDimensionCount));
        assert_eq!(v.define_array("a", ValueType::Int, &[]), Err(DefineError::InvalidDimensionCount));
    }

    #[test]
    fn array_access() {
        let mut v = Variables::new();
        v.define_array("m", ValueType::Real, &[2, 3]).unwrap();
        v.set_array_value("m", Value::Real(7.0), &[1, 2]).unwrap();
        assert_eq!(v.get_array_value("M", &[1, 2]), Ok(Value::Real(7.0)));
        assert_eq!(v.get_array_value("m", &[0, 0]), Ok(Value::Real(0.0)));
        assert_eq!(v.get_array_value("m", &[2, 0]), Err(AccessError::IndexOutOfBounds));
        assert_eq!(v.get_array_value("m", &[0, -1]), Err(AccessError::IndexOutOfBounds));
        assert_eq!(v.get_array_value("m", &[1]), Err(AccessError::DimensionMismatch));
        assert_eq!(v.get_array_value("nope", &[0]), Err(AccessError::NotDefined));
    }

    #[test]
    fn set_requires_matching_tag() {
        let mut v = Variables::new();
        v.define("x", Value::Int(1)).unwrap();
        assert_eq!(v.set_value("x", Value::Real(2.0)), Err(AccessError::TypeMismatch));
        v.define_array("a", ValueType::Int, &[3]).unwrap();
        assert_eq!(v.set_array_value("a", Value::Bool(true), &[0]), Err(AccessError::TypeMismatch));
    }
}
