//! Records of optimization statistics.
//!
//! A [`Record`] is a string-keyed container of heterogeneous values used to
//! report what happened during an optimization call: scalar losses, gradient
//! norms, downsampled error vectors, timestamps. The learning core only emits
//! records; storage and aggregation are the enclosing training loop's job.
use crate::error::JumpyError;
use chrono::prelude::{DateTime, Local};
use std::collections::{
    hash_map::{IntoIter, Iter, Keys},
    HashMap,
};

/// Represents possible types of values in a [`Record`].
#[derive(Debug, Clone)]
pub enum RecordValue {
    /// A single floating-point value, typically a loss or a norm.
    Scalar(f32),

    /// A timestamp with local timezone.
    DateTime(DateTime<Local>),

    /// A 1-dimensional array of floating-point values.
    Array1(Vec<f32>),

    /// A text value.
    String(String),
}

/// A string-keyed container of [`RecordValue`]s.
#[derive(Debug, Clone, Default)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record containing a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(slice: &[(K, RecordValue)]) -> Self {
        Self(
            slice
                .iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns the value for the given key, if present.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Returns the keys of the record.
    pub fn keys(&self) -> Keys<String, RecordValue> {
        self.0.keys()
    }

    /// Returns an iterator over key-value pairs.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Returns `true` if the record contains no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merges the entries of another record into this one.
    pub fn merge(mut self, record: Record) -> Self {
        self.0.extend(record.0);
        self
    }

    /// Gets a scalar value for the given key.
    pub fn get_scalar(&self, k: &str) -> Result<f32, JumpyError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(JumpyError::RecordValueTypeError("Scalar".into())),
            None => Err(JumpyError::RecordKeyError(k.into())),
        }
    }

    /// Gets a 1-dimensional array value for the given key.
    pub fn get_array1(&self, k: &str) -> Result<Vec<f32>, JumpyError> {
        match self.0.get(k) {
            Some(RecordValue::Array1(v)) => Ok(v.clone()),
            Some(_) => Err(JumpyError::RecordValueTypeError("Array1".into())),
            None => Err(JumpyError::RecordKeyError(k.into())),
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, RecordValue);
    type IntoIter = IntoIter<String, RecordValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
