//! PipelineState - write-once store of stage outputs

use std::collections::HashMap;

use serde::Serialize;

use crate::TutorError;

/// Accumulated stage outputs for a single run
///
/// Keys are kept in completion order. A key is never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineState {
    values: HashMap<String, String>,
    order: Vec<String>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `text` under `key`
    ///
    /// # Errors
    /// `TutorError::DuplicateOutput` if `key` already holds a value; the
    /// existing value is left untouched.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<(), TutorError> {
        let key = key.into();
        if self.values.contains_key(&key) {
            return Err(TutorError::duplicate_output(key));
        }
        self.order.push(key.clone());
        self.values.insert(key, text.into());
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keys in completion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// `(key, text)` pairs in completion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order
            .iter()
            .map(|key| (key.as_str(), self.values[key].as_str()))
    }
}
