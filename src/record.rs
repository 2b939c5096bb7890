//! Decoded trace type shared by SEG-Y and SEG-D.
//!
//! A [`Trace`] pairs the merged header fields of every header block the
//! trace carries (primary plus additional blocks) with its samples
//! widened to `f64`.

use std::fmt;

use crate::value::{FieldValue, HeaderMap};

/// One trace: header fields and samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    pub headers: HeaderMap,
    pub samples: Vec<f64>,
}

impl Trace {
    /// Create an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header field.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Replace all header fields.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set the sample data.
    pub fn with_samples(mut self, samples: Vec<f64>) -> Self {
        self.samples = samples;
        self
    }

    pub fn header(&self, name: &str) -> Option<FieldValue> {
        self.headers.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} header fields | {} samples",
            self.headers.len(),
            self.samples.len()
        )
    }
}
