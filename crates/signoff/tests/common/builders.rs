//! Builder patterns for creating test data programmatically.

#![allow(dead_code)]

use serde_json::{Map, Value};

use signoff::{DocumentUpload, TemplateVariable};

/// Builder for `DocumentUpload` instances.
pub struct UploadBuilder {
    name: String,
    data: Map<String, Value>,
}

impl UploadBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            data: Map::new(),
        }
    }

    /// Sets a template field value.
    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub fn build(self) -> DocumentUpload {
        DocumentUpload::new(self.name, self.data)
    }
}

/// `n` uploads named `doc-0`..`doc-{n-1}` with no field values.
pub fn uploads(n: usize) -> Vec<DocumentUpload> {
    (0..n)
        .map(|i| UploadBuilder::new(&format!("doc-{i}")).build())
        .collect()
}

/// Builder for a request template.
#[derive(Default)]
pub struct TemplateBuilder {
    variables: Vec<TemplateVariable>,
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &str) -> Self {
        self.variables.push(TemplateVariable::new(name, true, true));
        self
    }

    pub fn optional(mut self, name: &str) -> Self {
        self.variables.push(TemplateVariable::new(name, false, false));
        self
    }

    pub fn build(self) -> Vec<TemplateVariable> {
        self.variables
    }
}
