//! # Documents
//!
//! Untyped Kubernetes objects as read from the API server.
//!
//! Custom resources handled by the CLI (XKube, Crossplane `Object`/`Release`) are not
//! modelled as Rust types. They are kept as JSON trees and queried by field path.

use crate::error::DocumentError;
use kube::api::DynamicObject;
use serde_json::Value;

/// A generic Kubernetes object addressed by field paths
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document(Value);

impl Document {
    /// Wrap a JSON value
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// `metadata.name`, empty when absent
    pub fn name(&self) -> &str {
        self.str_at(&["metadata", "name"])
    }

    /// `metadata.namespace`, empty for cluster-scoped objects
    pub fn namespace(&self) -> &str {
        self.str_at(&["metadata", "namespace"])
    }

    /// `namespace/name` key used to track an object across watch events
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace(), self.name())
    }

    /// Look up a raw value at `path`
    ///
    /// Returns `Ok(None)` when any segment is missing and an error when an intermediate
    /// segment exists but is not an object.
    pub fn nested(&self, path: &[&str]) -> Result<Option<&Value>, DocumentError> {
        let mut current = &self.0;
        for (depth, segment) in path.iter().enumerate() {
            let Some(object) = current.as_object() else {
                return Err(DocumentError::NotAnObject {
                    field: path[..depth].join("."),
                });
            };
            match object.get(*segment) {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Look up a string at `path`
    pub fn nested_str(&self, path: &[&str]) -> Result<Option<&str>, DocumentError> {
        match self.nested(path)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(DocumentError::UnexpectedType {
                field: path.join("."),
                expected: "string",
            }),
        }
    }

    /// Look up a list at `path`
    pub fn nested_slice(&self, path: &[&str]) -> Result<Option<&[Value]>, DocumentError> {
        match self.nested(path)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items.as_slice())),
            Some(_) => Err(DocumentError::UnexpectedType {
                field: path.join("."),
                expected: "list",
            }),
        }
    }

    fn str_at(&self, path: &[&str]) -> &str {
        self.nested_str(path).ok().flatten().unwrap_or_default()
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl TryFrom<DynamicObject> for Document {
    type Error = serde_json::Error;

    fn try_from(object: DynamicObject) -> Result<Self, Self::Error> {
        serde_json::to_value(object).map(Self)
    }
}
