use std::fmt;

use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

use crate::error::MaterializeError;
use crate::parse::parameter::ParameterLocation;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared parameter slot of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub name: String,
    /// `None` for parameters the document left without an `in`; those are ignored.
    pub location: Option<ParameterLocation>,
    pub required: bool,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, location: ParameterLocation, required: bool) -> Self {
        Self {
            name: name.into(),
            location: Some(location),
            required,
        }
    }
}

/// A fully resolved API operation, ready for materialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub operation_id: Option<String>,
    pub path: String,
    pub method: HttpMethod,
    pub parameters: Vec<ParameterDescriptor>,
    pub consumes: Option<Vec<String>>,
    pub produces: Option<Vec<String>>,
}

impl OperationDescriptor {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            operation_id: None,
            path: path.into(),
            method,
            parameters: Vec::new(),
            consumes: None,
            produces: None,
        }
    }

    /// Name used in diagnostics: the operation id when there is one, else the path.
    pub fn display_name(&self) -> &str {
        self.operation_id.as_deref().unwrap_or(&self.path)
    }
}

/// The keyspace an operation is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKey {
    ById,
    ByPath,
}

impl OperationKey {
    /// Keyspaces in lookup order.
    pub const LOOKUP_ORDER: [OperationKey; 2] = [OperationKey::ById, OperationKey::ByPath];

    pub fn prefix(&self) -> &'static str {
        match self {
            OperationKey::ById => "id",
            OperationKey::ByPath => "path",
        }
    }
}

/// Operations of one loaded document, addressable by operation id or by path.
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    by_id: IndexMap<String, OperationDescriptor>,
    by_path: IndexMap<String, OperationDescriptor>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `operation` under `name` in the given keyspace, returning any
    /// descriptor it displaced.
    pub fn insert(
        &mut self,
        key: OperationKey,
        name: impl Into<String>,
        operation: OperationDescriptor,
    ) -> Option<OperationDescriptor> {
        self.keyspace_mut(key).insert(name.into(), operation)
    }

    /// Direct lookup in a single keyspace.
    pub fn get(&self, key: OperationKey, name: &str) -> Option<&OperationDescriptor> {
        self.keyspace(key).get(name)
    }

    pub fn contains(&self, key: OperationKey, name: &str) -> bool {
        self.keyspace(key).contains_key(name)
    }

    /// Resolve a bare name, trying operation ids before paths.
    pub fn resolve(&self, name: &str) -> Result<&OperationDescriptor, MaterializeError> {
        for key in OperationKey::LOOKUP_ORDER {
            if let Some(op) = self.get(key, name) {
                debug!("resolved `{}` as {}:{}", name, key.prefix(), name);
                return Ok(op);
            }
        }
        Err(MaterializeError::OperationNotFound {
            name: name.to_string(),
        })
    }

    /// All entries of one keyspace, in registration order.
    pub fn iter(&self, key: OperationKey) -> impl Iterator<Item = (&str, &OperationDescriptor)> {
        self.keyspace(key).iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.by_id.len() + self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty() && self.by_path.is_empty()
    }

    fn keyspace(&self, key: OperationKey) -> &IndexMap<String, OperationDescriptor> {
        match key {
            OperationKey::ById => &self.by_id,
            OperationKey::ByPath => &self.by_path,
        }
    }

    fn keyspace_mut(&mut self, key: OperationKey) -> &mut IndexMap<String, OperationDescriptor> {
        match key {
            OperationKey::ById => &mut self.by_id,
            OperationKey::ByPath => &mut self.by_path,
        }
    }
}
