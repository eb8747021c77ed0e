//! Turns a parsed Swagger document into the inputs of the materializer: an
//! [`OperationRegistry`] and a [`SpecDocument`].

use indexmap::IndexMap;
use log::debug;

use crate::error::{LoadError, ResolveError};
use crate::parse;
use crate::parse::operation::{Operation, PathItem};
use crate::parse::parameter::{Parameter, ParameterOrRef};
use crate::parse::spec::SwaggerSpec;
use crate::registry::{
    HttpMethod, OperationDescriptor, OperationKey, OperationRegistry, ParameterDescriptor,
};

/// Host and scheme information of a loaded document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecDocument {
    /// Authority plus base path, e.g. `api.example.com/v1`.
    pub base_url: String,
    /// Declared schemes in document order. May be empty.
    pub schemes: Vec<String>,
}

impl SpecDocument {
    pub fn new(base_url: impl Into<String>, schemes: Vec<String>) -> Self {
        Self {
            base_url: base_url.into(),
            schemes,
        }
    }

    pub fn from_spec(spec: &SwaggerSpec) -> Self {
        let host = spec.host.clone().unwrap_or_default();
        let base_path = spec
            .base_path
            .as_deref()
            .map(|p| p.trim_end_matches('/'))
            .unwrap_or("");
        Self {
            base_url: format!("{host}{base_path}"),
            schemes: spec.schemes.clone(),
        }
    }
}

/// A document ready for materialization.
#[derive(Debug, Clone, Default)]
pub struct LoadedSpec {
    pub document: SpecDocument,
    pub registry: OperationRegistry,
}

/// Parse YAML and load it.
pub fn load_yaml(input: &str) -> Result<LoadedSpec, LoadError> {
    let spec = parse::from_yaml(input)?;
    Ok(load(&spec)?)
}

/// Parse JSON and load it.
pub fn load_json(input: &str) -> Result<LoadedSpec, LoadError> {
    let spec = parse::from_json(input)?;
    Ok(load(&spec)?)
}

/// Build the registry and document from a parsed spec.
pub fn load(spec: &SwaggerSpec) -> Result<LoadedSpec, ResolveError> {
    let resolver = ParameterResolver::new(&spec.parameters);
    let mut registry = OperationRegistry::new();

    for (path, item) in &spec.paths {
        let shared = resolver.resolve_all(&item.parameters)?;
        for (method, op) in operations_of(item) {
            let descriptor = build_descriptor(method, path, op, &shared, &resolver)?;

            if let Some(ref id) = descriptor.operation_id {
                if registry
                    .insert(OperationKey::ById, id.clone(), descriptor.clone())
                    .is_some()
                {
                    debug!("duplicate operationId `{id}`, keeping the later one");
                }
            }
            if !registry.contains(OperationKey::ByPath, path) {
                registry.insert(OperationKey::ByPath, path.clone(), descriptor);
            }
        }
    }

    debug!(
        "loaded {} operation ids and {} paths",
        registry.iter(OperationKey::ById).count(),
        registry.iter(OperationKey::ByPath).count()
    );

    Ok(LoadedSpec {
        document: SpecDocument::from_spec(spec),
        registry,
    })
}

/// Operations of a path item in registration order.
fn operations_of(item: &PathItem) -> Vec<(HttpMethod, &Operation)> {
    [
        (HttpMethod::Get, &item.get),
        (HttpMethod::Put, &item.put),
        (HttpMethod::Post, &item.post),
        (HttpMethod::Delete, &item.delete),
        (HttpMethod::Options, &item.options),
        (HttpMethod::Head, &item.head),
        (HttpMethod::Patch, &item.patch),
    ]
    .into_iter()
    .filter_map(|(method, op)| op.as_ref().map(|op| (method, op)))
    .collect()
}

fn build_descriptor(
    method: HttpMethod,
    path: &str,
    op: &Operation,
    shared: &[Parameter],
    resolver: &ParameterResolver<'_>,
) -> Result<OperationDescriptor, ResolveError> {
    let own = resolver.resolve_all(&op.parameters)?;
    let parameters = merge_parameters(shared, &own)
        .into_iter()
        .map(|p| ParameterDescriptor {
            name: p.name.clone(),
            location: p.location,
            required: p.required,
        })
        .collect();

    Ok(OperationDescriptor {
        operation_id: op.operation_id.clone(),
        path: path.to_string(),
        method,
        parameters,
        consumes: op.consumes.clone(),
        produces: op.produces.clone(),
    })
}

/// Path-level parameters first, each replaced by an operation parameter with
/// the same name and location; remaining operation parameters follow.
fn merge_parameters<'a>(shared: &'a [Parameter], own: &'a [Parameter]) -> Vec<&'a Parameter> {
    let mut merged: Vec<&Parameter> = shared
        .iter()
        .map(|s| own.iter().find(|o| same_slot(s, o)).unwrap_or(s))
        .collect();
    merged.extend(own.iter().filter(|o| !shared.iter().any(|s| same_slot(s, o))));
    merged
}

fn same_slot(a: &Parameter, b: &Parameter) -> bool {
    a.name == b.name && a.location == b.location
}

/// Resolves `#/parameters/<name>` references against the document's
/// reusable parameters.
struct ParameterResolver<'a> {
    definitions: &'a IndexMap<String, ParameterOrRef>,
}

impl<'a> ParameterResolver<'a> {
    fn new(definitions: &'a IndexMap<String, ParameterOrRef>) -> Self {
        Self { definitions }
    }

    fn resolve_all(&self, params: &[ParameterOrRef]) -> Result<Vec<Parameter>, ResolveError> {
        params.iter().map(|p| self.resolve(p)).collect()
    }

    fn resolve(&self, param: &ParameterOrRef) -> Result<Parameter, ResolveError> {
        match param {
            ParameterOrRef::Parameter(p) => Ok(p.clone()),
            ParameterOrRef::Ref { ref_path } => {
                let name = parse_ref_name(ref_path)?;
                match self.definitions.get(name) {
                    Some(ParameterOrRef::Parameter(p)) => Ok(p.clone()),
                    // Definitions may not chain to further references.
                    Some(ParameterOrRef::Ref { .. }) | None => {
                        Err(ResolveError::RefTargetNotFound(ref_path.clone()))
                    }
                }
            }
        }
    }
}

/// Parse a `$ref` path like `#/parameters/limit` and extract the name.
fn parse_ref_name(ref_path: &str) -> Result<&str, ResolveError> {
    ref_path
        .strip_prefix("#/parameters/")
        .filter(|name| !name.is_empty() && !name.contains('/'))
        .ok_or_else(|| ResolveError::InvalidRefFormat(ref_path.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parameter::ParameterLocation;

    const PETS: &str = r#"
swagger: "2.0"
info:
  title: Pets
  version: "1.0"
host: pets.example.com
basePath: /v2/
schemes: [https, http]
parameters:
  limit:
    name: limit
    in: query
paths:
  /pets/{petId}:
    parameters:
      - name: petId
        in: path
        required: true
      - name: trace
        in: header
    get:
      operationId: getPet
      parameters:
        - name: trace
          in: header
          required: true
        - $ref: '#/parameters/limit'
    delete:
      operationId: deletePet
"#;

    #[test]
    fn test_document_base_url() {
        let loaded = load_yaml(PETS).unwrap();
        assert_eq!(loaded.document.base_url, "pets.example.com/v2");
        assert_eq!(loaded.document.schemes, vec!["https", "http"]);
    }

    #[test]
    fn test_root_base_path_dropped() {
        let spec = parse::from_yaml(
            "swagger: '2.0'\ninfo: {title: t, version: '1'}\nhost: h.io\nbasePath: /\n",
        )
        .unwrap();
        assert_eq!(SpecDocument::from_spec(&spec).base_url, "h.io");
    }

    #[test]
    fn test_path_parameters_merged() {
        let loaded = load_yaml(PETS).unwrap();
        let op = loaded.registry.get(OperationKey::ById, "getPet").unwrap();

        let names: Vec<&str> = op.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["petId", "trace", "limit"]);
        // The operation-level header overrides the path-level one.
        assert!(op.parameters[1].required);
        assert_eq!(op.parameters[2].location, Some(ParameterLocation::Query));
    }

    #[test]
    fn test_path_key_takes_first_method() {
        let loaded = load_yaml(PETS).unwrap();
        let op = loaded
            .registry
            .get(OperationKey::ByPath, "/pets/{petId}")
            .unwrap();
        assert_eq!(op.method, HttpMethod::Get);
        assert!(loaded.registry.contains(OperationKey::ById, "deletePet"));
    }

    #[test]
    fn test_dangling_ref() {
        let yaml = r#"
swagger: "2.0"
info: {title: t, version: "1"}
paths:
  /a:
    get:
      parameters:
        - $ref: '#/parameters/missing'
"#;
        let err = load_yaml(yaml).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Resolve(ResolveError::RefTargetNotFound(_))
        ));
    }

    #[test]
    fn test_invalid_ref_format() {
        assert!(matches!(
            parse_ref_name("#/definitions/Pet"),
            Err(ResolveError::InvalidRefFormat(_))
        ));
        assert_eq!(parse_ref_name("#/parameters/limit").unwrap(), "limit");
    }
}
