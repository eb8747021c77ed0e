use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported Swagger version: {0}")]
    UnsupportedVersion(String),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid reference format: {0}")]
    InvalidRefFormat(String),

    #[error("reference target not found: {0}")]
    RefTargetNotFound(String),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),
}

/// Failures raised while turning an operation name and a parameter bag into a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaterializeError {
    #[error("operation not found: {name}")]
    OperationNotFound { name: String },

    #[error("required parameter `{parameter}` missing for operation `{operation}`")]
    RequiredParameterMissing { parameter: String, operation: String },

    #[error("scheme not allowed: {requested}")]
    SchemaNotAllowed { requested: String },
}

/// Failure of a full `exec` call: either the request could not be built or the
/// transport rejected it.
#[derive(Debug, Error)]
pub enum ExecError<E> {
    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error("transport error: {0}")]
    Transport(E),
}
