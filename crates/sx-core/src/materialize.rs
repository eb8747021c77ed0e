//! Binding a parameter bag to an operation's declared slots.
//!
//! [`build_url`] and [`build_request_options`] read the same operation and
//! bag independently; neither writes anything the other reads.

use indexmap::IndexMap;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MaterializeError;
use crate::load::SpecDocument;
use crate::parse::parameter::ParameterLocation;
use crate::registry::{HttpMethod, OperationDescriptor};

/// Caller-supplied values keyed by parameter name. `"body"` and `"schema"`
/// are reserved.
pub type ParameterBag = IndexMap<String, Value>;

/// Bag key holding the payload of a `body` parameter.
pub const BODY_KEY: &str = "body";
/// Bag key holding a scheme override.
pub const SCHEME_KEY: &str = "schema";
/// Scheme used when the document declares none.
pub const DEFAULT_SCHEME: &str = "https";

/// How path and query values are written into the URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Escaping {
    /// Interpolate values verbatim.
    #[default]
    None,
    /// Percent-encode values. Opt-in; not the historical behavior.
    Percent,
}

/// How a `"schema"` override in the bag is validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeOverride {
    /// The override must be a valid index into the declared schemes. The
    /// override value itself becomes the scheme.
    #[default]
    Index,
    /// The override must name one of the declared schemes.
    Membership,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MaterializeOptions {
    pub escaping: Escaping,
    pub scheme_override: SchemeOverride,
}

/// Method, headers and body of a request, ready for a transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub headers: IndexMap<String, Value>,
    pub body: Value,
}

/// URL and options built from one validation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterializedRequest {
    pub url: String,
    pub options: RequestOptions,
}

/// Fail on the first required parameter, in declaration order, that the bag
/// does not provide. Parameters without a location are not checked.
pub fn check_required(
    operation: &OperationDescriptor,
    params: &ParameterBag,
) -> Result<(), MaterializeError> {
    let missing = operation
        .parameters
        .iter()
        .filter(|p| p.location.is_some())
        .find(|p| p.required && !params.contains_key(&p.name));

    match missing {
        Some(p) => Err(MaterializeError::RequiredParameterMissing {
            parameter: p.name.clone(),
            operation: operation.display_name().to_string(),
        }),
        None => Ok(()),
    }
}

/// Validate, then build both the URL and the request options.
pub fn materialize(
    spec: &SpecDocument,
    operation: &OperationDescriptor,
    params: &ParameterBag,
    options: &MaterializeOptions,
) -> Result<MaterializedRequest, MaterializeError> {
    check_required(operation, params)?;
    let url = assemble_url(spec, operation, params, options)?;
    Ok(MaterializedRequest {
        url,
        options: build_request_options(operation, params),
    })
}

/// Build the fully qualified URL for `operation`.
pub fn build_url(
    spec: &SpecDocument,
    operation: &OperationDescriptor,
    params: &ParameterBag,
    options: &MaterializeOptions,
) -> Result<String, MaterializeError> {
    check_required(operation, params)?;
    assemble_url(spec, operation, params, options)
}

fn assemble_url(
    spec: &SpecDocument,
    operation: &OperationDescriptor,
    params: &ParameterBag,
    options: &MaterializeOptions,
) -> Result<String, MaterializeError> {
    let mut path = operation.path.clone();
    let mut scheme = spec
        .schemes
        .first()
        .cloned()
        .unwrap_or_else(|| DEFAULT_SCHEME.to_string());

    for param in &operation.parameters {
        let Some(location) = param.location else {
            continue;
        };
        // Absent optional values are not interpolated: a path placeholder
        // stays as written and no query pair is appended.
        let Some(value) = params.get(&param.name) else {
            continue;
        };
        match location {
            ParameterLocation::Path => {
                let placeholder = format!("{{{}}}", param.name);
                let value = escape(&stringify(value), options.escaping, PATH_SEGMENT);
                path = path.replacen(&placeholder, &value, 1);
            }
            ParameterLocation::Query => {
                let separator = if path.contains('?') { '&' } else { '?' };
                let value = escape(&stringify(value), options.escaping, QUERY_COMPONENT);
                path = format!("{path}{separator}{}={value}", param.name);
            }
            ParameterLocation::Header | ParameterLocation::FormData | ParameterLocation::Body => {}
        }
    }

    if let Some(requested) = params.get(SCHEME_KEY) {
        scheme = negotiate_scheme(&spec.schemes, requested, options.scheme_override)?;
    }

    Ok(format!("{scheme}://{}{path}", spec.base_url))
}

fn negotiate_scheme(
    schemes: &[String],
    requested: &Value,
    policy: SchemeOverride,
) -> Result<String, MaterializeError> {
    let adopted = match policy {
        // The index's decimal text is adopted, so `1.0` becomes `1`.
        SchemeOverride::Index => scheme_index(requested)
            .filter(|&i| i < schemes.len())
            .map(|i| i.to_string()),
        SchemeOverride::Membership => requested
            .as_str()
            .filter(|name| schemes.iter().any(|s| s == name))
            .map(str::to_string),
    };

    adopted.ok_or_else(|| MaterializeError::SchemaNotAllowed {
        requested: stringify(requested),
    })
}

/// Integer index carried by a scheme override: a non-negative whole number
/// (`1` or `1.0`) or a canonical decimal string (`"1"`).
fn scheme_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(i) => usize::try_from(i).ok(),
            None => n
                .as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u32::MAX as f64)
                .map(|f| f as usize),
        },
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            // "01" is not an index.
            if s.len() > 1 && s.starts_with('0') {
                None
            } else {
                s.parse().ok()
            }
        }
        _ => None,
    }
}

/// Build method, headers and body for `operation`. Does not check required
/// parameters.
pub fn build_request_options(
    operation: &OperationDescriptor,
    params: &ParameterBag,
) -> RequestOptions {
    let mut headers = IndexMap::new();
    let mut body = Value::Object(Map::new());

    if let Some(consumes) = operation.consumes.as_ref().filter(|c| !c.is_empty()) {
        headers.insert("content-type".to_string(), Value::String(consumes.join(";")));
    }
    if let Some(produces) = &operation.produces {
        let accept = produces.iter().cloned().map(Value::String).collect();
        headers.insert("accept".to_string(), Value::Array(accept));
    }

    for param in &operation.parameters {
        let Some(location) = param.location else {
            continue;
        };
        match location {
            ParameterLocation::Body => {
                body = params.get(BODY_KEY).cloned().unwrap_or(Value::Null);
            }
            ParameterLocation::FormData => {
                if let Some(value) = params.get(&param.name) {
                    if !body.is_object() {
                        body = Value::Object(Map::new());
                    }
                    if let Value::Object(fields) = &mut body {
                        fields.insert(param.name.clone(), value.clone());
                    }
                }
            }
            ParameterLocation::Header => {
                if let Some(value) = params.get(&param.name) {
                    headers.insert(param.name.clone(), value.clone());
                }
            }
            ParameterLocation::Path | ParameterLocation::Query => {}
        }
    }

    RequestOptions {
        method: operation.method,
        headers,
        body,
    }
}

/// Text form of a bag value as it appears in a URL: strings are written
/// without quotes, arrays as comma-joined items, everything else as JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

const QUERY_COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const PATH_SEGMENT: &AsciiSet = &QUERY_COMPONENT.add(b'/');

fn escape(value: &str, escaping: Escaping, set: &'static AsciiSet) -> String {
    match escaping {
        Escaping::None => value.to_string(),
        Escaping::Percent => utf8_percent_encode(value, set).to_string(),
    }
}
