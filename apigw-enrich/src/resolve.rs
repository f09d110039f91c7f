use crate::amend::Enricher;
use crate::config::{CorsConfig, ValidationMode};
use crate::document::Specification;
use crate::error::InputError;

use backtrace::Backtrace;
use indexmap::IndexMap;
use log::info;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use std::io::Read;

/// Query object delivered on the input transport.
///
/// Terraform's `external` data source only passes string values, so the structured fields arrive
/// JSON-encoded. Already-structured values are accepted too.
#[derive(Debug, Deserialize)]
struct Query {
  service: Option<String>,
  version: Option<String>,
  specification: Option<String>,
  authorizers: Option<EncodedField>,
  endpoints: Option<EncodedField>,
  cors_configuration: Option<EncodedField>,
  validation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EncodedField {
  Encoded(String),
  Structured(Value),
}

impl EncodedField {
  fn decode<T>(self, field: &'static str) -> Result<T, InputError>
  where
    T: DeserializeOwned,
  {
    let value = match self {
      EncodedField::Encoded(encoded) => {
        serde_json::from_str::<Value>(&encoded).map_err(|err| InputError::InvalidEncodedJson {
          field,
          source: Box::new(err),
          backtrace: Backtrace::new(),
        })?
      }
      EncodedField::Structured(value) => value,
    };

    serde_path_to_error::deserialize(value).map_err(|err| InputError::InvalidEncodedField {
      field,
      source: Box::new(err),
      backtrace: Backtrace::new(),
    })
  }
}

fn decode_or_default<T>(field: Option<EncodedField>, name: &'static str) -> Result<T, InputError>
where
  T: DeserializeOwned + Default,
{
  field
    .map(|field| field.decode(name))
    .transpose()
    .map(Option::unwrap_or_default)
}

/// Read a JSON query object from `reader` and resolve it into a configured [`Enricher`].
pub fn resolve_input<R>(mut reader: R) -> Result<Enricher, InputError>
where
  R: Read,
{
  let mut query = String::new();
  reader
    .read_to_string(&mut query)
    .map_err(|err| InputError::Read(Box::new(err), Backtrace::new()))?;

  let query = serde_json::from_str::<Value>(&query)
    .map_err(|err| InputError::InvalidQueryJson(Box::new(err), Backtrace::new()))?;
  resolve_query(query)
}

/// Resolve an already-parsed query object into a configured [`Enricher`].
///
/// This is the entry point for transports other than a byte stream (e.g., an RPC call that
/// delivers the query as structured data).
pub fn resolve_query(query: Value) -> Result<Enricher, InputError> {
  let query = serde_path_to_error::deserialize::<_, Query>(query)
    .map_err(|err| InputError::InvalidQuery(Box::new(err), Backtrace::new()))?;

  let specification = match query.specification.as_deref() {
    Some(specification) if !specification.trim().is_empty() => {
      info!("amending supplied OpenAPI specification");
      Specification::parse(specification)?
    }
    _ => {
      let service = query
        .service
        .as_deref()
        .ok_or_else(|| InputError::MissingField("service", Backtrace::new()))?;
      let version = query
        .version
        .as_deref()
        .ok_or_else(|| InputError::MissingField("version", Backtrace::new()))?;
      info!("synthesizing OpenAPI specification for {service} {version}");
      Specification::synthesize(service, version)
    }
  };

  let authorizers: IndexMap<String, Value> = decode_or_default(query.authorizers, "authorizers")?;
  let endpoints: IndexMap<String, Value> = decode_or_default(query.endpoints, "endpoints")?;
  let cors: CorsConfig = decode_or_default(query.cors_configuration, "cors_configuration")?;

  let default_validation = match query.validation.as_deref() {
    None | Some("") | Some("NONE") => None,
    Some(validation) => Some(
      validation
        .parse::<ValidationMode>()
        .map_err(|_| InputError::InvalidValidationMode(validation.to_string(), Backtrace::new()))?,
    ),
  };

  Ok(
    Enricher::new(specification)
      .with_authorizers(authorizers)
      .with_cors(cors)
      .with_default_validation(default_validation)
      .with_endpoints(endpoints),
  )
}

#[cfg(test)]
mod tests {
  use super::{resolve_input, resolve_query};
  use crate::config::{CorsConfig, ValidationMode};
  use crate::error::InputError;

  use pretty_assertions::assert_eq;
  use serde_json::json;

  #[test]
  fn test_resolve_defaults() {
    let enricher =
      resolve_input(r#"{"service": "MyService", "version": "1.0.0", "endpoints": "{}"}"#.as_bytes())
        .unwrap();

    assert_eq!(
      serde_json::to_value(enricher.specification()).unwrap(),
      json!({
        "openapi": "3.0.3",
        "info": {"title": "MyService", "version": "1.0.0"},
        "paths": {}
      })
    );
    assert!(enricher.authorizers().is_empty());
    assert!(enricher.endpoints().is_empty());
    assert_eq!(enricher.cors(), &CorsConfig::default());
    assert_eq!(enricher.default_validation(), None);
  }

  #[test]
  fn test_resolve_encoded_fields() {
    let enricher = resolve_query(json!({
      "specification": r#"{"openapi": "3.0.0", "info": {"title": "t", "version": "v"}}"#,
      "authorizers": r#"{"token": {"invoke_arn": "arn"}}"#,
      "endpoints": r#"{"POST /b": {}, "GET /a": {}}"#,
      "cors_configuration": {"allow_headers": ["X-Foo"], "allow_origins": ["*"]},
      "validation": "PARAMS",
    }))
    .unwrap();

    assert_eq!(enricher.specification()["openapi"], json!("3.0.0"));
    // Entries are only typed during amendment.
    assert_eq!(enricher.authorizers()["token"], json!({"invoke_arn": "arn"}));
    assert_eq!(
      enricher.endpoints().keys().collect::<Vec<_>>(),
      vec!["POST /b", "GET /a"]
    );
    assert_eq!(
      enricher.cors(),
      &CorsConfig {
        allow_headers: vec!["X-Foo".to_string()],
        allow_origins: vec!["*".to_string()],
      }
    );
    assert_eq!(enricher.default_validation(), Some(ValidationMode::Params));
  }

  #[test]
  fn test_resolve_none_validation() {
    for validation in ["NONE", ""] {
      let enricher = resolve_query(json!({
        "service": "s",
        "version": "v",
        "validation": validation,
        "specification": "",
      }))
      .unwrap();
      assert_eq!(enricher.default_validation(), None);
      assert_eq!(enricher.specification()["info"]["title"], json!("s"));
    }
  }

  #[test]
  fn test_resolve_errors() {
    let cases = [
      (r#"{"service": "s""#, "InvalidQueryJson"),
      (r#"[]"#, "InvalidQuery"),
      (r#"{"service": 1, "version": "v"}"#, "InvalidQuery"),
      (r#"{"version": "v"}"#, "MissingField"),
      (r#"{"service": "s"}"#, "MissingField"),
      (
        r#"{"service": "s", "version": "v", "endpoints": "{not json"}"#,
        "InvalidEncodedJson",
      ),
      (
        r#"{"service": "s", "version": "v", "endpoints": "[1]"}"#,
        "InvalidEncodedField",
      ),
      (
        r#"{"service": "s", "version": "v", "cors_configuration": "{\"allow_headers\": \"X\"}"}"#,
        "InvalidEncodedField",
      ),
      (
        r#"{"service": "s", "version": "v", "validation": "STRICT"}"#,
        "InvalidValidationMode",
      ),
      (r#"{"specification": "{\"openapi\": "}"#, "InvalidSpecificationJson"),
      (r#"{"specification": "\"just a string\""}"#, "SpecificationNotObject"),
    ];

    for (query, expected) in cases {
      let err = resolve_input(query.as_bytes()).unwrap_err();
      assert_eq!(err.name(), expected, "{query}");
    }
  }

  #[test]
  fn test_resolve_missing_field_message() {
    let err = resolve_query(json!({"version": "v"})).unwrap_err();
    let InputError::MissingField(field, _) = err else {
      panic!("expected MissingField error");
    };
    assert_eq!(field, "service");
  }
}
