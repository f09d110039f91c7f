use crate::amend::INTEGRATION_EXTENSION;
use crate::config::{CorsConfig, OPERATION_METHODS};

use itertools::Itertools;
use serde_json::{json, Map, Value};

const ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";
const ALLOW_METHODS: &str = "Access-Control-Allow-Methods";
const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";

// Mapping templates are opaque strings to API Gateway.
const MOCK_REQUEST_TEMPLATE: &str = r#"{"statusCode": 200}"#;
const MOCK_RESPONSE_TEMPLATE: &str = "{}";

/// Comma-joined, uppercased operation methods currently present in `path_item`, in key order.
pub(crate) fn allowed_methods(path_item: &Map<String, Value>) -> String {
  path_item
    .keys()
    .filter(|key| OPERATION_METHODS.contains(&key.as_str()))
    .map(|key| key.to_ascii_uppercase())
    .join(",")
}

/// Build the `options` operation answering CORS preflight requests with a mock integration.
///
/// Header values are wrapped in single quotes because API Gateway interprets unquoted
/// `responseParameters` values as request/context mappings rather than static strings.
pub(crate) fn preflight_operation(cors: &CorsConfig, allow_methods: &str) -> Value {
  let cors_headers = [
    (ALLOW_HEADERS, quote(&cors.allow_headers.join(","))),
    (ALLOW_METHODS, quote(allow_methods)),
    (ALLOW_ORIGIN, quote(&cors.allow_origins.join(","))),
  ];

  let headers = cors_headers
    .iter()
    .map(|(header, _)| (header.to_string(), json!({"schema": {"type": "string"}})))
    .collect::<Map<_, _>>();
  let response_parameters = cors_headers
    .iter()
    .map(|(header, value)| {
      (
        format!("method.response.header.{header}"),
        Value::String(value.to_owned()),
      )
    })
    .collect::<Map<_, _>>();

  json!({
    "summary": "CORS support",
    "responses": {
      "200": {
        "description": "CORS preflight response",
        "headers": headers,
        "content": {},
      },
    },
    INTEGRATION_EXTENSION: {
      "type": "MOCK",
      "requestTemplates": {
        "application/json": MOCK_REQUEST_TEMPLATE,
      },
      "responses": {
        "default": {
          "statusCode": "200",
          "responseParameters": response_parameters,
          "responseTemplates": {
            "application/json": MOCK_RESPONSE_TEMPLATE,
          },
        },
      },
    },
  })
}

fn quote(value: &str) -> String {
  format!("'{value}'")
}

#[cfg(test)]
mod tests {
  use super::{allowed_methods, preflight_operation};
  use crate::config::CorsConfig;

  use pretty_assertions::assert_eq;
  use serde_json::{json, Value};

  #[test]
  fn test_allowed_methods_skips_non_operations() {
    let Value::Object(path_item) = json!({
      "summary": "Pets",
      "get": {},
      "options": {},
      "parameters": [],
      "post": {},
      "x-amazon-apigateway-any-method": {},
      "delete": {},
    }) else {
      unreachable!()
    };
    assert_eq!(allowed_methods(&path_item), "GET,POST,DELETE");
  }

  #[test]
  fn test_preflight_operation() {
    let cors = CorsConfig {
      allow_headers: vec!["Content-Type".to_string(), "X-Api-Key".to_string()],
      allow_origins: vec!["https://example.com".to_string()],
    };
    assert_eq!(
      preflight_operation(&cors, "GET,PUT"),
      json!({
        "summary": "CORS support",
        "responses": {
          "200": {
            "description": "CORS preflight response",
            "headers": {
              "Access-Control-Allow-Headers": {"schema": {"type": "string"}},
              "Access-Control-Allow-Methods": {"schema": {"type": "string"}},
              "Access-Control-Allow-Origin": {"schema": {"type": "string"}},
            },
            "content": {},
          },
        },
        "x-amazon-apigateway-integration": {
          "type": "MOCK",
          "requestTemplates": {"application/json": "{\"statusCode\": 200}"},
          "responses": {
            "default": {
              "statusCode": "200",
              "responseParameters": {
                "method.response.header.Access-Control-Allow-Headers": "'Content-Type,X-Api-Key'",
                "method.response.header.Access-Control-Allow-Methods": "'GET,PUT'",
                "method.response.header.Access-Control-Allow-Origin": "'https://example.com'",
              },
              "responseTemplates": {"application/json": "{}"},
            },
          },
        },
      })
    );
  }

  #[test]
  fn test_preflight_operation_empty_config() {
    let operation = preflight_operation(&CorsConfig::default(), "GET");
    let parameters = &operation["x-amazon-apigateway-integration"]["responses"]["default"]
      ["responseParameters"];
    assert_eq!(
      parameters["method.response.header.Access-Control-Allow-Headers"],
      json!("''")
    );
    assert_eq!(
      parameters["method.response.header.Access-Control-Allow-Origin"],
      json!("''")
    );
  }
}
