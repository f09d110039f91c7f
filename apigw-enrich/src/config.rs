use crate::error::AmendmentError;

use backtrace::Backtrace;
use http::Method;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use std::fmt::Display;
use std::str::FromStr;

/// Request validator applied by Amazon API Gateway before invoking an integration.
///
/// See
/// [`x-amazon-apigateway-request-validators`](https://docs.aws.amazon.com/apigateway/latest/developerguide/api-gateway-swagger-extensions-request-validators.html).
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationMode {
  /// Validate nothing.
  None,
  /// Validate request parameters only.
  Params,
  /// Validate the request body only.
  Body,
  /// Validate both request parameters and the request body.
  Full,
}

impl ValidationMode {
  /// Every validation mode, in the order the validator table is written.
  pub const ALL: [ValidationMode; 4] = [Self::None, Self::Params, Self::Body, Self::Full];

  /// Name of the validator as it appears in the document (e.g., `FULL`).
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::None => "NONE",
      Self::Params => "PARAMS",
      Self::Body => "BODY",
      Self::Full => "FULL",
    }
  }

  /// Whether this validator checks the request body.
  pub fn validate_request_body(&self) -> bool {
    matches!(self, Self::Body | Self::Full)
  }

  /// Whether this validator checks request parameters.
  pub fn validate_request_parameters(&self) -> bool {
    matches!(self, Self::Params | Self::Full)
  }
}

impl Display for ValidationMode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Error returned when parsing an unknown [`ValidationMode`] name.
#[derive(Debug, Error)]
#[error("invalid validation mode `{0}` (expected one of NONE, PARAMS, BODY, FULL)")]
pub struct ParseValidationModeError(String);

impl FromStr for ValidationMode {
  type Err = ParseValidationModeError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "NONE" => Ok(Self::None),
      "PARAMS" => Ok(Self::Params),
      "BODY" => Ok(Self::Body),
      "FULL" => Ok(Self::Full),
      _ => Err(ParseValidationModeError(s.to_string())),
    }
  }
}

/// Custom (`token`) Lambda authorizer.
///
/// Each authorizer becomes one `apiKey` security scheme with an
/// [`x-amazon-apigateway-authorizer`](https://docs.aws.amazon.com/apigateway/latest/developerguide/api-gateway-swagger-extensions-authorizer.html)
/// extension.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthorizerConfig {
  /// Regular expression that the `Authorization` header must match before the authorizer is
  /// invoked. The key is required; `null` is written through as `null`.
  #[serde(deserialize_with = "deserialize_nullable")]
  pub identity_validation: Option<String>,
  /// API Gateway invocation ARN of the authorizer Lambda function.
  pub invoke_arn: String,
  /// IAM role that API Gateway assumes to invoke the authorizer.
  pub iam_role_arn: String,
  /// How long API Gateway caches the authorizer's policy.
  pub result_ttl_in_seconds: u64,
}

impl AuthorizerConfig {
  pub(crate) fn from_entry(name: &str, entry: &Value) -> Result<Self, AmendmentError> {
    from_entry(entry).map_err(|err| AmendmentError::InvalidAuthorizer {
      name: name.to_string(),
      source: Box::new(err),
      backtrace: Backtrace::new(),
    })
  }
}

/// Lambda function that backs an endpoint.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct LambdaTarget {
  /// API Gateway invocation ARN of the Lambda function.
  pub invoke_arn: String,
}

/// Lambda proxy integration for a single `<METHOD> <PATH>` endpoint.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct EndpointConfig {
  /// Backend Lambda function.
  pub lambda: LambdaTarget,
  /// Lambda event payload format (e.g., `1.0` or `2.0`). Numbers are accepted and stringified.
  #[serde(deserialize_with = "deserialize_string_or_number")]
  pub payload_format_version: String,
  /// Integration timeout.
  pub timeout_milliseconds: u64,
  /// Name of the authorizer guarding this endpoint.
  #[serde(default, deserialize_with = "deserialize_non_empty")]
  pub authorizer_name: Option<String>,
  /// Request validator for this endpoint (overrides the document default).
  #[serde(default, deserialize_with = "deserialize_non_empty")]
  pub validation: Option<ValidationMode>,
}

impl EndpointConfig {
  pub(crate) fn from_entry(endpoint: &str, entry: &Value) -> Result<Self, AmendmentError> {
    from_entry(entry).map_err(|err| AmendmentError::InvalidEndpoint {
      endpoint: endpoint.to_string(),
      source: Box::new(err),
      backtrace: Backtrace::new(),
    })
  }
}

/// CORS settings applied to the preflight operation of every path with at least one endpoint.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CorsConfig {
  /// Values for `Access-Control-Allow-Headers`.
  #[serde(default, deserialize_with = "deserialize_null_default")]
  pub allow_headers: Vec<String>,
  /// Values for `Access-Control-Allow-Origin`.
  #[serde(default, deserialize_with = "deserialize_null_default")]
  pub allow_origins: Vec<String>,
}

/// Identity of an endpoint: the parsed form of a `"<METHOD> <PATH>"` key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EndpointKey {
  method: Method,
  path: String,
}

/// Methods that may appear as operations in an OpenAPI path item (excluding `options`, which is
/// reserved for CORS preflight).
pub(crate) const OPERATION_METHODS: [&str; 7] =
  ["get", "put", "post", "delete", "patch", "head", "trace"];

impl EndpointKey {
  /// Parse a `"<METHOD> <PATH>"` key (e.g., `GET /pets/{petId}`).
  ///
  /// The key must contain exactly two whitespace-separated tokens. The method is case-insensitive.
  pub fn parse(key: &str) -> Result<Self, AmendmentError> {
    let mut tokens = key.split_whitespace();
    let (Some(method), Some(path), None) = (tokens.next(), tokens.next(), tokens.next()) else {
      return Err(AmendmentError::InvalidEndpointKey(
        key.to_string(),
        Backtrace::new(),
      ));
    };

    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|err| {
      AmendmentError::InvalidMethod {
        endpoint: key.to_string(),
        source: Box::new(err),
        backtrace: Backtrace::new(),
      }
    })?;

    if method == Method::OPTIONS {
      return Err(AmendmentError::ReservedMethod(
        key.to_string(),
        Backtrace::new(),
      ));
    }
    if !OPERATION_METHODS
      .iter()
      .any(|op_method| method.as_str().eq_ignore_ascii_case(op_method))
    {
      return Err(AmendmentError::UnsupportedMethod(
        key.to_string(),
        Backtrace::new(),
      ));
    }

    Ok(Self {
      method,
      path: path.to_string(),
    })
  }

  /// HTTP method (e.g., `GET`).
  pub fn method(&self) -> &Method {
    &self.method
  }

  /// Key of the operation within its OpenAPI path item (e.g., `get`).
  pub fn operation_key(&self) -> String {
    self.method.as_str().to_ascii_lowercase()
  }

  /// Request path (e.g., `/pets/{petId}`).
  pub fn path(&self) -> &str {
    &self.path
  }
}

impl Display for EndpointKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} {}", self.method, self.path)
  }
}

fn from_entry<T>(entry: &Value) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
where
  T: DeserializeOwned,
{
  serde_path_to_error::deserialize(entry)
}

// Terraform passes unset optional attributes as `null` or `""`; both mean "absent".
fn deserialize_non_empty<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
  D: Deserializer<'de>,
  T: FromStr,
  T::Err: Display,
{
  match Option::<String>::deserialize(deserializer)?.as_deref() {
    None | Some("") => Ok(None),
    Some(s) => s.parse().map(Some).map_err(D::Error::custom),
  }
}

// Without `#[serde(default)]`, a missing key is an error even though `null` is accepted.
fn deserialize_nullable<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(deserializer)
}

fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
  }

  Ok(match StringOrNumber::deserialize(deserializer)? {
    StringOrNumber::String(s) => s,
    StringOrNumber::Number(n) => n.to_string(),
  })
}

fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
