use crate::amend::cors::{allowed_methods, preflight_operation};
use crate::amend::merge::{merge_shallow, object_entry};
use crate::config::{AuthorizerConfig, CorsConfig, EndpointConfig, EndpointKey, ValidationMode};
use crate::document::{push_pointer, Specification};
use crate::error::AmendmentError;

use indexmap::IndexMap;
use log::{debug, info, warn};
use serde_json::{json, Map, Value};

use std::collections::HashSet;

mod cors;
mod merge;


/// Security scheme extension describing a Lambda authorizer.
pub const AUTHORIZER_EXTENSION: &str = "x-amazon-apigateway-authorizer";
/// Security scheme extension naming the authorization type.
pub const AUTHTYPE_EXTENSION: &str = "x-amazon-apigateway-authtype";
/// Operation extension describing the backend integration.
pub const INTEGRATION_EXTENSION: &str = "x-amazon-apigateway-integration";
/// Document/operation extension selecting a request validator by name.
pub const REQUEST_VALIDATOR_EXTENSION: &str = "x-amazon-apigateway-request-validator";
/// Document extension defining the named request validators.
pub const REQUEST_VALIDATORS_EXTENSION: &str = "x-amazon-apigateway-request-validators";

/// Builder for amending an OpenAPI specification with Amazon API Gateway extensions.
///
/// Authorizer and endpoint entries are kept as raw JSON values until [`amend`](Enricher::amend)
/// runs so that an entry with a missing or mistyped field is reported as an [`AmendmentError`]
/// naming the entry.
///
/// # Example
///
/// ```rust
/// # use apigw_enrich::{Enricher, Specification, ValidationMode};
/// # use indexmap::IndexMap;
/// # use serde_json::json;
/// let mut endpoints = IndexMap::new();
/// endpoints.insert(
///   "GET /pets".to_string(),
///   json!({
///     "lambda": {"invoke_arn": "arn:aws:apigateway:us-east-1:lambda:path/..."},
///     "payload_format_version": "2.0",
///     "timeout_milliseconds": 29000,
///   }),
/// );
///
/// let spec = Enricher::new(Specification::synthesize("pets", "1.0.0"))
///   .with_endpoints(endpoints)
///   .with_default_validation(Some(ValidationMode::Full))
///   .amend()
///   .unwrap();
/// assert!(spec["paths"]["/pets"].get("options").is_some());
/// ```
#[derive(Debug)]
pub struct Enricher {
  authorizers: IndexMap<String, Value>,
  cors: CorsConfig,
  default_validation: Option<ValidationMode>,
  endpoints: IndexMap<String, Value>,
  specification: Specification,
}

impl Enricher {
  /// Construct a new `Enricher` for the given base specification.
  pub fn new(specification: Specification) -> Self {
    Self {
      authorizers: IndexMap::new(),
      cors: CorsConfig::default(),
      default_validation: None,
      endpoints: IndexMap::new(),
      specification,
    }
  }

  /// Set the authorizers (name → [`AuthorizerConfig`] fields) to declare as security schemes.
  pub fn with_authorizers(mut self, authorizers: IndexMap<String, Value>) -> Self {
    self.authorizers = authorizers;
    self
  }

  /// Set the CORS settings applied to every path with at least one endpoint.
  pub fn with_cors(mut self, cors: CorsConfig) -> Self {
    self.cors = cors;
    self
  }

  /// Set the document-level request validator. `None` and [`ValidationMode::None`] both leave the
  /// document-level validator unset.
  pub fn with_default_validation(mut self, default_validation: Option<ValidationMode>) -> Self {
    self.default_validation = default_validation;
    self
  }

  /// Set the endpoints (`"<METHOD> <PATH>"` → [`EndpointConfig`] fields) to integrate, in
  /// processing order.
  pub fn with_endpoints(mut self, endpoints: IndexMap<String, Value>) -> Self {
    self.endpoints = endpoints;
    self
  }

  /// Authorizer entries.
  pub fn authorizers(&self) -> &IndexMap<String, Value> {
    &self.authorizers
  }

  /// CORS settings.
  pub fn cors(&self) -> &CorsConfig {
    &self.cors
  }

  /// Document-level request validator.
  pub fn default_validation(&self) -> Option<ValidationMode> {
    self.default_validation
  }

  /// Endpoint entries.
  pub fn endpoints(&self) -> &IndexMap<String, Value> {
    &self.endpoints
  }

  /// Base specification.
  pub fn specification(&self) -> &Specification {
    &self.specification
  }

  /// Apply, in order, authorizer security schemes, the request validator table, and each
  /// endpoint's integration and CORS preflight operation.
  pub fn amend(mut self) -> Result<Specification, AmendmentError> {
    info!(
      "amending specification with {} authorizer(s) and {} endpoint(s)",
      self.authorizers.len(),
      self.endpoints.len()
    );

    inject_authorizers(&mut self.specification, &self.authorizers)?;
    inject_request_validators(&mut self.specification, self.default_validation);
    warn_duplicate_endpoints(&self.endpoints);
    for (key, entry) in &self.endpoints {
      amend_endpoint(&mut self.specification, key, entry, &self.cors)?;
    }

    Ok(self.specification)
  }
}

fn inject_authorizers(
  spec: &mut Specification,
  authorizers: &IndexMap<String, Value>,
) -> Result<(), AmendmentError> {
  let components = object_entry(spec, "components", "")?;
  let security_schemes = object_entry(components, "securitySchemes", "/components")?;

  for (name, entry) in authorizers {
    let config = AuthorizerConfig::from_entry(name, entry)?;
    if security_schemes
      .insert(name.to_owned(), security_scheme(&config))
      .is_some()
    {
      debug!("replacing existing security scheme `{name}`");
    }
  }

  Ok(())
}

fn security_scheme(config: &AuthorizerConfig) -> Value {
  let mut authorizer = Map::new();
  authorizer.insert("type".to_string(), "token".into());
  authorizer.insert(
    "identityValidationExpression".to_string(),
    config.identity_validation.as_deref().into(),
  );
  authorizer.insert(
    "authorizerUri".to_string(),
    config.invoke_arn.as_str().into(),
  );
  authorizer.insert(
    "authorizerCredentials".to_string(),
    config.iam_role_arn.as_str().into(),
  );
  authorizer.insert(
    "authorizerResultTtlInSeconds".to_string(),
    config.result_ttl_in_seconds.into(),
  );

  json!({
    "type": "apiKey",
    "name": "Authorization",
    "in": "header",
    AUTHORIZER_EXTENSION: authorizer,
    AUTHTYPE_EXTENSION: "custom",
  })
}

fn inject_request_validators(spec: &mut Specification, default_validation: Option<ValidationMode>) {
  let validators = ValidationMode::ALL
    .iter()
    .map(|mode| {
      (
        mode.as_str().to_string(),
        json!({
          "validateRequestBody": mode.validate_request_body(),
          "validateRequestParameters": mode.validate_request_parameters(),
        }),
      )
    })
    .collect::<Map<_, _>>();
  spec.insert(
    REQUEST_VALIDATORS_EXTENSION.to_string(),
    Value::Object(validators),
  );

  // API Gateway treats an unset document-level validator as NONE.
  match default_validation {
    Some(ValidationMode::None) | None => {}
    Some(mode) => {
      spec.insert(REQUEST_VALIDATOR_EXTENSION.to_string(), mode.as_str().into());
    }
  }
}

fn amend_endpoint(
  spec: &mut Specification,
  key: &str,
  entry: &Value,
  cors: &CorsConfig,
) -> Result<(), AmendmentError> {
  let endpoint = EndpointKey::parse(key)?;
  let config = EndpointConfig::from_entry(key, entry)?;
  debug!("integrating endpoint {endpoint} with {}", config.lambda.invoke_arn);

  if let Some(authorizer_name) = &config.authorizer_name {
    let has_scheme = spec
      .get("components")
      .and_then(|components| components.get("securitySchemes"))
      .and_then(|schemes| schemes.get(authorizer_name))
      .is_some();
    if !has_scheme {
      warn!("endpoint {endpoint} references undeclared authorizer `{authorizer_name}`");
    }
  }

  let paths = object_entry(spec, "paths", "")?;
  let path_pointer = push_pointer("/paths", endpoint.path());
  let path_item = object_entry(paths, endpoint.path(), "/paths")?;
  let operation = object_entry(path_item, &endpoint.operation_key(), &path_pointer)?;
  merge_shallow(operation, integration_operation(&config));

  // The preflight is regenerated from scratch so that it reflects every method registered on this
  // path so far.
  let allow_methods = allowed_methods(path_item);
  path_item.insert(
    "options".to_string(),
    preflight_operation(cors, &allow_methods),
  );

  Ok(())
}

fn integration_operation(config: &EndpointConfig) -> Map<String, Value> {
  let mut operation = Map::new();
  operation.insert(
    INTEGRATION_EXTENSION.to_string(),
    // Lambda functions are always invoked with POST, regardless of the API method.
    json!({
      "httpMethod": "POST",
      "payloadFormatVersion": config.payload_format_version,
      "timeoutInMillis": config.timeout_milliseconds,
      "type": "AWS_PROXY",
      "uri": config.lambda.invoke_arn,
    }),
  );
  if let Some(authorizer_name) = &config.authorizer_name {
    operation.insert(
      "security".to_string(),
      json!([{ authorizer_name: [] }]),
    );
  }
  if let Some(validation) = config.validation {
    operation.insert(
      REQUEST_VALIDATOR_EXTENSION.to_string(),
      validation.as_str().into(),
    );
  }
  operation
}

fn warn_duplicate_endpoints(endpoints: &IndexMap<String, Value>) {
  let mut seen = HashSet::new();
  for endpoint in endpoints
    .keys()
    .filter_map(|key| EndpointKey::parse(key).ok())
  {
    if !seen.insert((endpoint.operation_key(), endpoint.path().to_string())) {
      warn!("endpoint {endpoint} is listed more than once; later entries overwrite earlier ones");
    }
  }
}
