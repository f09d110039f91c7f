// Until std::error::Backtrace is fully stabilized, we can't embed a type named `Backtrace` within
// a thiserror::Error (see https://github.com/dtolnay/thiserror/issues/204).
use backtrace::Backtrace as _Backtrace;
use itertools::Itertools;
use thiserror::Error;

use std::io;

/// Error that occurred while reading or parsing the query.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum InputError {
  /// Encoded query field (e.g., `endpoints`) does not have the expected fields and types.
  #[error("`{field}` does not have the expected shape")]
  InvalidEncodedField {
    /// Name of the query field that failed to parse.
    field: &'static str,
    /// Underlying error that occurred while parsing the field.
    #[source]
    source: Box<serde_path_to_error::Error<serde_json::Error>>,
    /// Stack trace indicating where the error occurred.
    backtrace: _Backtrace,
  },
  /// Encoded query field (e.g., `endpoints`) is not well-formed JSON.
  #[error("`{field}` is not well-formed JSON")]
  InvalidEncodedJson {
    /// Name of the query field that failed to parse.
    field: &'static str,
    /// Underlying error that occurred while parsing the field.
    #[source]
    source: Box<serde_json::Error>,
    /// Stack trace indicating where the error occurred.
    backtrace: _Backtrace,
  },
  /// Query does not have the expected fields and types.
  #[error("query does not have the expected shape")]
  InvalidQuery(
    #[source] Box<serde_path_to_error::Error<serde_json::Error>>,
    _Backtrace,
  ),
  /// Query is not well-formed JSON.
  #[error("query is not well-formed JSON")]
  InvalidQueryJson(#[source] Box<serde_json::Error>, _Backtrace),
  /// Failed to parse the base specification as JSON.
  #[error("failed to parse `specification` as JSON")]
  InvalidSpecificationJson(#[source] Box<serde_json::Error>, _Backtrace),
  /// Failed to parse the base specification as YAML.
  #[error("failed to parse `specification` as YAML")]
  InvalidSpecificationYaml(#[source] Box<serde_yaml::Error>, _Backtrace),
  /// Invalid document-level validation mode.
  #[error("invalid validation mode `{0}` (expected one of NONE, PARAMS, BODY, FULL)")]
  InvalidValidationMode(String, _Backtrace),
  /// Missing required query field.
  #[error("missing required field `{0}`")]
  MissingField(&'static str, _Backtrace),
  /// Failed to read the query from the input transport.
  #[error("failed to read query")]
  Read(#[source] Box<io::Error>, _Backtrace),
  /// Base specification is not a JSON/YAML mapping.
  #[error("`specification` must be an object")]
  SpecificationNotObject(_Backtrace),
  /// Base specification contains YAML that has no JSON equivalent.
  #[error("unsupported YAML value at `{path}`: {reason}")]
  UnsupportedYaml {
    /// Location of the offending value within the specification.
    path: String,
    /// Human-readable reason why the value is unsupported.
    reason: String,
    /// Stack trace indicating where the error occurred.
    backtrace: _Backtrace,
  },
}

impl InputError {
  /// Return the backtrace associated with the error.
  pub fn backtrace(&self) -> Option<&_Backtrace> {
    match self {
      InputError::InvalidEncodedField { backtrace, .. }
      | InputError::InvalidEncodedJson { backtrace, .. }
      | InputError::InvalidQuery(_, backtrace)
      | InputError::InvalidQueryJson(_, backtrace)
      | InputError::InvalidSpecificationJson(_, backtrace)
      | InputError::InvalidSpecificationYaml(_, backtrace)
      | InputError::InvalidValidationMode(_, backtrace)
      | InputError::MissingField(_, backtrace)
      | InputError::Read(_, backtrace)
      | InputError::SpecificationNotObject(backtrace)
      | InputError::UnsupportedYaml { backtrace, .. } => Some(backtrace),
    }
  }

  /// Return the name of the error variant (e.g., `MissingField`).
  pub fn name(&self) -> &str {
    match self {
      InputError::InvalidEncodedField { .. } => "InvalidEncodedField",
      InputError::InvalidEncodedJson { .. } => "InvalidEncodedJson",
      InputError::InvalidQuery(_, _) => "InvalidQuery",
      InputError::InvalidQueryJson(_, _) => "InvalidQueryJson",
      InputError::InvalidSpecificationJson(_, _) => "InvalidSpecificationJson",
      InputError::InvalidSpecificationYaml(_, _) => "InvalidSpecificationYaml",
      InputError::InvalidValidationMode(_, _) => "InvalidValidationMode",
      InputError::MissingField(_, _) => "MissingField",
      InputError::Read(_, _) => "Read",
      InputError::SpecificationNotObject(_) => "SpecificationNotObject",
      InputError::UnsupportedYaml { .. } => "UnsupportedYaml",
    }
  }
}

/// Error that occurred while amending the specification.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AmendmentError {
  /// Authorizer entry is missing a required field or has a field of the wrong type.
  #[error("invalid configuration for authorizer `{name}`")]
  InvalidAuthorizer {
    /// Name of the authorizer.
    name: String,
    /// Underlying error that occurred while reading the entry.
    #[source]
    source: Box<serde_path_to_error::Error<serde_json::Error>>,
    /// Stack trace indicating where the error occurred.
    backtrace: _Backtrace,
  },
  /// Endpoint entry is missing a required field or has a field of the wrong type.
  #[error("invalid configuration for endpoint `{endpoint}`")]
  InvalidEndpoint {
    /// Endpoint key (e.g., `GET /pets`).
    endpoint: String,
    /// Underlying error that occurred while reading the entry.
    #[source]
    source: Box<serde_path_to_error::Error<serde_json::Error>>,
    /// Stack trace indicating where the error occurred.
    backtrace: _Backtrace,
  },
  /// Endpoint key cannot be split into exactly a method and a path.
  #[error("endpoint `{0}` must have the form `<METHOD> <PATH>`")]
  InvalidEndpointKey(String, _Backtrace),
  /// Endpoint key contains an invalid HTTP method token.
  #[error("endpoint `{endpoint}` has an invalid HTTP method")]
  InvalidMethod {
    /// Endpoint key (e.g., `GET /pets`).
    endpoint: String,
    /// Underlying error that occurred while parsing the method.
    #[source]
    source: Box<http::method::InvalidMethod>,
    /// Stack trace indicating where the error occurred.
    backtrace: _Backtrace,
  },
  /// Existing document content that must be an object is some other JSON value.
  #[error("expected an object at `{0}`")]
  NotAnObject(String, _Backtrace),
  /// Endpoint uses the `OPTIONS` method, which is reserved for CORS preflight operations.
  #[error("endpoint `{0}` uses the reserved OPTIONS method")]
  ReservedMethod(String, _Backtrace),
  /// Endpoint method is not an OpenAPI operation method.
  #[error("endpoint `{0}` uses a method that OpenAPI path items do not support")]
  UnsupportedMethod(String, _Backtrace),
}

impl AmendmentError {
  /// Return the backtrace associated with the error.
  pub fn backtrace(&self) -> Option<&_Backtrace> {
    match self {
      AmendmentError::InvalidAuthorizer { backtrace, .. }
      | AmendmentError::InvalidEndpoint { backtrace, .. }
      | AmendmentError::InvalidEndpointKey(_, backtrace)
      | AmendmentError::InvalidMethod { backtrace, .. }
      | AmendmentError::NotAnObject(_, backtrace)
      | AmendmentError::ReservedMethod(_, backtrace)
      | AmendmentError::UnsupportedMethod(_, backtrace) => Some(backtrace),
    }
  }

  /// Return the name of the error variant (e.g., `InvalidEndpointKey`).
  pub fn name(&self) -> &str {
    match self {
      AmendmentError::InvalidAuthorizer { .. } => "InvalidAuthorizer",
      AmendmentError::InvalidEndpoint { .. } => "InvalidEndpoint",
      AmendmentError::InvalidEndpointKey(_, _) => "InvalidEndpointKey",
      AmendmentError::InvalidMethod { .. } => "InvalidMethod",
      AmendmentError::NotAnObject(_, _) => "NotAnObject",
      AmendmentError::ReservedMethod(_, _) => "ReservedMethod",
      AmendmentError::UnsupportedMethod(_, _) => "UnsupportedMethod",
    }
  }
}

/// Error that occurred while writing the amended specification.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum OutputError {
  /// Failed to serialize the specification or the output object to JSON.
  #[error("failed to serialize output to JSON")]
  Serialize(#[source] Box<serde_json::Error>, _Backtrace),
  /// Failed to write to the output transport.
  #[error("failed to write output")]
  Write(#[source] Box<io::Error>, _Backtrace),
}

impl OutputError {
  /// Return the backtrace associated with the error.
  pub fn backtrace(&self) -> Option<&_Backtrace> {
    match self {
      OutputError::Serialize(_, backtrace) | OutputError::Write(_, backtrace) => Some(backtrace),
    }
  }

  /// Return the name of the error variant (e.g., `Write`).
  pub fn name(&self) -> &str {
    match self {
      OutputError::Serialize(_, _) => "Serialize",
      OutputError::Write(_, _) => "Write",
    }
  }
}

/// Error returned by the [`enrich`](crate::enrich) pipeline.
///
/// Each variant corresponds to one pipeline stage so that callers can distinguish configuration
/// bugs (`Input`, `Amendment`) from environmental failures (`Output`).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EnrichError {
  /// Failed to read input.
  #[error("failed to read input")]
  Input(#[source] InputError),
  /// Failed to modify the OpenAPI specification.
  #[error("failed to modify OpenAPI specification")]
  Amendment(#[source] AmendmentError),
  /// Failed to write output.
  #[error("failed to write output")]
  Output(#[source] OutputError),
}

impl EnrichError {
  /// Return the backtrace associated with the underlying stage error.
  pub fn backtrace(&self) -> Option<&_Backtrace> {
    match self {
      EnrichError::Input(err) => err.backtrace(),
      EnrichError::Amendment(err) => err.backtrace(),
      EnrichError::Output(err) => err.backtrace(),
    }
  }

  /// Return the process exit code for this class of failure (1, 2, or 3).
  pub fn exit_code(&self) -> i32 {
    match self {
      EnrichError::Input(_) => 1,
      EnrichError::Amendment(_) => 2,
      EnrichError::Output(_) => 3,
    }
  }

  /// Return the qualified name of the underlying error variant (e.g., `InputError::MissingField`).
  pub fn name(&self) -> String {
    match self {
      EnrichError::Input(err) => format!("InputError::{}", err.name()),
      EnrichError::Amendment(err) => format!("AmendmentError::{}", err.name()),
      EnrichError::Output(err) => format!("OutputError::{}", err.name()),
    }
  }
}

impl From<InputError> for EnrichError {
  fn from(err: InputError) -> Self {
    EnrichError::Input(err)
  }
}

impl From<AmendmentError> for EnrichError {
  fn from(err: AmendmentError) -> Self {
    EnrichError::Amendment(err)
  }
}

impl From<OutputError> for EnrichError {
  fn from(err: OutputError) -> Self {
    EnrichError::Output(err)
  }
}

/// Helper function for formatting an error as a string containing a human-readable chain of causes.
///
/// This function will walk over the chain of causes returned by
/// [`Error::source`](std::error::Error::source) and append each underlying error (using the
/// [`Display`](std::fmt::Display) trait).
///
/// # Arguments
///
/// * `err` - Error to format.
/// * `name` - Optional name of the error type/variant (e.g., `InputError::MissingField`).
/// * `backtrace` - Optional [`Backtrace`](backtrace::Backtrace) indicating where the top-level
///   error occurred.
pub fn format_error(
  err: &(dyn std::error::Error),
  name: Option<&str>,
  backtrace: Option<&_Backtrace>,
) -> String {
  let err_line = name
    .map(|n| format!("{}: {}", n, err))
    .unwrap_or_else(|| err.to_string());

  let top_error = if let Some(bt) = backtrace {
    format!("{err_line}\n  stack trace:\n{}", format_backtrace(bt, 4))
  } else {
    err_line
  };

  let cause_str = ErrorCauseIterator(err.source())
    .map(|cause| format!("  caused by: {cause}"))
    .join("\n");

  if !cause_str.is_empty() {
    format!("{top_error}\n{cause_str}")
  } else {
    top_error
  }
}

struct ErrorCauseIterator<'a>(Option<&'a (dyn std::error::Error + 'static)>);

impl<'a> Iterator for ErrorCauseIterator<'a> {
  type Item = &'a (dyn std::error::Error + 'static);

  fn next(&mut self) -> Option<Self::Item> {
    let current = self.0;
    self.0 = current.and_then(|err| err.source());
    current
  }
}

fn format_backtrace(backtrace: &_Backtrace, indent: usize) -> String {
  let indent_str = " ".repeat(indent);
  format!("{backtrace:?}")
    .lines()
    .map(|line| format!("{indent_str}{line}"))
    .join("\n")
}
