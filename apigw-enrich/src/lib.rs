#![warn(missing_docs)]

//! Amend OpenAPI definitions with
//! [Amazon API Gateway extensions](https://docs.aws.amazon.com/apigateway/latest/developerguide/api-gateway-swagger-extensions.html).
//!
//! Given a base OpenAPI document (or a service name and version from which to synthesize one),
//! this crate injects:
//!  * `apiKey` security schemes backed by custom Lambda (`token`) authorizers,
//!  * the `NONE`/`PARAMS`/`BODY`/`FULL` request validator table and an optional document-level
//!    default,
//!  * an `AWS_PROXY` Lambda integration for each `<METHOD> <PATH>` endpoint, and
//!  * a mock `options` operation on every integrated path that answers CORS preflight requests.
//!
//! The [`enrich`] pipeline speaks the protocol of Terraform's
//! [`external`](https://registry.terraform.io/providers/hashicorp/external/latest/docs/data-sources/external)
//! data source: one JSON query object in, `{"json_specification": "..."}` out.
//!
//! # Example
//!
//! ```rust
//! let query = r#"{"service": "MyService", "version": "1.0.0", "endpoints": "{}"}"#;
//! let mut output = Vec::new();
//! apigw_enrich::enrich(query.as_bytes(), &mut output).unwrap();
//!
//! let output: serde_json::Value = serde_json::from_slice(&output).unwrap();
//! assert!(output["json_specification"].is_string());
//! ```

use std::io::{Read, Write};

mod amend;
mod config;
mod document;
/// Error handling.
pub mod error;
mod output;
mod resolve;

pub use amend::{
  Enricher, AUTHORIZER_EXTENSION, AUTHTYPE_EXTENSION, INTEGRATION_EXTENSION,
  REQUEST_VALIDATORS_EXTENSION, REQUEST_VALIDATOR_EXTENSION,
};
pub use config::{
  AuthorizerConfig, CorsConfig, EndpointConfig, EndpointKey, LambdaTarget,
  ParseValidationModeError, ValidationMode,
};
pub use document::Specification;
pub use error::{AmendmentError, EnrichError, InputError, OutputError};
pub use output::{render_output, write_output};
pub use resolve::{resolve_input, resolve_query};

/// Read a query from `input`, amend the specification, and write the result to `output`.
///
/// Nothing is written to `output` unless every stage succeeds.
pub fn enrich<R, W>(input: R, output: W) -> Result<(), EnrichError>
where
  R: Read,
  W: Write,
{
  let enricher = resolve_input(input)?;
  let specification = enricher.amend()?;
  write_output(&specification, output)?;
  Ok(())
}
