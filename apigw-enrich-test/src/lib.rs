//! End-to-end tests that run the `apigw-enrich` pipeline over the fixtures in `spec/`:
//!  * `openapi.yaml` - base specification (embedded into the query as `specification`)
//!  * `query.json` - Terraform-style query with JSON-encoded authorizers, endpoints, and CORS
//!  * `expected.json` - amended specification
//!
//! To regenerate `expected.json` after an intentional output change, run the `enrich` pipeline on
//! the fixture query and replace the file with the decoded `json_specification`.
