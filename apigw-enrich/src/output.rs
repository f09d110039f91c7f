use crate::document::Specification;
use crate::error::OutputError;

use backtrace::Backtrace;
use serde::Serialize;

use std::io::Write;

/// Output object written to the output transport.
#[derive(Debug, Serialize)]
struct Output {
  json_specification: String,
}

/// Render the output object for `specification`: `{"json_specification": "<document>"}`,
/// pretty-printed and newline-terminated.
pub fn render_output(specification: &Specification) -> Result<Vec<u8>, OutputError> {
  let json_specification = serde_json::to_string(specification)
    .map_err(|err| OutputError::Serialize(Box::new(err), Backtrace::new()))?;

  let mut rendered = serde_json::to_vec_pretty(&Output { json_specification })
    .map_err(|err| OutputError::Serialize(Box::new(err), Backtrace::new()))?;
  rendered.push(b'\n');
  Ok(rendered)
}

/// Write the output object for `specification` to `writer`.
///
/// The output is fully rendered before the first byte is written.
pub fn write_output<W>(specification: &Specification, mut writer: W) -> Result<(), OutputError>
where
  W: Write,
{
  let rendered = render_output(specification)?;
  writer
    .write_all(&rendered)
    .and_then(|()| writer.flush())
    .map_err(|err| OutputError::Write(Box::new(err), Backtrace::new()))
}
