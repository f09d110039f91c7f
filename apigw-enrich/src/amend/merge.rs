use crate::document::push_pointer;
use crate::error::AmendmentError;

use backtrace::Backtrace;
use serde_json::{Map, Value};

/// Shallow-merge `source` into `target`: keys only in `target` are preserved, keys in both take
/// the value from `source`, and keys only in `source` are appended.
pub(crate) fn merge_shallow(target: &mut Map<String, Value>, source: Map<String, Value>) {
  for (key, value) in source {
    target.insert(key, value);
  }
}

/// Return the object stored under `key`, inserting an empty object first if the key is absent.
///
/// `parent` is the JSON pointer of `map` and is used only for error reporting.
pub(crate) fn object_entry<'a>(
  map: &'a mut Map<String, Value>,
  key: &str,
  parent: &str,
) -> Result<&'a mut Map<String, Value>, AmendmentError> {
  match map
    .entry(key)
    .or_insert_with(|| Value::Object(Map::new()))
  {
    Value::Object(object) => Ok(object),
    _ => Err(AmendmentError::NotAnObject(
      push_pointer(parent, key),
      Backtrace::new(),
    )),
  }
}
