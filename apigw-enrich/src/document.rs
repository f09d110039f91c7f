use crate::error::InputError;

use backtrace::Backtrace;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use std::ops::{Deref, DerefMut};

const OPENAPI_VERSION: &str = "3.0.3";

/// OpenAPI document being amended.
///
/// The document is kept as an insertion-ordered JSON object rather than a typed OpenAPI model so
/// that content this crate doesn't write (including unknown extensions) passes through unchanged
/// and in its original order.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Specification(Map<String, Value>);

impl Specification {
  /// Build a minimal OpenAPI 3 document with the given `info.title` and `info.version` and no
  /// paths.
  pub fn synthesize(service: &str, version: &str) -> Self {
    let mut root = Map::new();
    root.insert("openapi".to_string(), OPENAPI_VERSION.into());
    let mut info = Map::new();
    info.insert("title".to_string(), service.into());
    info.insert("version".to_string(), version.into());
    root.insert("info".to_string(), Value::Object(info));
    root.insert("paths".to_string(), Value::Object(Map::new()));
    Self(root)
  }

  /// Parse a JSON or YAML document.
  ///
  /// Text beginning with `{` is parsed strictly as JSON; anything else is parsed as YAML. YAML
  /// mapping keys that are numbers or booleans (e.g., `200:` response codes) are converted to
  /// strings.
  pub fn parse(text: &str) -> Result<Self, InputError> {
    let value = if text.trim_start().starts_with('{') {
      serde_json::from_str::<Value>(text)
        .map_err(|err| InputError::InvalidSpecificationJson(Box::new(err), Backtrace::new()))?
    } else {
      let yaml = serde_yaml::from_str::<serde_yaml::Value>(text)
        .map_err(|err| InputError::InvalidSpecificationYaml(Box::new(err), Backtrace::new()))?;
      yaml_to_json(yaml, "")?
    };

    match value {
      Value::Object(root) => Ok(Self(root)),
      _ => Err(InputError::SpecificationNotObject(Backtrace::new())),
    }
  }
}

impl Deref for Specification {
  type Target = Map<String, Value>;

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl DerefMut for Specification {
  fn deref_mut(&mut self) -> &mut Self::Target {
    &mut self.0
  }
}

/// Append a segment to a JSON pointer (RFC 6901), escaping `~` and `/`.
pub(crate) fn push_pointer(parent: &str, segment: &str) -> String {
  format!("{parent}/{}", segment.replace('~', "~0").replace('/', "~1"))
}

fn yaml_to_json(value: serde_yaml::Value, path: &str) -> Result<Value, InputError> {
  let unsupported = |reason: String| InputError::UnsupportedYaml {
    path: if path.is_empty() {
      "/".to_string()
    } else {
      path.to_string()
    },
    reason,
    backtrace: Backtrace::new(),
  };

  Ok(match value {
    serde_yaml::Value::Null => Value::Null,
    serde_yaml::Value::Bool(b) => Value::Bool(b),
    serde_yaml::Value::Number(n) => {
      if let Some(u) = n.as_u64() {
        Value::Number(u.into())
      } else if let Some(i) = n.as_i64() {
        Value::Number(i.into())
      } else {
        let f = n.as_f64().unwrap_or(f64::NAN);
        Value::Number(
          Number::from_f64(f).ok_or_else(|| unsupported(format!("non-finite number `{n}`")))?,
        )
      }
    }
    serde_yaml::Value::String(s) => Value::String(s),
    serde_yaml::Value::Sequence(seq) => Value::Array(
      seq
        .into_iter()
        .enumerate()
        .map(|(idx, item)| yaml_to_json(item, &push_pointer(path, &idx.to_string())))
        .collect::<Result<_, _>>()?,
    ),
    serde_yaml::Value::Mapping(mapping) => {
      let mut object = Map::new();
      for (key, item) in mapping {
        let key = match key {
          serde_yaml::Value::String(s) => s,
          serde_yaml::Value::Number(n) => n.to_string(),
          serde_yaml::Value::Bool(b) => b.to_string(),
          other => return Err(unsupported(format!("mapping key {other:?} is not a scalar"))),
        };
        let item = yaml_to_json(item, &push_pointer(path, &key))?;
        object.insert(key, item);
      }
      Value::Object(object)
    }
    serde_yaml::Value::Tagged(tagged) => {
      return Err(unsupported(format!("YAML tag `{}` has no JSON equivalent", tagged.tag)))
    }
  })
}

#[cfg(test)]
mod tests {
  use super::{push_pointer, Specification};
  use crate::error::InputError;

  use pretty_assertions::assert_eq;
  use serde_json::json;

  #[test]
  fn test_synthesize() {
    let spec = Specification::synthesize("MyService", "1.0.0");
    assert_eq!(
      serde_json::to_value(&spec).unwrap(),
      json!({
        "openapi": "3.0.3",
        "info": {"title": "MyService", "version": "1.0.0"},
        "paths": {}
      })
    );
  }

  #[test]
  fn test_parse_json_preserves_order() {
    let spec = Specification::parse(r#"{"zeta": 1, "alpha": {"b": 2, "a": 3}}"#).unwrap();
    assert_eq!(spec.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
    assert_eq!(
      spec["alpha"].as_object().unwrap().keys().collect::<Vec<_>>(),
      vec!["b", "a"]
    );
  }

  #[test]
  fn test_parse_yaml() {
    let spec = Specification::parse(
      r#"
openapi: 3.0.3
info:
  title: Pets
  version: "2"
paths:
  /pets:
    get:
      responses:
        200:
          description: OK
      x-flag: true
      x-ratio: 0.5
"#,
    )
    .unwrap();
    assert_eq!(
      serde_json::to_value(&spec).unwrap(),
      json!({
        "openapi": "3.0.3",
        "info": {"title": "Pets", "version": "2"},
        "paths": {
          "/pets": {
            "get": {
              "responses": {"200": {"description": "OK"}},
              "x-flag": true,
              "x-ratio": 0.5
            }
          }
        }
      })
    );
  }

  #[test]
  fn test_parse_invalid() {
    assert!(matches!(
      Specification::parse(r#"{"openapi": "#),
      Err(InputError::InvalidSpecificationJson(_, _))
    ));
    assert!(matches!(
      Specification::parse("- a\n- b\n"),
      Err(InputError::SpecificationNotObject(_))
    ));
    assert!(matches!(
      Specification::parse("[1, 2]"),
      Err(InputError::SpecificationNotObject(_))
    ));

    let Err(InputError::UnsupportedYaml { path, .. }) =
      Specification::parse("paths:\n  /a: !custom {}\n")
    else {
      panic!("expected UnsupportedYaml error");
    };
    assert_eq!(path, "/paths/~1a");
  }

  #[test]
  fn test_push_pointer() {
    assert_eq!(push_pointer("", "paths"), "/paths");
    assert_eq!(push_pointer("/paths", "/pets/{id}"), "/paths/~1pets~1{id}");
    assert_eq!(push_pointer("/x", "a~b"), "/x/a~0b");
  }
}
