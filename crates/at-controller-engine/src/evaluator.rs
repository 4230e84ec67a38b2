//! Evaluation of value-producing expressions.

use at_controller_core::value::is_truthy;
use at_controller_core::{AttributeStore, ControllerError, FrameData, Result};
use at_controller_diagram::{Expr, FrameUrl, Function, PathSegment, UrlExtract};
use serde_json::{Map, Value};
use tracing::trace;

use crate::operations::{apply_binary, apply_unary};
use crate::urls::query_values;

/// Everything an expression can read while it is evaluated.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    pub attributes: &'a AttributeStore,
    pub auth_token: &'a str,
    pub frames: &'a FrameData,
    pub event_data: &'a Value,
    pub initial_event_data: &'a Value,
}

impl<'a> Scope<'a> {
    pub fn with_event_data(self, event_data: &'a Value) -> Self {
        Self { event_data, ..self }
    }
}

/// Evaluates `expr`, invoking nested functions depth-first.
pub fn evaluate(expr: &Expr, scope: &Scope<'_>) -> Result<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::List(items) => items
            .iter()
            .map(|item| evaluate(item, scope))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Expr::Map(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, item) in entries {
                map.insert(key.clone(), evaluate(item, scope)?);
            }
            Ok(Value::Object(map))
        }
        Expr::Call(function) => call(function, scope),
    }
}

pub fn call(function: &Function, scope: &Scope<'_>) -> Result<Value> {
    trace!(function = function.name(), "Calling function");
    match function {
        Function::GetAttribute(attribute) | Function::StateAttr(attribute) => {
            Ok(match evaluate(attribute, scope)? {
                Value::String(key) => scope.attributes.get_or_null(&key),
                _ => Value::Null,
            })
        }
        Function::FrameUrl(frame_url) => frame_url_value(frame_url, scope),
        Function::AuthToken => Ok(Value::String(scope.auth_token.to_string())),
        Function::EventData(path) => Ok(extract(scope.event_data, path)),
        Function::InitialEventData(path) => Ok(extract(scope.initial_event_data, path)),
        Function::And(items) => {
            let mut result = Value::Bool(true);
            for item in items {
                result = evaluate(item, scope)?;
                if !is_truthy(&result) {
                    break;
                }
            }
            Ok(result)
        }
        Function::Or(items) => {
            let mut result = Value::Bool(false);
            for item in items {
                result = evaluate(item, scope)?;
                if is_truthy(&result) {
                    break;
                }
            }
            Ok(result)
        }
        Function::Not(value) => Ok(Value::Bool(!is_truthy(&evaluate(value, scope)?))),
        Function::Unary { op, value } => apply_unary(*op, &evaluate(value, scope)?),
        Function::Binary { op, left, right } => {
            let left = evaluate(left, scope)?;
            let right = evaluate(right, scope)?;
            apply_binary(*op, &left, &right, scope.attributes)
        }
    }
}

/// Follows `path` into `data`.
///
/// A missing map key continues from an empty map, so a path that runs off a
/// map ends in `{}`; an index past the end of a list or a segment that does
/// not fit the value ends in `null`.
pub fn extract(data: &Value, path: &[PathSegment]) -> Value {
    let Some((segment, rest)) = path.split_first() else {
        return data.clone();
    };
    match (data, segment) {
        (Value::Object(map), PathSegment::Key(key)) => match map.get(key) {
            Some(value) => extract(value, rest),
            None => extract(&Value::Object(Map::new()), rest),
        },
        (Value::Object(_), PathSegment::Index(_)) => extract(&Value::Object(Map::new()), rest),
        (Value::Array(items), PathSegment::Index(index)) => items
            .get(*index)
            .map(|item| extract(item, rest))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn frame_url_value(frame_url: &FrameUrl, scope: &Scope<'_>) -> Result<Value> {
    let frame_id = evaluate(&frame_url.frame_id, scope)?;
    let Some(url) = frame_id.as_str().and_then(|id| scope.frames.get(id)) else {
        return Ok(Value::Null);
    };

    match &frame_url.extract {
        UrlExtract::Whole => Ok(Value::String(url.clone())),
        UrlExtract::Pattern { regex, group } => {
            let Some(captures) = regex.captures(url) else {
                return Ok(Value::Null);
            };
            if group + 1 >= captures.len() {
                return Err(ControllerError::computation(format!(
                    "frame_url regexp has no capture group {}",
                    group
                )));
            }
            Ok(captures
                .get(group + 1)
                .map(|m| Value::String(m.as_str().to_string()))
                .unwrap_or(Value::Null))
        }
        UrlExtract::QueryParam { param, index } => Ok(query_values(url, param)
            .into_iter()
            .nth(*index)
            .map(Value::String)
            .unwrap_or(Value::Null)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use at_controller_diagram::{BinaryOp, UnaryOp, parse_expr};
    use serde_json::json;

    struct Fixture {
        attributes: AttributeStore,
        frames: FrameData,
        event_data: Value,
        initial_event_data: Value,
    }

    impl Fixture {
        fn new() -> Self {
            let attributes = AttributeStore::new();
            attributes.set("count", json!(2));
            attributes.set("name", json!("alice"));
            let mut frames = FrameData::new();
            frames.insert(
                "main".to_string(),
                "https://host/task/42/step?id=7&id=8&mode=edit".into(),
            );
            Self {
                attributes,
                frames,
                event_data: json!({"status": "done", "items": [10, 20]}),
                initial_event_data: json!({"course": "math"}),
            }
        }

        fn scope(&self) -> Scope<'_> {
            Scope {
                attributes: &self.attributes,
                auth_token: "token-1",
                frames: &self.frames,
                event_data: &self.event_data,
                initial_event_data: &self.initial_event_data,
            }
        }

        fn eval(&self, value: Value) -> Result<Value> {
            evaluate(&parse_expr(&value)?, &self.scope())
        }
    }

    #[test]
    fn test_literals_and_attributes() {
        let fixture = Fixture::new();
        assert_eq!(fixture.eval(json!(5)).unwrap(), json!(5));
        assert_eq!(fixture.eval(json!({"get_attribute": "count"})).unwrap(), json!(2));
        assert_eq!(fixture.eval(json!({"get_attribute": "missing"})).unwrap(), json!(null));
        assert_eq!(fixture.eval(json!({"state_attr": "name"})).unwrap(), json!("alice"));
        assert_eq!(fixture.eval(json!("$auth_token")).unwrap(), json!("token-1"));
    }

    #[test]
    fn test_nested_functions_in_literals() {
        let fixture = Fixture::new();
        let value = fixture
            .eval(json!({
                "user": {"get_attribute": "name"},
                "items": [{"event_data": ["items", 1]}, "plain"],
            }))
            .unwrap();
        assert_eq!(value, json!({"user": "alice", "items": [20, "plain"]}));
    }

    #[test]
    fn test_extract_paths() {
        let data = json!({"a": {"b": 5}});
        assert_eq!(extract(&data, &[PathSegment::from("a"), PathSegment::from("b")]), json!(5));
        assert_eq!(extract(&data, &[]), data);
        assert_eq!(extract(&json!([10, 20]), &[PathSegment::Index(1)]), json!(20));
        assert_eq!(extract(&json!([10, 20]), &[PathSegment::Index(5)]), json!(null));
        assert_eq!(extract(&json!("text"), &[PathSegment::from("a")]), json!(null));
        assert_eq!(extract(&data, &[PathSegment::from("missing")]), json!({}));
        assert_eq!(extract(&data, &[PathSegment::from("missing"), PathSegment::Index(0)]), json!({}));
        assert_eq!(extract(&json!([{"x": [1, 2]}]), &[PathSegment::Index(0), PathSegment::from("x"), PathSegment::Index(1)]), json!(2));
    }

    #[test]
    fn test_event_data_functions() {
        let fixture = Fixture::new();
        assert_eq!(fixture.eval(json!("$event_data")).unwrap(), fixture.event_data);
        assert_eq!(fixture.eval(json!({"event_data": ["status"]})).unwrap(), json!("done"));
        assert_eq!(
            fixture.eval(json!({"initial_event_data": ["course"]})).unwrap(),
            json!("math")
        );
    }

    #[test]
    fn test_logical_functions_short_circuit() {
        let fixture = Fixture::new();
        // the second item would fail with a computation error if evaluated
        let failing = json!({"div": {"left_value": 1, "right_value": 0}});
        assert_eq!(fixture.eval(json!({"and": [false, failing.clone()]})).unwrap(), json!(false));
        assert_eq!(fixture.eval(json!({"or": ["yes", failing.clone()]})).unwrap(), json!("yes"));
        assert!(fixture.eval(json!({"and": [true, failing]})).is_err());

        assert_eq!(fixture.eval(json!({"and": [1, "x"]})).unwrap(), json!("x"));
        assert_eq!(fixture.eval(json!({"or": [0, ""]})).unwrap(), json!(""));
        assert_eq!(fixture.eval(json!({"and": []})).unwrap(), json!(true));
        assert_eq!(fixture.eval(json!({"not": 0})).unwrap(), json!(true));
    }

    #[test]
    fn test_operation_functions() {
        let fixture = Fixture::new();
        assert_eq!(
            fixture
                .eval(json!({"add": {"left_value": {"get_attribute": "count"}, "right_value": 1}}))
                .unwrap(),
            json!(3)
        );
        assert_eq!(fixture.eval(json!({"len": {"get_attribute": "name"}})).unwrap(), json!(5));

        let expr = Expr::call(Function::Binary {
            op: BinaryOp::HasAttr,
            left: Expr::call(Function::EventData(vec![])),
            right: Expr::literal("status"),
        });
        assert_eq!(evaluate(&expr, &fixture.scope()).unwrap(), json!(true));

        let expr = Expr::call(Function::Unary {
            op: UnaryOp::IsNull,
            value: Expr::call(Function::GetAttribute(Expr::literal("nothing"))),
        });
        assert_eq!(evaluate(&expr, &fixture.scope()).unwrap(), json!(true));
    }

    #[test]
    fn test_frame_url() {
        let fixture = Fixture::new();
        assert_eq!(
            fixture.eval(json!({"frame_url": "main"})).unwrap(),
            json!("https://host/task/42/step?id=7&id=8&mode=edit")
        );
        assert_eq!(fixture.eval(json!({"frame_url": "absent"})).unwrap(), json!(null));
        assert_eq!(
            fixture
                .eval(json!({"frame_url": {"frame_id": "main", "parse": "https://host/task/(\\d+)"}}))
                .unwrap(),
            json!("42")
        );
        // anchored at the start of the URL
        assert_eq!(
            fixture
                .eval(json!({"frame_url": {"frame_id": "main", "parse": "task/(\\d+)"}}))
                .unwrap(),
            json!(null)
        );
        assert!(
            fixture
                .eval(json!({"frame_url": {"frame_id": "main", "parse": {"regexp": "https://(host)", "group": 3}}}))
                .is_err()
        );
        assert_eq!(
            fixture
                .eval(json!({"frame_url": {"frame_id": "main", "query_param": {"param": "id", "index": 1}}}))
                .unwrap(),
            json!("8")
        );
        assert_eq!(
            fixture
                .eval(json!({"frame_url": {"frame_id": "main", "query_param": "mode"}}))
                .unwrap(),
            json!("edit")
        );
        assert_eq!(
            fixture
                .eval(json!({"frame_url": {"frame_id": "main", "query_param": "nope"}}))
                .unwrap(),
            json!(null)
        );
    }
}
