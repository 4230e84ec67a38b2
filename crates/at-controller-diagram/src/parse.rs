//! Builds expression, condition and action trees from document values.

use at_controller_core::{ControllerError, MessageType, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::action::{Action, ActionKind, DEFAULT_MESSAGE_TITLE};
use crate::condition::{CompareOp, Condition, Guard, InclusionOp};
use crate::expr::{BinaryOp, Expr, FrameUrl, Function, PathSegment, UnaryOp, UrlExtract};

fn invalid(message: impl Into<String>) -> ControllerError {
    ControllerError::InvalidDiagram(message.into())
}

fn single_entry(value: &Value) -> Option<(&str, &Value)> {
    match value {
        Value::Object(map) if map.len() == 1 => map.iter().next().map(|(k, v)| (k.as_str(), v)),
        _ => None,
    }
}

/// Parses a value that may contain functions at any depth.
///
/// Single-key maps whose key names a function and whose body has the right
/// shape become calls; anything else stays literal data.
pub fn parse_expr(value: &Value) -> Result<Expr> {
    match value {
        Value::String(s) => Ok(match s.as_str() {
            "$auth_token" => Expr::call(Function::AuthToken),
            "$event_data" => Expr::call(Function::EventData(Vec::new())),
            "$initial_event_data" => Expr::call(Function::InitialEventData(Vec::new())),
            _ => Expr::Literal(value.clone()),
        }),
        Value::Array(items) => {
            let items = items.iter().map(parse_expr).collect::<Result<Vec<_>>>()?;
            if items.iter().any(Expr::has_calls) {
                Ok(Expr::List(items))
            } else {
                Ok(Expr::Literal(value.clone()))
            }
        }
        Value::Object(map) => {
            if let Some((key, body)) = single_entry(value) {
                if let Some(function) = parse_function(key, body)? {
                    return Ok(Expr::call(function));
                }
            }
            let mut entries = IndexMap::with_capacity(map.len());
            for (key, item) in map {
                entries.insert(key.clone(), parse_expr(item)?);
            }
            if entries.values().any(Expr::has_calls) {
                Ok(Expr::Map(entries))
            } else {
                Ok(Expr::Literal(value.clone()))
            }
        }
        _ => Ok(Expr::Literal(value.clone())),
    }
}

/// `Ok(None)` means the body does not fit the function, so the map is data.
fn parse_function(key: &str, body: &Value) -> Result<Option<Function>> {
    let function = match key {
        "get_attribute" => Function::GetAttribute(parse_expr(body)?),
        "frame_url" => match parse_frame_url(body)? {
            Some(frame_url) => Function::FrameUrl(frame_url),
            None => return Ok(None),
        },
        "auth_token" => match body.as_str() {
            Some("$") => Function::AuthToken,
            _ => return Ok(None),
        },
        "event_data" => match parse_key_path(body) {
            Some(path) => Function::EventData(path),
            None => return Ok(None),
        },
        "initial_event_data" => match parse_key_path(body) {
            Some(path) => Function::InitialEventData(path),
            None => return Ok(None),
        },
        "and" | "or" => {
            let Some(items) = body.as_array() else {
                return Ok(None);
            };
            let items = items.iter().map(parse_expr).collect::<Result<Vec<_>>>()?;
            if key == "and" {
                Function::And(items)
            } else {
                Function::Or(items)
            }
        }
        "not" => Function::Not(parse_expr(body)?),
        "state_attr" => Function::StateAttr(parse_expr(body)?),
        _ => {
            if let Some(op) = UnaryOp::from_name(key) {
                Function::Unary {
                    op,
                    value: parse_expr(body)?,
                }
            } else if let Some(op) = BinaryOp::from_name(key) {
                match (body.get("left_value"), body.get("right_value")) {
                    (Some(left), Some(right)) => Function::Binary {
                        op,
                        left: parse_expr(left)?,
                        right: parse_expr(right)?,
                    },
                    _ => return Ok(None),
                }
            } else {
                return Ok(None);
            }
        }
    };
    Ok(Some(function))
}

fn parse_key_path(body: &Value) -> Option<Vec<PathSegment>> {
    match body {
        Value::String(s) if s == "$" => Some(Vec::new()),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(key) => Some(PathSegment::Key(key.clone())),
                Value::Number(n) => n.as_u64().map(|i| PathSegment::Index(i as usize)),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

fn parse_frame_url(body: &Value) -> Result<Option<FrameUrl>> {
    let map = match body {
        Value::String(frame_id) => {
            return Ok(Some(FrameUrl {
                frame_id: Expr::literal(frame_id.as_str()),
                extract: UrlExtract::Whole,
            }));
        }
        Value::Object(map) => map,
        _ => return Ok(None),
    };
    let Some(frame_id) = map.get("frame_id") else {
        return Ok(None);
    };
    let frame_id = parse_expr(frame_id)?;

    let extract = if let Some(parse) = map.get("parse") {
        let (pattern, group) = match parse {
            Value::String(pattern) => (pattern.as_str(), 0),
            Value::Object(body) => {
                let pattern = body
                    .get("regexp")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid("frame_url parse requires a `regexp` string"))?;
                let group = match body.get("group") {
                    None | Some(Value::Null) => 0,
                    Some(group) => group
                        .as_u64()
                        .ok_or_else(|| invalid("frame_url parse `group` must be a non-negative integer"))?
                        as usize,
                };
                (pattern, group)
            }
            _ => return Err(invalid("frame_url parse must be a regexp or a map")),
        };
        let regex = Regex::new(&format!("^(?:{})", pattern))
            .map_err(|e| invalid(format!("invalid frame_url regexp `{}`: {}", pattern, e)))?;
        UrlExtract::Pattern { regex, group }
    } else if let Some(query) = map.get("query_param") {
        match query {
            Value::String(param) => UrlExtract::QueryParam {
                param: param.clone(),
                index: 0,
            },
            Value::Object(body) => {
                let param = body
                    .get("param")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid("frame_url query_param requires a `param` string"))?;
                let index = match body.get("index") {
                    None | Some(Value::Null) => 0,
                    Some(index) => index.as_u64().ok_or_else(|| {
                        invalid("frame_url query_param `index` must be a non-negative integer")
                    })? as usize,
                };
                UrlExtract::QueryParam {
                    param: param.to_string(),
                    index,
                }
            }
            _ => return Err(invalid("frame_url query_param must be a name or a map")),
        }
    } else {
        UrlExtract::Whole
    };

    Ok(Some(FrameUrl { frame_id, extract }))
}

/// `{eq: {value: x}}` compares against `x`.
fn comparison_operand(body: &Value) -> Value {
    match single_entry(body) {
        Some(("value", inner)) => inner.clone(),
        _ => body.clone(),
    }
}

fn sub_condition(map: &Map<String, Value>) -> Result<Option<Box<Condition>>> {
    match map.get("condition") {
        None | Some(Value::Null) => Ok(None),
        Some(condition) => Ok(Some(Box::new(parse_condition(condition)?))),
    }
}

pub fn parse_condition(value: &Value) -> Result<Condition> {
    let (key, body) = single_entry(value)
        .ok_or_else(|| invalid(format!("condition must be a single-key map, got {}", value)))?;

    if let Some(op) = CompareOp::from_name(key) {
        return Ok(Condition::Compare {
            op,
            value: comparison_operand(body),
        });
    }
    if let Some(op) = InclusionOp::from_name(key) {
        return Ok(Condition::Inclusion {
            op,
            value: comparison_operand(body),
        });
    }

    match key {
        "and" | "or" => {
            let items = body
                .as_array()
                .ok_or_else(|| invalid(format!("`{}` condition expects a list", key)))?;
            let children = items.iter().map(parse_condition).collect::<Result<Vec<_>>>()?;
            return Ok(if key == "and" {
                Condition::And(children)
            } else {
                Condition::Or(children)
            });
        }
        "not" => return Ok(Condition::Not(Box::new(parse_condition(body)?))),
        _ => {}
    }

    if let Some(op) = UnaryOp::from_name(key) {
        return match body {
            Value::Null => Ok(Condition::Unary {
                op,
                condition: None,
            }),
            Value::String(s) if s == "$" => Ok(Condition::Unary {
                op,
                condition: None,
            }),
            Value::Object(map) if map.keys().all(|k| k == "condition") => Ok(Condition::Unary {
                op,
                condition: sub_condition(map)?,
            }),
            _ => Err(invalid(format!(
                "`{}` condition takes `$` or a `condition` body",
                key
            ))),
        };
    }

    if let Some(op) = BinaryOp::from_name(key) {
        if let Value::Object(map) = body {
            if map.contains_key("left_value") || map.contains_key("right_value") {
                return Err(invalid(format!(
                    "`{}` with left_value/right_value is a function, not a condition",
                    key
                )));
            }
            if let Some(argument) = map.get("argument") {
                if map.keys().all(|k| k == "argument" || k == "condition") {
                    return Ok(Condition::Binary {
                        op,
                        argument: argument.clone(),
                        condition: sub_condition(map)?,
                    });
                }
            }
        }
        return Ok(Condition::Binary {
            op,
            argument: body.clone(),
            condition: None,
        });
    }

    Err(invalid(format!("unknown condition `{}`", key)))
}

/// Condition grammar first; function grammar when only that one fits.
pub fn parse_guard(value: &Value) -> Result<Guard> {
    match parse_condition(value) {
        Ok(condition) => Ok(Guard::Condition(condition)),
        Err(condition_error) => match parse_expr(value)? {
            expr @ Expr::Call(_) => Ok(Guard::Function(expr)),
            _ => Err(condition_error),
        },
    }
}

fn default_title() -> String {
    DEFAULT_MESSAGE_TITLE.to_string()
}

fn default_modal() -> bool {
    true
}

fn default_method_args() -> Value {
    Value::Object(Map::new())
}

#[derive(Deserialize)]
struct ShowMessageBody {
    message: String,
    #[serde(default = "default_title")]
    title: String,
    #[serde(default = "default_modal")]
    modal: bool,
    #[serde(default)]
    message_type: MessageType,
    #[serde(default)]
    next: Value,
}

#[derive(Deserialize)]
struct ExecMethodBody {
    component: Value,
    method: Value,
    #[serde(default = "default_method_args")]
    method_args: Value,
    #[serde(default)]
    auth_token: Option<Value>,
    #[serde(default)]
    next: Value,
}

pub fn parse_actions(value: &Value) -> Result<Vec<Action>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items.iter().map(parse_action).collect(),
        other => Err(invalid(format!("actions must be a list, got {}", other))),
    }
}

pub fn parse_action(value: &Value) -> Result<Action> {
    let (key, body) = single_entry(value)
        .ok_or_else(|| invalid(format!("action must be a single-key map, got {}", value)))?;
    match key {
        "set_attribute" => parse_set_attribute(body),
        "show_message" => {
            let body: ShowMessageBody = serde_json::from_value(body.clone())
                .map_err(|e| invalid(format!("show_message: {}", e)))?;
            Ok(Action {
                kind: ActionKind::ShowMessage {
                    message: body.message,
                    title: body.title,
                    modal: body.modal,
                    message_type: body.message_type,
                },
                next: parse_actions(&body.next)?,
            })
        }
        "exec_method" => {
            let body: ExecMethodBody = serde_json::from_value(body.clone())
                .map_err(|e| invalid(format!("exec_method: {}", e)))?;
            Ok(Action {
                kind: ActionKind::ExecMethod {
                    component: parse_expr(&body.component)?,
                    method: parse_expr(&body.method)?,
                    method_args: parse_expr(&body.method_args)?,
                    auth_token: body.auth_token.as_ref().map(parse_expr).transpose()?,
                },
                next: parse_actions(&body.next)?,
            })
        }
        other => Err(invalid(format!("unknown action `{}`", other))),
    }
}

fn parse_set_attribute(body: &Value) -> Result<Action> {
    let map = body
        .as_object()
        .ok_or_else(|| invalid("set_attribute expects a map"))?;

    if let (Some(Value::String(attribute)), Some(value)) = (map.get("attribute"), map.get("value")) {
        return Ok(Action {
            kind: ActionKind::SetAttribute {
                attribute: attribute.clone(),
                value: parse_expr(value)?,
            },
            next: parse_actions(map.get("next").unwrap_or(&Value::Null))?,
        });
    }

    match single_entry(body) {
        Some((attribute, value)) => Ok(Action::set_attribute(attribute, parse_expr(value)?)),
        None => Err(invalid(
            "set_attribute takes `attribute`/`value` or exactly one `name: value` pair",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn yaml(source: &str) -> Value {
        serde_yaml::from_str(source).unwrap()
    }

    #[test]
    fn test_shorthand_functions() {
        assert!(matches!(
            parse_expr(&json!("$auth_token")).unwrap(),
            Expr::Call(f) if matches!(*f, Function::AuthToken)
        ));
        assert!(matches!(
            parse_expr(&json!({"event_data": ["a", 0]})).unwrap(),
            Expr::Call(f) if matches!(&*f, Function::EventData(path)
                if path == &vec![PathSegment::from("a"), PathSegment::Index(0)])
        ));
        assert!(matches!(
            parse_expr(&json!({"auth_token": "$"})).unwrap(),
            Expr::Call(f) if matches!(*f, Function::AuthToken)
        ));
    }

    #[test]
    fn test_plain_data_stays_literal() {
        let value = json!({"user": "alice", "tags": ["a", "b"]});
        assert_eq!(parse_expr(&value).unwrap().as_literal(), Some(&value));

        // body of the wrong shape leaves the map as data
        let value = json!({"add": {"left_value": 1}});
        assert_eq!(parse_expr(&value).unwrap().as_literal(), Some(&value));
    }

    #[test]
    fn test_nested_call_inside_map() {
        let expr = parse_expr(&json!({"token": "$auth_token", "count": 1})).unwrap();
        match expr {
            Expr::Map(entries) => {
                assert!(entries["token"].is_call());
                assert_eq!(entries["count"].as_literal(), Some(&json!(1)));
            }
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_binary_function() {
        let expr = parse_expr(&yaml(
            r#"
add:
  left_value:
    get_attribute: count
  right_value: 1
"#,
        ))
        .unwrap();
        let Expr::Call(function) = expr else {
            panic!("expected call");
        };
        assert!(matches!(
            *function,
            Function::Binary { op: BinaryOp::Add, .. }
        ));
    }

    #[test]
    fn test_frame_url_forms() {
        let Expr::Call(f) = parse_expr(&json!({"frame_url": "main"})).unwrap() else {
            panic!("expected call");
        };
        assert!(matches!(&*f, Function::FrameUrl(FrameUrl { extract: UrlExtract::Whole, .. })));

        let Expr::Call(f) = parse_expr(&json!({
            "frame_url": {"frame_id": "main", "parse": {"regexp": "/task/(\\d+)", "group": 0}}
        }))
        .unwrap() else {
            panic!("expected call");
        };
        assert!(matches!(
            &*f,
            Function::FrameUrl(FrameUrl { extract: UrlExtract::Pattern { group: 0, .. }, .. })
        ));

        let Expr::Call(f) = parse_expr(&json!({
            "frame_url": {"frame_id": "main", "query_param": {"param": "id", "index": 1}}
        }))
        .unwrap() else {
            panic!("expected call");
        };
        assert!(matches!(
            &*f,
            Function::FrameUrl(FrameUrl { extract: UrlExtract::QueryParam { index: 1, .. }, .. })
        ));
    }

    #[test]
    fn test_bad_regex_rejected_at_load() {
        let err = parse_expr(&json!({"frame_url": {"frame_id": "main", "parse": "(unclosed"}}))
            .unwrap_err();
        assert!(matches!(err, ControllerError::InvalidDiagram(_)));
    }

    #[test]
    fn test_conditions() {
        assert_eq!(parse_condition(&json!({"eq": "done"})).unwrap(), Condition::eq("done"));
        assert_eq!(
            parse_condition(&json!({"eq": {"value": "done"}})).unwrap(),
            Condition::eq("done")
        );

        let condition = parse_condition(&yaml(
            r#"
len:
  condition:
    gt: 2
"#,
        ))
        .unwrap();
        assert!(matches!(
            condition,
            Condition::Unary { op: UnaryOp::Len, condition: Some(_) }
        ));

        assert!(matches!(
            parse_condition(&json!({"is_null": "$"})).unwrap(),
            Condition::Unary { op: UnaryOp::IsNull, condition: None }
        ));

        assert_eq!(
            parse_condition(&json!({"div": 2})).unwrap(),
            Condition::Binary {
                op: BinaryOp::Div,
                argument: json!(2),
                condition: None
            }
        );

        let condition = parse_condition(&json!({"and": [{"gt": 1}, {"not": {"eq": 5}}]})).unwrap();
        assert!(matches!(condition, Condition::And(children) if children.len() == 2));
    }

    #[test]
    fn test_unknown_condition_rejected() {
        assert!(parse_condition(&json!({"frobnicate": 1})).is_err());
        assert!(parse_condition(&json!({"eq": 1, "ne": 2})).is_err());
    }

    #[test]
    fn test_guard_falls_back_to_function() {
        let guard = parse_guard(&json!({
            "has_attr": {"left_value": "$event_data", "right_value": "status"}
        }))
        .unwrap();
        assert!(matches!(guard, Guard::Function(_)));

        let guard = parse_guard(&json!({"in": ["a", "b"]})).unwrap();
        assert!(matches!(guard, Guard::Condition(Condition::Inclusion { .. })));

        assert!(parse_guard(&json!({"frobnicate": 1})).is_err());
    }

    #[test]
    fn test_set_attribute_forms() {
        let action = parse_action(&yaml(
            r#"
set_attribute:
  attribute: count
  value: 1
  next:
    - show_message:
        message: "count is {count}"
"#,
        ))
        .unwrap();
        assert!(matches!(
            &action.kind,
            ActionKind::SetAttribute { attribute, .. } if attribute == "count"
        ));
        assert_eq!(action.next.len(), 1);

        let action = parse_action(&json!({"set_attribute": {"user": "$auth_token"}})).unwrap();
        match action.kind {
            ActionKind::SetAttribute { attribute, value } => {
                assert_eq!(attribute, "user");
                assert!(value.is_call());
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(parse_action(&json!({"set_attribute": {"a": 1, "b": 2}})).is_err());
    }

    #[test]
    fn test_show_message_defaults() {
        let action = parse_action(&json!({"show_message": {"message": "hi"}})).unwrap();
        match action.kind {
            ActionKind::ShowMessage {
                message,
                title,
                modal,
                message_type,
            } => {
                assert_eq!(message, "hi");
                assert_eq!(title, DEFAULT_MESSAGE_TITLE);
                assert!(modal);
                assert_eq!(message_type, MessageType::Info);
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(parse_action(&json!({"show_message": {"message": "x", "message_type": "fatal"}})).is_err());
    }

    #[test]
    fn test_exec_method() {
        let action = parse_action(&yaml(
            r#"
exec_method:
  component: Storage
  method: save
  method_args:
    user: $auth_token
  auth_token: service-token
"#,
        ))
        .unwrap();
        match action.kind {
            ActionKind::ExecMethod {
                component,
                method_args,
                auth_token,
                ..
            } => {
                assert_eq!(component.as_literal(), Some(&json!("Storage")));
                assert!(method_args.has_calls());
                assert!(auth_token.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
