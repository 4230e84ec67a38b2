use std::sync::LazyLock;

use parking_lot::RwLock;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::value::to_display;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{([^{}]*)\}").expect("placeholder pattern is valid")
});

/// Per-session mutable attribute storage.
///
/// Sibling actions may write concurrently; the last write wins.
#[derive(Debug, Default)]
pub struct AttributeStore {
    values: RwLock<Map<String, Value>>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: Map<String, Value>) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    /// Missing keys read as `null`.
    pub fn get_or_null(&self, key: &str) -> Value {
        self.get(key).unwrap_or(Value::Null)
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.values.write().insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values.write().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    pub fn snapshot(&self) -> Map<String, Value> {
        self.values.read().clone()
    }

    pub fn replace(&self, values: Map<String, Value>) {
        *self.values.write() = values;
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    pub fn format(&self, template: &str) -> String {
        safe_format(template, &self.values.read())
    }
}

/// Interpolates `{name}` placeholders from `values`.
///
/// `{{` and `}}` escape literal braces. Fields may reach into nested values
/// (`{user.name}`, `{scores[0]}`), take a `!r` conversion and a format spec
/// of the form `[[fill]align][width][.precision][type]` with `<`, `>` or `^`
/// alignment. A placeholder whose field cannot be resolved is left in place
/// verbatim, so formatting never fails; a spec outside that grammar is
/// ignored and the plain value is used.
pub fn safe_format(template: &str, values: &Map<String, Value>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let whole = &caps[0];
            match whole {
                "{{" => "{".to_string(),
                "}}" => "}".to_string(),
                _ => {
                    let field = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                    replacement(field, values).unwrap_or_else(|| whole.to_string())
                }
            }
        })
        .into_owned()
}

fn replacement(field: &str, values: &Map<String, Value>) -> Option<String> {
    let (field, spec) = match field.split_once(':') {
        Some((field, spec)) => (field, Some(spec)),
        None => (field, None),
    };
    let (path, conversion) = match field.split_once('!') {
        Some((path, conversion)) => (path, Some(conversion)),
        None => (field, None),
    };
    let value = lookup(path, values)?;
    let text = match (conversion, value) {
        (Some("r") | Some("a"), Value::String(s)) => format!("'{}'", s),
        _ => to_display(value),
    };
    Some(match spec.and_then(FormatSpec::parse) {
        Some(spec) => spec.apply(value, text),
        None => text,
    })
}

fn lookup<'a>(path: &str, values: &'a Map<String, Value>) -> Option<&'a Value> {
    let head_end = path.find(['.', '[']).unwrap_or(path.len());
    let head = &path[..head_end];
    if head.is_empty() {
        return None;
    }
    let mut current = values.get(head)?;
    let mut rest = &path[head_end..];
    while !rest.is_empty() {
        if let Some(after_dot) = rest.strip_prefix('.') {
            let end = after_dot.find(['.', '[']).unwrap_or(after_dot.len());
            current = current.get(&after_dot[..end])?;
            rest = &after_dot[end..];
        } else if let Some(after_bracket) = rest.strip_prefix('[') {
            let end = after_bracket.find(']')?;
            let key = &after_bracket[..end];
            current = match key.parse::<usize>() {
                Ok(index) if current.is_array() => current.get(index)?,
                _ => current.get(key)?,
            };
            rest = &after_bracket[end + 1..];
        } else {
            return None;
        }
    }
    Some(current)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FormatSpec {
    fill: char,
    align: Option<Align>,
    width: usize,
    precision: Option<usize>,
}

impl FormatSpec {
    fn parse(spec: &str) -> Option<Self> {
        let align_of = |c: char| match c {
            '<' => Some(Align::Left),
            '>' => Some(Align::Right),
            '^' => Some(Align::Center),
            _ => None,
        };
        let chars: Vec<char> = spec.chars().collect();
        let (fill, align, mut pos) = match (chars.first(), chars.get(1)) {
            (Some(&fill), Some(&c)) if align_of(c).is_some() => (fill, align_of(c), 2),
            (Some(&c), _) if align_of(c).is_some() => (' ', align_of(c), 1),
            _ => (' ', None, 0),
        };

        let digits = |from: usize| {
            chars[from..]
                .iter()
                .take_while(|c| c.is_ascii_digit())
                .count()
        };
        let width_len = digits(pos);
        let width = chars[pos..pos + width_len]
            .iter()
            .collect::<String>()
            .parse()
            .unwrap_or(0);
        pos += width_len;

        let mut precision = None;
        if chars.get(pos) == Some(&'.') {
            let len = digits(pos + 1);
            if len == 0 {
                return None;
            }
            precision = chars[pos + 1..pos + 1 + len]
                .iter()
                .collect::<String>()
                .parse()
                .ok();
            pos += 1 + len;
        }
        if matches!(chars.get(pos), Some('s' | 'd' | 'f')) {
            pos += 1;
        }
        (pos == chars.len()).then_some(Self {
            fill,
            align,
            width,
            precision,
        })
    }

    fn apply(&self, value: &Value, text: String) -> String {
        let text = match (self.precision, value) {
            (Some(precision), Value::Number(n)) => match n.as_f64() {
                Some(f) => format!("{:.*}", precision, f),
                None => text,
            },
            (Some(precision), _) => text.chars().take(precision).collect(),
            (None, _) => text,
        };
        let len = text.chars().count();
        if len >= self.width {
            return text;
        }
        let pad = self.width - len;
        let default_align = if value.is_number() {
            Align::Right
        } else {
            Align::Left
        };
        let fill = |n: usize| std::iter::repeat_n(self.fill, n).collect::<String>();
        match self.align.unwrap_or(default_align) {
            Align::Left => format!("{}{}", text, fill(pad)),
            Align::Right => format!("{}{}", fill(pad), text),
            Align::Center => format!("{}{}{}", fill(pad / 2), text, fill(pad - pad / 2)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values() -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("user".into(), json!("alice"));
        map.insert("count".into(), json!(3));
        map
    }

    #[test]
    fn test_format_known_keys() {
        assert_eq!(
            safe_format("hello {user}, you have {count} tasks", &values()),
            "hello alice, you have 3 tasks"
        );
    }

    #[test]
    fn test_format_missing_key_kept_literal() {
        assert_eq!(safe_format("value: {foo}", &values()), "value: {foo}");
        assert_eq!(safe_format("{}", &values()), "{}");
    }

    #[test]
    fn test_format_is_idempotent_on_missing_keys() {
        let once = safe_format("{foo}/{user}", &values());
        let twice = safe_format(&once, &values());
        assert_eq!(once, "{foo}/alice");
        assert_eq!(twice, once);
    }

    #[test]
    fn test_format_escapes() {
        assert_eq!(safe_format("{{user}} is {user}", &values()), "{user} is alice");
    }

    #[test]
    fn test_format_spec_pads_and_aligns() {
        assert_eq!(safe_format("[{count:>4}]", &values()), "[   3]");
        assert_eq!(safe_format("[{count:4}]", &values()), "[   3]");
        assert_eq!(safe_format("[{user:<7}]", &values()), "[alice  ]");
        assert_eq!(safe_format("[{user:*^9}]", &values()), "[**alice**]");
        assert_eq!(safe_format("{count:.2f}", &values()), "3.00");
        assert_eq!(safe_format("{user!r}", &values()), "'alice'");
    }

    #[test]
    fn test_format_unknown_spec_uses_plain_value() {
        assert_eq!(safe_format("{count:,}", &values()), "3");
    }

    #[test]
    fn test_format_nested_fields() {
        let mut map = values();
        map.insert("profile".into(), json!({"name": "bob", "scores": [7, 9]}));
        assert_eq!(safe_format("{profile.name}", &map), "bob");
        assert_eq!(safe_format("{profile.scores[1]}", &map), "9");
        assert_eq!(safe_format("{profile[name]}", &map), "bob");
        assert_eq!(safe_format("{profile.age}", &map), "{profile.age}");
        assert_eq!(safe_format("{profile.scores[5]}", &map), "{profile.scores[5]}");
    }

    #[test]
    fn test_store_roundtrip() {
        let store = AttributeStore::new();
        assert!(store.is_empty());
        store.set("a", json!(1));
        assert_eq!(store.get("a"), Some(json!(1)));
        assert_eq!(store.get_or_null("b"), Value::Null);
        assert_eq!(store.format("{a}-{b}"), "1-{b}");
        assert_eq!(store.remove("a"), Some(json!(1)));
        assert!(!store.contains("a"));
    }
}
