//! Page description handed to the renderer.
//!
//! The shape is the renderer's wire contract: every link and handler is a
//! `component_method` call back into the controller's `trigger_transition`,
//! with the submitted frame URLs passed in the `frames` field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const COMPONENT_METHOD: &str = "component_method";
pub const TRIGGER_METHOD: &str = "trigger_transition";
pub const FRAMEDATA_FIELD: &str = "frames";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub grid: Grid,
    pub header: Header,
    pub handlers: Vec<HandlerBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<Footer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<ControlPanel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub rows: Vec<GridRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRow {
    pub props: Props,
    pub cols: Vec<GridCol>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCol {
    pub src: String,
    pub frame_id: String,
    pub props: Props,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Props {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flex: Option<Value>,
    pub style: Style,
}

impl Props {
    pub fn full_height() -> Self {
        Self {
            flex: None,
            style: Style::full_height(),
        }
    }

    pub fn flex(flex: Value) -> Self {
        Self {
            flex: Some(flex),
            style: Style::full_height(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub height: String,
}

impl Style {
    pub fn full_height() -> Self {
        Self {
            height: "100%".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerKwargs {
    pub trigger: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    pub component: String,
    pub method: String,
    pub kwargs: TriggerKwargs,
    pub framedata_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Link {
    pub fn trigger(
        component: &str,
        transition: &str,
        label: impl Into<String>,
        icon: Option<String>,
    ) -> Self {
        Self {
            kind: COMPONENT_METHOD.to_string(),
            label: label.into(),
            component: component.to_string(),
            method: TRIGGER_METHOD.to_string(),
            kwargs: TriggerKwargs {
                trigger: transition.to_string(),
            },
            framedata_field: FRAMEDATA_FIELD.to_string(),
            icon,
        }
    }
}

/// Client-side binding that fires a transition when `test` matches inside the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerBinding {
    #[serde(rename = "type")]
    pub kind: String,
    pub component: String,
    pub method: String,
    pub test: String,
    pub frame_id: String,
    pub kwargs: TriggerKwargs,
    pub framedata_field: String,
}

impl HandlerBinding {
    pub fn trigger(component: &str, transition: &str, frame_id: &str, test: &str) -> Self {
        Self {
            kind: COMPONENT_METHOD.to_string(),
            component: component.to_string(),
            method: TRIGGER_METHOD.to_string(),
            test: test.to_string(),
            frame_id: frame_id.to_string(),
            kwargs: TriggerKwargs {
                trigger: transition.to_string(),
            },
            framedata_field: FRAMEDATA_FIELD.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub label: String,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footer {
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPanel {
    pub label: String,
    pub subtitle: String,
    pub links: Vec<Link>,
}

impl ControlPanel {
    pub fn is_empty(&self) -> bool {
        self.label.is_empty() && self.subtitle.is_empty() && self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_link_wire_shape() {
        let link = Link::trigger("ATController", "go", "Go", None);
        let value = serde_json::to_value(&link).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "component_method",
                "label": "Go",
                "component": "ATController",
                "method": "trigger_transition",
                "kwargs": {"trigger": "go"},
                "framedata_field": "frames"
            })
        );
    }

    #[test]
    fn test_optional_sections_skipped() {
        let page = Page {
            grid: Grid { rows: vec![] },
            header: Header {
                label: "Start".into(),
                links: vec![],
            },
            handlers: vec![],
            footer: None,
            control: None,
        };
        let value = serde_json::to_value(&page).unwrap();
        assert!(value.get("footer").is_none());
        assert!(value.get("control").is_none());
        assert_eq!(value["header"]["label"], "Start");
    }
}
