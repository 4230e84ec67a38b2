//! Serde shape of a diagram document.

use std::path::Path;

use at_controller_core::{ControllerError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diagram::Diagram;
use crate::model::{
    DEFAULT_FRAME_ID_PARAM, DEFAULT_REDIRECT_PARAM, Event, EventHandler, Frame, FrameKind,
    InitialAttribute, LinkPosition, Span, State, Transition, TransitionKind,
};
use crate::parse::{parse_actions, parse_guard};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagramDocument {
    #[serde(default)]
    pub states: IndexMap<String, StateSpec>,

    #[serde(default)]
    pub transitions: IndexMap<String, TransitionSpec>,

    #[serde(default)]
    pub events: IndexMap<String, EventSpec>,

    #[serde(default)]
    pub initial_attributes: IndexMap<String, InitialAttribute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSpec {
    #[serde(default)]
    pub label: Option<String>,

    pub frame_rows: FrameRows,

    #[serde(default)]
    pub control_label: Option<String>,

    #[serde(default)]
    pub control_subtitle: Option<String>,

    #[serde(default)]
    pub translation: Option<String>,

    #[serde(default)]
    pub initial: bool,
}

/// A single row map, or a list of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameRows {
    Single(IndexMap<String, FrameSpec>),
    Many(Vec<IndexMap<String, FrameSpec>>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameSpec {
    Src(String),
    Full(FrameBody),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameBody {
    pub src: String,

    #[serde(default)]
    pub redirect: Option<String>,

    #[serde(default = "default_redirect_param")]
    pub redirect_param: String,

    #[serde(default = "default_frame_id_param")]
    pub frame_id_param: String,

    #[serde(default, rename = "type")]
    pub kind: FrameKind,

    #[serde(default)]
    pub span: Span,
}

fn default_redirect_param() -> String {
    DEFAULT_REDIRECT_PARAM.to_string()
}

fn default_frame_id_param() -> String {
    DEFAULT_FRAME_ID_PARAM.to_string()
}

/// Flat shape shared by all transition kinds; the kind is chosen by which fields are set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub source: String,
    pub dest: String,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<LinkPosition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_condition: Option<Value>,

    #[serde(default)]
    pub actions: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventSpec {
    #[serde(default)]
    pub handler_component: Option<String>,

    #[serde(default)]
    pub handler_method: Option<String>,

    #[serde(default)]
    pub raise_on_missing: bool,

    #[serde(default)]
    pub actions: Value,
}

impl DiagramDocument {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Converts the document into a diagram without validating it.
    pub fn build(&self) -> Result<Diagram> {
        let states = self
            .states
            .iter()
            .map(|(name, spec)| spec.to_state(name))
            .collect::<Vec<_>>();

        let transitions = self
            .transitions
            .iter()
            .map(|(name, spec)| {
                spec.to_transition(name).map_err(|e| {
                    ControllerError::InvalidDiagram(format!("transition '{}': {}", name, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let events = self
            .events
            .iter()
            .map(|(name, spec)| {
                spec.to_event(name).map_err(|e| {
                    ControllerError::InvalidDiagram(format!("event '{}': {}", name, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Diagram::new(states, transitions, events)
            .with_initial_attributes(self.initial_attributes.clone()))
    }
}

impl StateSpec {
    fn to_state(&self, name: &str) -> State {
        let rows: Vec<&IndexMap<String, FrameSpec>> = match &self.frame_rows {
            FrameRows::Single(row) => vec![row],
            FrameRows::Many(rows) => rows.iter().collect(),
        };
        State {
            name: name.to_string(),
            label: self.label.clone().unwrap_or_else(|| name.to_string()),
            frame_rows: rows
                .into_iter()
                .map(|row| {
                    row.iter()
                        .map(|(frame_id, spec)| spec.to_frame(frame_id))
                        .collect()
                })
                .collect(),
            control_label: self.control_label.clone(),
            control_subtitle: self.control_subtitle.clone(),
            translation: self.translation.clone(),
            initial: self.initial,
        }
    }
}

impl FrameSpec {
    fn to_frame(&self, frame_id: &str) -> Frame {
        match self {
            FrameSpec::Src(src) => Frame::new(frame_id, src.as_str()),
            FrameSpec::Full(body) => Frame {
                frame_id: frame_id.to_string(),
                src: body.src.clone(),
                redirect: body.redirect.clone(),
                redirect_param: body.redirect_param.clone(),
                frame_id_param: body.frame_id_param.clone(),
                kind: body.kind,
                span: body.span.clone(),
            },
        }
    }
}

impl TransitionSpec {
    fn kind_name(&self) -> &str {
        if let Some(kind) = &self.kind {
            return kind;
        }
        if self.frame_id.is_some() && self.test.is_some() {
            "frame_handler"
        } else if self.label.is_some() {
            "link"
        } else {
            "event"
        }
    }

    fn to_transition(&self, name: &str) -> Result<Transition> {
        let kind = match self.kind_name() {
            "link" => TransitionKind::Link {
                label: self
                    .label
                    .clone()
                    .ok_or_else(|| ControllerError::InvalidDiagram("link requires a label".into()))?,
                position: self.position.unwrap_or_default(),
                icon: self.icon.clone(),
            },
            "frame_handler" => match (&self.frame_id, &self.test) {
                (Some(frame_id), Some(test)) => TransitionKind::FrameHandler {
                    frame_id: frame_id.clone(),
                    test: test.clone(),
                },
                _ => {
                    return Err(ControllerError::InvalidDiagram(
                        "frame handler requires frame_id and test".into(),
                    ));
                }
            },
            "event" => TransitionKind::Event {
                event: self.event.clone().unwrap_or_else(|| name.to_string()),
                trigger_condition: self.trigger_condition.as_ref().map(parse_guard).transpose()?,
            },
            other => {
                return Err(ControllerError::InvalidDiagram(format!(
                    "unknown transition type '{}'",
                    other
                )));
            }
        };

        Ok(Transition {
            name: name.to_string(),
            source: self.source.clone(),
            dest: self.dest.clone(),
            actions: parse_actions(&self.actions)?,
            translation: self.translation.clone(),
            tags: self.tags.clone(),
            kind,
        })
    }
}

impl EventSpec {
    fn to_event(&self, name: &str) -> Result<Event> {
        let handler = match (&self.handler_component, &self.handler_method) {
            (Some(component), Some(method)) => Some(EventHandler {
                component: component.clone(),
                method: method.clone(),
            }),
            (None, None) => None,
            _ => {
                return Err(ControllerError::InvalidDiagram(
                    "handler_component and handler_method must be set together".into(),
                ));
            }
        };
        Ok(Event {
            name: name.to_string(),
            handler,
            raise_on_missing: self.raise_on_missing,
            actions: parse_actions(&self.actions)?,
        })
    }
}
