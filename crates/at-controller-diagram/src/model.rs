//! States, frames, transitions and events of a diagram.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::Action;
use crate::condition::Guard;

pub const DEFAULT_REDIRECT_PARAM: &str = "to";
pub const DEFAULT_FRAME_ID_PARAM: &str = "frame_id";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    /// `src` and `redirect` are used verbatim.
    #[default]
    Basic,
    /// `src` and `redirect` are interpolated from machine attributes.
    FormatAttributes,
    /// `src` is interpolated and opened through the document viewer.
    Docs,
}

/// Layout weight of a frame column, an integer or a keyword such as `auto`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Span {
    Weight(i64),
    Keyword(String),
}

impl Default for Span {
    fn default() -> Self {
        Span::Keyword("auto".to_string())
    }
}

impl Span {
    pub fn to_value(&self) -> Value {
        match self {
            Span::Weight(weight) => Value::from(*weight),
            Span::Keyword(keyword) => Value::from(keyword.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub frame_id: String,
    pub src: String,
    pub redirect: Option<String>,
    pub redirect_param: String,
    pub frame_id_param: String,
    pub kind: FrameKind,
    pub span: Span,
}

impl Frame {
    pub fn new(frame_id: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            frame_id: frame_id.into(),
            src: src.into(),
            redirect: None,
            redirect_param: DEFAULT_REDIRECT_PARAM.to_string(),
            frame_id_param: DEFAULT_FRAME_ID_PARAM.to_string(),
            kind: FrameKind::Basic,
            span: Span::default(),
        }
    }

    pub fn with_kind(mut self, kind: FrameKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_redirect(mut self, redirect: impl Into<String>) -> Self {
        self.redirect = Some(redirect.into());
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub name: String,
    pub label: String,
    pub frame_rows: Vec<Vec<Frame>>,
    pub control_label: Option<String>,
    pub control_subtitle: Option<String>,
    pub translation: Option<String>,
    pub initial: bool,
}

impl State {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            frame_rows: Vec::new(),
            control_label: None,
            control_subtitle: None,
            translation: None,
            initial: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_row(mut self, row: Vec<Frame>) -> Self {
        self.frame_rows.push(row);
        self
    }

    pub fn initial(mut self) -> Self {
        self.initial = true;
        self
    }

    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frame_rows.iter().flatten()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkPosition {
    #[default]
    Header,
    Footer,
    Control,
}

#[derive(Debug, Clone)]
pub enum TransitionKind {
    Link {
        label: String,
        position: LinkPosition,
        icon: Option<String>,
    },
    FrameHandler {
        frame_id: String,
        /// Client-side expression passed through to the renderer untouched.
        test: String,
    },
    Event {
        event: String,
        trigger_condition: Option<Guard>,
    },
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub name: String,
    pub source: String,
    pub dest: String,
    pub actions: Vec<Action>,
    pub translation: Option<String>,
    pub tags: Vec<String>,
    pub kind: TransitionKind,
}

impl Transition {
    pub fn link(
        name: impl Into<String>,
        source: impl Into<String>,
        dest: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self::with_kind(
            name,
            source,
            dest,
            TransitionKind::Link {
                label: label.into(),
                position: LinkPosition::Header,
                icon: None,
            },
        )
    }

    pub fn frame_handler(
        name: impl Into<String>,
        source: impl Into<String>,
        dest: impl Into<String>,
        frame_id: impl Into<String>,
        test: impl Into<String>,
    ) -> Self {
        Self::with_kind(
            name,
            source,
            dest,
            TransitionKind::FrameHandler {
                frame_id: frame_id.into(),
                test: test.into(),
            },
        )
    }

    /// Event transition listening to the event named like the transition.
    pub fn event(
        name: impl Into<String>,
        source: impl Into<String>,
        dest: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let event = name.clone();
        Self::with_kind(
            name,
            source,
            dest,
            TransitionKind::Event {
                event,
                trigger_condition: None,
            },
        )
    }

    pub fn with_kind(
        name: impl Into<String>,
        source: impl Into<String>,
        dest: impl Into<String>,
        kind: TransitionKind,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            dest: dest.into(),
            actions: Vec::new(),
            translation: None,
            tags: Vec::new(),
            kind,
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn on_event(mut self, event: impl Into<String>) -> Self {
        if let TransitionKind::Event { event: name, .. } = &mut self.kind {
            *name = event.into();
        }
        self
    }

    pub fn with_guard(mut self, guard: impl Into<Guard>) -> Self {
        if let TransitionKind::Event {
            trigger_condition, ..
        } = &mut self.kind
        {
            *trigger_condition = Some(guard.into());
        }
        self
    }

    pub fn at_position(mut self, position: LinkPosition) -> Self {
        if let TransitionKind::Link { position: p, .. } = &mut self.kind {
            *p = position;
        }
        self
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            TransitionKind::Link { .. } => "link",
            TransitionKind::FrameHandler { .. } => "frame_handler",
            TransitionKind::Event { .. } => "event",
        }
    }

    /// Event this transition listens to, if it is an event transition.
    pub fn listens_to(&self) -> Option<&str> {
        match &self.kind {
            TransitionKind::Event { event, .. } => Some(event),
            _ => None,
        }
    }

    pub fn trigger_condition(&self) -> Option<&Guard> {
        match &self.kind {
            TransitionKind::Event {
                trigger_condition, ..
            } => trigger_condition.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventHandler {
    pub component: String,
    pub method: String,
}

#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    /// Transforms incoming data before trigger conditions see it.
    pub handler: Option<EventHandler>,
    pub raise_on_missing: bool,
    /// Run on every occurrence, before any trigger condition is checked.
    pub actions: Vec<Action>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handler: None,
            raise_on_missing: false,
            actions: Vec::new(),
        }
    }

    pub fn with_handler(mut self, component: impl Into<String>, method: impl Into<String>) -> Self {
        self.handler = Some(EventHandler {
            component: component.into(),
            method: method.into(),
        });
        self
    }

    pub fn raise_on_missing(mut self, raise: bool) -> Self {
        self.raise_on_missing = raise;
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }
}

/// Seed for a machine attribute: a literal, or an environment variable with a fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InitialAttribute {
    Env {
        env: String,
        #[serde(default)]
        default: Value,
    },
    Literal(Value),
}

impl InitialAttribute {
    pub fn resolve(&self) -> Value {
        match self {
            InitialAttribute::Env { env, default } => std::env::var(env)
                .map(Value::String)
                .unwrap_or_else(|_| default.clone()),
            InitialAttribute::Literal(value) => value.clone(),
        }
    }
}

impl From<Value> for InitialAttribute {
    fn from(value: Value) -> Self {
        InitialAttribute::Literal(value)
    }
}
