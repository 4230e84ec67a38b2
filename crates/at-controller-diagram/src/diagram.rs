use std::collections::{HashMap, HashSet};
use std::path::Path;

use at_controller_core::{ControllerError, Result};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::DiagramDocument;
use crate::model::{Event, InitialAttribute, State, Transition};

/// Immutable graph of states, transitions and events.
///
/// Lookups by name are indexed at construction; on duplicate names the
/// first declaration wins.
#[derive(Debug, Clone, Default)]
pub struct Diagram {
    states: Vec<State>,
    transitions: Vec<Transition>,
    events: Vec<Event>,
    initial_attributes: IndexMap<String, InitialAttribute>,
    state_index: HashMap<String, usize>,
    transition_index: HashMap<String, usize>,
    event_index: HashMap<String, usize>,
}

fn index_by_name<'a>(names: impl Iterator<Item = &'a str>) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (position, name) in names.enumerate() {
        index.entry(name.to_string()).or_insert(position);
    }
    index
}

impl Diagram {
    pub fn new(states: Vec<State>, transitions: Vec<Transition>, events: Vec<Event>) -> Self {
        let state_index = index_by_name(states.iter().map(|s| s.name.as_str()));
        let transition_index = index_by_name(transitions.iter().map(|t| t.name.as_str()));
        let event_index = index_by_name(events.iter().map(|e| e.name.as_str()));
        Self {
            states,
            transitions,
            events,
            initial_attributes: IndexMap::new(),
            state_index,
            transition_index,
            event_index,
        }
    }

    pub fn with_initial_attributes(
        mut self,
        initial_attributes: IndexMap<String, InitialAttribute>,
    ) -> Self {
        self.initial_attributes = initial_attributes;
        self
    }

    pub fn with_initial_attribute(
        mut self,
        name: impl Into<String>,
        attribute: impl Into<InitialAttribute>,
    ) -> Self {
        self.initial_attributes.insert(name.into(), attribute.into());
        self
    }

    /// Parses, builds and validates a YAML diagram document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let diagram = DiagramDocument::from_yaml(yaml)?.build()?;
        diagram.validate()?;
        debug!(
            states = diagram.states.len(),
            transitions = diagram.transitions.len(),
            events = diagram.events.len(),
            "Diagram loaded"
        );
        Ok(diagram)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn all_transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn initial_attributes(&self) -> &IndexMap<String, InitialAttribute> {
        &self.initial_attributes
    }

    pub fn get_state(&self, name: &str) -> Option<&State> {
        self.state_index.get(name).map(|&i| &self.states[i])
    }

    pub fn get_transition(&self, name: &str) -> Option<&Transition> {
        self.transition_index.get(name).map(|&i| &self.transitions[i])
    }

    pub fn get_event(&self, name: &str) -> Option<&Event> {
        self.event_index.get(name).map(|&i| &self.events[i])
    }

    /// Transitions leaving `state`, in declaration order.
    pub fn exit_transitions(&self, state: &str) -> Vec<&Transition> {
        self.transitions
            .iter()
            .filter(|t| t.source == state)
            .collect()
    }

    /// Transitions arriving at `state`, in declaration order.
    pub fn enter_transitions(&self, state: &str) -> Vec<&Transition> {
        self.transitions.iter().filter(|t| t.dest == state).collect()
    }

    /// Exit transitions followed by enter transitions of `state`.
    pub fn state_transitions(&self, state: &str) -> Vec<&Transition> {
        let mut transitions = self.exit_transitions(state);
        transitions.extend(self.enter_transitions(state));
        transitions
    }

    /// First state marked initial.
    pub fn initial_state(&self) -> Option<&State> {
        self.states.iter().find(|s| s.initial)
    }

    /// Resolves initial attribute seeds, reading environment references now.
    pub fn resolve_initial_attributes(&self) -> Map<String, Value> {
        self.initial_attributes
            .iter()
            .map(|(name, attribute)| (name.clone(), attribute.resolve()))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let initial: Vec<&str> = self
            .states
            .iter()
            .filter(|s| s.initial)
            .map(|s| s.name.as_str())
            .collect();
        match initial.len() {
            0 => return Err(ControllerError::NoInitialState),
            1 => {}
            _ => {
                return Err(ControllerError::InvalidDiagram(format!(
                    "Exactly one initial state is allowed, found {}",
                    initial.join(", ")
                )));
            }
        }

        check_unique("state", self.states.iter().map(|s| s.name.as_str()))?;
        check_unique("transition", self.transitions.iter().map(|t| t.name.as_str()))?;
        check_unique("event", self.events.iter().map(|e| e.name.as_str()))?;

        for transition in &self.transitions {
            for endpoint in [&transition.source, &transition.dest] {
                if !self.state_index.contains_key(endpoint) {
                    return Err(ControllerError::InvalidDiagram(format!(
                        "Transition '{}' references unknown state '{}'",
                        transition.name, endpoint
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn outline(&self) -> DiagramOutline {
        DiagramOutline {
            initial: self.initial_state().map(|s| s.name.clone()),
            states: self.states.iter().map(|s| s.name.clone()).collect(),
            transitions: self
                .transitions
                .iter()
                .map(|t| OutlineTransition {
                    trigger: t.name.clone(),
                    source: t.source.clone(),
                    dest: t.dest.clone(),
                    kind: t.type_name().to_string(),
                })
                .collect(),
        }
    }
}

fn check_unique<'a>(what: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ControllerError::InvalidDiagram(format!(
                "Duplicate {} name '{}'",
                what, name
            )));
        }
    }
    Ok(())
}

/// Annotation view of a diagram for visualisation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagramOutline {
    pub initial: Option<String>,
    pub states: Vec<String>,
    pub transitions: Vec<OutlineTransition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineTransition {
    pub trigger: String,
    pub source: String,
    pub dest: String,
    #[serde(rename = "type")]
    pub kind: String,
}
