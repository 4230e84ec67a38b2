use std::sync::Arc;

use at_controller_core::{
    AttributeStore, ComponentRegistry, ControllerError, FrameData, Page, Renderer, Result,
};
use at_controller_diagram::{Action, Diagram, Event, State};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, error, warn};

use crate::actions::ActionContext;
use crate::conditions::guard_allows;
use crate::config::EngineConfig;
use crate::evaluator::Scope;
use crate::page::derive_page;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub transition: String,
    pub from: String,
    pub to: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    pub current_state: String,
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub initial_event_data: Value,
    #[serde(default)]
    pub history: Vec<TransitionRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    Moved { from: String, to: String, page: Page },
    /// The transition does not leave the current state; nothing ran.
    Rejected { state: String },
}

impl TransitionOutcome {
    /// State the machine is in after the call.
    pub fn state(&self) -> &str {
        match self {
            TransitionOutcome::Moved { to, .. } => to,
            TransitionOutcome::Rejected { state } => state,
        }
    }

    pub fn page(&self) -> Option<&Page> {
        match self {
            TransitionOutcome::Moved { page, .. } => Some(page),
            TransitionOutcome::Rejected { .. } => None,
        }
    }

    pub fn moved(&self) -> bool {
        matches!(self, TransitionOutcome::Moved { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Transitioned {
        transition: String,
        outcome: TransitionOutcome,
    },
    /// No event transition fired; carries the data after the event handler.
    Unmatched { data: Value },
}

/// One tutoring session bound to a diagram.
pub struct StateMachine {
    diagram: Arc<Diagram>,
    config: Arc<EngineConfig>,
    session: String,
    auth_token: String,
    attributes: AttributeStore,
    current: RwLock<String>,
    initial_event_data: RwLock<Value>,
    history: RwLock<Vec<TransitionRecord>>,
    renderer: Arc<dyn Renderer>,
    components: Arc<dyn ComponentRegistry>,
}

impl StateMachine {
    pub fn new(
        diagram: Arc<Diagram>,
        auth_token: impl Into<String>,
        renderer: Arc<dyn Renderer>,
        components: Arc<dyn ComponentRegistry>,
    ) -> Result<Self> {
        let initial = Self::initial_state(&diagram)?;
        let auth_token = auth_token.into();
        let attributes = AttributeStore::with_values(diagram.resolve_initial_attributes());
        Ok(Self {
            session: auth_token.clone(),
            auth_token,
            attributes,
            current: RwLock::new(initial),
            initial_event_data: RwLock::new(Value::Null),
            history: RwLock::new(Vec::new()),
            config: Arc::new(EngineConfig::default()),
            diagram,
            renderer,
            components,
        })
    }

    /// Key the renderer addresses this session by; defaults to the auth token.
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = session.into();
        self
    }

    pub fn with_config(mut self, config: Arc<EngineConfig>) -> Self {
        self.config = config;
        self
    }

    fn initial_state(diagram: &Diagram) -> Result<String> {
        diagram
            .initial_state()
            .map(|s| s.name.clone())
            .ok_or(ControllerError::NoInitialState)
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    pub fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }

    pub fn current(&self) -> String {
        self.current.read().clone()
    }

    pub fn initial_event_data(&self) -> Value {
        self.initial_event_data.read().clone()
    }

    pub fn history(&self) -> Vec<TransitionRecord> {
        self.history.read().clone()
    }

    fn state(&self, name: &str) -> Result<&State> {
        self.diagram
            .get_state(name)
            .ok_or_else(|| ControllerError::UnknownState(name.to_string()))
    }

    /// Page for the current state.
    pub fn page(&self) -> Result<Page> {
        let current = self.current();
        let state = self.state(&current)?;
        Ok(derive_page(state, &self.diagram, &self.attributes, &self.config))
    }

    /// Puts the machine in the initial state with freshly seeded attributes.
    pub fn start(&self, initial_event_data: Value) -> Result<Page> {
        self.reset()?;
        *self.initial_event_data.write() = initial_event_data;
        debug!(session = %self.session, state = %self.current(), "Process started");
        self.page()
    }

    pub async fn trigger_transition(
        &self,
        name: &str,
        frames: &FrameData,
        event_data: Option<&Value>,
    ) -> Result<TransitionOutcome> {
        let transition = self
            .diagram
            .get_transition(name)
            .ok_or_else(|| ControllerError::UnknownTransition(name.to_string()))?;

        let from = self.current();
        let reachable = self
            .diagram
            .exit_transitions(&from)
            .iter()
            .any(|t| t.name == name);
        if !reachable {
            debug!(session = %self.session, transition = name, state = %from, "Transition not available here");
            return Ok(TransitionOutcome::Rejected { state: from });
        }
        let dest = self.state(&transition.dest)?;

        let event_data = event_data.cloned().unwrap_or(Value::Null);
        self.run_actions(&transition.actions, frames, &event_data)
            .await?;

        let to = dest.name.clone();
        *self.current.write() = to.clone();
        self.history.write().push(TransitionRecord {
            transition: name.to_string(),
            from: from.clone(),
            to: to.clone(),
            timestamp: Utc::now(),
        });
        debug!(session = %self.session, transition = name, from = %from, to = %to, "Transitioned");

        let page = derive_page(dest, &self.diagram, &self.attributes, &self.config);
        Ok(TransitionOutcome::Moved { from, to, page })
    }

    /// Runs the named event and fires the first matching event transition
    /// leaving the current state.
    pub async fn handle_event(
        &self,
        name: &str,
        data: Value,
        frames: &FrameData,
    ) -> Result<EventOutcome> {
        let checking_data = match self.diagram.get_event(name) {
            Some(event) => self.dispatch_event(event, data, frames).await?,
            None => {
                debug!(session = %self.session, event = name, "Event has no definition");
                data
            }
        };

        let current = self.current();
        let initial_event_data = self.initial_event_data();
        let mut selected = None;
        {
            let scope = self.scope(frames, &checking_data, &initial_event_data);
            for transition in self.diagram.exit_transitions(&current) {
                if transition.listens_to() != Some(name) {
                    continue;
                }
                let allowed = match transition.trigger_condition() {
                    Some(guard) => guard_allows(guard, &checking_data, &scope)?,
                    None => true,
                };
                if allowed {
                    selected = Some(transition.name.clone());
                    break;
                }
            }
        }

        match selected {
            Some(transition) => {
                let outcome = self
                    .trigger_transition(&transition, frames, Some(&checking_data))
                    .await?;
                Ok(EventOutcome::Transitioned {
                    transition,
                    outcome,
                })
            }
            None => Ok(EventOutcome::Unmatched {
                data: checking_data,
            }),
        }
    }

    async fn dispatch_event(&self, event: &Event, data: Value, frames: &FrameData) -> Result<Value> {
        let mut checking_data = data;
        if let Some(handler) = &event.handler {
            if self.components.is_registered(&handler.component).await? {
                let args = json!({"event": event.name, "data": checking_data});
                match self
                    .components
                    .call_method(&handler.component, &handler.method, args, &self.auth_token)
                    .await
                {
                    Ok(result) => checking_data = result,
                    Err(e) => error!(
                        event = %event.name,
                        component = %handler.component,
                        method = %handler.method,
                        error = %e,
                        "Event handler failed"
                    ),
                }
            } else {
                let message = format!(
                    "For event {} handler component {} is not registered",
                    event.name, handler.component
                );
                if event.raise_on_missing {
                    return Err(ControllerError::Reference(message));
                }
                warn!("{}", message);
            }
        }

        self.run_actions(&event.actions, frames, &checking_data)
            .await?;
        Ok(checking_data)
    }

    async fn run_actions(&self, actions: &[Action], frames: &FrameData, event_data: &Value) -> Result<()> {
        if actions.is_empty() {
            return Ok(());
        }
        let initial_event_data = self.initial_event_data();
        let context = ActionContext {
            scope: self.scope(frames, event_data, &initial_event_data),
            session: &self.session,
            renderer: self.renderer.as_ref(),
            components: self.components.as_ref(),
        };
        context.perform_all(actions).await?;
        Ok(())
    }

    fn scope<'a>(&'a self, frames: &'a FrameData, event_data: &'a Value, initial_event_data: &'a Value) -> Scope<'a> {
        Scope {
            attributes: &self.attributes,
            auth_token: &self.auth_token,
            frames,
            event_data,
            initial_event_data,
        }
    }

    /// Back to the initial state with re-seeded attributes and no history.
    pub fn reset(&self) -> Result<()> {
        let initial = Self::initial_state(&self.diagram)?;
        self.attributes
            .replace(self.diagram.resolve_initial_attributes());
        *self.current.write() = initial;
        *self.initial_event_data.write() = Value::Null;
        self.history.write().clear();
        Ok(())
    }

    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            current_state: self.current(),
            attributes: self.attributes.snapshot(),
            initial_event_data: self.initial_event_data(),
            history: self.history(),
        }
    }

    pub fn restore(&self, snapshot: MachineSnapshot) -> Result<()> {
        self.state(&snapshot.current_state)?;
        *self.current.write() = snapshot.current_state;
        self.attributes.replace(snapshot.attributes);
        *self.initial_event_data.write() = snapshot.initial_event_data;
        *self.history.write() = snapshot.history;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use at_controller_core::mock::{MockComponentRegistry, MockRenderer};

    const DIAGRAM: &str = r#"
initial_attributes:
  count: 0
states:
  A:
    label: Start
    initial: true
    frame_rows:
      main:
        src: /task/{count}
        type: format_attributes
  B:
    frame_rows:
      main: /b
transitions:
  next:
    source: A
    dest: B
    label: Next
    actions:
      - set_attribute:
          count:
            add:
              left_value:
                get_attribute: count
              right_value: 1
  back:
    source: B
    dest: A
    label: Back
  update:
    source: A
    dest: B
    trigger_condition:
      eq:
        value: done
  update_bulk:
    source: A
    dest: B
    event: update
    trigger_condition:
      in: [500, 1000]
events:
  update:
    handler_component: Checker
    handler_method: check
    actions:
      - set_attribute:
          last: $event_data
"#;

    struct Fixture {
        renderer: Arc<MockRenderer>,
        components: Arc<MockComponentRegistry>,
        machine: StateMachine,
    }

    fn fixture() -> Fixture {
        let diagram = Arc::new(Diagram::from_yaml(DIAGRAM).unwrap());
        let renderer = Arc::new(MockRenderer::new());
        let components = Arc::new(MockComponentRegistry::new());
        let machine =
            StateMachine::new(diagram, "token-1", renderer.clone(), components.clone()).unwrap();
        Fixture {
            renderer,
            components,
            machine,
        }
    }

    #[test]
    fn test_new_requires_initial_state() {
        let diagram = Arc::new(Diagram::new(vec![State::new("A")], vec![], vec![]));
        let result = StateMachine::new(
            diagram,
            "t",
            Arc::new(MockRenderer::new()),
            Arc::new(MockComponentRegistry::new()),
        );
        assert!(matches!(result, Err(ControllerError::NoInitialState)));
    }

    #[test]
    fn test_start_renders_initial_page() {
        let f = fixture();
        let page = f.machine.start(json!({"course": "math"})).unwrap();
        assert_eq!(f.machine.current(), "A");
        assert_eq!(page.header.label, "Start");
        assert_eq!(page.grid.rows[0].cols[0].src, "/task/0");
        assert_eq!(f.machine.initial_event_data(), json!({"course": "math"}));
    }

    #[tokio::test]
    async fn test_trigger_transition_runs_actions() {
        let f = fixture();
        f.machine.start(Value::Null).unwrap();

        let outcome = f
            .machine
            .trigger_transition("next", &FrameData::new(), None)
            .await
            .unwrap();
        assert!(outcome.moved());
        assert_eq!(outcome.state(), "B");
        assert_eq!(f.machine.attributes().get("count"), Some(json!(1)));
        assert_eq!(outcome.page().unwrap().header.label, "B");

        let history = f.machine.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].transition, "next");
        assert_eq!((history[0].from.as_str(), history[0].to.as_str()), ("A", "B"));
    }

    #[tokio::test]
    async fn test_unreachable_transition_is_rejected() {
        let f = fixture();
        f.machine.start(Value::Null).unwrap();
        let outcome = f
            .machine
            .trigger_transition("back", &FrameData::new(), None)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            TransitionOutcome::Rejected {
                state: "A".to_string()
            }
        );
        assert!(f.machine.history().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_transition_is_an_error() {
        let f = fixture();
        let err = f
            .machine
            .trigger_transition("fly", &FrameData::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::UnknownTransition(ref n) if n == "fly"));
    }

    #[tokio::test]
    async fn test_event_uses_handler_result() {
        let f = fixture();
        f.components
            .on_method("Checker", "check", |args| Ok(args["data"]["status"].clone()));
        f.machine.start(Value::Null).unwrap();

        let outcome = f
            .machine
            .handle_event("update", json!({"status": "pending"}), &FrameData::new())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            EventOutcome::Unmatched {
                data: json!("pending")
            }
        );
        assert_eq!(f.machine.current(), "A");
        assert_eq!(f.machine.attributes().get("last"), Some(json!("pending")));

        let outcome = f
            .machine
            .handle_event("update", json!({"status": "done"}), &FrameData::new())
            .await
            .unwrap();
        match outcome {
            EventOutcome::Transitioned {
                transition,
                outcome,
            } => {
                assert_eq!(transition, "update");
                assert_eq!(outcome.state(), "B");
            }
            other => panic!("expected a transition, got {:?}", other),
        }
        let calls = f.components.calls();
        assert_eq!(calls[0].args, json!({"event": "update", "data": {"status": "pending"}}));
        assert_eq!(calls[0].auth_token, "token-1");
    }

    #[tokio::test]
    async fn test_event_first_matching_transition_wins() {
        let f = fixture();
        f.components.on_method("Checker", "check", |args| Ok(args["data"].clone()));
        f.machine.start(Value::Null).unwrap();

        let outcome = f
            .machine
            .handle_event("update", json!(500), &FrameData::new())
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            EventOutcome::Transitioned { ref transition, .. } if transition == "update_bulk"
        ));
    }

    #[tokio::test]
    async fn test_missing_handler_component_is_soft_by_default() {
        let f = fixture();
        f.machine.start(Value::Null).unwrap();
        let outcome = f
            .machine
            .handle_event("update", json!("done"), &FrameData::new())
            .await
            .unwrap();
        assert_eq!(outcome_state(&outcome), Some("B"));
        assert_eq!(f.components.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_handler_component_can_raise() {
        let diagram = Diagram::new(
            vec![State::new("A").initial()],
            vec![],
            vec![Event::new("ping").with_handler("Ghost", "pong").raise_on_missing(true)],
        );
        let machine = StateMachine::new(
            Arc::new(diagram),
            "t",
            Arc::new(MockRenderer::new()),
            Arc::new(MockComponentRegistry::new()),
        )
        .unwrap();
        let err = machine
            .handle_event("ping", Value::Null, &FrameData::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::Reference(_)));
    }

    #[tokio::test]
    async fn test_failing_handler_keeps_original_data() {
        let f = fixture();
        f.components.on_method("Checker", "check", |_| {
            Err(ControllerError::external("Checker", "check", "boom"))
        });
        f.machine.start(Value::Null).unwrap();
        let outcome = f
            .machine
            .handle_event("update", json!("done"), &FrameData::new())
            .await
            .unwrap();
        assert_eq!(outcome_state(&outcome), Some("B"));
        assert_eq!(f.renderer.render_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_event_without_transition() {
        let f = fixture();
        f.machine.start(Value::Null).unwrap();
        let outcome = f
            .machine
            .handle_event("nothing", json!({"x": 1}), &FrameData::new())
            .await
            .unwrap();
        assert_eq!(outcome, EventOutcome::Unmatched { data: json!({"x": 1}) });
    }

    #[tokio::test]
    async fn test_snapshot_restore_and_reset() {
        let f = fixture();
        f.machine.start(json!({"k": 1})).unwrap();
        f.machine
            .trigger_transition("next", &FrameData::new(), None)
            .await
            .unwrap();

        let snapshot = f.machine.snapshot();
        assert_eq!(snapshot.current_state, "B");
        let encoded = serde_json::to_string(&snapshot).unwrap();

        f.machine.reset().unwrap();
        assert_eq!(f.machine.current(), "A");
        assert_eq!(f.machine.attributes().get("count"), Some(json!(0)));
        assert!(f.machine.history().is_empty());

        f.machine
            .restore(serde_json::from_str(&encoded).unwrap())
            .unwrap();
        assert_eq!(f.machine.current(), "B");
        assert_eq!(f.machine.attributes().get("count"), Some(json!(1)));
        assert_eq!(f.machine.history().len(), 1);

        let mut bad = f.machine.snapshot();
        bad.current_state = "Z".into();
        assert!(matches!(f.machine.restore(bad), Err(ControllerError::UnknownState(_))));
        assert_eq!(f.machine.current(), "B");
    }

    fn outcome_state(outcome: &EventOutcome) -> Option<&str> {
        match outcome {
            EventOutcome::Transitioned { outcome, .. } => Some(outcome.state()),
            EventOutcome::Unmatched { .. } => None,
        }
    }
}
