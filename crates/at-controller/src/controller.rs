use std::collections::HashMap;
use std::sync::Arc;

use at_controller_core::{
    ComponentRegistry, DefaultSessionResolver, FrameData, Page, Renderer, Result, SessionResolver,
};
use at_controller_diagram::Diagram;
use at_controller_engine::{
    EngineConfig, EventOutcome, MachineSnapshot, StateMachine, TransitionOutcome,
};
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Reply text for calls addressed to a session that was never started.
pub const NO_PROCESS_MESSAGE: &str = "No tutoring process found for this auth token";

/// Result of a call addressed to an existing session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome<T> {
    Done(T),
    NoProcess,
}

impl<T> SessionOutcome<T> {
    pub fn is_no_process(&self) -> bool {
        matches!(self, SessionOutcome::NoProcess)
    }

    /// Reply text for a caller whose session was never started.
    pub fn no_process_message(&self) -> Option<&'static str> {
        match self {
            SessionOutcome::Done(_) => None,
            SessionOutcome::NoProcess => Some(NO_PROCESS_MESSAGE),
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            SessionOutcome::Done(value) => Some(value),
            SessionOutcome::NoProcess => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SessionOutcome<U> {
        match self {
            SessionOutcome::Done(value) => SessionOutcome::Done(f(value)),
            SessionOutcome::NoProcess => SessionOutcome::NoProcess,
        }
    }
}

type Session = Arc<Mutex<StateMachine>>;

/// Runs one state machine per session against a shared diagram.
///
/// Calls on the same session are serialised; different sessions proceed
/// independently.
pub struct Controller {
    diagram: Arc<Diagram>,
    config: Arc<EngineConfig>,
    renderer: Arc<dyn Renderer>,
    components: Arc<dyn ComponentRegistry>,
    resolver: Arc<dyn SessionResolver>,
    sessions: RwLock<HashMap<String, Session>>,
}

impl Controller {
    pub fn new(
        diagram: Arc<Diagram>,
        renderer: Arc<dyn Renderer>,
        components: Arc<dyn ComponentRegistry>,
    ) -> Self {
        Self {
            diagram,
            config: Arc::new(EngineConfig::default()),
            renderer,
            components,
            resolver: Arc::new(DefaultSessionResolver),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn SessionResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn session_keys(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    async fn lookup(&self, auth_token: Option<&str>) -> Result<Option<Session>> {
        let key = self.resolver.resolve(auth_token).await?;
        Ok(self.sessions.read().get(&key).cloned())
    }

    /// Starts (or restarts) the session for `auth_token` and renders its
    /// first page. Returns the initial state name.
    pub async fn start_process(
        &self,
        auth_token: Option<&str>,
        initial_event_data: Value,
    ) -> Result<String> {
        let key = self.resolver.resolve(auth_token).await?;
        let token = match auth_token {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => key.clone(),
        };
        let machine = StateMachine::new(
            self.diagram.clone(),
            token,
            self.renderer.clone(),
            self.components.clone(),
        )?
        .with_session(key.clone())
        .with_config(self.config.clone());

        let page = machine.start(initial_event_data)?;
        let state = machine.current();
        let replaced = self
            .sessions
            .write()
            .insert(key.clone(), Arc::new(Mutex::new(machine)))
            .is_some();
        info!(session = %key, state = %state, replaced, "Tutoring process started");

        self.renderer.render_page(&key, &page).await?;
        Ok(state)
    }

    /// Fires `trigger` for the session and renders the new page when the
    /// state changed. Returns the state the session is in afterwards.
    pub async fn trigger_transition(
        &self,
        trigger: &str,
        frames: &FrameData,
        auth_token: Option<&str>,
    ) -> Result<SessionOutcome<String>> {
        let Some(session) = self.lookup(auth_token).await? else {
            debug!(trigger, "Transition for unknown session");
            return Ok(SessionOutcome::NoProcess);
        };
        let machine = session.lock().await;
        let outcome = machine.trigger_transition(trigger, frames, None).await?;
        self.render_outcome(&machine, &outcome).await?;
        Ok(SessionOutcome::Done(outcome.state().to_string()))
    }

    pub async fn handle_event(
        &self,
        event: &str,
        data: Value,
        frames: &FrameData,
        auth_token: Option<&str>,
    ) -> Result<SessionOutcome<EventOutcome>> {
        let Some(session) = self.lookup(auth_token).await? else {
            debug!(event, "Event for unknown session");
            return Ok(SessionOutcome::NoProcess);
        };
        let machine = session.lock().await;
        let outcome = machine.handle_event(event, data, frames).await?;
        if let EventOutcome::Transitioned { outcome: moved, .. } = &outcome {
            self.render_outcome(&machine, moved).await?;
        }
        Ok(SessionOutcome::Done(outcome))
    }

    async fn render_outcome(&self, machine: &StateMachine, outcome: &TransitionOutcome) -> Result<()> {
        if let Some(page) = outcome.page() {
            self.renderer.render_page(machine.session(), page).await?;
        }
        Ok(())
    }

    pub async fn current_state(&self, auth_token: Option<&str>) -> Result<SessionOutcome<String>> {
        match self.lookup(auth_token).await? {
            Some(session) => Ok(SessionOutcome::Done(session.lock().await.current())),
            None => Ok(SessionOutcome::NoProcess),
        }
    }

    pub async fn current_page(&self, auth_token: Option<&str>) -> Result<SessionOutcome<Page>> {
        match self.lookup(auth_token).await? {
            Some(session) => Ok(SessionOutcome::Done(session.lock().await.page()?)),
            None => Ok(SessionOutcome::NoProcess),
        }
    }

    pub async fn snapshot(&self, auth_token: Option<&str>) -> Result<SessionOutcome<MachineSnapshot>> {
        match self.lookup(auth_token).await? {
            Some(session) => Ok(SessionOutcome::Done(session.lock().await.snapshot())),
            None => Ok(SessionOutcome::NoProcess),
        }
    }

    /// Drops the session; returns whether one existed.
    pub async fn end_session(&self, auth_token: Option<&str>) -> Result<bool> {
        let key = self.resolver.resolve(auth_token).await?;
        let removed = self.sessions.write().remove(&key).is_some();
        if removed {
            info!(session = %key, "Tutoring process ended");
        }
        Ok(removed)
    }
}
