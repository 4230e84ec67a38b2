//! `atc`: checks and dry-runs tutoring diagrams without a message bus.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use async_trait::async_trait;
use at_controller::engine::derive_page;
use at_controller::error::{ControllerError, Result};
use at_controller::page::{Message, Page};
use at_controller::traits::{ComponentRegistry, Renderer};
use at_controller::{AttributeStore, Controller, Diagram, EngineConfig, FrameData, SessionOutcome};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "atc")]
#[command(about = "Validate, outline and dry-run AT controller diagrams")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Verbose output (-v for debug, -vv for trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Engine settings file (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a diagram
    Validate { diagram: PathBuf },

    /// Print states and transitions of a diagram
    Outline {
        diagram: PathBuf,

        #[arg(long, value_enum, default_value = "json")]
        format: Format,
    },

    /// Print the page a state renders with the diagram's initial attributes
    Render {
        diagram: PathBuf,

        /// State to render; defaults to the initial state
        #[arg(long)]
        state: Option<String>,
    },

    /// Start a session and fire transitions in order, printing each page
    Run {
        diagram: PathBuf,

        /// Transition to fire; repeat for a sequence
        #[arg(short, long = "trigger")]
        triggers: Vec<String>,

        /// Frame URL submitted with every trigger, as FRAME_ID=URL
        #[arg(long = "frame", value_parser = parse_frame)]
        frames: Vec<(String, String)>,

        /// Auth token the session is started with
        #[arg(long)]
        token: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

fn parse_frame(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(id, url)| (id.to_string(), url.to_string()))
        .ok_or_else(|| format!("expected FRAME_ID=URL, got `{}`", raw))
}

/// Prints every page and message to stdout.
struct StdoutRenderer;

#[async_trait]
impl Renderer for StdoutRenderer {
    async fn render_page(&self, session: &str, page: &Page) -> Result<Value> {
        println!("[{}] page", session);
        println!("{}", serde_json::to_string_pretty(page)?);
        Ok(json!({"rendered": true}))
    }

    async fn show_message(&self, session: &str, message: &Message) -> Result<Value> {
        println!(
            "[{}] {} ({}): {}",
            session,
            message.title,
            message.message_type.as_str(),
            message.message
        );
        Ok(json!({"shown": true}))
    }
}

/// No external components are reachable from a dry run.
struct OfflineRegistry;

#[async_trait]
impl ComponentRegistry for OfflineRegistry {
    async fn is_registered(&self, component: &str) -> Result<bool> {
        debug!(component, "Component lookup in dry run");
        Ok(false)
    }

    async fn call_method(
        &self,
        component: &str,
        _method: &str,
        _args: Value,
        _auth_token: &str,
    ) -> Result<Value> {
        Err(ControllerError::ComponentNotRegistered(component.to_string()))
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("at_controller={0},at_controller_engine={0},at_controller_diagram={0}", default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_diagram(path: &PathBuf) -> anyhow::Result<Diagram> {
    Diagram::from_file(path).with_context(|| format!("failed to load diagram {}", path.display()))
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load engine config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Validate { diagram } => {
            let loaded = load_diagram(&diagram)?;
            let initial = loaded
                .initial_state()
                .map(|s| s.name.as_str())
                .unwrap_or_default();
            println!(
                "{}: ok ({} states, {} transitions, {} events, initial state `{}`)",
                diagram.display(),
                loaded.states().len(),
                loaded.all_transitions().len(),
                loaded.events().len(),
                initial
            );
        }
        Commands::Outline { diagram, format } => {
            let outline = load_diagram(&diagram)?.outline();
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&outline)?),
                Format::Yaml => print!("{}", serde_yaml::to_string(&outline)?),
            }
        }
        Commands::Render { diagram, state } => {
            let loaded = load_diagram(&diagram)?;
            let target = match state {
                Some(name) => loaded
                    .get_state(&name)
                    .with_context(|| format!("unknown state `{}`", name))?,
                None => loaded
                    .initial_state()
                    .context("diagram has no initial state")?,
            };
            let attributes = AttributeStore::with_values(loaded.resolve_initial_attributes());
            let page = derive_page(target, &loaded, &attributes, &config);
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        Commands::Run {
            diagram,
            triggers,
            frames,
            token,
        } => {
            let controller = Controller::new(
                Arc::new(load_diagram(&diagram)?),
                Arc::new(StdoutRenderer),
                Arc::new(OfflineRegistry),
            )
            .with_config(config);
            let frames: FrameData = frames.into_iter().collect();
            let token = token.as_deref();

            let state = controller.start_process(token, Value::Null).await?;
            info!(state = %state, "Session started");
            for trigger in &triggers {
                let outcome = controller.trigger_transition(trigger, &frames, token).await?;
                if let Some(message) = outcome.no_process_message() {
                    bail!("{}", message);
                }
                if let SessionOutcome::Done(state) = outcome {
                    println!("{} -> {}", trigger, state);
                }
            }
        }
    }

    Ok(())
}
