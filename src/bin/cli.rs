// CLI binary — panicking on unrecoverable errors is standard for CLI tools.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use parasync::client::HttpSessionBackend;
use parasync::controls::ControlDescriptor;
use parasync::error::SyncError;
use parasync::events::{NoopSessionEmitter, SessionEmitter};
use parasync::fallback;
use parasync::model::{Output, ParameterSchema, ParameterValues};
use parasync::session::SessionManager;
use parasync::settings::{self, ViewerSettings};

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "parasync-cli", about = "Headless parametric-model session CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Embedding ticket (overrides the saved settings)
    #[arg(long, global = true)]
    ticket: Option<String>,

    /// Model view URL (overrides the saved settings)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Config directory holding settings.json
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Bound session initialization by this many seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Persist the effective ticket/url back to the settings file
    #[arg(long, global = true)]
    save: bool,

    /// Output raw JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the remote parameter schema (falls back to the built-in catalog)
    Params,
    /// Apply parameter values and report the resulting weight
    Customize {
        /// Parameter assignment as id=value (repeatable)
        #[arg(long = "set", value_name = "ID=VALUE")]
        sets: Vec<String>,
    },
    /// Initialize a session and report the extracted weight
    Weight,
    /// Print the built-in fallback control set and its estimated weight
    Fallback,
    /// Print the JSON schema of the control descriptor format
    Schema,
}

// ── Emitters ─────────────────────────────────────────────────────

/// Prints every notification as it arrives; used in text mode.
struct PrintEmitter;

impl SessionEmitter for PrintEmitter {
    fn output_updated(&self, output: &Output, material_output: Option<&Output>) {
        match material_output {
            Some(material) => println!(
                "output {} -> version {} (material {})",
                output.id, output.version, material.id
            ),
            None => println!("output {} -> version {}", output.id, output.version),
        }
    }

    fn weight_changed(&self, weight: f64) {
        println!("weight: {weight} g");
    }
}

// ── Entry point ──────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        eprintln!("error: {error}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), SyncError> {
    let settings = effective_settings(&cli);
    if cli.save {
        let config_dir = cli.config_dir.as_deref().ok_or_else(|| SyncError::Validation {
            message: "--save requires --config-dir".to_string(),
        })?;
        settings::save_settings(config_dir, &settings)?;
    }

    match cli.command {
        Commands::Params => params(&settings, cli.json).await,
        Commands::Customize { sets } => customize(&settings, &sets, cli.json).await,
        Commands::Weight => weight(&settings, cli.json).await,
        Commands::Fallback => {
            fallback_catalog(cli.json);
            Ok(())
        }
        Commands::Schema => {
            let schema = schemars::schema_for!(ControlDescriptor);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}

fn effective_settings(cli: &Cli) -> ViewerSettings {
    let mut settings = cli
        .config_dir
        .as_deref()
        .and_then(settings::load_settings)
        .unwrap_or_default();
    if let Some(ticket) = &cli.ticket {
        settings.ticket = Some(ticket.clone());
    }
    if let Some(url) = &cli.url {
        settings.model_view_url = url.clone();
    }
    if let Some(secs) = cli.timeout_secs {
        settings.init_timeout_ms = Some(secs.saturating_mul(1000));
    }
    settings
}

async fn connect(settings: &ViewerSettings, json: bool) -> Result<Arc<SessionManager>, SyncError> {
    let ticket = settings.ticket.clone().ok_or_else(|| SyncError::Validation {
        message: "no ticket configured (pass --ticket, or --save one with --config-dir)"
            .to_string(),
    })?;
    let emitter: Arc<dyn SessionEmitter> = if json {
        Arc::new(NoopSessionEmitter)
    } else {
        Arc::new(PrintEmitter)
    };
    let mut manager = SessionManager::new(
        Arc::new(HttpSessionBackend::new()),
        emitter,
        ticket,
        settings.model_view_url.clone(),
    );
    if let Some(ms) = settings.init_timeout_ms {
        manager = manager.with_init_timeout(Duration::from_millis(ms));
    }
    let manager = Arc::new(manager);
    manager.init().await?;
    Ok(manager)
}

// ── Commands ─────────────────────────────────────────────────────

async fn params(settings: &ViewerSettings, json: bool) -> Result<(), SyncError> {
    match connect(settings, json).await {
        Ok(manager) => {
            let parameters = manager.parameters().unwrap_or_default();
            print_parameters(&parameters, json)?;
            Ok(())
        }
        Err(error) => {
            // No session: present the static control set instead of nothing.
            eprintln!("session unavailable ({error}); showing fallback control set");
            print_parameters(&fallback::catalog(), json)?;
            Ok(())
        }
    }
}

async fn customize(settings: &ViewerSettings, sets: &[String], json: bool) -> Result<(), SyncError> {
    let manager = connect(settings, json).await?;
    let parameters = manager.parameters().unwrap_or_default();

    // The remote call is always a full snapshot: start from every default
    // and overlay the requested assignments.
    let mut values: ParameterValues = parameters
        .values()
        .map(|parameter| (parameter.id.clone(), parameter.defval.clone()))
        .collect();
    for set in sets {
        let (id, value) = parse_assignment(set)?;
        if !parameters.contains_key(id) {
            return Err(SyncError::Validation {
                message: format!("unknown parameter '{id}'"),
            });
        }
        values.insert(id.to_string(), value.to_string());
    }

    manager.customize_session(values).await?;
    report_weight(manager.weight(), json);
    Ok(())
}

async fn weight(settings: &ViewerSettings, json: bool) -> Result<(), SyncError> {
    let manager = connect(settings, json).await?;
    report_weight(manager.weight(), json);
    Ok(())
}

fn fallback_catalog(json: bool) {
    let catalog = fallback::catalog();
    let defaults: ParameterValues = catalog
        .values()
        .map(|parameter| (parameter.id.clone(), parameter.defval.clone()))
        .collect();
    let estimate = fallback::estimate_weight(&defaults);

    if json {
        println!(
            "{}",
            serde_json::json!({ "parameters": catalog, "estimated_weight": estimate })
        );
    } else {
        for parameter in catalog.values() {
            print_parameter_line(parameter);
        }
        println!("estimated weight: {estimate} g");
    }
}

// ── Output helpers ───────────────────────────────────────────────

fn parse_assignment(set: &str) -> Result<(&str, &str), SyncError> {
    set.split_once('=').ok_or_else(|| SyncError::Validation {
        message: format!("expected ID=VALUE, got '{set}'"),
    })
}

fn print_parameters(
    parameters: &indexmap::IndexMap<String, ParameterSchema>,
    json: bool,
) -> Result<(), SyncError> {
    if json {
        println!("{}", serde_json::to_string_pretty(parameters)?);
    } else {
        for parameter in parameters.values() {
            print_parameter_line(parameter);
        }
    }
    Ok(())
}

fn print_parameter_line(parameter: &ParameterSchema) {
    let hidden = if parameter.hidden { " (hidden)" } else { "" };
    match &parameter.choices {
        Some(choices) => println!(
            "{}: {:?} default={} choices={}{hidden}",
            parameter.id,
            parameter.param_type,
            parameter.defval,
            choices.join("|"),
        ),
        None => println!(
            "{}: {:?} default={}{hidden}",
            parameter.id, parameter.param_type, parameter.defval,
        ),
    }
}

fn report_weight(weight: Option<f64>, json: bool) {
    if json {
        println!("{}", serde_json::json!({ "weight": weight }));
    } else {
        match weight {
            Some(weight) => println!("weight: {weight} g"),
            None => println!("weight: not reported"),
        }
    }
}
