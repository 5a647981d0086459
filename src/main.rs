use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cloudscale_provider::config::Config;
use cloudscale_provider::harness::{self, StoredResource};
use cloudscale_provider::provider::schema::{self, SchemaType};
use cloudscale_provider::provider::sweep::DEFAULT_SWEEP_PREFIX;
use cloudscale_provider::provider::{Provider, ResourceKind};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Drive cloudscale.ch resources from declarative configuration files
#[derive(Parser, Debug)]
#[command(name = "cloudscale-provider", version = cloudscale_provider::VERSION, about, long_about = None)]
struct Args {
    /// API token (overrides CLOUDSCALE_API_TOKEN and the config file)
    #[arg(long, global = true)]
    token: Option<String>,

    /// API endpoint (overrides CLOUDSCALE_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level for debugging
    #[arg(long, global = true, value_enum, default_value = "off")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the schema of a resource type
    Schema {
        resource_type: ResourceKindArg,
        /// Print the data source schema instead
        #[arg(long)]
        data_source: bool,
    },
    /// Validate a configuration file against the resource schema
    Validate {
        resource_type: ResourceKindArg,
        file: PathBuf,
    },
    /// Create or update the resource described by a configuration file
    Apply {
        resource_type: ResourceKindArg,
        file: PathBuf,
        #[arg(long, default_value = "state.json")]
        state: PathBuf,
    },
    /// Re-read the stored resource and update the state file
    Refresh {
        #[arg(long, default_value = "state.json")]
        state: PathBuf,
    },
    /// Import an existing remote object into a state file
    Import {
        resource_type: ResourceKindArg,
        id: String,
        #[arg(long, default_value = "state.json")]
        state: PathBuf,
    },
    /// Look up a single object matching the attributes in a file
    Lookup {
        resource_type: ResourceKindArg,
        file: PathBuf,
    },
    /// Delete the stored resource
    Destroy {
        #[arg(long, default_value = "state.json")]
        state: PathBuf,
    },
    /// Store --token, --api-url and the request timeout in the config file
    Configure {
        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Delete every object whose name starts with a prefix
    Sweep {
        #[arg(long, default_value = DEFAULT_SWEEP_PREFIX)]
        prefix: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResourceKindArg {
    #[value(name = "cloudscale_load_balancer", alias = "load_balancer")]
    LoadBalancer,
    #[value(name = "cloudscale_objects_user", alias = "objects_user")]
    ObjectsUser,
}

impl From<ResourceKindArg> for ResourceKind {
    fn from(arg: ResourceKindArg) -> Self {
        match arg {
            ResourceKindArg::LoadBalancer => ResourceKind::LoadBalancer,
            ResourceKindArg::ObjectsUser => ResourceKind::ObjectsUser,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    // RUST_LOG narrows the output further when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing_level.to_string().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("cloudscale-provider started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("cloudscale-provider").join("cloudscale-provider.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".cloudscale-provider").join("cloudscale-provider.log");
    }
    PathBuf::from("cloudscale-provider.log")
}

fn load_config(args: &Args) -> Config {
    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    config
        .with_env()
        .with_overrides(args.token.as_deref(), args.api_url.as_deref(), None)
}

fn config_file(args: &Args) -> Result<PathBuf> {
    args.config
        .clone()
        .or_else(Config::config_path)
        .context("No config directory available, pass --config")
}

fn provider(args: &Args) -> Result<Provider> {
    Ok(Provider::new(load_config(args).client()?))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn require_state(path: &Path) -> Result<StoredResource> {
    harness::load_state(path)?
        .ok_or_else(|| anyhow::anyhow!("No resource in state file {}", path.display()))
}

async fn run(args: &Args) -> Result<()> {
    match &args.command {
        Command::Schema {
            resource_type,
            data_source,
        } => {
            let t = if *data_source {
                SchemaType::DataSource
            } else {
                SchemaType::Resource
            };
            print_json(&ResourceKind::from(*resource_type).schema(t))
        }
        Command::Validate {
            resource_type,
            file,
        } => {
            let config = harness::load_config_file(file)?;
            schema::validate(&ResourceKind::from(*resource_type).schema(SchemaType::Resource), &config)?;
            println!("{} is valid", file.display());
            Ok(())
        }
        Command::Apply {
            resource_type,
            file,
            state,
        } => {
            let kind = ResourceKind::from(*resource_type);
            let config = harness::load_config_file(file)?;
            let prior = harness::load_state(state)?;

            let provider = provider(args)?;
            let (outcome, stored) = harness::apply(&provider, kind, config, prior.as_ref()).await?;
            harness::save_state(state, Some(&stored))?;

            println!("{} {}: {}", kind, stored.id, outcome);
            Ok(())
        }
        Command::Refresh { state } => {
            let stored = require_state(state)?;
            let refreshed = harness::refresh(&provider(args)?, &stored).await?;
            harness::save_state(state, refreshed.as_ref())?;

            match refreshed {
                Some(r) => println!("{} {}: refreshed", r.kind, r.id),
                None => println!("{} {}: gone, removed from state", stored.kind, stored.id),
            }
            Ok(())
        }
        Command::Import {
            resource_type,
            id,
            state,
        } => {
            let kind = ResourceKind::from(*resource_type);
            let d = provider(args)?.import(kind, id).await?;
            let stored = StoredResource {
                kind: kind.type_name().to_string(),
                id: id.clone(),
                attributes: d.state(),
            };
            harness::save_state(state, Some(&stored))?;
            println!("{} {}: imported", kind, id);
            Ok(())
        }
        Command::Lookup {
            resource_type,
            file,
        } => {
            let kind = ResourceKind::from(*resource_type);
            let filter = harness::load_config_file(file)?;
            let d = provider(args)?.read_data_source(kind, &filter).await?;

            let mut state = d.state();
            state.insert("id".to_string(), serde_json::json!(d.id()));
            print_json(&state)
        }
        Command::Destroy { state } => {
            let stored = require_state(state)?;
            harness::destroy(&provider(args)?, &stored).await?;
            harness::save_state(state, None)?;
            println!("{} {}: destroyed", stored.kind, stored.id);
            Ok(())
        }
        Command::Configure { timeout } => {
            let path = config_file(args)?;
            let config = Config::load_from(&path).with_overrides(
                args.token.as_deref(),
                args.api_url.as_deref(),
                *timeout,
            );

            // fail early on a bad URL or empty token
            config.client()?;
            config
                .save_to(&path)
                .with_context(|| format!("Failed to write config {}", path.display()))?;
            println!("Configuration written to {}", path.display());
            Ok(())
        }
        Command::Sweep { prefix } => {
            let report = provider(args)?.sweep(prefix).await;
            for (kind, id, name) in &report.deleted {
                println!("{} {} ({}): deleted", kind, id, name);
            }
            for (kind, id, error) in &report.failed {
                eprintln!("{} {}: {}", kind, id, error);
            }
            println!("{} objects swept", report.deleted.len());

            if !report.is_clean() {
                anyhow::bail!("{} objects could not be swept", report.failed.len());
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_guard = match setup_logging(args.log_level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Warning: {:#}", e);
            None
        }
    };

    if let Err(e) = run(&args).await {
        tracing::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        drop(log_guard);
        std::process::exit(1);
    }
}
