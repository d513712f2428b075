use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args as ClapArgs, Parser, Subcommand};
use dotenv::dotenv;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use application::{
    AdapterWizardDriver, ExplorerCommands, ExplorerSession, InvocationTimeouts, ModuleTarget,
    SessionPorts, SessionSettings,
};
use domain::DeviceSelection;
use infrastructure::{
    ExplorerConfig, FileSecretStore, HttpDeviceRegistry, HttpDirectMethodTransport, IotHubClient,
    JsonFileHubStateStore, TracingOutputLog,
};
use pipeline_explorer::{StdinPrompter, render_outline};

const CONNECTION_STRING_ENV: &str = "EXPLORER_CONNECTION_STRING";

#[derive(Parser, Debug)]
#[command(author, version, about = "Browse and manage media pipelines on IoT Edge modules", long_about = None)]
struct Args {
    /// Path to config directory
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// Override auto-refresh interval (seconds, 0 = off)
    #[arg(long)]
    refresh_interval: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect to an IoT Hub and remember the connection
    Connect {
        /// Falls back to $EXPLORER_CONNECTION_STRING
        #[arg(long)]
        connection_string: Option<String>,
        /// `device=module1,module2`; repeat for several devices.
        /// Without it the hub is scanned for media modules on edge devices.
        #[arg(long = "device", value_parser = parse_selection)]
        devices: Vec<DeviceSelection>,
    },
    /// List media modules on the hub's edge devices without connecting
    Scan {
        /// Falls back to $EXPLORER_CONNECTION_STRING
        #[arg(long)]
        connection_string: Option<String>,
    },
    /// Forget the saved connection
    Reset,
    /// Drop cached tree state and print the refreshed tree
    Refresh {
        #[arg(long, default_value_t = 5)]
        depth: usize,
    },
    /// Print the explorer tree
    Tree {
        #[arg(long, default_value_t = 5)]
        depth: usize,
        /// Re-print on every refresh until interrupted
        #[arg(long)]
        watch: bool,
    },
    /// Pipeline topologies
    Topology {
        #[command(subcommand)]
        action: ResourceAction,
    },
    /// Live pipelines
    Pipeline {
        #[command(subcommand)]
        action: PipelineAction,
    },
    /// Remote device adapters
    Adapter {
        #[command(subcommand)]
        action: AdapterAction,
    },
}

#[derive(ClapArgs, Debug, Clone)]
struct Target {
    #[arg(long)]
    device: String,
    #[arg(long)]
    module: String,
}

impl From<&Target> for ModuleTarget {
    fn from(target: &Target) -> Self {
        ModuleTarget::new(&target.device, &target.module)
    }
}

#[derive(Subcommand, Debug)]
enum ResourceAction {
    List {
        #[command(flatten)]
        target: Target,
    },
    /// Print one resource as JSON
    Show {
        #[command(flatten)]
        target: Target,
        name: String,
    },
    /// Create or update from a JSON file
    Put {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        file: PathBuf,
    },
    Delete {
        #[command(flatten)]
        target: Target,
        name: String,
    },
}

#[derive(Subcommand, Debug)]
enum PipelineAction {
    #[command(flatten)]
    Common(ResourceAction),
    Activate {
        #[command(flatten)]
        target: Target,
        name: String,
    },
    Deactivate {
        #[command(flatten)]
        target: Target,
        name: String,
    },
}

#[derive(Subcommand, Debug)]
enum AdapterAction {
    #[command(flatten)]
    Common(ResourceAction),
    /// Interactive creation, provisioning the device identity if needed
    Create {
        #[command(flatten)]
        target: Target,
    },
}

fn parse_selection(raw: &str) -> Result<DeviceSelection, String> {
    let (device, modules) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected device=module[,module], got '{}'", raw))?;
    let modules: Vec<String> = modules
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();
    if device.trim().is_empty() || modules.is_empty() {
        return Err(format!("expected device=module[,module], got '{}'", raw));
    }
    Ok(DeviceSelection::new(device.trim(), modules))
}

fn connection_string_or_env(flag: Option<String>) -> Result<String> {
    match flag {
        Some(cs) => Ok(cs),
        None => std::env::var(CONNECTION_STRING_ENV)
            .with_context(|| format!("Pass --connection-string or set {}", CONNECTION_STRING_ENV)),
    }
}

fn build_session(config: &ExplorerConfig) -> Arc<ExplorerSession> {
    let client = IotHubClient::new(config.hub_api_version.clone());
    let ports = SessionPorts {
        transport: Arc::new(HttpDirectMethodTransport::new(client.clone())),
        registry: Arc::new(HttpDeviceRegistry::new(client)),
        secrets: Arc::new(FileSecretStore::new(&config.secrets_path)),
        state: Arc::new(JsonFileHubStateStore::new(&config.state_path)),
        output: Arc::new(TracingOutputLog),
    };
    let settings = SessionSettings {
        refresh_interval_secs: config.refresh_interval_secs,
        timeouts: InvocationTimeouts {
            connect_secs: config.connect_timeout_secs,
            response_secs: config.response_timeout_secs,
        },
    };
    Arc::new(ExplorerSession::new(ports, settings))
}

fn read_resource<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid resource JSON in {}", path.display()))
}

async fn restore(session: &ExplorerSession) -> Result<()> {
    match session.restore().await? {
        Some(hub) => {
            debug!(host = %hub.host_name(), "Restored saved connection");
            Ok(())
        }
        None => bail!("Not connected. Run `pipeline-explorer connect` first."),
    }
}

async fn print_tree(session: &ExplorerSession, depth: usize, watch: bool) -> Result<()> {
    let mut refreshes = session.bus().subscribe();
    loop {
        let outline = session.outline(depth).await?;
        println!("{}", render_outline(&outline));
        if !watch {
            return Ok(());
        }

        tokio::select! {
            received = refreshes.recv() => {
                if let Ok(reason) = received {
                    debug!(?reason, "Re-rendering tree");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("🛑 Stopping watch");
                return Ok(());
            }
        }
    }
}

async fn run_topology(commands: &ExplorerCommands, action: ResourceAction) -> Result<()> {
    match action {
        ResourceAction::List { target } => {
            for topology in commands.list_topologies(&(&target).into()).await? {
                println!("{}", topology.name);
            }
        }
        ResourceAction::Show { target, name } => {
            println!("{}", commands.show_topology(&(&target).into(), &name).await?);
        }
        ResourceAction::Put { target, file } => {
            let topology = read_resource(&file)?;
            commands.save_topology(&(&target).into(), &topology).await?;
        }
        ResourceAction::Delete { target, name } => {
            commands.delete_topology(&(&target).into(), &name).await?;
        }
    }
    Ok(())
}

async fn run_pipeline(commands: &ExplorerCommands, action: PipelineAction) -> Result<()> {
    match action {
        PipelineAction::Common(ResourceAction::List { target }) => {
            for pipeline in commands.list_pipelines(&(&target).into()).await? {
                println!(
                    "{}\t{}\t{}",
                    pipeline.name,
                    pipeline.topology_name(),
                    pipeline.state()
                );
            }
        }
        PipelineAction::Common(ResourceAction::Show { target, name }) => {
            println!("{}", commands.show_pipeline(&(&target).into(), &name).await?);
        }
        PipelineAction::Common(ResourceAction::Put { target, file }) => {
            let pipeline = read_resource(&file)?;
            commands.save_pipeline(&(&target).into(), &pipeline).await?;
        }
        PipelineAction::Common(ResourceAction::Delete { target, name }) => {
            commands.delete_pipeline(&(&target).into(), &name).await?;
        }
        PipelineAction::Activate { target, name } => {
            commands.activate_pipeline(&(&target).into(), &name).await?;
        }
        PipelineAction::Deactivate { target, name } => {
            commands.deactivate_pipeline(&(&target).into(), &name).await?;
        }
    }
    Ok(())
}

async fn run_adapter(commands: &ExplorerCommands, action: AdapterAction) -> Result<()> {
    match action {
        AdapterAction::Common(ResourceAction::List { target }) => {
            for adapter in commands.list_adapters(&(&target).into()).await? {
                println!("{}\t{}\t{}", adapter.name, adapter.device_id(), adapter.host());
            }
        }
        AdapterAction::Common(ResourceAction::Show { target, name }) => {
            println!("{}", commands.show_adapter(&(&target).into(), &name).await?);
        }
        AdapterAction::Common(ResourceAction::Put { target, file }) => {
            let adapter = read_resource(&file)?;
            commands.save_adapter(&(&target).into(), &adapter).await?;
        }
        AdapterAction::Common(ResourceAction::Delete { target, name }) => {
            commands.delete_adapter(&(&target).into(), &name).await?;
        }
        AdapterAction::Create { target } => {
            let prompter = StdinPrompter::stdio();
            let adapter = AdapterWizardDriver::new(commands, &prompter)
                .run(&(&target).into())
                .await?;
            println!("Created remote device adapter '{}'", adapter.name);
        }
    }
    Ok(())
}

async fn run() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,pipeline_explorer=debug,application=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = ExplorerConfig::load(&args.config_dir)
        .with_context(|| format!("Failed to load configuration from {}", args.config_dir))?;
    if let Some(interval) = args.refresh_interval {
        config.refresh_interval_secs = interval;
    }
    debug!(?config, "Configuration loaded");

    let session = build_session(&config);
    let commands = ExplorerCommands::new(session.clone());

    match args.command {
        Command::Connect {
            connection_string,
            devices,
        } => {
            let connection_string = connection_string_or_env(connection_string)?;
            let devices = if devices.is_empty() {
                let found = session.scan(&connection_string).await?;
                if found.is_empty() {
                    bail!("No media modules found on any edge device; pass --device to choose explicitly");
                }
                found
            } else {
                devices
            };
            for selection in &devices {
                info!(device_id = %selection.device_id, modules = ?selection.modules, "Managing device");
            }
            let hub = session.connect(&connection_string, devices).await?;
            println!("Connected to {}", hub.host_name());
        }
        Command::Scan { connection_string } => {
            let connection_string = connection_string_or_env(connection_string)?;
            for selection in session.scan(&connection_string).await? {
                println!("{}={}", selection.device_id, selection.modules.join(","));
            }
        }
        Command::Reset => {
            session.reset().await?;
        }
        Command::Refresh { depth } => {
            restore(&session).await?;
            session.refresh();
            print_tree(&session, depth, false).await?;
        }
        Command::Tree { depth, watch } => {
            restore(&session).await?;
            print_tree(&session, depth, watch).await?;
        }
        Command::Topology { action } => {
            restore(&session).await?;
            run_topology(&commands, action).await?;
        }
        Command::Pipeline { action } => {
            restore(&session).await?;
            run_pipeline(&commands, action).await?;
        }
        Command::Adapter { action } => {
            restore(&session).await?;
            run_adapter(&commands, action).await?;
        }
    }

    Ok(())
}

fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("❌ Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(run()) {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection() {
        let selection = parse_selection("edge-1=avaedge, other").unwrap();
        assert_eq!(selection.device_id, "edge-1");
        assert_eq!(selection.modules, vec!["avaedge".to_string(), "other".to_string()]);

        assert!(parse_selection("edge-1").is_err());
        assert!(parse_selection("edge-1=").is_err());
        assert!(parse_selection("=avaedge").is_err());
    }

    #[test]
    fn test_cli_parses_pipeline_activate() {
        let args = Args::try_parse_from([
            "pipeline-explorer",
            "pipeline",
            "activate",
            "--device",
            "edge-1",
            "--module",
            "avaedge",
            "p1",
        ])
        .unwrap();

        match args.command {
            Command::Pipeline {
                action: PipelineAction::Activate { target, name },
            } => {
                assert_eq!(target.device, "edge-1");
                assert_eq!(name, "p1");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_verifies() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
