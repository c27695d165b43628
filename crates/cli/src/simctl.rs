//! Cluster control for the remote simulation fleet: start, stop, and
//! inspect client and server processes over ssh, and push the
//! simulation tree with rsync. The deployment lives in `cluster.toml`.

mod cluster;
mod logging;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use cluster::{ClusterConfig, Dispatcher};

/// Simulation cluster control.
#[derive(Parser)]
#[command(name = "simctl", version, about = "Simulation cluster control")]
struct Cli {
    /// Path to the cluster description
    #[arg(long, global = true, default_value = "cluster.toml")]
    config: PathBuf,

    /// Print the commands instead of running them
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage client processes on the worker hosts
    Clients {
        #[command(subcommand)]
        command: ClientCommands,
    },

    /// Manage the coordination server
    Server {
        #[command(subcommand)]
        command: ServerCommands,
    },

    /// Push the simulation tree to the worker hosts
    Sync {
        /// Prepend the configured default hosts
        #[arg(short, long)]
        all: bool,
        /// Suppress per-file transfer output
        #[arg(short, long)]
        silent: bool,
        /// Hosts to push to
        hosts: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ClientCommands {
    /// Start client processes through the remote job runner
    Start {
        /// Processes per host
        #[arg(short, long, default_value_t = 1)]
        num: u32,
        /// Prepend the configured default hosts
        #[arg(short, long)]
        all: bool,
        /// Read `host num` pairs from a file, overriding other selection
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Hosts to start on
        hosts: Vec<String>,
    },

    /// Stop client processes (all configured hosts when none given)
    Stop {
        /// Prepend the configured default hosts
        #[arg(short, long)]
        all: bool,
        /// Hosts to stop on
        hosts: Vec<String>,
    },

    /// Show client processes (all configured hosts when none given)
    Status {
        /// Process name to match
        #[arg(short, long, default_value = cluster::DEFAULT_CLIENT_PROC)]
        proc: String,
        /// Prepend the configured default hosts
        #[arg(short, long)]
        all: bool,
        /// Hosts to query
        hosts: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ServerCommands {
    /// Start the server on its configured host
    Start {
        /// Override the configured server host
        host: Option<String>,
    },

    /// Shut the server down
    Stop {
        /// Let in-flight runs finish first
        #[arg(short, long)]
        graceful: bool,
        /// Stop immediately
        #[arg(short, long)]
        now: bool,
        /// Override the configured server host
        host: Option<String>,
    },

    /// Show the server process
    Status {
        /// Override the configured server host
        host: Option<String>,
    },
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let cfg = ClusterConfig::load(&cli.config)?;
    let d = Dispatcher::new(cli.dry_run);

    match cli.command {
        Commands::Clients { command } => match command {
            ClientCommands::Start {
                num,
                all,
                file,
                hosts,
            } => {
                let targets = start_targets(&cfg, num, all, file.as_deref(), &hosts)?;
                cluster::clients_start(&cfg, &d, &targets)
            }
            ClientCommands::Stop { all, hosts } => {
                let hosts = cluster::select_hosts(&cfg.hosts, all, &hosts, true)?;
                cluster::clients_stop(&cfg, &d, &hosts)
            }
            ClientCommands::Status { proc, all, hosts } => {
                let hosts = cluster::select_hosts(&cfg.hosts, all, &hosts, true)?;
                cluster::status_sweep(&d, &hosts, &proc)
            }
        },
        Commands::Server { command } => match command {
            ServerCommands::Start { host } => cluster::server_start(&cfg, &d, host.as_deref()),
            ServerCommands::Stop {
                graceful,
                now,
                host,
            } => {
                // Exactly one shutdown mode must be chosen.
                if graceful == now {
                    return Err("pass exactly one of --graceful or --now".to_owned());
                }
                cluster::server_stop(&cfg, &d, host.as_deref(), now)
            }
            ServerCommands::Status { host } => cluster::server_status(&cfg, &d, host.as_deref()),
        },
        Commands::Sync { all, silent, hosts } => {
            let hosts = cluster::select_hosts(&cfg.hosts, all, &hosts, false)?;
            cluster::sync(&cfg, &d, &hosts, silent)
        }
    }
}

/// Resolve `clients start` targets: a hostfile overrides the flags and
/// carries per-host counts; otherwise every selected host gets `num`.
fn start_targets(
    cfg: &ClusterConfig,
    num: u32,
    all: bool,
    file: Option<&Path>,
    hosts: &[String],
) -> Result<Vec<(String, u32)>, String> {
    if let Some(path) = file {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
        let targets = cluster::parse_hostfile(&text)?;
        if targets.is_empty() {
            return Err(format!("no hosts in hostfile '{}'", path.display()));
        }
        return Ok(targets);
    }
    let hosts = cluster::select_hosts(&cfg.hosts, all, hosts, false)?;
    Ok(hosts.into_iter().map(|h| (h, num)).collect())
}
