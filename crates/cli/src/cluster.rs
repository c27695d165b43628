//! Remote process control for the simulation cluster.
//!
//! Everything here is command dispatch over `ssh` and `rsync`; the
//! deployment itself (hosts, remote paths, sync pushes) comes from
//! `cluster.toml`. No simulation data is parsed in this module.

use std::fs;
use std::path::Path;
use std::process::Command;

use serde::Deserialize;

/// Process-name pattern that matches any simulation client binary.
pub const DEFAULT_CLIENT_PROC: &str = "_client";

/// `ps` column set used for every status sweep.
const PS_COLUMNS: &str = "pid,%cpu,%mem,command";

// ──────────────────────────────────────────────
// Configuration
// ──────────────────────────────────────────────

/// Deployment description read from `cluster.toml`.
#[derive(Debug, Deserialize)]
pub struct ClusterConfig {
    /// Default client hosts, in dispatch order.
    pub hosts: Vec<String>,
    /// Host the coordination server runs on.
    pub server_host: String,
    /// `host:port` the clients connect to.
    pub server_addr: String,
    /// Remote job runner that detaches N copies of a binary.
    pub job: String,
    /// Remote client binary path.
    pub client_bin: String,
    /// Remote server binary path.
    pub server_bin: String,
    /// Remote control file handed to the server on start.
    pub control: String,
    /// Remote helper that asks a running server to shut down.
    pub shutdown_bin: String,
    /// Remote glob for the job runner's captured output.
    #[serde(default = "default_job_log")]
    pub job_log: String,
    /// rsync pushes performed by `sync`, in order.
    pub sync: Vec<SyncPush>,
}

fn default_job_log() -> String {
    "/tmp/jobout*.out".to_owned()
}

/// One rsync invocation: local source trees pushed to a remote
/// destination directory.
#[derive(Debug, Deserialize)]
pub struct SyncPush {
    pub sources: Vec<String>,
    pub dest: String,
}

impl ClusterConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
        toml::from_str(&text).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
    }

    /// Process name the client sweeps kill by.
    pub fn client_proc(&self) -> &str {
        basename(&self.client_bin)
    }

    /// Process name the server sweeps match.
    pub fn server_proc(&self) -> &str {
        basename(&self.server_bin)
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

// ──────────────────────────────────────────────
// Host selection
// ──────────────────────────────────────────────

/// Resolve a subcommand's target hosts. Explicit hosts alone are used
/// as given; `-a` prepends the configured defaults; with neither,
/// commands that sweep (`default_to_all`) fall back to the defaults
/// and everything else is a usage error.
pub fn select_hosts(
    defaults: &[String],
    all: bool,
    explicit: &[String],
    default_to_all: bool,
) -> Result<Vec<String>, String> {
    if all || (default_to_all && explicit.is_empty()) {
        let mut hosts = defaults.to_vec();
        hosts.extend(explicit.iter().cloned());
        return Ok(hosts);
    }
    if explicit.is_empty() {
        return Err("no hosts given (pass hosts, -a, or a hostfile)".to_owned());
    }
    Ok(explicit.to_vec())
}

/// Order-preserving dedupe, for the status sweep after a start that
/// listed the same host more than once.
pub fn dedupe(hosts: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for host in hosts {
        if !seen.contains(host) {
            seen.push(host.clone());
        }
    }
    seen
}

/// Parse a hostfile: one `host num` pair per line, with `#` comments
/// and blank lines skipped.
pub fn parse_hostfile(text: &str) -> Result<Vec<(String, u32)>, String> {
    let mut hosts = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let host = fields.next();
        let num = fields.next().and_then(|n| n.parse().ok());
        match (host, num) {
            (Some(host), Some(num)) if fields.next().is_none() => {
                hosts.push((host.to_owned(), num));
            }
            _ => {
                return Err(format!(
                    "hostfile line {}: expected 'host num', got '{}'",
                    i + 1,
                    line
                ));
            }
        }
    }
    Ok(hosts)
}

// ──────────────────────────────────────────────
// Dispatch
// ──────────────────────────────────────────────

/// Runs external commands, or prints them under `--dry-run`.
pub struct Dispatcher {
    dry_run: bool,
}

impl Dispatcher {
    pub fn new(dry_run: bool) -> Self {
        Dispatcher { dry_run }
    }

    /// Run `program` with `args`, capturing stdout. Non-zero exit is
    /// an error carrying the command line and stderr.
    pub fn run(&self, program: &str, args: &[&str]) -> Result<String, String> {
        self.exec(program, args, false)
    }

    /// Like [`Dispatcher::run`], but exit status 1 counts as success
    /// with whatever output was produced. `grep` and `pkill` both exit
    /// 1 when nothing matched, and ssh passes the remote status
    /// through.
    pub fn run_allow_no_match(&self, program: &str, args: &[&str]) -> Result<String, String> {
        self.exec(program, args, true)
    }

    fn exec(&self, program: &str, args: &[&str], no_match_ok: bool) -> Result<String, String> {
        if self.dry_run {
            println!("would run: {} {}", program, args.join(" "));
            return Ok(String::new());
        }
        tracing::debug!(program, ?args, "dispatch");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| format!("could not run {}: {}", program, e))?;
        if output.status.success() || (no_match_ok && output.status.code() == Some(1)) {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }
        Err(format!(
            "{} {} failed: {}",
            program,
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}

// ──────────────────────────────────────────────
// Client operations
// ──────────────────────────────────────────────

/// Start `num` clients per host through the remote job runner, then
/// sweep the deduplicated host list for what actually came up.
pub fn clients_start(
    cfg: &ClusterConfig,
    d: &Dispatcher,
    targets: &[(String, u32)],
) -> Result<(), String> {
    for (host, num) in targets {
        println!("Starting {} jobs on {}", num, host);
        let num = num.to_string();
        d.run(
            "ssh",
            &[host, &cfg.job, &num, &cfg.client_bin, &cfg.server_addr],
        )?;
    }
    println!("\nChecking status ...");
    let hosts: Vec<String> = targets.iter().map(|(h, _)| h.clone()).collect();
    status_sweep(d, &dedupe(&hosts), DEFAULT_CLIENT_PROC)
}

/// Kill client processes by name on each host.
pub fn clients_stop(cfg: &ClusterConfig, d: &Dispatcher, hosts: &[String]) -> Result<(), String> {
    for host in hosts {
        println!("Stopping {} on {}", cfg.client_proc(), host);
        d.run_allow_no_match("ssh", &[host, "pkill", "-f", cfg.client_proc()])?;
    }
    Ok(())
}

/// `ps | grep` on each host, printed indented under a `host:` header.
pub fn status_sweep(d: &Dispatcher, hosts: &[String], proc: &str) -> Result<(), String> {
    println!("Running: ssh host ps x -o {} | grep {}", PS_COLUMNS, proc);
    for host in hosts {
        // The pipe is interpreted by the remote shell, not locally.
        let output = d.run_allow_no_match(
            "ssh",
            &[host, "ps", "x", "-o", PS_COLUMNS, "|", "grep", proc],
        )?;
        println!("{}:", host);
        for line in output.lines() {
            if line.contains("grep") || line.contains("simctl") {
                continue;
            }
            println!("  {}", line);
        }
    }
    Ok(())
}

// ──────────────────────────────────────────────
// Server operations
// ──────────────────────────────────────────────

/// Start the server through the job runner, then print the runner's
/// captured log so startup failures are visible immediately.
pub fn server_start(
    cfg: &ClusterConfig,
    d: &Dispatcher,
    host: Option<&str>,
) -> Result<(), String> {
    let host = host.unwrap_or(&cfg.server_host);
    d.run("ssh", &[host, &cfg.job, "1", &cfg.server_bin, &cfg.control])?;
    let log = d.run("ssh", &[host, "cat", &cfg.job_log])?;
    print!("{}", log);
    Ok(())
}

/// Ask the server to shut down, then sweep for leftover processes.
/// `now` skips the graceful drain of in-flight runs.
pub fn server_stop(
    cfg: &ClusterConfig,
    d: &Dispatcher,
    host: Option<&str>,
    now: bool,
) -> Result<(), String> {
    let host = host.unwrap_or(&cfg.server_host);
    let mut args = vec![host, cfg.shutdown_bin.as_str()];
    if now {
        args.push("now");
    }
    let out = d.run("ssh", &args)?;
    print!("{}", out);
    status_sweep(d, &[host.to_owned()], cfg.server_proc())
}

pub fn server_status(
    cfg: &ClusterConfig,
    d: &Dispatcher,
    host: Option<&str>,
) -> Result<(), String> {
    let host = host.unwrap_or(&cfg.server_host);
    status_sweep(d, &[host.to_owned()], cfg.server_proc())
}

// ──────────────────────────────────────────────
// Sync
// ──────────────────────────────────────────────

/// Push the configured source trees to each host, one rsync per
/// configured push. `silent` keeps the per-file transfer lines out of
/// the report.
pub fn sync(
    cfg: &ClusterConfig,
    d: &Dispatcher,
    hosts: &[String],
    silent: bool,
) -> Result<(), String> {
    for host in hosts {
        let mut report = String::new();
        for push in &cfg.sync {
            let dest = format!("{}:{}", host, push.dest);
            let mut args: Vec<&str> = vec!["-aNHAXxvz", "--delete"];
            args.extend(push.sources.iter().map(String::as_str));
            args.push(&dest);
            report.push_str(&d.run("rsync", &args)?);
        }
        println!("{}:", host);
        if !silent {
            for line in report.lines() {
                println!("  {}", line);
            }
        }
    }
    Ok(())
}
