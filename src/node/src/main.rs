//! Warden Node - Main Binary
//!
//! Operator entry point for the access broker:
//! - authorize claim files and record their artifacts
//! - report effective roles of a subject
//! - collect overdue artifacts until interrupted
//! - manage multipass credentials

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use warden_authz::duration::parse_duration;
use warden_core::Subject;
use warden_node::{fixtures, NodeConfig, WardenNode};

/// Warden Node CLI
#[derive(Parser)]
#[command(name = "warden-node")]
#[command(about = "Warden access broker - authorization decisions and multipass credentials")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/warden/node.toml", env = "WARDEN_CONFIG")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Authorize every claim of a request file and record the artifact
    Check {
        /// JSON file with `subject`, `claims` and an optional `auth_method`
        request: PathBuf,

        /// Report per-claim results without creating an artifact
        #[arg(long)]
        dry_run: bool,
    },

    /// Show effective roles and reachable tenants and projects of a subject
    Report {
        #[arg(long)]
        subject: String,

        #[arg(long)]
        tenant: String,

        /// The subject is a service account rather than a user
        #[arg(long)]
        service_account: bool,

        /// Role to report on; repeatable
        #[arg(long = "role", required = true)]
        roles: Vec<String>,
    },

    /// Delete overdue artifacts, once or until interrupted
    Gc {
        #[arg(long)]
        once: bool,
    },

    /// Manage multipass credentials
    Multipass {
        #[command(subcommand)]
        command: MultipassCommand,
    },

    /// Show node version
    Version,
}

#[derive(Subcommand)]
enum MultipassCommand {
    /// Create a multipass owned by a subject
    Create {
        #[arg(long)]
        owner: String,

        #[arg(long)]
        tenant: String,

        #[arg(long)]
        service_account: bool,

        #[arg(long, default_value = "")]
        description: String,

        /// Lifetime such as "24h"; defaults to the configured ttl
        #[arg(long)]
        ttl: Option<String>,
    },

    /// Advance the generation and print a fresh token
    Issue { uuid: String },

    /// Check whether a jti is the current one
    Verify { uuid: String, jti: String },

    /// Check a presented token against storage
    Authenticate { token: String },

    /// Invalidate every issued token
    Revoke { uuid: String },

    Delete { uuid: String },

    List,
}

fn subject(uuid: String, tenant: String, service_account: bool) -> Subject {
    if service_account {
        Subject::service_account(uuid, tenant)
    } else {
        Subject::user(uuid, tenant)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::Version = cli.command {
        println!("Warden Node v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration
    let config = NodeConfig::load(&cli.config)?;

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { config.node.log_level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},warden_node={}", log_level, log_level).into()),
        )
        .with_target(true)
        .with_line_number(true)
        .init();

    info!("Loaded configuration from {:?}", cli.config);
    config.validate()?;

    let node = WardenNode::new(config).await?;

    match cli.command {
        Command::Check { request, dry_run } => {
            let request = fixtures::load_check_request(&request)?;
            if dry_run {
                print_json(&node.check_permissions(&request).await)?;
            } else {
                print_json(&node.check(&request).await?)?;
            }
        }
        Command::Report {
            subject: uuid,
            tenant,
            service_account,
            roles,
        } => {
            let subject = subject(uuid, tenant, service_account);
            print_json(&node.report(&subject, &roles).await?)?;
        }
        Command::Gc { once: true } => {
            let report = node.sweep_once().await?;
            info!(
                "Swept {} artifacts: {} overdue, {} deleted, {} failed",
                report.listed, report.overdue, report.deleted, report.failed
            );
        }
        Command::Gc { once: false } => {
            // Run collector with graceful shutdown
            tokio::select! {
                _ = node.run_gc() => {}
                _ = signal::ctrl_c() => {
                    info!("Received shutdown signal (Ctrl+C)");
                }
                _ = shutdown_signal() => {
                    info!("Received shutdown signal (SIGTERM)");
                }
            }
        }
        Command::Multipass { command } => run_multipass(&node, command)?,
        Command::Version => {}
    }

    node.shutdown().await?;
    Ok(())
}

fn run_multipass(node: &WardenNode, command: MultipassCommand) -> Result<()> {
    let service = node.multipass()?;

    match command {
        MultipassCommand::Create {
            owner,
            tenant,
            service_account,
            description,
            ttl,
        } => {
            let ttl = match ttl {
                Some(ttl) => parse_duration(&ttl).map_err(anyhow::Error::msg)?,
                None => Duration::from_secs(node.config().multipass.default_ttl_secs),
            };
            let multipass = service.create(&subject(owner, tenant, service_account), description, ttl)?;
            print_json(&multipass.redacted())?;
        }
        MultipassCommand::Issue { uuid } => {
            println!("{}", service.issue_new_generation(&uuid)?);
        }
        MultipassCommand::Verify { uuid, jti } => {
            let current = service.verify(&uuid, &jti)?;
            let renewable = current && service.can_renew(&uuid, &jti)?;
            print_json(&serde_json::json!({ "valid": current, "renewable": renewable }))?;
        }
        MultipassCommand::Authenticate { token } => {
            let (claims, multipass) = service
                .authenticate(&token)
                .context("Token rejected")?;
            print_json(&serde_json::json!({ "claims": claims, "multipass": multipass }))?;
        }
        MultipassCommand::Revoke { uuid } => {
            let generation = service.revoke(&uuid)?;
            info!("Multipass {} revoked at generation {}", uuid, generation);
        }
        MultipassCommand::Delete { uuid } => {
            service.delete(&uuid)?;
        }
        MultipassCommand::List => {
            print_json(&service.list()?)?;
        }
    }
    Ok(())
}

/// Cross-platform shutdown signal handling
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!("Failed to register SIGTERM handler: {}", e);
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    // On non-Unix systems, only Ctrl+C is supported
    std::future::pending::<()>().await
}
