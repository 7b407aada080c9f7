//! Hallgate binary: serves the access control API.
//!
//! `hallgate serve` wires the composition root (policy catalog, cache,
//! collaborators, engine) and runs the HTTP API. `hallgate policies`
//! prints the registered catalog and exits.
//!
//! This binary wires the in-memory directory as a demonstration
//! composition root; a production deployment substitutes directory and
//! permission implementations backed by the administration database.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use hallgate::api::{self, AppState};
use hallgate::cache::AccessCache;
use hallgate::config::HallgateConfig;
use hallgate::directory::memory::{InMemoryDirectory, InMemoryPermissions};
use hallgate::engine::AccessEngine;
use hallgate::logging;
use hallgate::policy::{catalog, PolicyRegistry};

#[derive(Parser)]
#[command(name = "hallgate", about = "Entity access control for the hall administration system")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the access control API server.
    Serve,
    /// Print the registered policy catalog and exit.
    Policies,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Policies => {
            logging::init_cli();
            print_policies()
        }
    }
}

async fn serve() -> Result<()> {
    let _logging_guard =
        logging::init_serve(Path::new("logs")).context("failed to initialise logging")?;

    let config = HallgateConfig::load().context("failed to load configuration")?;
    info!("hallgate starting");

    let registry = Arc::new(PolicyRegistry::new());
    catalog::register_defaults(&registry).context("failed to register policy catalog")?;
    info!(policies = registry.len(), "policy catalog registered");

    let cache = Arc::new(AccessCache::new(config.cache.capacity, config.cache.ttl()));

    // Demo collaborators. Production wires database-backed implementations
    // behind the same traits.
    let permissions = Arc::new(InMemoryPermissions::new());
    let directory = Arc::new(InMemoryDirectory::new());
    seed_demo_records(&directory, &permissions).await;
    info!("using in-memory demo directory");

    let engine = Arc::new(AccessEngine::new(
        Arc::clone(&registry),
        Arc::clone(&cache),
        permissions.clone(),
        directory,
        config.auth.admin_permission.clone(),
    ));

    let state = AppState {
        engine,
        registry,
        cache,
        permissions,
        admin_permission: config.auth.admin_permission.clone(),
        max_batch_size: config.server.max_batch_size,
        user_id_header: config.auth.user_id_header.clone(),
        user_email_header: config.auth.user_email_header.clone(),
    };

    api::serve(state, &config.server.bind_addr).await
}

fn print_policies() -> Result<()> {
    let registry = PolicyRegistry::new();
    catalog::register_defaults(&registry).context("failed to register policy catalog")?;
    for summary in registry.summaries() {
        println!(
            "{:<16} {:<14} {} - {}",
            summary.id, summary.entity_type, summary.name, summary.description
        );
    }
    Ok(())
}

/// Seed a small data set so the demo server answers something meaningful.
async fn seed_demo_records(directory: &InMemoryDirectory, permissions: &InMemoryPermissions) {
    permissions.grant("staff-1", "admin.full").await;
    permissions.grant("staff-2", "workers.viewAll").await;

    directory.add_contact("c-100", "maria@example.com").await;
    directory.add_worker("w-100", "c-100").await;
    directory.add_benefit("b-100", "w-100").await;

    directory.add_contact("c-200", "foreman@acme.example").await;
    directory.link_employer_contact("e-200", "c-200").await;
    directory.add_dispatch_job("j-200", "e-200").await;
}
