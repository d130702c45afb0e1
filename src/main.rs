use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use ld_app::LeadsView;
use ld_core::ports::LocationPort;
use ld_infra::{ChannelNotifier, MemoryLocation};
use leaddesk_lib::bootstrap::wiring::resolve_data_dir;
use leaddesk_lib::bootstrap::{init_tracing_subscriber, load_config, wire_controller};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "leaddesk")]
#[command(about = "Headless leads list client with offline tag sync", long_about = None)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: PathBuf,

    /// Initial list state as a query string, e.g. "search=acme&page=2"
    #[arg(short, long, default_value = "")]
    query: String,

    /// Exit after the first page instead of reconciling tags until Ctrl-C
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    let data_dir = resolve_data_dir(&config)?;
    init_tracing_subscriber(Some(&data_dir.join("logs")))?;

    let (notifier, mut notifications) = ChannelNotifier::new();
    let printer = tokio::spawn(async move {
        while let Some(notification) = notifications.recv().await {
            println!("{notification}");
        }
    });

    let location = Arc::new(MemoryLocation::new(cli.query));
    let location_port: Arc<dyn LocationPort> = location.clone();
    let wired = wire_controller(&config, Some(location_port), Arc::new(notifier))?;
    let controller = wired.controller;

    let tags = controller.tags().load().await;
    if let Err(err) = controller.saved_views().load().await {
        warn!(error = %err, "Continuing without saved views");
    }
    controller.mount().await;

    print_summary(&controller.view(), &location.query_string());
    println!(
        "{} tag(s) known, {} pending; {} saved view(s)",
        tags.len(),
        controller.tags().pending_count(),
        controller.saved_views().views().len()
    );

    if !cli.once {
        let reconcile = controller.tags().start_reconciliation();
        println!("Reconciling pending tags; press Ctrl-C to exit");
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        info!("Shutting down");
        if let Some(handle) = reconcile {
            handle.shutdown().await;
        }
    }

    controller.dispose();
    drop(controller);
    // Drain what was notified before shutdown.
    let _ = tokio::time::timeout(Duration::from_secs(1), printer).await;
    Ok(())
}

fn print_summary(view: &LeadsView, query: &str) {
    if let Some(failure) = &view.error {
        println!("Failed to load leads: {failure}");
    }

    let pagination = view.pagination.unwrap_or_default();
    println!(
        "Page {}/{} ({} leads total, {} shown)",
        pagination.page,
        pagination.total_pages,
        pagination.total,
        view.leads.len()
    );
    for lead in &view.leads {
        let tags: Vec<&str> = lead.tags.iter().map(|t| t.name.as_str()).collect();
        println!(
            "  #{:<6} {:<32} {:<14} {:<12} [{}]",
            lead.id,
            lead.name.as_deref().unwrap_or("-"),
            lead.source,
            lead.qa_status.as_str(),
            tags.join(", ")
        );
    }
    if !query.is_empty() {
        println!("Location: ?{query}");
    }
}
