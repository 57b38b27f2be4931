//! launch-control: host for the Trantor session beacon.
//!
//! Runs the same tracker a browser page would, outside a browser: the page's
//! lifecycle signals arrive on stdin and beacons go to the collector named by
//! the embedding script attributes.
//!
//! ## Subcommands
//!
//! - `run`: load a page, then feed it signals from stdin until EOF
//! - `click`: report a single click event

mod drive;
mod host;
mod logging;

use beacon_core::{LaunchControlConfig, PageEnvironment, SessionLifecycleTracker};
use clap::{Parser, Subcommand};
use host::{Delivery, EmbedArgs};
use std::io;
use std::rc::Rc;

#[derive(Parser)]
#[command(name = "launch-control")]
#[command(about = "Trantor session beacon host")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a page and drive it with signals read from stdin
    Run {
        #[command(flatten)]
        embed: EmbedArgs,

        /// URL of the instrumented page (may carry ?src=<name>)
        #[arg(long, value_name = "URL")]
        url: String,

        /// Document title reported with session starts
        #[arg(long, default_value = "")]
        title: String,

        /// Print beacons to stdout instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Report one click event
    Click {
        #[command(flatten)]
        embed: EmbedArgs,

        /// Label of the clicked element
        #[arg(value_name = "LABEL")]
        label: String,

        /// Print the beacon to stdout instead of sending it
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let config = LaunchControlConfig::load();
    let _logging_guard = logging::init(
        config
            .as_ref()
            .ok()
            .and_then(|config| config.log_dir.as_deref()),
    );

    let config = match config {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "launch-control configuration invalid");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run {
            embed,
            url,
            title,
            dry_run,
        } => run(&config, &embed, &url, &title, dry_run),
        Commands::Click {
            embed,
            label,
            dry_run,
        } => click(&config, &embed, &label, dry_run),
    };

    if let Err(err) = result {
        tracing::error!(error = %err, "launch-control failed");
        std::process::exit(1);
    }
}

fn run(
    config: &LaunchControlConfig,
    embed: &EmbedArgs,
    url: &str,
    title: &str,
    dry_run: bool,
) -> Result<(), String> {
    let context = embed.tracking_context()?;
    let page = Rc::new(host::scripted_page(url, title)?);
    let delivery = Delivery::new(config, dry_run)?;

    tracing::info!(
        server = %context.server_url(),
        tracking_id = %context.tracking_id(),
        page = %url,
        "Page loaded"
    );

    let tracker = SessionLifecycleTracker::new(context, page.clone(), delivery.transport());
    tracker.initialize();

    let summary = drive::drive(tracker, &page, io::stdin().lock())?;
    tracing::info!(
        signals = summary.signals,
        clicks = summary.clicks,
        skipped = summary.skipped,
        final_url = %page.location(),
        "Page closed"
    );

    delivery.finish(config.flush_timeout());
    Ok(())
}

fn click(
    config: &LaunchControlConfig,
    embed: &EmbedArgs,
    label: &str,
    dry_run: bool,
) -> Result<(), String> {
    let context = embed.tracking_context()?;
    let delivery = Delivery::new(config, dry_run)?;
    // Never initialized: a click report alone opens no session.
    let page = Rc::new(host::scripted_page(context.server_url(), "")?);

    let tracker = SessionLifecycleTracker::new(context, page, delivery.transport());
    tracker.report_click(label);
    drop(tracker);

    delivery.finish(config.flush_timeout());
    Ok(())
}
