//! HOS Worker - Hours-of-service compliant trip planning
//!
//! This worker connects to NATS and answers trip scheduling requests. The
//! `schedule` and `plan` subcommands run the same logic offline.

mod cli;
mod config;
mod error;
mod handlers;
mod hos;
mod services;
mod types;
mod validation;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::services::geocoding::create_geocoder;
use crate::services::routing::create_routing_service;
use crate::services::trip_planner::TripPlanner;
use crate::types::TripPlanRequest;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs directory - use LOGS_DIR env var or default to ../logs (relative to worker)
    let logs_dir = std::env::var("LOGS_DIR")
        .unwrap_or_else(|_| "../logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(
        Rotation::DAILY,
        &logs_dir,
        "hos-worker.log",
    );
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Offline commands print JSON on stdout, so their console logs go to stderr
    let console = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,hos_worker=debug".into()),
        ))
        .with(console)
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))  // file
        .init();

    let config = Config::from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::Schedule { distance_km, pickup_km, cycle_used, start_date } => {
            let start_date = start_date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let result = hos::schedule(distance_km, pickup_km, cycle_used, start_date)
                .context("Scheduling failed")?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Command::Plan { from, pickup, dropoff, cycle_used, start_date } => {
            let planner = TripPlanner::new(
                create_geocoder(&config)?,
                create_routing_service(config.osrm_url.as_deref())?,
            );
            let request = TripPlanRequest {
                current_location: from,
                pickup_location: pickup,
                dropoff_location: dropoff,
                current_cycle_used: cycle_used,
                start_date,
            };
            let plan = planner.plan(&request).await.context("Trip planning failed")?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
            Ok(())
        }
    }
}

async fn serve(config: &Config) -> Result<()> {
    info!("Starting HOS Worker...");

    // Connect to NATS (supports optional NATS_USER/NATS_PASSWORD auth).
    let nats_client = match (std::env::var("NATS_USER"), std::env::var("NATS_PASSWORD")) {
        (Ok(user), Ok(password)) if !user.is_empty() => {
            async_nats::ConnectOptions::new()
                .user_and_password(user, password)
                .connect(&config.nats_url)
                .await?
        }
        _ => async_nats::connect(&config.nats_url).await?,
    };
    info!("Connected to NATS at {}", config.nats_url);

    // Start message handlers
    let handler_result = handlers::start_handlers(nats_client, config).await;

    if let Err(e) = handler_result {
        error!("Handler error: {}", e);
        return Err(e);
    }

    Ok(())
}
