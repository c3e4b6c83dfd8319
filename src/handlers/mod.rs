//! NATS message handlers

pub mod ping;
pub mod trip;

use std::sync::Arc;
use anyhow::Result;
use async_nats::Client;
use tracing::{info, error};
use tokio::select;

use crate::config::Config;
use crate::hos::HosRules;
use crate::services::geocoding::create_geocoder;
use crate::services::routing::create_routing_service;
use crate::services::trip_planner::TripPlanner;

pub const SUBJECT_PING: &str = "hos.ping";
pub const SUBJECT_TRIP_SCHEDULE: &str = "hos.trip.schedule";
pub const SUBJECT_TRIP_PLAN: &str = "hos.trip.plan";

/// Start all message handlers
pub async fn start_handlers(client: Client, config: &Config) -> Result<()> {
    info!("Starting message handlers...");

    let rules = Arc::new(HosRules::default());

    let geocoder = create_geocoder(config)?;
    let routing_service = create_routing_service(config.osrm_url.as_deref())?;
    let geocoder_name = geocoder.name().to_string();
    let routing_name = routing_service.name().to_string();
    info!("Geocoder initialized: {}", geocoder_name);
    info!("Routing service initialized: {}", routing_name);

    let planner = Arc::new(TripPlanner::with_rules(
        geocoder,
        routing_service,
        (*rules).clone(),
    ));

    // Subscribe to all subjects
    let ping_sub = client.subscribe(SUBJECT_PING).await?;
    let schedule_sub = client.subscribe(SUBJECT_TRIP_SCHEDULE).await?;
    let plan_sub = client.subscribe(SUBJECT_TRIP_PLAN).await?;

    info!(
        "Subscribed to NATS subjects: {}, {}, {}",
        SUBJECT_PING, SUBJECT_TRIP_SCHEDULE, SUBJECT_TRIP_PLAN
    );

    let client_ping = client.clone();
    let client_schedule = client.clone();
    let client_plan = client.clone();

    let ping_handle = tokio::spawn(async move {
        ping::handle_ping(client_ping, ping_sub, geocoder_name, routing_name).await
    });

    let schedule_handle = tokio::spawn(async move {
        trip::handle_schedule(client_schedule, schedule_sub, rules).await
    });

    let plan_handle = tokio::spawn(async move {
        trip::handle_plan(client_plan, plan_sub, planner).await
    });

    info!("All handlers started, waiting for messages...");

    // Wait for any handler to finish (they shouldn't unless there's an error)
    select! {
        result = ping_handle => {
            error!("Ping handler finished: {:?}", result);
        }
        result = schedule_handle => {
            error!("Trip schedule handler finished: {:?}", result);
        }
        result = plan_handle => {
            error!("Trip plan handler finished: {:?}", result);
        }
    }

    Ok(())
}
