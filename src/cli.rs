//! CLI argument parsing for the hos-worker binary.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "hos-worker", about = "Hours-of-service trip planning worker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the worker server (default if no subcommand given)
    Serve,
    /// Build a duty schedule from known distances and print it as JSON
    Schedule {
        /// Total trip distance in km
        #[arg(long)]
        distance_km: f64,
        /// Distance from the start to the pickup in km
        #[arg(long)]
        pickup_km: f64,
        /// Hours already used in the 70-hour cycle
        #[arg(long, default_value_t = 0.0)]
        cycle_used: f64,
        /// First day of the trip (YYYY-MM-DD), today if omitted
        #[arg(long)]
        start_date: Option<NaiveDate>,
    },
    /// Geocode, route and schedule a full trip and print it as JSON
    Plan {
        /// Current location of the driver
        #[arg(long)]
        from: String,
        /// Pickup location
        #[arg(long)]
        pickup: String,
        /// Dropoff location
        #[arg(long)]
        dropoff: String,
        /// Hours already used in the 70-hour cycle
        #[arg(long, default_value_t = 0.0)]
        cycle_used: f64,
        /// First day of the trip (YYYY-MM-DD), today if omitted
        #[arg(long)]
        start_date: Option<NaiveDate>,
    },
}
