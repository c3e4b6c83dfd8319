//! Place-name geocoding with safety features
//!
//! Trip requests name cities, not street addresses. Resolution goes through
//! the `Geocoder` trait:
//! - `CityTableGeocoder` answers from a built-in table of major Indian cities
//! - `MockGeocoder` returns deterministic fake coordinates (tests, development)
//! - `RateLimitedNominatimGeocoder` tries the table first and only then asks
//!   Nominatim, behind a rate limiter and a circuit breaker
//!
//! The implementation is picked by `Config::geocoder_backend`.

use anyhow::Result;
use async_trait::async_trait;
use crate::config::{Config, GeocoderBackend};
use crate::types::Coordinates;

/// Geocoder trait - abstraction for all geocoding implementations
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a place name to coordinates
    /// Returns None if the place is unknown
    async fn geocode(&self, place: &str) -> Result<Option<GeocodingResult>>;

    /// Get the name of this geocoder implementation
    fn name(&self) -> &'static str;
}

/// Result of geocoding operation
#[derive(Debug, Clone)]
pub struct GeocodingResult {
    /// Latitude and longitude
    pub coordinates: Coordinates,
    /// Confidence score 0.0-1.0
    pub confidence: f64,
    /// Display name returned by geocoder
    pub display_name: String,
}


// ==========================================================================
// CityTableGeocoder Implementation
// ==========================================================================

/// Major Indian cities, keyed by lowercase name
const CITY_COORDINATES: &[(&str, f64, f64)] = &[
    ("bengaluru", 12.9716, 77.5946),
    ("bangalore", 12.9716, 77.5946),
    ("chennai", 13.0827, 80.2707),
    ("mumbai", 19.0760, 72.8777),
    ("delhi", 28.6139, 77.2090),
    ("new delhi", 28.6139, 77.2090),
    ("hyderabad", 17.3850, 78.4867),
    ("kolkata", 22.5726, 88.3639),
    ("pune", 18.5204, 73.8567),
    ("ahmedabad", 23.0225, 72.5714),
    ("jaipur", 26.9124, 75.7873),
    ("lucknow", 26.8467, 80.9462),
    ("kochi", 9.9312, 76.2673),
    ("nagpur", 21.1458, 79.0882),
    ("indore", 22.7196, 75.8577),
    ("bhopal", 23.2599, 77.4126),
    ("visakhapatnam", 17.6868, 83.2185),
    ("surat", 21.1702, 72.8311),
    ("coimbatore", 11.0168, 76.9558),
    ("thiruvananthapuram", 8.5241, 76.9366),
    ("goa", 15.2993, 74.1240),
    ("chandigarh", 30.7333, 76.7794),
    ("patna", 25.6093, 85.1376),
    ("ranchi", 23.3441, 85.3096),
    ("guwahati", 26.1445, 91.7362),
    ("mysuru", 12.2958, 76.6394),
    ("mysore", 12.2958, 76.6394),
    ("mangaluru", 12.9141, 74.8560),
    ("mangalore", 12.9141, 74.8560),
    ("vijayawada", 16.5062, 80.6480),
    ("madurai", 9.9252, 78.1198),
    ("varanasi", 25.3176, 82.9739),
];

/// Lowercase, trimmed, single-spaced form of a place name
fn normalize_place(place: &str) -> String {
    place
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Geocoder backed by the built-in city table
pub struct CityTableGeocoder;

impl CityTableGeocoder {
    pub fn new() -> Self {
        Self
    }

    pub fn lookup(place: &str) -> Option<Coordinates> {
        let key = normalize_place(place);
        CITY_COORDINATES
            .iter()
            .find(|(name, _, _)| *name == key)
            .map(|&(_, lat, lng)| Coordinates { lat, lng })
    }
}

impl Default for CityTableGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Geocoder for CityTableGeocoder {
    async fn geocode(&self, place: &str) -> Result<Option<GeocodingResult>> {
        Ok(Self::lookup(place).map(|coordinates| GeocodingResult {
            coordinates,
            confidence: 1.0,
            display_name: format!("{}, India", place.trim()),
        }))
    }

    fn name(&self) -> &'static str {
        "city-table"
    }
}

// ==========================================================================
// MockGeocoder Implementation
// ==========================================================================

/// Mock geocoder for testing - returns deterministic fake coordinates
pub struct MockGeocoder;

impl MockGeocoder {
    pub fn new() -> Self {
        Self
    }

    /// Generate deterministic coordinates from the place name hash
    /// Coordinates stay inside mainland India, away from the borders
    fn hash_to_coordinates(place: &str) -> Coordinates {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        normalize_place(place).hash(&mut hasher);
        let hash = hasher.finish();

        const LAT_MIN: f64 = 12.0;
        const LAT_MAX: f64 = 28.0;
        const LNG_MIN: f64 = 74.0;
        const LNG_MAX: f64 = 86.0;

        let lat_normalized = ((hash >> 32) as f64) / (u32::MAX as f64);
        let lng_normalized = ((hash & 0xFFFFFFFF) as f64) / (u32::MAX as f64);

        Coordinates {
            lat: LAT_MIN + lat_normalized * (LAT_MAX - LAT_MIN),
            lng: LNG_MIN + lng_normalized * (LNG_MAX - LNG_MIN),
        }
    }
}

impl Default for MockGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn geocode(&self, place: &str) -> Result<Option<GeocodingResult>> {
        Ok(Some(GeocodingResult {
            coordinates: Self::hash_to_coordinates(place),
            confidence: 0.95,
            display_name: format!("{}, India", place.trim()),
        }))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ==========================================================================
// RateLimiter Implementation
// ==========================================================================

use std::sync::Arc;
use tokio::sync::Mutex;
use std::time::{Duration, Instant};

/// Rate limiter that enforces minimum interval between calls
pub struct RateLimiter {
    last_call: Arc<Mutex<Option<Instant>>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_call: Arc::new(Mutex::new(None)),
            min_interval,
        }
    }

    /// Wait until it's safe to make another call
    pub async fn wait(&self) {
        let mut last = self.last_call.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                drop(last); // Release lock while sleeping
                tokio::time::sleep(wait_time).await;
                last = self.last_call.lock().await;
            }
        }

        *last = Some(Instant::now());
    }
}

// ==========================================================================
// CircuitBreaker Implementation
// ==========================================================================

use std::sync::atomic::{AtomicU32, Ordering};

/// Circuit breaker to prevent hammering a failing service
pub struct CircuitBreaker {
    failure_count: AtomicU32,
    threshold: u32,
    last_failure: Arc<Mutex<Option<Instant>>>,
    recovery_time: Duration,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, recovery_time: Duration) -> Self {
        Self {
            failure_count: AtomicU32::new(0),
            threshold,
            last_failure: Arc::new(Mutex::new(None)),
            recovery_time,
        }
    }

    /// Check if circuit is open (blocking calls)
    pub fn is_open(&self) -> bool {
        if self.failure_count.load(Ordering::Relaxed) < self.threshold {
            return false;
        }
        match self.last_failure.try_lock() {
            Ok(last) => !matches!(*last, Some(t) if t.elapsed() >= self.recovery_time),
            Err(_) => true,
        }
    }

    /// Record a failure
    pub fn record_failure(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_failure.try_lock() {
            *last = Some(Instant::now());
        }
    }

    /// Record a success (resets failure count)
    pub fn record_success(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
    }
}

// ==========================================================================
// RateLimitedNominatimGeocoder Implementation
// ==========================================================================

use crate::services::nominatim::NominatimClient;

/// Default circuit breaker threshold (3 failures)
const DEFAULT_CIRCUIT_BREAKER_THRESHOLD: u32 = 3;

/// Default circuit breaker recovery time (5 minutes)
const DEFAULT_CIRCUIT_BREAKER_RECOVERY_SECS: u64 = 300;

/// Nominatim geocoder with a local city table in front
///
/// Table hits never touch the network. Misses go to Nominatim with:
/// - Rate limiting: enforces minimum interval between requests
/// - Circuit breaker: stops requests after repeated failures
pub struct RateLimitedNominatimGeocoder {
    client: NominatimClient,
    rate_limiter: RateLimiter,
    /// Circuit breaker - pub(crate) for testing
    pub(crate) circuit_breaker: CircuitBreaker,
}

impl RateLimitedNominatimGeocoder {
    /// Create with custom configuration
    pub fn with_config(
        base_url: &str,
        rate_limit_interval: Duration,
        circuit_breaker_threshold: u32,
        circuit_breaker_recovery: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: NominatimClient::new(base_url)?,
            rate_limiter: RateLimiter::new(rate_limit_interval),
            circuit_breaker: CircuitBreaker::new(circuit_breaker_threshold, circuit_breaker_recovery),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_config(
            &config.nominatim_url,
            Duration::from_millis(config.nominatim_rate_limit_ms),
            DEFAULT_CIRCUIT_BREAKER_THRESHOLD,
            Duration::from_secs(DEFAULT_CIRCUIT_BREAKER_RECOVERY_SECS),
        )
    }
}

#[async_trait]
impl Geocoder for RateLimitedNominatimGeocoder {
    async fn geocode(&self, place: &str) -> Result<Option<GeocodingResult>> {
        if let Some(coordinates) = CityTableGeocoder::lookup(place) {
            tracing::debug!("Resolved '{}' from city table", place);
            return Ok(Some(GeocodingResult {
                coordinates,
                confidence: 1.0,
                display_name: format!("{}, India", place.trim()),
            }));
        }

        if self.circuit_breaker.is_open() {
            tracing::warn!("Circuit breaker is open, rejecting geocoding request");
            return Err(anyhow::anyhow!("Geocoding service temporarily unavailable (circuit breaker open)"));
        }

        self.rate_limiter.wait().await;

        match self.client.search(place).await {
            Ok(Some(found)) => {
                self.circuit_breaker.record_success();
                Ok(Some(GeocodingResult {
                    coordinates: found.coordinates,
                    confidence: 0.8, // Nominatim doesn't provide confidence, use default
                    display_name: found.display_name,
                }))
            }
            Ok(None) => {
                // No result found is not a failure
                self.circuit_breaker.record_success();
                Ok(None)
            }
            Err(e) => {
                self.circuit_breaker.record_failure();
                tracing::error!("Geocoding '{}' failed: {}", place, e);
                Err(e)
            }
        }
    }

    fn name(&self) -> &'static str {
        "nominatim"
    }
}

// ==========================================================================
// Factory function
// ==========================================================================

/// Create geocoder based on the configured backend
pub fn create_geocoder(config: &Config) -> Result<Box<dyn Geocoder>> {
    let geocoder: Box<dyn Geocoder> = match config.geocoder_backend {
        GeocoderBackend::Mock => {
            tracing::info!("Using MockGeocoder");
            Box::new(MockGeocoder::new())
        }
        GeocoderBackend::Table => {
            tracing::info!("Using CityTableGeocoder");
            Box::new(CityTableGeocoder::new())
        }
        GeocoderBackend::Nominatim => {
            tracing::info!("Using RateLimitedNominatimGeocoder at {}", config.nominatim_url);
            Box::new(RateLimitedNominatimGeocoder::from_config(config)?)
        }
    };
    Ok(geocoder)
}
