//! System-wide default constants.
//!
//! Every configurable value falls back to one of these. Grouped by subsystem
//! for easy discovery.

// ============================================================================
// Config discovery
// ============================================================================

/// Environment variable naming a TOML config file.
pub const CONFIG_ENV_VAR: &str = "BLOCK_ARBITER_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "block_arbiter.toml";

// ============================================================================
// Artifacts
// ============================================================================

/// Classifier artifact path.
pub const MODEL_PATH: &str = "model.json";

// ============================================================================
// Equal-priority scoring
// ============================================================================

/// Score points per passenger.
pub const PASSENGER_WEIGHT: f64 = 0.1;

/// Score points for a completely full train (load ratio 1.0).
pub const LOAD_RATIO_WEIGHT: f64 = 50.0;

/// Trips longer than this earn the long-haul bonus (km, exclusive).
pub const LONG_HAUL_KM: f64 = 400.0;
pub const LONG_HAUL_BONUS: f64 = 30.0;

/// Trips longer than this earn the medium-haul bonus (km, exclusive).
pub const MEDIUM_HAUL_KM: f64 = 200.0;
pub const MEDIUM_HAUL_BONUS: f64 = 20.0;

/// Bonus for every other trip.
pub const SHORT_HAUL_BONUS: f64 = 10.0;

/// Trips shorter than this are close to completion (km, exclusive).
pub const NEAR_COMPLETION_KM: f64 = 150.0;
pub const NEAR_COMPLETION_BONUS: f64 = 15.0;

/// Heuristic confidence before the score gap is added (percent).
pub const CONFIDENCE_BASE: f64 = 70.0;

/// Heuristic confidence ceiling (percent).
pub const CONFIDENCE_CAP: f64 = 95.0;

// ============================================================================
// Actions
// ============================================================================

/// Speed restriction applied to the train that gives way (km/h).
pub const REDUCED_SPEED_KMH: u32 = 60;

/// Speed of a held train (km/h).
pub const HOLD_SPEED_KMH: u32 = 0;

// ============================================================================
// Schedule & conflict detection
// ============================================================================

/// Seat capacity assumed when a schedule row omits `train_capacity`.
pub const DEFAULT_TRAIN_CAPACITY: f64 = 800.0;

/// Trip attributes assumed when a schedule row omits them.
pub const DEFAULT_PASSENGERS: f64 = 600.0;
pub const DEFAULT_DISTANCE_KM: f64 = 300.0;
pub const DEFAULT_TRAVEL_TIME_HR: f64 = 5.0;

/// Block clearance when a row omits `clearance_min` (minutes).
pub const DEFAULT_CLEARANCE_MIN: f64 = 3.0;

/// Junction clearance when a row omits `junction_clearance_min` (minutes).
pub const DEFAULT_JUNCTION_CLEARANCE_MIN: f64 = 5.0;

/// Approach speed used when a train has no usable `max_speed` (km/h).
pub const DEFAULT_APPROACH_SPEED_KMH: f64 = 60.0;

// ============================================================================
// Server
// ============================================================================

/// Decision service bind address.
pub const SERVER_ADDR: &str = "0.0.0.0:5000";

// ============================================================================
// Logging
// ============================================================================

/// Log filter used when `RUST_LOG` is unset.
pub const LOG_LEVEL: &str = "info";
