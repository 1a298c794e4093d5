//! Arbiter Configuration - scoring weights, action speeds and artifact paths
//! as operator-tunable TOML values
//!
//! Each struct implements `Default` with values from [`super::defaults`], so a
//! missing file (or a missing key) behaves exactly like the built-in rules.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;
use crate::types::TripObservation;

// ============================================================================
// Config Provenance
// ============================================================================

/// Dotted key paths explicitly present in the loaded TOML file.
///
/// After deserialization every `#[serde(default)]` field has a value; this
/// keeps the distinction so startup logging can report what was overridden.
#[derive(Debug, Clone, Default)]
pub struct ConfigProvenance {
    pub explicit_keys: HashSet<String>,
    /// File the config came from (`None` = built-in defaults)
    pub source: Option<PathBuf>,
}

impl ConfigProvenance {
    pub fn is_user_set(&self, dotted_key: &str) -> bool {
        self.explicit_keys.contains(dotted_key)
    }
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one arbiter deployment.
///
/// Load with [`ArbiterConfig::load`] which searches:
/// 1. an explicit path (the `--config` flag)
/// 2. `$BLOCK_ARBITER_CONFIG`
/// 3. `./block_arbiter.toml`
/// 4. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArbiterConfig {
    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    /// Equal-priority heuristic scoring
    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub actions: ActionsConfig,

    /// Reference table loading and lookup policy
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Conflict detection severity bands
    #[serde(default)]
    pub detection: DetectionConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ArbiterConfig {
    /// Load configuration using the standard search order.
    ///
    /// An explicit path that fails to load is an error; the implicit
    /// locations fall back to defaults with a warning.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigProvenance), ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from_file_with_provenance(path);
        }

        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file_with_provenance(&p) {
                    Ok(loaded) => return Ok(loaded),
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", defaults::CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", defaults::CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file_with_provenance(&local) {
                Ok(loaded) => return Ok(loaded),
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", defaults::LOCAL_CONFIG_FILE);
                }
            }
        }

        Ok((Self::default(), ConfigProvenance::default()))
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file_with_provenance(
        path: &Path,
    ) -> Result<(Self, ConfigProvenance), ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let (config, mut provenance) = Self::from_toml_str(&contents)
            .map_err(|e| match e {
                ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
                other => other,
            })?;
        provenance.source = Some(path.to_path_buf());
        info!(path = %path.display(), keys = provenance.explicit_keys.len(), "Loaded arbiter config");
        Ok((config, provenance))
    }

    /// Parse and validate a TOML document.
    ///
    /// Two passes: unknown keys are reported as warnings first, then serde
    /// deserialization and semantic validation run.
    pub fn from_toml_str(contents: &str) -> Result<(Self, ConfigProvenance), ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let provenance = ConfigProvenance {
            explicit_keys: super::validation::walk_toml_keys(
                &contents
                    .parse::<toml::Value>()
                    .unwrap_or(toml::Value::Table(toml::map::Map::default())),
                "",
            )
            .into_iter()
            .collect(),
            source: None,
        };

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok((config, provenance))
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all values for internal consistency.
    ///
    /// Rules:
    /// - Scoring weights and bonuses are finite and non-negative
    /// - Haul thresholds are ordered (medium < long)
    /// - Confidence base <= cap <= 100
    /// - Severity ratios are ordered and within (0, 1]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let s = &self.scoring;
        for (name, value) in [
            ("scoring.passenger_weight", s.passenger_weight),
            ("scoring.load_ratio_weight", s.load_ratio_weight),
            ("scoring.long_haul_km", s.long_haul_km),
            ("scoring.long_haul_bonus", s.long_haul_bonus),
            ("scoring.medium_haul_km", s.medium_haul_km),
            ("scoring.medium_haul_bonus", s.medium_haul_bonus),
            ("scoring.short_haul_bonus", s.short_haul_bonus),
            ("scoring.near_completion_km", s.near_completion_km),
            ("scoring.near_completion_bonus", s.near_completion_bonus),
            ("scoring.confidence_base", s.confidence_base),
            ("scoring.confidence_cap", s.confidence_cap),
        ] {
            Self::check_non_negative(value, name, &mut errors);
        }
        if s.medium_haul_km >= s.long_haul_km {
            errors.push(format!(
                "scoring.medium_haul_km ({:.1}) must be less than long_haul_km ({:.1})",
                s.medium_haul_km, s.long_haul_km
            ));
        }
        if s.confidence_base > s.confidence_cap {
            errors.push(format!(
                "scoring.confidence_base ({:.1}) must be <= confidence_cap ({:.1})",
                s.confidence_base, s.confidence_cap
            ));
        }
        if s.confidence_cap > 100.0 {
            errors.push(format!(
                "scoring.confidence_cap ({:.1}) must be <= 100",
                s.confidence_cap
            ));
        }

        let a = &self.actions;
        if a.reduced_speed_kmh <= a.hold_speed_kmh {
            errors.push(format!(
                "actions.reduced_speed_kmh ({}) must be greater than hold_speed_kmh ({})",
                a.reduced_speed_kmh, a.hold_speed_kmh
            ));
        }

        let sc = &self.schedule;
        for (name, value) in [
            ("schedule.default_passengers", sc.default_passengers),
            ("schedule.default_distance_km", sc.default_distance_km),
            ("schedule.default_travel_time_hr", sc.default_travel_time_hr),
            ("schedule.default_capacity", sc.default_capacity),
            ("schedule.default_clearance_min", sc.default_clearance_min),
            (
                "schedule.default_junction_clearance_min",
                sc.default_junction_clearance_min,
            ),
        ] {
            Self::check_non_negative(value, name, &mut errors);
        }

        let d = &self.detection;
        if !d.default_approach_speed_kmh.is_finite() || d.default_approach_speed_kmh <= 0.0 {
            errors.push(format!(
                "detection.default_approach_speed_kmh must be > 0 (used as divisor), got {}",
                d.default_approach_speed_kmh
            ));
        }
        Self::check_bands(
            d.block_critical_ratio,
            d.block_high_ratio,
            "detection.block",
            &mut errors,
        );
        Self::check_bands(
            d.junction_critical_ratio,
            d.junction_high_ratio,
            "detection.junction",
            &mut errors,
        );

        let (range_errors, range_warnings) = super::validation::validate_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_non_negative(value: f64, name: &str, errors: &mut Vec<String>) {
        // NaN comparisons silently pass, so check finiteness first
        if !value.is_finite() {
            errors.push(format!("{name}: value must be finite (got {value})"));
        } else if value < 0.0 {
            errors.push(format!("{name}: value must be >= 0 (got {value})"));
        }
    }

    fn check_bands(critical: f64, high: f64, name: &str, errors: &mut Vec<String>) {
        if !critical.is_finite() || !high.is_finite() {
            errors.push(format!(
                "{name}: ratios must be finite (got critical={critical}, high={high})"
            ));
            return;
        }
        if critical <= 0.0 || high > 1.0 || critical >= high {
            errors.push(format!(
                "{name}: need 0 < critical_ratio ({critical:.2}) < high_ratio ({high:.2}) <= 1"
            ));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            Self::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            Self::Serialize(e) => write!(f, "Config serialization error: {e}"),
            Self::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Sections
// ============================================================================

/// Paths of the read-only artifacts loaded at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Decision forest JSON
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Reference table CSV. Without one, lookups are unavailable and
    /// decisions carry no train details.
    #[serde(default)]
    pub schedule_path: Option<PathBuf>,
}

fn default_model_path() -> PathBuf {
    PathBuf::from(defaults::MODEL_PATH)
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            schedule_path: None,
        }
    }
}

/// Weights and bonuses of the equal-priority score:
///
/// `passengers * passenger_weight + load_ratio * load_ratio_weight
///  + distance_bonus + near_completion_bonus`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_passenger_weight")]
    pub passenger_weight: f64,
    #[serde(default = "default_load_ratio_weight")]
    pub load_ratio_weight: f64,
    #[serde(default = "default_long_haul_km")]
    pub long_haul_km: f64,
    #[serde(default = "default_long_haul_bonus")]
    pub long_haul_bonus: f64,
    #[serde(default = "default_medium_haul_km")]
    pub medium_haul_km: f64,
    #[serde(default = "default_medium_haul_bonus")]
    pub medium_haul_bonus: f64,
    #[serde(default = "default_short_haul_bonus")]
    pub short_haul_bonus: f64,
    #[serde(default = "default_near_completion_km")]
    pub near_completion_km: f64,
    #[serde(default = "default_near_completion_bonus")]
    pub near_completion_bonus: f64,
    /// Percent
    #[serde(default = "default_confidence_base")]
    pub confidence_base: f64,
    /// Percent
    #[serde(default = "default_confidence_cap")]
    pub confidence_cap: f64,
}

fn default_passenger_weight() -> f64 { defaults::PASSENGER_WEIGHT }
fn default_load_ratio_weight() -> f64 { defaults::LOAD_RATIO_WEIGHT }
fn default_long_haul_km() -> f64 { defaults::LONG_HAUL_KM }
fn default_long_haul_bonus() -> f64 { defaults::LONG_HAUL_BONUS }
fn default_medium_haul_km() -> f64 { defaults::MEDIUM_HAUL_KM }
fn default_medium_haul_bonus() -> f64 { defaults::MEDIUM_HAUL_BONUS }
fn default_short_haul_bonus() -> f64 { defaults::SHORT_HAUL_BONUS }
fn default_near_completion_km() -> f64 { defaults::NEAR_COMPLETION_KM }
fn default_near_completion_bonus() -> f64 { defaults::NEAR_COMPLETION_BONUS }
fn default_confidence_base() -> f64 { defaults::CONFIDENCE_BASE }
fn default_confidence_cap() -> f64 { defaults::CONFIDENCE_CAP }

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            passenger_weight: default_passenger_weight(),
            load_ratio_weight: default_load_ratio_weight(),
            long_haul_km: default_long_haul_km(),
            long_haul_bonus: default_long_haul_bonus(),
            medium_haul_km: default_medium_haul_km(),
            medium_haul_bonus: default_medium_haul_bonus(),
            short_haul_bonus: default_short_haul_bonus(),
            near_completion_km: default_near_completion_km(),
            near_completion_bonus: default_near_completion_bonus(),
            confidence_base: default_confidence_base(),
            confidence_cap: default_confidence_cap(),
        }
    }
}

/// Speeds attached to each action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionsConfig {
    #[serde(default = "default_reduced_speed_kmh")]
    pub reduced_speed_kmh: u32,
    #[serde(default = "default_hold_speed_kmh")]
    pub hold_speed_kmh: u32,
}

fn default_reduced_speed_kmh() -> u32 { defaults::REDUCED_SPEED_KMH }
fn default_hold_speed_kmh() -> u32 { defaults::HOLD_SPEED_KMH }

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            reduced_speed_kmh: default_reduced_speed_kmh(),
            hold_speed_kmh: default_hold_speed_kmh(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Fail a decision with a lookup error when a named train is not in the
    /// loaded table (otherwise the details are just omitted).
    #[serde(default)]
    pub require_known_trains: bool,
    /// Trip attributes for rows that omit them (conflict resolution input)
    #[serde(default = "default_passengers")]
    pub default_passengers: f64,
    #[serde(default = "default_distance_km")]
    pub default_distance_km: f64,
    #[serde(default = "default_travel_time_hr")]
    pub default_travel_time_hr: f64,
    #[serde(default = "default_capacity")]
    pub default_capacity: f64,
    #[serde(default = "default_clearance_min")]
    pub default_clearance_min: f64,
    #[serde(default = "default_junction_clearance_min")]
    pub default_junction_clearance_min: f64,
}

fn default_passengers() -> f64 { defaults::DEFAULT_PASSENGERS }
fn default_distance_km() -> f64 { defaults::DEFAULT_DISTANCE_KM }
fn default_travel_time_hr() -> f64 { defaults::DEFAULT_TRAVEL_TIME_HR }
fn default_capacity() -> f64 { defaults::DEFAULT_TRAIN_CAPACITY }
fn default_clearance_min() -> f64 { defaults::DEFAULT_CLEARANCE_MIN }
fn default_junction_clearance_min() -> f64 { defaults::DEFAULT_JUNCTION_CLEARANCE_MIN }

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            require_known_trains: false,
            default_passengers: default_passengers(),
            default_distance_km: default_distance_km(),
            default_travel_time_hr: default_travel_time_hr(),
            default_capacity: default_capacity(),
            default_clearance_min: default_clearance_min(),
            default_junction_clearance_min: default_junction_clearance_min(),
        }
    }
}

impl ScheduleConfig {
    /// Trip used for a schedule row with no trip columns at all.
    pub const fn default_trip(&self) -> TripObservation {
        TripObservation {
            passengers: self.default_passengers,
            distance_km: self.default_distance_km,
            travel_time_hr: self.default_travel_time_hr,
            train_capacity: self.default_capacity,
            is_peak_hour: 0,
        }
    }
}

/// Severity bands are fractions of the required clearance: a gap below
/// `critical_ratio * clearance` is CRITICAL, below `high_ratio * clearance`
/// HIGH, anything else MEDIUM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_approach_speed_kmh")]
    pub default_approach_speed_kmh: f64,
    #[serde(default = "default_block_critical_ratio")]
    pub block_critical_ratio: f64,
    #[serde(default = "default_block_high_ratio")]
    pub block_high_ratio: f64,
    #[serde(default = "default_junction_critical_ratio")]
    pub junction_critical_ratio: f64,
    #[serde(default = "default_junction_high_ratio")]
    pub junction_high_ratio: f64,
}

fn default_approach_speed_kmh() -> f64 { defaults::DEFAULT_APPROACH_SPEED_KMH }
fn default_block_critical_ratio() -> f64 { 0.33 }
fn default_block_high_ratio() -> f64 { 0.67 }
fn default_junction_critical_ratio() -> f64 { 0.3 }
fn default_junction_high_ratio() -> f64 { 0.6 }

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            default_approach_speed_kmh: default_approach_speed_kmh(),
            block_critical_ratio: default_block_critical_ratio(),
            block_high_ratio: default_block_high_ratio(),
            junction_critical_ratio: default_junction_critical_ratio(),
            junction_high_ratio: default_junction_high_ratio(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Decision service bind address.
    ///
    /// Can be overridden by `ARBITER_SERVER_ADDR` env var or `--addr`.
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    defaults::SERVER_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON log lines (stderr)
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    defaults::LOG_LEVEL.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
