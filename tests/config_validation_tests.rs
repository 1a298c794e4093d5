//! Config Validation Tests
//!
//! Typo detection (unknown keys with suggestions) and semantic validation of
//! `ArbiterConfig`, exercised independently from the rest of the pipeline.

use block_arbiter::config::validation::{
    known_config_keys, suggest_correction, validate_ranges, validate_unknown_keys,
};
use block_arbiter::config::{ArbiterConfig, ConfigError};

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_scoring_key_warns_with_suggestion() {
    let toml_str = r#"
[scoring]
near_completon_bonus = 15.0
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("near_completon_bonus"));
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("scoring.near_completion_bonus")
    );
}

#[test]
fn typo_in_section_name_warns() {
    let toml_str = r#"
[acions]
hold_speed_kmh = 0
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(warnings.iter().any(|w| w.field == "acions"));
    let section = warnings.iter().find(|w| w.field == "acions").unwrap();
    assert_eq!(section.suggestion.as_deref(), Some("actions"));
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
[artifacts]
model_path = "/opt/arbiter/model.json"
schedule_path = "/opt/arbiter/schedule.csv"

[scoring]
passenger_weight = 0.2
long_haul_bonus = 35.0

[actions]
reduced_speed_kmh = 45

[schedule]
require_known_trains = true

[detection]
junction_high_ratio = 0.7

[server]
addr = "127.0.0.1:8080"

[logging]
level = "debug"
json = true
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(warnings.is_empty(), "{warnings:?}");
}

#[test]
fn every_known_key_is_a_dotted_path_of_a_known_section() {
    let known = known_config_keys();
    for key in &known {
        if let Some((section, _)) = key.split_once('.') {
            assert!(known.contains(section), "section of {key} is not known");
        }
    }
}

#[test]
fn unrelated_key_gets_no_suggestion() {
    let known = known_config_keys();
    assert!(suggest_correction("rig.mud_weight_ppg", &known).is_none());
}

#[test]
fn unknown_keys_never_fail_the_load() {
    let (config, provenance) = ArbiterConfig::from_toml_str(
        r#"
[scoring]
pasenger_weight = 0.5
"#,
    )
    .unwrap();
    // The misspelled key is ignored, the default stays
    assert!((config.scoring.passenger_weight - 0.1).abs() < f64::EPSILON);
    assert!(provenance.is_user_set("scoring.pasenger_weight"));
}

// ============================================================================
// Semantic Validation
// ============================================================================

fn validation_errors(toml_str: &str) -> Vec<String> {
    match ArbiterConfig::from_toml_str(toml_str) {
        Err(ConfigError::Validation(errors)) => errors,
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[test]
fn negative_weight_rejected() {
    let errors = validation_errors("[scoring]\nload_ratio_weight = -5.0\n");
    assert!(errors.iter().any(|e| e.contains("scoring.load_ratio_weight")));
}

#[test]
fn inverted_haul_thresholds_rejected() {
    let errors = validation_errors("[scoring]\nmedium_haul_km = 500.0\n");
    assert!(errors.iter().any(|e| e.contains("medium_haul_km")));
}

#[test]
fn confidence_base_above_cap_rejected() {
    let errors = validation_errors("[scoring]\nconfidence_base = 96.0\n");
    assert!(errors.iter().any(|e| e.contains("confidence_base")));
}

#[test]
fn hold_speed_must_be_below_reduced_speed() {
    let errors = validation_errors("[actions]\nreduced_speed_kmh = 0\n");
    assert!(errors.iter().any(|e| e.contains("reduced_speed_kmh")));
}

#[test]
fn severity_bands_must_be_ordered() {
    let errors = validation_errors("[detection]\nblock_critical_ratio = 0.8\n");
    assert!(errors.iter().any(|e| e.contains("detection.block")));
}

#[test]
fn zero_approach_speed_rejected() {
    let errors = validation_errors("[detection]\ndefault_approach_speed_kmh = 0.0\n");
    assert!(errors.iter().any(|e| e.contains("default_approach_speed_kmh")));
}

#[test]
fn invalid_server_addr_rejected() {
    let errors = validation_errors("[server]\naddr = \"not-an-addr\"\n");
    assert!(errors.iter().any(|e| e.contains("server.addr")));
}

#[test]
fn all_errors_are_collected() {
    let errors = validation_errors(
        r#"
[scoring]
passenger_weight = -1.0
confidence_cap = 120.0

[actions]
reduced_speed_kmh = 0
"#,
    );
    assert!(errors.len() >= 3, "{errors:?}");
}

#[test]
fn high_reduced_speed_only_warns() {
    let mut config = ArbiterConfig::default();
    config.actions.reduced_speed_kmh = 250;
    let (errors, warnings) = validate_ranges(&config);
    assert!(errors.is_empty());
    assert_eq!(warnings.len(), 1);
    assert!(config.validate().is_ok());
}

#[test]
fn type_mismatch_is_parse_error() {
    let result = ArbiterConfig::from_toml_str("[actions]\nreduced_speed_kmh = \"fast\"\n");
    assert!(matches!(result, Err(ConfigError::Parse(..))));
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn explicit_path_loads_with_provenance() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("arbiter.toml");
    std::fs::write(&path, "[actions]\nreduced_speed_kmh = 40\n").unwrap();

    let (config, provenance) = ArbiterConfig::load(Some(path.as_path())).unwrap();
    assert_eq!(config.actions.reduced_speed_kmh, 40);
    assert_eq!(config.actions.hold_speed_kmh, 0);
    assert_eq!(provenance.source.as_deref(), Some(path.as_path()));
    assert!(provenance.is_user_set("actions.reduced_speed_kmh"));
    assert!(!provenance.is_user_set("actions.hold_speed_kmh"));
}

#[test]
fn explicit_missing_path_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = ArbiterConfig::load(Some(dir.path().join("absent.toml").as_path()));
    assert!(matches!(result, Err(ConfigError::Io(..))));
}

#[test]
fn config_round_trips_through_toml() {
    let mut config = ArbiterConfig::default();
    config.schedule.require_known_trains = true;
    config.detection.junction_high_ratio = 0.75;
    let text = config.to_toml().unwrap();

    let (reloaded, _) = ArbiterConfig::from_toml_str(&text).unwrap();
    assert!(reloaded.schedule.require_known_trains);
    assert!((reloaded.detection.junction_high_ratio - 0.75).abs() < f64::EPSILON);
}
