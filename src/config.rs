//! Engine configuration.
//!
//! Options use the upper-case names of the simulator's JSON configuration
//! file. Every section falls back to defaults that satisfy [`Config::validate`].

use crate::core::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Baseline random-key protocol options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct BaselineConfig {
    pub key_length: usize,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self { key_length: 2048 }
    }
}

/// BB84 options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Bb84Config {
    pub key_length: usize,
    /// Preparation/measurement angles in degrees
    pub basis: Vec<f64>,
    /// Maximum number of sifted bits sacrificed for the error estimate
    pub reconciliation_subset: usize,
    /// Sessions with an error rate at or above this value are rejected
    pub qber: f64,
}

impl Default for Bb84Config {
    fn default() -> Self {
        Self {
            key_length: 2048,
            basis: vec![0.0, 90.0],
            reconciliation_subset: 100,
            qber: 0.11,
        }
    }
}

/// E91 options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct E91Config {
    pub key_length: usize,
    pub basis_a: Vec<f64>,
    pub basis_b: Vec<f64>,
    /// Interceptor's measurement angles
    pub basis_e: Vec<f64>,
    pub chsh_a: [f64; 2],
    pub chsh_b: [f64; 2],
}

impl Default for E91Config {
    fn default() -> Self {
        Self {
            key_length: 2048,
            basis_a: vec![0.0, 90.0],
            basis_b: vec![0.0, 45.0, 135.0],
            basis_e: vec![0.0, 90.0],
            chsh_a: [0.0, 90.0],
            chsh_b: [45.0, 135.0],
        }
    }
}

/// Whole configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "APP_NAME")]
    pub app_name: String,
    #[serde(rename = "VERBOSE")]
    pub verbose: bool,
    #[serde(rename = "NoEncryption")]
    pub baseline: BaselineConfig,
    #[serde(rename = "BB84Protocol")]
    pub bb84: Bb84Config,
    #[serde(rename = "E91Protocol")]
    pub e91: E91Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "qkd-cipher".to_string(),
            verbose: false,
            baseline: BaselineConfig::default(),
            bb84: Bb84Config::default(),
            e91: E91Config::default(),
        }
    }
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Checks the recognised options against their allowed ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.baseline.validate()?;
        self.bb84.validate()?;
        self.e91.validate()
    }
}

pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn check_key_length(key_length: usize) -> Result<(), ConfigError> {
    if key_length == 0 {
        return Err(invalid("KEY_LENGTH", "must be a positive integer"));
    }
    Ok(())
}

fn check_angles(field: &'static str, angles: &[f64]) -> Result<(), ConfigError> {
    if angles.is_empty() {
        return Err(invalid(field, "at least one angle is required"));
    }
    if let Some(bad) = angles.iter().find(|a| !a.is_finite()) {
        return Err(invalid(field, format!("angle {bad} is not finite")));
    }
    Ok(())
}

fn check_subset(field: &'static str, chosen: &[f64; 2], basis: &[f64]) -> Result<(), ConfigError> {
    match chosen.iter().find(|angle| !basis.contains(*angle)) {
        Some(missing) => Err(invalid(
            field,
            format!("angle {missing} is not among the configured measurement angles"),
        )),
        None => Ok(()),
    }
}

impl BaselineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_key_length(self.key_length)
    }
}

impl Bb84Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_key_length(self.key_length)?;
        check_angles("BASIS", &self.basis)?;
        if !(0.0..1.0).contains(&self.qber) {
            return Err(invalid("QBER", format!("{} is outside [0, 1)", self.qber)));
        }
        Ok(())
    }
}

impl E91Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_key_length(self.key_length)?;
        check_angles("BASIS_A", &self.basis_a)?;
        check_angles("BASIS_B", &self.basis_b)?;
        check_angles("BASIS_E", &self.basis_e)?;
        check_subset("CHSH_A", &self.chsh_a, &self.basis_a)?;
        check_subset("CHSH_B", &self.chsh_b, &self.basis_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn parses_upper_case_option_names() {
        let config = Config::from_json_str(
            r#"{
                "VERBOSE": true,
                "NoEncryption": {"KEY_LENGTH": 64},
                "BB84Protocol": {"KEY_LENGTH": 512, "BASIS": [0, 45],
                                 "RECONCILIATION_SUBSET": 20, "QBER": 0.2},
                "E91Protocol": {"KEY_LENGTH": 256, "CHSH_A": [0, 90]}
            }"#,
        )
        .unwrap();

        assert!(config.verbose);
        assert_eq!(config.baseline.key_length, 64);
        assert_eq!(config.bb84.basis, vec![0.0, 45.0]);
        assert_eq!(config.bb84.reconciliation_subset, 20);
        assert_eq!(config.e91.key_length, 256);
        assert_eq!(config.e91.basis_b, E91Config::default().basis_b);
    }

    #[test]
    fn rejects_zero_key_length() {
        let err = Config::from_json_str(r#"{"NoEncryption": {"KEY_LENGTH": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "KEY_LENGTH", .. }));
    }

    #[test]
    fn rejects_threshold_of_one() {
        let err = Config::from_json_str(r#"{"BB84Protocol": {"QBER": 1.0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "QBER", .. }));
    }

    #[test]
    fn rejects_chsh_angle_outside_basis() {
        let err = Config::from_json_str(r#"{"E91Protocol": {"CHSH_B": [45, 60]}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "CHSH_B", .. }));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(Config::from_json_str("{"), Err(ConfigError::Json(_))));
    }
}
