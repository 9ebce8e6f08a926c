use std::env;
use std::str::FromStr;

use thiserror::Error;

use crate::application::matching_service::MatchingSettings;
use crate::domain::errors::DomainError;
use crate::domain::geo::validate_radius;
use crate::domain::ranking::RankingWeights;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} must be a valid number, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

/// Process configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub pool_size: u32,
    pub matching: MatchingSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "PORT", 8080u16)?;
        let pool_size = parse_or(&lookup, "DATABASE_POOL_SIZE", 10u32)?;

        let defaults = RankingWeights::default();
        let weights = RankingWeights::new(
            parse_or(&lookup, "RANKING_WEIGHT_RATING", defaults.rating())?,
            parse_or(&lookup, "RANKING_WEIGHT_EXPERIENCE", defaults.experience())?,
            parse_or(&lookup, "RANKING_WEIGHT_PRICE", defaults.price())?,
            parse_or(&lookup, "RANKING_WEIGHT_PROXIMITY", defaults.proximity())?,
        )?;
        let default_radius_km = validate_radius(parse_or(&lookup, "MATCHING_RADIUS_KM", 15.0)?)?;

        Ok(Self {
            database_url,
            host,
            port,
            pool_size,
            matching: MatchingSettings {
                default_radius_km,
                weights,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_is_set() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/leads")]).expect("config loads");

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.matching.default_radius_km, 15.0);
        assert_eq!(config.matching.weights, RankingWeights::default());
    }

    #[test]
    fn database_url_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("DATABASE_URL"))));
    }

    #[test]
    fn weights_must_sum_to_one() {
        let err = load(&[
            ("DATABASE_URL", "postgres://localhost/leads"),
            ("RANKING_WEIGHT_PRICE", "0.9"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(DomainError::InvalidWeightConfiguration(_))
        ));
    }

    #[test]
    fn custom_weights_and_radius() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/leads"),
            ("RANKING_WEIGHT_RATING", "0.25"),
            ("RANKING_WEIGHT_EXPERIENCE", "0.25"),
            ("RANKING_WEIGHT_PRICE", "0.25"),
            ("RANKING_WEIGHT_PROXIMITY", "0.25"),
            ("MATCHING_RADIUS_KM", "30"),
            ("PORT", "9000"),
        ])
        .expect("config loads");
        assert_eq!(config.matching.weights.price(), 0.25);
        assert_eq!(config.matching.default_radius_km, 30.0);
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn unparsable_values_are_reported_by_name() {
        let err = load(&[("DATABASE_URL", "postgres://localhost/leads"), ("PORT", "http")]).unwrap_err();
        assert_eq!(err.to_string(), "PORT must be a valid number, got 'http'");

        let err = load(&[
            ("DATABASE_URL", "postgres://localhost/leads"),
            ("MATCHING_RADIUS_KM", "-5"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(DomainError::InvalidRadius(_))));
    }
}
