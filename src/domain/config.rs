//! Simulation configuration and validation.
//!
//! Configuration failures are fatal before the day loop starts; nothing
//! here is recovered at runtime.

use chrono::NaiveDate;

use super::error::HistsimError;
use super::execution::FillPolicy;
use crate::ports::config_port::ConfigPort;

const SECTION: &str = "simulation";

#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Earlier calendar start used only to populate lookback buffers.
    pub warmup_start: Option<NaiveDate>,
    pub initial_capital: f64,
    pub commission_per_share: f64,
    pub fill_policy: FillPolicy,
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), HistsimError> {
        if self.end_date < self.start_date {
            return Err(HistsimError::InvalidRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if let Some(warmup) = self.warmup_start {
            if warmup > self.start_date {
                return Err(HistsimError::ConfigInvalid {
                    section: SECTION.into(),
                    key: "warmup_start".into(),
                    reason: format!("{warmup} is after start_date {}", self.start_date),
                });
            }
        }
        if !(self.initial_capital > 0.0) {
            return Err(HistsimError::ConfigInvalid {
                section: SECTION.into(),
                key: "initial_capital".into(),
                reason: format!("{} is not positive", self.initial_capital),
            });
        }
        if self.commission_per_share < 0.0 {
            return Err(HistsimError::ConfigInvalid {
                section: SECTION.into(),
                key: "commission_per_share".into(),
                reason: format!("{} is negative", self.commission_per_share),
            });
        }
        Ok(())
    }

    /// Builds and validates a configuration from a `[simulation]` section.
    pub fn from_config(port: &dyn ConfigPort) -> Result<Self, HistsimError> {
        let config = SimConfig {
            start_date: required_date(port, "start_date")?,
            end_date: required_date(port, "end_date")?,
            warmup_start: optional_date(port, "warmup_start")?,
            initial_capital: port.get_double(SECTION, "initial_capital", 100_000.0),
            commission_per_share: port.get_double(SECTION, "commission_per_share", 0.0),
            fill_policy: fill_policy(port)?,
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate, HistsimError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| HistsimError::ConfigInvalid {
        section: SECTION.into(),
        key: key.into(),
        reason: format!("{value}: {e}"),
    })
}

fn required_date(port: &dyn ConfigPort, key: &str) -> Result<NaiveDate, HistsimError> {
    let value = port
        .get_string(SECTION, key)
        .ok_or_else(|| HistsimError::ConfigMissing {
            section: SECTION.into(),
            key: key.into(),
        })?;
    parse_date(key, &value)
}

fn optional_date(port: &dyn ConfigPort, key: &str) -> Result<Option<NaiveDate>, HistsimError> {
    port.get_string(SECTION, key)
        .map(|value| parse_date(key, &value))
        .transpose()
}

fn fill_policy(port: &dyn ConfigPort) -> Result<FillPolicy, HistsimError> {
    match port.get_string(SECTION, "fill_policy") {
        None => Ok(FillPolicy::CurrentBarClose),
        Some(value) => value
            .parse()
            .map_err(|reason: String| HistsimError::ConfigInvalid {
                section: SECTION.into(),
                key: "fill_policy".into(),
                reason,
            }),
    }
}
