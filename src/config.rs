//! Client configuration: bank endpoint and credentials.
//!
//! Layered sources, most specific last: `~/.hbci/config.*`, a project-local
//! `config/hbci.*`, then `HBCI_`-prefixed environment overrides (e.g.
//! `HBCI_URL`, `HBCI_BANK_CODE`).

use std::env;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::domain::BankId;
use crate::error::Error;
use crate::segment::{DEFAULT_HBCI_VERSION, SUPPORTED_HBCI_VERSIONS};

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    /// Bank endpoint: an HTTPS URL or a `host:port` pair for the raw pipe.
    pub url: String,
    /// The institute's bank code (in Germany the Bankleitzahl).
    pub bank_code: String,
    /// ISO-3166 numeric country code; Germany when absent.
    pub country_code: Option<u16>,
    pub user_id: String,
    /// Absent for anonymous dialogs.
    pub pin: Option<String>,
    pub hbci_version: Option<u16>,
    pub timeout_ms: Option<u64>,
    pub product_name: Option<String>,
    pub product_version: Option<String>,
}

impl ClientConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let home = env::var("HOME").unwrap_or_else(|_| ".".into());
        let settings = Config::builder()
            .add_source(File::with_name(&format!("{home}/.hbci/config")).required(false))
            .add_source(File::with_name("config/hbci").required(false))
            .add_source(Environment::with_prefix("HBCI").separator("__"))
            .build()?;
        settings.try_deserialize()
    }

    pub fn bank_id(&self) -> Result<BankId, Error> {
        BankId::new(self.country_code.unwrap_or(280), self.bank_code.clone())
    }

    pub fn hbci_version(&self) -> Result<u16, Error> {
        let version = self.hbci_version.unwrap_or(DEFAULT_HBCI_VERSION);
        if !SUPPORTED_HBCI_VERSIONS.contains(&version) {
            return Err(Error::FieldConstraint {
                field: "ClientConfig.hbci_version",
                reason: format!(
                    "{version} is not one of the supported versions {SUPPORTED_HBCI_VERSIONS:?}"
                ),
            });
        }
        Ok(version)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(30_000))
    }
}
