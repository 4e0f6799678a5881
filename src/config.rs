//! Admin settings
//!
//! `settings.json` is merged over the built-in defaults field by field:
//! a file that only sets `rates.markup` keeps every other default.

use crate::error::{EstimatorError, Result};
use estimator_common::{NegativeInputPolicy, RateSettings, Role};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MAPS_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";
pub const HUBSPOT_TOKEN_ENV: &str = "HUBSPOT_ACCESS_TOKEN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub rates: RateSettings,
    /// Role used when neither `--role` nor ESTIMATOR_ROLE is given
    pub role: Role,
    pub negative_inputs: NegativeInputPolicy,
    /// +/- fraction around the weighted benchmark
    pub guardrail_tolerance: f64,
    /// Origin for distance lookups
    pub shop_address: String,
    pub google_maps_api_key: Option<String>,
    pub hubspot_access_token: Option<String>,
    pub store_path: Option<PathBuf>,
    pub timeout_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rates: RateSettings::default(),
            role: Role::Estimator,
            negative_inputs: NegativeInputPolicy::Warn,
            guardrail_tolerance: 0.15,
            shop_address: String::new(),
            google_maps_api_key: None,
            hubspot_access_token: None,
            store_path: None,
            timeout_seconds: 30,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::settings_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("no settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::settings_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn settings_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| EstimatorError::Config("config directory not found".into()))?;
        Ok(dir.join("awning-estimator").join("settings.json"))
    }

    pub fn resolved_store_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.store_path {
            return Ok(path.clone());
        }
        let dir = dirs::data_dir()
            .ok_or_else(|| EstimatorError::Config("data directory not found".into()))?;
        Ok(dir.join("awning-estimator").join("cost-sheets.json"))
    }

    /// Environment first, then the settings file
    pub fn google_maps_api_key(&self) -> Result<String> {
        if let Ok(key) = std::env::var(MAPS_KEY_ENV) {
            return Ok(key);
        }
        self.google_maps_api_key
            .clone()
            .ok_or(EstimatorError::MissingApiKey("Google Maps API key", "googleMapsApiKey", MAPS_KEY_ENV))
    }

    pub fn hubspot_access_token(&self) -> Result<String> {
        if let Ok(token) = std::env::var(HUBSPOT_TOKEN_ENV) {
            return Ok(token);
        }
        self.hubspot_access_token
            .clone()
            .ok_or(EstimatorError::MissingApiKey("HubSpot access token", "hubspotAccessToken", HUBSPOT_TOKEN_ENV))
    }

    /// Apply one `key=value` edit from the CLI
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let number = || -> Result<f64> {
            value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| EstimatorError::Config(format!("{} expects a number, got '{}'", key, value)))
        };

        match key {
            "salesTaxRate" => self.rates.sales_tax_rate = number()?,
            "markup" => self.rates.markup = number()?,
            "laborRate" => self.rates.labor_rate = number()?,
            "driveTimeRate" => self.rates.drive_time_rate = number()?,
            "mileageRate" => self.rates.mileage_rate = number()?,
            "hotelRate" => self.rates.hotel_rate = number()?,
            "guardrailTolerance" => self.guardrail_tolerance = number()?,
            "timeoutSeconds" => {
                self.timeout_seconds = value
                    .trim()
                    .parse()
                    .map_err(|_| EstimatorError::Config(format!("timeoutSeconds expects seconds, got '{}'", value)))?
            }
            "role" => self.role = value.parse().map_err(EstimatorError::Config)?,
            "negativeInputs" => self.negative_inputs = value.parse().map_err(EstimatorError::Config)?,
            "shopAddress" => self.shop_address = value.to_string(),
            "googleMapsApiKey" => self.google_maps_api_key = non_empty(value),
            "hubspotAccessToken" => self.hubspot_access_token = non_empty(value),
            "storePath" => self.store_path = non_empty(value).map(PathBuf::from),
            _ => return Err(EstimatorError::Config(format!("unknown setting: {}", key))),
        }
        Ok(())
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
