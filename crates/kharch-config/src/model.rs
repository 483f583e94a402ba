use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ConfigError;

/// User preferences for presentation and settlement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "Config::default_currency_symbol")]
    pub currency_symbol: String,
    /// Amounts at or below this magnitude count as settled.
    #[serde(default = "Config::default_settlement_epsilon")]
    pub settlement_epsilon: f64,
    #[serde(default = "Config::default_ui_color_enabled")]
    pub ui_color_enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Optional custom directory for the expense store. Defaults to the platform data dir.
    pub data_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            currency_symbol: Self::default_currency_symbol(),
            settlement_epsilon: Self::default_settlement_epsilon(),
            ui_color_enabled: Self::default_ui_color_enabled(),
            data_root: None,
        }
    }
}

impl Config {
    pub fn default_currency_symbol() -> String {
        "₹".into()
    }

    pub fn default_settlement_epsilon() -> f64 {
        0.01
    }

    pub fn default_ui_color_enabled() -> bool {
        true
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.settlement_epsilon.is_finite() || self.settlement_epsilon <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "settlement_epsilon",
                reason: format!("must be a positive number, got {}", self.settlement_epsilon),
            });
        }
        if self.currency_symbol.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "currency_symbol",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn resolve_data_root(&self) -> PathBuf {
        if let Some(path) = &self.data_root {
            return path.clone();
        }

        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        base.join("kharch")
    }
}
