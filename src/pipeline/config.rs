// src/pipeline/config.rs
use crate::error::{AuditError, Result};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::path::Path;

/// Every literal the pipeline relies on: column names, labels and the
/// inactivity window. Defaults match the roster and monthly exports the
/// tool was built for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Provider name column in the roster
    pub name_column: String,
    /// Last-login column in the roster
    pub last_login_column: String,
    /// chrono pattern for last-login values
    pub last_login_format: String,
    /// Providers whose last login is strictly older than this many days are inactive
    pub inactivity_days: i64,

    /// Substring used to find the status column in the monthly log
    pub status_hint: String,
    /// Substring used to find the category column in the monthly log
    pub category_hint: String,
    /// Status labels dropped from the monthly log (exact match)
    pub excluded_statuses: Vec<String>,
    /// Category labels dropped from the monthly log (exact match)
    pub excluded_categories: Vec<String>,
    /// Installer name column in the monthly log
    pub installer_column: String,
    /// Compare roster and installer names case-insensitively (always trimmed)
    pub fold_name_case: bool,

    /// Derived column holding the last login when it is past the window
    pub inactive_since_column: String,
    /// Derived column holding the provider name when it has no qualifying order
    pub without_service_column: String,

    /// Order-receipt column in the roster
    pub order_receipt_column: String,
    /// Order-receipt value whose providers are dropped from the final list (exact match)
    pub inactive_receipt_value: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            name_column: "Nome".to_string(),
            last_login_column: "Data do último login".to_string(),
            last_login_format: "%d/%m/%Y %H:%M:%S".to_string(),
            inactivity_days: 180,
            status_hint: "status".to_string(),
            category_hint: "categoria".to_string(),
            excluded_statuses: vec![
                "Cancelado".to_string(),
                "Confirmada".to_string(),
                "Agendada".to_string(),
                "Distribuida".to_string(),
            ],
            excluded_categories: vec![
                "Serviço loja".to_string(),
                "Frete móveis planejados".to_string(),
            ],
            installer_column: "NOME_INSTALADOR".to_string(),
            fold_name_case: true,
            inactive_since_column: "Data Inferior 6 meses".to_string(),
            without_service_column: "PRESTADOR SEM SERVIÇO".to_string(),
            order_receipt_column: "Recebimento de O.S".to_string(),
            inactive_receipt_value: "inativo".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load overrides from a YAML file; keys not present keep their defaults
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AuditError::Config(format!("failed to read '{}': {}", path.display(), e))
        })?;
        let config: PipelineConfig = serde_yaml::from_str(&content)
            .map_err(|e| AuditError::Config(format!("'{}': {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig =
            serde_yaml::from_str(content).map_err(|e| AuditError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.inactivity_days < 0 {
            return Err(AuditError::Config(format!(
                "inactivity_days must not be negative (got {})",
                self.inactivity_days
            )));
        }
        self.inactivity_window()?;
        if self.status_hint.is_empty() || self.category_hint.is_empty() {
            return Err(AuditError::Config(
                "column hints must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Inactivity window as a chrono duration
    pub fn inactivity_window(&self) -> Result<chrono::Duration> {
        chrono::Duration::try_days(self.inactivity_days).ok_or_else(|| {
            AuditError::Config(format!(
                "inactivity_days is out of range (got {})",
                self.inactivity_days
            ))
        })
    }

    /// Cutoff instant: logins strictly before it are inactive
    pub fn inactivity_threshold(&self, now: NaiveDateTime) -> Result<NaiveDateTime> {
        now.checked_sub_signed(self.inactivity_window()?)
            .ok_or_else(|| {
                AuditError::Config(format!(
                    "inactivity window of {} days reaches before the earliest representable date",
                    self.inactivity_days
                ))
            })
    }
}
