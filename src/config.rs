//! Dashboard configuration, read from JSON and passed around explicitly.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chart::ChartType;
use crate::data::loader::FileSource;
use crate::data::model::Measure;
use crate::error::{DashboardError, Result};

/// Environment variable naming a config file to use instead of `dashboard.json`.
pub const CONFIG_ENV: &str = "ERP_DASHBOARD_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "dashboard.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Flat file the sales view reads and the query page writes.
    pub data_path: PathBuf,
    /// Where exports are written.
    pub export_dir: PathBuf,
    /// SQLite database used for ad-hoc queries, if any.
    pub database: Option<PathBuf>,
    pub default_chart: String,
    pub default_measure: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            data_path: Path::new("data").join("erp_sales_data.csv"),
            export_dir: PathBuf::from("."),
            database: None,
            default_chart: ChartType::Bar.to_string(),
            default_measure: Measure::InvoiceValue.to_string(),
        }
    }
}

impl DashboardConfig {
    /// Parse a JSON config; missing keys take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: DashboardConfig =
            serde_json::from_str(text).map_err(|e| DashboardError::Config(e.to_string()))?;
        config.chart_type()?;
        config.measure()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Resolve the config: `$ERP_DASHBOARD_CONFIG`, else `dashboard.json` if
    /// present, else defaults.
    pub fn resolve() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            log::info!("Using config from {path}");
            return Self::from_file(Path::new(&path));
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            log::info!("Using config from {DEFAULT_CONFIG_FILE}");
            return Self::from_file(local);
        }
        Ok(Self::default())
    }

    pub fn chart_type(&self) -> Result<ChartType> {
        self.default_chart.parse()
    }

    pub fn measure(&self) -> Result<Measure> {
        self.default_measure.parse()
    }

    /// The flat-file data source for the sales view.
    pub fn data_source(&self) -> FileSource {
        FileSource::new(&self.data_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_use_defaults() {
        let config = DashboardConfig::from_json(r#"{"database": "erp.db"}"#).unwrap();
        assert_eq!(config.database, Some(PathBuf::from("erp.db")));
        assert_eq!(config.data_path, Path::new("data").join("erp_sales_data.csv"));
        assert_eq!(config.chart_type().unwrap(), ChartType::Bar);
        assert_eq!(config.measure().unwrap(), Measure::InvoiceValue);
    }

    #[test]
    fn unknown_chart_name_is_invalid() {
        let err = DashboardConfig::from_json(r#"{"default_chart": "radar"}"#).unwrap_err();
        assert!(matches!(err, DashboardError::InvalidArgument(_)));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = DashboardConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, DashboardError::Config(_)));
    }
}
