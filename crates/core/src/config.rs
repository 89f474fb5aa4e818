use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `INFLUENCER_DASH__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Directory holding `influencers.csv`, `posts.csv`, `tracking_data.csv`
    /// and `payouts.csv`.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Where exports are written. Must differ from `data_dir`, since
    /// `payouts.csv` exists in both.
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default = "default_log_json")]
    pub log_json: bool,
}

/// Presentation knobs for the rendered view model.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewConfig {
    /// Rows shown in leaderboards and charts. Summaries keep every row.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_data_dir() -> String {
    ".".to_string()
}
fn default_export_dir() -> String {
    "exports".to_string()
}
fn default_top_n() -> usize {
    10
}
fn default_log_json() -> bool {
    true
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            export_dir: default_export_dir(),
            view: ViewConfig::default(),
            log_json: default_log_json(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("INFLUENCER_DASH")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.data_dir, ".");
        assert_eq!(config.view.top_n, 10);
        assert!(config.log_json);
    }

    #[test]
    fn test_partial_deserialize_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"data_dir": "/srv/data", "view": {}}"#).unwrap();
        assert_eq!(config.data_dir, "/srv/data");
        assert_eq!(config.export_dir, "exports");
        assert_eq!(config.view.top_n, 10);
    }
}
