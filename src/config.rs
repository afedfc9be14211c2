use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub instance_url: String,
    pub api_version: String,
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Fields per call when a record must be fetched in slices
    pub throttle_batch_size: usize,
    /// Record types the client may materialize
    pub types: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            query: QueryConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            instance_url: "https://login.salesforce.com".to_string(),
            api_version: "58.0".to_string(),
            access_token: None,
            timeout_secs: 30,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            throttle_batch_size: crate::store::DEFAULT_THROTTLE_BATCH_SIZE,
            types: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional config file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        // Add default configuration
        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        // Add config file if it exists
        config = config.add_source(config::File::with_name("config").required(false));

        // Environment variables like SOBJECT_API__INSTANCE_URL
        config = config.add_source(
            config::Environment::with_prefix("SOBJECT")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("query.types")
                .try_parsing(true),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        Ok(app_config)
    }

    /// Access token from config, falling back to `SOBJECT_ACCESS_TOKEN`
    pub fn access_token(&self) -> anyhow::Result<String> {
        if let Some(token) = &self.api.access_token {
            return Ok(token.clone());
        }

        std::env::var("SOBJECT_ACCESS_TOKEN")
            .map_err(|_| anyhow::anyhow!("no access token configured (set SOBJECT_ACCESS_TOKEN)"))
    }

    /// Versioned service root
    pub fn base_url(&self) -> String {
        format!(
            "{}/services/data/v{}",
            self.api.instance_url.trim_end_matches('/'),
            self.api.api_version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.query.throttle_batch_size, 20);
        assert_eq!(
            config.base_url(),
            "https://login.salesforce.com/services/data/v58.0"
        );
    }

    #[test]
    fn test_explicit_token_wins() {
        let mut config = AppConfig::default();
        config.api.access_token = Some("abc".to_string());
        assert_eq!(config.access_token().unwrap(), "abc");
    }
}
