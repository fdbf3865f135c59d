use anyhow::Result;
use config::{Config, Environment, File};
use core_logic::{
    AmountRange, ConfigError, CredentialScope, DelayRange, EndpointPool, RpcEndpoint,
    ScheduleConfig,
};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_RPC_URL: &str = "https://tea-sepolia.g.alchemy.com/public";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TeaConfig {
    pub rpc_urls: Vec<String>,
    /// Queried from the primary endpoint when absent.
    pub chain_id: Option<u64>,
    pub accounts_file: String,
    /// Inline `privateKey,asset,...` pairs, merged with `accounts_file`.
    pub accounts: Option<String>,
    pub recipients_file: String,
    pub min_amount: f64,
    pub max_amount: f64,
    pub min_delay_secs: u64,
    pub max_delay_secs: u64,
    pub daily_transfers: u32,
    pub session_pause_mins: u64,
    pub wake_at: String,
    pub credential_scope: CredentialScope,
    pub confirmation_timeout_secs: u64,
    pub log_dir: String,
}

impl Default for TeaConfig {
    fn default() -> Self {
        Self {
            rpc_urls: vec![DEFAULT_RPC_URL.to_string()],
            chain_id: None,
            accounts_file: "accounts.txt".to_string(),
            accounts: None,
            recipients_file: "addresses.json".to_string(),
            min_amount: 0.01,
            max_amount: 0.1,
            min_delay_secs: 0,
            max_delay_secs: 0,
            daily_transfers: 100,
            session_pause_mins: 65,
            wake_at: "07:30".to_string(),
            credential_scope: CredentialScope::First,
            confirmation_timeout_secs: 180,
            log_dir: "logs".to_string(),
        }
    }
}

impl TeaConfig {
    /// Reads `path` if it exists, then applies `TEA_*` environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("TEA")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("rpc_urls"),
            )
            .build()?;

        settings.try_deserialize().map_err(|e| anyhow::anyhow!(e))
    }

    pub fn amount_range(&self) -> Result<AmountRange, ConfigError> {
        AmountRange::new(self.min_amount, self.max_amount)
    }

    pub fn delay_range(&self) -> Result<DelayRange, ConfigError> {
        DelayRange::new(self.min_delay_secs, self.max_delay_secs)
    }

    pub fn schedule(&self) -> Result<ScheduleConfig, ConfigError> {
        let wake_at = ScheduleConfig::parse_wake_at(&self.wake_at)?;
        Ok(ScheduleConfig::default()
            .with_daily_transfers(self.daily_transfers)
            .with_session_pause(Duration::from_secs(self.session_pause_mins * 60))
            .with_wake_at(wake_at))
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn endpoint_pool(&self) -> Result<EndpointPool, ConfigError> {
        if self.rpc_urls.is_empty() {
            return Err(ConfigError::MissingField {
                field: "rpc_urls".to_string(),
            });
        }
        EndpointPool::from_urls(&self.rpc_urls)
    }

    /// Validates `url` and appends it to the endpoint list.
    pub fn add_rpc_url(&mut self, url: &str) -> Result<RpcEndpoint, ConfigError> {
        let endpoint = RpcEndpoint::parse(url)?;
        self.rpc_urls.push(endpoint.as_str().to_string());
        Ok(endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = TeaConfig::load(path.to_str().unwrap()).unwrap();

        assert_eq!(config.rpc_urls, vec![DEFAULT_RPC_URL.to_string()]);
        assert_eq!(config.daily_transfers, 100);
        assert_eq!(config.credential_scope, CredentialScope::First);
        assert_eq!(
            config.schedule().unwrap().session_pause,
            Duration::from_secs(65 * 60)
        );
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
rpc_urls = ["https://a.example", "https://b.example"]
chain_id = 10218
min_amount = 1.0
max_amount = 2.0
max_delay_secs = 30
wake_at = "06:45"
credential_scope = "all"
"#
        )
        .unwrap();

        let config = TeaConfig::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.chain_id, Some(10218));
        assert_eq!(config.credential_scope, CredentialScope::All);
        assert_eq!(config.endpoint_pool().unwrap().len(), 2);
        assert_eq!(config.amount_range().unwrap().max(), 2.0);
        assert_eq!(config.delay_range().unwrap().max_secs(), 30);
        assert_eq!(config.schedule().unwrap().wake_at.to_string(), "06:45:00");
    }

    #[test]
    fn invalid_values_are_reported() {
        let config = TeaConfig {
            min_amount: 5.0,
            max_amount: 1.0,
            wake_at: "7am".to_string(),
            rpc_urls: vec!["ftp://nope".to_string()],
            ..TeaConfig::default()
        };

        assert!(config.amount_range().is_err());
        assert!(config.schedule().is_err());
        assert!(matches!(
            config.endpoint_pool(),
            Err(ConfigError::InvalidRpcUrl { .. })
        ));
    }

    #[test]
    fn added_rpc_urls_are_validated_and_appended() {
        let mut config = TeaConfig::default();

        let endpoint = config.add_rpc_url(" https://backup.example ").unwrap();
        assert_eq!(endpoint.as_str(), "https://backup.example/");
        assert!(config.add_rpc_url("ws://backup.example").is_err());

        assert_eq!(
            config.rpc_urls,
            vec![
                DEFAULT_RPC_URL.to_string(),
                "https://backup.example/".to_string()
            ]
        );
        assert_eq!(config.endpoint_pool().unwrap().len(), 2);
    }
}
