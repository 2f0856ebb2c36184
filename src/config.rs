use std::collections::HashMap;
use std::time::Duration;

use config::{Config as ConfigLib, ConfigError, Environment as EnvSource, File};
use serde::Deserialize;

use crate::credentials::{CertificationBag, Environment};
use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub credentials: Option<CredentialsConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// "production" or "integration"
    pub environment: String,
    /// Explicit endpoint override; wins over the environment constants
    #[serde(default)]
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

/// Paths to the three PEM files of the certification bag.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    pub client_certificate: String,
    pub client_private_key: String,
    pub server_certificate: String,
}

impl ServiceConfig {
    pub fn environment(&self) -> Result<Environment> {
        self.environment.parse()
    }

    /// Request timeout for the HTTP transport.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CredentialsConfig {
    /// Load the configured PEM files into a certification bag.
    pub fn load_bag(&self, environment: Environment) -> Result<CertificationBag> {
        CertificationBag::from_files(
            &self.client_certificate,
            &self.client_private_key,
            &self.server_certificate,
            environment,
        )
    }
}

impl Config {
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_with_sources(None)
    }

    pub fn load_with_sources(
        env_vars: Option<HashMap<String, String>>,
    ) -> std::result::Result<Self, ConfigError> {
        let mut builder = ConfigLib::builder()
            .set_default("service.environment", "integration")?
            .set_default("service.timeout_secs", 30)?
            .add_source(File::with_name("config/settings").required(false));

        // If env_vars is provided, we use it instead of system environment
        // This is to avoid systems variables pollution across tests
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // Should be in the format APP_SERVICE__ENVIRONMENT or
            // APP_CREDENTIALS__CLIENT_CERTIFICATE
            builder = builder.add_source(
                EnvSource::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::load().expect("Failed to load config");

        assert_eq!(config.service.environment, "integration");
        assert_eq!(config.service.timeout_secs, 30);
        assert!(config.service.endpoint.is_none());
        assert!(config.credentials.is_none());
        assert_eq!(
            config.service.environment().unwrap(),
            Environment::Integration
        );
    }

    #[test]
    fn test_env_config() {
        let mut env_vars = HashMap::new();
        env_vars.insert("service.environment".to_string(), "production".to_string());
        env_vars.insert(
            "service.endpoint".to_string(),
            "https://test.example/ws".to_string(),
        );
        env_vars.insert(
            "credentials.client_certificate".to_string(),
            "certs/client.crt".to_string(),
        );
        env_vars.insert(
            "credentials.client_private_key".to_string(),
            "certs/client.key".to_string(),
        );
        env_vars.insert(
            "credentials.server_certificate".to_string(),
            "certs/server.crt".to_string(),
        );

        let config = Config::load_with_sources(Some(env_vars)).expect("Failed to load config");

        assert_eq!(
            config.service.environment().unwrap(),
            Environment::Production
        );
        assert_eq!(
            config.service.endpoint.as_deref(),
            Some("https://test.example/ws")
        );
        let credentials = config.credentials.unwrap();
        assert_eq!(credentials.client_certificate, "certs/client.crt");
        assert_eq!(credentials.server_certificate, "certs/server.crt");
    }

    #[test]
    fn test_partial_env_override() {
        let mut env_vars = HashMap::new();
        // We just override the timeout
        env_vars.insert("service.timeout_secs".to_string(), "5".to_string());

        let config = Config::load_with_sources(Some(env_vars)).expect("Failed to load config");

        assert_eq!(config.service.timeout_secs, 5);
        assert_eq!(config.service.timeout(), Duration::from_secs(5));
        // The other values should use default
        assert_eq!(config.service.environment, "integration");
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_unrecognized_environment_is_configuration_error() {
        let mut env_vars = HashMap::new();
        env_vars.insert("service.environment".to_string(), "staging".to_string());

        let config = Config::load_with_sources(Some(env_vars)).expect("Failed to load config");
        assert!(config.service.environment().is_err());
    }
}
