//! Service configuration from the environment.

use std::net::SocketAddr;
use std::sync::Arc;

use bulk_credentials::{
    Address, DEFAULT_SECRET_NAME, KeyVault, KeyVaultAuth, Minter, Secret, SecretError,
    SecretProvider, StaticSecret,
};
use bulk_storage::Resolver;
use thiserror::Error;
use url::Url;

use crate::Service;

const DEFAULT_BIND: &str = "0.0.0.0:8080";

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    /// A variable is set to something unusable.
    #[error("Invalid value for {name}: {reason}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// What is wrong with the value.
        reason: String,
    },

    /// The secret provider could not be created.
    #[error("Cannot build secret provider: {0}")]
    Secret(#[from] SecretError),
}

/// Where the storage account key comes from.
#[derive(Debug, Clone)]
pub enum SecretSource {
    /// A fixed key, for local development.
    Static(Secret),
    /// A Key Vault secret.
    KeyVault {
        /// Vault base URL.
        uri: Url,
        /// How to authenticate to the vault.
        auth: KeyVaultAuth,
    },
}

/// Everything the service needs to start.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address.
    pub bind: SocketAddr,
    /// Storage account and blob endpoint.
    pub address: Address,
    /// Prefix of the per-file links returned by the listing.
    pub file_api_uri: String,
    /// Name of the secret holding the account key.
    pub secret_name: String,
    /// Where the account key is read from.
    pub secrets: SecretSource,
}

impl Config {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let bind = get("BULK_API_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "BULK_API_BIND",
                reason: e.to_string(),
            })?;

        let address = Address::new(
            require("storageAccountName")?,
            require("storageAccountFQDN")?,
        );
        address
            .endpoint_url()
            .map_err(|e| ConfigError::Invalid {
                name: "storageAccountFQDN",
                reason: e.to_string(),
            })?;

        let file_api_uri = require("getFileApiUri")?;
        let secret_name =
            get("BULK_API_SECRET_NAME").unwrap_or_else(|| DEFAULT_SECRET_NAME.to_string());

        let secrets = match get("STORAGE_ACCOUNT_KEY") {
            Some(key) => SecretSource::Static(Secret::new(key)),
            None => {
                let uri = parse_url("keyVaultUri", &require("keyVaultUri")?)?;
                SecretSource::KeyVault {
                    uri,
                    auth: key_vault_auth(&get)?,
                }
            }
        };

        Ok(Self {
            bind,
            address,
            file_api_uri,
            secret_name,
            secrets,
        })
    }

    /// Build the secret provider this configuration names.
    pub fn secret_provider(&self) -> Result<Arc<dyn SecretProvider>, ConfigError> {
        let provider: Arc<dyn SecretProvider> = match &self.secrets {
            SecretSource::Static(secret) => Arc::new(StaticSecret::from(secret.clone())),
            SecretSource::KeyVault { uri, auth } => {
                Arc::new(KeyVault::new(uri.clone(), auth.clone())?)
            }
        };
        Ok(provider)
    }

    /// Wire up the handler state.
    pub fn service(&self) -> Result<Service<Arc<dyn SecretProvider>>, ConfigError> {
        let minter = Minter::new(self.address.clone(), self.secret_provider()?)
            .with_secret_name(self.secret_name.clone());
        Ok(Service::new(minter, Resolver::new(self.file_api_uri.clone())))
    }
}

fn key_vault_auth<G>(get: &G) -> Result<KeyVaultAuth, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    if let Some(token) = get("AZURE_KEYVAULT_BEARER_TOKEN") {
        return Ok(KeyVaultAuth::Bearer(Secret::new(token)));
    }

    if let Some(client_secret) = get("AZURE_CLIENT_SECRET") {
        return Ok(KeyVaultAuth::ClientCredentials {
            tenant_id: get("AZURE_TENANT_ID").ok_or(ConfigError::Missing("AZURE_TENANT_ID"))?,
            client_id: get("AZURE_CLIENT_ID").ok_or(ConfigError::Missing("AZURE_CLIENT_ID"))?,
            client_secret: Secret::new(client_secret),
        });
    }

    let endpoint = match (get("IDENTITY_ENDPOINT"), get("IDENTITY_HEADER")) {
        (Some(endpoint), Some(header)) => {
            Some((parse_url("IDENTITY_ENDPOINT", &endpoint)?, Secret::new(header)))
        }
        _ => None,
    };
    Ok(KeyVaultAuth::ManagedIdentity { endpoint })
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value.trim()).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    const BASE: [(&str, &str); 4] = [
        ("storageAccountName", "myaccount"),
        ("storageAccountFQDN", "myaccount.blob.core.windows.net"),
        ("keyVaultUri", "https://myvault.vault.azure.net/"),
        ("getFileApiUri", "https://files.example.com/api/getFile?path="),
    ];

    fn with(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        BASE.iter().chain(extra.iter()).copied().collect()
    }

    #[test]
    fn it_reads_required_settings_with_defaults() {
        let config = Config::from_lookup(lookup(&BASE)).unwrap();

        assert_eq!(config.bind, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.address.account(), "myaccount");
        assert_eq!(config.secret_name, "Storage");
        assert_eq!(
            config.file_api_uri,
            "https://files.example.com/api/getFile?path="
        );
        assert!(matches!(
            config.secrets,
            SecretSource::KeyVault {
                auth: KeyVaultAuth::ManagedIdentity { endpoint: None },
                ..
            }
        ));
    }

    #[test]
    fn it_reports_missing_settings() {
        let vars: Vec<_> = BASE
            .iter()
            .copied()
            .filter(|(k, _)| *k != "getFileApiUri")
            .collect();

        assert!(matches!(
            Config::from_lookup(lookup(&vars)),
            Err(ConfigError::Missing("getFileApiUri"))
        ));
    }

    #[test]
    fn it_treats_empty_values_as_missing() {
        let vars = [
            ("storageAccountName", ""),
            ("storageAccountFQDN", "myaccount.blob.core.windows.net"),
        ];

        assert!(matches!(
            Config::from_lookup(lookup(&vars)),
            Err(ConfigError::Missing("storageAccountName"))
        ));
    }

    #[test]
    fn it_prefers_static_key_over_key_vault() {
        let vars = [
            ("storageAccountName", "devstoreaccount1"),
            ("storageAccountFQDN", "http://127.0.0.1:10000"),
            ("getFileApiUri", "http://localhost:8080/api/getFile?path="),
            ("STORAGE_ACCOUNT_KEY", "dGVzdC1rZXk="),
        ];
        let config = Config::from_lookup(lookup(&vars)).unwrap();

        assert!(matches!(config.secrets, SecretSource::Static(_)));
    }

    #[test]
    fn it_selects_key_vault_credentials() {
        let bearer = Config::from_lookup(lookup(&with(&[(
            "AZURE_KEYVAULT_BEARER_TOKEN",
            "token",
        )])))
        .unwrap();
        assert!(matches!(
            bearer.secrets,
            SecretSource::KeyVault {
                auth: KeyVaultAuth::Bearer(_),
                ..
            }
        ));

        let client = Config::from_lookup(lookup(&with(&[
            ("AZURE_TENANT_ID", "contoso"),
            ("AZURE_CLIENT_ID", "app"),
            ("AZURE_CLIENT_SECRET", "secret"),
        ])))
        .unwrap();
        assert!(matches!(
            client.secrets,
            SecretSource::KeyVault {
                auth: KeyVaultAuth::ClientCredentials { .. },
                ..
            }
        ));

        let identity = Config::from_lookup(lookup(&with(&[
            ("IDENTITY_ENDPOINT", "http://localhost:42356/msi/token"),
            ("IDENTITY_HEADER", "header"),
        ])))
        .unwrap();
        assert!(matches!(
            identity.secrets,
            SecretSource::KeyVault {
                auth: KeyVaultAuth::ManagedIdentity { endpoint: Some(_) },
                ..
            }
        ));
    }

    #[test]
    fn it_requires_complete_client_credentials() {
        let result = Config::from_lookup(lookup(&with(&[("AZURE_CLIENT_SECRET", "secret")])));

        assert!(matches!(
            result,
            Err(ConfigError::Missing("AZURE_TENANT_ID"))
        ));
    }

    #[test]
    fn it_rejects_invalid_bind_address() {
        let result = Config::from_lookup(lookup(&with(&[("BULK_API_BIND", "nowhere")])));

        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                name: "BULK_API_BIND",
                ..
            })
        ));
    }

    #[test]
    fn it_builds_service() {
        let config = Config::from_lookup(lookup(&BASE)).unwrap();
        let service = config.service().unwrap();

        assert_eq!(service.minter().address().account(), "myaccount");
        assert_eq!(
            service.resolver().base_uri(),
            "https://files.example.com/api/getFile?path="
        );
    }
}
