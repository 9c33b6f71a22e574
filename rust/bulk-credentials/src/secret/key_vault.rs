//! Azure Key Vault secret provider.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use url::Url;

use super::{Backoff, Secret, SecretError, SecretProvider};

/// Key Vault REST API version.
const API_VERSION: &str = "7.4";

/// Resource the vault access token is requested for.
const VAULT_RESOURCE: &str = "https://vault.azure.net";

const VAULT_SCOPE: &str = "https://vault.azure.net/.default";

const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// How a [`KeyVault`] obtains its access token.
#[derive(Debug, Clone)]
pub enum KeyVaultAuth {
    /// A pre-acquired bearer token, used as is.
    Bearer(Secret),
    /// OAuth2 client credentials for a registered application.
    ClientCredentials {
        /// Directory the application is registered in.
        tenant_id: String,
        /// Application (client) id.
        client_id: String,
        /// Application secret.
        client_secret: Secret,
    },
    /// The hosting environment's managed identity.
    ///
    /// With an endpoint and header secret the App Service identity endpoint
    /// is used; without one the instance metadata service is queried.
    ManagedIdentity {
        /// Identity endpoint and the header secret it expects.
        endpoint: Option<(Url, Secret)>,
    },
}

struct AccessToken {
    value: Secret,
    refresh_at: Instant,
}

/// Secret provider backed by an Azure Key Vault.
///
/// Each call fetches the current secret version. Transient failures are
/// retried according to the configured [`Backoff`].
pub struct KeyVault {
    vault: Url,
    auth: KeyVaultAuth,
    client: reqwest::Client,
    backoff: Backoff,
    authority: Url,
    token: Mutex<Option<AccessToken>>,
}

impl std::fmt::Debug for KeyVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVault")
            .field("vault", &self.vault.as_str())
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl KeyVault {
    /// Create a provider for the vault at `vault` (e.g. `https://myvault.vault.azure.net/`).
    pub fn new(vault: Url, auth: KeyVaultAuth) -> Result<Self, SecretError> {
        if vault.cannot_be_a_base() {
            return Err(SecretError::Configuration(format!(
                "vault URI is not a base URL: {}",
                vault
            )));
        }
        let authority = Url::parse(DEFAULT_AUTHORITY)
            .map_err(|e| SecretError::Configuration(e.to_string()))?;
        Ok(Self {
            vault,
            auth,
            client: reqwest::Client::new(),
            backoff: Backoff::default(),
            authority,
            token: Mutex::new(None),
        })
    }

    /// Replace the retry policy.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Use a specific HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Use a different OAuth2 authority for client credentials.
    pub fn with_authority(mut self, authority: Url) -> Self {
        self.authority = authority;
        self
    }

    /// Base URL of the vault.
    pub fn vault(&self) -> &Url {
        &self.vault
    }

    fn secret_url(&self, name: &str) -> Result<Url, SecretError> {
        let mut url = self.vault.clone();
        url.path_segments_mut()
            .map_err(|_| SecretError::Configuration("vault URI cannot have a path".into()))?
            .pop_if_empty()
            .extend(["secrets", name]);
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        Ok(url)
    }

    async fn fetch(&self, name: &str) -> Result<Secret, SecretError> {
        let token = self.access_token().await?;
        let url = self.secret_url(name)?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(|e| SecretError::Transient(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SecretError::NotFound(name.to_string()));
        }
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                self.token.lock().await.take();
            }
            let body = response.text().await.unwrap_or_default();
            return Err(classify(status, body));
        }

        let bundle: SecretBundle = response
            .json()
            .await
            .map_err(|e| SecretError::Malformed(e.to_string()))?;
        Ok(Secret::new(bundle.value))
    }

    async fn access_token(&self) -> Result<Secret, SecretError> {
        if let KeyVaultAuth::Bearer(token) = &self.auth {
            return Ok(token.clone());
        }

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let token = self.request_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn request_token(&self) -> Result<AccessToken, SecretError> {
        let request = match &self.auth {
            KeyVaultAuth::Bearer(token) => {
                return Ok(AccessToken {
                    value: token.clone(),
                    refresh_at: Instant::now(),
                });
            }
            KeyVaultAuth::ClientCredentials {
                tenant_id,
                client_id,
                client_secret,
            } => {
                let mut url = self.authority.clone();
                url.path_segments_mut()
                    .map_err(|_| SecretError::Configuration("authority cannot have a path".into()))?
                    .pop_if_empty()
                    .extend([tenant_id.as_str(), "oauth2", "v2.0", "token"]);
                debug!(tenant_id = %tenant_id, "Requesting Key Vault token with client credentials");
                self.client.post(url).form(&[
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.expose()),
                    ("scope", VAULT_SCOPE),
                    ("grant_type", "client_credentials"),
                ])
            }
            KeyVaultAuth::ManagedIdentity {
                endpoint: Some((endpoint, header)),
            } => {
                debug!("Requesting Key Vault token from identity endpoint");
                self.client
                    .get(endpoint.clone())
                    .query(&[("resource", VAULT_RESOURCE), ("api-version", "2019-08-01")])
                    .header("X-IDENTITY-HEADER", header.expose())
            }
            KeyVaultAuth::ManagedIdentity { endpoint: None } => {
                debug!("Requesting Key Vault token from instance metadata service");
                self.client
                    .get(IMDS_ENDPOINT)
                    .query(&[("resource", VAULT_RESOURCE), ("api-version", "2018-02-01")])
                    .header("Metadata", "true")
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| SecretError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify(status, body));
        }

        let payload: TokenResponse = response
            .json()
            .await
            .map_err(|e| SecretError::Malformed(e.to_string()))?;

        let lifetime = payload
            .expires_in
            .and_then(|s| s.as_secs())
            .unwrap_or(3600)
            .saturating_sub(60)
            .max(60);

        Ok(AccessToken {
            value: Secret::new(payload.access_token),
            refresh_at: Instant::now() + Duration::from_secs(lifetime),
        })
    }
}

#[async_trait]
impl SecretProvider for KeyVault {
    #[instrument(skip(self), fields(vault = %self.vault))]
    async fn get_secret(&self, name: &str) -> Result<Secret, SecretError> {
        let vault = self;
        vault.backoff.retry(move || vault.fetch(name)).await
    }
}

/// Map an unsuccessful status to a retryable or permanent error.
fn classify(status: StatusCode, body: String) -> SecretError {
    match status.as_u16() {
        408 | 429 | 500 | 502 | 503 | 504 => SecretError::Transient(format!("{}: {}", status, body)),
        code => SecretError::Rejected {
            status: code,
            message: body,
        },
    }
}

#[derive(Deserialize)]
struct SecretBundle {
    value: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<Seconds>,
}

/// Token lifetimes arrive as numbers from AAD and as strings from IMDS.
#[derive(Deserialize)]
#[serde(untagged)]
enum Seconds {
    Number(u64),
    Text(String),
}

impl Seconds {
    fn as_secs(&self) -> Option<u64> {
        match self {
            Seconds::Number(n) => Some(*n),
            Seconds::Text(s) => s.parse().ok(),
        }
    }
}
