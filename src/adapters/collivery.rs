use crate::config::toml_config::ColliveryConfig;
use crate::domain::model::{CatalogService, PriceQuery};
use crate::domain::ports::{AuthClient, Connector, CredentialCache, PricingClient, ServiceCatalog};
use crate::domain::settings::Credentials;
use crate::utils::error::{CredentialError, Result, ShippingError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    api_token: String,
}

#[derive(Debug, Deserialize)]
struct ServiceType {
    id: u32,
    text: String,
}

#[derive(Debug, Deserialize)]
struct QuoteLine {
    total: f64,
}

/// JSON client for the MDS Collivery API, bound to one account.
///
/// The API token from the first successful login is reused until the API
/// rejects it or [`CredentialCache::invalidate`] drops it.
pub struct ColliveryClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
    token: Mutex<Option<String>>,
}

impl ColliveryClient {
    pub fn new(config: &ColliveryConfig, credentials: Credentials) -> Result<Self> {
        let user_agent = config
            .app_name
            .clone()
            .unwrap_or_else(|| format!("mds-shipping/{}", env!("CARGO_PKG_VERSION")));
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
            token: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn cached_token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn login(&self, credentials: &Credentials) -> Result<String> {
        tracing::debug!("Logging in to {} as {}", self.base_url, credentials.username);
        let response = self
            .client
            .post(self.url("login"))
            .json(&serde_json::json!({
                "email": credentials.username,
                "password": credentials.password,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ShippingError::UnexpectedResponse {
                message: format!("login returned {}", response.status()),
            });
        }

        let envelope: Envelope<LoginData> = response.json().await?;
        if envelope.data.api_token.is_empty() {
            return Err(ShippingError::UnexpectedResponse {
                message: "login returned an empty api token".to_string(),
            });
        }
        Ok(envelope.data.api_token)
    }

    async fn token(&self) -> Result<String> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let token = self.login(&self.credentials).await?;
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        Ok(token)
    }

    /// Drops `rejected` if it is still the cached token, so the next call
    /// logs in again.
    fn forget_token(&self, rejected: &str) {
        let mut cached = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if cached.as_deref() == Some(rejected) {
            tracing::debug!("MDS api token was rejected, dropping it");
            *cached = None;
        }
    }
}

fn is_rejection(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

#[async_trait]
impl ServiceCatalog for ColliveryClient {
    async fn services(&self) -> Result<Vec<CatalogService>> {
        let token = self.token().await?;
        let response = self
            .client
            .get(self.url("service_types"))
            .query(&[("api_token", token.as_str())])
            .send()
            .await?;

        let status = response.status();
        if is_rejection(status) {
            self.forget_token(&token);
            return Err(CredentialError::NotAuthenticated.into());
        }
        if !status.is_success() {
            return Err(ShippingError::UnexpectedResponse {
                message: format!("service_types returned {}", status),
            });
        }

        let envelope: Envelope<Vec<ServiceType>> = response.json().await?;
        Ok(envelope
            .data
            .into_iter()
            .map(|s| CatalogService::new(s.id, s.text))
            .collect())
    }
}

#[async_trait]
impl PricingClient for ColliveryClient {
    async fn price(&self, query: &PriceQuery) -> Result<f64> {
        let lookup_failed = |message: String| ShippingError::PricingLookupFailed {
            service_id: query.service,
            message,
        };

        let token = self.token().await?;
        let response = self
            .client
            .post(self.url("quote"))
            .query(&[("api_token", token.as_str())])
            .json(query)
            .send()
            .await
            .map_err(|e| lookup_failed(e.to_string()))?;

        let status = response.status();
        if is_rejection(status) {
            self.forget_token(&token);
        }
        if !status.is_success() {
            return Err(lookup_failed(format!("quote returned {}", status)));
        }

        let envelope: Envelope<Vec<QuoteLine>> = response
            .json()
            .await
            .map_err(|e| lookup_failed(e.to_string()))?;

        envelope
            .data
            .first()
            .map(|line| line.total)
            .ok_or_else(|| lookup_failed("quote returned no prices".to_string()))
    }
}

#[async_trait]
impl AuthClient for ColliveryClient {
    /// Logs in when no token is cached, then checks the token with a
    /// service catalog request.
    async fn is_current_authenticated(&self) -> bool {
        match self.services().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Current MDS account is not authenticated: {}", e);
                false
            }
        }
    }

    async fn is_new_authenticated(&self, credentials: &Credentials) -> bool {
        match self.login(credentials).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("New MDS account details rejected: {}", e);
                false
            }
        }
    }
}

impl CredentialCache for ColliveryClient {
    fn invalidate(&self) {
        tracing::debug!("Dropping cached MDS api token");
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Connects [`ColliveryClient`]s from the `[collivery]` config section.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    config: ColliveryConfig,
}

impl HttpConnector {
    pub fn new(config: ColliveryConfig) -> Self {
        Self { config }
    }
}

impl Connector for HttpConnector {
    type Client = ColliveryClient;

    fn connect(&self, credentials: &Credentials) -> Result<ColliveryClient> {
        ColliveryClient::new(&self.config, credentials.clone())
    }
}
