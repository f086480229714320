use crate::domain::model::{CatalogService, PriceQuery};
use crate::domain::settings::{Credentials, SettingsSnapshot};
use crate::utils::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Services offered by the courier, in the courier's order.
    async fn services(&self) -> Result<Vec<CatalogService>>;
}

#[async_trait]
pub trait PricingClient: Send + Sync {
    async fn price(&self, query: &PriceQuery) -> Result<f64>;
}

#[async_trait]
pub trait AuthClient: Send + Sync {
    async fn is_current_authenticated(&self) -> bool;
    async fn is_new_authenticated(&self, credentials: &Credentials) -> bool;
}

pub trait CredentialCache: Send + Sync {
    /// Drops any cached authentication result.
    fn invalidate(&self);
}

/// Everything the shipping method needs from one connected courier client.
pub trait CourierClient: ServiceCatalog + PricingClient + AuthClient + CredentialCache {}

impl<T> CourierClient for T where T: ServiceCatalog + PricingClient + AuthClient + CredentialCache {}

/// Builds courier clients for a set of credentials.
pub trait Connector: Send + Sync {
    type Client: CourierClient;

    fn connect(&self, credentials: &Credentials) -> Result<Self::Client>;
}

pub trait SettingsStore: Send + Sync {
    fn load(&self) -> impl std::future::Future<Output = Result<Option<SettingsSnapshot>>> + Send;
    fn save(
        &self,
        snapshot: &SettingsSnapshot,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
