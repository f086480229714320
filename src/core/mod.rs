pub mod credentials;
pub mod diagnostic_log;
pub mod pricing;
pub mod rates;
pub mod shipping_method;

pub use crate::domain::model::{CatalogService, Package, PriceQuery, Rate};
pub use crate::domain::ports::{AuthClient, Connector, CredentialCache, PricingClient, ServiceCatalog, SettingsStore};
pub use crate::utils::error::Result;
