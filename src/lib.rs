pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::ShippingConfig;

pub use adapters::{
    collivery::{ColliveryClient, HttpConnector},
    storage::JsonFileSettingsStore,
};
pub use core::{diagnostic_log::DiagnosticLog, shipping_method::ShippingMethod};
pub use domain::model::{Package, Rate};
pub use domain::settings::Settings;
pub use utils::error::{CredentialError, Result, ShippingError};
