use crate::domain::model::{CatalogService, Service};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_USERNAME: &str = "api@collivery.co.za";
pub const DEFAULT_PASSWORD: &str = "api123";
pub const DEFAULT_FREE_WORDING: &str = "Free Delivery";

/// Flat key/value form of [`Settings`], as kept by the settings store.
pub type SettingsSnapshot = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The shared demo account every installation starts with.
    pub fn default_pair() -> Self {
        Self::new(DEFAULT_USERNAME, DEFAULT_PASSWORD)
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default_pair()
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::default_pair()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskCover {
    pub enabled: bool,
    pub threshold: f64,
}

impl Default for RiskCover {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FreeDeliveryMode {
    #[default]
    None,
    Free,
    Discount,
}

impl FreeDeliveryMode {
    pub fn as_setting(&self) -> &'static str {
        match self {
            FreeDeliveryMode::None => "no",
            FreeDeliveryMode::Free => "yes",
            FreeDeliveryMode::Discount => "discount",
        }
    }

    pub fn from_setting(value: &str) -> Option<Self> {
        match value {
            "no" => Some(FreeDeliveryMode::None),
            "yes" => Some(FreeDeliveryMode::Free),
            "discount" => Some(FreeDeliveryMode::Discount),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeDelivery {
    pub mode: FreeDeliveryMode,
    pub default_service: u32,
    pub local_default_service: u32,
    pub min_total: f64,
    pub wording: String,
    pub local_only: bool,
    pub discount_percentage: f64,
}

impl Default for FreeDelivery {
    fn default() -> Self {
        Self {
            mode: FreeDeliveryMode::None,
            default_service: 5,
            local_default_service: 2,
            min_total: 1000.0,
            wording: DEFAULT_FREE_WORDING.to_string(),
            local_only: false,
            discount_percentage: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSettings {
    pub enabled: bool,
    pub markup: f64,
    /// Empty means "use the catalog title".
    pub wording: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            markup: 10.0,
            wording: String::new(),
        }
    }
}

/// Merchant configuration for the shipping method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub enabled: bool,
    pub credentials: Credentials,
    pub risk_cover: RiskCover,
    pub round: bool,
    pub free_delivery: FreeDelivery,
    pub services: BTreeMap<u32, ServiceSettings>,
    pub include_product_titles: bool,
    pub automatic_processing: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            credentials: Credentials::default_pair(),
            risk_cover: RiskCover::default(),
            round: true,
            free_delivery: FreeDelivery::default(),
            services: BTreeMap::new(),
            include_product_titles: false,
            automatic_processing: false,
        }
    }
}

fn yes_no(value: bool) -> String {
    let setting = if value { "yes" } else { "no" };
    setting.to_string()
}

fn flag(snapshot: &SettingsSnapshot, key: &str, default: bool) -> bool {
    snapshot.get(key).map(|v| v == "yes").unwrap_or(default)
}

fn number<T: std::str::FromStr>(snapshot: &SettingsSnapshot, key: &str, default: T) -> T {
    snapshot
        .get(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn text(snapshot: &SettingsSnapshot, key: &str, default: &str) -> String {
    snapshot
        .get(key)
        .cloned()
        .unwrap_or_else(|| default.to_string())
}

/// Splits `method_12` into `("method", 12)`; non-numeric suffixes such as
/// `method_free` are not per-service keys.
fn service_key(key: &str) -> Option<(&str, u32)> {
    let (prefix, id) = key.split_once('_')?;
    match prefix {
        "method" | "markup" | "wording" => id.parse().ok().map(|id| (prefix, id)),
        _ => None,
    }
}

impl Settings {
    /// Per-service settings, falling back to the form defaults for services
    /// the merchant has never saved.
    pub fn service(&self, id: u32) -> ServiceSettings {
        self.services.get(&id).cloned().unwrap_or_default()
    }

    /// Resolves the catalog against per-service settings, keeping catalog order.
    pub fn resolve_services(&self, catalog: &[CatalogService]) -> Vec<Service> {
        catalog
            .iter()
            .map(|entry| {
                let service = self.service(entry.id);
                Service {
                    id: entry.id,
                    title: entry.title.clone(),
                    enabled: service.enabled,
                    markup_percent: service.markup,
                    wording_override: Some(service.wording).filter(|w| !w.is_empty()),
                }
            })
            .collect()
    }

    pub fn to_snapshot(&self) -> SettingsSnapshot {
        let mut snapshot = SettingsSnapshot::new();
        snapshot.insert("enabled".into(), yes_no(self.enabled));
        snapshot.insert("mds_user".into(), self.credentials.username.clone());
        snapshot.insert("mds_pass".into(), self.credentials.password.clone());
        snapshot.insert(
            "include_product_titles".into(),
            yes_no(self.include_product_titles),
        );
        snapshot.insert("risk_cover".into(), yes_no(self.risk_cover.enabled));
        snapshot.insert(
            "risk_cover_threshold".into(),
            format!("{:.2}", self.risk_cover.threshold),
        );
        snapshot.insert("round".into(), yes_no(self.round));

        for (id, service) in &self.services {
            snapshot.insert(format!("method_{}", id), yes_no(service.enabled));
            snapshot.insert(format!("markup_{}", id), service.markup.to_string());
            snapshot.insert(format!("wording_{}", id), service.wording.clone());
        }

        let free = &self.free_delivery;
        snapshot.insert("method_free".into(), free.mode.as_setting().to_string());
        snapshot.insert(
            "shipping_discount_percentage".into(),
            free.discount_percentage.to_string(),
        );
        snapshot.insert("wording_free".into(), free.wording.clone());
        snapshot.insert("free_min_total".into(), format!("{:.2}", free.min_total));
        snapshot.insert("free_local_only".into(), yes_no(free.local_only));
        snapshot.insert(
            "free_default_service".into(),
            free.default_service.to_string(),
        );
        snapshot.insert(
            "free_local_default_service".into(),
            free.local_default_service.to_string(),
        );
        snapshot.insert(
            "toggle_automatic_mds_processing".into(),
            yes_no(self.automatic_processing),
        );
        snapshot
    }

    /// Builds settings from a stored snapshot. Missing or unreadable values
    /// take their defaults.
    pub fn from_snapshot(snapshot: &SettingsSnapshot) -> Self {
        let defaults = Settings::default();
        let free_defaults = FreeDelivery::default();

        let mut services: BTreeMap<u32, ServiceSettings> = BTreeMap::new();
        for (key, value) in snapshot {
            let Some((prefix, id)) = service_key(key) else {
                continue;
            };
            let entry = services.entry(id).or_default();
            match prefix {
                "method" => entry.enabled = value == "yes",
                "markup" => entry.markup = value.trim().parse().unwrap_or(entry.markup),
                _ => entry.wording = value.clone(),
            }
        }

        Self {
            enabled: flag(snapshot, "enabled", defaults.enabled),
            credentials: Credentials::new(
                text(snapshot, "mds_user", DEFAULT_USERNAME),
                text(snapshot, "mds_pass", DEFAULT_PASSWORD),
            ),
            risk_cover: RiskCover {
                enabled: flag(snapshot, "risk_cover", defaults.risk_cover.enabled),
                threshold: number(
                    snapshot,
                    "risk_cover_threshold",
                    defaults.risk_cover.threshold,
                ),
            },
            round: flag(snapshot, "round", defaults.round),
            free_delivery: FreeDelivery {
                mode: snapshot
                    .get("method_free")
                    .and_then(|v| FreeDeliveryMode::from_setting(v))
                    .unwrap_or(free_defaults.mode),
                default_service: number(
                    snapshot,
                    "free_default_service",
                    free_defaults.default_service,
                ),
                local_default_service: number(
                    snapshot,
                    "free_local_default_service",
                    free_defaults.local_default_service,
                ),
                min_total: number(snapshot, "free_min_total", free_defaults.min_total),
                wording: text(snapshot, "wording_free", &free_defaults.wording),
                local_only: flag(snapshot, "free_local_only", free_defaults.local_only),
                discount_percentage: number(
                    snapshot,
                    "shipping_discount_percentage",
                    free_defaults.discount_percentage,
                ),
            },
            services,
            include_product_titles: flag(
                snapshot,
                "include_product_titles",
                defaults.include_product_titles,
            ),
            automatic_processing: flag(
                snapshot,
                "toggle_automatic_mds_processing",
                defaults.automatic_processing,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_form_defaults() {
        let settings = Settings::default();
        assert!(settings.credentials.is_default());
        assert!(settings.risk_cover.enabled);
        assert_eq!(settings.free_delivery.default_service, 5);
        assert_eq!(settings.free_delivery.local_default_service, 2);
        assert_eq!(settings.service(99), ServiceSettings::default());
    }

    #[test]
    fn test_snapshot_keeps_every_field() {
        let mut settings = Settings::default();
        settings.credentials = Credentials::new("shop@example.com", "s3cret");
        settings.free_delivery.mode = FreeDeliveryMode::Discount;
        settings.free_delivery.min_total = 750.5;
        settings.services.insert(
            3,
            ServiceSettings {
                enabled: false,
                markup: 12.5,
                wording: "Road freight".to_string(),
            },
        );

        let snapshot = settings.to_snapshot();
        assert_eq!(snapshot["method_free"], "discount");
        assert_eq!(snapshot["method_3"], "no");
        assert_eq!(Settings::from_snapshot(&snapshot), settings);
    }

    #[test]
    fn test_method_free_is_not_a_service_key() {
        let mut snapshot = SettingsSnapshot::new();
        snapshot.insert("method_free".into(), "yes".into());
        snapshot.insert("wording_free".into(), "On us".into());
        snapshot.insert("markup_2".into(), "not a number".into());

        let settings = Settings::from_snapshot(&snapshot);
        assert_eq!(settings.free_delivery.mode, FreeDeliveryMode::Free);
        assert_eq!(settings.free_delivery.wording, "On us");
        assert_eq!(settings.services.len(), 1);
        assert_eq!(settings.service(2).markup, 10.0);
    }

    #[test]
    fn test_resolve_services_keeps_catalog_order() {
        let mut settings = Settings::default();
        settings.services.insert(
            5,
            ServiceSettings {
                enabled: false,
                markup: 0.0,
                wording: String::new(),
            },
        );
        let catalog = vec![
            CatalogService::new(5, "Road Freight"),
            CatalogService::new(1, "Overnight before 10:00"),
        ];

        let services = settings.resolve_services(&catalog);
        assert_eq!(services[0].id, 5);
        assert!(!services[0].enabled);
        assert_eq!(services[1].wording_override, None);
        assert_eq!(services[1].markup_percent, 10.0);
    }
}
