use async_trait::async_trait;
use httpmock::prelude::*;
use mds_shipping::config::form::FormSubmission;
use mds_shipping::config::toml_config::ColliveryConfig;
use mds_shipping::core::credentials::ValidationState;
use mds_shipping::core::diagnostic_log::LogKind;
use mds_shipping::domain::model::{CatalogService, Cart, Destination, Package, Parcel, PriceQuery};
use mds_shipping::domain::ports::{
    AuthClient, Connector, CredentialCache, PricingClient, ServiceCatalog, SettingsStore,
};
use mds_shipping::domain::settings::{Credentials, Settings};
use mds_shipping::{
    CredentialError, DiagnosticLog, HttpConnector, JsonFileSettingsStore, Result, ShippingError,
    ShippingMethod,
};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// The courier as seen by every client the fake connector hands out.
#[derive(Default)]
struct FakeCourier {
    valid_accounts: Mutex<HashSet<String>>,
    prices: HashMap<u32, f64>,
    invalidations: AtomicUsize,
    connections: Mutex<Vec<Credentials>>,
}

struct FakeClient {
    courier: Arc<FakeCourier>,
    credentials: Credentials,
}

#[async_trait]
impl ServiceCatalog for FakeClient {
    async fn services(&self) -> Result<Vec<CatalogService>> {
        Ok(vec![
            CatalogService::new(1, "Overnight before 10:00"),
            CatalogService::new(2, "Overnight before 16:00"),
            CatalogService::new(5, "Road Freight"),
        ])
    }
}

#[async_trait]
impl PricingClient for FakeClient {
    async fn price(&self, query: &PriceQuery) -> Result<f64> {
        self.courier
            .prices
            .get(&query.service)
            .copied()
            .ok_or_else(|| ShippingError::PricingLookupFailed {
                service_id: query.service,
                message: "timed out".to_string(),
            })
    }
}

#[async_trait]
impl AuthClient for FakeClient {
    async fn is_current_authenticated(&self) -> bool {
        self.is_valid(&self.credentials)
    }

    async fn is_new_authenticated(&self, credentials: &Credentials) -> bool {
        self.is_valid(credentials)
    }
}

impl FakeClient {
    fn is_valid(&self, credentials: &Credentials) -> bool {
        self.courier
            .valid_accounts
            .lock()
            .unwrap()
            .contains(&format!("{}:{}", credentials.username, credentials.password))
    }
}

impl CredentialCache for FakeClient {
    fn invalidate(&self) {
        self.courier.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone)]
struct FakeConnector(Arc<FakeCourier>);

impl Connector for FakeConnector {
    type Client = FakeClient;

    fn connect(&self, credentials: &Credentials) -> Result<FakeClient> {
        self.0.connections.lock().unwrap().push(credentials.clone());
        Ok(FakeClient {
            courier: self.0.clone(),
            credentials: credentials.clone(),
        })
    }
}

fn courier(accounts: &[&str]) -> Arc<FakeCourier> {
    Arc::new(FakeCourier {
        valid_accounts: Mutex::new(accounts.iter().map(|a| a.to_string()).collect()),
        prices: [(1, 100.0), (2, 90.0), (5, 50.0)].into_iter().collect(),
        ..FakeCourier::default()
    })
}

fn form(pairs: &[(&str, &str)]) -> FormSubmission {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn package() -> Package {
    Package {
        destination: Some(Destination {
            to_town_id: Some(147),
            from_town_id: Some(200),
            to_location_type: Some(1),
            from_location_type: Some(1),
        }),
        cart: Some(Cart {
            total: Some(250.0),
            max_weight: Some(1.0),
            count: Some(1),
            products: Some(vec![Parcel {
                weight: 1.0,
                ..Parcel::default()
            }]),
        }),
        service: None,
        local: false,
    }
}

async fn method_with(
    courier: Arc<FakeCourier>,
    temp_dir: &TempDir,
    saved: Option<Settings>,
) -> ShippingMethod<FakeConnector, JsonFileSettingsStore> {
    let store = JsonFileSettingsStore::new(temp_dir.path().join("settings.json"));
    if let Some(settings) = saved {
        store.save(&settings.to_snapshot()).await.unwrap();
    }
    let log = DiagnosticLog::new(temp_dir.path().join("logs"));
    ShippingMethod::load(FakeConnector(courier), store, log)
        .await
        .unwrap()
}

fn shop_settings() -> Settings {
    Settings {
        credentials: Credentials::new("shop@example.com", "pw"),
        ..Settings::default()
    }
}

#[tokio::test]
async fn test_accepted_settings_are_saved_and_reconnected() {
    let courier = courier(&["shop@example.com:pw", "new@example.com:pw2"]);
    let temp_dir = TempDir::new().unwrap();
    let mut method = method_with(courier.clone(), &temp_dir, Some(shop_settings())).await;
    assert_eq!(method.last_validation(), ValidationState::Unvalidated);

    method
        .process_admin_options(&form(&[
            ("mds_user", "New@Example.com"),
            ("mds_pass", "pw2"),
            ("round", "no"),
        ]))
        .await
        .unwrap();

    assert_eq!(method.last_validation(), ValidationState::Accepted);
    assert_eq!(method.settings().credentials.username, "new@example.com");
    assert!(!method.settings().round);
    assert_eq!(
        courier.connections.lock().unwrap().last().unwrap().username,
        "new@example.com"
    );

    let store = JsonFileSettingsStore::new(temp_dir.path().join("settings.json"));
    let saved = Settings::from_snapshot(&store.load().await.unwrap().unwrap());
    assert_eq!(&saved, method.settings());

    let successes = method.log().read(LogKind::Success).unwrap();
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].data.as_ref().unwrap()["mds_pass"], "********");
}

#[tokio::test]
async fn test_unchanged_credentials_accept_other_changes() {
    let courier = courier(&["shop@example.com:pw"]);
    let temp_dir = TempDir::new().unwrap();
    let mut method = method_with(courier, &temp_dir, Some(shop_settings())).await;

    method
        .process_admin_options(&form(&[("method_2", "no"), ("markup_5", "25")]))
        .await
        .unwrap();

    assert!(!method.settings().service(2).enabled);
    assert_eq!(method.settings().service(5).markup, 25.0);
}

#[tokio::test]
async fn test_wrong_new_password_keeps_previous_settings() {
    let courier = courier(&["shop@example.com:pw"]);
    let temp_dir = TempDir::new().unwrap();
    let mut method = method_with(courier.clone(), &temp_dir, Some(shop_settings())).await;

    let result = method
        .process_admin_options(&form(&[("mds_pass", "typo"), ("round", "no")]))
        .await;

    assert!(matches!(
        result,
        Err(ShippingError::InvalidCredentials(
            CredentialError::IncorrectAccountDetails
        ))
    ));
    assert_eq!(method.last_validation(), ValidationState::Rejected);
    assert_eq!(method.settings(), &shop_settings());
    assert_eq!(courier.connections.lock().unwrap().len(), 1);

    let warnings = method.log().read(LogKind::Warning).unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].message, "incorrect account details");
    assert_eq!(warnings[0].function, "ShippingMethod::process_admin_options");
}

#[tokio::test]
async fn test_broken_default_account_rolls_back() {
    let courier = courier(&[]);
    let temp_dir = TempDir::new().unwrap();
    let mut method = method_with(courier.clone(), &temp_dir, None).await;

    let result = method
        .process_admin_options(&form(&[("mds_user", "someone@example.com")]))
        .await;

    match result {
        Err(ShippingError::InvalidCredentials(e)) => {
            assert!(e.rolled_back_settings().unwrap().credentials.is_default());
        }
        other => panic!("expected rollback, got {:?}", other),
    }
    assert_eq!(method.last_validation(), ValidationState::RolledBackToDefault);
    assert_eq!(courier.invalidations.load(Ordering::SeqCst), 0);
    assert!(method.log().has(LogKind::Warning));
}

#[tokio::test]
async fn test_broken_custom_account_invalidates_cache() {
    let courier = courier(&[]);
    let temp_dir = TempDir::new().unwrap();
    let mut method = method_with(courier.clone(), &temp_dir, Some(shop_settings())).await;

    let result = method.process_admin_options(&form(&[])).await;

    assert!(matches!(
        result,
        Err(ShippingError::InvalidCredentials(CredentialError::NotAuthenticated))
    ));
    assert_eq!(courier.invalidations.load(Ordering::SeqCst), 1);
    assert_eq!(method.settings(), &shop_settings());
}

#[tokio::test]
async fn test_calculate_shipping_applies_price_policy() {
    let courier = courier(&["shop@example.com:pw"]);
    let temp_dir = TempDir::new().unwrap();
    let mut settings = shop_settings();
    settings.round = true;
    let method = method_with(courier, &temp_dir, Some(settings)).await;

    let rates = method.calculate_shipping(&package()).await;

    let priced: Vec<(&str, f64)> = rates.iter().map(|r| (r.id.as_str(), r.cost)).collect();
    assert_eq!(priced, vec![("mds_1", 110.0), ("mds_2", 99.0), ("mds_5", 55.0)]);
}

#[tokio::test]
async fn test_disabled_method_quotes_nothing() {
    let courier = courier(&["shop@example.com:pw"]);
    let temp_dir = TempDir::new().unwrap();
    let mut settings = shop_settings();
    settings.enabled = false;
    let method = method_with(courier, &temp_dir, Some(settings)).await;

    assert!(method.calculate_shipping(&package()).await.is_empty());
}

#[tokio::test]
async fn test_end_to_end_with_http_courier() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST).path("/v3/login");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({ "data": { "api_token": "tok" } }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/v3/service_types");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({ "data": [
                { "id": 2, "text": "Overnight before 16:00" },
                { "id": 3, "text": "Same Day" }
            ]}));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/v3/quote")
            .json_body_partial(json!({ "service": 2 }).to_string());
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({ "data": [{ "total": 100.0 }] }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/v3/quote")
            .json_body_partial(json!({ "service": 3 }).to_string());
        then.status(500);
    });

    let connector = HttpConnector::new(ColliveryConfig {
        base_url: server.url("/v3"),
        timeout_seconds: Some(5),
        app_name: None,
    });
    let store = JsonFileSettingsStore::new(temp_dir.path().join("settings.json"));
    let log = DiagnosticLog::new(temp_dir.path().join("logs"));
    let method = ShippingMethod::load(connector, store, log).await?;

    let rates = method.calculate_shipping(&package()).await;

    assert_eq!(rates.len(), 1);
    assert_eq!(rates[0].id, "mds_2");
    assert_eq!(
        rates[0].label,
        "Overnight before 16:00, additional 24 hours on outlying areas"
    );
    assert_eq!(rates[0].cost, 110.0);

    Ok(())
}
