use crate::config::form::{form_fields, sanitize_form, FormSubmission};
use crate::core::credentials::{self, ValidationState};
use crate::core::diagnostic_log::DiagnosticLog;
use crate::core::pricing::PricePolicy;
use crate::core::rates;
use crate::domain::model::{CatalogService, Package, Rate};
use crate::domain::ports::{Connector, ServiceCatalog, SettingsStore};
use crate::domain::settings::{Settings, SettingsSnapshot};
use crate::utils::error::{Result, ShippingError};

/// The MDS shipping method: active settings, the courier client built from
/// them, and the stores behind both.
pub struct ShippingMethod<C: Connector, S: SettingsStore> {
    connector: C,
    store: S,
    log: DiagnosticLog,
    settings: Settings,
    client: C::Client,
    last_validation: ValidationState,
}

/// Settings as written to the diagnostic log, without the account password.
fn redacted(snapshot: &SettingsSnapshot) -> serde_json::Value {
    let mut snapshot = snapshot.clone();
    if let Some(password) = snapshot.get_mut("mds_pass") {
        *password = "********".to_string();
    }
    serde_json::to_value(snapshot).unwrap_or_default()
}

impl<C: Connector, S: SettingsStore> ShippingMethod<C, S> {
    /// Loads the saved settings (or the defaults) and connects a client.
    pub async fn load(connector: C, store: S, log: DiagnosticLog) -> Result<Self> {
        let settings = match store.load().await? {
            Some(snapshot) => Settings::from_snapshot(&snapshot),
            None => {
                tracing::info!("No saved settings, using defaults");
                Settings::default()
            }
        };
        let client = connector.connect(&settings.credentials)?;

        Ok(Self {
            connector,
            store,
            log,
            settings,
            client,
            last_validation: ValidationState::Unvalidated,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn client(&self) -> &C::Client {
        &self.client
    }

    pub fn log(&self) -> &DiagnosticLog {
        &self.log
    }

    pub fn last_validation(&self) -> ValidationState {
        self.last_validation
    }

    pub async fn services(&self) -> Result<Vec<CatalogService>> {
        self.client.services().await
    }

    fn log_error(&self, function: &str, message: &str, data: Option<serde_json::Value>) {
        let settings = Some(redacted(&self.settings.to_snapshot()));
        if let Err(e) = self.log.error(function, message, settings, data) {
            tracing::error!("Unable to write diagnostic log: {}", e);
        }
    }

    /// Rates offered for `package`. Never fails: anything that prevents a
    /// quote results in fewer (or no) rates.
    pub async fn calculate_shipping(&self, package: &Package) -> Vec<Rate> {
        if !self.settings.enabled {
            tracing::debug!("Shipping method disabled, no rates");
            return Vec::new();
        }

        let quotable = match package.quotable() {
            Ok(quotable) => quotable,
            Err(e) => {
                tracing::debug!("{}", e);
                return Vec::new();
            }
        };

        let catalog = if quotable.wants_free_delivery() {
            Vec::new()
        } else {
            match self.client.services().await {
                Ok(catalog) => catalog,
                Err(e) => {
                    tracing::error!("Unable to fetch MDS services: {}", e);
                    self.log_error(
                        "ShippingMethod::calculate_shipping",
                        &e.to_string(),
                        None,
                    );
                    return Vec::new();
                }
            }
        };

        let services = self.settings.resolve_services(&catalog);
        let policy = PricePolicy::for_package(&self.client, &self.settings, &services, &quotable);
        rates::quote(package, &self.settings, &catalog, &policy).await
    }

    /// Sanitizes and validates a settings form. Accepted settings are saved
    /// and a new client is connected with them; anything else leaves the
    /// active settings untouched.
    pub async fn process_admin_options(&mut self, submission: &FormSubmission) -> Result<()> {
        let catalog = match self.client.services().await {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!("Validating settings without the service catalog: {}", e);
                Vec::new()
            }
        };

        let current_snapshot = self.settings.to_snapshot();
        let sanitized = sanitize_form(&form_fields(&catalog), submission, &current_snapshot);
        let submitted = Settings::from_snapshot(&sanitized);

        let result =
            credentials::validate(&self.settings, submitted, &self.client, &self.client).await;
        self.last_validation = ValidationState::of(&result);

        let accepted = match result {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!("Settings rejected: {}", e);
                let form_keys: Vec<&String> = submission.keys().collect();
                if let Err(log_err) = self.log.warning(
                    "ShippingMethod::process_admin_options",
                    &e.to_string(),
                    Some(redacted(&current_snapshot)),
                    Some(serde_json::json!({ "fields": form_keys })),
                ) {
                    tracing::error!("Unable to write diagnostic log: {}", log_err);
                }
                return Err(ShippingError::InvalidCredentials(e));
            }
        };

        let client = self.connector.connect(&accepted.credentials)?;
        let snapshot = accepted.to_snapshot();
        self.store.save(&snapshot).await?;
        self.client = client;
        self.settings = accepted;

        tracing::info!("MDS settings updated");
        if let Err(e) = self.log.success(
            "ShippingMethod::process_admin_options",
            "Settings updated",
            Some(redacted(&snapshot)),
        ) {
            tracing::error!("Unable to write diagnostic log: {}", e);
        }
        Ok(())
    }
}
