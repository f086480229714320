//! Turns a checkout package into the list of shipping rates offered for it.

use crate::domain::model::{CatalogService, Package, PriceQuery, QuotablePackage, Rate, Service};
use crate::domain::ports::PricingClient;
use crate::domain::settings::{Settings, DEFAULT_FREE_WORDING};

/// Services whose deliveries take a day longer to outlying areas.
const OUTLYING_AREA_SERVICES: [u32; 2] = [1, 2];
const OUTLYING_AREA_SUFFIX: &str = ", additional 24 hours on outlying areas";
const FREE_SUFFIX: &str = " - FREE!";

/// Quotes every enabled service for `package`.
///
/// Returns no rates when the package is missing required fields. A package
/// asking for the `free` service gets a single zero-cost rate without any
/// pricing lookup. Services whose lookup fails are left out; the rest are
/// returned in catalog order.
pub async fn quote<P>(
    package: &Package,
    settings: &Settings,
    catalog: &[CatalogService],
    pricing: &P,
) -> Vec<Rate>
where
    P: PricingClient + ?Sized,
{
    let package = match package.quotable() {
        Ok(package) => package,
        Err(e) => {
            tracing::debug!("Package not quotable: {}", e);
            return Vec::new();
        }
    };

    if package.wants_free_delivery() {
        return vec![free_delivery_rate(&package, settings)];
    }

    let cover = risk_cover_applies(settings, package.cart_total);
    let mut rates = Vec::new();

    for service in settings.resolve_services(catalog) {
        if !service.enabled {
            continue;
        }

        let query = PriceQuery::for_service(&package, service.id, cover);
        let price = match pricing.price(&query).await {
            Ok(price) => price,
            Err(e) => {
                tracing::warn!("Skipping service {} ({}): {}", service.id, service.title, e);
                continue;
            }
        };

        rates.push(service_rate(&service, price));
    }

    tracing::debug!("Quoted {} rates", rates.len());
    rates
}

pub fn risk_cover_applies(settings: &Settings, cart_total: f64) -> bool {
    settings.risk_cover.enabled && cart_total >= settings.risk_cover.threshold
}

fn free_delivery_rate(package: &QuotablePackage, settings: &Settings) -> Rate {
    let free = &settings.free_delivery;
    let service = if package.local {
        free.local_default_service
    } else {
        free.default_service
    };
    let label = if free.wording.is_empty() {
        DEFAULT_FREE_WORDING.to_string()
    } else {
        free.wording.clone()
    };

    Rate {
        id: Rate::rate_id(service),
        label,
        cost: 0.0,
    }
}

fn service_label(service: &Service) -> String {
    match &service.wording_override {
        Some(wording) => wording.clone(),
        None if OUTLYING_AREA_SERVICES.contains(&service.id) => {
            format!("{}{}", service.title, OUTLYING_AREA_SUFFIX)
        }
        None => service.title.clone(),
    }
}

fn service_rate(service: &Service, price: f64) -> Rate {
    let mut label = service_label(service);
    let cost = if price <= 0.0 {
        label.push_str(FREE_SUFFIX);
        0.0
    } else {
        price
    };

    Rate {
        id: Rate::rate_id(service.id),
        label,
        cost,
    }
}
