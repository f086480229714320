use crate::utils::error::{Result, ShippingError};
use serde::{Deserialize, Serialize};

/// Service id the checkout sends when the cart qualifies for free delivery.
pub const FREE_SERVICE: &str = "free";

/// Where a package travels from and to, as sent by the checkout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub to_town_id: Option<u32>,
    pub from_town_id: Option<u32>,
    pub to_location_type: Option<u32>,
    pub from_location_type: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub weight: f64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub total: Option<f64>,
    pub max_weight: Option<f64>,
    pub count: Option<u32>,
    pub products: Option<Vec<Parcel>>,
}

/// A quote request as received from the checkout. Nothing is guaranteed to be
/// present; [`Package::quotable`] decides whether it can be priced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Package {
    #[serde(default)]
    pub destination: Option<Destination>,
    #[serde(default)]
    pub cart: Option<Cart>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub local: bool,
}

/// A package with every field the courier needs.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotablePackage {
    pub to_town_id: u32,
    pub from_town_id: u32,
    pub to_location_type: u32,
    pub from_location_type: u32,
    pub cart_total: f64,
    pub max_weight: f64,
    pub count: u32,
    pub parcels: Vec<Parcel>,
    pub service: Option<String>,
    pub local: bool,
}

impl QuotablePackage {
    pub fn wants_free_delivery(&self) -> bool {
        self.service.as_deref() == Some(FREE_SERVICE)
    }
}

fn required<T: Clone>(field: &str, value: &Option<T>) -> Result<T> {
    value.clone().ok_or_else(|| ShippingError::NotQuotable {
        field: field.to_string(),
    })
}

impl Package {
    pub fn quotable(&self) -> Result<QuotablePackage> {
        let destination = required("destination", &self.destination)?;
        let cart = required("cart", &self.cart)?;

        Ok(QuotablePackage {
            to_town_id: required("destination.to_town_id", &destination.to_town_id)?,
            from_town_id: required("destination.from_town_id", &destination.from_town_id)?,
            to_location_type: required(
                "destination.to_location_type",
                &destination.to_location_type,
            )?,
            from_location_type: required(
                "destination.from_location_type",
                &destination.from_location_type,
            )?,
            cart_total: required("cart.total", &cart.total)?,
            max_weight: required("cart.max_weight", &cart.max_weight)?,
            count: required("cart.count", &cart.count)?,
            parcels: required("cart.products", &cart.products)?,
            service: self.service.clone(),
            local: self.local,
        })
    }
}

/// One entry of the courier's service catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogService {
    pub id: u32,
    pub title: String,
}

impl CatalogService {
    pub fn new(id: u32, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

/// A catalog service resolved against the merchant's per-service settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub id: u32,
    pub title: String,
    pub enabled: bool,
    pub markup_percent: f64,
    pub wording_override: Option<String>,
}

/// Body of a courier price request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuery {
    pub to_town_id: u32,
    pub from_town_id: u32,
    pub to_location_type: u32,
    pub from_location_type: u32,
    pub cover: u8,
    pub weight: f64,
    pub num_package: u32,
    pub parcels: Vec<Parcel>,
    pub exclude_weekend: u8,
    pub service: u32,
}

impl PriceQuery {
    pub fn for_service(package: &QuotablePackage, service: u32, cover: bool) -> Self {
        Self {
            to_town_id: package.to_town_id,
            from_town_id: package.from_town_id,
            to_location_type: package.to_location_type,
            from_location_type: package.from_location_type,
            cover: u8::from(cover),
            weight: package.max_weight,
            num_package: package.count,
            parcels: package.parcels.clone(),
            exclude_weekend: 1,
            service,
        }
    }
}

/// A priced shipping option offered at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub id: String,
    pub label: String,
    pub cost: f64,
}

impl Rate {
    pub fn rate_id(service: impl std::fmt::Display) -> String {
        format!("mds_{}", service)
    }
}
