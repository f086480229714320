use crate::domain::model::{PriceQuery, QuotablePackage, Service};
use crate::domain::ports::PricingClient;
use crate::domain::settings::{FreeDeliveryMode, Settings};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Applies the merchant's markup, free-delivery and rounding rules on top of
/// the courier's raw price for one quote request.
///
/// Markups come from the resolved services. A service outside that list is
/// priced without markup.
pub struct PricePolicy<'a, P: PricingClient + ?Sized> {
    client: &'a P,
    settings: &'a Settings,
    markups: HashMap<u32, f64>,
    cart_total: f64,
    local: bool,
}

impl<'a, P: PricingClient + ?Sized> PricePolicy<'a, P> {
    pub fn new(
        client: &'a P,
        settings: &'a Settings,
        services: &[Service],
        cart_total: f64,
        local: bool,
    ) -> Self {
        Self {
            client,
            settings,
            markups: services.iter().map(|s| (s.id, s.markup_percent)).collect(),
            cart_total,
            local,
        }
    }

    pub fn for_package(
        client: &'a P,
        settings: &'a Settings,
        services: &[Service],
        package: &QuotablePackage,
    ) -> Self {
        Self::new(client, settings, services, package.cart_total, package.local)
    }

    fn qualifies_for_free_delivery(&self) -> bool {
        let free = &self.settings.free_delivery;
        self.cart_total >= free.min_total && (!free.local_only || self.local)
    }

    pub fn adjust(&self, service: u32, raw: f64) -> f64 {
        let markup = self.markups.get(&service).copied().unwrap_or(0.0);
        let mut price = raw * (1.0 + markup / 100.0);

        if self.qualifies_for_free_delivery() {
            match self.settings.free_delivery.mode {
                FreeDeliveryMode::Free => return 0.0,
                FreeDeliveryMode::Discount => {
                    let discount = self.settings.free_delivery.discount_percentage;
                    price -= price * discount / 100.0;
                }
                FreeDeliveryMode::None => {}
            }
        }

        let cents = (price * 100.0).round() / 100.0;
        if self.settings.round {
            cents.ceil()
        } else {
            cents
        }
    }
}

#[async_trait]
impl<'a, P: PricingClient + ?Sized> PricingClient for PricePolicy<'a, P> {
    async fn price(&self, query: &PriceQuery) -> Result<f64> {
        let raw = self.client.price(query).await?;
        let adjusted = self.adjust(query.service, raw);
        tracing::debug!(
            "Service {} priced at {:.2} (raw {:.2})",
            query.service,
            adjusted,
            raw
        );
        Ok(adjusted)
    }
}
