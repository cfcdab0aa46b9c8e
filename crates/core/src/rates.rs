use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::domain::quote::{ShippingMethod, VehicleType};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OriginRates {
    pub roro: Decimal,
    pub container: Decimal,
}

impl OriginRates {
    pub fn for_method(&self, method: ShippingMethod) -> Decimal {
        match method {
            ShippingMethod::Roro => self.roro,
            ShippingMethod::Container => self.container,
        }
    }
}

/// Static shipping tariffs. Origin keys are stored lowercase and every lookup
/// lowercases its input, so lookups are case-insensitive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateTable {
    origins: HashMap<String, OriginRates>,
    delivery_days: HashMap<String, u32>,
    pub default_base_cost: Decimal,
    pub default_delivery_days: u32,
    pub customs_duty: Decimal,
    pub levies: Decimal,
    pub vat_rate: Decimal,
}

impl Default for RateTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl RateTable {
    pub fn standard() -> Self {
        let origins = [
            ("japan", 1500, 2200),
            ("uk", 1800, 2800),
            ("uae", 1100, 1600),
            ("usa", 2000, 3000),
        ]
        .into_iter()
        .map(|(origin, roro, container)| {
            (
                origin.to_string(),
                OriginRates { roro: Decimal::from(roro), container: Decimal::from(container) },
            )
        })
        .collect();

        let delivery_days = [("japan", 45), ("uk", 35), ("uae", 30), ("usa", 40)]
            .into_iter()
            .map(|(origin, days)| (origin.to_string(), days))
            .collect();

        Self {
            origins,
            delivery_days,
            default_base_cost: Decimal::from(1500),
            default_delivery_days: 40,
            customs_duty: Decimal::from(800),
            levies: Decimal::from(350),
            vat_rate: Decimal::new(18, 2),
        }
    }

    pub fn base_rate(&self, origin_country: &str, method: ShippingMethod) -> Decimal {
        self.origins
            .get(&normalize(origin_country))
            .map(|rates| rates.for_method(method))
            .unwrap_or(self.default_base_cost)
    }

    pub fn vehicle_multiplier(&self, vehicle_type: VehicleType) -> Decimal {
        match vehicle_type {
            VehicleType::Sedan => Decimal::ONE,
            VehicleType::Suv => Decimal::new(12, 1),
            VehicleType::Truck => Decimal::new(13, 1),
            VehicleType::Van => Decimal::new(125, 2),
            VehicleType::Luxury => Decimal::new(15, 1),
            VehicleType::Motorcycle => Decimal::new(7, 1),
        }
    }

    pub fn delivery_days(&self, origin_country: &str) -> u32 {
        self.delivery_days
            .get(&normalize(origin_country))
            .copied()
            .unwrap_or(self.default_delivery_days)
    }
}

fn normalize(origin: &str) -> String {
    origin.trim().to_lowercase()
}
