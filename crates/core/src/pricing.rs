use rust_decimal::Decimal;

use crate::domain::quote::{CostBreakdown, QuoteInput};
use crate::rates::RateTable;

pub trait PricingEngine: Send + Sync {
    fn base_cost(&self, input: &QuoteInput) -> Decimal;
    fn breakdown(&self, adjusted_cost: Decimal) -> CostBreakdown;
    fn delivery_days(&self, origin_country: &str) -> u32;
}

#[derive(Clone, Debug, Default)]
pub struct DeterministicPricingEngine {
    rates: RateTable,
}

impl PricingEngine for DeterministicPricingEngine {
    fn base_cost(&self, input: &QuoteInput) -> Decimal {
        let base = self.rates.base_rate(&input.origin_country, input.shipping_method);
        (base * self.rates.vehicle_multiplier(input.vehicle_type)).round_dp(2)
    }

    fn breakdown(&self, adjusted_cost: Decimal) -> CostBreakdown {
        let customs_duty = self.rates.customs_duty;
        let vat = ((adjusted_cost + customs_duty) * self.rates.vat_rate).round_dp(2);
        CostBreakdown::compose(adjusted_cost, customs_duty, vat, self.rates.levies)
    }

    fn delivery_days(&self, origin_country: &str) -> u32 {
        self.rates.delivery_days(origin_country)
    }
}

/// `base * (1 + percent / 100)`, rounded to cents and floored at zero.
pub fn apply_adjustment(base_cost: Decimal, percent: Decimal) -> Decimal {
    let adjusted = base_cost * (Decimal::ONE + percent / Decimal::ONE_HUNDRED);
    adjusted.round_dp(2).max(Decimal::ZERO)
}
