//! Cart pricing calculations.

use crate::cart::CartLineItem;
use crate::error::CommerceError;
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Tax and shipping rates applied to a cart subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Tax rate in basis points (1200 = 12%).
    pub tax_rate_bps: u32,
    /// Shipping rate in basis points (500 = 5%).
    pub shipping_rate_bps: u32,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate_bps: 1200,
            shipping_rate_bps: 500,
        }
    }
}

impl PricingPolicy {
    /// Price a full set of lines.
    ///
    /// Every line is included; nothing is carried over from a previous run.
    /// The total is rounded once from the exact subtotal. Tax is rounded to the
    /// cent and shipping takes the remainder, so the three parts always add up
    /// to the total.
    pub fn compute(
        &self,
        lines: &[CartLineItem],
        currency: Currency,
    ) -> Result<CartTotals, CommerceError> {
        let mut subtotal = Money::zero(currency);
        let mut total_quantity: i64 = 0;

        for line in lines {
            let line_total = line
                .price
                .try_multiply(line.quantity)
                .ok_or(CommerceError::Overflow)?;
            subtotal = subtotal.try_add(&line_total).ok_or(CommerceError::Overflow)?;
            total_quantity = total_quantity
                .checked_add(line.quantity)
                .ok_or(CommerceError::Overflow)?;
        }

        let combined_bps =
            i64::from(self.tax_rate_bps) + i64::from(self.shipping_rate_bps) + crate::money::BPS_SCALE;
        let total = subtotal
            .apply_bps(combined_bps)
            .ok_or(CommerceError::Overflow)?;
        let tax = subtotal
            .apply_bps(i64::from(self.tax_rate_bps))
            .ok_or(CommerceError::Overflow)?;
        let shipping = total
            .try_subtract(&subtotal)
            .and_then(|m| m.try_subtract(&tax))
            .ok_or(CommerceError::Overflow)?;

        Ok(CartTotals {
            subtotal,
            tax,
            shipping,
            total,
            total_quantity,
        })
    }
}

/// Pricing breakdown for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    /// Sum of price times quantity over all lines.
    pub subtotal: Money,
    /// Tax on the subtotal.
    pub tax: Money,
    /// Shipping charge.
    pub shipping: Money,
    /// Grand total (subtotal + tax + shipping).
    pub total: Money,
    /// Sum of line quantities.
    pub total_quantity: i64,
}

impl CartTotals {
    /// Human-readable breakdown, e.g.
    /// `"Subtotal: $20.00, Tax: $2.40, Shipping: $1.00, Total: $23.40"`.
    pub fn summary(&self) -> String {
        format!(
            "Subtotal: {}, Tax: {}, Shipping: {}, Total: {}",
            self.subtotal, self.tax, self.shipping, self.total
        )
    }
}
