//! Transaction domain models.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single executed trade as delivered by the import layer.
///
/// Quantity is signed: positive for a buy, negative for a sell. Fields the
/// export left blank (or that failed to parse) are kept as `None` so the
/// calculators can decide how an undefined value propagates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub instrument_id: String,
    #[serde(default)]
    pub isin: Option<String>,
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    /// Price per unit in the instrument's local currency.
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    /// Currency of `unit_price`.
    pub currency: String,
    /// Multiplier from the local currency to the account's base currency.
    #[serde(default)]
    pub fx_rate: Option<Decimal>,
    #[serde(default)]
    pub transaction_cost: Option<Decimal>,
}

impl Transaction {
    pub fn new(
        instrument_id: impl Into<String>,
        timestamp: NaiveDateTime,
        quantity: Decimal,
        unit_price: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        Transaction {
            instrument_id: instrument_id.into(),
            isin: None,
            timestamp,
            quantity: Some(quantity),
            unit_price: Some(unit_price),
            currency: currency.into(),
            fx_rate: None,
            transaction_cost: None,
        }
    }

    pub fn with_isin(mut self, isin: impl Into<String>) -> Self {
        self.isin = Some(isin.into());
        self
    }

    pub fn with_fx_rate(mut self, fx_rate: Decimal) -> Self {
        self.fx_rate = Some(fx_rate);
        self
    }

    pub fn with_transaction_cost(mut self, cost: Decimal) -> Self {
        self.transaction_cost = Some(cost);
        self
    }

    /// Fills a missing FX rate with 1 and a missing transaction cost with 0.
    /// Applying it more than once has no further effect.
    pub fn with_defaults(mut self) -> Self {
        self.fx_rate = Some(self.fx());
        self.transaction_cost = Some(self.cost());
        self
    }

    /// Get FX rate, defaulting to one if not set
    pub fn fx(&self) -> Decimal {
        self.fx_rate.unwrap_or(Decimal::ONE)
    }

    /// Get transaction cost, defaulting to zero if not set
    pub fn cost(&self) -> Decimal {
        self.transaction_cost.unwrap_or(Decimal::ZERO)
    }

    pub fn is_buy(&self) -> bool {
        self.quantity.is_some_and(|q| q > Decimal::ZERO)
    }

    pub fn is_sell(&self) -> bool {
        self.quantity.is_some_and(|q| q < Decimal::ZERO)
    }

    /// `unit_price * quantity + transaction_cost` in the local currency.
    /// Undefined when price or quantity is.
    pub fn purchase_value(&self) -> Option<Decimal> {
        let gross = self.unit_price?.checked_mul(self.quantity?)?;
        gross.checked_add(self.cost())
    }

    /// Purchase value converted with the transaction's FX rate.
    pub fn base_purchase_value(&self) -> Option<Decimal> {
        self.purchase_value()?.checked_mul(self.fx())
    }
}
