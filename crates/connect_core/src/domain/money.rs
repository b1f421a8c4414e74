//! Monetary values and currency-safe totals.
//!
//! # Invariants
//! - Values are finite and never negative.
//! - A total is the exact sum of its parts and exists only when every
//!   counted part shares one currency.

use crate::config::ZeroChargeCurrency;
use crate::entity::{BuildContext, Entity, EntityError};
use crate::validation::assert::{self, Sign};
use crate::validation::pattern::CURRENCY_CODE;
use crate::validation::schema::{field, Rule, Schema};
use crate::validation::violation::ValidationResult;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

static MONETARY_VALUE_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "monetary value",
        Rule::object([
            field("value", Rule::number().non_negative()),
            field("currency", Rule::string().pattern(&CURRENCY_CODE)),
        ]),
    )
});

/// Amount of money in one ISO 4217 currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonetaryValue {
    value: f64,
    currency: String,
}

impl MonetaryValue {
    /// Validated constructor for programmatic use.
    pub fn new(value: f64, currency: &str) -> ValidationResult<Self> {
        Ok(Self {
            value: assert::number(Some(&json!(value)), "value", Sign::NonNegative, None)?,
            currency: assert::matches(Some(&json!(currency)), "currency", &CURRENCY_CODE)?,
        })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0.0
    }

    /// Sums `values`, failing when they span more than one currency.
    ///
    /// Returns `Ok(None)` for an empty input. With
    /// [`ZeroChargeCurrency::Ignore`] zero-valued parts do not take part in
    /// the currency check.
    pub fn sum<'a>(
        values: impl IntoIterator<Item = &'a MonetaryValue>,
        zero_charges: ZeroChargeCurrency,
    ) -> Result<Option<MonetaryValue>, CurrencyMismatchError> {
        let values = values.into_iter().collect::<Vec<_>>();
        let Some(first) = values.first() else {
            return Ok(None);
        };

        let mut currencies: Vec<String> = Vec::new();
        for item in &values {
            if zero_charges == ZeroChargeCurrency::Ignore && item.is_zero() {
                continue;
            }
            if !currencies.iter().any(|known| known == &item.currency) {
                currencies.push(item.currency.clone());
            }
        }
        if currencies.len() > 1 {
            return Err(CurrencyMismatchError { currencies });
        }

        let currency = currencies
            .into_iter()
            .next()
            .unwrap_or_else(|| first.currency.clone());
        Ok(Some(MonetaryValue {
            value: values.iter().map(|item| item.value).sum(),
            currency,
        }))
    }
}

impl Display for MonetaryValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} {}", self.value, self.currency)
    }
}

impl Entity for MonetaryValue {
    fn schema() -> &'static Schema {
        &MONETARY_VALUE_SCHEMA
    }

    fn build(fields: &Map<String, Value>, _cx: &mut BuildContext<'_>) -> Result<Self, EntityError> {
        Ok(Self {
            value: assert::number(fields.get("value"), "value", Sign::NonNegative, None)?,
            currency: assert::matches(fields.get("currency"), "currency", &CURRENCY_CODE)?,
        })
    }
}

/// Values in different currencies were combined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyMismatchError {
    /// Distinct currencies in first-seen order.
    pub currencies: Vec<String>,
}

impl Display for CurrencyMismatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "currency mismatch: cannot total values in {}",
            self.currencies.join(", ")
        )
    }
}

impl Error for CurrencyMismatchError {}
