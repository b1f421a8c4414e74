//! Weights and quantities.

use crate::entity::{BuildContext, Entity, EntityError};
use crate::validation::assert::{self, Sign, StringEnum};
use crate::validation::schema::{field, Rule, Schema};
use crate::validation::violation::ValidationResult;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WeightUnit {
    #[serde(rename = "g")]
    Grams,
    #[serde(rename = "oz")]
    Ounces,
    #[serde(rename = "kg")]
    Kilograms,
    #[serde(rename = "lb")]
    Pounds,
}

impl StringEnum for WeightUnit {
    const VARIANTS: &'static [Self] = &[Self::Grams, Self::Ounces, Self::Kilograms, Self::Pounds];

    fn as_str(self) -> &'static str {
        match self {
            Self::Grams => "g",
            Self::Ounces => "oz",
            Self::Kilograms => "kg",
            Self::Pounds => "lb",
        }
    }
}

impl WeightUnit {
    fn grams_per_unit(self) -> f64 {
        match self {
            Self::Grams => 1.0,
            Self::Ounces => 28.349_523_125,
            Self::Kilograms => 1000.0,
            Self::Pounds => 453.592_37,
        }
    }
}

static WEIGHT_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "weight",
        Rule::object([
            field("value", Rule::number().positive()),
            field("unit", Rule::enumeration(WeightUnit::wire_names())),
        ]),
    )
});

/// Strictly positive weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Weight {
    value: f64,
    unit: WeightUnit,
}

impl Weight {
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> WeightUnit {
        self.unit
    }

    pub fn to_grams(&self) -> f64 {
        self.value * self.unit.grams_per_unit()
    }
}

impl Entity for Weight {
    fn schema() -> &'static Schema {
        &WEIGHT_SCHEMA
    }

    fn build(fields: &Map<String, Value>, _cx: &mut BuildContext<'_>) -> Result<Self, EntityError> {
        Ok(Self {
            value: assert::number(fields.get("value"), "value", Sign::Positive, None)?,
            unit: assert::enum_value(fields.get("unit"), "unit", None)?,
        })
    }
}

/// Whole number of items, at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Quantity(u64);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);

    pub fn rule() -> Rule {
        Rule::integer().positive()
    }

    /// Parses field `field`; absent means one item.
    pub fn parse(value: Option<&Value>, field: &str) -> ValidationResult<Self> {
        assert::positive_integer(value, field, Some(1)).map(Self)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

#[cfg(test)]
mod tests {
    use super::{Quantity, Weight, WeightUnit};
    use crate::config::PipelinePolicy;
    use crate::entity::{construct, BuildContext};
    use crate::reference::ReferenceMap;
    use serde_json::json;

    #[test]
    fn weight_must_be_positive() {
        let refs = ReferenceMap::new("test");
        let mut cx = BuildContext::loaded(&refs, PipelinePolicy::default());
        let err = construct::<Weight>(&json!({ "value": 0, "unit": "lb" }), &mut cx).unwrap_err();
        assert!(err.to_string().contains("value must be greater than zero"));

        let weight = construct::<Weight>(&json!({ "value": 2, "unit": "kg" }), &mut cx).unwrap();
        assert_eq!(weight.unit(), WeightUnit::Kilograms);
        assert_eq!(weight.to_grams(), 2000.0);
    }

    #[test]
    fn quantity_must_be_a_positive_whole_number() {
        assert!(Quantity::parse(Some(&json!(0)), "quantity").is_err());
        assert!(Quantity::parse(Some(&json!(1.5)), "quantity").is_err());
        assert_eq!(Quantity::parse(Some(&json!(3)), "quantity").unwrap().value(), 3);
        assert_eq!(Quantity::parse(None, "quantity").unwrap(), Quantity::ONE);
    }
}
