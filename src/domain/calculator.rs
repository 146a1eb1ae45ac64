use crate::domain::fields::FieldCodec;
use crate::error::{RegistrationError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Per-product bounds for the amount and term a registration may request.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct CalculatorConfig {
    pub product_id: u32,
    pub is_default: bool,
    pub sum_min: Decimal,
    pub sum_max: Decimal,
    pub sum_default: Decimal,
    pub term_min: u32,
    pub term_max: u32,
    pub term_default: u32,
}

/// The numeric seed for a new (or re-seeded) registration.
#[derive(Debug, PartialEq, Clone)]
pub struct CreationFields {
    pub product_id: u32,
    pub sum: Decimal,
    pub term: u32,
}

/// Static catalog of product calculators.
///
/// Exactly one entry carries `is_default`; lookups by unknown product id
/// fall back to it. The constructor enforces the invariant, so `resolve`
/// itself cannot fail per-request.
pub struct CalculatorCatalog {
    by_product: BTreeMap<u32, CalculatorConfig>,
    default_id: u32,
}

impl CalculatorCatalog {
    pub fn new(configs: Vec<CalculatorConfig>) -> Result<Self> {
        let mut default_id = None;
        for config in &configs {
            if config.is_default {
                if default_id.is_some() {
                    return Err(RegistrationError::Configuration(
                        "more than one default calculator defined".to_string(),
                    ));
                }
                default_id = Some(config.product_id);
            }
        }
        let default_id = default_id.ok_or_else(|| {
            RegistrationError::Configuration("no default calculator defined".to_string())
        })?;

        let by_product = configs
            .into_iter()
            .map(|config| (config.product_id, config))
            .collect();

        Ok(Self {
            by_product,
            default_id,
        })
    }

    /// The deployment's built-in catalog, used when no catalog file is given.
    pub fn builtin() -> Self {
        Self::new(vec![
            CalculatorConfig {
                product_id: 101,
                is_default: true,
                sum_min: dec!(50),
                sum_max: dec!(1000),
                sum_default: dec!(200),
                term_min: 7,
                term_max: 30,
                term_default: 14,
            },
            CalculatorConfig {
                product_id: 202,
                is_default: false,
                sum_min: dec!(1000),
                sum_max: dec!(5000),
                sum_default: dec!(2000),
                term_min: 30,
                term_max: 180,
                term_default: 90,
            },
        ])
        .expect("built-in catalog has exactly one default")
    }

    /// The calculator for `product_id`, or the default entry when the id is
    /// missing or unknown.
    pub fn resolve(&self, product_id: Option<u32>) -> &CalculatorConfig {
        product_id
            .and_then(|id| self.by_product.get(&id))
            .unwrap_or_else(|| &self.by_product[&self.default_id])
    }

    /// Seeds `{product_id, sum, term}` for a new registration: calculator
    /// defaults, with requested values used only when they fall inside the
    /// `[min, max]` bounds. Out-of-range requests keep the default; they are
    /// neither clamped nor rejected.
    pub fn derive_creation_fields(
        &self,
        product_id: Option<u32>,
        requested_sum: Option<Decimal>,
        requested_term: Option<u32>,
    ) -> CreationFields {
        let calc = self.resolve(product_id);

        let mut fields = CreationFields {
            product_id: calc.product_id,
            sum: calc.sum_default,
            term: calc.term_default,
        };

        if let Some(sum) = requested_sum
            && calc.sum_min <= sum
            && sum <= calc.sum_max
        {
            fields.sum = sum;
        }

        if let Some(term) = requested_term
            && calc.term_min <= term
            && term <= calc.term_max
        {
            fields.term = term;
        }

        fields
    }

    /// External-naming projection of a calculator with the internal-only
    /// default flag removed.
    pub fn public_view(config: &CalculatorConfig) -> BTreeMap<String, Value> {
        let attrs: BTreeMap<String, Value> = match serde_json::to_value(config) {
            Ok(Value::Object(map)) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };
        FieldCodec::project(&attrs, &["is_default"])
    }
}
